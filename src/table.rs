use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use log::warn;

use crate::errors::DispatchError;
use crate::net::Response;
use crate::request::RequestId;

/// The stored result of one finished request. Transport and timeout failures
/// are data here, not raised errors.
pub type RequestOutcome = Result<Response, DispatchError>;

/// External view of one entry's position in its lifecycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EntryStatus {
    Pending,
    Done,
    Consumed,
}

enum EntryState {
    Pending,
    Done(RequestOutcome),
    Consumed,
}

/// One entry's slot: the state machine plus the primitive a caller sleeps on
/// until the state leaves `Pending`.
struct Slot {
    state: Mutex<EntryState>,
    cond: Condvar,
}

impl Slot {
    fn new() -> Self {
        Self {
            state: Mutex::new(EntryState::Pending),
            cond: Condvar::new(),
        }
    }
}

/// Registry mapping a [`RequestId`] to the in-flight/completed state of one
/// request. Single source of truth for entry state and the single-delivery
/// guarantee.
///
/// The map lock covers lookups, inserts and removals only; waiting happens
/// on the per-slot condvar, so no global lock serializes execution or waits.
#[derive(Default)]
pub struct HandleTable {
    slots: Mutex<HashMap<RequestId, Arc<Slot>>>,
}

impl HandleTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, id: RequestId) -> Result<Arc<Slot>, DispatchError> {
        self.slots
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(DispatchError::UnknownReference)
    }

    /// Number of live entries, in any state.
    pub fn len(&self) -> usize {
        self.slots.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Create a fresh `Pending` entry under `id`.
    pub(crate) fn insert(&self, id: RequestId) {
        let mut slots = self.slots.lock().unwrap();
        debug_assert!(!slots.contains_key(&id), "duplicate request id");
        slots.insert(id, Arc::new(Slot::new()));
    }

    /// Transition `Pending` → `Done`, attach the outcome and wake waiters.
    ///
    /// Writes to an entry that already left `Pending` (late completion after
    /// shutdown, duplicate write) are dropped, keeping the transition
    /// single-shot.
    pub(crate) fn complete(&self, id: RequestId, outcome: RequestOutcome) {
        let slot = match self.slot(id) {
            Ok(slot) => slot,
            Err(_) => {
                warn!("dropping completion for unknown request {id}");
                return;
            }
        };

        let mut state = slot.state.lock().unwrap();
        if !matches!(*state, EntryState::Pending) {
            warn!("dropping late completion for request {id}");
            return;
        }

        *state = EntryState::Done(outcome);
        slot.cond.notify_all();
    }

    /// Fail every still-`Pending` entry with [`DispatchError::Shutdown`] so
    /// blocked waiters wake instead of hanging. Returns how many were failed.
    pub(crate) fn fail_pending(&self) -> usize {
        let slots: Vec<Arc<Slot>> = self.slots.lock().unwrap().values().cloned().collect();

        let mut failed = 0;
        for slot in slots {
            let mut state = slot.state.lock().unwrap();
            if matches!(*state, EntryState::Pending) {
                *state = EntryState::Done(Err(DispatchError::Shutdown));
                slot.cond.notify_all();
                failed += 1;
            }
        }
        failed
    }

    /// Current lifecycle position of the entry behind `id`.
    pub fn status(&self, id: RequestId) -> Result<EntryStatus, DispatchError> {
        let slot = self.slot(id)?;
        let state = slot.state.lock().unwrap();

        Ok(match *state {
            EntryState::Pending => EntryStatus::Pending,
            EntryState::Done(_) => EntryStatus::Done,
            EntryState::Consumed => EntryStatus::Consumed,
        })
    }

    /// Block the calling thread until the entry leaves `Pending`, or until
    /// the local wait budget elapses ([`DispatchError::Timeout`]).
    ///
    /// The budget is distinct from the request's own network timeout: it
    /// bounds this wait only and consumes nothing.
    pub fn await_done(&self, id: RequestId, budget: Option<Duration>) -> Result<(), DispatchError> {
        let slot = self.slot(id)?;
        let mut state = slot.state.lock().unwrap();

        match budget {
            None => {
                while matches!(*state, EntryState::Pending) {
                    state = slot.cond.wait(state).unwrap();
                }
            }
            Some(budget) => {
                let deadline = Instant::now() + budget;
                while matches!(*state, EntryState::Pending) {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(DispatchError::Timeout);
                    }
                    let (guard, _) = slot.cond.wait_timeout(state, deadline - now).unwrap();
                    state = guard;
                }
            }
        }

        Ok(())
    }

    /// Non-blocking consumption attempt.
    ///
    /// Returns `Ok(None)` while the entry is still `Pending`; moves the
    /// outcome out and marks the entry `Consumed` when it is `Done`; fails
    /// with [`DispatchError::AlreadyConsumed`] on a repeat take. The
    /// `Consumed` tombstone stays in the table until [`evict`](Self::evict).
    pub fn try_take(&self, id: RequestId) -> Result<Option<RequestOutcome>, DispatchError> {
        let slot = self.slot(id)?;
        let mut state = slot.state.lock().unwrap();

        match *state {
            EntryState::Pending => Ok(None),
            EntryState::Consumed => Err(DispatchError::AlreadyConsumed),
            EntryState::Done(_) => {
                let taken = std::mem::replace(&mut *state, EntryState::Consumed);
                match taken {
                    EntryState::Done(outcome) => Ok(Some(outcome)),
                    _ => unreachable!("state matched Done under the slot lock"),
                }
            }
        }
    }

    /// Remove the entry behind `id`, but only once it is `Consumed`. Entries
    /// that are `Pending` or `Done`-but-unconsumed stay put. Returns whether
    /// an entry was removed.
    pub fn evict(&self, id: RequestId) -> bool {
        let mut slots = self.slots.lock().unwrap();
        if let Some(slot) = slots.get(&id) {
            if matches!(*slot.state.lock().unwrap(), EntryState::Consumed) {
                slots.remove(&id);
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn done(status: u16) -> RequestOutcome {
        Ok(Response {
            url: url::Url::parse("https://example.test/").unwrap(),
            status,
            status_text: "OK".to_string(),
            headers: http::HeaderMap::new(),
            body: Vec::new(),
        })
    }

    #[test]
    fn entry_contract() {
        let table = HandleTable::new();
        let id = RequestId::new();

        table.insert(id);
        assert_eq!(table.status(id).unwrap(), EntryStatus::Pending);

        // not ready yet, nothing consumed
        assert!(table.try_take(id).unwrap().is_none());
        assert_eq!(table.status(id).unwrap(), EntryStatus::Pending);

        table.complete(id, done(200));
        assert_eq!(table.status(id).unwrap(), EntryStatus::Done);

        let outcome = table.try_take(id).unwrap().expect("done entry");
        assert_eq!(outcome.unwrap().status, 200);
        assert_eq!(table.status(id).unwrap(), EntryStatus::Consumed);

        // second take hits the tombstone
        match table.try_take(id) {
            Err(DispatchError::AlreadyConsumed) => {}
            other => panic!("expected AlreadyConsumed, got {:?}", other.map(|_| ())),
        }

        assert!(table.evict(id));
        match table.status(id) {
            Err(DispatchError::UnknownReference) => {}
            other => panic!("expected UnknownReference, got {:?}", other),
        }
    }

    #[test]
    fn unknown_reference_everywhere() {
        let table = HandleTable::new();
        let id = RequestId::new();

        assert!(matches!(table.status(id), Err(DispatchError::UnknownReference)));
        assert!(matches!(table.try_take(id), Err(DispatchError::UnknownReference)));
        assert!(matches!(
            table.await_done(id, Some(Duration::from_millis(1))),
            Err(DispatchError::UnknownReference)
        ));
        assert!(!table.evict(id));
    }

    #[test]
    fn eviction_requires_consumption() {
        let table = HandleTable::new();
        let id = RequestId::new();

        table.insert(id);
        assert!(!table.evict(id)); // Pending stays put

        table.complete(id, done(200));
        assert!(!table.evict(id)); // Done-but-unconsumed stays put

        table.try_take(id).unwrap().expect("done entry").unwrap();
        assert!(table.evict(id));
        assert!(table.is_empty());
    }

    #[test]
    fn late_completion_is_dropped() {
        let table = HandleTable::new();
        let id = RequestId::new();

        table.insert(id);
        table.complete(id, done(200));
        table.complete(id, done(500)); // duplicate write, must not overwrite

        let outcome = table.try_take(id).unwrap().expect("done entry");
        assert_eq!(outcome.unwrap().status, 200);
    }

    #[test]
    fn await_done_budget_elapses() {
        let table = HandleTable::new();
        let id = RequestId::new();
        table.insert(id);

        let start = Instant::now();
        match table.await_done(id, Some(Duration::from_millis(30))) {
            Err(DispatchError::Timeout) => {}
            other => panic!("expected Timeout, got {:?}", other),
        }
        assert!(start.elapsed() >= Duration::from_millis(30));

        // the budget consumed nothing
        assert_eq!(table.status(id).unwrap(), EntryStatus::Pending);
    }

    #[test]
    fn await_done_wakes_on_completion() {
        let table = Arc::new(HandleTable::new());
        let id = RequestId::new();
        table.insert(id);

        let writer = {
            let table = Arc::clone(&table);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                table.complete(id, done(200));
            })
        };

        table.await_done(id, None).unwrap();
        assert_eq!(table.status(id).unwrap(), EntryStatus::Done);
        writer.join().unwrap();
    }

    #[test]
    fn fail_pending_touches_only_pending() {
        let table = HandleTable::new();
        let finished = RequestId::new();
        let stuck = RequestId::new();

        table.insert(finished);
        table.insert(stuck);
        table.complete(finished, done(200));

        assert_eq!(table.fail_pending(), 1);

        let outcome = table.try_take(finished).unwrap().expect("done entry");
        assert_eq!(outcome.unwrap().status, 200);

        let outcome = table.try_take(stuck).unwrap().expect("failed entry");
        assert!(matches!(outcome, Err(DispatchError::Shutdown)));
    }
}
