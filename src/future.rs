use std::sync::Arc;
use std::time::Duration;

use crate::errors::DispatchError;
use crate::net::Response;
use crate::request::RequestId;
use crate::table::HandleTable;

/// Single-owner, single-use handle to one submitted request's result.
///
/// The local `consumed` flag mirrors the single-consumption contract without
/// a table lookup: once [`wait`](Self::wait) has been entered or
/// [`try_take`](Self::try_take) has returned a result, every further
/// consumption attempt fails with [`DispatchError::AlreadyConsumed`].
///
/// Deliberate: `wait` marks the future consumed as soon as it is entered,
/// *before* the outcome is known — a future can only ever be waited on once,
/// even when the underlying request failed. Do not relax this into
/// retry-on-failure.
pub struct RequestFuture {
    id: RequestId,
    table: Arc<HandleTable>,
    consumed: bool,
}

impl RequestFuture {
    pub fn new(id: RequestId, table: Arc<HandleTable>) -> Self {
        Self {
            id,
            table,
            consumed: false,
        }
    }

    /// The underlying reference.
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Whether this future has been consumed.
    ///
    /// Reflects only the local flag, *not* whether the network call has
    /// finished; it governs whether `wait`/`try_take` are still permitted.
    pub fn is_complete(&self) -> bool {
        self.consumed
    }

    /// Block until the request finishes, then deliver its outcome.
    ///
    /// Fails with [`DispatchError::AlreadyConsumed`] on a repeat call.
    pub fn wait(&mut self) -> Result<Response, DispatchError> {
        if self.consumed {
            return Err(DispatchError::AlreadyConsumed);
        }
        self.consumed = true;

        self.table.await_done(self.id, None)?;
        self.take_finished()
    }

    /// [`wait`](Self::wait) with a local wait budget.
    ///
    /// A budget elapse returns [`DispatchError::Timeout`] and leaves the
    /// future unconsumed, like a `try_take` that found nothing: no result
    /// was forfeited, and a later `wait`/`try_take` may still succeed.
    pub fn wait_timeout(&mut self, budget: Duration) -> Result<Response, DispatchError> {
        if self.consumed {
            return Err(DispatchError::AlreadyConsumed);
        }

        self.table.await_done(self.id, Some(budget))?;

        // The entry is done; from here the single-consumption rules of
        // `wait` apply, whatever the stored outcome is.
        self.consumed = true;
        self.take_finished()
    }

    /// Non-blocking consumption attempt.
    ///
    /// Returns `Ok(None)` while the request is still in flight, leaving the
    /// future unconsumed so a later call may succeed. Once a result is
    /// ready, delivers it and marks the future consumed.
    pub fn try_take(&mut self) -> Result<Option<Response>, DispatchError> {
        if self.consumed {
            return Err(DispatchError::AlreadyConsumed);
        }

        match self.table.try_take(self.id)? {
            None => Ok(None),
            Some(outcome) => {
                self.consumed = true;
                self.table.evict(self.id);
                outcome.map(Some)
            }
        }
    }

    /// Take the outcome of an entry known to have left `Pending`, then evict.
    fn take_finished(&self) -> Result<Response, DispatchError> {
        match self.table.try_take(self.id)? {
            Some(outcome) => {
                self.table.evict(self.id);
                outcome
            }
            // single-owner id: nothing can move the entry back to Pending
            None => Err(DispatchError::UnknownReference),
        }
    }
}
