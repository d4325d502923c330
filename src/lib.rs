//! Concurrent outbound HTTP dispatch for synchronous callers.
//!
//! A [`Dispatcher`] owns a background tokio runtime and executes submitted
//! requests concurrently, never blocking the submitting thread. Each
//! submission yields an opaque [`RequestId`] backed by an entry in the
//! [`HandleTable`]; the caller collects the result exactly once through a
//! [`RequestFuture`], either blocking ([`RequestFuture::wait`]) or polling
//! ([`RequestFuture::try_take`]).

pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod future;
pub mod net;
pub mod request;
pub mod table;

pub use config::DispatcherConfig;
pub use dispatcher::Dispatcher;
pub use errors::DispatchError;
pub use future::RequestFuture;
pub use net::{HttpTransport, Response, StubTransport, Transport, TransportError};
pub use request::{Request, RequestId};
pub use table::{EntryStatus, HandleTable, RequestOutcome};
