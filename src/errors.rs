use crate::net::TransportError;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Network/DNS/connect/TLS failure reported by the transport. Stored as
    /// the entry's result, not raised at the submitting call.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Either the request's own deadline elapsed before the transport
    /// finished, or a local wait budget ran out before the entry was done.
    #[error("request timed out")]
    Timeout,

    /// Reference was never issued or its entry has already been evicted.
    #[error("unknown request reference")]
    UnknownReference,

    /// Second `wait`/`try_take` on the same future.
    #[error("response already taken")]
    AlreadyConsumed,

    /// The dispatcher was shut down while the request was still in flight.
    #[error("dispatcher was shut down")]
    Shutdown,

    /// The dispatcher could not build its runtime.
    #[error("failed to start dispatcher runtime: {0}")]
    RuntimeInit(#[from] std::io::Error),
}
