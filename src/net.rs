pub mod response;
pub mod transport;

pub use response::Response;
pub use transport::{HttpTransport, StubTransport, Transport, TransportError};
