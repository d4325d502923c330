use std::fmt::{Display, Formatter};
use std::time::Duration;

use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A unique identifier for one submitted request.
///
/// Internally, a `RequestId` is a wrapper around a [`Uuid`], ensuring global
/// uniqueness per submission. It implements `Copy`, `Eq`, `Hash` and
/// ordering traits, so it can be freely duplicated, compared or used as a
/// key in hash maps. It carries no ownership of the request or its result;
/// it is purely a lookup key into the
/// [`HandleTable`](crate::table::HandleTable).
///
/// **Note:** The use of [`Uuid`] is an implementation detail and may change
/// in the future without notice. Always treat `RequestId` as an opaque
/// handle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Create a new unique `RequestId` using a random UUID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Description of one outbound HTTP request. Immutable once submitted.
///
/// The URL is deliberately kept as a plain string and not validated here:
/// submission is infallible, and a malformed URL surfaces as the stored
/// [`TransportError`](crate::net::TransportError) result instead.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    /// Deadline for the whole transport call. Falls back to the dispatcher's
    /// configured default when `None`.
    pub timeout: Option<Duration>,
}

impl Request {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: Vec::new(),
            timeout: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
