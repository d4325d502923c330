use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use http::{HeaderMap, StatusCode};
use url::Url;

use crate::net::Response;
use crate::request::Request;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Failure from a non-reqwest transport (stubs, custom stacks).
    #[error("transport failure: {0}")]
    Other(String),
}

/// The boundary that performs one HTTP request.
///
/// The dispatcher enforces the request's timeout *around* this call, so
/// implementations do not need their own deadline handling. Implementations
/// must be safe to share across the dispatcher's worker threads.
pub trait Transport: Send + Sync {
    fn perform(&self, request: Request) -> BoxFuture<'static, Result<Response, TransportError>>;
}

/// The production transport, backed by a shared reqwest client.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(user_agent: &str) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn perform(&self, request: Request) -> BoxFuture<'static, Result<Response, TransportError>> {
        let client = self.client.clone();

        async move {
            let res = client
                .request(request.method, request.url)
                .headers(request.headers)
                .body(request.body)
                .send()
                .await?;

            // Fetch results
            let final_url = res.url().clone();
            let status = res.status().as_u16();
            let status_text = res.status().canonical_reason().unwrap_or("Unknown").to_string();
            let headers = res.headers().clone();

            // Fetch body. We don't do streaming
            let body = res.bytes().await?.to_vec();

            Ok(Response {
                url: final_url,
                status,
                status_text,
                headers,
                body,
            })
        }
        .boxed()
    }
}

/// Transport stub that performs no network I/O.
///
/// Replies with a canned outcome after an optional artificial latency. Used
/// by this crate's own tests and useful to downstream test suites.
pub struct StubTransport {
    latency: Duration,
    reply: StubReply,
}

#[derive(Clone)]
enum StubReply {
    Status { status: u16, body: Vec<u8> },
    Fail(String),
}

impl StubTransport {
    /// Replies with the given status code and an empty body.
    pub fn status(status: u16) -> Self {
        Self::with_body(status, Vec::new())
    }

    /// Replies with the given status code and body.
    pub fn with_body(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            latency: Duration::ZERO,
            reply: StubReply::Status { status, body: body.into() },
        }
    }

    /// Replies with a [`TransportError::Other`] carrying the given message.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            latency: Duration::ZERO,
            reply: StubReply::Fail(message.into()),
        }
    }

    /// Delays every reply by `latency` before resolving.
    pub fn delayed(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

impl Transport for StubTransport {
    fn perform(&self, request: Request) -> BoxFuture<'static, Result<Response, TransportError>> {
        let latency = self.latency;
        let reply = self.reply.clone();

        async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }

            match reply {
                StubReply::Status { status, body } => {
                    let url = Url::parse(&request.url)
                        .unwrap_or_else(|_| Url::parse("http://stub.invalid/").expect("static URL"));
                    let status_text = StatusCode::from_u16(status)
                        .ok()
                        .and_then(|s| s.canonical_reason())
                        .unwrap_or("Unknown")
                        .to_string();

                    Ok(Response {
                        url,
                        status,
                        status_text,
                        headers: HeaderMap::new(),
                        body,
                    })
                }
                StubReply::Fail(message) => Err(TransportError::Other(message)),
            }
        }
        .boxed()
    }
}
