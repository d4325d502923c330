use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use tokio::runtime::Runtime;

use crate::config::DispatcherConfig;
use crate::errors::DispatchError;
use crate::future::RequestFuture;
use crate::net::{HttpTransport, Transport};
use crate::request::{Request, RequestId};
use crate::table::HandleTable;

/// The concurrent execution engine turning submissions into completed
/// entries.
///
/// Owns a multi-thread tokio runtime, the [`HandleTable`] and the
/// [`Transport`]. Constructed explicitly, once, and passed by reference
/// through the host's own context; there is no implicit global. `submit`
/// never blocks the caller: each submitted request runs as its own task on
/// the runtime, so N submissions put N requests in flight at once, bounded
/// only by the transport.
pub struct Dispatcher {
    /// `None` only after `Drop`/`shutdown` took the runtime down.
    runtime: Option<Runtime>,
    table: Arc<HandleTable>,
    transport: Arc<dyn Transport>,
    default_timeout: Option<Duration>,
}

impl Dispatcher {
    /// Create a dispatcher backed by the reqwest transport.
    pub fn new(config: DispatcherConfig) -> Result<Self, DispatchError> {
        let transport = Arc::new(HttpTransport::new(&config.user_agent)?);
        Self::with_transport(config, transport)
    }

    /// Create a dispatcher with a caller-supplied transport (tests, custom
    /// stacks).
    pub fn with_transport(
        config: DispatcherConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, DispatchError> {
        let mut builder = tokio::runtime::Builder::new_multi_thread();
        builder.enable_all();
        if let Some(count) = config.worker_threads {
            builder.worker_threads(count);
        }
        let runtime = builder.build()?;

        Ok(Self {
            runtime: Some(runtime),
            table: Arc::new(HandleTable::new()),
            transport,
            default_timeout: config.default_timeout,
        })
    }

    /// The table backing this dispatcher's entries.
    pub fn table(&self) -> Arc<HandleTable> {
        Arc::clone(&self.table)
    }

    /// Submit a request for concurrent execution and return its reference
    /// immediately.
    ///
    /// Safe to call from any number of threads at once. The request runs
    /// under its own timeout (or the configured default); on elapse the
    /// transport call is dropped and the entry completes with
    /// [`DispatchError::Timeout`] instead of a response.
    pub fn submit(&self, request: Request) -> RequestId {
        let id = RequestId::new();
        self.table.insert(id);

        let timeout = request.timeout.or(self.default_timeout);
        let table = Arc::clone(&self.table);
        let task = self.transport.perform(request);

        debug!("submitted request {id}");

        match &self.runtime {
            Some(runtime) => {
                runtime.spawn(async move {
                    let outcome = match timeout {
                        Some(deadline) => match tokio::time::timeout(deadline, task).await {
                            Ok(result) => result.map_err(DispatchError::Transport),
                            Err(_) => Err(DispatchError::Timeout),
                        },
                        None => task.await.map_err(DispatchError::Transport),
                    };

                    debug!("request {id} finished");
                    table.complete(id, outcome);
                });
            }
            // unreachable while the dispatcher is alive; keep waiters sane anyway
            None => self.table.complete(id, Err(DispatchError::Shutdown)),
        }

        id
    }

    /// Submit a request and wrap its reference in a [`RequestFuture`].
    pub fn request(&self, request: Request) -> RequestFuture {
        RequestFuture::new(self.submit(request), self.table())
    }

    /// Abandon in-flight work and fail every still-pending entry with
    /// [`DispatchError::Shutdown`] so blocked waiters wake. Results already
    /// stored stay consumable through their futures.
    pub fn shutdown(mut self) {
        self.shutdown_inner();
    }

    fn shutdown_inner(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
            let abandoned = self.table.fail_pending();
            if abandoned > 0 {
                warn!("dispatcher shut down with {abandoned} request(s) still in flight");
            }
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.shutdown_inner();
    }
}
