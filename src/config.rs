use std::time::Duration;

use serde::{Deserialize, Serialize};

const DEFAULT_USER_AGENT: &str = "fanout/0.1";

/// Dispatcher configuration.
///
/// Hosts typically embed this in their own configuration file; all fields
/// have serde-friendly defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// User agent string sent with every HTTP request.
    pub user_agent: String,
    /// Worker threads for the dispatcher's runtime. `None` uses the tokio
    /// default (one per core).
    pub worker_threads: Option<usize>,
    /// Timeout applied to requests that don't carry one of their own.
    pub default_timeout: Option<Duration>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            worker_threads: None,
            default_timeout: None,
        }
    }
}

impl DispatcherConfig {
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn worker_threads(mut self, count: usize) -> Self {
        self.worker_threads = Some(count);
        self
    }

    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }
}
