use std::{fmt::Debug, sync::Arc, time::Duration};

use crate::{
    retry::{ExponentialBackoffProvider, RetryProvider},
    transport::Transport,
};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20 * 60);
pub const DEFAULT_USER_AGENT: &str = concat!("dcl-rs/", env!("CARGO_PKG_VERSION"));

/// Settings shared by every request a client makes.
#[derive(Clone)]
pub struct Config {
    /// Overrides the service's default base URL
    pub base_path: Option<String>,
    pub user_agent: String,
    /// Upper bound for a whole client operation, including retries
    pub timeout: Duration,
    pub retry_provider: Arc<dyn RetryProvider>,
    pub transport: Arc<dyn Transport>,
}

impl Config {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            base_path: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            retry_provider: Arc::new(ExponentialBackoffProvider::default()),
            transport,
        }
    }

    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = Some(base_path.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry_provider(mut self, retry_provider: Arc<dyn RetryProvider>) -> Self {
        self.retry_provider = retry_provider;
        self
    }
}

impl Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("base_path", &self.base_path)
            .field("user_agent", &self.user_agent)
            .field("timeout", &self.timeout)
            .field("retry_provider", &self.retry_provider)
            .finish_non_exhaustive()
    }
}
