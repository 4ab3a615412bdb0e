//! Runtime configuration.

use std::time::Duration;

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Limit for each attach callback (map ready, style loaded). `None`
    /// waits forever.
    pub attach_timeout: Option<Duration>,
    /// Change notifications buffered per subscriber before it lags
    pub change_buffer: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { attach_timeout: Some(Duration::from_secs(30)), change_buffer: 64 }
    }
}
