use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Global engine configuration shared across runtime layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Buffered batches per inter-operator channel.
    pub channel_capacity: usize,
    /// Grace period between a shutdown signal and a hard cancel.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
    /// Bind address for the Prometheus `/metrics` endpoint.
    #[serde(default = "default_metrics_addr")]
    pub metrics_addr: SocketAddr,
}

fn default_shutdown_timeout_secs() -> u64 {
    30
}

fn default_metrics_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 9644))
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 16,
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
            metrics_addr: default_metrics_addr(),
        }
    }
}

impl EngineConfig {
    /// Shutdown grace period as a [`Duration`].
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::EngineConfig;

    #[test]
    fn defaults_match_runtime_contract() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.channel_capacity, 16);
        assert_eq!(cfg.shutdown_timeout().as_secs(), 30);
    }
}
