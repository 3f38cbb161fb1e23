//! SSU node configuration

use std::time::Duration;

/// Tunables for one SSU node.
#[derive(Debug, Clone)]
pub struct SsuConfig {
    pub host: String,
    pub port: u16,
    /// Number of dispatch workers draining the inbound queue.
    pub max_ssu_loop_index: usize,
    /// How long an in-flight request waits before expiring.
    pub connection_timeout: Duration,
}

impl Default for SsuConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9999,
            max_ssu_loop_index: 5,
            connection_timeout: Duration::from_secs(10),
        }
    }
}

impl SsuConfig {
    /// Ephemeral-port config for tests and loopback tooling.
    pub fn loopback() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            ..Default::default()
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
