use std::time::Duration;

use ticketmesh_common::protocol::error::{Result, TicketMeshError};
use ticketmesh_heartbeat::HeartbeatConfig;

/// Lower bound for the request timeout; a call must outlast one heartbeat cycle.
pub const MIN_REQUEST_TIMEOUT: Duration = Duration::from_millis(1000);

/// Configuration of one registry node.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Address the local provider listens on.
    pub bind_addr: String,
    /// Connect addresses of every provider in the cluster, this node's included.
    pub peers: Vec<String>,
    /// Identity of the local provider.
    pub provider_id: String,
    pub request_timeout: Duration,
    pub heartbeat: HeartbeatConfig,
    /// Number of heartbeat watchdog tasks.
    pub watchdog_workers: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:7001".into(),
            peers: Vec::new(),
            provider_id: String::new(),
            request_timeout: Duration::from_millis(1500),
            heartbeat: HeartbeatConfig::default(),
            watchdog_workers: 1,
        }
    }
}

impl RegistryConfig {
    /// A fresh random provider identity.
    pub fn generate_provider_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Checks the configuration for values the registry cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.peers.is_empty() {
            return Err(TicketMeshError::InvalidConfig(
                "at least one peer address is required".into(),
            ));
        }
        if self.provider_id.is_empty() {
            return Err(TicketMeshError::InvalidConfig("provider id must not be empty".into()));
        }
        if self.watchdog_workers == 0 {
            return Err(TicketMeshError::InvalidConfig(
                "at least one watchdog worker is required".into(),
            ));
        }
        if self.request_timeout <= MIN_REQUEST_TIMEOUT {
            return Err(TicketMeshError::InvalidConfig(format!(
                "request timeout must exceed {}ms, got {}ms",
                MIN_REQUEST_TIMEOUT.as_millis(),
                self.request_timeout.as_millis()
            )));
        }
        if self.heartbeat.timeout >= self.heartbeat.interval {
            return Err(TicketMeshError::InvalidConfig(format!(
                "heartbeat timeout ({}ms) must be shorter than the interval ({}ms)",
                self.heartbeat.timeout.as_millis(),
                self.heartbeat.interval.as_millis()
            )));
        }
        Ok(())
    }
}
