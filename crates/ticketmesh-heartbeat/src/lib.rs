//! ticketmesh Heartbeat
//!
//! Liveness monitoring of remote providers.
//!
//! - **[`Watchdog`]**: a worker task that pings its shard of peers with the
//!   single-byte heartbeat frame and flips their availability
//! - **[`Pacemaker`]**: owns the watchdogs and keeps the monitored peers evenly
//!   spread across them

pub mod config;
pub mod pacemaker;
pub mod watchdog;

pub use config::HeartbeatConfig;
pub use pacemaker::Pacemaker;
pub use watchdog::Watchdog;
