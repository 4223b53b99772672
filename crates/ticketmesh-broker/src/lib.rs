//! ticketmesh Broker
//!
//! The replicating side of the registry.
//!
//! - **[`RegistryBroker`]**: fans writes out to every available provider and
//!   serves reads from the local one; seeds a fresh node via
//!   [`bootstrap`](RegistryBroker::bootstrap)
//! - **[`TicketRegistry`]**: a whole node (local provider, pacemaker and
//!   broker) behind the operations a host calls
//! - **[`RegistryConfig`]**: node configuration and its validation
//!
//! # Example
//!
//! ```no_run
//! use ticketmesh_broker::{RegistryConfig, TicketRegistry};
//! use ticketmesh_client::JsonTicket;
//! use serde_json::json;
//!
//! # async fn run() -> ticketmesh_common::protocol::Result<()> {
//! let config = RegistryConfig {
//!     bind_addr: "0.0.0.0:7001".into(),
//!     peers: vec!["10.0.0.1:7001".into(), "10.0.0.2:7001".into()],
//!     provider_id: "node-1".into(),
//!     ..Default::default()
//! };
//!
//! let registry: TicketRegistry<JsonTicket> = TicketRegistry::start(config).await?;
//! registry.add_ticket(&JsonTicket::new("ST-1", json!({}))).await;
//! registry.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod broker;
pub mod config;
pub mod registry;

pub use broker::RegistryBroker;
pub use config::RegistryConfig;
pub use registry::TicketRegistry;
