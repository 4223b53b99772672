//! ticketmesh Client
//!
//! Clients for talking to ticket providers.
//!
//! - **[`RpcClient`]**: one request/response socket to one provider, with a
//!   per-call timeout and heartbeat registration
//! - **[`RegistryClient`]**: typed ticket operations over an `RpcClient`
//! - **[`Ticket`]**: what the host implements for the values it stores
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use ticketmesh_client::{JsonTicket, RegistryClient};
//! use serde_json::json;
//!
//! # async fn run() -> ticketmesh_common::protocol::Result<()> {
//! let client: RegistryClient<JsonTicket> =
//!     RegistryClient::new("127.0.0.1:7001", Duration::from_millis(1500), None);
//! client.connect();
//!
//! client.add_ticket(&JsonTicket::new("ST-1", json!({"user": "alice"}))).await?;
//! let ticket = client.get_ticket("ST-1").await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod registry;
pub mod ticket;

pub use client::RpcClient;
pub use registry::RegistryClient;
pub use ticket::{decode_ticket, encode_ticket, JsonTicket, Ticket};
