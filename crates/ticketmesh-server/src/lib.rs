//! ticketmesh Provider Server
//!
//! This crate provides the JSON-RPC server each node runs to hold its copy of
//! the ticket set.
//!
//! # Components
//!
//! - **[`DispatchTable`]**: method name → handler registry with call counters
//! - **[`RpcServer`]**: single-task event loop over a router socket, answering
//!   heartbeat pings and dispatching requests against server-owned state
//! - **[`ProviderServer`]**: an `RpcServer` wired to a [`TicketStore`] and the
//!   six `cas.*` ticket methods

pub mod dispatch;
pub mod methods;
pub mod provider;
pub mod server;
pub mod store;

pub use dispatch::{DispatchTable, MethodResult, MethodStats, Params};
pub use methods::ProviderState;
pub use provider::ProviderServer;
pub use server::RpcServer;
pub use store::TicketStore;
