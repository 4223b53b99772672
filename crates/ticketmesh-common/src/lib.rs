//! ticketmesh Common Types and Transport
//!
//! This crate provides the wire protocol and socket primitives shared by every
//! ticketmesh component.
//!
//! # Overview
//!
//! ticketmesh is a replicated, in-memory registry for session tickets. Every
//! node runs a provider holding a full copy of the ticket set; a broker fans
//! writes out to all providers and reads from the local one. This crate holds:
//!
//! - **Protocol Layer**: JSON-RPC 2.0 envelope, error codes, method names
//! - **Transport Layer**: length-prefixed framing, router and request sockets
//! - **Peer Descriptor**: the shared availability state of one remote provider
//!
//! # Example
//!
//! ```
//! use ticketmesh_common::protocol::{JsonRpcRequest, JsonRpcResponse, JsonRpcError};
//! use serde_json::json;
//!
//! let request = JsonRpcRequest::new(json!(1), "cas.getTicket", json!({"ticket-id": "ST-1"}));
//! let response = JsonRpcResponse::error(request.id.clone(), JsonRpcError::missing_ticket());
//! ```

pub mod peer;
pub mod protocol;
pub mod transport;

pub use peer::Peer;
pub use protocol::*;
