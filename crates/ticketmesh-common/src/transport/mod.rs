//! ticketmesh Transport Layer
//!
//! # Architecture
//!
//! - **Transport**: TCP
//! - **Codec**: JSON-RPC 2.0 messages encoded with `serde_json`
//! - **Wire Format**: `[4-byte length prefix as u32 big-endian] + [payload]`
//! - **Heartbeat**: a frame whose payload is the single byte `0x00`, echoed back
//!   unchanged by the server
//!
//! # Components
//!
//! - **[`JsonCodec`]**: Encode/decode and validate JSON-RPC messages
//! - **[`RouterSocket`]**: Multiplexed server socket; replies are routed to the
//!   sender identity of the request
//! - **[`ReqSocket`]**: Strict request/response client socket

pub mod codec;
pub mod frame;
pub mod req;
pub mod router;

pub use codec::{JsonCodec, RejectedRequest};
pub use frame::{is_ping, read_frame, write_frame, MAX_MESSAGE_SIZE, PING};
pub use req::ReqSocket;
pub use router::{Envelope, PeerIdentity, RouterSocket};
