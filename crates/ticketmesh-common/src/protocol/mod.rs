pub mod error;
pub mod jsonrpc;
pub mod methods;

pub use error::{Result, TicketMeshError};
pub use jsonrpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
