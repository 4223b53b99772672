//! Ticket contract between the host and the registry.
//!
//! The registry never looks inside a ticket. It only needs a stable id and a
//! way to turn the ticket into bytes and back, which `serde` provides. On the
//! wire the bytes are JSON, base64 encoded.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ticketmesh_common::protocol::error::{Result, TicketMeshError};
use ticketmesh_common::protocol::JsonRpcError;

/// A value the registry can store.
pub trait Ticket: Serialize + DeserializeOwned + Send + Sync {
    /// Unique id the ticket is stored under.
    fn id(&self) -> &str;
}

/// Ticket with free-form JSON attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonTicket {
    pub id: String,
    #[serde(default)]
    pub attributes: Value,
}

impl JsonTicket {
    pub fn new(id: impl Into<String>, attributes: Value) -> Self {
        Self {
            id: id.into(),
            attributes,
        }
    }
}

impl Ticket for JsonTicket {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Serializes a ticket into its wire form.
///
/// # Errors
///
/// A ticket that cannot be serialized is a `-32501` error.
pub fn encode_ticket<T: Ticket>(ticket: &T) -> Result<String> {
    let bytes = serde_json::to_vec(ticket)
        .map_err(|_| TicketMeshError::Rpc(JsonRpcError::decode_ticket_error()))?;
    Ok(STANDARD.encode(bytes))
}

/// Restores a ticket from its wire form.
///
/// # Errors
///
/// Invalid base64 or bytes that do not deserialize into `T` are a `-32501` error.
pub fn decode_ticket<T: Ticket>(encoded: &str) -> Result<T> {
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|_| TicketMeshError::Rpc(JsonRpcError::decode_ticket_error()))?;
    serde_json::from_slice(&bytes)
        .map_err(|_| TicketMeshError::Rpc(JsonRpcError::decode_ticket_error()))
}
