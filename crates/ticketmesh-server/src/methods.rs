//! Ticket method handlers.
//!
//! Every handler checks for exactly the parameter keys it expects. Ticket
//! blobs travel as base64 strings and are stored as raw bytes; the provider
//! never looks inside them.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};
use ticketmesh_common::protocol::error::Result;
use ticketmesh_common::protocol::methods::{
    ADD_TICKET, DELETE_TICKET, GET_PROVIDER_ID, GET_TICKET, GET_TICKETS, PROVIDER_ID, STATUS,
    TICKET, TICKETS, TICKET_ID, UPDATE_TICKET,
};
use ticketmesh_common::protocol::JsonRpcError;
use tracing::{debug, error, warn};

use crate::dispatch::{DispatchTable, MethodResult, Params};
use crate::store::TicketStore;

/// State served by a provider: its identity and its tickets.
#[derive(Debug)]
pub struct ProviderState {
    pub provider_id: String,
    pub store: TicketStore,
}

impl ProviderState {
    pub fn new(provider_id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            store: TicketStore::new(),
        }
    }
}

/// Dispatch table with the six ticket methods.
pub fn provider_methods() -> Result<DispatchTable<ProviderState>> {
    DispatchTable::new()
        .with_method(ADD_TICKET, add_ticket)?
        .with_method(UPDATE_TICKET, update_ticket)?
        .with_method(DELETE_TICKET, delete_ticket)?
        .with_method(GET_TICKET, get_ticket)?
        .with_method(GET_TICKETS, get_tickets)?
        .with_method(GET_PROVIDER_ID, get_provider_id)
}

fn add_ticket(state: &mut ProviderState, params: &Params) -> MethodResult {
    let (ticket_id, ticket) = ticket_params(params)?;

    if state.store.contains(ticket_id) {
        error!(ticket_id, "Duplicate ticket");
        return Err(JsonRpcError::duplicate_ticket());
    }

    state.store.put(ticket_id.to_owned(), ticket);
    debug!(ticket_id, "Ticket added");

    Ok(json!({ TICKET_ID: ticket_id, STATUS: "added" }))
}

fn update_ticket(state: &mut ProviderState, params: &Params) -> MethodResult {
    let (ticket_id, ticket) = ticket_params(params)?;

    if state.store.put(ticket_id.to_owned(), ticket).is_none() {
        warn!(ticket_id, "Updated ticket was missing");
    }
    debug!(ticket_id, "Ticket updated");

    Ok(json!({ TICKET_ID: ticket_id, STATUS: "updated" }))
}

fn delete_ticket(state: &mut ProviderState, params: &Params) -> MethodResult {
    let ticket_id = ticket_id_param(params)?;

    if state.store.remove(ticket_id).is_none() {
        warn!(ticket_id, "Deleted ticket was missing");
    }

    Ok(json!({ TICKET_ID: ticket_id, STATUS: "removed" }))
}

fn get_ticket(state: &mut ProviderState, params: &Params) -> MethodResult {
    let ticket_id = ticket_id_param(params)?;

    let Some(ticket) = state.store.get(ticket_id) else {
        debug!(ticket_id, "Ticket not found");
        return Err(JsonRpcError::missing_ticket());
    };

    Ok(json!({ TICKET_ID: ticket_id, TICKET: STANDARD.encode(ticket) }))
}

fn get_tickets(state: &mut ProviderState, params: &Params) -> MethodResult {
    expect_keys(params, &[])?;

    let tickets: Vec<Value> = state
        .store
        .values()
        .map(|ticket| Value::String(STANDARD.encode(ticket)))
        .collect();
    debug!("Returning {} tickets", tickets.len());

    Ok(json!({ TICKETS: tickets }))
}

fn get_provider_id(state: &mut ProviderState, params: &Params) -> MethodResult {
    expect_keys(params, &[])?;
    Ok(json!({ PROVIDER_ID: state.provider_id }))
}

/// Fails with `-32602` unless `params` holds exactly `keys`.
fn expect_keys(params: &Params, keys: &[&str]) -> std::result::Result<(), JsonRpcError> {
    if params.len() != keys.len() || !keys.iter().all(|key| params.contains_key(*key)) {
        return Err(JsonRpcError::invalid_params());
    }
    Ok(())
}

fn ticket_id_param(params: &Params) -> std::result::Result<&str, JsonRpcError> {
    expect_keys(params, &[TICKET_ID])?;
    params
        .get(TICKET_ID)
        .and_then(Value::as_str)
        .ok_or_else(JsonRpcError::invalid_params)
}

fn ticket_params(params: &Params) -> std::result::Result<(&str, Vec<u8>), JsonRpcError> {
    expect_keys(params, &[TICKET_ID, TICKET])?;

    let ticket_id = params
        .get(TICKET_ID)
        .and_then(Value::as_str)
        .ok_or_else(JsonRpcError::invalid_params)?;

    let ticket = params
        .get(TICKET)
        .and_then(Value::as_str)
        .and_then(|encoded| STANDARD.decode(encoded).ok())
        .ok_or_else(|| {
            debug!(ticket_id, "Undecodable ticket");
            JsonRpcError::decode_ticket_error()
        })?;

    Ok((ticket_id, ticket))
}
