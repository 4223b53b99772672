use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use ticketmesh_common::protocol::error::{Result, TicketMeshError};
use ticketmesh_common::protocol::methods::{
    ADD_TICKET, DELETE_TICKET, GET_PROVIDER_ID, GET_TICKET, GET_TICKETS, PROVIDER_ID, TICKET,
    TICKETS, TICKET_ID, UPDATE_TICKET,
};
use ticketmesh_common::protocol::JsonRpcError;
use ticketmesh_heartbeat::Pacemaker;

use crate::client::RpcClient;
use crate::ticket::{decode_ticket, encode_ticket, Ticket};

/// Typed client for the ticket methods of one provider.
pub struct RegistryClient<T> {
    client: RpcClient,
    _ticket: PhantomData<fn() -> T>,
}

impl<T: Ticket> RegistryClient<T> {
    pub fn new(
        addr: impl Into<String>,
        request_timeout: Duration,
        pacemaker: Option<Arc<Pacemaker>>,
    ) -> Self {
        Self {
            client: RpcClient::new(addr, request_timeout, pacemaker),
            _ticket: PhantomData,
        }
    }

    pub fn connect(&self) {
        self.client.connect();
    }

    pub async fn disconnect(&self) {
        self.client.disconnect().await;
    }

    /// The underlying RPC client.
    pub fn rpc(&self) -> &RpcClient {
        &self.client
    }

    pub fn connect_uri(&self) -> &str {
        self.client.connect_uri()
    }

    pub fn is_available(&self) -> bool {
        self.client.is_available()
    }

    /// Stores a new ticket. Fails with `-32502` if the id is taken.
    pub async fn add_ticket(&self, ticket: &T) -> Result<()> {
        let params = json!({ TICKET_ID: ticket.id(), TICKET: encode_ticket(ticket)? });
        self.client.call(ADD_TICKET, params).await?;
        Ok(())
    }

    /// Stores a ticket, replacing any previous version.
    pub async fn update_ticket(&self, ticket: &T) -> Result<()> {
        let params = json!({ TICKET_ID: ticket.id(), TICKET: encode_ticket(ticket)? });
        self.client.call(UPDATE_TICKET, params).await?;
        Ok(())
    }

    /// Removes a ticket. Removing an unknown id succeeds.
    pub async fn delete_ticket(&self, ticket_id: &str) -> Result<()> {
        self.client
            .call(DELETE_TICKET, json!({ TICKET_ID: ticket_id }))
            .await?;
        Ok(())
    }

    /// Fetches a ticket. Fails with `-32503` if it is unknown.
    pub async fn get_ticket(&self, ticket_id: &str) -> Result<T> {
        let result = self
            .client
            .call(GET_TICKET, json!({ TICKET_ID: ticket_id }))
            .await?;

        let encoded = result
            .get(TICKET)
            .and_then(Value::as_str)
            .ok_or_else(|| TicketMeshError::Rpc(JsonRpcError::extract_ticket_error()))?;
        decode_ticket(encoded)
    }

    /// Fetches every ticket held by the provider.
    pub async fn get_tickets(&self) -> Result<Vec<T>> {
        let result = self.client.call(GET_TICKETS, json!({})).await?;

        let encoded = result
            .get(TICKETS)
            .and_then(Value::as_array)
            .ok_or_else(|| TicketMeshError::Rpc(JsonRpcError::extract_ticket_error()))?;

        encoded
            .iter()
            .map(|item| match item.as_str() {
                Some(encoded) => decode_ticket(encoded),
                None => Err(TicketMeshError::Rpc(JsonRpcError::extract_ticket_error())),
            })
            .collect()
    }

    /// Asks the provider for its identity.
    pub async fn identify(&self) -> Result<String> {
        let result = self.client.call(GET_PROVIDER_ID, json!({})).await?;

        result
            .get(PROVIDER_ID)
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| TicketMeshError::Rpc(JsonRpcError::internal_error()))
    }
}
