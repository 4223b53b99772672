use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use ticketmesh_client::{RegistryClient, Ticket};
use ticketmesh_common::protocol::error::{Result, TicketMeshError};
use ticketmesh_common::protocol::jsonrpc::MISSING_TICKET;
use ticketmesh_heartbeat::Pacemaker;
use tracing::{debug, error, info, warn};

/// Replicating front of the ticket registry.
///
/// Writes go to every provider currently marked available, the local one
/// included, on a best-effort basis. Reads are served by the local provider
/// only; other providers are read from during [`bootstrap`](Self::bootstrap)
/// and never afterwards.
pub struct RegistryBroker<T> {
    providers: Vec<RegistryClient<T>>,
    local: usize,
    bootstrapped: AtomicBool,
}

impl<T: Ticket> RegistryBroker<T> {
    /// Connects to every provider and finds the local one.
    ///
    /// Each provider is asked for its identity; the one answering with
    /// `local_provider_id` becomes the local provider.
    ///
    /// # Errors
    ///
    /// [`TicketMeshError::LocalProviderNotFound`] when no provider identifies
    /// as `local_provider_id`. Every client created so far is disconnected
    /// first.
    pub async fn new(
        addresses: &[String],
        local_provider_id: &str,
        request_timeout: Duration,
        pacemaker: Arc<Pacemaker>,
    ) -> Result<Self> {
        let providers: Vec<RegistryClient<T>> = addresses
            .iter()
            .map(|addr| RegistryClient::new(addr.clone(), request_timeout, Some(pacemaker.clone())))
            .collect();

        for provider in &providers {
            provider.connect();
        }

        let identities = join_all(providers.iter().map(|provider| provider.identify())).await;

        let mut local = None;
        for (index, (provider, identity)) in providers.iter().zip(identities).enumerate() {
            match identity {
                Ok(id) if id == local_provider_id => {
                    if local.is_none() {
                        local = Some(index);
                    }
                }
                Ok(id) => debug!(addr = provider.connect_uri(), provider_id = %id, "Found remote provider"),
                Err(e) => error!(addr = provider.connect_uri(), "Failed to identify provider: {}", e),
            }
        }

        let Some(local) = local else {
            for provider in &providers {
                provider.disconnect().await;
            }
            return Err(TicketMeshError::LocalProviderNotFound(providers.len()));
        };

        info!(
            addr = providers[local].connect_uri(),
            providers = providers.len(),
            "Local provider found"
        );

        Ok(Self {
            providers,
            local,
            bootstrapped: AtomicBool::new(false),
        })
    }

    fn local_provider(&self) -> &RegistryClient<T> {
        &self.providers[self.local]
    }

    fn available_providers(&self) -> impl Iterator<Item = &RegistryClient<T>> {
        self.providers.iter().filter(|provider| provider.is_available())
    }

    /// Seeds the local provider with the tickets of the first remote
    /// provider that can list them.
    ///
    /// Unavailable providers are skipped. A provider whose listing fails is
    /// skipped as well; a ticket that cannot be stored locally aborts the
    /// whole bootstrap.
    ///
    /// # Errors
    ///
    /// [`TicketMeshError::Bootstrap`] if no remote provider could be listed or
    /// a ticket could not be stored locally.
    pub async fn bootstrap(&self) -> Result<()> {
        let local = self.local_provider();

        for (index, provider) in self.providers.iter().enumerate() {
            if index == self.local {
                continue;
            }
            if !provider.is_available() {
                debug!(addr = provider.connect_uri(), "Skipping unavailable provider");
                continue;
            }

            let tickets = match provider.get_tickets().await {
                Ok(tickets) => tickets,
                Err(e) => {
                    warn!(addr = provider.connect_uri(), "Failed to list tickets: {}", e);
                    continue;
                }
            };

            info!(
                addr = provider.connect_uri(),
                tickets = tickets.len(),
                "Bootstrapping from provider"
            );

            for ticket in &tickets {
                local.add_ticket(ticket).await.map_err(|e| {
                    TicketMeshError::Bootstrap(format!(
                        "could not store ticket {} locally: {}",
                        ticket.id(),
                        e
                    ))
                })?;
            }

            self.bootstrapped.store(true, Ordering::Release);
            return Ok(());
        }

        Err(TicketMeshError::Bootstrap(
            "no provider could be bootstrapped from".into(),
        ))
    }

    /// Adds a ticket on every available provider.
    pub async fn add_ticket(&self, ticket: &T) {
        debug!(ticket_id = ticket.id(), "Adding ticket");

        let calls = self
            .available_providers()
            .map(|provider| async move { (provider, provider.add_ticket(ticket).await) });

        for (provider, result) in join_all(calls).await {
            if let Err(e) = result {
                error!(addr = provider.connect_uri(), ticket_id = ticket.id(), "addTicket error: {}", e);
            }
        }
    }

    /// Adds or replaces a ticket on every available provider.
    pub async fn update_ticket(&self, ticket: &T) {
        debug!(ticket_id = ticket.id(), "Updating ticket");

        let calls = self
            .available_providers()
            .map(|provider| async move { (provider, provider.update_ticket(ticket).await) });

        for (provider, result) in join_all(calls).await {
            if let Err(e) = result {
                error!(addr = provider.connect_uri(), ticket_id = ticket.id(), "updateTicket error: {}", e);
            }
        }
    }

    /// Removes a ticket from every available provider.
    ///
    /// Returns true when the local provider acknowledged the removal.
    pub async fn delete_ticket(&self, ticket_id: &str) -> bool {
        debug!(ticket_id, "Deleting ticket");

        let local = self.local_provider();
        let calls = self
            .available_providers()
            .map(|provider| async move { (provider, provider.delete_ticket(ticket_id).await) });

        let mut removed_locally = false;
        for (provider, result) in join_all(calls).await {
            match result {
                Ok(()) if std::ptr::eq(provider, local) => removed_locally = true,
                Ok(()) => {}
                Err(e) => error!(addr = provider.connect_uri(), ticket_id, "deleteTicket error: {}", e),
            }
        }
        removed_locally
    }

    /// Looks a ticket up in the local provider.
    ///
    /// Any failure is reported as an absent ticket.
    pub async fn get_ticket(&self, ticket_id: &str) -> Option<T> {
        match self.local_provider().get_ticket(ticket_id).await {
            Ok(ticket) => Some(ticket),
            Err(e) if e.code() == Some(MISSING_TICKET) => {
                debug!(ticket_id, "Missing ticket");
                None
            }
            Err(e) => {
                error!(ticket_id, "getTicket error: {}", e);
                None
            }
        }
    }

    /// Every ticket held by the local provider; empty on failure.
    pub async fn get_tickets(&self) -> Vec<T> {
        match self.local_provider().get_tickets().await {
            Ok(tickets) => tickets,
            Err(e) => {
                error!("getTickets error: {}", e);
                Vec::new()
            }
        }
    }

    /// Identity of the local provider.
    pub async fn identify(&self) -> Result<String> {
        self.local_provider().identify().await
    }

    pub fn is_bootstrapped(&self) -> bool {
        self.bootstrapped.load(Ordering::Acquire)
    }

    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// Provider clients in configuration order.
    pub fn providers(&self) -> &[RegistryClient<T>] {
        &self.providers
    }

    pub fn local_provider_addr(&self) -> &str {
        self.local_provider().connect_uri()
    }

    /// Disconnects every provider client.
    pub async fn disconnect(&self) {
        join_all(self.providers.iter().map(|provider| provider.disconnect())).await;
    }
}
