use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ticketmesh_client::Ticket;
use ticketmesh_common::protocol::error::Result;
use ticketmesh_heartbeat::Pacemaker;
use ticketmesh_server::ProviderServer;
use tracing::{info, warn};

use crate::broker::RegistryBroker;
use crate::config::RegistryConfig;

/// A running registry node.
///
/// Bundles the local provider server, the heartbeat pacemaker and the broker
/// in front of them, and exposes the ticket operations the host calls.
pub struct TicketRegistry<T> {
    provider_id: String,
    local_addr: SocketAddr,
    provider: Mutex<Option<ProviderServer>>,
    pacemaker: Arc<Pacemaker>,
    broker: RegistryBroker<T>,
}

impl<T: Ticket> TicketRegistry<T> {
    /// Starts a node.
    ///
    /// The local provider is started first so that the broker can find it
    /// among the peers. A failed bootstrap is logged and the node starts with
    /// whatever the local store holds.
    ///
    /// # Errors
    ///
    /// Invalid configuration, a bind failure, or no peer identifying as this
    /// node. Anything started before the failure is stopped again.
    pub async fn start(config: RegistryConfig) -> Result<Self> {
        config.validate()?;

        let mut provider = ProviderServer::bind(&config.bind_addr, config.provider_id.clone()).await?;
        provider.start()?;
        let local_addr = provider.local_addr();

        let pacemaker = match Pacemaker::new(config.heartbeat.clone(), config.watchdog_workers) {
            Ok(pacemaker) => Arc::new(pacemaker),
            Err(e) => {
                provider.stop().await;
                return Err(e);
            }
        };

        let broker = match RegistryBroker::new(
            &config.peers,
            &config.provider_id,
            config.request_timeout,
            pacemaker.clone(),
        )
        .await
        {
            Ok(broker) => broker,
            Err(e) => {
                pacemaker.shutdown().await;
                provider.stop().await;
                return Err(e);
            }
        };

        if let Err(e) = broker.bootstrap().await {
            warn!("Starting without bootstrap: {}", e);
        }

        info!(
            provider_id = %config.provider_id,
            %local_addr,
            bootstrapped = broker.is_bootstrapped(),
            "Ticket registry started"
        );

        Ok(Self {
            provider_id: config.provider_id,
            local_addr,
            provider: Mutex::new(Some(provider)),
            pacemaker,
            broker,
        })
    }

    fn provider(&self) -> MutexGuard<'_, Option<ProviderServer>> {
        self.provider.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub async fn add_ticket(&self, ticket: &T) {
        self.broker.add_ticket(ticket).await;
    }

    pub async fn update_ticket(&self, ticket: &T) {
        self.broker.update_ticket(ticket).await;
    }

    /// Returns true when the local provider acknowledged the removal.
    pub async fn delete_ticket(&self, ticket_id: &str) -> bool {
        self.broker.delete_ticket(ticket_id).await
    }

    pub async fn get_ticket(&self, ticket_id: &str) -> Option<T> {
        self.broker.get_ticket(ticket_id).await
    }

    pub async fn get_tickets(&self) -> Vec<T> {
        self.broker.get_tickets().await
    }

    /// Identity reported by the local provider.
    pub async fn identify(&self) -> Result<String> {
        self.broker.identify().await
    }

    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    /// Address the local provider is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn broker(&self) -> &RegistryBroker<T> {
        &self.broker
    }

    pub fn pacemaker(&self) -> &Pacemaker {
        &self.pacemaker
    }

    /// Tickets held by the local store, zero once shut down.
    pub fn ticket_count(&self) -> usize {
        self.provider()
            .as_ref()
            .map_or(0, ProviderServer::ticket_count)
    }

    pub fn is_running(&self) -> bool {
        self.provider()
            .as_ref()
            .is_some_and(ProviderServer::is_running)
    }

    /// Stops the local provider and every watchdog. Idempotent.
    pub async fn shutdown(&self) {
        let provider = self.provider().take();
        let Some(mut provider) = provider else {
            return;
        };

        self.broker.disconnect().await;
        self.pacemaker.shutdown().await;
        provider.stop().await;
        info!(provider_id = %self.provider_id, "Ticket registry stopped");
    }
}
