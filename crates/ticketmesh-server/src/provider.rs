use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ticketmesh_common::protocol::error::Result;
use tracing::info;

use crate::dispatch::MethodStats;
use crate::methods::{provider_methods, ProviderState};
use crate::server::RpcServer;

/// A ticket provider: the RPC server bound to one node's ticket store.
pub struct ProviderServer {
    provider_id: String,
    ticket_count: Arc<AtomicUsize>,
    server: RpcServer<ProviderState>,
}

impl ProviderServer {
    /// Binds a provider with an empty store.
    ///
    /// # Arguments
    /// * `bind_addr` - The address to listen on (e.g., "0.0.0.0:7001")
    /// * `provider_id` - Identity returned by `cas.getProviderId`
    pub async fn bind(bind_addr: &str, provider_id: impl Into<String>) -> Result<Self> {
        let provider_id = provider_id.into();
        let state = ProviderState::new(provider_id.clone());
        let ticket_count = state.store.len_handle();

        let server = RpcServer::bind(bind_addr, provider_methods()?, state).await?;
        info!(%provider_id, "Provider bound to {}", server.local_addr());

        Ok(Self {
            provider_id,
            ticket_count,
            server,
        })
    }

    pub fn start(&mut self) -> Result<()> {
        self.server.start()
    }

    /// Stops the provider. Idempotent.
    pub async fn stop(&mut self) {
        self.server.stop().await;
    }

    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.server.local_addr()
    }

    pub fn is_running(&self) -> bool {
        self.server.is_running()
    }

    /// Number of tickets currently held.
    pub fn ticket_count(&self) -> usize {
        self.ticket_count.load(Ordering::Acquire)
    }

    pub fn method_stats(&self) -> &MethodStats {
        self.server.method_stats()
    }
}
