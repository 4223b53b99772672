use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ticketmesh_common::protocol::error::{Result, TicketMeshError};
use ticketmesh_common::Peer;
use tracing::{debug, info};

use crate::config::HeartbeatConfig;
use crate::watchdog::Watchdog;

/// Heartbeat coordinator.
///
/// Owns a fixed set of [`Watchdog`] workers and the live set of monitored
/// peers. Every change to the set is followed by a rebalance that deals the
/// peers round-robin across the workers.
pub struct Pacemaker {
    workers: Vec<Watchdog>,
    clients: Mutex<Vec<Arc<Peer>>>,
}

impl Pacemaker {
    /// Starts `workers` watchdogs.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// At least one worker is required.
    pub fn new(config: HeartbeatConfig, workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(TicketMeshError::InvalidConfig(
                "pacemaker needs at least one watchdog worker".into(),
            ));
        }

        info!(
            workers,
            interval_ms = config.interval.as_millis() as u64,
            timeout_ms = config.timeout.as_millis() as u64,
            "Starting pacemaker"
        );

        let workers = (0..workers).map(|_| Watchdog::spawn(config.clone())).collect();
        Ok(Self {
            workers,
            clients: Mutex::new(Vec::new()),
        })
    }

    fn clients(&self) -> MutexGuard<'_, Vec<Arc<Peer>>> {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Starts monitoring `peer`. Returns false if it was already monitored.
    pub fn add_client(&self, peer: Arc<Peer>) -> bool {
        let mut clients = self.clients();
        if clients.iter().any(|known| Arc::ptr_eq(known, &peer)) {
            return false;
        }

        debug!(addr = peer.addr(), "Monitoring peer");
        clients.push(peer);
        self.rebalance(&clients);
        true
    }

    /// Stops monitoring `peer`. Returns false if it was not monitored.
    pub fn remove_client(&self, peer: &Arc<Peer>) -> bool {
        let mut clients = self.clients();
        let Some(index) = clients.iter().position(|known| Arc::ptr_eq(known, peer)) else {
            return false;
        };

        debug!(addr = peer.addr(), "No longer monitoring peer");
        clients.remove(index);
        self.rebalance(&clients);
        true
    }

    /// Deals `clients` round-robin across the workers.
    fn rebalance(&self, clients: &[Arc<Peer>]) {
        let count = self.workers.len();
        for (index, worker) in self.workers.iter().enumerate() {
            let shard = clients
                .iter()
                .skip(index)
                .step_by(count)
                .cloned()
                .collect();
            worker.set_clients(shard);
        }
    }

    pub fn client_count(&self) -> usize {
        self.clients().len()
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Number of peers assigned to each worker.
    pub fn shard_sizes(&self) -> Vec<usize> {
        self.workers.iter().map(Watchdog::client_count).collect()
    }

    /// Stops every watchdog. Idempotent.
    pub async fn shutdown(&self) {
        futures::future::join_all(self.workers.iter().map(|worker| worker.stop())).await;
        debug!("Pacemaker stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config() -> HeartbeatConfig {
        HeartbeatConfig::new(Duration::from_secs(60), Duration::from_millis(200))
    }

    fn peer(port: u16) -> Arc<Peer> {
        Arc::new(Peer::new(format!("127.0.0.1:{}", port)))
    }

    #[tokio::test]
    async fn test_zero_workers_rejected() {
        assert!(matches!(
            Pacemaker::new(config(), 0),
            Err(TicketMeshError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_add_and_remove_clients() {
        let pacemaker = Pacemaker::new(config(), 1).unwrap();
        let a = peer(1);
        let b = peer(2);

        assert!(pacemaker.add_client(a.clone()));
        assert!(pacemaker.add_client(b.clone()));
        assert!(!pacemaker.add_client(a.clone()));
        assert_eq!(pacemaker.client_count(), 2);
        assert_eq!(pacemaker.shard_sizes(), vec![2]);

        assert!(pacemaker.remove_client(&a));
        assert!(!pacemaker.remove_client(&a));
        assert_eq!(pacemaker.client_count(), 1);
        assert_eq!(pacemaker.shard_sizes(), vec![1]);

        pacemaker.shutdown().await;
    }

    #[tokio::test]
    async fn test_same_address_tracked_separately() {
        let pacemaker = Pacemaker::new(config(), 1).unwrap();
        assert!(pacemaker.add_client(peer(1)));
        assert!(pacemaker.add_client(peer(1)));
        assert_eq!(pacemaker.client_count(), 2);
        pacemaker.shutdown().await;
    }

    #[tokio::test]
    async fn test_rebalance_covers_every_client() {
        let pacemaker = Pacemaker::new(config(), 3).unwrap();
        assert_eq!(pacemaker.worker_count(), 3);

        let peers: Vec<_> = (1..=7).map(peer).collect();
        for p in &peers {
            pacemaker.add_client(p.clone());
        }

        let sizes = pacemaker.shard_sizes();
        assert_eq!(sizes.iter().sum::<usize>(), 7);
        assert_eq!(sizes, vec![3, 2, 2]);

        pacemaker.remove_client(&peers[0]);
        pacemaker.remove_client(&peers[1]);
        let sizes = pacemaker.shard_sizes();
        assert_eq!(sizes.iter().sum::<usize>(), 5);
        assert!(sizes.iter().max().unwrap() - sizes.iter().min().unwrap() <= 1);

        pacemaker.shutdown().await;
    }

    #[tokio::test]
    async fn test_fewer_clients_than_workers() {
        let pacemaker = Pacemaker::new(config(), 4).unwrap();
        pacemaker.add_client(peer(1));
        assert_eq!(pacemaker.shard_sizes(), vec![1, 0, 0, 0]);
        pacemaker.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let pacemaker = Pacemaker::new(config(), 2).unwrap();
        pacemaker.shutdown().await;
        pacemaker.shutdown().await;
    }
}
