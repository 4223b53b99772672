use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use ticketmesh_common::transport::{is_ping, ReqSocket, PING};
use ticketmesh_common::Peer;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, trace};

use crate::config::HeartbeatConfig;

type Shard = Arc<Mutex<Vec<Arc<Peer>>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Heartbeat worker.
///
/// Pings every peer of its shard once per interval over a socket of its own,
/// and records the outcome on the shared [`Peer`]. A peer that misses the
/// timeout is marked unavailable and its socket is discarded; the next round
/// reconnects.
pub struct Watchdog {
    shard: Shard,
    shutdown_tx: mpsc::Sender<()>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Watchdog {
    /// Starts a watchdog with an empty shard.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(config: HeartbeatConfig) -> Self {
        let shard = Shard::default();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let handle = tokio::spawn(run(config, shard.clone(), shutdown_rx));

        Self {
            shard,
            shutdown_tx,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Replaces the monitored peers.
    ///
    /// Takes effect from the next heartbeat round; a round in progress keeps
    /// the set it started with.
    pub fn set_clients(&self, peers: Vec<Arc<Peer>>) {
        *lock(&self.shard) = peers;
    }

    /// Number of peers in this watchdog's shard.
    pub fn client_count(&self) -> usize {
        lock(&self.shard).len()
    }

    pub fn is_running(&self) -> bool {
        lock(&self.handle)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stops the heartbeat loop and waits for it to exit. Idempotent.
    pub async fn stop(&self) {
        let handle = lock(&self.handle).take();
        let Some(handle) = handle else {
            return;
        };

        let _ = self.shutdown_tx.try_send(());
        if let Err(e) = handle.await {
            error!("Watchdog task failed: {}", e);
        }
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.handle).take() {
            handle.abort();
        }
    }
}

async fn run(config: HeartbeatConfig, shard: Shard, mut shutdown_rx: mpsc::Receiver<()>) {
    let mut sockets: Vec<(Arc<Peer>, ReqSocket)> = Vec::new();

    loop {
        tokio::select! {
            biased;

            _ = shutdown_rx.recv() => break,
            _ = tokio::time::sleep(config.interval) => {}
        }

        let peers = lock(&shard).clone();
        sync_sockets(&mut sockets, peers);
        if sockets.is_empty() {
            continue;
        }

        let round = futures::future::join_all(
            sockets
                .iter_mut()
                .map(|(peer, socket)| check_peer(peer, socket, config.timeout)),
        );

        tokio::select! {
            biased;

            _ = shutdown_rx.recv() => break,
            _ = round => {}
        }
    }

    debug!("Watchdog stopped");
}

/// Aligns the socket list with the current shard, keeping sockets of peers
/// that are still monitored.
fn sync_sockets(sockets: &mut Vec<(Arc<Peer>, ReqSocket)>, peers: Vec<Arc<Peer>>) {
    let mut previous = std::mem::take(sockets);

    for peer in peers {
        let socket = match previous.iter().position(|(known, _)| Arc::ptr_eq(known, &peer)) {
            Some(index) => previous.swap_remove(index).1,
            None => ReqSocket::new(peer.addr()),
        };
        sockets.push((peer, socket));
    }
}

async fn check_peer(peer: &Peer, socket: &mut ReqSocket, timeout: Duration) {
    let started = Instant::now();

    match tokio::time::timeout(timeout, socket.request(&PING)).await {
        Ok(Ok(reply)) if is_ping(&reply) => {
            let elapsed = started.elapsed().as_millis() as u64;
            trace!(addr = peer.addr(), elapsed, "Heartbeat answered");
            peer.record_response_time(elapsed);
            peer.set_available(true);
        }
        Ok(Ok(_)) => {
            debug!(addr = peer.addr(), "Unexpected heartbeat reply");
            peer.set_available(false);
            socket.reset();
        }
        Ok(Err(e)) => {
            debug!(addr = peer.addr(), "Heartbeat failed: {}", e);
            peer.set_available(false);
            socket.reset();
        }
        Err(_) => {
            debug!(addr = peer.addr(), "Heartbeat timed out");
            peer.set_available(false);
            socket.reset();
        }
    }
}
