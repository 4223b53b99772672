use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, warn};

use crate::protocol::error::{Result, TicketMeshError};
use crate::transport::frame::{read_frame, write_frame};

/// Inbound frames buffered before connection readers apply backpressure.
const INBOUND_QUEUE_DEPTH: usize = 1024;

static NEXT_IDENTITY: AtomicU64 = AtomicU64::new(1);

/// Opaque identity of one connected sender.
///
/// Identities are unique for the lifetime of the process and are never reused,
/// so a late reply can never reach a different client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerIdentity(u64);

impl PeerIdentity {
    fn next() -> Self {
        PeerIdentity(NEXT_IDENTITY.fetch_add(1, Ordering::Relaxed))
    }
}

/// One inbound frame tagged with the identity of its sender.
#[derive(Debug)]
pub struct Envelope {
    pub identity: PeerIdentity,
    pub payload: Vec<u8>,
}

type Routes = Arc<Mutex<HashMap<PeerIdentity, mpsc::UnboundedSender<Vec<u8>>>>>;

fn lock_routes(routes: &Routes) -> MutexGuard<'_, HashMap<PeerIdentity, mpsc::UnboundedSender<Vec<u8>>>> {
    routes.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Multiplexed server socket.
///
/// Accepts any number of connections and funnels their frames into a single
/// queue read with [`recv`](Self::recv). Replies are routed back with
/// [`send`](Self::send) to the identity the request came from, in any order.
///
/// The listener is bound when the socket is constructed, so clients may
/// connect as soon as `bind` returns.
pub struct RouterSocket {
    local_addr: SocketAddr,
    inbound: mpsc::Receiver<Envelope>,
    routes: Routes,
    acceptor: JoinHandle<()>,
}

impl RouterSocket {
    /// Binds a new router socket.
    ///
    /// # Arguments
    /// * `bind_addr` - The address to bind to (e.g., "0.0.0.0:7001")
    pub async fn bind(bind_addr: &str) -> Result<Self> {
        let listener = TcpListener::bind(bind_addr)
            .await
            .map_err(|e| TicketMeshError::Connection(format!("Failed to bind to {}: {}", bind_addr, e)))?;

        let local_addr = listener
            .local_addr()
            .map_err(|e| TicketMeshError::Connection(format!("Failed to get local addr: {}", e)))?;

        let (tx, rx) = mpsc::channel(INBOUND_QUEUE_DEPTH);
        let routes = Routes::default();
        let acceptor = tokio::spawn(accept_loop(listener, tx, routes.clone()));

        Ok(Self {
            local_addr,
            inbound: rx,
            routes,
            acceptor,
        })
    }

    /// Gets the actual bound address.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Waits for the next inbound frame.
    ///
    /// Cancel safe. Returns `None` only once the acceptor has gone away.
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.inbound.recv().await
    }

    /// Queues a reply for the connection identified by `identity`.
    ///
    /// Returns false when that connection has already closed; the reply is dropped.
    pub fn send(&self, identity: PeerIdentity, payload: Vec<u8>) -> bool {
        let routes = lock_routes(&self.routes);
        match routes.get(&identity) {
            Some(outbound) => outbound.send(payload).is_ok(),
            None => {
                debug!(?identity, "Dropping reply for closed connection");
                false
            }
        }
    }

    /// Number of currently connected senders.
    pub fn connection_count(&self) -> usize {
        lock_routes(&self.routes).len()
    }

    /// Closes the listener and every connection, waiting until the port is released.
    pub async fn close(mut self) {
        self.acceptor.abort();
        let _ = (&mut self.acceptor).await;
    }
}

impl Drop for RouterSocket {
    fn drop(&mut self) {
        self.acceptor.abort();
        lock_routes(&self.routes).clear();
    }
}

/// Accepts connections until aborted.
///
/// Connection tasks live in a `JoinSet` owned by this task, so aborting the
/// acceptor tears every connection down with it.
async fn accept_loop(listener: TcpListener, inbound: mpsc::Sender<Envelope>, routes: Routes) {
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer_addr)) => {
                    let identity = PeerIdentity::next();
                    debug!(%peer_addr, ?identity, "Connection established");

                    let (tx, rx) = mpsc::unbounded_channel();
                    lock_routes(&routes).insert(identity, tx);
                    connections.spawn(handle_connection(
                        stream,
                        identity,
                        inbound.clone(),
                        rx,
                        routes.clone(),
                    ));
                }
                Err(e) => {
                    warn!("Failed to accept connection: {}", e);
                    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                }
            },
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
        }
    }
}

/// Pumps frames of one connection in both directions until either side closes.
async fn handle_connection(
    stream: TcpStream,
    identity: PeerIdentity,
    inbound: mpsc::Sender<Envelope>,
    mut outbound: mpsc::UnboundedReceiver<Vec<u8>>,
    routes: Routes,
) {
    let _ = stream.set_nodelay(true);
    let (mut reader, mut writer) = stream.into_split();

    let read_side = async {
        loop {
            match read_frame(&mut reader).await {
                Ok(payload) => {
                    if inbound.send(Envelope { identity, payload }).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    debug!(?identity, "Connection closed: {}", e);
                    break;
                }
            }
        }
    };

    let write_side = async {
        while let Some(payload) = outbound.recv().await {
            if let Err(e) = write_frame(&mut writer, &payload).await {
                debug!(?identity, "Failed to send reply: {}", e);
                break;
            }
        }
    };

    tokio::select! {
        _ = read_side => {}
        _ = write_side => {}
    }

    lock_routes(&routes).remove(&identity);
}
