//! Router-based JSON-RPC server.
//!
//! The server owns a [`RouterSocket`], a [`DispatchTable`] and the state the
//! handlers operate on. A single event loop task multiplexes two inputs:
//!
//! - a private control channel, whose first message stops the loop
//! - the router socket, whose frames are pings or JSON-RPC requests
//!
//! Requests are handled in-line, one at a time, so the state needs no locking.
//!
//! # Example
//!
//! ```no_run
//! use ticketmesh_server::{DispatchTable, RpcServer};
//! use serde_json::json;
//!
//! # async fn run() -> ticketmesh_common::protocol::Result<()> {
//! let methods = DispatchTable::new()
//!     .with_method("demo.count", |count: &mut u64, _| {
//!         *count += 1;
//!         Ok(json!({"count": *count}))
//!     })?;
//!
//! let mut server = RpcServer::bind("127.0.0.1:7001", methods, 0u64).await?;
//! server.start()?;
//! // ...
//! server.stop().await;
//! # Ok(())
//! # }
//! ```

use std::mem;
use std::net::SocketAddr;

use ticketmesh_common::protocol::error::{Result, TicketMeshError};
use ticketmesh_common::protocol::{JsonRpcError, JsonRpcResponse};
use ticketmesh_common::transport::{is_ping, Envelope, JsonCodec, RouterSocket};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace};

use crate::dispatch::{DispatchTable, MethodStats};

enum ServerState<S> {
    Bound {
        socket: RouterSocket,
        methods: DispatchTable<S>,
        state: S,
        shutdown_rx: mpsc::Receiver<()>,
    },
    Running(JoinHandle<()>),
    Stopped,
}

/// JSON-RPC server over a router socket.
pub struct RpcServer<S> {
    local_addr: SocketAddr,
    stats: MethodStats,
    shutdown_tx: mpsc::Sender<()>,
    state: ServerState<S>,
}

impl<S: Send + 'static> RpcServer<S> {
    /// Binds the server socket without starting the event loop.
    ///
    /// Clients may connect straight away; their requests are queued until
    /// [`start`](Self::start) is called.
    pub async fn bind(bind_addr: &str, methods: DispatchTable<S>, state: S) -> Result<Self> {
        let socket = RouterSocket::bind(bind_addr).await?;
        let local_addr = socket.local_addr();
        let stats = methods.stats();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        Ok(Self {
            local_addr,
            stats,
            shutdown_tx,
            state: ServerState::Bound {
                socket,
                methods,
                state,
                shutdown_rx,
            },
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Per-method call counters.
    pub fn method_stats(&self) -> &MethodStats {
        &self.stats
    }

    pub fn is_running(&self) -> bool {
        matches!(&self.state, ServerState::Running(handle) if !handle.is_finished())
    }

    /// Spawns the event loop.
    ///
    /// # Errors
    ///
    /// A server can only be started once.
    pub fn start(&mut self) -> Result<()> {
        match mem::replace(&mut self.state, ServerState::Stopped) {
            ServerState::Bound {
                socket,
                methods,
                state,
                shutdown_rx,
            } => {
                info!("RPC server listening on {}", self.local_addr);
                let handle = tokio::spawn(run_event_loop(socket, methods, state, shutdown_rx));
                self.state = ServerState::Running(handle);
                Ok(())
            }
            running @ ServerState::Running(_) => {
                self.state = running;
                Err(TicketMeshError::Transport(format!(
                    "server on {} is already running",
                    self.local_addr
                )))
            }
            ServerState::Stopped => Err(TicketMeshError::Transport(format!(
                "server on {} has been stopped",
                self.local_addr
            ))),
        }
    }

    /// Stops the event loop and releases the socket.
    ///
    /// Returns once the port is free. Calling it again is a no-op.
    pub async fn stop(&mut self) {
        match mem::replace(&mut self.state, ServerState::Stopped) {
            ServerState::Running(handle) => {
                // A full channel means a stop is already pending.
                let _ = self.shutdown_tx.try_send(());
                if let Err(e) = handle.await {
                    error!("RPC server event loop failed: {}", e);
                }
            }
            ServerState::Bound { socket, .. } => socket.close().await,
            ServerState::Stopped => {}
        }
    }
}

impl<S> Drop for RpcServer<S> {
    fn drop(&mut self) {
        if let ServerState::Running(handle) = &self.state {
            handle.abort();
        }
    }
}

async fn run_event_loop<S>(
    mut socket: RouterSocket,
    methods: DispatchTable<S>,
    mut state: S,
    mut shutdown_rx: mpsc::Receiver<()>,
) {
    loop {
        tokio::select! {
            biased;

            _ = shutdown_rx.recv() => {
                debug!("Shutdown requested");
                break;
            }
            envelope = socket.recv() => {
                let Some(Envelope { identity, payload }) = envelope else {
                    break;
                };

                if let Some(reply) = handle_frame(&methods, &mut state, payload) {
                    socket.send(identity, reply);
                }
            }
        }
    }

    let local_addr = socket.local_addr();
    socket.close().await;
    info!("RPC server on {} stopped", local_addr);
}

/// Produces the reply frame for one inbound frame, if any.
fn handle_frame<S>(methods: &DispatchTable<S>, state: &mut S, payload: Vec<u8>) -> Option<Vec<u8>> {
    if is_ping(&payload) {
        trace!("Heartbeat");
        return Some(payload);
    }

    let response = match JsonCodec::decode_request(&payload) {
        Ok(request) => {
            let outcome = match request.named_params() {
                Some(params) => methods.dispatch(state, &request.method, params),
                None => Err(JsonRpcError::invalid_request()),
            };

            // A notification is answered only when it fails, with a null id.
            if request.is_notification() && outcome.is_ok() {
                return None;
            }

            match outcome {
                Ok(result) => JsonRpcResponse::success(request.id, result),
                Err(e) => {
                    debug!(method = %request.method, "Request failed: {}", e);
                    JsonRpcResponse::error(request.id, e)
                }
            }
        }
        Err(rejected) => {
            debug!("Rejected request: {}", rejected.error);
            rejected.into_response()
        }
    };

    match JsonCodec::encode_response(&response) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            error!("Failed to encode response: {}", e);
            None
        }
    }
}
