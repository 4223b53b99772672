use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use ticketmesh_common::protocol::error::{Result, TicketMeshError};
use ticketmesh_common::protocol::JsonRpcRequest;
use ticketmesh_common::transport::{JsonCodec, ReqSocket};
use ticketmesh_common::Peer;
use ticketmesh_heartbeat::Pacemaker;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// JSON-RPC client for a single provider.
///
/// Holds one persistent request/response socket. Concurrent callers are
/// serialized so that only one call is in flight at a time; a call that gets
/// no reply within the request timeout discards the socket and fails with
/// `-32300`.
pub struct RpcClient {
    peer: Arc<Peer>,
    socket: Mutex<ReqSocket>,
    next_id: AtomicU64,
    connected: AtomicBool,
    request_timeout: Duration,
    pacemaker: Option<Arc<Pacemaker>>,
}

impl RpcClient {
    /// Creates a client for `addr`. Nothing is sent until the first call.
    ///
    /// # Arguments
    /// * `addr` - The provider address (e.g., "10.0.0.2:7001")
    /// * `request_timeout` - How long a call waits for its reply
    /// * `pacemaker` - Heartbeat coordinator to register with on connect
    pub fn new(
        addr: impl Into<String>,
        request_timeout: Duration,
        pacemaker: Option<Arc<Pacemaker>>,
    ) -> Self {
        let addr = addr.into();
        Self {
            socket: Mutex::new(ReqSocket::new(addr.clone())),
            peer: Arc::new(Peer::new(addr)),
            next_id: AtomicU64::new(1),
            connected: AtomicBool::new(false),
            request_timeout,
            pacemaker,
        }
    }

    /// Opens the client for calls and starts heartbeat monitoring.
    pub fn connect(&self) {
        if self.connected.swap(true, Ordering::AcqRel) {
            return;
        }

        debug!(addr = self.connect_uri(), "Client connected");
        if let Some(pacemaker) = &self.pacemaker {
            pacemaker.add_client(self.peer.clone());
        }
    }

    /// Stops heartbeat monitoring and drops the connection.
    pub async fn disconnect(&self) {
        if !self.connected.swap(false, Ordering::AcqRel) {
            return;
        }

        if let Some(pacemaker) = &self.pacemaker {
            pacemaker.remove_client(&self.peer);
        }
        self.socket.lock().await.reset();
        debug!(addr = self.connect_uri(), "Client disconnected");
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Calls `method` and returns its result.
    ///
    /// # Errors
    ///
    /// - [`TicketMeshError::Timeout`] (`-32300`) if no reply arrives in time
    /// - [`TicketMeshError::Rpc`] carrying the remote error, or `-32700` for
    ///   an unparseable reply
    /// - [`TicketMeshError::Connection`] when the client is not connected or
    ///   the connection broke mid-call
    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        if !self.is_connected() {
            return Err(TicketMeshError::Connection(format!(
                "client for {} is not connected",
                self.connect_uri()
            )));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest::new(json!(id), method, params);
        let payload = JsonCodec::encode_request(&request)?;

        let reply = {
            let mut socket = self.socket.lock().await;
            match tokio::time::timeout(self.request_timeout, socket.request(&payload)).await {
                Ok(Ok(reply)) => reply,
                Ok(Err(e)) => {
                    warn!(addr = self.connect_uri(), method, "Request failed: {}", e);
                    socket.reset();
                    return Err(e);
                }
                Err(_) => {
                    warn!(addr = self.connect_uri(), method, "Request timed out");
                    socket.reset();
                    return Err(TicketMeshError::Timeout(
                        self.request_timeout.as_millis() as u64,
                    ));
                }
            }
        };

        let response = JsonCodec::decode_response(&reply)?;
        if !response.id.is_null() && response.id != json!(id) {
            return Err(TicketMeshError::Transport(format!(
                "reply id {} does not match request id {}",
                response.id, id
            )));
        }

        response.into_result().map_err(TicketMeshError::Rpc)
    }

    /// The provider address this client talks to.
    pub fn connect_uri(&self) -> &str {
        self.peer.addr()
    }

    /// Liveness state shared with the heartbeat watchdog.
    pub fn peer(&self) -> &Arc<Peer> {
        &self.peer
    }

    pub fn is_available(&self) -> bool {
        self.peer.is_available()
    }

    pub fn set_available(&self, available: bool) {
        self.peer.set_available(available);
    }

    /// Round-trip time of the last answered heartbeat.
    pub fn last_response_time(&self) -> Duration {
        Duration::from_millis(self.peer.last_response_time_ms())
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ticketmesh_common::protocol::jsonrpc::{METHOD_NOT_FOUND, PARSE_ERROR, REQUEST_TIMEOUT};
    use ticketmesh_common::transport::{read_frame, write_frame};
    use ticketmesh_server::ProviderServer;
    use tokio::net::TcpListener;

    const TIMEOUT: Duration = Duration::from_millis(1500);

    async fn start_provider() -> ProviderServer {
        let mut provider = ProviderServer::bind("127.0.0.1:0", "client-test").await.unwrap();
        provider.start().unwrap();
        provider
    }

    /// A server that accepts connections and reads frames but never replies.
    async fn silent_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                tokio::spawn(async move { while read_frame(&mut stream).await.is_ok() {} });
            }
        });
        addr
    }

    /// A server that answers every frame with garbage.
    async fn garbage_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                tokio::spawn(async move {
                    while read_frame(&mut stream).await.is_ok() {
                        if write_frame(&mut stream, b"not json").await.is_err() {
                            break;
                        }
                    }
                });
            }
        });
        addr
    }

    #[tokio::test]
    async fn test_client_creation() {
        let client = RpcClient::new("127.0.0.1:7001", TIMEOUT, None);
        assert_eq!(client.connect_uri(), "127.0.0.1:7001");
        assert!(client.is_available());
        assert!(!client.is_connected());
        assert_eq!(client.last_response_time(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_call_requires_connect() {
        let client = RpcClient::new("127.0.0.1:7001", TIMEOUT, None);
        let err = client.call("cas.getTickets", json!({})).await.unwrap_err();
        assert!(matches!(err, TicketMeshError::Connection(_)));
    }

    #[tokio::test]
    async fn test_call_provider() {
        let mut provider = start_provider().await;
        let client = RpcClient::new(provider.local_addr().to_string(), TIMEOUT, None);
        client.connect();

        let result = client.call("cas.getProviderId", json!({})).await.unwrap();
        assert_eq!(result, json!({"provider-id": "client-test"}));

        let err = client.call("cas.nope", json!({})).await.unwrap_err();
        assert_eq!(err.code(), Some(METHOD_NOT_FOUND));

        client.disconnect().await;
        provider.stop().await;
    }

    #[tokio::test]
    async fn test_timeout_recycles_socket() {
        let addr = silent_server().await;
        let client = RpcClient::new(addr, Duration::from_millis(200), None);
        client.connect();

        let err = client.call("cas.getTickets", json!({})).await.unwrap_err();
        assert!(matches!(err, TicketMeshError::Timeout(200)));
        assert_eq!(err.code(), Some(REQUEST_TIMEOUT));

        // The socket was replaced, so the next call is accepted and times out again
        // instead of being refused as a second send.
        let err = client.call("cas.getTickets", json!({})).await.unwrap_err();
        assert!(matches!(err, TicketMeshError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_timeout_then_responsive_provider_succeeds() {
        // Serves one connection at a time and never replies.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let silent = tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                while read_frame(&mut stream).await.is_ok() {}
            }
        });

        let client = RpcClient::new(addr.clone(), Duration::from_millis(200), None);
        client.connect();

        let err = client.call("cas.getTickets", json!({})).await.unwrap_err();
        assert_eq!(err.code(), Some(REQUEST_TIMEOUT));

        // A real provider takes over the same address.
        silent.abort();
        let _ = silent.await;
        let mut provider = None;
        for _ in 0..50 {
            if let Ok(bound) = ProviderServer::bind(&addr, "client-test").await {
                provider = Some(bound);
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let mut provider = provider.expect("address should be free once the silent server stops");
        provider.start().unwrap();

        let result = client.call("cas.getTickets", json!({})).await.unwrap();
        assert_eq!(result, json!({"tickets": []}));

        client.disconnect().await;
        provider.stop().await;
    }

    #[tokio::test]
    async fn test_unreachable_provider_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let client = RpcClient::new(addr, Duration::from_millis(300), None);
        client.connect();
        let err = client.call("cas.getTickets", json!({})).await.unwrap_err();
        assert_eq!(err.code(), Some(REQUEST_TIMEOUT));
    }

    #[tokio::test]
    async fn test_garbage_reply_is_parse_error() {
        let addr = garbage_server().await;
        let client = RpcClient::new(addr, TIMEOUT, None);
        client.connect();

        let err = client.call("cas.getTickets", json!({})).await.unwrap_err();
        assert_eq!(err.code(), Some(PARSE_ERROR));
    }

    #[tokio::test]
    async fn test_concurrent_calls_are_serialized() {
        let mut provider = start_provider().await;
        let client = Arc::new(RpcClient::new(provider.local_addr().to_string(), TIMEOUT, None));
        client.connect();

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let client = client.clone();
                tokio::spawn(async move { client.call("cas.getTickets", json!({})).await })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), json!({"tickets": []}));
        }

        provider.stop().await;
    }

    #[tokio::test]
    async fn test_connect_registers_with_pacemaker() {
        let pacemaker = Arc::new(
            Pacemaker::new(ticketmesh_heartbeat::HeartbeatConfig::default(), 1).unwrap(),
        );
        let client = RpcClient::new("127.0.0.1:7001", TIMEOUT, Some(pacemaker.clone()));

        client.connect();
        client.connect();
        assert_eq!(pacemaker.client_count(), 1);

        client.disconnect().await;
        client.disconnect().await;
        assert_eq!(pacemaker.client_count(), 0);

        pacemaker.shutdown().await;
    }

    #[test]
    fn test_set_available() {
        let client = RpcClient::new("127.0.0.1:7001", TIMEOUT, None);
        client.set_available(false);
        assert!(!client.is_available());
        assert!(!client.peer().is_available());
    }
}
