use std::time::Duration;

use tokio::net::TcpStream;
use tracing::{debug, trace};

use crate::protocol::error::{Result, TicketMeshError};
use crate::transport::frame::{read_frame, write_frame};

/// Delay between connection attempts while a send is pending.
pub const RECONNECT_INTERVAL: Duration = Duration::from_millis(100);

/// Strict request/response client socket.
///
/// Every [`send`](Self::send) must be followed by a [`recv`](Self::recv)
/// before the next send is accepted. A socket whose reply never arrived (or
/// whose exchange was cancelled half way) stays unusable until it is
/// [`reset`](Self::reset), which discards the connection.
///
/// The connection is established lazily. While a send is pending the socket
/// keeps retrying the connect every [`RECONNECT_INTERVAL`], so an unreachable
/// peer shows up as a missing reply; callers bound the exchange with a timeout.
pub struct ReqSocket {
    addr: String,
    stream: Option<TcpStream>,
    awaiting_reply: bool,
}

impl ReqSocket {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            stream: None,
            awaiting_reply: false,
        }
    }

    /// The peer address this socket talks to.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// True between a send and the matching receive.
    pub fn is_awaiting_reply(&self) -> bool {
        self.awaiting_reply
    }

    /// Sends one request frame.
    ///
    /// # Errors
    ///
    /// Fails immediately if a previous request is still awaiting its reply.
    /// Otherwise it only returns once the frame has been written.
    pub async fn send(&mut self, payload: &[u8]) -> Result<()> {
        if self.awaiting_reply {
            return Err(TicketMeshError::Transport(format!(
                "socket to {} is awaiting a reply",
                self.addr
            )));
        }
        self.awaiting_reply = true;

        loop {
            if self.stream.is_none() {
                self.stream = Some(connect_with_retry(&self.addr).await);
            }

            let Some(stream) = self.stream.as_mut() else {
                continue;
            };

            match write_frame(stream, payload).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    debug!(addr = %self.addr, "Send failed, reconnecting: {}", e);
                    self.stream = None;
                    tokio::time::sleep(RECONNECT_INTERVAL).await;
                }
            }
        }
    }

    /// Receives the reply to the outstanding request.
    ///
    /// A failed receive leaves the socket awaiting; only [`reset`](Self::reset)
    /// makes it usable again.
    pub async fn recv(&mut self) -> Result<Vec<u8>> {
        if !self.awaiting_reply {
            return Err(TicketMeshError::Transport(format!(
                "no request outstanding on socket to {}",
                self.addr
            )));
        }

        let Some(stream) = self.stream.as_mut() else {
            return Err(TicketMeshError::Connection(format!("not connected to {}", self.addr)));
        };

        let reply = read_frame(stream).await?;
        self.awaiting_reply = false;
        Ok(reply)
    }

    /// Sends a request and waits for its reply.
    pub async fn request(&mut self, payload: &[u8]) -> Result<Vec<u8>> {
        self.send(payload).await?;
        self.recv().await
    }

    /// Discards the connection and any outstanding exchange.
    pub fn reset(&mut self) {
        if self.stream.take().is_some() {
            trace!(addr = %self.addr, "Socket discarded");
        }
        self.awaiting_reply = false;
    }
}

async fn connect_with_retry(addr: &str) -> TcpStream {
    loop {
        match TcpStream::connect(addr).await {
            Ok(stream) => {
                let _ = stream.set_nodelay(true);
                trace!(%addr, "Connected");
                return stream;
            }
            Err(e) => {
                trace!(%addr, "Connect failed: {}", e);
                tokio::time::sleep(RECONNECT_INTERVAL).await;
            }
        }
    }
}
