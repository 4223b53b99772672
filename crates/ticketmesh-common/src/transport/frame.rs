use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::protocol::error::{Result, TicketMeshError};

/// Maximum frame payload (100 MB)
pub const MAX_MESSAGE_SIZE: usize = 100 * 1024 * 1024;

/// Payload of a heartbeat ping and of its pong.
pub const PING: [u8; 1] = [0x00];

/// Returns true when a payload is a heartbeat ping rather than a JSON-RPC message.
pub fn is_ping(payload: &[u8]) -> bool {
    payload == PING
}

/// Writes one frame.
///
/// Wire format: `[4-byte length as u32 big-endian] + [payload]`
pub async fn write_frame<W>(stream: &mut W, payload: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() > MAX_MESSAGE_SIZE {
        return Err(TicketMeshError::Transport(format!(
            "Message too large: {} bytes (max {} bytes)",
            payload.len(),
            MAX_MESSAGE_SIZE
        )));
    }

    let len = payload.len() as u32;

    stream
        .write_all(&len.to_be_bytes())
        .await
        .map_err(|e| map_io_error(e, "writing length prefix"))?;

    stream
        .write_all(payload)
        .await
        .map_err(|e| map_io_error(e, "writing data"))?;

    stream
        .flush()
        .await
        .map_err(|e| map_io_error(e, "flushing stream"))?;

    Ok(())
}

/// Reads one frame.
///
/// # Errors
///
/// Returns an error if:
/// - Reading the length prefix fails (including a clean close by the peer)
/// - The frame exceeds [`MAX_MESSAGE_SIZE`]
/// - Reading the payload fails
pub async fn read_frame<R>(stream: &mut R) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    stream
        .read_exact(&mut len_buf)
        .await
        .map_err(|e| map_io_error(e, "reading length prefix"))?;

    let len = u32::from_be_bytes(len_buf) as usize;

    // Validate length to prevent allocation of excessively large buffers
    if len > MAX_MESSAGE_SIZE {
        return Err(TicketMeshError::Transport(format!(
            "Message too large: {} bytes (max {} bytes)",
            len, MAX_MESSAGE_SIZE
        )));
    }

    let mut buf = vec![0u8; len];
    stream
        .read_exact(&mut buf)
        .await
        .map_err(|e| map_io_error(e, "reading data"))?;

    Ok(buf)
}

/// Map IO errors to the transport error variants
///
/// - Peer went away -> `Connection`
/// - Anything else -> `Io`
fn map_io_error(err: std::io::Error, context: &str) -> TicketMeshError {
    match err.kind() {
        std::io::ErrorKind::UnexpectedEof
        | std::io::ErrorKind::ConnectionReset
        | std::io::ErrorKind::ConnectionAborted
        | std::io::ErrorKind::BrokenPipe
        | std::io::ErrorKind::NotConnected => {
            TicketMeshError::Connection(format!("{}: Connection lost", context))
        }
        _ => TicketMeshError::Io(err),
    }
}
