use thiserror::Error;

use super::jsonrpc::{JsonRpcError, INTERNAL_ERROR, REQUEST_TIMEOUT};

#[derive(Error, Debug)]
pub enum TicketMeshError {
    /// Protocol or application error carrying a JSON-RPC error code.
    #[error("RPC error: {0}")]
    Rpc(JsonRpcError),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Local provider not found among {0} configured providers")]
    LocalProviderNotFound(usize),

    #[error("Bootstrap failed: {0}")]
    Bootstrap(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Method already registered: {0}")]
    DuplicateMethod(String),

    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TicketMeshError {
    /// Maps the error onto the JSON-RPC error code table.
    ///
    /// Configuration errors have no wire representation and return `None`.
    pub fn code(&self) -> Option<i32> {
        match self {
            TicketMeshError::Rpc(e) => Some(e.code),
            TicketMeshError::Timeout(_) => Some(REQUEST_TIMEOUT),
            TicketMeshError::Transport(_)
            | TicketMeshError::Connection(_)
            | TicketMeshError::JsonSerialization(_)
            | TicketMeshError::Io(_) => Some(INTERNAL_ERROR),
            TicketMeshError::LocalProviderNotFound(_)
            | TicketMeshError::Bootstrap(_)
            | TicketMeshError::InvalidConfig(_)
            | TicketMeshError::DuplicateMethod(_) => None,
        }
    }

    /// True for failures of the transport rather than of the remote method.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            TicketMeshError::Timeout(_)
                | TicketMeshError::Transport(_)
                | TicketMeshError::Connection(_)
                | TicketMeshError::Io(_)
        )
    }
}

impl From<JsonRpcError> for TicketMeshError {
    fn from(err: JsonRpcError) -> Self {
        TicketMeshError::Rpc(err)
    }
}

impl From<std::net::AddrParseError> for TicketMeshError {
    fn from(err: std::net::AddrParseError) -> Self {
        TicketMeshError::InvalidConfig(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TicketMeshError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_follow_table() {
        assert_eq!(TicketMeshError::Timeout(1500).code(), Some(-32300));
        assert_eq!(
            TicketMeshError::Rpc(JsonRpcError::duplicate_ticket()).code(),
            Some(-32502)
        );
        assert_eq!(TicketMeshError::Transport("gone".into()).code(), Some(-32603));
        assert_eq!(TicketMeshError::LocalProviderNotFound(2).code(), None);
    }

    #[test]
    fn test_transport_classification() {
        assert!(TicketMeshError::Timeout(10).is_transport());
        assert!(TicketMeshError::Connection("refused".into()).is_transport());
        assert!(!TicketMeshError::Rpc(JsonRpcError::missing_ticket()).is_transport());
    }

    #[test]
    fn test_timeout_display() {
        let err = TicketMeshError::Timeout(1500);
        assert_eq!(err.to_string(), "Request timeout after 1500ms");
    }
}
