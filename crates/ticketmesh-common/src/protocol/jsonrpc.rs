//! JSON-RPC 2.0 Protocol Types
//!
//! This module implements the JSON-RPC 2.0 envelope spoken between ticketmesh
//! clients and providers.
//!
//! # Envelope
//!
//! - Request: `{"jsonrpc": "2.0", "id": ..., "method": "...", "params": {...}}`
//! - Success: `{"jsonrpc": "2.0", "id": ..., "result": {...}}`
//! - Failure: `{"jsonrpc": "2.0", "id": ..., "error": {"code": ..., "message": "..."}}`
//!
//! Exactly one of `result` / `error` is ever serialized. Parameters are always a
//! named map; positional (array) parameters are rejected by the codec.
//!
//! # Error Codes
//!
//! Standard JSON-RPC 2.0 codes:
//! - `-32700`: Parse error
//! - `-32600`: Invalid Request
//! - `-32601`: Method not Found
//! - `-32602`: Invalid Params
//! - `-32603`: Internal error
//!
//! Ticket registry codes:
//! - `-32500`: Error extracting Ticket
//! - `-32501`: Could not decode Ticket
//! - `-32502`: Duplicate Ticket
//! - `-32503`: Missing Ticket
//! - `-32300`: Request Timeout (raised client side only)
//!
//! # Example
//!
//! ```
//! use ticketmesh_common::protocol::jsonrpc::{JsonRpcRequest, JsonRpcResponse, JsonRpcError};
//! use serde_json::json;
//!
//! let request = JsonRpcRequest::new(json!(1), "cas.getTicket", json!({"ticket-id": "ST-1"}));
//!
//! let response = JsonRpcResponse::success(json!(1), json!({"ticket-id": "ST-1"}));
//!
//! let error_response = JsonRpcResponse::error(json!(1), JsonRpcError::missing_ticket());
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Protocol version literal carried by every message.
pub const JSONRPC_VERSION: &str = "2.0";

/// JSON-RPC 2.0 request
///
/// A request has:
/// - `jsonrpc`: "2.0"
/// - `id`: Request identifier (number or string; null/absent marks a notification)
/// - `method`: Name of the method to invoke
/// - `params`: Named parameter map
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcRequest {
    /// JSON-RPC version (must be "2.0")
    pub jsonrpc: String,
    /// Request identifier (number, string, or null)
    #[serde(default)]
    pub id: Value,
    /// Name of the method to invoke
    pub method: String,
    /// Named parameter values
    pub params: Value,
}

impl JsonRpcRequest {
    /// Creates a request with the current protocol version.
    pub fn new(id: Value, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            id,
            method: method.into(),
            params,
        }
    }

    /// Returns true when the request carries no id and expects no reply.
    pub fn is_notification(&self) -> bool {
        self.id.is_null()
    }

    /// Borrows the named parameter map.
    ///
    /// Returns `None` when `params` is not an object; the codec never hands such a
    /// request to the server.
    pub fn named_params(&self) -> Option<&Map<String, Value>> {
        self.params.as_object()
    }
}

/// JSON-RPC 2.0 response
///
/// Exactly one of `result` / `error` is present. Absent fields are skipped on
/// the wire instead of being serialized as `null`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcResponse {
    /// JSON-RPC version (must be "2.0")
    pub jsonrpc: String,
    /// Request identifier (must match the request id, null if it was unknown)
    #[serde(default)]
    pub id: Value,
    /// Result value on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error object on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JsonRpcError {
    /// Error code (see the module docs for the table)
    pub code: i32,
    /// Short description of the error
    pub message: String,
}

// Standard JSON-RPC 2.0 error codes
/// Invalid JSON was received
pub const PARSE_ERROR: i32 = -32700;
/// The JSON sent is not a valid Request object
pub const INVALID_REQUEST: i32 = -32600;
/// The method is not registered
pub const METHOD_NOT_FOUND: i32 = -32601;
/// Missing, extra or mistyped named parameters
pub const INVALID_PARAMS: i32 = -32602;
/// Unexpected fault while handling a request
pub const INTERNAL_ERROR: i32 = -32603;

// Ticket registry error codes
/// A stored ticket could not be extracted/serialized
pub const EXTRACT_TICKET_ERROR: i32 = -32500;
/// A ticket blob could not be decoded or encoded
pub const DECODE_TICKET_ERROR: i32 = -32501;
/// `add` was called for an id that is already stored
pub const DUPLICATE_TICKET: i32 = -32502;
/// `get` was called for an id that is not stored
pub const MISSING_TICKET: i32 = -32503;
/// No reply arrived within the client's request timeout
pub const REQUEST_TIMEOUT: i32 = -32300;

impl JsonRpcError {
    /// Creates an error with an arbitrary code and message.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Create a parse error (-32700)
    pub fn parse_error() -> Self {
        Self::new(PARSE_ERROR, "Parse error")
    }

    /// Create an invalid request error (-32600)
    pub fn invalid_request() -> Self {
        Self::new(INVALID_REQUEST, "Invalid Request")
    }

    /// Create a method not found error (-32601)
    pub fn method_not_found() -> Self {
        Self::new(METHOD_NOT_FOUND, "Method not Found")
    }

    /// Create an invalid params error (-32602)
    pub fn invalid_params() -> Self {
        Self::new(INVALID_PARAMS, "Invalid Params")
    }

    /// Create an internal error (-32603)
    pub fn internal_error() -> Self {
        Self::new(INTERNAL_ERROR, "Internal error")
    }

    /// Create an extraction error (-32500)
    pub fn extract_ticket_error() -> Self {
        Self::new(EXTRACT_TICKET_ERROR, "Error extracting Ticket")
    }

    /// Create a ticket decode error (-32501)
    pub fn decode_ticket_error() -> Self {
        Self::new(DECODE_TICKET_ERROR, "Could not decode Ticket")
    }

    /// Create a duplicate ticket error (-32502)
    pub fn duplicate_ticket() -> Self {
        Self::new(DUPLICATE_TICKET, "Duplicate Ticket")
    }

    /// Create a missing ticket error (-32503)
    pub fn missing_ticket() -> Self {
        Self::new(MISSING_TICKET, "Missing Ticket")
    }

    /// Create a request timeout error (-32300)
    pub fn request_timeout() -> Self {
        Self::new(REQUEST_TIMEOUT, "Request Timeout")
    }
}

impl std::fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

impl std::error::Error for JsonRpcError {}

impl JsonRpcResponse {
    /// Create a success response
    ///
    /// # Arguments
    ///
    /// * `id` - Request identifier (must match the request id)
    /// * `result` - Result value
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    ///
    /// # Arguments
    ///
    /// * `id` - Request identifier (null when the request could not be read)
    /// * `error` - Error object
    pub fn error(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Collapses the response into the result or the carried error.
    ///
    /// A response with neither field is answered with an internal error.
    pub fn into_result(self) -> Result<Value, JsonRpcError> {
        match (self.result, self.error) {
            (_, Some(error)) => Err(error),
            (Some(result), None) => Ok(result),
            (None, None) => Err(JsonRpcError::internal_error()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_jsonrpc_request_serialization() {
        let req = JsonRpcRequest::new(json!(1), "cas.getTicket", json!({"ticket-id": "ST-1"}));
        let serialized = serde_json::to_string(&req).unwrap();
        assert!(serialized.contains("\"jsonrpc\":\"2.0\""));
        assert!(serialized.contains("\"method\":\"cas.getTicket\""));
        assert!(serialized.contains("\"params\":{"));
        assert!(serialized.contains("\"id\":1"));
    }

    #[test]
    fn test_jsonrpc_response_success_omits_error() {
        let res = JsonRpcResponse::success(json!(1), json!({"status": "added"}));
        let serialized = serde_json::to_string(&res).unwrap();
        assert!(serialized.contains("\"result\""));
        assert!(!serialized.contains("\"error\""));
        assert!(serialized.contains("\"jsonrpc\":\"2.0\""));
    }

    #[test]
    fn test_jsonrpc_response_error_omits_result() {
        let res = JsonRpcResponse::error(json!(7), JsonRpcError::duplicate_ticket());
        let serialized = serde_json::to_string(&res).unwrap();
        assert!(serialized.contains("\"error\""));
        assert!(!serialized.contains("\"result\""));
        assert!(serialized.contains("-32502"));
    }

    #[test]
    fn test_jsonrpc_error_codes() {
        assert_eq!(JsonRpcError::parse_error().code, -32700);
        assert_eq!(JsonRpcError::invalid_request().code, -32600);
        assert_eq!(JsonRpcError::method_not_found().code, -32601);
        assert_eq!(JsonRpcError::invalid_params().code, -32602);
        assert_eq!(JsonRpcError::internal_error().code, -32603);
        assert_eq!(JsonRpcError::extract_ticket_error().code, -32500);
        assert_eq!(JsonRpcError::decode_ticket_error().code, -32501);
        assert_eq!(JsonRpcError::duplicate_ticket().code, -32502);
        assert_eq!(JsonRpcError::missing_ticket().code, -32503);
        assert_eq!(JsonRpcError::request_timeout().code, -32300);
    }

    #[test]
    fn test_jsonrpc_error_messages() {
        assert_eq!(JsonRpcError::parse_error().message, "Parse error");
        assert_eq!(JsonRpcError::invalid_request().message, "Invalid Request");
        assert_eq!(JsonRpcError::method_not_found().message, "Method not Found");
        assert_eq!(JsonRpcError::invalid_params().message, "Invalid Params");
        assert_eq!(JsonRpcError::decode_ticket_error().message, "Could not decode Ticket");
        assert_eq!(JsonRpcError::request_timeout().message, "Request Timeout");
    }

    #[test]
    fn test_into_result() {
        let ok = JsonRpcResponse::success(json!(1), json!({"a": 1}));
        assert_eq!(ok.into_result(), Ok(json!({"a": 1})));

        let err = JsonRpcResponse::error(json!(1), JsonRpcError::missing_ticket());
        assert_eq!(err.into_result(), Err(JsonRpcError::missing_ticket()));

        let empty = JsonRpcResponse {
            jsonrpc: "2.0".into(),
            id: json!(1),
            result: None,
            error: None,
        };
        assert_eq!(empty.into_result(), Err(JsonRpcError::internal_error()));
    }

    #[test]
    fn test_jsonrpc_response_with_error_deserialization() {
        let json = r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"Method not Found"}}"#;
        let res: JsonRpcResponse = serde_json::from_str(json).unwrap();
        assert_eq!(res.result, None);
        assert_eq!(res.error.unwrap().code, -32601);
        assert_eq!(res.id, json!(1));
    }

    #[test]
    fn test_notification_detection() {
        let req = JsonRpcRequest::new(Value::Null, "cas.deleteTicket", json!({}));
        assert!(req.is_notification());
        let req = JsonRpcRequest::new(json!("abc"), "cas.deleteTicket", json!({}));
        assert!(!req.is_notification());
    }
}
