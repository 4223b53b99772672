use serde_json::Value;

use crate::protocol::error::Result;
use crate::protocol::jsonrpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, JSONRPC_VERSION};

/// A request that failed decoding or validation.
///
/// Carries the id recovered from the message (null when none could be read) so
/// the error response can still be correlated by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRequest {
    pub id: Value,
    pub error: JsonRpcError,
}

impl RejectedRequest {
    fn new(id: Value, error: JsonRpcError) -> Self {
        Self { id, error }
    }

    /// Builds the error response that answers this request.
    pub fn into_response(self) -> JsonRpcResponse {
        JsonRpcResponse::error(self.id, self.error)
    }
}

/// JSON codec for JSON-RPC messages
///
/// Encoding is plain `serde_json`; decoding a request additionally validates
/// the envelope structure:
///
/// - not JSON at all → `-32700 Parse error`
/// - not an object, wrong/missing `jsonrpc`, missing `method`, missing or
///   non-object `params`, or an id that is neither string, number nor null
///   → `-32600 Invalid Request`
///
/// # Example
///
/// ```
/// use ticketmesh_common::transport::JsonCodec;
/// use ticketmesh_common::protocol::JsonRpcRequest;
/// use serde_json::json;
///
/// let request = JsonRpcRequest::new(json!(1), "cas.getTickets", json!({}));
/// let encoded = JsonCodec::encode_request(&request).unwrap();
/// let decoded = JsonCodec::decode_request(&encoded).unwrap();
/// assert_eq!(decoded.method, "cas.getTickets");
/// ```
pub struct JsonCodec;

impl JsonCodec {
    /// Encode a request to bytes
    pub fn encode_request(request: &JsonRpcRequest) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(request)?)
    }

    /// Decode and validate a request
    ///
    /// # Arguments
    ///
    /// * `data` - The raw frame payload
    ///
    /// # Returns
    ///
    /// The validated request, or the rejection to answer with
    pub fn decode_request(data: &[u8]) -> std::result::Result<JsonRpcRequest, RejectedRequest> {
        let value: Value = serde_json::from_slice(data)
            .map_err(|_| RejectedRequest::new(Value::Null, JsonRpcError::parse_error()))?;

        let Value::Object(mut object) = value else {
            return Err(RejectedRequest::new(Value::Null, JsonRpcError::invalid_request()));
        };

        let id = object.remove("id").unwrap_or(Value::Null);
        if !(id.is_null() || id.is_string() || id.is_number()) {
            return Err(RejectedRequest::new(Value::Null, JsonRpcError::invalid_request()));
        }

        match object.get("jsonrpc") {
            Some(Value::String(version)) if version == JSONRPC_VERSION => {}
            _ => return Err(RejectedRequest::new(id, JsonRpcError::invalid_request())),
        }

        let method = match object.remove("method") {
            Some(Value::String(method)) => method,
            _ => return Err(RejectedRequest::new(id, JsonRpcError::invalid_request())),
        };

        // Positional (array) params are not supported.
        let params = match object.remove("params") {
            Some(params @ Value::Object(_)) => params,
            _ => return Err(RejectedRequest::new(id, JsonRpcError::invalid_request())),
        };

        Ok(JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION.into(),
            id,
            method,
            params,
        })
    }

    /// Encode a response to bytes
    pub fn encode_response(response: &JsonRpcResponse) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(response)?)
    }

    /// Decode a response
    ///
    /// Anything that does not parse as a response object is a `-32700 Parse error`.
    pub fn decode_response(data: &[u8]) -> std::result::Result<JsonRpcResponse, JsonRpcError> {
        serde_json::from_slice(data).map_err(|_| JsonRpcError::parse_error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::jsonrpc::{INVALID_REQUEST, PARSE_ERROR};
    use serde_json::json;

    fn decode(raw: &str) -> std::result::Result<JsonRpcRequest, RejectedRequest> {
        JsonCodec::decode_request(raw.as_bytes())
    }

    #[test]
    fn test_valid_request_decodes() {
        let request = decode(
            r#"{"jsonrpc":"2.0","id":3,"method":"cas.getTicket","params":{"ticket-id":"ST-1"}}"#,
        )
        .unwrap();
        assert_eq!(request.id, json!(3));
        assert_eq!(request.method, "cas.getTicket");
        assert_eq!(request.params, json!({"ticket-id": "ST-1"}));
    }

    #[test]
    fn test_string_id_and_missing_id() {
        let request = decode(r#"{"jsonrpc":"2.0","id":"a-1","method":"m","params":{}}"#).unwrap();
        assert_eq!(request.id, json!("a-1"));

        let request = decode(r#"{"jsonrpc":"2.0","method":"m","params":{}}"#).unwrap();
        assert!(request.is_notification());
    }

    #[test]
    fn test_garbage_is_parse_error() {
        let rejected = JsonCodec::decode_request(&[0xFF, 0xFE, 0x00]).unwrap_err();
        assert_eq!(rejected.error.code, PARSE_ERROR);
        assert_eq!(rejected.id, Value::Null);

        let rejected = decode(r#"{"jsonrpc":"2.0","#).unwrap_err();
        assert_eq!(rejected.error.code, PARSE_ERROR);
    }

    #[test]
    fn test_wrong_version_is_invalid_request() {
        let rejected = decode(r#"{"jsonrpc":"1.0","id":1,"method":"m","params":{}}"#).unwrap_err();
        assert_eq!(rejected.error.code, INVALID_REQUEST);
        assert_eq!(rejected.id, json!(1));

        let rejected = decode(r#"{"json-rpc":"2.0","id":1,"method":"m","params":{}}"#).unwrap_err();
        assert_eq!(rejected.error.code, INVALID_REQUEST);
    }

    #[test]
    fn test_missing_method_is_invalid_request() {
        let rejected = decode(r#"{"jsonrpc":"2.0","id":1,"params":{}}"#).unwrap_err();
        assert_eq!(rejected.error.code, INVALID_REQUEST);
    }

    #[test]
    fn test_missing_or_positional_params_are_invalid_request() {
        let rejected = decode(r#"{"jsonrpc":"2.0","id":1,"method":"m"}"#).unwrap_err();
        assert_eq!(rejected.error.code, INVALID_REQUEST);

        let rejected = decode(r#"{"jsonrpc":"2.0","id":1,"method":"m","params":["a"]}"#).unwrap_err();
        assert_eq!(rejected.error.code, INVALID_REQUEST);
    }

    #[test]
    fn test_non_object_is_invalid_request() {
        let rejected = decode(r#"[1,2,3]"#).unwrap_err();
        assert_eq!(rejected.error.code, INVALID_REQUEST);
    }

    #[test]
    fn test_rejection_becomes_error_response() {
        let response = decode(r#"{"jsonrpc":"2.0","id":9,"method":"m"}"#)
            .unwrap_err()
            .into_response();
        assert_eq!(response.id, json!(9));
        assert!(response.result.is_none());
        assert_eq!(response.error.unwrap().code, INVALID_REQUEST);
    }

    #[test]
    fn test_decode_response() {
        let response =
            JsonCodec::decode_response(br#"{"jsonrpc":"2.0","id":1,"result":{"status":"added"}}"#)
                .unwrap();
        assert_eq!(response.result, Some(json!({"status": "added"})));

        let err = JsonCodec::decode_response(b"not json").unwrap_err();
        assert_eq!(err.code, PARSE_ERROR);
    }
}
