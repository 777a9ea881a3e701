use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::batch::{BatchRequest, BatchResponse};
use crate::error::{JsonRpcError, MessageError};
use crate::request::JsonRpcRequest;
use crate::types::{JsonRpcVersion, RequestId};

/// A JSON-RPC response
///
/// Holds at most one of `result` and `error`. Both absent is allowed and
/// represents a response whose outcome has not been filled in yet; it is
/// serialized as a `null` result.
///
/// Responses are immutable apart from [`JsonRpcResponse::with_id`], which the
/// dispatcher uses to stamp the originating request's id onto a response that
/// was built without knowing it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsonRpcResponse {
    result: Option<Value>,
    error: Option<JsonRpcError>,
    id: Option<RequestId>,
    notification: bool,
}

impl JsonRpcResponse {
    /// # Errors
    ///
    /// Returns [`MessageError::InvalidResponseShape`] when both a result and
    /// an error are supplied.
    pub fn new(
        result: Option<Value>,
        error: Option<JsonRpcError>,
        id: Option<RequestId>,
    ) -> Result<Self, MessageError> {
        if result.is_some() && error.is_some() {
            return Err(MessageError::InvalidResponseShape);
        }
        Ok(Self {
            result,
            error,
            id,
            notification: false,
        })
    }

    pub fn success(id: Option<RequestId>, result: Value) -> Self {
        Self {
            result: Some(result),
            id,
            ..Self::default()
        }
    }

    pub fn error(id: Option<RequestId>, error: JsonRpcError) -> Self {
        Self {
            error: Some(error),
            id,
            ..Self::default()
        }
    }

    /// Replace the id. The only sanctioned change after construction.
    pub fn with_id(mut self, id: Option<RequestId>) -> Self {
        self.id = id;
        self
    }

    /// Mark this response as answering a notification.
    ///
    /// Marked responses are never written into a serialized batch.
    pub fn into_notification(mut self) -> Self {
        self.notification = true;
        self
    }

    /// Build the response for `request`, marking it when the request is a
    /// notification.
    pub fn answering(self, request: &JsonRpcRequest) -> Self {
        let response = self.with_id(request.id().cloned());
        if request.is_notification() {
            response.into_notification()
        } else {
            response
        }
    }

    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    pub fn error_object(&self) -> Option<&JsonRpcError> {
        self.error.as_ref()
    }

    pub fn id(&self) -> Option<&RequestId> {
        self.id.as_ref()
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn is_notification(&self) -> bool {
        self.notification
    }

    pub fn into_parts(self) -> (Option<Value>, Option<JsonRpcError>, Option<RequestId>) {
        (self.result, self.error, self.id)
    }
}

impl From<JsonRpcError> for JsonRpcResponse {
    fn from(error: JsonRpcError) -> Self {
        Self::error(None, error)
    }
}

impl Serialize for JsonRpcResponse {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let len = 2 + usize::from(self.id.is_some());
        let mut state = serializer.serialize_struct("JsonRpcResponse", len)?;
        state.serialize_field("jsonrpc", &JsonRpcVersion::V2_0)?;
        match &self.error {
            Some(error) => state.serialize_field("error", error)?,
            None => state.serialize_field("result", self.result.as_ref().unwrap_or(&Value::Null))?,
        }
        if let Some(id) = &self.id {
            state.serialize_field("id", id)?;
        }
        state.end()
    }
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

#[derive(Deserialize)]
struct RawResponse {
    #[serde(rename = "jsonrpc")]
    _version: JsonRpcVersion,
    #[serde(default, deserialize_with = "present")]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
    #[serde(default)]
    id: Option<RequestId>,
}

impl<'de> Deserialize<'de> for JsonRpcResponse {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawResponse::deserialize(deserializer)?;
        JsonRpcResponse::new(raw.result, raw.error, raw.id).map_err(serde::de::Error::custom)
    }
}

/// Any message of the protocol, single or batched
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum JsonRpcMessage {
    Request(JsonRpcRequest),
    Response(JsonRpcResponse),
    Error(JsonRpcError),
    BatchRequest(BatchRequest),
    BatchResponse(BatchResponse),
}

impl JsonRpcMessage {
    /// Short name of the variant, used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            JsonRpcMessage::Request(_) => "request",
            JsonRpcMessage::Response(_) => "response",
            JsonRpcMessage::Error(_) => "error",
            JsonRpcMessage::BatchRequest(_) => "batch request",
            JsonRpcMessage::BatchResponse(_) => "batch response",
        }
    }

    /// Check if this is an error response or a bare error
    pub fn is_error(&self) -> bool {
        match self {
            JsonRpcMessage::Response(response) => response.is_error(),
            JsonRpcMessage::Error(_) => true,
            _ => false,
        }
    }

    pub fn as_request(&self) -> Option<&JsonRpcRequest> {
        match self {
            JsonRpcMessage::Request(request) => Some(request),
            _ => None,
        }
    }

    pub fn as_response(&self) -> Option<&JsonRpcResponse> {
        match self {
            JsonRpcMessage::Response(response) => Some(response),
            _ => None,
        }
    }

    pub fn as_batch_request(&self) -> Option<&BatchRequest> {
        match self {
            JsonRpcMessage::BatchRequest(batch) => Some(batch),
            _ => None,
        }
    }
}

impl From<JsonRpcRequest> for JsonRpcMessage {
    fn from(request: JsonRpcRequest) -> Self {
        Self::Request(request)
    }
}

impl From<JsonRpcResponse> for JsonRpcMessage {
    fn from(response: JsonRpcResponse) -> Self {
        Self::Response(response)
    }
}

impl From<JsonRpcError> for JsonRpcMessage {
    fn from(error: JsonRpcError) -> Self {
        Self::Error(error)
    }
}

impl From<BatchRequest> for JsonRpcMessage {
    fn from(batch: BatchRequest) -> Self {
        Self::BatchRequest(batch)
    }
}

impl From<BatchResponse> for JsonRpcMessage {
    fn from(batch: BatchResponse) -> Self {
        Self::BatchResponse(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{from_str, json, to_string, to_value};

    #[test]
    fn test_response_serialization() {
        let response = JsonRpcResponse::success(Some(RequestId::Number(1)), json!({"ok": true}));

        let json_str = to_string(&response).unwrap();
        let parsed: JsonRpcResponse = from_str(&json_str).unwrap();

        assert_eq!(parsed.id(), Some(&RequestId::Number(1)));
        assert!(parsed.is_success());
        assert_eq!(parsed.result(), Some(&json!({"ok": true})));
    }

    #[test]
    fn test_both_result_and_error_rejected() {
        let err = JsonRpcResponse::new(
            Some(json!(1)),
            Some(JsonRpcError::internal_error(None, None)),
            None,
        )
        .unwrap_err();
        assert_eq!(err, MessageError::InvalidResponseShape);

        assert!(from_str::<JsonRpcResponse>(
            r#"{"jsonrpc":"2.0","result":1,"error":{"code":-32603}}"#
        )
        .is_err());
    }

    #[test]
    fn test_unset_response_allowed() {
        let response = JsonRpcResponse::new(None, None, None).unwrap();
        assert!(response.is_success());
        assert_eq!(to_value(&response).unwrap(), json!({"jsonrpc": "2.0", "result": null}));
    }

    #[test]
    fn test_null_result_survives_round_trip() {
        let response = JsonRpcResponse::success(Some("x".into()), Value::Null);
        let parsed: JsonRpcResponse = from_str(&to_string(&response).unwrap()).unwrap();
        assert_eq!(parsed.result(), Some(&Value::Null));
    }

    #[test]
    fn test_error_response_shape() {
        let response = JsonRpcResponse::error(None, JsonRpcError::parse_error(None));
        assert_eq!(
            to_value(&response).unwrap(),
            json!({"jsonrpc": "2.0", "error": {"code": -32700, "message": "Parse error"}})
        );
        assert!(response.is_error());
    }

    #[test]
    fn test_with_id_stamps_id() {
        let response = JsonRpcResponse::success(Some(99.into()), json!(1)).with_id(Some(1.into()));
        assert_eq!(response.id(), Some(&RequestId::Number(1)));
        assert_eq!(to_value(&response).unwrap()["id"], json!(1));
    }

    #[test]
    fn test_answering_marks_notifications() {
        let notification = JsonRpcRequest::notification("log", None).unwrap();
        let response = JsonRpcResponse::success(Some(5.into()), json!(true)).answering(&notification);
        assert!(response.is_notification());
        assert_eq!(response.id(), None);
    }

    #[test]
    fn test_message_kind() {
        let message: JsonRpcMessage = JsonRpcError::parse_error(None).into();
        assert_eq!(message.kind(), "error");
        assert!(message.is_error());
    }
}
