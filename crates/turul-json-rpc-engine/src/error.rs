use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Value, json};
use thiserror::Error;

use crate::code::ErrorCode;

/// Underlying failure attached to a [`JsonRpcError`] for diagnostics
pub type ErrorCause = Arc<dyn StdError + Send + Sync + 'static>;

/// Construction-time violations of the message model
///
/// These never travel on the wire themselves; the factory and the dispatcher
/// convert them into protocol errors at the boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MessageError {
    #[error("Unknown JSON-RPC error code: {0}")]
    UnknownErrorCode(i64),

    #[error("Invalid method name '{method}': {reason}")]
    InvalidMethodName { method: String, reason: &'static str },

    #[error("A response cannot carry both a result and an error")]
    InvalidResponseShape,

    #[error("Invalid batch element: expected {expected}, found {found}")]
    InvalidBatchElement {
        expected: &'static str,
        found: &'static str,
    },
}

/// JSON-RPC error object
///
/// The code always resolves to a catalog entry; an empty message is replaced
/// by the catalog default when the error is built.
#[derive(Clone)]
pub struct JsonRpcError {
    code: i64,
    kind: ErrorCode,
    message: String,
    data: Option<Value>,
    cause: Option<ErrorCause>,
}

impl JsonRpcError {
    /// Build an error from a raw code.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::UnknownErrorCode`] if the code is outside the
    /// catalog.
    pub fn new(
        code: i64,
        message: Option<String>,
        data: Option<Value>,
    ) -> Result<Self, MessageError> {
        let kind = ErrorCode::resolve(code)?;
        Ok(Self::build(code, kind, message, data))
    }

    /// Build an error from a catalog entry, using its canonical code
    pub fn from_code(kind: ErrorCode, message: Option<String>, data: Option<Value>) -> Self {
        Self::build(kind.code(), kind, message, data)
    }

    fn build(code: i64, kind: ErrorCode, message: Option<String>, data: Option<Value>) -> Self {
        let message = message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| kind.default_message().to_string());
        Self {
            code,
            kind,
            message,
            data,
            cause: None,
        }
    }

    pub fn parse_error(data: Option<Value>) -> Self {
        Self::from_code(ErrorCode::ParseError, None, data)
    }

    pub fn invalid_request(data: Option<Value>) -> Self {
        Self::from_code(ErrorCode::InvalidRequest, None, data)
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::from_code(
            ErrorCode::MethodNotFound,
            None,
            Some(json!({ "method": method })),
        )
    }

    pub fn invalid_params(message: &str) -> Self {
        Self::from_code(ErrorCode::InvalidParams, Some(message.to_string()), None)
    }

    pub fn internal_error(message: Option<String>, data: Option<Value>) -> Self {
        Self::from_code(ErrorCode::InternalError, message, data)
    }

    /// Application-defined error in the server range.
    ///
    /// Codes outside `-32099..=-32000` fall back to `-32099`.
    pub fn server_error(code: i64, message: Option<String>, data: Option<Value>) -> Self {
        Self::build(
            ErrorCode::clamp_server_code(code),
            ErrorCode::ServerError,
            message,
            data,
        )
    }

    /// Attach the failure that produced this error. Not serialized.
    pub fn with_cause(mut self, cause: impl Into<ErrorCause>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn code(&self) -> i64 {
        self.code
    }

    /// Catalog entry the code resolved to
    pub fn error_code(&self) -> ErrorCode {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.cause.as_deref()
    }
}

impl fmt::Debug for JsonRpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonRpcError")
            .field("code", &self.code)
            .field("message", &self.message)
            .field("data", &self.data)
            .field("cause", &self.cause.as_ref().map(|c| c.to_string()))
            .finish()
    }
}

impl PartialEq for JsonRpcError {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code && self.message == other.message && self.data == other.data
    }
}

impl fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JSON-RPC Error {}: {}", self.code, self.message)
    }
}

impl StdError for JsonRpcError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn StdError + 'static))
    }
}

impl Serialize for JsonRpcError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let len = if self.data.is_some() { 3 } else { 2 };
        let mut state = serializer.serialize_struct("JsonRpcError", len)?;
        state.serialize_field("code", &self.code)?;
        state.serialize_field("message", &self.message)?;
        if let Some(data) = &self.data {
            state.serialize_field("data", data)?;
        }
        state.end()
    }
}

#[derive(Deserialize)]
struct RawError {
    code: i64,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

impl<'de> Deserialize<'de> for JsonRpcError {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawError::deserialize(deserializer)?;
        JsonRpcError::new(raw.code, raw.message, raw.data).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{from_value, to_value};

    #[derive(Debug, Error)]
    #[error("disk on fire")]
    struct Boom;

    #[test]
    fn test_unknown_code_rejected() {
        assert_eq!(
            JsonRpcError::new(-31999, None, None).unwrap_err(),
            MessageError::UnknownErrorCode(-31999)
        );
        assert!(JsonRpcError::new(-32100, None, None).is_err());
    }

    #[test]
    fn test_empty_message_falls_back_to_default() {
        let error = JsonRpcError::new(-32601, Some(String::new()), None).unwrap();
        assert_eq!(error.message(), "Method not found");

        let error = JsonRpcError::new(-32601, Some("nope".into()), None).unwrap();
        assert_eq!(error.message(), "nope");
    }

    #[test]
    fn test_server_range_keeps_raw_code() {
        let error = JsonRpcError::new(-32050, None, None).unwrap();
        assert_eq!(error.code(), -32050);
        assert_eq!(error.error_code(), ErrorCode::ServerError);
        assert_eq!(error.message(), "Server error");
    }

    #[test]
    fn test_server_error_clamps() {
        assert_eq!(JsonRpcError::server_error(-32001, None, None).code(), -32001);
        assert_eq!(JsonRpcError::server_error(-1, None, None).code(), -32099);
    }

    #[test]
    fn test_serialization_omits_absent_data() {
        let json = to_value(JsonRpcError::parse_error(None)).unwrap();
        assert_eq!(json, serde_json::json!({"code": -32700, "message": "Parse error"}));

        let json = to_value(JsonRpcError::method_not_found("ghost")).unwrap();
        assert_eq!(json["data"], serde_json::json!({"method": "ghost"}));
    }

    #[test]
    fn test_cause_is_kept_but_not_serialized() {
        let error = JsonRpcError::internal_error(None, None).with_cause(Arc::new(Boom) as ErrorCause);
        assert_eq!(error.cause().unwrap().to_string(), "disk on fire");
        assert!(error.source().is_some());

        let json = serde_json::to_string(&error).unwrap();
        assert!(!json.contains("disk on fire"));
    }

    #[test]
    fn test_deserialization_validates_code() {
        let error: JsonRpcError =
            from_value(serde_json::json!({"code": -32602})).unwrap();
        assert_eq!(error.message(), "Invalid params");

        assert!(from_value::<JsonRpcError>(serde_json::json!({"code": 12, "message": "x"})).is_err());
    }
}
