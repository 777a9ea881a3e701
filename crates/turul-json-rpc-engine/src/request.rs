use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::MessageError;
use crate::types::{JsonRpcVersion, RequestId, RequestParams};

/// Method names starting with this prefix are reserved for rpc-internal methods
pub const RESERVED_METHOD_PREFIX: &str = "rpc.";

/// A JSON-RPC request
///
/// A request without an id is a notification: it is executed but never
/// answered.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRpcRequest {
    method: String,
    params: RequestParams,
    id: Option<RequestId>,
}

impl JsonRpcRequest {
    /// # Errors
    ///
    /// Returns [`MessageError::InvalidMethodName`] for an empty method or one
    /// using the reserved `rpc.` prefix.
    pub fn new(
        method: impl Into<String>,
        params: Option<RequestParams>,
        id: Option<RequestId>,
    ) -> Result<Self, MessageError> {
        let method = method.into();
        if method.is_empty() {
            return Err(MessageError::InvalidMethodName {
                method,
                reason: "method name must not be empty",
            });
        }
        if method.starts_with(RESERVED_METHOD_PREFIX) {
            return Err(MessageError::InvalidMethodName {
                method,
                reason: "names beginning with 'rpc.' are reserved",
            });
        }
        Ok(Self {
            method,
            params: params.unwrap_or_default(),
            id,
        })
    }

    /// Create a notification (no id)
    pub fn notification(
        method: impl Into<String>,
        params: Option<RequestParams>,
    ) -> Result<Self, MessageError> {
        Self::new(method, params, None)
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn params(&self) -> &RequestParams {
        &self.params
    }

    pub fn id(&self) -> Option<&RequestId> {
        self.id.as_ref()
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    /// Get a parameter by name (if params are an object)
    pub fn get_param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    /// Get a parameter by index (if params are an array)
    pub fn get_param_index(&self, index: usize) -> Option<&Value> {
        self.params.get_index(index)
    }
}

impl Serialize for JsonRpcRequest {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let len = 2 + usize::from(self.id.is_some()) + usize::from(!self.params.is_empty());
        let mut state = serializer.serialize_struct("JsonRpcRequest", len)?;
        state.serialize_field("jsonrpc", &JsonRpcVersion::V2_0)?;
        state.serialize_field("method", &self.method)?;
        if !self.params.is_empty() {
            state.serialize_field("params", &self.params)?;
        }
        if let Some(id) = &self.id {
            state.serialize_field("id", id)?;
        }
        state.end()
    }
}

#[derive(Deserialize)]
struct RawRequest {
    #[serde(rename = "jsonrpc")]
    _version: JsonRpcVersion,
    method: String,
    #[serde(default)]
    params: Option<RequestParams>,
    #[serde(default)]
    id: Option<RequestId>,
}

impl<'de> Deserialize<'de> for JsonRpcRequest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawRequest::deserialize(deserializer)?;
        JsonRpcRequest::new(raw.method, raw.params, raw.id).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{from_str, json, to_string, to_value};
    use std::collections::HashMap;

    #[test]
    fn test_request_serialization() {
        let request = JsonRpcRequest::new("test_method", None, Some(RequestId::Number(1))).unwrap();

        let json = to_string(&request).unwrap();
        let parsed: JsonRpcRequest = from_str(&json).unwrap();

        assert_eq!(parsed.id(), Some(&RequestId::Number(1)));
        assert_eq!(parsed.method(), "test_method");
        assert!(parsed.params().is_empty());
        assert_eq!(parsed, request);
    }

    #[test]
    fn test_reserved_prefix_rejected() {
        let err = JsonRpcRequest::new("rpc.anything", None, Some(1.into())).unwrap_err();
        assert!(matches!(err, MessageError::InvalidMethodName { .. }));

        // Only the exact prefix is reserved
        assert!(JsonRpcRequest::new("rpcish", None, None).is_ok());
    }

    #[test]
    fn test_empty_method_rejected() {
        assert!(JsonRpcRequest::new("", None, None).is_err());
    }

    #[test]
    fn test_notification_omits_id_and_empty_params() {
        let notification = JsonRpcRequest::notification("ping", None).unwrap();
        assert!(notification.is_notification());

        let json = to_value(&notification).unwrap();
        assert_eq!(json, json!({"jsonrpc": "2.0", "method": "ping"}));
    }

    #[test]
    fn test_request_with_object_params() {
        let mut params = HashMap::new();
        params.insert("name".to_string(), json!("test"));
        params.insert("value".to_string(), json!(42));

        let request =
            JsonRpcRequest::new("set_value", Some(params.into()), Some("req1".into())).unwrap();

        assert_eq!(request.get_param("name"), Some(&json!("test")));
        assert_eq!(request.get_param("value"), Some(&json!(42)));
        assert_eq!(request.get_param("missing"), None);
        assert_eq!(to_value(&request).unwrap()["params"]["value"], json!(42));
    }

    #[test]
    fn test_request_with_array_params() {
        let params = vec![json!("test"), json!(42), json!(true)];
        let request = JsonRpcRequest::new("process", Some(params.into()), Some(2.into())).unwrap();

        assert_eq!(request.get_param_index(0), Some(&json!("test")));
        assert_eq!(request.get_param_index(2), Some(&json!(true)));
        assert_eq!(request.get_param_index(3), None);
    }

    #[test]
    fn test_deserialization_applies_validators() {
        assert!(from_str::<JsonRpcRequest>(r#"{"jsonrpc":"2.0","method":"rpc.x","id":1}"#).is_err());
        assert!(from_str::<JsonRpcRequest>(r#"{"jsonrpc":"1.0","method":"x","id":1}"#).is_err());
    }
}
