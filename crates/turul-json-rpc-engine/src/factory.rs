//! Request factory: turns raw payloads into the message model.
//!
//! Malformed input never escapes as a Rust error. Undecodable bytes become a
//! Parse error response, invalid messages become Invalid Request responses,
//! and the rest of the crate only ever sees well-formed types.
//!
//! Id policy for rejected messages: when the rejected value is an object
//! whose `id` member is a valid identifier, the error response carries that
//! id; otherwise it has none. Non-object values are echoed back in the
//! error's `data`.

use std::sync::Arc;

use serde_json::{Map, Value, json};
use tracing::debug;

use crate::batch::{BatchRequest, BatchRequestItem};
use crate::code::ErrorCode;
use crate::config::DispatcherConfig;
use crate::error::{ErrorCause, JsonRpcError};
use crate::request::JsonRpcRequest;
use crate::response::{JsonRpcMessage, JsonRpcResponse};
use crate::types::{RequestId, RequestParams};

/// Parse a raw payload with default settings
pub fn from_bytes(payload: &[u8]) -> JsonRpcMessage {
    RequestFactory::default().parse_bytes(payload)
}

/// Parse a textual payload with default settings
pub fn from_str(payload: &str) -> JsonRpcMessage {
    RequestFactory::default().parse_bytes(payload.as_bytes())
}

/// Build messages from an already decoded JSON value with default settings
pub fn from_value(value: Value) -> JsonRpcMessage {
    RequestFactory::default().parse_value(value)
}

/// Converts payloads into [`JsonRpcMessage`]s
///
/// The result is always one of `Request`, `Response` (wrapping an error) or
/// `BatchRequest`.
#[derive(Debug, Clone, Default)]
pub struct RequestFactory {
    max_batch_size: Option<usize>,
}

impl RequestFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &DispatcherConfig) -> Self {
        Self {
            max_batch_size: config.max_batch_size,
        }
    }

    pub fn parse_bytes(&self, payload: &[u8]) -> JsonRpcMessage {
        match serde_json::from_slice::<Value>(payload) {
            Ok(value) => self.parse_value(value),
            Err(err) => {
                debug!("Failed to decode JSON-RPC payload: {}", err);
                let error = JsonRpcError::parse_error(None).with_cause(Arc::new(err) as ErrorCause);
                JsonRpcResponse::error(None, error).into()
            }
        }
    }

    pub fn parse_value(&self, value: Value) -> JsonRpcMessage {
        match value {
            Value::Array(elements) if elements.is_empty() => {
                debug!("Rejecting empty batch");
                JsonRpcResponse::error(None, JsonRpcError::invalid_request(None)).into()
            }
            Value::Array(elements) => self.parse_batch(elements),
            other => match parse_single(other) {
                Ok(request) => request.into(),
                Err(rejected) => rejected.into_response().into(),
            },
        }
    }

    fn parse_batch(&self, elements: Vec<Value>) -> JsonRpcMessage {
        if let Some(limit) = self.max_batch_size.filter(|limit| elements.len() > *limit) {
            debug!(
                "Rejecting batch of {} elements (limit {})",
                elements.len(),
                limit
            );
            let error = JsonRpcError::invalid_request(Some(json!({
                "size": elements.len(),
                "limit": limit,
            })));
            return JsonRpcResponse::error(None, error).into();
        }

        let batch: BatchRequest = elements
            .into_iter()
            .map(|element| match parse_single(element) {
                Ok(request) => BatchRequestItem::Request(request),
                Err(Rejected { error, id }) => BatchRequestItem::Error { error, id },
            })
            .collect();
        debug!("Parsed batch of {} elements", batch.len());
        batch.into()
    }
}

/// A message that failed validation, with the id it could still be
/// correlated by
struct Rejected {
    error: JsonRpcError,
    id: Option<RequestId>,
}

impl Rejected {
    fn invalid(id: Option<RequestId>) -> Self {
        Self {
            error: JsonRpcError::invalid_request(None),
            id,
        }
    }

    fn into_response(self) -> JsonRpcResponse {
        JsonRpcResponse::error(self.id, self.error)
    }
}

fn parse_single(value: Value) -> Result<JsonRpcRequest, Rejected> {
    let mut object = match value {
        Value::Object(object) => object,
        other => {
            debug!("Rejecting non-object JSON-RPC message");
            return Err(Rejected {
                error: JsonRpcError::invalid_request(Some(other)),
                id: None,
            });
        }
    };

    let id = match object.remove("id") {
        None | Some(Value::Null) => None,
        Some(raw) => match RequestId::from_value(&raw) {
            Some(id) => Some(id),
            None => {
                debug!("Rejecting message with invalid id: {}", raw);
                return Err(Rejected::invalid(None));
            }
        },
    };

    if object.get("jsonrpc").and_then(Value::as_str) != Some(crate::JSONRPC_VERSION) {
        debug!("Rejecting message without jsonrpc \"2.0\" member");
        return Err(Rejected::invalid(id));
    }

    let method = match take_method(&mut object) {
        Some(method) => method,
        None => {
            debug!("Rejecting message without a method");
            return Err(Rejected::invalid(id));
        }
    };

    let params = match object.remove("params") {
        None => None,
        Some(raw) => match RequestParams::from_value(raw) {
            Some(params) => Some(params),
            None => {
                debug!("Rejecting '{}': params must be an array or an object", method);
                return Err(Rejected::invalid(id));
            }
        },
    };

    JsonRpcRequest::new(method, params, id.clone()).map_err(|err| {
        debug!("Rejecting message: {}", err);
        Rejected {
            error: JsonRpcError::from_code(ErrorCode::InvalidRequest, Some(err.to_string()), None)
                .with_cause(Arc::new(err) as ErrorCause),
            id,
        }
    })
}

fn take_method(object: &mut Map<String, Value>) -> Option<String> {
    match object.remove("method") {
        Some(Value::String(method)) if !method.is_empty() => Some(method),
        _ => None,
    }
}
