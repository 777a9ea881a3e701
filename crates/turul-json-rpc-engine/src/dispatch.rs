//! Dispatch engine.
//!
//! Every request ends in exactly one terminal state:
//!
//! - lookup fails: Method not found, `data = {method}`
//! - found but not callable: server error `-32099`, `data = {method}`
//! - callable fails: Internal error, `data = {method, params}`, cause kept
//! - callable succeeds: success with the returned value
//! - responder: whatever response the responder built
//!
//! The response id is always overwritten with the request's id.

use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::batch::{BatchRequest, BatchRequestItem, BatchResponse};
use crate::code::ErrorCode;
use crate::config::DispatcherConfig;
use crate::error::{ErrorCause, JsonRpcError};
use crate::factory::RequestFactory;
use crate::procedure::{Procedure, ProcedureError, ProcedureRegistry, RegistryError};
use crate::request::JsonRpcRequest;
use crate::response::{JsonRpcMessage, JsonRpcResponse};
use crate::types::RequestId;

/// Result of executing a message
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// A single response to send back
    Response(JsonRpcResponse),
    /// Responses to a batch, notifications already removed
    Batch(BatchResponse),
    /// Nothing to send (a notification, or a batch of only notifications)
    NoResponse,
}

impl DispatchOutcome {
    pub(crate) fn from_batch(batch: BatchResponse) -> Self {
        if batch.has_visible() {
            DispatchOutcome::Batch(batch)
        } else {
            DispatchOutcome::NoResponse
        }
    }

    /// Convert to JSON string if there's a response to send
    pub fn to_json_string(&self) -> Option<String> {
        match self {
            DispatchOutcome::Response(response) => serde_json::to_string(response).ok(),
            DispatchOutcome::Batch(batch) => serde_json::to_string(batch).ok(),
            DispatchOutcome::NoResponse => None,
        }
    }

    /// Check if this outcome is a single error response
    pub fn is_error(&self) -> bool {
        matches!(self, DispatchOutcome::Response(response) if response.is_error())
    }

    /// Check if this outcome needs a response
    pub fn needs_response(&self) -> bool {
        !matches!(self, DispatchOutcome::NoResponse)
    }

    pub fn as_response(&self) -> Option<&JsonRpcResponse> {
        match self {
            DispatchOutcome::Response(response) => Some(response),
            _ => None,
        }
    }

    pub fn as_batch(&self) -> Option<&BatchResponse> {
        match self {
            DispatchOutcome::Batch(batch) => Some(batch),
            _ => None,
        }
    }
}

/// Executes parsed messages against a procedure registry
///
/// The dispatcher holds no state between calls. Procedure failures always
/// become protocol responses; only [`RegistryError`]s are returned as `Err`.
#[derive(Debug, Clone)]
pub struct Dispatcher<R> {
    registry: R,
    config: DispatcherConfig,
    factory: RequestFactory,
}

impl<R: ProcedureRegistry> Dispatcher<R> {
    pub fn new(registry: R) -> Self {
        Self::with_config(registry, DispatcherConfig::default())
    }

    pub fn with_config(registry: R, config: DispatcherConfig) -> Self {
        Self {
            factory: RequestFactory::from_config(&config),
            registry,
            config,
        }
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Parse a raw payload and execute it.
    ///
    /// # Errors
    ///
    /// Returns the registry's error if a lookup fails.
    pub fn handle_bytes(&self, payload: &[u8]) -> Result<DispatchOutcome, RegistryError> {
        self.execute(self.factory.parse_bytes(payload))
    }

    /// # Errors
    ///
    /// Returns the registry's error if a lookup fails.
    pub fn handle_str(&self, payload: &str) -> Result<DispatchOutcome, RegistryError> {
        self.handle_bytes(payload.as_bytes())
    }

    /// Execute a parsed message.
    ///
    /// Responses pass through unchanged, bare errors are wrapped in a
    /// response, requests and batches are dispatched. Notifications yield
    /// [`DispatchOutcome::NoResponse`], as does a batch whose every element
    /// was a notification.
    ///
    /// # Errors
    ///
    /// Returns the registry's error if a lookup fails. The registry is not
    /// retried.
    pub fn execute(&self, message: JsonRpcMessage) -> Result<DispatchOutcome, RegistryError> {
        match message {
            JsonRpcMessage::Request(request) => {
                let response = self.process_request(&request)?;
                if request.is_notification() {
                    debug!("Notification '{}' handled, no response", request.method());
                    Ok(DispatchOutcome::NoResponse)
                } else {
                    Ok(DispatchOutcome::Response(response))
                }
            }
            JsonRpcMessage::Response(response) if response.is_notification() => {
                Ok(DispatchOutcome::NoResponse)
            }
            JsonRpcMessage::Response(response) => Ok(DispatchOutcome::Response(response)),
            JsonRpcMessage::Error(error) => {
                Ok(DispatchOutcome::Response(JsonRpcResponse::error(None, error)))
            }
            JsonRpcMessage::BatchRequest(batch) => {
                self.process_batch(batch).map(DispatchOutcome::from_batch)
            }
            JsonRpcMessage::BatchResponse(batch) => Ok(DispatchOutcome::from_batch(batch)),
        }
    }

    /// Run a single request through the registry.
    ///
    /// The returned response carries the request's id and is marked as a
    /// notification response when the request had no id.
    ///
    /// # Errors
    ///
    /// Returns the registry's error if a lookup fails.
    pub fn process_request(
        &self,
        request: &JsonRpcRequest,
    ) -> Result<JsonRpcResponse, RegistryError> {
        let method = request.method();
        debug!("Dispatching '{}' (id: {:?})", method, request.id());

        let found = self.registry.has(method).inspect_err(|err| {
            warn!("Procedure registry failed for '{}': {}", method, err);
        })?;
        let response = if found {
            let procedure = self.registry.get(method).inspect_err(|err| {
                warn!("Procedure registry failed for '{}': {}", method, err);
            })?;
            match procedure {
                Procedure::Callable(f) => completed(request, f(request.params()), &self.config),
                Procedure::Responder(responder) => responder.respond(request),
                Procedure::Unbound => not_callable(request),
            }
        } else {
            method_not_found(request)
        };
        Ok(response.answering(request))
    }

    /// Run every element of a batch in order.
    ///
    /// Notification responses are left out (their procedures still run);
    /// elements that failed to parse are always answered.
    ///
    /// # Errors
    ///
    /// Returns the registry's error if a lookup fails; the rest of the batch
    /// is not executed.
    pub fn process_batch(&self, batch: BatchRequest) -> Result<BatchResponse, RegistryError> {
        let mut responses = BatchResponse::with_capacity(batch.len());
        for item in batch {
            match item {
                BatchRequestItem::Request(request) => {
                    let response = self.process_request(&request)?;
                    if !request.is_notification() {
                        responses.push(response);
                    }
                }
                BatchRequestItem::Error { error, id } => responses.push(rejected(error, id)),
            }
        }
        Ok(responses)
    }
}

pub(crate) fn method_not_found(request: &JsonRpcRequest) -> JsonRpcResponse {
    debug!("Method '{}' not found", request.method());
    JsonRpcResponse::error(None, JsonRpcError::method_not_found(request.method()))
}

pub(crate) fn not_callable(request: &JsonRpcRequest) -> JsonRpcResponse {
    debug!("Method '{}' is registered but not callable", request.method());
    let error = JsonRpcError::from_code(
        ErrorCode::ServerError,
        None,
        Some(json!({ "method": request.method() })),
    );
    JsonRpcResponse::error(None, error)
}

/// Turn a procedure's return into the terminal response
pub(crate) fn completed(
    request: &JsonRpcRequest,
    outcome: Result<Value, ProcedureError>,
    config: &DispatcherConfig,
) -> JsonRpcResponse {
    match outcome {
        Ok(value) => JsonRpcResponse::success(None, value),
        Err(err) => {
            warn!("Procedure '{}' failed: {}", request.method(), err);
            let mut data = json!({
                "method": request.method(),
                "params": request.params().to_value(),
            });
            if config.expose_error_cause {
                data["cause"] = Value::String(err.to_string());
            }
            let cause: ErrorCause = err.into();
            let error = JsonRpcError::internal_error(None, Some(data)).with_cause(cause);
            JsonRpcResponse::error(None, error)
        }
    }
}

/// Response for a batch element that never became a request
pub(crate) fn rejected(error: JsonRpcError, id: Option<RequestId>) -> JsonRpcResponse {
    JsonRpcResponse::error(id, error)
}
