//! Async dispatch.
//!
//! Same terminal states as [`crate::dispatch::Dispatcher`], for procedures
//! that need to await. Batch elements run concurrently; the response batch
//! keeps the input order.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, warn};

use crate::batch::{BatchRequest, BatchRequestItem, BatchResponse};
use crate::config::DispatcherConfig;
use crate::dispatch::{DispatchOutcome, completed, method_not_found, not_callable, rejected};
use crate::factory::RequestFactory;
use crate::procedure::{ProcedureError, RegistryError, Responder};
use crate::request::JsonRpcRequest;
use crate::response::{JsonRpcMessage, JsonRpcResponse};
use crate::types::RequestParams;

/// Trait for handling JSON-RPC method calls asynchronously
#[async_trait]
pub trait AsyncHandler: Send + Sync {
    /// Handle a call. Failures become Internal error responses.
    async fn handle(&self, request: &JsonRpcRequest) -> Result<Value, ProcedureError>;

    /// List supported methods (optional - used for introspection)
    fn supported_methods(&self) -> Vec<String> {
        vec![]
    }
}

/// A simple function-based handler
pub struct FunctionHandler<F> {
    handler_fn: F,
    methods: Vec<String>,
}

impl<F, Fut> FunctionHandler<F>
where
    F: Fn(RequestParams) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, ProcedureError>> + Send + 'static,
{
    pub fn new(handler_fn: F) -> Self {
        Self {
            handler_fn,
            methods: vec![],
        }
    }

    pub fn with_methods(mut self, methods: Vec<String>) -> Self {
        self.methods = methods;
        self
    }
}

#[async_trait]
impl<F, Fut> AsyncHandler for FunctionHandler<F>
where
    F: Fn(RequestParams) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, ProcedureError>> + Send + 'static,
{
    async fn handle(&self, request: &JsonRpcRequest) -> Result<Value, ProcedureError> {
        (self.handler_fn)(request.params().clone()).await
    }

    fn supported_methods(&self) -> Vec<String> {
        self.methods.clone()
    }
}

/// A registered async procedure target
#[derive(Clone)]
pub enum AsyncProcedure {
    /// Awaited for a plain value, or a failure
    Handler(Arc<dyn AsyncHandler>),
    /// Supplies its own response
    Responder(Arc<dyn Responder>),
    /// Registered name with nothing invocable behind it
    Unbound,
}

impl AsyncProcedure {
    pub fn handler<H>(handler: H) -> Self
    where
        H: AsyncHandler + 'static,
    {
        AsyncProcedure::Handler(Arc::new(handler))
    }

    pub fn responder<R>(responder: R) -> Self
    where
        R: Responder + 'static,
    {
        AsyncProcedure::Responder(Arc::new(responder))
    }
}

impl fmt::Debug for AsyncProcedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsyncProcedure::Handler(_) => f.write_str("AsyncProcedure::Handler"),
            AsyncProcedure::Responder(_) => f.write_str("AsyncProcedure::Responder"),
            AsyncProcedure::Unbound => f.write_str("AsyncProcedure::Unbound"),
        }
    }
}

/// Lookup-by-name capability used by the async dispatcher
#[async_trait]
pub trait AsyncProcedureRegistry: Send + Sync {
    /// # Errors
    ///
    /// Returns a [`RegistryError`] when the registry cannot answer.
    async fn has(&self, name: &str) -> Result<bool, RegistryError>;

    /// # Errors
    ///
    /// Returns a [`RegistryError`] when the registry cannot answer or the name
    /// is not registered.
    async fn get(&self, name: &str) -> Result<AsyncProcedure, RegistryError>;
}

#[async_trait]
impl<R: AsyncProcedureRegistry + ?Sized> AsyncProcedureRegistry for Arc<R> {
    async fn has(&self, name: &str) -> Result<bool, RegistryError> {
        (**self).has(name).await
    }

    async fn get(&self, name: &str) -> Result<AsyncProcedure, RegistryError> {
        (**self).get(name).await
    }
}

/// In-memory async procedure registry
#[derive(Debug, Clone, Default)]
pub struct AsyncProcedureTable {
    procedures: HashMap<String, AsyncProcedure>,
}

impl AsyncProcedureTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, procedure: AsyncProcedure) -> &mut Self {
        self.procedures.insert(name.into(), procedure);
        self
    }

    /// Register a handler for a specific method
    pub fn register_method<H>(&mut self, method: impl Into<String>, handler: H) -> &mut Self
    where
        H: AsyncHandler + 'static,
    {
        self.register(method, AsyncProcedure::handler(handler))
    }

    /// Register a handler for every method it reports as supported
    pub fn register_handler<H>(&mut self, handler: H) -> &mut Self
    where
        H: AsyncHandler + 'static,
    {
        let handler: Arc<dyn AsyncHandler> = Arc::new(handler);
        for method in handler.supported_methods() {
            self.procedures.insert(method, AsyncProcedure::Handler(handler.clone()));
        }
        self
    }

    pub fn register_responder<R>(&mut self, name: impl Into<String>, responder: R) -> &mut Self
    where
        R: Responder + 'static,
    {
        self.register(name, AsyncProcedure::responder(responder))
    }

    pub fn remove(&mut self, name: &str) -> Option<AsyncProcedure> {
        self.procedures.remove(name)
    }

    /// Get all registered methods
    pub fn registered_methods(&self) -> Vec<String> {
        self.procedures.keys().cloned().collect()
    }
}

#[async_trait]
impl AsyncProcedureRegistry for AsyncProcedureTable {
    async fn has(&self, name: &str) -> Result<bool, RegistryError> {
        Ok(self.procedures.contains_key(name))
    }

    async fn get(&self, name: &str) -> Result<AsyncProcedure, RegistryError> {
        self.procedures
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::Missing(name.to_string()))
    }
}

/// JSON-RPC method dispatcher for async procedures
pub struct AsyncDispatcher<R = AsyncProcedureTable> {
    registry: R,
    config: DispatcherConfig,
    factory: RequestFactory,
}

impl AsyncDispatcher<AsyncProcedureTable> {
    pub fn new() -> Self {
        Self::with_config(DispatcherConfig::default())
    }

    pub fn with_config(config: DispatcherConfig) -> Self {
        Self::with_registry(AsyncProcedureTable::new(), config)
    }

    /// Register a handler for a specific method
    pub fn register_method<H>(&mut self, method: impl Into<String>, handler: H)
    where
        H: AsyncHandler + 'static,
    {
        self.registry.register_method(method, handler);
    }

    /// Register a handler for every method it reports as supported
    pub fn register_handler<H>(&mut self, handler: H)
    where
        H: AsyncHandler + 'static,
    {
        self.registry.register_handler(handler);
    }

    pub fn register_responder<Resp>(&mut self, name: impl Into<String>, responder: Resp)
    where
        Resp: Responder + 'static,
    {
        self.registry.register_responder(name, responder);
    }

    pub fn register(&mut self, name: impl Into<String>, procedure: AsyncProcedure) {
        self.registry.register(name, procedure);
    }

    /// Get all registered methods
    pub fn registered_methods(&self) -> Vec<String> {
        self.registry.registered_methods()
    }
}

impl<R: AsyncProcedureRegistry> AsyncDispatcher<R> {
    pub fn with_registry(registry: R, config: DispatcherConfig) -> Self {
        Self {
            registry,
            factory: RequestFactory::from_config(&config),
            config,
        }
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// # Errors
    ///
    /// Returns the registry's error if a lookup fails.
    pub async fn handle_bytes(&self, payload: &[u8]) -> Result<DispatchOutcome, RegistryError> {
        self.execute(self.factory.parse_bytes(payload)).await
    }

    /// Execute a parsed message, awaiting procedures as needed.
    ///
    /// # Errors
    ///
    /// Returns the registry's error if a lookup fails. The registry is not
    /// retried.
    pub async fn execute(&self, message: JsonRpcMessage) -> Result<DispatchOutcome, RegistryError> {
        match message {
            JsonRpcMessage::Request(request) => {
                let response = self.process_request(&request).await?;
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
                let responses = self.process_batch(batch).await?;
                Ok(DispatchOutcome::from_batch(responses))
            }
            JsonRpcMessage::BatchResponse(batch) => Ok(DispatchOutcome::from_batch(batch)),
        }
    }

    /// # Errors
    ///
    /// Returns the registry's error if a lookup fails.
    pub async fn process_request(
        &self,
        request: &JsonRpcRequest,
    ) -> Result<JsonRpcResponse, RegistryError> {
        let method = request.method();
        debug!("Dispatching '{}' (id: {:?})", method, request.id());

        let found = self.registry.has(method).await.inspect_err(|err| {
            warn!("Procedure registry failed for '{}': {}", method, err);
        })?;
        let response = if found {
            let procedure = self.registry.get(method).await.inspect_err(|err| {
                warn!("Procedure registry failed for '{}': {}", method, err);
            })?;
            match procedure {
                AsyncProcedure::Handler(handler) => {
                    completed(request, handler.handle(request).await, &self.config)
                }
                AsyncProcedure::Responder(responder) => responder.respond(request),
                AsyncProcedure::Unbound => not_callable(request),
            }
        } else {
            method_not_found(request)
        };
        Ok(response.answering(request))
    }

    /// Run every element of a batch concurrently; the responses keep the
    /// input order.
    ///
    /// # Errors
    ///
    /// Returns the first registry error in input order. Elements already
    /// running are still awaited.
    pub async fn process_batch(&self, batch: BatchRequest) -> Result<BatchResponse, RegistryError> {
        let pending = batch.into_iter().map(|item| async move {
            match item {
                BatchRequestItem::Request(request) => {
                    let response = self.process_request(&request).await?;
                    Ok((!request.is_notification()).then_some(response))
                }
                BatchRequestItem::Error { error, id } => Ok(Some(rejected(error, id))),
            }
        });
        let responses = join_all(pending)
            .await
            .into_iter()
            .collect::<Result<Vec<Option<JsonRpcResponse>>, RegistryError>>()?;
        Ok(responses.into_iter().flatten().collect())
    }
}

impl Default for AsyncDispatcher<AsyncProcedureTable> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RequestId;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct SlowEcho;

    #[async_trait]
    impl AsyncHandler for SlowEcho {
        async fn handle(&self, request: &JsonRpcRequest) -> Result<Value, ProcedureError> {
            let delay = request.get_param_index(0).and_then(Value::as_u64).unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok(json!(delay))
        }

        fn supported_methods(&self) -> Vec<String> {
            vec!["echo".to_string()]
        }
    }

    #[tokio::test]
    async fn test_async_success() {
        let mut dispatcher = AsyncDispatcher::new();
        dispatcher.register_handler(SlowEcho);

        let outcome = dispatcher
            .handle_bytes(br#"{"jsonrpc":"2.0","method":"echo","params":[1],"id":1}"#)
            .await
            .unwrap();
        let response = outcome.as_response().unwrap();
        assert_eq!(response.result(), Some(&json!(1)));
        assert_eq!(response.id(), Some(&RequestId::Number(1)));
    }

    #[tokio::test]
    async fn test_async_method_not_found() {
        let dispatcher = AsyncDispatcher::new();
        let outcome = dispatcher
            .handle_bytes(br#"{"jsonrpc":"2.0","method":"ghost","id":"q"}"#)
            .await
            .unwrap();
        assert!(outcome.is_error());
        assert_eq!(outcome.as_response().unwrap().id(), Some(&RequestId::from("q")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_order_preserved() {
        let mut dispatcher = AsyncDispatcher::new();
        dispatcher.register_handler(SlowEcho);

        let outcome = dispatcher
            .handle_bytes(
                br#"[
                    {"jsonrpc":"2.0","method":"echo","params":[30],"id":1},
                    {"jsonrpc":"2.0","method":"echo","params":[10],"id":2},
                    {"jsonrpc":"2.0","method":"echo","params":[20]},
                    {"jsonrpc":"2.0","method":"echo","params":[0],"id":3}
                ]"#,
            )
            .await
            .unwrap();
        let batch = outcome.as_batch().unwrap();
        let ids: Vec<_> = batch.iter().filter_map(|r| r.id().and_then(RequestId::as_i64)).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_notification_runs_without_response() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut dispatcher = AsyncDispatcher::new();
        dispatcher.register_method(
            "notify",
            FunctionHandler::new(move |_params| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok::<Value, ProcedureError>(Value::Null) }
            }),
        );

        let outcome = dispatcher
            .handle_bytes(br#"{"jsonrpc":"2.0","method":"notify"}"#)
            .await
            .unwrap();
        assert_eq!(outcome, DispatchOutcome::NoResponse);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_handler_failure_becomes_internal_error() {
        let mut dispatcher = AsyncDispatcher::new();
        dispatcher.register_method(
            "fail",
            FunctionHandler::new(|_params| async {
                Err::<Value, ProcedureError>("a is required".into())
            }),
        );

        let outcome = dispatcher
            .handle_bytes(br#"{"jsonrpc":"2.0","method":"fail","id":5}"#)
            .await
            .unwrap();
        let error = outcome.as_response().and_then(JsonRpcResponse::error_object).unwrap();
        assert_eq!(error.code(), -32603);
        assert_eq!(error.cause().unwrap().to_string(), "a is required");
        assert_eq!(error.data(), Some(&json!({"method": "fail", "params": []})));
    }

    #[tokio::test]
    async fn test_unbound_method_is_not_callable() {
        let mut dispatcher = AsyncDispatcher::new();
        dispatcher.register("multiply", AsyncProcedure::Unbound);

        let outcome = dispatcher
            .handle_bytes(br#"{"jsonrpc":"2.0","method":"multiply","params":[2,3],"id":4}"#)
            .await
            .unwrap();
        let response = outcome.as_response().unwrap();
        let error = response.error_object().unwrap();
        assert_eq!(error.code(), -32099);
        assert_eq!(error.data(), Some(&json!({"method": "multiply"})));
        assert_eq!(response.id(), Some(&RequestId::Number(4)));
    }

    #[tokio::test]
    async fn test_responder_id_is_overwritten() {
        let mut dispatcher = AsyncDispatcher::new();
        dispatcher.register_responder("custom", |_: &JsonRpcRequest| {
            JsonRpcResponse::success(Some(RequestId::from("wrong")), json!("custom"))
        });

        let outcome = dispatcher
            .handle_bytes(br#"{"jsonrpc":"2.0","method":"custom","id":11}"#)
            .await
            .unwrap();
        let response = outcome.as_response().unwrap();
        assert_eq!(response.result(), Some(&json!("custom")));
        assert_eq!(response.id(), Some(&RequestId::Number(11)));

        let outcome = dispatcher
            .handle_bytes(br#"{"jsonrpc":"2.0","method":"custom"}"#)
            .await
            .unwrap();
        assert_eq!(outcome, DispatchOutcome::NoResponse);
    }

    struct OfflineRegistry;

    #[async_trait]
    impl AsyncProcedureRegistry for OfflineRegistry {
        async fn has(&self, _name: &str) -> Result<bool, RegistryError> {
            Err(RegistryError::Unavailable("offline".to_string()))
        }

        async fn get(&self, name: &str) -> Result<AsyncProcedure, RegistryError> {
            Err(RegistryError::Missing(name.to_string()))
        }
    }

    #[tokio::test]
    async fn test_registry_failure_propagates() {
        let dispatcher =
            AsyncDispatcher::with_registry(OfflineRegistry, DispatcherConfig::default());

        let result = dispatcher
            .handle_bytes(
                br#"[{"jsonrpc":"2.0","method":"a","id":1},{"jsonrpc":"2.0","method":"b"}]"#,
            )
            .await;
        assert!(matches!(result, Err(RegistryError::Unavailable(_))));

        let outcome = dispatcher.handle_bytes(b"[]").await.unwrap();
        assert!(outcome.is_error());
    }

    #[tokio::test]
    async fn test_shared_table_registry() {
        let mut table = AsyncProcedureTable::new();
        table.register_method(
            "ping",
            FunctionHandler::new(|_params| async { Ok::<Value, ProcedureError>(json!("pong")) }),
        );
        let dispatcher =
            AsyncDispatcher::with_registry(Arc::new(table), DispatcherConfig::default());

        let outcome = dispatcher
            .handle_bytes(br#"{"jsonrpc":"2.0","method":"ping","id":1}"#)
            .await
            .unwrap();
        assert_eq!(outcome.as_response().unwrap().result(), Some(&json!("pong")));
        assert_eq!(dispatcher.registry().registered_methods(), vec!["ping".to_string()]);
    }
}
