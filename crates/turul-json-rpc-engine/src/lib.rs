//! # JSON-RPC 2.0 Engine
//!
//! A transport-agnostic JSON-RPC 2.0 message model and dispatch engine.
//! Raw payloads go in, JSON-RPC 2.0 responses (or nothing, for
//! notifications) come out.
//!
//! ## Features
//! - Validated message types: a request cannot use a reserved `rpc.` method,
//!   a response cannot carry both a result and an error, an error code must
//!   resolve to the standard catalog
//! - Batches with mixed valid and malformed elements
//! - Notifications are executed but never answered
//! - Synchronous dispatcher over any [`ProcedureRegistry`], plus an async
//!   dispatcher with the `async` feature
//!
//! ```rust
//! use serde_json::{json, Value};
//! use turul_json_rpc_engine::prelude::*;
//!
//! let mut procedures = ProcedureTable::new();
//! procedures.register_fn("sum", |params| {
//!     let a = params.get_index(0).and_then(Value::as_i64).ok_or("a is required")?;
//!     let b = params.get_index(1).and_then(Value::as_i64).ok_or("b is required")?;
//!     Ok(json!(a + b))
//! });
//!
//! let dispatcher = Dispatcher::new(procedures);
//! let outcome = dispatcher
//!     .handle_str(r#"{"jsonrpc":"2.0","method":"sum","params":[2,3],"id":1}"#)
//!     .unwrap();
//! assert_eq!(outcome.to_json_string().unwrap(), r#"{"jsonrpc":"2.0","result":5,"id":1}"#);
//! ```

pub mod batch;
pub mod code;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod factory;
pub mod prelude;
pub mod procedure;
pub mod request;
pub mod response;
pub mod types;

#[cfg(feature = "async")]
pub mod r#async;

// Re-export main types
pub use batch::{Batch, BatchElement, BatchRequest, BatchRequestItem, BatchResponse};
pub use code::ErrorCode;
pub use config::DispatcherConfig;
pub use dispatch::{DispatchOutcome, Dispatcher};
pub use error::{ErrorCause, JsonRpcError, MessageError};
pub use factory::RequestFactory;
pub use procedure::{
    Procedure, ProcedureError, ProcedureRegistry, ProcedureTable, RegistryError, Responder,
};
pub use request::JsonRpcRequest;
pub use response::{JsonRpcMessage, JsonRpcResponse};
pub use types::{JsonRpcVersion, RequestId, RequestParams};

#[cfg(feature = "async")]
pub use r#async::{
    AsyncDispatcher, AsyncHandler, AsyncProcedure, AsyncProcedureRegistry, AsyncProcedureTable,
    FunctionHandler,
};

/// JSON-RPC 2.0 version constant
pub const JSONRPC_VERSION: &str = "2.0";

/// Standard JSON-RPC 2.0 error codes
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;

    // Server error range: -32099 to -32000
    pub const SERVER_ERROR_START: i64 = -32099;
    pub const SERVER_ERROR_END: i64 = -32000;
}
