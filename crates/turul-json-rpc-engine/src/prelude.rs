//! # JSON-RPC Engine Prelude
//!
//! This module provides convenient re-exports of the most commonly used types
//! from the JSON-RPC engine.
//!
//! ```rust
//! use turul_json_rpc_engine::prelude::*;
//! ```

// Message model
pub use crate::batch::{BatchRequest, BatchRequestItem, BatchResponse};
pub use crate::code::ErrorCode;
pub use crate::error::{JsonRpcError, MessageError};
pub use crate::request::JsonRpcRequest;
pub use crate::response::{JsonRpcMessage, JsonRpcResponse};
pub use crate::types::{JsonRpcVersion, RequestId, RequestParams};

// Dispatch
pub use crate::config::DispatcherConfig;
pub use crate::dispatch::{DispatchOutcome, Dispatcher};
pub use crate::factory::RequestFactory;
pub use crate::procedure::{Procedure, ProcedureError, ProcedureRegistry, ProcedureTable, Responder};

#[cfg(feature = "async")]
pub use crate::r#async::{
    AsyncDispatcher, AsyncHandler, AsyncProcedure, AsyncProcedureRegistry, AsyncProcedureTable,
    FunctionHandler,
};

// Standard error codes
pub use crate::error_codes::*;
