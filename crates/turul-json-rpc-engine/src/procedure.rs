//! Procedures and the registry the dispatcher looks them up in.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::request::JsonRpcRequest;
use crate::response::JsonRpcResponse;
use crate::types::RequestParams;

/// Failure returned by a procedure
pub type ProcedureError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Plain callable procedure body
pub type ProcedureFn = dyn Fn(&RequestParams) -> Result<Value, ProcedureError> + Send + Sync;

/// A procedure that builds its own complete response
///
/// Whatever id the responder puts on its response, the dispatcher replaces it
/// with the id of the request being answered.
pub trait Responder: Send + Sync {
    fn respond(&self, request: &JsonRpcRequest) -> JsonRpcResponse;
}

impl<F> Responder for F
where
    F: Fn(&JsonRpcRequest) -> JsonRpcResponse + Send + Sync,
{
    fn respond(&self, request: &JsonRpcRequest) -> JsonRpcResponse {
        self(request)
    }
}

/// A registered procedure target
#[derive(Clone)]
pub enum Procedure {
    /// Returns a plain value, or fails
    Callable(Arc<ProcedureFn>),
    /// Supplies its own response
    Responder(Arc<dyn Responder>),
    /// Registered name with nothing invocable behind it
    Unbound,
}

impl Procedure {
    pub fn callable<F>(f: F) -> Self
    where
        F: Fn(&RequestParams) -> Result<Value, ProcedureError> + Send + Sync + 'static,
    {
        Procedure::Callable(Arc::new(f))
    }

    pub fn responder<R>(responder: R) -> Self
    where
        R: Responder + 'static,
    {
        Procedure::Responder(Arc::new(responder))
    }

    pub fn is_callable(&self) -> bool {
        !matches!(self, Procedure::Unbound)
    }
}

impl fmt::Debug for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Procedure::Callable(_) => f.write_str("Procedure::Callable"),
            Procedure::Responder(_) => f.write_str("Procedure::Responder"),
            Procedure::Unbound => f.write_str("Procedure::Unbound"),
        }
    }
}

/// Failures of the registry itself
///
/// These are not protocol outcomes; the dispatcher hands them back to its
/// caller untouched.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Procedure registry unavailable: {0}")]
    Unavailable(String),

    #[error("Lookup of '{name}' failed: {source}")]
    Lookup {
        name: String,
        #[source]
        source: ProcedureError,
    },

    #[error("Procedure '{0}' was reported present but could not be retrieved")]
    Missing(String),
}

/// Lookup-by-name capability used by the dispatcher
pub trait ProcedureRegistry {
    /// # Errors
    ///
    /// Returns a [`RegistryError`] when the registry cannot answer.
    fn has(&self, name: &str) -> Result<bool, RegistryError>;

    /// # Errors
    ///
    /// Returns a [`RegistryError`] when the registry cannot answer or the name
    /// is not registered.
    fn get(&self, name: &str) -> Result<Procedure, RegistryError>;
}

impl<R: ProcedureRegistry + ?Sized> ProcedureRegistry for &R {
    fn has(&self, name: &str) -> Result<bool, RegistryError> {
        (**self).has(name)
    }

    fn get(&self, name: &str) -> Result<Procedure, RegistryError> {
        (**self).get(name)
    }
}

impl<R: ProcedureRegistry + ?Sized> ProcedureRegistry for Arc<R> {
    fn has(&self, name: &str) -> Result<bool, RegistryError> {
        (**self).has(name)
    }

    fn get(&self, name: &str) -> Result<Procedure, RegistryError> {
        (**self).get(name)
    }
}

impl ProcedureRegistry for HashMap<String, Procedure> {
    fn has(&self, name: &str) -> Result<bool, RegistryError> {
        Ok(self.contains_key(name))
    }

    fn get(&self, name: &str) -> Result<Procedure, RegistryError> {
        HashMap::get(self, name)
            .cloned()
            .ok_or_else(|| RegistryError::Missing(name.to_string()))
    }
}

/// In-memory procedure registry
#[derive(Debug, Clone, Default)]
pub struct ProcedureTable {
    procedures: HashMap<String, Procedure>,
}

impl ProcedureTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, procedure: Procedure) -> &mut Self {
        self.procedures.insert(name.into(), procedure);
        self
    }

    /// Register a plain callable
    pub fn register_fn<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&RequestParams) -> Result<Value, ProcedureError> + Send + Sync + 'static,
    {
        self.register(name, Procedure::callable(f))
    }

    pub fn register_responder<R>(&mut self, name: impl Into<String>, responder: R) -> &mut Self
    where
        R: Responder + 'static,
    {
        self.register(name, Procedure::responder(responder))
    }

    pub fn remove(&mut self, name: &str) -> Option<Procedure> {
        self.procedures.remove(name)
    }

    /// Get all registered method names
    pub fn registered_methods(&self) -> Vec<String> {
        self.procedures.keys().cloned().collect()
    }
}

impl ProcedureRegistry for ProcedureTable {
    fn has(&self, name: &str) -> Result<bool, RegistryError> {
        self.procedures.has(name)
    }

    fn get(&self, name: &str) -> Result<Procedure, RegistryError> {
        ProcedureRegistry::get(&self.procedures, name)
    }
}
