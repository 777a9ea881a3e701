//! Batch containers.
//!
//! A [`Batch`] owns its elements and only accepts values of its element type.
//! Untyped insertion through [`JsonRpcMessage`] is validated and rejects the
//! wrong kind of message instead of dropping it.

use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};

use crate::error::{JsonRpcError, MessageError};
use crate::request::JsonRpcRequest;
use crate::response::{JsonRpcMessage, JsonRpcResponse};
use crate::types::RequestId;

/// Element type that a [`Batch`] can hold
pub trait BatchElement: Sized {
    /// Human readable description used in validation failures
    const EXPECTED: &'static str;

    /// Convert a message into an element.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::InvalidBatchElement`] for messages of the wrong
    /// kind.
    fn from_message(message: JsonRpcMessage) -> Result<Self, MessageError>;
}

/// One element of a request batch
///
/// An `Error` stands in for an element that could not be parsed into a
/// request. It keeps the element's id when one could be recovered.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchRequestItem {
    Request(JsonRpcRequest),
    Error {
        error: JsonRpcError,
        id: Option<RequestId>,
    },
}

impl BatchRequestItem {
    pub fn as_request(&self) -> Option<&JsonRpcRequest> {
        match self {
            BatchRequestItem::Request(request) => Some(request),
            BatchRequestItem::Error { .. } => None,
        }
    }

    pub fn is_notification(&self) -> bool {
        self.as_request().is_some_and(JsonRpcRequest::is_notification)
    }
}

impl From<JsonRpcRequest> for BatchRequestItem {
    fn from(request: JsonRpcRequest) -> Self {
        BatchRequestItem::Request(request)
    }
}

impl From<JsonRpcError> for BatchRequestItem {
    fn from(error: JsonRpcError) -> Self {
        BatchRequestItem::Error { error, id: None }
    }
}

impl BatchElement for BatchRequestItem {
    const EXPECTED: &'static str = "request or error";

    fn from_message(message: JsonRpcMessage) -> Result<Self, MessageError> {
        match message {
            JsonRpcMessage::Request(request) => Ok(BatchRequestItem::Request(request)),
            JsonRpcMessage::Error(error) => Ok(error.into()),
            JsonRpcMessage::Response(response) if response.is_error() => {
                let (_, error, id) = response.into_parts();
                match error {
                    Some(error) => Ok(BatchRequestItem::Error { error, id }),
                    None => Err(invalid_element::<Self>("response")),
                }
            }
            other => Err(invalid_element::<Self>(other.kind())),
        }
    }
}

impl Serialize for BatchRequestItem {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            BatchRequestItem::Request(request) => request.serialize(serializer),
            BatchRequestItem::Error { error, .. } => error.serialize(serializer),
        }
    }
}

impl BatchElement for JsonRpcResponse {
    const EXPECTED: &'static str = "response";

    fn from_message(message: JsonRpcMessage) -> Result<Self, MessageError> {
        match message {
            JsonRpcMessage::Response(response) => Ok(response),
            other => Err(invalid_element::<Self>(other.kind())),
        }
    }
}

fn invalid_element<T: BatchElement>(found: &'static str) -> MessageError {
    MessageError::InvalidBatchElement {
        expected: T::EXPECTED,
        found,
    }
}

/// Ordered, owning container of batch elements
#[derive(Debug, Clone, PartialEq)]
pub struct Batch<T> {
    items: Vec<T>,
}

/// Requests (or stand-in errors) received together
pub type BatchRequest = Batch<BatchRequestItem>;

/// Responses sent back together
pub type BatchResponse = Batch<JsonRpcResponse>;

impl<T> Default for Batch<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: BatchElement> Batch<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, item: impl Into<T>) {
        self.items.push(item.into());
    }

    /// Insert an untyped message.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::InvalidBatchElement`] if the message is not of
    /// the element kind; the batch is left unchanged.
    pub fn try_push(&mut self, message: JsonRpcMessage) -> Result<(), MessageError> {
        self.items.push(T::from_message(message)?);
        Ok(())
    }

    /// Replace every element at once.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::InvalidBatchElement`] on the first message of
    /// the wrong kind; the batch keeps its previous contents.
    pub fn replace_all(&mut self, messages: Vec<JsonRpcMessage>) -> Result<(), MessageError> {
        let items = messages
            .into_iter()
            .map(T::from_message)
            .collect::<Result<Vec<_>, _>>()?;
        self.items = items;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

impl Batch<JsonRpcResponse> {
    /// Responses that would be written to the wire
    pub fn visible(&self) -> impl Iterator<Item = &JsonRpcResponse> {
        self.items.iter().filter(|response| !response.is_notification())
    }

    pub fn has_visible(&self) -> bool {
        self.visible().next().is_some()
    }
}

impl<T: BatchElement> FromIterator<T> for Batch<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl<T> IntoIterator for Batch<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a Batch<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl Serialize for Batch<BatchRequestItem> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.items.len()))?;
        for item in &self.items {
            seq.serialize_element(item)?;
        }
        seq.end()
    }
}

impl Serialize for Batch<JsonRpcResponse> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(None)?;
        for response in self.visible() {
            seq.serialize_element(response)?;
        }
        seq.end()
    }
}
