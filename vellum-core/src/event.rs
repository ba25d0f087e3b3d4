//! Event envelopes.
//!
//! The store treats events as opaque beyond their kind and their order: an
//! [`Event`] is a kind string, a JSON payload, and caller-defined metadata.
//! [`DomainEvent`] is the lightweight marker concrete event structs implement so
//! they can be encoded into and decoded from that envelope.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;
use uuid::Uuid;

/// Marker trait for typed events that can be written to a stream.
///
/// Each event carries a unique [`Self::KIND`] identifier which is stored next
/// to the payload, so readers can route stored data back to the right type.
pub trait DomainEvent {
    const KIND: &'static str;
}

/// An event as submitted to the writer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event<M> {
    /// Type identifier of the payload.
    pub kind: String,
    /// Opaque payload.
    pub data: serde_json::Value,
    /// Infrastructure metadata (causation, actor, ...).
    pub metadata: M,
}

impl<M> Event<M> {
    #[must_use]
    pub fn new(kind: impl Into<String>, data: serde_json::Value, metadata: M) -> Self {
        Self {
            kind: kind.into(),
            data,
            metadata,
        }
    }

    /// Encode a typed domain event into an envelope.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if the event cannot be serialised.
    pub fn encode<E>(event: &E, metadata: M) -> Result<Self, serde_json::Error>
    where
        E: DomainEvent + Serialize,
    {
        Ok(Self {
            kind: E::KIND.to_string(),
            data: serde_json::to_value(event)?,
            metadata,
        })
    }
}

/// Error returned when decoding a recorded event into a typed event fails.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The stored kind does not match the requested type.
    #[error("unexpected event kind `{found}`, expected `{expected}`")]
    KindMismatch {
        expected: &'static str,
        found: String,
    },
    /// The payload did not deserialise into the requested type.
    #[error("failed to decode event payload: {0}")]
    Payload(#[source] serde_json::Error),
}

/// An event read back from a stream, with its position in that stream.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedEvent<M> {
    /// Name of the stream the event belongs to.
    pub stream: String,
    /// Id of the commit that wrote the event.
    pub commit_id: Uuid,
    /// Version of the stream after this event was applied.
    pub version: u64,
    pub event: Event<M>,
}

impl<M> RecordedEvent<M> {
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.event.kind
    }

    /// Decode the payload into a typed domain event.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::KindMismatch`] if the stored kind is not
    /// `E::KIND`, or [`DecodeError::Payload`] if deserialisation fails.
    pub fn decode<E>(&self) -> Result<E, DecodeError>
    where
        E: DomainEvent + DeserializeOwned,
    {
        if self.event.kind != E::KIND {
            return Err(DecodeError::KindMismatch {
                expected: E::KIND,
                found: self.event.kind.clone(),
            });
        }
        E::deserialize(&self.event.data).map_err(DecodeError::Payload)
    }
}
