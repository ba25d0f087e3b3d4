//! Encoding of opaque snapshot state.
//!
//! The snapshot store only moves bytes plus a type identifier. Turning typed
//! state into those bytes is the job of a [`Codec`], supplied by the caller.
//! Codec errors are never interpreted by this crate; they are surfaced as-is.

use serde::{Serialize, de::DeserializeOwned};

/// Serialisation strategy for snapshot state.
pub trait Codec: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Encode a value to bytes.
    ///
    /// # Errors
    ///
    /// Returns a codec-specific error if the value cannot be encoded.
    fn serialize<T>(&self, value: &T) -> Result<Vec<u8>, Self::Error>
    where
        T: Serialize;

    /// Decode bytes produced by [`Codec::serialize`].
    ///
    /// # Errors
    ///
    /// Returns a codec-specific error if the bytes do not decode into `T`.
    fn deserialize<T>(&self, data: &[u8]) -> Result<T, Self::Error>
    where
        T: DeserializeOwned;
}

/// JSON codec backed by `serde_json`.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    type Error = serde_json::Error;

    fn serialize<T>(&self, value: &T) -> Result<Vec<u8>, Self::Error>
    where
        T: Serialize,
    {
        serde_json::to_vec(value)
    }

    fn deserialize<T>(&self, data: &[u8]) -> Result<T, Self::Error>
    where
        T: DeserializeOwned,
    {
        serde_json::from_slice(data)
    }
}
