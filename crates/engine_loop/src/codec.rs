//! MessagePack codec helpers.
//!
//! Command payloads travel as MessagePack bytes when the caller only knows the
//! command's numeric type id (see
//! [`MessageLoop::enqueue_command_raw`](crate::MessageLoop::enqueue_command_raw)).
//! The bytes are an in-process convenience, not a stable format.

use serde::{Deserialize, Serialize};

use crate::error::LoopError;

/// Encode a value to MessagePack bytes.
///
/// # Errors
///
/// Returns [`LoopError::Encode`] if serialisation fails.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, LoopError> {
    rmp_serde::to_vec(value).map_err(LoopError::Encode)
}

/// Decode a value from MessagePack bytes.
///
/// # Errors
///
/// Returns [`LoopError::Decode`] if deserialisation fails.
pub fn decode<'a, T: Deserialize<'a>>(bytes: &'a [u8]) -> Result<T, LoopError> {
    rmp_serde::from_slice(bytes).map_err(LoopError::Decode)
}
