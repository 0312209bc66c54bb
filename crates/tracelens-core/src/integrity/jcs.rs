//! JSON Canonicalization Scheme (RFC 8785) serialization for hash inputs.
//!
//! Uses `serde_jcs`, which guarantees lexicographic key ordering, no
//! insignificant whitespace and IEEE 754 number normalization.

use crate::errors::EngineError;
use serde::Serialize;

/// Serialize a value to canonical JSON bytes.
pub fn to_vec<T: Serialize>(value: &T) -> Result<Vec<u8>, EngineError> {
    serde_jcs::to_vec(value).map_err(|e| EngineError::Canonicalize(e.to_string()))
}
