//! Bridge failure kinds.

use thiserror::Error;

/// Failures at the external-parser boundary.
///
/// The two variants are deliberately distinct so callers can tell "the
/// parser disagreed with the source" apart from "the bridge protocol
/// broke". Either aborts only the parse that hit it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BridgeError {
    /// The external parser could not be reached or reported failure.
    #[error("parser backend failure: {0}")]
    Backend(String),
    /// The serialized buffer (or the context being encoded for it) was
    /// malformed, truncated, or used an unrecognized tag. No partial
    /// tree is ever returned.
    #[error("parse buffer decode failure: {0}")]
    Decode(String),
}
