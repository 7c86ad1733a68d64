//! Core error types for evaltrace-core.
//!
//! Uses `thiserror` for structured, matchable error variants covering the
//! failure modes of building expression trees from host-provided tokens.

use thiserror::Error;

/// Core errors produced by the evaltrace-core crate.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// An operator token does not name any binary or unary operator.
    #[error("unknown operator: '{token}'")]
    UnknownOperator { token: String },
}
