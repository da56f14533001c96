//! Error definitions for all `configrule` engine stages.

use thiserror::Error;

#[derive(Debug, Error)]
/// Top-level error type returned by public APIs.
pub enum RuleError {
    /// Invalid parameter schema (duplicate names, list type without options).
    #[error("schema error: {0}")]
    Schema(String),
    /// Document generation or regeneration failure.
    #[error("document error: {0}")]
    Document(String),
    /// User-body extraction failure (malformed closing brace).
    #[error("extraction error: {0}")]
    Extraction(String),
    /// Script lexing, parsing, or evaluation failure.
    #[error("script error: {0}")]
    Script(String),
    /// Ordering operation failure (unknown entity, unorderable group).
    #[error("ordering error: {0}")]
    Ordering(String),
    /// Persistence-boundary failure reported by a record or rule store.
    #[error("store error: {0}")]
    Store(String),
}
