//! Error types for query compilation and execution

use crate::index::types::{DocId, IndexType, Position};
use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, QueryError>;

/// Query engine errors
///
/// Configuration problems are reported while compiling a query, before any
/// hit is produced. Read failures propagate unchanged through the executor
/// tree; nothing at this layer retries.
#[derive(Debug, Error)]
pub enum QueryError {
    // Configuration errors
    #[error("Unknown {kind} index: {name}")]
    UnknownIndex { kind: IndexType, name: String },

    #[error("No direct index configured for {kind} index {name}")]
    NoDirectIndex { kind: IndexType, name: String },

    #[error("No semantic annotation helper registered for annotation type {0}")]
    UnknownAnnotationType(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Invalid constraint on feature {feature}: {reason}")]
    InvalidConstraint { feature: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    // Execution errors
    #[error("Annotation helper failed: {0}")]
    Helper(String),

    #[error(
        "Disjunct {index} could not be resynchronised to document {document} (replay landed on {landed})"
    )]
    Resync {
        index: usize,
        document: DocId,
        landed: DocId,
    },

    #[error("Hit at document {document} position {position} is longer than the position range")]
    SpanOverflow { document: DocId, position: Position },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
