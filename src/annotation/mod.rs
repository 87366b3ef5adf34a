//! Semantic annotation helpers
//!
//! An annotation query names an annotation type and a set of feature
//! constraints. The helper registered for that type turns them into the
//! list of matching mentions; each mention is a URI indexed in the
//! annotation sub-index plus the span length the index does not store.

pub mod constraint;
pub mod memory;

pub use constraint::{Constraint, ConstraintMatcher, Predicate};
pub use memory::MemoryAnnotationHelper;

use crate::engine::Engine;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// A mention URI and the length of the spans it annotates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mention {
    pub uri: String,
    pub length: u32,
}

/// Resolves annotation constraints to mentions.
///
/// Implementations may be expensive (database or triple-store lookups). The
/// engine calls `init` once, then any number of `mentions`, then `close`.
pub trait SemanticAnnotationHelper: Send + Sync {
    fn init(&self, _engine: &Engine) -> Result<()> {
        Ok(())
    }

    /// Mentions of `annotation_type` satisfying every constraint
    fn mentions(
        &self,
        annotation_type: &str,
        constraints: &[Constraint],
        engine: &Engine,
    ) -> Result<Vec<Mention>>;

    /// Human-readable form of a mention URI, if known
    fn describe_mention(&self, _uri: &str) -> Option<String> {
        None
    }

    fn close(&self, _engine: &Engine) {}
}
