use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier for a document in the collection.
///
/// Signed so that the executor protocol can use the negative sentinels
/// [`NOT_STARTED`] and [`EXHAUSTED`].
pub type DocId = i32;

/// Sentinel: an executor that has not been asked for a document yet
pub const NOT_STARTED: DocId = -2;

/// Sentinel: an executor that has no more documents
pub const EXHAUSTED: DocId = -1;

/// Identifier for a term within one sub-index (its rank in string order)
pub type TermId = u32;

/// Token position within a document
pub type Position = u32;

/// Default cap on live executors held by an [`ExecutorsList`](crate::query::ExecutorsList)
pub const DEFAULT_EXECUTOR_CACHE_SIZE: usize = 100_000;

/// Default number of idle readers kept per pool
pub const DEFAULT_READER_POOL_SIZE: usize = 16;

/// Which index space a sub-index belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IndexType {
    #[default]
    Tokens,
    Annotations,
}

impl fmt::Display for IndexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexType::Tokens => f.write_str("token"),
            IndexType::Annotations => f.write_str("annotation"),
        }
    }
}

/// Normalisation applied to terms at indexing time and to query terms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TermTransform {
    /// Terms are used verbatim
    #[default]
    Identity,
    /// Terms are lowercased
    Lowercase,
}

impl TermTransform {
    pub fn apply(&self, term: &str) -> String {
        match self {
            TermTransform::Identity => term.to_string(),
            TermTransform::Lowercase => term.to_lowercase(),
        }
    }
}

/// Configuration of one token feature sub-index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenIndexConfig {
    /// Feature name; also the sub-index name
    pub feature: String,
    #[serde(default)]
    pub transform: TermTransform,
    /// Whether the document -> terms side is kept
    #[serde(default)]
    pub direct_index: bool,
}

/// Configuration of one annotation sub-index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationIndexConfig {
    /// Annotation type; also the sub-index name
    pub annotation_type: String,
    #[serde(default)]
    pub direct_index: bool,
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub token_indexes: Vec<TokenIndexConfig>,
    pub annotation_indexes: Vec<AnnotationIndexConfig>,
    /// Keep nested bindings on compound hits
    pub sub_bindings_enabled: bool,
    /// Maximum number of live executors per OR fan-out
    pub executor_cache_size: usize,
    /// Maximum number of idle readers kept per pool
    pub reader_pool_size: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            token_indexes: vec![TokenIndexConfig {
                feature: "string".to_string(),
                transform: TermTransform::Lowercase,
                direct_index: true,
            }],
            annotation_indexes: Vec::new(),
            sub_bindings_enabled: false,
            executor_cache_size: DEFAULT_EXECUTOR_CACHE_SIZE,
            reader_pool_size: DEFAULT_READER_POOL_SIZE,
        }
    }
}

impl IndexConfig {
    /// Look up a token feature by name
    pub fn token_index(&self, feature: &str) -> Option<&TokenIndexConfig> {
        self.token_indexes.iter().find(|c| c.feature == feature)
    }

    /// Look up an annotation sub-index by annotation type
    pub fn annotation_index(&self, annotation_type: &str) -> Option<&AnnotationIndexConfig> {
        self.annotation_indexes
            .iter()
            .find(|c| c.annotation_type == annotation_type)
    }
}
