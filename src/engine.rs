//! The engine: sub-index pools, annotation helpers and run settings shared
//! by every executor compiled against it.

use crate::annotation::SemanticAnnotationHelper;
use crate::error::{QueryError, Result};
use crate::index::positional::PositionalIndex;
use crate::index::reader::IndexReaderPool;
use crate::index::types::{DocId, IndexConfig, IndexType};
use ahash::AHashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// Handle to an open collection. Cloning is cheap and clones share state.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    config: IndexConfig,
    token_indexes: AHashMap<String, Arc<IndexReaderPool>>,
    annotation_indexes: AHashMap<String, Arc<IndexReaderPool>>,
    document_sizes: Vec<u32>,
    helpers: Vec<(String, Arc<dyn SemanticAnnotationHelper>)>,
    sub_bindings: AtomicBool,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("token_indexes", &self.inner.token_indexes.len())
            .field("annotation_indexes", &self.inner.annotation_indexes.len())
            .field("documents", &self.inner.document_sizes.len())
            .field("helpers", &self.inner.helpers.len())
            .finish()
    }
}

impl Engine {
    pub fn builder(config: IndexConfig) -> EngineBuilder {
        EngineBuilder {
            config,
            token_indexes: Vec::new(),
            annotation_indexes: Vec::new(),
            document_sizes: Vec::new(),
            helpers: Vec::new(),
        }
    }

    pub fn config(&self) -> &IndexConfig {
        &self.inner.config
    }

    /// Pool for a token feature sub-index
    pub fn token_index(&self, feature: &str) -> Result<&Arc<IndexReaderPool>> {
        self.inner
            .token_indexes
            .get(feature)
            .ok_or_else(|| QueryError::UnknownIndex {
                kind: IndexType::Tokens,
                name: feature.to_string(),
            })
    }

    /// Pool for an annotation sub-index
    pub fn annotation_index(&self, annotation_type: &str) -> Result<&Arc<IndexReaderPool>> {
        self.inner
            .annotation_indexes
            .get(annotation_type)
            .ok_or_else(|| QueryError::UnknownIndex {
                kind: IndexType::Annotations,
                name: annotation_type.to_string(),
            })
    }

    /// Pool for a sub-index of either kind
    pub fn index(&self, name: &str, index_type: IndexType) -> Result<&Arc<IndexReaderPool>> {
        match index_type {
            IndexType::Tokens => self.token_index(name),
            IndexType::Annotations => self.annotation_index(name),
        }
    }

    pub fn token_direct_index(&self, feature: &str) -> Result<&Arc<IndexReaderPool>> {
        self.direct_index(feature, IndexType::Tokens)
    }

    pub fn annotation_direct_index(&self, annotation_type: &str) -> Result<&Arc<IndexReaderPool>> {
        self.direct_index(annotation_type, IndexType::Annotations)
    }

    /// Pool for a sub-index whose document -> terms side is available
    pub fn direct_index(&self, name: &str, index_type: IndexType) -> Result<&Arc<IndexReaderPool>> {
        let pool = self.index(name, index_type)?;
        if !pool.index().has_direct_index() {
            return Err(QueryError::NoDirectIndex {
                kind: index_type,
                name: name.to_string(),
            });
        }
        Ok(pool)
    }

    /// Helper registered for an annotation type (first registration wins)
    pub fn annotation_helper(&self, annotation_type: &str) -> Result<&Arc<dyn SemanticAnnotationHelper>> {
        self.inner
            .helpers
            .iter()
            .find(|(ty, _)| ty == annotation_type)
            .map(|(_, helper)| helper)
            .ok_or_else(|| QueryError::UnknownAnnotationType(annotation_type.to_string()))
    }

    /// Token count of every document, indexed by document id
    pub fn document_sizes(&self) -> &[u32] {
        &self.inner.document_sizes
    }

    pub fn document_size(&self, doc_id: DocId) -> Option<u32> {
        usize::try_from(doc_id)
            .ok()
            .and_then(|i| self.inner.document_sizes.get(i).copied())
    }

    pub fn document_count(&self) -> usize {
        self.inner.document_sizes.len()
    }

    /// Whether compound hits keep their nested bindings
    pub fn is_sub_bindings_enabled(&self) -> bool {
        self.inner.sub_bindings.load(Ordering::Relaxed)
    }

    /// Switch binding capture for executors compiled from now on
    pub fn set_sub_bindings_enabled(&self, enabled: bool) {
        self.inner.sub_bindings.store(enabled, Ordering::Relaxed);
    }

    /// Cap on live executors in one OR fan-out
    pub fn executor_cache_size(&self) -> usize {
        self.inner.config.executor_cache_size
    }

    /// Release the annotation helpers
    pub fn close(&self) {
        for (_, helper) in &self.inner.helpers {
            helper.close(self);
        }
    }
}

/// Assembles an [`Engine`] from built sub-indexes
pub struct EngineBuilder {
    config: IndexConfig,
    token_indexes: Vec<PositionalIndex>,
    annotation_indexes: Vec<PositionalIndex>,
    document_sizes: Vec<u32>,
    helpers: Vec<(String, Arc<dyn SemanticAnnotationHelper>)>,
}

impl EngineBuilder {
    pub fn index(mut self, index: PositionalIndex) -> Self {
        match index.index_type() {
            IndexType::Tokens => self.token_indexes.push(index),
            IndexType::Annotations => self.annotation_indexes.push(index),
        }
        self
    }

    pub fn document_sizes(mut self, sizes: Vec<u32>) -> Self {
        self.document_sizes = sizes;
        self
    }

    /// Register a helper for an annotation type; earlier registrations win
    pub fn helper(mut self, annotation_type: &str, helper: Arc<dyn SemanticAnnotationHelper>) -> Self {
        self.helpers.push((annotation_type.to_string(), helper));
        self
    }

    /// Check every sub-index against the configuration and open the engine
    pub fn build(self) -> Result<Engine> {
        let pool_size = self.config.reader_pool_size;

        let mut token_indexes = AHashMap::new();
        for index in self.token_indexes {
            let Some(config) = self.config.token_index(index.name()) else {
                return Err(QueryError::Config(format!(
                    "token index {} is not configured",
                    index.name()
                )));
            };
            if config.direct_index && !index.has_direct_index() {
                return Err(QueryError::Config(format!(
                    "token index {} is configured with a direct index but was built without one",
                    index.name()
                )));
            }
            token_indexes.insert(index.name().to_string(), Arc::new(IndexReaderPool::new(index, pool_size)));
        }
        for config in &self.config.token_indexes {
            if !token_indexes.contains_key(&config.feature) {
                return Err(QueryError::Config(format!("missing token index {}", config.feature)));
            }
        }

        let mut annotation_indexes = AHashMap::new();
        for index in self.annotation_indexes {
            if self.config.annotation_index(index.name()).is_none() {
                return Err(QueryError::Config(format!(
                    "annotation index {} is not configured",
                    index.name()
                )));
            }
            annotation_indexes.insert(index.name().to_string(), Arc::new(IndexReaderPool::new(index, pool_size)));
        }
        for config in &self.config.annotation_indexes {
            if !annotation_indexes.contains_key(&config.annotation_type) {
                return Err(QueryError::Config(format!(
                    "missing annotation index {}",
                    config.annotation_type
                )));
            }
        }

        info!(
            token_indexes = token_indexes.len(),
            annotation_indexes = annotation_indexes.len(),
            documents = self.document_sizes.len(),
            helpers = self.helpers.len(),
            "engine opened"
        );

        let engine = Engine {
            inner: Arc::new(EngineInner {
                sub_bindings: AtomicBool::new(self.config.sub_bindings_enabled),
                config: self.config,
                token_indexes,
                annotation_indexes,
                document_sizes: self.document_sizes,
                helpers: self.helpers,
            }),
        };
        for (_, helper) in &engine.inner.helpers {
            helper.init(&engine)?;
        }
        Ok(engine)
    }
}
