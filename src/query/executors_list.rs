//! Bounded cache of live sub-executors for wide disjunctions
//!
//! An annotation query can expand into tens of thousands of disjuncts.
//! Keeping an executor (and its pooled reader) alive for each one is not
//! affordable, so at most `capacity` of them are live at once, in LRU order.
//! Per-disjunct position (current document, hits handed out, pending hits)
//! is tracked outside the cache and survives eviction.
//!
//! An evicted executor is closed and its pending hits dropped. The next
//! access compiles a fresh executor from the node, replays it to the
//! recorded document with `next_document(latest - 1)`, and skips the hits
//! that were already handed out. This only works if executors honour the
//! replay contract on [`QueryExecutor`]; a replay that lands on a different
//! document is reported as [`QueryError::Resync`] rather than papered over.

use crate::engine::Engine;
use crate::error::{QueryError, Result};
use crate::index::types::{DocId, EXHAUSTED, NOT_STARTED};
use crate::query::binding::Binding;
use crate::query::executor::{QueryExecutor, drain_hits, on_document};
use crate::query::node::QueryNode;
use lru::LruCache;
use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::{debug, trace};

pub struct ExecutorsList {
    engine: Engine,
    nodes: Vec<Arc<QueryNode>>,
    executors: LruCache<usize, Box<dyn QueryExecutor>>,
    latest_documents: Vec<DocId>,
    hits_returned: Vec<usize>,
    /// Hits of the current document not yet handed out; built on first use
    pending_hits: Vec<Option<VecDeque<Binding>>>,
}

impl ExecutorsList {
    /// Validates every node up front; executors themselves are built on demand
    pub fn new(engine: &Engine, nodes: Vec<Arc<QueryNode>>, capacity: usize) -> Result<Self> {
        for node in &nodes {
            node.validate(engine)?;
        }
        // Never more live executors than disjuncts
        let capacity = NonZeroUsize::new(capacity.min(nodes.len())).unwrap_or(NonZeroUsize::MIN);
        let len = nodes.len();
        Ok(Self {
            engine: engine.clone(),
            nodes,
            executors: LruCache::new(capacity),
            latest_documents: vec![NOT_STARTED; len],
            hits_returned: vec![0; len],
            pending_hits: vec![None; len],
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of executors currently alive
    pub fn live(&self) -> usize {
        self.executors.len()
    }

    pub fn latest_document(&self, index: usize) -> DocId {
        self.latest_documents[index]
    }

    /// Hits handed out by disjunct `index` on its current document
    pub fn hits_returned(&self, index: usize) -> usize {
        self.hits_returned[index]
    }

    /// `next_document` on disjunct `index`
    pub fn next_document(&mut self, index: usize, greater_than: DocId) -> Result<DocId> {
        if self.latest_documents[index] == EXHAUSTED {
            return Ok(EXHAUSTED);
        }
        let doc = self.executor(index)?.next_document(greater_than)?;
        self.latest_documents[index] = doc;
        self.hits_returned[index] = 0;
        self.pending_hits[index] = None;
        if doc == EXHAUSTED {
            if let Some(mut executor) = self.executors.pop(&index) {
                executor.close();
            }
        }
        Ok(doc)
    }

    /// `next_hit` on disjunct `index`
    pub fn next_hit(&mut self, index: usize) -> Result<Option<Binding>> {
        if !on_document(self.latest_documents[index]) {
            return Ok(None);
        }
        if self.pending_hits[index].is_none() {
            let hits = drain_hits(self.executor(index)?.as_mut())?;
            self.pending_hits[index] = Some(hits.into());
        }
        let hit = self.pending_hits[index].as_mut().and_then(VecDeque::pop_front);
        if hit.is_some() {
            self.hits_returned[index] += 1;
        }
        Ok(hit)
    }

    /// Close every live executor and mark all disjuncts exhausted
    pub fn close(&mut self) {
        for (_, executor) in self.executors.iter_mut() {
            executor.close();
        }
        self.executors.clear();
        self.latest_documents.fill(EXHAUSTED);
        self.pending_hits.fill(None);
    }

    /// Live executor for `index`, recompiled and replayed if it was evicted
    fn executor(&mut self, index: usize) -> Result<&mut Box<dyn QueryExecutor>> {
        if !self.executors.contains(&index) {
            let mut executor = self.nodes[index].executor(&self.engine)?;
            self.resync(index, executor.as_mut())?;
            if let Some((evicted, mut old)) = self.executors.push(index, executor) {
                if evicted != index {
                    trace!(evicted, "executor evicted");
                    old.close();
                    self.pending_hits[evicted] = None;
                }
            }
        }
        self.executors
            .get_mut(&index)
            .ok_or_else(|| QueryError::Config(format!("executor {} missing from cache", index)))
    }

    /// Bring a cold executor to the recorded position of disjunct `index`
    fn resync(&self, index: usize, executor: &mut dyn QueryExecutor) -> Result<()> {
        let document = self.latest_documents[index];
        if document == NOT_STARTED {
            return Ok(());
        }
        let landed = executor.next_document(document - 1)?;
        if landed != document {
            return Err(QueryError::Resync {
                index,
                document,
                landed,
            });
        }
        let skip = self.hits_returned[index];
        for _ in 0..skip {
            if executor.next_hit()?.is_none() {
                break;
            }
        }
        debug!(index, document, skipped = skip, "executor resynchronised");
        Ok(())
    }
}

impl Drop for ExecutorsList {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{Constraint, Mention, SemanticAnnotationHelper};
    use crate::index::PositionalIndex;
    use crate::index::types::{AnnotationIndexConfig, IndexConfig, IndexType, TermTransform};
    use crate::query::testing::engine;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn list(capacity: usize) -> (Engine, ExecutorsList) {
        let engine = engine(&["a b a a", "b", "a b"]);
        let nodes = vec![QueryNode::term("string", "a"), QueryNode::term("string", "b")];
        let list = ExecutorsList::new(&engine, nodes, capacity).unwrap();
        (engine, list)
    }

    #[test]
    fn test_executors_are_built_lazily() {
        let (_engine, mut list) = list(10);
        assert_eq!(list.len(), 2);
        assert_eq!(list.live(), 0);
        assert_eq!(list.latest_document(1), NOT_STARTED);
        assert_eq!(list.next_document(1, -1).unwrap(), 0);
        assert_eq!(list.live(), 1);
    }

    #[test]
    fn test_evicted_executor_resumes_mid_document() {
        let (engine, mut list) = list(1);
        assert_eq!(list.next_document(0, -1).unwrap(), 0);
        assert_eq!(list.next_hit(0).unwrap().unwrap().position(), 0);
        assert_eq!(list.hits_returned(0), 1);

        // touching disjunct 1 evicts disjunct 0 and its pending hits
        assert_eq!(list.next_document(1, -1).unwrap(), 0);
        assert_eq!(list.live(), 1);
        assert_eq!(engine.token_index("string").unwrap().borrowed(), 1);

        let rest: Vec<u32> = std::iter::from_fn(|| list.next_hit(0).unwrap())
            .map(|hit| hit.position())
            .collect();
        assert_eq!(rest, vec![2, 3]);
        assert_eq!(list.hits_returned(0), 3);

        assert_eq!(list.next_document(0, -1).unwrap(), 2);
        assert_eq!(list.next_document(1, 0).unwrap(), 1);
        assert_eq!(list.next_document(0, -1).unwrap(), EXHAUSTED);
        assert_eq!(list.next_hit(0).unwrap(), None);
    }

    #[test]
    fn test_exhausted_disjunct_is_released() {
        let (engine, mut list) = list(2);
        list.next_document(1, -1).unwrap();
        list.next_document(1, 0).unwrap();
        list.next_document(1, 1).unwrap();
        assert_eq!(list.next_document(1, 2).unwrap(), EXHAUSTED);
        assert_eq!(list.live(), 0);
        assert_eq!(engine.token_index("string").unwrap().borrowed(), 0);
    }

    #[test]
    fn test_invalid_node_rejected_up_front() {
        let engine = engine(&["a"]);
        let nodes = vec![QueryNode::term("string", "a"), QueryNode::term("nope", "a")];
        assert!(ExecutorsList::new(&engine, nodes, 4).is_err());
    }

    #[test]
    fn test_close_releases_readers() {
        let (engine, mut list) = list(4);
        list.next_document(0, -1).unwrap();
        list.next_document(1, -1).unwrap();
        assert_eq!(engine.token_index("string").unwrap().borrowed(), 2);
        list.close();
        assert_eq!(engine.token_index("string").unwrap().borrowed(), 0);
        assert_eq!(list.next_document(0, -1).unwrap(), EXHAUSTED);
    }

    /// Answers each lookup with the next entry of `answers`, repeating the last
    struct ShiftingHelper {
        calls: AtomicUsize,
        answers: Vec<Vec<Mention>>,
    }

    impl SemanticAnnotationHelper for ShiftingHelper {
        fn mentions(&self, _annotation_type: &str, _constraints: &[Constraint], _engine: &Engine) -> Result<Vec<Mention>> {
            let call = self.calls.fetch_add(1, Ordering::Relaxed);
            Ok(self.answers[call.min(self.answers.len() - 1)].clone())
        }
    }

    fn mention(uri: &str) -> Mention {
        Mention {
            uri: uri.to_string(),
            length: 1,
        }
    }

    #[test]
    fn test_replay_landing_elsewhere_is_reported() {
        let mut tokens = PositionalIndex::builder("string", IndexType::Tokens)
            .transform(TermTransform::Lowercase)
            .direct_index(true);
        for (doc, term) in ["a", "b", "a"].into_iter().enumerate() {
            tokens.add(doc as DocId, 0, term);
        }
        let mut people = PositionalIndex::builder("Person", IndexType::Annotations);
        people.add(0, 0, "Person:0");
        people.add(2, 0, "Person:1");
        let config = IndexConfig {
            annotation_indexes: vec![AnnotationIndexConfig {
                annotation_type: "Person".to_string(),
                direct_index: false,
            }],
            executor_cache_size: 1,
            ..IndexConfig::default()
        };
        let helper = ShiftingHelper {
            calls: AtomicUsize::new(0),
            answers: vec![vec![mention("Person:0")], vec![mention("Person:1")]],
        };
        let engine = Engine::builder(config)
            .index(tokens.build())
            .index(people.build())
            .document_sizes(vec![1, 1, 1])
            .helper("Person", Arc::new(helper))
            .build()
            .unwrap();

        let nodes = vec![QueryNode::annotation("Person", Vec::new()), QueryNode::term("string", "a")];
        let mut list = ExecutorsList::new(&engine, nodes, 1).unwrap();
        assert_eq!(list.next_document(0, -1).unwrap(), 0);
        // evicts the annotation executor; its rebuild sees a different mention set
        assert_eq!(list.next_document(1, -1).unwrap(), 0);
        assert!(matches!(
            list.next_hit(0),
            Err(QueryError::Resync {
                index: 0,
                document: 0,
                landed: 2
            })
        ));

        list.close();
        assert_eq!(engine.token_index("string").unwrap().borrowed(), 0);
        assert_eq!(engine.annotation_index("Person").unwrap().borrowed(), 0);
    }
}
