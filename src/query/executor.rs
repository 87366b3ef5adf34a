//! The streaming executor protocol shared by every query node
//!
//! An executor walks matching documents in increasing order with
//! [`QueryExecutor::next_document`] and, for the document it is on, hands
//! out hits in non-decreasing start position with [`QueryExecutor::next_hit`].
//!
//! ```text
//! let mut doc = executor.next_document(-1)?;
//! while doc != EXHAUSTED {
//!     while let Some(hit) = executor.next_hit()? { ... }
//!     doc = executor.next_document(doc)?;
//! }
//! executor.close();
//! ```

use crate::error::Result;
use crate::index::types::{DocId, EXHAUSTED, NOT_STARTED};
use crate::query::binding::Binding;
use crate::query::node::QueryNode;
use std::sync::Arc;

/// Compiled, running form of a [`QueryNode`].
///
/// Executors are single-threaded and not shareable between threads while in
/// use. Closing is idempotent and a closed executor reports itself as
/// exhausted rather than failing.
///
/// # Replay contract
///
/// A freshly compiled executor must reproduce the same documents and the
/// same hits, in the same order, as any earlier executor compiled from the
/// same node over the same engine. [`ExecutorsList`](crate::query::ExecutorsList)
/// relies on this to rebuild evicted executors from a cold start.
pub trait QueryExecutor: Send {
    /// Advance to the first matching document strictly greater than both
    /// `greater_than` and the current document. Returns [`EXHAUSTED`] once
    /// there are no more, and keeps returning it afterwards.
    fn next_document(&mut self, greater_than: DocId) -> Result<DocId>;

    /// Next hit on the current document, or `None` when they are used up.
    /// Never moves to another document.
    fn next_hit(&mut self) -> Result<Option<Binding>>;

    /// Last value returned by `next_document` ([`NOT_STARTED`] before the first call)
    fn latest_document(&self) -> DocId;

    /// Release readers and sub-executors
    fn close(&mut self);

    /// Node this executor was compiled from
    fn query(&self) -> &Arc<QueryNode>;
}

/// True once an executor sits on a real document
#[inline]
pub fn on_document(doc: DocId) -> bool {
    doc >= 0
}

/// All remaining hits of the executor's current document
pub fn drain_hits<E: QueryExecutor + ?Sized>(executor: &mut E) -> Result<Vec<Binding>> {
    let mut hits = Vec::new();
    while let Some(hit) = executor.next_hit()? {
        hits.push(hit);
    }
    Ok(hits)
}

/// Move every stream to the smallest document greater than `greater_than`
/// that all of them match.
///
/// Streams already past `greater_than` stay where they are. After that the
/// largest current document is the candidate; every stream behind it is
/// raised to at least the candidate, and a stream overshooting it becomes
/// the new candidate. No stream is ever moved backwards. Returns
/// [`EXHAUSTED`] as soon as any stream runs out.
pub fn converge(streams: &mut [Box<dyn QueryExecutor>], greater_than: DocId) -> Result<DocId> {
    if streams.is_empty() {
        return Ok(EXHAUSTED);
    }

    let mut candidate = NOT_STARTED;
    for stream in streams.iter_mut() {
        let doc = if stream.latest_document() > greater_than {
            stream.latest_document()
        } else {
            stream.next_document(greater_than)?
        };
        if doc == EXHAUSTED {
            return Ok(EXHAUSTED);
        }
        candidate = candidate.max(doc);
    }

    loop {
        let mut agreed = true;
        for stream in streams.iter_mut() {
            let mut doc = stream.latest_document();
            if doc < candidate {
                doc = stream.next_document(candidate - 1)?;
            }
            if doc == EXHAUSTED {
                return Ok(EXHAUSTED);
            }
            if doc > candidate {
                candidate = doc;
                agreed = false;
            }
        }
        if agreed {
            return Ok(candidate);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::testing::StaticExecutor;

    fn stream(docs: &[DocId]) -> Box<dyn QueryExecutor> {
        let node = QueryNode::term("string", "x");
        let documents = docs
            .iter()
            .map(|&d| (d, vec![Binding::new(Arc::clone(&node), d, 0, 1)]))
            .collect();
        Box::new(StaticExecutor::new(node, documents))
    }

    #[test]
    fn test_converge_finds_common_documents() {
        let mut streams = vec![stream(&[1, 3, 5, 7, 9]), stream(&[2, 3, 6, 9]), stream(&[0, 3, 9, 10])];
        assert_eq!(converge(&mut streams, -1).unwrap(), 3);
        assert!(streams.iter().all(|s| s.latest_document() == 3));
        assert_eq!(converge(&mut streams, 3).unwrap(), 9);
        assert_eq!(converge(&mut streams, 9).unwrap(), EXHAUSTED);
    }

    #[test]
    fn test_converge_empty_and_disjoint() {
        assert_eq!(converge(&mut [], -1).unwrap(), EXHAUSTED);
        let mut streams = vec![stream(&[1, 3]), stream(&[2, 4])];
        assert_eq!(converge(&mut streams, -1).unwrap(), EXHAUSTED);
    }

    #[test]
    fn test_static_executor_protocol() {
        let mut exec = stream(&[4, 8]);
        assert_eq!(exec.next_hit().unwrap(), None);
        assert_eq!(exec.next_document(-1).unwrap(), 4);
        assert_eq!(drain_hits(exec.as_mut()).unwrap().len(), 1);
        assert_eq!(exec.next_hit().unwrap(), None);
        assert_eq!(exec.next_document(-1).unwrap(), 8);
        assert_eq!(exec.next_document(-1).unwrap(), EXHAUSTED);
        assert_eq!(exec.next_document(-1).unwrap(), EXHAUSTED);
    }
}
