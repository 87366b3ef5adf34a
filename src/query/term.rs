use crate::engine::Engine;
use crate::error::{QueryError, Result};
use crate::index::reader::{PooledReader, PositionsCursor, PostingsCursor};
use crate::index::types::{DocId, EXHAUSTED, NOT_STARTED};
use crate::query::binding::Binding;
use crate::query::executor::{QueryExecutor, on_document};
use crate::query::node::{QueryNode, term_length};
use std::sync::Arc;

/// Executor for a single term in one sub-index.
///
/// Holds a reader borrowed from the sub-index pool until closed or dropped.
pub struct TermExecutor {
    query: Arc<QueryNode>,
    reader: Option<PooledReader>,
    postings: Option<PostingsCursor>,
    /// Opened on the first hit request for each document
    positions: Option<PositionsCursor>,
    length: u32,
    latest: DocId,
}

impl TermExecutor {
    pub fn new(query: Arc<QueryNode>, engine: &Engine) -> Result<Self> {
        let QueryNode::Term {
            index,
            term,
            index_type,
            length,
        } = query.as_ref()
        else {
            return Err(QueryError::InvalidQuery(
                "term executor compiled from a non-term node".to_string(),
            ));
        };
        let length = term_length(*index_type, *length)?;
        let reader = engine.index(index, *index_type)?.borrow_reader();
        let postings = reader.postings(term);

        Ok(Self {
            query,
            reader: Some(reader),
            postings,
            positions: None,
            length,
            latest: NOT_STARTED,
        })
    }

    /// Documents in the term's postings list (0 for an unknown term)
    pub fn doc_freq(&self) -> usize {
        self.postings.as_ref().map_or(0, |p| p.doc_freq())
    }
}

impl QueryExecutor for TermExecutor {
    fn next_document(&mut self, greater_than: DocId) -> Result<DocId> {
        if self.latest == EXHAUSTED {
            return Ok(EXHAUSTED);
        }
        let target = greater_than.max(self.latest);
        self.positions = None;
        self.latest = match self.postings.as_mut() {
            Some(postings) => postings.skip_past(target),
            None => EXHAUSTED,
        };
        Ok(self.latest)
    }

    fn next_hit(&mut self) -> Result<Option<Binding>> {
        if !on_document(self.latest) {
            return Ok(None);
        }
        let Some(postings) = self.postings.as_ref() else {
            return Ok(None);
        };
        let positions = self.positions.get_or_insert_with(|| postings.positions());
        Ok(positions
            .next()
            .map(|position| Binding::new(Arc::clone(&self.query), self.latest, position, self.length)))
    }

    fn latest_document(&self) -> DocId {
        self.latest
    }

    fn close(&mut self) {
        // Dropping the guard returns the reader to its pool
        self.reader = None;
        self.postings = None;
        self.positions = None;
        self.latest = EXHAUSTED;
    }

    fn query(&self) -> &Arc<QueryNode> {
        &self.query
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::testing::{engine, spans};

    fn sample() -> Engine {
        engine(&["a b c to d e f g h to", "x y", "z To"])
    }

    #[test]
    fn test_documents_and_positions() {
        let engine = sample();
        let mut exec = QueryNode::term("string", "to").executor(&engine).unwrap();
        assert_eq!(exec.latest_document(), NOT_STARTED);
        assert_eq!(exec.next_hit().unwrap(), None);
        assert_eq!(exec.next_document(-1).unwrap(), 0);
        let first = exec.next_hit().unwrap().unwrap();
        assert_eq!((first.position(), first.length()), (3, 1));
        assert_eq!(exec.next_hit().unwrap().unwrap().position(), 9);
        assert_eq!(exec.next_hit().unwrap(), None);
        // a bound behind the current document still advances
        assert_eq!(exec.next_document(-1).unwrap(), 2);
        assert_eq!(exec.next_hit().unwrap().unwrap().position(), 1);
        assert_eq!(exec.next_document(-1).unwrap(), EXHAUSTED);
        assert_eq!(exec.next_document(-1).unwrap(), EXHAUSTED);
    }

    #[test]
    fn test_query_term_is_transformed() {
        let engine = sample();
        let mut exec = QueryNode::term("string", "TO").executor(&engine).unwrap();
        assert_eq!(spans(exec.as_mut()), vec![(0, 3, 1), (0, 9, 1), (2, 1, 1)]);
    }

    #[test]
    fn test_skip_to_bound() {
        let engine = sample();
        let mut exec = QueryNode::term("string", "to").executor(&engine).unwrap();
        assert_eq!(exec.next_document(0).unwrap(), 2);
    }

    #[test]
    fn test_unknown_term_is_empty() {
        let engine = sample();
        let mut exec = QueryNode::term("string", "missing").executor(&engine).unwrap();
        assert_eq!(exec.next_document(-1).unwrap(), EXHAUSTED);
    }

    #[test]
    fn test_unknown_index_fails_at_compile_time() {
        let engine = sample();
        let err = QueryNode::term("lemma", "to").executor(&engine).err().unwrap();
        assert!(matches!(err, QueryError::UnknownIndex { .. }));
    }

    #[test]
    fn test_close_returns_reader() {
        let engine = sample();
        let pool = engine.token_index("string").unwrap();
        let mut exec = QueryNode::term("string", "to").executor(&engine).unwrap();
        assert_eq!(pool.borrowed(), 1);
        exec.next_document(-1).unwrap();
        exec.close();
        exec.close();
        assert_eq!(pool.borrowed(), 0);
        assert_eq!(exec.next_document(-1).unwrap(), EXHAUSTED);
        assert_eq!(exec.next_hit().unwrap(), None);
    }
}
