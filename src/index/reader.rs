use crate::index::positional::{DocumentTerms, Posting, PositionalIndex};
use crate::index::types::{DocId, EXHAUSTED, IndexType, NOT_STARTED, Position, TermId};
use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Forward-only cursor over a term's postings list
#[derive(Debug)]
pub struct PostingsCursor {
    postings: Arc<[Posting]>,
    /// Index of the next unread posting
    next: usize,
    current: DocId,
}

impl PostingsCursor {
    fn new(postings: Arc<[Posting]>) -> Self {
        Self {
            postings,
            next: 0,
            current: NOT_STARTED,
        }
    }

    /// Document the cursor is on
    pub fn doc(&self) -> DocId {
        self.current
    }

    /// Number of documents in the list
    pub fn doc_freq(&self) -> usize {
        self.postings.len()
    }

    /// Move to the first document strictly greater than `doc`
    pub fn skip_past(&mut self, doc: DocId) -> DocId {
        if self.current == EXHAUSTED {
            return EXHAUSTED;
        }
        let rest = &self.postings[self.next..];
        self.next += rest.partition_point(|p| p.doc_id <= doc);
        if self.next < self.postings.len() {
            self.current = self.postings[self.next].doc_id;
            self.next += 1;
        } else {
            self.current = EXHAUSTED;
        }
        self.current
    }

    /// Positions on the current document
    pub fn positions(&self) -> PositionsCursor {
        let posting = match self.current {
            EXHAUSTED | NOT_STARTED => None,
            _ => Some(self.next - 1),
        };
        PositionsCursor {
            postings: Arc::clone(&self.postings),
            posting,
            next: 0,
        }
    }
}

/// Positions of one posting, in increasing order
#[derive(Debug)]
pub struct PositionsCursor {
    postings: Arc<[Posting]>,
    posting: Option<usize>,
    next: usize,
}

impl Iterator for PositionsCursor {
    type Item = Position;

    fn next(&mut self) -> Option<Position> {
        let posting = &self.postings[self.posting?];
        let position = posting.positions.get(self.next).copied()?;
        self.next += 1;
        Some(position)
    }
}

/// Reader over one sub-index
///
/// Readers are handed out by an [`IndexReaderPool`] and must go back to it
/// when the borrower is done; [`PooledReader`] does that on drop.
#[derive(Debug)]
pub struct IndexReader {
    index: Arc<PositionalIndex>,
}

impl IndexReader {
    /// Open a postings cursor for a query term, after the index's term transformation
    pub fn postings(&self, term: &str) -> Option<PostingsCursor> {
        let transformed = self.index.transform().apply(term);
        let term_id = self.index.term_id(&transformed)?;
        self.index.postings(term_id).map(PostingsCursor::new)
    }

    /// Direct index entry for a document
    pub fn document_terms(&self, doc_id: DocId) -> Option<&DocumentTerms> {
        self.index.document_terms(doc_id)
    }

    pub fn index(&self) -> &PositionalIndex {
        &self.index
    }
}

/// Pool of readers over one sub-index
#[derive(Debug)]
pub struct IndexReaderPool {
    index: Arc<PositionalIndex>,
    idle: Mutex<Vec<IndexReader>>,
    max_idle: usize,
    borrowed: AtomicUsize,
}

impl IndexReaderPool {
    pub fn new(index: PositionalIndex, max_idle: usize) -> Self {
        Self {
            index: Arc::new(index),
            idle: Mutex::new(Vec::new()),
            max_idle,
            borrowed: AtomicUsize::new(0),
        }
    }

    /// Borrow a reader; it is returned when the guard is dropped
    pub fn borrow_reader(self: &Arc<Self>) -> PooledReader {
        let reader = self
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .unwrap_or_else(|| IndexReader {
                index: Arc::clone(&self.index),
            });
        self.borrowed.fetch_add(1, Ordering::Relaxed);
        PooledReader {
            pool: Arc::clone(self),
            reader: Some(reader),
        }
    }

    /// Give a reader back to the pool
    pub fn return_reader(&self, reader: IndexReader) {
        self.borrowed.fetch_sub(1, Ordering::Relaxed);
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        if idle.len() < self.max_idle {
            idle.push(reader);
        }
    }

    /// Resolve a term id to its string
    pub fn get_term(&self, term_id: TermId) -> Option<String> {
        self.index.term(term_id).map(str::to_string)
    }

    pub fn index(&self) -> &Arc<PositionalIndex> {
        &self.index
    }

    pub fn index_type(&self) -> IndexType {
        self.index.index_type()
    }

    /// Number of readers currently out on loan
    pub fn borrowed(&self) -> usize {
        self.borrowed.load(Ordering::Relaxed)
    }
}

/// A reader on loan from an [`IndexReaderPool`]
#[derive(Debug)]
pub struct PooledReader {
    pool: Arc<IndexReaderPool>,
    reader: Option<IndexReader>,
}

impl Deref for PooledReader {
    type Target = IndexReader;

    fn deref(&self) -> &IndexReader {
        // Only taken in drop
        self.reader.as_ref().unwrap_or_else(|| unreachable!())
    }
}

impl Drop for PooledReader {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            self.pool.return_reader(reader);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::types::TermTransform;

    fn pool() -> Arc<IndexReaderPool> {
        let mut builder = PositionalIndex::builder("string", IndexType::Tokens)
            .transform(TermTransform::Lowercase);
        builder.add(0, 3, "to");
        builder.add(0, 9, "to");
        builder.add(2, 1, "to");
        builder.add(4, 0, "be");
        Arc::new(IndexReaderPool::new(builder.build(), 2))
    }

    #[test]
    fn test_postings_cursor_skip_past() {
        let pool = pool();
        let reader = pool.borrow_reader();
        let mut cursor = reader.postings("TO").unwrap();
        assert_eq!(cursor.doc(), NOT_STARTED);
        assert_eq!(cursor.skip_past(-1), 0);
        assert_eq!(cursor.positions().collect::<Vec<_>>(), vec![3, 9]);
        assert_eq!(cursor.skip_past(0), 2);
        assert_eq!(cursor.positions().collect::<Vec<_>>(), vec![1]);
        assert_eq!(cursor.skip_past(2), EXHAUSTED);
        assert_eq!(cursor.skip_past(-1), EXHAUSTED);
        assert_eq!(cursor.positions().next(), None);
    }

    #[test]
    fn test_skip_past_jumps_over_documents() {
        let pool = pool();
        let reader = pool.borrow_reader();
        let mut cursor = reader.postings("to").unwrap();
        assert_eq!(cursor.skip_past(1), 2);
        assert!(reader.postings("missing").is_none());
    }

    #[test]
    fn test_pool_borrow_and_return() {
        let pool = pool();
        {
            let _a = pool.borrow_reader();
            let _b = pool.borrow_reader();
            let _c = pool.borrow_reader();
            assert_eq!(pool.borrowed(), 3);
        }
        assert_eq!(pool.borrowed(), 0);
        assert_eq!(pool.idle.lock().unwrap().len(), 2);
        assert_eq!(pool.get_term(0).as_deref(), Some("be"));
    }
}
