//! In-memory positional inverted index
//!
//! Each sub-index maps terms to postings (document + positions). Terms are
//! kept sorted by string and a [`TermId`] is the term's rank in that order,
//! so anything enumerated by term id is also in term-string order. When the
//! direct side is enabled, every document also records the terms it
//! contains together with their in-document counts.

use crate::index::types::{DocId, IndexType, Position, TermId, TermTransform};
use ahash::AHashMap;
use roaring::RoaringBitmap;
use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::Arc;

/// A document containing a term, with the positions it occurs at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    pub doc_id: DocId,
    pub positions: Box<[Position]>,
}

/// Terms occurring in one document (direct index entry)
#[derive(Debug, Clone, Default)]
pub struct DocumentTerms {
    /// Term ids present in the document
    pub term_ids: RoaringBitmap,
    /// (term id, occurrences) sorted by term id
    counts: Vec<(TermId, u32)>,
}

impl DocumentTerms {
    /// Occurrences of a term in this document (0 if absent)
    pub fn count(&self, term_id: TermId) -> u32 {
        self.counts
            .binary_search_by_key(&term_id, |&(id, _)| id)
            .map(|i| self.counts[i].1)
            .unwrap_or(0)
    }

    /// Iterate (term id, count) in term id order
    pub fn iter(&self) -> impl Iterator<Item = (TermId, u32)> + '_ {
        self.counts.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// One named sub-index
#[derive(Debug)]
pub struct PositionalIndex {
    name: String,
    index_type: IndexType,
    transform: TermTransform,
    terms: Vec<String>,
    postings: Vec<Arc<[Posting]>>,
    direct: Option<AHashMap<DocId, DocumentTerms>>,
}

impl PositionalIndex {
    /// Start building a sub-index
    pub fn builder(name: &str, index_type: IndexType) -> PositionalIndexBuilder {
        PositionalIndexBuilder {
            name: name.to_string(),
            index_type,
            transform: TermTransform::Identity,
            direct_index: false,
            postings: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index_type(&self) -> IndexType {
        self.index_type
    }

    pub fn transform(&self) -> TermTransform {
        self.transform
    }

    /// Number of distinct terms
    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    /// All terms, sorted
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Look up an already-transformed term
    pub fn term_id(&self, term: &str) -> Option<TermId> {
        self.terms
            .binary_search_by(|t| t.as_str().cmp(term))
            .ok()
            .map(|i| i as TermId)
    }

    /// String for a term id
    pub fn term(&self, term_id: TermId) -> Option<&str> {
        self.terms.get(term_id as usize).map(|s| s.as_str())
    }

    /// Postings list for a term id
    pub fn postings(&self, term_id: TermId) -> Option<Arc<[Posting]>> {
        self.postings.get(term_id as usize).cloned()
    }

    /// Total number of occurrences of a term across the collection
    pub fn occurrences(&self, term_id: TermId) -> u64 {
        self.postings
            .get(term_id as usize)
            .map(|list| list.iter().map(|p| p.positions.len() as u64).sum())
            .unwrap_or(0)
    }

    /// Range of term ids whose string starts with `prefix`
    pub fn prefix_range(&self, prefix: &str) -> Range<usize> {
        let start = self.terms.partition_point(|t| t.as_str() < prefix);
        let len = self.terms[start..].partition_point(|t| t.starts_with(prefix));
        start..start + len
    }

    pub fn has_direct_index(&self) -> bool {
        self.direct.is_some()
    }

    /// Terms of one document, if the direct side is enabled and the document has any
    pub fn document_terms(&self, doc_id: DocId) -> Option<&DocumentTerms> {
        self.direct.as_ref().and_then(|d| d.get(&doc_id))
    }
}

/// Accumulates occurrences before freezing them into a [`PositionalIndex`]
pub struct PositionalIndexBuilder {
    name: String,
    index_type: IndexType,
    transform: TermTransform,
    direct_index: bool,
    postings: BTreeMap<String, BTreeMap<DocId, Vec<Position>>>,
}

impl PositionalIndexBuilder {
    pub fn transform(mut self, transform: TermTransform) -> Self {
        self.transform = transform;
        self
    }

    pub fn direct_index(mut self, enabled: bool) -> Self {
        self.direct_index = enabled;
        self
    }

    /// Record one occurrence of `term` at `position` in `doc_id`
    pub fn add(&mut self, doc_id: DocId, position: Position, term: &str) {
        let term = self.transform.apply(term);
        self.postings
            .entry(term)
            .or_default()
            .entry(doc_id)
            .or_default()
            .push(position);
    }

    pub fn build(self) -> PositionalIndex {
        let mut terms = Vec::with_capacity(self.postings.len());
        let mut postings = Vec::with_capacity(self.postings.len());
        let mut direct: Option<AHashMap<DocId, Vec<(TermId, u32)>>> =
            self.direct_index.then(AHashMap::new);

        // BTreeMap iteration is in string order, which fixes the term ids
        for (term_id, (term, docs)) in self.postings.into_iter().enumerate() {
            let term_id = term_id as TermId;
            let list: Vec<Posting> = docs
                .into_iter()
                .map(|(doc_id, mut positions)| {
                    positions.sort_unstable();
                    if let Some(direct) = direct.as_mut() {
                        direct
                            .entry(doc_id)
                            .or_default()
                            .push((term_id, positions.len() as u32));
                    }
                    Posting {
                        doc_id,
                        positions: positions.into_boxed_slice(),
                    }
                })
                .collect();
            terms.push(term);
            postings.push(Arc::from(list));
        }

        let direct = direct.map(|docs| {
            docs.into_iter()
                .map(|(doc_id, counts)| {
                    let term_ids = counts.iter().map(|&(id, _)| id).collect();
                    (doc_id, DocumentTerms { term_ids, counts })
                })
                .collect()
        });

        PositionalIndex {
            name: self.name,
            index_type: self.index_type,
            transform: self.transform,
            terms,
            postings,
            direct,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PositionalIndex {
        let mut builder = PositionalIndex::builder("string", IndexType::Tokens)
            .transform(TermTransform::Lowercase)
            .direct_index(true);
        for (pos, tok) in ["To", "be", "or", "not", "to", "be"].iter().enumerate() {
            builder.add(0, pos as Position, tok);
        }
        builder.add(3, 0, "bee");
        builder.build()
    }

    #[test]
    fn test_terms_sorted_and_ids_are_ranks() {
        let index = sample();
        assert_eq!(index.terms(), &["be", "bee", "not", "or", "to"]);
        assert_eq!(index.term_id("not"), Some(2));
        assert_eq!(index.term(4), Some("to"));
        assert_eq!(index.term_id("To"), None);
    }

    #[test]
    fn test_postings_positions_sorted() {
        let index = sample();
        let to = index.postings(index.term_id("to").unwrap()).unwrap();
        assert_eq!(to.len(), 1);
        assert_eq!(&*to[0].positions, &[0, 4]);
        assert_eq!(index.occurrences(index.term_id("be").unwrap()), 2);
    }

    #[test]
    fn test_direct_index_counts() {
        let index = sample();
        let doc = index.document_terms(0).unwrap();
        assert_eq!(doc.len(), 4);
        assert_eq!(doc.count(index.term_id("be").unwrap()), 2);
        assert_eq!(doc.count(index.term_id("bee").unwrap()), 0);
        assert!(index.document_terms(1).is_none());
    }

    #[test]
    fn test_prefix_range() {
        let index = sample();
        assert_eq!(index.prefix_range("be"), 0..2);
        assert_eq!(index.prefix_range("x"), 5..5);
        assert_eq!(index.prefix_range(""), 0..5);
    }
}
