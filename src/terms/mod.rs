//! Term enumeration queries
//!
//! Unlike hit queries these run to completion in one call and return a
//! [`TermsResultSet`]: the terms occurring in a document, a set of documents
//! or a whole sub-index, boolean combinations of such lists, and re-ordered
//! or truncated views of them.

pub mod annotation;
pub mod boolean;
pub mod index;
pub mod result;
pub mod sort;

pub use annotation::{AnnotationTermQuery, AnnotationTermsQuery};
pub use boolean::{AndTermsQuery, OrTermsQuery, and_merge, or_merge};
pub use index::{AllTermsQuery, DocumentTermsQuery, DocumentsAndTermsQuery, DocumentsOrTermsQuery};
pub use result::TermsResultSet;
pub use sort::{LimitTermsQuery, SortKey, SortedTermsQuery, sort_terms};

use crate::engine::Engine;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Any terms query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TermsQuery {
    Document(DocumentTermsQuery),
    DocumentsAnd(DocumentsAndTermsQuery),
    DocumentsOr(DocumentsOrTermsQuery),
    All(AllTermsQuery),
    And(AndTermsQuery),
    Or(OrTermsQuery),
    Sorted(SortedTermsQuery),
    Limit(LimitTermsQuery),
    AnnotationTerm(AnnotationTermQuery),
    AnnotationTerms(AnnotationTermsQuery),
}

impl TermsQuery {
    pub fn execute(&self, engine: &Engine) -> Result<TermsResultSet> {
        match self {
            TermsQuery::Document(q) => q.execute(engine),
            TermsQuery::DocumentsAnd(q) => q.execute(engine),
            TermsQuery::DocumentsOr(q) => q.execute(engine),
            TermsQuery::All(q) => q.execute(engine),
            TermsQuery::And(q) => q.execute(engine),
            TermsQuery::Or(q) => q.execute(engine),
            TermsQuery::Sorted(q) => q.execute(engine),
            TermsQuery::Limit(q) => q.execute(engine),
            TermsQuery::AnnotationTerm(q) => q.execute(engine),
            TermsQuery::AnnotationTerms(q) => q.execute(engine),
        }
    }

    /// Whether results carry term strings
    pub fn strings_enabled(&self) -> bool {
        match self {
            TermsQuery::Document(q) => q.strings,
            TermsQuery::DocumentsAnd(q) => q.strings,
            TermsQuery::DocumentsOr(q) => q.strings,
            TermsQuery::All(q) => q.strings,
            TermsQuery::Sorted(q) => q.query.strings_enabled(),
            TermsQuery::Limit(q) => q.query.strings_enabled(),
            TermsQuery::And(_)
            | TermsQuery::Or(_)
            | TermsQuery::AnnotationTerm(_)
            | TermsQuery::AnnotationTerms(_) => true,
        }
    }

    /// Whether results carry term counts
    pub fn counts_enabled(&self) -> bool {
        match self {
            TermsQuery::Document(q) => q.counts,
            TermsQuery::DocumentsAnd(q) => q.counts,
            TermsQuery::DocumentsOr(q) => q.counts,
            TermsQuery::All(q) => q.counts,
            TermsQuery::And(q) => q.counts_enabled(),
            TermsQuery::Or(q) => q.counts_enabled(),
            TermsQuery::Sorted(q) => q.query.counts_enabled(),
            TermsQuery::Limit(q) => q.query.counts_enabled(),
            TermsQuery::AnnotationTerm(_) => false,
            TermsQuery::AnnotationTerms(q) => q.query.counts_enabled(),
        }
    }
}

macro_rules! terms_query_from {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for TermsQuery {
                fn from(query: $ty) -> Self {
                    TermsQuery::$variant(query)
                }
            }
        )*
    };
}

terms_query_from!(
    Document(DocumentTermsQuery),
    DocumentsAnd(DocumentsAndTermsQuery),
    DocumentsOr(DocumentsOrTermsQuery),
    All(AllTermsQuery),
    And(AndTermsQuery),
    Or(OrTermsQuery),
    Sorted(SortedTermsQuery),
    Limit(LimitTermsQuery),
    AnnotationTerm(AnnotationTermQuery),
    AnnotationTerms(AnnotationTermsQuery),
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::types::IndexType;

    #[test]
    fn test_tagged_json() {
        let query: TermsQuery = serde_json::from_str(
            r#"{"type": "sorted", "keys": ["count_desc"],
                "query": {"type": "all", "index": "string", "prefix": "b", "counts": false}}"#,
        )
        .unwrap();
        let TermsQuery::Sorted(sorted) = &query else {
            panic!("expected a sorted query");
        };
        assert_eq!(sorted.keys, vec![SortKey::CountDesc]);
        assert_eq!(
            *sorted.query,
            TermsQuery::All(AllTermsQuery {
                counts: false,
                ..AllTermsQuery::new("string", IndexType::Tokens).with_prefix("b")
            })
        );
        assert!(query.strings_enabled());
        assert!(!query.counts_enabled());
    }

    #[test]
    fn test_enabled_flags_compose() {
        let doc: TermsQuery = DocumentTermsQuery::new("string", IndexType::Tokens, 0).into();
        let mentions: TermsQuery = AnnotationTermQuery::new("Person", Vec::new()).into();
        assert!(TermsQuery::from(OrTermsQuery::new(vec![doc.clone(), doc.clone()])).counts_enabled());
        assert!(!TermsQuery::from(OrTermsQuery::new(vec![doc, mentions])).counts_enabled());
    }
}
