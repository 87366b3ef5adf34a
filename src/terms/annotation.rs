//! Terms derived from a semantic annotation helper instead of an index

use crate::annotation::Constraint;
use crate::engine::Engine;
use crate::error::{QueryError, Result};
use crate::terms::TermsQuery;
use crate::terms::result::TermsResultSet;
use crate::terms::sort::{SortKey, sort_terms};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Mentions matching an annotation query, as terms: the mention URI with
/// its span length. Never has counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationTermQuery {
    pub annotation_type: String,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
}

impl AnnotationTermQuery {
    pub fn new(annotation_type: &str, constraints: Vec<Constraint>) -> Self {
        Self {
            annotation_type: annotation_type.to_string(),
            constraints,
        }
    }

    pub fn execute(&self, engine: &Engine) -> Result<TermsResultSet> {
        let helper = engine.annotation_helper(&self.annotation_type)?;
        let mut mentions = helper.mentions(&self.annotation_type, &self.constraints, engine)?;
        mentions.sort_by(|a, b| a.uri.cmp(&b.uri));
        mentions.dedup_by(|a, b| a.uri == b.uri);
        let lengths = mentions.iter().map(|m| m.length).collect();
        Ok(TermsResultSet {
            term_ids: None,
            term_strings: Some(mentions.into_iter().map(|m| m.uri).collect()),
            term_lengths: Some(lengths),
            term_counts: None,
        })
    }
}

/// Another terms query over an annotation sub-index, with each mention URI
/// replaced by the helper's description of it.
///
/// Mentions sharing a description collapse into one term with their counts
/// summed. Lengths and ids no longer identify a single mention and are
/// dropped. The result is re-sorted by string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationTermsQuery {
    pub annotation_type: String,
    pub query: Box<TermsQuery>,
}

impl AnnotationTermsQuery {
    pub fn new(annotation_type: &str, query: TermsQuery) -> Self {
        Self {
            annotation_type: annotation_type.to_string(),
            query: Box::new(query),
        }
    }

    pub fn execute(&self, engine: &Engine) -> Result<TermsResultSet> {
        let helper = engine.annotation_helper(&self.annotation_type)?;
        let mut uris = self.query.execute(engine)?;
        let Some(strings) = uris.term_strings.take() else {
            return Err(QueryError::InvalidQuery(
                "annotation terms need mention URIs as strings".to_string(),
            ));
        };

        let mut described = TermsResultSet {
            term_ids: None,
            term_strings: Some(
                strings
                    .into_iter()
                    .map(|uri| helper.describe_mention(&uri).unwrap_or(uri))
                    .collect(),
            ),
            term_lengths: None,
            term_counts: uris.term_counts,
        };
        sort_terms(&mut described, &[SortKey::String]);
        let merged = collapse(described);
        debug!(
            annotation_type = %self.annotation_type,
            terms = merged.len(),
            "described annotation terms"
        );
        Ok(merged)
    }
}

/// Merge neighbouring equal strings, summing counts
fn collapse(set: TermsResultSet) -> TermsResultSet {
    let strings = set.term_strings.unwrap_or_default();
    let mut out_strings: Vec<String> = Vec::with_capacity(strings.len());
    let mut out_counts = set.term_counts.as_ref().map(|_| Vec::with_capacity(strings.len()));
    for (i, term) in strings.into_iter().enumerate() {
        let count = set.term_counts.as_ref().map_or(0, |c| c[i]);
        if out_strings.last() == Some(&term) {
            if let Some(last) = out_counts.as_mut().and_then(|c: &mut Vec<u64>| c.last_mut()) {
                *last += count;
            }
        } else {
            out_strings.push(term);
            if let Some(counts) = out_counts.as_mut() {
                counts.push(count);
            }
        }
    }
    TermsResultSet {
        term_ids: None,
        term_strings: Some(out_strings),
        term_lengths: None,
        term_counts: out_counts,
    }
}
