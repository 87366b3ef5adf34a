use crate::engine::Engine;
use crate::error::Result;
use crate::terms::TermsQuery;
use crate::terms::result::TermsResultSet;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One sort criterion. A key whose column is absent from the result leaves
/// the order to the next key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Id,
    IdDesc,
    Count,
    CountDesc,
    String,
    StringDesc,
}

impl SortKey {
    fn compare(self, set: &TermsResultSet, a: usize, b: usize) -> Ordering {
        match self {
            SortKey::Id => by(set.ids(), a, b),
            SortKey::IdDesc => by(set.ids(), b, a),
            SortKey::Count => by(set.counts(), a, b),
            SortKey::CountDesc => by(set.counts(), b, a),
            SortKey::String => by(set.strings(), a, b),
            SortKey::StringDesc => by(set.strings(), b, a),
        }
    }
}

fn by<T: Ord>(column: Option<&[T]>, a: usize, b: usize) -> Ordering {
    column.map_or(Ordering::Equal, |c| c[a].cmp(&c[b]))
}

/// Reorder a result set by several keys, earlier keys first. Ties keep
/// their original order.
pub fn sort_terms(set: &mut TermsResultSet, keys: &[SortKey]) {
    let mut order: Vec<usize> = (0..set.len()).collect();
    order.sort_by(|&a, &b| {
        keys.iter()
            .map(|key| key.compare(set, a, b))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    });
    set.permute(&order);
}

/// Another terms query's result, re-ordered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortedTermsQuery {
    pub query: Box<TermsQuery>,
    pub keys: Vec<SortKey>,
}

impl SortedTermsQuery {
    pub fn new(query: TermsQuery, keys: Vec<SortKey>) -> Self {
        Self {
            query: Box::new(query),
            keys,
        }
    }

    pub fn execute(&self, engine: &Engine) -> Result<TermsResultSet> {
        let mut set = self.query.execute(engine)?;
        sort_terms(&mut set, &self.keys);
        Ok(set)
    }
}

/// The first `limit` terms of another terms query's result.
///
/// Applied after the wrapped query has run, unlike the limit an index terms
/// query applies to itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitTermsQuery {
    pub query: Box<TermsQuery>,
    pub limit: usize,
}

impl LimitTermsQuery {
    pub fn new(query: TermsQuery, limit: usize) -> Self {
        Self {
            query: Box::new(query),
            limit,
        }
    }

    pub fn execute(&self, engine: &Engine) -> Result<TermsResultSet> {
        let mut set = self.query.execute(engine)?;
        set.truncate(self.limit);
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TermsResultSet {
        TermsResultSet {
            term_ids: None,
            term_strings: Some(vec!["be".into(), "not".into(), "or".into(), "to".into()]),
            term_lengths: None,
            term_counts: Some(vec![2, 1, 1, 2]),
        }
    }

    #[test]
    fn test_multi_key_sort() {
        let mut set = sample();
        sort_terms(&mut set, &[SortKey::CountDesc, SortKey::StringDesc]);
        assert_eq!(set.strings().unwrap(), &["to", "be", "or", "not"]);
        assert_eq!(set.counts().unwrap(), &[2, 2, 1, 1]);
    }

    #[test]
    fn test_missing_ids_keep_original_order() {
        let mut set = sample();
        sort_terms(&mut set, &[SortKey::IdDesc]);
        assert_eq!(set, sample());
        sort_terms(&mut set, &[SortKey::IdDesc, SortKey::Count]);
        assert_eq!(set.strings().unwrap(), &["not", "or", "be", "to"]);
    }
}
