//! Boolean composition of term lists by sorted merge on the term string
//!
//! Sources must be sorted by string with no repeated string. Counts are
//! summed across sources and kept only when every source has them; lengths
//! come from the first source holding the term and are kept only when every
//! source has them. Term ids are dropped, since sources may come from
//! different sub-indexes.

use crate::engine::Engine;
use crate::error::{QueryError, Result};
use crate::terms::TermsQuery;
use crate::terms::result::TermsResultSet;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Terms present in every sub-query's result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AndTermsQuery {
    pub queries: Vec<TermsQuery>,
}

impl AndTermsQuery {
    pub fn new(queries: Vec<TermsQuery>) -> Self {
        Self { queries }
    }

    pub fn execute(&self, engine: &Engine) -> Result<TermsResultSet> {
        and_merge(&execute_all(&self.queries, engine)?)
    }

    pub fn counts_enabled(&self) -> bool {
        self.queries.iter().all(TermsQuery::counts_enabled)
    }
}

/// Terms present in any sub-query's result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrTermsQuery {
    pub queries: Vec<TermsQuery>,
}

impl OrTermsQuery {
    pub fn new(queries: Vec<TermsQuery>) -> Self {
        Self { queries }
    }

    pub fn execute(&self, engine: &Engine) -> Result<TermsResultSet> {
        or_merge(&execute_all(&self.queries, engine)?)
    }

    pub fn counts_enabled(&self) -> bool {
        self.queries.iter().all(TermsQuery::counts_enabled)
    }
}

/// Run every sub-query, refusing up front any that cannot produce strings
fn execute_all(queries: &[TermsQuery], engine: &Engine) -> Result<Vec<TermsResultSet>> {
    if queries.iter().any(|q| !q.strings_enabled()) {
        return Err(QueryError::InvalidQuery(
            "boolean terms queries need term strings from every sub-query".to_string(),
        ));
    }
    queries.iter().map(|q| q.execute(engine)).collect()
}

fn strings_of(sets: &[TermsResultSet]) -> Result<Vec<&[String]>> {
    sets.iter()
        .map(|set| {
            set.strings().ok_or_else(|| {
                QueryError::InvalidQuery("terms result without strings in a boolean merge".to_string())
            })
        })
        .collect()
}

/// Accumulates merged terms
struct MergeOutput {
    strings: Vec<String>,
    counts: Option<Vec<u64>>,
    lengths: Option<Vec<u32>>,
}

impl MergeOutput {
    fn new(sets: &[TermsResultSet]) -> Self {
        Self {
            strings: Vec::new(),
            counts: sets.iter().all(|s| s.counts().is_some()).then(Vec::new),
            lengths: sets.iter().all(|s| s.lengths().is_some()).then(Vec::new),
        }
    }

    fn push(&mut self, term: &str, set: &TermsResultSet, at: usize) {
        self.strings.push(term.to_string());
        if let Some(counts) = self.counts.as_mut() {
            counts.push(set.counts().map_or(0, |c| c[at]));
        }
        if let Some(lengths) = self.lengths.as_mut() {
            lengths.push(set.lengths().map_or(1, |l| l[at]));
        }
    }

    /// Fold another source's count into the last term
    fn add_count(&mut self, set: &TermsResultSet, at: usize) {
        if let (Some(counts), Some(extra)) = (self.counts.as_mut(), set.counts()) {
            if let Some(last) = counts.last_mut() {
                *last += extra[at];
            }
        }
    }

    fn finish(self) -> TermsResultSet {
        TermsResultSet {
            term_ids: None,
            term_strings: Some(self.strings),
            term_lengths: self.lengths,
            term_counts: self.counts,
        }
    }
}

/// K-way merge through a min-heap of each source's current term
pub fn or_merge(sets: &[TermsResultSet]) -> Result<TermsResultSet> {
    let strings = strings_of(sets)?;
    let mut out = MergeOutput::new(sets);
    let mut cursors = vec![0usize; sets.len()];
    let mut heap: BinaryHeap<Reverse<(&str, usize)>> = strings
        .iter()
        .enumerate()
        .filter_map(|(i, s)| s.first().map(|t| Reverse((t.as_str(), i))))
        .collect();

    while let Some(Reverse((term, source))) = heap.pop() {
        let at = cursors[source];
        cursors[source] += 1;
        if let Some(next) = strings[source].get(cursors[source]) {
            heap.push(Reverse((next.as_str(), source)));
        }
        if out.strings.last().is_some_and(|last| last == term) {
            out.add_count(&sets[source], at);
        } else {
            out.push(term, &sets[source], at);
        }
    }
    Ok(out.finish())
}

/// Linear multi-pointer merge: every source is raised to the largest
/// current term until all agree
pub fn and_merge(sets: &[TermsResultSet]) -> Result<TermsResultSet> {
    let strings = strings_of(sets)?;
    let mut out = MergeOutput::new(sets);
    if strings.is_empty() {
        return Ok(out.finish());
    }
    let mut cursors = vec![0usize; sets.len()];

    'merge: loop {
        let Some(first) = strings[0].get(cursors[0]) else {
            break;
        };
        let mut candidate = first.as_str();
        loop {
            let mut agreed = true;
            for (i, source) in strings.iter().enumerate() {
                while cursors[i] < source.len() && source[cursors[i]].as_str() < candidate {
                    cursors[i] += 1;
                }
                let Some(term) = source.get(cursors[i]) else {
                    break 'merge;
                };
                if term.as_str() > candidate {
                    candidate = term.as_str();
                    agreed = false;
                }
            }
            if agreed {
                break;
            }
        }

        out.push(candidate, &sets[0], cursors[0]);
        for (i, set) in sets.iter().enumerate().skip(1) {
            out.add_count(set, cursors[i]);
        }
        for cursor in cursors.iter_mut() {
            *cursor += 1;
        }
    }
    Ok(out.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(terms: &[(&str, u64)]) -> TermsResultSet {
        TermsResultSet {
            term_ids: None,
            term_strings: Some(terms.iter().map(|(t, _)| t.to_string()).collect()),
            term_lengths: None,
            term_counts: Some(terms.iter().map(|&(_, n)| n).collect()),
        }
    }

    #[test]
    fn test_or_merge_sums_counts() {
        let merged = or_merge(&[
            set(&[("a", 1), ("c", 2), ("e", 1)]),
            set(&[("b", 4), ("c", 3)]),
            set(&[]),
        ])
        .unwrap();
        assert_eq!(merged.strings().unwrap(), &["a", "b", "c", "e"]);
        assert_eq!(merged.counts().unwrap(), &[1, 4, 5, 1]);
        assert!(merged.ids().is_none());
    }

    #[test]
    fn test_and_merge_keeps_common_terms() {
        let merged = and_merge(&[
            set(&[("a", 1), ("b", 1), ("d", 2), ("f", 1)]),
            set(&[("b", 2), ("c", 1), ("d", 1), ("f", 3)]),
            set(&[("d", 5), ("e", 1), ("f", 1)]),
        ])
        .unwrap();
        assert_eq!(merged.strings().unwrap(), &["d", "f"]);
        assert_eq!(merged.counts().unwrap(), &[8, 5]);
    }

    #[test]
    fn test_counts_dropped_unless_all_sources_have_them() {
        let mut without = set(&[("a", 0)]);
        without.term_counts = None;
        let merged = or_merge(&[set(&[("a", 2)]), without]).unwrap();
        assert!(merged.counts().is_none());
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn test_merge_without_strings_is_rejected() {
        let mut ids_only = set(&[("a", 1)]);
        ids_only.term_strings = None;
        assert!(and_merge(&[ids_only]).is_err());
    }

    #[test]
    fn test_and_merge_of_nothing_is_empty() {
        assert!(and_merge(&[]).unwrap().is_empty());
    }
}
