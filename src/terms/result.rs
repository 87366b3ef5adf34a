use crate::index::types::TermId;
use serde::Serialize;

/// Parallel arrays describing a list of terms.
///
/// Every present array has the same length. Results that feed the boolean
/// merges must be sorted by term string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TermsResultSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub term_ids: Option<Vec<TermId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub term_strings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub term_lengths: Option<Vec<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub term_counts: Option<Vec<u64>>,
}

impl TermsResultSet {
    pub const EMPTY: TermsResultSet = TermsResultSet {
        term_ids: Some(Vec::new()),
        term_strings: Some(Vec::new()),
        term_lengths: Some(Vec::new()),
        term_counts: Some(Vec::new()),
    };

    pub fn len(&self) -> usize {
        self.term_strings
            .as_ref()
            .map(Vec::len)
            .or(self.term_ids.as_ref().map(Vec::len))
            .or(self.term_counts.as_ref().map(Vec::len))
            .or(self.term_lengths.as_ref().map(Vec::len))
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn strings(&self) -> Option<&[String]> {
        self.term_strings.as_deref()
    }

    pub fn counts(&self) -> Option<&[u64]> {
        self.term_counts.as_deref()
    }

    pub fn lengths(&self) -> Option<&[u32]> {
        self.term_lengths.as_deref()
    }

    pub fn ids(&self) -> Option<&[TermId]> {
        self.term_ids.as_deref()
    }

    /// Keep only the first `n` terms
    pub fn truncate(&mut self, n: usize) {
        if let Some(v) = self.term_ids.as_mut() {
            v.truncate(n);
        }
        if let Some(v) = self.term_strings.as_mut() {
            v.truncate(n);
        }
        if let Some(v) = self.term_lengths.as_mut() {
            v.truncate(n);
        }
        if let Some(v) = self.term_counts.as_mut() {
            v.truncate(n);
        }
    }

    /// Reorder every array so that entry `i` becomes old entry `order[i]`
    pub fn permute(&mut self, order: &[usize]) {
        fn apply<T: Clone>(values: &mut Option<Vec<T>>, order: &[usize]) {
            if let Some(v) = values.as_mut() {
                *v = order.iter().map(|&i| v[i].clone()).collect();
            }
        }
        apply(&mut self.term_ids, order);
        apply(&mut self.term_strings, order);
        apply(&mut self.term_lengths, order);
        apply(&mut self.term_counts, order);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TermsResultSet {
        TermsResultSet {
            term_ids: None,
            term_strings: Some(vec!["a".into(), "b".into(), "c".into()]),
            term_lengths: None,
            term_counts: Some(vec![5, 1, 3]),
        }
    }

    #[test]
    fn test_empty() {
        assert!(TermsResultSet::EMPTY.is_empty());
        assert_eq!(TermsResultSet::EMPTY.strings(), Some(&[][..]));
    }

    #[test]
    fn test_permute_and_truncate() {
        let mut set = sample();
        set.permute(&[2, 0, 1]);
        assert_eq!(set.strings().unwrap(), &["c", "a", "b"]);
        assert_eq!(set.counts().unwrap(), &[3, 5, 1]);
        set.truncate(2);
        assert_eq!(set.len(), 2);
        assert_eq!(set.counts().unwrap(), &[3, 5]);
        assert!(set.ids().is_none());
    }
}
