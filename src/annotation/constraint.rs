use crate::error::{QueryError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Comparison applied between a mention feature and a constraint value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Regex,
}

/// A feature constraint on annotation mentions, e.g. `unit = "km"`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    pub predicate: Predicate,
    pub feature: String,
    pub value: String,
}

impl Constraint {
    pub fn new(predicate: Predicate, feature: &str, value: &str) -> Self {
        Self {
            predicate,
            feature: feature.to_string(),
            value: value.to_string(),
        }
    }

    pub fn equals(feature: &str, value: &str) -> Self {
        Self::new(Predicate::Eq, feature, value)
    }

    /// Prepare the constraint for matching; fails on a malformed regex
    pub fn compile(&self) -> Result<ConstraintMatcher<'_>> {
        let regex = match self.predicate {
            Predicate::Regex => Some(Regex::new(&self.value).map_err(|e| {
                QueryError::InvalidConstraint {
                    feature: self.feature.clone(),
                    reason: e.to_string(),
                }
            })?),
            _ => None,
        };
        Ok(ConstraintMatcher {
            constraint: self,
            regex,
        })
    }
}

/// A compiled [`Constraint`]
#[derive(Debug)]
pub struct ConstraintMatcher<'a> {
    constraint: &'a Constraint,
    regex: Option<Regex>,
}

impl ConstraintMatcher<'_> {
    /// Whether a mention with these features satisfies the constraint.
    /// A mention lacking the feature never does.
    pub fn matches(&self, features: &BTreeMap<String, String>) -> bool {
        let Some(actual) = features.get(&self.constraint.feature) else {
            return false;
        };
        if let Some(regex) = &self.regex {
            return regex.is_match(actual);
        }
        let ordering = compare_values(actual, &self.constraint.value);
        match self.constraint.predicate {
            Predicate::Eq => ordering == Ordering::Equal,
            Predicate::Ne => ordering != Ordering::Equal,
            Predicate::Lt => ordering == Ordering::Less,
            Predicate::Le => ordering != Ordering::Greater,
            Predicate::Gt => ordering == Ordering::Greater,
            Predicate::Ge => ordering != Ordering::Less,
            Predicate::Regex => false,
        }
    }
}

/// Numeric comparison when both sides are numbers, string comparison otherwise
fn compare_values(actual: &str, expected: &str) -> Ordering {
    match (actual.trim().parse::<f64>(), expected.trim().parse::<f64>()) {
        (Ok(a), Ok(b)) => a.total_cmp(&b),
        _ => actual.cmp(expected),
    }
}
