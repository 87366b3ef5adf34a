use crate::annotation::{Constraint, Mention, SemanticAnnotationHelper};
use crate::engine::Engine;
use crate::error::{QueryError, Result};
use ahash::AHashMap;
use std::collections::BTreeMap;
use tracing::debug;

/// A mention known to a [`MemoryAnnotationHelper`]
#[derive(Debug, Clone)]
struct MentionRecord {
    uri: String,
    length: u32,
    features: BTreeMap<String, String>,
}

/// Annotation helper holding its mentions in memory.
///
/// Every distinct `(length, features)` combination of one annotation type
/// is one mention, with URI `"{type}:{n}"` in registration order.
#[derive(Debug)]
pub struct MemoryAnnotationHelper {
    annotation_type: String,
    mentions: Vec<MentionRecord>,
    by_key: AHashMap<(u32, BTreeMap<String, String>), usize>,
    by_uri: AHashMap<String, usize>,
}

impl MemoryAnnotationHelper {
    pub fn new(annotation_type: &str) -> Self {
        Self {
            annotation_type: annotation_type.to_string(),
            mentions: Vec::new(),
            by_key: AHashMap::new(),
            by_uri: AHashMap::new(),
        }
    }

    pub fn annotation_type(&self) -> &str {
        &self.annotation_type
    }

    /// URI of the mention for these features and length, registering it if new
    pub fn register(&mut self, length: u32, features: BTreeMap<String, String>) -> String {
        if let Some(&idx) = self.by_key.get(&(length, features.clone())) {
            return self.mentions[idx].uri.clone();
        }
        let idx = self.mentions.len();
        let uri = format!("{}:{}", self.annotation_type, idx);
        self.by_key.insert((length, features.clone()), idx);
        self.by_uri.insert(uri.clone(), idx);
        self.mentions.push(MentionRecord {
            uri: uri.clone(),
            length,
            features,
        });
        uri
    }

    /// Number of distinct mentions
    pub fn len(&self) -> usize {
        self.mentions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mentions.is_empty()
    }

    /// Span length of a mention
    pub fn mention_length(&self, uri: &str) -> Option<u32> {
        self.by_uri.get(uri).map(|&idx| self.mentions[idx].length)
    }
}

impl SemanticAnnotationHelper for MemoryAnnotationHelper {
    fn mentions(
        &self,
        annotation_type: &str,
        constraints: &[Constraint],
        _engine: &Engine,
    ) -> Result<Vec<Mention>> {
        if annotation_type != self.annotation_type {
            return Err(QueryError::Helper(format!(
                "helper for {} asked for {} mentions",
                self.annotation_type, annotation_type
            )));
        }
        let matchers = constraints
            .iter()
            .map(Constraint::compile)
            .collect::<Result<Vec<_>>>()?;

        let mentions: Vec<Mention> = self
            .mentions
            .iter()
            .filter(|m| matchers.iter().all(|c| c.matches(&m.features)))
            .map(|m| Mention {
                uri: m.uri.clone(),
                length: m.length,
            })
            .collect();
        debug!(
            annotation_type,
            constraints = constraints.len(),
            mentions = mentions.len(),
            "mention lookup"
        );
        Ok(mentions)
    }

    fn describe_mention(&self, uri: &str) -> Option<String> {
        let record = &self.mentions[*self.by_uri.get(uri)?];
        if record.features.is_empty() {
            return Some(self.annotation_type.clone());
        }
        let features = record
            .features
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(", ");
        Some(format!("{} {{{}}}", self.annotation_type, features))
    }
}
