//! Corpus loading and index construction
//!
//! A corpus is a JSON list of documents, each carrying one token list per
//! feature and a list of annotations:
//!
//! ```json
//! {"documents": [
//!   {"tokens": {"string": ["To", "be", "or", "not", "to", "be"]},
//!    "annotations": [{"type": "Person", "start": 0, "length": 2,
//!                     "features": {"gender": "female"}}]}
//! ]}
//! ```
//!
//! Document ids are positions in the list. Each distinct
//! `(type, length, features)` becomes one mention, posted at the start of
//! every annotation carrying it.

use crate::annotation::MemoryAnnotationHelper;
use crate::engine::Engine;
use crate::error::{QueryError, Result};
use crate::index::positional::{PositionalIndex, PositionalIndexBuilder};
use crate::index::types::{AnnotationIndexConfig, DocId, IndexConfig, IndexType, Position};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Corpus {
    pub documents: Vec<CorpusDocument>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorpusDocument {
    /// Token list per feature name
    #[serde(default)]
    pub tokens: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub annotations: Vec<CorpusAnnotation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusAnnotation {
    #[serde(rename = "type")]
    pub annotation_type: String,
    pub start: Position,
    pub length: u32,
    #[serde(default)]
    pub features: BTreeMap<String, String>,
}

impl Corpus {
    /// Read a corpus from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Annotation types used anywhere in the corpus
    pub fn annotation_types(&self) -> BTreeSet<&str> {
        self.documents
            .iter()
            .flat_map(|d| d.annotations.iter().map(|a| a.annotation_type.as_str()))
            .collect()
    }
}

impl IndexConfig {
    /// Add an annotation sub-index, with its direct side, for every type the
    /// corpus uses that is not configured yet
    pub fn with_corpus_annotations(mut self, corpus: &Corpus) -> Self {
        for annotation_type in corpus.annotation_types() {
            if self.annotation_index(annotation_type).is_none() {
                self.annotation_indexes.push(AnnotationIndexConfig {
                    annotation_type: annotation_type.to_string(),
                    direct_index: true,
                });
            }
        }
        self
    }
}

/// Builds every configured sub-index from a corpus and opens an [`Engine`] on them
pub struct IndexBuilder {
    config: IndexConfig,
}

impl IndexBuilder {
    pub fn new(config: IndexConfig) -> Self {
        Self { config }
    }

    pub fn build(self, corpus: &Corpus) -> Result<Engine> {
        if corpus.documents.len() > DocId::MAX as usize {
            return Err(QueryError::Config(format!(
                "corpus of {} documents exceeds the document id range",
                corpus.documents.len()
            )));
        }

        let mut tokens: Vec<PositionalIndexBuilder> = self
            .config
            .token_indexes
            .iter()
            .map(|c| {
                PositionalIndex::builder(&c.feature, IndexType::Tokens)
                    .transform(c.transform)
                    .direct_index(c.direct_index)
            })
            .collect();
        let mut annotations: Vec<(PositionalIndexBuilder, MemoryAnnotationHelper)> = self
            .config
            .annotation_indexes
            .iter()
            .map(|c| {
                (
                    PositionalIndex::builder(&c.annotation_type, IndexType::Annotations)
                        .direct_index(c.direct_index),
                    MemoryAnnotationHelper::new(&c.annotation_type),
                )
            })
            .collect();

        let mut document_sizes = Vec::with_capacity(corpus.documents.len());
        for (doc_id, document) in corpus.documents.iter().enumerate() {
            let doc_id = doc_id as DocId;
            let size = document.tokens.values().map(Vec::len).max().unwrap_or(0);

            for (config, builder) in self.config.token_indexes.iter().zip(tokens.iter_mut()) {
                let Some(list) = document.tokens.get(&config.feature) else {
                    continue;
                };
                for (position, token) in list.iter().enumerate() {
                    builder.add(doc_id, position as Position, token);
                }
            }

            for annotation in &document.annotations {
                let Some((builder, helper)) = annotations
                    .iter_mut()
                    .find(|(_, h)| h.annotation_type() == annotation.annotation_type)
                else {
                    debug!(
                        annotation_type = %annotation.annotation_type,
                        doc_id,
                        "skipping annotation of unconfigured type"
                    );
                    continue;
                };
                if annotation.length == 0 || annotation.start as usize + annotation.length as usize > size {
                    return Err(QueryError::Config(format!(
                        "{} annotation at {}+{} does not fit document {} of {} tokens",
                        annotation.annotation_type, annotation.start, annotation.length, doc_id, size
                    )));
                }
                let uri = helper.register(annotation.length, annotation.features.clone());
                builder.add(doc_id, annotation.start, &uri);
            }

            document_sizes.push(size as u32);
        }

        let mut engine = Engine::builder(self.config).document_sizes(document_sizes);
        for builder in tokens {
            engine = engine.index(builder.build());
        }
        for (builder, helper) in annotations {
            debug!(
                annotation_type = %helper.annotation_type(),
                mentions = helper.len(),
                "built annotation index"
            );
            let annotation_type = helper.annotation_type().to_string();
            engine = engine
                .index(builder.build())
                .helper(&annotation_type, Arc::new(helper));
        }
        engine.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CORPUS: &str = r#"{"documents": [
        {"tokens": {"string": ["To", "be", "or", "not", "to", "be"]},
         "annotations": [{"type": "Person", "start": 0, "length": 2, "features": {"gender": "female"}},
                         {"type": "Person", "start": 4, "length": 2, "features": {"gender": "female"}},
                         {"type": "Place", "start": 3, "length": 1}]},
        {"tokens": {"string": ["be", "quick"]}}
    ]}"#;

    fn config() -> IndexConfig {
        IndexConfig {
            annotation_indexes: vec![AnnotationIndexConfig {
                annotation_type: "Person".to_string(),
                direct_index: true,
            }],
            ..IndexConfig::default()
        }
    }

    #[test]
    fn test_build_indexes_and_sizes() {
        let corpus = Corpus::from_json(CORPUS).unwrap();
        let engine = IndexBuilder::new(config()).build(&corpus).unwrap();
        assert_eq!(engine.document_sizes(), &[6, 2]);

        let tokens = engine.token_index("string").unwrap().index();
        assert_eq!(tokens.term_id("to").map(|id| tokens.occurrences(id)), Some(2));

        let persons = engine.annotation_index("Person").unwrap().index();
        assert_eq!(persons.terms(), &["Person:0"]);
        let postings = persons.postings(0).unwrap();
        assert_eq!(&*postings[0].positions, &[0, 4]);
        // Place is not configured
        assert!(engine.annotation_index("Place").is_err());
    }

    #[test]
    fn test_corpus_annotations_extend_config() {
        let corpus = Corpus::from_json(CORPUS).unwrap();
        let config = IndexConfig::default().with_corpus_annotations(&corpus);
        let types: Vec<_> = config
            .annotation_indexes
            .iter()
            .map(|c| c.annotation_type.as_str())
            .collect();
        assert_eq!(types, vec!["Person", "Place"]);
        let engine = IndexBuilder::new(config).build(&corpus).unwrap();
        assert!(engine.annotation_helper("Place").is_ok());
    }

    #[test]
    fn test_annotation_past_document_end_is_rejected() {
        let corpus = Corpus::from_json(
            r#"{"documents": [{"tokens": {"string": ["a"]},
                "annotations": [{"type": "Person", "start": 0, "length": 2}]}]}"#,
        )
        .unwrap();
        assert!(matches!(
            IndexBuilder::new(config()).build(&corpus),
            Err(QueryError::Config(_))
        ));
    }
}
