//! Shared corpus and helpers for the integration tests
#![allow(dead_code)]

use semq::engine::Engine;
use semq::index::build::{Corpus, CorpusAnnotation, CorpusDocument};
use semq::index::{DocId, IndexBuilder, IndexConfig};
use semq::query::{QueryExecutor, drain_hits};
use std::collections::BTreeMap;
use std::sync::OnceLock;

static CORPUS: OnceLock<Corpus> = OnceLock::new();

fn annotation(annotation_type: &str, start: u32, length: u32, features: &[(&str, &str)]) -> CorpusAnnotation {
    CorpusAnnotation {
        annotation_type: annotation_type.to_string(),
        start,
        length,
        features: features
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    }
}

fn document(tokens: Vec<String>, annotations: Vec<CorpusAnnotation>) -> CorpusDocument {
    CorpusDocument {
        tokens: BTreeMap::from([("string".to_string(), tokens)]),
        annotations,
    }
}

fn words(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

/// Six documents:
///
/// | doc | text | annotations |
/// |---|---|---|
/// | 0 | `a b c to d e f g h to` | Interval [0,2), Person [4,6) female 34 |
/// | 1 | `nothing here` | Person [0,1) male 7 |
/// | 2 | `z to` | |
/// | 3 | `To be or not to be` | Person [0,2) female 34 |
/// | 4 | `be quick` | |
/// | 5 | `w0 .. w29`, `to` at 12 and 25 | Interval [10,20) |
pub fn corpus() -> &'static Corpus {
    CORPUS.get_or_init(|| {
        let long: Vec<String> = (0..30)
            .map(|i| match i {
                12 | 25 => "to".to_string(),
                _ => format!("w{}", i),
            })
            .collect();
        Corpus {
            documents: vec![
                document(
                    words("a b c to d e f g h to"),
                    vec![
                        annotation("Interval", 0, 2, &[("kind", "date")]),
                        annotation("Person", 4, 2, &[("gender", "female"), ("age", "34")]),
                    ],
                ),
                document(
                    words("nothing here"),
                    vec![annotation("Person", 0, 1, &[("gender", "male"), ("age", "7")])],
                ),
                document(words("z to"), Vec::new()),
                document(
                    words("To be or not to be"),
                    vec![annotation("Person", 0, 2, &[("gender", "female"), ("age", "34")])],
                ),
                document(words("be quick"), Vec::new()),
                document(long, vec![annotation("Interval", 10, 10, &[("kind", "range")])]),
            ],
        }
    })
}

/// Default configuration plus a direct-indexed sub-index per annotation type
pub fn config() -> IndexConfig {
    IndexConfig::default().with_corpus_annotations(corpus())
}

pub fn engine() -> Engine {
    engine_with(config())
}

pub fn engine_with(config: IndexConfig) -> Engine {
    IndexBuilder::new(config)
        .build(corpus())
        .expect("Failed to build fixture engine")
}

/// Engine over plain texts, one document each, no annotations
pub fn text_engine(texts: &[&str]) -> Engine {
    let corpus = Corpus {
        documents: texts.iter().map(|t| document(words(t), Vec::new())).collect(),
    };
    IndexBuilder::new(IndexConfig::default())
        .build(&corpus)
        .expect("Failed to build text engine")
}

/// Every `(document, position, length)` produced, closing the executor after
pub fn spans(executor: &mut dyn QueryExecutor) -> Vec<(DocId, u32, u32)> {
    let mut out = Vec::new();
    let mut doc = executor.next_document(-1).expect("next_document failed");
    while doc >= 0 {
        for hit in drain_hits(&mut *executor).expect("next_hit failed") {
            out.push((hit.document(), hit.position(), hit.length()));
        }
        doc = executor.next_document(doc).expect("next_document failed");
    }
    executor.close();
    out
}

/// No reader of any sub-index is on loan
pub fn all_readers_returned(engine: &Engine) -> bool {
    let tokens = engine
        .config()
        .token_indexes
        .iter()
        .all(|c| engine.token_index(&c.feature).map(|p| p.borrowed() == 0).unwrap_or(false));
    let annotations = engine
        .config()
        .annotation_indexes
        .iter()
        .all(|c| {
            engine
                .annotation_index(&c.annotation_type)
                .map(|p| p.borrowed() == 0)
                .unwrap_or(false)
        });
    tokens && annotations
}
