#![no_main]

use libfuzzer_sys::fuzz_target;
use semq::index::{Corpus, IndexBuilder, IndexConfig};
use semq::query::{QueryNode, QueryRunner};
use std::sync::{Arc, OnceLock};

const CORPUS: &str = r#"{"documents": [
    {"tokens": {"string": ["To", "be", "or", "not", "to", "be"]},
     "annotations": [{"type": "Person", "start": 0, "length": 2, "features": {"gender": "female"}}]},
    {"tokens": {"string": ["be", "quick", "to", "be"]},
     "annotations": [{"type": "Interval", "start": 1, "length": 3, "features": {"kind": "range"}}]}
]}"#;

fn engine() -> &'static semq::Engine {
    static ENGINE: OnceLock<semq::Engine> = OnceLock::new();
    ENGINE.get_or_init(|| {
        let corpus = Corpus::from_json(CORPUS).expect("fuzz corpus");
        let config = IndexConfig {
            executor_cache_size: 1,
            ..IndexConfig::default().with_corpus_annotations(&corpus)
        };
        IndexBuilder::new(config).build(&corpus).expect("fuzz engine")
    })
}

fuzz_target!(|data: &str| {
    // Any query that parses must compile or fail cleanly, and never panic while running
    let Ok(query) = serde_json::from_str::<Arc<QueryNode>>(data) else {
        return;
    };
    let _ = QueryRunner::new(engine()).with_limit(16).run(&query);
});
