#![no_main]

use libfuzzer_sys::fuzz_target;
use semq::index::{Corpus, IndexBuilder, IndexConfig};
use semq::terms::TermsQuery;
use std::sync::OnceLock;

const CORPUS: &str = r#"{"documents": [
    {"tokens": {"string": ["To", "be", "or", "not", "to", "be"]},
     "annotations": [{"type": "Person", "start": 4, "length": 2, "features": {"age": "34"}}]},
    {"tokens": {"string": ["be", "quick"]}}
]}"#;

fn engine() -> &'static semq::Engine {
    static ENGINE: OnceLock<semq::Engine> = OnceLock::new();
    ENGINE.get_or_init(|| {
        let corpus = Corpus::from_json(CORPUS).expect("fuzz corpus");
        let config = IndexConfig::default().with_corpus_annotations(&corpus);
        IndexBuilder::new(config).build(&corpus).expect("fuzz engine")
    })
}

fuzz_target!(|data: &str| {
    if let Ok(query) = serde_json::from_str::<TermsQuery>(data) {
        let _ = query.execute(engine());
    }
});
