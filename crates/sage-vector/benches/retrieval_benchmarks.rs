//! Benchmarks for exact k-NN search and end-to-end retrieval.
//!
//! The knowledge base is expected to hold tens to a few thousand entries.
//! The default run uses 1,000 entries; set `BENCH_FULL_SCALE=1` to use
//! 5,000.

use std::time::Duration;

use criterion::{criterion_group, criterion_main, Criterion};

use sage_core::types::KnowledgeEntry;
use sage_vector::embedding::{EmbeddingService, MockEmbedding};
use sage_vector::Retriever;

const DEFAULT_ENTRY_COUNT: usize = 1_000;
const FULL_SCALE_ENTRY_COUNT: usize = 5_000;

const TOPICS: [&str; 6] = [
    "course enrollment and prerequisites",
    "certificate download and verification",
    "payment methods and refunds",
    "quiz attempts and passing scores",
    "forum moderation and posting rules",
    "instructor tools for uploading content",
];

fn entry_count() -> usize {
    if std::env::var("BENCH_FULL_SCALE").is_ok() {
        FULL_SCALE_ENTRY_COUNT
    } else {
        DEFAULT_ENTRY_COUNT
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to build tokio runtime")
}

fn make_entry(i: usize) -> KnowledgeEntry {
    let topic = TOPICS[i % TOPICS.len()];
    KnowledgeEntry::document(
        i as i64,
        format!("Help article {} about {}", i, topic),
        format!(
            "This article explains {} on the learning platform. \
             Reference number {} for support staff.",
            topic, i
        ),
    )
}

fn build_retriever(rt: &tokio::runtime::Runtime, count: usize) -> Retriever {
    let retriever = Retriever::new(MockEmbedding::new());
    let entries = (0..count).map(make_entry).collect();
    let outcomes = rt.block_on(retriever.add_entries(entries));
    assert!(outcomes.iter().all(|o| o.is_indexed()));
    retriever
}

fn bench_corpus_search(c: &mut Criterion) {
    let rt = runtime();
    let count = entry_count();
    let retriever = build_retriever(&rt, count);
    let query_vec = rt
        .block_on(MockEmbedding::new().embed("how do I get a refund"))
        .expect("query embed failed");

    let mut group = c.benchmark_group("corpus_search");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function(format!("knn_top3_{}entries", count), |b| {
        b.iter(|| {
            let hits = retriever
                .corpus()
                .search(&query_vec, 3)
                .expect("search failed");
            assert_eq!(hits.len(), 3);
            hits
        });
    });

    group.finish();
}

fn bench_retrieve(c: &mut Criterion) {
    let rt = runtime();
    let count = entry_count();
    let retriever = build_retriever(&rt, count);

    let mut group = c.benchmark_group("retrieve");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function(format!("embed_and_search_top3_{}entries", count), |b| {
        b.iter(|| {
            let results = rt.block_on(retriever.retrieve("where can I download my certificate", 3));
            assert_eq!(results.len(), 3);
            results
        });
    });

    group.finish();
}

criterion_group!(benches, bench_corpus_search, bench_retrieve);
criterion_main!(benches);
