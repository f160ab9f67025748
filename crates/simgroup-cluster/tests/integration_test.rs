//! Integration tests for simgroup-cluster.
//!
//! Tests end-to-end workflows with real file I/O.

use simgroup_cluster::{
    ClusterConfig, DocumentSource, FieldNames, GroupingRunner, JsonlIndex, KvStore, MinHashLsh,
    Preprocessor, RunConfig, SimplePreprocessor, StreamClustering, DOC2SIM, HASH2DOC,
};
use simgroup_core::MemoryStore;
use std::collections::HashMap;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

/// Build a JSONL corpus where every `dup_every`-th record repeats an earlier one.
fn create_corpus(num_docs: usize, dup_every: usize) -> String {
    let mut lines = Vec::with_capacity(num_docs);
    for i in 0..num_docs {
        // Unique records share no tokens; repeats copy their predecessor.
        let source = if i > 0 && i % dup_every == 0 { i - 1 } else { i };
        let text = format!(
            "item{source} alpha{source} beta{source} gamma{source} delta{source} epsilon{source}."
        );
        let day = 1 + i % 3;
        lines.push(
            serde_json::json!({"id": format!("doc-{i}"), "text": text, "date": format!("2024-05-0{day}")})
                .to_string(),
        );
    }
    lines.join("\n")
}

fn engine(store: Arc<MemoryStore>) -> StreamClustering<MinHashLsh, Arc<MemoryStore>> {
    StreamClustering::new(MinHashLsh::new(100, 20, 0.9).unwrap(), store)
}

#[tokio::test]
async fn test_small_signature_scenario() {
    let engine = StreamClustering::new(MinHashLsh::new(4, 2, 0.5).unwrap(), MemoryStore::new());

    assert_eq!(engine.find_group("a", &["x", "y"]).await.unwrap(), "a");
    assert_eq!(engine.find_group("b", &["x", "y"]).await.unwrap(), "a");
    assert_eq!(
        engine
            .find_group("c", &["completely", "different", "tokens", "here"])
            .await
            .unwrap(),
        "c"
    );

    // Bucket owners of a's two bands, plus c's two.
    assert_eq!(engine.store().len(HASH2DOC).await, 4);
    assert_eq!(engine.store().len(DOC2SIM).await, 1);
}

#[tokio::test]
async fn test_text_pipeline_into_clustering() {
    let pre = SimplePreprocessor::new();
    let engine = engine(Arc::new(MemoryStore::new()));

    let original = "U.S. GDP grew 3.5% in 2020. Analysts expect slower growth next year.";
    let reformatted = "U.S. GDP grew 3.5% in 2020.\nAnalysts expect slower growth next year.";
    let other = "The city council approved a new budget for public parks.";

    let tokens = pre.hashing_tokens(original);
    assert!(tokens.contains(&"3.5".to_string()));
    assert!(tokens.contains(&"U.S".to_string()));

    let first = engine.find_group("orig", &tokens).await.unwrap();
    let second = engine
        .find_group("reformatted", &pre.hashing_tokens(reformatted))
        .await
        .unwrap();
    let third = engine
        .find_group("other", &pre.hashing_tokens(other))
        .await
        .unwrap();

    assert_eq!(first, "orig");
    // Only sentence boundaries differ, so the token sets are identical.
    assert_eq!(second, "orig");
    assert_eq!(third, "other");
}

#[tokio::test]
async fn test_jsonl_run_end_to_end() {
    let temp_dir = TempDir::new().unwrap();
    let input_path = temp_dir.path().join("input.jsonl");
    let output_path = temp_dir.path().join("output.jsonl");
    fs::write(&input_path, create_corpus(60, 5)).unwrap();

    let mut index = JsonlIndex::open(&input_path, FieldNames::default()).unwrap();
    assert_eq!(index.len(), 60);

    let runner = GroupingRunner::new(
        SimplePreprocessor::new(),
        engine(Arc::new(MemoryStore::new())),
        RunConfig {
            workers: 1,
            batch_size: 7,
            ..Default::default()
        },
    )
    .unwrap();
    let stats = runner.run(&mut index).await.unwrap();

    // doc-5, doc-10, ... doc-55 repeat their predecessor.
    assert_eq!(stats.total, 60);
    assert_eq!(stats.duplicates, 11);
    assert_eq!(stats.updated, 60);
    index.save(&output_path).unwrap();

    let output = fs::read_to_string(&output_path).unwrap();
    let records: Vec<serde_json::Value> = output
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(records.len(), 60);

    let groups: HashMap<&str, &str> = records
        .iter()
        .map(|r| (r["id"].as_str().unwrap(), r["group_id"].as_str().unwrap()))
        .collect();
    assert_eq!(groups["doc-5"], "doc-4");
    assert_eq!(groups["doc-10"], "doc-9");
    assert_eq!(groups["doc-7"], "doc-7");
    assert!(records.iter().all(|r| r["date"].is_string()));
}

#[tokio::test]
async fn test_day_by_day_run_across_days() {
    let mut index = JsonlIndex::from_reader(create_corpus(30, 5).as_bytes(), FieldNames::default())
        .unwrap();
    let runner = GroupingRunner::new(
        SimplePreprocessor::new(),
        engine(Arc::new(MemoryStore::new())),
        RunConfig {
            from_date: Some("2024-05-01".parse().unwrap()),
            to_date: Some("2024-05-03".parse().unwrap()),
            workers: 1,
            ..Default::default()
        },
    )
    .unwrap();

    let stats = runner.run(&mut index).await.unwrap();
    assert_eq!(stats.windows, 2);
    // Days 1 and 2 only; day 3 stays pending.
    assert_eq!(stats.total, 20);
    assert_eq!(index.count(None).await.unwrap(), 10);

    // doc-10 (day 2) joins the group doc-9 founded on day 1.
    let doc10 = index.annotation("doc-10").unwrap();
    assert_eq!(doc10.group_id, "doc-9");
    assert!(doc10.is_duplicate);
}

#[tokio::test]
async fn test_state_survives_across_runners_when_kept() {
    let store = Arc::new(MemoryStore::new());
    let config = ClusterConfig::default();

    let first = StreamClustering::new(MinHashLsh::from_config(&config).unwrap(), Arc::clone(&store));
    assert_eq!(first.find_group("a", &["shared", "text"]).await.unwrap(), "a");
    drop(first);

    let second =
        StreamClustering::new(MinHashLsh::from_config(&config).unwrap(), Arc::clone(&store));
    assert_eq!(second.find_group("b", &["shared", "text"]).await.unwrap(), "a");

    second.reset().await.unwrap();
    assert_eq!(store.len(HASH2DOC).await, 0);
    assert_eq!(store.get(DOC2SIM, "b").await.unwrap(), None);
}

#[tokio::test]
async fn test_different_seeds_do_not_share_buckets() {
    let store = Arc::new(MemoryStore::new());
    let seeded = |seed| {
        let config = ClusterConfig {
            seed,
            ..Default::default()
        };
        StreamClustering::new(MinHashLsh::from_config(&config).unwrap(), Arc::clone(&store))
    };

    let a = seeded(1);
    let b = seeded(2);
    assert_eq!(a.find_group("a", &["same", "words"]).await.unwrap(), "a");
    assert_eq!(b.find_group("b", &["same", "words"]).await.unwrap(), "b");
}
