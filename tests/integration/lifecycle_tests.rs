use std::sync::Arc;
use std::time::Duration;

use codeindex::symbol::SymbolQuery;
use codeindex::{BuildOptions, CodeIndex, IndexError, IndexPhase};
use tokio_util::sync::CancellationToken;

use crate::helpers::test_harness::{mock_embedder, slow_embedder, TestHarness};

#[tokio::test]
async fn test_phase_transitions() {
    let harness = TestHarness::with_cyclic_project().unwrap();
    let index = harness.index_with(mock_embedder()).unwrap();
    let mut phases = index.subscribe_phase();
    assert_eq!(*phases.borrow(), IndexPhase::Empty);

    index.build(BuildOptions::default()).await.unwrap();
    assert!(phases.has_changed().unwrap());
    assert_eq!(*phases.borrow_and_update(), IndexPhase::Ready);

    index.clear().await.unwrap();
    assert_eq!(index.phase(), IndexPhase::Cleared);
    assert_eq!(index.stats().total_symbols, 0);
    assert!(!index.snapshot_stats().exists);
    assert!(matches!(
        index.search_symbols(&SymbolQuery::new("formatDate")),
        Err(IndexError::QueryBeforeReady { .. })
    ));

    // a build after clear starts over
    let stats = index.build(BuildOptions::default()).await.unwrap();
    assert!(!stats.incremental);
    assert_eq!(index.phase(), IndexPhase::Ready);
}

#[tokio::test]
async fn test_first_build_rejects_queries() {
    let harness = TestHarness::with_cyclic_project().unwrap();
    let index = Arc::new(harness.index_with(slow_embedder(Duration::from_millis(300))).unwrap());
    let mut phases = index.subscribe_phase();

    let builder = index.clone();
    let build = tokio::spawn(async move { builder.build(BuildOptions::default()).await });

    phases
        .wait_for(|p| *p == IndexPhase::Indexing { incremental: false })
        .await
        .unwrap();
    let err = index.dependencies("a.ts").unwrap_err();
    assert!(matches!(
        err,
        IndexError::QueryBeforeReady {
            phase: IndexPhase::Indexing { incremental: false },
            ..
        }
    ));

    build.await.unwrap().unwrap();
    assert_eq!(index.dependencies("a.ts").unwrap(), vec!["b.ts"]);
}

#[tokio::test]
async fn test_queries_served_from_published_state_during_rebuild() {
    let harness = TestHarness::with_cyclic_project().unwrap();
    let index = Arc::new(harness.index_with(slow_embedder(Duration::from_millis(300))).unwrap());
    index.build(BuildOptions::default()).await.unwrap();

    harness
        .create_test_file("c.ts", "import { formatDate } from './a';\nexport const RETRY_LIMIT = 3;\n")
        .unwrap();

    let mut phases = index.subscribe_phase();
    let builder = index.clone();
    let refresh = tokio::spawn(async move { builder.refresh().await });

    phases
        .wait_for(|p| *p == IndexPhase::Indexing { incremental: true })
        .await
        .unwrap();
    // the old graph is still published
    assert!(index.dependencies("c.ts").unwrap().is_empty());
    assert_eq!(index.find_cycles().unwrap().len(), 1);

    let stats = refresh.await.unwrap().unwrap();
    assert_eq!(stats.changes.modified, 1);
    assert_eq!(index.dependencies("c.ts").unwrap(), vec!["a.ts"]);
    assert_eq!(index.dependents("a.ts").unwrap(), vec!["b.ts", "c.ts"]);
}

#[tokio::test]
async fn test_cancelled_rebuild_keeps_previous_state() {
    let harness = TestHarness::with_cyclic_project().unwrap();
    let mut config = harness.config.clone();
    config.embeddings.batch_size = 1;
    config.embeddings.max_concurrent_batches = 1;
    let index = Arc::new(
        CodeIndex::new(harness.path(), config)
            .unwrap()
            .with_embedding_provider(slow_embedder(Duration::from_millis(200))),
    );
    index.build(BuildOptions::default()).await.unwrap();
    let before = index.stats();

    harness
        .create_test_file("d.ts", "export function one() {}\nexport function two() {}\nexport function three() {}\n")
        .unwrap();

    let cancel = CancellationToken::new();
    let mut phases = index.subscribe_phase();
    let builder = index.clone();
    let options = BuildOptions::default().with_cancel(cancel.clone());
    let refresh = tokio::spawn(async move { builder.build(options).await });

    phases
        .wait_for(|p| matches!(p, IndexPhase::Indexing { .. }))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    cancel.cancel();

    let err = refresh.await.unwrap().unwrap_err();
    assert!(matches!(err, IndexError::Cancelled));
    assert_eq!(index.phase(), IndexPhase::Ready);
    assert_eq!(index.stats(), before);
    assert!(index.search_symbols(&SymbolQuery::new("three").exact()).unwrap().is_empty());

    // the next refresh picks the file up again
    let stats = index.refresh().await.unwrap();
    assert_eq!(stats.changes.added, 1);
}

#[tokio::test]
async fn test_memory_budget_evicts_symbols_with_embeddings() {
    let mut harness = TestHarness::new().unwrap();
    harness.config.embeddings.max_memory_mb = 1;

    let body = "  const value = 'lorem ipsum dolor sit amet consectetur adipiscing elit';\n".repeat(25);
    let source: String = (0..300)
        .map(|i| format!("export function handler{}() {{\n{}}}\n", i, body))
        .collect();
    harness.create_test_file("big.ts", &source).unwrap();

    let index = harness.index_with(mock_embedder()).unwrap();
    let stats = index.build(BuildOptions::default()).await.unwrap();

    assert!(stats.symbols_evicted > 0);
    assert_eq!(stats.total_symbols, 300 - stats.symbols_evicted);
    assert!(stats.memory_usage_mb <= 0.8);
    assert_eq!(stats.embeddings_generated, 300);

    // every surviving symbol still answers semantic queries
    let results = index.search("const value lorem ipsum dolor", 500).await.unwrap();
    assert_eq!(results.len(), stats.total_symbols);
}

#[tokio::test]
async fn test_persisted_index_survives_restart() {
    let harness = TestHarness::with_cyclic_project().unwrap();
    {
        let index = harness.index_with(mock_embedder()).unwrap();
        index.build(BuildOptions::default()).await.unwrap();
        index.save().await.unwrap();
    }

    let index = CodeIndex::open(harness.path(), harness.config.clone())
        .unwrap()
        .with_embedding_provider(mock_embedder());
    assert_eq!(index.phase(), IndexPhase::Ready);
    assert_eq!(index.find_cycles().unwrap().len(), 1);
    let results = index.search("format date string", 3).await.unwrap();
    assert_eq!(results[0].symbol.name, "formatDate");

    // the reopened index refreshes incrementally
    let stats = index.refresh().await.unwrap();
    assert!(stats.incremental);
    assert_eq!(stats.changes.unchanged, 3);
}

#[tokio::test]
async fn test_corrupt_persisted_index_starts_empty() {
    let harness = TestHarness::with_cyclic_project().unwrap();
    harness
        .create_test_file(".codeindex/index.json", "{ not json")
        .unwrap();

    let index = CodeIndex::open(harness.path(), harness.config.clone()).unwrap();
    assert_eq!(index.phase(), IndexPhase::Empty);
    index.build(BuildOptions::default()).await.unwrap();
    assert_eq!(index.stats().files_indexed, 3);
}
