use std::path::PathBuf;

use codeindex::symbol::SymbolQuery;
use codeindex::{BuildOptions, IndexError};

use crate::helpers::test_harness::{mock_embedder, TestHarness};

fn names(index: &codeindex::CodeIndex, file: &str) -> Vec<String> {
    let mut names: Vec<String> = index
        .symbols_in_file(file)
        .unwrap()
        .into_iter()
        .map(|s| s.name)
        .collect();
    names.sort();
    names
}

fn symbol_names(index: &codeindex::CodeIndex, text: &str) -> Vec<String> {
    index
        .search_symbols(&SymbolQuery::new(text).exact())
        .unwrap()
        .into_iter()
        .map(|r| format!("{}@{}", r.symbol.name, r.symbol.file_path))
        .collect()
}

#[tokio::test]
async fn test_modified_file_replaces_only_its_symbols() {
    let harness = TestHarness::with_cyclic_project().unwrap();
    let index = harness.index_with(mock_embedder()).unwrap();
    let first = index.build(BuildOptions::default()).await.unwrap();

    harness
        .create_test_file(
            "c.ts",
            "export const RETRY_LIMIT = 5;\nexport function retryDelay(attempt: number) {\n  return attempt * 100;\n}\n",
        )
        .unwrap();

    let stats = index.refresh().await.unwrap();
    assert!(stats.incremental);
    assert_eq!(stats.changes.modified, 1);
    assert_eq!(stats.changes.added, 0);
    assert_eq!(stats.changes.unchanged, 2);
    // only c.ts was re-embedded
    assert_eq!(stats.embeddings_generated, 2);
    assert_eq!(stats.total_symbols, first.total_symbols + 1);

    assert_eq!(symbol_names(&index, "retryDelay"), vec!["retryDelay@c.ts"]);
    assert_eq!(symbol_names(&index, "formatDate").len(), 2);

    let results = index.search("retry delay attempt", 3).await.unwrap();
    assert_eq!(results[0].symbol.name, "retryDelay");
}

#[tokio::test]
async fn test_deleted_file_leaves_symbols_and_graph() {
    let harness = TestHarness::with_cyclic_project().unwrap();
    let index = harness.index_with(mock_embedder()).unwrap();
    index.build(BuildOptions::default()).await.unwrap();
    assert!(!symbol_names(&index, "parseUser").is_empty());

    harness.remove_test_file("b.ts").unwrap();
    let stats = index.refresh().await.unwrap();
    assert_eq!(stats.changes.deleted, 1);
    assert_eq!(stats.files_indexed, 2);

    // a.ts still imports parseUser, but nothing defines it in b.ts anymore
    assert!(symbol_names(&index, "parseUser")
        .iter()
        .all(|s| !s.ends_with("@b.ts")));
    assert!(index.dependencies("a.ts").unwrap().is_empty());
    assert!(index.dependents("a.ts").unwrap().is_empty());
    assert!(index.find_cycles().unwrap().is_empty());

    let module = index.module_analysis("a.ts").unwrap().unwrap();
    assert_eq!(module.missing_imports, vec!["./b"]);
}

#[tokio::test]
async fn test_added_file_resolves_pending_import() {
    let harness = TestHarness::new().unwrap();
    harness
        .create_test_file("app.ts", "import { config } from './config';\nexport const app = config;\n")
        .unwrap();
    let index = harness.index().unwrap();
    index.build(BuildOptions::default()).await.unwrap();
    assert!(index.dependencies("app.ts").unwrap().is_empty());

    harness
        .create_test_file("config.ts", "export const config = { port: 8080 };\n")
        .unwrap();
    let stats = index.refresh().await.unwrap();
    assert_eq!(stats.changes.added, 1);
    assert_eq!(stats.changes.modified, 0);

    // app.ts did not change but its import now resolves
    assert_eq!(index.dependencies("app.ts").unwrap(), vec!["config.ts"]);
    assert_eq!(index.dependents("config.ts").unwrap(), vec!["app.ts"]);
}

#[tokio::test]
async fn test_update_incremental_with_explicit_paths() {
    let harness = TestHarness::with_cyclic_project().unwrap();
    let index = harness.index().unwrap();
    index.build(BuildOptions::default()).await.unwrap();

    let new_file = harness
        .create_test_file("lib/d.ts", "import { RETRY_LIMIT } from '../c';\nexport const doubled = RETRY_LIMIT * 2;\n")
        .unwrap();
    harness.remove_test_file("a.ts").unwrap();

    let stats = index
        .update_incremental(&[new_file, PathBuf::from("a.ts")])
        .await
        .unwrap();
    assert_eq!(stats.changes.added, 1);
    assert_eq!(stats.changes.deleted, 1);
    assert!(stats.incremental);

    assert_eq!(names(&index, "lib/d.ts"), vec!["RETRY_LIMIT", "doubled"]);
    assert!(names(&index, "a.ts").is_empty());
    assert_eq!(index.dependents("c.ts").unwrap(), vec!["lib/d.ts"]);
    assert_eq!(index.snapshot_stats().file_count, 3);
}

#[tokio::test]
async fn test_update_incremental_skips_ignored_files() {
    let harness = TestHarness::new().unwrap();
    harness.create_test_file(".ignore", "generated/\n").unwrap();
    harness.create_test_file("a.ts", "export const a = 1;\n").unwrap();
    let index = harness.index().unwrap();
    let first = index.build(BuildOptions::default()).await.unwrap();
    assert_eq!(first.files_indexed, 1);

    let generated = harness
        .create_test_file("generated/g.ts", "export const g = 2;\n")
        .unwrap();
    let stats = index.update_incremental(&[generated]).await.unwrap();
    assert_eq!(stats.changes.added, 0);
    assert_eq!(stats.files_indexed, 1);
    assert!(names(&index, "generated/g.ts").is_empty());

    // a full capture agrees, so nothing flips back
    let stats = index.refresh().await.unwrap();
    assert_eq!(stats.changes.deleted, 0);
    assert_eq!(stats.changes.added, 0);
    assert_eq!(stats.files_indexed, 1);
}

#[tokio::test]
async fn test_update_incremental_requires_a_built_index() {
    let harness = TestHarness::with_cyclic_project().unwrap();
    let index = harness.index().unwrap();
    let err = index
        .update_incremental(&[PathBuf::from("a.ts")])
        .await
        .unwrap_err();
    assert!(matches!(err, IndexError::QueryBeforeReady { .. }));
}

#[tokio::test]
async fn test_force_rebuild_is_not_incremental() {
    let harness = TestHarness::with_cyclic_project().unwrap();
    let index = harness.index().unwrap();
    index.build(BuildOptions::default()).await.unwrap();

    let stats = index.build(BuildOptions::force()).await.unwrap();
    assert!(!stats.incremental);
    assert_eq!(stats.changes.added, 3);
    assert_eq!(stats.files_indexed, 3);
}
