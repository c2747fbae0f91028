use std::sync::Arc;
use std::time::Duration;

use codeindex::embeddings::MockEmbedder;
use codeindex::graph::{CycleSeverity, CycleType};
use codeindex::index::{progress_channel, BuildPhase, ProcessingStage};
use codeindex::symbol::{SymbolKind, SymbolQuery, UsageKind, UsageScope};
use codeindex::{BuildOptions, IndexError};

use crate::helpers::test_harness::{mock_embedder, slow_embedder, TestHarness, DIMENSION};

#[tokio::test]
async fn test_cyclic_project_analysis() {
    let harness = TestHarness::with_cyclic_project().unwrap();
    let index = harness.index_with(mock_embedder()).unwrap();

    let stats = index.build(BuildOptions::default()).await.unwrap();
    assert_eq!(stats.files_indexed, 3);
    assert_eq!(stats.files_skipped, 0);

    let analysis = index.analyze_dependencies(&[]).unwrap();
    assert_eq!(analysis.entry_points, vec!["c.ts"]);
    assert_eq!(analysis.unreachable, vec!["a.ts", "b.ts"]);
    assert_eq!(analysis.cycles.len(), 1);
    let cycle = &analysis.cycles[0];
    assert_eq!(cycle.files, vec!["a.ts", "b.ts"]);
    assert_eq!(cycle.severity, CycleSeverity::Error);
    assert_eq!(cycle.cycle_type, CycleType::Direct);
    assert_eq!(analysis.statistics.total_files, 3);
    assert_eq!(analysis.statistics.total_dependencies, 2);
    assert_eq!(analysis.statistics.circular_dependency_count, 1);

    // explicit entries override inference
    let unreachable = index.find_unreachable(&["a.ts".to_string()]).unwrap();
    assert_eq!(unreachable, vec!["c.ts"]);
}

#[tokio::test]
async fn test_mixed_language_project() {
    let harness = TestHarness::new().unwrap();
    harness
        .create_test_file(
            "src/index.ts",
            "import { UserService } from './services/user';\nimport express from 'express';\n\nconst service = new UserService();\nexport default service;\n",
        )
        .unwrap();
    harness
        .create_test_file(
            "src/services/user.ts",
            "import { db } from '../db';\nimport { db as database } from '../db';\n\nexport class UserService {\n  findUser(id: string) {\n    return db.get(id);\n  }\n}\n",
        )
        .unwrap();
    harness
        .create_test_file("src/db.ts", "export const db = new Map<string, string>();\n")
        .unwrap();
    harness
        .create_test_file(
            "tools/report.py",
            "from .missing import thing\n\nclass Report:\n    def render(self):\n        return ''\n\ndef build_report():\n    return Report()\n",
        )
        .unwrap();
    harness
        .create_test_file("native/lib.rs", "pub struct Engine;\n\npub fn start_engine() -> Engine {\n    Engine\n}\n")
        .unwrap();
    harness.create_test_file("README.md", "# not source\n").unwrap();

    let index = harness.index().unwrap();
    index.build(BuildOptions::default()).await.unwrap();

    let classes = index
        .search_symbols(&SymbolQuery::new("e").exact().kinds([SymbolKind::Class]))
        .unwrap();
    let class_names: Vec<&str> = classes.iter().map(|r| r.symbol.name.as_str()).collect();
    assert!(class_names.contains(&"UserService"));
    assert!(class_names.contains(&"Report"));

    let fuzzy = index.search_symbols(&SymbolQuery::new("startEngine")).unwrap();
    assert!(!fuzzy.is_empty());
    assert_eq!(fuzzy[0].symbol.name, "start_engine");
    assert_eq!(fuzzy[0].symbol.file_path, "native/lib.rs");

    let in_tools = index
        .search_symbols(&SymbolQuery::new("report").exact().in_files("tools/**"))
        .unwrap();
    assert!(in_tools.iter().all(|r| r.symbol.file_path == "tools/report.py"));
    assert!(!in_tools.is_empty());

    assert_eq!(index.dependencies("src/index.ts").unwrap(), vec!["src/services/user.ts"]);
    assert_eq!(index.dependents("src/db.ts").unwrap(), vec!["src/services/user.ts"]);

    let module = index.module_analysis("src/services/user.ts").unwrap().unwrap();
    assert_eq!(module.internal_dependencies, vec!["src/db.ts"]);
    assert_eq!(module.duplicate_imports, vec!["../db"]);
    assert!(module.circular_dependencies.is_empty());

    let entry = index.module_analysis("src/index.ts").unwrap().unwrap();
    assert_eq!(entry.external_dependencies, vec!["express"]);

    let report = index.module_analysis("tools/report.py").unwrap().unwrap();
    assert_eq!(report.missing_imports.len(), 1);

    let export = index.graph_export().unwrap();
    assert_eq!(export.nodes.len(), 5);
    assert_eq!(export.edges.len(), 2);
    assert!(index.module_analysis("README.md").unwrap().is_none());
}

#[tokio::test]
async fn test_usages_and_cross_references() {
    let harness = TestHarness::with_cyclic_project().unwrap();
    let index = harness.index().unwrap();
    index.build(BuildOptions::default()).await.unwrap();

    let usages = index.find_usages("formatDate", UsageScope::DefiningFiles).unwrap();
    // b.ts defines formatDate as an import binding
    assert!(usages.iter().any(|u| u.file_path == "a.ts" && u.kind == UsageKind::Definition));
    assert!(usages.iter().any(|u| u.file_path == "b.ts" && u.kind == UsageKind::Import));
    assert!(usages.iter().any(|u| u.file_path == "b.ts" && u.kind == UsageKind::Call));

    let xref = index.cross_references("parseUser").unwrap().unwrap();
    assert_eq!(xref.imported_by, vec!["a.ts"]);
    assert!(xref.definition_files.contains(&"b.ts".to_string()));
    assert!(index.cross_references("doesNotExist").unwrap().is_none());
}

#[tokio::test]
async fn test_semantic_search_ranks_by_similarity() {
    let harness = TestHarness::with_cyclic_project().unwrap();
    let index = harness.index_with(mock_embedder()).unwrap();
    let stats = index.build(BuildOptions::default()).await.unwrap();
    assert_eq!(stats.embeddings_generated, stats.total_symbols);
    assert_eq!(stats.embeddings_failed, 0);

    let results = index.search("format date string", 5).await.unwrap();
    assert!(!results.is_empty());
    assert_eq!(results[0].symbol.name, "formatDate");
    assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    assert!(results.iter().all(|r| r.score >= 0.3));
    assert!(results[0].explanation.contains("\"formatDate\""));

    assert!(index.search("   ", 5).await.unwrap().is_empty());
    assert!(index.search("format date", 0).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_query_embedding_times_out() {
    let mut harness = TestHarness::with_cyclic_project().unwrap();
    harness.config.embeddings.query_timeout_ms = 50;
    let index = harness.index_with(slow_embedder(Duration::from_millis(300))).unwrap();
    index.build(BuildOptions::default()).await.unwrap();

    let err = index.search("format date", 5).await.unwrap_err();
    assert!(matches!(err, IndexError::Timeout(_)));
    // the index itself is unaffected
    assert!(index.search_symbols(&SymbolQuery::new("formatDate")).is_ok());
}

#[tokio::test]
async fn test_failed_embeddings_are_reported_per_symbol() {
    let harness = TestHarness::with_cyclic_project().unwrap();
    let embedder = Arc::new(MockEmbedder::new(DIMENSION).failing_on("RETRY_LIMIT"));
    let index = harness.index_with(embedder).unwrap();

    let stats = index.build(BuildOptions::default()).await.unwrap();
    assert_eq!(stats.embeddings_failed, 1);
    assert_eq!(stats.embeddings_generated, stats.total_symbols - 1);

    let report = index.last_error_report();
    assert_eq!(report.total_errors, 1);
    assert!(report.by_stage.contains_key(&ProcessingStage::Embedding));

    // the symbol is still indexed, only its embedding is missing
    let found = index
        .search_symbols(&SymbolQuery::new("RETRY_LIMIT").exact())
        .unwrap();
    assert_eq!(found.len(), 1);
}

#[tokio::test]
async fn test_unparseable_files_are_skipped() {
    let harness = TestHarness::with_cyclic_project().unwrap();
    std::fs::write(harness.path().join("broken.ts"), [0xff, 0xfe, 0x00, 0x41]).unwrap();
    let index = harness.index().unwrap();

    let stats = index.build(BuildOptions::default()).await.unwrap();
    assert_eq!(stats.files_skipped, 1);
    assert_eq!(stats.files_indexed, 3);
    let report = index.last_error_report();
    assert!(report.by_stage.contains_key(&ProcessingStage::Read));
}

#[tokio::test]
async fn test_progress_events_end_with_complete() {
    let harness = TestHarness::with_cyclic_project().unwrap();
    let index = harness.index_with(mock_embedder()).unwrap();
    let (sender, mut receiver) = progress_channel();

    index
        .build(BuildOptions::default().with_progress(sender))
        .await
        .unwrap();

    let mut phases = Vec::new();
    while let Some(event) = receiver.recv().await {
        phases.push(event.phase);
    }
    assert_eq!(phases.first(), Some(&BuildPhase::Scanning));
    assert_eq!(phases.last(), Some(&BuildPhase::Complete));
    assert!(phases.contains(&BuildPhase::Parsing));
    assert!(phases.contains(&BuildPhase::Embedding));
}
