use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use codeindex::embeddings::{EmbeddingProvider, MockEmbedder};
use codeindex::{CodeIndex, Config};

pub const DIMENSION: usize = 128;

pub struct TestHarness {
    pub temp_dir: TempDir,
    pub config: Config,
}

impl TestHarness {
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let mut config = Config::default();
        config.indexer.parallel_threads = Some(2);
        config.embeddings.relevance_floor = 0.3;

        Ok(Self { temp_dir, config })
    }

    /// The a/b/c project: a.ts and b.ts import each other, c.ts imports
    /// nothing and nothing imports it.
    pub fn with_cyclic_project() -> Result<Self> {
        let harness = Self::new()?;
        harness.create_test_file(
            "a.ts",
            "import { parseUser } from './b';\n\nexport function formatDate(date: Date): string {\n  return date.toISOString();\n}\n",
        )?;
        harness.create_test_file(
            "b.ts",
            "import { formatDate } from './a';\n\nexport function parseUser(raw: string) {\n  return { name: raw, seen: formatDate(new Date()) };\n}\n",
        )?;
        harness.create_test_file("c.ts", "export const RETRY_LIMIT = 3;\n")?;
        Ok(harness)
    }

    pub fn create_test_file(&self, path: &str, content: &str) -> Result<PathBuf> {
        let file_path = self.temp_dir.path().join(path);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&file_path, content)?;
        Ok(file_path)
    }

    pub fn remove_test_file(&self, path: &str) -> Result<()> {
        std::fs::remove_file(self.temp_dir.path().join(path))?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn index(&self) -> Result<CodeIndex> {
        Ok(CodeIndex::new(self.path(), self.config.clone())?)
    }

    pub fn index_with(&self, provider: Arc<dyn EmbeddingProvider>) -> Result<CodeIndex> {
        Ok(self.index()?.with_embedding_provider(provider))
    }
}

pub fn mock_embedder() -> Arc<MockEmbedder> {
    Arc::new(MockEmbedder::new(DIMENSION))
}

/// Embedder that sleeps `delay` on every call.
pub fn slow_embedder(delay: Duration) -> Arc<MockEmbedder> {
    Arc::new(MockEmbedder::new(DIMENSION).with_delay(delay))
}
