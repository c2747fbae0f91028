pub mod cli;
pub mod commands;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod graph;
pub mod index;
pub mod logging;
pub mod metrics;
pub mod parser;
pub mod semantic;
pub mod snapshot;
pub mod symbol;

pub use config::Config;
pub use error::{IndexError, Result};
pub use index::{BuildOptions, CodeIndex, IndexPhase, IndexStats, SearchResult};
