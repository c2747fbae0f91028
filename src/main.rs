use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use codeindex::cli::{Cli, Commands};
use codeindex::commands::symbols::SymbolsArgs;
use codeindex::config::Config;
use codeindex::logging::{init_early_logging, init_logging};
use codeindex::metrics;

#[tokio::main]
async fn main() -> Result<()> {
    let project_root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    // A malformed config file is reported by the command itself.
    let config = Config::load(&project_root).unwrap_or_default();

    // The guard must live until exit so buffered log lines are flushed
    let _logging_guard = match init_logging(&config.logging, &project_root) {
        Ok(guard) => Some(guard),
        Err(e) => {
            init_early_logging();
            tracing::warn!("File logging unavailable: {:#}", e);
            None
        }
    };

    tracing::debug!("Project root: {}", project_root.display());

    metrics::register_metrics();

    let cli = Cli::parse();

    match cli.command {
        Commands::Index { force } => {
            codeindex::commands::index::run(force).await?;
        }
        Commands::Search { query, limit } => {
            codeindex::commands::search::run(&query, limit).await?;
        }
        Commands::Symbols {
            query,
            kinds,
            exact,
            case_sensitive,
            file,
            limit,
        } => {
            codeindex::commands::symbols::run(SymbolsArgs {
                query,
                kinds,
                exact,
                case_sensitive,
                file,
                limit,
            })
            .await?;
        }
        Commands::Usages { name, all_files, xref } => {
            codeindex::commands::usages::run(&name, all_files, xref).await?;
        }
        Commands::Deps {
            entries,
            graph,
            module,
        } => {
            codeindex::commands::deps::run(&entries, graph, module.as_deref()).await?;
        }
        Commands::Status { prometheus } => {
            codeindex::commands::status::run(prometheus).await?;
        }
        Commands::Clear => {
            codeindex::commands::clear::run().await?;
        }
    }

    Ok(())
}
