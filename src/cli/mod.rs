use clap::{Parser, Subcommand};

use crate::symbol::SymbolKind;

#[derive(Parser)]
#[command(name = "codeindex")]
#[command(author, version, about = "Incremental codebase index: symbols, dependencies and semantic search")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Index or refresh the codebase in the current directory
    Index {
        /// Rebuild from scratch instead of applying changes since the last run
        #[arg(short, long)]
        force: bool,
    },

    /// Semantic search over indexed symbols
    Search {
        /// Search query
        query: String,

        /// Maximum number of results to return
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Look up symbols by name
    Symbols {
        /// Name or fragment to look for
        query: String,

        /// Restrict to these kinds (function, class, interface, variable, import, method, property)
        #[arg(short, long = "kind", value_parser = parse_kind)]
        kinds: Vec<SymbolKind>,

        /// Substring match instead of fuzzy ranking
        #[arg(long)]
        exact: bool,

        #[arg(long)]
        case_sensitive: bool,

        /// Only symbols whose file path matches this glob
        #[arg(long)]
        file: Option<String>,

        /// Maximum number of results to return
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Find where a symbol is used
    Usages {
        /// Symbol name
        name: String,

        /// Scan every indexed file, not just the files defining the symbol
        #[arg(long)]
        all_files: bool,

        /// Print a cross-reference summary instead of individual usages
        #[arg(long)]
        xref: bool,
    },

    /// Analyze the file dependency graph
    Deps {
        /// Entry point files (inferred when omitted)
        #[arg(short, long = "entry")]
        entries: Vec<String>,

        /// Print the whole graph as JSON
        #[arg(long, conflicts_with = "module")]
        graph: bool,

        /// Analyze a single file's imports
        #[arg(long)]
        module: Option<String>,
    },

    /// Show index status and metrics
    Status {
        /// Output in Prometheus format
        #[arg(long)]
        prometheus: bool,
    },

    /// Remove the persisted index
    Clear,
}

fn parse_kind(s: &str) -> Result<SymbolKind, String> {
    SymbolKind::parse(s).ok_or_else(|| format!("unknown symbol kind '{}'", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbols_arguments() {
        let cli = Cli::parse_from([
            "codeindex", "symbols", "getUser", "--kind", "function", "-k", "method", "--exact", "--file", "src/**",
        ]);
        match cli.command {
            Commands::Symbols {
                query,
                kinds,
                exact,
                file,
                ..
            } => {
                assert_eq!(query, "getUser");
                assert_eq!(kinds, vec![SymbolKind::Function, SymbolKind::Method]);
                assert!(exact);
                assert_eq!(file.as_deref(), Some("src/**"));
            }
            _ => panic!("expected symbols command"),
        }
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        assert!(Cli::try_parse_from(["codeindex", "symbols", "x", "--kind", "macro"]).is_err());
    }

    #[test]
    fn test_graph_and_module_conflict() {
        assert!(Cli::try_parse_from(["codeindex", "deps", "--graph", "--module", "a.ts"]).is_err());
    }
}
