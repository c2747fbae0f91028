use anyhow::Result;

use super::{ensure_fresh, open_index};
use crate::symbol::{SymbolKind, SymbolQuery};

/// Options of the symbols command, as parsed from the command line.
#[derive(Debug, Clone, Default)]
pub struct SymbolsArgs {
    pub query: String,
    pub kinds: Vec<SymbolKind>,
    pub exact: bool,
    pub case_sensitive: bool,
    pub file: Option<String>,
    pub limit: Option<usize>,
}

pub async fn run(args: SymbolsArgs) -> Result<()> {
    let index = ensure_fresh(open_index()?).await?;
    let defaults = &index.config().symbols;

    let mut query = SymbolQuery::new(args.query.as_str())
        .kinds(args.kinds)
        .fuzzy(defaults.fuzzy && !args.exact)
        .case_sensitive(defaults.case_sensitive || args.case_sensitive)
        .limit(args.limit.unwrap_or(defaults.default_limit));
    if let Some(glob) = args.file {
        query = query.in_files(glob);
    }

    let results = index.search_symbols(&query)?;
    if results.is_empty() {
        println!("No symbols match \"{}\"", args.query);
        return Ok(());
    }

    for ranked in &results {
        let symbol = &ranked.symbol;
        println!(
            "{:<9} {:<32} {}:{}  ({:.2})",
            symbol.kind.as_str(),
            symbol.name,
            symbol.file_path,
            symbol.start_line,
            ranked.score
        );
        if let Some(signature) = &symbol.signature {
            println!("          {}", signature);
        }
    }

    Ok(())
}
