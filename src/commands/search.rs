use anyhow::Result;

use super::{ensure_fresh, open_index, with_embeddings};

/// Run the search command
///
/// Refreshes a missing or stale index, then ranks symbols by embedding
/// similarity to `query`.
///
/// # Arguments
///
/// * `query` - The search query
/// * `limit` - Maximum number of results to return
pub async fn run(query: &str, limit: Option<usize>) -> Result<()> {
    let index = with_embeddings(open_index()?).await?;
    let index = ensure_fresh(index).await?;

    let limit = limit.unwrap_or(index.config().search.default_limit);
    let results = index.search(query, limit).await?;

    if results.is_empty() {
        println!("No results found for: {}", query);
        println!(
            "\nNothing scored above the relevance floor of {:.2}",
            index.config().embeddings.relevance_floor
        );
        return Ok(());
    }

    println!("Found {} results for: \"{}\"\n", results.len(), query);

    for (i, result) in results.iter().enumerate() {
        let symbol = &result.symbol;
        println!(
            "{}. {}:{}-{} {}",
            i + 1,
            symbol.file_path,
            symbol.start_line,
            symbol.end_line,
            result.explanation
        );
        println!("{}", format_preview(&symbol.content, 5));
        println!();
    }

    Ok(())
}

/// Format a preview of the content, limiting to max_lines
pub(crate) fn format_preview(content: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let preview_lines = if lines.len() > max_lines {
        let mut preview: Vec<&str> = lines.iter().take(max_lines).copied().collect();
        preview.push("   ...");
        preview
    } else {
        lines
    };

    preview_lines
        .iter()
        .map(|line| format!("   {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}
