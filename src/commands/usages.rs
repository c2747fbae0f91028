use anyhow::Result;

use super::{ensure_fresh, open_index};
use crate::symbol::UsageScope;

/// Run the usages command.
///
/// With `xref`, prints which files define, use, import and export `name`.
pub async fn run(name: &str, all_files: bool, xref: bool) -> Result<()> {
    let index = ensure_fresh(open_index()?).await?;

    if xref {
        let Some(xref) = index.cross_references(name)? else {
            println!("No symbol named \"{}\"", name);
            return Ok(());
        };
        print_files("Defined in", &xref.definition_files);
        print_files("Used in", &xref.usage_files);
        print_files("Imported by", &xref.imported_by);
        print_files("Exported from", &xref.exported_from);
        return Ok(());
    }

    let scope = if all_files {
        UsageScope::AllIndexedFiles
    } else {
        UsageScope::DefiningFiles
    };
    let usages = index.find_usages(name, scope)?;
    if usages.is_empty() {
        println!("No usages of \"{}\"", name);
        return Ok(());
    }

    println!("{} usages of \"{}\":\n", usages.len(), name);
    for usage in &usages {
        println!(
            "{}:{}:{}  [{:?}]  {}",
            usage.file_path, usage.line, usage.column, usage.kind, usage.line_text
        );
    }
    Ok(())
}

fn print_files(label: &str, files: &[String]) {
    println!("{} ({}):", label, files.len());
    for file in files {
        println!("  {}", file);
    }
}
