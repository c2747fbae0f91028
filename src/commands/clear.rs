use anyhow::Result;

use super::open_index;

/// Drop the index for the current directory, in memory and on disk.
pub async fn run() -> Result<()> {
    let index = open_index()?;
    index.clear().await?;
    println!("Cleared index for {}", index.root().display());
    Ok(())
}
