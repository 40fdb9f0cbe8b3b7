use crate::error::{PlungerError, Result};
use log::info;
use std::path::Path;

/// Overwrite `path` with one link per line, no trailing newline.
///
/// The write is not atomic: a crash part way through can leave a truncated file.
pub async fn save(path: impl AsRef<Path>, links: &[String]) -> Result<()> {
    let path = path.as_ref();
    tokio::fs::write(path, links.join("\n"))
        .await
        .map_err(|e| PlungerError::io(path, e))?;

    info!("Saved {} links to {}", links.len(), path.display());
    Ok(())
}
