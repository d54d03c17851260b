//! File replacement helpers

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{CoreError, Result};

/// Replace `path` with `contents` in one step.
///
/// The data is written to a temporary file in the same directory and renamed
/// over the target, so readers see either the old or the new file.
pub async fn replace_file(path: impl AsRef<Path>, contents: impl Into<Vec<u8>>) -> Result<()> {
    let path = path.as_ref().to_path_buf();
    let contents = contents.into();

    tokio::task::spawn_blocking(move || replace_file_blocking(&path, &contents))
        .await
        .map_err(|e| CoreError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?
}

fn replace_file_blocking(path: &PathBuf, contents: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;

    debug!("Replaced {:?} ({} bytes)", path, contents.len());
    Ok(())
}

/// Check whether a path exists without following into an error
pub async fn exists(path: impl AsRef<Path>) -> bool {
    tokio::fs::try_exists(path.as_ref()).await.unwrap_or(false)
}
