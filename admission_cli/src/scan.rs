//! Turns filesystem paths into file descriptors

use admission_core::FileDescriptor;
use anyhow::{Context, Result};
use futures_util::stream::{self, StreamExt, TryStreamExt};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

const METADATA_CONCURRENCY: usize = 16;

/// Name, length and a MIME type guessed from the extension, unless the caller
/// supplies one. The descriptor name is the final path component only.
pub async fn describe_file(path: &Path, mime_override: Option<&str>) -> Result<FileDescriptor> {
    let metadata = fs::metadata(path)
        .await
        .with_context(|| format!("Failed to read metadata for {}", path.display()))?;

    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let reported_mime_type = match mime_override {
        Some(mime) => Some(mime.to_string()),
        None => mime_guess::from_path(path).first_raw().map(str::to_string),
    };

    Ok(FileDescriptor {
        name,
        size: metadata.len(),
        reported_mime_type,
    })
}

/// Descriptors in the same order as `paths`.
pub async fn describe_all(paths: &[PathBuf], mime_override: Option<&str>) -> Result<Vec<FileDescriptor>> {
    stream::iter(paths)
        .map(|path| describe_file(path, mime_override))
        .buffered(METADATA_CONCURRENCY)
        .try_collect()
        .await
}

/// Every non-directory entry below `root`, sorted. Symlinked directories are
/// followed, each real directory is scanned once, and broken links are skipped.
pub async fn collect_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut visited = HashSet::new();
    visited.insert(canonical_dir(root).await?);

    let mut pending = vec![root.to_path_buf()];
    let mut files = Vec::new();

    while let Some(dir) = pending.pop() {
        let mut entries = fs::read_dir(&dir)
            .await
            .with_context(|| format!("Failed to read directory {}", dir.display()))?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let file_type = entry.file_type().await?;

            let is_dir = if file_type.is_symlink() {
                match fs::metadata(&path).await {
                    Ok(target) => target.is_dir(),
                    Err(err) => {
                        warn!(path = %path.display(), error = %err, "Skipping broken symlink");
                        continue;
                    }
                }
            } else {
                file_type.is_dir()
            };

            if !is_dir {
                files.push(path);
            } else if visited.insert(canonical_dir(&path).await?) {
                pending.push(path);
            } else {
                debug!(path = %path.display(), "Directory already scanned");
            }
        }
    }

    files.sort();
    Ok(files)
}

async fn canonical_dir(path: &Path) -> Result<PathBuf> {
    fs::canonicalize(path)
        .await
        .with_context(|| format!("Failed to resolve {}", path.display()))
}
