use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};

/// Pick the result files to upload for a finished task.
///
/// A directory yields its regular files in ascending modification order,
/// capped at `max_files` (so the oldest files are kept). A single file is
/// always returned on its own, whatever the cap. Anything else yields nothing.
pub async fn harvest_result_files(results_path: &Path, max_files: usize) -> Vec<PathBuf> {
    debug!("Capturing files from [{}]", results_path.display());
    match collect(results_path, max_files).await {
        Ok(files) => files,
        Err(e) => {
            warn!(
                "Failed to collect result files from [{}]: {}",
                results_path.display(),
                e
            );
            Vec::new()
        }
    }
}

async fn collect(results_path: &Path, max_files: usize) -> std::io::Result<Vec<PathBuf>> {
    let meta = match tokio::fs::metadata(results_path).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    if meta.is_file() {
        return Ok(vec![results_path.to_path_buf()]);
    }
    if !meta.is_dir() {
        return Ok(Vec::new());
    }

    let mut files: Vec<(SystemTime, PathBuf)> = Vec::new();
    let mut entries = tokio::fs::read_dir(results_path).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        match file_mtime(&path).await {
            Ok(Some(mtime)) => files.push((mtime, path)),
            Ok(None) => {}
            Err(e) => warn!("Skipping result entry [{}]: {}", path.display(), e),
        }
    }

    files.sort_by(|a, b| a.0.cmp(&b.0));
    files.truncate(max_files);
    Ok(files.into_iter().map(|(_, path)| path).collect())
}

/// Modification time of a regular file; `None` for anything else.
async fn file_mtime(path: &Path) -> std::io::Result<Option<SystemTime>> {
    let meta = tokio::fs::metadata(path).await?;
    if !meta.is_file() {
        return Ok(None);
    }
    meta.modified().map(Some)
}
