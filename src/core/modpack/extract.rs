use std::path::{Component, Path};

use tracing::debug;

use crate::core::error::{LauncherError, LauncherResult};

/// Extract `archive` into `dest`, overwriting existing files.
///
/// Entries that would land outside `dest` abort the extraction.
/// Returns the number of files written.
pub async fn extract_archive(archive: &Path, dest: &Path) -> LauncherResult<usize> {
    let archive = archive.to_path_buf();
    let dest = dest.to_path_buf();
    tokio::task::spawn_blocking(move || extract_blocking(&archive, &dest))
        .await
        .map_err(|e| LauncherError::Other(format!("Task join error: {e}")))?
}

fn extract_blocking(archive_path: &Path, dest: &Path) -> LauncherResult<usize> {
    let file =
        std::fs::File::open(archive_path).map_err(|e| LauncherError::io(archive_path, e))?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut written = 0;

    for index in 0..archive.len() {
        let mut zipped = archive.by_index(index)?;
        let out_path = match zipped.enclosed_name() {
            Some(relative) if !escapes(&relative) => dest.join(relative),
            _ => {
                return Err(LauncherError::Other(format!(
                    "Archive entry escapes target directory: {}",
                    zipped.name()
                )))
            }
        };

        if zipped.is_dir() {
            std::fs::create_dir_all(&out_path).map_err(|e| LauncherError::io(&out_path, e))?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LauncherError::io(parent, e))?;
        }
        let mut out =
            std::fs::File::create(&out_path).map_err(|e| LauncherError::io(&out_path, e))?;
        std::io::copy(&mut zipped, &mut out).map_err(|e| LauncherError::io(&out_path, e))?;
        written += 1;
    }

    debug!("Extracted {} files from {:?}", written, archive_path);
    Ok(written)
}

fn escapes(relative: &Path) -> bool {
    relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
}
