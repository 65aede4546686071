//! Artifact collector: mirrors the files a verification run staged into
//! the host's output tree.
//!
//! - Regular files are copied, preserving relative structure
//! - Target directories are created on the first file copied into them
//! - Symbolic links are skipped, never followed
//! - A missing or non-directory source yields an empty set

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::CollectError;
use crate::pipeline::types::ArtifactSet;

/// Mirror `source` into `target` on the blocking pool.
pub async fn collect(source: PathBuf, target: PathBuf) -> Result<ArtifactSet, CollectError> {
    let joined = tokio::task::spawn_blocking({
        let source = source.clone();
        move || copy_tree(&source, &target)
    })
    .await;

    joined.unwrap_or_else(|e| {
        Err(CollectError {
            path: source,
            collected: Vec::new(),
            source: io::Error::other(e),
        })
    })
}

/// Recursively copy every regular file under `source` into `target`.
///
/// Returns the absolute destination paths in traversal order (entries are
/// visited sorted by file name). On failure the error carries whatever was
/// copied before it.
pub fn copy_tree(source: &Path, target: &Path) -> Result<ArtifactSet, CollectError> {
    let meta = match fs::symlink_metadata(source) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(source = %source.display(), "No verification artifacts to collect");
            return Ok(ArtifactSet::default());
        }
        Err(e) => return Err(fail(source, Vec::new(), e)),
    };
    if !meta.is_dir() {
        debug!(source = %source.display(), "Artifact source is not a directory");
        return Ok(ArtifactSet::default());
    }

    let target = std::path::absolute(target).map_err(|e| fail(target, Vec::new(), e))?;

    let mut collected = Vec::new();
    match mirror(source, &target, &mut collected) {
        Ok(()) => Ok(ArtifactSet::new(collected)),
        Err((path, e)) => Err(fail(&path, collected, e)),
    }
}

fn mirror(
    source: &Path,
    target: &Path,
    collected: &mut Vec<PathBuf>,
) -> Result<(), (PathBuf, io::Error)> {
    let mut entries = fs::read_dir(source)
        .map_err(at(source))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(at(source))?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        // DirEntry::file_type does not traverse symlinks.
        let file_type = entry.file_type().map_err(at(&path))?;
        let dest = target.join(entry.file_name());

        if file_type.is_symlink() {
            debug!(path = %path.display(), "Skipping symlink in staging directory");
        } else if file_type.is_dir() {
            mirror(&path, &dest, collected)?;
        } else if file_type.is_file() {
            fs::create_dir_all(target).map_err(at(target))?;
            fs::copy(&path, &dest).map_err(at(&dest))?;
            collected.push(dest);
        }
    }
    Ok(())
}

fn at(path: &Path) -> impl FnOnce(io::Error) -> (PathBuf, io::Error) {
    let path = path.to_path_buf();
    move |e| (path, e)
}

fn fail(path: &Path, collected: Vec<PathBuf>, source: io::Error) -> CollectError {
    CollectError {
        path: path.to_path_buf(),
        collected,
        source,
    }
}
