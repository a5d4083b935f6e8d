//! File staging between stages.
//!
//! The stage file travels by exactly two moves: a rename inside a
//! stage's `output/` directory (`output.json` → `input.json`, the
//! producer's name becoming the consumer's) and a copy into the next
//! stage's `input/` directory. A missing source is fatal in both cases —
//! it means the producing step wrote nothing, and conjuring an empty
//! stage file would only defer the failure somewhere less diagnosable.

use crate::error::PipelineError;
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// Rename `from` to `to`, replacing any existing destination.
///
/// The destination is removed first so the rename also succeeds on
/// platforms where `rename` refuses to overwrite.
pub async fn rename(from: &Path, to: &Path) -> Result<(), PipelineError> {
    if !fs::try_exists(from).await.unwrap_or(false) {
        return Err(PipelineError::MissingSource {
            path: from.to_path_buf(),
        });
    }

    if fs::try_exists(to).await.unwrap_or(false) {
        fs::remove_file(to)
            .await
            .map_err(|source| PipelineError::RenameFailed {
                from: from.to_path_buf(),
                to: to.to_path_buf(),
                source,
            })?;
    }

    fs::rename(from, to)
        .await
        .map_err(|source| PipelineError::RenameFailed {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source,
        })?;

    debug!(from = %from.display(), to = %to.display(), "renamed");
    Ok(())
}

/// Copy `from` to `to`, creating missing destination directories.
pub async fn copy(from: &Path, to: &Path) -> Result<(), PipelineError> {
    if !fs::try_exists(from).await.unwrap_or(false) {
        return Err(PipelineError::MissingSource {
            path: from.to_path_buf(),
        });
    }

    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|source| PipelineError::CopyFailed {
                from: from.to_path_buf(),
                to: to.to_path_buf(),
                source,
            })?;
    }

    fs::copy(from, to)
        .await
        .map_err(|source| PipelineError::CopyFailed {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source,
        })?;

    debug!(from = %from.display(), to = %to.display(), "copied");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn rename_moves_the_file() {
        let dir = TempDir::new().unwrap();
        let from = dir.path().join("output.json");
        let to = dir.path().join("input.json");
        fs::write(&from, b"{}").await.unwrap();

        rename(&from, &to).await.unwrap();

        assert!(!from.exists());
        assert_eq!(fs::read(&to).await.unwrap(), b"{}");
    }

    #[tokio::test]
    async fn rename_overwrites_existing_destination() {
        let dir = TempDir::new().unwrap();
        let from = dir.path().join("output.json");
        let to = dir.path().join("input.json");
        fs::write(&from, b"new").await.unwrap();
        fs::write(&to, b"stale").await.unwrap();

        rename(&from, &to).await.unwrap();

        assert_eq!(fs::read(&to).await.unwrap(), b"new");
    }

    #[tokio::test]
    async fn rename_missing_source_is_fatal_and_leaves_destination_untouched() {
        let dir = TempDir::new().unwrap();
        let from = dir.path().join("output.json");
        let to = dir.path().join("input.json");
        fs::write(&to, b"keep").await.unwrap();

        let err = rename(&from, &to).await.unwrap_err();

        assert!(matches!(err, PipelineError::MissingSource { .. }));
        assert_eq!(fs::read(&to).await.unwrap(), b"keep");
    }

    #[tokio::test]
    async fn copy_creates_destination_parents() {
        let dir = TempDir::new().unwrap();
        let from = dir.path().join("input.json");
        let to = dir.path().join("next/input/input.json");
        fs::write(&from, b"{\"contract\":\"381034\"}").await.unwrap();

        copy(&from, &to).await.unwrap();

        assert!(from.exists(), "copy must not consume the source");
        assert_eq!(
            fs::read(&to).await.unwrap(),
            b"{\"contract\":\"381034\"}"
        );
    }

    #[tokio::test]
    async fn copy_missing_source_is_fatal() {
        let dir = TempDir::new().unwrap();
        let err = copy(
            &dir.path().join("absent.json"),
            &dir.path().join("dest.json"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PipelineError::MissingSource { .. }));
    }
}
