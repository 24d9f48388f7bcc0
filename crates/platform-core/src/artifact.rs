//! Filesystem operations on the bazaar's model artifact trees.
//!
//! The control plane never reads an artifact's contents (§3) — it only
//! moves, copies, and deletes whole trees under `{bazaar_dir}/models/{id}/`.

use std::path::{Path, PathBuf};

use uuid::Uuid;

/// The path to a model's artifact tree.
#[must_use]
pub fn model_dir(bazaar_dir: &Path, model_id: Uuid) -> PathBuf {
    bazaar_dir.join("models").join(model_id.to_string())
}

/// Recursively copy `src` into `dst`, excluding any file or directory whose
/// name starts with a `.` or ends in `.tmp` (retrain's "excluding temporary
/// files", §4.4).
///
/// # Errors
///
/// Returns the underlying [`std::io::Error`] on any filesystem failure.
pub async fn copy_tree(src: &Path, dst: &Path) -> std::io::Result<()> {
    tokio::fs::create_dir_all(dst).await?;

    let mut entries = tokio::fs::read_dir(src).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let name_str = name.to_string_lossy();
        if name_str.starts_with('.') || name_str.ends_with(".tmp") {
            continue;
        }

        let from = entry.path();
        let to = dst.join(&name);
        let file_type = entry.file_type().await?;

        if file_type.is_dir() {
            Box::pin(copy_tree(&from, &to)).await?;
        } else {
            tokio::fs::copy(&from, &to).await?;
        }
    }

    Ok(())
}

/// Delete a model's artifact tree outright (terminal delete, §4.4).
///
/// # Errors
///
/// Returns the underlying [`std::io::Error`] unless the directory is
/// already absent, which is treated as success.
pub async fn delete_tree(path: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn copy_tree_excludes_temp_and_hidden_files() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();

        tokio::fs::write(src.path().join("model.ndb"), b"data")
            .await
            .unwrap();
        tokio::fs::write(src.path().join("scratch.tmp"), b"junk")
            .await
            .unwrap();
        tokio::fs::write(src.path().join(".lock"), b"junk")
            .await
            .unwrap();

        copy_tree(src.path(), dst.path()).await.unwrap();

        assert!(tokio::fs::metadata(dst.path().join("model.ndb")).await.is_ok());
        assert!(tokio::fs::metadata(dst.path().join("scratch.tmp")).await.is_err());
        assert!(tokio::fs::metadata(dst.path().join(".lock")).await.is_err());
    }

    #[tokio::test]
    async fn delete_tree_on_missing_path_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("never-existed");
        delete_tree(&missing).await.unwrap();
    }
}
