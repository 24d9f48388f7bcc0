//! Reading the plain-text log files a training/deployment process writes
//! under `{bazaar_dir}/logs/{model_id}/` (§6's on-disk layout), backing
//! `train/logs`, `deploy/log`, and `model/logs`.
//!
//! The control plane never parses these — they are opaque lines appended
//! by the out-of-scope training/inference engines (§1); this module only
//! locates and tails the file.

use std::path::{Path, PathBuf};

/// Default number of trailing lines returned when a caller does not specify
/// a line limit.
pub const DEFAULT_TAIL_LINES: usize = 500;

fn log_dir(bazaar_dir: &Path, model_id: uuid::Uuid) -> PathBuf {
    bazaar_dir.join("logs").join(model_id.to_string())
}

/// Read the last `max_lines` lines of `{bazaar_dir}/logs/{model_id}/train.log`.
///
/// Returns an empty vector, not an error, if the model has not produced a
/// training log yet — a model that is still `not_started` has none.
///
/// # Errors
///
/// Returns the underlying [`std::io::Error`] for any failure other than
/// the file not existing.
pub async fn tail_train_log(
    bazaar_dir: &Path,
    model_id: uuid::Uuid,
    max_lines: usize,
) -> std::io::Result<Vec<String>> {
    tail_file(&log_dir(bazaar_dir, model_id).join("train.log"), max_lines).await
}

/// Read the last `max_lines` lines of one allocation's deployment log,
/// `{bazaar_dir}/logs/{model_id}/deployment-{alloc_id}.log`.
///
/// # Errors
///
/// Returns the underlying [`std::io::Error`] for any failure other than
/// the file not existing.
pub async fn tail_deployment_log(
    bazaar_dir: &Path,
    model_id: uuid::Uuid,
    alloc_id: uuid::Uuid,
    max_lines: usize,
) -> std::io::Result<Vec<String>> {
    tail_file(
        &log_dir(bazaar_dir, model_id).join(format!("deployment-{alloc_id}.log")),
        max_lines,
    )
    .await
}

async fn tail_file(path: &Path, max_lines: usize) -> std::io::Result<Vec<String>> {
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let lines: Vec<String> = contents.lines().map(str::to_owned).collect();
    let start = lines.len().saturating_sub(max_lines);
    Ok(lines[start..].to_vec())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_log_file_returns_empty_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let lines = tail_train_log(dir.path(), uuid::Uuid::new_v4(), 10)
            .await
            .unwrap();
        assert!(lines.is_empty());
    }

    #[tokio::test]
    async fn tail_respects_max_lines() {
        let dir = tempfile::tempdir().unwrap();
        let model_id = uuid::Uuid::new_v4();
        let path = log_dir(dir.path(), model_id).join("train.log");
        tokio::fs::create_dir_all(path.parent().unwrap())
            .await
            .unwrap();
        tokio::fs::write(&path, "one\ntwo\nthree\nfour\n")
            .await
            .unwrap();

        let lines = tail_train_log(dir.path(), model_id, 2).await.unwrap();
        assert_eq!(lines, vec!["three".to_owned(), "four".to_owned()]);
    }
}
