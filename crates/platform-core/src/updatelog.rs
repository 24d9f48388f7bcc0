//! The durable update log (C5).
//!
//! Per-deployment directory `data/{deployment_id}/{kind}/{alloc_id}.jsonl`.
//! One file per allocation avoids cross-writer contention entirely — the
//! filesystem, not a lock, is the synchronization point.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::warn;

use crate::error::LifecycleError;

/// The three kinds of durable log events (§3, §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    Feedback,
    Insertions,
    Deletions,
}

impl LogKind {
    #[must_use]
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Feedback => "feedback",
            Self::Insertions => "insertions",
            Self::Deletions => "deletions",
        }
    }
}

/// The kind of signal carried by a [`LogEvent`] of kind [`LogKind::Feedback`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackKind {
    Upvote,
    Associate,
    ImplicitUpvote,
}

impl FeedbackKind {
    /// Retraining weight: explicit upvotes count double an implicit click
    /// (§4.5 "upvotes are weighted ×2 explicit, ×1 implicit").
    #[must_use]
    pub fn weight(self) -> u32 {
        match self {
            Self::Upvote | Self::Associate => 2,
            Self::ImplicitUpvote => 1,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Upvote => "upvote",
            Self::Associate => "associate",
            Self::ImplicitUpvote => "implicit_upvote",
        }
    }
}

/// One append-only durable log entry (§3's "Durable update log entry").
///
/// `op` is a free-form tag scoped to the containing [`LogKind`] directory —
/// a [`FeedbackKind`]'s `as_str()` for [`LogKind::Feedback`], or
/// `"insert"`/`"delete"` for the insertions/deletions directories. The
/// directory itself (via [`LogKind::dir_name`]) is what a reader keys on
/// first; `op` only disambiguates within it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub op: String,
    pub payload: serde_json::Value,
}

fn kind_dir(bazaar_dir: &Path, deployment_id: &str, kind: LogKind) -> PathBuf {
    bazaar_dir
        .join("data")
        .join(deployment_id)
        .join(kind.dir_name())
}

/// Append one event to `{bazaar_dir}/data/{deployment_id}/{kind}/{alloc_id}.jsonl`.
///
/// Durable once this returns: the write is followed by an `fsync` on the
/// file before the function returns (§4.5's durability contract). Never
/// rejects on disk pressure itself — callers are expected to have already
/// consulted the low-disk guard (§4.5's back-pressure note).
///
/// # Errors
///
/// Returns [`LifecycleError::Artifact`] if the directory cannot be created
/// or the write/fsync fails.
pub async fn write_event(
    bazaar_dir: &Path,
    deployment_id: &str,
    alloc_id: &str,
    kind: LogKind,
    event: &LogEvent,
) -> Result<(), LifecycleError> {
    let dir = kind_dir(bazaar_dir, deployment_id, kind);
    tokio::fs::create_dir_all(&dir).await?;

    let path = dir.join(format!("{alloc_id}.jsonl"));
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .await?;

    let mut line = serde_json::to_vec(event)
        .map_err(|e| LifecycleError::Artifact(std::io::Error::other(e)))?;
    line.push(b'\n');

    file.write_all(&line).await?;
    file.sync_data().await?;
    Ok(())
}

/// Read every event across every allocation file under a kind directory.
///
/// Order is unspecified across files — retraining is commutative over the
/// set of events within a kind (§4.5). Malformed lines (a crashed writer's
/// partial final line) are skipped, not treated as a read failure; readers
/// must already be idempotent over duplicates.
///
/// # Errors
///
/// Returns [`LifecycleError::Artifact`] if the directory cannot be listed.
pub async fn read_all(
    bazaar_dir: &Path,
    deployment_id: &str,
    kind: LogKind,
) -> Result<Vec<LogEvent>, LifecycleError> {
    let dir = kind_dir(bazaar_dir, deployment_id, kind);
    let mut events = Vec::new();

    let mut entries = match tokio::fs::read_dir(&dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(events),
        Err(e) => return Err(e.into()),
    };

    while let Some(entry) = entries.next_entry().await? {
        if entry.path().extension().and_then(|e| e.to_str()) != Some("jsonl") {
            continue;
        }
        let contents = tokio::fs::read_to_string(entry.path()).await?;
        for line in contents.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<LogEvent>(line) {
                Ok(event) => events.push(event),
                Err(e) => warn!(
                    file = %entry.path().display(),
                    error = %e,
                    "skipping malformed update-log line"
                ),
            }
        }
    }

    Ok(events)
}

/// Concatenate a set of events into a single JSONL file at `path` — the
/// "one supervised input" retraining submits alongside the copied artifact
/// (§4.4 "Retraining with feedback", steps 2-3). Unlike [`write_event`] this
/// takes an arbitrary destination rather than deriving one from
/// `deployment_id`/`alloc_id`, since the concatenated file belongs to the
/// retraining job, not to any one allocation.
///
/// # Errors
///
/// Returns [`LifecycleError::Artifact`] if the parent directory cannot be
/// created or the write/fsync fails.
pub async fn write_concatenated(path: &Path, events: &[LogEvent]) -> Result<(), LifecycleError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .await?;

    for event in events {
        let mut line = serde_json::to_vec(event)
            .map_err(|e| LifecycleError::Artifact(std::io::Error::other(e)))?;
        line.push(b'\n');
        file.write_all(&line).await?;
    }
    file.sync_data().await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_written_by_one_allocation_stay_in_its_own_file() {
        let dir = tempfile::tempdir().unwrap();
        let event = LogEvent {
            seq: 1,
            timestamp: Utc::now(),
            op: FeedbackKind::Upvote.as_str().to_owned(),
            payload: serde_json::json!({"query": "q", "chunk_id": 78}),
        };

        write_event(dir.path(), "dep-1", "alloc-a", LogKind::Feedback, &event)
            .await
            .unwrap();
        write_event(dir.path(), "dep-1", "alloc-b", LogKind::Feedback, &event)
            .await
            .unwrap();

        let a_path = kind_dir(dir.path(), "dep-1", LogKind::Feedback).join("alloc-a.jsonl");
        let b_path = kind_dir(dir.path(), "dep-1", LogKind::Feedback).join("alloc-b.jsonl");
        assert!(tokio::fs::metadata(&a_path).await.is_ok());
        assert!(tokio::fs::metadata(&b_path).await.is_ok());

        let all = read_all(dir.path(), "dep-1", LogKind::Feedback).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn read_all_on_missing_directory_returns_empty() {
        let dir = tempfile::tempdir().unwrap();
        let all = read_all(dir.path(), "never-written", LogKind::Insertions)
            .await
            .unwrap();
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn malformed_line_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let kind_path = kind_dir(dir.path(), "dep-1", LogKind::Feedback);
        tokio::fs::create_dir_all(&kind_path).await.unwrap();
        tokio::fs::write(kind_path.join("alloc-a.jsonl"), b"not json\n")
            .await
            .unwrap();

        let all = read_all(dir.path(), "dep-1", LogKind::Feedback).await.unwrap();
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn write_concatenated_writes_one_line_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let events = vec![
            LogEvent {
                seq: 1,
                timestamp: Utc::now(),
                op: FeedbackKind::Upvote.as_str().to_owned(),
                payload: serde_json::json!({"query": "q", "chunk_id": 78}),
            },
            LogEvent {
                seq: 2,
                timestamp: Utc::now(),
                op: FeedbackKind::ImplicitUpvote.as_str().to_owned(),
                payload: serde_json::json!({"query": "q2", "chunk_id": 9}),
            },
        ];

        let path = dir.path().join("nested").join("retrain_feedback.jsonl");
        write_concatenated(&path, &events).await.unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}
