//! Chat session storage for NDB deployments (`chat`, `get-chat-history`,
//! `update-chat-settings` in §6), supplemented from
//! `original_source`'s deployment job tree (dropped from spec.md's
//! distillation, added back per `SPEC_FULL.md` §8).
//!
//! Conversation turns are an append-only JSONL file per session, mirroring
//! C5's single-writer-per-file discipline rather than a shared table that
//! would need cross-session locking.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

fn chat_dir(state: &AppState) -> PathBuf {
    state
        .config
        .bazaar_dir
        .join("data")
        .join(state.config.deployment_id.to_string())
        .join("chat")
}

fn session_path(state: &AppState, session_id: uuid::Uuid) -> PathBuf {
    chat_dir(state).join(format!("{session_id}.jsonl"))
}

fn settings_path(state: &AppState, session_id: uuid::Uuid) -> PathBuf {
    chat_dir(state).join(format!("{session_id}.settings.json"))
}

/// Append one conversation turn. Durable once this returns, same contract
/// as [`platform_core::updatelog::write_event`].
///
/// # Errors
///
/// Returns [`AppError::Internal`] if the write or fsync fails.
pub async fn append_turn(
    state: &AppState,
    session_id: uuid::Uuid,
    role: &str,
    text: &str,
) -> Result<(), AppError> {
    let dir = chat_dir(state);
    tokio::fs::create_dir_all(&dir).await?;

    let turn = ChatTurn {
        role: role.to_owned(),
        text: text.to_owned(),
        created_at: Utc::now(),
    };
    let mut line = serde_json::to_vec(&turn).map_err(|e| AppError::Internal(e.to_string()))?;
    line.push(b'\n');

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(session_path(state, session_id))
        .await?;
    file.write_all(&line).await?;
    file.sync_data().await?;
    Ok(())
}

/// Read every turn in a session, in append order. Malformed lines from a
/// crashed writer are skipped, matching C5's read semantics.
///
/// # Errors
///
/// Returns [`AppError::Internal`] if the directory cannot be read.
pub async fn read_history(state: &AppState, session_id: uuid::Uuid) -> Result<Vec<ChatTurn>, AppError> {
    let path = session_path(state, session_id);
    let contents = match tokio::fs::read_to_string(&path).await {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    Ok(contents
        .lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(|l| serde_json::from_str(l).ok())
        .collect())
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatSettings {
    system_prompt: Option<String>,
}

/// Overwrite a session's settings file (small enough that a rewrite, not
/// an append, is the natural fit — unlike the turn log).
///
/// # Errors
///
/// Returns [`AppError::Internal`] if the write fails.
pub async fn write_settings(
    state: &AppState,
    session_id: uuid::Uuid,
    system_prompt: Option<&str>,
) -> Result<(), AppError> {
    let dir = chat_dir(state);
    tokio::fs::create_dir_all(&dir).await?;

    let settings = ChatSettings {
        system_prompt: system_prompt.map(str::to_owned),
    };
    let bytes = serde_json::to_vec(&settings).map_err(|e| AppError::Internal(e.to_string()))?;
    tokio::fs::write(settings_path(state, session_id), bytes).await?;
    Ok(())
}
