//! Shared application state for the deployment runtime, built once in
//! `main` and shared across handlers behind an `Arc` (§9 redesign flag:
//! "encapsulate in an instance owned by the HTTP server").

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use platform_auth::{AuthError, AuthSource, PermissionCache, Permissions};
use reqwest::Client;
use tokio::sync::Notify;
use uuid::Uuid;

use crate::config::DeployConfig;

/// Resolves permissions by calling the control plane's own auth endpoint —
/// the deployment runtime never maintains its own user/permission tables
/// (§4.3's cache sits in front of exactly this).
pub struct ControlPlaneAuthSource {
    http: Client,
    base_url: String,
}

impl ControlPlaneAuthSource {
    #[must_use]
    pub fn new(http: Client, base_url: String) -> Self {
        Self { http, base_url }
    }
}

#[async_trait::async_trait]
impl AuthSource for ControlPlaneAuthSource {
    async fn fetch(&self, token: &str) -> Result<Permissions, AuthError> {
        #[derive(serde::Deserialize)]
        struct Resp {
            read: bool,
            write: bool,
            r#override: bool,
            username: String,
        }

        let resp = self
            .http
            .get(format!("{}/api/auth/permissions", self.base_url))
            .bearer_auth(token)
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(AuthError::Unauthorized("invalid or expired token".to_owned()));
        }

        let body: Resp = resp.json().await?;
        Ok(Permissions {
            read: body.read,
            write: body.write,
            r#override: body.r#override,
            username: body.username,
        })
    }
}

/// Per-process request metrics backing `/metrics` (§4.7, `SPEC_FULL.md` C7
/// supplement).
#[derive(Default)]
pub struct Metrics {
    pub requests_total: AtomicU64,
    pub in_flight: AtomicI64,
}

/// One document held by the in-process NDB index (§6's NDB routes). The
/// deployment runtime holds the index itself, not a real vector-retrieval
/// engine — document ranking/embeddings are out of scope (§10).
#[derive(Debug, Clone, serde::Serialize)]
pub struct NdbDocument {
    pub id: Uuid,
    pub source: String,
    pub text: String,
    pub upvotes: u32,
}

/// In-process NDB index state, mutated directly in non-autoscaled mode and
/// rebuilt from the durable update log on restart in autoscaled mode.
#[derive(Debug, Default)]
pub struct NdbIndex {
    pub documents: Vec<NdbDocument>,
}

/// A user-provided training sample for an NLP deployment (§6's
/// `insert_sample`/`get_recent_samples`).
#[derive(Debug, Clone, serde::Serialize)]
pub struct NlpSample {
    pub id: Uuid,
    pub input: String,
    pub label: String,
    pub created_at: DateTime<Utc>,
}

/// In-process NLP deployment state: recent samples (bounded so `/stats`
/// stays cheap) and the label vocabulary.
#[derive(Debug, Default)]
pub struct NlpState {
    pub samples: VecDeque<NlpSample>,
    pub labels: Vec<String>,
}

impl NlpState {
    /// Keep at most this many recent samples in process memory; C8 owns
    /// the durable reservoir-sampled store (§4.8), this is just the
    /// deployment's own short window for `get_recent_samples`.
    const MAX_RECENT: usize = 1000;

    pub fn push_sample(&mut self, sample: NlpSample) {
        self.samples.push_back(sample);
        while self.samples.len() > Self::MAX_RECENT {
            self.samples.pop_front();
        }
    }
}

/// Shared state for every handler in this process.
pub struct AppState {
    pub config: DeployConfig,
    pub permission_cache: Arc<PermissionCache>,
    pub http: Client,
    pub metrics: Metrics,
    /// Reset on every incoming request; the idle timer waits on this to
    /// know it should restart its countdown (§4.7).
    pub idle_reset: Notify,
    /// Serializes in-process model mutations in non-autoscaled mode; reads
    /// proceed concurrently (§4.7 concurrency note).
    pub mutation_lock: tokio::sync::Mutex<()>,
    pub ndb_index: parking_lot::Mutex<NdbIndex>,
    pub nlp_state: parking_lot::Mutex<NlpState>,
    /// Monotonic sequence for durable update-log events written by this
    /// process (§4.5's per-allocation total ordering).
    log_seq: AtomicU64,
}

impl AppState {
    #[must_use]
    pub fn new(config: DeployConfig) -> Self {
        let http = Client::builder()
            .connect_timeout(std::time::Duration::from_secs(5))
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| Client::new());

        let source = Arc::new(ControlPlaneAuthSource::new(
            http.clone(),
            config.control_plane_base_url.clone(),
        ));
        let permission_cache = Arc::new(PermissionCache::new(source, config.permission_cache_ttl));

        Self {
            config,
            permission_cache,
            http,
            metrics: Metrics::default(),
            idle_reset: Notify::new(),
            mutation_lock: tokio::sync::Mutex::new(()),
            ndb_index: parking_lot::Mutex::new(NdbIndex::default()),
            nlp_state: parking_lot::Mutex::new(NlpState::default()),
            log_seq: AtomicU64::new(0),
        }
    }

    /// Next sequence number for a durable update-log event from this
    /// process (§8 "monotonically non-decreasing" within one allocation).
    pub fn next_log_seq(&self) -> u64 {
        self.log_seq.fetch_add(1, Ordering::Relaxed)
    }
}
