//! Deployment runtime configuration, loaded once from the environment the
//! cluster driver injects (§4.7 step 1, `SPEC_FULL.md` "Configuration").

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use uuid::Uuid;

/// The kind of deployment this process is serving (§6 per-deployment routes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Ndb,
    NlpText,
    NlpToken,
    EnterpriseSearch,
    KnowledgeExtraction,
}

impl ModelKind {
    #[must_use]
    pub fn from_env_str(s: &str) -> Option<Self> {
        match s {
            "ndb" => Some(Self::Ndb),
            "nlp-text" => Some(Self::NlpText),
            "nlp-token" => Some(Self::NlpToken),
            "enterprise-search" => Some(Self::EnterpriseSearch),
            "knowledge-extraction" => Some(Self::KnowledgeExtraction),
            _ => None,
        }
    }
}

/// Configuration for one deployment runtime process.
#[derive(Debug, Clone)]
pub struct DeployConfig {
    pub model_id: Uuid,
    pub deployment_id: Uuid,
    pub alloc_id: Uuid,
    pub model_kind: ModelKind,
    pub bind_addr: SocketAddr,
    pub bazaar_dir: PathBuf,
    pub autoscaling_enabled: bool,
    pub control_plane_base_url: String,
    pub permission_cache_ttl: Duration,
    pub idle_timeout: Duration,
    /// Base URL of the dependency NDB deployment an enterprise-search
    /// deployment fans `search` out to. `None` for other model kinds.
    pub ndb_dependency_url: Option<String>,
    /// Base URL of the dependency NLP token-classification deployment used
    /// as a guardrail. `None` when no guardrail is configured.
    pub guardrail_dependency_url: Option<String>,
}

impl DeployConfig {
    /// Idle shutdown timeout per §4.7: 15 minutes of zero in-flight
    /// requests.
    pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(15 * 60);

    /// Read configuration from environment variables. Read exactly once,
    /// in `main`, per `SPEC_FULL.md`'s "no global singletons" redesign
    /// flag — everything downstream receives an owned `DeployConfig`.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or malformed.
    pub fn from_env() -> anyhow::Result<Self> {
        let model_id: Uuid = std::env::var("MODEL_ID")?.parse()?;
        let deployment_id: Uuid = std::env::var("DEPLOYMENT_ID")?.parse()?;
        let alloc_id: Uuid = std::env::var("ALLOC_ID")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(Uuid::new_v4);

        let model_kind_str = std::env::var("MODEL_KIND")?;
        let model_kind = ModelKind::from_env_str(&model_kind_str)
            .ok_or_else(|| anyhow::anyhow!("unknown MODEL_KIND: {model_kind_str}"))?;

        let bind_addr: SocketAddr = std::env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8100".to_owned())
            .parse()?;

        let bazaar_dir = PathBuf::from(
            std::env::var("BAZAAR_DIR").unwrap_or_else(|_| "/bazaar".to_owned()),
        );

        let autoscaling_enabled = std::env::var("AUTOSCALING_ENABLED")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let control_plane_base_url = std::env::var("CONTROL_PLANE_BASE_URL")
            .unwrap_or_else(|_| "http://control-plane.internal".to_owned());

        let permission_cache_ttl = Duration::from_secs(
            std::env::var("PERMISSION_CACHE_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
        );

        let idle_timeout = std::env::var("IDLE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map_or(Self::DEFAULT_IDLE_TIMEOUT, Duration::from_secs);

        let ndb_dependency_url = std::env::var("NDB_DEPENDENCY_URL").ok();
        let guardrail_dependency_url = std::env::var("GUARDRAIL_DEPENDENCY_URL").ok();

        Ok(Self {
            model_id,
            deployment_id,
            alloc_id,
            model_kind,
            bind_addr,
            bazaar_dir,
            autoscaling_enabled,
            control_plane_base_url,
            permission_cache_ttl,
            idle_timeout,
            ndb_dependency_url,
            guardrail_dependency_url,
        })
    }
}
