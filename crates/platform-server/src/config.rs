//! Control-plane configuration, loaded once from the environment
//! (`SPEC_FULL.md` "Configuration", mirroring `zvault-server::config`'s
//! `ServerConfig::from_env` shape and `platform-deploy::config`'s).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the control-plane HTTP API process.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub scheduler_base_url: String,
    pub bazaar_dir: PathBuf,
    pub license_path: PathBuf,
    pub public_base_url: String,
    pub docker_image: String,
    pub docker_registry: String,
    pub task_runner_token: String,
    pub permission_cache_ttl: Duration,
    /// Root key the control plane derives every team's AES-256-GCM secret
    /// key from via HKDF (`platform_core::vault::derive_team_key`) — never
    /// stored per-team, only this one root value.
    pub vault_root_key: [u8; 32],
    /// Session bearer tokens expire after this long (`user/email-login`).
    pub session_ttl: Duration,
    pub object_store_bucket: Option<String>,
}

impl ServerConfig {
    /// Session lifetime default: 30 days.
    pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

    /// Read configuration from environment variables. Read exactly once,
    /// in `main` — everything downstream receives an owned `ServerConfig`
    /// (§9 "Global singletons loaded from environment" redesign flag).
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or malformed.
    pub fn from_env() -> anyhow::Result<Self> {
        let bind_addr: SocketAddr = std::env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8000".to_owned())
            .parse()?;

        let database_url = std::env::var("DATABASE_URL")?;

        let scheduler_base_url = std::env::var("SCHEDULER_BASE_URL")
            .unwrap_or_else(|_| "http://scheduler.internal".to_owned());

        let bazaar_dir = PathBuf::from(
            std::env::var("BAZAAR_DIR").unwrap_or_else(|_| "/bazaar".to_owned()),
        );

        let license_path = PathBuf::from(std::env::var("LICENSE_PATH").unwrap_or_else(|_| {
            "/bazaar/license/ndb_enterprise_license.json".to_owned()
        }));

        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8000".to_owned());

        let docker_image =
            std::env::var("DOCKER_IMAGE").unwrap_or_else(|_| "platform-deploy".to_owned());
        let docker_registry =
            std::env::var("DOCKER_REGISTRY").unwrap_or_else(|_| "registry.internal".to_owned());
        let task_runner_token = std::env::var("TASK_RUNNER_TOKEN")
            .unwrap_or_else(|_| "dev-task-runner-token".to_owned());

        let permission_cache_ttl = Duration::from_secs(
            std::env::var("PERMISSION_CACHE_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
        );

        let vault_root_key_hex = std::env::var("VAULT_ROOT_KEY_HEX")
            .map_err(|_| anyhow::anyhow!("VAULT_ROOT_KEY_HEX must be set (64 hex chars)"))?;
        let vault_root_key_vec = hex::decode(&vault_root_key_hex)?;
        let vault_root_key: [u8; 32] = vault_root_key_vec
            .try_into()
            .map_err(|_| anyhow::anyhow!("VAULT_ROOT_KEY_HEX must decode to exactly 32 bytes"))?;

        let session_ttl = std::env::var("SESSION_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map_or(Self::DEFAULT_SESSION_TTL, Duration::from_secs);

        let object_store_bucket = std::env::var("OBJECT_STORE_BUCKET").ok();

        Ok(Self {
            bind_addr,
            database_url,
            scheduler_base_url,
            bazaar_dir,
            license_path,
            public_base_url,
            docker_image,
            docker_registry,
            task_runner_token,
            permission_cache_ttl,
            vault_root_key,
            session_ttl,
            object_store_bucket,
        })
    }
}
