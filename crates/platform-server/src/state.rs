//! Shared application state for the control plane, built once in `main`
//! and shared across handlers behind an `Arc` (§9 redesign flag:
//! "encapsulate in an instance owned by the HTTP server").

use std::sync::atomic::{AtomicI64, AtomicU64};
use std::sync::Arc;

use platform_auth::PermissionCache;
use platform_core::{LifecycleConfig, LifecycleManager};
use platform_entities::PgPool;
use platform_scheduler::SchedulerClient;
use reqwest::Client;

use crate::auth::LocalAuthSource;
use crate::config::ServerConfig;

/// Per-process request metrics, mirroring `platform-deploy`'s own
/// `Metrics` shape so the same `/metrics` exposition idiom applies at both
/// layers.
#[derive(Default)]
pub struct Metrics {
    pub requests_total: AtomicU64,
    pub in_flight: AtomicI64,
}

/// Shared state for every `/api/*` handler.
pub struct AppState {
    pub config: ServerConfig,
    pub pool: PgPool,
    pub http: Client,
    pub permission_cache: Arc<PermissionCache>,
    pub lifecycle: LifecycleManager,
    pub metrics: Metrics,
}

impl AppState {
    /// # Errors
    ///
    /// Returns an error if the `reqwest` client cannot be built.
    pub fn new(
        config: ServerConfig,
        pool: PgPool,
        scheduler: SchedulerClient,
    ) -> anyhow::Result<Self> {
        let http = Client::builder()
            .connect_timeout(std::time::Duration::from_secs(5))
            .timeout(std::time::Duration::from_secs(60))
            .build()?;

        let source = Arc::new(LocalAuthSource::new(pool.clone()));
        let permission_cache = Arc::new(PermissionCache::new(source, config.permission_cache_ttl));

        let lifecycle = LifecycleManager::new(
            pool.clone(),
            scheduler,
            LifecycleConfig {
                bazaar_dir: config.bazaar_dir.clone(),
                license_path: config.license_path.clone(),
                docker_image: config.docker_image.clone(),
                docker_registry: config.docker_registry.clone(),
                callback_base_url: config.public_base_url.clone(),
                task_runner_token: config.task_runner_token.clone(),
            },
        );

        Ok(Self {
            config,
            pool,
            http,
            permission_cache,
            lifecycle,
            metrics: Metrics::default(),
        })
    }
}
