//! The model lifecycle manager (C4) — the orchestration core.
//!
//! Every public operation follows the same shape: a precondition check, an
//! atomic entity mutation, then an asynchronous cluster action, in that
//! order. If the cluster action fails the entity is rolled back to
//! `failed` with the error as its message and the operation returns a
//! synchronous error — it is never left `in_progress` (§4.4, §7).

use std::collections::BTreeMap;
use std::path::PathBuf;

use platform_entities::{
    models::{AccessLevel, Deployment, DeploymentStatus, Model, ModelType, TrainStatus},
    repository, PgPool,
};
use platform_scheduler::{JobKind, JobSubstitutions, JobTemplate, SchedulerClient};
use uuid::Uuid;

use crate::artifact;
use crate::error::LifecycleError;
use crate::license::{self, License};
use crate::updatelog::{self, LogKind};
use crate::validate::validate_name;

/// Static configuration the lifecycle manager needs beyond the database and
/// scheduler handles (§6 Environment/config).
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    pub bazaar_dir: PathBuf,
    pub license_path: PathBuf,
    pub docker_image: String,
    pub docker_registry: String,
    pub callback_base_url: String,
    pub task_runner_token: String,
}

/// The model lifecycle manager: owns no state of its own beyond handles to
/// the entity store and the cluster driver, per §9's "pass an explicit
/// `Config` value through constructors" redesign flag.
#[derive(Clone)]
pub struct LifecycleManager {
    pool: PgPool,
    scheduler: SchedulerClient,
    config: LifecycleConfig,
}

impl LifecycleManager {
    #[must_use]
    pub fn new(pool: PgPool, scheduler: SchedulerClient, config: LifecycleConfig) -> Self {
        Self {
            pool,
            scheduler,
            config,
        }
    }

    async fn check_license_and_quota(&self) -> Result<License, LifecycleError> {
        let license = license::verify_license(&self.config.license_path).await?;
        let job_count = self.scheduler.job_count().await?;
        license::check_quota(&license, job_count)?;
        Ok(license)
    }

    fn substitutions(
        &self,
        job_kind: JobKind,
        model_id: Uuid,
        deployment_id: Uuid,
        alloc_id: Uuid,
        memory_mb: u32,
        autoscaling_enabled: bool,
        env_overrides: BTreeMap<String, String>,
    ) -> JobSubstitutions {
        JobSubstitutions {
            job_kind,
            model_id: model_id.to_string(),
            deployment_id: deployment_id.to_string(),
            alloc_id: alloc_id.to_string(),
            docker_image: self.config.docker_image.clone(),
            docker_registry: self.config.docker_registry.clone(),
            bazaar_dir: self.config.bazaar_dir.display().to_string(),
            memory_mb,
            cpu_cores: 1,
            gpu_count: 0,
            autoscaling_enabled,
            min_replicas: if autoscaling_enabled { 1 } else { 0 },
            max_replicas: if autoscaling_enabled { 4 } else { 0 },
            callback_base_url: self.config.callback_base_url.clone(),
            task_runner_token: self.config.task_runner_token.clone(),
            env_overrides,
        }
    }

    /// `train/ndb` — submit a new NDB training job (§6, §4.4).
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::DuplicateTrain`] if a model with the same
    /// `(owner, name)` already exists; [`LifecycleError::ResourceLimitReached`]
    /// if the license/quota check fails; [`LifecycleError::Scheduler`] if
    /// job submission fails (the model row is rolled back to `failed`
    /// first).
    pub async fn train_ndb(
        &self,
        owner_username: &str,
        model_name: &str,
        parent_id: Option<Uuid>,
    ) -> Result<Model, LifecycleError> {
        self.train_model(owner_username, model_name, ModelType::Ndb, None, parent_id)
            .await
    }

    /// `train/udt` — submit a new NLP training job, `model_type` being
    /// either `nlp-text` or `nlp-token` and `subtype` the UDT task name
    /// (e.g. `"ner"`, `"sentiment"`). Otherwise identical to
    /// [`Self::train_ndb`] — the two endpoints share every invariant in
    /// §4.4 except the model type they stamp on the created row.
    ///
    /// # Errors
    ///
    /// Same as [`Self::train_ndb`].
    pub async fn train_udt(
        &self,
        owner_username: &str,
        model_name: &str,
        model_type: ModelType,
        subtype: Option<&str>,
        parent_id: Option<Uuid>,
    ) -> Result<Model, LifecycleError> {
        self.train_model(owner_username, model_name, model_type, subtype, parent_id)
            .await
    }

    async fn train_model(
        &self,
        owner_username: &str,
        model_name: &str,
        model_type: ModelType,
        subtype: Option<&str>,
        parent_id: Option<Uuid>,
    ) -> Result<Model, LifecycleError> {
        validate_name("owner_username", owner_username)?;
        validate_name("model_name", model_name)?;

        if repository::model_name_taken(&self.pool, owner_username, model_name).await? {
            return Err(LifecycleError::DuplicateTrain {
                owner: owner_username.to_owned(),
                name: model_name.to_owned(),
            });
        }

        self.check_license_and_quota().await?;

        let model = repository::create_model(
            &self.pool,
            owner_username,
            model_name,
            model_type,
            subtype,
            parent_id,
        )
        .await?;

        self.submit_train_job(&model).await
    }

    async fn submit_train_job(&self, model: &Model) -> Result<Model, LifecycleError> {
        repository::set_train_status(&self.pool, model.id, TrainStatus::InProgress).await?;

        let template = JobTemplate::new(TRAIN_TEMPLATE);
        let values = self.substitutions(
            JobKind::Train,
            model.id,
            Uuid::nil(),
            Uuid::new_v4(),
            2048,
            false,
            BTreeMap::new(),
        );

        match self.scheduler.submit(&template, &values).await {
            Ok(_job_id) => Ok(repository::get_model(&self.pool, model.id).await?),
            Err(e) => {
                repository::set_train_status(&self.pool, model.id, TrainStatus::Failed).await?;
                Err(e.into())
            }
        }
    }

    /// Submit a retraining job, referencing both the copied base artifact
    /// and the concatenated feedback log (§4.4 steps 2-3) via
    /// `env_overrides` — the retrain-specific keys are additions to the
    /// fixed template vocabulary (§4.2), not substitutes for it.
    async fn submit_retrain_job(
        &self,
        model: &Model,
        supervised_data_dir: &std::path::Path,
        feedback_log_path: Option<&std::path::Path>,
    ) -> Result<Model, LifecycleError> {
        repository::set_train_status(&self.pool, model.id, TrainStatus::InProgress).await?;

        let mut env_overrides = BTreeMap::new();
        env_overrides.insert(
            "supervised_data_path".to_owned(),
            supervised_data_dir.display().to_string(),
        );
        env_overrides.insert(
            "feedback_log_path".to_owned(),
            feedback_log_path
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        );

        let template = JobTemplate::new(RETRAIN_TEMPLATE);
        let values = self.substitutions(
            JobKind::Train,
            model.id,
            Uuid::nil(),
            Uuid::new_v4(),
            2048,
            false,
            env_overrides,
        );

        match self.scheduler.submit(&template, &values).await {
            Ok(_job_id) => Ok(repository::get_model(&self.pool, model.id).await?),
            Err(e) => {
                repository::set_train_status(&self.pool, model.id, TrainStatus::Failed).await?;
                Err(e.into())
            }
        }
    }

    /// Copy the base model's artifact, gather all its deployments'
    /// accumulated feedback, and submit a retraining job (§4.4
    /// "Retraining with feedback"). The base model's own deployment is
    /// never paused — the copy is taken at job-submission time.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NotFound`] if `base_model_id` does not
    /// exist; propagates scheduler and filesystem errors otherwise.
    pub async fn retrain_ndb(&self, base_model_id: Uuid) -> Result<Model, LifecycleError> {
        let base = repository::get_model(&self.pool, base_model_id).await?;
        self.check_license_and_quota().await?;

        let child = repository::create_model(
            &self.pool,
            &base.owner_username,
            &format!("{}-retrain-{}", base.model_name, Uuid::new_v4().simple()),
            base.model_type,
            base.subtype.as_deref(),
            Some(base.id),
        )
        .await?;

        let base_dir = artifact::model_dir(&self.config.bazaar_dir, base.id).join("model.ndb");
        let child_dir = artifact::model_dir(&self.config.bazaar_dir, child.id).join("model.ndb");
        artifact::copy_tree(&base_dir, &child_dir).await?;

        // Feedback is collected from every deployment this base model has
        // ever had — allocations come and go but the base model's own
        // deployment row id is stable across its lifetime, so one lookup
        // suffices for the common case of a single active deployment.
        let feedback_log_path = if let Some(deployment) =
            repository::get_live_deployment(&self.pool, base.id).await?
        {
            let events = updatelog::read_all(
                &self.config.bazaar_dir,
                &deployment.id.to_string(),
                LogKind::Feedback,
            )
            .await?;
            tracing::info!(
                base_model_id = %base.id,
                feedback_events = events.len(),
                "retrain gathered accumulated feedback"
            );

            if events.is_empty() {
                None
            } else {
                let path = artifact::model_dir(&self.config.bazaar_dir, child.id)
                    .join("retrain_feedback.jsonl");
                updatelog::write_concatenated(&path, &events).await?;
                Some(path)
            }
        } else {
            None
        };

        self.submit_retrain_job(&child, &child_dir, feedback_log_path.as_deref())
            .await
    }

    /// `deploy/run` — start an inference deployment for `model_id` (§4.4,
    /// §8 at-most-one-live-deployment invariant, enforced by the entity
    /// store's partial unique index).
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] if the model has not
    /// finished training, or [`LifecycleError::NotFound`] if a live
    /// deployment already exists (the unique index surfaces as a conflict
    /// which this maps onto `NotFound`'s sibling, `EntityError::Conflict`).
    pub async fn deploy_run(
        &self,
        model_id: Uuid,
        name: &str,
        autoscaling_enabled: bool,
        memory_hint: Option<i32>,
    ) -> Result<Deployment, LifecycleError> {
        let model = repository::get_model(&self.pool, model_id).await?;
        if model.train_status != TrainStatus::Complete {
            return Err(LifecycleError::InvalidTransition(format!(
                "model {model_id} has not finished training"
            )));
        }

        let deployment = repository::create_deployment(
            &self.pool,
            model_id,
            name,
            autoscaling_enabled,
            memory_hint,
        )
        .await?;

        repository::set_deployment_status(
            &self.pool,
            deployment.id,
            DeploymentStatus::Starting,
            None,
        )
        .await?;

        let template = JobTemplate::new(DEPLOY_TEMPLATE);
        let values = self.substitutions(
            JobKind::Deploy,
            model_id,
            deployment.id,
            Uuid::new_v4(),
            u32::try_from(memory_hint.unwrap_or(2048)).unwrap_or(2048),
            autoscaling_enabled,
            BTreeMap::new(),
        );

        match self.scheduler.submit(&template, &values).await {
            Ok(job_id) => Ok(repository::set_deployment_status(
                &self.pool,
                deployment.id,
                DeploymentStatus::Starting,
                Some(&job_id),
            )
            .await?),
            Err(e) => {
                repository::set_deployment_status(
                    &self.pool,
                    deployment.id,
                    DeploymentStatus::Failed,
                    None,
                )
                .await?;
                Err(e.into())
            }
        }
    }

    /// `deploy/stop` — undeploy a model, cascading to composite
    /// dependencies whose live reference count drops to zero (§4.4).
    ///
    /// # Errors
    ///
    /// Propagates entity-store and scheduler errors.
    pub async fn undeploy(&self, model_id: Uuid) -> Result<(), LifecycleError> {
        let Some(deployment) = repository::get_live_deployment(&self.pool, model_id).await?
        else {
            return Ok(());
        };

        if let Some(job_id) = &deployment.job_id {
            self.scheduler.stop(job_id).await?;
        }

        repository::set_deployment_status(
            &self.pool,
            deployment.id,
            DeploymentStatus::Stopped,
            None,
        )
        .await?;

        for dependency in repository::list_dependencies(&self.pool, model_id).await? {
            let still_referenced =
                repository::count_other_live_dependents(&self.pool, dependency.id, model_id)
                    .await?
                    > 0;
            if !still_referenced {
                Box::pin(self.undeploy(dependency.id)).await?;
            }
        }

        Ok(())
    }

    /// `model/delete` — delete a model outright, refusing if it has live
    /// dependents, and undeploying first if it is currently deployed
    /// (§4.4: "if undeploy fails the delete is refused").
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] if `model_id` still has
    /// live dependents.
    pub async fn delete_model(&self, model_id: Uuid) -> Result<(), LifecycleError> {
        let dependents = repository::list_dependents(&self.pool, model_id).await?;
        if !dependents.is_empty() {
            return Err(LifecycleError::InvalidTransition(format!(
                "model {model_id} has {} live dependent(s)",
                dependents.len()
            )));
        }

        if repository::get_live_deployment(&self.pool, model_id)
            .await?
            .is_some()
        {
            self.undeploy(model_id).await?;
        }

        artifact::delete_tree(&artifact::model_dir(&self.config.bazaar_dir, model_id)).await?;
        repository::delete_model(&self.pool, model_id).await?;
        Ok(())
    }

    /// `train/complete` callback — idempotent: applying the same
    /// `(model_id, status)` twice yields identical entity state (§8).
    ///
    /// # Errors
    ///
    /// Propagates entity-store errors.
    pub async fn train_complete(
        &self,
        model_id: Uuid,
        status: TrainStatus,
    ) -> Result<Model, LifecycleError> {
        Ok(repository::set_train_status(&self.pool, model_id, status).await?)
    }

    /// `deploy/complete` callback — idempotent for the same reason as
    /// [`Self::train_complete`].
    ///
    /// # Errors
    ///
    /// Propagates entity-store errors.
    pub async fn deploy_complete(
        &self,
        deployment_id: Uuid,
        status: DeploymentStatus,
    ) -> Result<Deployment, LifecycleError> {
        Ok(
            repository::set_deployment_status(&self.pool, deployment_id, status, None)
                .await?,
        )
    }

    /// `model/update-access-level` — validated by the caller (route layer)
    /// to ensure the caller owns the model or holds an override permission;
    /// this function performs the mutation only.
    ///
    /// # Errors
    ///
    /// Propagates entity-store errors.
    pub async fn update_access_level(
        &self,
        model_id: Uuid,
        access_level: AccessLevel,
    ) -> Result<Model, LifecycleError> {
        Ok(repository::set_access_level(&self.pool, model_id, access_level).await?)
    }

    /// `model/save-deployed` — snapshot a currently-deployed model's live
    /// artifact tree into a new model id. A pure filesystem copy plus an
    /// entity insert; no training job is submitted.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::InvalidTransition`] if `model_id` has no
    /// live deployment.
    pub async fn save_deployed(
        &self,
        model_id: Uuid,
        new_model_name: &str,
    ) -> Result<Model, LifecycleError> {
        let model = repository::get_model(&self.pool, model_id).await?;
        if repository::get_live_deployment(&self.pool, model_id)
            .await?
            .is_none()
        {
            return Err(LifecycleError::InvalidTransition(format!(
                "model {model_id} is not currently deployed"
            )));
        }
        validate_name("model_name", new_model_name)?;

        let saved = repository::create_model(
            &self.pool,
            &model.owner_username,
            new_model_name,
            model.model_type,
            model.subtype.as_deref(),
            Some(model.id),
        )
        .await?;

        let src = artifact::model_dir(&self.config.bazaar_dir, model.id);
        let dst = artifact::model_dir(&self.config.bazaar_dir, saved.id);
        artifact::copy_tree(&src, &dst).await?;

        Ok(repository::set_train_status(&self.pool, saved.id, TrainStatus::Complete).await?)
    }
}

/// The train job's rendered spec template. Kept as a private constant —
/// real deployments load this from the operator's template directory; the
/// fixed vocabulary of substitutable keys lives in `platform_scheduler::template`.
const TRAIN_TEMPLATE: &str = r#"{"kind":"{{job_kind}}","model_id":"{{model_id}}","image":"{{docker_registry}}/{{docker_image}}","memory_mb":{{memory_mb}},"callback":"{{callback_base_url}}"}"#;

const DEPLOY_TEMPLATE: &str = r#"{"kind":"{{job_kind}}","model_id":"{{model_id}}","deployment_id":"{{deployment_id}}","image":"{{docker_registry}}/{{docker_image}}","memory_mb":{{memory_mb}},"autoscaling":{{autoscaling_enabled}},"callback":"{{callback_base_url}}"}"#;

/// Like [`TRAIN_TEMPLATE`], plus the supervised-data and feedback-log paths
/// retraining submits alongside the copied artifact (§4.4).
const RETRAIN_TEMPLATE: &str = r#"{"kind":"{{job_kind}}","model_id":"{{model_id}}","image":"{{docker_registry}}/{{docker_image}}","memory_mb":{{memory_mb}},"callback":"{{callback_base_url}}","supervised_data_path":"{{env.supervised_data_path}}","feedback_log_path":"{{env.feedback_log_path}}"}"#;
