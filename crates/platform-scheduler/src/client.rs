//! HTTP client against the external cluster scheduler (C2, spec.md §4.2).

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::SchedulerError;
use crate::template::{JobSubstitutions, JobTemplate};

/// Response from the scheduler's job-submit call.
#[derive(Debug, Deserialize)]
struct SubmitResponse {
    job_id: String,
}

/// Client for the external cluster scheduler's job-submission API.
///
/// Submitting a job is two HTTP calls: parse the rendered spec into
/// canonical JSON, then submit that JSON. The second call is only attempted
/// if the first succeeds — a submission is never partially applied
/// (spec.md §4.2).
#[derive(Debug, Clone)]
pub struct SchedulerClient {
    base_url: String,
    http: Client,
}

impl SchedulerClient {
    /// Build a client bound to `base_url`, with the deadlines from spec.md
    /// §5 (connect 5s, read 60s).
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying `reqwest` client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, SchedulerError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            base_url: base_url.into(),
            http,
        })
    }

    /// Render `template` with `values`, parse it, then submit it. Returns
    /// the scheduler's job id.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::JobSubmissionFailed`] if either HTTP call
    /// fails or returns a non-2xx status.
    pub async fn submit(
        &self,
        template: &JobTemplate,
        values: &JobSubstitutions,
    ) -> Result<String, SchedulerError> {
        let rendered = template.render(values);

        let parsed = self
            .http
            .post(format!("{}/v1/jobs/parse", self.base_url))
            .body(rendered)
            .send()
            .await
            .map_err(|e| SchedulerError::JobSubmissionFailed(e.to_string()))?;

        if !parsed.status().is_success() {
            return Err(SchedulerError::JobSubmissionFailed(format!(
                "parse returned {}",
                parsed.status()
            )));
        }

        let canonical_json = parsed
            .text()
            .await
            .map_err(|e| SchedulerError::JobSubmissionFailed(e.to_string()))?;

        let submitted = self
            .http
            .post(format!("{}/v1/jobs", self.base_url))
            .header("content-type", "application/json")
            .body(canonical_json)
            .send()
            .await
            .map_err(|e| SchedulerError::JobSubmissionFailed(e.to_string()))?;

        if !submitted.status().is_success() {
            return Err(SchedulerError::JobSubmissionFailed(format!(
                "submit returned {}",
                submitted.status()
            )));
        }

        let body: SubmitResponse = submitted
            .json()
            .await
            .map_err(|e| SchedulerError::JobSubmissionFailed(e.to_string()))?;

        debug!(job_id = %body.job_id, job_kind = values.job_kind.as_str(), "job submitted");
        Ok(body.job_id)
    }

    /// Whether `job_id` currently exists in the scheduler.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::SchedulerUnavailable`] for any response
    /// status other than 200 (exists) or 404 (absent).
    pub async fn exists(&self, job_id: &str) -> Result<bool, SchedulerError> {
        let resp = self
            .http
            .get(format!("{}/v1/jobs/{job_id}", self.base_url))
            .send()
            .await?;

        match resp.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            other => Err(SchedulerError::SchedulerUnavailable(format!(
                "unexpected status {other}"
            ))),
        }
    }

    /// Stop `job_id`. Idempotent: a 404 is reported as success, since the
    /// caller's goal (no job running) is already satisfied (§4.2).
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::SchedulerUnavailable`] for any response
    /// status other than 200/204/404.
    pub async fn stop(&self, job_id: &str) -> Result<(), SchedulerError> {
        let resp = self
            .http
            .delete(format!("{}/v1/jobs/{job_id}", self.base_url))
            .send()
            .await?;

        match resp.status() {
            StatusCode::OK | StatusCode::NO_CONTENT | StatusCode::NOT_FOUND => Ok(()),
            other => {
                warn!(job_id, status = %other, "stop job returned unexpected status");
                Err(SchedulerError::SchedulerUnavailable(format!(
                    "unexpected status {other}"
                )))
            }
        }
    }

    /// Count of currently running jobs, used by the license/quota check
    /// (spec.md §4.4).
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::SchedulerUnavailable`] if the scheduler's
    /// job-listing endpoint does not return 200.
    pub async fn job_count(&self) -> Result<u32, SchedulerError> {
        #[derive(Deserialize)]
        struct JobList {
            jobs: Vec<serde_json::Value>,
        }

        let resp = self
            .http
            .get(format!("{}/v1/jobs", self.base_url))
            .send()
            .await?;

        if resp.status() != StatusCode::OK {
            return Err(SchedulerError::SchedulerUnavailable(format!(
                "unexpected status {}",
                resp.status()
            )));
        }

        let list: JobList = resp
            .json()
            .await
            .map_err(|e| SchedulerError::SchedulerUnavailable(e.to_string()))?;
        Ok(u32::try_from(list.jobs.len()).unwrap_or(u32::MAX))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::template::JobKind;

    fn values() -> JobSubstitutions {
        JobSubstitutions {
            job_kind: JobKind::Train,
            model_id: "m1".to_owned(),
            deployment_id: "d1".to_owned(),
            alloc_id: "a1".to_owned(),
            docker_image: "img".to_owned(),
            docker_registry: "registry".to_owned(),
            bazaar_dir: "/bazaar".to_owned(),
            memory_mb: 1024,
            cpu_cores: 1,
            gpu_count: 0,
            autoscaling_enabled: false,
            min_replicas: 1,
            max_replicas: 1,
            callback_base_url: "https://cp.example".to_owned(),
            task_runner_token: "tok".to_owned(),
            env_overrides: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn exists_maps_200_and_404() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/jobs/present"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/jobs/absent"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = SchedulerClient::new(server.uri()).unwrap();
        assert!(client.exists("present").await.unwrap());
        assert!(!client.exists("absent").await.unwrap());
    }

    #[tokio::test]
    async fn stop_treats_404_as_success() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/v1/jobs/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = SchedulerClient::new(server.uri()).unwrap();
        client.stop("gone").await.unwrap();
    }

    #[tokio::test]
    async fn submit_only_calls_parse_once_on_parse_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/jobs/parse"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;

        let client = SchedulerClient::new(server.uri()).unwrap();
        let template = JobTemplate::new("{{job_kind}}");
        let result = client.submit(&template, &values()).await;
        assert!(matches!(
            result,
            Err(SchedulerError::JobSubmissionFailed(_))
        ));
    }
}
