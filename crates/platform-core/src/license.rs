//! License verification and job-count quota check (§4.4).
//!
//! Consulted as the first step after input validation, before any job
//! submission: `verify_license` followed by a scheduler `job_count` check.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::LifecycleError;

/// A verified license, read from `{bazaar_dir}/license/ndb_enterprise_license.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct License {
    pub key: String,
    pub expires_at: DateTime<Utc>,
    pub max_concurrent_jobs: u32,
}

/// Read and validate the license file at `path`.
///
/// # Errors
///
/// Returns [`LifecycleError::ResourceLimitReached`] if the file is missing,
/// malformed, or expired.
pub async fn verify_license(path: &std::path::Path) -> Result<License, LifecycleError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| LifecycleError::ResourceLimitReached(format!("license unreadable: {e}")))?;

    let license: License = serde_json::from_str(&raw)
        .map_err(|e| LifecycleError::ResourceLimitReached(format!("license malformed: {e}")))?;

    if license.expires_at <= Utc::now() {
        return Err(LifecycleError::ResourceLimitReached(
            "license expired".to_owned(),
        ));
    }

    Ok(license)
}

/// Check the license's concurrent-job quota against the scheduler's current
/// job count. Returns `Ok(())` when there is headroom for one more job.
///
/// # Errors
///
/// Returns [`LifecycleError::ResourceLimitReached`] if `job_count` is
/// already at or above `license.max_concurrent_jobs`.
pub fn check_quota(license: &License, job_count: u32) -> Result<(), LifecycleError> {
    if job_count >= license.max_concurrent_jobs {
        return Err(LifecycleError::ResourceLimitReached(format!(
            "{job_count} jobs already running against a limit of {}",
            license.max_concurrent_jobs
        )));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn expired_license_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("license.json");
        let expired = serde_json::json!({
            "key": "abc",
            "expires_at": "2000-01-01T00:00:00Z",
            "max_concurrent_jobs": 10,
        });
        tokio::fs::write(&path, expired.to_string()).await.unwrap();

        let result = verify_license(&path).await;
        assert!(result.is_err());
    }

    #[test]
    fn quota_rejects_at_the_limit() {
        let license = License {
            key: "abc".to_owned(),
            expires_at: Utc::now() + chrono::Duration::days(1),
            max_concurrent_jobs: 3,
        };
        assert!(check_quota(&license, 2).is_ok());
        assert!(check_quota(&license, 3).is_err());
    }
}
