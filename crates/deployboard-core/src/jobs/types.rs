//! Wire types of the jobs API.
//!
//! Jobs are owned by the server; the client only ever holds the latest
//! fetched snapshot, so these types are plain data with no merge logic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Default `initiated_by` for jobs started from the dashboard.
pub const DEFAULT_INITIATOR: &str = "ui-user";

/// One deployment job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub job_id: String,
    /// Raw server status (`PENDING`, `RUNNING`, `SUCCEEDED`, `FAILED`, ...).
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub initiated_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub current_step: Option<String>,
    #[serde(default)]
    pub payload: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Value>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// One step of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub name: String,
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(
        rename = "outputS3Key",
        alias = "outputKey",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub output_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Response body of `GET /jobs`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobList {
    #[serde(default)]
    pub jobs: Vec<Job>,
}

/// Deployment parameters sent as `config` when creating a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewJobConfig {
    pub source_account_id: String,
    pub source_role_name: String,
    pub source_asset_id: String,
    pub target_account_id: String,
    pub target_role_name: String,
    pub target_admin_user: String,
    pub bucket_name: String,
    pub dashboard_name: String,
    pub aws_region: String,
}

impl NewJobConfig {
    const DEFAULT_ROLE_NAME: &str = "QuickSightRole";
    const DEFAULT_DASHBOARD_NAME: &str = "BIOpsDemo";
    const DEFAULT_REGION: &str = "us-east-1";

    /// Names of required fields that are still empty.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("source_account_id", &self.source_account_id),
            ("source_asset_id", &self.source_asset_id),
            ("target_account_id", &self.target_account_id),
            ("target_admin_user", &self.target_admin_user),
            ("bucket_name", &self.bucket_name),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

impl Default for NewJobConfig {
    fn default() -> Self {
        Self {
            source_account_id: String::new(),
            source_role_name: Self::DEFAULT_ROLE_NAME.to_string(),
            source_asset_id: String::new(),
            target_account_id: String::new(),
            target_role_name: Self::DEFAULT_ROLE_NAME.to_string(),
            target_admin_user: String::new(),
            bucket_name: String::new(),
            dashboard_name: Self::DEFAULT_DASHBOARD_NAME.to_string(),
            aws_region: Self::DEFAULT_REGION.to_string(),
        }
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|v| !v.is_empty()))
}

#[cfg(test)]
pub(crate) fn sample_job(job_id: &str, status: &str) -> Job {
    serde_json::from_value(serde_json::json!({
        "jobId": job_id,
        "status": status,
        "initiatedBy": "ui-user",
        "createdAt": "2025-03-01T10:00:00.000000Z",
        "updatedAt": "2025-03-01T10:05:00.000000Z",
        "payload": {"dashboard_name": "BIOpsDemo"},
        "steps": [],
    }))
    .expect("sample job must deserialize")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_job_from_server_shape() {
        let job: Job = serde_json::from_value(json!({
            "jobId": "job-20250301-100000-abcd1234",
            "status": "RUNNING",
            "createdAt": "2025-03-01T10:00:00.123456Z",
            "updatedAt": "2025-03-01T10:01:00Z",
            "initiatedBy": "ui-user",
            "payload": {"source_account_id": "111"},
            "currentStep": "biops-upload-assets",
            "retryCount": 0,
            "steps": [{
                "name": "biops-export-assets",
                "status": "SUCCEEDED",
                "startedAt": "2025-03-01T10:00:01Z",
                "endedAt": "2025-03-01T10:00:31Z",
                "outputS3Key": "exports/abc.zip"
            }]
        }))
        .unwrap();

        assert_eq!(job.current_step.as_deref(), Some("biops-upload-assets"));
        assert!(job.results.is_none());
        assert_eq!(job.steps.len(), 1);
        assert_eq!(job.steps[0].output_key.as_deref(), Some("exports/abc.zip"));
        assert!(job.steps[0].error_message.is_none());
    }

    #[test]
    fn test_empty_current_step_is_absent() {
        let job: Job = serde_json::from_value(json!({
            "jobId": "j",
            "status": "PENDING",
            "createdAt": "2025-03-01T10:00:00Z",
            "updatedAt": "2025-03-01T10:00:00Z",
            "currentStep": "",
            "results": null
        }))
        .unwrap();

        assert!(job.current_step.is_none());
        assert!(job.results.is_none());
        assert!(job.steps.is_empty());
        assert_eq!(job.payload, Value::Null);
    }

    #[test]
    fn test_step_accepts_output_key_alias() {
        let step: Step = serde_json::from_value(json!({
            "name": "import",
            "outputKey": "imports/1.json"
        }))
        .unwrap();
        assert_eq!(step.output_key.as_deref(), Some("imports/1.json"));
        assert!(step.status.is_none());
    }

    #[test]
    fn test_job_list_tolerates_missing_jobs() {
        let list: JobList = serde_json::from_value(json!({})).unwrap();
        assert!(list.jobs.is_empty());
    }

    #[test]
    fn test_new_job_config_defaults() {
        let config = NewJobConfig::default();
        assert_eq!(config.source_role_name, "QuickSightRole");
        assert_eq!(config.dashboard_name, "BIOpsDemo");
        assert_eq!(
            config.missing_fields(),
            vec![
                "source_account_id",
                "source_asset_id",
                "target_account_id",
                "target_admin_user",
                "bucket_name"
            ]
        );
    }
}
