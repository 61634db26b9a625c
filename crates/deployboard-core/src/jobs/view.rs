//! Renderable projection of a job snapshot.

use tracing::warn;

use super::status::{self, ClassifyError, DisplayBucket, FALLBACK_STATUS};
use super::types::{Job, Step};

#[derive(Debug, Clone, PartialEq)]
pub struct StepView {
    pub name: String,
    /// Raw status with the `PENDING` fallback applied.
    pub status: String,
    pub bucket: DisplayBucket,
    pub duration: Result<String, ClassifyError>,
    pub output_key: Option<String>,
    pub error_message: Option<String>,
}

impl StepView {
    fn from_step(job_id: &str, step: &Step) -> Self {
        let status = step
            .status
            .clone()
            .unwrap_or_else(|| FALLBACK_STATUS.to_string());
        let duration = status::duration(step.started_at, step.ended_at);
        if let Err(err) = &duration {
            warn!(job_id, step = %step.name, "bad step timestamps: {err}");
        }

        Self {
            name: step.name.clone(),
            bucket: status::classify_or_pending(Some(&status)),
            status,
            duration,
            output_key: step.output_key.clone(),
            error_message: step.error_message.clone(),
        }
    }

    /// Duration text; negative spans render as `"invalid"`.
    pub fn duration_text(&self) -> &str {
        match &self.duration {
            Ok(text) => text,
            Err(_) => "invalid",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobView {
    pub job: Job,
    pub bucket: DisplayBucket,
    pub steps: Vec<StepView>,
}

impl JobView {
    pub fn from_job(job: Job) -> Self {
        let bucket = status::classify_or_pending(Some(&job.status));
        let steps = job
            .steps
            .iter()
            .map(|step| StepView::from_step(&job.job_id, step))
            .collect();
        Self { job, bucket, steps }
    }

    pub fn is_terminal(&self) -> bool {
        self.bucket.is_terminal()
    }
}
