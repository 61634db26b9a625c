//! Pollers for the job list and for a single job.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use super::{FetchFailure, PollHandle, spawn};
use crate::jobs::{Job, JobView, JobsApi};

/// Polls `GET /jobs`.
pub struct JobPoller<A> {
    api: Arc<A>,
    period: Duration,
}

impl<A: JobsApi> JobPoller<A> {
    pub const DEFAULT_PERIOD: Duration = Duration::from_secs(10);

    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            period: Self::DEFAULT_PERIOD,
        }
    }

    #[must_use]
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Starts polling; the first fetch runs immediately.
    ///
    /// # Panics
    /// Panics if called outside a Tokio runtime.
    pub fn start(
        &self,
        on_update: impl Fn(Arc<Vec<Job>>) + Send + Sync + 'static,
        on_error: impl Fn(FetchFailure) + Send + Sync + 'static,
    ) -> PollHandle<Vec<Job>> {
        let api = Arc::clone(&self.api);
        spawn(
            self.period,
            move || {
                let api = Arc::clone(&api);
                async move { api.list_jobs().await }
            },
            on_update,
            on_error,
        )
    }
}

/// Polls `GET /jobs/{id}` for the job currently on screen.
///
/// At most one job is watched at a time: `watch` cancels the previous job's
/// task before starting the next, so a late response for the old job can
/// never reach the new job's callbacks.
pub struct JobDetailPoller<A> {
    api: Arc<A>,
    period: Duration,
    active: Option<(String, PollHandle<JobView>)>,
}

impl<A: JobsApi> JobDetailPoller<A> {
    pub const DEFAULT_PERIOD: Duration = Duration::from_secs(5);

    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            period: Self::DEFAULT_PERIOD,
            active: None,
        }
    }

    #[must_use]
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Starts an unmanaged poller for one job.
    ///
    /// # Panics
    /// Panics if called outside a Tokio runtime.
    pub fn start(
        &self,
        job_id: &str,
        on_update: impl Fn(Arc<JobView>) + Send + Sync + 'static,
        on_error: impl Fn(FetchFailure) + Send + Sync + 'static,
    ) -> PollHandle<JobView> {
        let api = Arc::clone(&self.api);
        let job_id: Arc<str> = Arc::from(job_id);
        spawn(
            self.period,
            move || {
                let api = Arc::clone(&api);
                let job_id = Arc::clone(&job_id);
                async move { api.get_job(&job_id).await.map(JobView::from_job) }
            },
            on_update,
            on_error,
        )
    }

    /// Switches the watched job, cancelling the previous one first.
    ///
    /// # Panics
    /// Panics if called outside a Tokio runtime.
    pub fn watch(
        &mut self,
        job_id: &str,
        on_update: impl Fn(Arc<JobView>) + Send + Sync + 'static,
        on_error: impl Fn(FetchFailure) + Send + Sync + 'static,
    ) -> &PollHandle<JobView> {
        self.stop();
        info!(job_id, "watching job");
        let handle = self.start(job_id, on_update, on_error);
        &self.active.insert((job_id.to_string(), handle)).1
    }

    pub fn watching(&self) -> Option<&str> {
        self.active.as_ref().map(|(id, _)| id.as_str())
    }

    pub fn handle(&self) -> Option<&PollHandle<JobView>> {
        self.active.as_ref().map(|(_, handle)| handle)
    }

    pub fn stop(&mut self) {
        if let Some((_, handle)) = self.active.take() {
            handle.cancel();
        }
    }
}
