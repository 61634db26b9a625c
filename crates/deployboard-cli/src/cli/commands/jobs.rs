//! Jobs command handlers.

use std::sync::Arc;

use anyhow::{Context, Result};
use comfy_table::{ContentArrangement, Table};
use deployboard_core::Error;
use deployboard_core::jobs::status::{self, format_timestamp};
use deployboard_core::jobs::types::DEFAULT_INITIATOR;
use deployboard_core::jobs::{Job, JobView, JobsApi, NewJobConfig};
use deployboard_core::poll::{FetchFailure, JobDetailPoller, JobPoller};
use tokio::sync::Notify;
use tracing::debug;

use crate::cli::context::App;

/// Deployment parameters for `jobs create`.
#[derive(clap::Args, Debug)]
pub struct CreateArgs {
    /// AWS account that owns the source dashboard
    #[arg(long)]
    source_account_id: String,
    /// Role assumed in the source account
    #[arg(long, default_value = "QuickSightRole")]
    source_role_name: String,
    /// Asset (dashboard) id to deploy
    #[arg(long)]
    source_asset_id: String,
    /// AWS account to deploy into
    #[arg(long)]
    target_account_id: String,
    /// Role assumed in the target account
    #[arg(long, default_value = "QuickSightRole")]
    target_role_name: String,
    /// Admin user granted access in the target account
    #[arg(long)]
    target_admin_user: String,
    /// Bucket used for the exported bundle
    #[arg(long)]
    bucket_name: String,
    #[arg(long, default_value = "BIOpsDemo")]
    dashboard_name: String,
    #[arg(long, default_value = "us-east-1")]
    aws_region: String,
    /// Recorded as the job's initiator
    #[arg(long, default_value = DEFAULT_INITIATOR)]
    initiated_by: String,
}

impl From<&CreateArgs> for NewJobConfig {
    fn from(args: &CreateArgs) -> Self {
        NewJobConfig {
            source_account_id: args.source_account_id.clone(),
            source_role_name: args.source_role_name.clone(),
            source_asset_id: args.source_asset_id.clone(),
            target_account_id: args.target_account_id.clone(),
            target_role_name: args.target_role_name.clone(),
            target_admin_user: args.target_admin_user.clone(),
            bucket_name: args.bucket_name.clone(),
            dashboard_name: args.dashboard_name.clone(),
            aws_region: args.aws_region.clone(),
        }
    }
}

pub async fn list(app: &App) -> Result<()> {
    let client = app.jobs_client()?;
    let jobs = client.list_jobs().await.context("list jobs")?;
    print_job_table(&jobs);
    Ok(())
}

pub async fn show(app: &App, id: &str) -> Result<()> {
    let client = app.jobs_client()?;
    let job = client
        .get_job(id)
        .await
        .with_context(|| format!("fetch job '{id}'"))?;
    print_job_detail(&JobView::from_job(job));
    Ok(())
}

pub async fn create(app: &App, args: &CreateArgs) -> Result<()> {
    let config = NewJobConfig::from(args);
    let missing = config.missing_fields();
    if !missing.is_empty() {
        anyhow::bail!("Missing required fields: {}", missing.join(", "));
    }

    let client = app.jobs_client()?;
    let created = client
        .create_job(&config, &args.initiated_by)
        .await
        .context("create job")?;

    match created.get("jobId").and_then(|id| id.as_str()) {
        Some(id) => println!("✓ Created job {id}"),
        None => println!("{}", serde_json::to_string_pretty(&created)?),
    }
    Ok(())
}

/// Polls the job list, or one job, until Ctrl+C. A single job also stops
/// once it reaches a final status.
pub async fn watch(app: &App, id: Option<&str>) -> Result<()> {
    let client = Arc::new(app.jobs_client()?);
    let polling = &app.config.polling;
    let threshold = polling.failure_warning_threshold;
    let on_error = move |failure: FetchFailure| report_failure(&failure, threshold);

    let Some(id) = id else {
        println!(
            "Refreshing jobs every {}s (Ctrl+C to stop)",
            polling.jobs_interval().as_secs()
        );
        let handle = JobPoller::new(client)
            .with_period(polling.jobs_interval())
            .start(|jobs| print_job_table(&jobs), on_error);
        tokio::signal::ctrl_c()
            .await
            .context("wait for Ctrl+C")?;
        handle.cancel();
        return Ok(());
    };

    println!(
        "Refreshing job {id} every {}s (Ctrl+C to stop)",
        polling.job_interval().as_secs()
    );
    let finished = Arc::new(Notify::new());
    let notify = Arc::clone(&finished);
    let mut poller = JobDetailPoller::new(client).with_period(polling.job_interval());
    poller.watch(
        id,
        move |view| {
            print_job_detail(&view);
            if view.is_terminal() {
                notify.notify_one();
            }
        },
        on_error,
    );

    tokio::select! {
        result = tokio::signal::ctrl_c() => result.context("wait for Ctrl+C")?,
        () = finished.notified() => println!("Job {id} reached a final status."),
    }
    poller.stop();
    Ok(())
}

fn report_failure(failure: &FetchFailure, threshold: u32) {
    debug!(
        seq = failure.seq,
        consecutive = failure.consecutive_failures,
        "refresh failed: {}",
        failure.error
    );

    if let Error::Api { status: 401 | 403, .. } = failure.error
        && failure.consecutive_failures == 1
    {
        eprintln!("warning: the jobs API rejected the session. Run `deployboard login`.");
    } else if failure.consecutive_failures == threshold.max(1) {
        eprintln!(
            "warning: {} refreshes in a row failed; showing the last known data ({})",
            failure.consecutive_failures, failure.error
        );
    }
}

fn print_job_table(jobs: &[Job]) {
    if jobs.is_empty() {
        println!("No jobs found.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(["JOB ID", "STATUS", "CURRENT STEP", "CREATED", "UPDATED"]);
    for job in jobs {
        let bucket = status::classify_or_pending(Some(&job.status));
        table.add_row([
            job.job_id.clone(),
            bucket.label().to_string(),
            job.current_step.clone().unwrap_or_else(|| "-".to_string()),
            format_timestamp(Some(job.created_at)),
            format_timestamp(Some(job.updated_at)),
        ]);
    }
    println!("{table}");
}

fn print_job_detail(view: &JobView) {
    let job = &view.job;
    println!("Job {}", job.job_id);
    println!("  Status:       {} ({})", job.status, view.bucket.label());
    println!("  Initiated by: {}", job.initiated_by);
    println!("  Created:      {}", format_timestamp(Some(job.created_at)));
    println!("  Updated:      {}", format_timestamp(Some(job.updated_at)));
    if let Some(step) = &job.current_step {
        println!("  Current step: {step}");
    }

    if !view.steps.is_empty() {
        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(["STEP", "STATUS", "DURATION", "ERROR"]);
        for step in &view.steps {
            table.add_row([
                step.name.as_str(),
                step.bucket.label(),
                step.duration_text(),
                step.error_message.as_deref().unwrap_or(""),
            ]);
        }
        println!();
        println!("{table}");
    }

    if let Some(results) = &job.results
        && let Ok(pretty) = serde_json::to_string_pretty(results)
    {
        println!();
        println!("  Results:");
        for line in pretty.lines() {
            println!("    {line}");
        }
    }
    println!();
}
