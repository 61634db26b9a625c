//! Pure mapping from raw job state to display values.

use chrono::{DateTime, Local, Utc};

/// Placeholder for values that cannot be shown.
pub const NOT_AVAILABLE: &str = "N/A";

/// Status used when the server sends none.
pub const FALLBACK_STATUS: &str = "PENDING";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassifyError {
    #[error("status is empty")]
    UnknownStatus,
    #[error("step ended at {end} before it started at {start}")]
    NegativeDuration {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// Display bucket of a job or step status.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DisplayBucket {
    Pending,
    Running,
    Succeeded,
    Failed,
    /// Any other status, lower-cased.
    Other(String),
}

impl DisplayBucket {
    /// Lower-cased label.
    pub fn label(&self) -> &str {
        match self {
            DisplayBucket::Pending => "pending",
            DisplayBucket::Running => "running",
            DisplayBucket::Succeeded => "succeeded",
            DisplayBucket::Failed => "failed",
            DisplayBucket::Other(label) => label,
        }
    }

    /// Style class, e.g. `status-running`.
    pub fn css_class(&self) -> String {
        format!("status-{}", self.label())
    }

    /// True once the server will no longer change the status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DisplayBucket::Succeeded | DisplayBucket::Failed)
    }
}

/// Maps a raw status to its bucket (case-insensitive).
///
/// # Errors
/// Returns `ClassifyError::UnknownStatus` if `status` is empty; callers
/// substitute `FALLBACK_STATUS` first when the server omitted it.
pub fn classify(status: &str) -> Result<DisplayBucket, ClassifyError> {
    let normalized = status.trim().to_lowercase();
    let bucket = match normalized.as_str() {
        "" => return Err(ClassifyError::UnknownStatus),
        "pending" => DisplayBucket::Pending,
        "running" => DisplayBucket::Running,
        "succeeded" | "completed" => DisplayBucket::Succeeded,
        "failed" => DisplayBucket::Failed,
        _ => DisplayBucket::Other(normalized),
    };
    Ok(bucket)
}

/// `classify` with the `PENDING` fallback applied to absent or blank input.
pub fn classify_or_pending(status: Option<&str>) -> DisplayBucket {
    status
        .and_then(|s| classify(s).ok())
        .unwrap_or(DisplayBucket::Pending)
}

/// Elapsed whole seconds between two timestamps, e.g. `"42s"`.
///
/// Returns `"N/A"` if either endpoint is absent.
///
/// # Errors
/// Returns `ClassifyError::NegativeDuration` if `end` precedes `start`.
pub fn duration(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<String, ClassifyError> {
    let (Some(start), Some(end)) = (start, end) else {
        return Ok(NOT_AVAILABLE.to_string());
    };
    if end < start {
        return Err(ClassifyError::NegativeDuration { start, end });
    }

    let millis = (end - start).num_milliseconds();
    let seconds = (millis as f64 / 1000.0).round() as i64;
    Ok(format!("{seconds}s"))
}

/// Local-time rendering of a timestamp, or `"N/A"`.
pub fn format_timestamp(ts: Option<DateTime<Utc>>) -> String {
    ts.map_or_else(
        || NOT_AVAILABLE.to_string(),
        |ts| {
            ts.with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        },
    )
}
