//! Jobs REST API: wire types, client, status classification and views.

pub mod client;
pub mod status;
pub mod types;
pub mod view;

pub use client::{JobsApi, JobsClient};
pub use status::{ClassifyError, DisplayBucket};
pub use types::{Job, JobList, NewJobConfig, Step};
pub use view::{JobView, StepView};
