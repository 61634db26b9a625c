//! HTTP client for the jobs REST API.

use std::future::Future;
use std::sync::Arc;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;
use url::Url;

use super::types::{Job, JobList, NewJobConfig};
use crate::auth::AuthSession;
use crate::error::{Error, Result};

/// Read side of the jobs API; the pollers depend only on this.
pub trait JobsApi: Send + Sync + 'static {
    fn list_jobs(&self) -> impl Future<Output = Result<Vec<Job>>> + Send;

    fn get_job(&self, job_id: &str) -> impl Future<Output = Result<Job>> + Send;
}

/// reqwest-backed jobs API client.
///
/// Headers come from the shared `AuthSession` on every request, so a sign-in
/// or sign-out takes effect without rebuilding the client.
#[derive(Clone)]
pub struct JobsClient {
    http: reqwest::Client,
    base_url: Url,
    session: Arc<AuthSession>,
}

impl JobsClient {
    pub fn new(base_url: Url, session: Arc<AuthSession>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            session,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `POST /jobs`. Returns the server's response (normally the new job).
    ///
    /// # Errors
    /// Returns an error on transport failure or a non-2xx response.
    pub async fn create_job(&self, config: &NewJobConfig, initiated_by: &str) -> Result<Value> {
        let body = json!({
            "config": config,
            "initiated_by": initiated_by,
        });
        self.send(Method::POST, &["jobs"], Some(&body)).await
    }

    /// `POST /export`.
    ///
    /// # Errors
    /// Returns an error on transport failure or a non-2xx response.
    pub async fn start_export(&self, payload: &Value) -> Result<Value> {
        self.send(Method::POST, &["export"], Some(payload)).await
    }

    /// `GET /export/{export_job_id}`. The payload rides along as a JSON body.
    ///
    /// # Errors
    /// Returns an error on transport failure or a non-2xx response.
    pub async fn export_status(&self, export_job_id: &str, payload: &Value) -> Result<Value> {
        self.send(Method::GET, &["export", export_job_id], Some(payload))
            .await
    }

    /// `POST /upload`.
    ///
    /// # Errors
    /// Returns an error on transport failure or a non-2xx response.
    pub async fn upload_assets(&self, payload: &Value) -> Result<Value> {
        self.send(Method::POST, &["upload"], Some(payload)).await
    }

    /// `POST /import`.
    ///
    /// # Errors
    /// Returns an error on transport failure or a non-2xx response.
    pub async fn import_assets(&self, payload: &Value) -> Result<Value> {
        self.send(Method::POST, &["import"], Some(payload)).await
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&Value>,
    ) -> Result<T> {
        let url = self.endpoint(segments)?;
        debug!(%method, %url, "jobs api request");

        let mut request = self
            .http
            .request(method, url)
            .headers(self.session.auth_headers());
        if let Some(body) = body {
            request = request.body(serde_json::to_vec(body)?);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(serde_json::from_value(Value::Null)?);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl JobsApi for JobsClient {
    async fn list_jobs(&self) -> Result<Vec<Job>> {
        let list: JobList = self.send(Method::GET, &["jobs"], None).await?;
        Ok(list.jobs)
    }

    async fn get_job(&self, job_id: &str) -> Result<Job> {
        self.send(Method::GET, &["jobs", job_id], None).await
    }
}
