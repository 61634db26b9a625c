//! Asset operation handlers (export, upload, import).

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{Value, json};

use crate::cli::context::App;

pub async fn export(app: &App, payload: &Path) -> Result<()> {
    let payload = read_payload(payload)?;
    let response = app.jobs_client()?.start_export(&payload).await.context("start export")?;
    print_response(&response)
}

pub async fn export_status(app: &App, id: &str, payload: Option<&Path>) -> Result<()> {
    let payload = match payload {
        Some(path) => read_payload(path)?,
        None => json!({}),
    };
    let response = app
        .jobs_client()?
        .export_status(id, &payload)
        .await
        .with_context(|| format!("fetch export status for '{id}'"))?;
    print_response(&response)
}

pub async fn upload(app: &App, payload: &Path) -> Result<()> {
    let payload = read_payload(payload)?;
    let response = app.jobs_client()?.upload_assets(&payload).await.context("upload assets")?;
    print_response(&response)
}

pub async fn import(app: &App, payload: &Path) -> Result<()> {
    let payload = read_payload(payload)?;
    let response = app.jobs_client()?.import_assets(&payload).await.context("import assets")?;
    print_response(&response)
}

fn read_payload(path: &Path) -> Result<Value> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("read payload from {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("parse JSON payload in {}", path.display()))
}

fn print_response(response: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(response)?);
    Ok(())
}
