//! Jobs commands against a mock jobs API.


use std::fs;

use fixtures::{deployboard, sign_in, temp_home};
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

fn job(id: &str, status: &str) -> serde_json::Value {
    json!({
        "jobId": id,
        "status": status,
        "initiatedBy": "ui-user",
        "createdAt": "2025-03-01T10:00:00Z",
        "updatedAt": "2025-03-01T10:05:00Z",
        "currentStep": "biops-import-assets",
        "steps": [{
            "name": "biops-export-assets",
            "status": "SUCCEEDED",
            "startedAt": "2025-03-01T10:00:00Z",
            "endedAt": "2025-03-01T10:00:42Z"
        }]
    })
}

#[test]
fn test_jobs_list_requires_login() {
    let home = temp_home();

    deployboard(&home)
        .args(["jobs", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("deployboard login"));
}

#[tokio::test]
async fn test_jobs_list_sends_bearer() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_home();
    let token = sign_in(&home);
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/jobs"))
        .and(header("authorization", format!("Bearer {token}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jobs": [job("job-20250301-aaaa", "RUNNING"), job("job-20250301-bbbb", "COMPLETED")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    deployboard(&home)
        .env("DEPLOYBOARD_API_URL", server.uri())
        .args(["jobs", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("job-20250301-aaaa"))
        .stdout(predicate::str::contains("running"))
        .stdout(predicate::str::contains("succeeded"));
}

#[tokio::test]
async fn test_jobs_show_renders_steps() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_home();
    sign_in(&home);
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/jobs/job-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(job("job-1", "FAILED")))
        .mount(&server)
        .await;

    deployboard(&home)
        .env("DEPLOYBOARD_API_URL", server.uri())
        .args(["jobs", "show", "job-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Job job-1"))
        .stdout(predicate::str::contains("biops-export-assets"))
        .stdout(predicate::str::contains("42s"));
}

#[tokio::test]
async fn test_jobs_show_reports_api_error() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_home();
    sign_in(&home);
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/jobs/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("job not found"))
        .mount(&server)
        .await;

    deployboard(&home)
        .env("DEPLOYBOARD_API_URL", server.uri())
        .args(["jobs", "show", "missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("HTTP 404"))
        .stderr(predicate::str::contains("job not found"));
}

#[tokio::test]
async fn test_jobs_create_posts_config() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_home();
    sign_in(&home);
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/jobs"))
        .and(body_json(json!({
            "config": {
                "source_account_id": "111111111111",
                "source_role_name": "QuickSightRole",
                "source_asset_id": "dash-1",
                "target_account_id": "222222222222",
                "target_role_name": "QuickSightRole",
                "target_admin_user": "admin",
                "bucket_name": "exports",
                "dashboard_name": "BIOpsDemo",
                "aws_region": "us-east-1"
            },
            "initiated_by": "ui-user"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(job("job-new", "PENDING")))
        .expect(1)
        .mount(&server)
        .await;

    deployboard(&home)
        .env("DEPLOYBOARD_API_URL", server.uri())
        .args([
            "jobs",
            "create",
            "--source-account-id",
            "111111111111",
            "--source-asset-id",
            "dash-1",
            "--target-account-id",
            "222222222222",
            "--target-admin-user",
            "admin",
            "--bucket-name",
            "exports",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created job job-new"));
}

#[tokio::test]
async fn test_assets_export_posts_payload() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_home();
    sign_in(&home);
    let server = MockServer::start().await;
    let payload_path = home.path().join("export.json");
    fs::write(&payload_path, r#"{"source_asset_id": "dash-1"}"#).unwrap();

    Mock::given(method("POST"))
        .and(path("/export"))
        .and(body_json(json!({"source_asset_id": "dash-1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"exportJobId": "exp-7"})))
        .expect(1)
        .mount(&server)
        .await;

    deployboard(&home)
        .env("DEPLOYBOARD_API_URL", server.uri())
        .args(["assets", "export", "--payload", payload_path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("exp-7"));
}

#[tokio::test]
async fn test_watch_job_stops_at_final_status() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_home();
    sign_in(&home);
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/jobs/job-done"))
        .respond_with(ResponseTemplate::new(200).set_body_json(job("job-done", "SUCCEEDED")))
        .mount(&server)
        .await;

    deployboard(&home)
        .env("DEPLOYBOARD_API_URL", server.uri())
        .args(["jobs", "watch", "job-done"])
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .success()
        .stdout(predicate::str::contains("reached a final status"));
}

#[tokio::test]
async fn test_watch_job_keeps_single_failure_quiet() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_home();
    sign_in(&home);
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/jobs/j1"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/jobs/j1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(job("j1", "SUCCEEDED")))
        .mount(&server)
        .await;

    deployboard(&home)
        .env("DEPLOYBOARD_API_URL", server.uri())
        .args(["jobs", "watch", "j1"])
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .success()
        .stdout(predicate::str::contains("reached a final status"))
        .stderr(predicate::str::contains("refresh failed").not())
        .stderr(predicate::str::contains("warning:").not())
        .stderr(predicate::str::contains("\u{1b}[").not());
}
