//! Sign-in, whoami and sign-out through the CLI.


use std::fs;

use fixtures::{deployboard, id_token, sign_in, temp_home, token_redirect};
use predicates::prelude::*;

#[test]
fn test_whoami_without_session() {
    let home = temp_home();

    deployboard(&home)
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not signed in"));
}

#[test]
fn test_callback_stores_session() {
    let home = temp_home();
    let token = id_token(3600);

    deployboard(&home)
        .args(["callback", &token_redirect(&token)])
        .assert()
        .success()
        .stdout(predicate::str::contains("Signed in as ops@example.com"));

    let session = fs::read_to_string(home.path().join("session.json")).unwrap();
    let session: serde_json::Value = serde_json::from_str(&session).unwrap();
    assert_eq!(session["id_token"], token.as_str());
    assert_eq!(session["access_token"], "access-xyz");

    deployboard(&home)
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::contains("Signed in as ops@example.com"))
        .stdout(predicate::str::contains("Subject: user-123"))
        .stdout(predicate::str::contains("Username: ops"));
}

#[test]
fn test_expired_session_is_reported() {
    let home = temp_home();
    let token = id_token(-60);

    deployboard(&home)
        .args(["callback", &token_redirect(&token)])
        .assert()
        .success();

    deployboard(&home)
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::contains("Session expired"));
}

#[test]
fn test_callback_error_is_reported() {
    let home = temp_home();

    deployboard(&home)
        .args([
            "callback",
            "http://localhost:3000/callback?error=access_denied&error_description=User+cancelled",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("access_denied"));

    assert!(!home.path().join("session.json").exists());
}

#[test]
fn test_callback_without_credential_fails() {
    let home = temp_home();

    deployboard(&home)
        .args(["callback", "http://localhost:3000/callback"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no valid session"));
}

#[test]
fn test_logout_clears_session() {
    let home = temp_home();
    sign_in(&home);

    deployboard(&home)
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Signed out"))
        .stdout(predicate::str::contains("https://login.example.com/logout"));

    deployboard(&home)
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not signed in"));

    // Signing out again is harmless.
    deployboard(&home)
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not signed in"));
}

#[test]
fn test_login_prints_authorize_url() {
    let home = temp_home();

    deployboard(&home)
        .arg("login")
        .write_stdin("")
        .assert()
        .failure()
        .stdout(predicate::str::contains(
            "https://login.example.com/oauth2/authorize?client_id=client-abc",
        ))
        .stdout(predicate::str::contains("response_type=token"))
        .stderr(predicate::str::contains("No redirect URL provided"));
}

#[test]
fn test_login_completes_with_pasted_url() {
    let home = temp_home();
    let token = id_token(3600);

    deployboard(&home)
        .arg("login")
        .write_stdin(format!("{}\n", token_redirect(&token)))
        .assert()
        .success()
        .stdout(predicate::str::contains("Signed in as ops@example.com"));
}
