//! Identity-token decoding.
//!
//! Only the payload segment is read. Signatures are never checked here: the
//! API verifies the token on every authenticated call, and the client trusts
//! `exp` solely to decide whether to show the login view.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Claims carried in the identity token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "sub")]
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "exp")]
    pub expiry_epoch_seconds: i64,
    #[serde(
        rename = "cognito:username",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub username: Option<String>,
}

impl Claims {
    /// Returns true if the token is still valid at `now_millis` (ms since epoch).
    pub fn is_valid_at(&self, now_millis: i64) -> bool {
        self.expiry_epoch_seconds.saturating_mul(1000) > now_millis
    }

    /// Returns true if the token has not expired yet.
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(now_millis())
    }
}

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Decodes the claims of a `header.payload.signature` token.
///
/// # Errors
/// Returns `Error::MalformedCredential` if the token does not have three
/// non-empty segments, the payload is not base64url, or it is not a JSON
/// object carrying `sub` and `exp`.
pub fn decode(token: &str) -> Result<Claims> {
    let segments: Vec<&str> = token.trim().split('.').collect();
    if segments.len() != 3 || segments.iter().any(|s| s.is_empty()) {
        return Err(Error::MalformedCredential(format!(
            "expected 3 segments, got {}",
            segments.len()
        )));
    }

    let payload = URL_SAFE_NO_PAD
        .decode(segments[1].trim_end_matches('='))
        .map_err(|e| Error::MalformedCredential(format!("payload is not base64url: {e}")))?;

    serde_json::from_slice(&payload)
        .map_err(|e| Error::MalformedCredential(format!("payload is not valid claims JSON: {e}")))
}

#[cfg(test)]
pub(crate) fn test_token(payload: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","kid":"test"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{header}.{body}.c2lnbmF0dXJl")
}

#[cfg(test)]
pub(crate) fn token_expiring_in(seconds: i64) -> String {
    let exp = chrono::Utc::now().timestamp() + seconds;
    test_token(&serde_json::json!({
        "sub": "user-123",
        "email": "ops@example.com",
        "exp": exp,
        "cognito:username": "ops",
    }))
}
