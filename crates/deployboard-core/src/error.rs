use crate::jobs::status::ClassifyError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("malformed credential: {0}")]
    MalformedCredential(String),
    #[error("no valid session")]
    NoSession,
    #[error("identity provider returned an error: {error}")]
    Redirect {
        error: String,
        description: Option<String>,
    },
    #[error("sign-in failed: {0}")]
    SignIn(String),
    #[error(transparent)]
    Classify(#[from] ClassifyError),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API request failed (HTTP {status}): {body}")]
    Api { status: u16, body: String },
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("session store: {0:#}")]
    Store(anyhow::Error),
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    /// Returns true for failures worth retrying on the next poll tick:
    /// transport errors and 5xx responses.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Http(_) => true,
            Error::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_errors_are_transient() {
        let err = Error::Api {
            status: 503,
            body: "unavailable".to_string(),
        };
        assert!(err.is_transient());

        let err = Error::Api {
            status: 403,
            body: "forbidden".to_string(),
        };
        assert!(!err.is_transient());
        assert!(!Error::NoSession.is_transient());
    }
}
