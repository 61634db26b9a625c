//! One-shot handling of the identity provider's redirect to `/callback`.
//!
//! Precedence: an `error` parameter wins, then tokens in the fragment
//! (implicit flow), then a `code` in the query (code flow). Anything else is
//! treated as a callback without a credential. Every path ends at the
//! application root.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};
use url::Url;

use super::hosted_ui::RedirectTokens;
use super::navigator::Location;
use super::AuthSession;
use crate::config::OAuthFlow;
use crate::error::{Error, Result};

/// What a redirect URL carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectPayload {
    Error {
        error: String,
        description: Option<String>,
    },
    Tokens(RedirectTokens),
    Code(String),
    Empty,
}

impl RedirectPayload {
    /// Flow this payload shape belongs to, if any.
    pub fn flow(&self) -> Option<OAuthFlow> {
        match self {
            RedirectPayload::Tokens(_) => Some(OAuthFlow::Implicit),
            RedirectPayload::Code(_) => Some(OAuthFlow::Code),
            RedirectPayload::Error { .. } | RedirectPayload::Empty => None,
        }
    }
}

/// Reads the redirect parameters from both the fragment and the query.
pub fn parse_redirect(url: &Url) -> RedirectPayload {
    let fragment: Vec<(String, String)> = url
        .fragment()
        .map(|f| {
            url::form_urlencoded::parse(f.as_bytes())
                .into_owned()
                .collect()
        })
        .unwrap_or_default();
    let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();

    let lookup = |params: &[(String, String)], key: &str| {
        params
            .iter()
            .find(|(k, v)| k == key && !v.trim().is_empty())
            .map(|(_, v)| v.clone())
    };
    let either = |key: &str| lookup(&fragment, key).or_else(|| lookup(&query, key));

    if let Some(error) = either("error") {
        return RedirectPayload::Error {
            error,
            description: either("error_description"),
        };
    }

    if let (Some(id_token), Some(access_token)) = (
        lookup(&fragment, "id_token"),
        lookup(&fragment, "access_token"),
    ) {
        return RedirectPayload::Tokens(RedirectTokens {
            id_token,
            access_token,
        });
    }

    if let Some(code) = lookup(&query, "code") {
        return RedirectPayload::Code(code);
    }

    RedirectPayload::Empty
}

/// Terminal state of the callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    SignedIn,
    Rejected {
        error: String,
        description: Option<String>,
    },
    Failed(String),
    NoCredential,
}

impl CallbackOutcome {
    /// Converts a non-success outcome into the matching error.
    ///
    /// # Errors
    /// Returns `Error::Redirect`, `Error::SignIn` or `Error::NoSession`
    /// for anything other than `SignedIn`.
    pub fn into_result(self) -> Result<()> {
        match self {
            CallbackOutcome::SignedIn => Ok(()),
            CallbackOutcome::Rejected { error, description } => {
                Err(Error::Redirect { error, description })
            }
            CallbackOutcome::Failed(reason) => Err(Error::SignIn(reason)),
            CallbackOutcome::NoCredential => Err(Error::NoSession),
        }
    }
}

/// Runs the redirect state machine at most once.
///
/// Re-invoking `handle` (e.g. the same URL delivered twice) returns the first
/// outcome without persisting or navigating again.
pub struct CallbackHandler {
    session: Arc<AuthSession>,
    outcome: OnceCell<CallbackOutcome>,
}

impl CallbackHandler {
    pub fn new(session: Arc<AuthSession>) -> Self {
        Self {
            session,
            outcome: OnceCell::new(),
        }
    }

    /// Outcome of the first `handle` call, if it has completed.
    pub fn outcome(&self) -> Option<&CallbackOutcome> {
        self.outcome.get()
    }

    pub async fn handle(&self, url: &Url) -> CallbackOutcome {
        if let Some(outcome) = self.outcome.get() {
            debug!("callback already handled");
            return outcome.clone();
        }

        self.outcome
            .get_or_init(|| async {
                let outcome = self.process(parse_redirect(url)).await;
                self.session.navigate(Location::Root);
                outcome
            })
            .await
            .clone()
    }

    async fn process(&self, payload: RedirectPayload) -> CallbackOutcome {
        let configured = self.session.hosted_ui().flow();
        if let Some(flow) = payload.flow()
            && flow != configured
        {
            warn!(
                ?configured,
                received = ?flow,
                "callback shape does not match the configured flow"
            );
        }

        match payload {
            RedirectPayload::Error { error, description } => {
                error!(
                    error = %error,
                    description = description.as_deref().unwrap_or(""),
                    "authentication error"
                );
                CallbackOutcome::Rejected { error, description }
            }
            RedirectPayload::Tokens(tokens) => self.persist(&tokens),
            RedirectPayload::Code(code) => {
                match self.session.hosted_ui().exchange_code(&code).await {
                    Ok(tokens) => self.persist(&tokens),
                    Err(err) => {
                        error!("authorization code exchange failed: {err}");
                        CallbackOutcome::Failed(err.to_string())
                    }
                }
            }
            RedirectPayload::Empty => {
                error!("no credential in callback");
                CallbackOutcome::NoCredential
            }
        }
    }

    fn persist(&self, tokens: &RedirectTokens) -> CallbackOutcome {
        match self
            .session
            .handle_redirect_tokens(&tokens.id_token, &tokens.access_token)
        {
            Ok(()) => {
                info!("sign-in complete");
                CallbackOutcome::SignedIn
            }
            Err(err) => {
                error!("failed to store tokens: {err}");
                CallbackOutcome::Failed(err.to_string())
            }
        }
    }
}
