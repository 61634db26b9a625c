//! Authentication session.
//!
//! The session is derived from the stored identity token on every query: there
//! is no cached "logged in" flag and no network round-trip. An expired or
//! undecodable token is simply treated as absent.

use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use tracing::{debug, info, warn};

pub mod callback;
pub mod hosted_ui;
pub mod navigator;
pub mod store;
pub mod token;

pub use callback::{CallbackHandler, CallbackOutcome, RedirectPayload};
pub use hosted_ui::{HostedUi, RedirectTokens};
pub use navigator::{Location, Navigator, RecordingNavigator};
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use token::Claims;

use crate::error::{Error, Result};
use crate::logging::mask_token;

/// Store key for the identity token.
pub const ID_TOKEN_KEY: &str = "id_token";
/// Store key for the access token.
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// A stored credential together with its decoded claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub id_token: String,
    pub access_token: String,
    pub claims: Claims,
}

impl Credential {
    pub fn is_valid(&self) -> bool {
        self.claims.is_valid()
    }
}

/// Owns credential storage and the sign-in/sign-out redirects.
///
/// Construct one per application and share it (`Arc`) with everything that
/// needs auth headers or the current user.
pub struct AuthSession {
    hosted_ui: HostedUi,
    store: Arc<dyn KeyValueStore>,
    navigator: Arc<dyn Navigator>,
}

impl AuthSession {
    pub fn new(
        hosted_ui: HostedUi,
        store: Arc<dyn KeyValueStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            hosted_ui,
            store,
            navigator,
        }
    }

    pub fn hosted_ui(&self) -> &HostedUi {
        &self.hosted_ui
    }

    /// Sends the user to the identity provider's authorize page.
    ///
    /// # Errors
    /// Returns an error only if the authorize URL cannot be built from config.
    pub fn sign_in(&self) -> Result<()> {
        let url = self.hosted_ui.authorize_url()?;
        info!(flow = ?self.hosted_ui.flow(), "redirecting to identity provider");
        self.navigator.navigate(Location::External(url));
        Ok(())
    }

    /// Persists tokens delivered by a successful redirect.
    ///
    /// # Errors
    /// Returns `Error::MalformedCredential` if either token is empty and
    /// `Error::Store` if the store rejects the write.
    pub fn handle_redirect_tokens(&self, id_token: &str, access_token: &str) -> Result<()> {
        if id_token.trim().is_empty() || access_token.trim().is_empty() {
            return Err(Error::MalformedCredential(
                "redirect tokens must not be empty".to_string(),
            ));
        }

        self.store.set(ID_TOKEN_KEY, id_token).map_err(Error::Store)?;
        self.store
            .set(ACCESS_TOKEN_KEY, access_token)
            .map_err(Error::Store)?;
        info!(id_token = %mask_token(id_token), "stored session tokens");
        Ok(())
    }

    /// Clears the stored credential, then sends the user to the provider's
    /// logout page. Safe to call when already signed out.
    ///
    /// # Errors
    /// Returns `Error::Store` if clearing fails; in that case no navigation
    /// happens. Returns a URL error if the logout URL cannot be built (the
    /// credential is already cleared by then).
    pub fn sign_out(&self) -> Result<()> {
        let cleared_id = self.store.remove(ID_TOKEN_KEY);
        let cleared_access = self.store.remove(ACCESS_TOKEN_KEY);
        cleared_id.and(cleared_access).map_err(Error::Store)?;
        debug!("cleared session tokens");

        let url = self.hosted_ui.logout_url()?;
        self.navigator.navigate(Location::External(url));
        Ok(())
    }

    /// True if a stored identity token decodes and has not expired.
    pub fn is_authenticated(&self) -> bool {
        self.stored_claims().is_some_and(|claims| claims.is_valid())
    }

    /// Claims of the stored identity token.
    ///
    /// # Errors
    /// Returns `Error::NoSession` if there is no token or it does not decode.
    pub fn current_user(&self) -> Result<Claims> {
        self.stored_claims().ok_or(Error::NoSession)
    }

    /// The full stored credential, if both tokens are present and the
    /// identity token decodes. Expiry is not checked.
    pub fn credential(&self) -> Option<Credential> {
        let id_token = self.read(ID_TOKEN_KEY)?;
        let access_token = self.read(ACCESS_TOKEN_KEY)?;
        let claims = token::decode(&id_token).ok()?;
        Some(Credential {
            id_token,
            access_token,
            claims,
        })
    }

    /// Request headers for the jobs API.
    ///
    /// Always carries the JSON content type; adds the bearer token only while
    /// authenticated.
    pub fn auth_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let Some(id_token) = self.read(ID_TOKEN_KEY) else {
            return headers;
        };
        let valid = token::decode(&id_token).is_ok_and(|claims| claims.is_valid());
        if !valid {
            return headers;
        }

        match HeaderValue::from_str(&format!("Bearer {id_token}")) {
            Ok(value) => {
                headers.insert(AUTHORIZATION, value);
            }
            Err(_) => warn!("stored id token is not a valid header value"),
        }
        headers
    }

    pub(crate) fn navigate(&self, location: Location) {
        self.navigator.navigate(location);
    }

    fn stored_claims(&self) -> Option<Claims> {
        let id_token = self.read(ID_TOKEN_KEY)?;
        match token::decode(&id_token) {
            Ok(claims) => Some(claims),
            Err(err) => {
                debug!("ignoring stored id token: {err}");
                None
            }
        }
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(err) => {
                warn!("failed to read {key} from session store: {err:#}");
                None
            }
        }
    }
}
