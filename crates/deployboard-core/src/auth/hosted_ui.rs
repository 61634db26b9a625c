//! Hosted identity-provider endpoints: authorize, logout, token exchange.

use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::config::{AuthConfig, OAuthFlow};
use crate::error::{Error, Result};

const SCOPES: &str = "openid email profile";
const AUTHORIZE_PATH: &str = "oauth2/authorize";
const TOKEN_PATH: &str = "oauth2/token";
const LOGOUT_PATH: &str = "logout";

/// Tokens handed back by the identity provider after sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RedirectTokens {
    pub id_token: String,
    pub access_token: String,
}

/// Client for the identity provider's hosted UI.
#[derive(Debug, Clone)]
pub struct HostedUi {
    config: AuthConfig,
    http: reqwest::Client,
}

impl HostedUi {
    pub fn new(config: AuthConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn flow(&self) -> OAuthFlow {
        self.config.flow
    }

    /// Authorize URL for the configured flow.
    ///
    /// # Errors
    /// Returns an error if the domain or origin is not a valid URL.
    pub fn authorize_url(&self) -> Result<Url> {
        let redirect_uri = self.config.redirect_uri()?;
        let mut url = self.config.idp_base_url()?.join(AUTHORIZE_PATH)?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("response_type", self.config.flow.response_type())
            .append_pair("scope", SCOPES)
            .append_pair("redirect_uri", redirect_uri.as_str());
        Ok(url)
    }

    /// Logout URL returning the user to the deployment origin.
    ///
    /// # Errors
    /// Returns an error if the domain or origin is not a valid URL.
    pub fn logout_url(&self) -> Result<Url> {
        let logout_uri = self.config.logout_uri()?;
        let mut url = self.config.idp_base_url()?.join(LOGOUT_PATH)?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("logout_uri", &logout_uri);
        Ok(url)
    }

    /// Exchanges an authorization code for tokens.
    ///
    /// # Errors
    /// Returns an error if the request fails, the endpoint answers with a
    /// non-2xx status, or the response lacks either token.
    pub async fn exchange_code(&self, code: &str) -> Result<RedirectTokens> {
        let redirect_uri = self.config.redirect_uri()?;
        let token_url = self.config.idp_base_url()?.join(TOKEN_PATH)?;
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", "authorization_code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("code", code)
            .append_pair("redirect_uri", redirect_uri.as_str())
            .finish();

        debug!(url = %token_url, "exchanging authorization code");
        let response = self
            .http
            .post(token_url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api { status, body });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
