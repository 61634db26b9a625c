//! Configuration management for deployboard.
//!
//! Loads configuration from ${DEPLOYBOARD_HOME}/config.toml with sensible defaults,
//! then applies `DEPLOYBOARD_*` environment overrides.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

pub mod paths {
    //! Path resolution for deployboard configuration and data directories.
    //!
    //! DEPLOYBOARD_HOME resolution order:
    //! 1. DEPLOYBOARD_HOME environment variable (if set)
    //! 2. ~/.config/deployboard (default)

    use std::path::PathBuf;

    /// Returns the deployboard home directory.
    ///
    /// Checks DEPLOYBOARD_HOME env var first, falls back to ~/.config/deployboard,
    /// and to a relative `.deployboard` when no home directory is known.
    pub fn deployboard_home() -> PathBuf {
        if let Ok(home) = std::env::var("DEPLOYBOARD_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir().map_or_else(
            || PathBuf::from(".deployboard"),
            |h| h.join(".config").join("deployboard"),
        )
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        deployboard_home().join("config.toml")
    }

    /// Returns the path to the persisted session store.
    pub fn session_path() -> PathBuf {
        deployboard_home().join("session.json")
    }

    /// Returns the directory holding rolling log files.
    pub fn logs_dir() -> PathBuf {
        deployboard_home().join("logs")
    }
}

/// Which OAuth redirect shape this deployment uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OAuthFlow {
    /// Tokens arrive directly in the redirect fragment.
    #[default]
    Implicit,
    /// An authorization code arrives in the query and is exchanged at the token endpoint.
    Code,
}

impl OAuthFlow {
    /// The `response_type` sent to the authorize endpoint.
    pub fn response_type(self) -> &'static str {
        match self {
            OAuthFlow::Implicit => "token",
            OAuthFlow::Code => "code",
        }
    }
}

/// Hosted identity-provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Hosted UI domain, e.g. `myapp.auth.us-east-1.amazoncognito.com`.
    pub domain: String,
    /// Public OAuth client id.
    pub client_id: String,
    /// User pool id (informational only).
    pub user_pool_id: Option<String>,
    /// Deployment origin; the redirect target is `{origin}/callback`.
    pub origin: String,
    /// Redirect flow for this deployment.
    pub flow: OAuthFlow,
}

impl AuthConfig {
    const DEFAULT_ORIGIN: &str = "http://localhost:3000";
    pub const CALLBACK_PATH: &str = "/callback";

    /// Base URL of the identity provider.
    ///
    /// A domain with an explicit scheme is used verbatim; otherwise `https://` is assumed.
    ///
    /// # Errors
    /// Returns an error if the domain does not form a valid URL.
    pub fn idp_base_url(&self) -> Result<Url, url::ParseError> {
        let domain = self.domain.trim().trim_end_matches('/');
        if domain.starts_with("http://") || domain.starts_with("https://") {
            Url::parse(domain)
        } else {
            Url::parse(&format!("https://{domain}"))
        }
    }

    /// The deployment origin as a URL (always ending with `/`).
    ///
    /// # Errors
    /// Returns an error if `origin` is not a valid URL.
    pub fn origin_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.origin)?.join("/")
    }

    /// Sign-out return URI: the configured origin exactly as written.
    ///
    /// The identity provider matches this against the registered sign-out URL
    /// character for character, so no trailing `/` is added.
    ///
    /// # Errors
    /// Returns an error if `origin` is not a valid URL.
    pub fn logout_uri(&self) -> Result<String, url::ParseError> {
        let origin = self.origin.trim();
        Url::parse(origin)?;
        Ok(origin.to_string())
    }

    /// Redirect URI registered with the identity provider.
    ///
    /// # Errors
    /// Returns an error if `origin` is not a valid URL.
    pub fn redirect_uri(&self) -> Result<Url, url::ParseError> {
        self.origin_url()?.join(Self::CALLBACK_PATH)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            domain: String::new(),
            client_id: String::new(),
            user_pool_id: None,
            origin: Self::DEFAULT_ORIGIN.to_string(),
            flow: OAuthFlow::default(),
        }
    }
}

/// Poll periods for the job views.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Period for refreshing the job collection.
    pub jobs_interval_secs: u64,
    /// Period for refreshing a single job.
    pub job_interval_secs: u64,
    /// Consecutive failed ticks before a soft warning is shown.
    pub failure_warning_threshold: u32,
}

impl PollingConfig {
    pub fn jobs_interval(&self) -> Duration {
        Duration::from_secs(self.jobs_interval_secs.max(1))
    }

    pub fn job_interval(&self) -> Duration {
        Duration::from_secs(self.job_interval_secs.max(1))
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            jobs_interval_secs: 10,
            job_interval_secs: 5,
            failure_warning_threshold: 3,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the jobs REST API.
    pub api_base_url: String,

    /// Identity provider configuration.
    pub auth: AuthConfig,

    /// Polling configuration.
    pub polling: PollingConfig,
}

impl Config {
    const DEFAULT_API_BASE_URL: &str =
        "https://your-api-id.execute-api.us-east-1.amazonaws.com/prod";

    /// Loads configuration from the default config path.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist. Environment overrides are applied last.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))?
        } else {
            Config::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Applies `DEPLOYBOARD_*` overrides using the given variable lookup.
    pub fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty("DEPLOYBOARD_API_URL") {
            self.api_base_url = v;
        }
        if let Some(v) = non_empty("DEPLOYBOARD_CLIENT_ID") {
            self.auth.client_id = v;
        }
        if let Some(v) = non_empty("DEPLOYBOARD_AUTH_DOMAIN") {
            self.auth.domain = v;
        }
        if let Some(v) = non_empty("DEPLOYBOARD_USER_POOL_ID") {
            self.auth.user_pool_id = Some(v);
        }
        if let Some(v) = non_empty("DEPLOYBOARD_ORIGIN") {
            self.auth.origin = v;
        }
    }

    /// Parses the API base URL.
    ///
    /// # Errors
    /// Returns an error if `api_base_url` is not a valid URL.
    pub fn api_base_url(&self) -> Result<Url> {
        Url::parse(&self.api_base_url)
            .with_context(|| format!("Invalid api_base_url '{}'", self.api_base_url))
    }

    /// Creates a default config file at the given path.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be written.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    /// Writes config content to a file, creating parent directories as needed.
    /// Uses atomic write (temp file + rename) to prevent corruption.
    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: Self::DEFAULT_API_BASE_URL.to_string(),
            auth: AuthConfig::default(),
            polling: PollingConfig::default(),
        }
    }
}

/// Returns the default config template with comments.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config.polling.jobs_interval(), Duration::from_secs(10));
        assert_eq!(config.polling.job_interval(), Duration::from_secs(5));
        assert_eq!(config.auth.flow, OAuthFlow::Implicit);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "api_base_url = \"https://api.example.com/prod\"\n[auth]\nflow = \"code\"\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.api_base_url, "https://api.example.com/prod");
        assert_eq!(config.auth.flow, OAuthFlow::Code);
        assert_eq!(config.auth.origin, "http://localhost:3000");
        assert_eq!(config.polling.failure_warning_threshold, 3);
    }

    #[test]
    fn test_unknown_flow_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[auth]\nflow = \"hybrid\"\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config"));
    }

    #[test]
    fn test_env_overrides_skip_empty_values() {
        let vars: HashMap<&str, &str> = [
            ("DEPLOYBOARD_API_URL", "https://override.example.com"),
            ("DEPLOYBOARD_CLIENT_ID", "  "),
            ("DEPLOYBOARD_AUTH_DOMAIN", "login.example.com"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.auth.client_id = "from-file".to_string();
        config.apply_env_overrides(|key| vars.get(key).map(|v| (*v).to_string()));

        assert_eq!(config.api_base_url, "https://override.example.com");
        assert_eq!(config.auth.client_id, "from-file");
        assert_eq!(config.auth.domain, "login.example.com");
    }

    #[test]
    fn test_redirect_uri_from_origin() {
        let auth = AuthConfig {
            origin: "https://dashboard.example.com/some/page".to_string(),
            ..AuthConfig::default()
        };
        assert_eq!(
            auth.redirect_uri().unwrap().as_str(),
            "https://dashboard.example.com/callback"
        );
        assert_eq!(
            auth.origin_url().unwrap().as_str(),
            "https://dashboard.example.com/"
        );
    }

    #[test]
    fn test_logout_uri_keeps_origin_as_written() {
        let mut auth = AuthConfig {
            origin: "https://dashboard.example.com".to_string(),
            ..AuthConfig::default()
        };
        assert_eq!(auth.logout_uri().unwrap(), "https://dashboard.example.com");

        auth.origin = "http://localhost:3000/".to_string();
        assert_eq!(auth.logout_uri().unwrap(), "http://localhost:3000/");

        auth.origin = "not a url".to_string();
        assert!(auth.logout_uri().is_err());
    }

    #[test]
    fn test_idp_base_url_scheme_handling() {
        let mut auth = AuthConfig {
            domain: "myapp.auth.us-east-1.amazoncognito.com".to_string(),
            ..AuthConfig::default()
        };
        assert_eq!(
            auth.idp_base_url().unwrap().as_str(),
            "https://myapp.auth.us-east-1.amazoncognito.com/"
        );

        auth.domain = "http://127.0.0.1:9000/".to_string();
        assert_eq!(auth.idp_base_url().unwrap().as_str(), "http://127.0.0.1:9000/");
    }

    #[test]
    fn test_init_writes_template_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        Config::init(&path).unwrap();
        let parsed = Config::load_from(&path).unwrap();
        assert_eq!(parsed.polling.jobs_interval_secs, 10);

        let err = Config::init(&path).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }
}
