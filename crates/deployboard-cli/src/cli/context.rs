//! Shared state for command handlers.

use std::sync::Arc;

use anyhow::{Context, Result};
use deployboard_core::auth::{AuthSession, FileStore, HostedUi, Location, Navigator};
use deployboard_core::config::Config;
use deployboard_core::jobs::JobsClient;
use tracing::debug;

const NO_BROWSER_ENV: &str = "DEPLOYBOARD_NO_BROWSER";

/// Prints identity-provider URLs and opens them in the system browser.
pub struct SystemNavigator {
    open_browser: bool,
}

impl SystemNavigator {
    pub fn from_env() -> Self {
        Self {
            open_browser: std::env::var_os(NO_BROWSER_ENV).is_none(),
        }
    }
}

impl Navigator for SystemNavigator {
    fn navigate(&self, location: Location) {
        match location {
            Location::External(url) => {
                println!("Continue in your browser:");
                println!("  {url}");
                println!();
                if self.open_browser
                    && let Err(e) = open::that(url.as_str())
                {
                    debug!("failed to open browser: {e}");
                }
            }
            Location::Root => debug!("returning to application root"),
        }
    }
}

pub struct App {
    pub config: Config,
    pub session: Arc<AuthSession>,
}

impl App {
    pub fn new(config: Config) -> Self {
        let session = AuthSession::new(
            HostedUi::new(config.auth.clone()),
            Arc::new(FileStore::open_default()),
            Arc::new(SystemNavigator::from_env()),
        );
        Self {
            config,
            session: Arc::new(session),
        }
    }

    /// Jobs API client for an authenticated session.
    ///
    /// Fails with the login hint when there is no valid session.
    pub fn jobs_client(&self) -> Result<JobsClient> {
        if !self.session.is_authenticated() {
            anyhow::bail!("Not signed in. Run `deployboard login` first.");
        }
        let base_url = self.config.api_base_url().context("resolve jobs API URL")?;
        Ok(JobsClient::new(base_url, Arc::clone(&self.session)))
    }
}
