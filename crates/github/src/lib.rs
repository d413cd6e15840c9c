pub mod installation;
pub mod issues;
pub mod jwt;
pub mod token;

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use http::{
    Uri,
    header::{ACCEPT, HeaderName},
};
use issue_bridge_core::{
    config::{GitHubConfig, HttpConfig},
    models::{AppIdentity, RepoRef},
};
use octocrab::{Octocrab, service::middleware::retry::RetryConfig};
use time::UtcDateTime;

pub use token::InstallationClient;

pub const API_VERSION: &str = "2022-11-28";

type Clock = Arc<dyn Fn() -> UtcDateTime + Send + Sync>;

/// GitHub App access. Holds only immutable, process-wide state; every workflow run
/// authenticates on its own through [`GitHub::authenticate`].
#[derive(Clone)]
pub struct GitHub {
    identity: Arc<AppIdentity>,
    api_url: Option<String>,
    timeout: Duration,
    clock: Clock,
}

impl GitHub {
    pub fn new(
        config: &GitHubConfig,
        http_config: &HttpConfig,
        identity: Arc<AppIdentity>,
    ) -> Result<Self> {
        let api_url =
            config.api_url.as_ref().map(|url| url.as_str().trim_end_matches('/').to_string());
        if let Some(api_url) = &api_url {
            api_url.parse::<Uri>().with_context(|| format!("Invalid GitHub API URL {api_url}"))?;
        }
        Ok(Self {
            identity,
            api_url,
            timeout: Duration::from_secs(http_config.timeout_secs.max(1)),
            clock: Arc::new(UtcDateTime::now),
        })
    }

    /// Replace the time source used to sign and check app credentials.
    pub fn with_clock(mut self, clock: impl Fn() -> UtcDateTime + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn app_id(&self) -> u64 { self.identity.app_id }

    fn now(&self) -> UtcDateTime { (self.clock)() }

    fn api_base(&self, repo: &RepoRef) -> String {
        self.api_url.clone().unwrap_or_else(|| repo.api_base())
    }

    /// Client for `repo`'s API host, authenticated with a bearer `token` (an app credential or an
    /// installation token). Requests are never retried.
    fn client(&self, repo: &RepoRef, token: &str) -> Result<Octocrab> {
        Octocrab::builder()
            .base_uri(self.api_base(repo))
            .context("Invalid GitHub API base")?
            .personal_token(token.to_string())
            .add_header(ACCEPT, "application/vnd.github+json".to_string())
            .add_header(HeaderName::from_static("x-github-api-version"), API_VERSION.to_string())
            .add_retry_config(RetryConfig::None)
            .set_connect_timeout(Some(self.timeout))
            .set_read_timeout(Some(self.timeout))
            .build()
            .context("Failed to create GitHub client")
    }
}
