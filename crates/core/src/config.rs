use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::secret::SecretRef;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub github: GitHubConfig,
    pub slack: SlackConfig,
    pub enrichment: EnrichmentConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = BufReader::new(
            File::open(path)
                .with_context(|| format!("Failed to open config file {}", path.display()))?,
        );
        serde_yaml::from_reader(file)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GitHubConfig {
    pub app: GitHubAppConfig,
    /// Overrides the API base derived from the repository host.
    #[serde(default)]
    pub api_url: Option<Url>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GitHubAppConfig {
    pub id: u64,
    #[serde(with = "serde_yaml::with::singleton_map")]
    pub private_key: SecretRef,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SlackConfig {
    #[serde(default = "default_slack_api_url")]
    pub api_url: Url,
    #[serde(with = "serde_yaml::with::singleton_map")]
    pub bot_token: SecretRef,
}

fn default_slack_api_url() -> Url {
    Url::parse("https://slack.com/api").expect("static URL is valid")
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EnrichmentConfig {
    pub url: Url,
    pub tenant_ids: TenantIds,
}

/// Which channel/team identifiers are sent along with an enrichment request.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum TenantIds {
    /// Always send the configured identifiers, regardless of where the thread came from.
    Fixed { channel_id: String, team_id: String },
    /// Send the originating channel and the team reported by the chat platform.
    Dynamic,
}

/// Channel/team pair identifying the tenant an enrichment request is made for.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize)]
pub struct Tenant {
    pub channel_id: String,
    pub team_id: String,
}

impl TenantIds {
    pub fn select(&self, origin: &Tenant) -> Tenant {
        match self {
            Self::Fixed { channel_id, team_id } => {
                Tenant { channel_id: channel_id.clone(), team_id: team_id.clone() }
            }
            Self::Dynamic => origin.clone(),
        }
    }

    pub fn is_dynamic(&self) -> bool { matches!(self, Self::Dynamic) }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: default_timeout_secs(), user_agent: default_user_agent() }
    }
}

fn default_timeout_secs() -> u64 { 30 }

fn default_user_agent() -> String { concat!("issue-bridge/", env!("CARGO_PKG_VERSION")).to_string() }
