use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    config::GitHubAppConfig,
    error::WorkflowError,
    secret::{Secret, SecretProvider},
    util::split_assignees,
};

/// GitHub App identity used to sign app credentials. Loaded once per process.
#[derive(Debug, Clone)]
pub struct AppIdentity {
    pub app_id: u64,
    pub private_key: Secret,
}

impl AppIdentity {
    pub fn load(config: &GitHubAppConfig, secrets: &impl SecretProvider) -> Result<Self> {
        let private_key = secrets.resolve(&config.private_key)?;
        Ok(Self { app_id: config.id, private_key })
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstallationId(pub u64);

impl InstallationId {
    /// Sentinel for "the app has no installation covering this repository".
    pub const NOT_INSTALLED: Self = Self(0);

    pub fn is_installed(self) -> bool { self != Self::NOT_INSTALLED }
}

impl fmt::Display for InstallationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Installation {
    pub id: InstallationId,
    pub owner_login: String,
    pub repo_name: String,
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ThreadContext {
    pub channel: String,
    pub timestamp: String,
    pub text: String,
}

/// Suggested issue metadata. Both fields are empty when no suggestion is available.
#[derive(Debug, Clone, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct Suggestion {
    pub title: String,
    pub description: String,
}

/// Raw form fields as submitted by the user.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct IssueForm {
    pub url: String,
    pub title: String,
    pub description: String,
    /// Comma-separated GitHub usernames.
    pub assignees: String,
}

impl IssueForm {
    pub fn into_draft(self) -> Result<IssueDraft, WorkflowError> {
        IssueDraft::new(self.url, self.title, self.description, split_assignees(&self.assignees))
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct IssueDraft {
    pub title: String,
    pub description: String,
    pub assignees: Vec<String>,
    pub repository_url: String,
}

impl IssueDraft {
    pub fn new(
        repository_url: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        assignees: Vec<String>,
    ) -> Result<Self, WorkflowError> {
        let repository_url = repository_url.into().trim().to_string();
        let title = title.into().trim().to_string();
        if repository_url.is_empty() {
            return Err(WorkflowError::InvalidDraft("repository URL is required".into()));
        }
        if title.is_empty() {
            return Err(WorkflowError::InvalidDraft("title is required".into()));
        }
        Ok(Self { title, description: description.into(), assignees, repository_url })
    }

    pub fn repo(&self) -> Result<RepoRef, WorkflowError> {
        RepoRef::parse(&self.repository_url).ok_or_else(|| {
            WorkflowError::InvalidDraft(format!(
                "'{}' is not a repository URL",
                self.repository_url
            ))
        })
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct CreatedIssue {
    pub number: u64,
    pub url: String,
}

/// Repository on a GitHub (or GitHub Enterprise) host.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct RepoRef {
    pub host: String,
    pub owner: String,
    pub repo: String,
}

impl RepoRef {
    /// Parse `https://{host}/{owner}/{repo}[.git][/...]`.
    pub fn parse(url: &str) -> Option<Self> {
        let url = Url::parse(url.trim()).ok()?;
        if !matches!(url.scheme(), "http" | "https") {
            return None;
        }
        let host = url.host_str()?.to_ascii_lowercase();
        let mut segments = url.path_segments()?;
        let owner = segments.next().filter(|s| !s.is_empty())?;
        let repo = segments.next().map(|s| s.strip_suffix(".git").unwrap_or(s))?;
        if repo.is_empty() {
            return None;
        }
        Some(Self { host, owner: owner.to_string(), repo: repo.to_string() })
    }

    /// REST API base for the repository's host.
    pub fn api_base(&self) -> String {
        if self.host == "github.com" || self.host == "www.github.com" {
            "https://api.github.com".to_string()
        } else {
            format!("https://{}/api/v3", self.host)
        }
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}
