use anyhow::anyhow;
use http::StatusCode;
use issue_bridge_core::{
    error::WorkflowError,
    models::{Installation, InstallationId, RepoRef},
    util::truncate_for_error,
};
use octocrab::GitHubError;
use serde::Deserialize;

use crate::{
    GitHub,
    jwt::{SignedAssertion, sign},
};

#[derive(Debug, Deserialize)]
struct InstallationResponse {
    id: u64,
    #[serde(default)]
    account: Option<Account>,
}

#[derive(Debug, Deserialize)]
struct Account {
    login: String,
}

impl GitHub {
    /// Sign a fresh app credential and look up the installation for `repo`.
    pub async fn find_installation(&self, repo: &RepoRef) -> Result<Installation, WorkflowError> {
        let assertion = sign(&self.identity, self.now())?;
        self.resolve_installation(&assertion, repo).await
    }

    /// Look up the installation covering `repo`. A 404 is not an error: it resolves to
    /// [`InstallationId::NOT_INSTALLED`].
    pub async fn resolve_installation(
        &self,
        assertion: &SignedAssertion,
        repo: &RepoRef,
    ) -> Result<Installation, WorkflowError> {
        let client = self.client(repo, assertion.token()).map_err(WorkflowError::Resolution)?;
        let route = format!("/repos/{}/{}/installation", repo.owner, repo.repo);
        let body: InstallationResponse = match client.get(route, None::<&()>).await {
            Ok(body) => body,
            Err(octocrab::Error::GitHub { source, .. })
                if matches!(*source, GitHubError { status_code: StatusCode::NOT_FOUND, .. }) =>
            {
                tracing::info!("App {} is not installed for {}", self.app_id(), repo);
                return Ok(Installation {
                    id: InstallationId::NOT_INSTALLED,
                    owner_login: repo.owner.clone(),
                    repo_name: repo.repo.clone(),
                });
            }
            Err(octocrab::Error::GitHub { source, .. }) => {
                return Err(WorkflowError::Resolution(anyhow!(
                    "GitHub returned {} for {}: {}",
                    source.status_code,
                    repo,
                    truncate_for_error(&source.message, 320)
                )));
            }
            Err(e) => {
                return Err(WorkflowError::Resolution(
                    anyhow::Error::from(e)
                        .context(format!("Installation lookup for {repo} failed")),
                ));
            }
        };
        if body.id == 0 {
            return Err(WorkflowError::Resolution(anyhow!(
                "GitHub returned installation ID 0 for {repo}"
            )));
        }
        tracing::debug!("Resolved installation {} for {}", body.id, repo);
        Ok(Installation {
            id: InstallationId(body.id),
            owner_login: body.account.map(|a| a.login).unwrap_or_else(|| repo.owner.clone()),
            repo_name: repo.repo.clone(),
        })
    }
}
