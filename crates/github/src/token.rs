use std::fmt;

use anyhow::{Result, anyhow};
use issue_bridge_core::{
    error::{AuthenticationFailure, WorkflowError},
    models::{Installation, InstallationId, RepoRef},
    secret::Secret,
    util::truncate_for_error,
};
use octocrab::Octocrab;
use serde::Deserialize;
use time::OffsetDateTime;

use crate::{
    GitHub,
    jwt::{SignedAssertion, sign},
};

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    token: String,
    #[serde(with = "time::serde::rfc3339")]
    expires_at: OffsetDateTime,
}

#[derive(Debug)]
pub struct InstallationToken {
    token: Secret,
    pub expires_at: OffsetDateTime,
}

impl InstallationToken {
    pub fn expose(&self) -> &str { self.token.expose() }
}

/// Client authenticated as a single installation. Built for one workflow run and dropped
/// with it; it is intentionally not `Clone`.
pub struct InstallationClient {
    pub(crate) client: Octocrab,
    installation: Installation,
    pub(crate) token: InstallationToken,
}

impl InstallationClient {
    pub fn installation(&self) -> &Installation { &self.installation }

    pub fn token_expires_at(&self) -> OffsetDateTime { self.token.expires_at }
}

impl fmt::Debug for InstallationClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstallationClient")
            .field("installation", &self.installation)
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

impl GitHub {
    /// Sign an app credential, resolve the installation for `repo` and exchange it for an
    /// installation token. Either every step succeeds or no client is returned.
    pub async fn authenticate(&self, repo: &RepoRef) -> Result<InstallationClient, WorkflowError> {
        let assertion = sign(&self.identity, self.now())?;
        let installation = self.resolve_installation(&assertion, repo).await?;
        if !installation.id.is_installed() {
            return Err(AuthenticationFailure::NotInstalled {
                owner: repo.owner.clone(),
                repo: repo.repo.clone(),
            }
            .into());
        }
        if !assertion.is_valid_at(self.now()) {
            return Err(AuthenticationFailure::AssertionExpired.into());
        }
        let token = self
            .exchange_token(&assertion, repo, installation.id)
            .await
            .map_err(AuthenticationFailure::TokenExchange)?;
        let client = self.client(repo, token.expose()).map_err(AuthenticationFailure::TokenExchange)?;
        tracing::info!("Authenticated as installation {} for {}", installation.id, repo);
        Ok(InstallationClient { client, installation, token })
    }

    async fn exchange_token(
        &self,
        assertion: &SignedAssertion,
        repo: &RepoRef,
        installation_id: InstallationId,
    ) -> Result<InstallationToken> {
        let client = self.client(repo, assertion.token())?;
        let route = format!("/app/installations/{installation_id}/access_tokens");
        let body: AccessTokenResponse = match client.post(route, None::<&()>).await {
            Ok(body) => body,
            Err(octocrab::Error::GitHub { source, .. }) => {
                return Err(anyhow!(
                    "GitHub returned {} for installation {}: {}",
                    source.status_code,
                    installation_id,
                    truncate_for_error(&source.message, 320)
                ));
            }
            Err(e) => return Err(anyhow::Error::from(e).context("Token exchange request failed")),
        };
        tracing::debug!("Installation {} token expires at {}", installation_id, body.expires_at);
        Ok(InstallationToken { token: Secret::new(body.token), expires_at: body.expires_at })
    }
}
