//! Seams between the pipeline and the outside world. The production implementations live here
//! too; tests substitute their own.

use async_trait::async_trait;
use issue_bridge_core::{
    config::Tenant,
    error::{StageFailure, WorkflowError},
    models::{CreatedIssue, IssueDraft, IssueForm, Suggestion, ThreadContext},
};
use issue_bridge_enrich::EnrichmentClient;
use issue_bridge_github::GitHub;
use issue_bridge_slack::SlackClient;

/// Values offered to the user when the issue form opens.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct FormPrefill {
    pub thread: String,
    pub title: String,
    pub description: String,
}

#[async_trait]
pub trait ThreadSource: Send + Sync {
    async fn fetch(&self, channel: &str, reference_ts: &str) -> Result<ThreadContext, StageFailure>;

    async fn team_id(&self) -> Result<String, StageFailure>;
}

#[async_trait]
pub trait Enricher: Send + Sync {
    async fn suggest(&self, raw_text: &str, tenant: &Tenant) -> Result<Suggestion, StageFailure>;
}

#[async_trait]
pub trait InputCollector: Send + Sync {
    async fn collect(&self, prefill: &FormPrefill) -> Result<IssueForm, WorkflowError>;
}

#[async_trait]
pub trait IssueTracker: Send + Sync {
    async fn create_issue(&self, draft: IssueDraft) -> Result<CreatedIssue, WorkflowError>;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, channel: &str, thread_ts: &str, text: &str) -> anyhow::Result<()>;
}

#[async_trait]
impl ThreadSource for SlackClient {
    async fn fetch(&self, channel: &str, reference_ts: &str) -> Result<ThreadContext, StageFailure> {
        self.fetch_message(channel, reference_ts).await
    }

    async fn team_id(&self) -> Result<String, StageFailure> { SlackClient::team_id(self).await }
}

#[async_trait]
impl Notifier for SlackClient {
    async fn notify(&self, channel: &str, thread_ts: &str, text: &str) -> anyhow::Result<()> {
        self.post_message(channel, Some(thread_ts), text).await.map(|_| ())
    }
}

#[async_trait]
impl Enricher for EnrichmentClient {
    async fn suggest(&self, raw_text: &str, tenant: &Tenant) -> Result<Suggestion, StageFailure> {
        EnrichmentClient::suggest(self, raw_text, tenant).await
    }
}

#[async_trait]
impl IssueTracker for GitHub {
    /// Authenticates from scratch for every draft; the installation client is dropped afterwards.
    async fn create_issue(&self, draft: IssueDraft) -> Result<CreatedIssue, WorkflowError> {
        let repo = draft.repo()?;
        let client = self.authenticate(&repo).await?;
        client.create_issue(&repo, draft).await
    }
}
