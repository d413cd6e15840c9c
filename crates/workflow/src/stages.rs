use std::sync::Arc;

use async_trait::async_trait;
use issue_bridge_core::{
    config::{Tenant, TenantIds},
    error::{StageFailure, WorkflowError},
    models::{CreatedIssue, Suggestion, ThreadContext},
};

use crate::{
    Stage, StageKind, WorkflowRun,
    fallback::StageOutcome,
    ports::{Enricher, FormPrefill, InputCollector, IssueTracker, Notifier, ThreadSource},
};

/// Reads the triggering message. Optional: on failure the thread text is empty.
pub struct FetchContextStage {
    pub source: Arc<dyn ThreadSource>,
}

#[async_trait]
impl Stage for FetchContextStage {
    fn kind(&self) -> StageKind { StageKind::FetchContext }

    async fn run(&self, run: &mut WorkflowRun) -> Result<(), WorkflowError> {
        let result = self.source.fetch(&run.trigger.channel, &run.trigger.message_ts).await;
        let outcome = StageOutcome::or_fallback(self.kind(), result, || ThreadContext {
            channel: run.trigger.channel.clone(),
            timestamp: run.trigger.message_ts.clone(),
            text: String::new(),
        });
        run.thread = run.absorb(self.kind(), outcome);
        Ok(())
    }
}

/// Asks the suggestion service for a title and description. Optional: on failure both are empty.
pub struct EnrichStage {
    pub source: Arc<dyn ThreadSource>,
    pub enricher: Arc<dyn Enricher>,
    pub tenant_ids: TenantIds,
}

impl EnrichStage {
    async fn suggest(&self, run: &WorkflowRun) -> Result<Suggestion, StageFailure> {
        let team_id = match self.source.team_id().await {
            Ok(team_id) => team_id,
            Err(e) if !self.tenant_ids.is_dynamic() => {
                tracing::warn!("Team lookup failed, sending configured tenant IDs: {}", e);
                String::new()
            }
            Err(e) => return Err(e),
        };
        let origin = Tenant { channel_id: run.trigger.channel.clone(), team_id };
        let tenant = self.tenant_ids.select(&origin);
        self.enricher.suggest(&run.thread.text, &tenant).await
    }
}

#[async_trait]
impl Stage for EnrichStage {
    fn kind(&self) -> StageKind { StageKind::Enrich }

    async fn run(&self, run: &mut WorkflowRun) -> Result<(), WorkflowError> {
        if run.thread.text.trim().is_empty() {
            tracing::info!("No thread text, skipping suggestion");
            run.suggestion = Suggestion::default();
            return Ok(());
        }
        let result = self.suggest(run).await;
        let outcome = StageOutcome::or_default(self.kind(), result);
        run.suggestion = run.absorb(self.kind(), outcome);
        Ok(())
    }
}

/// Hands the prefilled form to the user and validates what comes back.
pub struct CollectInputStage {
    pub input: Arc<dyn InputCollector>,
}

#[async_trait]
impl Stage for CollectInputStage {
    fn kind(&self) -> StageKind { StageKind::CollectInput }

    async fn run(&self, run: &mut WorkflowRun) -> Result<(), WorkflowError> {
        let prefill = FormPrefill {
            thread: run.thread.text.clone(),
            title: run.suggestion.title.clone(),
            description: run.suggestion.description.clone(),
        };
        let form = self.input.collect(&prefill).await?;
        run.draft = Some(form.into_draft()?);
        Ok(())
    }
}

/// Authenticates against the repository host and creates the issue. Failures end the run.
pub struct CreateIssueStage {
    pub tracker: Arc<dyn IssueTracker>,
}

#[async_trait]
impl Stage for CreateIssueStage {
    fn kind(&self) -> StageKind { StageKind::CreateIssue }

    async fn run(&self, run: &mut WorkflowRun) -> Result<(), WorkflowError> {
        let draft = run.draft.take().ok_or(WorkflowError::MissingInput(self.kind().as_str()))?;
        run.issue = Some(self.tracker.create_issue(draft).await?);
        Ok(())
    }
}

/// Posts the confirmation into the originating thread. A failed post fails the run.
pub struct NotifyStage {
    pub notifier: Arc<dyn Notifier>,
}

#[async_trait]
impl Stage for NotifyStage {
    fn kind(&self) -> StageKind { StageKind::Notify }

    async fn run(&self, run: &mut WorkflowRun) -> Result<(), WorkflowError> {
        let issue = run.issue.as_ref().ok_or(WorkflowError::MissingInput(self.kind().as_str()))?;
        let text = confirmation_text(issue);
        self.notifier
            .notify(&run.trigger.channel, &run.trigger.message_ts, &text)
            .await
            .map_err(|cause| WorkflowError::Notification { issue: issue.clone(), cause })
    }
}

pub fn confirmation_text(issue: &CreatedIssue) -> String {
    format!("Issue #{} has been successfully created\nLink to issue: {}", issue.number, issue.url)
}
