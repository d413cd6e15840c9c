//! Turns a chat message into a repository issue.
//!
//! A run is an ordered list of [`Stage`]s over a shared [`WorkflowRun`]. The standard order
//! is fetch context → enrich → collect input → create issue → notify. Context and enrichment
//! are optional: their failures are recorded and replaced by empty values. Everything after
//! that is required and stops the run.

pub mod fallback;
pub mod ports;
pub mod stages;

use std::{
    fmt,
    sync::{Arc, OnceLock},
};

use async_trait::async_trait;
use issue_bridge_core::{
    config::TenantIds,
    error::{StageFailure, WorkflowError},
    models::{CreatedIssue, IssueDraft, Suggestion, ThreadContext},
};
use regex::Regex;
use tracing::Instrument;

use crate::{
    fallback::StageOutcome,
    ports::{Enricher, InputCollector, IssueTracker, Notifier, ThreadSource},
    stages::{CollectInputStage, CreateIssueStage, EnrichStage, FetchContextStage, NotifyStage},
};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum StageKind {
    FetchContext,
    Enrich,
    CollectInput,
    CreateIssue,
    Notify,
}

impl StageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FetchContext => "fetch_context",
            Self::Enrich => "enrich",
            Self::CollectInput => "collect_input",
            Self::CreateIssue => "create_issue",
            Self::Notify => "notify",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// The message a run was started from.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Trigger {
    pub channel: String,
    pub message_ts: String,
}

impl Trigger {
    /// Parse a message permalink such as
    /// `https://acme.slack.com/archives/C06EEUJTNGJ/p1700000000000100`.
    pub fn from_permalink(link: &str) -> Option<Self> {
        static REGEX: OnceLock<Regex> = OnceLock::new();
        let captures = REGEX
            .get_or_init(|| {
                Regex::new(
                    r"^https://[^/]+/archives/(?P<channel>[A-Z0-9]+)/p(?P<secs>\d{10})(?P<micros>\d{6})(?:[?#].*)?$",
                )
                .unwrap()
            })
            .captures(link.trim())?;
        Some(Self {
            channel: captures["channel"].to_string(),
            message_ts: format!("{}.{}", &captures["secs"], &captures["micros"]),
        })
    }
}

#[derive(Debug)]
pub struct Degradation {
    pub stage: StageKind,
    pub failure: StageFailure,
}

/// State shared by the stages of one run.
#[derive(Debug)]
pub struct WorkflowRun {
    pub trigger: Trigger,
    pub thread: ThreadContext,
    pub suggestion: Suggestion,
    pub draft: Option<IssueDraft>,
    pub issue: Option<CreatedIssue>,
    pub degraded: Vec<Degradation>,
}

impl WorkflowRun {
    pub fn new(trigger: Trigger) -> Self {
        Self {
            trigger,
            thread: ThreadContext::default(),
            suggestion: Suggestion::default(),
            draft: None,
            issue: None,
            degraded: Vec::new(),
        }
    }

    /// Take the value of an optional stage, remembering the failure if it degraded.
    pub fn absorb<T>(&mut self, stage: StageKind, outcome: StageOutcome<T>) -> T {
        let (value, failure) = outcome.into_parts();
        if let Some(failure) = failure {
            self.degraded.push(Degradation { stage, failure });
        }
        value
    }
}

#[async_trait]
pub trait Stage: Send + Sync {
    fn kind(&self) -> StageKind;

    async fn run(&self, run: &mut WorkflowRun) -> Result<(), WorkflowError>;
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Completion {
    Done,
    /// An optional stage fell back to its default value.
    DegradedDone,
}

#[derive(Debug)]
pub struct WorkflowOutcome {
    pub issue: CreatedIssue,
    pub completion: Completion,
    pub degraded: Vec<Degradation>,
}

/// External collaborators of the standard pipeline.
pub struct Ports {
    pub thread: Arc<dyn ThreadSource>,
    pub enricher: Arc<dyn Enricher>,
    pub tenant_ids: TenantIds,
    pub input: Arc<dyn InputCollector>,
    pub tracker: Arc<dyn IssueTracker>,
    pub notifier: Arc<dyn Notifier>,
}

pub struct Workflow {
    stages: Vec<Box<dyn Stage>>,
}

impl Workflow {
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Self { Self { stages } }

    pub fn standard(ports: Ports) -> Self {
        Self::new(vec![
            Box::new(FetchContextStage { source: ports.thread.clone() }),
            Box::new(EnrichStage {
                source: ports.thread,
                enricher: ports.enricher,
                tenant_ids: ports.tenant_ids,
            }),
            Box::new(CollectInputStage { input: ports.input }),
            Box::new(CreateIssueStage { tracker: ports.tracker }),
            Box::new(NotifyStage { notifier: ports.notifier }),
        ])
    }

    pub fn stages(&self) -> Vec<StageKind> { self.stages.iter().map(|s| s.kind()).collect() }

    pub async fn run(&self, trigger: Trigger) -> Result<WorkflowOutcome, WorkflowError> {
        let span = tracing::info_span!(
            "workflow",
            channel = %trigger.channel,
            message_ts = %trigger.message_ts,
        );
        self.run_stages(WorkflowRun::new(trigger)).instrument(span).await
    }

    async fn run_stages(&self, mut run: WorkflowRun) -> Result<WorkflowOutcome, WorkflowError> {
        for stage in &self.stages {
            tracing::debug!("Running stage {}", stage.kind());
            if let Err(e) = stage.run(&mut run).await {
                tracing::error!("Stage {} failed: {}", stage.kind(), e);
                return Err(e);
            }
        }
        let issue = run.issue.ok_or(WorkflowError::MissingInput("done"))?;
        let completion =
            if run.degraded.is_empty() { Completion::Done } else { Completion::DegradedDone };
        tracing::info!("Workflow finished ({:?}) with issue #{}", completion, issue.number);
        Ok(WorkflowOutcome { issue, completion, degraded: run.degraded })
    }
}
