use std::fmt;

use crate::models::CreatedIssue;

/// Failure of a workflow step. Every variant carries a human-readable cause.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("failed to sign app credential: {0:#}")]
    Signing(anyhow::Error),
    #[error("failed to resolve installation: {0:#}")]
    Resolution(anyhow::Error),
    #[error("authentication failed: {0}")]
    Authentication(#[from] AuthenticationFailure),
    #[error("failed to create issue: {0}")]
    Creation(#[from] CreationFailure),
    /// The issue exists; only the confirmation is missing.
    #[error(
        "issue #{} created at {} but confirmation failed: {cause:#}",
        .issue.number,
        .issue.url
    )]
    Notification { issue: CreatedIssue, cause: anyhow::Error },
    #[error("failed to read issue form: {0:#}")]
    Input(anyhow::Error),
    #[error("invalid issue form: {0}")]
    InvalidDraft(String),
    #[error("stage {0} ran before its input was available")]
    MissingInput(&'static str),
}

impl WorkflowError {
    /// Message shown to the user when the workflow stops.
    pub fn user_message(&self) -> String {
        format!("An error was encountered during issue creation: `{self}`")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthenticationFailure {
    #[error("app not installed for this repository ({owner}/{repo})")]
    NotInstalled { owner: String, repo: String },
    #[error("app credential expired before use")]
    AssertionExpired,
    #[error("failed to exchange installation token: {0:#}")]
    TokenExchange(anyhow::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum CreationFailure {
    #[error("unexpected response status {status}: {text}")]
    Status { status: u16, text: String },
    #[error("{0:#}")]
    Request(anyhow::Error),
}

impl CreationFailure {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Request(_) => None,
        }
    }
}

/// Failure of a stage whose result may be replaced by a fallback value.
#[derive(Debug, thiserror::Error)]
pub enum StageFailure {
    /// The remote side answered and had nothing usable (platform error code, non-success status).
    #[error("{0}")]
    Expected(String),
    /// Transport errors, undecodable responses and anything else that points at a bug.
    #[error("{0:#}")]
    Unexpected(anyhow::Error),
}

impl StageFailure {
    pub fn expected(message: impl fmt::Display) -> Self { Self::Expected(message.to_string()) }

    pub fn is_expected(&self) -> bool { matches!(self, Self::Expected(_)) }
}

impl From<anyhow::Error> for StageFailure {
    fn from(err: anyhow::Error) -> Self { Self::Unexpected(err) }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;

    #[test]
    fn test_user_message_embeds_cause() {
        let err = WorkflowError::from(AuthenticationFailure::NotInstalled {
            owner: "acme".into(),
            repo: "widgets".into(),
        });
        assert_eq!(
            err.user_message(),
            "An error was encountered during issue creation: `authentication failed: app not \
             installed for this repository (acme/widgets)`"
        );
    }

    #[test]
    fn test_creation_failure_status() {
        let err = CreationFailure::Status { status: 200, text: "OK".into() };
        assert_eq!(err.status(), Some(200));
        assert_eq!(err.to_string(), "unexpected response status 200: OK");
        assert_eq!(CreationFailure::Request(anyhow!("timed out")).status(), None);
    }

    #[test]
    fn test_stage_failure_classification() {
        assert!(StageFailure::expected("channel_not_found").is_expected());
        let err = StageFailure::from(anyhow!("connection reset").context("request failed"));
        assert!(!err.is_expected());
        assert_eq!(err.to_string(), "request failed: connection reset");
    }

    #[test]
    fn test_notification_failure_keeps_issue() {
        let err = WorkflowError::Notification {
            issue: CreatedIssue {
                number: 17,
                url: "https://github.com/acme/widgets/issues/17".into(),
            },
            cause: anyhow!("not_in_channel").context("slack chat.postMessage failed"),
        };
        assert_eq!(
            err.to_string(),
            "issue #17 created at https://github.com/acme/widgets/issues/17 but confirmation \
             failed: slack chat.postMessage failed: not_in_channel"
        );
    }
}
