use issue_bridge_core::error::StageFailure;

use crate::StageKind;

/// Result of an optional stage, collapsed to a fallback value on failure.
#[derive(Debug)]
pub enum StageOutcome<T> {
    Completed(T),
    Degraded { fallback: T, failure: StageFailure },
}

impl<T> StageOutcome<T> {
    pub fn or_fallback(
        stage: StageKind,
        result: Result<T, StageFailure>,
        fallback: impl FnOnce() -> T,
    ) -> Self {
        match result {
            Ok(value) => Self::Completed(value),
            Err(failure) => {
                if failure.is_expected() {
                    tracing::warn!(%stage, "Stage unavailable, continuing with fallback: {}", failure);
                } else {
                    tracing::error!(%stage, "Stage failed unexpectedly, continuing with fallback: {}", failure);
                }
                Self::Degraded { fallback: fallback(), failure }
            }
        }
    }

    pub fn is_degraded(&self) -> bool { matches!(self, Self::Degraded { .. }) }

    pub fn into_parts(self) -> (T, Option<StageFailure>) {
        match self {
            Self::Completed(value) => (value, None),
            Self::Degraded { fallback, failure } => (fallback, Some(failure)),
        }
    }
}

impl<T: Default> StageOutcome<T> {
    pub fn or_default(stage: StageKind, result: Result<T, StageFailure>) -> Self {
        Self::or_fallback(stage, result, T::default)
    }
}
