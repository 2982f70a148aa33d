use std::fmt;

/// Which half of a sprint cascade delete failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadePhase {
    /// Deleting the sprint's tasks failed; the sprint itself was never touched.
    Tasks,
    /// Every task was deleted but the sprint delete failed.
    Sprint,
}

impl fmt::Display for CascadePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tasks => f.write_str("task phase"),
            Self::Sprint => f.write_str("sprint phase"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AppError {
    #[error("validation_failed - {0}")]
    ValidationFailed(String),
    #[error("fetch_failed - {0}")]
    FetchFailed(String),
    #[error("cascade_failed - sprint {sprint_id} aborted in {phase}: {reason}")]
    CascadeFailed {
        sprint_id: String,
        phase: CascadePhase,
        deleted_task_ids: Vec<String>,
        reason: String,
    },
    #[error("invalid_config - {0}")]
    InvalidConfig(String),
}

impl AppError {
    pub fn validation<M: Into<String>>(message: M) -> Self {
        Self::ValidationFailed(message.into())
    }

    pub fn fetch<M: Into<String>>(message: M) -> Self {
        Self::FetchFailed(message.into())
    }

    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::InvalidConfig(message.into())
    }

    pub fn cascade(
        sprint_id: &str,
        phase: CascadePhase,
        deleted_task_ids: Vec<String>,
        cause: &AppError,
    ) -> Self {
        Self::CascadeFailed {
            sprint_id: sprint_id.to_string(),
            phase,
            deleted_task_ids,
            reason: cause.message().to_string(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::ValidationFailed(_) => "validation_failed",
            Self::FetchFailed(_) => "fetch_failed",
            Self::CascadeFailed { .. } => "cascade_failed",
            Self::InvalidConfig(_) => "invalid_config",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::ValidationFailed(message) => message,
            Self::FetchFailed(message) => message,
            Self::CascadeFailed { reason, .. } => reason,
            Self::InvalidConfig(message) => message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AppError, CascadePhase};

    #[test]
    fn display_leads_with_code() {
        let err = AppError::validation("subject is required");
        assert_eq!(err.to_string(), "validation_failed - subject is required");
        assert_eq!(err.code(), "validation_failed");
    }

    #[test]
    fn cascade_keeps_cause_message_and_phase() {
        let cause = AppError::fetch("disk full");
        let err = AppError::cascade("sprint-1", CascadePhase::Sprint, vec!["task-1".into()], &cause);

        assert_eq!(err.code(), "cascade_failed");
        assert_eq!(err.message(), "disk full");
        assert_eq!(
            err.to_string(),
            "cascade_failed - sprint sprint-1 aborted in sprint phase: disk full"
        );
        match err {
            AppError::CascadeFailed {
                phase,
                deleted_task_ids,
                ..
            } => {
                assert_eq!(phase, CascadePhase::Sprint);
                assert_eq!(deleted_task_ids, vec!["task-1".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
