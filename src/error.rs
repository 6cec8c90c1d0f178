use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

/// Failures surfaced by the reconciliation engine.
///
/// Store failures are wrapped as [`EngineError::PersistenceFailed`] with the
/// backend's message; nothing is retried automatically.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no exchange rate on or before {date}")]
    RateNotFound { date: NaiveDate },

    #[error("validation failed: {reason}")]
    ValidationFailed { reason: String },

    #[error("persistence failed: {message}")]
    PersistenceFailed { message: String },

    #[error(
        "expense replace for period {period_id} is inconsistent: wrote {expected}, found {found}"
    )]
    InconsistentReplace {
        period_id: Uuid,
        expected: usize,
        found: usize,
    },

    #[error("period {period_name} of tower {tower_id} is published; reopen it before editing")]
    PeriodImmutable {
        tower_id: String,
        period_name: String,
    },
}

impl EngineError {
    pub fn validation(reason: impl Into<String>) -> Self {
        EngineError::ValidationFailed {
            reason: reason.into(),
        }
    }

    pub fn persistence(err: impl std::fmt::Display) -> Self {
        EngineError::PersistenceFailed {
            message: err.to_string(),
        }
    }
}
