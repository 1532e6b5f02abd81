// Error taxonomy shared by every component of the draft monitor.

use thiserror::Error;

/// Errors raised by the draft monitor core.
///
/// Callers decide recovery by variant:
/// - `TransientFetch`: skip the tick, poll again on the next one.
/// - `InvalidArgument`: programming error, fail fast.
/// - `InconsistentState`: turn tracking pauses until the watched seat is
///   reset or a fresh fetch is consistent again; pick detection continues.
/// - `RecommendationCompute`: logged, never cached, retried on the next
///   qualifying tick.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    #[error("transient fetch error: {0}")]
    TransientFetch(String),

    #[error("invalid argument `{field}`: {message}")]
    InvalidArgument {
        field: &'static str,
        message: String,
    },

    #[error("inconsistent draft state: {message}")]
    InconsistentState { message: String },

    #[error("recommendation computation failed: {0}")]
    RecommendationCompute(String),
}

impl DraftError {
    pub(crate) fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        DraftError::InvalidArgument {
            field,
            message: message.into(),
        }
    }

    pub(crate) fn inconsistent(message: impl Into<String>) -> Self {
        DraftError::InconsistentState {
            message: message.into(),
        }
    }

    /// Whether a later tick can succeed without outside intervention.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DraftError::TransientFetch(_) | DraftError::RecommendationCompute(_)
        )
    }
}
