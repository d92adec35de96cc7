// Error taxonomy (spec §7), modeled on the teacher's thiserror enums
// (daemon::rpc::ApiError, tako_integration::error::TakoExecutionError):
// each variant is self-describing and carries the structured fields a
// caller needs to act on it.

use crate::time::TimestampSeconds;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    /// Malformed input: unknown platform/kind, out-of-range quality, bad
    /// referral code format. Never retryable.
    #[error("validation error: {reason}")]
    Validation { reason: String },

    /// Per-kind or per-user sliding window exceeded. Retryable after
    /// `reset_at`.
    #[error("rate limited, retry after {reset_at}")]
    RateLimited { reset_at: TimestampSeconds },

    /// human_probability below threshold, privileged action below the
    /// soft threshold, or the user is in the Frozen state.
    #[error("rejected by anti-abuse gate: {reason_code}")]
    AntiBotRejected { reason_code: String },

    /// Daily cap already hit; not an error to the caller, but modeled as
    /// a variant so internal plumbing treats it uniformly with the
    /// terminal cases above. Callers get `accepted=true, delta=0`.
    #[error("daily cap exceeded: {reason}")]
    CapExceeded { reason: String },

    /// Event id already credited; carries nothing extra because the
    /// caller re-reads the prior AccrualRecord to answer idempotently.
    #[error("event already credited (idempotent replay)")]
    Conflict,

    /// Store unavailable, deadline exceeded. Safe to retry with the same
    /// event id.
    #[error("transient failure: {reason}")]
    TransientFailure { reason: String },

    /// Invariant violated: negative balance attempted, NaN multiplier,
    /// cyclic referral edge. Never silently swallowed.
    #[error("internal invariant violated: {reason}")]
    Internal { reason: String },
}

impl EngineError {
    pub fn validation(reason: impl Into<String>) -> Self {
        EngineError::Validation {
            reason: reason.into(),
        }
    }

    pub fn internal(reason: impl Into<String>) -> Self {
        EngineError::Internal {
            reason: reason.into(),
        }
    }

    /// Whether the coordinator may retry this error internally with
    /// jittered backoff before surfacing it to the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::TransientFailure { .. })
    }

    /// Terminal errors are returned to the caller as-is; see spec §7
    /// propagation policy.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EngineError::Validation { .. }
                | EngineError::RateLimited { .. }
                | EngineError::AntiBotRejected { .. }
                | EngineError::CapExceeded { .. }
                | EngineError::Conflict
        )
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
