//! Error types for anima.
//!
//! All errors are strongly typed using thiserror. Admission failures are
//! ordinary negative results the caller must handle; nothing in this crate
//! is fatal to the host process.

use thiserror::Error;

use crate::anchor::AnchorId;
use crate::belief::BeliefId;
use crate::distress::DistressId;
use crate::scar::CandidateId;
use crate::storage::StorageError;
use crate::tension::TensionId;

/// Validation errors that occur during input validation.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Statement cannot be empty")]
    EmptyStatement,

    #[error("Conviction score {value} is out of range [0, 100]")]
    ConvictionOutOfRange {
        value: i32,
    },

    #[error("Stability score {value} is out of range [0, 100]")]
    StabilityOutOfRange {
        value: i32,
    },

    #[error("Link strength {value} is out of range [0.0, 1.0]")]
    StrengthOutOfRange {
        value: f32,
    },

    #[error("Invalid validity range: from ({from}) must be before to ({to})")]
    InvalidValidityRange {
        from: chrono::DateTime<chrono::Utc>,
        to: chrono::DateTime<chrono::Utc>,
    },

    #[error("Required field '{field}' is missing")]
    MissingField {
        field: String,
    },

    #[error("Field '{field}' is invalid: {reason}")]
    InvalidField {
        field: String,
        reason: String,
    },
}

/// Admission failures: a proposed mutation was rejected by policy.
///
/// These are never auto-corrected or silently swallowed. The caller decides
/// whether to split, retry tomorrow, or surface the rejection upstream.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// A belief was proposed without any causal justification.
    #[error("Belief has no causal justification; every belief needs a cause")]
    MissingCausality,

    /// A single revision asked for a conviction change larger than the limit.
    /// The caller must split the change into smaller revisions.
    #[error("Conviction delta {requested} exceeds the per-revision limit of {max}")]
    RevisionRateLimit {
        requested: i16,
        max: i16,
    },

    /// The daily revision budget is exhausted or fatigue closed the gate.
    /// Retryable after the next daily rollover.
    #[error("Revision budget exhausted for today (remaining: {remaining})")]
    BudgetExhausted {
        remaining: u32,
    },

    /// An attempt to mutate a locked anchor or any immutable scar field.
    #[error("Immutability violation: {target}")]
    ImmutabilityViolation {
        target: String,
    },

    /// A scar proposal carries no concrete consequence.
    #[error("Scar candidate {candidate} has no concrete consequence; at least one of value_shift/capability_change/openness_change/manifestation_examples is required")]
    ScarConsequence {
        candidate: CandidateId,
    },
}

/// Top-level error type for anima.
#[derive(Debug, Error)]
pub enum AnimaError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Policy error: {0}")]
    Policy(#[from] PolicyError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Belief not found: {id}")]
    BeliefNotFound {
        id: BeliefId,
    },

    #[error("Anchor not found: {id}")]
    AnchorNotFound {
        id: AnchorId,
    },

    #[error("Tension not found: {id}")]
    TensionNotFound {
        id: TensionId,
    },

    #[error("Distress episode not found: {id}")]
    DistressNotFound {
        id: DistressId,
    },

    #[error("Scar candidate not found: {id}")]
    CandidateNotFound {
        id: CandidateId,
    },

    #[error("Invalid status transition: {reason}")]
    InvalidTransition {
        reason: String,
    },

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl AnimaError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a policy (admission) error.
    #[must_use]
    pub const fn is_policy(&self) -> bool {
        matches!(self, Self::Policy(_))
    }

    /// Returns true if this is a storage error.
    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Returns true if this error is retryable.
    ///
    /// Only a closed budget gate is retryable — the budget recovers at the
    /// next daily rollover. Everything else will fail again unchanged.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Policy(PolicyError::BudgetExhausted { .. }))
    }
}

/// Result type alias for anima operations.
pub type AnimaResult<T> = Result<T, AnimaError>;
