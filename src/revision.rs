//! Revision audit records and the revision state machine.
//!
//! Every mutation of a belief, anchor, or tension writes one append-only
//! `Revision` row. The per-revision state machine is
//! `Stable -> UnderRevision -> {Applied, Rejected}`; only terminal states
//! are ever persisted, so no row is observable mid-flight.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::anchor::AnchorId;
use crate::belief::BeliefId;
use crate::tension::TensionId;

/// Maximum conviction change a single revision may request.
pub const RATE_LIMIT: i16 = 30;

/// Unique identifier for a revision record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionId(Uuid);

impl RevisionId {
    /// Creates a new random revision ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RevisionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a revision mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum RevisionTarget {
    Belief(BeliefId),
    Anchor(AnchorId),
    Tension(TensionId),
}

impl fmt::Display for RevisionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Belief(id) => write!(f, "belief:{id}"),
            Self::Anchor(id) => write!(f, "anchor:{id}"),
            Self::Tension(id) => write!(f, "tension:{id}"),
        }
    }
}

/// Terminal outcome of a revision attempt.
///
/// `UnderRevision` exists only inside the gate's unit of work and is never
/// written to storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisionState {
    Applied,
    Rejected,
}

impl fmt::Display for RevisionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Applied => write!(f, "applied"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

/// Append-only audit record of one mutation. Never mutated after insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Revision {
    pub id: RevisionId,
    pub target: RevisionTarget,
    pub state: RevisionState,

    /// Human-readable before value (score or status).
    pub old_value: String,

    /// Human-readable after value.
    pub new_value: String,

    /// Signed conviction/stability change; zero for status-only mutations.
    pub conviction_delta: i16,

    pub reasoning: String,

    /// Who asked for this ("extraction-pipeline", "operator", ...).
    pub initiator: String,

    pub recorded_at: DateTime<Utc>,
}

impl Revision {
    /// Records an applied mutation.
    #[must_use]
    pub fn applied(
        target: RevisionTarget,
        old_value: impl Into<String>,
        new_value: impl Into<String>,
        conviction_delta: i16,
        reasoning: impl Into<String>,
        initiator: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RevisionId::new(),
            target,
            state: RevisionState::Applied,
            old_value: old_value.into(),
            new_value: new_value.into(),
            conviction_delta,
            reasoning: reasoning.into(),
            initiator: initiator.into(),
            recorded_at: now,
        }
    }

    /// Records a rejected attempt (kept for audit — rejections are part of
    /// the history too).
    #[must_use]
    pub fn rejected(
        target: RevisionTarget,
        conviction_delta: i16,
        reasoning: impl Into<String>,
        initiator: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RevisionId::new(),
            target,
            state: RevisionState::Rejected,
            old_value: String::new(),
            new_value: String::new(),
            conviction_delta,
            reasoning: reasoning.into(),
            initiator: initiator.into(),
            recorded_at: now,
        }
    }
}

/// Checks a proposed delta against the per-revision rate limit.
#[must_use]
pub fn within_rate_limit(delta: i16) -> bool {
    delta.abs() <= RATE_LIMIT
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-03-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_rate_limit_boundary() {
        assert!(within_rate_limit(30));
        assert!(within_rate_limit(-30));
        assert!(!within_rate_limit(31));
        assert!(!within_rate_limit(-31));
    }

    #[test]
    fn test_revision_applied() {
        let rev = Revision::applied(
            RevisionTarget::Belief(BeliefId::new()),
            "80",
            "55",
            -25,
            "contradicted by observation",
            "extraction-pipeline",
            now(),
        );
        assert_eq!(rev.state, RevisionState::Applied);
        assert_eq!(rev.conviction_delta, -25);
    }

    #[test]
    fn test_revision_rejected_keeps_delta() {
        let rev = Revision::rejected(
            RevisionTarget::Belief(BeliefId::new()),
            -40,
            "rate limit",
            "operator",
            now(),
        );
        assert_eq!(rev.state, RevisionState::Rejected);
        assert_eq!(rev.conviction_delta, -40);
    }

    #[test]
    fn test_target_display() {
        let id = AnchorId::new();
        assert!(format!("{}", RevisionTarget::Anchor(id)).starts_with("anchor:"));
    }

    #[test]
    fn test_revision_serialization() {
        let rev = Revision::applied(
            RevisionTarget::Belief(BeliefId::new()),
            "50",
            "60",
            10,
            "reinforced",
            "operator",
            now(),
        );
        let json = serde_json::to_string(&rev).unwrap();
        let back: Revision = serde_json::from_str(&json).unwrap();
        assert_eq!(rev.id, back.id);
        assert_eq!(back.state, RevisionState::Applied);
    }
}
