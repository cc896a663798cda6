//! Cognitive tensions — conflicts that are allowed to persist.
//!
//! A tension is a first-class record of two beliefs in conflict, not an
//! error. Tensions age day by day; a conflict that survives long enough is
//! promoted to stable-unresolved and kept indefinitely. Stabilization is
//! monotonic and tensions are never deleted.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::belief::BeliefId;
use crate::time::days_between;

/// Days a tension must stay unresolved before it stabilizes.
pub const DEFAULT_DAYS_STABLE_THRESHOLD: u32 = 30;

/// Unique identifier for a tension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TensionId(Uuid);

impl TensionId {
    /// Creates a new random tension ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TensionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TensionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a tension.
///
/// `Unresolved` is the only state a tension can leave for the others; once
/// it stabilizes or resolves it never returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TensionStatus {
    /// Fresh conflict, still counting days.
    Unresolved,
    /// Survived past the threshold; allowed to persist indefinitely.
    StableUnresolved,
    /// Both sides accepted as true in their own scope.
    BothValid,
    /// Which side wins depends on context.
    ContextDependent,
    /// The conflict itself is accepted as unknowable.
    AcceptedUncertainty,
    /// Resolved by revising belief A away.
    ResolvedRevisionA,
    /// Resolved by revising belief B away.
    ResolvedRevisionB,
    /// Permanently inflamed; shapes behavior without hope of integration.
    Chronic,
}

impl TensionStatus {
    /// Terminal states: the tension stopped evolving.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::ResolvedRevisionA | Self::ResolvedRevisionB)
    }

    /// Integrated states: both sides kept, tension absorbed into identity.
    #[must_use]
    pub const fn is_integrated(self) -> bool {
        matches!(self, Self::BothValid | Self::ContextDependent)
    }

    /// Whether moving from `self` to `next` is allowed. Monotonic: nothing
    /// ever returns to `Unresolved`, and terminal states never move.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        if next == Self::Unresolved || self.is_terminal() {
            return false;
        }
        match self {
            Self::Unresolved | Self::StableUnresolved => self != next,
            Self::BothValid | Self::ContextDependent | Self::AcceptedUncertainty => {
                // Integrated/accepted tensions may still harden or resolve.
                matches!(
                    next,
                    Self::Chronic | Self::ResolvedRevisionA | Self::ResolvedRevisionB
                )
            }
            Self::Chronic => matches!(
                next,
                Self::ResolvedRevisionA | Self::ResolvedRevisionB
            ),
            Self::ResolvedRevisionA | Self::ResolvedRevisionB => false,
        }
    }
}

impl fmt::Display for TensionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unresolved => write!(f, "unresolved"),
            Self::StableUnresolved => write!(f, "stable_unresolved"),
            Self::BothValid => write!(f, "both_valid"),
            Self::ContextDependent => write!(f, "context_dependent"),
            Self::AcceptedUncertainty => write!(f, "accepted_uncertainty"),
            Self::ResolvedRevisionA => write!(f, "resolved_revision_a"),
            Self::ResolvedRevisionB => write!(f, "resolved_revision_b"),
            Self::Chronic => write!(f, "chronic"),
        }
    }
}

/// A persistent conflict between two active beliefs.
///
/// The pair is canonicalized (`belief_a_id < belief_b_id`) so the same
/// conflict can never be registered twice under swapped operands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CognitiveTension {
    pub id: TensionId,
    pub belief_a_id: BeliefId,
    pub belief_b_id: BeliefId,

    /// How sharply the pair conflicts (0-100).
    pub severity: u8,

    /// Free-form category ("value_vs_value", "self_vs_world", ...).
    pub tension_type: String,

    pub status: TensionStatus,
    pub opened_at: DateTime<Utc>,

    /// Stored day counter, advanced by the daily tick.
    pub days_unresolved: u32,

    /// Last UTC day the counter was advanced; makes the tick idempotent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_counted_day: Option<NaiveDate>,

    pub days_stable_threshold: u32,

    /// How the agent has been deciding when this tension activates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision_pattern: Option<String>,

    /// When set, this tension may cause outright refusal.
    pub refusal_trigger: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stabilized_at: Option<DateTime<Utc>>,
}

impl CognitiveTension {
    /// Creates a new unresolved tension, canonicalizing the pair order.
    #[must_use]
    pub fn new(
        a: BeliefId,
        b: BeliefId,
        severity: u8,
        tension_type: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let (belief_a_id, belief_b_id) = canonicalize_pair(a, b);
        Self {
            id: TensionId::new(),
            belief_a_id,
            belief_b_id,
            severity: severity.min(100),
            tension_type: tension_type.into(),
            status: TensionStatus::Unresolved,
            opened_at: now,
            days_unresolved: 0,
            last_counted_day: None,
            days_stable_threshold: DEFAULT_DAYS_STABLE_THRESHOLD,
            decision_pattern: None,
            refusal_trigger: false,
            stabilized_at: None,
        }
    }

    /// The canonical pair key.
    #[must_use]
    pub const fn pair(&self) -> (BeliefId, BeliefId) {
        (self.belief_a_id, self.belief_b_id)
    }

    /// Days unresolved derived lazily from `opened_at`, for read paths that
    /// run before today's tick.
    #[must_use]
    pub fn days_unresolved_at(&self, now: DateTime<Utc>) -> u32 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        {
            days_between(self.opened_at, now).floor() as u32
        }
    }

    /// Status as observed at `now`, without mutating: an unresolved tension
    /// past its threshold reads as stable-unresolved even if the daily tick
    /// has not run yet.
    #[must_use]
    pub fn effective_status(&self, now: DateTime<Utc>) -> TensionStatus {
        if self.status == TensionStatus::Unresolved
            && self.days_unresolved_at(now).max(self.days_unresolved) >= self.days_stable_threshold
        {
            TensionStatus::StableUnresolved
        } else {
            self.status
        }
    }

    /// Advances the day counter once for `today`; stabilizes at the
    /// threshold. Returns true if this call stabilized the tension.
    pub fn advance_day(&mut self, today: NaiveDate, now: DateTime<Utc>) -> bool {
        if self.status != TensionStatus::Unresolved {
            return false;
        }
        if self.last_counted_day == Some(today) {
            return false;
        }

        self.last_counted_day = Some(today);
        self.days_unresolved += 1;

        if self.days_unresolved >= self.days_stable_threshold {
            self.status = TensionStatus::StableUnresolved;
            self.stabilized_at = Some(now);
            return true;
        }
        false
    }

    /// Still shaping behavior (not terminally resolved).
    #[must_use]
    pub const fn is_live(&self) -> bool {
        !self.status.is_terminal()
    }
}

/// Orders a belief pair so `a < b`.
#[must_use]
pub fn canonicalize_pair(a: BeliefId, b: BeliefId) -> (BeliefId, BeliefId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Append-only record of a tension actually altering behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TensionActivation {
    pub tension_id: TensionId,

    /// What happened ("refusal", "hesitation", "deferral").
    pub effect: String,

    /// Severity of the behavioral change (0-100).
    pub severity: u8,

    pub noted_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-03-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn make_tension() -> CognitiveTension {
        CognitiveTension::new(BeliefId::new(), BeliefId::new(), 60, "value_vs_value", now())
    }

    #[test]
    fn test_pair_canonicalized() {
        let a = BeliefId::new();
        let b = BeliefId::new();
        let t1 = CognitiveTension::new(a, b, 50, "x", now());
        let t2 = CognitiveTension::new(b, a, 50, "x", now());
        assert_eq!(t1.pair(), t2.pair());
        assert!(t1.belief_a_id <= t1.belief_b_id);
    }

    #[test]
    fn test_stabilizes_at_threshold() {
        let mut t = make_tension();
        let mut day = now().date_naive();

        for expected in 1..=29 {
            day = day.succ_opt().unwrap();
            let stabilized = t.advance_day(day, now());
            assert!(!stabilized);
            assert_eq!(t.days_unresolved, expected);
            assert_eq!(t.status, TensionStatus::Unresolved);
        }

        day = day.succ_opt().unwrap();
        assert!(t.advance_day(day, now()));
        assert_eq!(t.days_unresolved, 30);
        assert_eq!(t.status, TensionStatus::StableUnresolved);
        assert!(t.stabilized_at.is_some());
    }

    #[test]
    fn test_advance_day_idempotent_per_day() {
        let mut t = make_tension();
        let day = now().date_naive().succ_opt().unwrap();
        t.advance_day(day, now());
        t.advance_day(day, now());
        assert_eq!(t.days_unresolved, 1);
    }

    #[test]
    fn test_effective_status_lazy() {
        let t = make_tension();
        assert_eq!(t.effective_status(now()), TensionStatus::Unresolved);
        assert_eq!(
            t.effective_status(now() + Duration::days(29)),
            TensionStatus::Unresolved
        );
        assert_eq!(
            t.effective_status(now() + Duration::days(30)),
            TensionStatus::StableUnresolved
        );
    }

    #[test]
    fn test_never_reverts_to_unresolved() {
        use TensionStatus::*;
        for s in [
            StableUnresolved,
            BothValid,
            ContextDependent,
            AcceptedUncertainty,
            ResolvedRevisionA,
            Chronic,
        ] {
            assert!(!s.can_transition_to(Unresolved), "{s} must not revert");
        }
    }

    #[test]
    fn test_terminal_states_frozen() {
        use TensionStatus::*;
        assert!(!ResolvedRevisionA.can_transition_to(Chronic));
        assert!(!ResolvedRevisionB.can_transition_to(BothValid));
    }

    #[test]
    fn test_stable_can_integrate_or_resolve() {
        use TensionStatus::*;
        assert!(StableUnresolved.can_transition_to(BothValid));
        assert!(StableUnresolved.can_transition_to(ContextDependent));
        assert!(StableUnresolved.can_transition_to(Chronic));
        assert!(StableUnresolved.can_transition_to(ResolvedRevisionB));
    }

    #[test]
    fn test_integrated_statuses() {
        assert!(TensionStatus::BothValid.is_integrated());
        assert!(TensionStatus::ContextDependent.is_integrated());
        assert!(!TensionStatus::AcceptedUncertainty.is_integrated());
    }

    #[test]
    fn test_resolved_tension_stops_counting() {
        let mut t = make_tension();
        t.status = TensionStatus::ResolvedRevisionA;
        let day = now().date_naive().succ_opt().unwrap();
        assert!(!t.advance_day(day, now()));
        assert_eq!(t.days_unresolved, 0);
    }
}
