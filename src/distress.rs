//! Identity distress — the cost of violating a stable anchor.
//!
//! A distress episode opens when a belief tied to a locked anchor weakens.
//! Episodes move forward through their lifecycle only; an episode that goes
//! chronic with level > 60 is the sole automatic trigger for scar proposal.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::anchor::AnchorId;
use crate::belief::BeliefId;

/// Distress level factor applied to the (negated) conviction delta.
pub const LEVEL_FACTOR: f32 = 0.8;

/// Coherence penalty factor applied to the (negated) conviction delta.
pub const COHERENCE_FACTOR: f32 = 0.3;

/// Stability penalty factor applied to the (negated) conviction delta.
pub const STABILITY_FACTOR: f32 = 0.15;

/// Level above which a chronic episode proposes a scar.
pub const SCAR_LEVEL_THRESHOLD: f32 = 60.0;

/// Unique identifier for a distress episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DistressId(Uuid);

impl DistressId {
    /// Creates a new random distress ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DistressId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DistressId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What opened the episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    /// A belief tied to a locked anchor lost conviction.
    AnchorWeakened,
    /// A new belief directly contradicts an anchor.
    AnchorContradicted,
    /// A causal chain under an anchor lost its root.
    ChainCollapse,
}

impl fmt::Display for TriggerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AnchorWeakened => write!(f, "anchor_weakened"),
            Self::AnchorContradicted => write!(f, "anchor_contradicted"),
            Self::ChainCollapse => write!(f, "chain_collapse"),
        }
    }
}

/// Defensive posture adopted while the episode is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefensiveMode {
    /// Level > 50: refuse adjacent revision outright.
    Rigidity,
    /// Level > 30: disengage from the contested territory.
    Withdrawal,
    /// Otherwise: re-examine without behavioral change.
    Rumination,
}

impl fmt::Display for DefensiveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rigidity => write!(f, "rigidity"),
            Self::Withdrawal => write!(f, "withdrawal"),
            Self::Rumination => write!(f, "rumination"),
        }
    }
}

/// Defensive mode for a given distress level.
#[must_use]
pub fn defensive_mode_for(level: f32) -> DefensiveMode {
    if level > 50.0 {
        DefensiveMode::Rigidity
    } else if level > 30.0 {
        DefensiveMode::Withdrawal
    } else {
        DefensiveMode::Rumination
    }
}

/// Lifecycle of a distress episode. Transitions are forward-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistressStatus {
    Active,
    Recovering,
    Resolved,
    Chronic,
}

impl DistressStatus {
    /// Whether moving from `self` to `next` is allowed.
    ///
    /// Active can recover, resolve, or go chronic; recovering can resolve,
    /// relapse to chronic, or not move; chronic can still eventually
    /// resolve. Resolved is terminal.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Active, Self::Recovering | Self::Resolved | Self::Chronic)
                | (Self::Recovering, Self::Resolved | Self::Chronic)
                | (Self::Chronic, Self::Resolved)
        )
    }
}

impl fmt::Display for DistressStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Recovering => write!(f, "recovering"),
            Self::Resolved => write!(f, "resolved"),
            Self::Chronic => write!(f, "chronic"),
        }
    }
}

/// An open wound: a bounded episode tracking the cost of anchor violation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityDistress {
    pub id: DistressId,
    pub source_belief_id: BeliefId,
    pub anchor_id: AnchorId,
    pub trigger_type: TriggerType,

    /// `(-delta) * 0.8`, clamped to [0, 100].
    pub distress_level: f32,

    /// `(-delta) * 0.3`.
    pub coherence_penalty: f32,

    /// `(-delta) * 0.15`.
    pub stability_penalty: f32,

    pub defensive_mode: DefensiveMode,
    pub status: DistressStatus,
    pub opened_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl IdentityDistress {
    /// Opens an episode from a weakening delta (`delta < 0`).
    #[must_use]
    pub fn open(
        source_belief_id: BeliefId,
        anchor_id: AnchorId,
        trigger_type: TriggerType,
        delta: i16,
        now: DateTime<Utc>,
    ) -> Self {
        let magnitude = f32::from((-delta).max(0));
        let level = (magnitude * LEVEL_FACTOR).clamp(0.0, 100.0);

        Self {
            id: DistressId::new(),
            source_belief_id,
            anchor_id,
            trigger_type,
            distress_level: level,
            coherence_penalty: magnitude * COHERENCE_FACTOR,
            stability_penalty: magnitude * STABILITY_FACTOR,
            defensive_mode: defensive_mode_for(level),
            status: DistressStatus::Active,
            opened_at: now,
            resolved_at: None,
        }
    }

    /// Returns true once this episode qualifies for scar proposal.
    #[must_use]
    pub fn is_scar_eligible(&self) -> bool {
        self.status == DistressStatus::Chronic && self.distress_level > SCAR_LEVEL_THRESHOLD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-03-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn open(delta: i16) -> IdentityDistress {
        IdentityDistress::open(
            BeliefId::new(),
            AnchorId::new(),
            TriggerType::AnchorWeakened,
            delta,
            now(),
        )
    }

    #[test]
    fn test_open_formulas() {
        let d = open(-15);
        assert!((d.distress_level - 12.0).abs() < 1e-6);
        assert!((d.coherence_penalty - 4.5).abs() < 1e-6);
        assert!((d.stability_penalty - 2.25).abs() < 1e-6);
        assert_eq!(d.status, DistressStatus::Active);
    }

    #[test]
    fn test_positive_delta_yields_zero_level() {
        let d = open(10);
        assert_eq!(d.distress_level, 0.0);
    }

    #[test]
    fn test_defensive_mode_tiers() {
        assert_eq!(defensive_mode_for(60.0), DefensiveMode::Rigidity);
        assert_eq!(defensive_mode_for(50.0), DefensiveMode::Withdrawal);
        assert_eq!(defensive_mode_for(35.0), DefensiveMode::Withdrawal);
        assert_eq!(defensive_mode_for(30.0), DefensiveMode::Rumination);
        assert_eq!(defensive_mode_for(12.0), DefensiveMode::Rumination);
    }

    #[test]
    fn test_status_transitions_forward_only() {
        use DistressStatus::{Active, Chronic, Recovering, Resolved};

        assert!(Active.can_transition_to(Recovering));
        assert!(Active.can_transition_to(Chronic));
        assert!(Recovering.can_transition_to(Resolved));
        assert!(Chronic.can_transition_to(Resolved));

        assert!(!Resolved.can_transition_to(Active));
        assert!(!Recovering.can_transition_to(Active));
        assert!(!Chronic.can_transition_to(Active));
        assert!(!Resolved.can_transition_to(Chronic));
    }

    #[test]
    fn test_scar_eligibility() {
        let mut d = open(-30); // level 24 — too low even when chronic
        d.status = DistressStatus::Chronic;
        assert!(!d.is_scar_eligible());

        let mut severe = open(-90); // level 72 (clamped path unused)
        assert!(!severe.is_scar_eligible(), "active episodes never propose");
        severe.status = DistressStatus::Chronic;
        assert!(severe.is_scar_eligible());
    }
}
