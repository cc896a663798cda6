//! Belief echoes — decaying residue of superseded beliefs.
//!
//! When a belief with conviction >= 20 is superseded, an echo is spawned.
//! Echo strength is a pure function of elapsed time — computed on read,
//! never ticked by a background job — so decay is replayable under any
//! clock.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::belief::{Belief, BeliefId};
use crate::time::days_between;

/// Conviction at supersession below which no echo is spawned.
pub const SPAWN_MIN_CONVICTION: u8 = 20;

/// Strength below which an echo is considered inactive.
pub const INACTIVE_THRESHOLD: f64 = 0.02;

/// Fraction of normalized conviction carried into the initial strength.
pub const INITIAL_STRENGTH_FACTOR: f64 = 0.75;

/// Unique identifier for a belief echo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EchoId(Uuid);

impl EchoId {
    /// Creates a new random echo ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EchoId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EchoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a live echo biases downstream decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfluenceType {
    /// Slows decisions near the old belief's territory.
    Hesitation,
    /// Attraction back toward the superseded position.
    PullTowardOld,
    /// Active pushback against the new position.
    Resistance,
    /// Recurrent re-examination without behavioral pull.
    Rumination,
}

impl fmt::Display for InfluenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hesitation => write!(f, "hesitation"),
            Self::PullTowardOld => write!(f, "pull_toward_old"),
            Self::Resistance => write!(f, "resistance"),
            Self::Rumination => write!(f, "rumination"),
        }
    }
}

/// Half-life tier in days for a given conviction at supersession.
#[must_use]
pub const fn half_life_days_for(conviction: u8) -> u16 {
    if conviction >= 70 {
        60
    } else if conviction >= 40 {
        30
    } else {
        14
    }
}

/// Default influence type for a given conviction at supersession.
///
/// High-conviction beliefs resist their replacement; mid-tier ones pull;
/// weak ones merely cause hesitation. Callers may override.
#[must_use]
pub const fn influence_type_for(conviction: u8) -> InfluenceType {
    if conviction >= 70 {
        InfluenceType::Resistance
    } else if conviction >= 40 {
        InfluenceType::PullTowardOld
    } else {
        InfluenceType::Hesitation
    }
}

/// Decaying residual-influence record of a superseded belief.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeliefEcho {
    pub id: EchoId,
    pub source_belief_id: BeliefId,

    /// Copy of the superseded statement, so the prompt builder does not
    /// need a join against dead beliefs.
    pub statement: String,

    pub original_conviction: u8,

    /// Strength at spawn time: `conviction / 100 * 0.75`.
    pub initial_strength: f64,

    pub half_life_days: u16,
    pub influence_type: InfluenceType,
    pub spawned_at: DateTime<Utc>,

    /// Times a caller reported this echo altered a decision.
    pub trigger_count: u32,

    /// Sum of strengths at each trigger.
    pub total_influence_applied: f64,
}

impl BeliefEcho {
    /// Spawns an echo from a belief being superseded.
    ///
    /// Returns `None` when the dying conviction is below the spawn floor.
    #[must_use]
    pub fn spawn_from(belief: &Belief, now: DateTime<Utc>) -> Option<Self> {
        if belief.conviction_score < SPAWN_MIN_CONVICTION {
            return None;
        }

        let conviction = belief.conviction_score;
        Some(Self {
            id: EchoId::new(),
            source_belief_id: belief.id,
            statement: belief.statement.clone(),
            original_conviction: conviction,
            initial_strength: f64::from(conviction) / 100.0 * INITIAL_STRENGTH_FACTOR,
            half_life_days: half_life_days_for(conviction),
            influence_type: influence_type_for(conviction),
            spawned_at: now,
            trigger_count: 0,
            total_influence_applied: 0.0,
        })
    }

    /// Strength at the given instant: `initial * 0.5^(elapsed / half_life)`.
    #[must_use]
    pub fn current_strength(&self, now: DateTime<Utc>) -> f64 {
        let elapsed = days_between(self.spawned_at, now);
        self.initial_strength * 0.5_f64.powf(elapsed / f64::from(self.half_life_days))
    }

    /// Returns true while the echo still carries noticeable influence.
    #[must_use]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.current_strength(now) >= INACTIVE_THRESHOLD
    }

    /// Records that this echo altered a decision.
    pub fn record_trigger(&mut self, influence_applied: f64) {
        self.trigger_count += 1;
        self.total_influence_applied += influence_applied;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::belief::BeliefType;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-03-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn belief_with_conviction(score: u8) -> Belief {
        Belief::builder()
            .statement("the user prefers formal tone")
            .belief_type(BeliefType::Relational)
            .conviction(score)
            .build(now())
            .unwrap()
    }

    #[test]
    fn test_half_life_tiers() {
        assert_eq!(half_life_days_for(70), 60);
        assert_eq!(half_life_days_for(69), 30);
        assert_eq!(half_life_days_for(40), 30);
        assert_eq!(half_life_days_for(39), 14);
        assert_eq!(half_life_days_for(20), 14);
    }

    #[test]
    fn test_spawn_floor() {
        assert!(BeliefEcho::spawn_from(&belief_with_conviction(19), now()).is_none());
        assert!(BeliefEcho::spawn_from(&belief_with_conviction(20), now()).is_some());
    }

    #[test]
    fn test_spawn_conviction_75() {
        let echo = BeliefEcho::spawn_from(&belief_with_conviction(75), now()).unwrap();
        assert!((echo.initial_strength - 0.5625).abs() < 1e-12);
        assert_eq!(echo.half_life_days, 60);
        assert_eq!(echo.influence_type, InfluenceType::Resistance);
    }

    #[test]
    fn test_strength_at_zero_and_half_life() {
        let echo = BeliefEcho::spawn_from(&belief_with_conviction(80), now()).unwrap();

        let at_spawn = echo.current_strength(now());
        assert!((at_spawn - echo.initial_strength).abs() < 1e-12);

        let at_half_life = echo.current_strength(now() + Duration::days(60));
        assert!((at_half_life - echo.initial_strength / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_strength_monotonically_non_increasing() {
        let echo = BeliefEcho::spawn_from(&belief_with_conviction(50), now()).unwrap();
        let mut prev = echo.current_strength(now());
        for day in 1..120 {
            let s = echo.current_strength(now() + Duration::days(day));
            assert!(s <= prev, "strength rose at day {day}");
            prev = s;
        }
    }

    #[test]
    fn test_clock_skew_never_strengthens() {
        let echo = BeliefEcho::spawn_from(&belief_with_conviction(50), now()).unwrap();
        let before_spawn = echo.current_strength(now() - Duration::days(5));
        assert!((before_spawn - echo.initial_strength).abs() < 1e-12);
    }

    #[test]
    fn test_becomes_inactive() {
        let echo = BeliefEcho::spawn_from(&belief_with_conviction(20), now()).unwrap();
        // initial = 0.15, half-life 14d; 0.15 * 0.5^(t/14) < 0.02 after ~41 days.
        assert!(echo.is_active_at(now() + Duration::days(40)));
        assert!(!echo.is_active_at(now() + Duration::days(42)));
    }

    #[test]
    fn test_record_trigger_accumulates() {
        let mut echo = BeliefEcho::spawn_from(&belief_with_conviction(60), now()).unwrap();
        echo.record_trigger(0.4);
        echo.record_trigger(0.3);
        assert_eq!(echo.trigger_count, 2);
        assert!((echo.total_influence_applied - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_influence_tiers() {
        assert_eq!(influence_type_for(85), InfluenceType::Resistance);
        assert_eq!(influence_type_for(55), InfluenceType::PullTowardOld);
        assert_eq!(influence_type_for(25), InfluenceType::Hesitation);
    }
}
