//! Causal links — why a belief exists.
//!
//! Every belief must carry at least one causal link at creation time. Links
//! are first-class rows: they can be listed to explain a belief and are
//! deactivated (never deleted) when the belief they justify dies.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::anchor::AnchorId;
use crate::belief::BeliefId;
use crate::error::ValidationError;
use crate::event::EventId;

/// Unique identifier for a causal link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkId(Uuid);

impl LinkId {
    /// Creates a new random link ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LinkId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a belief is caused by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum CauseRef {
    /// Another belief.
    Belief(BeliefId),
    /// A formative event.
    Event(EventId),
    /// An identity anchor.
    Anchor(AnchorId),
}

impl fmt::Display for CauseRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Belief(id) => write!(f, "belief:{id}"),
            Self::Event(id) => write!(f, "event:{id}"),
            Self::Anchor(id) => write!(f, "anchor:{id}"),
        }
    }
}

/// How a cause relates to its effect belief.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CausalRelation {
    /// The cause is where the belief came from.
    FormedFrom,
    /// The cause logically implies the belief.
    Implies,
    /// The cause contradicts the belief (tension material).
    Contradicts,
    /// The cause lends support without implying.
    Supports,
    /// The belief requires the cause to hold.
    Requires,
    /// The belief was derived from the cause by inference.
    DerivedFrom,
}

impl fmt::Display for CausalRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FormedFrom => write!(f, "formed_from"),
            Self::Implies => write!(f, "implies"),
            Self::Contradicts => write!(f, "contradicts"),
            Self::Supports => write!(f, "supports"),
            Self::Requires => write!(f, "requires"),
            Self::DerivedFrom => write!(f, "derived_from"),
        }
    }
}

/// One edge of the causal graph: cause → effect belief.
///
/// Unique per (cause, effect, relation) among active links.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CausalLink {
    pub id: LinkId,
    pub cause: CauseRef,
    pub effect_belief_id: BeliefId,
    pub relation: CausalRelation,

    /// How strongly the cause bears on the effect, 0.0-1.0.
    pub strength: f32,

    pub created_at: DateTime<Utc>,

    /// Deactivated when the effect belief dies; never deleted.
    pub is_active: bool,
}

impl CausalLink {
    /// Creates a new active causal link.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::StrengthOutOfRange` if `strength` is
    /// outside [0, 1].
    pub fn new(
        cause: CauseRef,
        effect_belief_id: BeliefId,
        relation: CausalRelation,
        strength: f32,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        if !(0.0..=1.0).contains(&strength) {
            return Err(ValidationError::StrengthOutOfRange { value: strength });
        }

        Ok(Self {
            id: LinkId::new(),
            cause,
            effect_belief_id,
            relation,
            strength,
            created_at: now,
            is_active: true,
        })
    }

    /// The (cause, effect, relation) triple that must be unique among
    /// active links.
    #[must_use]
    pub fn triple(&self) -> (CauseRef, BeliefId, CausalRelation) {
        (self.cause, self.effect_belief_id, self.relation)
    }
}

/// A proposed justification for a belief being created.
///
/// The extraction pipeline supplies these with `create_belief`; the engine
/// validates cause liveness and converts each into a stored [`CausalLink`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Justification {
    pub cause: CauseRef,
    pub relation: CausalRelation,
    pub strength: f32,
}

impl Justification {
    /// Convenience constructor.
    #[must_use]
    pub fn new(cause: CauseRef, relation: CausalRelation, strength: f32) -> Self {
        Self {
            cause,
            relation,
            strength,
        }
    }

    /// A `formed_from` justification at full strength.
    #[must_use]
    pub fn formed_from(cause: CauseRef) -> Self {
        Self::new(cause, CausalRelation::FormedFrom, 1.0)
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

    #[test]
    fn test_link_new() {
        let effect = BeliefId::new();
        let link = CausalLink::new(
            CauseRef::Anchor(AnchorId::new()),
            effect,
            CausalRelation::FormedFrom,
            0.9,
            now(),
        )
        .unwrap();

        assert!(link.is_active);
        assert_eq!(link.effect_belief_id, effect);
    }

    #[test]
    fn test_link_rejects_out_of_range_strength() {
        let result = CausalLink::new(
            CauseRef::Belief(BeliefId::new()),
            BeliefId::new(),
            CausalRelation::Supports,
            1.2,
            now(),
        );
        assert!(matches!(
            result,
            Err(ValidationError::StrengthOutOfRange { .. })
        ));
    }

    #[test]
    fn test_triple_identity() {
        let cause = CauseRef::Event(EventId::new());
        let effect = BeliefId::new();
        let a = CausalLink::new(cause, effect, CausalRelation::Supports, 0.5, now()).unwrap();
        let b = CausalLink::new(cause, effect, CausalRelation::Supports, 0.8, now()).unwrap();

        // Same triple regardless of strength; uniqueness is on the triple.
        assert_eq!(a.triple(), b.triple());
    }

    #[test]
    fn test_cause_ref_display() {
        let id = BeliefId::new();
        assert!(format!("{}", CauseRef::Belief(id)).starts_with("belief:"));
    }

    #[test]
    fn test_relation_display() {
        assert_eq!(format!("{}", CausalRelation::FormedFrom), "formed_from");
        assert_eq!(format!("{}", CausalRelation::Contradicts), "contradicts");
    }

    #[test]
    fn test_justification_formed_from() {
        let j = Justification::formed_from(CauseRef::Anchor(AnchorId::new()));
        assert_eq!(j.relation, CausalRelation::FormedFrom);
        assert!((j.strength - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_link_serialization() {
        let link = CausalLink::new(
            CauseRef::Belief(BeliefId::new()),
            BeliefId::new(),
            CausalRelation::DerivedFrom,
            0.7,
            now(),
        )
        .unwrap();

        let json = serde_json::to_string(&link).unwrap();
        let deserialized: CausalLink = serde_json::from_str(&json).unwrap();
        assert_eq!(link.id, deserialized.id);
        assert_eq!(link.triple(), deserialized.triple());
    }
}
