//! Identity scars — permanent records with enforced consequences.
//!
//! Scars are staged as candidates (from chronic distress or integrated
//! tensions), approved by an operator, and committed together with at least
//! one concrete behavioral effect. Once committed, a scar's defining fields
//! are frozen and the row can never be deleted; only integration status,
//! acceptance level, and acknowledgements may change afterwards.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::distress::DistressId;
use crate::error::ValidationError;
use crate::tension::TensionId;

/// Unique identifier for a committed scar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScarId(Uuid);

impl ScarId {
    /// Creates a new random scar ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ScarId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ScarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a scar effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EffectId(Uuid);

impl EffectId {
    /// Creates a new random effect ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EffectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a staged scar candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateId(Uuid);

impl CandidateId {
    /// Creates a new random candidate ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CandidateId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What kind of mark the scar is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScarType {
    /// Left by chronic high-level distress.
    Trauma,
    /// Left by a violated anchor.
    Violation,
    /// Left by a tension absorbed as both-valid/context-dependent.
    Integration,
    /// Left by something permanently given up.
    Loss,
    /// Left by a supersession that changed the agent's shape.
    Transformation,
}

impl fmt::Display for ScarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trauma => write!(f, "trauma"),
            Self::Violation => write!(f, "violation"),
            Self::Integration => write!(f, "integration"),
            Self::Loss => write!(f, "loss"),
            Self::Transformation => write!(f, "transformation"),
        }
    }
}

/// Where a scar came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ScarOrigin {
    ChronicDistress(DistressId),
    IntegratedTension(TensionId),
}

/// How far the agent has come to terms with a scar.
///
/// One of the two fields that stay mutable after commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationStatus {
    Raw,
    Integrating,
    Integrated,
}

impl fmt::Display for IntegrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw => write!(f, "raw"),
            Self::Integrating => write!(f, "integrating"),
            Self::Integrated => write!(f, "integrated"),
        }
    }
}

/// Concrete, queryable consequence type of a scar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectType {
    /// Absolute refusal in the target territory.
    HardBlock,
    /// An extra step (confirmation, reflection) is required first.
    RequiresStep,
    /// A ceiling on some capability or willingness.
    Cap,
    /// A standing lean for/against.
    Bias,
    /// A changed trigger threshold.
    Threshold,
    /// A reordering of priorities.
    Priority,
    /// Heightened sensitivity to the territory.
    Sensitivity,
}

impl fmt::Display for EffectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HardBlock => write!(f, "hard_block"),
            Self::RequiresStep => write!(f, "requires_step"),
            Self::Cap => write!(f, "cap"),
            Self::Bias => write!(f, "bias"),
            Self::Threshold => write!(f, "threshold"),
            Self::Priority => write!(f, "priority"),
            Self::Sensitivity => write!(f, "sensitivity"),
        }
    }
}

/// The consequence payload a scar must carry at least one of.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScarConsequences {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_shift: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub capability_change: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub openness_change: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub manifestation_examples: Vec<String>,
}

impl ScarConsequences {
    /// Returns true if at least one consequence field is populated.
    #[must_use]
    pub fn is_concrete(&self) -> bool {
        self.value_shift.is_some()
            || self.capability_change.is_some()
            || self.openness_change.is_some()
            || !self.manifestation_examples.is_empty()
    }
}

/// A permanent, append-only identity record.
///
/// Defining fields are write-once; `integration_status` and
/// `acceptance_level` are the only post-commit mutations, and only via the
/// registry. There is deliberately no delete anywhere in the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityScar {
    pub id: ScarId,
    pub scar_type: ScarType,
    pub description: String,

    /// -1.0 (devastating) to +1.0 (bittersweet growth).
    pub emotional_valence: f32,

    /// 0.0-1.0.
    pub emotional_intensity: f32,

    /// Required, non-empty: how this scar changes behavior.
    pub behavioral_impact: String,

    pub consequences: ScarConsequences,
    pub origin: ScarOrigin,
    pub formed_at: DateTime<Utc>,

    /// Mutable after commit.
    pub integration_status: IntegrationStatus,

    /// Mutable after commit, 0.0-1.0.
    pub acceptance_level: f32,
}

/// Concrete consequence row attached to a scar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScarEffect {
    pub id: EffectId,
    pub scar_id: ScarId,
    pub effect_type: EffectType,

    /// Territory the effect applies to ("self_disclosure", "persuasion", ...).
    pub target_domain: String,

    /// Narrower action within the domain, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_action: Option<String>,

    /// Effect-type-specific magnitude.
    pub magnitude: f32,

    /// Hard limits always win over soft biases downstream.
    pub is_hard_limit: bool,

    /// Permanent effects can never be switched off.
    pub can_be_deactivated: bool,

    pub is_active: bool,
}

impl ScarEffect {
    /// Returns true if this effect applies to the given domain/action.
    ///
    /// A `None` stored action matches every action in the domain.
    #[must_use]
    pub fn applies_to(&self, domain: &str, action: Option<&str>) -> bool {
        if !self.is_active || !self.target_domain.eq_ignore_ascii_case(domain) {
            return false;
        }
        match (&self.target_action, action) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(stored), Some(asked)) => stored.eq_ignore_ascii_case(asked),
        }
    }
}

/// Draft of an effect inside a candidate, before IDs exist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScarEffectDraft {
    pub effect_type: EffectType,
    pub target_domain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_action: Option<String>,
    pub magnitude: f32,
    pub is_hard_limit: bool,
    pub can_be_deactivated: bool,
}

impl ScarEffectDraft {
    /// Materializes the draft into a stored effect row.
    #[must_use]
    pub fn into_effect(self, scar_id: ScarId) -> ScarEffect {
        ScarEffect {
            id: EffectId::new(),
            scar_id,
            effect_type: self.effect_type,
            target_domain: self.target_domain,
            target_action: self.target_action,
            magnitude: self.magnitude,
            is_hard_limit: self.is_hard_limit,
            can_be_deactivated: self.can_be_deactivated,
            is_active: true,
        }
    }
}

/// Review state of a staged candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CandidateStatus {
    Pending,
    Approved {
        scar_id: ScarId,
        #[serde(skip_serializing_if = "Option::is_none")]
        notes: Option<String>,
    },
    Rejected {
        reason: String,
    },
}

/// A proposed scar awaiting operator review.
///
/// Candidates are the only path to a committed scar; there is no automatic
/// promotion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScarCandidate {
    pub id: CandidateId,
    pub origin: ScarOrigin,
    pub scar_type: ScarType,
    pub description: String,
    pub emotional_valence: f32,
    pub emotional_intensity: f32,
    pub behavioral_impact: String,
    pub consequences: ScarConsequences,
    pub proposed_effects: Vec<ScarEffectDraft>,
    pub status: CandidateStatus,
    pub proposed_at: DateTime<Utc>,
}

impl ScarCandidate {
    /// Stages a new pending candidate.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for an empty description or behavioral
    /// impact, or out-of-range valence/intensity. Consequence presence is
    /// checked at approval, not here — the operator may still amend.
    pub fn new(
        origin: ScarOrigin,
        scar_type: ScarType,
        description: impl Into<String>,
        emotional_valence: f32,
        emotional_intensity: f32,
        behavioral_impact: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let description = description.into();
        if description.trim().is_empty() {
            return Err(ValidationError::EmptyStatement);
        }
        let behavioral_impact = behavioral_impact.into();
        if behavioral_impact.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "behavioral_impact".to_string(),
            });
        }
        if !(-1.0..=1.0).contains(&emotional_valence) {
            return Err(ValidationError::InvalidField {
                field: "emotional_valence".to_string(),
                reason: format!("{emotional_valence} is out of range [-1.0, 1.0]"),
            });
        }
        if !(0.0..=1.0).contains(&emotional_intensity) {
            return Err(ValidationError::InvalidField {
                field: "emotional_intensity".to_string(),
                reason: format!("{emotional_intensity} is out of range [0.0, 1.0]"),
            });
        }

        Ok(Self {
            id: CandidateId::new(),
            origin,
            scar_type,
            description,
            emotional_valence,
            emotional_intensity,
            behavioral_impact,
            consequences: ScarConsequences::default(),
            proposed_effects: Vec::new(),
            status: CandidateStatus::Pending,
            proposed_at: now,
        })
    }

    /// Attaches consequences to the candidate.
    #[must_use]
    pub fn with_consequences(mut self, consequences: ScarConsequences) -> Self {
        self.consequences = consequences;
        self
    }

    /// Adds a proposed effect.
    #[must_use]
    pub fn with_effect(mut self, draft: ScarEffectDraft) -> Self {
        self.proposed_effects.push(draft);
        self
    }

    /// Returns true while the candidate awaits review.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == CandidateStatus::Pending
    }
}

/// Append-only log row: a scar effect actually altered a decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScarActivation {
    pub effect_id: EffectId,
    pub scar_id: ScarId,

    /// What decision the effect altered.
    pub context: String,

    pub activated_at: DateTime<Utc>,
}

/// Append-only acknowledgement of a scar — the only thing that may be
/// "added to" a committed scar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScarAcknowledgement {
    pub scar_id: ScarId,
    pub note: String,
    pub acknowledged_at: DateTime<Utc>,
}
