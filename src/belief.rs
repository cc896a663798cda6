//! Belief types — the atomic unit of the identity graph.
//!
//! A belief is a held statement with a conviction score, a validity
//! interval, and a mandatory causal justification (enforced by the
//! causality graph at creation, not by the row itself).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::anchor::AnchorId;
use crate::error::ValidationError;
use crate::time::Validity;

/// Unique identifier for a belief.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BeliefId(Uuid);

impl BeliefId {
    /// Creates a new random belief ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BeliefId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BeliefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What kind of statement a belief is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeliefType {
    /// A normative commitment ("deception is wrong").
    Value,
    /// A taste or inclination ("prefers concise answers").
    Preference,
    /// A statement about the agent itself.
    SelfKnowledge,
    /// A statement about the world.
    WorldModel,
    /// A statement about a relationship with a specific person.
    Relational,
}

impl fmt::Display for BeliefType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value => write!(f, "value"),
            Self::Preference => write!(f, "preference"),
            Self::SelfKnowledge => write!(f, "self_knowledge"),
            Self::WorldModel => write!(f, "world_model"),
            Self::Relational => write!(f, "relational"),
        }
    }
}

/// A held statement with conviction and temporal validity.
///
/// Exactly one version in a supersession chain is active at a time; the
/// engine closes `validity` and sets `superseded_by` when a belief is
/// replaced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Belief {
    pub id: BeliefId,
    pub statement: String,
    pub belief_type: BeliefType,

    /// Confidence in the statement (0-100).
    pub conviction_score: u8,

    /// `[valid_from, valid_to)`; open end means currently held.
    pub validity: Validity,

    /// Anchor this belief hangs off, if any. Weakening a belief tied to a
    /// locked anchor opens a distress episode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor_id: Option<AnchorId>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub supersedes: Option<BeliefId>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub superseded_by: Option<BeliefId>,

    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl Belief {
    /// Starts building a belief.
    #[must_use]
    pub fn builder() -> BeliefBuilder {
        BeliefBuilder::new()
    }

    /// Returns true if this belief is currently held (not superseded and
    /// valid at `now`).
    #[must_use]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.superseded_by.is_none() && self.validity.is_active_at(now)
    }

    /// Returns true if a newer version replaced this belief.
    #[must_use]
    pub const fn is_superseded(&self) -> bool {
        self.superseded_by.is_some()
    }

    /// Applies a conviction delta, clamped to 0-100. Returns the new score.
    pub fn apply_conviction_delta(&mut self, delta: i16) -> u8 {
        let new = (i16::from(self.conviction_score) + delta).clamp(0, 100);
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        {
            self.conviction_score = new as u8;
        }
        self.conviction_score
    }

    /// Marks this belief as superseded and closes its validity.
    pub fn mark_superseded(&mut self, by: BeliefId, at: DateTime<Utc>) {
        self.superseded_by = Some(by);
        self.validity.close_at(at);
    }
}

impl PartialEq for Belief {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Belief {}

impl std::hash::Hash for Belief {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Builder for creating Belief instances.
#[derive(Debug, Default)]
pub struct BeliefBuilder {
    id: Option<BeliefId>,
    statement: Option<String>,
    belief_type: Option<BeliefType>,
    conviction_score: Option<u8>,
    anchor_id: Option<AnchorId>,
    supersedes: Option<BeliefId>,
    valid_from: Option<DateTime<Utc>>,
    metadata: Option<serde_json::Value>,
}

impl BeliefBuilder {
    /// Creates a new belief builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the belief ID (generated if not set).
    #[must_use]
    pub fn id(mut self, id: BeliefId) -> Self {
        self.id = Some(id);
        self
    }

    /// Sets the statement.
    #[must_use]
    pub fn statement(mut self, statement: impl Into<String>) -> Self {
        self.statement = Some(statement.into());
        self
    }

    /// Sets the belief type.
    #[must_use]
    pub fn belief_type(mut self, belief_type: BeliefType) -> Self {
        self.belief_type = Some(belief_type);
        self
    }

    /// Sets the conviction score (defaults to 50).
    #[must_use]
    pub fn conviction(mut self, score: u8) -> Self {
        self.conviction_score = Some(score);
        self
    }

    /// Sets the causing anchor.
    #[must_use]
    pub fn anchor(mut self, anchor_id: AnchorId) -> Self {
        self.anchor_id = Some(anchor_id);
        self
    }

    /// Sets the belief this one supersedes.
    #[must_use]
    pub fn supersedes(mut self, supersedes: BeliefId) -> Self {
        self.supersedes = Some(supersedes);
        self
    }

    /// Sets the start of validity (defaults to `now` at build time).
    #[must_use]
    pub fn valid_from(mut self, from: DateTime<Utc>) -> Self {
        self.valid_from = Some(from);
        self
    }

    /// Sets the metadata.
    #[must_use]
    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Builds the Belief.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if required fields are missing or invalid.
    pub fn build(self, now: DateTime<Utc>) -> Result<Belief, ValidationError> {
        let statement = self.statement.ok_or(ValidationError::MissingField {
            field: "statement".to_string(),
        })?;
        if statement.trim().is_empty() {
            return Err(ValidationError::EmptyStatement);
        }

        let belief_type = self.belief_type.ok_or(ValidationError::MissingField {
            field: "belief_type".to_string(),
        })?;

        let conviction_score = self.conviction_score.unwrap_or(50);
        if conviction_score > 100 {
            return Err(ValidationError::ConvictionOutOfRange {
                value: i32::from(conviction_score),
            });
        }

        Ok(Belief {
            id: self.id.unwrap_or_else(BeliefId::new),
            statement,
            belief_type,
            conviction_score,
            validity: Validity::starting_at(self.valid_from.unwrap_or(now)),
            anchor_id: self.anchor_id,
            supersedes: self.supersedes,
            superseded_by: None,
            created_at: now,
            metadata: self.metadata.unwrap_or(serde_json::Value::Null),
        })
    }
}

/// Read-only filter for the active-belief query surface.
#[derive(Debug, Default, Clone)]
pub struct BeliefFilter {
    /// Only beliefs of this type.
    pub belief_type: Option<BeliefType>,
    /// Only beliefs with at least this conviction.
    pub min_conviction: Option<u8>,
    /// Only beliefs tied to this anchor.
    pub anchor_id: Option<AnchorId>,
    /// Only beliefs whose statement contains this substring (case-insensitive).
    pub statement_contains: Option<String>,
}

impl BeliefFilter {
    /// Returns true if the belief passes every set predicate.
    #[must_use]
    pub fn matches(&self, belief: &Belief) -> bool {
        if let Some(bt) = self.belief_type {
            if belief.belief_type != bt {
                return false;
            }
        }
        if let Some(min) = self.min_conviction {
            if belief.conviction_score < min {
                return false;
            }
        }
        if let Some(anchor) = self.anchor_id {
            if belief.anchor_id != Some(anchor) {
                return false;
            }
        }
        if let Some(needle) = &self.statement_contains {
            if !belief
                .statement
                .to_lowercase()
                .contains(&needle.to_lowercase())
            {
                return false;
            }
        }
        true
    }
}
