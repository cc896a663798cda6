//! Identity anchors — top-level principles beliefs derive from.
//!
//! An anchor becomes locked once its stability crosses the lock threshold;
//! locked anchors refuse statement/rule mutation, and anchors above the
//! deletion guard refuse deletion entirely.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Unique identifier for an identity anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnchorId(Uuid);

impl AnchorId {
    /// Creates a new random anchor ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AnchorId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AnchorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stability at or above which an anchor locks permanently.
pub const LOCK_THRESHOLD: u8 = 80;

/// Stability above which an anchor refuses deletion, locked or not.
pub const DELETE_GUARD: u8 = 90;

/// An immutable-once-locked principle.
///
/// Anchors are the roots of the causal graph: beliefs may cite an anchor as
/// their cause, and weakening a belief tied to a locked anchor is what opens
/// a distress episode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityAnchor {
    pub id: AnchorId,

    /// The principle itself ("be genuinely helpful", ...).
    pub statement: String,

    /// Optional behavioral rule derived from the statement.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,

    /// How settled this anchor is (0-100). Crossing [`LOCK_THRESHOLD`] locks it.
    pub stability_score: u8,

    /// Locking is one-way; this never flips back to false.
    pub is_locked: bool,

    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl IdentityAnchor {
    /// Creates a new anchor, locking it immediately if stability starts at
    /// or above the threshold.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for an empty statement or out-of-range
    /// stability.
    pub fn new(
        statement: impl Into<String>,
        rule: Option<String>,
        stability_score: u8,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let statement = statement.into();
        if statement.trim().is_empty() {
            return Err(ValidationError::EmptyStatement);
        }
        if stability_score > 100 {
            return Err(ValidationError::StabilityOutOfRange {
                value: i32::from(stability_score),
            });
        }

        Ok(Self {
            id: AnchorId::new(),
            statement,
            rule,
            stability_score,
            is_locked: stability_score >= LOCK_THRESHOLD,
            created_at: now,
            metadata: serde_json::Value::Null,
        })
    }

    /// Returns true if the anchor's defining fields are frozen.
    #[must_use]
    pub const fn is_locked(&self) -> bool {
        self.is_locked
    }

    /// Returns true if deletion must be refused.
    #[must_use]
    pub const fn deletion_guarded(&self) -> bool {
        self.stability_score > DELETE_GUARD
    }

    /// Applies a stability delta, clamped to 0-100.
    ///
    /// Crossing the lock threshold locks the anchor permanently. Lowering
    /// stability never unlocks it.
    pub fn apply_stability_delta(&mut self, delta: i16) {
        let new = (i16::from(self.stability_score) + delta).clamp(0, 100);
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        {
            self.stability_score = new as u8;
        }
        if self.stability_score >= LOCK_THRESHOLD {
            self.is_locked = true;
        }
    }
}
