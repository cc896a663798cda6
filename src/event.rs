//! Formative events — things that happened to the agent.
//!
//! Events are valid causes in the causal graph: a belief may cite the event
//! that formed it rather than another belief or an anchor.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Unique identifier for a formative event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random event ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A recorded experience that can justify beliefs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormativeEvent {
    pub id: EventId,
    pub description: String,

    /// Free-form category ("conflict", "praise", "loss", ...).
    pub event_type: String,

    /// How charged the event was, 0.0-1.0.
    pub emotional_weight: f32,

    pub occurred_at: DateTime<Utc>,
}

impl FormativeEvent {
    /// Creates a new formative event.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for an empty description or a weight
    /// outside [0, 1].
    pub fn new(
        description: impl Into<String>,
        event_type: impl Into<String>,
        emotional_weight: f32,
        occurred_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let description = description.into();
        if description.trim().is_empty() {
            return Err(ValidationError::EmptyStatement);
        }
        if !(0.0..=1.0).contains(&emotional_weight) {
            return Err(ValidationError::InvalidField {
                field: "emotional_weight".to_string(),
                reason: format!("{emotional_weight} is out of range [0.0, 1.0]"),
            });
        }

        Ok(Self {
            id: EventId::new(),
            description,
            event_type: event_type.into(),
            emotional_weight,
            occurred_at,
        })
    }
}
