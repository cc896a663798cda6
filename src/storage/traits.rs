//! Abstract storage traits for the identity graph.
//!
//! One trait per owned table, mirroring the ownership rules: the engine is
//! the only writer, collaborators get shared reads through the engine's
//! query surface. Append-only tables (revisions, activations,
//! acknowledgements) expose no update or delete. The scar trait exposes no
//! delete at all — undeletability is structural, not a runtime check.

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::anchor::{AnchorId, IdentityAnchor};
use crate::belief::{Belief, BeliefId};
use crate::causality::{CausalLink, CausalRelation, CauseRef};
use crate::distress::{DistressId, IdentityDistress};
use crate::echo::{BeliefEcho, EchoId};
use crate::event::{EventId, FormativeEvent};
use crate::load::CognitiveLoad;
use crate::revision::{Revision, RevisionTarget};
use crate::scar::{
    CandidateId, EffectId, IdentityScar, IntegrationStatus, ScarAcknowledgement, ScarActivation,
    ScarCandidate, ScarEffect, ScarId,
};
use crate::tension::{CognitiveTension, TensionActivation, TensionId};

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Anchor not found: {0}")]
    AnchorNotFound(AnchorId),

    #[error("Belief not found: {0}")]
    BeliefNotFound(BeliefId),

    #[error("Event not found: {0}")]
    EventNotFound(EventId),

    #[error("Echo not found: {0}")]
    EchoNotFound(EchoId),

    #[error("Tension not found: {0}")]
    TensionNotFound(TensionId),

    #[error("Distress episode not found: {0}")]
    DistressNotFound(DistressId),

    #[error("Scar not found: {0}")]
    ScarNotFound(ScarId),

    #[error("Scar effect not found: {0}")]
    EffectNotFound(EffectId),

    #[error("Scar candidate not found: {0}")]
    CandidateNotFound(CandidateId),

    #[error("No cognitive load row for day {0}")]
    LoadDayNotFound(NaiveDate),

    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Storage for identity anchors.
pub trait AnchorStore: Send + Sync {
    /// Insert a new anchor. Returns error if the ID already exists.
    fn insert(&self, anchor: IdentityAnchor) -> Result<(), StorageError>;

    /// Get an anchor by ID.
    fn get(&self, id: AnchorId) -> Result<Option<IdentityAnchor>, StorageError>;

    /// Replace an existing anchor row. Returns error if not found.
    fn update(&self, anchor: IdentityAnchor) -> Result<(), StorageError>;

    /// Delete an anchor. Policy checks (deletion guard) happen in the
    /// engine before this is called.
    fn delete(&self, id: AnchorId) -> Result<(), StorageError>;

    /// All anchors.
    fn all(&self) -> Result<Vec<IdentityAnchor>, StorageError>;
}

/// Storage for formative events.
pub trait EventStore: Send + Sync {
    /// Insert a new event.
    fn insert(&self, event: FormativeEvent) -> Result<(), StorageError>;

    /// Get an event by ID.
    fn get(&self, id: EventId) -> Result<Option<FormativeEvent>, StorageError>;

    /// All events.
    fn all(&self) -> Result<Vec<FormativeEvent>, StorageError>;
}

/// Storage for beliefs.
pub trait BeliefStore: Send + Sync {
    /// Insert a new belief. Returns error if the ID already exists.
    fn insert(&self, belief: Belief) -> Result<(), StorageError>;

    /// Get a belief by ID.
    fn get(&self, id: BeliefId) -> Result<Option<Belief>, StorageError>;

    /// Apply a conviction delta to one belief as a single serialized
    /// read-modify-write. Returns (old score, new score).
    fn apply_conviction_delta(
        &self,
        id: BeliefId,
        delta: i16,
    ) -> Result<(u8, u8), StorageError>;

    /// Mark `old_id` superseded by `new_id` at the given instant, closing
    /// its validity and linking both directions in one unit of work.
    fn supersede(
        &self,
        old_id: BeliefId,
        new_id: BeliefId,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// All beliefs active at `now`.
    fn find_active(&self, now: DateTime<Utc>) -> Result<Vec<Belief>, StorageError>;

    /// All beliefs tied to an anchor, active or not.
    fn find_by_anchor(&self, anchor_id: AnchorId) -> Result<Vec<Belief>, StorageError>;
}

/// Storage for causal links.
pub trait CausalityStore: Send + Sync {
    /// Insert a new link. Returns error on a duplicate active
    /// (cause, effect, relation) triple.
    fn insert(&self, link: CausalLink) -> Result<(), StorageError>;

    /// Full justification history for a belief, active links first. Rows
    /// survive the belief's death — this is the audit surface for "why did
    /// this belief exist".
    fn links_for_effect(&self, belief_id: BeliefId) -> Result<Vec<CausalLink>, StorageError>;

    /// All active links citing a cause.
    fn links_for_cause(&self, cause: CauseRef) -> Result<Vec<CausalLink>, StorageError>;

    /// True if an active link with this exact triple exists. Uniqueness is
    /// enforced over active links only.
    fn exists_active(
        &self,
        cause: CauseRef,
        effect: BeliefId,
        relation: CausalRelation,
    ) -> Result<bool, StorageError>;

    /// Deactivate every link justifying a belief (when it is superseded).
    /// Links are never deleted; deactivated rows stay queryable.
    fn deactivate_for_effect(&self, belief_id: BeliefId) -> Result<usize, StorageError>;

    /// Count of all links (active or not) justifying a belief. Never drops
    /// below one once the belief exists.
    fn count_for_effect(&self, belief_id: BeliefId) -> Result<usize, StorageError>;
}

/// Append-only storage for revision audit records.
pub trait RevisionStore: Send + Sync {
    /// Append a revision row. Rows are never mutated afterwards.
    fn append(&self, revision: Revision) -> Result<(), StorageError>;

    /// Full history, oldest first.
    fn all(&self) -> Result<Vec<Revision>, StorageError>;

    /// History for one target, oldest first.
    fn for_target(&self, target: RevisionTarget) -> Result<Vec<Revision>, StorageError>;
}

/// Storage for belief echoes.
pub trait EchoStore: Send + Sync {
    /// Insert a new echo.
    fn insert(&self, echo: BeliefEcho) -> Result<(), StorageError>;

    /// Get an echo by ID.
    fn get(&self, id: EchoId) -> Result<Option<BeliefEcho>, StorageError>;

    /// Record a trigger against an echo as a single serialized
    /// read-modify-write. Returns the updated echo.
    fn record_trigger(
        &self,
        id: EchoId,
        influence_applied: f64,
    ) -> Result<BeliefEcho, StorageError>;

    /// All echoes, active or decayed; callers filter by current strength.
    fn all(&self) -> Result<Vec<BeliefEcho>, StorageError>;
}

/// Storage for the per-day cognitive load rows.
pub trait LoadStore: Send + Sync {
    /// Get the row for a day.
    fn get(&self, day: NaiveDate) -> Result<Option<CognitiveLoad>, StorageError>;

    /// Insert a day row. Returns error if the day already exists.
    fn insert(&self, load: CognitiveLoad) -> Result<(), StorageError>;

    /// Debit a cost against a day's remaining budget as one serialized
    /// statement (the in-store equivalent of `UPDATE ... SET remaining =
    /// remaining - ?`). Returns the updated row.
    fn debit(&self, day: NaiveDate, cost: u32) -> Result<CognitiveLoad, StorageError>;

    /// The most recent day row, if any.
    fn latest(&self) -> Result<Option<CognitiveLoad>, StorageError>;
}

/// Storage for distress episodes.
pub trait DistressStore: Send + Sync {
    /// Insert a new episode.
    fn insert(&self, distress: IdentityDistress) -> Result<(), StorageError>;

    /// Get an episode by ID.
    fn get(&self, id: DistressId) -> Result<Option<IdentityDistress>, StorageError>;

    /// Replace an episode row. Returns error if not found.
    fn update(&self, distress: IdentityDistress) -> Result<(), StorageError>;

    /// Episodes not yet resolved.
    fn find_open(&self) -> Result<Vec<IdentityDistress>, StorageError>;
}

/// Storage for tensions and their activation log.
pub trait TensionStore: Send + Sync {
    /// Insert a new tension.
    fn insert(&self, tension: CognitiveTension) -> Result<(), StorageError>;

    /// Get a tension by ID.
    fn get(&self, id: TensionId) -> Result<Option<CognitiveTension>, StorageError>;

    /// Replace a tension row. Returns error if not found. There is no
    /// delete — tensions persist forever.
    fn update(&self, tension: CognitiveTension) -> Result<(), StorageError>;

    /// Find a tension by its canonical pair.
    fn find_by_pair(
        &self,
        a: BeliefId,
        b: BeliefId,
    ) -> Result<Option<CognitiveTension>, StorageError>;

    /// All tensions.
    fn all(&self) -> Result<Vec<CognitiveTension>, StorageError>;

    /// Append an activation log row.
    fn append_activation(&self, activation: TensionActivation) -> Result<(), StorageError>;

    /// Activation history for one tension, oldest first.
    fn activations_for(&self, id: TensionId) -> Result<Vec<TensionActivation>, StorageError>;
}

/// Storage for committed scars, their effects, and their append-only logs.
///
/// Deliberately exposes no delete for any row and no general update for
/// scars: the two mutable fields have dedicated setters, everything else is
/// frozen at insert.
pub trait ScarStore: Send + Sync {
    /// Insert a scar together with its effects in one unit of work.
    /// Consequence validation happens in the engine before this is called.
    fn insert_scar(
        &self,
        scar: IdentityScar,
        effects: Vec<ScarEffect>,
    ) -> Result<(), StorageError>;

    /// Get a scar by ID.
    fn get_scar(&self, id: ScarId) -> Result<Option<IdentityScar>, StorageError>;

    /// All committed scars.
    fn scars(&self) -> Result<Vec<IdentityScar>, StorageError>;

    /// Set the integration status of a scar (one of its two mutable fields).
    fn set_integration_status(
        &self,
        id: ScarId,
        status: IntegrationStatus,
    ) -> Result<(), StorageError>;

    /// Set the acceptance level of a scar (the other mutable field).
    fn set_acceptance_level(&self, id: ScarId, level: f32) -> Result<(), StorageError>;

    /// Get an effect by ID.
    fn get_effect(&self, id: EffectId) -> Result<Option<ScarEffect>, StorageError>;

    /// Effects belonging to one scar.
    fn effects_for(&self, scar_id: ScarId) -> Result<Vec<ScarEffect>, StorageError>;

    /// All effects across all scars.
    fn all_effects(&self) -> Result<Vec<ScarEffect>, StorageError>;

    /// Flip an effect's active flag. The `can_be_deactivated` policy check
    /// happens in the engine; the store only refuses unknown IDs.
    fn set_effect_active(&self, id: EffectId, active: bool) -> Result<(), StorageError>;

    /// Append an activation log row.
    fn append_activation(&self, activation: ScarActivation) -> Result<(), StorageError>;

    /// Activation history for one effect, oldest first.
    fn activations_for(&self, effect_id: EffectId) -> Result<Vec<ScarActivation>, StorageError>;

    /// Append an acknowledgement.
    fn append_acknowledgement(
        &self,
        acknowledgement: ScarAcknowledgement,
    ) -> Result<(), StorageError>;

    /// Acknowledgements for one scar, oldest first.
    fn acknowledgements_for(
        &self,
        scar_id: ScarId,
    ) -> Result<Vec<ScarAcknowledgement>, StorageError>;
}

/// Storage for staged scar candidates.
pub trait CandidateStore: Send + Sync {
    /// Insert a new candidate.
    fn insert(&self, candidate: ScarCandidate) -> Result<(), StorageError>;

    /// Get a candidate by ID.
    fn get(&self, id: CandidateId) -> Result<Option<ScarCandidate>, StorageError>;

    /// Replace a candidate row (review outcome). Returns error if not found.
    fn update(&self, candidate: ScarCandidate) -> Result<(), StorageError>;

    /// Candidates still awaiting review.
    fn pending(&self) -> Result<Vec<ScarCandidate>, StorageError>;
}
