//! In-memory storage backend.
//!
//! Thread-safe reference implementations of the storage traits, intended
//! for embedded usage and tests. Each store serializes access through one
//! `RwLock`, so every trait method is one unit of work — the in-process
//! analogue of a single-row transaction.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, NaiveDate, Utc};

use crate::anchor::{AnchorId, IdentityAnchor};
use crate::belief::{Belief, BeliefId};
use crate::causality::{CausalLink, CausalRelation, CauseRef};
use crate::distress::{DistressId, DistressStatus, IdentityDistress};
use crate::echo::{BeliefEcho, EchoId};
use crate::event::{EventId, FormativeEvent};
use crate::load::CognitiveLoad;
use crate::revision::{Revision, RevisionTarget};
use crate::scar::{
    CandidateId, EffectId, IdentityScar, IntegrationStatus, ScarAcknowledgement, ScarActivation,
    ScarCandidate, ScarEffect, ScarId,
};
use crate::storage::traits::{
    AnchorStore, BeliefStore, CandidateStore, CausalityStore, DistressStore, EchoStore,
    EventStore, LoadStore, RevisionStore, ScarStore, StorageError, TensionStore,
};
use crate::tension::{canonicalize_pair, CognitiveTension, TensionActivation, TensionId};

fn lock_err(context: &'static str) -> StorageError {
    StorageError::Backend(format!("poisoned lock: {context}"))
}

/// Thread-safe in-memory anchor store.
#[derive(Debug, Default)]
pub struct InMemoryAnchorStore {
    state: RwLock<HashMap<AnchorId, IdentityAnchor>>,
}

impl InMemoryAnchorStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl AnchorStore for InMemoryAnchorStore {
    fn insert(&self, anchor: IdentityAnchor) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("anchor.insert"))?;
        if state.contains_key(&anchor.id) {
            return Err(StorageError::DuplicateKey(anchor.id.to_string()));
        }
        state.insert(anchor.id, anchor);
        Ok(())
    }

    fn get(&self, id: AnchorId) -> Result<Option<IdentityAnchor>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("anchor.get"))?;
        Ok(state.get(&id).cloned())
    }

    fn update(&self, anchor: IdentityAnchor) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("anchor.update"))?;
        if !state.contains_key(&anchor.id) {
            return Err(StorageError::AnchorNotFound(anchor.id));
        }
        state.insert(anchor.id, anchor);
        Ok(())
    }

    fn delete(&self, id: AnchorId) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("anchor.delete"))?;
        state
            .remove(&id)
            .map(|_| ())
            .ok_or(StorageError::AnchorNotFound(id))
    }

    fn all(&self) -> Result<Vec<IdentityAnchor>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("anchor.all"))?;
        let mut anchors: Vec<IdentityAnchor> = state.values().cloned().collect();
        anchors.sort_by_key(|a| a.created_at);
        Ok(anchors)
    }
}

/// Thread-safe in-memory event store.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    state: RwLock<HashMap<EventId, FormativeEvent>>,
}

impl InMemoryEventStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventStore for InMemoryEventStore {
    fn insert(&self, event: FormativeEvent) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("event.insert"))?;
        if state.contains_key(&event.id) {
            return Err(StorageError::DuplicateKey(event.id.to_string()));
        }
        state.insert(event.id, event);
        Ok(())
    }

    fn get(&self, id: EventId) -> Result<Option<FormativeEvent>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("event.get"))?;
        Ok(state.get(&id).cloned())
    }

    fn all(&self) -> Result<Vec<FormativeEvent>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("event.all"))?;
        let mut events: Vec<FormativeEvent> = state.values().cloned().collect();
        events.sort_by_key(|e| e.occurred_at);
        Ok(events)
    }
}

#[derive(Debug, Default)]
struct BeliefState {
    by_id: HashMap<BeliefId, Belief>,
    by_anchor: HashMap<AnchorId, Vec<BeliefId>>,
}

/// Thread-safe in-memory belief store.
#[derive(Debug, Default)]
pub struct InMemoryBeliefStore {
    state: RwLock<BeliefState>,
}

impl InMemoryBeliefStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl BeliefStore for InMemoryBeliefStore {
    fn insert(&self, belief: Belief) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("belief.insert"))?;
        if state.by_id.contains_key(&belief.id) {
            return Err(StorageError::DuplicateKey(belief.id.to_string()));
        }
        if let Some(anchor) = belief.anchor_id {
            state.by_anchor.entry(anchor).or_default().push(belief.id);
        }
        state.by_id.insert(belief.id, belief);
        Ok(())
    }

    fn get(&self, id: BeliefId) -> Result<Option<Belief>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("belief.get"))?;
        Ok(state.by_id.get(&id).cloned())
    }

    fn apply_conviction_delta(
        &self,
        id: BeliefId,
        delta: i16,
    ) -> Result<(u8, u8), StorageError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| lock_err("belief.apply_conviction_delta"))?;
        let belief = state
            .by_id
            .get_mut(&id)
            .ok_or(StorageError::BeliefNotFound(id))?;
        let old = belief.conviction_score;
        let new = belief.apply_conviction_delta(delta);
        Ok((old, new))
    }

    fn supersede(
        &self,
        old_id: BeliefId,
        new_id: BeliefId,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        if old_id == new_id {
            return Err(StorageError::Backend(
                "cannot supersede a belief with itself".to_string(),
            ));
        }

        let mut state = self
            .state
            .write()
            .map_err(|_| lock_err("belief.supersede"))?;

        if !state.by_id.contains_key(&new_id) {
            return Err(StorageError::BeliefNotFound(new_id));
        }

        {
            let old = state
                .by_id
                .get(&old_id)
                .ok_or(StorageError::BeliefNotFound(old_id))?;
            if let Some(existing) = old.superseded_by {
                if existing == new_id {
                    // Idempotent supersession.
                    return Ok(());
                }
                return Err(StorageError::Backend(format!(
                    "belief {old_id} is already superseded by {existing}"
                )));
            }
        }

        let old = state
            .by_id
            .get_mut(&old_id)
            .ok_or(StorageError::BeliefNotFound(old_id))?;
        old.mark_superseded(new_id, at);

        let new = state
            .by_id
            .get_mut(&new_id)
            .ok_or(StorageError::BeliefNotFound(new_id))?;
        if new.supersedes.is_none() {
            new.supersedes = Some(old_id);
        }

        Ok(())
    }

    fn find_active(&self, now: DateTime<Utc>) -> Result<Vec<Belief>, StorageError> {
        let state = self
            .state
            .read()
            .map_err(|_| lock_err("belief.find_active"))?;
        let mut beliefs: Vec<Belief> = state
            .by_id
            .values()
            .filter(|b| b.is_active_at(now))
            .cloned()
            .collect();
        beliefs.sort_by_key(|b| b.created_at);
        Ok(beliefs)
    }

    fn find_by_anchor(&self, anchor_id: AnchorId) -> Result<Vec<Belief>, StorageError> {
        let state = self
            .state
            .read()
            .map_err(|_| lock_err("belief.find_by_anchor"))?;
        let Some(ids) = state.by_anchor.get(&anchor_id) else {
            return Ok(Vec::new());
        };
        Ok(ids
            .iter()
            .filter_map(|id| state.by_id.get(id).cloned())
            .collect())
    }
}

/// Thread-safe in-memory causal-link store.
#[derive(Debug, Default)]
pub struct InMemoryCausalityStore {
    state: RwLock<Vec<CausalLink>>,
}

impl InMemoryCausalityStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CausalityStore for InMemoryCausalityStore {
    fn insert(&self, link: CausalLink) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("link.insert"))?;
        let duplicate = state
            .iter()
            .any(|l| l.is_active && l.triple() == link.triple());
        if duplicate {
            return Err(StorageError::DuplicateKey(format!(
                "{} -{}-> {}",
                link.cause, link.relation, link.effect_belief_id
            )));
        }
        state.push(link);
        Ok(())
    }

    fn links_for_effect(&self, belief_id: BeliefId) -> Result<Vec<CausalLink>, StorageError> {
        let state = self
            .state
            .read()
            .map_err(|_| lock_err("link.links_for_effect"))?;
        let mut links: Vec<CausalLink> = state
            .iter()
            .filter(|l| l.effect_belief_id == belief_id)
            .cloned()
            .collect();
        links.sort_by_key(|l| !l.is_active);
        Ok(links)
    }

    fn links_for_cause(&self, cause: CauseRef) -> Result<Vec<CausalLink>, StorageError> {
        let state = self
            .state
            .read()
            .map_err(|_| lock_err("link.links_for_cause"))?;
        Ok(state
            .iter()
            .filter(|l| l.is_active && l.cause == cause)
            .cloned()
            .collect())
    }

    fn exists_active(
        &self,
        cause: CauseRef,
        effect: BeliefId,
        relation: CausalRelation,
    ) -> Result<bool, StorageError> {
        let state = self
            .state
            .read()
            .map_err(|_| lock_err("link.exists_active"))?;
        Ok(state
            .iter()
            .any(|l| l.is_active && l.triple() == (cause, effect, relation)))
    }

    fn deactivate_for_effect(&self, belief_id: BeliefId) -> Result<usize, StorageError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| lock_err("link.deactivate_for_effect"))?;
        let mut count = 0;
        for link in state
            .iter_mut()
            .filter(|l| l.is_active && l.effect_belief_id == belief_id)
        {
            link.is_active = false;
            count += 1;
        }
        Ok(count)
    }

    fn count_for_effect(&self, belief_id: BeliefId) -> Result<usize, StorageError> {
        let state = self
            .state
            .read()
            .map_err(|_| lock_err("link.count_for_effect"))?;
        Ok(state
            .iter()
            .filter(|l| l.effect_belief_id == belief_id)
            .count())
    }
}

/// Thread-safe in-memory revision log.
#[derive(Debug, Default)]
pub struct InMemoryRevisionStore {
    state: RwLock<Vec<Revision>>,
}

impl InMemoryRevisionStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RevisionStore for InMemoryRevisionStore {
    fn append(&self, revision: Revision) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("revision.append"))?;
        state.push(revision);
        Ok(())
    }

    fn all(&self) -> Result<Vec<Revision>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("revision.all"))?;
        Ok(state.clone())
    }

    fn for_target(&self, target: RevisionTarget) -> Result<Vec<Revision>, StorageError> {
        let state = self
            .state
            .read()
            .map_err(|_| lock_err("revision.for_target"))?;
        Ok(state
            .iter()
            .filter(|r| r.target == target)
            .cloned()
            .collect())
    }
}

/// Thread-safe in-memory echo store.
#[derive(Debug, Default)]
pub struct InMemoryEchoStore {
    state: RwLock<HashMap<EchoId, BeliefEcho>>,
}

impl InMemoryEchoStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl EchoStore for InMemoryEchoStore {
    fn insert(&self, echo: BeliefEcho) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("echo.insert"))?;
        if state.contains_key(&echo.id) {
            return Err(StorageError::DuplicateKey(echo.id.to_string()));
        }
        state.insert(echo.id, echo);
        Ok(())
    }

    fn get(&self, id: EchoId) -> Result<Option<BeliefEcho>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("echo.get"))?;
        Ok(state.get(&id).cloned())
    }

    fn record_trigger(
        &self,
        id: EchoId,
        influence_applied: f64,
    ) -> Result<BeliefEcho, StorageError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| lock_err("echo.record_trigger"))?;
        let echo = state.get_mut(&id).ok_or(StorageError::EchoNotFound(id))?;
        echo.record_trigger(influence_applied);
        Ok(echo.clone())
    }

    fn all(&self) -> Result<Vec<BeliefEcho>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("echo.all"))?;
        let mut echoes: Vec<BeliefEcho> = state.values().cloned().collect();
        echoes.sort_by_key(|e| e.spawned_at);
        Ok(echoes)
    }
}

/// Thread-safe in-memory cognitive-load store.
#[derive(Debug, Default)]
pub struct InMemoryLoadStore {
    state: RwLock<HashMap<NaiveDate, CognitiveLoad>>,
}

impl InMemoryLoadStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoadStore for InMemoryLoadStore {
    fn get(&self, day: NaiveDate) -> Result<Option<CognitiveLoad>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("load.get"))?;
        Ok(state.get(&day).cloned())
    }

    fn insert(&self, load: CognitiveLoad) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("load.insert"))?;
        if state.contains_key(&load.day) {
            return Err(StorageError::DuplicateKey(load.day.to_string()));
        }
        state.insert(load.day, load);
        Ok(())
    }

    fn debit(&self, day: NaiveDate, cost: u32) -> Result<CognitiveLoad, StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("load.debit"))?;
        let load = state
            .get_mut(&day)
            .ok_or(StorageError::LoadDayNotFound(day))?;
        load.debit(cost);
        Ok(load.clone())
    }

    fn latest(&self) -> Result<Option<CognitiveLoad>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("load.latest"))?;
        Ok(state
            .values()
            .max_by_key(|l| l.day)
            .cloned())
    }
}

/// Thread-safe in-memory distress store.
#[derive(Debug, Default)]
pub struct InMemoryDistressStore {
    state: RwLock<HashMap<DistressId, IdentityDistress>>,
}

impl InMemoryDistressStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl DistressStore for InMemoryDistressStore {
    fn insert(&self, distress: IdentityDistress) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("distress.insert"))?;
        if state.contains_key(&distress.id) {
            return Err(StorageError::DuplicateKey(distress.id.to_string()));
        }
        state.insert(distress.id, distress);
        Ok(())
    }

    fn get(&self, id: DistressId) -> Result<Option<IdentityDistress>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("distress.get"))?;
        Ok(state.get(&id).cloned())
    }

    fn update(&self, distress: IdentityDistress) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("distress.update"))?;
        if !state.contains_key(&distress.id) {
            return Err(StorageError::DistressNotFound(distress.id));
        }
        state.insert(distress.id, distress);
        Ok(())
    }

    fn find_open(&self) -> Result<Vec<IdentityDistress>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("distress.find_open"))?;
        let mut open: Vec<IdentityDistress> = state
            .values()
            .filter(|d| d.status != DistressStatus::Resolved)
            .cloned()
            .collect();
        open.sort_by_key(|d| d.opened_at);
        Ok(open)
    }
}

#[derive(Debug, Default)]
struct TensionState {
    by_id: HashMap<TensionId, CognitiveTension>,
    by_pair: HashMap<(BeliefId, BeliefId), TensionId>,
    activations: Vec<TensionActivation>,
}

/// Thread-safe in-memory tension store.
#[derive(Debug, Default)]
pub struct InMemoryTensionStore {
    state: RwLock<TensionState>,
}

impl InMemoryTensionStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TensionStore for InMemoryTensionStore {
    fn insert(&self, tension: CognitiveTension) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("tension.insert"))?;
        if state.by_id.contains_key(&tension.id) {
            return Err(StorageError::DuplicateKey(tension.id.to_string()));
        }
        if state.by_pair.contains_key(&tension.pair()) {
            return Err(StorageError::DuplicateKey(format!(
                "tension pair ({}, {})",
                tension.belief_a_id, tension.belief_b_id
            )));
        }
        state.by_pair.insert(tension.pair(), tension.id);
        state.by_id.insert(tension.id, tension);
        Ok(())
    }

    fn get(&self, id: TensionId) -> Result<Option<CognitiveTension>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("tension.get"))?;
        Ok(state.by_id.get(&id).cloned())
    }

    fn update(&self, tension: CognitiveTension) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("tension.update"))?;
        if !state.by_id.contains_key(&tension.id) {
            return Err(StorageError::TensionNotFound(tension.id));
        }
        state.by_id.insert(tension.id, tension);
        Ok(())
    }

    fn find_by_pair(
        &self,
        a: BeliefId,
        b: BeliefId,
    ) -> Result<Option<CognitiveTension>, StorageError> {
        let state = self
            .state
            .read()
            .map_err(|_| lock_err("tension.find_by_pair"))?;
        let key = canonicalize_pair(a, b);
        Ok(state
            .by_pair
            .get(&key)
            .and_then(|id| state.by_id.get(id))
            .cloned())
    }

    fn all(&self) -> Result<Vec<CognitiveTension>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("tension.all"))?;
        let mut tensions: Vec<CognitiveTension> = state.by_id.values().cloned().collect();
        tensions.sort_by_key(|t| t.opened_at);
        Ok(tensions)
    }

    fn append_activation(&self, activation: TensionActivation) -> Result<(), StorageError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| lock_err("tension.append_activation"))?;
        state.activations.push(activation);
        Ok(())
    }

    fn activations_for(&self, id: TensionId) -> Result<Vec<TensionActivation>, StorageError> {
        let state = self
            .state
            .read()
            .map_err(|_| lock_err("tension.activations_for"))?;
        Ok(state
            .activations
            .iter()
            .filter(|a| a.tension_id == id)
            .cloned()
            .collect())
    }
}

#[derive(Debug, Default)]
struct ScarState {
    scars: HashMap<ScarId, IdentityScar>,
    effects: HashMap<EffectId, ScarEffect>,
    activations: Vec<ScarActivation>,
    acknowledgements: Vec<ScarAcknowledgement>,
}

/// Thread-safe in-memory scar store.
///
/// There is no code path that removes a scar, an effect, or a log row —
/// undeletability is a property of the type, not a runtime veto.
#[derive(Debug, Default)]
pub struct InMemoryScarStore {
    state: RwLock<ScarState>,
}

impl InMemoryScarStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScarStore for InMemoryScarStore {
    fn insert_scar(
        &self,
        scar: IdentityScar,
        effects: Vec<ScarEffect>,
    ) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("scar.insert_scar"))?;
        if state.scars.contains_key(&scar.id) {
            return Err(StorageError::DuplicateKey(scar.id.to_string()));
        }
        for effect in &effects {
            if effect.scar_id != scar.id {
                return Err(StorageError::Backend(format!(
                    "effect {} does not belong to scar {}",
                    effect.id, scar.id
                )));
            }
            if state.effects.contains_key(&effect.id) {
                return Err(StorageError::DuplicateKey(effect.id.to_string()));
            }
        }

        for effect in effects {
            state.effects.insert(effect.id, effect);
        }
        state.scars.insert(scar.id, scar);
        Ok(())
    }

    fn get_scar(&self, id: ScarId) -> Result<Option<IdentityScar>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("scar.get_scar"))?;
        Ok(state.scars.get(&id).cloned())
    }

    fn scars(&self) -> Result<Vec<IdentityScar>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("scar.scars"))?;
        let mut scars: Vec<IdentityScar> = state.scars.values().cloned().collect();
        scars.sort_by_key(|s| s.formed_at);
        Ok(scars)
    }

    fn set_integration_status(
        &self,
        id: ScarId,
        status: IntegrationStatus,
    ) -> Result<(), StorageError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| lock_err("scar.set_integration_status"))?;
        let scar = state.scars.get_mut(&id).ok_or(StorageError::ScarNotFound(id))?;
        scar.integration_status = status;
        Ok(())
    }

    fn set_acceptance_level(&self, id: ScarId, level: f32) -> Result<(), StorageError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| lock_err("scar.set_acceptance_level"))?;
        let scar = state.scars.get_mut(&id).ok_or(StorageError::ScarNotFound(id))?;
        scar.acceptance_level = level;
        Ok(())
    }

    fn get_effect(&self, id: EffectId) -> Result<Option<ScarEffect>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("scar.get_effect"))?;
        Ok(state.effects.get(&id).cloned())
    }

    fn effects_for(&self, scar_id: ScarId) -> Result<Vec<ScarEffect>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("scar.effects_for"))?;
        Ok(state
            .effects
            .values()
            .filter(|e| e.scar_id == scar_id)
            .cloned()
            .collect())
    }

    fn all_effects(&self) -> Result<Vec<ScarEffect>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("scar.all_effects"))?;
        Ok(state.effects.values().cloned().collect())
    }

    fn set_effect_active(&self, id: EffectId, active: bool) -> Result<(), StorageError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| lock_err("scar.set_effect_active"))?;
        let effect = state
            .effects
            .get_mut(&id)
            .ok_or(StorageError::EffectNotFound(id))?;
        effect.is_active = active;
        Ok(())
    }

    fn append_activation(&self, activation: ScarActivation) -> Result<(), StorageError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| lock_err("scar.append_activation"))?;
        state.activations.push(activation);
        Ok(())
    }

    fn activations_for(&self, effect_id: EffectId) -> Result<Vec<ScarActivation>, StorageError> {
        let state = self
            .state
            .read()
            .map_err(|_| lock_err("scar.activations_for"))?;
        Ok(state
            .activations
            .iter()
            .filter(|a| a.effect_id == effect_id)
            .cloned()
            .collect())
    }

    fn append_acknowledgement(
        &self,
        acknowledgement: ScarAcknowledgement,
    ) -> Result<(), StorageError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| lock_err("scar.append_acknowledgement"))?;
        state.acknowledgements.push(acknowledgement);
        Ok(())
    }

    fn acknowledgements_for(
        &self,
        scar_id: ScarId,
    ) -> Result<Vec<ScarAcknowledgement>, StorageError> {
        let state = self
            .state
            .read()
            .map_err(|_| lock_err("scar.acknowledgements_for"))?;
        Ok(state
            .acknowledgements
            .iter()
            .filter(|a| a.scar_id == scar_id)
            .cloned()
            .collect())
    }
}

/// Thread-safe in-memory candidate store.
#[derive(Debug, Default)]
pub struct InMemoryCandidateStore {
    state: RwLock<HashMap<CandidateId, ScarCandidate>>,
}

impl InMemoryCandidateStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CandidateStore for InMemoryCandidateStore {
    fn insert(&self, candidate: ScarCandidate) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("candidate.insert"))?;
        if state.contains_key(&candidate.id) {
            return Err(StorageError::DuplicateKey(candidate.id.to_string()));
        }
        state.insert(candidate.id, candidate);
        Ok(())
    }

    fn get(&self, id: CandidateId) -> Result<Option<ScarCandidate>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("candidate.get"))?;
        Ok(state.get(&id).cloned())
    }

    fn update(&self, candidate: ScarCandidate) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("candidate.update"))?;
        if !state.contains_key(&candidate.id) {
            return Err(StorageError::CandidateNotFound(candidate.id));
        }
        state.insert(candidate.id, candidate);
        Ok(())
    }

    fn pending(&self) -> Result<Vec<ScarCandidate>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("candidate.pending"))?;
        let mut pending: Vec<ScarCandidate> = state
            .values()
            .filter(|c| c.is_pending())
            .cloned()
            .collect();
        pending.sort_by_key(|c| c.proposed_at);
        Ok(pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::belief::BeliefType;
    use crate::causality::Justification;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-03-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn make_belief(statement: &str) -> Belief {
        Belief::builder()
            .statement(statement)
            .belief_type(BeliefType::WorldModel)
            .conviction(60)
            .build(now())
            .unwrap()
    }

    #[test]
    fn test_belief_insert_get() {
        let store = InMemoryBeliefStore::new();
        let belief = make_belief("water is wet");
        let id = belief.id;
        store.insert(belief).unwrap();
        assert_eq!(store.get(id).unwrap().unwrap().statement, "water is wet");
    }

    #[test]
    fn test_belief_duplicate_insert_rejected() {
        let store = InMemoryBeliefStore::new();
        let belief = make_belief("x");
        store.insert(belief.clone()).unwrap();
        assert!(matches!(
            store.insert(belief),
            Err(StorageError::DuplicateKey(_))
        ));
    }

    #[test]
    fn test_belief_supersede_flow() {
        let store = InMemoryBeliefStore::new();
        let old = make_belief("the user dislikes detail");
        let new = make_belief("the user wants detail on technical topics");
        let (old_id, new_id) = (old.id, new.id);
        store.insert(old).unwrap();
        store.insert(new).unwrap();

        let at = now() + chrono::Duration::days(2);
        store.supersede(old_id, new_id, at).unwrap();

        let old = store.get(old_id).unwrap().unwrap();
        assert_eq!(old.superseded_by, Some(new_id));
        assert!(!old.is_active_at(at));

        let new = store.get(new_id).unwrap().unwrap();
        assert_eq!(new.supersedes, Some(old_id));

        // Idempotent repeat.
        store.supersede(old_id, new_id, at).unwrap();

        // Conflicting second supersession is refused.
        let third = make_belief("z");
        let third_id = third.id;
        store.insert(third).unwrap();
        assert!(store.supersede(old_id, third_id, at).is_err());
    }

    #[test]
    fn test_belief_apply_delta_serialized() {
        let store = InMemoryBeliefStore::new();
        let belief = make_belief("x");
        let id = belief.id;
        store.insert(belief).unwrap();

        let (old, new) = store.apply_conviction_delta(id, -25).unwrap();
        assert_eq!((old, new), (60, 35));
    }

    #[test]
    fn test_causality_unique_triple() {
        let store = InMemoryCausalityStore::new();
        let effect = BeliefId::new();
        let cause = CauseRef::Belief(BeliefId::new());
        let j = Justification::new(cause, CausalRelation::Supports, 0.5);

        let link = CausalLink::new(j.cause, effect, j.relation, j.strength, now()).unwrap();
        store.insert(link).unwrap();

        let dup = CausalLink::new(cause, effect, CausalRelation::Supports, 0.9, now()).unwrap();
        assert!(matches!(
            store.insert(dup),
            Err(StorageError::DuplicateKey(_))
        ));

        // Same cause and effect under a different relation is fine.
        let other =
            CausalLink::new(cause, effect, CausalRelation::Implies, 0.9, now()).unwrap();
        store.insert(other).unwrap();
        assert_eq!(store.count_for_effect(effect).unwrap(), 2);
    }

    #[test]
    fn test_causality_deactivation_keeps_history() {
        let store = InMemoryCausalityStore::new();
        let effect = BeliefId::new();
        let cause = CauseRef::Anchor(AnchorId::new());
        let link =
            CausalLink::new(cause, effect, CausalRelation::FormedFrom, 1.0, now()).unwrap();
        store.insert(link).unwrap();

        assert_eq!(store.deactivate_for_effect(effect).unwrap(), 1);

        // History survives deactivation; the count never drops.
        assert_eq!(store.count_for_effect(effect).unwrap(), 1);
        let links = store.links_for_effect(effect).unwrap();
        assert_eq!(links.len(), 1);
        assert!(!links[0].is_active);
        assert!(!store
            .exists_active(cause, effect, CausalRelation::FormedFrom)
            .unwrap());

        // The freed triple may be re-linked.
        let again =
            CausalLink::new(cause, effect, CausalRelation::FormedFrom, 1.0, now()).unwrap();
        store.insert(again).unwrap();
        assert_eq!(store.count_for_effect(effect).unwrap(), 2);
    }

    #[test]
    fn test_load_debit_and_latest() {
        let store = InMemoryLoadStore::new();
        let day = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        store.insert(CognitiveLoad::fresh(day, 100)).unwrap();

        let after = store.debit(day, 10).unwrap();
        assert_eq!(after.revision_budget_remaining, 90);

        let next = CognitiveLoad::fresh(day.succ_opt().unwrap(), 100);
        store.insert(next).unwrap();
        assert_eq!(store.latest().unwrap().unwrap().day, day.succ_opt().unwrap());
    }

    #[test]
    fn test_tension_pair_uniqueness() {
        let store = InMemoryTensionStore::new();
        let a = BeliefId::new();
        let b = BeliefId::new();
        store
            .insert(CognitiveTension::new(a, b, 50, "x", now()))
            .unwrap();

        // Same pair in swapped order is still a duplicate.
        assert!(matches!(
            store.insert(CognitiveTension::new(b, a, 70, "x", now())),
            Err(StorageError::DuplicateKey(_))
        ));

        assert!(store.find_by_pair(b, a).unwrap().is_some());
    }

    #[test]
    fn test_scar_insert_atomic_and_mutable_fields() {
        let store = InMemoryScarStore::new();
        let scar_id = ScarId::new();
        let scar = IdentityScar {
            id: scar_id,
            scar_type: crate::scar::ScarType::Trauma,
            description: "d".to_string(),
            emotional_valence: -0.5,
            emotional_intensity: 0.8,
            behavioral_impact: "i".to_string(),
            consequences: crate::scar::ScarConsequences {
                value_shift: Some("v".to_string()),
                ..Default::default()
            },
            origin: crate::scar::ScarOrigin::ChronicDistress(DistressId::new()),
            formed_at: now(),
            integration_status: IntegrationStatus::Raw,
            acceptance_level: 0.0,
        };
        let effect = crate::scar::ScarEffectDraft {
            effect_type: crate::scar::EffectType::HardBlock,
            target_domain: "d".to_string(),
            target_action: None,
            magnitude: 1.0,
            is_hard_limit: true,
            can_be_deactivated: false,
        }
        .into_effect(scar_id);
        let effect_id = effect.id;

        store.insert_scar(scar, vec![effect]).unwrap();
        assert_eq!(store.effects_for(scar_id).unwrap().len(), 1);

        store
            .set_integration_status(scar_id, IntegrationStatus::Integrating)
            .unwrap();
        store.set_acceptance_level(scar_id, 0.6).unwrap();
        let scar = store.get_scar(scar_id).unwrap().unwrap();
        assert_eq!(scar.integration_status, IntegrationStatus::Integrating);

        store.set_effect_active(effect_id, false).unwrap();
        assert!(!store.get_effect(effect_id).unwrap().unwrap().is_active);
    }

    #[test]
    fn test_scar_insert_rejects_foreign_effect() {
        let store = InMemoryScarStore::new();
        let scar_id = ScarId::new();
        let scar = IdentityScar {
            id: scar_id,
            scar_type: crate::scar::ScarType::Loss,
            description: "d".to_string(),
            emotional_valence: -0.2,
            emotional_intensity: 0.4,
            behavioral_impact: "i".to_string(),
            consequences: Default::default(),
            origin: crate::scar::ScarOrigin::ChronicDistress(DistressId::new()),
            formed_at: now(),
            integration_status: IntegrationStatus::Raw,
            acceptance_level: 0.0,
        };
        let foreign = crate::scar::ScarEffectDraft {
            effect_type: crate::scar::EffectType::Bias,
            target_domain: "d".to_string(),
            target_action: None,
            magnitude: 0.1,
            is_hard_limit: false,
            can_be_deactivated: true,
        }
        .into_effect(ScarId::new());

        assert!(store.insert_scar(scar, vec![foreign]).is_err());
        assert!(store.scars().unwrap().is_empty(), "nothing partially inserted");
    }

    #[test]
    fn test_candidate_pending_listing() {
        let store = InMemoryCandidateStore::new();
        let candidate = ScarCandidate::new(
            crate::scar::ScarOrigin::ChronicDistress(DistressId::new()),
            crate::scar::ScarType::Trauma,
            "d",
            -0.5,
            0.5,
            "impact",
            now(),
        )
        .unwrap();
        let id = candidate.id;
        store.insert(candidate).unwrap();
        assert_eq!(store.pending().unwrap().len(), 1);

        let mut candidate = store.get(id).unwrap().unwrap();
        candidate.status = crate::scar::CandidateStatus::Rejected {
            reason: "not formative".to_string(),
        };
        store.update(candidate).unwrap();
        assert!(store.pending().unwrap().is_empty());
    }
}
