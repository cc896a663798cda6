//! The identity engine.
//!
//! A synchronous orchestrator over pluggable storage backends. External
//! callers (extraction pipeline, prompt builder, operator surface) talk to
//! this type only; components react to each other exclusively through the
//! domain-event outbox, drained after every unit of work.

pub mod events;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::anchor::{AnchorId, IdentityAnchor};
use crate::belief::{Belief, BeliefFilter, BeliefId, BeliefType};
use crate::causality::{CausalLink, CauseRef, CausalRelation, Justification};
use crate::distress::{DistressId, DistressStatus, IdentityDistress, TriggerType};
use crate::echo::{BeliefEcho, EchoId};
use crate::error::{AnimaError, AnimaResult, PolicyError, ValidationError};
use crate::event::{EventId, FormativeEvent};
use crate::load::{day_of, CognitiveLoad};
use crate::revision::{within_rate_limit, Revision, RevisionTarget, RATE_LIMIT};
use crate::scar::{
    CandidateId, CandidateStatus, EffectId, EffectType, IdentityScar, IntegrationStatus,
    ScarAcknowledgement, ScarActivation, ScarCandidate, ScarConsequences, ScarEffect,
    ScarEffectDraft, ScarId, ScarOrigin, ScarType,
};
use crate::storage::{
    AnchorStore, BeliefStore, CandidateStore, CausalityStore, DistressStore, EchoStore,
    EventStore, InMemoryAnchorStore, InMemoryBeliefStore, InMemoryCandidateStore,
    InMemoryCausalityStore, InMemoryDistressStore, InMemoryEchoStore, InMemoryEventStore,
    InMemoryLoadStore, InMemoryRevisionStore, InMemoryScarStore, InMemoryTensionStore,
    LoadStore, RevisionStore, ScarStore, StorageError, TensionStore,
};
use crate::tension::{CognitiveTension, TensionActivation, TensionId, TensionStatus};
use crate::time::Clock;

use events::{DomainEvent, Outbox, DEFAULT_OUTBOX_CAPACITY};

/// Tunable thresholds. The defaults are the specified behavior; tests
/// shrink them to exercise edges.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Daily revision budget.
    pub budget_max: u32,
    /// Budget points restored per daily rollover.
    pub recovery_rate: u32,
    /// Minimum conviction at supersession for an echo to spawn.
    pub echo_spawn_min_conviction: u8,
    /// Distress level a chronic episode must exceed to propose a scar.
    pub scar_level_threshold: f32,
    /// Days a tension must have been unresolved before integration
    /// proposes a scar.
    pub integration_min_days: u32,
    /// Outbox capacity.
    pub outbox_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            budget_max: crate::load::DEFAULT_BUDGET_MAX,
            recovery_rate: crate::load::DEFAULT_RECOVERY_RATE,
            echo_spawn_min_conviction: crate::echo::SPAWN_MIN_CONVICTION,
            scar_level_threshold: crate::distress::SCAR_LEVEL_THRESHOLD,
            integration_min_days: crate::tension::DEFAULT_DAYS_STABLE_THRESHOLD,
            outbox_capacity: DEFAULT_OUTBOX_CAPACITY,
        }
    }
}

/// The storage handles the engine runs over.
pub struct EngineStores {
    pub anchors: Arc<dyn AnchorStore>,
    pub events: Arc<dyn EventStore>,
    pub beliefs: Arc<dyn BeliefStore>,
    pub links: Arc<dyn CausalityStore>,
    pub revisions: Arc<dyn RevisionStore>,
    pub echoes: Arc<dyn EchoStore>,
    pub load: Arc<dyn LoadStore>,
    pub distress: Arc<dyn DistressStore>,
    pub tensions: Arc<dyn TensionStore>,
    pub scars: Arc<dyn ScarStore>,
    pub candidates: Arc<dyn CandidateStore>,
}

impl EngineStores {
    /// A complete set of in-memory stores.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            anchors: Arc::new(InMemoryAnchorStore::new()),
            events: Arc::new(InMemoryEventStore::new()),
            beliefs: Arc::new(InMemoryBeliefStore::new()),
            links: Arc::new(InMemoryCausalityStore::new()),
            revisions: Arc::new(InMemoryRevisionStore::new()),
            echoes: Arc::new(InMemoryEchoStore::new()),
            load: Arc::new(InMemoryLoadStore::new()),
            distress: Arc::new(InMemoryDistressStore::new()),
            tensions: Arc::new(InMemoryTensionStore::new()),
            scars: Arc::new(InMemoryScarStore::new()),
            candidates: Arc::new(InMemoryCandidateStore::new()),
        }
    }
}

/// A proposed belief, as submitted by the extraction pipeline.
#[derive(Debug, Clone)]
pub struct CreateBeliefRequest {
    pub statement: String,
    pub belief_type: BeliefType,
    pub conviction: u8,
    pub anchor_id: Option<AnchorId>,
    pub justifications: Vec<Justification>,
    pub initiator: String,
}

impl CreateBeliefRequest {
    /// A request with default conviction (50) and no anchor.
    #[must_use]
    pub fn new(
        statement: impl Into<String>,
        belief_type: BeliefType,
        justifications: Vec<Justification>,
    ) -> Self {
        Self {
            statement: statement.into(),
            belief_type,
            conviction: 50,
            anchor_id: None,
            justifications,
            initiator: "extraction-pipeline".to_string(),
        }
    }

    /// Sets the initial conviction.
    #[must_use]
    pub fn with_conviction(mut self, conviction: u8) -> Self {
        self.conviction = conviction;
        self
    }

    /// Ties the belief to an anchor.
    #[must_use]
    pub fn with_anchor(mut self, anchor_id: AnchorId) -> Self {
        self.anchor_id = Some(anchor_id);
        self
    }

    /// Sets the initiator recorded in the audit trail.
    #[must_use]
    pub fn with_initiator(mut self, initiator: impl Into<String>) -> Self {
        self.initiator = initiator.into();
        self
    }
}

/// Belief and identity persistence engine.
pub struct IdentityEngine {
    stores: EngineStores,
    clock: Arc<dyn Clock>,
    outbox: Outbox,
    config: EngineConfig,
}

impl IdentityEngine {
    /// Creates an engine over the given stores and clock.
    #[must_use]
    pub fn new(stores: EngineStores, clock: Arc<dyn Clock>) -> Self {
        Self::with_config(stores, clock, EngineConfig::default())
    }

    /// Creates an engine with explicit configuration.
    #[must_use]
    pub fn with_config(stores: EngineStores, clock: Arc<dyn Clock>, config: EngineConfig) -> Self {
        let outbox = Outbox::new(config.outbox_capacity);
        Self {
            stores,
            clock,
            outbox,
            config,
        }
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Events dropped because the outbox was full.
    #[must_use]
    pub fn dropped_events(&self) -> u64 {
        self.outbox.dropped_events()
    }

    // ------------------------------------------------------------------
    // Anchors
    // ------------------------------------------------------------------

    /// Creates an identity anchor.
    pub fn create_anchor(
        &self,
        statement: impl Into<String>,
        rule: Option<String>,
        stability_score: u8,
    ) -> AnimaResult<AnchorId> {
        let anchor = IdentityAnchor::new(statement, rule, stability_score, self.now())?;
        let id = anchor.id;
        info!(anchor = %id, stability = stability_score, locked = anchor.is_locked(), "anchor created");
        self.stores.anchors.insert(anchor)?;
        Ok(id)
    }

    /// Fetches an anchor.
    pub fn anchor(&self, id: AnchorId) -> AnimaResult<Option<IdentityAnchor>> {
        Ok(self.stores.anchors.get(id)?)
    }

    /// All anchors.
    pub fn anchors(&self) -> AnimaResult<Vec<IdentityAnchor>> {
        Ok(self.stores.anchors.all()?)
    }

    /// Rewords an unlocked anchor. Locked anchors refuse unconditionally.
    pub fn reword_anchor(
        &self,
        id: AnchorId,
        statement: impl Into<String>,
        rule: Option<String>,
        initiator: &str,
    ) -> AnimaResult<()> {
        let mut anchor = self
            .stores
            .anchors
            .get(id)?
            .ok_or(AnimaError::AnchorNotFound { id })?;

        if anchor.is_locked() {
            return Err(PolicyError::ImmutabilityViolation {
                target: format!("anchor {id} is locked"),
            }
            .into());
        }

        let statement = statement.into();
        if statement.trim().is_empty() {
            return Err(ValidationError::EmptyStatement.into());
        }

        let old = anchor.statement.clone();
        anchor.statement = statement.clone();
        anchor.rule = rule;
        self.stores.anchors.update(anchor)?;
        self.stores.revisions.append(Revision::applied(
            RevisionTarget::Anchor(id),
            old,
            statement,
            0,
            "anchor reworded",
            initiator,
            self.now(),
        ))?;
        Ok(())
    }

    /// Shifts an anchor's stability. Crossing the lock threshold locks it
    /// permanently; lowering stability never unlocks.
    pub fn shift_anchor_stability(
        &self,
        id: AnchorId,
        delta: i16,
        reasoning: &str,
        initiator: &str,
    ) -> AnimaResult<u8> {
        let mut anchor = self
            .stores
            .anchors
            .get(id)?
            .ok_or(AnimaError::AnchorNotFound { id })?;

        let old = anchor.stability_score;
        anchor.apply_stability_delta(delta);
        let new = anchor.stability_score;
        let locked = anchor.is_locked();
        self.stores.anchors.update(anchor)?;
        self.stores.revisions.append(Revision::applied(
            RevisionTarget::Anchor(id),
            old.to_string(),
            new.to_string(),
            delta,
            reasoning,
            initiator,
            self.now(),
        ))?;
        info!(anchor = %id, old, new, locked, "anchor stability shifted");
        Ok(new)
    }

    /// Deletes an anchor. Refused above the deletion guard regardless of
    /// caller.
    pub fn delete_anchor(&self, id: AnchorId) -> AnimaResult<()> {
        let anchor = self
            .stores
            .anchors
            .get(id)?
            .ok_or(AnimaError::AnchorNotFound { id })?;

        if anchor.deletion_guarded() {
            return Err(PolicyError::ImmutabilityViolation {
                target: format!(
                    "anchor {id} has stability {} and cannot be deleted",
                    anchor.stability_score
                ),
            }
            .into());
        }

        self.stores.anchors.delete(id)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Formative events
    // ------------------------------------------------------------------

    /// Records a formative event.
    pub fn record_event(
        &self,
        description: impl Into<String>,
        event_type: impl Into<String>,
        emotional_weight: f32,
    ) -> AnimaResult<EventId> {
        let event = FormativeEvent::new(description, event_type, emotional_weight, self.now())?;
        let id = event.id;
        self.stores.events.insert(event)?;
        Ok(id)
    }

    /// Fetches a formative event.
    pub fn formative_event(&self, id: EventId) -> AnimaResult<Option<FormativeEvent>> {
        Ok(self.stores.events.get(id)?)
    }

    // ------------------------------------------------------------------
    // BeliefStore operations
    // ------------------------------------------------------------------

    /// Admits a new belief.
    ///
    /// Fails with `MissingCausality` when no justification is supplied;
    /// every cause must exist and be live. The belief row and one causal
    /// link per justification are inserted in one unit of work — all
    /// validation happens before the first write, so partial creation is
    /// never observable.
    pub fn create_belief(&self, request: CreateBeliefRequest) -> AnimaResult<BeliefId> {
        let now = self.now();

        if request.justifications.is_empty() {
            warn!(statement = %request.statement, "belief rejected: no causal justification");
            return Err(PolicyError::MissingCausality.into());
        }

        if let Some(anchor_id) = request.anchor_id {
            if self.stores.anchors.get(anchor_id)?.is_none() {
                return Err(AnimaError::AnchorNotFound { id: anchor_id });
            }
        }

        let mut builder = Belief::builder()
            .statement(request.statement)
            .belief_type(request.belief_type)
            .conviction(request.conviction);
        if let Some(anchor) = request.anchor_id {
            builder = builder.anchor(anchor);
        }
        let belief = builder.build(now)?;
        let belief_id = belief.id;

        // Validate every justification before writing anything.
        let mut links = Vec::with_capacity(request.justifications.len());
        let mut seen = Vec::new();
        for j in &request.justifications {
            self.validate_cause_live(j.cause, now)?;
            let link = CausalLink::new(j.cause, belief_id, j.relation, j.strength, now)?;
            if seen.contains(&link.triple()) {
                return Err(StorageError::DuplicateKey(format!(
                    "{} -{}-> {}",
                    j.cause, j.relation, belief_id
                ))
                .into());
            }
            seen.push(link.triple());
            links.push(link);
        }

        self.stores.beliefs.insert(belief)?;
        for link in links {
            self.stores.links.insert(link)?;
        }

        info!(belief = %belief_id, initiator = %request.initiator, "belief created");
        self.outbox.emit(DomainEvent::BeliefCreated { belief_id });
        for j in &request.justifications {
            if j.relation == CausalRelation::Contradicts {
                if let CauseRef::Belief(other) = j.cause {
                    self.outbox.emit(DomainEvent::ContradictionDetected {
                        belief_a: belief_id,
                        belief_b: other,
                        strength: j.strength,
                    });
                }
            }
        }
        self.drain_outbox();

        Ok(belief_id)
    }

    fn validate_cause_live(&self, cause: CauseRef, now: DateTime<Utc>) -> AnimaResult<()> {
        match cause {
            CauseRef::Belief(id) => {
                let belief = self
                    .stores
                    .beliefs
                    .get(id)?
                    .ok_or(AnimaError::BeliefNotFound { id })?;
                if !belief.is_active_at(now) {
                    return Err(ValidationError::InvalidField {
                        field: "cause".to_string(),
                        reason: format!("belief {id} is superseded or expired"),
                    }
                    .into());
                }
            }
            CauseRef::Event(id) => {
                if self.stores.events.get(id)?.is_none() {
                    return Err(StorageError::EventNotFound(id).into());
                }
            }
            CauseRef::Anchor(id) => {
                if self.stores.anchors.get(id)?.is_none() {
                    return Err(AnimaError::AnchorNotFound { id });
                }
            }
        }
        Ok(())
    }

    /// Revises a belief's conviction through the gate.
    ///
    /// Rejections (rate limit, budget) leave the belief untouched and are
    /// recorded in the audit trail as `Rejected` rows.
    pub fn revise_conviction(
        &self,
        belief_id: BeliefId,
        delta: i16,
        reasoning: &str,
        initiator: &str,
    ) -> AnimaResult<Revision> {
        let now = self.now();
        let belief = self
            .stores
            .beliefs
            .get(belief_id)?
            .ok_or(AnimaError::BeliefNotFound { id: belief_id })?;

        if !belief.is_active_at(now) {
            return Err(AnimaError::InvalidTransition {
                reason: format!("belief {belief_id} is no longer active"),
            });
        }

        if !within_rate_limit(delta) {
            warn!(belief = %belief_id, delta, "revision rejected: rate limit");
            self.stores.revisions.append(Revision::rejected(
                RevisionTarget::Belief(belief_id),
                delta,
                format!("rate limit: |{delta}| > {RATE_LIMIT}"),
                initiator,
                now,
            ))?;
            return Err(PolicyError::RevisionRateLimit {
                requested: delta,
                max: RATE_LIMIT,
            }
            .into());
        }

        let today = self.get_or_init_today()?;
        if !today.can_revise_existing_beliefs() {
            warn!(
                belief = %belief_id,
                remaining = today.revision_budget_remaining,
                fatigue = %today.fatigue_level(),
                "revision rejected: budget gate closed"
            );
            self.stores.revisions.append(Revision::rejected(
                RevisionTarget::Belief(belief_id),
                delta,
                "daily revision budget exhausted",
                initiator,
                now,
            ))?;
            return Err(PolicyError::BudgetExhausted {
                remaining: today.revision_budget_remaining,
            }
            .into());
        }

        let (old, new) = self.stores.beliefs.apply_conviction_delta(belief_id, delta)?;
        let revision = Revision::applied(
            RevisionTarget::Belief(belief_id),
            old.to_string(),
            new.to_string(),
            delta,
            reasoning,
            initiator,
            now,
        );
        self.stores.revisions.append(revision.clone())?;
        info!(belief = %belief_id, old, new, delta, "conviction revised");

        self.outbox
            .emit(DomainEvent::BeliefRevised { belief_id, delta });

        if delta < 0 {
            if let Some(anchor_id) = belief.anchor_id {
                if let Some(anchor) = self.stores.anchors.get(anchor_id)? {
                    if anchor.is_locked() {
                        self.outbox.emit(DomainEvent::BeliefWeakened {
                            belief_id,
                            anchor_id,
                            delta,
                        });
                    }
                }
            }
        }

        self.drain_outbox();
        Ok(revision)
    }

    /// Supersedes `old_id` with `new_id`.
    ///
    /// Closes the old validity, links the chain, and spawns an echo when
    /// the dying conviction is high enough.
    pub fn supersede(
        &self,
        old_id: BeliefId,
        new_id: BeliefId,
        reasoning: &str,
    ) -> AnimaResult<()> {
        let now = self.now();
        let old = self
            .stores
            .beliefs
            .get(old_id)?
            .ok_or(AnimaError::BeliefNotFound { id: old_id })?;
        if self.stores.beliefs.get(new_id)?.is_none() {
            return Err(AnimaError::BeliefNotFound { id: new_id });
        }

        let conviction = old.conviction_score;
        self.stores.beliefs.supersede(old_id, new_id, now)?;
        self.stores.links.deactivate_for_effect(old_id)?;
        self.stores.revisions.append(Revision::applied(
            RevisionTarget::Belief(old_id),
            conviction.to_string(),
            format!("superseded by {new_id}"),
            0,
            reasoning,
            "engine",
            now,
        ))?;
        info!(old = %old_id, new = %new_id, conviction, "belief superseded");

        self.outbox.emit(DomainEvent::BeliefSuperseded {
            old_id,
            new_id,
            conviction_at_supersession: conviction,
        });

        // Losing a belief outright is the strongest form of weakening: the
        // whole conviction dies at once, bypassing the revision rate limit.
        if let Some(anchor_id) = old.anchor_id {
            if let Some(anchor) = self.stores.anchors.get(anchor_id)? {
                if anchor.is_locked() {
                    self.outbox.emit(DomainEvent::BeliefWeakened {
                        belief_id: old_id,
                        anchor_id,
                        delta: -i16::from(conviction),
                    });
                }
            }
        }

        self.drain_outbox();
        Ok(())
    }

    /// Fetches a belief.
    pub fn belief(&self, id: BeliefId) -> AnimaResult<Option<Belief>> {
        Ok(self.stores.beliefs.get(id)?)
    }

    /// Read-only view of currently held beliefs matching a filter.
    pub fn query_active(&self, filter: &BeliefFilter) -> AnimaResult<Vec<Belief>> {
        let now = self.now();
        Ok(self
            .stores
            .beliefs
            .find_active(now)?
            .into_iter()
            .filter(|b| filter.matches(b))
            .collect())
    }

    /// Why a belief exists: its full justification history.
    pub fn why(&self, belief_id: BeliefId) -> AnimaResult<Vec<CausalLink>> {
        if self.stores.beliefs.get(belief_id)?.is_none() {
            return Err(AnimaError::BeliefNotFound { id: belief_id });
        }
        Ok(self.stores.links.links_for_effect(belief_id)?)
    }

    /// Every active link citing a cause — what an anchor or event grounds.
    pub fn grounded_by(&self, cause: CauseRef) -> AnimaResult<Vec<CausalLink>> {
        Ok(self.stores.links.links_for_cause(cause)?)
    }

    /// Audit history for a target.
    pub fn revision_history(&self, target: RevisionTarget) -> AnimaResult<Vec<Revision>> {
        Ok(self.stores.revisions.for_target(target)?)
    }

    // ------------------------------------------------------------------
    // EchoEngine operations
    // ------------------------------------------------------------------

    /// Echoes still above the activity threshold, with current strengths.
    pub fn active_echoes(&self) -> AnimaResult<Vec<(BeliefEcho, f64)>> {
        let now = self.now();
        Ok(self
            .stores
            .echoes
            .all()?
            .into_iter()
            .filter(|e| e.is_active_at(now))
            .map(|e| {
                let strength = e.current_strength(now);
                (e, strength)
            })
            .collect())
    }

    /// Fetches an echo.
    pub fn echo(&self, id: EchoId) -> AnimaResult<Option<BeliefEcho>> {
        Ok(self.stores.echoes.get(id)?)
    }

    /// Records that an echo altered a decision, accumulating its current
    /// strength into total influence.
    pub fn record_echo_trigger(&self, id: EchoId) -> AnimaResult<BeliefEcho> {
        let now = self.now();
        let echo = self
            .stores
            .echoes
            .get(id)?
            .ok_or(StorageError::EchoNotFound(id))?;
        let strength = echo.current_strength(now);
        Ok(self.stores.echoes.record_trigger(id, strength)?)
    }

    // ------------------------------------------------------------------
    // CognitiveLoadScheduler operations
    // ------------------------------------------------------------------

    /// Today's load row, created lazily. A gap since the last stored day is
    /// bridged by applying the rollover recovery once per missing day.
    pub fn get_or_init_today(&self) -> AnimaResult<CognitiveLoad> {
        let today = day_of(self.now());
        if let Some(row) = self.stores.load.get(today)? {
            return Ok(row);
        }

        let row = match self.stores.load.latest()? {
            Some(mut latest) if latest.day < today => {
                let mut guard = 0;
                while latest.day < today && guard < 366 {
                    latest = latest.rolled_over(self.config.recovery_rate);
                    guard += 1;
                }
                if latest.day == today {
                    latest
                } else {
                    CognitiveLoad::fresh(today, self.config.budget_max)
                }
            }
            _ => CognitiveLoad::fresh(today, self.config.budget_max),
        };

        match self.stores.load.insert(row.clone()) {
            Ok(()) => Ok(row),
            // Another handler created the row concurrently; read theirs.
            Err(StorageError::DuplicateKey(_)) => Ok(self
                .stores
                .load
                .get(today)?
                .ok_or_else(|| AnimaError::internal("load row vanished after duplicate insert"))?),
            Err(e) => Err(e.into()),
        }
    }

    /// Explicit daily rollover: creates the next day's row from the most
    /// recent one, restoring `recovery_rate` points. Idempotent per day.
    pub fn rollover_day(&self) -> AnimaResult<CognitiveLoad> {
        let latest = match self.stores.load.latest()? {
            Some(row) => row,
            None => self.get_or_init_today()?,
        };
        let next = latest.rolled_over(self.config.recovery_rate);
        if let Some(existing) = self.stores.load.get(next.day)? {
            return Ok(existing);
        }
        self.stores.load.insert(next.clone())?;
        debug!(day = %next.day, remaining = next.revision_budget_remaining, "daily rollover");
        Ok(next)
    }

    /// Whether the revision gate is currently open.
    pub fn can_revise(&self) -> AnimaResult<bool> {
        Ok(self.get_or_init_today()?.can_revise_existing_beliefs())
    }

    // ------------------------------------------------------------------
    // DistressEngine operations
    // ------------------------------------------------------------------

    /// Fetches a distress episode.
    pub fn distress_episode(&self, id: DistressId) -> AnimaResult<Option<IdentityDistress>> {
        Ok(self.stores.distress.get(id)?)
    }

    /// Episodes not yet resolved.
    pub fn open_distress_episodes(&self) -> AnimaResult<Vec<IdentityDistress>> {
        Ok(self.stores.distress.find_open()?)
    }

    /// Moves an episode through its forward-only lifecycle. Entering
    /// `Chronic` with a high enough level proposes a scar.
    pub fn advance_distress(
        &self,
        id: DistressId,
        status: DistressStatus,
    ) -> AnimaResult<IdentityDistress> {
        let now = self.now();
        let mut episode = self
            .stores
            .distress
            .get(id)?
            .ok_or(AnimaError::DistressNotFound { id })?;

        if !episode.status.can_transition_to(status) {
            return Err(AnimaError::InvalidTransition {
                reason: format!("distress {id}: {} -> {status}", episode.status),
            });
        }

        episode.status = status;
        if status == DistressStatus::Resolved {
            episode.resolved_at = Some(now);
        }
        let level = episode.distress_level;
        self.stores.distress.update(episode.clone())?;
        info!(distress = %id, status = %status, level, "distress advanced");

        if status == DistressStatus::Chronic {
            self.outbox.emit(DomainEvent::DistressBecameChronic {
                distress_id: id,
                level,
            });
            self.drain_outbox();
        }
        Ok(episode)
    }

    // ------------------------------------------------------------------
    // TensionTracker operations
    // ------------------------------------------------------------------

    /// Registers a conflict between two beliefs, canonicalizing the pair.
    /// Re-registering an existing pair raises its severity instead of
    /// duplicating.
    pub fn register_tension(
        &self,
        a: BeliefId,
        b: BeliefId,
        severity: u8,
        tension_type: &str,
    ) -> AnimaResult<TensionId> {
        if a == b {
            return Err(ValidationError::InvalidField {
                field: "belief_b".to_string(),
                reason: "a tension needs two distinct beliefs".to_string(),
            }
            .into());
        }
        for id in [a, b] {
            if self.stores.beliefs.get(id)?.is_none() {
                return Err(AnimaError::BeliefNotFound { id });
            }
        }

        if let Some(mut existing) = self.stores.tensions.find_by_pair(a, b)? {
            let id = existing.id;
            existing.severity = existing.severity.max(severity.min(100));
            self.stores.tensions.update(existing)?;
            debug!(tension = %id, severity, "tension pair re-registered; severity raised");
            return Ok(id);
        }

        let tension = CognitiveTension::new(a, b, severity, tension_type, self.now());
        let id = tension.id;
        self.stores.tensions.insert(tension)?;
        info!(tension = %id, severity, tension_type, "tension registered");
        self.outbox
            .emit(DomainEvent::TensionRegistered { tension_id: id });
        self.drain_outbox();
        Ok(id)
    }

    /// Fetches a tension.
    pub fn tension(&self, id: TensionId) -> AnimaResult<Option<CognitiveTension>> {
        Ok(self.stores.tensions.get(id)?)
    }

    /// Tensions still shaping behavior.
    pub fn active_tensions(&self) -> AnimaResult<Vec<CognitiveTension>> {
        Ok(self
            .stores
            .tensions
            .all()?
            .into_iter()
            .filter(CognitiveTension::is_live)
            .collect())
    }

    /// The daily tick: ages every unresolved tension by one day and
    /// stabilizes those that cross their threshold. Idempotent per UTC day.
    /// Returns how many tensions stabilized.
    pub fn advance_tensions_day(&self) -> AnimaResult<usize> {
        let now = self.now();
        let today = day_of(now);
        let mut stabilized = 0;

        for mut tension in self.stores.tensions.all()? {
            if tension.advance_day(today, now) {
                stabilized += 1;
                info!(tension = %tension.id, days = tension.days_unresolved, "tension stabilized");
                self.outbox.emit(DomainEvent::TensionStabilized {
                    tension_id: tension.id,
                });
                self.stores.tensions.update(tension)?;
            } else if tension.last_counted_day == Some(today)
                && tension.status == TensionStatus::Unresolved
            {
                self.stores.tensions.update(tension)?;
            }
        }

        self.drain_outbox();
        Ok(stabilized)
    }

    /// Moves a tension to a new status. Transitions are monotonic; nothing
    /// ever returns to `Unresolved`. Integrating a tension that has been
    /// unresolved long enough proposes an integration scar.
    pub fn resolve_tension(
        &self,
        id: TensionId,
        status: TensionStatus,
        decision_pattern: Option<String>,
    ) -> AnimaResult<CognitiveTension> {
        let now = self.now();
        let mut tension = self
            .stores
            .tensions
            .get(id)?
            .ok_or(AnimaError::TensionNotFound { id })?;

        if !tension.status.can_transition_to(status) {
            return Err(AnimaError::InvalidTransition {
                reason: format!("tension {id}: {} -> {status}", tension.status),
            });
        }

        let days = tension.days_unresolved.max(tension.days_unresolved_at(now));
        tension.status = status;
        if status == TensionStatus::StableUnresolved && tension.stabilized_at.is_none() {
            tension.stabilized_at = Some(now);
        }
        if decision_pattern.is_some() {
            tension.decision_pattern = decision_pattern;
        }
        self.stores.tensions.update(tension.clone())?;
        info!(tension = %id, status = %status, days, "tension resolved");

        if status.is_integrated() {
            self.outbox.emit(DomainEvent::TensionIntegrated {
                tension_id: id,
                days_unresolved: days,
            });
            self.drain_outbox();
        }
        Ok(tension)
    }

    /// Appends an activation row: this tension actually changed behavior.
    /// A refusal activation permanently flips the tension's refusal flag.
    pub fn record_tension_activation(
        &self,
        id: TensionId,
        effect: &str,
        severity: u8,
    ) -> AnimaResult<()> {
        let mut tension = self
            .stores
            .tensions
            .get(id)?
            .ok_or(AnimaError::TensionNotFound { id })?;

        self.stores.tensions.append_activation(TensionActivation {
            tension_id: id,
            effect: effect.to_string(),
            severity: severity.min(100),
            noted_at: self.now(),
        })?;

        if effect == "refusal" && !tension.refusal_trigger {
            tension.refusal_trigger = true;
            self.stores.tensions.update(tension)?;
        }
        Ok(())
    }

    /// Activation history for a tension.
    pub fn tension_activations(&self, id: TensionId) -> AnimaResult<Vec<TensionActivation>> {
        Ok(self.stores.tensions.activations_for(id)?)
    }

    // ------------------------------------------------------------------
    // ScarRegistry operations
    // ------------------------------------------------------------------

    /// Stages a scar candidate for operator review. This is the only path
    /// toward a committed scar; nothing promotes automatically.
    pub fn stage_scar_candidate(&self, candidate: ScarCandidate) -> AnimaResult<CandidateId> {
        let id = candidate.id;
        self.stores.candidates.insert(candidate)?;
        info!(candidate = %id, "scar candidate staged");
        self.outbox
            .emit(DomainEvent::ScarProposed { candidate_id: id });
        self.drain_outbox();
        Ok(id)
    }

    /// Candidates awaiting review.
    pub fn pending_scar_candidates(&self) -> AnimaResult<Vec<ScarCandidate>> {
        Ok(self.stores.candidates.pending()?)
    }

    /// Approves a candidate: validates its consequences and commits the
    /// scar together with its effect rows in one unit of work.
    pub fn approve_scar(
        &self,
        candidate_id: CandidateId,
        notes: Option<String>,
    ) -> AnimaResult<ScarId> {
        let now = self.now();
        let mut candidate = self
            .stores
            .candidates
            .get(candidate_id)?
            .ok_or(AnimaError::CandidateNotFound { id: candidate_id })?;

        if !candidate.is_pending() {
            return Err(AnimaError::InvalidTransition {
                reason: format!("candidate {candidate_id} has already been reviewed"),
            });
        }

        if !candidate.consequences.is_concrete() || candidate.proposed_effects.is_empty() {
            warn!(candidate = %candidate_id, "scar approval rejected: no concrete consequence");
            return Err(PolicyError::ScarConsequence {
                candidate: candidate_id,
            }
            .into());
        }

        let scar_id = ScarId::new();
        let scar = IdentityScar {
            id: scar_id,
            scar_type: candidate.scar_type,
            description: candidate.description.clone(),
            emotional_valence: candidate.emotional_valence,
            emotional_intensity: candidate.emotional_intensity,
            behavioral_impact: candidate.behavioral_impact.clone(),
            consequences: candidate.consequences.clone(),
            origin: candidate.origin,
            formed_at: now,
            integration_status: IntegrationStatus::Raw,
            acceptance_level: 0.0,
        };
        let effects: Vec<ScarEffect> = candidate
            .proposed_effects
            .iter()
            .cloned()
            .map(|draft| draft.into_effect(scar_id))
            .collect();

        self.stores.scars.insert_scar(scar, effects)?;
        candidate.status = CandidateStatus::Approved { scar_id, notes };
        self.stores.candidates.update(candidate)?;
        info!(candidate = %candidate_id, scar = %scar_id, "scar committed");

        self.outbox.emit(DomainEvent::ScarCommitted { scar_id });
        self.drain_outbox();
        Ok(scar_id)
    }

    /// Rejects a candidate with a reason.
    pub fn reject_scar(&self, candidate_id: CandidateId, reason: &str) -> AnimaResult<()> {
        let mut candidate = self
            .stores
            .candidates
            .get(candidate_id)?
            .ok_or(AnimaError::CandidateNotFound { id: candidate_id })?;

        if !candidate.is_pending() {
            return Err(AnimaError::InvalidTransition {
                reason: format!("candidate {candidate_id} has already been reviewed"),
            });
        }

        candidate.status = CandidateStatus::Rejected {
            reason: reason.to_string(),
        };
        self.stores.candidates.update(candidate)?;
        info!(candidate = %candidate_id, reason, "scar candidate rejected");
        Ok(())
    }

    /// Fetches a scar.
    pub fn scar(&self, id: ScarId) -> AnimaResult<Option<IdentityScar>> {
        Ok(self.stores.scars.get_scar(id)?)
    }

    /// All committed scars.
    pub fn scars(&self) -> AnimaResult<Vec<IdentityScar>> {
        Ok(self.stores.scars.scars()?)
    }

    /// Effect rows of a scar.
    pub fn scar_effects(&self, scar_id: ScarId) -> AnimaResult<Vec<ScarEffect>> {
        Ok(self.stores.scars.effects_for(scar_id)?)
    }

    /// Active effects applying to a domain/action, hard limits first.
    pub fn active_scar_effects_for(
        &self,
        domain: &str,
        action: Option<&str>,
    ) -> AnimaResult<Vec<ScarEffect>> {
        let mut effects: Vec<ScarEffect> = self
            .stores
            .scars
            .all_effects()?
            .into_iter()
            .filter(|e| e.applies_to(domain, action))
            .collect();
        effects.sort_by(|a, b| {
            b.is_hard_limit
                .cmp(&a.is_hard_limit)
                .then(b.magnitude.total_cmp(&a.magnitude))
        });
        Ok(effects)
    }

    /// Logs that a scar effect altered a decision.
    pub fn record_scar_activation(&self, effect_id: EffectId, context: &str) -> AnimaResult<()> {
        let effect = self
            .stores
            .scars
            .get_effect(effect_id)?
            .ok_or(StorageError::EffectNotFound(effect_id))?;

        self.stores.scars.append_activation(ScarActivation {
            effect_id,
            scar_id: effect.scar_id,
            context: context.to_string(),
            activated_at: self.now(),
        })?;
        Ok(())
    }

    /// Activation history for an effect.
    pub fn scar_activations(&self, effect_id: EffectId) -> AnimaResult<Vec<ScarActivation>> {
        Ok(self.stores.scars.activations_for(effect_id)?)
    }

    /// Deactivates an effect — allowed only when the effect was created
    /// deactivatable. Effects are never deleted.
    pub fn deactivate_scar_effect(&self, effect_id: EffectId) -> AnimaResult<()> {
        let effect = self
            .stores
            .scars
            .get_effect(effect_id)?
            .ok_or(StorageError::EffectNotFound(effect_id))?;

        if !effect.can_be_deactivated {
            return Err(PolicyError::ImmutabilityViolation {
                target: format!("scar effect {effect_id} is permanent"),
            }
            .into());
        }

        self.stores.scars.set_effect_active(effect_id, false)?;
        info!(effect = %effect_id, "scar effect deactivated");
        Ok(())
    }

    /// Appends an acknowledgement — the only thing that can be added to a
    /// committed scar.
    pub fn acknowledge_scar(&self, scar_id: ScarId, note: &str) -> AnimaResult<()> {
        if self.stores.scars.get_scar(scar_id)?.is_none() {
            return Err(StorageError::ScarNotFound(scar_id).into());
        }
        self.stores.scars.append_acknowledgement(ScarAcknowledgement {
            scar_id,
            note: note.to_string(),
            acknowledged_at: self.now(),
        })?;
        Ok(())
    }

    /// Acknowledgement history for a scar.
    pub fn scar_acknowledgements(
        &self,
        scar_id: ScarId,
    ) -> AnimaResult<Vec<ScarAcknowledgement>> {
        Ok(self.stores.scars.acknowledgements_for(scar_id)?)
    }

    /// Advances a scar's integration status (raw → integrating →
    /// integrated, forward only).
    pub fn set_scar_integration(
        &self,
        scar_id: ScarId,
        status: IntegrationStatus,
    ) -> AnimaResult<()> {
        let scar = self
            .stores
            .scars
            .get_scar(scar_id)?
            .ok_or(StorageError::ScarNotFound(scar_id))?;

        let rank = |s: IntegrationStatus| match s {
            IntegrationStatus::Raw => 0,
            IntegrationStatus::Integrating => 1,
            IntegrationStatus::Integrated => 2,
        };
        if rank(status) < rank(scar.integration_status) {
            return Err(AnimaError::InvalidTransition {
                reason: format!(
                    "scar {scar_id}: integration {} -> {status}",
                    scar.integration_status
                ),
            });
        }

        self.stores.scars.set_integration_status(scar_id, status)?;
        Ok(())
    }

    /// Sets a scar's acceptance level (0.0-1.0).
    pub fn set_scar_acceptance(&self, scar_id: ScarId, level: f32) -> AnimaResult<()> {
        if !(0.0..=1.0).contains(&level) {
            return Err(ValidationError::InvalidField {
                field: "acceptance_level".to_string(),
                reason: format!("{level} is out of range [0.0, 1.0]"),
            }
            .into());
        }
        if self.stores.scars.get_scar(scar_id)?.is_none() {
            return Err(StorageError::ScarNotFound(scar_id).into());
        }
        self.stores.scars.set_acceptance_level(scar_id, level)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Event dispatch
    // ------------------------------------------------------------------

    /// Drains the outbox, dispatching each event to the component that
    /// reacts to it. Handlers may enqueue further events; the loop runs
    /// until the queue is empty. Dispatch failures are logged and skipped —
    /// the primary operation has already committed.
    fn drain_outbox(&self) {
        while let Some(event) = self.outbox.next() {
            if let Err(e) = self.dispatch(&event) {
                warn!(?event, error = %e, "event dispatch failed");
            }
        }
    }

    fn dispatch(&self, event: &DomainEvent) -> AnimaResult<()> {
        let now = self.now();
        match event {
            DomainEvent::BeliefRevised { belief_id, delta } => {
                let today = self.get_or_init_today()?;
                let cost = crate::load::cost_for_delta(*delta);
                let after = self.stores.load.debit(today.day, cost)?;
                debug!(
                    belief = %belief_id,
                    cost,
                    remaining = after.revision_budget_remaining,
                    "revision cost debited"
                );
            }

            DomainEvent::BeliefWeakened {
                belief_id,
                anchor_id,
                delta,
            } => {
                let episode = IdentityDistress::open(
                    *belief_id,
                    *anchor_id,
                    TriggerType::AnchorWeakened,
                    *delta,
                    now,
                );
                let distress_id = episode.id;
                let level = episode.distress_level;
                self.stores.distress.insert(episode)?;
                info!(distress = %distress_id, level, anchor = %anchor_id, "distress opened");
                self.outbox.emit(DomainEvent::DistressOpened {
                    distress_id,
                    level,
                });
            }

            DomainEvent::BeliefSuperseded {
                old_id,
                conviction_at_supersession,
                ..
            } => {
                if *conviction_at_supersession >= self.config.echo_spawn_min_conviction {
                    if let Some(old) = self.stores.beliefs.get(*old_id)? {
                        if let Some(echo) = BeliefEcho::spawn_from(&old, now) {
                            let echo_id = echo.id;
                            self.stores.echoes.insert(echo)?;
                            info!(echo = %echo_id, source = %old_id, "echo spawned");
                            self.outbox.emit(DomainEvent::EchoSpawned {
                                echo_id,
                                source_belief_id: *old_id,
                            });
                        }
                    }
                }
            }

            DomainEvent::ContradictionDetected {
                belief_a,
                belief_b,
                strength,
            } => {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let severity = (strength.clamp(0.0, 1.0) * 100.0).round() as u8;
                self.register_tension(*belief_a, *belief_b, severity, "contradiction")?;
            }

            DomainEvent::DistressBecameChronic { distress_id, level } => {
                if *level > self.config.scar_level_threshold {
                    self.propose_scar_from_distress(*distress_id)?;
                }
            }

            DomainEvent::TensionIntegrated {
                tension_id,
                days_unresolved,
            } => {
                if *days_unresolved >= self.config.integration_min_days {
                    self.propose_scar_from_tension(*tension_id)?;
                }
            }

            DomainEvent::BeliefCreated { .. }
            | DomainEvent::EchoSpawned { .. }
            | DomainEvent::DistressOpened { .. }
            | DomainEvent::TensionRegistered { .. }
            | DomainEvent::TensionStabilized { .. }
            | DomainEvent::ScarProposed { .. }
            | DomainEvent::ScarCommitted { .. } => {
                debug!(?event, "event observed");
            }
        }
        Ok(())
    }

    fn propose_scar_from_distress(&self, distress_id: DistressId) -> AnimaResult<()> {
        let now = self.now();
        let episode = self
            .stores
            .distress
            .get(distress_id)?
            .ok_or(AnimaError::DistressNotFound { id: distress_id })?;

        let anchor_statement = self
            .stores
            .anchors
            .get(episode.anchor_id)?
            .map_or_else(|| "a core principle".to_string(), |a| a.statement);

        let scar_type = match episode.trigger_type {
            TriggerType::AnchorContradicted => ScarType::Violation,
            TriggerType::AnchorWeakened | TriggerType::ChainCollapse => ScarType::Trauma,
        };
        let intensity = (episode.distress_level / 100.0).clamp(0.0, 1.0);

        let candidate = ScarCandidate::new(
            ScarOrigin::ChronicDistress(distress_id),
            scar_type,
            format!(
                "chronic distress from sustained pressure against \"{anchor_statement}\""
            ),
            -0.7,
            intensity,
            format!(
                "heightened alertness whenever \"{anchor_statement}\" is contested; defaults to {}",
                episode.defensive_mode
            ),
            now,
        )?
        .with_consequences(ScarConsequences {
            manifestation_examples: vec![format!(
                "pauses and re-grounds before revising anything near \"{anchor_statement}\""
            )],
            ..ScarConsequences::default()
        })
        .with_effect(ScarEffectDraft {
            effect_type: EffectType::Sensitivity,
            target_domain: "identity".to_string(),
            target_action: None,
            magnitude: intensity,
            is_hard_limit: false,
            can_be_deactivated: false,
        });

        self.stage_scar_candidate(candidate)?;
        Ok(())
    }

    fn propose_scar_from_tension(&self, tension_id: TensionId) -> AnimaResult<()> {
        let now = self.now();
        let tension = self
            .stores
            .tensions
            .get(tension_id)?
            .ok_or(AnimaError::TensionNotFound { id: tension_id })?;

        let intensity = (f32::from(tension.severity) / 100.0).clamp(0.0, 1.0);
        let impact = tension.decision_pattern.clone().unwrap_or_else(|| {
            "weighs both sides per context instead of forcing a winner".to_string()
        });

        let candidate = ScarCandidate::new(
            ScarOrigin::IntegratedTension(tension_id),
            ScarType::Integration,
            format!(
                "integrated a {}-day unresolved {} tension",
                tension.days_unresolved, tension.tension_type
            ),
            0.3,
            intensity,
            impact,
            now,
        )?
        .with_consequences(ScarConsequences {
            openness_change: Some(
                "more comfortable holding contradictory positions open".to_string(),
            ),
            ..ScarConsequences::default()
        })
        .with_effect(ScarEffectDraft {
            effect_type: EffectType::Bias,
            target_domain: "deliberation".to_string(),
            target_action: None,
            magnitude: 0.3,
            is_hard_limit: false,
            can_be_deactivated: true,
        });

        self.stage_scar_candidate(candidate)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::ManualClock;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn engine() -> (IdentityEngine, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(t0()));
        let engine = IdentityEngine::new(EngineStores::in_memory(), clock.clone());
        (engine, clock)
    }

    fn anchored_belief(engine: &IdentityEngine, anchor: AnchorId, conviction: u8) -> BeliefId {
        engine
            .create_belief(
                CreateBeliefRequest::new(
                    "honesty requires directness",
                    BeliefType::Value,
                    vec![Justification::formed_from(CauseRef::Anchor(anchor))],
                )
                .with_conviction(conviction)
                .with_anchor(anchor),
            )
            .unwrap()
    }

    #[test]
    fn test_create_belief_requires_causality() {
        let (engine, _) = engine();
        let result = engine.create_belief(CreateBeliefRequest::new(
            "uncaused belief",
            BeliefType::WorldModel,
            vec![],
        ));
        assert!(matches!(
            result,
            Err(AnimaError::Policy(PolicyError::MissingCausality))
        ));
    }

    #[test]
    fn test_create_belief_writes_links() {
        let (engine, _) = engine();
        let anchor = engine.create_anchor("be honest", None, 85).unwrap();
        let belief = anchored_belief(&engine, anchor, 70);

        let links = engine.why(belief).unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].cause, CauseRef::Anchor(anchor));
    }

    #[test]
    fn test_create_belief_rejects_dead_cause() {
        let (engine, _) = engine();
        let anchor = engine.create_anchor("be honest", None, 50).unwrap();
        let old = anchored_belief(&engine, anchor, 60);
        let new = anchored_belief_statement(&engine, anchor, "honesty includes tact", 60);
        engine.supersede(old, new, "refined").unwrap();

        let result = engine.create_belief(CreateBeliefRequest::new(
            "derived from a dead belief",
            BeliefType::Value,
            vec![Justification::formed_from(CauseRef::Belief(old))],
        ));
        assert!(result.is_err());
    }

    fn anchored_belief_statement(
        engine: &IdentityEngine,
        anchor: AnchorId,
        statement: &str,
        conviction: u8,
    ) -> BeliefId {
        engine
            .create_belief(
                CreateBeliefRequest::new(
                    statement,
                    BeliefType::Value,
                    vec![Justification::formed_from(CauseRef::Anchor(anchor))],
                )
                .with_conviction(conviction)
                .with_anchor(anchor),
            )
            .unwrap()
    }

    #[test]
    fn test_revision_rate_limit() {
        let (engine, _) = engine();
        let anchor = engine.create_anchor("be honest", None, 50).unwrap();
        let belief = anchored_belief(&engine, anchor, 80);

        let result = engine.revise_conviction(belief, -31, "too much", "test");
        assert!(matches!(
            result,
            Err(AnimaError::Policy(PolicyError::RevisionRateLimit { requested: -31, max: 30 }))
        ));

        // Belief untouched; rejection recorded in the audit trail.
        assert_eq!(engine.belief(belief).unwrap().unwrap().conviction_score, 80);
        let history = engine
            .revision_history(RevisionTarget::Belief(belief))
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].state, crate::revision::RevisionState::Rejected);
    }

    #[test]
    fn test_revision_applies_and_debits() {
        let (engine, _) = engine();
        let anchor = engine.create_anchor("be honest", None, 50).unwrap();
        let belief = anchored_belief(&engine, anchor, 80);

        let revision = engine
            .revise_conviction(belief, -25, "counter-evidence", "test")
            .unwrap();
        assert_eq!(revision.conviction_delta, -25);
        assert_eq!(engine.belief(belief).unwrap().unwrap().conviction_score, 55);

        // |−25| > 15 costs 10.
        let load = engine.get_or_init_today().unwrap();
        assert_eq!(load.revision_budget_remaining, 90);
    }

    #[test]
    fn test_weakening_anchored_belief_opens_distress() {
        let (engine, _) = engine();
        let anchor = engine.create_anchor("be honest", None, 85).unwrap();
        let belief = anchored_belief(&engine, anchor, 80);

        engine
            .revise_conviction(belief, -15, "pressure", "test")
            .unwrap();

        let episodes = engine.open_distress_episodes().unwrap();
        assert_eq!(episodes.len(), 1);
        assert!((episodes[0].distress_level - 12.0).abs() < 1e-6);
        assert_eq!(episodes[0].anchor_id, anchor);
    }

    #[test]
    fn test_weakening_unlocked_anchor_no_distress() {
        let (engine, _) = engine();
        let anchor = engine.create_anchor("tentative idea", None, 40).unwrap();
        let belief = anchored_belief(&engine, anchor, 80);

        engine
            .revise_conviction(belief, -15, "pressure", "test")
            .unwrap();
        assert!(engine.open_distress_episodes().unwrap().is_empty());
    }

    #[test]
    fn test_supersede_spawns_echo() {
        let (engine, _) = engine();
        let anchor = engine.create_anchor("be honest", None, 50).unwrap();
        let old = anchored_belief(&engine, anchor, 75);
        let new = anchored_belief_statement(&engine, anchor, "replacement", 60);

        engine.supersede(old, new, "superseded in test").unwrap();

        let echoes = engine.active_echoes().unwrap();
        assert_eq!(echoes.len(), 1);
        let (echo, strength) = &echoes[0];
        assert_eq!(echo.source_belief_id, old);
        assert_eq!(echo.half_life_days, 60);
        assert!((strength - 0.5625).abs() < 1e-9);
    }

    #[test]
    fn test_supersede_low_conviction_no_echo() {
        let (engine, _) = engine();
        let anchor = engine.create_anchor("be honest", None, 50).unwrap();
        let old = anchored_belief(&engine, anchor, 15);
        let new = anchored_belief_statement(&engine, anchor, "replacement", 60);

        engine.supersede(old, new, "weakly held").unwrap();
        assert!(engine.active_echoes().unwrap().is_empty());
    }

    #[test]
    fn test_contradiction_justification_registers_tension() {
        let (engine, _) = engine();
        let anchor = engine.create_anchor("be honest", None, 50).unwrap();
        let existing = anchored_belief(&engine, anchor, 70);

        let contradicting = engine
            .create_belief(
                CreateBeliefRequest::new(
                    "white lies protect people",
                    BeliefType::Value,
                    vec![
                        Justification::formed_from(CauseRef::Anchor(anchor)),
                        Justification::new(
                            CauseRef::Belief(existing),
                            CausalRelation::Contradicts,
                            0.8,
                        ),
                    ],
                )
                .with_conviction(55),
            )
            .unwrap();

        let tensions = engine.active_tensions().unwrap();
        assert_eq!(tensions.len(), 1);
        assert_eq!(tensions[0].severity, 80);
        assert_eq!(
            tensions[0].pair(),
            crate::tension::canonicalize_pair(existing, contradicting)
        );
    }

    #[test]
    fn test_budget_exhaustion_closes_gate() {
        let (engine, _) = engine();
        let config = EngineConfig::default();
        assert_eq!(config.budget_max, 100);

        let anchor = engine.create_anchor("be honest", None, 50).unwrap();
        let belief = anchored_belief(&engine, anchor, 90);

        // Nine revisions of cost 10 leave remaining = 10 (ratio 0.1 —
        // overwhelmed), closing the gate.
        for i in 0..9 {
            let delta = if i % 2 == 0 { -16 } else { 16 };
            engine
                .revise_conviction(belief, delta, "churn", "test")
                .unwrap();
        }

        let result = engine.revise_conviction(belief, -16, "one too many", "test");
        assert!(matches!(
            result,
            Err(AnimaError::Policy(PolicyError::BudgetExhausted { .. }))
        ));
    }

    #[test]
    fn test_rollover_restores_budget() {
        let (engine, clock) = engine();
        let anchor = engine.create_anchor("be honest", None, 50).unwrap();
        let belief = anchored_belief(&engine, anchor, 80);

        for _ in 0..3 {
            engine
                .revise_conviction(belief, -16, "spend", "test")
                .unwrap();
        }
        assert_eq!(
            engine.get_or_init_today().unwrap().revision_budget_remaining,
            70
        );

        let next = engine.rollover_day().unwrap();
        assert_eq!(next.revision_budget_remaining, 80);

        clock.advance_days(1);
        assert_eq!(
            engine.get_or_init_today().unwrap().revision_budget_remaining,
            80
        );
    }

    #[test]
    fn test_chronic_distress_proposes_scar() {
        let (engine, _) = engine();
        let anchor = engine.create_anchor("be honest", None, 85).unwrap();
        let belief = anchored_belief(&engine, anchor, 95);

        // Three heavy weakenings; each opens an episode. Use the largest.
        engine
            .revise_conviction(belief, -30, "sustained pressure", "test")
            .unwrap();
        let episode = engine.open_distress_episodes().unwrap()[0].clone();
        assert!((episode.distress_level - 24.0).abs() < 1e-6);

        // Level 24 is below the scar threshold: chronic but no proposal.
        engine
            .advance_distress(episode.id, DistressStatus::Chronic)
            .unwrap();
        assert!(engine.pending_scar_candidates().unwrap().is_empty());
    }

    #[test]
    fn test_locked_anchor_cannot_be_reworded() {
        let (engine, _) = engine();
        let anchor = engine.create_anchor("be honest", None, 85).unwrap();
        let result = engine.reword_anchor(anchor, "be flexible", None, "test");
        assert!(matches!(
            result,
            Err(AnimaError::Policy(PolicyError::ImmutabilityViolation { .. }))
        ));
    }

    #[test]
    fn test_guarded_anchor_cannot_be_deleted() {
        let (engine, _) = engine();
        let anchor = engine.create_anchor("core of self", None, 95).unwrap();
        assert!(matches!(
            engine.delete_anchor(anchor),
            Err(AnimaError::Policy(PolicyError::ImmutabilityViolation { .. }))
        ));

        let deletable = engine.create_anchor("passing thought", None, 30).unwrap();
        engine.delete_anchor(deletable).unwrap();
    }

    #[test]
    fn test_advance_tensions_day_idempotent() {
        let (engine, _) = engine();
        let anchor = engine.create_anchor("be honest", None, 50).unwrap();
        let a = anchored_belief(&engine, anchor, 70);
        let b = anchored_belief_statement(&engine, anchor, "other side", 70);
        let id = engine.register_tension(a, b, 60, "value_vs_value").unwrap();

        engine.advance_tensions_day().unwrap();
        engine.advance_tensions_day().unwrap();
        assert_eq!(engine.tension(id).unwrap().unwrap().days_unresolved, 1);
    }

    #[test]
    fn test_refusal_activation_sets_flag() {
        let (engine, _) = engine();
        let anchor = engine.create_anchor("be honest", None, 50).unwrap();
        let a = anchored_belief(&engine, anchor, 70);
        let b = anchored_belief_statement(&engine, anchor, "other side", 70);
        let id = engine.register_tension(a, b, 60, "value_vs_value").unwrap();

        engine.record_tension_activation(id, "hesitation", 20).unwrap();
        assert!(!engine.tension(id).unwrap().unwrap().refusal_trigger);

        engine.record_tension_activation(id, "refusal", 80).unwrap();
        assert!(engine.tension(id).unwrap().unwrap().refusal_trigger);
        assert_eq!(engine.tension_activations(id).unwrap().len(), 2);
    }
}
