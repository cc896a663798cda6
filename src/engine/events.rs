//! Domain events and the outbox.
//!
//! Components never call each other directly. Every side-effecting
//! operation appends events to a bounded outbox; the engine drains the
//! queue after each unit of work and dispatches synchronously. Emission is
//! non-blocking `try_send` — a full queue drops the event and bumps a
//! counter rather than stalling the writer.

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use crate::anchor::AnchorId;
use crate::belief::BeliefId;
use crate::distress::DistressId;
use crate::echo::EchoId;
use crate::scar::{CandidateId, ScarId};
use crate::tension::TensionId;

/// Default outbox capacity.
pub const DEFAULT_OUTBOX_CAPACITY: usize = 1024;

/// Everything that can happen inside the engine.
///
/// Cross-component triggering goes through these — the dispatch table in
/// the engine is the only place one component reacts to another.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainEvent {
    /// A belief was admitted with its causal links.
    BeliefCreated {
        belief_id: BeliefId,
    },

    /// A conviction revision was applied.
    BeliefRevised {
        belief_id: BeliefId,
        delta: i16,
    },

    /// A belief tied to a locked anchor lost conviction.
    BeliefWeakened {
        belief_id: BeliefId,
        anchor_id: AnchorId,
        delta: i16,
    },

    /// A belief was replaced by a newer version.
    BeliefSuperseded {
        old_id: BeliefId,
        new_id: BeliefId,
        conviction_at_supersession: u8,
    },

    /// A residual-influence echo was spawned.
    EchoSpawned {
        echo_id: EchoId,
        source_belief_id: BeliefId,
    },

    /// A belief was created citing a contradiction with another.
    ContradictionDetected {
        belief_a: BeliefId,
        belief_b: BeliefId,
        strength: f32,
    },

    /// A distress episode opened.
    DistressOpened {
        distress_id: DistressId,
        level: f32,
    },

    /// A distress episode went chronic.
    DistressBecameChronic {
        distress_id: DistressId,
        level: f32,
    },

    /// A new tension was registered.
    TensionRegistered {
        tension_id: TensionId,
    },

    /// A tension crossed its threshold into stable-unresolved.
    TensionStabilized {
        tension_id: TensionId,
    },

    /// A long-lived tension was integrated (both-valid / context-dependent).
    TensionIntegrated {
        tension_id: TensionId,
        days_unresolved: u32,
    },

    /// A scar candidate was staged for review.
    ScarProposed {
        candidate_id: CandidateId,
    },

    /// A scar was approved and committed with its effects.
    ScarCommitted {
        scar_id: ScarId,
    },
}

/// Bounded, non-blocking domain-event queue.
#[derive(Debug)]
pub struct Outbox {
    tx: Sender<DomainEvent>,
    rx: Receiver<DomainEvent>,
    dropped: AtomicU64,
}

impl Outbox {
    /// Creates an outbox with the given capacity (floored at 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity.max(1));
        Self {
            tx,
            rx,
            dropped: AtomicU64::new(0),
        }
    }

    /// Appends an event. Never blocks: a full queue drops the event and
    /// increments the dropped counter.
    pub fn emit(&self, event: DomainEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Takes the next queued event, if any.
    #[must_use]
    pub fn next(&self) -> Option<DomainEvent> {
        self.rx.try_recv().ok()
    }

    /// Events dropped due to a full queue.
    #[must_use]
    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Default for Outbox {
    fn default() -> Self {
        Self::new(DEFAULT_OUTBOX_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_and_drain_in_order() {
        let outbox = Outbox::new(16);
        let a = BeliefId::new();
        let b = BeliefId::new();

        outbox.emit(DomainEvent::BeliefCreated { belief_id: a });
        outbox.emit(DomainEvent::BeliefRevised {
            belief_id: b,
            delta: -10,
        });

        assert_eq!(
            outbox.next(),
            Some(DomainEvent::BeliefCreated { belief_id: a })
        );
        assert_eq!(
            outbox.next(),
            Some(DomainEvent::BeliefRevised {
                belief_id: b,
                delta: -10
            })
        );
        assert_eq!(outbox.next(), None);
    }

    #[test]
    fn test_full_queue_drops_instead_of_blocking() {
        let outbox = Outbox::new(1);
        let id = BeliefId::new();
        outbox.emit(DomainEvent::BeliefCreated { belief_id: id });
        outbox.emit(DomainEvent::BeliefCreated { belief_id: id });

        assert_eq!(outbox.dropped_events(), 1);
        assert!(outbox.next().is_some());
        assert!(outbox.next().is_none());
    }
}
