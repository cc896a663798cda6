//! # anima - Belief & Identity Persistence Engine
//!
//! anima maintains a persistent belief graph for a conversational agent:
//! the statements it holds, why it holds them, how strongly, and what
//! permanent consequences past conflicts leave on its future behavior.
//!
//! ## Core Concepts
//!
//! - **Anchor**: a top-level, eventually-lockable principle beliefs derive from
//! - **Belief**: a held statement with conviction, temporal validity, and a
//!   mandatory causal justification
//! - **Echo**: decaying residual bias left behind by a superseded belief
//! - **Tension**: a persistent, optionally permanent conflict between beliefs
//! - **Distress**: a bounded episode representing the cost of violating a
//!   stable anchor
//! - **Scar**: a permanent, immutable record of chronic distress or an
//!   integrated tension, carrying enforced behavioral effects
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use anima::{
//!     BeliefType, CauseRef, CreateBeliefRequest, EngineStores, IdentityEngine,
//!     Justification, SystemClock,
//! };
//!
//! let engine = IdentityEngine::new(EngineStores::in_memory(), Arc::new(SystemClock));
//!
//! let anchor = engine.create_anchor("be genuinely helpful", None, 85).unwrap();
//! let belief = engine
//!     .create_belief(
//!         CreateBeliefRequest::new(
//!             "directness serves the user better than hedging",
//!             BeliefType::Value,
//!             vec![Justification::formed_from(CauseRef::Anchor(anchor))],
//!         )
//!         .with_conviction(70)
//!         .with_anchor(anchor),
//!     )
//!     .unwrap();
//!
//! let revision = engine
//!     .revise_conviction(belief, 10, "reinforced by feedback", "operator")
//!     .unwrap();
//! assert_eq!(revision.conviction_delta, 10);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core types
pub mod anchor;
pub mod belief;
pub mod causality;
pub mod distress;
pub mod echo;
pub mod error;
pub mod event;
pub mod load;
pub mod revision;
pub mod scar;
pub mod tension;
pub mod time;

// Orchestration and storage
pub mod engine;
pub mod storage;

// Re-export primary types at crate root for convenience
pub use anchor::{AnchorId, IdentityAnchor};
pub use belief::{Belief, BeliefFilter, BeliefId, BeliefType};
pub use causality::{CausalLink, CausalRelation, CauseRef, Justification, LinkId};
pub use distress::{DefensiveMode, DistressId, DistressStatus, IdentityDistress, TriggerType};
pub use echo::{BeliefEcho, EchoId, InfluenceType};
pub use error::{AnimaError, AnimaResult, PolicyError, ValidationError};
pub use event::{EventId, FormativeEvent};
pub use load::{CognitiveLoad, FatigueLevel};
pub use revision::{Revision, RevisionId, RevisionState, RevisionTarget};
pub use scar::{
    CandidateId, CandidateStatus, EffectId, EffectType, IdentityScar, IntegrationStatus,
    ScarAcknowledgement, ScarActivation, ScarCandidate, ScarConsequences, ScarEffect,
    ScarEffectDraft, ScarId, ScarOrigin, ScarType,
};
pub use tension::{CognitiveTension, TensionActivation, TensionId, TensionStatus};
pub use time::{Clock, ManualClock, SystemClock, Validity};

// Engine and storage re-exports
pub use engine::events::{DomainEvent, Outbox};
pub use engine::{CreateBeliefRequest, EngineConfig, EngineStores, IdentityEngine};
pub use storage::{
    AnchorStore, BeliefStore, CandidateStore, CausalityStore, DistressStore, EchoStore,
    EventStore, LoadStore, RevisionStore, ScarStore, StorageError, TensionStore,
};
