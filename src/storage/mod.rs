//! Storage abstraction for the identity graph.
//!
//! Traits define the contract; the in-memory backend is the reference
//! implementation used for embedded operation and tests. A relational
//! backend can be slotted in without touching the engine.

pub mod memory;
pub mod traits;

pub use memory::{
    InMemoryAnchorStore, InMemoryBeliefStore, InMemoryCandidateStore, InMemoryCausalityStore,
    InMemoryDistressStore, InMemoryEchoStore, InMemoryEventStore, InMemoryLoadStore,
    InMemoryRevisionStore, InMemoryScarStore, InMemoryTensionStore,
};
pub use traits::{
    AnchorStore, BeliefStore, CandidateStore, CausalityStore, DistressStore, EchoStore,
    EventStore, LoadStore, RevisionStore, ScarStore, StorageError, TensionStore,
};
