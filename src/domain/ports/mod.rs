//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines the interfaces that adapters and pluggable strategies
//! implement:
//! - MoleculeRepository: checkpoint ledger and owner heartbeats
//! - WorkItemRepository: per-agent hook queues with conditional transitions
//! - CoordinationRepository: agent profiles, teams, plans, conflicts
//! - ConflictRiskScorer / ConflictDetector / ConflictResolver: coordinator strategies
//! - EventSink: outbound events for messaging and audit
//! - OwnerRecovery: crash recovery consumed by the coordinator

pub mod conflict_strategy;
pub mod coordination_repository;
pub mod event_sink;
pub mod molecule_repository;
pub mod owner_recovery;
pub mod work_item_repository;

pub use conflict_strategy::{
    AcknowledgingResolver, ConflictDetector, ConflictResolver, ConflictRiskScorer,
    CoordinationSnapshot, NeutralRiskScorer, NoopDetector,
};
pub use coordination_repository::CoordinationRepository;
pub use event_sink::{EventSink, NullEventSink};
pub use molecule_repository::MoleculeRepository;
pub use owner_recovery::OwnerRecovery;
pub use work_item_repository::WorkItemRepository;
