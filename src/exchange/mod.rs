//! Rank-to-rank plumbing: communicator façade, wire records, collectives
//! and the domain-decomposition context.

pub mod collect;
pub mod communicator;
pub mod domain;
pub mod wire;

pub use collect::{all_gather, all_gather_one, exchange_with_peers};
pub use communicator::{CommTag, Communicator, NoComm, RayonComm, Wait};
pub use domain::DomainTopology;
pub use wire::{WireCount, WireLabeledCell, WireParticleLabel};
