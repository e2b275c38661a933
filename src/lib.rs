//! # vof-topo
//!
//! vof-topo is a distributed two-phase interface-topology tracker for
//! volume-of-fluid (VOF) simulation data. Given pairs of consecutive
//! fraction/velocity snapshots on a rectilinear grid, it reconstructs the
//! fluid interface (PLIC), seeds and advects tracer particles through the
//! velocity intervals, labels the connected fluid components globally
//! across ranks, and meshes each component's boundary surface.
//!
//! ## Features
//! - PLIC interface reconstruction with closed-form truncation volumes
//! - Iterative-Heun and sub-stepped RK4 particle integrators with
//!   empty-cell and interface-plane drift correction
//! - Domain-decomposed operation: particle migration, ghost-slab label
//!   unification and boundary-trimmed meshing per rank
//! - Pluggable communication backends (serial, in-process Rayon ranks)
//! - Marching-cubes boundary extraction with per-component vertex ranges
//!
//! ## Usage
//! Drive a [`pipeline::VofTopo`] with one [`grid::Snapshot`] pair per
//! timestep interval; pass `target = true` on the final interval to run
//! labeling and meshing and collect the [`pipeline::TopoOutput`].

pub mod advect;
pub mod config;
pub mod error;
pub mod exchange;
pub mod grid;
pub mod labeling;
pub mod particle;
pub mod pipeline;
pub mod plic;
pub mod seed;
pub mod surface;

mod math;

pub use config::{IntegrationScheme, TopoConfig};
pub use error::VofTopoError;
pub use pipeline::{TopoOutput, VofTopo};

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::config::{IntegrationScheme, TopoConfig};
    pub use crate::error::VofTopoError;
    pub use crate::exchange::{CommTag, Communicator, DomainTopology, NoComm, RayonComm};
    pub use crate::grid::{CellScalars, CellVectors, Extent, RectilinearGrid, Snapshot};
    pub use crate::labeling::LabelField;
    pub use crate::particle::Particle;
    pub use crate::pipeline::{TopoOutput, VofTopo};
    pub use crate::surface::{BoundaryMesh, TriangleMesh};
}
