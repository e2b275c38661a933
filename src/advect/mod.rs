//! Particle advection between two snapshots.

pub mod correct;
pub mod integrate;

pub use correct::{correct_plic, correct_vof};
pub use integrate::advect;

use crate::config::TopoConfig;
use crate::grid::Snapshot;
use crate::particle::Particle;
use crate::plic;

/// One full advection step: integrate, then the enabled corrections in
/// order (empty-cell relocation first, plane clamp second).
pub fn advance(
    particles: &mut [Particle],
    t0: &Snapshot,
    t1: &Snapshot,
    cfg: &TopoConfig,
    dt: f64,
) {
    advect(particles, t0, t1, cfg, dt);
    if cfg.vof_correction {
        correct_vof(particles, t1, cfg);
    }
    if cfg.plic_correction {
        let field = plic::reconstruct(&t1.grid, &t1.vof, cfg);
        correct_plic(particles, &t1.grid, &field, cfg);
    }
}
