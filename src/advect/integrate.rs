//! Time integrators for particle advection.
//!
//! Both schemes integrate between two snapshots of the velocity field.
//! Particles whose carried fraction dropped to the empty threshold are
//! frozen; particles that leave the subdomain keep their last in-domain
//! velocity for the remainder of the step and are handed off to the
//! neighbor exchange afterwards.

use rayon::prelude::*;

use crate::config::{IntegrationScheme, TopoConfig};
use crate::grid::{GridSampler, Snapshot};
use crate::math::{add3, scale3};
use crate::particle::Particle;

const HEUN_ITERATIONS: u32 = 20;

/// Advances every active particle from `t0` to `t1` over `dt` seconds.
pub fn advect(
    particles: &mut [Particle],
    t0: &Snapshot,
    t1: &Snapshot,
    cfg: &TopoConfig,
    dt: f64,
) {
    particles.par_iter_mut().for_each(|p| {
        if !p.is_active(cfg.emf0) {
            return;
        }
        match cfg.scheme {
            IntegrationScheme::IterativeHeun => heun_step(p, t0, t1, dt),
            IntegrationScheme::RungeKutta4 => rk4_step(p, t0, t1, dt, cfg.substeps.max(1)),
        }
        // Refresh the carried fraction from the arrival field; outside the
        // subdomain the old value rides along until migration resolves it.
        let s1 = GridSampler::new(&t1.grid);
        if let Some(f) = s1.scalar(&t1.vof, to_f64(p.pos)) {
            p.fluid = f;
        }
    });
}

#[inline]
fn to_f64(p: [f32; 3]) -> [f64; 3] {
    [p[0] as f64, p[1] as f64, p[2] as f64]
}

/// Forward-Euler predictor, then a fixed number of midpoint fixed-point
/// corrections averaging the departure and arrival velocities.
fn heun_step(p: &mut Particle, t0: &Snapshot, t1: &Snapshot, dt: f64) {
    let s0 = GridSampler::new(&t0.grid);
    let s1 = GridSampler::new(&t1.grid);
    let Some(v0) = s0.vector(&t0.velocity, to_f64(p.pos)) else {
        return;
    };
    let dtf = dt as f32;
    let mut pos1 = add3(p.pos, scale3(v0, dtf));
    let mut v1 = v0;
    for _ in 0..HEUN_ITERATIONS {
        if let Some(v) = s1.vector(&t1.velocity, to_f64(pos1)) {
            v1 = v;
        }
        pos1 = add3(p.pos, scale3(add3(v0, v1), 0.5 * dtf));
    }
    p.pos = pos1;
}

/// Velocity at `pos` blended in time between the snapshots, `tau` in [0,1].
fn blended_velocity(
    s0: &GridSampler,
    s1: &GridSampler,
    t0: &Snapshot,
    t1: &Snapshot,
    pos: [f32; 3],
    tau: f32,
    fallback: [f32; 3],
) -> [f32; 3] {
    let a = s0.vector(&t0.velocity, to_f64(pos));
    let b = s1.vector(&t1.velocity, to_f64(pos));
    match (a, b) {
        (Some(va), Some(vb)) => add3(scale3(va, 1.0 - tau), scale3(vb, tau)),
        (Some(va), None) => va,
        (None, Some(vb)) => vb,
        (None, None) => fallback,
    }
}

/// Classic RK4 over `substeps` equal sub-intervals with time-blended stage
/// velocities.
fn rk4_step(p: &mut Particle, t0: &Snapshot, t1: &Snapshot, dt: f64, substeps: u32) {
    let s0 = GridSampler::new(&t0.grid);
    let s1 = GridSampler::new(&t1.grid);
    let h = dt as f32 / substeps as f32;
    let dtau = 1.0 / substeps as f32;
    let mut pos = p.pos;
    let mut last_v = [0f32; 3];

    for step in 0..substeps {
        let tau = step as f32 * dtau;
        let k1 = blended_velocity(&s0, &s1, t0, t1, pos, tau, last_v);
        let k2 = blended_velocity(
            &s0,
            &s1,
            t0,
            t1,
            add3(pos, scale3(k1, 0.5 * h)),
            tau + 0.5 * dtau,
            k1,
        );
        let k3 = blended_velocity(
            &s0,
            &s1,
            t0,
            t1,
            add3(pos, scale3(k2, 0.5 * h)),
            tau + 0.5 * dtau,
            k2,
        );
        let k4 = blended_velocity(&s0, &s1, t0, t1, add3(pos, scale3(k3, h)), tau + dtau, k3);
        let incr = add3(add3(k1, scale3(add3(k2, k3), 2.0)), k4);
        pos = add3(pos, scale3(incr, h / 6.0));
        last_v = k4;
    }
    p.pos = pos;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{CellScalars, CellVectors, RectilinearGrid};

    fn uniform_flow(v: [f32; 3]) -> Snapshot {
        let grid = RectilinearGrid::uniform([0.0; 3], [1.0; 3], [8, 8, 8]);
        let n = grid.num_cells();
        Snapshot {
            grid,
            vof: CellScalars::F32(vec![1.0; n]),
            velocity: CellVectors::F32(vec![v; n]),
        }
    }

    #[test]
    fn heun_matches_constant_flow() {
        let t0 = uniform_flow([1.0, 0.5, 0.0]);
        let t1 = uniform_flow([1.0, 0.5, 0.0]);
        let mut ps = vec![Particle::new([2.0, 2.0, 2.0], 0, 0)];
        advect(&mut ps, &t0, &t1, &TopoConfig::default(), 1.0);
        assert!((ps[0].pos[0] - 3.0).abs() < 1e-5);
        assert!((ps[0].pos[1] - 2.5).abs() < 1e-5);
    }

    #[test]
    fn heun_averages_accelerating_flow() {
        // velocity jumps from 0 to 2 between snapshots: midpoint rule
        // travels at the mean.
        let t0 = uniform_flow([0.0; 3]);
        let t1 = uniform_flow([2.0, 0.0, 0.0]);
        let mut ps = vec![Particle::new([2.0, 4.0, 4.0], 0, 0)];
        advect(&mut ps, &t0, &t1, &TopoConfig::default(), 1.0);
        assert!((ps[0].pos[0] - 3.0).abs() < 1e-4);
    }

    #[test]
    fn rk4_matches_constant_flow() {
        let t0 = uniform_flow([0.0, 0.0, 1.0]);
        let t1 = uniform_flow([0.0, 0.0, 1.0]);
        let cfg = TopoConfig {
            scheme: IntegrationScheme::RungeKutta4,
            substeps: 4,
            ..TopoConfig::default()
        };
        let mut ps = vec![Particle::new([4.0, 4.0, 2.0], 0, 0)];
        advect(&mut ps, &t0, &t1, &cfg, 1.5);
        assert!((ps[0].pos[2] - 3.5).abs() < 1e-5);
    }

    #[test]
    fn frozen_particles_do_not_move() {
        let t0 = uniform_flow([1.0, 0.0, 0.0]);
        let t1 = uniform_flow([1.0, 0.0, 0.0]);
        let mut ps = vec![Particle {
            fluid: 0.0,
            ..Particle::new([2.0, 2.0, 2.0], 0, 0)
        }];
        advect(&mut ps, &t0, &t1, &TopoConfig::default(), 1.0);
        assert_eq!(ps[0].pos, [2.0, 2.0, 2.0]);
    }

    #[test]
    fn arrival_fraction_is_recorded() {
        let t0 = uniform_flow([1.0, 0.0, 0.0]);
        let mut t1 = uniform_flow([1.0, 0.0, 0.0]);
        t1.vof = CellScalars::F32(vec![0.25; t1.grid.num_cells()]);
        let mut ps = vec![Particle::new([2.0, 2.0, 2.0], 0, 0)];
        advect(&mut ps, &t0, &t1, &TopoConfig::default(), 1.0);
        assert!((ps[0].fluid - 0.25).abs() < 1e-6);
    }
}
