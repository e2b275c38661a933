//! The two-phase tracking pipeline.
//!
//! Phase one runs once per pair of consecutive snapshots: seed on the first
//! snapshot of the epoch, then advect the particles through each velocity
//! interval and migrate them across rank boundaries. Phase two runs when
//! the target timestep is reached: label the fluid components of the final
//! fraction field, hand each particle its component label, route the
//! labeled particles back to their seeding ranks, and mesh the component
//! boundaries.

use std::collections::HashMap;

use crate::advect;
use crate::config::TopoConfig;
use crate::error::VofTopoError;
use crate::exchange::{
    exchange_with_peers, CommTag, Communicator, DomainTopology, WireParticleLabel,
};
use crate::grid::Snapshot;
use crate::labeling::{self, LabelField};
use crate::particle::Particle;
use crate::plic;
use crate::seed;
use crate::surface::{self, BoundaryMesh};

const TAG_DOMAIN: CommTag = CommTag::new(0x10);
const TAG_MIGRATE: CommTag = CommTag::new(0x20);
const TAG_LABEL: CommTag = CommTag::new(0x30);
const TAG_RETURN: CommTag = CommTag::new(0x40);

/// Everything phase two produces on one rank.
#[derive(Clone, Debug)]
pub struct TopoOutput {
    /// Particles seeded by this rank, back home and in seed order, with
    /// their component label (`-1.0` for unlabeled).
    pub particles: Vec<Particle>,
    pub particle_labels: Vec<f32>,
    /// Boundary surfaces of the components resident on this rank.
    pub boundaries: BoundaryMesh,
    /// Component labels of the final fraction field.
    pub grid_labels: LabelField,
}

struct Epoch {
    seed_time: f64,
    current_time: f64,
    topo: DomainTopology,
    particles: Vec<Particle>,
}

/// Distributed interface-topology tracker.
///
/// Drive it with [`update`] once per consecutive snapshot pair; it reseeds
/// whenever the interval is empty (same timestep twice) and produces a
/// [`TopoOutput`] when told the target timestep is reached.
///
/// [`update`]: VofTopo::update
pub struct VofTopo<C: Communicator> {
    comm: C,
    cfg: TopoConfig,
    epoch: Option<Epoch>,
}

impl<C: Communicator> VofTopo<C> {
    pub fn new(comm: C, cfg: TopoConfig) -> Self {
        Self {
            comm,
            cfg,
            epoch: None,
        }
    }

    pub fn config(&self) -> &TopoConfig {
        &self.cfg
    }

    /// Number of particles currently resident on this rank.
    pub fn resident_particles(&self) -> usize {
        self.epoch.as_ref().map_or(0, |e| e.particles.len())
    }

    /// Time the current epoch was seeded at, if any.
    pub fn seed_time(&self) -> Option<f64> {
        self.epoch.as_ref().map(|e| e.seed_time)
    }

    /// Starts a new epoch: reconstruct the interface of `snapshot` and seed
    /// particles on it. Any previous epoch is discarded.
    pub fn seed(&mut self, snapshot: &Snapshot, time: f64) -> Result<(), VofTopoError> {
        let topo =
            DomainTopology::build(&self.comm, &snapshot.grid, self.cfg.ghost_levels, TAG_DOMAIN)?;
        let field = plic::reconstruct(&snapshot.grid, &snapshot.vof, &self.cfg);
        let particles = seed::place_seeds(
            &snapshot.grid,
            &snapshot.vof,
            &field,
            &self.cfg,
            topo.global,
            topo.rank as i32,
        );
        log::info!(
            "rank {}: seeded {} particle(s) at t={time}",
            topo.rank,
            particles.len()
        );
        self.epoch = Some(Epoch {
            seed_time: time,
            current_time: time,
            topo,
            particles,
        });
        Ok(())
    }

    /// Advances the epoch's particles from `t0` to `t1`, then migrates
    /// the ones that left this rank's box. Seeds on `t0` first if no epoch
    /// is running.
    pub fn step(
        &mut self,
        t0: &Snapshot,
        t1: &Snapshot,
        time0: f64,
        time1: f64,
    ) -> Result<(), VofTopoError> {
        if t0.grid.cell_res() != t1.grid.cell_res() {
            return Err(VofTopoError::ResolutionMismatch(
                t0.grid.cell_res(),
                t1.grid.cell_res(),
            ));
        }
        if self.epoch.is_none() {
            self.seed(t0, time0)?;
        }
        // the explicit override keeps the direction of the time series
        let dt = if self.cfg.time_step_delta != 0.0 {
            if time1 < time0 {
                -self.cfg.time_step_delta
            } else {
                self.cfg.time_step_delta
            }
        } else {
            time1 - time0
        };
        let epoch = self.epoch.as_mut().ok_or_else(|| VofTopoError::CommError {
            neighbor: 0,
            source: "no epoch after seeding".into(),
        })?;
        advect::advance(&mut epoch.particles, t0, t1, &self.cfg, dt);
        epoch
            .topo
            .migrate(&self.comm, &mut epoch.particles, TAG_MIGRATE)?;
        epoch.current_time = time1;
        log::debug!(
            "rank {}: advanced to t={time1}, {} resident particle(s)",
            epoch.topo.rank,
            epoch.particles.len()
        );
        Ok(())
    }

    /// One driver call per snapshot pair.
    ///
    /// An empty interval (`time0 == time1`) reseeds; otherwise the epoch is
    /// stepped. When `target` is set phase two runs on `t1` and its output
    /// is returned; the epoch stays resident so tracking can continue.
    pub fn update(
        &mut self,
        t0: &Snapshot,
        t1: &Snapshot,
        time0: f64,
        time1: f64,
        target: bool,
    ) -> Result<Option<TopoOutput>, VofTopoError> {
        if time0 == time1 {
            self.seed(t0, time0)?;
        } else {
            self.step(t0, t1, time0, time1)?;
        }
        if target {
            return self.finish(t1).map(Some);
        }
        Ok(None)
    }

    /// Phase two: label, transfer labels to the seed owners, mesh.
    pub fn finish(&mut self, t1: &Snapshot) -> Result<TopoOutput, VofTopoError> {
        let epoch = self.epoch.as_ref().ok_or_else(|| VofTopoError::CommError {
            neighbor: 0,
            source: "finish called before any epoch was seeded".into(),
        })?;
        let topo = &epoch.topo;

        let grid_labels = labeling::label_components(
            &self.comm,
            topo,
            &t1.grid,
            &t1.vof,
            self.cfg.emf0,
            self.cfg.ghost_levels,
            TAG_LABEL,
        )?;

        let labels: Vec<f32> = epoch
            .particles
            .iter()
            .map(|p| grid_labels.at(&t1.grid, p.pos))
            .collect();

        let boundaries = surface::mesh_boundaries(
            &epoch.particles,
            &labels,
            &t1.grid,
            topo.core,
            self.cfg.refinement,
        );

        let (particles, particle_labels) = self.return_to_owners(epoch, &labels)?;

        Ok(TopoOutput {
            particles,
            particle_labels,
            boundaries,
            grid_labels,
        })
    }

    /// Routes every particle (with its label) back to the rank that seeded
    /// it and returns this rank's own, sorted by seed ordinal.
    fn return_to_owners(
        &self,
        epoch: &Epoch,
        labels: &[f32],
    ) -> Result<(Vec<Particle>, Vec<f32>), VofTopoError> {
        let rank = epoch.topo.rank as i32;
        let mut own: Vec<WireParticleLabel> = Vec::new();
        let mut outgoing: HashMap<usize, Vec<WireParticleLabel>> = HashMap::new();
        for (p, &l) in epoch.particles.iter().zip(labels) {
            let rec = WireParticleLabel::new(*p, l);
            if p.proc == rank {
                own.push(rec);
            } else {
                outgoing.entry(p.proc as usize).or_default().push(rec);
            }
        }

        if !self.comm.is_serial() {
            let peers: Vec<usize> = (0..epoch.topo.size)
                .filter(|&r| r != epoch.topo.rank)
                .collect();
            let inbound = exchange_with_peers(&self.comm, &peers, &outgoing, TAG_RETURN)?;
            for (_, batch) in inbound {
                own.extend(batch);
            }
        }

        own.sort_by_key(|r| r.particle.id);
        let labels = own.iter().map(|r| r.label).collect();
        let particles = own.into_iter().map(|r| r.particle).collect();
        Ok((particles, labels))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::NoComm;
    use crate::grid::{CellScalars, CellVectors, RectilinearGrid};

    fn column_snapshot(vel: [f32; 3]) -> Snapshot {
        // 6x2x2 cells, fluid column in the first two x-cells
        let grid = RectilinearGrid::uniform([0.0; 3], [1.0; 3], [6, 2, 2]);
        let mut f = vec![0.0f32; grid.num_cells()];
        for k in 0..2 {
            for j in 0..2 {
                f[0 + j * 6 + k * 12] = 1.0;
                f[1 + j * 6 + k * 12] = 0.3;
            }
        }
        let n = grid.num_cells();
        Snapshot {
            grid,
            vof: CellScalars::F32(f),
            velocity: CellVectors::F32(vec![vel; n]),
        }
    }

    #[test]
    fn reseed_on_empty_interval() {
        let t = column_snapshot([0.0; 3]);
        let mut topo = VofTopo::new(NoComm, TopoConfig::default());
        let out = topo.update(&t, &t, 1.0, 1.0, false).unwrap();
        assert!(out.is_none());
        assert!(topo.resident_particles() > 0);
        assert_eq!(topo.seed_time(), Some(1.0));
    }

    #[test]
    fn stationary_epoch_labels_every_particle() {
        let t = column_snapshot([0.0; 3]);
        let mut topo = VofTopo::new(NoComm, TopoConfig::default());
        topo.seed(&t, 0.0).unwrap();
        topo.step(&t, &t, 0.0, 0.5).unwrap();
        let out = topo.finish(&t).unwrap();
        assert_eq!(out.grid_labels.count, 1);
        assert!(!out.particles.is_empty());
        assert_eq!(out.particles.len(), out.particle_labels.len());
        assert!(out.particle_labels.iter().all(|&l| l == 0.0));
        // seed order restored
        assert!(out.particles.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[test]
    fn particles_follow_the_flow_to_the_target() {
        let t0 = column_snapshot([1.0, 0.0, 0.0]);
        let t1 = column_snapshot([1.0, 0.0, 0.0]);
        let cfg = TopoConfig {
            // the correctors would snap the drifters back into the fluid
            vof_correction: false,
            plic_correction: false,
            ..TopoConfig::default()
        };
        let mut topo = VofTopo::new(NoComm, cfg);
        topo.seed(&t0, 0.0).unwrap();
        assert!(topo.resident_particles() > 0);
        topo.step(&t0, &t1, 0.0, 1.0).unwrap();
        let out = topo.finish(&t1).unwrap();
        // everything moved one cell in +x
        assert!(out.particles.iter().all(|p| p.pos[0] > 0.9));
    }

    #[test]
    fn mismatched_grids_are_rejected() {
        let t0 = column_snapshot([0.0; 3]);
        let g = RectilinearGrid::uniform([0.0; 3], [1.0; 3], [4, 2, 2]);
        let n = g.num_cells();
        let t1 = Snapshot {
            grid: g,
            vof: CellScalars::zeros(n),
            velocity: CellVectors::zeros(n),
        };
        let mut topo = VofTopo::new(NoComm, TopoConfig::default());
        assert!(topo.step(&t0, &t1, 0.0, 1.0).is_err());
    }

    #[test]
    fn time_step_override_wins() {
        let t0 = column_snapshot([1.0, 0.0, 0.0]);
        let t1 = column_snapshot([1.0, 0.0, 0.0]);
        let cfg = TopoConfig {
            time_step_delta: 0.25,
            vof_correction: false,
            plic_correction: false,
            ..TopoConfig::default()
        };
        let mut topo = VofTopo::new(NoComm, cfg);
        topo.seed(&t0, 0.0).unwrap();
        let xs: Vec<f32> = {
            let e = topo.epoch.as_ref().unwrap();
            e.particles.iter().map(|p| p.pos[0]).collect()
        };
        topo.step(&t0, &t1, 0.0, 1.0).unwrap();
        let e = topo.epoch.as_ref().unwrap();
        for (p, x0) in e.particles.iter().zip(xs) {
            assert!((p.pos[0] - x0 - 0.25).abs() < 1e-4);
        }
    }
}
