//! Domain decomposition context and particle migration.
//!
//! Each rank owns the ghost-free interior of its padded subgrid. The
//! context is built once per epoch from an all-gather of subgrid extents
//! and physical bounds; migration then routes particles that advected out
//! of the owned box to the abutting ranks.

use std::collections::HashMap;

use super::collect::{all_gather_one, exchange_with_peers};
use super::communicator::{CommTag, Communicator};
use crate::error::VofTopoError;
use crate::grid::{find_neighbors, Extent, RectilinearGrid};
use crate::particle::Particle;

/// Where this rank sits in the decomposed domain.
#[derive(Clone, Debug)]
pub struct DomainTopology {
    pub rank: usize,
    pub size: usize,
    /// Padded (ghosted) node extent of the local subgrid.
    pub local: Extent,
    /// Ghost-free node extent of the local subgrid.
    pub core: Extent,
    /// Union of all ghost-free extents.
    pub global: Extent,
    /// Ranks abutting each of the six sides of `core`.
    pub neighbors: [Vec<usize>; 6],
    /// Sorted, deduplicated union of the six side lists.
    pub all_neighbors: Vec<usize>,
    /// Physical bounds of `core`, `[xmin,xmax,ymin,ymax,zmin,zmax]`.
    pub bounds: [f64; 6],
    /// Physical bounds of the whole domain.
    pub global_bounds: [f64; 6],
}

impl DomainTopology {
    /// Serial single-rank context covering the entire grid.
    pub fn serial(grid: &RectilinearGrid) -> Self {
        let e = grid.extent();
        let b = grid.bounds();
        Self {
            rank: 0,
            size: 1,
            local: e,
            core: e,
            global: e,
            neighbors: Default::default(),
            all_neighbors: Vec::new(),
            bounds: b,
            global_bounds: b,
        }
    }

    /// Builds the context by gathering every rank's extent and bounds.
    pub fn build<C: Communicator>(
        comm: &C,
        grid: &RectilinearGrid,
        ghost: i32,
        tag: CommTag,
    ) -> Result<Self, VofTopoError> {
        if comm.is_serial() {
            return Ok(Self::serial(grid));
        }
        let rank = comm.rank();
        let size = comm.size();
        let local = grid.extent();

        let flats = all_gather_one(comm, local.to_flat(), tag)?;
        if flats.len() != size {
            return Err(VofTopoError::IncompleteGather {
                want: size,
                got: flats.len(),
            });
        }
        let padded: Vec<Extent> = flats.into_iter().map(Extent::from_flat).collect();
        let global = Extent::global(&padded);
        let cores: Vec<Extent> = padded
            .iter()
            .map(|e| e.without_ghosts(global, ghost))
            .collect();
        let core = cores[rank];

        let neighbors = find_neighbors(core, global, &cores, rank);
        let mut all_neighbors: Vec<usize> =
            neighbors.iter().flatten().copied().collect();
        all_neighbors.sort_unstable();
        all_neighbors.dedup();

        let bounds = core_bounds(grid, local, core);
        let all_bounds = all_gather_one(comm, bounds, tag.offset(2))?;
        let mut global_bounds = all_bounds[0];
        for b in &all_bounds[1..] {
            for a in 0..3 {
                global_bounds[a * 2] = global_bounds[a * 2].min(b[a * 2]);
                global_bounds[a * 2 + 1] = global_bounds[a * 2 + 1].max(b[a * 2 + 1]);
            }
        }

        log::debug!(
            "rank {rank}/{size}: core {core:?}, {} neighbor(s)",
            all_neighbors.len()
        );
        Ok(Self {
            rank,
            size,
            local,
            core,
            global,
            neighbors,
            all_neighbors,
            bounds,
            global_bounds,
        })
    }

    /// True when `p` falls in this rank's owned box.
    ///
    /// Half-open on every side shared with a neighbor so a particle on the
    /// seam has exactly one owner; closed on global boundaries.
    pub fn owns(&self, p: [f32; 3]) -> bool {
        (0..3).all(|a| {
            let x = p[a] as f64;
            if x < self.bounds[a * 2] {
                return false;
            }
            let hi = self.bounds[a * 2 + 1];
            if self.core.max[a] == self.global.max[a] {
                x <= hi
            } else {
                x < hi
            }
        })
    }

    /// True when `p` is anywhere in the global domain.
    pub fn in_global(&self, p: [f32; 3]) -> bool {
        (0..3).all(|a| {
            let x = p[a] as f64;
            x >= self.global_bounds[a * 2] && x <= self.global_bounds[a * 2 + 1]
        })
    }

    /// Re-homes particles that advected out of the owned box.
    ///
    /// Leavers still inside the global domain are offered to every abutting
    /// rank; the receiver keeps only those that land in its own box, so a
    /// particle has at most one owner afterwards. Leavers outside the
    /// global domain are dropped.
    pub fn migrate<C: Communicator>(
        &self,
        comm: &C,
        particles: &mut Vec<Particle>,
        tag: CommTag,
    ) -> Result<(), VofTopoError> {
        let mut leaving = Vec::new();
        particles.retain(|p| {
            if self.owns(p.pos) {
                true
            } else {
                leaving.push(*p);
                false
            }
        });
        let dropped = leaving.len();
        leaving.retain(|p| self.in_global(p.pos));
        let dropped = dropped - leaving.len();
        if dropped > 0 {
            log::debug!("rank {}: dropped {dropped} particle(s) leaving the domain", self.rank);
        }

        if self.all_neighbors.is_empty() {
            return Ok(());
        }

        let outgoing: HashMap<usize, Vec<Particle>> = self
            .all_neighbors
            .iter()
            .map(|&nbr| (nbr, leaving.clone()))
            .collect();
        let inbound = exchange_with_peers(comm, &self.all_neighbors, &outgoing, tag)?;
        for (_, batch) in inbound {
            particles.extend(batch.into_iter().filter(|p| self.owns(p.pos)));
        }
        Ok(())
    }
}

/// Physical bounds of the ghost-free part of a padded subgrid.
fn core_bounds(grid: &RectilinearGrid, local: Extent, core: Extent) -> [f64; 6] {
    let mut b = [0f64; 6];
    for a in 0..3 {
        let lo = (core.min[a] - local.min[a]) as usize;
        let hi = (core.max[a] - local.min[a]) as usize;
        b[a * 2] = grid.coords(a)[lo] as f64;
        b[a * 2 + 1] = grid.coords(a)[hi] as f64;
    }
    b
}
