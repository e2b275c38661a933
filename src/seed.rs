//! Seed placement on the reconstructed interface.
//!
//! Every fluid-carrying cell in the ghost-free interior is subdivided into
//! `2^refinement` sub-cells per axis; a seed is emitted at each sub-cell
//! center that lies on the fluid side of the cell's PLIC plane (full cells
//! accept every sub-cell). Seed ids are rank-local ordinals assigned in
//! emission order and stay stable for the life of the epoch.

use crate::config::TopoConfig;
use crate::grid::{CellScalars, Extent, RectilinearGrid};
use crate::math::{dot3, sub3};
use crate::particle::Particle;
use crate::plic::PlicField;

/// Inclusive-exclusive cell loop bounds that skip the ghost layers on sides
/// interior to the global domain.
pub(crate) fn interior_cell_range(
    grid: &RectilinearGrid,
    global: Extent,
    ghost: i32,
) -> [(i32, i32); 3] {
    let extent = grid.extent();
    let res = grid.cell_res();
    [0, 1, 2].map(|a| {
        let lo = if extent.min[a] == global.min[a] {
            0
        } else {
            ghost
        };
        let hi = if extent.max[a] == global.max[a] {
            res[a] as i32
        } else {
            res[a] as i32 - ghost
        };
        (lo, hi)
    })
}

/// Places seeds on the interface of one snapshot.
pub fn place_seeds(
    grid: &RectilinearGrid,
    vof: &CellScalars,
    plic: &PlicField,
    cfg: &TopoConfig,
    global: Extent,
    rank: i32,
) -> Vec<Particle> {
    let range = interior_cell_range(grid, global, cfg.ghost_levels);
    let subs = 1i32 << cfg.refinement;
    let mut seeds = Vec::new();
    let mut next_id = 0i32;

    for k in range[2].0..range[2].1 {
        for j in range[1].0..range[1].1 {
            for i in range[0].0..range[0].1 {
                let ijk = [i, j, k];
                let idx = grid.cell_index(ijk);
                let f = vof.value(idx);
                if !cfg.is_fluid(f) {
                    continue;
                }

                let full = cfg.is_full(f);
                let n = plic.normals[idx];
                let lstar = plic.lstar[idx];
                let attach = plic.attach_point(grid, ijk);
                let size = grid.cell_size(ijk);
                let origin = [0, 1, 2].map(|a| grid.coords(a)[ijk[a] as usize]);

                for (sk, sj, si) in itertools::iproduct!(0..subs, 0..subs, 0..subs) {
                    let sc = [si, sj, sk];
                    let pos = [0, 1, 2]
                        .map(|a| origin[a] + size[a] * (sc[a] as f32 + 0.5) / subs as f32);
                    let accept = if full {
                        true
                    } else {
                        dot3(sub3(pos, attach), n) < lstar
                    };
                    if accept {
                        seeds.push(Particle::new(pos, next_id, rank));
                        next_id += 1;
                    }
                }
            }
        }
    }
    seeds
}
