//! Post-advection particle corrections.
//!
//! Numerical drift leaves particles stranded in empty cells or past the
//! reconstructed interface. Both corrections move the particle the shortest
//! way back and charge the moved distance to its uncertainty channel.

use rayon::prelude::*;

use crate::config::TopoConfig;
use crate::grid::{RectilinearGrid, Snapshot};
use crate::math::{dot3, length3, normalize3, scale3, sub3};
use crate::particle::Particle;
use crate::plic::PlicField;

#[inline]
fn to_f64(p: [f32; 3]) -> [f64; 3] {
    [p[0] as f64, p[1] as f64, p[2] as f64]
}

fn dist2(a: [f32; 3], b: [f32; 3]) -> f32 {
    let d = sub3(a, b);
    dot3(d, d)
}

/// Moves particles that ended up in an empty cell to the center of a nearby
/// fluid cell.
///
/// The search scans a `(2r+1)^3` cell stencil around the containing cell in
/// k-j-i order; among candidates at the minimum distance the last one
/// scanned wins.
pub fn correct_vof(particles: &mut [Particle], t1: &Snapshot, cfg: &TopoConfig) {
    let grid = &t1.grid;
    let res = grid.cell_res();
    let r = cfg.stencil_range;

    particles.par_iter_mut().for_each(|p| {
        if !p.is_active(cfg.emf0) {
            return;
        }
        let Some((ijk, _)) = grid.locate(to_f64(p.pos)) else {
            return;
        };
        if cfg.is_fluid(t1.vof.value(grid.cell_index(ijk))) {
            return;
        }

        let min_d2 = f32::MAX;
        let mut best: Option<([i32; 3], f32)> = None;
        for dk in -r..=r {
            for dj in -r..=r {
                for di in -r..=r {
                    let c = [ijk[0] + di, ijk[1] + dj, ijk[2] + dk];
                    if c.iter()
                        .zip(res.iter())
                        .any(|(&v, &n)| v < 0 || v >= n as i32)
                    {
                        continue;
                    }
                    let f = t1.vof.value(grid.cell_index(c));
                    if f > cfg.emf0 {
                        let d2 = dist2(p.pos, grid.cell_center(c));
                        if d2 <= min_d2 {
                            best = Some((c, f));
                        }
                    }
                }
            }
        }

        if let Some((c, f)) = best {
            let target = grid.cell_center(c);
            p.uncertainty += length3(sub3(target, p.pos));
            p.pos = target;
            p.fluid = f;
        }
    });
}

/// Clamps particles that crossed their cell's PLIC plane back onto it.
///
/// The pull-back runs along the attachment-corner direction, scaled by the
/// angle between that direction and the plane normal.
pub fn correct_plic(
    particles: &mut [Particle],
    grid: &RectilinearGrid,
    plic: &PlicField,
    cfg: &TopoConfig,
) {
    particles.par_iter_mut().for_each(|p| {
        if !p.is_active(cfg.emf0) {
            return;
        }
        let Some((ijk, _)) = grid.locate(to_f64(p.pos)) else {
            return;
        };
        let idx = grid.cell_index(ijk);
        let lstar = plic.lstar[idx];
        if lstar <= 0.0 {
            return;
        }
        let n = plic.normals[idx];
        let attach = plic.attach_point(grid, ijk);
        let pos_vec = sub3(p.pos, attach);
        let d = dot3(pos_vec, n);
        if d <= lstar {
            return;
        }
        let dir = normalize3(pos_vec);
        let cos_phi = dot3(dir, n);
        if cos_phi <= 0.0 {
            return;
        }
        let pull = (d - lstar) / cos_phi;
        p.pos = sub3(p.pos, scale3(dir, pull));
        p.uncertainty += pull;
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{CellScalars, CellVectors, RectilinearGrid};

    fn two_phase_column() -> Snapshot {
        // 6x1x1 cells, fluid in the first two.
        let grid = RectilinearGrid::uniform([0.0; 3], [1.0; 3], [6, 1, 1]);
        Snapshot {
            grid,
            vof: CellScalars::F32(vec![1.0, 1.0, 0.0, 0.0, 0.0, 0.0]),
            velocity: CellVectors::zeros(6),
        }
    }

    #[test]
    fn stranded_particle_snaps_to_nearest_fluid_cell() {
        let t1 = two_phase_column();
        let mut ps = vec![Particle::new([2.4, 0.5, 0.5], 0, 0)];
        correct_vof(&mut ps, &t1, &TopoConfig::default());
        // relocated to the center of cell 1
        assert!((ps[0].pos[0] - 1.5).abs() < 1e-6);
        assert!(ps[0].uncertainty > 0.0);
        assert_eq!(ps[0].fluid, 1.0);
    }

    #[test]
    fn particle_already_in_fluid_is_untouched() {
        let t1 = two_phase_column();
        let mut ps = vec![Particle::new([0.5, 0.5, 0.5], 0, 0)];
        correct_vof(&mut ps, &t1, &TopoConfig::default());
        assert_eq!(ps[0].pos, [0.5, 0.5, 0.5]);
        assert_eq!(ps[0].uncertainty, 0.0);
    }

    #[test]
    fn plic_pullback_reaches_the_plane() {
        // Half-full single cell with an x-normal plane at x = lstar.
        let grid = RectilinearGrid::uniform([0.0; 3], [1.0; 3], [3, 1, 1]);
        let vof = CellScalars::F32(vec![1.0, 0.5, 0.0]);
        let cfg = TopoConfig::default();
        let plic = crate::plic::reconstruct(&grid, &vof, &cfg);
        let idx = grid.cell_index([1, 0, 0]);
        let lstar = plic.lstar[idx];
        assert!(lstar > 0.0);

        // particle past the plane, straight along the normal from the
        // attachment corner
        let mut ps = vec![Particle::new([1.0 + lstar + 0.2, 0.5, 0.5], 0, 0)];
        // attachment corner is at x=1 (normal points +x), offset y/z so the
        // pull direction is oblique but still ends on the plane
        correct_plic(&mut ps, &grid, &plic, &cfg);
        let attach = plic.attach_point(&grid, [1, 0, 0]);
        let d = dot3(sub3(ps[0].pos, attach), plic.normals[idx]);
        assert!(d <= lstar + 1e-4);
        assert!(ps[0].uncertainty > 0.0);
    }

    #[test]
    fn particle_inside_plane_is_untouched() {
        let grid = RectilinearGrid::uniform([0.0; 3], [1.0; 3], [3, 1, 1]);
        let vof = CellScalars::F32(vec![1.0, 0.5, 0.0]);
        let cfg = TopoConfig::default();
        let plic = crate::plic::reconstruct(&grid, &vof, &cfg);
        let mut ps = vec![Particle::new([1.05, 0.5, 0.5], 0, 0)];
        let before = ps[0].pos;
        correct_plic(&mut ps, &grid, &plic, &cfg);
        assert_eq!(ps[0].pos, before);
    }
}
