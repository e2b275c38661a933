//! Trilinear interpolation of cell- and node-centered fields.
//!
//! Cell-centered data is shifted by half a cell toward the containing cell's
//! center before blending, with clamped index lookup at the domain edges so
//! sampling stays defined right up to (and on) the boundary.

use super::field::{CellScalars, CellVectors};
use super::RectilinearGrid;

#[inline]
fn cell_corners(res: [usize; 3], ijk: [i32; 3], pcoords: [f64; 3]) -> ([usize; 8], [f32; 3]) {
    let mut lo = [ijk[0], ijk[1], ijk[2]];
    let mut w = [0f32; 3];
    for a in 0..3 {
        if pcoords[a] < 0.5 {
            lo[a] -= 1;
            w[a] = (pcoords[a] + 0.5) as f32;
        } else {
            w[a] = (pcoords[a] - 0.5) as f32;
        }
    }
    let clamp = |v: i32, hi: usize| (v.max(0) as usize).min(hi - 1);
    let (lx, ly, lz) = (
        clamp(lo[0], res[0]),
        clamp(lo[1], res[1]),
        clamp(lo[2], res[2]),
    );
    let (ux, uy, uz) = (
        clamp(lo[0] + 1, res[0]),
        clamp(lo[1] + 1, res[1]),
        clamp(lo[2] + 1, res[2]),
    );
    let row = res[0];
    let slab = res[0] * res[1];
    let ids = [
        lx + ly * row + lz * slab,
        ux + ly * row + lz * slab,
        lx + uy * row + lz * slab,
        ux + uy * row + lz * slab,
        lx + ly * row + uz * slab,
        ux + ly * row + uz * slab,
        lx + uy * row + uz * slab,
        ux + uy * row + uz * slab,
    ];
    (ids, w)
}

#[inline]
fn blend(vv: [f32; 8], w: [f32; 3]) -> f32 {
    let (x, y, z) = (w[0], w[1], w[2]);
    let a = (1.0 - x) * vv[0] + x * vv[1];
    let b = (1.0 - x) * vv[2] + x * vv[3];
    let c = (1.0 - y) * a + y * b;
    let a = (1.0 - x) * vv[4] + x * vv[5];
    let b = (1.0 - x) * vv[6] + x * vv[7];
    let d = (1.0 - y) * a + y * b;
    (1.0 - z) * c + z * d
}

/// Interpolates a cell-centered scalar field at parametric position
/// `pcoords` within cell `ijk`.
pub fn interpolate_scalar_cell(
    field: &CellScalars,
    res: [usize; 3],
    ijk: [i32; 3],
    pcoords: [f64; 3],
) -> f32 {
    let (ids, w) = cell_corners(res, ijk, pcoords);
    let vv = ids.map(|id| field.value(id));
    blend(vv, w)
}

/// Interpolates a cell-centered vector field at parametric position
/// `pcoords` within cell `ijk`.
pub fn interpolate_vector_cell(
    field: &CellVectors,
    res: [usize; 3],
    ijk: [i32; 3],
    pcoords: [f64; 3],
) -> [f32; 3] {
    let (ids, w) = cell_corners(res, ijk, pcoords);
    let vv = ids.map(|id| field.vector(id));
    [0, 1, 2].map(|c| blend(vv.map(|v| v[c]), w))
}

/// Interpolates node-centered data: corner `ijk` and its +1 neighbors,
/// clamped to the node resolution.
pub fn interpolate_scalar_node(
    field: &[f32],
    res: [usize; 3],
    ijk: [i32; 3],
    pcoords: [f64; 3],
) -> f32 {
    let clamp = |v: i32, hi: usize| (v.max(0) as usize).min(hi - 1);
    let (lx, ly, lz) = (
        clamp(ijk[0], res[0]),
        clamp(ijk[1], res[1]),
        clamp(ijk[2], res[2]),
    );
    let (ux, uy, uz) = (
        clamp(ijk[0] + 1, res[0]),
        clamp(ijk[1] + 1, res[1]),
        clamp(ijk[2] + 1, res[2]),
    );
    let row = res[0];
    let slab = res[0] * res[1];
    let ids = [
        lx + ly * row + lz * slab,
        ux + ly * row + lz * slab,
        lx + uy * row + lz * slab,
        ux + uy * row + lz * slab,
        lx + ly * row + uz * slab,
        ux + ly * row + uz * slab,
        lx + uy * row + uz * slab,
        ux + uy * row + uz * slab,
    ];
    let w = [pcoords[0] as f32, pcoords[1] as f32, pcoords[2] as f32];
    blend(ids.map(|id| field[id]), w)
}

/// Samples a grid's cell fields at arbitrary physical points.
#[derive(Copy, Clone)]
pub struct GridSampler<'a> {
    grid: &'a RectilinearGrid,
}

impl<'a> GridSampler<'a> {
    pub fn new(grid: &'a RectilinearGrid) -> Self {
        Self { grid }
    }

    /// Trilinear scalar sample at `p`; `None` outside the subdomain.
    pub fn scalar(&self, field: &CellScalars, p: [f64; 3]) -> Option<f32> {
        let (ijk, pcoords) = self.grid.locate(p)?;
        Some(interpolate_scalar_cell(
            field,
            self.grid.cell_res(),
            ijk,
            pcoords,
        ))
    }

    /// Trilinear vector sample at `p`; `None` outside the subdomain.
    pub fn vector(&self, field: &CellVectors, p: [f64; 3]) -> Option<[f32; 3]> {
        let (ijk, pcoords) = self.grid.locate(p)?;
        Some(interpolate_vector_cell(
            field,
            self.grid.cell_res(),
            ijk,
            pcoords,
        ))
    }

    /// The raw (uninterpolated) fraction of the cell containing `p`.
    pub fn cell_value(&self, field: &CellScalars, p: [f64; 3]) -> Option<f32> {
        let (ijk, _) = self.grid.locate(p)?;
        Some(field.value(self.grid.cell_index(ijk)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::RectilinearGrid;

    fn ramp_grid() -> (RectilinearGrid, CellScalars) {
        // 4x1x1 cells, fraction equal to the cell's x-center.
        let g = RectilinearGrid::uniform([0.0; 3], [1.0, 1.0, 1.0], [4, 1, 1]);
        let f = CellScalars::F32(vec![0.5, 1.5, 2.5, 3.5]);
        (g, f)
    }

    #[test]
    fn linear_field_reproduced_between_centers() {
        let (g, f) = ramp_grid();
        let s = GridSampler::new(&g);
        let v = s.scalar(&f, [2.0, 0.5, 0.5]).unwrap();
        assert!((v - 2.0).abs() < 1e-6);
    }

    #[test]
    fn clamped_at_domain_edge() {
        let (g, f) = ramp_grid();
        let s = GridSampler::new(&g);
        // Below the first cell center: both corners clamp to cell 0.
        let v = s.scalar(&f, [0.1, 0.5, 0.5]).unwrap();
        assert!((v - 0.5).abs() < 1e-6);
    }

    #[test]
    fn vector_components_interpolate_independently() {
        let g = RectilinearGrid::uniform([0.0; 3], [1.0, 1.0, 1.0], [2, 1, 1]);
        let vel = CellVectors::F32(vec![[1.0, 0.0, 2.0], [3.0, 0.0, 4.0]]);
        let s = GridSampler::new(&g);
        let v = s.vector(&vel, [1.0, 0.5, 0.5]).unwrap();
        assert!((v[0] - 2.0).abs() < 1e-6);
        assert!((v[2] - 3.0).abs() < 1e-6);
    }

    #[test]
    fn outside_returns_none() {
        let (g, f) = ramp_grid();
        let s = GridSampler::new(&g);
        assert!(s.scalar(&f, [5.0, 0.5, 0.5]).is_none());
    }
}
