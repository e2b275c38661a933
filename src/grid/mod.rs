//! Rectilinear grid snapshots and field sampling.

pub mod extent;
pub mod field;
pub mod sampler;

pub use extent::{find_neighbors, Extent, Halo, Side, SIDES};
pub use field::{CellScalars, CellVectors};
pub use sampler::GridSampler;

use crate::error::VofTopoError;

/// Axis-aligned rectilinear mesh: per-axis monotonically increasing node
/// coordinates plus the node-index extent of this subdomain.
#[derive(Clone, Debug)]
pub struct RectilinearGrid {
    coords: [Vec<f32>; 3],
    extent: Extent,
}

impl RectilinearGrid {
    pub fn new(coords: [Vec<f32>; 3], extent: Extent) -> Result<Self, VofTopoError> {
        for (axis, c) in coords.iter().enumerate() {
            if c.len() < 2 {
                return Err(VofTopoError::DegenerateAxis {
                    axis,
                    nodes: c.len(),
                });
            }
        }
        Ok(Self { coords, extent })
    }

    /// Uniformly spaced grid with `cells` cells per axis, extent starting
    /// at node zero. Mostly a test/fixture convenience.
    pub fn uniform(origin: [f32; 3], spacing: [f32; 3], cells: [usize; 3]) -> Self {
        let coords = [0, 1, 2].map(|a| {
            (0..=cells[a])
                .map(|i| origin[a] + spacing[a] * i as f32)
                .collect::<Vec<f32>>()
        });
        let extent = Extent::new(
            [0, 0, 0],
            [cells[0] as i32, cells[1] as i32, cells[2] as i32],
        );
        Self { coords, extent }
    }

    #[inline]
    pub fn coords(&self, axis: usize) -> &[f32] {
        &self.coords[axis]
    }

    #[inline]
    pub fn extent(&self) -> Extent {
        self.extent
    }

    pub fn node_res(&self) -> [usize; 3] {
        [
            self.coords[0].len(),
            self.coords[1].len(),
            self.coords[2].len(),
        ]
    }

    pub fn cell_res(&self) -> [usize; 3] {
        let n = self.node_res();
        [n[0] - 1, n[1] - 1, n[2] - 1]
    }

    pub fn num_cells(&self) -> usize {
        let c = self.cell_res();
        c[0] * c[1] * c[2]
    }

    /// Physical bounds `[xmin,xmax,ymin,ymax,zmin,zmax]`.
    pub fn bounds(&self) -> [f64; 6] {
        let b = |axis: usize| {
            let c = &self.coords[axis];
            (c[0] as f64, c[c.len() - 1] as f64)
        };
        let (x0, x1) = b(0);
        let (y0, y1) = b(1);
        let (z0, z1) = b(2);
        [x0, x1, y0, y1, z0, z1]
    }

    /// Flat cell index for a local cell triple.
    #[inline]
    pub fn cell_index(&self, ijk: [i32; 3]) -> usize {
        let c = self.cell_res();
        ijk[0] as usize + ijk[1] as usize * c[0] + ijk[2] as usize * c[0] * c[1]
    }

    /// Edge lengths of cell `ijk`.
    pub fn cell_size(&self, ijk: [i32; 3]) -> [f32; 3] {
        [0, 1, 2].map(|a| {
            let i = ijk[a] as usize;
            self.coords[a][i + 1] - self.coords[a][i]
        })
    }

    /// Center of cell `ijk`.
    pub fn cell_center(&self, ijk: [i32; 3]) -> [f32; 3] {
        [0, 1, 2].map(|a| {
            let i = ijk[a] as usize;
            0.5 * (self.coords[a][i] + self.coords[a][i + 1])
        })
    }

    /// Locates the cell containing physical point `p`.
    ///
    /// Returns the local cell triple and the parametric coordinates within
    /// the cell, or `None` when the point lies outside this subdomain.
    /// Points on the upper boundary land in the last cell with parametric
    /// coordinate 1.
    pub fn locate(&self, p: [f64; 3]) -> Option<([i32; 3], [f64; 3])> {
        let mut ijk = [0i32; 3];
        let mut pcoords = [0f64; 3];
        for a in 0..3 {
            let c = &self.coords[a];
            let x = p[a];
            if x < c[0] as f64 || x > c[c.len() - 1] as f64 {
                return None;
            }
            // upper_bound - 1 over the monotonic node coordinates
            let mut cell = match c.partition_point(|&v| (v as f64) <= x) {
                0 => 0,
                n => n - 1,
            };
            if cell >= c.len() - 1 {
                cell = c.len() - 2;
            }
            let lo = c[cell] as f64;
            let hi = c[cell + 1] as f64;
            ijk[a] = cell as i32;
            pcoords[a] = if hi > lo { (x - lo) / (hi - lo) } else { 0.0 };
        }
        Some((ijk, pcoords))
    }
}

/// One timestep of input: the grid plus its VOF fraction and velocity cell
/// arrays.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub grid: RectilinearGrid,
    pub vof: CellScalars,
    pub velocity: CellVectors,
}

impl Snapshot {
    pub fn new(
        grid: RectilinearGrid,
        vof: CellScalars,
        velocity: CellVectors,
    ) -> Result<Self, VofTopoError> {
        let want = grid.num_cells();
        if vof.len() != want {
            return Err(VofTopoError::ArrayLengthMismatch {
                name: "Data",
                got: vof.len(),
                want,
            });
        }
        if velocity.len() != want {
            return Err(VofTopoError::ArrayLengthMismatch {
                name: "Data",
                got: velocity.len(),
                want,
            });
        }
        Ok(Self {
            grid,
            vof,
            velocity,
        })
    }

    /// Builds a snapshot from possibly-absent named arrays.
    ///
    /// A missing array is logged and replaced by zeros; labeling then runs
    /// on an all-empty field rather than aborting the epoch.
    pub fn from_named(
        grid: RectilinearGrid,
        vof: Option<CellScalars>,
        velocity: Option<CellVectors>,
    ) -> Self {
        let n = grid.num_cells();
        let vof = vof.unwrap_or_else(|| {
            log::warn!("cell array \"Data\" (vof) not found; using zeros");
            CellScalars::zeros(n)
        });
        let velocity = velocity.unwrap_or_else(|| {
            log::warn!("cell array \"Data\" (velocity) not found; using zeros");
            CellVectors::zeros(n)
        });
        Self {
            grid,
            vof,
            velocity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locate_interior_point() {
        let g = RectilinearGrid::uniform([0.0; 3], [1.0; 3], [4, 4, 4]);
        let (ijk, pc) = g.locate([1.5, 2.25, 0.5]).unwrap();
        assert_eq!(ijk, [1, 2, 0]);
        assert!((pc[0] - 0.5).abs() < 1e-12);
        assert!((pc[1] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn locate_upper_boundary_clamps_to_last_cell() {
        let g = RectilinearGrid::uniform([0.0; 3], [1.0; 3], [4, 4, 4]);
        let (ijk, pc) = g.locate([4.0, 4.0, 4.0]).unwrap();
        assert_eq!(ijk, [3, 3, 3]);
        assert!((pc[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn locate_outside_is_none() {
        let g = RectilinearGrid::uniform([0.0; 3], [1.0; 3], [4, 4, 4]);
        assert!(g.locate([-0.1, 1.0, 1.0]).is_none());
        assert!(g.locate([1.0, 1.0, 4.1]).is_none());
    }

    #[test]
    fn degenerate_axis_rejected() {
        let err = RectilinearGrid::new(
            [vec![0.0], vec![0.0, 1.0], vec![0.0, 1.0]],
            Extent::new([0; 3], [1; 3]),
        );
        assert!(err.is_err());
    }

    #[test]
    fn snapshot_length_check() {
        let g = RectilinearGrid::uniform([0.0; 3], [1.0; 3], [2, 2, 2]);
        let bad = Snapshot::new(g.clone(), CellScalars::zeros(7), CellVectors::zeros(8));
        assert!(bad.is_err());
        let ok = Snapshot::new(g, CellScalars::zeros(8), CellVectors::zeros(8));
        assert!(ok.is_ok());
    }
}
