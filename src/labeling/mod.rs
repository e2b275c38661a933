//! Connected-component labeling of the fluid, local and across ranks.

pub mod flood;
pub mod union_find;
pub mod unify;

pub use flood::flood_fill;
pub use union_find::DisjointSet;
pub use unify::unify_labels;

use crate::error::VofTopoError;
use crate::exchange::{CommTag, Communicator, DomainTopology};
use crate::grid::{CellScalars, RectilinearGrid};

/// Globally consistent component labels of one fraction field.
#[derive(Clone, Debug)]
pub struct LabelField {
    /// One label per cell, `-1` for non-fluid cells.
    pub labels: Vec<i32>,
    /// Global component count.
    pub count: usize,
}

impl LabelField {
    /// Label of the cell containing `p`, `-1.0` when `p` is outside the
    /// subgrid or in a non-fluid cell.
    pub fn at(&self, grid: &RectilinearGrid, p: [f32; 3]) -> f32 {
        match grid.locate([p[0] as f64, p[1] as f64, p[2] as f64]) {
            Some((ijk, _)) => self.labels[grid.cell_index(ijk)] as f32,
            None => -1.0,
        }
    }
}

/// Labels the fluid components of one field, globally consistently.
pub fn label_components<C: Communicator>(
    comm: &C,
    topo: &DomainTopology,
    grid: &RectilinearGrid,
    vof: &CellScalars,
    emf0: f32,
    ghost: i32,
    tag: CommTag,
) -> Result<LabelField, VofTopoError> {
    let (mut labels, local_count) = flood_fill(grid.cell_res(), vof, emf0);
    let count = unify_labels(comm, topo, grid, &mut labels, local_count, ghost, tag)?;
    log::debug!(
        "rank {}: {local_count} local component(s), {count} global",
        topo.rank
    );
    Ok(LabelField { labels, count })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::NoComm;

    #[test]
    fn label_lookup_by_position() {
        let grid = RectilinearGrid::uniform([0.0; 3], [1.0; 3], [5, 1, 1]);
        let vof = CellScalars::F32(vec![1.0, 1.0, 0.0, 1.0, 1.0]);
        let topo = DomainTopology::serial(&grid);
        let f = label_components(&NoComm, &topo, &grid, &vof, 1e-6, 1, CommTag::new(0x540))
            .unwrap();
        assert_eq!(f.count, 2);
        assert_eq!(f.at(&grid, [0.5, 0.5, 0.5]), 0.0);
        assert_eq!(f.at(&grid, [2.5, 0.5, 0.5]), -1.0);
        assert_eq!(f.at(&grid, [4.5, 0.5, 0.5]), 1.0);
        assert_eq!(f.at(&grid, [9.0, 0.5, 0.5]), -1.0);
    }
}
