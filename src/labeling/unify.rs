//! Cross-rank unification of local component labels.
//!
//! Local labels are first lifted into a disjoint global id space via an
//! all-gather of per-rank counts. Boundary slabs (ghost plus first owned
//! layer) are then exchanged with the abutting ranks; any cell labeled on
//! both sides of a seam yields a union. Finally every rank gathers every
//! other rank's union-find parents, replays them, and compacts the global
//! space to dense component ids.

use std::collections::HashMap;

use super::union_find::DisjointSet;
use crate::error::VofTopoError;
use crate::exchange::{
    all_gather, all_gather_one, exchange_with_peers, CommTag, Communicator, DomainTopology,
    WireLabeledCell,
};
use crate::grid::{Halo, RectilinearGrid, SIDES};

/// Rewrites rank-local labels in place to globally consistent dense ids and
/// returns the global component count.
pub fn unify_labels<C: Communicator>(
    comm: &C,
    topo: &DomainTopology,
    grid: &RectilinearGrid,
    labels: &mut [i32],
    local_count: usize,
    ghost: i32,
    tag: CommTag,
) -> Result<usize, VofTopoError> {
    if comm.is_serial() {
        return Ok(local_count);
    }

    // lift into the global label space
    let counts = all_gather_one(comm, local_count as u32, tag)?;
    let offset: u32 = counts[..topo.rank].iter().sum();
    let total: u32 = counts.iter().sum();
    for l in labels.iter_mut() {
        if *l >= 0 {
            *l += offset as i32;
        }
    }

    // exchange labeled boundary slabs with the abutting ranks
    let cell_res = grid.cell_res();
    let halo = Halo::new(cell_res, topo.local, topo.global, ghost);
    let cell_index = |ijk: [i32; 3]| {
        ijk[0] as usize + ijk[1] as usize * cell_res[0] + ijk[2] as usize * cell_res[0] * cell_res[1]
    };

    let mut outgoing: HashMap<usize, Vec<WireLabeledCell>> = HashMap::new();
    for side in SIDES {
        let nbrs = &topo.neighbors[side.index()];
        if nbrs.is_empty() {
            continue;
        }
        let records: Vec<WireLabeledCell> = halo
            .cells(side)
            .filter_map(|ijk| {
                let l = labels[cell_index(ijk)];
                (l >= 0).then(|| {
                    let global = [0, 1, 2].map(|a| ijk[a] + topo.local.min[a]);
                    WireLabeledCell::new(global, l)
                })
            })
            .collect();
        for &nbr in nbrs {
            outgoing.entry(nbr).or_default().extend(records.iter().copied());
        }
    }

    let inbound = exchange_with_peers(comm, &topo.all_neighbors, &outgoing, tag.offset(4))?;

    let mut ds = DisjointSet::new(total as usize);
    for (nbr, records) in &inbound {
        log::trace!(
            "rank {}: {} labeled boundary cell(s) from rank {nbr}",
            topo.rank,
            records.len()
        );
        for rec in records {
            let local = [0, 1, 2].map(|a| rec.ijk()[a] - topo.local.min[a]);
            if local
                .iter()
                .zip(cell_res.iter())
                .any(|(&v, &n)| v < 0 || v >= n as i32)
            {
                continue;
            }
            let mine = labels[cell_index(local)];
            if mine >= 0 {
                ds.union(mine as u32, rec.label as u32);
            }
        }
    }

    // replay every rank's unions, then compact
    let parents = ds.parents();
    let all_parents = all_gather(comm, &parents, tag.offset(6))?;
    for rank_parents in &all_parents {
        if rank_parents.len() != total as usize {
            return Err(VofTopoError::IncompleteGather {
                want: total as usize,
                got: rank_parents.len(),
            });
        }
        for (i, &p) in rank_parents.iter().enumerate() {
            ds.union(i as u32, p);
        }
    }
    let (remap, count) = ds.compact();
    for l in labels.iter_mut() {
        if *l >= 0 {
            *l = remap[*l as usize] as i32;
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::{NoComm, RayonComm};
    use crate::grid::{CellScalars, Extent};
    use crate::labeling::flood::flood_fill;
    use serial_test::serial;

    #[test]
    fn serial_unify_is_identity() {
        let grid = crate::grid::RectilinearGrid::uniform([0.0; 3], [1.0; 3], [3, 1, 1]);
        let topo = DomainTopology::serial(&grid);
        let mut labels = vec![0, -1, 1];
        let n = unify_labels(&NoComm, &topo, &grid, &mut labels, 2, 1, CommTag::new(0x500))
            .unwrap();
        assert_eq!(n, 2);
        assert_eq!(labels, vec![0, -1, 1]);
    }

    fn rank_grid(rank: usize) -> crate::grid::RectilinearGrid {
        // 8 cells along x split at node 4 with one ghost cell
        let (lo, hi) = if rank == 0 { (0, 5) } else { (3, 8) };
        let coords = [
            (lo..=hi).map(|i| i as f32).collect::<Vec<_>>(),
            vec![0.0, 1.0],
            vec![0.0, 1.0],
        ];
        let extent = Extent::from_flat([lo, hi, 0, 1, 0, 1]);
        crate::grid::RectilinearGrid::new(coords, extent).unwrap()
    }

    #[test]
    #[serial]
    fn component_spanning_the_seam_gets_one_label() {
        let tag = CommTag::new(0x510);
        let run = |rank: usize| {
            std::thread::spawn(move || {
                let comm = RayonComm::new(rank, 2);
                let grid = rank_grid(rank);
                let topo = DomainTopology::build(&comm, &grid, 1, tag).unwrap();
                // fluid everywhere along x: one global component
                let vof = CellScalars::F32(vec![1.0; grid.num_cells()]);
                let (mut labels, count) = flood_fill(grid.cell_res(), &vof, 1e-6);
                let n = unify_labels(
                    &comm,
                    &topo,
                    &grid,
                    &mut labels,
                    count,
                    1,
                    tag.offset(16),
                )
                .unwrap();
                (n, labels)
            })
        };
        let h0 = run(0);
        let h1 = run(1);
        let (n0, l0) = h0.join().unwrap();
        let (n1, l1) = h1.join().unwrap();
        assert_eq!(n0, 1);
        assert_eq!(n1, 1);
        assert!(l0.iter().all(|&l| l == 0));
        assert!(l1.iter().all(|&l| l == 0));
    }

    #[test]
    #[serial]
    fn disjoint_blobs_keep_distinct_labels() {
        let tag = CommTag::new(0x530);
        let run = |rank: usize| {
            std::thread::spawn(move || {
                let comm = RayonComm::new(rank, 2);
                let grid = rank_grid(rank);
                let topo = DomainTopology::build(&comm, &grid, 1, tag).unwrap();
                // rank 0 cells cover x cells [0,5), rank 1 [3,8): fluid only
                // in global cells 0-1 and 6-7, far from the seam
                let mut f = vec![0.0f32; grid.num_cells()];
                for (i, v) in f.iter_mut().enumerate() {
                    let gx = i as i32 + grid.extent().min[0];
                    if gx < 2 || gx >= 6 {
                        *v = 1.0;
                    }
                }
                let vof = CellScalars::F32(f);
                let (mut labels, count) = flood_fill(grid.cell_res(), &vof, 1e-6);
                let n = unify_labels(
                    &comm,
                    &topo,
                    &grid,
                    &mut labels,
                    count,
                    1,
                    tag.offset(16),
                )
                .unwrap();
                (n, labels)
            })
        };
        let h0 = run(0);
        let h1 = run(1);
        let (n0, l0) = h0.join().unwrap();
        let (n1, l1) = h1.join().unwrap();
        assert_eq!(n0, 2);
        assert_eq!(n1, 2);
        // the low blob is component 0 on both ranks, the high blob 1
        assert_eq!(l0[0], 0);
        assert_eq!(l1[l1.len() - 1], 1);
    }
}
