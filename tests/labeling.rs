//! Distributed labeling agrees with the serial result.

use serial_test::serial;
use vof_topo::exchange::{CommTag, DomainTopology, NoComm, RayonComm};
use vof_topo::grid::{CellScalars, Extent, RectilinearGrid};
use vof_topo::labeling::label_components;

const GHOST: i32 = 1;

/// Global test field on 12x2x2 cells: three fluid runs along x.
fn global_fluid(gx: i32) -> f32 {
    match gx {
        0..=2 | 5..=6 | 9..=11 => 1.0,
        _ => 0.0,
    }
}

fn subgrid(lo: i32, hi: i32) -> RectilinearGrid {
    let coords = [
        (lo..=hi).map(|i| i as f32).collect::<Vec<_>>(),
        vec![0.0, 1.0, 2.0],
        vec![0.0, 1.0, 2.0],
    ];
    RectilinearGrid::new(coords, Extent::from_flat([lo, hi, 0, 2, 0, 2])).unwrap()
}

fn fill(grid: &RectilinearGrid) -> CellScalars {
    let res = grid.cell_res();
    let mut f = vec![0.0f32; grid.num_cells()];
    for k in 0..res[2] {
        for j in 0..res[1] {
            for i in 0..res[0] {
                let gx = i as i32 + grid.extent().min[0];
                f[i + j * res[0] + k * res[0] * res[1]] = global_fluid(gx);
            }
        }
    }
    CellScalars::F32(f)
}

#[test]
fn serial_reference_labeling() {
    let grid = subgrid(0, 12);
    let vof = fill(&grid);
    let topo = DomainTopology::serial(&grid);
    let lf = label_components(&NoComm, &topo, &grid, &vof, 1e-6, GHOST, CommTag::new(0x700))
        .unwrap();
    assert_eq!(lf.count, 3);
    assert_eq!(lf.at(&grid, [1.0, 1.0, 1.0]), 0.0);
    assert_eq!(lf.at(&grid, [5.5, 1.0, 1.0]), 1.0);
    assert_eq!(lf.at(&grid, [10.0, 1.0, 1.0]), 2.0);
}

#[test]
#[serial]
fn two_ranks_match_the_serial_labels() {
    let tag = CommTag::new(0x710);
    let run = |rank: usize| {
        std::thread::spawn(move || {
            let comm = RayonComm::new(rank, 2);
            // split at node 6 with one ghost cell each way
            let grid = if rank == 0 { subgrid(0, 7) } else { subgrid(5, 12) };
            let vof = fill(&grid);
            let topo = DomainTopology::build(&comm, &grid, GHOST, tag).unwrap();
            let lf =
                label_components(&comm, &topo, &grid, &vof, 1e-6, GHOST, tag.offset(16)).unwrap();
            let probes = [
                [1.0f32, 1.0, 1.0],
                [5.5, 1.0, 1.0],
                [10.0, 1.0, 1.0],
            ];
            let at: Vec<f32> = probes
                .iter()
                .filter(|p| topo.owns(**p))
                .map(|p| lf.at(&grid, *p))
                .collect();
            (lf.count, at)
        })
    };
    let h0 = run(0);
    let h1 = run(1);
    let (n0, l0) = h0.join().unwrap();
    let (n1, l1) = h1.join().unwrap();
    assert_eq!(n0, 3);
    assert_eq!(n1, 3);
    // the run spanning the rank seam keeps a single label on both sides
    assert_eq!(l0, vec![0.0, 1.0]);
    assert_eq!(l1, vec![2.0]);
}
