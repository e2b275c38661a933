//! Component boundary surfaces from labeled particles.
//!
//! For every component, the particles are splatted as a trilinear density
//! onto a refined sub-grid spanning the component's (inflated) cell extent,
//! and the 0.501 iso-surface of that density is extracted. Sides of the
//! sub-grid that reach into the ghost region are trimmed so every rank
//! meshes only what it owns.

pub mod marching;
pub mod tables;

pub use marching::TriangleMesh;

use crate::grid::{Extent, RectilinearGrid};
use crate::particle::Particle;

const ISO_VALUE: f32 = 0.501;
const BOUNDARY_SIZE: i32 = 2;

/// Per-rank boundary mesh: triangles plus a component label per vertex.
#[derive(Clone, Debug, Default)]
pub struct BoundaryMesh {
    pub mesh: TriangleMesh,
    /// Component label of each vertex.
    pub labels: Vec<i16>,
    /// Vertex range `offsets[l]..offsets[l+1]` belonging to the l-th label
    /// in the meshed range.
    pub label_offsets: Vec<usize>,
}

/// Node coordinates of one axis of a `2^refinement`-refined sub-grid over
/// parent cells `ijk0..=ijk1`.
fn generate_coords(
    coords: &[f32],
    sub_node_res: usize,
    subone: usize,
    r: usize,
    ijk0: usize,
    ijk1: usize,
) -> Vec<f32> {
    let mut sub = vec![0f32; sub_node_res];
    let mut xprev = coords[ijk0];
    let ires = (sub_node_res + subone) / r;
    for j in 0..ires.saturating_sub(1) {
        let x = coords[ijk0 + j + 1];
        let dx = (x - xprev) / r as f32;
        for k in 0..r {
            sub[j * r + k] = xprev + k as f32 * dx;
        }
        xprev = x;
    }
    sub[sub_node_res - 1] = coords[ijk1 + 1];
    sub
}

/// Splats unit weights at the particle positions onto the sub-grid nodes.
fn splat_particles(
    particles: &[Particle],
    point_ids: &[usize],
    coords: &[Vec<f32>; 3],
    node_res: [usize; 3],
    field: &mut [f32],
) {
    let row = node_res[0];
    let slab = node_res[0] * node_res[1];
    for &pi in point_ids {
        let p = particles[pi].pos;
        let mut ijk = [0usize; 3];
        let mut w = [0f32; 3];
        for a in 0..3 {
            let c = &coords[a];
            let cells = c.len() - 1;
            let mut cell = match c.partition_point(|&v| v <= p[a]) {
                0 => 0,
                n => n - 1,
            };
            if cell >= cells {
                cell = cells - 1;
            }
            let lo = c[cell];
            let hi = c[cell + 1];
            ijk[a] = cell;
            w[a] = if hi > lo {
                ((p[a] - lo) / (hi - lo)).clamp(0.0, 1.0)
            } else {
                0.0
            };
        }
        let base = ijk[0] + ijk[1] * row + ijk[2] * slab;
        let (x, y, z) = (w[0], w[1], w[2]);
        field[base] += (1.0 - x) * (1.0 - y) * (1.0 - z);
        field[base + 1] += x * (1.0 - y) * (1.0 - z);
        field[base + 1 + row] += x * y * (1.0 - z);
        field[base + row] += (1.0 - x) * y * (1.0 - z);
        field[base + slab] += (1.0 - x) * (1.0 - y) * z;
        field[base + 1 + slab] += x * (1.0 - y) * z;
        field[base + 1 + row + slab] += x * y * z;
        field[base + row + slab] += (1.0 - x) * y * z;
    }
}

/// Cell-index extent of a point set on the parent grid.
fn label_cell_extent(
    grid: &RectilinearGrid,
    particles: &[Particle],
    point_ids: &[usize],
) -> Option<[i32; 6]> {
    let mut lo = [f32::MAX; 3];
    let mut hi = [f32::MIN; 3];
    for &pi in point_ids {
        let p = particles[pi].pos;
        for a in 0..3 {
            lo[a] = lo[a].min(p[a]);
            hi[a] = hi[a].max(p[a]);
        }
    }
    let (c0, _) = grid.locate([lo[0] as f64, lo[1] as f64, lo[2] as f64])?;
    let (c1, _) = grid.locate([hi[0] as f64, hi[1] as f64, hi[2] as f64])?;
    Some([c0[0], c1[0], c0[1], c1[1], c0[2], c1[2]])
}

/// Meshes the boundary of every labeled component.
///
/// `core` is the ghost-free node extent of the subgrid (same index space as
/// `grid.extent()`); boundary triangles in the ghost region are suppressed.
pub fn mesh_boundaries(
    particles: &[Particle],
    labels: &[f32],
    grid: &RectilinearGrid,
    core: Extent,
    refinement: u32,
) -> BoundaryMesh {
    let mut out = BoundaryMesh::default();
    if particles.is_empty() || labels.len() != particles.len() {
        return out;
    }

    let labeled: Vec<i32> = labels.iter().map(|&l| l as i32).collect();
    let Some(&min_label) = labeled.iter().filter(|&&l| l >= 0).min() else {
        return out;
    };
    let max_label = *labeled.iter().max().unwrap_or(&min_label);
    let num_labels = (max_label - min_label + 1) as usize;

    // indices of the particles carrying each label
    let mut label_points: Vec<Vec<usize>> = vec![Vec::new(); num_labels];
    for (i, &l) in labeled.iter().enumerate() {
        if l >= min_label {
            label_points[(l - min_label) as usize].push(i);
        }
    }

    let local = grid.extent();
    let cell_res = grid.cell_res();
    // ghost-free bounds in local cell indices
    let core_cells: [i32; 6] = [
        core.min[0] - local.min[0],
        core.max[0] - local.min[0] - 1,
        core.min[1] - local.min[1],
        core.max[1] - local.min[1] - 1,
        core.min[2] - local.min[2],
        core.max[2] - local.min[2] - 1,
    ];

    let r = 1usize << refinement;
    let subone = usize::from(refinement > 0);
    out.label_offsets.push(0);

    for points in &label_points {
        if points.is_empty() {
            out.label_offsets.push(out.mesh.positions.len());
            continue;
        }
        let Some(ext) = label_cell_extent(grid, particles, points) else {
            out.label_offsets.push(out.mesh.positions.len());
            continue;
        };

        // one-cell inflation, clamped to the subgrid
        let mut ijk0 = [0usize; 3];
        let mut ijk1 = [0usize; 3];
        let mut sub_node_res = [0usize; 3];
        for a in 0..3 {
            ijk0[a] = (ext[a * 2] - 1).max(0) as usize;
            ijk1[a] = (ext[a * 2 + 1] + 1).min(cell_res[a] as i32 - 1) as usize;
            sub_node_res[a] = (ijk1[a] - ijk0[a] + 2) * r - subone;
        }

        let sub_coords = [0, 1, 2].map(|a| {
            generate_coords(
                grid.coords(a),
                sub_node_res[a],
                subone,
                r,
                ijk0[a],
                ijk1[a],
            )
        });

        let mut field = vec![0f32; sub_node_res[0] * sub_node_res[1] * sub_node_res[2]];
        splat_particles(particles, points, &sub_coords, sub_node_res, &mut field);

        // trim sides reaching into the ghost region
        let mut sweep = [
            0,
            sub_node_res[0] as i32 - 1,
            0,
            sub_node_res[1] as i32 - 1,
            0,
            sub_node_res[2] as i32 - 1,
        ];
        let trim = r as i32 * BOUNDARY_SIZE;
        for a in 0..3 {
            if core_cells[a * 2] > ext[a * 2] {
                sweep[a * 2] += trim;
            }
            if core_cells[a * 2 + 1] < ext[a * 2 + 1] {
                sweep[a * 2 + 1] -= trim;
            }
        }

        let before = out.mesh.positions.len();
        marching::extract_surface(
            &field,
            sub_node_res,
            &sub_coords,
            sweep,
            ISO_VALUE,
            &mut out.mesh,
        );
        marching::vertex_normals(&field, sub_node_res, &sub_coords, &mut out.mesh, before);
        out.label_offsets.push(out.mesh.positions.len());
    }

    out.labels = Vec::with_capacity(out.mesh.positions.len());
    for l in 0..num_labels {
        let span = out.label_offsets[l + 1] - out.label_offsets[l];
        out.labels
            .extend(std::iter::repeat((l as i32 + min_label) as i16).take(span));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cloud(center: [f32; 3], n: usize) -> Vec<Particle> {
        // tight jittered cluster around `center`
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32 - 0.5;
                Particle::new(
                    [center[0] + t * 0.4, center[1] + t * 0.3, center[2] - t * 0.35],
                    i as i32,
                    0,
                )
            })
            .collect()
    }

    #[test]
    fn single_component_produces_a_surface() {
        let grid = RectilinearGrid::uniform([0.0; 3], [1.0; 3], [8, 8, 8]);
        let particles = cloud([4.0, 4.0, 4.0], 50);
        let labels = vec![0.0f32; particles.len()];
        let b = mesh_boundaries(&particles, &labels, &grid, grid.extent(), 0);
        assert!(!b.mesh.is_empty());
        assert_eq!(b.labels.len(), b.mesh.positions.len());
        assert!(b.labels.iter().all(|&l| l == 0));
        assert_eq!(b.mesh.normals.len(), b.mesh.positions.len());
    }

    #[test]
    fn two_components_get_disjoint_vertex_ranges() {
        let grid = RectilinearGrid::uniform([0.0; 3], [1.0; 3], [12, 8, 8]);
        let mut particles = cloud([3.0, 4.0, 4.0], 40);
        let more = cloud([9.0, 4.0, 4.0], 40);
        let n0 = particles.len();
        particles.extend(more);
        let labels: Vec<f32> = (0..particles.len())
            .map(|i| if i < n0 { 0.0 } else { 1.0 })
            .collect();
        let b = mesh_boundaries(&particles, &labels, &grid, grid.extent(), 1);
        assert_eq!(b.label_offsets.len(), 3);
        assert!(b.label_offsets[1] > 0);
        assert!(b.label_offsets[2] > b.label_offsets[1]);
        // label-0 vertices all sit on the low-x side
        for (i, p) in b.mesh.positions.iter().enumerate() {
            if i < b.label_offsets[1] {
                assert!(p[0] < 6.0);
            } else {
                assert!(p[0] > 6.0);
            }
        }
    }

    #[test]
    fn no_particles_no_mesh() {
        let grid = RectilinearGrid::uniform([0.0; 3], [1.0; 3], [4, 4, 4]);
        let b = mesh_boundaries(&[], &[], &grid, grid.extent(), 0);
        assert!(b.mesh.is_empty());
        assert!(b.labels.is_empty());
    }

    #[test]
    fn refined_subgrid_coords_interpolate_parent_cells() {
        let coords = vec![0.0f32, 1.0, 2.0, 4.0];
        // cells 0..=2, r=2, subone=1: (2-0+2)*2-1 = 7 nodes
        let sub = generate_coords(&coords, 7, 1, 2, 0, 2);
        assert_eq!(sub, vec![0.0, 0.5, 1.0, 1.5, 2.0, 3.0, 4.0]);
    }
}
