//! Marching-cubes surface extraction over a node-centered density field.

use std::collections::HashMap;

use super::tables::{case_vertex_count, EDGE_TABLE, TRI_TABLE};
use crate::grid::sampler::interpolate_scalar_node;
use crate::math::{lerp3, normalize3, scale3};

/// Cube edges as (corner, corner) pairs, table edge ordinal order.
const EDGE_NODES: [(usize, usize); 12] = [
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 0),
    (4, 5),
    (5, 6),
    (6, 7),
    (7, 4),
    (0, 4),
    (1, 5),
    (2, 6),
    (3, 7),
];

/// Indexed triangle soup with per-vertex normals.
#[derive(Clone, Debug, Default)]
pub struct TriangleMesh {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

impl TriangleMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Interpolates the iso crossing on one cube edge.
///
/// Evaluated symmetrically (always from the lower field value) so shared
/// edges of adjacent cubes produce bit-identical vertices, which the merge
/// below relies on. `t` is kept off the endpoints.
fn vertex_interp(iso: f32, p0: [f32; 3], p1: [f32; 3], f0: f32, f1: f32) -> [f32; 3] {
    let mut t = if f1 != f0 {
        if f1 > f0 {
            (iso - f0) / (f1 - f0)
        } else {
            1.0 - (iso - f1) / (f0 - f1)
        }
    } else {
        0.5
    };
    t = t.clamp(0.001, 0.999);
    lerp3(p0, p1, t)
}

#[inline]
fn key(p: [f32; 3]) -> [u32; 3] {
    [p[0].to_bits(), p[1].to_bits(), p[2].to_bits()]
}

/// Runs marching cubes over the node field and appends the triangles to
/// `mesh`, deduplicating vertices by exact position.
///
/// `node_extent` restricts the cube sweep (inclusive node indices); cubes
/// span nodes `i-1..=i`, so the sweep starts one node in.
pub fn extract_surface(
    field: &[f32],
    node_res: [usize; 3],
    coords: &[Vec<f32>; 3],
    node_extent: [i32; 6],
    iso: f32,
    mesh: &mut TriangleMesh,
) {
    let mut merged: HashMap<[u32; 3], u32> = HashMap::new();
    let row = node_res[0];
    let slab = node_res[0] * node_res[1];

    let k_range = (node_extent[4] + 1).max(1)..=node_extent[5].min(node_res[2] as i32 - 1);
    for k in k_range {
        let (k, km) = (k as usize, k as usize - 1);
        let j_range = (node_extent[2] + 1).max(1)..=node_extent[3].min(node_res[1] as i32 - 1);
        for j in j_range {
            let (j, jm) = (j as usize, j as usize - 1);
            let i_range = (node_extent[0] + 1).max(1)..=node_extent[1].min(node_res[0] as i32 - 1);
            for i in i_range {
                let (i, im) = (i as usize, i as usize - 1);

                let ids = [
                    im + jm * row + km * slab,
                    i + jm * row + km * slab,
                    i + j * row + km * slab,
                    im + j * row + km * slab,
                    im + jm * row + k * slab,
                    i + jm * row + k * slab,
                    i + j * row + k * slab,
                    im + j * row + k * slab,
                ];
                let f = ids.map(|id| field[id]);

                let mut case = 0usize;
                for (n, &fv) in f.iter().enumerate() {
                    if fv < iso {
                        case |= 1 << n;
                    }
                }
                let num_verts = case_vertex_count(case);
                if num_verts == 0 {
                    continue;
                }

                let (x0, x1) = (coords[0][im], coords[0][i]);
                let (y0, y1) = (coords[1][jm], coords[1][j]);
                let (z0, z1) = (coords[2][km], coords[2][k]);
                let v = [
                    [x0, y0, z0],
                    [x1, y0, z0],
                    [x1, y1, z0],
                    [x0, y1, z0],
                    [x0, y0, z1],
                    [x1, y0, z1],
                    [x1, y1, z1],
                    [x0, y1, z1],
                ];

                let cut = EDGE_TABLE[case];
                let mut vertlist = [[0f32; 3]; 12];
                for (e, &(a, b)) in EDGE_NODES.iter().enumerate() {
                    if cut & (1 << e) != 0 {
                        vertlist[e] = vertex_interp(iso, v[a], v[b], f[a], f[b]);
                    }
                }

                for &edge in TRI_TABLE[case].iter().take(num_verts) {
                    let vert = vertlist[edge as usize];
                    let next = mesh.positions.len() as u32;
                    let id = *merged.entry(key(vert)).or_insert_with(|| {
                        mesh.positions.push(vert);
                        next
                    });
                    mesh.indices.push(id);
                }
            }
        }
    }
}

/// Locates `p` on a node-coordinate axis: containing cell plus parametric
/// offset, clamped into the grid.
fn locate_node_axis(coords: &[f32], x: f32) -> (i32, f64) {
    let cells = coords.len() - 1;
    let mut c = match coords.partition_point(|&v| v <= x) {
        0 => 0,
        n => n - 1,
    };
    if c >= cells {
        c = cells - 1;
    }
    let lo = coords[c];
    let hi = coords[c + 1];
    let t = if hi > lo {
        ((x - lo) / (hi - lo)).clamp(0.0, 1.0) as f64
    } else {
        0.0
    };
    (c as i32, t)
}

/// Appends a density-gradient normal for every vertex from `from` on.
///
/// Central difference of the node field one node out per axis, flipped to
/// point out of the dense region.
pub fn vertex_normals(
    field: &[f32],
    node_res: [usize; 3],
    coords: &[Vec<f32>; 3],
    mesh: &mut TriangleMesh,
    from: usize,
) {
    for vi in from..mesh.positions.len() {
        let p = mesh.positions[vi];
        let mut ijk = [0i32; 3];
        let mut pcoords = [0f64; 3];
        for a in 0..3 {
            let (c, t) = locate_node_axis(&coords[a], p[a]);
            ijk[a] = c;
            pcoords[a] = t;
        }
        let sample = |d: [i32; 3]| {
            let at = [ijk[0] + d[0], ijk[1] + d[1], ijk[2] + d[2]];
            interpolate_scalar_node(field, node_res, at, pcoords)
        };
        let diff = [
            sample([1, 0, 0]) - sample([-1, 0, 0]),
            sample([0, 1, 0]) - sample([0, -1, 0]),
            sample([0, 0, 1]) - sample([0, 0, -1]),
        ];
        mesh.normals.push(scale3(normalize3(diff), -1.0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn unit_coords(n: usize) -> Vec<f32> {
        (0..n).map(|i| i as f32).collect()
    }

    fn extract_on(field: &[f32], res: [usize; 3]) -> TriangleMesh {
        let coords = [
            unit_coords(res[0]),
            unit_coords(res[1]),
            unit_coords(res[2]),
        ];
        let full = [
            0,
            res[0] as i32 - 1,
            0,
            res[1] as i32 - 1,
            0,
            res[2] as i32 - 1,
        ];
        let mut mesh = TriangleMesh::new();
        extract_surface(field, res, &coords, full, 0.501, &mut mesh);
        vertex_normals(field, res, &coords, &mut mesh, 0);
        mesh
    }

    #[test]
    fn uniform_field_yields_no_surface() {
        let mesh = extract_on(&vec![1.0; 27], [3, 3, 3]);
        assert!(mesh.is_empty());
        let mesh = extract_on(&vec![0.0; 27], [3, 3, 3]);
        assert!(mesh.is_empty());
    }

    #[test]
    fn single_hot_node_yields_closed_fan() {
        // one interior node above iso in a 3x3x3 node grid
        let mut field = vec![0.0f32; 27];
        field[1 + 3 + 9] = 1.0;
        let mesh = extract_on(&field, [3, 3, 3]);
        assert!(!mesh.is_empty());
        // closed surface: every edge shared by exactly two triangles
        let mut edges: HashMap<(u32, u32), usize> = HashMap::new();
        for t in mesh.indices.chunks_exact(3) {
            for &(a, b) in &[(t[0], t[1]), (t[1], t[2]), (t[2], t[0])] {
                let e = (a.min(b), a.max(b));
                *edges.entry(e).or_default() += 1;
            }
        }
        assert!(edges.values().all(|&c| c == 2));
    }

    #[test]
    fn shared_edge_vertices_are_merged() {
        let mut field = vec![0.0f32; 27];
        field[1 + 3 + 9] = 1.0;
        let mesh = extract_on(&field, [3, 3, 3]);
        // the hot-node fan is an octahedron: 6 unique vertices, 8 triangles
        assert_eq!(mesh.positions.len(), 6);
        assert_eq!(mesh.triangle_count(), 8);
        assert_eq!(mesh.normals.len(), mesh.positions.len());
    }

    #[test]
    fn normals_point_away_from_the_dense_side() {
        // dense bottom half of a 3x3x3 node grid
        let mut field = vec![0.0f32; 27];
        for idx in 0..9 {
            field[idx] = 1.0;
        }
        let mesh = extract_on(&field, [3, 3, 3]);
        assert!(!mesh.is_empty());
        assert!(mesh.normals.iter().all(|n| n[2] > 0.9));
    }

    #[test]
    fn extent_trim_drops_outside_cubes() {
        let mut field = vec![0.0f32; 5 * 3 * 3];
        // hot nodes near both x ends
        field[1 + 5 + 15] = 1.0;
        field[3 + 5 + 15] = 1.0;
        let coords = [unit_coords(5), unit_coords(3), unit_coords(3)];
        let mut mesh = TriangleMesh::new();
        // only the low-x half
        extract_surface(&field, [5, 3, 3], &coords, [0, 2, 0, 2, 0, 2], 0.501, &mut mesh);
        assert!(!mesh.is_empty());
        assert!(mesh.positions.iter().all(|p| p[0] <= 2.0));
    }
}
