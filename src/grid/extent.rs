//! Structured-grid index spaces.
//!
//! `Extent` is an inclusive node-index box `[xmin..xmax, ymin..ymax,
//! zmin..zmax]`; neighboring subdomains overlap by `2*ghost+1` node indices
//! along the shared axis. `Halo` computes, once, the exterior cell slabs a
//! rank exchanges with each of its six logical sides, replacing the
//! per-side index arithmetic the labeling and seeding stages both need.

use serde::{Deserialize, Serialize};

/// One of the six logical faces of an axis-aligned subdomain.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    XLo,
    XHi,
    YLo,
    YHi,
    ZLo,
    ZHi,
}

/// All sides, in the `axis*2 + high` order the exchange code indexes by.
pub const SIDES: [Side; 6] = [
    Side::XLo,
    Side::XHi,
    Side::YLo,
    Side::YHi,
    Side::ZLo,
    Side::ZHi,
];

impl Side {
    #[inline]
    pub fn axis(self) -> usize {
        match self {
            Side::XLo | Side::XHi => 0,
            Side::YLo | Side::YHi => 1,
            Side::ZLo | Side::ZHi => 2,
        }
    }

    #[inline]
    pub fn is_high(self) -> bool {
        matches!(self, Side::XHi | Side::YHi | Side::ZHi)
    }

    #[inline]
    pub fn index(self) -> usize {
        self.axis() * 2 + self.is_high() as usize
    }
}

/// Inclusive node-index extent of a rectilinear (sub)grid.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extent {
    pub min: [i32; 3],
    pub max: [i32; 3],
}

impl Extent {
    pub fn new(min: [i32; 3], max: [i32; 3]) -> Self {
        Self { min, max }
    }

    /// Builds from the flat `[xmin,xmax,ymin,ymax,zmin,zmax]` layout used on
    /// the wire.
    pub fn from_flat(e: [i32; 6]) -> Self {
        Self {
            min: [e[0], e[2], e[4]],
            max: [e[1], e[3], e[5]],
        }
    }

    pub fn to_flat(self) -> [i32; 6] {
        [
            self.min[0], self.max[0], self.min[1], self.max[1], self.min[2], self.max[2],
        ]
    }

    /// Node resolution per axis.
    pub fn node_res(self) -> [usize; 3] {
        [
            (self.max[0] - self.min[0] + 1) as usize,
            (self.max[1] - self.min[1] + 1) as usize,
            (self.max[2] - self.min[2] + 1) as usize,
        ]
    }

    /// Cell resolution per axis (nodes minus one).
    pub fn cell_res(self) -> [usize; 3] {
        let n = self.node_res();
        [n[0] - 1, n[1] - 1, n[2] - 1]
    }

    /// Smallest extent covering both operands.
    pub fn union(self, other: Extent) -> Extent {
        let mut out = self;
        for a in 0..3 {
            out.min[a] = out.min[a].min(other.min[a]);
            out.max[a] = out.max[a].max(other.max[a]);
        }
        out
    }

    /// Smallest extent covering every contribution of an all-gather; the
    /// empty gather collapses to a zero extent.
    pub fn global(all: &[Extent]) -> Extent {
        all.iter()
            .copied()
            .reduce(Extent::union)
            .unwrap_or(Extent::new([0; 3], [0; 3]))
    }

    /// Shrinks by the ghost depth on every side that does not touch the
    /// global domain boundary.
    pub fn without_ghosts(self, global: Extent, ghost: i32) -> Extent {
        let mut out = self;
        for a in 0..3 {
            if out.min[a] > global.min[a] {
                out.min[a] += ghost;
            }
            if out.max[a] < global.max[a] {
                out.max[a] -= ghost;
            }
        }
        out
    }

    /// True when the two extents overlap on `axis` (inclusive).
    #[inline]
    pub fn overlaps_on(self, other: Extent, axis: usize) -> bool {
        self.min[axis] <= other.max[axis] && self.max[axis] >= other.min[axis]
    }

    /// True when `point` (node index triple) falls inside the extent.
    #[inline]
    pub fn contains(self, p: [i32; 3]) -> bool {
        (0..3).all(|a| p[a] >= self.min[a] && p[a] <= self.max[a])
    }
}

/// Per-rank neighbor table: the ranks adjacent to each of the six sides.
///
/// A rank `j` is a neighbor on a low side when its extent ends exactly where
/// ours begins on that axis and the two extents overlap on the orthogonal
/// axes; symmetrically for high sides. Built from the all-gathered
/// ghost-free extents.
pub fn find_neighbors(
    local: Extent,
    global: Extent,
    all: &[Extent],
    rank: usize,
) -> [Vec<usize>; 6] {
    let mut neighbors: [Vec<usize>; 6] = Default::default();
    for axis in 0..3 {
        let (o1, o2) = ((axis + 1) % 3, (axis + 2) % 3);
        if local.min[axis] > global.min[axis] {
            for (j, other) in all.iter().enumerate() {
                if j == rank {
                    continue;
                }
                if local.min[axis] <= other.max[axis]
                    && local.max[axis] > other.max[axis]
                    && local.overlaps_on(*other, o1)
                    && local.overlaps_on(*other, o2)
                {
                    neighbors[axis * 2].push(j);
                }
            }
        }
        if local.max[axis] < global.max[axis] {
            for (j, other) in all.iter().enumerate() {
                if j == rank {
                    continue;
                }
                if local.max[axis] >= other.min[axis]
                    && local.min[axis] < other.min[axis]
                    && local.overlaps_on(*other, o1)
                    && local.overlaps_on(*other, o2)
                {
                    neighbors[axis * 2 + 1].push(j);
                }
            }
        }
    }
    neighbors
}

/// Exterior cell slabs of a ghost-padded subgrid, one per side, in local
/// cell indices (inclusive `[lo, hi]` per axis).
#[derive(Clone, Debug)]
pub struct Halo {
    slabs: [[i32; 6]; 6],
}

impl Halo {
    /// Computes the six boundary slabs for a subgrid with `cell_res` cells.
    ///
    /// On sides interior to the global domain the slab is `ghost + 1` cells
    /// thick (the ghost layer plus the first owned layer); on sides flush
    /// with the global boundary it collapses to the outermost two cell
    /// layers.
    pub fn new(cell_res: [usize; 3], extent: Extent, global: Extent, ghost: i32) -> Self {
        let res = [cell_res[0] as i32, cell_res[1] as i32, cell_res[2] as i32];
        let full = |axis: usize| (0, res[axis] - 1);
        let mut slabs = [[0i32; 6]; 6];
        for side in SIDES {
            let a = side.axis();
            let (lo, hi) = if side.is_high() {
                if extent.max[a] == global.max[a] {
                    (res[a] - 2, res[a] - 1)
                } else {
                    (res[a] - 1 - ghost, res[a] - 1)
                }
            } else if extent.min[a] == global.min[a] {
                (0, 1)
            } else {
                (0, ghost)
            };
            let mut slab = [0i32; 6];
            for axis in 0..3 {
                let (l, h) = if axis == a { (lo, hi) } else { full(axis) };
                slab[axis * 2] = l;
                slab[axis * 2 + 1] = h;
            }
            slabs[side.index()] = slab;
        }
        Self { slabs }
    }

    /// Inclusive local cell-index range `[xlo,xhi,ylo,yhi,zlo,zhi]` of the
    /// slab on `side`.
    #[inline]
    pub fn slab(&self, side: Side) -> [i32; 6] {
        self.slabs[side.index()]
    }

    /// Iterates the local cell indices of the slab on `side`.
    pub fn cells(&self, side: Side) -> impl Iterator<Item = [i32; 3]> + '_ {
        let s = self.slab(side);
        (s[4]..=s[5]).flat_map(move |k| {
            (s[2]..=s[3]).flat_map(move |j| (s[0]..=s[1]).map(move |i| [i, j, k]))
        })
    }
}
