//! Weighted union-find over a dense id space.

/// Disjoint-set forest with union by size and path halving.
#[derive(Clone, Debug)]
pub struct DisjointSet {
    parent: Vec<u32>,
    size: Vec<u32>,
}

impl DisjointSet {
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n as u32).collect(),
            size: vec![1; n],
        }
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    pub fn find(&mut self, mut x: u32) -> u32 {
        while self.parent[x as usize] != x {
            self.parent[x as usize] = self.parent[self.parent[x as usize] as usize];
            x = self.parent[x as usize];
        }
        x
    }

    pub fn union(&mut self, a: u32, b: u32) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return;
        }
        if self.size[ra as usize] < self.size[rb as usize] {
            self.parent[ra as usize] = rb;
            self.size[rb as usize] += self.size[ra as usize];
        } else {
            self.parent[rb as usize] = ra;
            self.size[ra as usize] += self.size[rb as usize];
        }
    }

    /// Fully-compressed parent array; `parents[i]` is the root of `i`.
    pub fn parents(&mut self) -> Vec<u32> {
        (0..self.len() as u32).map(|i| self.find(i)).collect()
    }

    /// Maps every root to a dense ordinal and returns the per-id remap
    /// together with the component count.
    pub fn compact(&mut self) -> (Vec<u32>, usize) {
        let n = self.len();
        let mut dense = vec![u32::MAX; n];
        let mut next = 0u32;
        let remap = (0..n as u32)
            .map(|i| {
                let r = self.find(i) as usize;
                if dense[r] == u32::MAX {
                    dense[r] = next;
                    next += 1;
                }
                dense[r]
            })
            .collect();
        (remap, next as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_then_find() {
        let mut ds = DisjointSet::new(6);
        ds.union(0, 1);
        ds.union(2, 3);
        ds.union(1, 3);
        assert_eq!(ds.find(0), ds.find(3));
        assert_ne!(ds.find(0), ds.find(4));
    }

    #[test]
    fn compact_is_dense_and_order_preserving() {
        let mut ds = DisjointSet::new(5);
        ds.union(1, 4);
        let (remap, count) = ds.compact();
        assert_eq!(count, 4);
        assert_eq!(remap[1], remap[4]);
        // first occurrence order
        assert_eq!(remap[0], 0);
        assert_eq!(remap[1], 1);
        assert_eq!(remap[2], 2);
        assert_eq!(remap[3], 3);
    }

    #[test]
    fn larger_tree_absorbs_smaller() {
        let mut ds = DisjointSet::new(4);
        ds.union(0, 1);
        ds.union(0, 2);
        let root = ds.find(0);
        ds.union(3, 0);
        assert_eq!(ds.find(3), root);
    }
}
