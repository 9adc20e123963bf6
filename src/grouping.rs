// 🔗 Union-Find Grouping - merge similarity pairs into groups
// Full union-find with path compression and union-by-rank: pairs that share
// a member land in one group no matter what order the edges arrive in.
// The representative of every group is its smallest member index, so the
// resolved mapping is deterministic for a fixed vocabulary order.

use crate::similarity::SimilarityEdge;

pub struct GroupAssignment {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl GroupAssignment {
    /// One singleton group per vocabulary index.
    pub fn new(size: usize) -> Self {
        GroupAssignment {
            parent: (0..size).collect(),
            rank: vec![0; size],
        }
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    fn find(&mut self, mut item: usize) -> usize {
        while self.parent[item] != item {
            // Path halving keeps lookups near-constant over long chains
            self.parent[item] = self.parent[self.parent[item]];
            item = self.parent[item];
        }
        item
    }

    /// Merge the groups of `a` and `b`. Replaying an identical edge
    /// sequence is idempotent.
    pub fn add_pair(&mut self, a: usize, b: usize) {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a == root_b {
            return;
        }
        if self.rank[root_a] < self.rank[root_b] {
            self.parent[root_a] = root_b;
        } else if self.rank[root_a] > self.rank[root_b] {
            self.parent[root_b] = root_a;
        } else {
            self.parent[root_b] = root_a;
            self.rank[root_a] += 1;
        }
    }

    pub fn add_edges(&mut self, edges: &[SimilarityEdge]) {
        for edge in edges {
            self.add_pair(edge.left, edge.right);
        }
    }

    pub fn same_group(&mut self, a: usize, b: usize) -> bool {
        self.find(a) == self.find(b)
    }

    /// Final mapping from every index to its group representative: the
    /// smallest index in the group. Indices with no edges map to
    /// themselves.
    pub fn resolve(&mut self) -> Vec<usize> {
        let size = self.parent.len();
        let mut smallest = vec![usize::MAX; size];
        let mut roots = vec![0usize; size];
        for item in 0..size {
            let root = self.find(item);
            roots[item] = root;
            if smallest[root] == usize::MAX {
                // First visit in index order is the smallest member
                smallest[root] = item;
            }
        }
        roots.into_iter().map(|root| smallest[root]).collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================
