//! # Disjoint Set Union over Cluster IDs
//!
//! Union-find forest indexed by [`ClusterId`]. Cluster ids are handed out in
//! increasing order and a root is only ever attached under a root with an
//! equal or larger id, so parent pointers strictly increase along any path and
//! the forest cannot contain a cycle. That ordering stands in for rank or size
//! bookkeeping.

use crate::error::ClusterError;
use crate::model::ClusterId;

#[derive(Debug, Clone, Default)]
pub struct ClusterForest {
    /// `parent[c] == c` marks a root
    parent: Vec<u32>,
    /// Current number of roots
    root_count: usize,
}

impl ClusterForest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            parent: Vec::with_capacity(capacity),
            root_count: 0,
        }
    }

    /// Allocate the next cluster id as a fresh singleton root.
    ///
    /// At most `u32::MAX` ids fit; the linker bounds allocations by its capacity.
    #[inline]
    pub fn make_set(&mut self) -> ClusterId {
        debug_assert!(self.parent.len() < u32::MAX as usize);
        let id = self.parent.len() as u32;
        self.parent.push(id);
        self.root_count += 1;
        ClusterId(id)
    }

    /// Number of cluster ids allocated so far.
    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Number of disjoint sets.
    pub fn num_roots(&self) -> usize {
        self.root_count
    }

    #[inline]
    pub fn is_root(&self, cluster: ClusterId) -> bool {
        self.parent[cluster.index()] == cluster.0
    }

    /// Find the root of `cluster`, pointing every node on the path directly at it.
    #[inline]
    pub fn find(&mut self, cluster: ClusterId) -> ClusterId {
        let mut root = cluster.0;
        while self.parent[root as usize] != root {
            root = self.parent[root as usize];
        }

        let mut current = cluster.0;
        while self.parent[current as usize] != root {
            let next = self.parent[current as usize];
            self.parent[current as usize] = root;
            current = next;
        }

        ClusterId(root)
    }

    /// Attach root `child` under root `parent`.
    ///
    /// `child` must not be newer than `parent`; the reverse would break the
    /// upward-only ordering and is reported as [`ClusterError::InvertedUnion`].
    pub fn attach(&mut self, child: ClusterId, parent: ClusterId) -> Result<(), ClusterError> {
        if child == parent {
            return Ok(());
        }
        if child > parent {
            tracing::error!(
                child = child.0,
                parent = parent.0,
                "cluster id ordering violated, aborting"
            );
            return Err(ClusterError::InvertedUnion { child, parent });
        }
        debug_assert!(self.is_root(child) && self.is_root(parent));

        self.parent[child.index()] = parent.0;
        self.root_count = self.root_count.saturating_sub(1);
        tracing::trace!(child = child.0, parent = parent.0, "attached cluster");
        Ok(())
    }

    /// Merge the sets containing `a` and `b`; the smaller root goes under the larger.
    ///
    /// Returns the surviving root.
    pub fn union(&mut self, a: ClusterId, b: ClusterId) -> ClusterId {
        let root_a = self.find(a);
        let root_b = self.find(b);
        self.link_roots(root_a, root_b)
    }

    /// Merge two sets given their current roots, the smaller under the larger.
    ///
    /// Returns the surviving root. Both arguments must be roots.
    pub fn link_roots(&mut self, root_a: ClusterId, root_b: ClusterId) -> ClusterId {
        debug_assert!(self.is_root(root_a) && self.is_root(root_b));
        if root_a == root_b {
            return root_a;
        }

        let (lesser, greater) = if root_a < root_b {
            (root_a, root_b)
        } else {
            (root_b, root_a)
        };
        self.parent[lesser.index()] = greater.0;
        self.root_count = self.root_count.saturating_sub(1);
        greater
    }

    pub fn same_set(&mut self, a: ClusterId, b: ClusterId) -> bool {
        self.find(a) == self.find(b)
    }

    /// Point every allocated id directly at its root.
    ///
    /// Afterwards [`Self::resolved`] answers root queries without mutation.
    pub fn compress_all(&mut self) {
        for id in 0..self.parent.len() as u32 {
            let root = self.find(ClusterId(id));
            self.parent[id as usize] = root.0;
        }
    }

    /// Raw parent pointers, indexed by cluster id.
    pub fn parents(&self) -> &[u32] {
        &self.parent
    }

    /// Root of `cluster` as of the last [`Self::compress_all`].
    #[inline]
    pub fn resolved(&self, cluster: ClusterId) -> ClusterId {
        ClusterId(self.parent[cluster.index()])
    }
}
