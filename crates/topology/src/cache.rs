//! Content-hash-keyed cache for structural path queries.
//!
//! Hop distances and exhaustive route discovery are expensive and purely
//! structural: they depend only on the edge set, never on reservation or
//! trial flags. The cache is owned by the topology (never a global) and
//! keyed by a blake3 hash of the canonical edge list; any access under a
//! different edge-set hash clears it first.

use crate::ids::{Edge, Path};
use std::collections::HashMap;

/// Cached structural query results for one edge set.
#[derive(Debug, Default)]
pub struct RouteCache {
    edge_hash: [u8; 32],
    pub(crate) hops: HashMap<Edge, Option<usize>>,
    pub(crate) routes: HashMap<Edge, Vec<Path>>,
}

impl RouteCache {
    pub(crate) fn new(edge_hash: [u8; 32]) -> Self {
        Self {
            edge_hash,
            hops: HashMap::new(),
            routes: HashMap::new(),
        }
    }

    /// Drop every entry unless the cache already belongs to `edge_hash`.
    pub(crate) fn validate(&mut self, edge_hash: [u8; 32]) {
        if self.edge_hash != edge_hash {
            self.hops.clear();
            self.routes.clear();
            self.edge_hash = edge_hash;
        }
    }

    /// Number of cached entries, for diagnostics.
    pub fn len(&self) -> usize {
        self.hops.len() + self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hops.is_empty() && self.routes.is_empty()
    }
}
