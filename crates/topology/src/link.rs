//! Per-link state: elementary success probability and run flags.

use crate::ids::{Edge, LinkId, NodeId};

/// One elementary link between two nodes.
///
/// Endpoints are stored in canonical order (`a < b`). Several links may
/// connect the same node pair; together they form a bundle. The three run
/// flags track, for the current batch only: whether capacity was committed
/// (`reserved`), whether the elementary trial succeeded (`entangled`), and
/// whether each end was consumed by a swap attempt. A link end can be
/// consumed at most once per run.
#[derive(Debug, Clone)]
pub struct Link {
    id: LinkId,
    a: NodeId,
    b: NodeId,
    length: f64,
    pub(crate) p: f64,
    pub(crate) reserved: bool,
    pub(crate) entangled: bool,
    pub(crate) swapped_a: bool,
    pub(crate) swapped_b: bool,
}

impl Link {
    pub(crate) fn new(id: LinkId, a: NodeId, b: NodeId, length: f64, alpha: f64) -> Self {
        debug_assert!(a < b);
        Self {
            id,
            a,
            b,
            length,
            p: (-alpha * length).exp(),
            reserved: false,
            entangled: false,
            swapped_a: false,
            swapped_b: false,
        }
    }

    pub fn id(&self) -> LinkId {
        self.id
    }

    /// The canonical endpoint pair as an [`Edge`].
    pub fn edge(&self) -> Edge {
        Edge { a: self.a, b: self.b }
    }

    /// Physical length.
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Elementary success probability, `exp(-alpha * length)`.
    pub fn p(&self) -> f64 {
        self.p
    }

    pub fn reserved(&self) -> bool {
        self.reserved
    }

    /// Whether the elementary trial succeeded this run.
    pub fn entangled(&self) -> bool {
        self.entangled
    }

    /// Whether `n` is one of the endpoints.
    pub fn touches(&self, n: NodeId) -> bool {
        self.a == n || self.b == n
    }

    /// The endpoint that is not `n`.
    ///
    /// Returns `None` when `n` is not an endpoint.
    pub fn other_end(&self, n: NodeId) -> Option<NodeId> {
        if n == self.a {
            Some(self.b)
        } else if n == self.b {
            Some(self.a)
        } else {
            None
        }
    }

    /// Whether this link's end at `n` was consumed by a swap attempt.
    pub fn swapped_at(&self, n: NodeId) -> bool {
        (self.a == n && self.swapped_a) || (self.b == n && self.swapped_b)
    }

    /// Whether either end was consumed by a swap attempt.
    pub fn swapped(&self) -> bool {
        self.swapped_a || self.swapped_b
    }
}
