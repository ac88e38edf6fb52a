#![deny(missing_docs)]

//! Core types shared by the constrained dyad sampler crates: the dyad
//! identifier, the error taxonomy, deterministic RNG handles and provenance
//! descriptors.

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod errors;
pub mod provenance;
pub mod rng;

pub use errors::{ErgmError, ErrorInfo};
pub use provenance::{RunProvenance, SchemaVersion};
pub use rng::{derive_substream_seed, RngHandle};

/// A potential edge between two nodes, identified by 0-based node indices.
///
/// For directed spaces `tail` is the sender and `head` the receiver. For
/// undirected spaces dyads are normalized by the owning dyad space so that
/// `tail <= head`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Dyad {
    /// Row of the dyad in the adjacency matrix.
    pub tail: usize,
    /// Column of the dyad in the adjacency matrix.
    pub head: usize,
}

impl Dyad {
    /// Creates a dyad from its endpoints without normalization.
    pub const fn new(tail: usize, head: usize) -> Self {
        Self { tail, head }
    }

    /// Returns the dyad with its endpoints swapped.
    pub const fn transposed(&self) -> Self {
        Self {
            tail: self.head,
            head: self.tail,
        }
    }

    /// Returns true when both endpoints are the same node.
    pub const fn is_loop(&self) -> bool {
        self.tail == self.head
    }
}

impl fmt::Display for Dyad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.tail, self.head)
    }
}

impl From<(usize, usize)> for Dyad {
    fn from((tail, head): (usize, usize)) -> Self {
        Self { tail, head }
    }
}
