#![deny(missing_docs)]

//! Dyad spaces, run-length encoded free dyad maps and the constraint builder.
//!
//! A [`DyadSpace`] fixes the topology and the canonical column-major cell
//! order. A [`FreeDyadMap`] marks which cells the sampler may toggle, and
//! [`ConstraintSet::compose`] folds the declared constraints into one map.

pub mod constraints;
mod hash;
mod network;
mod rle;
mod serialization;
mod space;

pub use constraints::{ConstraintKind, ConstraintSet, DegreeConstraint, IncidenceMatrix};
pub use ergm_core::Dyad;
pub use hash::{canonical_hash, network_hash};
pub use network::Network;
pub use rle::{FreeDyadMap, Run};
pub use serialization::{map_from_bytes, map_from_json, map_to_bytes, map_to_json};
pub use space::DyadSpace;
