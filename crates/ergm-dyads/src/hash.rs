use sha2::{Digest, Sha256};

use crate::network::Network;
use crate::rle::FreeDyadMap;
use crate::space::DyadSpace;

/// Canonical structural hash of a free dyad map.
///
/// The map is compressed first so equal free sets hash equally regardless of
/// how their runs were assembled.
pub fn canonical_hash(map: &FreeDyadMap) -> String {
    let mut hasher = Sha256::new();
    encode_space(map.space(), &mut hasher);
    let canonical = map.compress();
    hasher.update((canonical.runs().len() as u64).to_le_bytes());
    for run in canonical.runs() {
        hasher.update(run.len.to_le_bytes());
        hasher.update([u8::from(run.value)]);
    }
    format!("{:x}", hasher.finalize())
}

/// Canonical hash of a network's sorted edge list.
pub fn network_hash(network: &Network) -> String {
    let mut hasher = Sha256::new();
    encode_space(network.space(), &mut hasher);
    let edges = network.edge_list();
    hasher.update((edges.len() as u64).to_le_bytes());
    for edge in edges {
        hasher.update((edge.tail as u64).to_le_bytes());
        hasher.update((edge.head as u64).to_le_bytes());
    }
    format!("{:x}", hasher.finalize())
}

fn encode_space(space: &DyadSpace, hasher: &mut Sha256) {
    hasher.update((space.n() as u64).to_le_bytes());
    hasher.update(if space.is_directed() {
        b"directed".as_slice()
    } else {
        b"undirected".as_slice()
    });
    match space.b1() {
        Some(b1) => {
            hasher.update(b"bipartite:some");
            hasher.update((b1 as u64).to_le_bytes());
        }
        None => hasher.update(b"bipartite:none"),
    }
    hasher.update([u8::from(space.has_loops())]);
}
