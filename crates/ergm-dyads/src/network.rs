use ergm_core::errors::{ErgmError, ErrorInfo};
use ergm_core::{Dyad, RngHandle};
use indexmap::IndexSet;

use crate::space::DyadSpace;

/// In-memory edge list over a [`DyadSpace`], with cached degrees.
///
/// Edges are kept in an insertion-ordered set so a uniformly random edge can
/// be drawn in constant time; removal swaps the last edge into the hole.
#[derive(Debug, Clone)]
pub struct Network {
    space: DyadSpace,
    edges: IndexSet<Dyad>,
    out_degree: Vec<u32>,
    in_degree: Vec<u32>,
}

impl Network {
    /// Empty network over `space`.
    pub fn empty(space: DyadSpace) -> Self {
        Self {
            space,
            edges: IndexSet::new(),
            out_degree: vec![0; space.n()],
            in_degree: vec![0; space.n()],
        }
    }

    /// Builds a network from an edge list, normalizing undirected pairs.
    pub fn from_edges(space: DyadSpace, edges: &[Dyad]) -> Result<Self, ErgmError> {
        let mut network = Self::empty(space);
        for edge in edges {
            let dyad = space.dyad(edge.tail, edge.head)?;
            if network.has_edge(dyad) {
                return Err(ErgmError::Config(
                    ErrorInfo::new("duplicate-edge", "edge listed more than once")
                        .with_context("dyad", dyad),
                ));
            }
            network.toggle(dyad);
        }
        Ok(network)
    }

    /// Dyad space of the network.
    pub fn space(&self) -> &DyadSpace {
        &self.space
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Whether the (normalized) dyad is an edge.
    pub fn has_edge(&self, dyad: Dyad) -> bool {
        self.edges.contains(&dyad)
    }

    /// Out-degree of a node (its simple degree on undirected spaces is
    /// `out_degree + in_degree`).
    pub fn out_degree(&self, node: usize) -> u32 {
        self.out_degree[node]
    }

    /// In-degree of a node.
    pub fn in_degree(&self, node: usize) -> u32 {
        self.in_degree[node]
    }

    /// Degree used by degree bounds: out-degree when directed, simple degree otherwise.
    pub fn degree(&self, node: usize) -> u32 {
        if self.space.is_directed() {
            self.out_degree[node]
        } else {
            self.out_degree[node] + self.in_degree[node]
        }
    }

    /// Flips the state of a normalized dyad. Returns the new state.
    pub fn toggle(&mut self, dyad: Dyad) -> bool {
        if self.edges.swap_remove(&dyad) {
            self.out_degree[dyad.tail] -= 1;
            self.in_degree[dyad.head] -= 1;
            false
        } else {
            self.edges.insert(dyad);
            self.out_degree[dyad.tail] += 1;
            self.in_degree[dyad.head] += 1;
            true
        }
    }

    /// Uniformly random edge, or `None` for an empty network.
    pub fn random_edge(&self, rng: &mut RngHandle) -> Option<Dyad> {
        if self.edges.is_empty() {
            return None;
        }
        let index = rng.below(self.edges.len() as u64) as usize;
        self.edges.get_index(index).copied()
    }

    /// Iterates edges in internal order.
    pub fn edges(&self) -> impl Iterator<Item = &Dyad> + '_ {
        self.edges.iter()
    }

    /// Sorted edge list.
    pub fn edge_list(&self) -> Vec<Dyad> {
        let mut edges: Vec<Dyad> = self.edges.iter().copied().collect();
        edges.sort();
        edges
    }
}
