use ergm_core::errors::{ErgmError, ErrorInfo};
use ergm_core::Dyad;
use serde::{Deserialize, Serialize};

use crate::rle::Run;

/// Topology of the dyad space sampled by a chain.
///
/// Every run-length structure in this crate enumerates the `n x n` adjacency
/// matrix in column-major order: the cell of dyad `(tail, head)` has linear
/// index `head * n + tail`. Cells that are not dyads under the topology (the
/// diagonal without loops, the lower triangle of undirected spaces, cells
/// inside one partition of a bipartite space) are FALSE in the baseline map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DyadSpace {
    n: usize,
    directed: bool,
    bipartite: Option<usize>,
    loops: bool,
}

impl DyadSpace {
    /// Creates a validated dyad space.
    ///
    /// `bipartite` is the size `b1` of the first partition; the second
    /// partition holds the remaining `n - b1` nodes.
    pub fn new(
        n: usize,
        directed: bool,
        bipartite: Option<usize>,
        loops: bool,
    ) -> Result<Self, ErgmError> {
        if let Some(b1) = bipartite {
            if b1 > n {
                return Err(ErgmError::DimensionMismatch(
                    ErrorInfo::new("bipartite-size", "first partition is larger than the network")
                        .with_context("n", n)
                        .with_context("b1", b1),
                ));
            }
            if loops {
                return Err(ErgmError::InvalidTopology(
                    ErrorInfo::new("bipartite-loops", "bipartite spaces cannot contain loops")
                        .with_context("b1", b1),
                ));
            }
        }
        Ok(Self {
            n,
            directed,
            bipartite,
            loops,
        })
    }

    /// Directed space without self-loops.
    pub fn directed(n: usize) -> Self {
        Self {
            n,
            directed: true,
            bipartite: None,
            loops: false,
        }
    }

    /// Undirected space without self-loops.
    pub fn undirected(n: usize) -> Self {
        Self {
            n,
            directed: false,
            bipartite: None,
            loops: false,
        }
    }

    /// Bipartite space with partitions of size `b1` and `n - b1`.
    pub fn bipartite(n: usize, b1: usize, directed: bool) -> Result<Self, ErgmError> {
        Self::new(n, directed, Some(b1), false)
    }

    /// Number of nodes.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Whether dyads are ordered pairs.
    pub fn is_directed(&self) -> bool {
        self.directed
    }

    /// Size of the first partition, if the space is bipartite.
    pub fn b1(&self) -> Option<usize> {
        self.bipartite
    }

    /// Whether self-loops are dyads.
    pub fn has_loops(&self) -> bool {
        self.loops
    }

    /// Number of matrix cells enumerated by run-length structures (`n^2`).
    pub fn cell_count(&self) -> u64 {
        (self.n as u64) * (self.n as u64)
    }

    /// Closed-form number of dyads for the topology.
    pub fn dyad_count(&self) -> u64 {
        let n = self.n as u64;
        match (self.bipartite, self.directed, self.loops) {
            (Some(b1), directed, _) => {
                let cross = b1 as u64 * (n - b1 as u64);
                if directed {
                    2 * cross
                } else {
                    cross
                }
            }
            (None, true, true) => n * n,
            (None, true, false) => n * n.saturating_sub(1),
            (None, false, true) => n * (n + 1) / 2,
            (None, false, false) => n * n.saturating_sub(1) / 2,
        }
    }

    fn in_first(&self, node: usize) -> bool {
        self.bipartite.map_or(false, |b1| node < b1)
    }

    /// Returns true when `(tail, head)`, taken literally, is a baseline cell.
    pub fn is_dyad(&self, tail: usize, head: usize) -> bool {
        if tail >= self.n || head >= self.n {
            return false;
        }
        if tail == head {
            return self.loops && self.bipartite.is_none();
        }
        match self.bipartite {
            Some(_) => {
                let crosses = self.in_first(tail) != self.in_first(head);
                crosses && (self.directed || self.in_first(tail))
            }
            None => self.directed || tail < head,
        }
    }

    /// Normalizes `(tail, head)` into the dyad stored by this space.
    ///
    /// Undirected dyads are flipped into the upper triangle (or, for bipartite
    /// spaces, so that the tail lies in the first partition).
    pub fn dyad(&self, tail: usize, head: usize) -> Result<Dyad, ErgmError> {
        if tail >= self.n || head >= self.n {
            return Err(ErgmError::DimensionMismatch(
                ErrorInfo::new("node-range", "dyad endpoint outside the node range")
                    .with_context("tail", tail)
                    .with_context("head", head)
                    .with_context("n", self.n),
            ));
        }
        let candidate = if !self.directed && !self.is_dyad(tail, head) {
            Dyad::new(head, tail)
        } else {
            Dyad::new(tail, head)
        };
        if !self.is_dyad(candidate.tail, candidate.head) {
            return Err(ErgmError::InvalidTopology(
                ErrorInfo::new("not-a-dyad", "pair is not a dyad of this space")
                    .with_context("tail", tail)
                    .with_context("head", head)
                    .with_context("directed", self.directed)
                    .with_context("loops", self.loops),
            ));
        }
        Ok(candidate)
    }

    /// Linear cell index of a dyad in column-major order.
    pub fn cell_index(&self, dyad: Dyad) -> u64 {
        dyad.head as u64 * self.n as u64 + dyad.tail as u64
    }

    /// Decodes a linear cell index back into its dyad.
    pub fn decode(&self, cell: u64) -> Dyad {
        let n = self.n as u64;
        Dyad::new((cell % n) as usize, (cell / n) as usize)
    }

    /// Runs of the baseline map, one column at a time, before compression.
    pub fn baseline_runs(&self) -> Vec<Run> {
        let n = self.n as u64;
        let mut runs = Vec::with_capacity(self.n * 3);
        for head in 0..self.n {
            let j = head as u64;
            match self.bipartite {
                Some(b1) => {
                    let b1 = b1 as u64;
                    if j < b1 {
                        if self.directed {
                            push_run(&mut runs, b1, false);
                            push_run(&mut runs, n - b1, true);
                        } else {
                            push_run(&mut runs, n, false);
                        }
                    } else {
                        push_run(&mut runs, b1, true);
                        push_run(&mut runs, n - b1, false);
                    }
                }
                None if self.directed => {
                    if self.loops {
                        push_run(&mut runs, n, true);
                    } else {
                        push_run(&mut runs, j, true);
                        push_run(&mut runs, 1, false);
                        push_run(&mut runs, n - j - 1, true);
                    }
                }
                None => {
                    let upper = if self.loops { j + 1 } else { j };
                    push_run(&mut runs, upper, true);
                    push_run(&mut runs, n - upper, false);
                }
            }
        }
        runs
    }
}

fn push_run(runs: &mut Vec<Run>, len: u64, value: bool) {
    if len > 0 {
        runs.push(Run::new(len, value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn true_cells(space: &DyadSpace) -> u64 {
        space
            .baseline_runs()
            .iter()
            .filter(|run| run.value)
            .map(|run| run.len)
            .sum()
    }

    #[test]
    fn baseline_counts_match_closed_forms() {
        let cases = [
            DyadSpace::new(5, true, None, true).unwrap(),
            DyadSpace::directed(5),
            DyadSpace::undirected(5),
            DyadSpace::new(5, false, None, true).unwrap(),
            DyadSpace::bipartite(5, 2, false).unwrap(),
            DyadSpace::bipartite(5, 2, true).unwrap(),
        ];
        let expected = [25, 20, 10, 15, 6, 12];
        for (space, want) in cases.iter().zip(expected) {
            assert_eq!(space.dyad_count(), want, "{space:?}");
            assert_eq!(true_cells(space), want, "{space:?}");
            let total: u64 = space.baseline_runs().iter().map(|run| run.len).sum();
            assert_eq!(total, space.cell_count());
        }
    }

    #[test]
    fn undirected_pairs_normalize_to_upper_triangle() {
        let space = DyadSpace::undirected(4);
        assert_eq!(space.dyad(3, 1).unwrap(), Dyad::new(1, 3));
        assert!(space.dyad(2, 2).is_err());
        let cell = space.cell_index(Dyad::new(1, 3));
        assert_eq!(cell, 13);
        assert_eq!(space.decode(cell), Dyad::new(1, 3));
    }

    #[test]
    fn bipartite_undirected_tail_sits_in_first_partition() {
        let space = DyadSpace::bipartite(5, 2, false).unwrap();
        assert_eq!(space.dyad(4, 1).unwrap(), Dyad::new(1, 4));
        assert!(matches!(
            space.dyad(0, 1),
            Err(ErgmError::InvalidTopology(_))
        ));
        assert!(matches!(
            space.dyad(0, 9),
            Err(ErgmError::DimensionMismatch(_))
        ));
    }

    #[test]
    fn bipartite_rejects_oversized_partition() {
        assert!(DyadSpace::bipartite(3, 4, false).is_err());
        assert!(DyadSpace::new(3, false, Some(1), true).is_err());
    }
}
