use ergm_core::errors::{ErgmError, ErrorInfo};
use ergm_core::{Dyad, RngHandle};
use serde::{Deserialize, Serialize};

use crate::space::DyadSpace;

/// A maximal stretch of equal values in a run-length encoded boolean vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Run {
    /// Number of cells covered by the run (always positive).
    pub len: u64,
    /// Value shared by every cell in the run.
    pub value: bool,
}

impl Run {
    /// Creates a run.
    pub const fn new(len: u64, value: bool) -> Self {
        Self { len, value }
    }
}

/// Lookup tables derived from the runs of a [`FreeDyadMap`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct RunIndex {
    /// Exclusive end offset of every run.
    ends: Vec<u64>,
    /// Start offset of every TRUE run, in order.
    true_starts: Vec<u64>,
    /// Cumulative TRUE cell count at the end of every TRUE run.
    true_prefix: Vec<u64>,
}

impl RunIndex {
    fn build(runs: &[Run]) -> Self {
        let mut index = RunIndex {
            ends: Vec::with_capacity(runs.len()),
            ..RunIndex::default()
        };
        let mut offset = 0u64;
        let mut free = 0u64;
        for run in runs {
            if run.value {
                free += run.len;
                index.true_starts.push(offset);
                index.true_prefix.push(free);
            }
            offset += run.len;
            index.ends.push(offset);
        }
        index
    }
}

/// Run-length encoded boolean vector over the cells of a [`DyadSpace`].
///
/// A TRUE cell is a free dyad: one the sampler may toggle. Maps produced by
/// [`FreeDyadMap::and`], [`FreeDyadMap::or`] and [`FreeDyadMap::compress`]
/// are canonical (no two adjacent runs share a value); maps assembled with
/// [`FreeDyadMap::from_runs`] keep their runs as given until compressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreeDyadMap {
    space: DyadSpace,
    runs: Vec<Run>,
    index: RunIndex,
}

impl FreeDyadMap {
    /// Assembles a map from raw runs. Zero-length runs are dropped.
    pub fn from_runs(space: DyadSpace, runs: Vec<Run>) -> Result<Self, ErgmError> {
        let runs: Vec<Run> = runs.into_iter().filter(|run| run.len > 0).collect();
        let total: u64 = runs.iter().map(|run| run.len).sum();
        if total != space.cell_count() {
            return Err(ErgmError::DimensionMismatch(
                ErrorInfo::new("run-length-sum", "runs do not cover the dyad space")
                    .with_context("expected", space.cell_count())
                    .with_context("actual", total),
            ));
        }
        Ok(Self::from_valid_runs(space, runs))
    }

    fn from_valid_runs(space: DyadSpace, runs: Vec<Run>) -> Self {
        let index = RunIndex::build(&runs);
        Self { space, runs, index }
    }

    /// Map with every cell set to `value`.
    pub fn all(space: DyadSpace, value: bool) -> Self {
        let runs = if space.cell_count() == 0 {
            Vec::new()
        } else {
            vec![Run::new(space.cell_count(), value)]
        };
        Self::from_valid_runs(space, runs)
    }

    /// The baseline map: TRUE exactly on the dyads of the space.
    pub fn baseline(space: DyadSpace) -> Self {
        Self::from_valid_runs(space, space.baseline_runs()).compress()
    }

    /// Map that is TRUE on the given cell indices. Duplicates are ignored.
    pub fn from_cells(space: DyadSpace, cells: impl IntoIterator<Item = u64>) -> Self {
        let mut cells: Vec<u64> = cells.into_iter().collect();
        cells.sort_unstable();
        cells.dedup();
        let mut runs = Vec::with_capacity(cells.len() * 2 + 1);
        let mut cursor = 0u64;
        for cell in cells {
            if cell > cursor {
                runs.push(Run::new(cell - cursor, false));
            }
            runs.push(Run::new(1, true));
            cursor = cell + 1;
        }
        if space.cell_count() > cursor {
            runs.push(Run::new(space.cell_count() - cursor, false));
        }
        Self::from_valid_runs(space, runs).compress()
    }

    /// Map that is TRUE on the given dyads.
    pub fn from_dyads<'a>(space: DyadSpace, dyads: impl IntoIterator<Item = &'a Dyad>) -> Self {
        Self::from_cells(space, dyads.into_iter().map(|dyad| space.cell_index(*dyad)))
    }

    /// Dyad space the map is defined over.
    pub fn space(&self) -> &DyadSpace {
        &self.space
    }

    /// Runs in canonical traversal order.
    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    /// Number of free (TRUE) cells.
    pub fn true_count(&self) -> u64 {
        self.index.true_prefix.last().copied().unwrap_or(0)
    }

    /// Returns true when the map has no free dyad.
    pub fn is_empty(&self) -> bool {
        self.true_count() == 0
    }

    /// Returns true when no two adjacent runs share a value.
    pub fn is_canonical(&self) -> bool {
        self.runs.windows(2).all(|pair| pair[0].value != pair[1].value)
    }

    /// Merges adjacent runs that share a value.
    pub fn compress(&self) -> Self {
        let mut merged: Vec<Run> = Vec::with_capacity(self.runs.len());
        for run in &self.runs {
            match merged.last_mut() {
                Some(last) if last.value == run.value => last.len += run.len,
                _ => merged.push(*run),
            }
        }
        Self::from_valid_runs(self.space, merged)
    }

    /// Complement: flips every run, keeping the run partition.
    pub fn not(&self) -> Self {
        let runs = self
            .runs
            .iter()
            .map(|run| Run::new(run.len, !run.value))
            .collect();
        Self::from_valid_runs(self.space, runs)
    }

    /// Intersection of two maps over the same space.
    pub fn and(&self, other: &Self) -> Result<Self, ErgmError> {
        self.combine(other, |a, b| a && b)
    }

    /// Union of two maps over the same space.
    pub fn or(&self, other: &Self) -> Result<Self, ErgmError> {
        self.combine(other, |a, b| a || b)
    }

    fn combine(&self, other: &Self, op: impl Fn(bool, bool) -> bool) -> Result<Self, ErgmError> {
        if self.space != other.space {
            return Err(ErgmError::DimensionMismatch(
                ErrorInfo::new("space-mismatch", "maps are defined over different dyad spaces")
                    .with_context("left_n", self.space.n())
                    .with_context("right_n", other.space.n()),
            ));
        }
        let mut out = Vec::with_capacity(self.runs.len() + other.runs.len());
        let (mut i, mut j) = (0usize, 0usize);
        let (mut end_a, mut end_b) = (0u64, 0u64);
        let mut offset = 0u64;
        while i < self.runs.len() && j < other.runs.len() {
            if end_a <= offset {
                end_a = self.index.ends[i];
            }
            if end_b <= offset {
                end_b = other.index.ends[j];
            }
            let next = end_a.min(end_b);
            out.push(Run::new(
                next - offset,
                op(self.runs[i].value, other.runs[j].value),
            ));
            offset = next;
            if end_a == next {
                i += 1;
            }
            if end_b == next {
                j += 1;
            }
        }
        Ok(Self::from_valid_runs(self.space, out).compress())
    }

    /// Returns true when the cell holding `dyad` is free.
    pub fn member(&self, dyad: Dyad) -> bool {
        if dyad.tail >= self.space.n() || dyad.head >= self.space.n() {
            return false;
        }
        self.cell_value(self.space.cell_index(dyad))
    }

    /// Value of a cell by linear index.
    pub fn cell_value(&self, cell: u64) -> bool {
        let run = self.index.ends.partition_point(|&end| end <= cell);
        self.runs.get(run).map_or(false, |run| run.value)
    }

    /// Draws a free dyad uniformly at random in `O(log k)` for `k` runs.
    ///
    /// Returns `None` when the map has no free dyad.
    pub fn weighted_random_dyad(&self, rng: &mut RngHandle) -> Option<Dyad> {
        let total = self.true_count();
        if total == 0 {
            return None;
        }
        let draw = rng.below(total);
        Some(self.space.decode(self.nth_true_cell(draw)))
    }

    /// Linear index of the `rank`-th free cell (0-based). `rank < true_count()`.
    fn nth_true_cell(&self, rank: u64) -> u64 {
        let run = self.index.true_prefix.partition_point(|&count| count <= rank);
        let before = if run == 0 {
            0
        } else {
            self.index.true_prefix[run - 1]
        };
        self.index.true_starts[run] + (rank - before)
    }

    /// Iterates the free dyads in canonical order.
    pub fn iter_true(&self) -> impl Iterator<Item = Dyad> + '_ {
        self.index
            .true_starts
            .iter()
            .zip(self.index.true_prefix.iter().scan(0u64, |prev, &count| {
                let len = count - *prev;
                *prev = count;
                Some(len)
            }))
            .flat_map(move |(&start, len)| (start..start + len).map(move |cell| self.space.decode(cell)))
    }
}
