//! Constraint kinds and the builders that turn them into free dyad maps.

use std::collections::{BTreeMap, BTreeSet};

use ergm_core::errors::{ErgmError, ErrorInfo};
use ergm_core::Dyad;
use serde::{Deserialize, Serialize};

use crate::rle::{FreeDyadMap, Run};
use crate::space::DyadSpace;

/// Square boolean matrix flagging dyads, rows indexed by tail.
///
/// Produced by the caller when a fix/vary predictor has already been
/// evaluated over every dyad.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IncidenceMatrix(pub Vec<Vec<bool>>);

impl IncidenceMatrix {
    /// Matrix of the given size with every entry set to `value`.
    pub fn filled(n: usize, value: bool) -> Self {
        Self(vec![vec![value; n]; n])
    }

    /// Matrix flagging exactly the listed pairs.
    pub fn from_pairs(n: usize, pairs: &[(usize, usize)]) -> Self {
        let mut matrix = Self::filled(n, false);
        for &(tail, head) in pairs {
            if tail < n && head < n {
                matrix.0[tail][head] = true;
            }
        }
        matrix
    }

    fn check(&self, space: &DyadSpace) -> Result<(), ErgmError> {
        let n = space.n();
        if self.0.len() != n {
            return Err(ErgmError::dimension("incidence-rows", "incidence matrix", n, self.0.len()));
        }
        if let Some(row) = self.0.iter().find(|row| row.len() != n) {
            return Err(ErgmError::dimension("incidence-cols", "incidence matrix row", n, row.len()));
        }
        Ok(())
    }

    /// Converts the matrix to a map, OR-ing with the transpose for undirected spaces.
    fn to_map(&self, space: &DyadSpace) -> Result<FreeDyadMap, ErgmError> {
        self.check(space)?;
        let n = space.n();
        let symmetric = !space.is_directed();
        let cells = (0..n).flat_map(|head| (0..n).map(move |tail| (tail, head)));
        let flagged = cells
            .filter(|&(tail, head)| self.0[tail][head] || (symmetric && self.0[head][tail]))
            .map(|(tail, head)| space.cell_index(Dyad::new(tail, head)));
        Ok(FreeDyadMap::from_cells(*space, flagged))
    }
}

/// Degree-type constraints. They never produce a free dyad map; they select a
/// degree-preserving proposal instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DegreeConstraint {
    /// Preserve every node's degree (in and out degree when directed).
    Degrees,
    /// Preserve in-degrees; directed spaces only.
    Idegrees,
    /// Preserve out-degrees; directed spaces only.
    Odegrees,
    /// Preserve degrees of first-partition nodes; bipartite spaces only.
    B1degrees,
    /// Preserve degrees of second-partition nodes; bipartite spaces only.
    B2degrees,
    /// Preserve the degree distribution.
    Degreedist,
    /// Preserve the in-degree distribution; directed spaces only.
    Idegreedist,
    /// Preserve the out-degree distribution; directed spaces only.
    Odegreedist,
}

impl DegreeConstraint {
    /// Declared name of the constraint.
    pub fn name(&self) -> &'static str {
        match self {
            DegreeConstraint::Degrees => "degrees",
            DegreeConstraint::Idegrees => "idegrees",
            DegreeConstraint::Odegrees => "odegrees",
            DegreeConstraint::B1degrees => "b1degrees",
            DegreeConstraint::B2degrees => "b2degrees",
            DegreeConstraint::Degreedist => "degreedist",
            DegreeConstraint::Idegreedist => "idegreedist",
            DegreeConstraint::Odegreedist => "odegreedist",
        }
    }

    /// Checks the constraint against the topology of `space`.
    pub fn validate(&self, space: &DyadSpace) -> Result<(), ErgmError> {
        let directed_only = matches!(
            self,
            DegreeConstraint::Idegrees
                | DegreeConstraint::Odegrees
                | DegreeConstraint::Idegreedist
                | DegreeConstraint::Odegreedist
        );
        let bipartite_only = matches!(self, DegreeConstraint::B1degrees | DegreeConstraint::B2degrees);
        if directed_only && !space.is_directed() {
            return Err(ErgmError::InvalidTopology(
                ErrorInfo::new("directed-only", "constraint requires a directed space")
                    .with_context("constraint", self.name())
                    .with_hint("use degrees or degreedist on undirected spaces"),
            ));
        }
        if bipartite_only && space.b1().is_none() {
            return Err(ErgmError::InvalidTopology(
                ErrorInfo::new("bipartite-only", "constraint requires a bipartite space")
                    .with_context("constraint", self.name()),
            ));
        }
        Ok(())
    }
}

/// Closed set of constraint kinds understood by the builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ConstraintKind {
    /// Every dyad of the topology is free.
    Baseline,
    /// Ties only within contiguous attribute-defined blocks.
    BlockDiag {
        /// Attribute value per node.
        attr: Vec<i64>,
    },
    /// Dyads held at their present or absent state.
    FixedAs {
        /// Dyads fixed as edges.
        #[serde(default)]
        present: Vec<Dyad>,
        /// Dyads fixed as non-edges.
        #[serde(default)]
        absent: Vec<Dyad>,
    },
    /// Only the listed dyads are free.
    FixAllBut {
        /// The free dyads.
        free: Vec<Dyad>,
    },
    /// Predictor-based freezing (`fix`) and unfreezing (`vary`).
    Dyads {
        /// Each matrix flags dyads to freeze.
        #[serde(default)]
        fix: Vec<IncidenceMatrix>,
        /// Each matrix flags dyads to free.
        #[serde(default)]
        vary: Vec<IncidenceMatrix>,
    },
    /// Degree-preserving constraint.
    Degree {
        /// Which degree quantity is preserved.
        constraint: DegreeConstraint,
    },
}

impl ConstraintKind {
    /// Short label used in logs and manifests.
    pub fn label(&self) -> String {
        match self {
            ConstraintKind::Baseline => "baseline".into(),
            ConstraintKind::BlockDiag { .. } => "blockdiag".into(),
            ConstraintKind::FixedAs { .. } => "fixedas".into(),
            ConstraintKind::FixAllBut { .. } => "fixallbut".into(),
            ConstraintKind::Dyads { .. } => "dyads".into(),
            ConstraintKind::Degree { constraint } => constraint.name().into(),
        }
    }
}

/// Baseline map of the space.
pub fn baseline(space: &DyadSpace) -> FreeDyadMap {
    FreeDyadMap::baseline(*space)
}

/// Block-diagonal map: a dyad is free only when both endpoints share a value.
///
/// Values must form contiguous groups in node order (within each partition
/// for bipartite spaces).
pub fn block_diagonal(space: &DyadSpace, attr: &[i64]) -> Result<FreeDyadMap, ErgmError> {
    let n = space.n();
    if attr.len() != n {
        return Err(ErgmError::dimension("blockdiag-length", "block attribute", n, attr.len()));
    }
    let segments: Vec<(usize, usize)> = match space.b1() {
        Some(b1) => vec![(0, b1), (b1, n)],
        None => vec![(0, n)],
    };
    let mut blocks = Vec::with_capacity(segments.len());
    for &(start, end) in &segments {
        blocks.push(contiguous_blocks(&attr[start..end], start)?);
    }

    let mut runs = Vec::new();
    for head in 0..n {
        let mut cursor = 0usize;
        for segment in &blocks {
            if let Some(&(lo, hi)) = segment.get(&attr[head]) {
                push(&mut runs, lo - cursor, false);
                push(&mut runs, hi - lo, true);
                cursor = hi;
            }
        }
        push(&mut runs, n - cursor, false);
    }
    let blocks = FreeDyadMap::from_runs(*space, runs)?.compress();
    blocks.and(&baseline(space))
}

fn push(runs: &mut Vec<Run>, len: usize, value: bool) {
    if len > 0 {
        runs.push(Run::new(len as u64, value));
    }
}

/// Half-open node interval of every value, failing when a value reappears.
fn contiguous_blocks(attr: &[i64], offset: usize) -> Result<BTreeMap<i64, (usize, usize)>, ErgmError> {
    let mut blocks: BTreeMap<i64, (usize, usize)> = BTreeMap::new();
    for (idx, value) in attr.iter().enumerate() {
        let node = offset + idx;
        if idx > 0 && attr[idx - 1] == *value {
            if let Some(block) = blocks.get_mut(value) {
                block.1 = node + 1;
            }
            continue;
        }
        if blocks.insert(*value, (node, node + 1)).is_some() {
            return Err(ErgmError::NonContiguousBlocks(
                ErrorInfo::new("blockdiag-split", "block attribute values are not contiguous")
                    .with_context("value", value)
                    .with_context("node", node)
                    .with_hint("reorder nodes so that each block is a consecutive range"),
            ));
        }
    }
    Ok(blocks)
}

fn normalize(space: &DyadSpace, dyads: &[Dyad]) -> Result<BTreeSet<Dyad>, ErgmError> {
    dyads
        .iter()
        .map(|dyad| space.dyad(dyad.tail, dyad.head))
        .collect()
}

/// Fixed-as map: every dyad outside the union of present and absent dyads.
pub fn fixed_as(space: &DyadSpace, present: &[Dyad], absent: &[Dyad]) -> Result<FreeDyadMap, ErgmError> {
    let present = normalize(space, present)?;
    let absent = normalize(space, absent)?;
    if let Some(dyad) = present.intersection(&absent).next() {
        return Err(ErgmError::ConstraintConflict(
            ErrorInfo::new("fixed-present-and-absent", "dyad is fixed both present and absent")
                .with_context("dyad", dyad),
        ));
    }
    let fixed = FreeDyadMap::from_dyads(*space, present.iter().chain(absent.iter()));
    fixed.not().and(&baseline(space))
}

/// Fix-all-but map: the listed dyads are the free set.
pub fn fix_all_but(space: &DyadSpace, free: &[Dyad]) -> Result<FreeDyadMap, ErgmError> {
    let free = normalize(space, free)?;
    Ok(FreeDyadMap::from_dyads(*space, free.iter()))
}

/// Predictor-based map: `AND(NOT fix_i) OR OR(vary_j)`.
///
/// An empty group contributes nothing; with both groups empty every dyad is free.
pub fn fix_vary(
    space: &DyadSpace,
    fix: &[IncidenceMatrix],
    vary: &[IncidenceMatrix],
) -> Result<FreeDyadMap, ErgmError> {
    let mut fixed: Option<FreeDyadMap> = None;
    for matrix in fix {
        let kept = matrix.to_map(space)?.not();
        fixed = Some(match fixed {
            Some(acc) => acc.and(&kept)?,
            None => kept,
        });
    }
    let mut varied: Option<FreeDyadMap> = None;
    for matrix in vary {
        let map = matrix.to_map(space)?;
        varied = Some(match varied {
            Some(acc) => acc.or(&map)?,
            None => map,
        });
    }
    let map = match (fixed, varied) {
        (Some(fixed), Some(varied)) => fixed.or(&varied)?,
        (Some(map), None) | (None, Some(map)) => map,
        (None, None) => return Ok(baseline(space)),
    };
    map.and(&baseline(space))
}

/// Map contributed by one constraint, or `None` for degree-type constraints.
pub fn build(space: &DyadSpace, kind: &ConstraintKind) -> Result<Option<FreeDyadMap>, ErgmError> {
    let map = match kind {
        ConstraintKind::Baseline => baseline(space),
        ConstraintKind::BlockDiag { attr } => block_diagonal(space, attr)?,
        ConstraintKind::FixedAs { present, absent } => fixed_as(space, present, absent)?,
        ConstraintKind::FixAllBut { free } => fix_all_but(space, free)?,
        ConstraintKind::Dyads { fix, vary } => fix_vary(space, fix, vary)?,
        ConstraintKind::Degree { constraint } => {
            constraint.validate(space)?;
            return Ok(None);
        }
    };
    Ok(Some(map))
}

/// Effective constraints of a run: the free dyad map plus the degree flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintSet {
    free: FreeDyadMap,
    degree: Option<DegreeConstraint>,
    labels: Vec<String>,
}

impl ConstraintSet {
    /// Intersects the baseline with every declared constraint's map.
    pub fn compose(space: &DyadSpace, kinds: &[ConstraintKind]) -> Result<Self, ErgmError> {
        let mut free = baseline(space);
        let mut degree: Option<DegreeConstraint> = None;
        let mut labels = vec!["baseline".to_string()];
        for kind in kinds {
            if matches!(kind, ConstraintKind::Baseline) {
                continue;
            }
            match build(space, kind)? {
                Some(map) => free = free.and(&map)?,
                None => {
                    if let ConstraintKind::Degree { constraint } = kind {
                        if let Some(existing) = degree {
                            return Err(ErgmError::ConstraintConflict(
                                ErrorInfo::new(
                                    "multiple-degree-constraints",
                                    "at most one degree-type constraint may be declared",
                                )
                                .with_context("first", existing.name())
                                .with_context("second", constraint.name()),
                            ));
                        }
                        degree = Some(*constraint);
                    }
                }
            }
            tracing::debug!(
                constraint = %kind.label(),
                free_dyads = free.true_count(),
                "applied constraint"
            );
            labels.push(kind.label());
        }
        Ok(Self {
            free,
            degree,
            labels,
        })
    }

    /// Effective free dyad map.
    pub fn free(&self) -> &FreeDyadMap {
        &self.free
    }

    /// Degree-type constraint, if one was declared.
    pub fn degree(&self) -> Option<DegreeConstraint> {
        self.degree
    }

    /// Labels of the applied constraints, baseline first.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Dyad space the constraints are defined over.
    pub fn space(&self) -> &DyadSpace {
        self.free.space()
    }
}
