use std::fs;
use std::path::Path;

use ergm_core::errors::{ErgmError, ErrorInfo};
use ergm_core::Dyad;
use ergm_dyads::{ConstraintKind, ConstraintSet, DyadSpace, Network};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::bounds::{DegreeBound, DegreeBoundSpec};
use crate::stats::{TermSet, TermSpec};

/// Topology block of a problem file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceSpec {
    /// Number of nodes.
    pub n: usize,
    /// Directed ties.
    #[serde(default)]
    pub directed: bool,
    /// Size of the first partition for bipartite networks.
    #[serde(default)]
    pub bipartite: Option<usize>,
    /// Self-ties allowed.
    #[serde(default)]
    pub loops: bool,
}

/// Declarative sampling problem: everything except the run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemSpec {
    /// Network topology.
    pub space: SpaceSpec,
    /// Initial edge list.
    #[serde(default)]
    pub edges: Vec<Dyad>,
    /// Declared constraints, combined by intersection.
    #[serde(default)]
    pub constraints: Vec<ConstraintKind>,
    /// Optional degree bounds.
    #[serde(default)]
    pub bounds: Option<DegreeBoundSpec>,
    /// Model terms.
    #[serde(default)]
    pub terms: Vec<TermSpec>,
}

impl ProblemSpec {
    /// Reads a JSON problem file.
    pub fn load(path: &Path) -> Result<Self, ErgmError> {
        let contents = fs::read_to_string(path).map_err(|err| {
            ErgmError::Config(
                ErrorInfo::new("problem-read", err.to_string()).with_context("path", path.display()),
            )
        })?;
        serde_json::from_str(&contents).map_err(|err| {
            ErgmError::Config(
                ErrorInfo::new("problem-parse", err.to_string()).with_context("path", path.display()),
            )
        })
    }

    /// SHA-256 of the canonical JSON encoding.
    pub fn input_hash(&self) -> Result<String, ErgmError> {
        let json = serde_json::to_vec(self).map_err(|err| ErgmError::serde("problem-serialize", err))?;
        let mut hasher = Sha256::new();
        hasher.update(&json);
        Ok(format!("{:x}", hasher.finalize()))
    }

    /// Validates every part of the problem and builds the sampler inputs.
    pub fn resolve(&self) -> Result<Problem, ErgmError> {
        let space = DyadSpace::new(
            self.space.n,
            self.space.directed,
            self.space.bipartite,
            self.space.loops,
        )?;
        let constraints = ConstraintSet::compose(&space, &self.constraints)?;
        let initial = Network::from_edges(space, &self.edges)?;
        let bounds = match &self.bounds {
            Some(spec) => spec.build(space.n())?,
            None => DegreeBound::unbounded(space.n()),
        };
        let terms = TermSet::from_specs(&space, &self.terms)?;
        Problem::new(constraints, initial, bounds, terms)
    }
}

/// Validated inputs shared read-only by every chain.
#[derive(Debug)]
pub struct Problem {
    constraints: ConstraintSet,
    initial: Network,
    bounds: DegreeBound,
    terms: TermSet,
}

impl Problem {
    /// Checks that the parts agree on the dyad space.
    pub fn new(
        constraints: ConstraintSet,
        initial: Network,
        bounds: DegreeBound,
        terms: TermSet,
    ) -> Result<Self, ErgmError> {
        if constraints.space() != initial.space() {
            return Err(ErgmError::DimensionMismatch(
                ErrorInfo::new("space-mismatch", "initial network and constraints use different spaces")
                    .with_context("constraint_n", constraints.space().n())
                    .with_context("network_n", initial.space().n()),
            ));
        }
        let n = initial.space().n();
        if bounds.node_count() != n {
            return Err(ErgmError::dimension(
                "bound-nodes",
                "degree bound table",
                n,
                bounds.node_count(),
            ));
        }
        terms.check_nodes(n)?;
        let fixed_edges = initial
            .edges()
            .filter(|dyad| !constraints.free().member(**dyad))
            .count();
        if fixed_edges > 0 {
            tracing::debug!(fixed_edges, "initial edges on fixed dyads stay in every sample");
        }
        let violations = bounds.violations(&initial);
        if !violations.is_empty() {
            tracing::warn!(
                nodes = ?violations,
                "initial network violates degree bounds; moves that keep the violation are rejected"
            );
        }
        Ok(Self {
            constraints,
            initial,
            bounds,
            terms,
        })
    }

    /// Free dyads and degree constraint.
    pub fn constraints(&self) -> &ConstraintSet {
        &self.constraints
    }

    /// Starting network.
    pub fn initial(&self) -> &Network {
        &self.initial
    }

    /// Degree bounds.
    pub fn bounds(&self) -> &DegreeBound {
        &self.bounds
    }

    /// Model terms.
    pub fn terms(&self) -> &TermSet {
        &self.terms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::GroupBounds;
    use crate::stats::NodeMatch;

    #[test]
    fn resolves_json_problem() {
        let json = r#"{
            "space": {"n": 4},
            "edges": [{"tail": 1, "head": 0}],
            "constraints": [{"kind": "block-diag", "attr": [1, 1, 2, 2]}],
            "bounds": {"groups": [{"maxout": 1}]},
            "terms": [{"term": "edges"}, {"term": "triangles"}]
        }"#;
        let spec: ProblemSpec = serde_json::from_str(json).unwrap();
        let problem = spec.resolve().unwrap();
        assert!(problem.initial().has_edge(Dyad::new(0, 1)));
        assert_eq!(problem.constraints().free().true_count(), 2);
        assert_eq!(problem.terms().names(), vec!["edges", "triangle"]);
        assert_eq!(spec.input_hash().unwrap(), spec.input_hash().unwrap());
    }

    #[test]
    fn errors_surface_before_sampling() {
        let json = r#"{
            "space": {"n": 4},
            "constraints": [{"kind": "block-diag", "attr": [1, 2, 1, 2]}]
        }"#;
        let spec: ProblemSpec = serde_json::from_str(json).unwrap();
        assert!(matches!(spec.resolve(), Err(ErgmError::NonContiguousBlocks(_))));
    }

    #[test]
    fn hand_built_parts_must_cover_every_node() {
        let space = DyadSpace::undirected(6);
        let parts = || {
            (
                ConstraintSet::compose(&space, &[]).unwrap(),
                Network::empty(space),
            )
        };

        let (constraints, initial) = parts();
        let bounds = DegreeBound::uniform(3, GroupBounds::max_out(2)).unwrap();
        let err = Problem::new(constraints, initial, bounds, TermSet::default()).unwrap_err();
        assert!(matches!(err, ErgmError::DimensionMismatch(_)));
        assert_eq!(err.info().code, "bound-nodes");

        let (constraints, initial) = parts();
        let nodematch = NodeMatch::new(&DyadSpace::undirected(4), vec![1, 1, 2, 2]).unwrap();
        let terms = TermSet::new(vec![Box::new(nodematch)]);
        let err = Problem::new(constraints, initial, DegreeBound::unbounded(6), terms).unwrap_err();
        assert_eq!(err.info().code, "term-nodes");
    }
}
