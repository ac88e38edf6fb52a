use std::collections::BTreeSet;
use std::fmt;

use ergm_core::errors::{ErgmError, ErrorInfo};
use ergm_core::Dyad;
use ergm_dyads::{DyadSpace, Network};
use serde::{Deserialize, Serialize};

/// Model term that reports how its statistics change when dyads are toggled.
///
/// Implementations must not mutate anything observable: `change` describes the
/// effect of applying `toggles` in order to `network`, which itself is left
/// untouched.
pub trait ChangeStatistic: Send + Sync {
    /// Column names, one per statistic produced by the term.
    fn names(&self) -> Vec<String>;

    /// Number of statistics produced by the term.
    fn dimension(&self) -> usize {
        self.names().len()
    }

    /// Statistics of the empty network.
    fn empty_statistics(&self) -> Vec<f64> {
        vec![0.0; self.dimension()]
    }

    /// Node count the term was built for, when it carries per-node data.
    fn node_count(&self) -> Option<usize> {
        None
    }

    /// Change in the term's statistics from toggling `toggles` in sequence.
    fn change(&self, network: &Network, toggles: &[Dyad]) -> Vec<f64>;
}

/// Read-only view of a network with a handful of dyads flipped.
#[derive(Debug, Clone)]
pub struct Overlay<'a> {
    network: &'a Network,
    flipped: Vec<Dyad>,
}

impl<'a> Overlay<'a> {
    /// View equal to `network`.
    pub fn new(network: &'a Network) -> Self {
        Self {
            network,
            flipped: Vec::new(),
        }
    }

    /// Dyad space of the underlying network.
    pub fn space(&self) -> &DyadSpace {
        self.network.space()
    }

    /// Flips a dyad in the view.
    pub fn flip(&mut self, dyad: Dyad) {
        match self.flipped.iter().position(|flipped| *flipped == dyad) {
            Some(index) => {
                self.flipped.swap_remove(index);
            }
            None => self.flipped.push(dyad),
        }
    }

    /// Whether the normalized dyad is an edge in the view.
    pub fn has_edge(&self, dyad: Dyad) -> bool {
        self.network.has_edge(dyad) ^ self.flipped.contains(&dyad)
    }

    /// Whether an edge joins `a` to `b` (either orientation on undirected spaces).
    pub fn connected(&self, a: usize, b: usize) -> bool {
        if self.space().is_directed() {
            self.has_edge(Dyad::new(a, b))
        } else {
            self.has_edge(Dyad::new(a.min(b), a.max(b)))
        }
    }
}

/// Term whose statistic changes by a scalar for each single toggle.
///
/// Implementing this trait provides [`ChangeStatistic`] automatically.
pub trait DyadTerm: Send + Sync {
    /// Column name of the statistic.
    fn name(&self) -> String;

    /// Value of the statistic on the empty network.
    fn empty_value(&self) -> f64 {
        0.0
    }

    /// Node count the term was built for, when it carries per-node data.
    fn node_count(&self) -> Option<usize> {
        None
    }

    /// Change from toggling `dyad` in `view`.
    fn dyad_change(&self, view: &Overlay<'_>, dyad: Dyad) -> f64;
}

impl<T: DyadTerm> ChangeStatistic for T {
    fn names(&self) -> Vec<String> {
        vec![self.name()]
    }

    fn dimension(&self) -> usize {
        1
    }

    fn empty_statistics(&self) -> Vec<f64> {
        vec![self.empty_value()]
    }

    fn node_count(&self) -> Option<usize> {
        DyadTerm::node_count(self)
    }

    fn change(&self, network: &Network, toggles: &[Dyad]) -> Vec<f64> {
        let mut view = Overlay::new(network);
        let mut total = 0.0;
        for dyad in toggles {
            total += self.dyad_change(&view, *dyad);
            view.flip(*dyad);
        }
        vec![total]
    }
}

fn sign(view: &Overlay<'_>, dyad: Dyad) -> f64 {
    if view.has_edge(dyad) {
        -1.0
    } else {
        1.0
    }
}

/// Edge count.
#[derive(Debug, Clone, Copy, Default)]
pub struct Edges;

impl DyadTerm for Edges {
    fn name(&self) -> String {
        "edges".into()
    }

    fn dyad_change(&self, view: &Overlay<'_>, dyad: Dyad) -> f64 {
        sign(view, dyad)
    }
}

/// Number of reciprocated pairs in a directed network.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mutual;

impl DyadTerm for Mutual {
    fn name(&self) -> String {
        "mutual".into()
    }

    fn dyad_change(&self, view: &Overlay<'_>, dyad: Dyad) -> f64 {
        if dyad.is_loop() || !view.has_edge(dyad.transposed()) {
            return 0.0;
        }
        sign(view, dyad)
    }
}

/// Number of triangles in an undirected network.
#[derive(Debug, Clone, Copy, Default)]
pub struct Triangles;

impl DyadTerm for Triangles {
    fn name(&self) -> String {
        "triangle".into()
    }

    fn dyad_change(&self, view: &Overlay<'_>, dyad: Dyad) -> f64 {
        if dyad.is_loop() {
            return 0.0;
        }
        let shared = (0..view.space().n())
            .filter(|&k| k != dyad.tail && k != dyad.head)
            .filter(|&k| view.connected(dyad.tail, k) && view.connected(dyad.head, k))
            .count();
        sign(view, dyad) * shared as f64
    }
}

/// Hamming distance to a fixed reference network.
#[derive(Debug, Clone, Default)]
pub struct Hamming {
    reference: BTreeSet<Dyad>,
}

impl Hamming {
    /// Distance to `reference`, whose edges are normalized against `space`.
    pub fn new(space: &DyadSpace, reference: &[Dyad]) -> Result<Self, ErgmError> {
        let reference = reference
            .iter()
            .map(|dyad| space.dyad(dyad.tail, dyad.head))
            .collect::<Result<_, _>>()?;
        Ok(Self { reference })
    }
}

impl DyadTerm for Hamming {
    fn name(&self) -> String {
        "hamming".into()
    }

    fn empty_value(&self) -> f64 {
        self.reference.len() as f64
    }

    fn dyad_change(&self, view: &Overlay<'_>, dyad: Dyad) -> f64 {
        let change = sign(view, dyad);
        if self.reference.contains(&dyad) {
            -change
        } else {
            change
        }
    }
}

/// Edges joining nodes that share a categorical attribute.
#[derive(Debug, Clone, Default)]
pub struct NodeMatch {
    attr: Vec<i64>,
}

impl NodeMatch {
    /// Matches on `attr`, one value per node.
    pub fn new(space: &DyadSpace, attr: Vec<i64>) -> Result<Self, ErgmError> {
        if attr.len() != space.n() {
            return Err(ErgmError::dimension("nodematch-attr", "node attribute", space.n(), attr.len()));
        }
        Ok(Self { attr })
    }
}

impl DyadTerm for NodeMatch {
    fn name(&self) -> String {
        "nodematch".into()
    }

    fn node_count(&self) -> Option<usize> {
        Some(self.attr.len())
    }

    fn dyad_change(&self, view: &Overlay<'_>, dyad: Dyad) -> f64 {
        if self.attr[dyad.tail] == self.attr[dyad.head] {
            sign(view, dyad)
        } else {
            0.0
        }
    }
}

/// Declarative form of a built-in term, as read from a problem file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "term", rename_all = "kebab-case")]
pub enum TermSpec {
    /// [`Edges`].
    Edges,
    /// [`Mutual`].
    Mutual,
    /// [`Triangles`].
    Triangles,
    /// [`Hamming`].
    Hamming {
        /// Reference edge list.
        reference: Vec<Dyad>,
    },
    /// [`NodeMatch`].
    NodeMatch {
        /// Attribute value per node.
        attr: Vec<i64>,
    },
}

impl TermSpec {
    /// Builds the term for `space`, rejecting terms that do not apply to it.
    pub fn build(&self, space: &DyadSpace) -> Result<Box<dyn ChangeStatistic>, ErgmError> {
        let topology = |term: &str, requirement: &str| {
            ErgmError::InvalidTopology(
                ErrorInfo::new("term-topology", format!("{term} requires a {requirement} network"))
                    .with_context("term", term),
            )
        };
        let term: Box<dyn ChangeStatistic> = match self {
            TermSpec::Edges => Box::new(Edges),
            TermSpec::Mutual if !space.is_directed() => return Err(topology("mutual", "directed")),
            TermSpec::Mutual => Box::new(Mutual),
            TermSpec::Triangles if space.is_directed() => {
                return Err(topology("triangle", "undirected"))
            }
            TermSpec::Triangles => Box::new(Triangles),
            TermSpec::Hamming { reference } => Box::new(Hamming::new(space, reference)?),
            TermSpec::NodeMatch { attr } => Box::new(NodeMatch::new(space, attr.clone())?),
        };
        Ok(term)
    }
}

/// Ordered collection of terms whose statistics are concatenated.
#[derive(Default)]
pub struct TermSet {
    terms: Vec<Box<dyn ChangeStatistic>>,
}

impl fmt::Debug for TermSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TermSet")
            .field("names", &self.names())
            .finish()
    }
}

impl TermSet {
    /// Wraps the given terms.
    pub fn new(terms: Vec<Box<dyn ChangeStatistic>>) -> Self {
        Self { terms }
    }

    /// Builds the built-in terms described by `specs`.
    pub fn from_specs(space: &DyadSpace, specs: &[TermSpec]) -> Result<Self, ErgmError> {
        let terms = specs
            .iter()
            .map(|spec| spec.build(space))
            .collect::<Result<_, _>>()?;
        Ok(Self { terms })
    }

    /// Fails when a term carries per-node data for a different node count.
    pub fn check_nodes(&self, n: usize) -> Result<(), ErgmError> {
        for term in &self.terms {
            if let Some(actual) = term.node_count().filter(|&count| count != n) {
                return Err(ErgmError::dimension("term-nodes", "term node data", n, actual));
            }
        }
        Ok(())
    }

    /// Column names of every statistic.
    pub fn names(&self) -> Vec<String> {
        self.terms.iter().flat_map(|term| term.names()).collect()
    }

    /// Total number of statistics.
    pub fn dimension(&self) -> usize {
        self.terms.iter().map(|term| term.dimension()).sum()
    }

    /// Concatenated change vector for a toggle set.
    pub fn change(&self, network: &Network, toggles: &[Dyad]) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.dimension());
        for term in &self.terms {
            out.extend(term.change(network, toggles));
        }
        out
    }

    /// Absolute statistics of `network`, accumulated while building it from
    /// the empty network edge by edge.
    pub fn evaluate(&self, network: &Network) -> Vec<f64> {
        let mut stats: Vec<f64> = self
            .terms
            .iter()
            .flat_map(|term| term.empty_statistics())
            .collect();
        let mut scratch = Network::empty(*network.space());
        for edge in network.edge_list() {
            for (total, delta) in stats.iter_mut().zip(self.change(&scratch, &[edge])) {
                *total += delta;
            }
            scratch.toggle(edge);
        }
        stats
    }
}
