use std::collections::{BTreeMap, BTreeSet};

use ergm_core::errors::{ErgmError, ErrorInfo};
use ergm_core::Dyad;
use ergm_dyads::Network;
use serde::{Deserialize, Serialize};

/// Degree limits shared by every node of one attribute group.
///
/// `None` leaves the corresponding side unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupBounds {
    /// Maximum out-degree (simple degree on undirected spaces).
    #[serde(default)]
    pub maxout: Option<u32>,
    /// Maximum in-degree; ignored on undirected spaces.
    #[serde(default)]
    pub maxin: Option<u32>,
    /// Minimum out-degree (simple degree on undirected spaces).
    #[serde(default)]
    pub minout: Option<u32>,
    /// Minimum in-degree; ignored on undirected spaces.
    #[serde(default)]
    pub minin: Option<u32>,
}

impl GroupBounds {
    /// Bounds with only a maximum out-degree.
    pub fn max_out(max: u32) -> Self {
        Self {
            maxout: Some(max),
            ..Self::default()
        }
    }

    fn is_unbounded(&self) -> bool {
        self.maxout.is_none() && self.maxin.is_none() && self.minout.is_none() && self.minin.is_none()
    }
}

/// Declarative form of a [`DegreeBound`], as read from a problem file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegreeBoundSpec {
    /// Group index per node; all nodes share group 0 when omitted.
    #[serde(default)]
    pub attribs: Option<Vec<usize>>,
    /// Bounds per group.
    #[serde(default)]
    pub groups: Vec<GroupBounds>,
}

impl DegreeBoundSpec {
    /// Validates the table against a network of `n` nodes.
    pub fn build(&self, n: usize) -> Result<DegreeBound, ErgmError> {
        DegreeBound::new(n, self.attribs.clone(), self.groups.clone())
    }
}

fn within(value: i64, min: Option<u32>, max: Option<u32>) -> bool {
    min.map_or(true, |min| value >= i64::from(min)) && max.map_or(true, |max| value <= i64::from(max))
}

/// Per-group degree bounds used as a hard filter on proposed toggles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DegreeBound {
    attribs: Vec<usize>,
    groups: Vec<GroupBounds>,
    unbounded: bool,
}

impl DegreeBound {
    /// Bounds that accept every toggle.
    pub fn unbounded(n: usize) -> Self {
        Self {
            attribs: vec![0; n],
            groups: vec![GroupBounds::default()],
            unbounded: true,
        }
    }

    /// The same bounds for every node.
    pub fn uniform(n: usize, bounds: GroupBounds) -> Result<Self, ErgmError> {
        Self::new(n, None, vec![bounds])
    }

    /// Validated bound table.
    pub fn new(
        n: usize,
        attribs: Option<Vec<usize>>,
        groups: Vec<GroupBounds>,
    ) -> Result<Self, ErgmError> {
        let attribs = attribs.unwrap_or_else(|| vec![0; n]);
        if attribs.len() != n {
            return Err(ErgmError::dimension("bound-attribs", "degree bound grouping", n, attribs.len()));
        }
        if let Some(&group) = attribs.iter().find(|&&group| group >= groups.len()) {
            return Err(ErgmError::DimensionMismatch(
                ErrorInfo::new("bound-group", "node refers to a group without bounds")
                    .with_context("group", group)
                    .with_context("groups", groups.len()),
            ));
        }
        for (index, bounds) in groups.iter().enumerate() {
            let inverted = |min: Option<u32>, max: Option<u32>| matches!((min, max), (Some(min), Some(max)) if max < min);
            if inverted(bounds.minout, bounds.maxout) || inverted(bounds.minin, bounds.maxin) {
                return Err(ErgmError::Config(
                    ErrorInfo::new("bound-inverted", "maximum degree is below the minimum")
                        .with_context("group", index)
                        .with_context("bounds", format!("{bounds:?}")),
                ));
            }
        }
        let unbounded = groups.iter().all(GroupBounds::is_unbounded);
        Ok(Self {
            attribs,
            groups,
            unbounded,
        })
    }

    /// Number of nodes the table covers.
    pub fn node_count(&self) -> usize {
        self.attribs.len()
    }

    /// True when no group carries any bound.
    pub fn is_unbounded(&self) -> bool {
        self.unbounded
    }

    fn bounds_of(&self, node: usize) -> &GroupBounds {
        &self.groups[self.attribs[node]]
    }

    /// Checks whether setting `dyad` to `new_value` keeps every affected
    /// degree within its group's bounds.
    pub fn accept_toggle(&self, network: &Network, dyad: Dyad, new_value: bool) -> bool {
        if self.unbounded || network.has_edge(dyad) == new_value {
            return true;
        }
        let mut changes = BTreeMap::new();
        add_change(dyad, if new_value { 1 } else { -1 }, &mut changes);
        self.changes_within(network, &changes)
    }

    /// Checks a toggle set applied in order.
    pub fn accept_toggles(&self, network: &Network, toggles: &[Dyad]) -> bool {
        if self.unbounded {
            return true;
        }
        let mut flipped = BTreeSet::new();
        let mut changes = BTreeMap::new();
        for dyad in toggles {
            let toggled_before = !flipped.insert(*dyad);
            if toggled_before {
                flipped.remove(dyad);
            }
            let present = network.has_edge(*dyad) ^ toggled_before;
            add_change(*dyad, if present { -1 } else { 1 }, &mut changes);
        }
        self.changes_within(network, &changes)
    }

    fn changes_within(&self, network: &Network, changes: &BTreeMap<usize, (i64, i64)>) -> bool {
        let directed = network.space().is_directed();
        changes.iter().all(|(&node, &(out, inn))| {
            let bounds = self.bounds_of(node);
            if directed {
                within(i64::from(network.out_degree(node)) + out, bounds.minout, bounds.maxout)
                    && within(i64::from(network.in_degree(node)) + inn, bounds.minin, bounds.maxin)
            } else {
                within(i64::from(network.degree(node)) + out + inn, bounds.minout, bounds.maxout)
            }
        })
    }

    /// Nodes whose current degrees lie outside their bounds.
    pub fn violations(&self, network: &Network) -> Vec<usize> {
        if self.unbounded {
            return Vec::new();
        }
        (0..network.space().n())
            .filter(|&node| !self.changes_within(network, &BTreeMap::from([(node, (0, 0))])))
            .collect()
    }
}

/// Records a degree change: `.0` on the tail's out side, `.1` on the head's in side.
fn add_change(dyad: Dyad, delta: i64, changes: &mut BTreeMap<usize, (i64, i64)>) {
    changes.entry(dyad.tail).or_insert((0, 0)).0 += delta;
    changes.entry(dyad.head).or_insert((0, 0)).1 += delta;
}

#[cfg(test)]
mod tests {
    use super::*;
    use ergm_dyads::DyadSpace;

    #[test]
    fn max_out_blocks_additions_only() {
        let space = DyadSpace::directed(4);
        let network = Network::from_edges(space, &[Dyad::new(0, 1), Dyad::new(0, 2)]).unwrap();
        let bound = DegreeBound::uniform(4, GroupBounds::max_out(2)).unwrap();
        assert!(!bound.accept_toggle(&network, Dyad::new(0, 3), true));
        assert!(bound.accept_toggle(&network, Dyad::new(0, 1), false));
        assert!(bound.accept_toggle(&network, Dyad::new(1, 3), true));
    }

    #[test]
    fn undirected_degree_counts_both_endpoints() {
        let space = DyadSpace::undirected(3);
        let network = Network::from_edges(space, &[Dyad::new(0, 1)]).unwrap();
        let bound = DegreeBound::uniform(
            3,
            GroupBounds {
                minout: Some(1),
                ..GroupBounds::default()
            },
        )
        .unwrap();
        assert!(!bound.accept_toggle(&network, Dyad::new(0, 1), false));
        assert_eq!(bound.violations(&network), vec![2]);
    }

    #[test]
    fn toggle_sets_see_intermediate_state() {
        let space = DyadSpace::directed(3);
        let network = Network::from_edges(space, &[Dyad::new(0, 1)]).unwrap();
        let bound = DegreeBound::uniform(3, GroupBounds::max_out(1)).unwrap();
        // remove (0,1) then add (0,2): out-degree of 0 stays 1
        assert!(bound.accept_toggles(&network, &[Dyad::new(0, 1), Dyad::new(0, 2)]));
        assert!(!bound.accept_toggles(&network, &[Dyad::new(0, 2)]));
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let err = DegreeBound::uniform(
            2,
            GroupBounds {
                maxin: Some(1),
                minin: Some(2),
                ..GroupBounds::default()
            },
        )
        .unwrap_err();
        assert_eq!(err.info().code, "bound-inverted");
        let err = DegreeBound::new(2, Some(vec![0, 1]), vec![GroupBounds::default()]).unwrap_err();
        assert_eq!(err.info().code, "bound-group");
    }
}
