use ergm_core::{Dyad, RngHandle};
use ergm_dyads::{DegreeConstraint, DyadSpace, FreeDyadMap, Network};
use serde::{Deserialize, Serialize};

use crate::bounds::DegreeBound;

/// Endpoint kept in place by an anchored move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Anchor {
    /// Keep the tail, move the head.
    Tail,
    /// Keep the head, move the tail.
    Head,
    /// Keep whichever endpoint lies in the first partition.
    FirstPartition,
    /// Keep whichever endpoint lies in the second partition.
    SecondPartition,
}

/// Degree compared by a degree-distribution move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DistSide {
    /// Move heads between nodes of adjacent in-degree.
    Head,
    /// Move tails between nodes of adjacent out-degree.
    Tail,
    /// Move either endpoint (chosen by coin flip) between nodes of adjacent simple degree.
    Either,
}

/// Proposal families. Every family is symmetric, so the Hastings log ratio is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ProposalKind {
    /// Toggle one free dyad drawn uniformly from the free map.
    RandomToggle,
    /// Replace edges `(a,b)`, `(c,d)` with `(a,d)`, `(c,b)`.
    DoubleSwap,
    /// Move one endpoint of an edge to a uniformly drawn node.
    Anchored {
        /// Endpoint that stays.
        anchor: Anchor,
    },
    /// Move one endpoint of an edge to a node whose degree is one lower.
    DegreeDist {
        /// Endpoint that moves.
        side: DistSide,
    },
}

impl ProposalKind {
    /// Proposal family implied by the (optional) degree constraint.
    pub fn for_constraint(constraint: Option<DegreeConstraint>, space: &DyadSpace) -> Self {
        match constraint {
            None => ProposalKind::RandomToggle,
            Some(DegreeConstraint::Degrees) => ProposalKind::DoubleSwap,
            Some(DegreeConstraint::Odegrees) => ProposalKind::Anchored {
                anchor: Anchor::Tail,
            },
            Some(DegreeConstraint::Idegrees) => ProposalKind::Anchored {
                anchor: Anchor::Head,
            },
            Some(DegreeConstraint::B1degrees) => ProposalKind::Anchored {
                anchor: Anchor::FirstPartition,
            },
            Some(DegreeConstraint::B2degrees) => ProposalKind::Anchored {
                anchor: Anchor::SecondPartition,
            },
            Some(DegreeConstraint::Degreedist) if !space.is_directed() => ProposalKind::DegreeDist {
                side: DistSide::Either,
            },
            Some(DegreeConstraint::Degreedist | DegreeConstraint::Idegreedist) => {
                ProposalKind::DegreeDist {
                    side: DistSide::Head,
                }
            }
            Some(DegreeConstraint::Odegreedist) => ProposalKind::DegreeDist {
                side: DistSide::Tail,
            },
        }
    }

    /// Short label used in logs and manifests.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalKind::RandomToggle => "random-toggle",
            ProposalKind::DoubleSwap => "double-swap",
            ProposalKind::Anchored { .. } => "anchored-move",
            ProposalKind::DegreeDist { .. } => "degree-dist-move",
        }
    }
}

/// Toggle set accepted by the proposal filters.
#[derive(Debug, Clone, PartialEq)]
pub struct Proposal {
    /// Dyads to toggle, in order.
    pub toggles: Vec<Dyad>,
    /// Log of q(y→x)/q(x→y).
    pub log_ratio: f64,
}

/// Why a step stayed in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectReason {
    /// Nothing to draw from (no free dyad, or too few edges).
    NoCandidate,
    /// The draw did not form a legal toggle set.
    Invalid,
    /// The toggle set would break a degree bound.
    DegreeBound,
}

/// Result of one call to [`MHProposal::propose`].
#[derive(Debug, Clone, PartialEq)]
pub enum ProposalOutcome {
    /// A toggle set ready for the acceptance test.
    Toggles(Proposal),
    /// The chain stays where it is for this step.
    SelfTransition(RejectReason),
}

/// Metropolis–Hastings proposal generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MHProposal {
    kind: ProposalKind,
    max_attempts: usize,
}

impl MHProposal {
    /// Proposal of `kind` that redraws up to `max_attempts` times (at least once).
    ///
    /// A single attempt keeps the chain exactly reversible; more attempts bias
    /// the stationary distribution towards states with many legal moves.
    pub fn new(kind: ProposalKind, max_attempts: usize) -> Self {
        if max_attempts > 1 {
            tracing::warn!(
                max_attempts,
                "retrying rejected proposals breaks exact detailed balance"
            );
        }
        Self {
            kind,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Proposal family.
    pub fn kind(&self) -> ProposalKind {
        self.kind
    }

    /// Draws a toggle set for `network`. Every toggle is free and the set as a
    /// whole respects `bounds`.
    pub fn propose(
        &self,
        free: &FreeDyadMap,
        bounds: &DegreeBound,
        network: &Network,
        rng: &mut RngHandle,
    ) -> ProposalOutcome {
        let mut reason = RejectReason::NoCandidate;
        for _ in 0..self.max_attempts {
            match self.draw(free, network, rng) {
                Err(RejectReason::NoCandidate) => {
                    return ProposalOutcome::SelfTransition(RejectReason::NoCandidate)
                }
                Err(other) => reason = other,
                Ok(toggles) => {
                    if bounds.accept_toggles(network, &toggles) {
                        return ProposalOutcome::Toggles(Proposal {
                            toggles,
                            log_ratio: 0.0,
                        });
                    }
                    reason = RejectReason::DegreeBound;
                }
            }
        }
        ProposalOutcome::SelfTransition(reason)
    }

    fn draw(
        &self,
        free: &FreeDyadMap,
        network: &Network,
        rng: &mut RngHandle,
    ) -> Result<Vec<Dyad>, RejectReason> {
        let toggles = match self.kind {
            ProposalKind::RandomToggle => {
                let dyad = free
                    .weighted_random_dyad(rng)
                    .ok_or(RejectReason::NoCandidate)?;
                return Ok(vec![dyad]);
            }
            ProposalKind::DoubleSwap => double_swap(network, rng)?,
            ProposalKind::Anchored { anchor } => anchored_move(network, anchor, rng)?,
            ProposalKind::DegreeDist { side } => degree_dist_move(network, side, rng)?,
        };
        if toggles.iter().all(|dyad| free.member(*dyad)) {
            Ok(toggles)
        } else {
            Err(RejectReason::Invalid)
        }
    }
}

fn fresh(network: &Network, tail: usize, head: usize) -> Result<Dyad, RejectReason> {
    let dyad = network
        .space()
        .dyad(tail, head)
        .map_err(|_| RejectReason::Invalid)?;
    if network.has_edge(dyad) {
        return Err(RejectReason::Invalid);
    }
    Ok(dyad)
}

fn random_edge(network: &Network, rng: &mut RngHandle) -> Result<Dyad, RejectReason> {
    network.random_edge(rng).ok_or(RejectReason::NoCandidate)
}

fn random_node(network: &Network, rng: &mut RngHandle) -> usize {
    rng.below(network.space().n() as u64) as usize
}

fn double_swap(network: &Network, rng: &mut RngHandle) -> Result<Vec<Dyad>, RejectReason> {
    if network.edge_count() < 2 {
        return Err(RejectReason::NoCandidate);
    }
    let first = random_edge(network, rng)?;
    let second = random_edge(network, rng)?;
    if first == second {
        return Err(RejectReason::Invalid);
    }
    let space = network.space();
    let flip = !space.is_directed() && space.b1().is_none() && rng.below(2) == 1;
    let (c, d) = if flip {
        (second.head, second.tail)
    } else {
        (second.tail, second.head)
    };
    let left = fresh(network, first.tail, d)?;
    let right = fresh(network, c, first.head)?;
    if left == right {
        return Err(RejectReason::Invalid);
    }
    Ok(vec![first, second, left, right])
}

fn anchored_move(
    network: &Network,
    anchor: Anchor,
    rng: &mut RngHandle,
) -> Result<Vec<Dyad>, RejectReason> {
    let edge = random_edge(network, rng)?;
    let in_first = |node: usize| network.space().b1().map_or(false, |b1| node < b1);
    let keep_tail = match anchor {
        Anchor::Tail => true,
        Anchor::Head => false,
        Anchor::FirstPartition => in_first(edge.tail),
        Anchor::SecondPartition => !in_first(edge.tail),
    };
    let node = random_node(network, rng);
    let moved = if keep_tail {
        fresh(network, edge.tail, node)?
    } else {
        fresh(network, node, edge.head)?
    };
    Ok(vec![edge, moved])
}

fn degree_dist_move(
    network: &Network,
    side: DistSide,
    rng: &mut RngHandle,
) -> Result<Vec<Dyad>, RejectReason> {
    let edge = random_edge(network, rng)?;
    let move_head = match side {
        DistSide::Head => true,
        DistSide::Tail => false,
        DistSide::Either => rng.below(2) == 0,
    };
    let (anchor, moving) = if move_head {
        (edge.tail, edge.head)
    } else {
        (edge.head, edge.tail)
    };
    let degree = |node: usize| match side {
        DistSide::Head => network.in_degree(node),
        DistSide::Tail => network.out_degree(node),
        DistSide::Either => network.degree(node),
    };
    let target = random_node(network, rng);
    if target == moving || (side == DistSide::Either && target == anchor) {
        return Err(RejectReason::Invalid);
    }
    if degree(target) + 1 != degree(moving) {
        return Err(RejectReason::Invalid);
    }
    let moved = if move_head {
        fresh(network, anchor, target)?
    } else {
        fresh(network, target, anchor)?
    };
    Ok(vec![edge, moved])
}
