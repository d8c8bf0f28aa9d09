//! Fixed-point activation resolution
//!
//! Decides which selected nodes are legally active. Candidates are retried
//! round after round, since a node that fails only because its parent has
//! not been confirmed yet may pass once the parent is. Resolution stops when
//! a round confirms nothing new.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::atree::builder::{AbilityTree, TreeNode};
use crate::atree::state::ActivationState;
use crate::core::types::AbilityId;

/// Why a node cannot be active
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// Hard: named dependencies are not selected
    MissingDependencies { names: Vec<String> },
    /// Hard: named blockers are selected
    BlockedBy { names: Vec<String> },
    NotReachable,
    ArchetypeShortfall {
        archetype: String,
        have: u32,
        need: u32,
    },
    InsufficientPoints,
}

impl FailureReason {
    /// Hard failures are structural and cannot be fixed by spending points
    pub fn is_hard(&self) -> bool {
        matches!(
            self,
            FailureReason::MissingDependencies { .. } | FailureReason::BlockedBy { .. }
        )
    }
}

fn quoted(names: &[String]) -> String {
    names
        .iter()
        .map(|n| format!("\"{}\"", n))
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::MissingDependencies { names } => write!(f, "missing dep: {}", quoted(names)),
            FailureReason::BlockedBy { names } => write!(f, "blocked by: {}", quoted(names)),
            FailureReason::NotReachable => f.write_str("not reachable"),
            FailureReason::ArchetypeShortfall {
                archetype,
                have,
                need,
            } => write!(f, "{}: {} < {}", archetype, have, need),
            FailureReason::InsufficientPoints => f.write_str("not enough ability points left"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivationFailure {
    pub id: AbilityId,
    pub name: String,
    pub reason: FailureReason,
}

impl ActivationFailure {
    pub fn is_hard(&self) -> bool {
        self.reason.is_hard()
    }
}

impl fmt::Display for ActivationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.reason)
    }
}

/// Outcome of one resolver run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Resolution {
    /// Confirmed nodes in confirmation order
    pub confirmed: Vec<AbilityId>,
    /// Nodes that never confirmed, in tree order, with their last failure
    pub failures: Vec<ActivationFailure>,
    pub points_spent: u32,
    pub archetype_counts: BTreeMap<String, u32>,
    pub rounds: usize,
    #[serde(skip)]
    reachable: BTreeSet<AbilityId>,
}

impl Resolution {
    pub fn is_confirmed(&self, id: AbilityId) -> bool {
        self.reachable.contains(&id)
    }

    pub fn has_hard_failure(&self) -> bool {
        self.failures.iter().any(ActivationFailure::is_hard)
    }

    pub fn archetype_count(&self, archetype: &str) -> u32 {
        self.archetype_counts.get(archetype).copied().unwrap_or(0)
    }

    fn confirm(&mut self, node: &TreeNode) {
        let ability = node.ability();
        if let Some(archetype) = &ability.archetype {
            *self.archetype_counts.entry(archetype.clone()).or_insert(0) += 1;
        }
        self.points_spent += ability.cost;
        self.reachable.insert(node.id());
        self.confirmed.push(node.id());
    }
}

pub struct Resolver<'a> {
    tree: &'a AbilityTree,
    state: &'a ActivationState,
}

impl<'a> Resolver<'a> {
    pub fn new(tree: &'a AbilityTree, state: &'a ActivationState) -> Self {
        Self { tree, state }
    }

    /// Resolve every selected node of the tree against `budget`
    pub fn resolve(&self, budget: u32) -> Resolution {
        let selected: Vec<AbilityId> = self
            .tree
            .iter()
            .map(TreeNode::id)
            .filter(|id| self.state.is_active(*id))
            .collect();
        self.resolve_nodes(&selected, budget)
    }

    /// Resolve an explicit candidate list
    ///
    /// Candidates are checked in tree order whatever order they arrive in,
    /// so the result does not depend on the caller's ordering. Unknown ids
    /// and duplicates are ignored.
    pub fn resolve_nodes(&self, candidates: &[AbilityId], budget: u32) -> Resolution {
        let mut pending: Vec<&TreeNode> = candidates
            .iter()
            .filter_map(|id| self.tree.get(*id))
            .collect();
        pending.sort_by_key(|node| self.tree.rank(node.id()));
        pending.dedup_by_key(|node| node.id());

        let mut resolution = Resolution::default();
        let mut last_failure: Vec<FailureReason> = Vec::new();
        loop {
            resolution.rounds += 1;
            let before = pending.len();
            let mut still_pending = Vec::with_capacity(before);
            last_failure.clear();
            for node in pending {
                match self.check(node, &resolution, budget) {
                    Ok(()) => resolution.confirm(node),
                    Err(reason) => {
                        still_pending.push(node);
                        last_failure.push(reason);
                    }
                }
            }
            pending = still_pending;
            if pending.len() == before {
                break;
            }
        }

        resolution.failures = pending
            .into_iter()
            .zip(last_failure)
            .map(|(node, reason)| ActivationFailure {
                id: node.id(),
                name: node.ability().display_name.clone(),
                reason,
            })
            .collect();
        tracing::debug!(
            rounds = resolution.rounds,
            confirmed = resolution.confirmed.len(),
            failed = resolution.failures.len(),
            points = resolution.points_spent,
            budget,
            "resolved ability tree"
        );
        resolution
    }

    /// Could `node` be activated on top of what `progress` has confirmed?
    ///
    /// Checks run in a fixed order: dependencies, blockers, reachability,
    /// archetype count, then points. The first failing check is reported.
    pub fn check(&self, node: &TreeNode, progress: &Resolution, budget: u32) -> Result<(), FailureReason> {
        if node.is_root() {
            return Ok(());
        }
        let ability = node.ability();

        let missing: Vec<String> = ability
            .dependencies
            .iter()
            .filter(|dep| !self.state.is_active(**dep))
            .map(|dep| self.tree.display_name(*dep))
            .collect();
        if !missing.is_empty() {
            return Err(FailureReason::MissingDependencies { names: missing });
        }

        let blocking: Vec<String> = ability
            .blockers
            .iter()
            .filter(|blocker| self.state.is_active(**blocker))
            .map(|blocker| self.tree.display_name(*blocker))
            .collect();
        if !blocking.is_empty() {
            return Err(FailureReason::BlockedBy { names: blocking });
        }

        if !self
            .tree
            .parents(node)
            .any(|parent| progress.is_confirmed(parent.id()))
        {
            return Err(FailureReason::NotReachable);
        }

        if let Some(archetype) = &ability.archetype {
            if ability.archetype_req > 0 {
                let have = progress.archetype_count(archetype);
                if have < ability.archetype_req {
                    return Err(FailureReason::ArchetypeShortfall {
                        archetype: archetype.clone(),
                        have,
                        need: ability.archetype_req,
                    });
                }
            }
        }

        if progress.points_spent.saturating_add(ability.cost) > budget {
            return Err(FailureReason::InsufficientPoints);
        }
        Ok(())
    }
}
