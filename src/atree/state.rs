//! Which tree nodes the user has selected

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::atree::builder::AbilityTree;
use crate::core::types::AbilityId;

/// Per-node selection flags for one tree
///
/// Owned by whoever edits the build. The resolver only reads it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivationState {
    flags: BTreeMap<AbilityId, bool>,
}

impl ActivationState {
    /// Every node of the tree, all unselected
    pub fn for_tree(tree: &AbilityTree) -> Self {
        Self {
            flags: tree.iter().map(|node| (node.id(), false)).collect(),
        }
    }

    /// Same node set as `tree`, keeping the flags of nodes that survive
    pub fn rebuilt_for(&self, tree: &AbilityTree) -> Self {
        Self {
            flags: tree
                .iter()
                .map(|node| (node.id(), self.is_active(node.id())))
                .collect(),
        }
    }

    pub fn is_active(&self, id: AbilityId) -> bool {
        self.flags.get(&id).copied().unwrap_or(false)
    }

    pub fn contains(&self, id: AbilityId) -> bool {
        self.flags.contains_key(&id)
    }

    /// Returns false if the node is not part of this state
    pub fn set_active(&mut self, id: AbilityId, active: bool) -> bool {
        match self.flags.get_mut(&id) {
            Some(flag) => {
                *flag = active;
                true
            }
            None => false,
        }
    }

    /// Flip a node; returns the new flag, or `None` for an unknown node
    pub fn toggle(&mut self, id: AbilityId) -> Option<bool> {
        let flag = self.flags.get_mut(&id)?;
        *flag = !*flag;
        Some(*flag)
    }

    pub fn active_ids(&self) -> impl Iterator<Item = AbilityId> + '_ {
        self.flags
            .iter()
            .filter(|(_, active)| **active)
            .map(|(id, _)| *id)
    }

    pub fn active_count(&self) -> usize {
        self.active_ids().count()
    }
}
