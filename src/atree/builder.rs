//! Linked ability tree and its evaluation order
//!
//! Nodes live in an arena and refer to their neighbours by index, so several
//! nodes can share a parent or child without owning it.

use ahash::AHashMap;
use thiserror::Error;

use crate::atree::definition::AbilityDefinition;
use crate::core::types::AbilityId;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    #[error("ability tree has no root (every node has a parent)")]
    NoRoot,

    #[error("ability tree has more than one root: {0:?}")]
    MultipleRoots(Vec<AbilityId>),

    #[error("duplicate ability id {0}")]
    DuplicateId(AbilityId),

    #[error("ability {node} lists unknown {relation} {target}")]
    DanglingReference {
        node: AbilityId,
        relation: &'static str,
        target: AbilityId,
    },

    #[error("cycle in ability tree through {0}")]
    Cycle(AbilityId),

    #[error("ability {0} is not reachable from the root")]
    Unreachable(AbilityId),
}

/// One ability plus its links into the tree
#[derive(Debug, Clone)]
pub struct TreeNode {
    ability: AbilityDefinition,
    parents: Vec<usize>,
    children: Vec<usize>,
}

impl TreeNode {
    pub fn ability(&self) -> &AbilityDefinition {
        &self.ability
    }

    pub fn id(&self) -> AbilityId {
        self.ability.id
    }

    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Ability graph of one class in topological order
#[derive(Debug, Clone, Default)]
pub struct AbilityTree {
    /// Definition order
    nodes: Vec<TreeNode>,
    index: AHashMap<AbilityId, usize>,
    /// Ancestors before descendants
    order: Vec<usize>,
    /// Position of each node (by arena index) in `order`
    rank: Vec<usize>,
}

impl AbilityTree {
    /// Link a flat definition list and sort it
    ///
    /// An empty list gives an empty tree. Otherwise there must be exactly one
    /// root, every reference must resolve, and every node must be reachable
    /// from the root without passing through a cycle.
    pub fn build(definitions: Vec<AbilityDefinition>) -> Result<Self, BuildError> {
        if definitions.is_empty() {
            return Ok(Self::default());
        }

        let mut index = AHashMap::with_capacity(definitions.len());
        for (idx, def) in definitions.iter().enumerate() {
            if index.insert(def.id, idx).is_some() {
                return Err(BuildError::DuplicateId(def.id));
            }
        }

        let mut nodes: Vec<TreeNode> = definitions
            .into_iter()
            .map(|ability| TreeNode {
                ability,
                parents: Vec::new(),
                children: Vec::new(),
            })
            .collect();

        for idx in 0..nodes.len() {
            let id = nodes[idx].id();
            let resolve = |relation: &'static str, target: AbilityId| {
                index.get(&target).copied().ok_or(BuildError::DanglingReference {
                    node: id,
                    relation,
                    target,
                })
            };
            for dep in &nodes[idx].ability.dependencies {
                resolve("dependency", *dep)?;
            }
            for blocker in &nodes[idx].ability.blockers {
                resolve("blocker", *blocker)?;
            }
            let parent_ids = nodes[idx].ability.parents.clone();
            for parent_id in parent_ids {
                let parent = resolve("parent", parent_id)?;
                nodes[idx].parents.push(parent);
                nodes[parent].children.push(idx);
            }
        }

        let roots: Vec<usize> = (0..nodes.len()).filter(|i| nodes[*i].is_root()).collect();
        let root = match roots.as_slice() {
            [] => return Err(BuildError::NoRoot),
            [root] => *root,
            _ => {
                return Err(BuildError::MultipleRoots(
                    roots.iter().map(|i| nodes[*i].id()).collect(),
                ))
            }
        };

        let mut tree = Self {
            nodes,
            index,
            order: Vec::new(),
            rank: Vec::new(),
        };
        tree.sort_from(root)?;
        tracing::debug!(
            nodes = tree.nodes.len(),
            root = %tree.nodes[root].id(),
            "built ability tree"
        );
        Ok(tree)
    }

    fn sort_from(&mut self, root: usize) -> Result<(), BuildError> {
        let mut marks = vec![Mark::Unvisited; self.nodes.len()];
        let mut finished = Vec::with_capacity(self.nodes.len());
        self.visit(root, &mut marks, &mut finished)?;

        if let Some(stray) = marks.iter().position(|m| *m == Mark::Unvisited) {
            return Err(BuildError::Unreachable(self.nodes[stray].id()));
        }

        // finished holds descendants first
        finished.reverse();
        let mut rank = vec![0; self.nodes.len()];
        for (position, idx) in finished.iter().enumerate() {
            rank[*idx] = position;
        }
        self.order = finished;
        self.rank = rank;
        Ok(())
    }

    fn visit(&self, idx: usize, marks: &mut [Mark], finished: &mut Vec<usize>) -> Result<(), BuildError> {
        match marks[idx] {
            Mark::Done => return Ok(()),
            Mark::InProgress => return Err(BuildError::Cycle(self.nodes[idx].id())),
            Mark::Unvisited => {}
        }
        marks[idx] = Mark::InProgress;
        // reversed so that siblings come out in definition order
        for child in self.nodes[idx].children.iter().rev() {
            self.visit(*child, marks, finished)?;
        }
        marks[idx] = Mark::Done;
        finished.push(idx);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: AbilityId) -> Option<&TreeNode> {
        self.index.get(&id).map(|idx| &self.nodes[*idx])
    }

    pub fn contains(&self, id: AbilityId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn root(&self) -> Option<&TreeNode> {
        self.order.first().map(|idx| &self.nodes[*idx])
    }

    /// Nodes with every ancestor ahead of its descendants
    pub fn iter(&self) -> impl Iterator<Item = &TreeNode> + '_ {
        self.order.iter().map(|idx| &self.nodes[*idx])
    }

    pub fn order_ids(&self) -> Vec<AbilityId> {
        self.iter().map(TreeNode::id).collect()
    }

    /// Position of a node in the topological order
    pub fn rank(&self, id: AbilityId) -> Option<usize> {
        self.index.get(&id).map(|idx| self.rank[*idx])
    }

    pub fn parents<'a>(&'a self, node: &'a TreeNode) -> impl Iterator<Item = &'a TreeNode> + 'a {
        node.parents.iter().map(|idx| &self.nodes[*idx])
    }

    pub fn children<'a>(&'a self, node: &'a TreeNode) -> impl Iterator<Item = &'a TreeNode> + 'a {
        node.children.iter().map(|idx| &self.nodes[*idx])
    }

    /// Display name for an id, falling back to the number
    pub fn display_name(&self, id: AbilityId) -> String {
        self.get(id)
            .map(|node| node.ability.display_name.clone())
            .unwrap_or_else(|| id.to_string())
    }
}
