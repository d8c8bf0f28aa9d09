//! Ability definitions as supplied by the tree data files

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::atree::effect::Effect;
use crate::core::types::AbilityId;

/// Where a node sits on the rendered tree grid
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayInfo {
    #[serde(default)]
    pub row: u32,
    #[serde(default)]
    pub col: u32,
    #[serde(default)]
    pub icon: String,
}

/// One node of a class's ability tree, immutable after load
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbilityDefinition {
    pub id: AbilityId,
    pub display_name: String,
    /// Description lines; a bare string in the data becomes one line
    #[serde(default, deserialize_with = "one_or_many")]
    pub desc: Vec<String>,
    /// Archetype tag; an empty string in the data means none
    #[serde(default, deserialize_with = "empty_as_none")]
    pub archetype: Option<String>,
    #[serde(default)]
    pub archetype_req: u32,
    /// Ability this node folds into instead of standing alone
    #[serde(default)]
    pub base_abil: Option<AbilityId>,
    #[serde(default)]
    pub parents: Vec<AbilityId>,
    /// Hard requirements: all must be active
    #[serde(default)]
    pub dependencies: Vec<AbilityId>,
    /// Mutual exclusions: none may be active
    #[serde(default)]
    pub blockers: Vec<AbilityId>,
    #[serde(default)]
    pub cost: u32,
    #[serde(default)]
    pub display: DisplayInfo,
    #[serde(default)]
    pub properties: BTreeMap<String, f64>,
    #[serde(default)]
    pub effects: Vec<Effect>,
}

impl AbilityDefinition {
    pub fn new(id: u32, display_name: impl Into<String>) -> Self {
        Self {
            id: AbilityId(id),
            display_name: display_name.into(),
            desc: Vec::new(),
            archetype: None,
            archetype_req: 0,
            base_abil: None,
            parents: Vec::new(),
            dependencies: Vec::new(),
            blockers: Vec::new(),
            cost: 0,
            display: DisplayInfo::default(),
            properties: BTreeMap::new(),
            effects: Vec::new(),
        }
    }

    pub fn with_parents(mut self, parents: &[u32]) -> Self {
        self.parents = parents.iter().map(|p| AbilityId(*p)).collect();
        self
    }

    pub fn with_dependencies(mut self, deps: &[u32]) -> Self {
        self.dependencies = deps.iter().map(|d| AbilityId(*d)).collect();
        self
    }

    pub fn with_blockers(mut self, blockers: &[u32]) -> Self {
        self.blockers = blockers.iter().map(|b| AbilityId(*b)).collect();
        self
    }

    pub fn with_cost(mut self, cost: u32) -> Self {
        self.cost = cost;
        self
    }

    pub fn with_archetype(mut self, archetype: impl Into<String>, required: u32) -> Self {
        self.archetype = Some(archetype.into());
        self.archetype_req = required;
        self
    }

    pub fn with_base(mut self, base: u32) -> Self {
        self.base_abil = Some(AbilityId(base));
        self
    }

    pub fn with_desc(mut self, line: impl Into<String>) -> Self {
        self.desc.push(line.into());
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: f64) -> Self {
        self.properties.insert(name.into(), value);
        self
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

/// Accept either a single value or a list of them
pub(crate) fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(value) => vec![value],
        OneOrMany::Many(values) => values,
    })
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}
