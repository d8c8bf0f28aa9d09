//! Compute nodes of the planner graph
//!
//! Slot names match the names the nodes are registered under, so a node
//! reads `inputs.value("atree-merged")` from the node called `atree-merged`.

use std::rc::Rc;

use crate::atree::{validate, AbilityCatalog, AbilityTree};
use crate::compose::{aggregate_stats, compose_spells, merge_abilities, ControlSet, SpellMap, StatContext};
use crate::core::config::PlannerConfig;
use crate::graph::{Compute, ComputeError, Inputs};
use crate::planner::values::PlannerValue;

pub const CLASS: &str = "player-class";
pub const LEVEL: &str = "level";
pub const SELECTION: &str = "atree-state";
pub const ITEM_STATS: &str = "build";
pub const CONTROL_VALUES: &str = "control-state";
pub const TREE: &str = "atree";
pub const VALIDATION: &str = "atree-validate";
pub const MERGED: &str = "atree-merged";
pub const SPELLS: &str = "atree-spells";
pub const CONTROLS: &str = "atree-controls";
pub const STATS: &str = "atree-stats";

/// Links the definitions of the current class into a tree
pub struct TreeBuildNode {
    catalog: Rc<AbilityCatalog>,
}

impl TreeBuildNode {
    pub fn new(catalog: Rc<AbilityCatalog>) -> Self {
        Self { catalog }
    }
}

impl Compute<PlannerValue> for TreeBuildNode {
    fn compute(&mut self, inputs: &Inputs<PlannerValue>) -> Result<PlannerValue, ComputeError> {
        let class = inputs.value(CLASS)?.as_class()?;
        let tree = AbilityTree::build(self.catalog.definitions(class).to_vec())?;
        Ok(PlannerValue::Tree(tree))
    }
}

pub struct ValidateNode {
    config: Rc<PlannerConfig>,
}

impl ValidateNode {
    pub fn new(config: Rc<PlannerConfig>) -> Self {
        Self { config }
    }
}

impl Compute<PlannerValue> for ValidateNode {
    fn compute(&mut self, inputs: &Inputs<PlannerValue>) -> Result<PlannerValue, ComputeError> {
        let tree = inputs.value(TREE)?.as_tree()?;
        let state = inputs.value(SELECTION)?.as_selection()?;
        let level = inputs.value(LEVEL)?.as_level()?;
        Ok(PlannerValue::Validation(validate(tree, state, level, &self.config)))
    }
}

/// Merges the nodes that passed validation
pub struct MergeNode;

impl Compute<PlannerValue> for MergeNode {
    fn compute(&mut self, inputs: &Inputs<PlannerValue>) -> Result<PlannerValue, ComputeError> {
        let class = inputs.value(CLASS)?.as_class()?;
        let tree = inputs.value(TREE)?.as_tree()?;
        let report = inputs.value(VALIDATION)?.as_validation()?;
        let merged = merge_abilities(class, tree, |id| report.is_confirmed(id));
        Ok(PlannerValue::Merged(merged))
    }
}

/// Composes spells; publishes nothing for a build with a hard error
pub struct SpellsNode;

impl Compute<PlannerValue> for SpellsNode {
    fn compute(&mut self, inputs: &Inputs<PlannerValue>) -> Result<PlannerValue, ComputeError> {
        let report = inputs.value(VALIDATION)?.as_validation()?;
        if report.hard_error {
            return Ok(PlannerValue::Spells(SpellMap::new()));
        }
        let merged = inputs.value(MERGED)?.as_merged()?;
        Ok(PlannerValue::Spells(compose_spells(merged)?))
    }
}

pub struct ControlsNode;

impl Compute<PlannerValue> for ControlsNode {
    fn compute(&mut self, inputs: &Inputs<PlannerValue>) -> Result<PlannerValue, ComputeError> {
        let merged = inputs.value(MERGED)?.as_merged()?;
        Ok(PlannerValue::Controls(ControlSet::collect(merged)?))
    }
}

pub struct StatsNode;

impl Compute<PlannerValue> for StatsNode {
    fn compute(&mut self, inputs: &Inputs<PlannerValue>) -> Result<PlannerValue, ComputeError> {
        let merged = inputs.value(MERGED)?.as_merged()?;
        let ctx = StatContext {
            item_stats: inputs.value(ITEM_STATS)?.as_item_stats()?,
            controls: inputs.value(CONTROLS)?.as_controls()?,
            state: inputs.value(CONTROL_VALUES)?.as_control_values()?,
        };
        Ok(PlannerValue::Stats(aggregate_stats(merged, &ctx)?))
    }
}
