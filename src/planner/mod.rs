//! Build planner: the ability-tree pipeline wired into one compute graph
//!
//! ```text
//! player-class ──► atree ──► atree-validate ──► atree-merged ──► atree-spells ──► spell-select:<id>
//!                    ▲             ▲   ▲              │                                   │
//!        atree-state ┘─────────────┘   └ level        ├──► atree-controls ─┐              ▼
//!                                                     └──► atree-stats ◄───┴──────► spell-sheet:<id>
//!                                          build, control-state ┘
//! ```
//!
//! Edits replace input values and mark everything below them dirty; the
//! next [`BuildPlanner::refresh`] recomputes only what they touched.

pub mod factory;
pub mod nodes;
pub mod values;

use serde::Serialize;
use std::collections::BTreeSet;
use std::rc::Rc;

use crate::atree::{AbilityCatalog, ActivationState, ValidationReport};
use crate::compose::{ControlSet, ControlState, MergedAbilities, SpellMap, StatDelta, StatMap};
use crate::core::config::PlannerConfig;
use crate::core::error::{PlannerError, Result};
use crate::core::types::{AbilityId, PlayerClass};
use crate::graph::{ComputeError, ComputeGraph, GraphError, NodeId, Outcome};

pub use factory::{Reconciliation, SpellNodeFactory, SpellSheet};
pub use values::PlannerValue;

use nodes::{
    ControlsNode, MergeNode, SpellsNode, StatsNode, TreeBuildNode, ValidateNode, CLASS, CONTROLS, CONTROL_VALUES,
    ITEM_STATS, LEVEL, MERGED, SELECTION, SPELLS, STATS, TREE, VALIDATION,
};

/// Everything one refresh produced, owned by the caller
#[derive(Debug, Clone, Serialize)]
pub struct PlannerSnapshot {
    pub class: PlayerClass,
    /// Tree nodes with every ancestor first
    pub tree_order: Vec<AbilityId>,
    pub validation: ValidationReport,
    pub merged: MergedAbilities,
    pub spells: SpellMap,
    pub controls: ControlSet,
    pub stats: StatDelta,
    pub sheets: Vec<SpellSheet>,
    /// Why slider and toggle discovery failed, if it did
    pub controls_error: Option<String>,
    /// Why spell composition failed, if it did
    pub composition_error: Option<String>,
    /// Why stat aggregation failed, if it did
    pub stats_error: Option<String>,
}

struct NodeIds {
    class: NodeId,
    level: NodeId,
    selection: NodeId,
    item_stats: NodeId,
    control_values: NodeId,
    tree: NodeId,
    validation: NodeId,
    merged: NodeId,
    spells: NodeId,
    controls: NodeId,
    stats: NodeId,
}

pub struct BuildPlanner {
    graph: ComputeGraph<PlannerValue>,
    ids: NodeIds,
    factory: SpellNodeFactory,
    class: PlayerClass,
    selection: ActivationState,
    control_values: ControlState,
    config: Rc<PlannerConfig>,
}

impl BuildPlanner {
    /// Wire up the graph for `catalog`, starting as a max-level Warrior
    pub fn new(catalog: AbilityCatalog, config: PlannerConfig) -> Result<Self> {
        let class = PlayerClass::Warrior;
        let config = Rc::new(config);
        let mut graph = ComputeGraph::new();

        let class_node = graph.add_source(CLASS, PlannerValue::Class(class));
        let level = graph.add_source(LEVEL, PlannerValue::Level(String::new()));
        let selection = graph.add_source(SELECTION, PlannerValue::Selection(ActivationState::default()));
        let item_stats = graph.add_source(ITEM_STATS, PlannerValue::ItemStats(StatMap::new()));
        let control_values = graph.add_source(CONTROL_VALUES, PlannerValue::ControlValues(ControlState::default()));

        let tree = graph.add_node(TREE, TreeBuildNode::new(Rc::new(catalog)));
        graph.link_to(tree, class_node, CLASS)?;

        let validation = graph.add_node(VALIDATION, ValidateNode::new(Rc::clone(&config)));
        graph.link_to(validation, tree, TREE)?;
        graph.link_to(validation, selection, SELECTION)?;
        graph.link_to(validation, level, LEVEL)?;

        let merged = graph.add_node(MERGED, MergeNode);
        graph.link_to(merged, class_node, CLASS)?;
        graph.link_to(merged, tree, TREE)?;
        graph.link_to(merged, validation, VALIDATION)?;

        let spells = graph.add_node(SPELLS, SpellsNode);
        graph.link_to(spells, merged, MERGED)?;
        graph.link_to(spells, validation, VALIDATION)?;
        graph.set_fail_soft(spells, true)?;

        let controls = graph.add_node(CONTROLS, ControlsNode);
        graph.link_to(controls, merged, MERGED)?;
        graph.set_fail_soft(controls, true)?;

        let stats = graph.add_node(STATS, StatsNode);
        graph.link_to(stats, merged, MERGED)?;
        graph.link_to(stats, item_stats, ITEM_STATS)?;
        graph.link_to(stats, controls, CONTROLS)?;
        graph.link_to(stats, control_values, CONTROL_VALUES)?;
        graph.set_fail_soft(stats, true)?;

        let mut planner = Self {
            graph,
            ids: NodeIds {
                class: class_node,
                level,
                selection,
                item_stats,
                control_values,
                tree,
                validation,
                merged,
                spells,
                controls,
                stats,
            },
            factory: SpellNodeFactory::new(spells, stats),
            class,
            selection: ActivationState::default(),
            control_values: ControlState::default(),
            config,
        };
        planner.set_class(class)?;
        Ok(planner)
    }

    pub fn class(&self) -> PlayerClass {
        self.class
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn selection(&self) -> &ActivationState {
        &self.selection
    }

    /// Switch class: rebuild the tree and start from an empty selection
    pub fn set_class(&mut self, class: PlayerClass) -> Result<()> {
        self.class = class;
        self.graph.set_value(self.ids.class, PlannerValue::Class(class))?;
        let outcome = self.graph.update(self.ids.tree)?;
        let tree = ready(&outcome, TREE)?.as_tree().map_err(|e| compute_failed(TREE, e.message()))?;
        self.selection = ActivationState::for_tree(tree);
        tracing::info!(%class, nodes = tree.len(), "switched class");
        self.push_selection()
    }

    pub fn set_level(&mut self, level: impl Into<String>) -> Result<()> {
        self.graph.set_value(self.ids.level, PlannerValue::Level(level.into()))?;
        Ok(())
    }

    pub fn set_active(&mut self, id: AbilityId, active: bool) -> Result<()> {
        if !self.selection.set_active(id, active) {
            return Err(PlannerError::InvalidInput(format!("no ability {} in the {} tree", id, self.class)));
        }
        self.push_selection()
    }

    /// Flip one node; returns its new flag
    pub fn toggle(&mut self, id: AbilityId) -> Result<bool> {
        let active = self
            .selection
            .toggle(id)
            .ok_or_else(|| PlannerError::InvalidInput(format!("no ability {} in the {} tree", id, self.class)))?;
        self.push_selection()?;
        Ok(active)
    }

    pub fn set_slider(&mut self, name: impl Into<String>, value: f64) -> Result<()> {
        self.control_values.set_slider(name, value);
        self.push_control_values()
    }

    pub fn set_toggle(&mut self, label: impl Into<String>, on: bool) -> Result<()> {
        self.control_values.set_toggle(label, on);
        self.push_control_values()
    }

    pub fn set_item_stats(&mut self, stats: StatMap) -> Result<()> {
        self.graph.set_value(self.ids.item_stats, PlannerValue::ItemStats(stats))?;
        Ok(())
    }

    fn push_selection(&mut self) -> Result<()> {
        self.graph
            .set_value(self.ids.selection, PlannerValue::Selection(self.selection.clone()))?;
        Ok(())
    }

    fn push_control_values(&mut self) -> Result<()> {
        self.graph
            .set_value(self.ids.control_values, PlannerValue::ControlValues(self.control_values.clone()))?;
        Ok(())
    }

    /// Run one update pass and collect the results
    ///
    /// Per-spell nodes are reconciled against the freshly composed spell
    /// set before the sheets are brought up to date.
    pub fn refresh(&mut self) -> Result<PlannerSnapshot> {
        let tree_order = {
            let outcome = self.graph.update(self.ids.tree)?;
            ready(&outcome, TREE)?
                .as_tree()
                .map_err(|e| compute_failed(TREE, e.message()))?
                .order_ids()
        };

        let validation = self.fetch(self.ids.validation, VALIDATION, |v| v.as_validation().cloned())?;
        let merged = self.fetch(self.ids.merged, MERGED, |v| v.as_merged().cloned())?;

        let (controls, controls_error) = match self.graph.update(self.ids.controls)? {
            Outcome::Ready(value) => (
                value.as_controls().map_err(|e| compute_failed(CONTROLS, e.message()))?.clone(),
                None,
            ),
            Outcome::Failed(message) => (ControlSet::default(), Some(message.to_string())),
        };
        let (spells, composition_error) = match self.graph.update(self.ids.spells)? {
            Outcome::Ready(value) => (
                value.as_spells().map_err(|e| compute_failed(SPELLS, e.message()))?.clone(),
                None,
            ),
            Outcome::Failed(message) => (SpellMap::new(), Some(message.to_string())),
        };
        let (stats, stats_error) = match self.graph.update(self.ids.stats)? {
            Outcome::Ready(value) => (
                value.as_stats().map_err(|e| compute_failed(STATS, e.message()))?.clone(),
                None,
            ),
            Outcome::Failed(message) => (StatDelta::new(), Some(message.to_string())),
        };

        let wanted: BTreeSet<_> = spells.keys().copied().collect();
        self.factory.reconcile(&mut self.graph, &wanted)?;
        let sheets = self.factory.sheets(&mut self.graph)?;

        tracing::info!(
            class = %self.class,
            spent = validation.points_spent,
            cap = validation.ap_cap,
            errors = validation.errors.len(),
            spells = spells.len(),
            "refreshed build"
        );

        Ok(PlannerSnapshot {
            class: self.class,
            tree_order,
            validation,
            merged,
            spells,
            controls,
            stats,
            sheets,
            controls_error,
            composition_error,
            stats_error,
        })
    }

    fn fetch<T, F>(&mut self, id: NodeId, name: &str, extract: F) -> Result<T>
    where
        F: FnOnce(&PlannerValue) -> std::result::Result<T, ComputeError>,
    {
        let outcome = self.graph.update(id)?;
        extract(ready(&outcome, name)?).map_err(|e| compute_failed(name, e.message()))
    }
}

fn ready<'a>(outcome: &'a Outcome<PlannerValue>, name: &str) -> Result<&'a PlannerValue> {
    match outcome {
        Outcome::Ready(value) => Ok(&**value),
        Outcome::Failed(message) => Err(compute_failed(name, message)),
    }
}

fn compute_failed(node: &str, message: &str) -> PlannerError {
    PlannerError::Graph(GraphError::ComputeFailed {
        node: node.to_string(),
        message: message.to_string(),
    })
}
