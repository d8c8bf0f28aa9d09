//! Per-spell subgraphs
//!
//! Each composed spell gets two nodes: a selector pulling that spell out of
//! the composed map, and a sheet combining it with the stat delta. When the
//! spell set changes only the nodes of spells that appeared or disappeared
//! are touched; surviving spells keep their nodes and simply recompute.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::compose::{Spell, StatDelta};
use crate::core::types::SpellId;
use crate::graph::{Compute, ComputeError, ComputeGraph, GraphError, Inputs, NodeId};
use crate::planner::nodes::{SPELLS, STATS};
use crate::planner::values::PlannerValue;

const SPELL: &str = "spell";

/// A spell as displayed, with stat-driven adjustments applied
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpellSheet {
    pub spell: Spell,
    /// `spRaw<id>` delta folded into the cost
    pub cost_delta: f64,
}

impl SpellSheet {
    pub fn new(spell: &Spell, stats: Option<&StatDelta>) -> Self {
        let key = format!("spRaw{}", spell.base_spell);
        let cost_delta = stats.and_then(|s| s.get(&key)).unwrap_or(0.0);
        let mut spell = spell.clone();
        if let Some(cost) = &mut spell.cost {
            *cost += cost_delta;
        }
        Self { spell, cost_delta }
    }

    pub fn id(&self) -> SpellId {
        self.spell.base_spell
    }
}

/// Picks one spell out of the composed map
pub struct SpellSelectNode {
    id: SpellId,
}

impl Compute<PlannerValue> for SpellSelectNode {
    fn compute(&mut self, inputs: &Inputs<PlannerValue>) -> Result<PlannerValue, ComputeError> {
        let spells = inputs.value(SPELLS)?.as_spells()?;
        let spell = spells
            .get(&self.id)
            .ok_or_else(|| ComputeError::msg(format_args!("spell {} is gone", self.id)))?;
        Ok(PlannerValue::Spell(spell.clone()))
    }
}

pub struct SpellSheetNode;

impl Compute<PlannerValue> for SpellSheetNode {
    fn compute(&mut self, inputs: &Inputs<PlannerValue>) -> Result<PlannerValue, ComputeError> {
        let spell = inputs.value(SPELL)?.as_spell()?;
        // a failed stat pass still shows the spell, just without cost changes
        let stats = inputs.value_or_failed(STATS)?.map(PlannerValue::as_stats).transpose()?;
        Ok(PlannerValue::Sheet(SpellSheet::new(spell, stats)))
    }
}

#[derive(Debug, Clone, Copy)]
struct SpellNodes {
    select: NodeId,
    sheet: NodeId,
}

/// What one reconciliation changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub added: Vec<SpellId>,
    pub removed: Vec<SpellId>,
}

impl Reconciliation {
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Keeps one subgraph per composed spell, keyed by spell id
pub struct SpellNodeFactory {
    spells_node: NodeId,
    stats_node: NodeId,
    nodes: BTreeMap<SpellId, SpellNodes>,
}

impl SpellNodeFactory {
    pub fn new(spells_node: NodeId, stats_node: NodeId) -> Self {
        Self {
            spells_node,
            stats_node,
            nodes: BTreeMap::new(),
        }
    }

    /// Spell ids that currently have nodes, ascending
    pub fn spell_ids(&self) -> Vec<SpellId> {
        self.nodes.keys().copied().collect()
    }

    pub fn sheet_node(&self, id: SpellId) -> Option<NodeId> {
        self.nodes.get(&id).map(|nodes| nodes.sheet)
    }

    /// Make the node set match `wanted`
    pub fn reconcile(
        &mut self,
        graph: &mut ComputeGraph<PlannerValue>,
        wanted: &BTreeSet<SpellId>,
    ) -> Result<Reconciliation, GraphError> {
        let mut change = Reconciliation::default();

        let stale: Vec<SpellId> = self.nodes.keys().filter(|id| !wanted.contains(id)).copied().collect();
        for id in stale {
            if let Some(nodes) = self.nodes.remove(&id) {
                graph.remove_node(nodes.sheet)?;
                graph.remove_node(nodes.select)?;
            }
            change.removed.push(id);
        }

        for id in wanted {
            if self.nodes.contains_key(id) {
                continue;
            }
            let select = graph.add_node(format!("spell-select:{}", id), SpellSelectNode { id: *id });
            graph.link_to(select, self.spells_node, SPELLS)?;
            let sheet = graph.add_node(format!("spell-sheet:{}", id), SpellSheetNode);
            graph.link_to(sheet, select, SPELL)?;
            graph.link_to(sheet, self.stats_node, STATS)?;
            self.nodes.insert(*id, SpellNodes { select, sheet });
            change.added.push(*id);
        }

        if !change.is_noop() {
            tracing::debug!(added = ?change.added, removed = ?change.removed, "reconciled spell nodes");
        }
        Ok(change)
    }

    /// Bring every sheet up to date, in spell id order
    pub fn sheets(&self, graph: &mut ComputeGraph<PlannerValue>) -> Result<Vec<SpellSheet>, GraphError> {
        let mut sheets = Vec::with_capacity(self.nodes.len());
        for nodes in self.nodes.values() {
            if let Some(value) = graph.update(nodes.sheet)?.value() {
                if let Ok(sheet) = value.as_sheet() {
                    sheets.push(sheet.clone());
                }
            }
        }
        Ok(sheets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::SpellMap;

    fn spells(ids: &[u32]) -> SpellMap {
        ids.iter()
            .map(|id| {
                let spell = Spell {
                    base_spell: SpellId(*id),
                    name: format!("Spell {}", id),
                    cost: Some(40.0),
                    ..Default::default()
                };
                (SpellId(*id), spell)
            })
            .collect()
    }

    fn wanted(map: &SpellMap) -> BTreeSet<SpellId> {
        map.keys().copied().collect()
    }

    #[test]
    fn test_only_changed_ids_are_rebuilt() {
        let mut graph = ComputeGraph::new();
        let first = spells(&[1, 2]);
        let spells_node = graph.add_source(SPELLS, PlannerValue::Spells(first.clone()));
        let stats_node = graph.add_source(STATS, PlannerValue::Stats(StatDelta::new()));
        let mut factory = SpellNodeFactory::new(spells_node, stats_node);

        let change = factory.reconcile(&mut graph, &wanted(&first)).unwrap();
        assert_eq!(change.added, vec![SpellId(1), SpellId(2)]);
        let kept = factory.sheet_node(SpellId(2)).unwrap();

        let second = spells(&[2, 3]);
        graph.set_value(spells_node, PlannerValue::Spells(second.clone())).unwrap();
        let change = factory.reconcile(&mut graph, &wanted(&second)).unwrap();
        assert_eq!(change.added, vec![SpellId(3)]);
        assert_eq!(change.removed, vec![SpellId(1)]);
        assert_eq!(factory.sheet_node(SpellId(2)), Some(kept));
        assert!(factory.reconcile(&mut graph, &wanted(&second)).unwrap().is_noop());

        // two sources plus two nodes per spell
        assert_eq!(graph.len(), 6);
        let sheets = factory.sheets(&mut graph).unwrap();
        assert_eq!(sheets.iter().map(SpellSheet::id).collect::<Vec<_>>(), vec![SpellId(2), SpellId(3)]);
    }

    #[test]
    fn test_sheet_adds_raw_cost_delta() {
        let mut delta = StatDelta::new();
        delta.merge("spRaw1", -5.0);
        let map = spells(&[1]);
        let spell = &map[&SpellId(1)];
        let sheet = SpellSheet::new(spell, Some(&delta));
        assert_eq!(sheet.spell.cost, Some(35.0));
        assert_eq!(sheet.cost_delta, -5.0);
        assert_eq!(SpellSheet::new(spell, None).spell.cost, Some(40.0));
    }
}
