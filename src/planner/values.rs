//! Values flowing through the planner's compute graph

use crate::atree::{AbilityTree, ActivationState, ValidationReport};
use crate::compose::{ControlSet, ControlState, MergedAbilities, Spell, SpellMap, StatDelta, StatMap};
use crate::core::types::PlayerClass;
use crate::graph::ComputeError;
use crate::planner::factory::SpellSheet;

/// One published value of the planner graph
///
/// Every node publishes exactly one variant; the typed accessors turn a
/// wiring mistake into a compute error instead of a panic.
#[derive(Debug, Clone)]
pub enum PlannerValue {
    Class(PlayerClass),
    /// Level exactly as entered
    Level(String),
    Selection(ActivationState),
    ItemStats(StatMap),
    ControlValues(ControlState),
    Tree(AbilityTree),
    Validation(ValidationReport),
    Merged(MergedAbilities),
    Spells(SpellMap),
    Controls(ControlSet),
    Stats(StatDelta),
    Spell(Spell),
    Sheet(SpellSheet),
}

impl PlannerValue {
    pub fn kind(&self) -> &'static str {
        match self {
            PlannerValue::Class(_) => "class",
            PlannerValue::Level(_) => "level",
            PlannerValue::Selection(_) => "selection",
            PlannerValue::ItemStats(_) => "item stats",
            PlannerValue::ControlValues(_) => "control values",
            PlannerValue::Tree(_) => "tree",
            PlannerValue::Validation(_) => "validation",
            PlannerValue::Merged(_) => "merged abilities",
            PlannerValue::Spells(_) => "spells",
            PlannerValue::Controls(_) => "controls",
            PlannerValue::Stats(_) => "stats",
            PlannerValue::Spell(_) => "spell",
            PlannerValue::Sheet(_) => "spell sheet",
        }
    }

    fn mismatch(&self, expected: &str) -> ComputeError {
        ComputeError::msg(format_args!("expected {}, got {}", expected, self.kind()))
    }

    pub fn as_class(&self) -> Result<PlayerClass, ComputeError> {
        match self {
            PlannerValue::Class(class) => Ok(*class),
            other => Err(other.mismatch("class")),
        }
    }

    pub fn as_level(&self) -> Result<&str, ComputeError> {
        match self {
            PlannerValue::Level(level) => Ok(level),
            other => Err(other.mismatch("level")),
        }
    }

    pub fn as_selection(&self) -> Result<&ActivationState, ComputeError> {
        match self {
            PlannerValue::Selection(state) => Ok(state),
            other => Err(other.mismatch("selection")),
        }
    }

    pub fn as_item_stats(&self) -> Result<&StatMap, ComputeError> {
        match self {
            PlannerValue::ItemStats(stats) => Ok(stats),
            other => Err(other.mismatch("item stats")),
        }
    }

    pub fn as_control_values(&self) -> Result<&ControlState, ComputeError> {
        match self {
            PlannerValue::ControlValues(values) => Ok(values),
            other => Err(other.mismatch("control values")),
        }
    }

    pub fn as_tree(&self) -> Result<&AbilityTree, ComputeError> {
        match self {
            PlannerValue::Tree(tree) => Ok(tree),
            other => Err(other.mismatch("tree")),
        }
    }

    pub fn as_validation(&self) -> Result<&ValidationReport, ComputeError> {
        match self {
            PlannerValue::Validation(report) => Ok(report),
            other => Err(other.mismatch("validation")),
        }
    }

    pub fn as_merged(&self) -> Result<&MergedAbilities, ComputeError> {
        match self {
            PlannerValue::Merged(merged) => Ok(merged),
            other => Err(other.mismatch("merged abilities")),
        }
    }

    pub fn as_spells(&self) -> Result<&SpellMap, ComputeError> {
        match self {
            PlannerValue::Spells(spells) => Ok(spells),
            other => Err(other.mismatch("spells")),
        }
    }

    pub fn as_controls(&self) -> Result<&ControlSet, ComputeError> {
        match self {
            PlannerValue::Controls(controls) => Ok(controls),
            other => Err(other.mismatch("controls")),
        }
    }

    pub fn as_stats(&self) -> Result<&StatDelta, ComputeError> {
        match self {
            PlannerValue::Stats(stats) => Ok(stats),
            other => Err(other.mismatch("stats")),
        }
    }

    pub fn as_spell(&self) -> Result<&Spell, ComputeError> {
        match self {
            PlannerValue::Spell(spell) => Ok(spell),
            other => Err(other.mismatch("spell")),
        }
    }

    pub fn as_sheet(&self) -> Result<&SpellSheet, ComputeError> {
        match self {
            PlannerValue::Sheet(sheet) => Ok(sheet),
            other => Err(other.mismatch("spell sheet")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessor_mismatch_is_an_error() {
        let value = PlannerValue::Level("80".to_string());
        assert_eq!(value.as_level().unwrap(), "80");
        let err = value.as_tree().unwrap_err();
        assert_eq!(err.message(), "expected tree, got level");
    }
}
