//! Effects an ability contributes once active
//!
//! Each variant is matched exhaustively by the compositor and the stat
//! aggregator, so a new kind of effect cannot slip through unhandled.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::atree::definition::one_or_many;
use crate::compose::spell::SpellPart;
use crate::core::types::{AbilityId, Behavior, Element, SpellId, ELEMENT_COUNT};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Effect {
    /// Full spell override, field by field
    ReplaceSpell(SpellTemplate),
    /// Incremental change to one part of a spell, or to its cost
    AddSpellProp(AddSpellProp),
    /// Fold a part's elemental multipliers into a single element
    ConvertSpellConv(ConvertSpellConv),
    /// Flat bonuses, optionally behind a toggle
    RawStat(RawStat),
    /// Derived value from a slider or from item stats
    StatScaling(StatScaling),
}

/// Fields of a spell that a `replace_spell` effect sets
///
/// Absent fields leave whatever an earlier replacement put there.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpellTemplate {
    pub base_spell: SpellId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaling: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_atkspd: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parts: Option<Vec<SpellPart>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddSpellProp {
    pub base_spell: SpellId,
    /// Part to change; absent means a cost-only change
    #[serde(default)]
    pub target_part: Option<String>,
    #[serde(default)]
    pub behavior: Behavior,
    #[serde(default)]
    pub cost: f64,
    #[serde(default)]
    pub multipliers: Option<[f64; ELEMENT_COUNT]>,
    #[serde(default)]
    pub power: Option<f64>,
    #[serde(default)]
    pub hits: Option<BTreeMap<String, f64>>,
    /// Replaces the spell's displayed entry
    #[serde(default)]
    pub display: Option<String>,
}

/// The one change an `add_spell_prop` effect makes to a matching part
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PartDelta<'a> {
    Multipliers(&'a [f64; ELEMENT_COUNT]),
    Power(f64),
    Hits(&'a BTreeMap<String, f64>),
}

impl AddSpellProp {
    /// Every payload the effect carries; more than one is ambiguous input
    pub fn payloads(&self) -> Vec<PartDelta<'_>> {
        let mut found = Vec::new();
        if let Some(multipliers) = &self.multipliers {
            found.push(PartDelta::Multipliers(multipliers));
        }
        if let Some(power) = self.power {
            found.push(PartDelta::Power(power));
        }
        if let Some(hits) = &self.hits {
            found.push(PartDelta::Hits(hits));
        }
        found
    }
}

/// Part selector for element conversion
pub const ALL_PARTS: &str = "all";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvertSpellConv {
    pub base_spell: SpellId,
    /// Part name, or `"all"`
    pub target_part: String,
    pub conversion: Element,
}

impl ConvertSpellConv {
    pub fn targets_all(&self) -> bool {
        self.target_part == ALL_PARTS
    }
}

/// Whether a bonus or scaling target is a stat or an ability property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Stat,
    Prop,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatBonus {
    #[serde(rename = "type")]
    pub kind: TargetKind,
    #[serde(default)]
    pub abil: Option<AbilityId>,
    pub name: String,
    pub value: f64,
}

/// Toggle binding of a `raw_stat` effect
///
/// `true` binds to an anonymous toggle labelled by the owning ability,
/// a string binds to the toggle with that label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToggleBinding {
    Flag(bool),
    Named(String),
}

impl ToggleBinding {
    pub fn label(&self, owner_name: &str) -> Option<String> {
        match self {
            ToggleBinding::Flag(true) => Some(owner_name.to_string()),
            ToggleBinding::Flag(false) => None,
            ToggleBinding::Named(name) if name.is_empty() => None,
            ToggleBinding::Named(name) => Some(name.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawStat {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toggle: Option<ToggleBinding>,
    #[serde(default)]
    pub behavior: Behavior,
    #[serde(default)]
    pub bonuses: Vec<StatBonus>,
}

impl RawStat {
    pub fn toggle_label(&self, owner_name: &str) -> Option<String> {
        self.toggle.as_ref().and_then(|t| t.label(owner_name))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingTarget {
    #[serde(rename = "type")]
    pub kind: TargetKind,
    #[serde(default)]
    pub abil: Option<AbilityId>,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatScaling {
    #[serde(default)]
    pub slider: bool,
    #[serde(default)]
    pub slider_name: Option<String>,
    #[serde(default)]
    pub slider_step: Option<f64>,
    #[serde(default)]
    pub slider_behavior: Behavior,
    #[serde(default)]
    pub slider_max: Option<f64>,
    #[serde(default)]
    pub inputs: Vec<ScalingTarget>,
    /// Written targets; a single object in the data becomes a one-element list
    #[serde(default, deserialize_with = "one_or_many")]
    pub output: Vec<ScalingTarget>,
    #[serde(default)]
    pub scaling: Vec<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_variants_parse() {
        let json = r#"[
            {"type": "replace_spell", "base_spell": 1, "name": "Heal", "cost": 35,
             "parts": [{"name": "Heal", "power": 0.2}]},
            {"type": "add_spell_prop", "base_spell": 1, "target_part": "Heal", "power": 0.1},
            {"type": "convert_spell_conv", "base_spell": 3, "target_part": "all", "conversion": "Fire"},
            {"type": "raw_stat", "toggle": "Arcane Transfer",
             "bonuses": [{"type": "stat", "name": "sdPct", "value": 20}]},
            {"type": "stat_scaling", "slider": true, "slider_name": "Winded", "slider_max": 10,
             "output": {"type": "stat", "name": "sdPct"}, "scaling": [2]}
        ]"#;
        let effects: Vec<Effect> = serde_json::from_str(json).unwrap();
        assert_eq!(effects.len(), 5);
        assert!(matches!(&effects[0], Effect::ReplaceSpell(t) if t.cost == Some(35.0)));
        assert!(matches!(&effects[1], Effect::AddSpellProp(a) if a.behavior == Behavior::Merge));
        assert!(matches!(&effects[2], Effect::ConvertSpellConv(c) if c.targets_all()));
        match &effects[4] {
            Effect::StatScaling(s) => {
                assert!(s.slider);
                assert_eq!(s.output.len(), 1);
                assert_eq!(s.output[0].kind, TargetKind::Stat);
            }
            other => panic!("unexpected effect {:?}", other),
        }
    }

    #[test]
    fn test_unknown_effect_type_is_rejected() {
        let result: Result<Effect, _> =
            serde_json::from_str(r#"{"type": "teleport", "base_spell": 1}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_short_multiplier_vector_is_rejected() {
        let result: Result<Effect, _> = serde_json::from_str(
            r#"{"type": "add_spell_prop", "base_spell": 1, "target_part": "x", "multipliers": [1, 2]}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_payloads_counts_every_kind() {
        let mut prop = AddSpellProp {
            power: Some(1.0),
            ..Default::default()
        };
        assert_eq!(prop.payloads(), vec![PartDelta::Power(1.0)]);
        prop.multipliers = Some([0.0; ELEMENT_COUNT]);
        assert_eq!(prop.payloads().len(), 2);
    }

    #[test]
    fn test_toggle_labels() {
        assert_eq!(ToggleBinding::Flag(true).label("Rage"), Some("Rage".to_string()));
        assert_eq!(ToggleBinding::Flag(false).label("Rage"), None);
        assert_eq!(ToggleBinding::Named("Focus".into()).label("Rage"), Some("Focus".to_string()));
        assert_eq!(ToggleBinding::Named(String::new()).label("Rage"), None);
    }
}
