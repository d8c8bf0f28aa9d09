//! Spell composition over merged abilities
//!
//! Two passes, in this order:
//!
//! 1. Every `replace_spell` effect sets the fields it defines on its spell,
//!    creating the spell if needed. Later abilities win field by field.
//! 2. `add_spell_prop` and `convert_spell_conv` effects adjust the spells
//!    produced by pass 1, in merged-ability order.
//!
//! The map is built from scratch on every call; nothing from an earlier
//! composition is reused.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::atree::effect::{AddSpellProp, ConvertSpellConv, Effect, PartDelta, SpellTemplate};
use crate::compose::error::ComposeError;
use crate::compose::merge::MergedAbilities;
use crate::core::types::{AbilityId, Behavior, SpellId, ELEMENT_COUNT};

/// Named sub-component of a spell
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpellPart {
    pub name: String,
    /// Damage multipliers per element, slot 0 neutral
    #[serde(default)]
    pub multipliers: [f64; ELEMENT_COUNT],
    /// Healing power
    #[serde(default)]
    pub power: f64,
    /// Hit counts of other parts, for parts that total several hits
    #[serde(default)]
    pub hits: BTreeMap<String, f64>,
}

impl SpellPart {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_multipliers(name: impl Into<String>, multipliers: [f64; ELEMENT_COUNT]) -> Self {
        Self {
            multipliers,
            ..Self::named(name)
        }
    }

    fn apply(&mut self, delta: PartDelta<'_>) {
        match delta {
            PartDelta::Multipliers(add) => {
                for (slot, value) in self.multipliers.iter_mut().zip(add) {
                    *slot += value;
                }
            }
            PartDelta::Power(power) => self.power += power,
            PartDelta::Hits(hits) => {
                for (name, count) in hits {
                    *self.hits.entry(name.clone()).or_insert(0.0) += count;
                }
            }
        }
    }

    /// Move every elemental multiplier into `slot`, leaving neutral alone
    pub fn convert_to(&mut self, slot: usize) {
        let total: f64 = self.multipliers[1..].iter().sum();
        for value in &mut self.multipliers[1..] {
            *value = 0.0;
        }
        self.multipliers[slot] += total;
    }
}

/// A composed spell
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Spell {
    pub base_spell: SpellId,
    pub name: String,
    /// Mana cost; spells without one ignore cost deltas
    pub cost: Option<f64>,
    /// Name of the part shown as the spell's headline number
    pub display: String,
    pub scaling: Option<String>,
    pub use_atkspd: bool,
    pub parts: Vec<SpellPart>,
}

impl Spell {
    pub fn from_template(template: &SpellTemplate) -> Self {
        let mut spell = Self {
            base_spell: template.base_spell,
            ..Default::default()
        };
        spell.apply_replace(template);
        spell
    }

    /// Overwrite every field the template defines
    pub fn apply_replace(&mut self, template: &SpellTemplate) {
        if let Some(name) = &template.name {
            self.name = name.clone();
        }
        if let Some(cost) = template.cost {
            self.cost = Some(cost);
        }
        if let Some(display) = &template.display {
            self.display = display.clone();
        }
        if let Some(scaling) = &template.scaling {
            self.scaling = Some(scaling.clone());
        }
        if let Some(use_atkspd) = template.use_atkspd {
            self.use_atkspd = use_atkspd;
        }
        if let Some(parts) = &template.parts {
            self.parts = parts.clone();
        }
    }

    pub fn part(&self, name: &str) -> Option<&SpellPart> {
        self.parts.iter().find(|part| part.name == name)
    }

    /// Apply an incremental change from ability `owner`
    pub fn apply_add(&mut self, owner: AbilityId, prop: &AddSpellProp) -> Result<(), ComposeError> {
        if let Some(cost) = &mut self.cost {
            *cost += prop.cost;
        }
        let Some(target) = &prop.target_part else {
            return Ok(());
        };
        if let Some(display) = &prop.display {
            self.display = display.clone();
        }

        let payloads = prop.payloads();
        if payloads.len() > 1 {
            return Err(ComposeError::AmbiguousPayload {
                ability: owner,
                part: target.clone(),
            });
        }

        if let Some(part) = self.parts.iter_mut().find(|part| part.name == *target) {
            let delta = payloads.into_iter().next().ok_or_else(|| ComposeError::EmptyPayload {
                ability: owner,
                part: target.clone(),
            })?;
            part.apply(delta);
        } else if prop.behavior == Behavior::Merge {
            let mut part = SpellPart::named(target.clone());
            if let Some(delta) = payloads.into_iter().next() {
                part.apply(delta);
            }
            self.parts.push(part);
        }
        Ok(())
    }

    /// Fold the elemental multipliers of the targeted parts into one element
    pub fn apply_convert(&mut self, owner: AbilityId, conv: &ConvertSpellConv) -> Result<(), ComposeError> {
        let slot = conv.conversion.index();
        let mut matched = false;
        for part in &mut self.parts {
            if conv.targets_all() || part.name == conv.target_part {
                part.convert_to(slot);
                matched = true;
            }
        }
        if !matched && !conv.targets_all() {
            return Err(ComposeError::UnknownPart {
                ability: owner,
                spell: self.base_spell,
                part: conv.target_part.clone(),
            });
        }
        Ok(())
    }
}

pub type SpellMap = BTreeMap<SpellId, Spell>;

fn spell_mut(spells: &mut SpellMap, owner: AbilityId, spell: SpellId) -> Result<&mut Spell, ComposeError> {
    spells
        .get_mut(&spell)
        .ok_or(ComposeError::UnknownSpell { ability: owner, spell })
}

/// Compose every spell the merged abilities define
pub fn compose_spells(merged: &MergedAbilities) -> Result<SpellMap, ComposeError> {
    let mut spells = SpellMap::new();

    for ability in merged {
        for effect in &ability.effects {
            if let Effect::ReplaceSpell(template) = effect {
                match spells.get_mut(&template.base_spell) {
                    Some(spell) => spell.apply_replace(template),
                    None => {
                        spells.insert(template.base_spell, Spell::from_template(template));
                    }
                }
            }
        }
    }

    for ability in merged {
        for effect in &ability.effects {
            match effect {
                Effect::AddSpellProp(prop) => {
                    spell_mut(&mut spells, ability.id, prop.base_spell)?.apply_add(ability.id, prop)?;
                }
                Effect::ConvertSpellConv(conv) => {
                    spell_mut(&mut spells, ability.id, conv.base_spell)?.apply_convert(ability.id, conv)?;
                }
                Effect::ReplaceSpell(_) | Effect::RawStat(_) | Effect::StatScaling(_) => {}
            }
        }
    }

    tracing::debug!(spells = spells.len(), abilities = merged.len(), "composed spells");
    Ok(spells)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Element;

    fn spell_with_parts(parts: Vec<SpellPart>) -> Spell {
        Spell {
            base_spell: SpellId(1),
            name: "Meteor".to_string(),
            cost: Some(55.0),
            display: "Total".to_string(),
            parts,
            ..Default::default()
        }
    }

    #[test]
    fn test_replace_is_per_field() {
        let mut spell = Spell::from_template(&SpellTemplate {
            base_spell: SpellId(3),
            name: Some("Bolt".to_string()),
            cost: Some(30.0),
            parts: Some(vec![SpellPart::named("Hit")]),
            ..Default::default()
        });
        spell.apply_replace(&SpellTemplate {
            base_spell: SpellId(3),
            name: Some("Chain Bolt".to_string()),
            ..Default::default()
        });
        assert_eq!(spell.name, "Chain Bolt");
        assert_eq!(spell.cost, Some(30.0));
        assert_eq!(spell.parts.len(), 1);
    }

    #[test]
    fn test_add_on_existing_part() {
        let mut spell = spell_with_parts(vec![SpellPart::with_multipliers("Blast", [100.0, 20.0, 0.0, 0.0, 0.0, 0.0])]);
        let prop = AddSpellProp {
            base_spell: SpellId(1),
            target_part: Some("Blast".to_string()),
            cost: -5.0,
            multipliers: Some([10.0, 0.0, 0.0, 0.0, 0.0, 30.0]),
            ..Default::default()
        };
        spell.apply_add(AbilityId(7), &prop).unwrap();
        assert_eq!(spell.cost, Some(50.0));
        assert_eq!(spell.parts[0].multipliers, [110.0, 20.0, 0.0, 0.0, 0.0, 30.0]);
    }

    #[test]
    fn test_hits_are_created_or_summed() {
        let mut total = SpellPart::named("Total");
        total.hits.insert("Blast".to_string(), 1.0);
        let mut spell = spell_with_parts(vec![total]);
        let mut hits = BTreeMap::new();
        hits.insert("Blast".to_string(), 2.0);
        hits.insert("Burn".to_string(), 3.0);
        let prop = AddSpellProp {
            base_spell: SpellId(1),
            target_part: Some("Total".to_string()),
            hits: Some(hits),
            ..Default::default()
        };
        spell.apply_add(AbilityId(7), &prop).unwrap();
        let part = spell.part("Total").unwrap();
        assert_eq!(part.hits.get("Blast"), Some(&3.0));
        assert_eq!(part.hits.get("Burn"), Some(&3.0));
    }

    #[test]
    fn test_missing_part_merge_vs_modify() {
        let mut spell = spell_with_parts(Vec::new());
        let mut prop = AddSpellProp {
            base_spell: SpellId(1),
            target_part: Some("Heal".to_string()),
            behavior: Behavior::Modify,
            power: Some(0.3),
            ..Default::default()
        };
        spell.apply_add(AbilityId(7), &prop).unwrap();
        assert!(spell.parts.is_empty());

        prop.behavior = Behavior::Merge;
        spell.apply_add(AbilityId(7), &prop).unwrap();
        assert_eq!(spell.part("Heal").map(|p| p.power), Some(0.3));
    }

    #[test]
    fn test_cost_only_keeps_display() {
        let mut spell = spell_with_parts(vec![SpellPart::named("Blast")]);
        let prop = AddSpellProp {
            base_spell: SpellId(1),
            cost: 10.0,
            display: Some("Blast".to_string()),
            ..Default::default()
        };
        spell.apply_add(AbilityId(7), &prop).unwrap();
        assert_eq!(spell.cost, Some(65.0));
        assert_eq!(spell.display, "Total");
        assert_eq!(spell.parts.len(), 1);

        let targeted = AddSpellProp {
            target_part: Some("Blast".to_string()),
            power: Some(0.1),
            ..prop
        };
        spell.apply_add(AbilityId(7), &targeted).unwrap();
        assert_eq!(spell.display, "Blast");
    }

    #[test]
    fn test_payload_errors() {
        let mut spell = spell_with_parts(vec![SpellPart::named("Blast")]);
        let empty = AddSpellProp {
            base_spell: SpellId(1),
            target_part: Some("Blast".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            spell.apply_add(AbilityId(7), &empty),
            Err(ComposeError::EmptyPayload { .. })
        ));

        let ambiguous = AddSpellProp {
            power: Some(1.0),
            multipliers: Some([0.0; ELEMENT_COUNT]),
            ..empty
        };
        assert!(matches!(
            spell.apply_add(AbilityId(7), &ambiguous),
            Err(ComposeError::AmbiguousPayload { .. })
        ));
    }

    #[test]
    fn test_convert_named_part_only() {
        let mut spell = spell_with_parts(vec![
            SpellPart::with_multipliers("A", [50.0, 10.0, 10.0, 0.0, 0.0, 0.0]),
            SpellPart::with_multipliers("B", [0.0, 10.0, 0.0, 0.0, 0.0, 0.0]),
        ]);
        let conv = ConvertSpellConv {
            base_spell: SpellId(1),
            target_part: "A".to_string(),
            conversion: Element::Fire,
        };
        spell.apply_convert(AbilityId(7), &conv).unwrap();
        assert_eq!(spell.parts[0].multipliers, [50.0, 0.0, 0.0, 0.0, 20.0, 0.0]);
        assert_eq!(spell.parts[1].multipliers, [0.0, 10.0, 0.0, 0.0, 0.0, 0.0]);

        let missing = ConvertSpellConv {
            target_part: "C".to_string(),
            ..conv
        };
        assert!(matches!(
            spell.apply_convert(AbilityId(7), &missing),
            Err(ComposeError::UnknownPart { .. })
        ));
    }
}
