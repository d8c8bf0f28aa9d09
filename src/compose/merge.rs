//! Fold active tree nodes into the abilities the rest of composition sees
//!
//! A node with a `base_abil` does not stand alone: its description lines,
//! effects and properties are appended to the base entry. Every class also
//! starts with a melee ability and an empty mastery placeholder.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::atree::builder::AbilityTree;
use crate::atree::definition::AbilityDefinition;
use crate::atree::effect::{Effect, SpellTemplate};
use crate::compose::spell::SpellPart;
use crate::core::types::{AbilityId, PlayerClass, SpellId};

/// Id of the per-class melee ability
pub const MELEE_ID: AbilityId = AbilityId(999);
/// Id of the elemental mastery placeholder
pub const ELEMENTAL_MASTERY_ID: AbilityId = AbilityId(998);

/// An ability after its sub-parts have been folded in
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedAbility {
    pub id: AbilityId,
    pub display_name: String,
    pub desc: Vec<String>,
    /// Ids of every node folded into this entry, itself first
    pub subparts: Vec<AbilityId>,
    pub properties: BTreeMap<String, f64>,
    pub effects: Vec<Effect>,
}

impl MergedAbility {
    fn from_definition(def: &AbilityDefinition) -> Self {
        Self {
            id: def.id,
            display_name: def.display_name.clone(),
            desc: def.desc.clone(),
            subparts: vec![def.id],
            properties: def.properties.clone(),
            effects: def.effects.clone(),
        }
    }

    fn absorb(&mut self, def: &AbilityDefinition) {
        self.desc.extend(def.desc.iter().cloned());
        self.subparts.push(def.id);
        self.effects.extend(def.effects.iter().cloned());
        for (name, value) in &def.properties {
            self.properties.insert(name.clone(), *value);
        }
    }
}

/// Merged abilities in insertion order
///
/// Iteration order is significant: later entries' effects overwrite
/// earlier ones during spell composition.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MergedAbilities {
    entries: Vec<MergedAbility>,
}

impl MergedAbilities {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: AbilityId) -> Option<&MergedAbility> {
        self.entries.iter().find(|abil| abil.id == id)
    }

    fn get_mut(&mut self, id: AbilityId) -> Option<&mut MergedAbility> {
        self.entries.iter_mut().find(|abil| abil.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MergedAbility> + '_ {
        self.entries.iter()
    }

    pub fn ids(&self) -> Vec<AbilityId> {
        self.entries.iter().map(|abil| abil.id).collect()
    }

    /// Insert, replacing an entry with the same id in place
    pub fn insert(&mut self, ability: MergedAbility) {
        match self.get_mut(ability.id) {
            Some(existing) => *existing = ability,
            None => self.entries.push(ability),
        }
    }
}

impl<'a> IntoIterator for &'a MergedAbilities {
    type Item = &'a MergedAbility;
    type IntoIter = std::slice::Iter<'a, MergedAbility>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

fn weapon_name(class: PlayerClass) -> &'static str {
    match class {
        PlayerClass::Warrior => "Spear",
        PlayerClass::Mage => "Wand",
        PlayerClass::Archer => "Bow",
        PlayerClass::Assassin => "Dagger",
        PlayerClass::Shaman => "Relik",
    }
}

fn melee_range(class: PlayerClass) -> f64 {
    match class {
        PlayerClass::Mage => 5000.0,
        PlayerClass::Warrior | PlayerClass::Assassin => 2.0,
        PlayerClass::Archer => 20.0,
        PlayerClass::Shaman => 15.0,
    }
}

/// Abilities every character of `class` has before any node is taken
pub fn default_abilities(class: PlayerClass) -> Vec<AbilityDefinition> {
    let melee_spell = SpellTemplate {
        base_spell: SpellId(0),
        name: Some(format!("{} Melee", weapon_name(class))),
        display: Some("Melee".to_string()),
        scaling: Some("melee".to_string()),
        use_atkspd: Some(false),
        parts: Some(vec![SpellPart::with_multipliers("Melee", [100.0, 0.0, 0.0, 0.0, 0.0, 0.0])]),
        ..Default::default()
    };
    let mut melee = AbilityDefinition::new(MELEE_ID.0, format!("{} Melee", class))
        .with_desc(format!("{} basic attack.", class))
        .with_property("range", melee_range(class))
        .with_effect(Effect::ReplaceSpell(melee_spell));
    if class == PlayerClass::Shaman {
        melee = melee.with_property("speed", 0.0);
    }

    vec![melee, AbilityDefinition::new(ELEMENTAL_MASTERY_ID.0, "Elemental Mastery")]
}

/// Merge the defaults of `class` with the nodes of `tree` that pass `is_active`
///
/// Standalone nodes are entered first, in tree order; then each node with a
/// `base_abil` is folded into its base. A node whose base is not present is
/// dropped.
pub fn merge_abilities<F>(class: PlayerClass, tree: &AbilityTree, is_active: F) -> MergedAbilities
where
    F: Fn(AbilityId) -> bool,
{
    let mut merged = MergedAbilities::default();
    for def in default_abilities(class) {
        merged.insert(MergedAbility::from_definition(&def));
    }

    let active: Vec<&AbilityDefinition> = tree
        .iter()
        .filter(|node| is_active(node.id()))
        .map(|node| node.ability())
        .collect();

    for def in active.iter().filter(|def| def.base_abil.is_none()) {
        merged.insert(MergedAbility::from_definition(def));
    }
    for def in &active {
        let Some(base) = def.base_abil else {
            continue;
        };
        match merged.get_mut(base) {
            Some(target) => target.absorb(def),
            None => tracing::debug!(ability = %def.id, base = %base, "base ability not active, sub-part dropped"),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> AbilityTree {
        AbilityTree::build(vec![
            AbilityDefinition::new(1, "Bash").with_desc("Hit things.").with_property("range", 3.0),
            AbilityDefinition::new(2, "Bash Upgrade")
                .with_parents(&[1])
                .with_base(1)
                .with_desc("Hit harder.")
                .with_property("range", 5.0)
                .with_property("aoe", 2.0),
            AbilityDefinition::new(3, "Orphan Upgrade").with_parents(&[1]).with_base(40),
            AbilityDefinition::new(4, "Melee Boost").with_parents(&[1]).with_base(999),
        ])
        .unwrap()
    }

    #[test]
    fn test_defaults_come_first() {
        let merged = merge_abilities(PlayerClass::Mage, &AbilityTree::default(), |_| true);
        assert_eq!(merged.ids(), vec![MELEE_ID, ELEMENTAL_MASTERY_ID]);
        let melee = merged.get(MELEE_ID).unwrap();
        assert_eq!(melee.display_name, "Mage Melee");
        assert_eq!(melee.properties.get("range"), Some(&5000.0));
        match &melee.effects[0] {
            Effect::ReplaceSpell(t) => assert_eq!(t.name.as_deref(), Some("Wand Melee")),
            other => panic!("unexpected effect {:?}", other),
        }
    }

    #[test]
    fn test_sub_parts_fold_into_base() {
        let merged = merge_abilities(PlayerClass::Warrior, &tree(), |_| true);
        assert_eq!(merged.ids(), vec![MELEE_ID, ELEMENTAL_MASTERY_ID, AbilityId(1)]);

        let bash = merged.get(AbilityId(1)).unwrap();
        assert_eq!(bash.desc, vec!["Hit things.".to_string(), "Hit harder.".to_string()]);
        assert_eq!(bash.subparts, vec![AbilityId(1), AbilityId(2)]);
        assert_eq!(bash.properties.get("range"), Some(&5.0));
        assert_eq!(bash.properties.get("aoe"), Some(&2.0));

        let melee = merged.get(MELEE_ID).unwrap();
        assert_eq!(melee.subparts, vec![MELEE_ID, AbilityId(4)]);
    }

    #[test]
    fn test_inactive_nodes_are_skipped() {
        let merged = merge_abilities(PlayerClass::Warrior, &tree(), |id| id != AbilityId(2));
        let bash = merged.get(AbilityId(1)).unwrap();
        assert_eq!(bash.subparts, vec![AbilityId(1)]);
        assert_eq!(bash.properties.get("range"), Some(&3.0));
    }
}
