//! Integration tests for spell composition over merged abilities
//!
//! Abilities are written in the catalog's JSON shape so the effect
//! encoding is exercised alongside the compositor.

use atree_planner::atree::{AbilityDefinition, AbilityTree, AddSpellProp, SpellTemplate};
use atree_planner::compose::{compose_spells, merge_abilities, ComposeError, MergedAbilities, SpellMap, SpellPart};
use atree_planner::core::types::{AbilityId, PlayerClass, SpellId};
use serde_json::json;

fn merged_from(class: PlayerClass, nodes: serde_json::Value) -> MergedAbilities {
    let definitions: Vec<AbilityDefinition> = serde_json::from_value(nodes).unwrap();
    let tree = AbilityTree::build(definitions).unwrap();
    merge_abilities(class, &tree, |_| true)
}

fn compose(nodes: serde_json::Value) -> SpellMap {
    compose_spells(&merged_from(PlayerClass::Mage, nodes)).unwrap()
}

#[test]
fn test_every_class_gets_melee() {
    let spells = compose(json!([{ "id": 1, "display_name": "Root" }]));
    let melee = &spells[&SpellId(0)];
    assert_eq!(melee.name, "Wand Melee");
    assert_eq!(melee.display, "Melee");
    assert_eq!(melee.scaling.as_deref(), Some("melee"));
    assert!(!melee.use_atkspd);
    assert_eq!(melee.cost, None);
    assert_eq!(melee.parts, vec![SpellPart::with_multipliers("Melee", [100.0, 0.0, 0.0, 0.0, 0.0, 0.0])]);
}

#[test]
fn test_convert_all_folds_into_one_element() {
    let spells = compose(json!([
        {
            "id": 1, "display_name": "Bolt",
            "effects": [{
                "type": "replace_spell", "base_spell": 1, "name": "Bolt", "cost": 30,
                "parts": [
                    { "name": "Hit", "multipliers": [2, 1, 1, 1, 1, 1] },
                    { "name": "Total", "hits": { "Hit": 2 } }
                ]
            }]
        },
        {
            "id": 2, "display_name": "Frost Bolt", "parents": [1], "base_abil": 1,
            "effects": [{ "type": "convert_spell_conv", "base_spell": 1, "target_part": "all", "conversion": "Water" }]
        }
    ]));
    let bolt = &spells[&SpellId(1)];
    assert_eq!(bolt.part("Hit").unwrap().multipliers, [2.0, 0.0, 0.0, 5.0, 0.0, 0.0]);
    // hit-count parts carry no multipliers and are left alone
    assert_eq!(bolt.part("Total").unwrap().multipliers, [0.0; 6]);
    assert_eq!(bolt.part("Total").unwrap().hits.get("Hit"), Some(&2.0));
}

#[test]
fn test_adds_apply_after_every_replacement() {
    // Charm stands before Nova in tree order, so its add is merged first
    let spells = compose(json!([
        { "id": 1, "display_name": "Root" },
        {
            "id": 2, "display_name": "Charm", "parents": [1],
            "effects": [{ "type": "add_spell_prop", "base_spell": 4, "target_part": "Pulse", "cost": -5, "power": 0.25 }]
        },
        {
            "id": 3, "display_name": "Nova", "parents": [1],
            "effects": [{
                "type": "replace_spell", "base_spell": 4, "name": "Nova", "cost": 40,
                "parts": [{ "name": "Pulse", "power": 1.0 }]
            }]
        }
    ]));
    let nova = &spells[&SpellId(4)];
    assert_eq!(nova.cost, Some(35.0));
    assert_eq!(nova.part("Pulse").unwrap().power, 1.25);
}

#[test]
fn test_later_replacement_wins_field_by_field() {
    let spells = compose(json!([
        {
            "id": 1, "display_name": "Arrow",
            "effects": [{
                "type": "replace_spell", "base_spell": 1, "name": "Arrow", "cost": 20, "display": "Shot",
                "parts": [{ "name": "Shot", "multipliers": [80, 0, 0, 0, 0, 20] }]
            }]
        },
        {
            "id": 2, "display_name": "Arrow Storm", "parents": [1],
            "effects": [{ "type": "replace_spell", "base_spell": 1, "name": "Arrow Storm", "cost": 35 }]
        }
    ]));
    let arrow = &spells[&SpellId(1)];
    assert_eq!(arrow.name, "Arrow Storm");
    assert_eq!(arrow.cost, Some(35.0));
    assert_eq!(arrow.display, "Shot");
    assert_eq!(arrow.parts.len(), 1);
}

#[test]
fn test_replace_after_add_discards_the_add() {
    // one ability's add lands on spell 1, then another's replacement overwrites it
    let template = SpellTemplate {
        base_spell: SpellId(1),
        name: Some("Bash".to_string()),
        cost: Some(45.0),
        parts: Some(vec![SpellPart::with_multipliers("Hit", [130.0, 20.0, 0.0, 0.0, 0.0, 0.0])]),
        ..Default::default()
    };
    let mut spell = atree_planner::compose::Spell::from_template(&template);
    let add = AddSpellProp {
        base_spell: SpellId(1),
        target_part: Some("Hit".to_string()),
        multipliers: Some([20.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
        ..Default::default()
    };
    spell.apply_add(AbilityId(5), &add).unwrap();
    assert_eq!(spell.part("Hit").unwrap().multipliers[0], 150.0);

    spell.apply_replace(&template);
    assert_eq!(spell.part("Hit").unwrap().multipliers[0], 130.0);
}

#[test]
fn test_effect_on_missing_spell_is_an_error() {
    let merged = merged_from(
        PlayerClass::Archer,
        json!([{
            "id": 1, "display_name": "Lonely",
            "effects": [{ "type": "add_spell_prop", "base_spell": 7, "cost": 5 }]
        }]),
    );
    let err = compose_spells(&merged).unwrap_err();
    assert_eq!(
        err,
        ComposeError::UnknownSpell {
            ability: AbilityId(1),
            spell: SpellId(7)
        }
    );
}

#[test]
fn test_bad_multiplier_length_fails_to_load() {
    let result: Result<Vec<AbilityDefinition>, _> = serde_json::from_value(json!([{
        "id": 1, "display_name": "Broken",
        "effects": [{ "type": "add_spell_prop", "base_spell": 1, "target_part": "Hit", "multipliers": [1, 2, 3] }]
    }]));
    assert!(result.is_err());
}
