//! Integration tests for control discovery and stat aggregation

use atree_planner::atree::{AbilityDefinition, AbilityTree};
use atree_planner::compose::{
    aggregate_stats, merge_abilities, ComposeError, ControlSet, ControlState, MergedAbilities, StatContext, StatDelta,
    StatMap,
};
use atree_planner::core::types::PlayerClass;
use serde_json::json;

fn merged_from(nodes: serde_json::Value) -> MergedAbilities {
    let definitions: Vec<AbilityDefinition> = serde_json::from_value(nodes).unwrap();
    let tree = AbilityTree::build(definitions).unwrap();
    merge_abilities(PlayerClass::Shaman, &tree, |_| true)
}

fn aggregate(merged: &MergedAbilities, items: &StatMap, state: &ControlState) -> Result<StatDelta, ComposeError> {
    let controls = ControlSet::collect(merged)?;
    aggregate_stats(
        merged,
        &StatContext {
            item_stats: items,
            controls: &controls,
            state,
        },
    )
}

fn mana_bank() -> MergedAbilities {
    merged_from(json!([
        {
            "id": 1, "display_name": "Mana Bank",
            "effects": [{
                "type": "stat_scaling", "slider": true, "slider_name": "Mana Bank",
                "slider_step": 1, "slider_max": 10,
                "output": { "type": "stat", "name": "mdPct" },
                "scaling": [1.5], "max": 12
            }]
        },
        {
            "id": 2, "display_name": "Deeper Bank", "parents": [1], "base_abil": 1,
            "effects": [{ "type": "stat_scaling", "slider": true, "slider_name": "Mana Bank", "slider_max": 5 }]
        }
    ]))
}

fn with_slider(value: f64) -> ControlState {
    let mut state = ControlState::default();
    state.set_slider("Mana Bank", value);
    state
}

#[test]
fn test_slider_max_widens_across_abilities() {
    let controls = ControlSet::collect(&mana_bank()).unwrap();
    let slider = controls.slider("Mana Bank").unwrap();
    assert_eq!(slider.max, 15.0);
    assert_eq!(slider.step, Some(1.0));
}

#[test]
fn test_slider_output_rounds_and_caps() {
    let merged = mana_bank();
    let items = StatMap::new();

    let delta = aggregate(&merged, &items, &with_slider(10.0)).unwrap();
    assert_eq!(delta.get("mdPct"), Some(12.0));

    // 3 * 1.5 = 4.5 rounds half up
    let delta = aggregate(&merged, &items, &with_slider(3.0)).unwrap();
    assert_eq!(delta.get("mdPct"), Some(5.0));

    let delta = aggregate(&merged, &items, &ControlState::default()).unwrap();
    assert_eq!(delta.get("mdPct"), Some(0.0));

    // out-of-range values are clamped to the slider first
    let delta = aggregate(&merged, &items, &with_slider(-4.0)).unwrap();
    assert_eq!(delta.get("mdPct"), Some(0.0));
}

#[test]
fn test_item_scaling_sums_weighted_inputs() {
    let merged = merged_from(json!([{
        "id": 1, "display_name": "Wisdom",
        "effects": [{
            "type": "stat_scaling",
            "inputs": [{ "type": "stat", "name": "int" }, { "type": "stat", "name": "dex" }],
            "output": [{ "type": "stat", "name": "sdRaw" }, { "type": "prop", "abil": 1, "name": "range" }],
            "scaling": [0.5, 0.25], "max": 50
        }]
    }]));
    let state = ControlState::default();

    let items: StatMap = [("int".to_string(), 40.0), ("dex".to_string(), 20.0)].into_iter().collect();
    let delta = aggregate(&merged, &items, &state).unwrap();
    assert_eq!(delta.get("sdRaw"), Some(25.0));
    assert_eq!(delta.get("range"), None);

    let items: StatMap = [("int".to_string(), 400.0)].into_iter().collect();
    assert_eq!(aggregate(&merged, &items, &state).unwrap().get("sdRaw"), Some(50.0));

    let items: StatMap = [("int".to_string(), -100.0)].into_iter().collect();
    assert_eq!(aggregate(&merged, &items, &state).unwrap().get("sdRaw"), Some(0.0));
}

#[test]
fn test_named_toggle_gates_every_bound_bonus() {
    let merged = merged_from(json!([
        {
            "id": 1, "display_name": "Stance",
            "effects": [{
                "type": "raw_stat", "toggle": "Fortify",
                "bonuses": [{ "type": "stat", "name": "baseResist", "value": 20 }]
            }]
        },
        {
            "id": 2, "display_name": "Iron Skin", "parents": [1],
            "effects": [
                { "type": "raw_stat", "toggle": "Fortify", "bonuses": [{ "type": "stat", "name": "baseResist", "value": 10 }] },
                { "type": "raw_stat", "bonuses": [{ "type": "stat", "name": "hpBonus", "value": 300 }] }
            ]
        }
    ]));
    let controls = ControlSet::collect(&merged).unwrap();
    assert!(controls.has_toggle("Fortify"));
    assert_eq!(controls.toggles.len(), 1);

    let items = StatMap::new();
    let off = aggregate(&merged, &items, &ControlState::default()).unwrap();
    assert_eq!(off.get("hpBonus"), Some(300.0));
    assert_eq!(off.get("baseResist"), None);
    assert_eq!(off.get("defMult"), None);

    let mut state = ControlState::default();
    state.set_toggle("Fortify", true);
    let on = aggregate(&merged, &items, &state).unwrap();
    assert_eq!(on.get("baseResist"), Some(30.0));
    assert!((on.get("defMult").unwrap() - 0.7).abs() < 1e-9);
}

#[test]
fn test_modify_only_slider_is_never_created() {
    let merged = merged_from(json!([{
        "id": 1, "display_name": "Focus",
        "effects": [{
            "type": "stat_scaling", "slider": true, "slider_name": "Focus",
            "slider_behavior": "modify", "slider_max": 3,
            "output": { "type": "stat", "name": "damMult" }, "scaling": [10]
        }]
    }]));
    let controls = ControlSet::collect(&merged).unwrap();
    assert!(controls.slider("Focus").is_none());

    let err = aggregate(&merged, &StatMap::new(), &ControlState::default()).unwrap_err();
    assert!(matches!(err, ComposeError::UnknownSlider { ref slider, .. } if slider == "Focus"));
}
