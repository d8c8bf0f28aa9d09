//! Stat deltas contributed by the ability tree
//!
//! Pure function of its [`StatContext`]: item stats and control values are
//! passed in, never read from shared state.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::atree::effect::{Effect, RawStat, ScalingTarget, StatScaling, TargetKind};
use crate::compose::controls::{ControlSet, ControlState};
use crate::compose::error::ComposeError;
use crate::compose::merge::{MergedAbilities, MergedAbility};

/// Stat name to value
pub type StatMap = BTreeMap<String, f64>;

/// Additive stat changes
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct StatDelta(StatMap);

impl StatDelta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `value` to `name`, creating the entry at zero
    pub fn merge(&mut self, name: &str, value: f64) {
        *self.0.entry(name.to_string()).or_insert(0.0) += value;
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.0.iter().map(|(name, value)| (name.as_str(), *value))
    }

    pub fn as_map(&self) -> &StatMap {
        &self.0
    }
}

/// Everything the aggregator reads besides the merged abilities
pub struct StatContext<'a> {
    pub item_stats: &'a StatMap,
    pub controls: &'a ControlSet,
    pub state: &'a ControlState,
}

impl StatContext<'_> {
    /// Slider value clamped to the slider's range
    fn slider_value(&self, name: &str) -> Option<f64> {
        let info = self.controls.slider(name)?;
        Some(self.state.slider(name).clamp(0.0, info.max.max(0.0)))
    }

    fn item_stat(&self, name: &str) -> f64 {
        self.item_stats.get(name).copied().unwrap_or(0.0)
    }
}

fn write_outputs(delta: &mut StatDelta, outputs: &[ScalingTarget], total: f64) {
    for output in outputs {
        // prop outputs target ability properties, which are not stats
        if output.kind == TargetKind::Stat {
            delta.merge(&output.name, total);
        }
    }
}

fn capped(total: f64, max: Option<f64>) -> f64 {
    match max {
        Some(max) if total > max => max,
        _ => total,
    }
}

fn apply_scaling(
    delta: &mut StatDelta,
    ability: &MergedAbility,
    scaling: &StatScaling,
    ctx: &StatContext<'_>,
) -> Result<(), ComposeError> {
    if scaling.slider {
        // slider-only effects widen a slider without producing anything
        if scaling.output.is_empty() {
            return Ok(());
        }
        let name = scaling
            .slider_name
            .as_ref()
            .ok_or(ComposeError::MissingSliderName { ability: ability.id })?;
        let value = ctx.slider_value(name).ok_or_else(|| ComposeError::UnknownSlider {
            ability: ability.id,
            slider: name.clone(),
        })?;
        let coefficient = scaling.scaling.first().copied().unwrap_or(0.0);
        let total = (value * coefficient + 0.5).floor();
        write_outputs(delta, &scaling.output, capped(total, scaling.max));
    } else {
        let total: f64 = scaling
            .scaling
            .iter()
            .zip(&scaling.inputs)
            .map(|(coefficient, input)| coefficient * ctx.item_stat(&input.name))
            .sum();
        write_outputs(delta, &scaling.output, capped(total.max(0.0), scaling.max));
    }
    Ok(())
}

fn apply_raw(delta: &mut StatDelta, ability: &MergedAbility, raw: &RawStat, ctx: &StatContext<'_>) {
    if let Some(label) = raw.toggle_label(&ability.display_name) {
        if !ctx.state.toggle(&label) {
            return;
        }
    }
    for bonus in &raw.bonuses {
        if bonus.kind == TargetKind::Stat {
            delta.merge(&bonus.name, bonus.value);
        }
    }
}

/// Collect the stat delta of every merged ability
///
/// A `baseResist` total also yields a `defMult` entry of
/// `1 - baseResist / 100`.
pub fn aggregate_stats(merged: &MergedAbilities, ctx: &StatContext<'_>) -> Result<StatDelta, ComposeError> {
    let mut delta = StatDelta::new();
    for ability in merged {
        for effect in &ability.effects {
            match effect {
                Effect::StatScaling(scaling) => apply_scaling(&mut delta, ability, scaling, ctx)?,
                Effect::RawStat(raw) => apply_raw(&mut delta, ability, raw, ctx),
                Effect::ReplaceSpell(_) | Effect::AddSpellProp(_) | Effect::ConvertSpellConv(_) => {}
            }
        }
    }
    if let Some(resist) = delta.get("baseResist") {
        delta.merge("defMult", 1.0 - resist / 100.0);
    }
    tracing::debug!(stats = delta.len(), "aggregated ability stats");
    Ok(delta)
}
