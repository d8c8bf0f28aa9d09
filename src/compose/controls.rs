//! Interactive controls declared by merged abilities
//!
//! [`ControlSet`] is what exists (slider ranges, toggle labels) and is
//! rebuilt from the merged abilities. [`ControlState`] is what the user has
//! set and survives rebuilds; values for controls that no longer exist are
//! simply never read.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::atree::effect::Effect;
use crate::compose::error::ComposeError;
use crate::compose::merge::MergedAbilities;
use crate::core::types::{AbilityId, Behavior};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SliderInfo {
    pub name: String,
    /// Sum of `slider_max` over every contributing effect
    pub max: f64,
    pub step: Option<f64>,
    /// Ability that created the slider
    pub owner: AbilityId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToggleInfo {
    pub label: String,
    pub owner: AbilityId,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ControlSet {
    pub sliders: BTreeMap<String, SliderInfo>,
    pub toggles: BTreeMap<String, ToggleInfo>,
}

impl ControlSet {
    /// Discover sliders and toggles in merged-ability order
    ///
    /// A slider is created by the first `merge` effect naming it; later
    /// effects naming it add their `slider_max`. A `modify` effect naming a
    /// slider that does not exist yet has no effect.
    pub fn collect(merged: &MergedAbilities) -> Result<Self, ComposeError> {
        let mut set = Self::default();
        for ability in merged {
            for effect in &ability.effects {
                match effect {
                    Effect::StatScaling(scaling) if scaling.slider => {
                        let name = scaling
                            .slider_name
                            .as_ref()
                            .ok_or(ComposeError::MissingSliderName { ability: ability.id })?;
                        if let Some(slider) = set.sliders.get_mut(name) {
                            slider.max += scaling.slider_max.unwrap_or(0.0);
                        } else if scaling.slider_behavior == Behavior::Merge {
                            set.sliders.insert(
                                name.clone(),
                                SliderInfo {
                                    name: name.clone(),
                                    max: scaling.slider_max.unwrap_or(0.0),
                                    step: scaling.slider_step,
                                    owner: ability.id,
                                },
                            );
                        }
                    }
                    Effect::RawStat(raw) => {
                        if let Some(label) = raw.toggle_label(&ability.display_name) {
                            set.toggles.insert(
                                label.clone(),
                                ToggleInfo {
                                    label,
                                    owner: ability.id,
                                },
                            );
                        }
                    }
                    _ => {}
                }
            }
        }
        tracing::debug!(
            sliders = set.sliders.len(),
            toggles = set.toggles.len(),
            "collected ability controls"
        );
        Ok(set)
    }

    pub fn slider(&self, name: &str) -> Option<&SliderInfo> {
        self.sliders.get(name)
    }

    pub fn has_toggle(&self, label: &str) -> bool {
        self.toggles.contains_key(label)
    }
}

/// User-set control values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlState {
    #[serde(default)]
    pub sliders: BTreeMap<String, f64>,
    #[serde(default)]
    pub toggles: BTreeMap<String, bool>,
}

impl ControlState {
    pub fn set_slider(&mut self, name: impl Into<String>, value: f64) {
        self.sliders.insert(name.into(), value);
    }

    pub fn set_toggle(&mut self, label: impl Into<String>, on: bool) {
        self.toggles.insert(label.into(), on);
    }

    /// Raw slider value, 0 when never set
    pub fn slider(&self, name: &str) -> f64 {
        self.sliders.get(name).copied().unwrap_or(0.0)
    }

    pub fn toggle(&self, label: &str) -> bool {
        self.toggles.get(label).copied().unwrap_or(false)
    }
}
