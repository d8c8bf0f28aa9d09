//! Effect composition: merged abilities, spells, controls and stats

pub mod controls;
pub mod error;
pub mod merge;
pub mod spell;
pub mod stats;

pub use controls::{ControlSet, ControlState, SliderInfo, ToggleInfo};
pub use error::ComposeError;
pub use merge::{default_abilities, merge_abilities, MergedAbilities, MergedAbility, ELEMENTAL_MASTERY_ID, MELEE_ID};
pub use spell::{compose_spells, Spell, SpellMap, SpellPart};
pub use stats::{aggregate_stats, StatContext, StatDelta, StatMap};
