use thiserror::Error;

use crate::core::types::{AbilityId, SpellId};

/// A malformed effect that composition refuses to apply
///
/// Multiplier vectors of the wrong length and unknown element names never
/// reach composition: the typed effect model rejects them at load time.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComposeError {
    #[error("ability {ability} modifies spell {spell}, which no ability defines")]
    UnknownSpell { ability: AbilityId, spell: SpellId },

    #[error("ability {ability} converts part '{part}' of spell {spell}, which has no such part")]
    UnknownPart {
        ability: AbilityId,
        spell: SpellId,
        part: String,
    },

    #[error("ability {ability} changes part '{part}' with more than one of multipliers/power/hits")]
    AmbiguousPayload { ability: AbilityId, part: String },

    #[error("ability {ability} changes part '{part}' without multipliers, power or hits")]
    EmptyPayload { ability: AbilityId, part: String },

    #[error("ability {ability} has a slider effect without a slider name")]
    MissingSliderName { ability: AbilityId },

    #[error("ability {ability} reads slider '{slider}', which no ability creates")]
    UnknownSlider { ability: AbilityId, slider: String },
}
