//! Ability trees: definitions, linking, selection and validation

pub mod builder;
pub mod definition;
pub mod effect;
pub mod loader;
pub mod resolver;
pub mod state;
pub mod validate;

pub use builder::{AbilityTree, BuildError, TreeNode};
pub use definition::{AbilityDefinition, DisplayInfo};
pub use effect::{
    AddSpellProp, ConvertSpellConv, Effect, PartDelta, RawStat, ScalingTarget, SpellTemplate, StatBonus,
    StatScaling, TargetKind, ToggleBinding, ALL_PARTS,
};
pub use loader::AbilityCatalog;
pub use resolver::{ActivationFailure, FailureReason, Resolution, Resolver};
pub use state::ActivationState;
pub use validate::{validate, ValidationReport};
