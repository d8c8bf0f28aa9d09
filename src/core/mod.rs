pub mod config;
pub mod error;
pub mod types;

pub use config::PlannerConfig;
pub use error::{PlannerError, Result};
pub use types::{AbilityId, Behavior, Element, PlayerClass, SpellId, ELEMENT_COUNT};
