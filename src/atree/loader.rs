//! Load per-class ability definitions from JSON
//!
//! The data file is an object keyed by class name, each value the flat list
//! of that class's ability definitions:
//!
//! ```json
//! { "Mage": [ { "id": 0, "display_name": "Heal", "parents": [] } ] }
//! ```

use ahash::AHashMap;
use std::collections::BTreeMap;
use std::path::Path;

use crate::atree::definition::AbilityDefinition;
use crate::core::error::{PlannerError, Result};
use crate::core::types::PlayerClass;

/// Ability definitions for every class that has data
#[derive(Debug, Clone, Default)]
pub struct AbilityCatalog {
    trees: AHashMap<PlayerClass, Vec<AbilityDefinition>>,
}

impl AbilityCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a catalog from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: BTreeMap<String, Vec<AbilityDefinition>> = serde_json::from_str(json)?;
        let mut catalog = Self::new();
        for (name, definitions) in raw {
            let class: PlayerClass = name.parse().map_err(|_| PlannerError::UnknownClass(name.clone()))?;
            tracing::debug!(%class, abilities = definitions.len(), "loaded class abilities");
            catalog.insert(class, definitions);
        }
        Ok(catalog)
    }

    /// Load a catalog from a JSON file on disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Replace the definitions of one class
    pub fn insert(&mut self, class: PlayerClass, definitions: Vec<AbilityDefinition>) {
        self.trees.insert(class, definitions);
    }

    /// Definitions of `class`; empty when the catalog has no data for it
    pub fn definitions(&self, class: PlayerClass) -> &[AbilityDefinition] {
        self.trees.get(&class).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Classes with data, in canonical class order
    pub fn classes(&self) -> Vec<PlayerClass> {
        PlayerClass::ALL
            .into_iter()
            .filter(|class| self.trees.contains_key(class))
            .collect()
    }
}
