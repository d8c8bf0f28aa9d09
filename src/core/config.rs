//! Planner configuration with documented constants
//!
//! All magic numbers are collected here with explanations of their purpose.
//! Every field can be overridden from a TOML file; omitted fields keep their
//! defaults.

use serde::Deserialize;
use std::path::Path;

use crate::core::error::Result;

/// Ability points available at each character level, indexed by level.
///
/// Level 0 is not a real level and grants nothing. Levels past the end of
/// the table use the last entry.
pub const DEFAULT_AP_TABLE: [u32; 107] = [
    0, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 8, 8, 9, 9, 10, 11, 11, 12, 12, 13, 14, 14, 15, 16, 16,
    17, 17, 18, 18, 19, 19, 20, 20, 20, 21, 21, 22, 22, 23, 23, 23, 24, 24, 25, 25, 26, 26, 27, 27,
    28, 28, 29, 29, 30, 30, 31, 31, 32, 32, 33, 33, 34, 34, 34, 35, 35, 35, 36, 36, 36, 37, 37, 37,
    38, 38, 38, 38, 39, 39, 39, 39, 40, 40, 40, 40, 41, 41, 41, 41, 42, 42, 42, 42, 43, 43, 43, 43,
    44, 44, 44, 44, 45, 45, 45,
];

/// Configuration for validation and reporting
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Budget used when classifying selected nodes as hard or soft failures
    ///
    /// Large enough that no real tree can exhaust it, so only structural
    /// problems (dependencies, blockers, reachability, archetypes) fail.
    pub unlimited_budget: u32,

    /// How many validation errors the textual report lists before
    /// collapsing the rest into a "not shown" line
    pub max_listed_errors: usize,

    /// Level -> ability point cap
    pub ap_table: Vec<u32>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            unlimited_budget: 9999,
            max_listed_errors: 5,
            ap_table: DEFAULT_AP_TABLE.to_vec(),
        }
    }
}

impl PlannerConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Highest cap in the table; used when the level is missing or garbage
    pub fn max_ap(&self) -> u32 {
        self.ap_table.iter().copied().max().unwrap_or(0)
    }

    /// Ability point cap for a level string as typed by the user
    ///
    /// Anything that does not parse as a non-negative integer gets the
    /// maximum cap. Levels past the table stay flat at the last entry.
    pub fn ap_cap(&self, level: &str) -> u32 {
        let Ok(level) = level.trim().parse::<usize>() else {
            return self.max_ap();
        };
        match self.ap_table.get(level) {
            Some(cap) => *cap,
            None => self.ap_table.last().copied().unwrap_or(0),
        }
    }
}
