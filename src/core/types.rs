//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique identifier for an ability tree node
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AbilityId(pub u32);

impl fmt::Display for AbilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a derived spell (0 = basic attack, 1-4 = class spells)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpellId(pub u32);

impl fmt::Display for SpellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Playable character classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerClass {
    Warrior,
    Mage,
    Archer,
    Assassin,
    Shaman,
}

impl PlayerClass {
    pub const ALL: [PlayerClass; 5] = [
        PlayerClass::Warrior,
        PlayerClass::Mage,
        PlayerClass::Archer,
        PlayerClass::Assassin,
        PlayerClass::Shaman,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PlayerClass::Warrior => "Warrior",
            PlayerClass::Mage => "Mage",
            PlayerClass::Archer => "Archer",
            PlayerClass::Assassin => "Assassin",
            PlayerClass::Shaman => "Shaman",
        }
    }
}

impl fmt::Display for PlayerClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PlayerClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PlayerClass::ALL
            .into_iter()
            .find(|class| class.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown class: {}", s))
    }
}

/// Application policy for effects that target something which may not exist yet
///
/// `Merge` creates the target if absent, `Modify` only changes an existing one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Behavior {
    #[default]
    Merge,
    Modify,
}

/// Damage categories, in multiplier-vector slot order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Element {
    Neutral,
    Earth,
    Thunder,
    Water,
    Fire,
    Air,
}

/// Number of slots in a multiplier vector
pub const ELEMENT_COUNT: usize = 6;

impl Element {
    pub const ALL: [Element; ELEMENT_COUNT] = [
        Element::Neutral,
        Element::Earth,
        Element::Thunder,
        Element::Water,
        Element::Fire,
        Element::Air,
    ];

    /// Slot of this element in a multiplier vector
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}
