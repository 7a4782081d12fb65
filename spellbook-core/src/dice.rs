//! Hit die types.
//!
//! Hit dice are tracked per die size, so the die type doubles as a map key
//! in both the rules dataset and a character's resource state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for die notation parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiceError {
    #[error("Invalid hit die: {0}")]
    InvalidNotation(String),
    #[error("Invalid hit die size: {0}")]
    InvalidDieSize(u32),
}

/// Die sizes a class can use as its hit die.
///
/// Ordering follows die size, so iterating a `BTreeMap<DieType, _>` in
/// reverse visits the largest dice first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub enum DieType {
    #[serde(rename = "d6")]
    D6,
    #[default]
    #[serde(rename = "d8")]
    D8,
    #[serde(rename = "d10")]
    D10,
    #[serde(rename = "d12")]
    D12,
}

impl DieType {
    pub fn sides(&self) -> u32 {
        match self {
            DieType::D6 => 6,
            DieType::D8 => 8,
            DieType::D10 => 10,
            DieType::D12 => 12,
        }
    }

    pub fn from_sides(sides: u32) -> Option<DieType> {
        match sides {
            6 => Some(DieType::D6),
            8 => Some(DieType::D8),
            10 => Some(DieType::D10),
            12 => Some(DieType::D12),
            _ => None,
        }
    }
}

impl fmt::Display for DieType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "d{}", self.sides())
    }
}

impl FromStr for DieType {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let notation = s.trim().to_lowercase();
        let sides = notation
            .strip_prefix('d')
            .ok_or_else(|| DiceError::InvalidNotation(s.to_string()))?
            .parse::<u32>()
            .map_err(|_| DiceError::InvalidNotation(s.to_string()))?;
        DieType::from_sides(sides).ok_or(DiceError::InvalidDieSize(sides))
    }
}
