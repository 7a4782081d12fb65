//! Spell slot aggregation across classes.
//!
//! Standard slots from every non-pact caster are combined through the
//! multiclass caster-level table; pact slots are tracked separately and
//! never mix with standard slots.

use crate::character::ClassState;
use crate::tables::{CasterType, ResolvedClass, RuleTables, RulesError, MAX_LEVEL, MAX_SPELL_LEVEL};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Slots by combined caster level (rows) and spell level (columns).
///
/// Also the native table of a single-class full caster.
pub const MULTICLASS_SLOTS: [[u8; 9]; 20] = [
    [2, 0, 0, 0, 0, 0, 0, 0, 0],
    [3, 0, 0, 0, 0, 0, 0, 0, 0],
    [4, 2, 0, 0, 0, 0, 0, 0, 0],
    [4, 3, 0, 0, 0, 0, 0, 0, 0],
    [4, 3, 2, 0, 0, 0, 0, 0, 0],
    [4, 3, 3, 0, 0, 0, 0, 0, 0],
    [4, 3, 3, 1, 0, 0, 0, 0, 0],
    [4, 3, 3, 2, 0, 0, 0, 0, 0],
    [4, 3, 3, 3, 1, 0, 0, 0, 0],
    [4, 3, 3, 3, 2, 0, 0, 0, 0],
    [4, 3, 3, 3, 2, 1, 0, 0, 0],
    [4, 3, 3, 3, 2, 1, 0, 0, 0],
    [4, 3, 3, 3, 2, 1, 1, 0, 0],
    [4, 3, 3, 3, 2, 1, 1, 0, 0],
    [4, 3, 3, 3, 2, 1, 1, 1, 0],
    [4, 3, 3, 3, 2, 1, 1, 1, 0],
    [4, 3, 3, 3, 2, 1, 1, 1, 1],
    [4, 3, 3, 3, 3, 1, 1, 1, 1],
    [4, 3, 3, 3, 3, 2, 1, 1, 1],
    [4, 3, 3, 3, 3, 2, 2, 1, 1],
];

// ============================================================================
// Slot Table
// ============================================================================

/// Slot counts for spell levels 1-9.
///
/// Serialized as a map of the non-zero levels, e.g. `{"1": 4, "2": 3}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "BTreeMap<u8, u8>", into = "BTreeMap<u8, u8>")]
pub struct SlotTable([u8; 9]);

impl SlotTable {
    pub fn from_map(slots: &BTreeMap<u8, u8>) -> Self {
        let mut table = SlotTable::default();
        for (level, count) in slots {
            table.set(*level, *count);
        }
        table
    }

    /// Count for a spell level; 0 for anything outside 1-9.
    pub fn get(&self, spell_level: u8) -> u8 {
        match spell_level {
            1..=MAX_SPELL_LEVEL => self.0[usize::from(spell_level) - 1],
            _ => 0,
        }
    }

    /// Set a count. Levels outside 1-9 are ignored.
    pub fn set(&mut self, spell_level: u8, count: u8) {
        if let 1..=MAX_SPELL_LEVEL = spell_level {
            self.0[usize::from(spell_level) - 1] = count;
        }
    }

    /// Decrement a level, returning false if it has none left.
    pub fn take(&mut self, spell_level: u8) -> bool {
        match self.get(spell_level) {
            0 => false,
            count => {
                self.set(spell_level, count - 1);
                true
            }
        }
    }

    /// Highest spell level with at least one slot; 0 if none.
    pub fn highest_level(&self) -> u8 {
        self.iter().map(|(level, _)| level).max().unwrap_or(0)
    }

    /// Non-zero (spell level, count) pairs in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, u8)> + '_ {
        (1u8..)
            .zip(self.0.iter().copied())
            .filter(|(_, count)| *count > 0)
    }

    pub fn total(&self) -> u32 {
        self.0.iter().map(|count| u32::from(*count)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|count| *count == 0)
    }

    /// Clamp every level to the matching level of `max`.
    pub fn clamp_to(&self, max: &SlotTable) -> SlotTable {
        let mut clamped = *self;
        for (slot, limit) in clamped.0.iter_mut().zip(max.0.iter()) {
            *slot = (*slot).min(*limit);
        }
        clamped
    }

    fn from_row(row: &[u8; 9]) -> Self {
        SlotTable(*row)
    }
}

impl From<BTreeMap<u8, u8>> for SlotTable {
    fn from(slots: BTreeMap<u8, u8>) -> Self {
        SlotTable::from_map(&slots)
    }
}

impl From<SlotTable> for BTreeMap<u8, u8> {
    fn from(table: SlotTable) -> Self {
        table.iter().collect()
    }
}

impl<const N: usize> From<[(u8, u8); N]> for SlotTable {
    fn from(pairs: [(u8, u8); N]) -> Self {
        let mut table = SlotTable::default();
        for (level, count) in pairs {
            table.set(level, count);
        }
        table
    }
}

// ============================================================================
// Aggregation
// ============================================================================

/// Pact magic slots: every slot is cast at the same level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PactSlots {
    pub count: u8,
    pub level: u8,
}

impl PactSlots {
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Combine pact slots from two sources.
    ///
    /// Slots at different levels can't share a pool, so the higher level
    /// wins; equal levels add up.
    fn merge(self, other: PactSlots) -> PactSlots {
        if other.is_empty() {
            return self;
        }
        if self.is_empty() || other.level > self.level {
            return other;
        }
        if other.level == self.level {
            return PactSlots {
                count: self.count.saturating_add(other.count),
                level: self.level,
            };
        }
        self
    }
}

/// How one class feeds the standard slot pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contribution {
    /// Contributes nothing to standard slots.
    Ignored,
    /// Adds this many levels to the combined caster level.
    CasterLevels(u8),
    /// Contributes pact slots only.
    Pact,
}

/// Caster-level contribution of one resolved class.
pub fn contribution(class: &ResolvedClass<'_>) -> Contribution {
    let level = class.level();
    match class.caster_type {
        CasterType::None => Contribution::Ignored,
        CasterType::Full => Contribution::CasterLevels(level),
        CasterType::Half => Contribution::CasterLevels((level / 2).max(1)),
        CasterType::Third => Contribution::CasterLevels(level / 3),
        CasterType::Pact => Contribution::Pact,
        CasterType::Custom => match class.overrides() {
            Some(overrides) if overrides.slots.is_empty() && overrides.caster_level.is_none() => {
                Contribution::Ignored
            }
            Some(overrides) => Contribution::CasterLevels(overrides.caster_level.unwrap_or(0)),
            None => Contribution::Ignored,
        },
    }
}

/// Result of combining every class's slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SlotAggregation {
    pub standard: SlotTable,
    pub pact: PactSlots,
    /// Combined caster level used for the multiclass lookup; for a single
    /// standard caster, that class's own contribution. A lone half caster
    /// reads its native row, so this can sit below the level of its slots
    /// (Paladin 5 reports 2 and has 2nd level slots).
    pub caster_level: u8,
}

/// Combine spell slots across all held classes.
///
/// A single standard caster keeps its own table. Two or more sum their
/// caster-level contributions (capped at 20) and read the multiclass table.
pub fn aggregate_slots(
    tables: &RuleTables,
    classes: &[ClassState],
) -> Result<SlotAggregation, RulesError> {
    let resolved = classes
        .iter()
        .map(|state| tables.resolve(state))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(aggregate_resolved(&resolved))
}

pub(crate) fn aggregate_resolved(classes: &[ResolvedClass<'_>]) -> SlotAggregation {
    let mut pact = PactSlots::default();
    let mut casters: Vec<(&ResolvedClass<'_>, u8)> = Vec::new();

    for class in classes {
        match contribution(class) {
            Contribution::Ignored => {}
            // No levels and no slots yet, e.g. an Eldritch Knight below 3.
            Contribution::CasterLevels(0) if class.native_slots().is_empty() => {}
            Contribution::CasterLevels(levels) => casters.push((class, levels)),
            Contribution::Pact => {
                let native = class.native_slots();
                let level = native.highest_level();
                pact = pact.merge(PactSlots {
                    count: native.get(level),
                    level,
                });
            }
        }
    }

    let (standard, caster_level) = match casters.as_slice() {
        [] => (SlotTable::default(), 0),
        [(class, levels)] => (class.native_slots(), *levels),
        many => {
            let total: u32 = many.iter().map(|(_, levels)| u32::from(*levels)).sum();
            let caster_level = u8::try_from(total).unwrap_or(MAX_LEVEL).min(MAX_LEVEL);
            (multiclass_slots(caster_level), caster_level)
        }
    };

    tracing::debug!(
        casters = casters.len(),
        caster_level,
        pact_count = pact.count,
        pact_level = pact.level,
        "Aggregated spell slots"
    );

    SlotAggregation {
        standard,
        pact,
        caster_level,
    }
}

/// Row of the multiclass table; empty below caster level 1.
pub fn multiclass_slots(caster_level: u8) -> SlotTable {
    match caster_level {
        0 => SlotTable::default(),
        level => SlotTable::from_row(&MULTICLASS_SLOTS[usize::from(level.min(MAX_LEVEL)) - 1]),
    }
}
