//! Class rule tables.
//!
//! One row per (class, level) describing caster type, cantrips known, spell
//! slots and resource pools. Tables are validated once when they are built
//! and are read-only afterwards; every engine call borrows them.

use crate::character::{ClassOverride, ClassState};
use crate::dice::DieType;
use crate::slots::SlotTable;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use thiserror::Error;

/// Highest level a single class can reach.
pub const MAX_LEVEL: u8 = 20;

/// Highest spell level.
pub const MAX_SPELL_LEVEL: u8 = 9;

/// Current rules dataset format version.
pub const DATASET_VERSION: u32 = 1;

// ============================================================================
// Identifiers
// ============================================================================

/// Identifier of a class ("wizard", "warlock", or any homebrew name).
///
/// Ids are case-insensitive: they are trimmed and lowercased on creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ClassId(String);

impl ClassId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ClassId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl From<&str> for ClassId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<ClassId> for String {
    fn from(id: ClassId) -> Self {
        id.0
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a subclass ("eldritch_knight", "battle_master", ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct SubclassId(String);

impl SubclassId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SubclassId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl From<&str> for SubclassId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<SubclassId> for String {
    fn from(id: SubclassId) -> Self {
        id.0
    }
}

impl fmt::Display for SubclassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Row Types
// ============================================================================

/// How a class's spell slots scale with its level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CasterType {
    None,
    Third,
    Half,
    Full,
    Pact,
    /// Homebrew class resolved through the character's override data.
    Custom,
}

impl CasterType {
    pub fn name(&self) -> &'static str {
        match self {
            CasterType::None => "Non-caster",
            CasterType::Third => "Third caster",
            CasterType::Half => "Half caster",
            CasterType::Full => "Full caster",
            CasterType::Pact => "Pact caster",
            CasterType::Custom => "Custom",
        }
    }
}

impl fmt::Display for CasterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// When a resource pool refills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RechargeType {
    ShortRest,
    #[default]
    LongRest,
    Dawn,
    /// Only refilled by a manual edit.
    Never,
}

impl RechargeType {
    pub fn on_short_rest(&self) -> bool {
        matches!(self, RechargeType::ShortRest)
    }

    pub fn on_long_rest(&self) -> bool {
        !matches!(self, RechargeType::Never)
    }
}

/// Size and recharge rule of one resource pool at one level.
///
/// In a dataset a pool is written either as a bare amount (`"rage": 3`,
/// recharging on a long rest) or as `{ "amount": 3, "recharge": "short_rest" }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PoolSpecRepr")]
pub struct PoolSpec {
    pub amount: u32,
    pub recharge: RechargeType,
}

impl PoolSpec {
    pub fn long_rest(amount: u32) -> Self {
        Self {
            amount,
            recharge: RechargeType::LongRest,
        }
    }

    pub fn short_rest(amount: u32) -> Self {
        Self {
            amount,
            recharge: RechargeType::ShortRest,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PoolSpecRepr {
    Amount(u32),
    Detailed {
        amount: u32,
        #[serde(default)]
        recharge: RechargeType,
    },
}

impl From<PoolSpecRepr> for PoolSpec {
    fn from(repr: PoolSpecRepr) -> Self {
        match repr {
            PoolSpecRepr::Amount(amount) => PoolSpec::long_rest(amount),
            PoolSpecRepr::Detailed { amount, recharge } => PoolSpec { amount, recharge },
        }
    }
}

/// One immutable row of a class table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassLevelEntry {
    pub class_id: ClassId,
    pub level: u8,
    pub caster_type: CasterType,
    #[serde(default)]
    pub cantrips_known: u8,
    /// Spell level (1-9) to slot count.
    #[serde(default, alias = "slotsBySpellLevel")]
    pub slots: BTreeMap<u8, u8>,
    #[serde(default, alias = "resourcePools")]
    pub pools: BTreeMap<String, PoolSpec>,
    /// Spell levels castable once per long rest without a slot.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mystic_arcanum: Vec<u8>,
}

/// Subclass contribution at one class level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubclassLevelEntry {
    pub level: u8,
    #[serde(default)]
    pub cantrips_known: u8,
    #[serde(default)]
    pub slots: BTreeMap<u8, u8>,
    #[serde(default)]
    pub pools: BTreeMap<String, PoolSpec>,
}

/// Rules a subclass layers over its parent class.
///
/// A subclass with a caster type (Eldritch Knight, Arcane Trickster) turns
/// its non-casting parent into a caster of that type, reading slots from its
/// own rows. Levels without a row contribute nothing.
///
/// `spell_list` names the class whose spells the subclass casts. It takes
/// effect from the subclass's first row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubclassRule {
    pub subclass_id: SubclassId,
    pub parent: ClassId,
    #[serde(default)]
    pub caster_type: Option<CasterType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spell_list: Option<ClassId>,
    #[serde(default)]
    pub levels: Vec<SubclassLevelEntry>,
}

impl SubclassRule {
    /// The subclass row for an exact class level, if any.
    pub fn at(&self, level: u8) -> Option<&SubclassLevelEntry> {
        self.levels.iter().find(|row| row.level == level)
    }

    /// The spell list in effect at a class level, if any.
    pub fn spell_list_at(&self, level: u8) -> Option<&ClassId> {
        let first = self.levels.iter().map(|row| row.level).min()?;
        self.spell_list.as_ref().filter(|_| level >= first)
    }

    fn pool_names(&self) -> impl Iterator<Item = &str> {
        self.levels
            .iter()
            .flat_map(|row| row.pools.keys().map(String::as_str))
    }
}

/// The rules dataset in its external (JSON) shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulesDataset {
    pub version: u32,
    pub entries: Vec<ClassLevelEntry>,
    /// Hit die per class; classes not listed use a d8.
    #[serde(default)]
    pub hit_dice: BTreeMap<ClassId, DieType>,
    #[serde(default)]
    pub subclasses: Vec<SubclassRule>,
}

// ============================================================================
// Errors
// ============================================================================

/// Errors from rule lookups and character class bookkeeping.
///
/// These indicate invalid input from the surrounding application, not a
/// user-correctable condition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RulesError {
    #[error("Unknown class: {0}")]
    UnknownClass(ClassId),

    #[error("Level {level} is out of range for {class_id} (expected 1-20)")]
    LevelOutOfRange { class_id: ClassId, level: u8 },

    #[error("Unknown resource pool '{pool}' for {class_id}")]
    UnknownPool { class_id: ClassId, pool: String },

    #[error("Subclass {subclass_id} belongs to {parent}, not {class_id}")]
    SubclassMismatch {
        subclass_id: SubclassId,
        parent: ClassId,
        class_id: ClassId,
    },

    #[error("{0} is already held by this character")]
    DuplicateClass(ClassId),

    #[error("{0} is not held by this character")]
    ClassNotHeld(ClassId),

    #[error("Total character level {0} is out of range (expected 1-20)")]
    TotalLevelOutOfRange(u32),
}

/// Errors found while building rule tables from a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("{owner} has more than one row for level {level}")]
    DuplicateEntry { owner: String, level: u8 },

    #[error("{owner} has a row for level {level} (expected 1-20)")]
    LevelOutOfRange { owner: String, level: u8 },

    #[error("{owner} is missing its level {level} row")]
    MissingLevel { owner: String, level: u8 },

    #[error("{owner} level {level} lists spell level {spell_level} (expected 1-9)")]
    InvalidSpellLevel {
        owner: String,
        level: u8,
        spell_level: u8,
    },

    #[error("{owner} level {level}: {column} decreases from the previous level")]
    NonMonotonic {
        owner: String,
        level: u8,
        column: String,
    },

    #[error("{owner} level {level}: pact slots span more than one spell level")]
    PactSlotLevels { owner: String, level: u8 },

    #[error("{owner} level {level}: caster type differs from the class's level 1 row")]
    InconsistentCasterType { owner: String, level: u8 },

    #[error("{0} is a custom class; custom classes have no table rows")]
    CustomTable(String),

    #[error("Subclass {subclass_id} names unknown parent class {parent}")]
    UnknownParent {
        subclass_id: SubclassId,
        parent: ClassId,
    },

    #[error("Subclass {0} is defined more than once")]
    DuplicateSubclass(SubclassId),

    #[error("Subclass {subclass_id} borrows spells from unknown class {class_id}")]
    UnknownSpellList {
        subclass_id: SubclassId,
        class_id: ClassId,
    },
}

// ============================================================================
// Tables
// ============================================================================

/// All rows of one class, indexed by level.
#[derive(Debug, Clone)]
pub struct ClassTable {
    caster_type: CasterType,
    hit_die: DieType,
    /// Rows for levels 1-20, in order.
    levels: Vec<ClassLevelEntry>,
    /// Every pool the class defines at any level.
    pool_names: BTreeSet<String>,
}

impl ClassTable {
    pub fn caster_type(&self) -> CasterType {
        self.caster_type
    }

    pub fn hit_die(&self) -> DieType {
        self.hit_die
    }

    fn entry(&self, class_id: &ClassId, level: u8) -> Result<&ClassLevelEntry, RulesError> {
        check_level(class_id, level)?;
        self.levels
            .get(usize::from(level) - 1)
            .ok_or_else(|| RulesError::LevelOutOfRange {
                class_id: class_id.clone(),
                level,
            })
    }
}

/// Validated, read-only class rule tables.
#[derive(Debug, Clone, Default)]
pub struct RuleTables {
    classes: HashMap<ClassId, ClassTable>,
    subclasses: HashMap<SubclassId, SubclassRule>,
}

impl RuleTables {
    /// The tables bundled with the crate, built and validated on first use.
    pub fn bundled() -> Result<&'static RuleTables, TableError> {
        crate::class_data::BUNDLED_TABLES
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Build tables from a dataset, enforcing every load-time invariant.
    pub fn from_dataset(dataset: RulesDataset) -> Result<Self, TableError> {
        let RulesDataset {
            entries,
            hit_dice,
            subclasses,
            ..
        } = dataset;

        let mut rows: BTreeMap<ClassId, BTreeMap<u8, ClassLevelEntry>> = BTreeMap::new();
        for entry in entries {
            let owner = entry.class_id.to_string();
            if !(1..=MAX_LEVEL).contains(&entry.level) {
                return Err(TableError::LevelOutOfRange {
                    owner,
                    level: entry.level,
                });
            }
            if entry.caster_type == CasterType::Custom {
                return Err(TableError::CustomTable(owner));
            }
            check_spell_levels(&owner, entry.level, &entry.slots)?;
            if let Some(spell_level) = entry
                .mystic_arcanum
                .iter()
                .find(|spell_level| !(1..=MAX_SPELL_LEVEL).contains(*spell_level))
            {
                return Err(TableError::InvalidSpellLevel {
                    owner,
                    level: entry.level,
                    spell_level: *spell_level,
                });
            }
            if entry.caster_type == CasterType::Pact
                && entry.slots.values().filter(|count| **count > 0).count() > 1
            {
                return Err(TableError::PactSlotLevels {
                    owner,
                    level: entry.level,
                });
            }

            let class_rows = rows.entry(entry.class_id.clone()).or_default();
            if class_rows.contains_key(&entry.level) {
                return Err(TableError::DuplicateEntry {
                    owner,
                    level: entry.level,
                });
            }
            class_rows.insert(entry.level, entry);
        }

        let mut classes = HashMap::new();
        for (class_id, class_rows) in rows {
            let owner = class_id.to_string();
            if let Some(level) = (1..=MAX_LEVEL).find(|level| !class_rows.contains_key(level)) {
                return Err(TableError::MissingLevel { owner, level });
            }
            let levels: Vec<ClassLevelEntry> = class_rows.into_values().collect();

            let caster_type = levels[0].caster_type;
            if let Some(row) = levels.iter().find(|row| row.caster_type != caster_type) {
                return Err(TableError::InconsistentCasterType {
                    owner,
                    level: row.level,
                });
            }

            let progress: Vec<Progress<'_>> = levels
                .iter()
                .map(|row| Progress {
                    level: row.level,
                    cantrips: row.cantrips_known,
                    slots: &row.slots,
                })
                .collect();
            check_monotonic(&owner, caster_type == CasterType::Pact, &progress)?;

            let pool_names = levels
                .iter()
                .flat_map(|row| row.pools.keys().cloned())
                .collect();
            let hit_die = hit_dice.get(&class_id).copied().unwrap_or_default();

            classes.insert(
                class_id,
                ClassTable {
                    caster_type,
                    hit_die,
                    levels,
                    pool_names,
                },
            );
        }

        let mut subclass_map = HashMap::new();
        for mut rule in subclasses {
            if !classes.contains_key(&rule.parent) {
                return Err(TableError::UnknownParent {
                    subclass_id: rule.subclass_id,
                    parent: rule.parent,
                });
            }
            if subclass_map.contains_key(&rule.subclass_id) {
                return Err(TableError::DuplicateSubclass(rule.subclass_id));
            }
            if let Some(list) = &rule.spell_list {
                if !classes.contains_key(list) {
                    return Err(TableError::UnknownSpellList {
                        class_id: list.clone(),
                        subclass_id: rule.subclass_id,
                    });
                }
            }

            let owner = rule.subclass_id.to_string();
            rule.levels.sort_by_key(|row| row.level);
            for pair in rule.levels.windows(2) {
                if pair[0].level == pair[1].level {
                    return Err(TableError::DuplicateEntry {
                        owner,
                        level: pair[1].level,
                    });
                }
            }
            for row in &rule.levels {
                if !(1..=MAX_LEVEL).contains(&row.level) {
                    return Err(TableError::LevelOutOfRange {
                        owner,
                        level: row.level,
                    });
                }
                check_spell_levels(&owner, row.level, &row.slots)?;
            }
            let progress: Vec<Progress<'_>> = rule
                .levels
                .iter()
                .map(|row| Progress {
                    level: row.level,
                    cantrips: row.cantrips_known,
                    slots: &row.slots,
                })
                .collect();
            check_monotonic(&owner, rule.caster_type == Some(CasterType::Pact), &progress)?;

            subclass_map.insert(rule.subclass_id.clone(), rule);
        }

        tracing::info!(
            classes = classes.len(),
            subclasses = subclass_map.len(),
            "Loaded class rule tables"
        );

        Ok(Self {
            classes,
            subclasses: subclass_map,
        })
    }

    /// Export the tables back into dataset form.
    pub fn to_dataset(&self) -> RulesDataset {
        let mut class_ids: Vec<&ClassId> = self.classes.keys().collect();
        class_ids.sort();

        let mut dataset = RulesDataset {
            version: DATASET_VERSION,
            ..RulesDataset::default()
        };
        for class_id in class_ids {
            let table = &self.classes[class_id];
            dataset.entries.extend(table.levels.iter().cloned());
            dataset.hit_dice.insert(class_id.clone(), table.hit_die);
        }

        let mut subclasses: Vec<&SubclassRule> = self.subclasses.values().collect();
        subclasses.sort_by(|a, b| a.subclass_id.cmp(&b.subclass_id));
        dataset.subclasses = subclasses.into_iter().cloned().collect();
        dataset
    }

    /// Look up the row for a class at a level.
    pub fn lookup(&self, class_id: &ClassId, level: u8) -> Result<&ClassLevelEntry, RulesError> {
        self.table(class_id)?.entry(class_id, level)
    }

    pub fn table(&self, class_id: &ClassId) -> Result<&ClassTable, RulesError> {
        self.classes
            .get(class_id)
            .ok_or_else(|| RulesError::UnknownClass(class_id.clone()))
    }

    pub fn caster_type(&self, class_id: &ClassId) -> Result<CasterType, RulesError> {
        Ok(self.table(class_id)?.caster_type)
    }

    pub fn hit_die(&self, class_id: &ClassId) -> Result<DieType, RulesError> {
        Ok(self.table(class_id)?.hit_die)
    }

    pub fn contains(&self, class_id: &ClassId) -> bool {
        self.classes.contains_key(class_id)
    }

    /// Every pool a class can ever have, across all levels.
    pub fn pool_names(&self, class_id: &ClassId) -> Result<&BTreeSet<String>, RulesError> {
        Ok(&self.table(class_id)?.pool_names)
    }

    pub fn subclass(&self, subclass_id: &SubclassId) -> Option<&SubclassRule> {
        self.subclasses.get(subclass_id)
    }

    /// All class ids, sorted.
    pub fn class_ids(&self) -> Vec<&ClassId> {
        let mut ids: Vec<&ClassId> = self.classes.keys().collect();
        ids.sort();
        ids
    }

    /// Join a held class with the rows that apply at its current level.
    ///
    /// A class carrying override data bypasses the tables entirely.
    pub fn resolve<'a>(&'a self, state: &'a ClassState) -> Result<ResolvedClass<'a>, RulesError> {
        if let Some(overrides) = &state.overrides {
            check_level(&state.class_id, state.level)?;
            return Ok(ResolvedClass {
                state,
                caster_type: CasterType::Custom,
                hit_die: overrides.hit_die,
                table: self.classes.get(&state.class_id),
                entry: None,
                subclass_rule: None,
                subclass: None,
            });
        }

        let table = self.table(&state.class_id)?;
        let entry = table.entry(&state.class_id, state.level)?;

        let subclass_rule = match &state.subclass_id {
            Some(subclass_id) => match self.subclasses.get(subclass_id) {
                Some(rule) if rule.parent != state.class_id => {
                    return Err(RulesError::SubclassMismatch {
                        subclass_id: subclass_id.clone(),
                        parent: rule.parent.clone(),
                        class_id: state.class_id.clone(),
                    });
                }
                Some(rule) => Some(rule),
                None => {
                    tracing::trace!(%subclass_id, "Subclass has no rule rows");
                    None
                }
            },
            None => None,
        };

        Ok(ResolvedClass {
            state,
            caster_type: subclass_rule
                .and_then(|rule| rule.caster_type)
                .unwrap_or(table.caster_type),
            hit_die: table.hit_die,
            table: Some(table),
            entry: Some(entry),
            subclass_rule,
            subclass: subclass_rule.and_then(|rule| rule.at(state.level)),
        })
    }
}

/// A held class joined with the rule rows in effect at its level.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedClass<'a> {
    pub state: &'a ClassState,
    /// Effective caster type: `Custom` for override classes, otherwise the
    /// subclass's caster type when it grants one, else the class's.
    pub caster_type: CasterType,
    pub hit_die: DieType,
    table: Option<&'a ClassTable>,
    entry: Option<&'a ClassLevelEntry>,
    subclass_rule: Option<&'a SubclassRule>,
    subclass: Option<&'a SubclassLevelEntry>,
}

impl<'a> ResolvedClass<'a> {
    pub fn class_id(&self) -> &'a ClassId {
        &self.state.class_id
    }

    pub fn level(&self) -> u8 {
        self.state.level
    }

    pub fn overrides(&self) -> Option<&'a ClassOverride> {
        self.state.overrides.as_ref()
    }

    /// A homebrew class: override data and no table of its own.
    pub fn is_custom(&self) -> bool {
        self.overrides().is_some() && self.table.is_none()
    }

    /// The class's own slot row at its level, ignoring multiclassing.
    pub fn native_slots(&self) -> SlotTable {
        if let Some(overrides) = self.overrides() {
            return SlotTable::from_map(&overrides.slots);
        }
        let subclass_casts = self
            .subclass_rule
            .is_some_and(|rule| rule.caster_type.is_some());
        if subclass_casts {
            return self
                .subclass
                .map(|row| SlotTable::from_map(&row.slots))
                .unwrap_or_default();
        }
        self.entry
            .map(|row| SlotTable::from_map(&row.slots))
            .unwrap_or_default()
    }

    pub fn cantrips_known(&self) -> u32 {
        if let Some(overrides) = self.overrides() {
            return u32::from(overrides.cantrips_known);
        }
        let base = self.entry.map_or(0, |row| row.cantrips_known);
        let granted = self.subclass.map_or(0, |row| row.cantrips_known);
        u32::from(base) + u32::from(granted)
    }

    /// Pools available at the current level, class rows first.
    pub fn pools(&self) -> Vec<(&'a str, PoolSpec)> {
        if let Some(overrides) = self.overrides() {
            return overrides
                .pools
                .iter()
                .map(|(name, spec)| (name.as_str(), *spec))
                .collect();
        }
        self.entry
            .into_iter()
            .flat_map(|row| row.pools.iter())
            .chain(self.subclass.into_iter().flat_map(|row| row.pools.iter()))
            .map(|(name, spec)| (name.as_str(), *spec))
            .collect()
    }

    /// Every pool this class can ever have, unlocked or not.
    pub fn defined_pools(&self) -> BTreeSet<&'a str> {
        if let Some(overrides) = self.overrides() {
            return overrides.pools.keys().map(String::as_str).collect();
        }
        let mut names: BTreeSet<&'a str> = self
            .table
            .into_iter()
            .flat_map(|table| table.pool_names.iter().map(String::as_str))
            .collect();
        if let Some(rule) = self.subclass_rule {
            names.extend(rule.pool_names());
        }
        names
    }

    /// Extra class whose spells this class may take through its subclass.
    pub fn borrowed_spell_list(&self) -> Option<&'a ClassId> {
        self.subclass_rule
            .and_then(|rule| rule.spell_list_at(self.level()))
    }

    pub fn mystic_arcanum(&self) -> &'a [u8] {
        self.entry
            .map(|row| row.mystic_arcanum.as_slice())
            .unwrap_or_default()
    }
}

// ============================================================================
// Validation Helpers
// ============================================================================

fn check_level(class_id: &ClassId, level: u8) -> Result<(), RulesError> {
    if (1..=MAX_LEVEL).contains(&level) {
        Ok(())
    } else {
        Err(RulesError::LevelOutOfRange {
            class_id: class_id.clone(),
            level,
        })
    }
}

fn check_spell_levels(
    owner: &str,
    level: u8,
    slots: &BTreeMap<u8, u8>,
) -> Result<(), TableError> {
    for spell_level in slots.keys() {
        if !(1..=MAX_SPELL_LEVEL).contains(spell_level) {
            return Err(TableError::InvalidSpellLevel {
                owner: owner.to_string(),
                level,
                spell_level: *spell_level,
            });
        }
    }
    Ok(())
}

/// The columns that must never shrink as a class levels up.
struct Progress<'a> {
    level: u8,
    cantrips: u8,
    slots: &'a BTreeMap<u8, u8>,
}

fn check_monotonic(owner: &str, pact: bool, rows: &[Progress<'_>]) -> Result<(), TableError> {
    let shrinks = |level: u8, column: String| TableError::NonMonotonic {
        owner: owner.to_string(),
        level,
        column,
    };

    for pair in rows.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        if next.cantrips < prev.cantrips {
            return Err(shrinks(next.level, "cantrips known".to_string()));
        }

        if pact {
            // Pact slots move up a spell level as a whole, so only the slot
            // level and the count may not drop.
            let (prev_level, prev_count) = pact_slot(prev.slots);
            let (next_level, next_count) = pact_slot(next.slots);
            if next_level < prev_level {
                return Err(shrinks(next.level, "pact slot level".to_string()));
            }
            if next_count < prev_count {
                return Err(shrinks(next.level, "pact slot count".to_string()));
            }
            continue;
        }

        for spell_level in 1..=MAX_SPELL_LEVEL {
            let before = prev.slots.get(&spell_level).copied().unwrap_or(0);
            let after = next.slots.get(&spell_level).copied().unwrap_or(0);
            if after < before {
                return Err(shrinks(
                    next.level,
                    format!("level {spell_level} slots"),
                ));
            }
        }
    }
    Ok(())
}

/// (spell level, count) of a pact row; (0, 0) when it has no slots.
fn pact_slot(slots: &BTreeMap<u8, u8>) -> (u8, u8) {
    slots
        .iter()
        .rev()
        .find(|(_, count)| **count > 0)
        .map(|(level, count)| (*level, *count))
        .unwrap_or((0, 0))
}
