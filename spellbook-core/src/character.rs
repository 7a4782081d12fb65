//! Character snapshot types.
//!
//! The engine never owns a character. Callers hand it a [`CharacterSnapshot`]
//! (or just its class list) and persist whatever [`ResourceState`] comes back.

use crate::dice::DieType;
use crate::resources::ComputedResources;
use crate::slots::SlotTable;
use crate::tables::{ClassId, PoolSpec, RuleTables, RulesError, SubclassId, MAX_LEVEL};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CharacterId(pub Uuid);

impl CharacterId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CharacterId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Classes
// ============================================================================

/// Per-character replacement for a class's table rows.
///
/// Homebrew classes are described entirely by their override. A listed
/// class can carry one too, in which case its table is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClassOverride {
    pub slots: BTreeMap<u8, u8>,
    pub cantrips_known: u8,
    pub pools: BTreeMap<String, PoolSpec>,
    /// Levels this class adds to a multiclass caster level. Without it the
    /// class only counts when it is the sole standard caster.
    pub caster_level: Option<u8>,
    pub hit_die: DieType,
}

/// One class held by a character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassState {
    pub class_id: ClassId,
    #[serde(alias = "currentLevel")]
    pub level: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subclass_id: Option<SubclassId>,
    #[serde(default, rename = "override", skip_serializing_if = "Option::is_none")]
    pub overrides: Option<ClassOverride>,
}

impl ClassState {
    pub fn new(class_id: impl Into<ClassId>, level: u8) -> Self {
        Self {
            class_id: class_id.into(),
            level,
            subclass_id: None,
            overrides: None,
        }
    }

    pub fn with_subclass(mut self, subclass_id: impl Into<SubclassId>) -> Self {
        self.subclass_id = Some(subclass_id.into());
        self
    }

    pub fn with_override(mut self, overrides: ClassOverride) -> Self {
        self.overrides = Some(overrides);
        self
    }

    /// A homebrew class with no table of its own.
    pub fn is_custom(&self, tables: &RuleTables) -> bool {
        self.overrides.is_some() && !tables.contains(&self.class_id)
    }
}

// ============================================================================
// Spells
// ============================================================================

/// A spell the character has selected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpellSelection {
    pub spell_id: String,
    /// Spell level; 0 for cantrips.
    pub level: u8,
    /// Classes whose spell list includes this spell.
    #[serde(default)]
    pub classes: BTreeSet<ClassId>,
    #[serde(default)]
    pub prepared: bool,
}

impl SpellSelection {
    pub fn new<I, C>(spell_id: impl Into<String>, level: u8, classes: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<ClassId>,
    {
        Self {
            spell_id: spell_id.into(),
            level,
            classes: classes.into_iter().map(Into::into).collect(),
            prepared: false,
        }
    }

    pub fn is_cantrip(&self) -> bool {
        self.level == 0
    }
}

// ============================================================================
// Resource State
// ============================================================================

/// Current (spendable) resources, persisted by the caller between sessions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResourceState {
    pub slots: SlotTable,
    pub pact_slots: u8,
    pub pools: BTreeMap<ClassId, BTreeMap<String, u32>>,
    pub hit_dice: BTreeMap<DieType, u8>,
    pub arcanum_used: BTreeSet<u8>,
}

impl ResourceState {
    /// Everything at its maximum.
    pub fn full(computed: &ComputedResources) -> Self {
        Self {
            slots: computed.standard_slots,
            pact_slots: computed.pact_slots.count,
            pools: computed
                .pools
                .iter()
                .map(|(class_id, pools)| {
                    let maxed = pools
                        .iter()
                        .map(|(name, pool)| (name.clone(), pool.max))
                        .collect();
                    (class_id.clone(), maxed)
                })
                .collect(),
            hit_dice: computed.hit_dice.clone(),
            arcanum_used: BTreeSet::new(),
        }
    }

    pub fn spend_slot(&mut self, spell_level: u8) -> bool {
        self.slots.take(spell_level)
    }

    pub fn spend_pact_slot(&mut self) -> bool {
        if self.pact_slots == 0 {
            return false;
        }
        self.pact_slots -= 1;
        true
    }

    /// Spend one use of a pool. `Ok(false)` when the pool is empty.
    pub fn spend_pool(&mut self, class_id: &ClassId, pool: &str) -> Result<bool, RulesError> {
        self.spend_pool_amount(class_id, pool, 1)
    }

    /// Spend several points at once (lay on hands, sorcery points).
    pub fn spend_pool_amount(
        &mut self,
        class_id: &ClassId,
        pool: &str,
        amount: u32,
    ) -> Result<bool, RulesError> {
        let current = self
            .pools
            .get_mut(class_id)
            .and_then(|pools| pools.get_mut(pool))
            .ok_or_else(|| RulesError::UnknownPool {
                class_id: class_id.clone(),
                pool: pool.to_string(),
            })?;
        if *current < amount {
            return Ok(false);
        }
        *current -= amount;
        Ok(true)
    }

    pub fn pool(&self, class_id: &ClassId, pool: &str) -> Option<u32> {
        self.pools.get(class_id)?.get(pool).copied()
    }

    pub fn spend_hit_die(&mut self, die: DieType) -> bool {
        match self.hit_dice.get_mut(&die) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }

    /// Mark a mystic arcanum level as used. False if the character has no
    /// arcanum at that level or already used it.
    pub fn use_arcanum(&mut self, computed: &ComputedResources, spell_level: u8) -> bool {
        computed.mystic_arcanum.contains(&spell_level) && self.arcanum_used.insert(spell_level)
    }
}

// ============================================================================
// Snapshot
// ============================================================================

/// Everything the engine needs to know about one character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterSnapshot {
    #[serde(default)]
    pub id: CharacterId,
    pub name: String,
    pub classes: Vec<ClassState>,
    #[serde(default)]
    pub spells: Vec<SpellSelection>,
    #[serde(default)]
    pub resources: ResourceState,
}

impl CharacterSnapshot {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: CharacterId::new(),
            name: name.into(),
            classes: Vec::new(),
            spells: Vec::new(),
            resources: ResourceState::default(),
        }
    }

    pub fn total_level(&self) -> u32 {
        self.classes.iter().map(|class| u32::from(class.level)).sum()
    }

    /// Proficiency bonus for the total character level.
    pub fn proficiency_bonus(&self) -> u8 {
        let level = self.total_level().clamp(1, u32::from(MAX_LEVEL));
        // At most 6, so the cast cannot truncate.
        (2 + (level - 1) / 4) as u8
    }

    pub fn class(&self, class_id: &ClassId) -> Option<&ClassState> {
        self.classes.iter().find(|class| &class.class_id == class_id)
    }

    pub fn class_ids(&self) -> BTreeSet<&ClassId> {
        self.classes.iter().map(|class| &class.class_id).collect()
    }

    pub fn holds_custom_class(&self, tables: &RuleTables) -> bool {
        self.classes.iter().any(|class| class.is_custom(tables))
    }

    /// Add a class. The class must resolve against the tables (or carry an
    /// override) and the new total level must stay within 1-20.
    pub fn add_class(&mut self, tables: &RuleTables, state: ClassState) -> Result<(), RulesError> {
        if self.class(&state.class_id).is_some() {
            return Err(RulesError::DuplicateClass(state.class_id));
        }
        tables.resolve(&state)?;
        self.check_total(self.total_level() + u32::from(state.level))?;

        tracing::debug!(class = %state.class_id, level = state.level, "Added class");
        self.classes.push(state);
        Ok(())
    }

    /// Remove a class along with its pool state.
    pub fn remove_class(&mut self, class_id: &ClassId) -> Result<ClassState, RulesError> {
        let index = self.index_of(class_id)?;
        self.resources.pools.remove(class_id);
        Ok(self.classes.remove(index))
    }

    pub fn set_class_level(
        &mut self,
        tables: &RuleTables,
        class_id: &ClassId,
        level: u8,
    ) -> Result<(), RulesError> {
        let index = self.index_of(class_id)?;
        let mut updated = self.classes[index].clone();
        updated.level = level;
        tables.resolve(&updated)?;

        let others = self.total_level() - u32::from(self.classes[index].level);
        self.check_total(others + u32::from(level))?;
        self.classes[index] = updated;
        Ok(())
    }

    pub fn set_subclass(
        &mut self,
        tables: &RuleTables,
        class_id: &ClassId,
        subclass_id: Option<SubclassId>,
    ) -> Result<(), RulesError> {
        let index = self.index_of(class_id)?;
        let mut updated = self.classes[index].clone();
        updated.subclass_id = subclass_id;
        tables.resolve(&updated)?;
        self.classes[index] = updated;
        Ok(())
    }

    /// Add a spell unless one with the same id (ignoring case) is already
    /// selected. Returns whether it was added.
    pub fn add_spell(&mut self, spell: SpellSelection) -> bool {
        if self.find_spell(&spell.spell_id).is_some() {
            return false;
        }
        self.spells.push(spell);
        true
    }

    pub fn remove_spell(&mut self, spell_id: &str) -> Option<SpellSelection> {
        let index = self.find_spell(spell_id)?;
        Some(self.spells.remove(index))
    }

    fn find_spell(&self, spell_id: &str) -> Option<usize> {
        self.spells
            .iter()
            .position(|spell| spell.spell_id.eq_ignore_ascii_case(spell_id))
    }

    fn index_of(&self, class_id: &ClassId) -> Result<usize, RulesError> {
        self.classes
            .iter()
            .position(|class| &class.class_id == class_id)
            .ok_or_else(|| RulesError::ClassNotHeld(class_id.clone()))
    }

    fn check_total(&self, total: u32) -> Result<(), RulesError> {
        if (1..=u32::from(MAX_LEVEL)).contains(&total) {
            Ok(())
        } else {
            Err(RulesError::TotalLevelOutOfRange(total))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables() -> &'static RuleTables {
        RuleTables::bundled().unwrap()
    }

    fn wizard_cleric() -> CharacterSnapshot {
        let mut character = CharacterSnapshot::new("Ilsa");
        character
            .add_class(tables(), ClassState::new("wizard", 5))
            .unwrap();
        character
            .add_class(tables(), ClassState::new("cleric", 2))
            .unwrap();
        character
    }

    #[test]
    fn test_add_class_rejects_duplicates() {
        let mut character = wizard_cleric();
        assert_eq!(
            character.add_class(tables(), ClassState::new("Wizard", 1)),
            Err(RulesError::DuplicateClass(ClassId::new("wizard")))
        );
    }

    #[test]
    fn test_add_class_rejects_unknown_class() {
        let mut character = CharacterSnapshot::new("Ilsa");
        assert_eq!(
            character.add_class(tables(), ClassState::new("tinkerer", 1)),
            Err(RulesError::UnknownClass(ClassId::new("tinkerer")))
        );
        // With an override the same class is accepted as homebrew.
        character
            .add_class(
                tables(),
                ClassState::new("tinkerer", 1).with_override(ClassOverride::default()),
            )
            .unwrap();
        assert!(character.holds_custom_class(tables()));
    }

    #[test]
    fn test_total_level_capped() {
        let mut character = wizard_cleric();
        assert_eq!(
            character.add_class(tables(), ClassState::new("fighter", 14)),
            Err(RulesError::TotalLevelOutOfRange(21))
        );
        assert_eq!(
            character.set_class_level(tables(), &ClassId::new("wizard"), 19),
            Err(RulesError::TotalLevelOutOfRange(21))
        );
        character
            .set_class_level(tables(), &ClassId::new("wizard"), 18)
            .unwrap();
        assert_eq!(character.total_level(), 20);
    }

    #[test]
    fn test_level_zero_rejected() {
        let mut character = wizard_cleric();
        assert!(matches!(
            character.set_class_level(tables(), &ClassId::new("cleric"), 0),
            Err(RulesError::LevelOutOfRange { level: 0, .. })
        ));
    }

    #[test]
    fn test_remove_class() {
        let mut character = wizard_cleric();
        let removed = character.remove_class(&ClassId::new("cleric")).unwrap();
        assert_eq!(removed.level, 2);
        assert_eq!(
            character.remove_class(&ClassId::new("cleric")),
            Err(RulesError::ClassNotHeld(ClassId::new("cleric")))
        );
    }

    #[test]
    fn test_subclass_must_match_parent() {
        let mut character = wizard_cleric();
        assert!(matches!(
            character.set_subclass(
                tables(),
                &ClassId::new("wizard"),
                Some(SubclassId::new("battle_master"))
            ),
            Err(RulesError::SubclassMismatch { .. })
        ));
    }

    #[test]
    fn test_proficiency_bonus() {
        let mut character = wizard_cleric();
        assert_eq!(character.proficiency_bonus(), 3);
        character
            .set_class_level(tables(), &ClassId::new("wizard"), 13)
            .unwrap();
        assert_eq!(character.proficiency_bonus(), 5);
    }

    #[test]
    fn test_add_spell_ignores_case_duplicates() {
        let mut character = wizard_cleric();
        assert!(character.add_spell(SpellSelection::new("Shield", 1, ["wizard"])));
        assert!(!character.add_spell(SpellSelection::new("shield", 1, ["wizard"])));
        assert!(character.remove_spell("SHIELD").is_some());
        assert!(character.spells.is_empty());
    }

    #[test]
    fn test_spending_resources() {
        let character = wizard_cleric();
        let computed = ComputedResources::compute(tables(), &character.classes).unwrap();
        let mut state = ResourceState::full(&computed);
        let cleric = ClassId::new("cleric");

        assert!(state.spend_slot(4));
        assert!(!state.spend_slot(5));
        assert!(!state.spend_pact_slot());

        assert_eq!(state.pool(&cleric, "channel_divinity"), Some(2));
        assert_eq!(state.spend_pool(&cleric, "channel_divinity"), Ok(true));
        assert_eq!(state.spend_pool(&cleric, "channel_divinity"), Ok(true));
        assert_eq!(state.spend_pool(&cleric, "channel_divinity"), Ok(false));
        assert_eq!(
            state.spend_pool(&cleric, "rage"),
            Err(RulesError::UnknownPool {
                class_id: cleric.clone(),
                pool: "rage".to_string()
            })
        );

        assert!(state.spend_hit_die(DieType::D6));
        assert!(!state.spend_hit_die(DieType::D12));
    }

    #[test]
    fn test_snapshot_deserializes_with_defaults() {
        let json = r#"{
            "name": "Vex",
            "classes": [
                { "classId": "Warlock", "currentLevel": 3 },
                { "classId": "Tinkerer", "level": 2, "override": { "cantripsKnown": 1 } }
            ]
        }"#;
        let character: CharacterSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(character.classes[0].class_id, ClassId::new("warlock"));
        assert_eq!(character.classes[0].level, 3);
        assert_eq!(
            character.classes[1].overrides.as_ref().map(|o| o.cantrips_known),
            Some(1)
        );
        assert!(character.spells.is_empty());
    }
}
