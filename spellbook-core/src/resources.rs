//! Resource calculation.
//!
//! [`ComputedResources`] is derived from a class list every time it is
//! needed and never stored.

use crate::character::{CharacterSnapshot, ClassState};
use crate::dice::DieType;
use crate::slots::{aggregate_resolved, PactSlots, SlotTable};
use crate::tables::{ClassId, RechargeType, ResolvedClass, RuleTables, RulesError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A named, per-class counter such as rage uses or sorcery points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcePool {
    pub max: u32,
    pub current: u32,
    pub recharge: RechargeType,
}

impl ResourcePool {
    fn full(max: u32, recharge: RechargeType) -> Self {
        Self {
            max,
            current: max,
            recharge,
        }
    }
}

/// Maximum resources for a class list.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputedResources {
    pub standard_slots: SlotTable,
    pub pact_slots: PactSlots,
    /// Pools per class. Every pool a class defines is present, at zero
    /// until the class reaches the level that unlocks it.
    pub pools: BTreeMap<ClassId, BTreeMap<String, ResourcePool>>,
    pub total_cantrips: u32,
    pub hit_dice: BTreeMap<DieType, u8>,
    pub mystic_arcanum: BTreeSet<u8>,
    pub caster_level: u8,
}

impl ComputedResources {
    /// Derive every resource from a class list.
    ///
    /// Fails on unknown classes, bad levels, and a class listed twice.
    pub fn compute(tables: &RuleTables, classes: &[ClassState]) -> Result<Self, RulesError> {
        let mut seen = BTreeSet::new();
        if let Some(repeat) = classes.iter().find(|state| !seen.insert(&state.class_id)) {
            return Err(RulesError::DuplicateClass(repeat.class_id.clone()));
        }

        let resolved = classes
            .iter()
            .map(|state| tables.resolve(state))
            .collect::<Result<Vec<_>, _>>()?;

        let slots = aggregate_resolved(&resolved);
        let mut computed = ComputedResources {
            standard_slots: slots.standard,
            pact_slots: slots.pact,
            caster_level: slots.caster_level,
            ..ComputedResources::default()
        };

        for class in &resolved {
            computed
                .pools
                .insert(class.class_id().clone(), class_pools(class));
            computed.total_cantrips += class.cantrips_known();

            let dice = computed.hit_dice.entry(class.hit_die).or_insert(0);
            *dice = dice.saturating_add(class.level());

            computed
                .mystic_arcanum
                .extend(class.mystic_arcanum().iter().copied());
        }

        Ok(computed)
    }

    pub fn for_character(
        tables: &RuleTables,
        character: &CharacterSnapshot,
    ) -> Result<Self, RulesError> {
        Self::compute(tables, &character.classes)
    }

    /// A class's pool. Fails if the class never defines a pool by that name.
    pub fn pool(&self, class_id: &ClassId, name: &str) -> Result<&ResourcePool, RulesError> {
        self.pools
            .get(class_id)
            .and_then(|pools| pools.get(name))
            .ok_or_else(|| RulesError::UnknownPool {
                class_id: class_id.clone(),
                pool: name.to_string(),
            })
    }

    /// Highest spell level castable from a standard or pact slot; 0 if none.
    pub fn max_spell_level(&self) -> u8 {
        self.standard_slots
            .highest_level()
            .max(self.pact_slots.level)
    }

    pub fn can_cast_leveled_spells(&self) -> bool {
        self.max_spell_level() > 0 || !self.mystic_arcanum.is_empty()
    }

    pub fn total_hit_dice(&self) -> u32 {
        self.hit_dice.values().map(|count| u32::from(*count)).sum()
    }
}

fn class_pools(class: &ResolvedClass<'_>) -> BTreeMap<String, ResourcePool> {
    let mut pools: BTreeMap<String, ResourcePool> = class
        .defined_pools()
        .into_iter()
        .map(|name| (name.to_string(), ResourcePool::full(0, RechargeType::default())))
        .collect();

    for (name, spec) in class.pools() {
        let pool = pools
            .entry(name.to_string())
            .or_insert_with(|| ResourcePool::full(0, spec.recharge));
        // A subclass may add to a pool its class already grants.
        *pool = ResourcePool::full(pool.max + spec.amount, spec.recharge);
    }
    pools
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::ClassOverride;
    use crate::tables::PoolSpec;

    fn tables() -> &'static RuleTables {
        RuleTables::bundled().unwrap()
    }

    fn compute(classes: &[ClassState]) -> ComputedResources {
        ComputedResources::compute(tables(), classes).unwrap()
    }

    #[test]
    fn test_wizard_five() {
        let computed = compute(&[ClassState::new("wizard", 5)]);
        assert_eq!(computed.standard_slots, SlotTable::from([(1, 4), (2, 3), (3, 2)]));
        assert!(computed.pact_slots.is_empty());
        assert_eq!(computed.total_cantrips, 4);
        assert_eq!(computed.hit_dice, BTreeMap::from([(DieType::D6, 5)]));
        assert_eq!(computed.max_spell_level(), 3);
    }

    #[test]
    fn test_same_named_pools_stay_separate() {
        let computed = compute(&[ClassState::new("cleric", 6), ClassState::new("paladin", 3)]);
        let cleric = computed
            .pool(&ClassId::new("cleric"), "channel_divinity")
            .unwrap();
        let paladin = computed
            .pool(&ClassId::new("paladin"), "channel_divinity")
            .unwrap();
        assert_eq!(cleric.max, 3);
        assert_eq!(paladin.max, 2);
        assert_eq!(paladin.recharge, RechargeType::ShortRest);
    }

    #[test]
    fn test_locked_pool_reads_zero() {
        let computed = compute(&[ClassState::new("fighter", 3)]);
        let fighter = ClassId::new("fighter");
        assert_eq!(computed.pool(&fighter, "indomitable").unwrap().max, 0);
        assert_eq!(computed.pool(&fighter, "action_surge").unwrap().max, 1);
        assert!(matches!(
            computed.pool(&fighter, "rage"),
            Err(RulesError::UnknownPool { .. })
        ));
    }

    #[test]
    fn test_subclass_pools_and_cantrips() {
        let master = compute(&[ClassState::new("fighter", 7).with_subclass("battle_master")]);
        let fighter = ClassId::new("fighter");
        assert_eq!(master.pool(&fighter, "superiority_dice").unwrap().max, 5);

        let knight = compute(&[ClassState::new("fighter", 10).with_subclass("eldritch_knight")]);
        assert_eq!(knight.total_cantrips, 3);
        assert_eq!(knight.standard_slots, SlotTable::from([(1, 4), (2, 3)]));
    }

    #[test]
    fn test_hit_dice_sum_per_die() {
        let computed = compute(&[
            ClassState::new("fighter", 3),
            ClassState::new("paladin", 2),
            ClassState::new("sorcerer", 1),
        ]);
        assert_eq!(
            computed.hit_dice,
            BTreeMap::from([(DieType::D6, 1), (DieType::D10, 5)])
        );
        assert_eq!(computed.total_hit_dice(), 6);
    }

    #[test]
    fn test_warlock_arcanum() {
        let computed = compute(&[ClassState::new("warlock", 15)]);
        assert_eq!(computed.mystic_arcanum, BTreeSet::from([6, 7, 8]));
        assert_eq!(computed.pact_slots, PactSlots { count: 3, level: 5 });
        assert_eq!(computed.max_spell_level(), 5);
    }

    #[test]
    fn test_override_class_resources() {
        let homebrew = ClassState::new("runecaster", 6).with_override(ClassOverride {
            slots: BTreeMap::from([(1, 3), (2, 1)]),
            cantrips_known: 2,
            pools: BTreeMap::from([("runes".to_string(), PoolSpec::short_rest(4))]),
            hit_die: DieType::D10,
            ..ClassOverride::default()
        });
        let computed = compute(&[homebrew]);
        let runecaster = ClassId::new("runecaster");

        assert_eq!(computed.standard_slots, SlotTable::from([(1, 3), (2, 1)]));
        assert_eq!(computed.total_cantrips, 2);
        assert_eq!(computed.pool(&runecaster, "runes").unwrap().max, 4);
        assert_eq!(computed.hit_dice, BTreeMap::from([(DieType::D10, 6)]));
    }

    #[test]
    fn test_no_classes_is_empty() {
        let computed = compute(&[]);
        assert_eq!(computed, ComputedResources::default());
        assert!(!computed.can_cast_leveled_spells());
    }

    #[test]
    fn test_repeated_class_is_rejected() {
        let classes = [
            ClassState::new("barbarian", 3),
            ClassState::new("Barbarian", 2),
        ];
        assert_eq!(
            ComputedResources::compute(tables(), &classes),
            Err(RulesError::DuplicateClass(ClassId::new("barbarian")))
        );
    }
}
