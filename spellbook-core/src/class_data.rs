//! Bundled class rules for the 13 standard classes.
//!
//! The dataset is generated from compact per-class descriptions rather than
//! written out row by row, then validated like any external dataset.

use crate::dice::DieType;
use crate::slots::MULTICLASS_SLOTS;
use crate::tables::{
    CasterType, ClassId, ClassLevelEntry, PoolSpec, RechargeType, RuleTables, RulesDataset,
    SubclassId, SubclassLevelEntry, SubclassRule, TableError, DATASET_VERSION, MAX_LEVEL,
};
use crate::tables::RechargeType::{LongRest, ShortRest};
use std::collections::BTreeMap;

lazy_static::lazy_static! {
    /// The bundled dataset, validated once on first access.
    pub static ref BUNDLED_TABLES: Result<RuleTables, TableError> =
        RuleTables::from_dataset(bundled_dataset());
}

/// Pact magic progression by warlock level: (slot count, slot level).
const PACT_SLOTS: [(u8, u8); 20] = [
    (1, 1),
    (2, 1),
    (2, 2),
    (2, 2),
    (2, 3),
    (2, 3),
    (2, 4),
    (2, 4),
    (2, 5),
    (2, 5),
    (3, 5),
    (3, 5),
    (3, 5),
    (3, 5),
    (3, 5),
    (3, 5),
    (4, 5),
    (4, 5),
    (4, 5),
    (4, 5),
];

/// Slots for subclass casters (Eldritch Knight, Arcane Trickster) by class
/// level. Nothing before level 3.
const THIRD_CASTER_SLOTS: [[u8; 4]; 20] = [
    [0, 0, 0, 0],
    [0, 0, 0, 0],
    [2, 0, 0, 0],
    [3, 0, 0, 0],
    [3, 0, 0, 0],
    [3, 0, 0, 0],
    [4, 2, 0, 0],
    [4, 2, 0, 0],
    [4, 2, 0, 0],
    [4, 3, 0, 0],
    [4, 3, 0, 0],
    [4, 3, 0, 0],
    [4, 3, 2, 0],
    [4, 3, 2, 0],
    [4, 3, 2, 0],
    [4, 3, 3, 0],
    [4, 3, 3, 0],
    [4, 3, 3, 0],
    [4, 3, 3, 1],
    [4, 3, 3, 1],
];

/// Mystic arcanum unlocks: (warlock level, spell level).
const ARCANUM_UNLOCKS: [(u8, u8); 4] = [(11, 6), (13, 7), (15, 8), (17, 9)];

// ============================================================================
// Class Descriptions
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum SlotSource {
    None,
    Full,
    /// The full caster table at half level, rounded up, from level 1.
    Half,
    Pact,
}

#[derive(Debug, Clone, Copy)]
enum Progression {
    Fixed(u32),
    /// Amount set at each threshold level.
    Steps(&'static [(u8, u32)]),
    /// `per_level` times class level, starting at `from`.
    PerLevel { from: u8, per_level: u32 },
}

impl Progression {
    fn at(&self, level: u8) -> u32 {
        match *self {
            Progression::Fixed(amount) => amount,
            Progression::Steps(steps) => step_value(steps, level),
            Progression::PerLevel { from, per_level } if level >= from => {
                u32::from(level) * per_level
            }
            Progression::PerLevel { .. } => 0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PoolRule {
    name: &'static str,
    progression: Progression,
    recharge: RechargeType,
    /// Level at which the pool starts recharging on a short rest instead.
    short_rest_from: Option<u8>,
}

impl PoolRule {
    const fn new(name: &'static str, progression: Progression, recharge: RechargeType) -> Self {
        Self {
            name,
            progression,
            recharge,
            short_rest_from: None,
        }
    }

    fn at(&self, level: u8) -> Option<PoolSpec> {
        let amount = self.progression.at(level);
        if amount == 0 {
            return None;
        }
        let recharge = match self.short_rest_from {
            Some(from) if level >= from => RechargeType::ShortRest,
            _ => self.recharge,
        };
        Some(PoolSpec { amount, recharge })
    }
}

struct ClassSpec {
    id: &'static str,
    caster_type: CasterType,
    hit_die: DieType,
    slots: SlotSource,
    cantrips: &'static [(u8, u32)],
    pools: &'static [PoolRule],
    mystic_arcanum: bool,
}

const CLASSES: &[ClassSpec] = &[
    ClassSpec {
        id: "artificer",
        caster_type: CasterType::Half,
        hit_die: DieType::D8,
        slots: SlotSource::Half,
        cantrips: &[(1, 2), (10, 3), (14, 4)],
        pools: &[],
        mystic_arcanum: false,
    },
    ClassSpec {
        id: "barbarian",
        caster_type: CasterType::None,
        hit_die: DieType::D12,
        slots: SlotSource::None,
        cantrips: &[],
        pools: &[PoolRule::new(
            "rage",
            Progression::Steps(&[(1, 2), (3, 3), (6, 4), (12, 5), (17, 6)]),
            LongRest,
        )],
        mystic_arcanum: false,
    },
    ClassSpec {
        id: "bard",
        caster_type: CasterType::Full,
        hit_die: DieType::D8,
        slots: SlotSource::Full,
        cantrips: &[(1, 2), (4, 3), (10, 4)],
        pools: &[PoolRule {
            name: "bardic_inspiration",
            progression: Progression::Fixed(3),
            recharge: LongRest,
            short_rest_from: Some(5),
        }],
        mystic_arcanum: false,
    },
    ClassSpec {
        id: "cleric",
        caster_type: CasterType::Full,
        hit_die: DieType::D8,
        slots: SlotSource::Full,
        cantrips: &[(1, 3), (4, 4), (10, 5)],
        pools: &[PoolRule::new(
            "channel_divinity",
            Progression::Steps(&[(2, 2), (6, 3), (18, 4)]),
            ShortRest,
        )],
        mystic_arcanum: false,
    },
    ClassSpec {
        id: "druid",
        caster_type: CasterType::Full,
        hit_die: DieType::D8,
        slots: SlotSource::Full,
        cantrips: &[(1, 2), (4, 3), (10, 4)],
        pools: &[PoolRule::new(
            "wild_shape",
            Progression::Steps(&[(2, 2), (6, 3), (17, 4)]),
            ShortRest,
        )],
        mystic_arcanum: false,
    },
    ClassSpec {
        id: "fighter",
        caster_type: CasterType::None,
        hit_die: DieType::D10,
        slots: SlotSource::None,
        cantrips: &[],
        pools: &[
            PoolRule::new(
                "second_wind",
                Progression::Steps(&[(1, 2), (4, 3), (10, 4)]),
                ShortRest,
            ),
            PoolRule::new(
                "action_surge",
                Progression::Steps(&[(2, 1), (17, 2)]),
                ShortRest,
            ),
            PoolRule::new(
                "indomitable",
                Progression::Steps(&[(9, 1), (13, 2), (17, 3)]),
                LongRest,
            ),
        ],
        mystic_arcanum: false,
    },
    ClassSpec {
        id: "monk",
        caster_type: CasterType::None,
        hit_die: DieType::D8,
        slots: SlotSource::None,
        cantrips: &[],
        pools: &[PoolRule::new(
            "focus_points",
            Progression::PerLevel {
                from: 2,
                per_level: 1,
            },
            ShortRest,
        )],
        mystic_arcanum: false,
    },
    ClassSpec {
        id: "paladin",
        caster_type: CasterType::Half,
        hit_die: DieType::D10,
        slots: SlotSource::Half,
        cantrips: &[],
        pools: &[
            PoolRule::new(
                "lay_on_hands",
                Progression::PerLevel {
                    from: 1,
                    per_level: 5,
                },
                LongRest,
            ),
            PoolRule::new(
                "channel_divinity",
                Progression::Steps(&[(3, 2), (11, 3)]),
                ShortRest,
            ),
        ],
        mystic_arcanum: false,
    },
    ClassSpec {
        id: "ranger",
        caster_type: CasterType::Half,
        hit_die: DieType::D10,
        slots: SlotSource::Half,
        cantrips: &[],
        pools: &[PoolRule::new(
            "favored_enemy",
            Progression::Steps(&[(1, 2), (5, 3), (9, 4), (13, 5), (17, 6)]),
            LongRest,
        )],
        mystic_arcanum: false,
    },
    ClassSpec {
        id: "rogue",
        caster_type: CasterType::None,
        hit_die: DieType::D8,
        slots: SlotSource::None,
        cantrips: &[],
        pools: &[PoolRule::new(
            "stroke_of_luck",
            Progression::Steps(&[(20, 1)]),
            ShortRest,
        )],
        mystic_arcanum: false,
    },
    ClassSpec {
        id: "sorcerer",
        caster_type: CasterType::Full,
        hit_die: DieType::D6,
        slots: SlotSource::Full,
        cantrips: &[(1, 4), (4, 5), (10, 6)],
        pools: &[
            PoolRule::new(
                "sorcery_points",
                Progression::PerLevel {
                    from: 2,
                    per_level: 1,
                },
                LongRest,
            ),
            PoolRule::new("innate_sorcery", Progression::Fixed(2), LongRest),
        ],
        mystic_arcanum: false,
    },
    ClassSpec {
        id: "warlock",
        caster_type: CasterType::Pact,
        hit_die: DieType::D8,
        slots: SlotSource::Pact,
        cantrips: &[(1, 2), (4, 3), (10, 4)],
        pools: &[PoolRule::new(
            "magical_cunning",
            Progression::Steps(&[(2, 1)]),
            LongRest,
        )],
        mystic_arcanum: true,
    },
    ClassSpec {
        id: "wizard",
        caster_type: CasterType::Full,
        hit_die: DieType::D6,
        slots: SlotSource::Full,
        cantrips: &[(1, 3), (4, 4), (10, 5)],
        pools: &[PoolRule::new(
            "arcane_recovery",
            Progression::Fixed(1),
            LongRest,
        )],
        mystic_arcanum: false,
    },
];

struct SubclassSpec {
    id: &'static str,
    parent: &'static str,
    caster_type: Option<CasterType>,
    spell_list: Option<&'static str>,
    /// First class level with a row.
    from: u8,
    cantrips: &'static [(u8, u32)],
    pools: &'static [PoolRule],
}

const SUBCLASSES: &[SubclassSpec] = &[
    SubclassSpec {
        id: "eldritch_knight",
        parent: "fighter",
        caster_type: Some(CasterType::Third),
        spell_list: Some("wizard"),
        from: 3,
        cantrips: &[(3, 2), (10, 3)],
        pools: &[],
    },
    SubclassSpec {
        id: "arcane_trickster",
        parent: "rogue",
        caster_type: Some(CasterType::Third),
        spell_list: Some("wizard"),
        from: 3,
        cantrips: &[(3, 3), (10, 4)],
        pools: &[],
    },
    SubclassSpec {
        id: "battle_master",
        parent: "fighter",
        caster_type: None,
        spell_list: None,
        from: 3,
        cantrips: &[],
        pools: &[PoolRule::new(
            "superiority_dice",
            Progression::Steps(&[(3, 4), (7, 5), (15, 6)]),
            ShortRest,
        )],
    },
];

// ============================================================================
// Dataset Generation
// ============================================================================

/// Build the bundled rules dataset.
pub fn bundled_dataset() -> RulesDataset {
    let mut dataset = RulesDataset {
        version: DATASET_VERSION,
        ..RulesDataset::default()
    };

    for class in CLASSES {
        let class_id = ClassId::new(class.id);
        dataset.hit_dice.insert(class_id.clone(), class.hit_die);
        for level in 1..=MAX_LEVEL {
            dataset.entries.push(class_row(class, &class_id, level));
        }
    }

    for subclass in SUBCLASSES {
        let levels = (subclass.from..=MAX_LEVEL)
            .map(|level| SubclassLevelEntry {
                level,
                cantrips_known: cantrips_at(subclass.cantrips, level),
                slots: match subclass.caster_type {
                    Some(CasterType::Third) => third_caster_slots(level),
                    _ => BTreeMap::new(),
                },
                pools: pools_at(subclass.pools, level),
            })
            .collect();
        dataset.subclasses.push(SubclassRule {
            subclass_id: SubclassId::new(subclass.id),
            parent: ClassId::new(subclass.parent),
            caster_type: subclass.caster_type,
            spell_list: subclass.spell_list.map(ClassId::new),
            levels,
        });
    }

    dataset
}

fn class_row(class: &ClassSpec, class_id: &ClassId, level: u8) -> ClassLevelEntry {
    let slots = match class.slots {
        SlotSource::None => BTreeMap::new(),
        SlotSource::Full => full_caster_slots(level),
        SlotSource::Half => full_caster_slots(level.div_ceil(2)),
        SlotSource::Pact => {
            let (count, slot_level) = PACT_SLOTS[usize::from(level) - 1];
            BTreeMap::from([(slot_level, count)])
        }
    };

    let mystic_arcanum = if class.mystic_arcanum {
        ARCANUM_UNLOCKS
            .iter()
            .filter(|(unlocked_at, _)| level >= *unlocked_at)
            .map(|(_, spell_level)| *spell_level)
            .collect()
    } else {
        Vec::new()
    };

    ClassLevelEntry {
        class_id: class_id.clone(),
        level,
        caster_type: class.caster_type,
        cantrips_known: cantrips_at(class.cantrips, level),
        slots,
        pools: pools_at(class.pools, level),
        mystic_arcanum,
    }
}

fn full_caster_slots(level: u8) -> BTreeMap<u8, u8> {
    slot_row(&MULTICLASS_SLOTS[usize::from(level) - 1])
}

fn third_caster_slots(level: u8) -> BTreeMap<u8, u8> {
    slot_row(&THIRD_CASTER_SLOTS[usize::from(level) - 1])
}

fn slot_row(counts: &[u8]) -> BTreeMap<u8, u8> {
    (1u8..)
        .zip(counts.iter().copied())
        .filter(|(_, count)| *count > 0)
        .collect()
}

fn cantrips_at(steps: &[(u8, u32)], level: u8) -> u8 {
    u8::try_from(step_value(steps, level)).unwrap_or(u8::MAX)
}

fn pools_at(rules: &[PoolRule], level: u8) -> BTreeMap<String, PoolSpec> {
    rules
        .iter()
        .filter_map(|rule| rule.at(level).map(|spec| (rule.name.to_string(), spec)))
        .collect()
}

/// Value of the last step at or below `level`; 0 before the first step.
fn step_value(steps: &[(u8, u32)], level: u8) -> u32 {
    steps
        .iter()
        .take_while(|(threshold, _)| *threshold <= level)
        .last()
        .map_or(0, |(_, value)| *value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::RuleTables;

    fn tables() -> &'static RuleTables {
        RuleTables::bundled().expect("bundled dataset should validate")
    }

    fn slots(class: &str, level: u8) -> BTreeMap<u8, u8> {
        tables().lookup(&ClassId::new(class), level).unwrap().slots.clone()
    }

    #[test]
    fn test_bundled_dataset_validates() {
        let tables = tables();
        assert_eq!(tables.class_ids().len(), 13);
        assert!(tables.subclass(&SubclassId::new("eldritch_knight")).is_some());
    }

    #[test]
    fn test_full_caster_rows() {
        assert_eq!(slots("wizard", 1), BTreeMap::from([(1, 2)]));
        assert_eq!(slots("wizard", 5), BTreeMap::from([(1, 4), (2, 3), (3, 2)]));
        assert_eq!(slots("cleric", 20)[&9], 1);
        assert_eq!(slots("cleric", 20)[&6], 2);
    }

    #[test]
    fn test_half_casters_have_slots_from_level_one() {
        assert_eq!(slots("paladin", 1), BTreeMap::from([(1, 2)]));
        assert_eq!(slots("ranger", 5), BTreeMap::from([(1, 4), (2, 2)]));
        assert_eq!(slots("artificer", 9), slots("wizard", 5));
    }

    #[test]
    fn test_pact_rows() {
        assert_eq!(slots("warlock", 1), BTreeMap::from([(1, 1)]));
        assert_eq!(slots("warlock", 5), BTreeMap::from([(3, 2)]));
        assert_eq!(slots("warlock", 11), BTreeMap::from([(5, 3)]));
        assert_eq!(slots("warlock", 20), BTreeMap::from([(5, 4)]));
    }

    #[test]
    fn test_mystic_arcanum_accumulates() {
        let warlock = ClassId::new("warlock");
        assert!(tables().lookup(&warlock, 10).unwrap().mystic_arcanum.is_empty());
        assert_eq!(tables().lookup(&warlock, 13).unwrap().mystic_arcanum, vec![6, 7]);
        assert_eq!(
            tables().lookup(&warlock, 20).unwrap().mystic_arcanum,
            vec![6, 7, 8, 9]
        );
    }

    #[test]
    fn test_cantrip_thresholds() {
        let known = |class: &str, level| {
            tables()
                .lookup(&ClassId::new(class), level)
                .unwrap()
                .cantrips_known
        };
        assert_eq!(known("wizard", 3), 3);
        assert_eq!(known("wizard", 4), 4);
        assert_eq!(known("sorcerer", 10), 6);
        assert_eq!(known("artificer", 13), 3);
        assert_eq!(known("paladin", 20), 0);
    }

    #[test]
    fn test_pool_progressions() {
        let pool = |class: &str, level, name: &str| {
            tables()
                .lookup(&ClassId::new(class), level)
                .unwrap()
                .pools
                .get(name)
                .copied()
        };
        assert_eq!(pool("barbarian", 1, "rage"), Some(PoolSpec::long_rest(2)));
        assert_eq!(pool("barbarian", 17, "rage"), Some(PoolSpec::long_rest(6)));
        assert_eq!(pool("monk", 1, "focus_points"), None);
        assert_eq!(pool("monk", 7, "focus_points"), Some(PoolSpec::short_rest(7)));
        assert_eq!(
            pool("paladin", 4, "lay_on_hands"),
            Some(PoolSpec::long_rest(20))
        );
        assert_eq!(
            pool("bard", 4, "bardic_inspiration"),
            Some(PoolSpec::long_rest(3))
        );
        assert_eq!(
            pool("bard", 5, "bardic_inspiration"),
            Some(PoolSpec::short_rest(3))
        );
    }

    #[test]
    fn test_hit_dice() {
        let die = |class: &str| tables().hit_die(&ClassId::new(class)).unwrap();
        assert_eq!(die("barbarian"), DieType::D12);
        assert_eq!(die("fighter"), DieType::D10);
        assert_eq!(die("warlock"), DieType::D8);
        assert_eq!(die("wizard"), DieType::D6);
    }

    #[test]
    fn test_third_caster_subclass_rows() {
        let rule = tables()
            .subclass(&SubclassId::new("eldritch_knight"))
            .unwrap();
        assert!(rule.at(2).is_none());
        assert_eq!(rule.at(3).unwrap().slots, BTreeMap::from([(1, 2)]));
        assert_eq!(rule.at(7).unwrap().slots, BTreeMap::from([(1, 4), (2, 2)]));
        assert_eq!(rule.at(19).unwrap().slots[&4], 1);
        assert_eq!(rule.spell_list_at(2), None);
        assert_eq!(rule.spell_list_at(3), Some(&ClassId::new("wizard")));
    }

    #[test]
    fn test_dataset_round_trips_through_tables() {
        let exported = tables().to_dataset();
        let rebuilt = RuleTables::from_dataset(exported.clone()).unwrap();
        assert_eq!(rebuilt.to_dataset(), exported);
    }
}
