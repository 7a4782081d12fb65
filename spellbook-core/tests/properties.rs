//! Randomized property checks over class combinations.
//!
//! Seeds are fixed so failures reproduce.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use spellbook_core::slots::{multiclass_slots, MULTICLASS_SLOTS};
use spellbook_core::testing::spell;
use spellbook_core::{
    apply_long_rest, validate_character, CharacterSnapshot, ClassState, ComputedResources,
    HitDicePolicy, RuleTables, ValidationConfig,
};

const CASES: usize = 200;

const CLASSES: [&str; 13] = [
    "artificer",
    "barbarian",
    "bard",
    "cleric",
    "druid",
    "fighter",
    "monk",
    "paladin",
    "ranger",
    "rogue",
    "sorcerer",
    "warlock",
    "wizard",
];

fn tables() -> &'static RuleTables {
    RuleTables::bundled().expect("Bundled tables should validate")
}

/// A character with 1-3 distinct classes and a total level of at most 20.
fn random_character(rng: &mut StdRng) -> CharacterSnapshot {
    let count = rng.gen_range(1..=3);
    let picks: Vec<&str> = CLASSES.choose_multiple(rng, count).copied().collect();

    let mut character = CharacterSnapshot::new("Random");
    let mut budget: u8 = 20;
    for (index, class_id) in picks.iter().enumerate() {
        let reserve = (picks.len() - index - 1) as u8;
        if budget <= reserve {
            break;
        }
        let level = rng.gen_range(1..=budget - reserve);
        budget -= level;
        let mut state = ClassState::new(*class_id, level);
        if *class_id == "fighter" && level >= 3 && rng.gen_bool(0.5) {
            state = state.with_subclass("eldritch_knight");
        }
        character
            .add_class(tables(), state)
            .expect("Random class should be valid");
    }

    let computed = ComputedResources::for_character(tables(), &character).unwrap();
    character.resources = spellbook_core::ResourceState::full(&computed);
    character
}

fn spend_randomly(rng: &mut StdRng, character: &mut CharacterSnapshot) {
    for _ in 0..rng.gen_range(0..10) {
        let spell_level = rng.gen_range(1..=9);
        character.resources.spend_slot(spell_level);
    }
    character.resources.spend_pact_slot();
    let dice: Vec<_> = character.resources.hit_dice.keys().copied().collect();
    for die in dice {
        for _ in 0..rng.gen_range(0..4) {
            character.resources.spend_hit_die(die);
        }
    }
}

#[test]
fn test_single_full_caster_matches_native_row() {
    for class_id in ["bard", "cleric", "druid", "sorcerer", "wizard"] {
        for level in 1..=20u8 {
            let computed =
                ComputedResources::compute(tables(), &[ClassState::new(class_id, level)]).unwrap();
            assert_eq!(
                computed.standard_slots,
                multiclass_slots(level),
                "{class_id} {level}"
            );
            let row = MULTICLASS_SLOTS[usize::from(level) - 1];
            assert_eq!(computed.standard_slots.get(9), row[8]);
        }
    }
}

#[test]
fn test_multiclass_caster_level_is_sum_of_rounded_levels() {
    let mut rng = StdRng::seed_from_u64(7);
    let standard = ["paladin", "ranger", "artificer", "wizard", "cleric", "bard"];

    for _ in 0..CASES {
        let first = rng.gen_range(1..=10u8);
        let second = rng.gen_range(1..=10u8);
        let pair: Vec<&str> = standard.choose_multiple(&mut rng, 2).copied().collect();
        let classes = [
            ClassState::new(pair[0], first),
            ClassState::new(pair[1], second),
        ];

        let expected: u8 = classes
            .iter()
            .map(|class| match class.class_id.as_str() {
                "paladin" | "ranger" | "artificer" => (class.level / 2).max(1),
                _ => class.level,
            })
            .sum::<u8>()
            .min(20);

        let computed = ComputedResources::compute(tables(), &classes).unwrap();
        assert_eq!(computed.caster_level, expected, "{classes:?}");
        assert!(computed.caster_level <= first + second);
        assert_eq!(computed.standard_slots, multiclass_slots(expected));
    }
}

#[test]
fn test_pact_and_full_caster_have_both_slot_kinds() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..CASES {
        let warlock = rng.gen_range(1..=10u8);
        let wizard = rng.gen_range(1..=10u8);
        let computed = ComputedResources::compute(
            tables(),
            &[
                ClassState::new("warlock", warlock),
                ClassState::new("wizard", wizard),
            ],
        )
        .unwrap();
        assert!(!computed.pact_slots.is_empty());
        assert!(!computed.standard_slots.is_empty());
    }
}

#[test]
fn test_long_rest_all_is_a_fixed_point() {
    let mut rng = StdRng::seed_from_u64(23);
    for _ in 0..CASES {
        let mut character = random_character(&mut rng);
        spend_randomly(&mut rng, &mut character);

        character.resources = apply_long_rest(tables(), &character, HitDicePolicy::All).unwrap();
        let once = character.resources.clone();
        character.resources = apply_long_rest(tables(), &character, HitDicePolicy::All).unwrap();
        assert_eq!(character.resources, once);
    }
}

#[test]
fn test_long_rest_none_keeps_hit_dice() {
    let mut rng = StdRng::seed_from_u64(31);
    for _ in 0..CASES {
        let mut character = random_character(&mut rng);
        spend_randomly(&mut rng, &mut character);

        let rested = apply_long_rest(tables(), &character, HitDicePolicy::None).unwrap();
        assert_eq!(rested.hit_dice, character.resources.hit_dice);
    }
}

#[test]
fn test_long_rest_half_restores_bounded_amount() {
    let mut rng = StdRng::seed_from_u64(37);
    for _ in 0..CASES {
        let mut character = random_character(&mut rng);
        spend_randomly(&mut rng, &mut character);
        let computed = ComputedResources::for_character(tables(), &character).unwrap();

        let before: u32 = character.resources.hit_dice.values().map(|n| u32::from(*n)).sum();
        let rested = apply_long_rest(tables(), &character, HitDicePolicy::Half).unwrap();
        let after: u32 = rested.hit_dice.values().map(|n| u32::from(*n)).sum();

        let total = computed.total_hit_dice();
        let missing = total - before;
        assert_eq!(after - before, missing.min(total.div_ceil(2)));
        for (die, count) in &rested.hit_dice {
            assert!(*count <= computed.hit_dice[die]);
        }
    }
}

#[test]
fn test_validation_is_deterministic() {
    let mut rng = StdRng::seed_from_u64(43);
    for _ in 0..CASES {
        let mut character = random_character(&mut rng);
        for n in 0..rng.gen_range(0..8) {
            let level = rng.gen_range(0..=9);
            let class_id = *CLASSES.choose(&mut rng).unwrap();
            character.add_spell(spell(&format!("spell_{n}"), level, &[class_id]));
        }

        let config = ValidationConfig::default();
        let first = validate_character(tables(), &character, &config).unwrap();
        let second = validate_character(tables(), &character, &config).unwrap();
        assert_eq!(first, second);
    }
}
