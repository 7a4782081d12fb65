//! Long and short rests.
//!
//! Rests take the character's current [`ResourceState`] and return a new
//! one; the snapshot is never modified. Current values above a maximum
//! (after losing a level, say) are clamped down by either rest.

use crate::character::{CharacterSnapshot, ResourceState};
use crate::dice::DieType;
use crate::resources::{ComputedResources, ResourcePool};
use crate::tables::{ClassId, RuleTables, RulesError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How many hit dice a long rest restores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HitDicePolicy {
    #[default]
    All,
    /// Half the character's total hit dice (rounded up), largest dice first.
    Half,
    None,
}

/// Resources after a long rest.
pub fn apply_long_rest(
    tables: &RuleTables,
    character: &CharacterSnapshot,
    policy: HitDicePolicy,
) -> Result<ResourceState, RulesError> {
    let computed = ComputedResources::for_character(tables, character)?;
    let current = &character.resources;

    let rested = ResourceState {
        slots: computed.standard_slots,
        pact_slots: computed.pact_slots.count,
        pools: rest_pools(&computed, current, |pool| pool.recharge.on_long_rest()),
        hit_dice: long_rest_hit_dice(&computed.hit_dice, &current.hit_dice, policy),
        arcanum_used: Default::default(),
    };

    tracing::debug!(character = %character.id, ?policy, "Applied long rest");
    Ok(rested)
}

/// Resources after a short rest: pact slots and short-rest pools refill.
pub fn apply_short_rest(
    tables: &RuleTables,
    character: &CharacterSnapshot,
) -> Result<ResourceState, RulesError> {
    let computed = ComputedResources::for_character(tables, character)?;
    let current = &character.resources;

    let rested = ResourceState {
        slots: current.slots.clamp_to(&computed.standard_slots),
        pact_slots: computed.pact_slots.count,
        pools: rest_pools(&computed, current, |pool| pool.recharge.on_short_rest()),
        hit_dice: computed
            .hit_dice
            .iter()
            .map(|(die, max)| (*die, current_or_max(&current.hit_dice, die, *max)))
            .collect(),
        arcanum_used: current.arcanum_used.clone(),
    };

    tracing::debug!(character = %character.id, "Applied short rest");
    Ok(rested)
}

/// Refill pools that `recharges` accepts; clamp the rest to their max.
fn rest_pools(
    computed: &ComputedResources,
    current: &ResourceState,
    recharges: impl Fn(&ResourcePool) -> bool,
) -> BTreeMap<ClassId, BTreeMap<String, u32>> {
    computed
        .pools
        .iter()
        .map(|(class_id, pools)| {
            let rested = pools
                .iter()
                .map(|(name, pool)| {
                    let value = if recharges(pool) {
                        pool.max
                    } else {
                        current
                            .pool(class_id, name)
                            .map_or(pool.max, |value| value.min(pool.max))
                    };
                    (name.clone(), value)
                })
                .collect();
            (class_id.clone(), rested)
        })
        .collect()
}

fn long_rest_hit_dice(
    max: &BTreeMap<DieType, u8>,
    current: &BTreeMap<DieType, u8>,
    policy: HitDicePolicy,
) -> BTreeMap<DieType, u8> {
    match policy {
        HitDicePolicy::All => max.clone(),
        HitDicePolicy::None => max
            .iter()
            .map(|(die, max)| (*die, current_or_max(current, die, *max)))
            .collect(),
        HitDicePolicy::Half => {
            let total: u32 = max.values().map(|count| u32::from(*count)).sum();
            let mut budget = total.div_ceil(2);
            let mut rested = BTreeMap::new();
            for (die, max) in max.iter().rev() {
                let remaining = current_or_max(current, die, *max);
                let missing = u32::from(max - remaining);
                let restored = missing.min(budget);
                budget -= restored;
                // restored <= missing, which fits in a u8.
                rested.insert(*die, remaining + restored as u8);
            }
            rested
        }
    }
}

/// Current count clamped to `max`; a die type with no entry is full.
fn current_or_max(current: &BTreeMap<DieType, u8>, die: &DieType, max: u8) -> u8 {
    current.get(die).map_or(max, |count| (*count).min(max))
}
