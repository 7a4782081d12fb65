//! Spell selection validation.
//!
//! Validation never fails and never mutates: it reports what looks wrong and
//! leaves the decision to the user. Warnings come out in spell order, and
//! within one spell in check order (class, level, cantrip count).

use crate::character::{CharacterSnapshot, ClassState, SpellSelection};
use crate::resources::ComputedResources;
use crate::tables::{ClassId, RuleTables, RulesError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// What a warning is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WarningCode {
    WrongClass,
    SpellTooHighLevel,
    TooManyCantrips,
    /// Castable only through a mystic arcanum.
    ArcanumOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Validator toggles. Every check is on unless turned off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub warn_wrong_class: bool,
    pub warn_spell_too_high_level: bool,
    pub warn_too_many_cantrips: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            warn_wrong_class: true,
            warn_spell_too_high_level: true,
            warn_too_many_cantrips: true,
        }
    }
}

impl ValidationConfig {
    pub fn none() -> Self {
        Self {
            warn_wrong_class: false,
            warn_spell_too_high_level: false,
            warn_too_many_cantrips: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Detail {
    WrongClass {
        spell_classes: Vec<ClassId>,
        held: Vec<ClassId>,
    },
    TooHigh {
        spell_level: u8,
        max_level: u8,
    },
    TooManyCantrips {
        known: u32,
        limit: u32,
    },
    ArcanumOnly {
        spell_level: u8,
    },
}

/// One validation finding. The message is rendered on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    pub code: WarningCode,
    pub severity: Severity,
    pub subject_spell_id: Option<String>,
    detail: Detail,
}

impl ValidationWarning {
    fn new(code: WarningCode, severity: Severity, spell: &SpellSelection, detail: Detail) -> Self {
        Self {
            code,
            severity,
            subject_spell_id: Some(spell.spell_id.clone()),
            detail,
        }
    }

    pub fn message(&self) -> String {
        match &self.detail {
            Detail::WrongClass { spell_classes, held } => format!(
                "This spell is for {}, but this character is a {}.",
                join(spell_classes),
                join(held)
            ),
            Detail::TooHigh {
                spell_level,
                max_level: 0,
            } => format!(
                "This is a level {spell_level} spell, but this character cannot cast any leveled spells yet."
            ),
            Detail::TooHigh {
                spell_level,
                max_level,
            } => format!(
                "This is a level {spell_level} spell, but this character can only cast spells up to level {max_level}."
            ),
            Detail::TooManyCantrips { limit: 0, .. } => {
                "This is a cantrip, but this character's class(es) cannot learn cantrips.".to_string()
            }
            Detail::TooManyCantrips { known, limit } => format!(
                "This character knows {known} cantrips, more than the maximum ({limit}) for their class(es) and level."
            ),
            Detail::ArcanumOnly { spell_level } => format!(
                "This level {spell_level} spell can only be cast through Mystic Arcanum, once per long rest."
            ),
        }
    }
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.subject_spell_id {
            Some(spell_id) => write!(f, "{spell_id}: {}", self.message()),
            None => write!(f, "{}", self.message()),
        }
    }
}

fn join(ids: &[ClassId]) -> String {
    ids.iter()
        .map(ClassId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// Validation
// ============================================================================

/// Check a spell list against computed resources.
pub fn validate(
    tables: &RuleTables,
    resources: &ComputedResources,
    classes: &[ClassState],
    spells: &[SpellSelection],
    config: &ValidationConfig,
) -> Vec<ValidationWarning> {
    let held: BTreeSet<&ClassId> = classes.iter().map(|class| &class.class_id).collect();
    // Subclass casters also take spells from their borrowed list.
    let spell_lists: BTreeSet<&ClassId> = classes
        .iter()
        .filter_map(|class| tables.resolve(class).ok()?.borrowed_spell_list())
        .chain(held.iter().copied())
        .collect();
    let has_custom = classes.iter().any(|class| class.is_custom(tables));
    // Homebrew-only characters with no cantrip count have no cantrip limit.
    let unlimited_cantrips = resources.total_cantrips == 0
        && !classes.is_empty()
        && classes.iter().all(|class| class.overrides.is_some());
    let max_level = resources.max_spell_level();

    let mut warnings = Vec::new();
    let mut cantrips_seen = 0u32;
    let mut cantrip_warned = false;

    for spell in spells {
        if config.warn_wrong_class && !has_custom && !spell.classes.is_empty() {
            tracing::trace!(spell = %spell.spell_id, "Checking class compatibility");
            if !spell.classes.iter().any(|class| spell_lists.contains(class)) {
                warnings.push(ValidationWarning::new(
                    WarningCode::WrongClass,
                    Severity::Warning,
                    spell,
                    Detail::WrongClass {
                        spell_classes: spell.classes.iter().cloned().collect(),
                        held: held.iter().map(|id| (*id).clone()).collect(),
                    },
                ));
            }
        }

        if config.warn_spell_too_high_level && !spell.is_cantrip() && spell.level > max_level {
            tracing::trace!(spell = %spell.spell_id, level = spell.level, max_level, "Spell above slot levels");
            if resources.mystic_arcanum.contains(&spell.level) {
                warnings.push(ValidationWarning::new(
                    WarningCode::ArcanumOnly,
                    Severity::Info,
                    spell,
                    Detail::ArcanumOnly {
                        spell_level: spell.level,
                    },
                ));
            } else {
                let severity = if max_level == 0 {
                    Severity::Error
                } else {
                    Severity::Warning
                };
                warnings.push(ValidationWarning::new(
                    WarningCode::SpellTooHighLevel,
                    severity,
                    spell,
                    Detail::TooHigh {
                        spell_level: spell.level,
                        max_level,
                    },
                ));
            }
        }

        if spell.is_cantrip() {
            cantrips_seen += 1;
            if config.warn_too_many_cantrips
                && !unlimited_cantrips
                && !cantrip_warned
                && cantrips_seen > resources.total_cantrips
            {
                tracing::trace!(spell = %spell.spell_id, cantrips_seen, "Cantrip limit exceeded");
                cantrip_warned = true;
                warnings.push(ValidationWarning::new(
                    WarningCode::TooManyCantrips,
                    Severity::Warning,
                    spell,
                    Detail::TooManyCantrips {
                        known: spell_cantrip_count(spells),
                        limit: resources.total_cantrips,
                    },
                ));
            }
        }
    }

    tracing::debug!(
        spells = spells.len(),
        warnings = warnings.len(),
        "Validated spell selection"
    );
    warnings
}

/// Compute resources for a character and validate its spell list.
pub fn validate_character(
    tables: &RuleTables,
    character: &CharacterSnapshot,
    config: &ValidationConfig,
) -> Result<Vec<ValidationWarning>, RulesError> {
    let resources = ComputedResources::for_character(tables, character)?;
    Ok(validate(
        tables,
        &resources,
        &character.classes,
        &character.spells,
        config,
    ))
}

fn spell_cantrip_count(spells: &[SpellSelection]) -> u32 {
    let count = spells.iter().filter(|spell| spell.is_cantrip()).count();
    u32::try_from(count).unwrap_or(u32::MAX)
}
