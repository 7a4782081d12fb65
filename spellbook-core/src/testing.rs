//! Testing utilities for the spellcasting engine.
//!
//! This module provides tools for unit and integration tests:
//! - `TestCharacter` for building characters with full resources
//! - Shorthand constructors for spells and classes
//! - Assertion helpers for validation output and slot tables

use crate::character::{CharacterSnapshot, ClassOverride, ClassState, ResourceState, SpellSelection};
use crate::resources::ComputedResources;
use crate::slots::SlotTable;
use crate::tables::{RuleTables, RulesError};
use crate::validation::{ValidationWarning, WarningCode};

/// Builder for test characters.
///
/// Classes are added through the same checks as
/// [`CharacterSnapshot::add_class`], and the built character starts with
/// every resource at its maximum.
pub struct TestCharacter<'a> {
    tables: &'a RuleTables,
    name: String,
    classes: Vec<ClassState>,
    spells: Vec<SpellSelection>,
}

impl<'a> TestCharacter<'a> {
    pub fn new(tables: &'a RuleTables) -> Self {
        Self {
            tables,
            name: "Test Character".to_string(),
            classes: Vec::new(),
            spells: Vec::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_class(mut self, class_id: &str, level: u8) -> Self {
        self.classes.push(ClassState::new(class_id, level));
        self
    }

    /// Add a class with a subclass.
    pub fn with_subclass(mut self, class_id: &str, level: u8, subclass_id: &str) -> Self {
        self.classes
            .push(ClassState::new(class_id, level).with_subclass(subclass_id));
        self
    }

    /// Add a homebrew (or overridden) class.
    pub fn with_override(mut self, class_id: &str, level: u8, overrides: ClassOverride) -> Self {
        self.classes
            .push(ClassState::new(class_id, level).with_override(overrides));
        self
    }

    pub fn with_spell(mut self, spell: SpellSelection) -> Self {
        self.spells.push(spell);
        self
    }

    pub fn build(self) -> Result<CharacterSnapshot, RulesError> {
        let mut character = CharacterSnapshot::new(self.name);
        for class in self.classes {
            character.add_class(self.tables, class)?;
        }
        for spell in self.spells {
            character.add_spell(spell);
        }
        let computed = ComputedResources::for_character(self.tables, &character)?;
        character.resources = ResourceState::full(&computed);
        Ok(character)
    }
}

/// A spell available to the given classes.
pub fn spell(spell_id: &str, level: u8, classes: &[&str]) -> SpellSelection {
    SpellSelection::new(spell_id, level, classes.iter().copied())
}

/// `count` distinct cantrips for one class.
pub fn cantrips(class_id: &str, count: usize) -> Vec<SpellSelection> {
    (1..=count)
        .map(|n| spell(&format!("cantrip_{n}"), 0, &[class_id]))
        .collect()
}

pub fn class(class_id: &str, level: u8) -> ClassState {
    ClassState::new(class_id, level)
}

/// Warning codes in output order.
pub fn warning_codes(warnings: &[ValidationWarning]) -> Vec<WarningCode> {
    warnings.iter().map(|warning| warning.code).collect()
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert that warnings contain exactly these codes, in order.
pub fn assert_warnings(warnings: &[ValidationWarning], expected: &[WarningCode]) {
    assert_eq!(
        warning_codes(warnings),
        expected,
        "unexpected warnings: {:?}",
        warnings.iter().map(ToString::to_string).collect::<Vec<_>>()
    );
}

/// Assert a slot table's non-zero levels.
pub fn assert_slots(table: &SlotTable, expected: &[(u8, u8)]) {
    assert_eq!(
        table.iter().collect::<Vec<_>>(),
        expected,
        "slot table mismatch"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::ClassId;

    #[test]
    fn test_builder_fills_resources() {
        let tables = RuleTables::bundled().unwrap();
        let character = TestCharacter::new(tables)
            .named("Morwen")
            .with_class("sorcerer", 4)
            .with_spell(spell("shield", 1, &["sorcerer", "wizard"]))
            .build()
            .unwrap();

        assert_eq!(character.name, "Morwen");
        assert_eq!(character.spells.len(), 1);
        assert_slots(&character.resources.slots, &[(1, 4), (2, 3)]);
        assert_eq!(
            character
                .resources
                .pool(&ClassId::new("sorcerer"), "sorcery_points"),
            Some(4)
        );
    }

    #[test]
    fn test_builder_propagates_errors() {
        let tables = RuleTables::bundled().unwrap();
        let result = TestCharacter::new(tables).with_class("wizard", 21).build();
        assert!(matches!(result, Err(RulesError::LevelOutOfRange { .. })));
    }

    #[test]
    fn test_cantrips_are_distinct() {
        let spells = cantrips("wizard", 3);
        assert_eq!(spells.len(), 3);
        assert!(spells.iter().all(SpellSelection::is_cantrip));
        assert_ne!(spells[0].spell_id, spells[1].spell_id);
    }
}
