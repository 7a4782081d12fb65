//! Spellcasting resource engine for D&D 5e characters.
//!
//! This crate provides:
//! - Class rule tables (bundled, or loaded from a JSON dataset)
//! - Spell slot aggregation across multiclass and pact casters
//! - Resource pool, cantrip and hit dice calculation
//! - Spell selection validation with explainable warnings
//! - Long and short rest resolution
//!
//! # Quick Start
//!
//! ```ignore
//! use spellbook_core::{
//!     apply_long_rest, validate_character, CharacterSnapshot, ClassState,
//!     EngineSettings, RuleTables, SpellSelection,
//! };
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let tables = RuleTables::bundled()?;
//!     let settings = EngineSettings::default();
//!
//!     let mut character = CharacterSnapshot::new("Elara");
//!     character.add_class(tables, ClassState::new("wizard", 5))?;
//!     character.add_class(tables, ClassState::new("warlock", 2))?;
//!     character.add_spell(SpellSelection::new("fireball", 3, ["wizard", "sorcerer"]));
//!
//!     for warning in validate_character(tables, &character, &settings.validation)? {
//!         println!("{warning}");
//!     }
//!
//!     character.resources = apply_long_rest(tables, &character, settings.long_rest_hit_dice)?;
//!     Ok(())
//! }
//! ```

pub mod character;
pub mod class_data;
pub mod dice;
pub mod persist;
pub mod resources;
pub mod rest;
pub mod settings;
pub mod slots;
pub mod tables;
pub mod testing;
pub mod validation;

// Primary public API
pub use character::{
    CharacterId, CharacterSnapshot, ClassOverride, ClassState, ResourceState, SpellSelection,
};
pub use dice::DieType;
pub use persist::PersistError;
pub use resources::{ComputedResources, ResourcePool};
pub use rest::{apply_long_rest, apply_short_rest, HitDicePolicy};
pub use settings::EngineSettings;
pub use slots::{aggregate_slots, PactSlots, SlotAggregation, SlotTable};
pub use tables::{
    CasterType, ClassId, PoolSpec, RechargeType, RuleTables, RulesError, SubclassId, TableError,
};
pub use validation::{
    validate, validate_character, Severity, ValidationConfig, ValidationWarning, WarningCode,
};
