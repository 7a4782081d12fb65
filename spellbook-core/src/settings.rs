//! Engine settings.
//!
//! These live in the application's settings file alongside unrelated
//! preferences, so unknown keys are ignored and missing keys take defaults.

use crate::rest::HitDicePolicy;
use crate::validation::ValidationConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    #[serde(flatten)]
    pub validation: ValidationConfig,
    pub long_rest_hit_dice: HitDicePolicy,
}
