use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// Name of the system-wide doze switch in the `system_settings` table
pub const DOZE_ENABLED_SETTING: &str = "doze_enabled";

/// Gesture preference keys
///
/// The `Display` form is the persisted key; parsing also accepts the short names
/// used on the command line.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum PreferenceKey {
    #[strum(
        to_string = "gesture_hand_wave",
        serialize = "hand_wave",
        serialize = "handwave"
    )]
    HandWave,
    #[strum(to_string = "gesture_pocket", serialize = "pocket")]
    Pocket,
}

impl PreferenceKey {
    /// Persisted key string
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::HandWave => "gesture_hand_wave",
            Self::Pocket => "gesture_pocket",
        }
    }

    /// Human-readable gesture name
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::HandWave => "Hand wave",
            Self::Pocket => "Pocket",
        }
    }
}

/// A stored gesture preference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preference {
    pub key: PreferenceKey,
    pub enabled: bool,
    /// `None` when the key was never written and the default applies
    pub updated_at: Option<DateTime<Utc>>,
}
