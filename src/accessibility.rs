//! Accessibility preferences and their read/write contract.
//!
//! Preferences are read once at session start. They act in two places:
//!
//! - the horror-intensity multiplier scales every scorer delta before the
//!   intensity machine sees it (`off` freezes the score entirely);
//! - disabling flashing or enabling reduced motion strips the matching effect
//!   kinds from the profile when it is loaded.

use crate::effects::EffectKind;
use crate::error::EngineResult;
#[cfg(feature = "serde")]
use crate::error::EngineError;

/// How much horror the player opted into.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum HorrorIntensity {
    /// No intensity at all.
    Off,
    /// 30 % of the scored impact.
    Minimal,
    /// 70 % of the scored impact.
    Moderate,
    /// Full impact.
    #[default]
    Full,
}

impl HorrorIntensity {
    /// Multiplier applied to scorer deltas.
    pub fn multiplier(self) -> f32 {
        match self {
            HorrorIntensity::Off => 0.0,
            HorrorIntensity::Minimal => 0.3,
            HorrorIntensity::Moderate => 0.7,
            HorrorIntensity::Full => 1.0,
        }
    }
}

/// Player accessibility preferences.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct AccessibilityPrefs {
    /// Horror intensity opt-in.
    pub horror_intensity: HorrorIntensity,
    /// `false` removes every flashing effect kind.
    pub flashing_effects: bool,
    /// `true` removes every motion effect kind.
    pub reduced_motion: bool,
}

impl Default for AccessibilityPrefs {
    fn default() -> Self {
        Self {
            horror_intensity: HorrorIntensity::Full,
            flashing_effects: true,
            reduced_motion: false,
        }
    }
}

impl AccessibilityPrefs {
    /// Multiplier for scorer deltas.
    pub fn score_multiplier(&self) -> f32 {
        self.horror_intensity.multiplier()
    }

    /// Whether `kind` may appear under these preferences.
    pub fn allows(&self, kind: EffectKind) -> bool {
        if !self.flashing_effects && kind.is_flashing() {
            return false;
        }
        if self.reduced_motion && kind.is_motion() {
            return false;
        }
        true
    }

    /// Parse the `{horrorIntensity, flashingEffects, reducedMotion}` record.
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> EngineResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| EngineError::Preferences(format!("JSON parse error: {e}")))
    }

    /// Encode as the `{horrorIntensity, flashingEffects, reducedMotion}` record.
    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> EngineResult<String> {
        serde_json::to_string(self)
            .map_err(|e| EngineError::Preferences(format!("JSON encode error: {e}")))
    }
}

/// Where preferences live between sessions. The engine only reads at session
/// start; the host writes when the player changes a setting.
pub trait PreferenceStore {
    /// Read the stored preferences (defaults when nothing is stored).
    fn load(&self) -> EngineResult<AccessibilityPrefs>;
    /// Persist new preferences.
    fn save(&mut self, prefs: &AccessibilityPrefs) -> EngineResult<()>;
}

/// In-memory store; the default when the host supplies none.
#[derive(Clone, Debug, Default)]
pub struct MemoryPreferenceStore {
    stored: Option<AccessibilityPrefs>,
}

impl MemoryPreferenceStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn load(&self) -> EngineResult<AccessibilityPrefs> {
        Ok(self.stored.unwrap_or_default())
    }

    fn save(&mut self, prefs: &AccessibilityPrefs) -> EngineResult<()> {
        self.stored = Some(*prefs);
        Ok(())
    }
}
