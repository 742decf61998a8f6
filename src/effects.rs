//! Effect vocabulary and per-actor effect profiles.
//!
//! An [`EffectProfile`] maps each intensity level to the effect kinds it
//! introduces, plus how often effects are emitted and how long each lives.
//! Lower-level kinds stay eligible at higher levels: at level 3 the pool is
//! the ordered union of the level 1, 2 and 3 lists.
//!
//! # Default timing
//!
//! | Level | Emission every | Each effect lives |
//! |-------|----------------|-------------------|
//! | 0 | never | never |
//! | 1 | 4000 ms | 200 ms |
//! | 2 | 2500 ms | 500 ms |
//! | 3 | 1500 ms | 1000 ms |
//! | 4 | 1000 ms | 2000 ms |

use crate::accessibility::AccessibilityPrefs;
use crate::error::{EngineError, EngineResult};
use crate::intensity::{IntensityLevel, LEVEL_COUNT};

// ─── Effect kinds ───────────────────────────────────────────────────────────

/// The fixed vocabulary of corruption effects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum EffectKind {
    /// Letters in dialogue swap and stutter.
    TextGlitch,
    /// Palette bleeds toward grey.
    ColorDrain,
    /// Edges of the view darken.
    Vignette,
    /// Faint audio whispers under the dialogue.
    Whisper,
    /// Analogue static over the portrait.
    StaticNoise,
    /// Light flicker across the scene.
    Flicker,
    /// The whole view jolts.
    ScreenShake,
    /// Portrait and evidence images warp.
    ImageDistortion,
    /// A fake system message interrupts the interface.
    FalseMessage,
}

impl EffectKind {
    /// Every kind, lowest priority first.
    pub const ALL: [EffectKind; 9] = [
        EffectKind::TextGlitch,
        EffectKind::ColorDrain,
        EffectKind::Vignette,
        EffectKind::Whisper,
        EffectKind::StaticNoise,
        EffectKind::Flicker,
        EffectKind::ScreenShake,
        EffectKind::ImageDistortion,
        EffectKind::FalseMessage,
    ];

    /// Static admission priority. Higher wins preemption.
    pub fn priority(self) -> u8 {
        match self {
            EffectKind::TextGlitch => 1,
            EffectKind::ColorDrain | EffectKind::Vignette => 2,
            EffectKind::Whisper | EffectKind::StaticNoise => 3,
            EffectKind::Flicker | EffectKind::ScreenShake => 4,
            EffectKind::ImageDistortion | EffectKind::FalseMessage => 5,
        }
    }

    /// Contains rapid luminance changes.
    pub fn is_flashing(self) -> bool {
        matches!(self, EffectKind::Flicker | EffectKind::StaticNoise)
    }

    /// Moves or warps the view.
    pub fn is_motion(self) -> bool {
        matches!(self, EffectKind::ScreenShake | EffectKind::ImageDistortion)
    }

    /// Surfaces this kind is drawn on.
    pub fn default_targets(self) -> &'static [EffectTarget] {
        match self {
            EffectKind::TextGlitch => &[EffectTarget::Dialogue],
            EffectKind::ColorDrain => &[EffectTarget::Background, EffectTarget::Portrait],
            EffectKind::Vignette => &[EffectTarget::Background],
            EffectKind::Whisper => &[EffectTarget::Dialogue],
            EffectKind::StaticNoise => &[EffectTarget::Portrait],
            EffectKind::Flicker => &[EffectTarget::Background, EffectTarget::Interface],
            EffectKind::ScreenShake => &[EffectTarget::Interface],
            EffectKind::ImageDistortion => &[EffectTarget::Portrait, EffectTarget::Evidence],
            EffectKind::FalseMessage => &[EffectTarget::Interface],
        }
    }

    /// Stable snake_case name.
    pub fn name(self) -> &'static str {
        match self {
            EffectKind::TextGlitch => "text_glitch",
            EffectKind::ColorDrain => "color_drain",
            EffectKind::Vignette => "vignette",
            EffectKind::Whisper => "whisper",
            EffectKind::StaticNoise => "static_noise",
            EffectKind::Flicker => "flicker",
            EffectKind::ScreenShake => "screen_shake",
            EffectKind::ImageDistortion => "image_distortion",
            EffectKind::FalseMessage => "false_message",
        }
    }
}

impl core::fmt::Display for EffectKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Part of the draw surface an effect lands on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum EffectTarget {
    /// Dialogue text box.
    Dialogue,
    /// Character portrait.
    Portrait,
    /// Scene background.
    Background,
    /// Menus, buttons, notifications.
    Interface,
    /// Investigation evidence panels.
    Evidence,
}

/// How hard the renderer should push a treatment. One class per active level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum IntensityClass {
    /// Level 1.
    Subtle,
    /// Level 2.
    Unsettling,
    /// Level 3.
    Intense,
    /// Level 4.
    Overwhelming,
}

impl IntensityClass {
    /// Class for an active level; `None` at level 0.
    pub fn from_level(level: IntensityLevel) -> Option<Self> {
        match level.get() {
            0 => None,
            1 => Some(IntensityClass::Subtle),
            2 => Some(IntensityClass::Unsettling),
            3 => Some(IntensityClass::Intense),
            _ => Some(IntensityClass::Overwhelming),
        }
    }
}

// ─── Profiles ───────────────────────────────────────────────────────────────

/// Default emission interval per level, ms. Level 0 never emits.
pub const DEFAULT_FREQUENCY_MS: [u64; LEVEL_COUNT] = [0, 4_000, 2_500, 1_500, 1_000];
/// Default effect lifetime per level, ms.
pub const DEFAULT_DURATION_MS: [u64; LEVEL_COUNT] = [0, 200, 500, 1_000, 2_000];

/// Level → eligible effect kinds, plus emission timing, for one actor.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EffectProfile {
    name: String,
    levels: [Vec<EffectKind>; LEVEL_COUNT],
    frequency_ms: [u64; LEVEL_COUNT],
    duration_ms: [u64; LEVEL_COUNT],
}

impl EffectProfile {
    /// Empty profile with the default timing tables.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            levels: Default::default(),
            frequency_ms: DEFAULT_FREQUENCY_MS,
            duration_ms: DEFAULT_DURATION_MS,
        }
    }

    /// The stock profile used when an actor has none of its own.
    pub fn standard() -> Self {
        Self::new("standard")
            .with_level(IntensityLevel::new_saturating(1), &[EffectKind::TextGlitch, EffectKind::ColorDrain])
            .with_level(IntensityLevel::new_saturating(2), &[EffectKind::Vignette, EffectKind::Whisper])
            .with_level(IntensityLevel::new_saturating(3), &[EffectKind::StaticNoise, EffectKind::Flicker])
            .with_level(
                IntensityLevel::new_saturating(4),
                &[EffectKind::ScreenShake, EffectKind::ImageDistortion, EffectKind::FalseMessage],
            )
    }

    /// Set the kinds a level introduces. Level 0 never has kinds.
    pub fn with_level(mut self, level: IntensityLevel, kinds: &[EffectKind]) -> Self {
        if level.is_active() {
            self.levels[level.index()] = kinds.to_vec();
        }
        self
    }

    /// Override emission interval and lifetime for one active level.
    pub fn with_timing(mut self, level: IntensityLevel, frequency_ms: u64, duration_ms: u64) -> Self {
        if level.is_active() {
            self.frequency_ms[level.index()] = frequency_ms;
            self.duration_ms[level.index()] = duration_ms;
        }
        self
    }

    /// Profile name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kinds introduced at exactly `level`.
    pub fn kinds_at(&self, level: IntensityLevel) -> &[EffectKind] {
        &self.levels[level.index()]
    }

    /// Ordered union of the kinds of every level from 1 through `level`.
    pub fn eligible(&self, level: IntensityLevel) -> Vec<EffectKind> {
        let mut out: Vec<EffectKind> = Vec::new();
        for kinds in self.levels.iter().take(level.index() + 1) {
            for kind in kinds {
                if !out.contains(kind) {
                    out.push(*kind);
                }
            }
        }
        out
    }

    /// Interval between emissions at `level`; 0 at level 0.
    pub fn frequency_ms(&self, level: IntensityLevel) -> u64 {
        self.frequency_ms[level.index()]
    }

    /// Lifetime of an effect admitted at `level`.
    pub fn duration_ms(&self, level: IntensityLevel) -> u64 {
        self.duration_ms[level.index()]
    }

    /// Copy of this profile with every kind the preferences forbid removed.
    pub fn filtered(&self, prefs: &AccessibilityPrefs) -> Self {
        let mut out = self.clone();
        for kinds in out.levels.iter_mut() {
            kinds.retain(|k| prefs.allows(*k));
        }
        out
    }

    /// Check the timing tables: active levels must emit and effects must live.
    pub fn validate(&self) -> EngineResult<()> {
        for level in 1..LEVEL_COUNT {
            if self.frequency_ms[level] == 0 {
                return Err(EngineError::Config(format!(
                    "profile {}: frequency for level {level} must be > 0",
                    self.name
                )));
            }
            if self.duration_ms[level] == 0 {
                return Err(EngineError::Config(format!(
                    "profile {}: duration for level {level} must be > 0",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

impl Default for EffectProfile {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessibility::HorrorIntensity;

    fn lvl(n: u8) -> IntensityLevel {
        IntensityLevel::new_saturating(n)
    }

    #[test]
    fn test_default_timing_tables() {
        let p = EffectProfile::standard();
        assert_eq!(p.frequency_ms(lvl(0)), 0);
        assert_eq!(p.frequency_ms(lvl(1)), 4_000);
        assert_eq!(p.frequency_ms(lvl(4)), 1_000);
        assert_eq!(p.duration_ms(lvl(1)), 200);
        assert_eq!(p.duration_ms(lvl(4)), 2_000);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_eligible_is_cumulative_union() {
        let p = EffectProfile::standard();
        assert!(p.eligible(lvl(0)).is_empty());
        assert_eq!(p.eligible(lvl(1)), vec![EffectKind::TextGlitch, EffectKind::ColorDrain]);

        let at3 = p.eligible(lvl(3));
        assert_eq!(at3.len(), 6);
        for kind in p.eligible(lvl(2)) {
            assert!(at3.contains(&kind), "{kind} missing at level 3");
        }
        assert_eq!(p.eligible(lvl(4)).len(), 9);
    }

    #[test]
    fn test_eligible_deduplicates_repeated_kinds() {
        let p = EffectProfile::new("repeat")
            .with_level(lvl(1), &[EffectKind::TextGlitch])
            .with_level(lvl(2), &[EffectKind::TextGlitch, EffectKind::Whisper]);
        assert_eq!(p.eligible(lvl(2)), vec![EffectKind::TextGlitch, EffectKind::Whisper]);
    }

    #[test]
    fn test_level_zero_cannot_hold_kinds() {
        let p = EffectProfile::new("calm").with_level(lvl(0), &[EffectKind::Flicker]);
        assert!(p.kinds_at(lvl(0)).is_empty());
    }

    #[test]
    fn test_filtered_removes_flashing_and_motion() {
        let prefs = AccessibilityPrefs {
            horror_intensity: HorrorIntensity::Full,
            flashing_effects: false,
            reduced_motion: true,
        };
        let p = EffectProfile::standard().filtered(&prefs);
        let all = p.eligible(lvl(4));
        assert!(all.iter().all(|k| !k.is_flashing() && !k.is_motion()), "{all:?}");
        assert!(all.contains(&EffectKind::FalseMessage));
        assert!(p.kinds_at(lvl(3)).is_empty());
    }

    #[test]
    fn test_validate_rejects_silent_active_level() {
        let p = EffectProfile::standard().with_timing(lvl(2), 0, 500);
        assert!(matches!(p.validate(), Err(EngineError::Config(_))));
    }

    #[test]
    fn test_priorities_rise_with_severity() {
        assert!(EffectKind::FalseMessage.priority() > EffectKind::Flicker.priority());
        assert!(EffectKind::Flicker.priority() > EffectKind::Whisper.priority());
        assert!(EffectKind::Whisper.priority() > EffectKind::ColorDrain.priority());
        assert!(EffectKind::ColorDrain.priority() > EffectKind::TextGlitch.priority());
    }

    #[test]
    fn test_intensity_class_per_level() {
        assert_eq!(IntensityClass::from_level(lvl(0)), None);
        assert_eq!(IntensityClass::from_level(lvl(1)), Some(IntensityClass::Subtle));
        assert_eq!(IntensityClass::from_level(lvl(4)), Some(IntensityClass::Overwhelming));
    }
}
