//! Engine configuration.
//!
//! All timings are milliseconds on the host's virtual clock. The governor may
//! tighten the effective values at runtime (lower ceiling, longer throttle
//! window) but never loosens them past what is configured here.

use crate::admission::MAX_ACTIVE_EFFECTS;
use crate::error::{EngineError, EngineResult};

/// Runtime configuration for [`IntensityEngine`](crate::engine::IntensityEngine).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    /// Minimum spacing between applied score updates. Default: 100.
    pub throttle_window_ms: u64,
    /// Upper bound on simultaneously active effects. Default: 10.
    pub max_concurrent_effects: usize,
    /// Age after which an effect is force-released by the sweep. Default: 10 000.
    pub stale_effect_ms: u64,
    /// Interval of the stale-effect sweep. Default: 1 000.
    pub sweep_interval_ms: u64,
    /// Interval of the performance governor's sampling. Default: 1 000.
    pub sample_interval_ms: u64,
    /// Smoothing factor α of the FPS average. Default: 0.1.
    pub fps_smoothing: f32,
    /// Seed of the effect-selection RNG. Same seed, same effect sequence.
    pub rng_seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            throttle_window_ms: 100,
            max_concurrent_effects: MAX_ACTIVE_EFFECTS,
            stale_effect_ms: 10_000,
            sweep_interval_ms: 1_000,
            sample_interval_ms: 1_000,
            fps_smoothing: 0.1,
            rng_seed: 0x0D2E_AD00,
        }
    }
}

impl EngineConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> EngineResult<()> {
        if self.throttle_window_ms == 0 {
            return Err(EngineError::Config(
                "throttle_window_ms must be > 0".to_string(),
            ));
        }
        if self.max_concurrent_effects == 0 || self.max_concurrent_effects > MAX_ACTIVE_EFFECTS {
            return Err(EngineError::Config(format!(
                "max_concurrent_effects must be in [1, {MAX_ACTIVE_EFFECTS}], got {}",
                self.max_concurrent_effects
            )));
        }
        if self.stale_effect_ms == 0 {
            return Err(EngineError::Config(
                "stale_effect_ms must be > 0".to_string(),
            ));
        }
        if self.sweep_interval_ms == 0 {
            return Err(EngineError::Config(
                "sweep_interval_ms must be > 0".to_string(),
            ));
        }
        if self.sample_interval_ms == 0 {
            return Err(EngineError::Config(
                "sample_interval_ms must be > 0".to_string(),
            ));
        }
        if !(self.fps_smoothing > 0.0 && self.fps_smoothing <= 1.0) {
            return Err(EngineError::Config(format!(
                "fps_smoothing must be in (0, 1], got {}",
                self.fps_smoothing
            )));
        }
        Ok(())
    }

    /// Load from a JSON string. Missing fields take their defaults.
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> EngineResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| EngineError::Config(format!("JSON parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }
}
