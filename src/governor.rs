//! Closed-loop performance governor.
//!
//! The host reports frame times as they happen; once per sample interval the
//! governor folds the window into a smoothed FPS, reads memory, and derives a
//! [`QualityTier`]. The tier sets the admission ceiling, the throttle window
//! and the emission floor.
//!
//! # Tier derivation
//!
//! ```text
//!   effective = min(smoothed, instant)
//!
//!   effective < 20        → Low
//!   effective < 30        → Medium
//!   30 ≤ effective < 50   → previous FPS tier   (deadband)
//!   effective ≥ 50        → High
//!
//!   memory > 150 MB       → Low
//!   memory > 100 MB       → Medium
//!
//!   tier = worse(fps tier, memory tier)
//! ```
//!
//! One bad window degrades the tier at once; recovery follows the smoothed
//! average.

/// Render quality the engine is allowed to spend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum QualityTier {
    /// Full budget.
    #[default]
    High,
    /// Reduced budget.
    Medium,
    /// Minimal budget.
    Low,
}

impl QualityTier {
    /// Admission ceiling at this tier.
    pub fn max_concurrent_effects(self) -> usize {
        match self {
            QualityTier::High => 10,
            QualityTier::Medium => 6,
            QualityTier::Low => 3,
        }
    }

    /// Throttle window of the intensity machine at this tier.
    pub fn throttle_window_ms(self) -> u64 {
        match self {
            QualityTier::High => 100,
            QualityTier::Medium => 150,
            QualityTier::Low => 200,
        }
    }

    /// Floor on the emission interval at this tier.
    pub fn min_emission_interval_ms(self) -> u64 {
        match self {
            QualityTier::High => 0,
            QualityTier::Medium => 1_500,
            QualityTier::Low => 2_500,
        }
    }

    /// The more restrictive of two tiers.
    pub fn worse(self, other: QualityTier) -> QualityTier {
        self.max(other)
    }
}

impl core::fmt::Display for QualityTier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            QualityTier::High => "high",
            QualityTier::Medium => "medium",
            QualityTier::Low => "low",
        })
    }
}

// ─── Thresholds ─────────────────────────────────────────────────────────────

/// FPS and memory boundaries between tiers.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GovernorThresholds {
    /// Below this FPS the tier is Low.
    pub fps_low: f32,
    /// Below this FPS the tier is at least Medium.
    pub fps_medium: f32,
    /// At or above this FPS the tier is High.
    pub fps_high: f32,
    /// Above this many MB the tier is Low.
    pub memory_low_mb: f32,
    /// Above this many MB the tier is at least Medium.
    pub memory_medium_mb: f32,
}

impl Default for GovernorThresholds {
    fn default() -> Self {
        Self {
            fps_low: 20.0,
            fps_medium: 30.0,
            fps_high: 50.0,
            memory_low_mb: 150.0,
            memory_medium_mb: 100.0,
        }
    }
}

impl GovernorThresholds {
    /// FPS tier with the deadband between `fps_medium` and `fps_high`.
    pub fn fps_tier(&self, fps: f32, previous: QualityTier) -> QualityTier {
        if fps < self.fps_low {
            QualityTier::Low
        } else if fps < self.fps_medium {
            QualityTier::Medium
        } else if fps >= self.fps_high {
            QualityTier::High
        } else {
            previous
        }
    }

    /// Memory tier.
    pub fn memory_tier(&self, memory_mb: f32) -> QualityTier {
        if memory_mb > self.memory_low_mb {
            QualityTier::Low
        } else if memory_mb > self.memory_medium_mb {
            QualityTier::Medium
        } else {
            QualityTier::High
        }
    }
}

/// Memory estimate used when the host reports none.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MemoryModel {
    /// Fixed footprint, MB.
    pub base_mb: f32,
    /// Cost per active effect, MB.
    pub per_effect_mb: f32,
    /// Cost per state-history entry, MB.
    pub per_history_entry_mb: f32,
}

impl Default for MemoryModel {
    fn default() -> Self {
        Self {
            base_mb: 40.0,
            per_effect_mb: 4.0,
            per_history_entry_mb: 0.05,
        }
    }
}

impl MemoryModel {
    /// Estimated footprint for the given load.
    pub fn estimate(&self, telemetry: TelemetrySample) -> f32 {
        self.base_mb
            + self.per_effect_mb * telemetry.active_effects as f32
            + self.per_history_entry_mb * telemetry.history_len as f32
    }
}

/// Engine load at sample time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TelemetrySample {
    /// Active effect count.
    pub active_effects: usize,
    /// State-history entries held.
    pub history_len: usize,
}

/// A tier transition.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TierChange {
    /// Tier before.
    pub previous: QualityTier,
    /// Tier after.
    pub current: QualityTier,
    /// Smoothed FPS at the sample.
    pub fps: f32,
    /// Memory reading at the sample.
    pub memory_mb: f32,
    /// Sample time.
    pub at_ms: u64,
}

/// Governor counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GovernorStats {
    /// Samples taken.
    pub samples: u64,
    /// Tier transitions.
    pub tier_changes: u64,
    /// Frames folded into samples.
    pub frames: u64,
    /// Frame reports ignored as invalid.
    pub invalid_frames: u64,
}

// ─── Governor ───────────────────────────────────────────────────────────────

/// Frame-time and memory driven tier controller.
#[derive(Clone, Debug)]
pub struct PerformanceGovernor {
    thresholds: GovernorThresholds,
    memory_model: MemoryModel,
    alpha: f32,
    smoothed_fps: Option<f32>,
    instant_fps: Option<f32>,
    fps_tier: QualityTier,
    tier: QualityTier,
    window_ms: f64,
    window_frames: u32,
    reported_memory_mb: Option<f32>,
    memory_mb: f32,
    stats: GovernorStats,
}

impl PerformanceGovernor {
    /// Governor at High with smoothing factor `alpha`.
    pub fn new(alpha: f32) -> Self {
        Self {
            thresholds: GovernorThresholds::default(),
            memory_model: MemoryModel::default(),
            alpha: alpha.clamp(f32::EPSILON, 1.0),
            smoothed_fps: None,
            instant_fps: None,
            fps_tier: QualityTier::High,
            tier: QualityTier::High,
            window_ms: 0.0,
            window_frames: 0,
            reported_memory_mb: None,
            memory_mb: 0.0,
            stats: GovernorStats::default(),
        }
    }

    /// Replace the tier boundaries.
    pub fn with_thresholds(mut self, thresholds: GovernorThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Replace the memory estimate.
    pub fn with_memory_model(mut self, model: MemoryModel) -> Self {
        self.memory_model = model;
        self
    }

    /// Record one rendered frame.
    pub fn record_frame(&mut self, frame_ms: f32) {
        if !frame_ms.is_finite() || frame_ms <= 0.0 {
            self.stats.invalid_frames += 1;
            log::debug!("ignoring frame time {frame_ms}");
            return;
        }
        self.window_ms += f64::from(frame_ms);
        self.window_frames += 1;
    }

    /// Host memory reading in MB; `None` falls back to the estimate.
    pub fn report_memory(&mut self, memory_mb: Option<f32>) {
        self.reported_memory_mb = memory_mb.filter(|m| m.is_finite() && *m >= 0.0);
    }

    /// Close the current window and re-derive the tier.
    pub fn sample(&mut self, now: u64, telemetry: TelemetrySample) -> Option<TierChange> {
        self.stats.samples += 1;

        if self.window_frames > 0 {
            let mean_ms = self.window_ms / f64::from(self.window_frames);
            let instant = (1000.0 / mean_ms) as f32;
            let smoothed = match self.smoothed_fps {
                None => instant,
                Some(prev) => self.alpha * instant + (1.0 - self.alpha) * prev,
            };
            self.stats.frames += u64::from(self.window_frames);
            self.smoothed_fps = Some(smoothed);
            self.instant_fps = Some(instant);
            self.fps_tier = self.thresholds.fps_tier(smoothed.min(instant), self.fps_tier);
            self.window_ms = 0.0;
            self.window_frames = 0;
        }

        self.memory_mb = self
            .reported_memory_mb
            .unwrap_or_else(|| self.memory_model.estimate(telemetry));
        let tier = self
            .fps_tier
            .worse(self.thresholds.memory_tier(self.memory_mb));

        if tier == self.tier {
            return None;
        }
        let change = TierChange {
            previous: self.tier,
            current: tier,
            fps: self.fps(),
            memory_mb: self.memory_mb,
            at_ms: now,
        };
        log::info!(
            "quality tier {} -> {} (fps {:.1}, memory {:.1} MB)",
            change.previous,
            change.current,
            change.fps,
            change.memory_mb
        );
        self.tier = tier;
        self.stats.tier_changes += 1;
        Some(change)
    }

    /// Current tier.
    pub fn tier(&self) -> QualityTier {
        self.tier
    }

    /// Smoothed FPS; 0 before the first sample with frames.
    pub fn fps(&self) -> f32 {
        self.smoothed_fps.unwrap_or(0.0)
    }

    /// FPS of the last closed window.
    pub fn instant_fps(&self) -> Option<f32> {
        self.instant_fps
    }

    /// Memory reading used by the last sample.
    pub fn memory_mb(&self) -> f32 {
        self.memory_mb
    }

    /// Counters.
    pub fn stats(&self) -> GovernorStats {
        self.stats
    }
}
