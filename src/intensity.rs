/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Intensity levels and the throttled intensity state machine.
//!
//! - [`IntensityLevel`]: discrete severity 0–4.
//! - [`IntensityThresholds`]: fixed score boundaries between levels.
//! - [`IntensityMachine`]: consumes score updates, coalesces bursts inside the
//!   throttle window, and reports every level transition and every integer
//!   boundary it spans.
//!
//! # Level map (default thresholds)
//!
//! ```text
//!   score ≥  20        → 0  calm
//!   score ≥ -10        → 1
//!   score ≥ -40        → 2
//!   score ≥ -60        → 3
//!   score <  -60       → 4  maximum
//! ```
//!
//! The continuous intensity adds `0.2 × (sophistication − 1)` to any active
//! level, capped at 4.0; the discrete level is its rounded value. A calm level
//! stays calm regardless of sophistication.
//!
//! # Invariants
//!
//! - Level is non-increasing in score for a fixed sophistication.
//! - Out-of-range input is refused with a diagnostic; state is never clamped
//!   silently.
//! - At most one update is applied per throttle window unless forced
//!   `immediate`; the latest pending values win.
//! - A jump across k boundaries yields exactly k threshold crossings.

use crate::error::{EngineError, EngineResult};
use crate::vulnerability::{ActorId, SCORE_MAX, SCORE_MIN};

/// Number of discrete levels (0 through 4).
pub const LEVEL_COUNT: usize = 5;
/// Highest discrete level.
pub const LEVEL_MAX: u8 = 4;
/// Lowest accepted sophistication.
pub const SOPHISTICATION_MIN: f32 = 1.0;
/// Highest accepted sophistication.
pub const SOPHISTICATION_MAX: f32 = 5.0;
/// Continuous-intensity bonus per sophistication step above 1.
pub const SOPHISTICATION_STEP_BONUS: f32 = 0.2;

// ─── IntensityLevel ─────────────────────────────────────────────────────────

/// Discrete intensity level in [0, 4].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IntensityLevel(u8);

impl IntensityLevel {
    /// Level 0: no effects.
    pub const CALM: IntensityLevel = IntensityLevel(0);
    /// Level 4.
    pub const MAX: IntensityLevel = IntensityLevel(LEVEL_MAX);

    /// Construct a level; `None` above 4.
    pub fn new(value: u8) -> Option<Self> {
        (value <= LEVEL_MAX).then_some(Self(value))
    }

    /// Construct a level, saturating at 4.
    pub fn new_saturating(value: u8) -> Self {
        Self(value.min(LEVEL_MAX))
    }

    /// The raw level.
    pub fn get(self) -> u8 {
        self.0
    }

    /// Table index for per-level arrays.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// `true` above level 0.
    pub fn is_active(self) -> bool {
        self.0 > 0
    }
}

impl core::fmt::Display for IntensityLevel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Which way a level moved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Direction {
    /// Toward level 4.
    Increase,
    /// Toward level 0.
    Decrease,
}

// ─── Thresholds ─────────────────────────────────────────────────────────────

/// Lower score bound of each level band. A score at or above `calm` is level
/// 0; below `severe` it is level 4.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IntensityThresholds {
    /// Score at or above which the level is 0.
    pub calm: f32,
    /// Score at or above which the level is at most 1.
    pub uneasy: f32,
    /// Score at or above which the level is at most 2.
    pub disturbed: f32,
    /// Score at or above which the level is at most 3.
    pub severe: f32,
}

impl Default for IntensityThresholds {
    fn default() -> Self {
        Self {
            calm: 20.0,
            uneasy: -10.0,
            disturbed: -40.0,
            severe: -60.0,
        }
    }
}

impl IntensityThresholds {
    /// Level from score alone.
    pub fn base_level(&self, score: f32) -> IntensityLevel {
        let level = if score >= self.calm {
            0
        } else if score >= self.uneasy {
            1
        } else if score >= self.disturbed {
            2
        } else if score >= self.severe {
            3
        } else {
            4
        };
        IntensityLevel(level)
    }

    /// Continuous intensity: base level plus the sophistication bonus.
    pub fn continuous(&self, score: f32, sophistication: f32) -> f32 {
        let base = self.base_level(score);
        if !base.is_active() {
            return 0.0;
        }
        let bonus = SOPHISTICATION_STEP_BONUS
            * (sophistication.clamp(SOPHISTICATION_MIN, SOPHISTICATION_MAX) - SOPHISTICATION_MIN);
        (base.get() as f32 + bonus).min(LEVEL_MAX as f32)
    }

    /// Discrete level for `(score, sophistication)`.
    pub fn level(&self, score: f32, sophistication: f32) -> IntensityLevel {
        level_of(self.continuous(score, sophistication))
    }
}

fn level_of(continuous: f32) -> IntensityLevel {
    IntensityLevel::new_saturating(continuous.round().clamp(0.0, LEVEL_MAX as f32) as u8)
}

/// Discrete level under the default thresholds.
pub fn intensity_for(score: f32, sophistication: f32) -> IntensityLevel {
    IntensityThresholds::default().level(score, sophistication)
}

// ─── Records ────────────────────────────────────────────────────────────────

/// Immutable record of a level change.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TransitionRecord {
    /// Level before the update.
    pub previous: IntensityLevel,
    /// Level after the update.
    pub current: IntensityLevel,
    /// Which way it moved.
    pub direction: Direction,
    /// Score that triggered the change.
    pub score: f32,
    /// Time the update was applied.
    pub at_ms: u64,
}

/// One integer boundary crossed by an applied update. Boundary `k` lies
/// between levels `k − 1` and `k`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ThresholdCrossing {
    /// The crossed boundary, 1 through 4.
    pub boundary: IntensityLevel,
    /// Which way it was crossed.
    pub direction: Direction,
    /// Score that triggered the crossing.
    pub score: f32,
    /// Time the update was applied.
    pub at_ms: u64,
}

/// Every boundary between `previous` and `current`, in crossing order.
pub fn crossings_between(
    previous: IntensityLevel,
    current: IntensityLevel,
    score: f32,
    at_ms: u64,
) -> Vec<ThresholdCrossing> {
    let (from, to) = (previous.get(), current.get());
    if to > from {
        ((from + 1)..=to)
            .map(|b| ThresholdCrossing {
                boundary: IntensityLevel(b),
                direction: Direction::Increase,
                score,
                at_ms,
            })
            .collect()
    } else {
        ((to + 1)..=from)
            .rev()
            .map(|b| ThresholdCrossing {
                boundary: IntensityLevel(b),
                direction: Direction::Decrease,
                score,
                at_ms,
            })
            .collect()
    }
}

// ─── Machine ────────────────────────────────────────────────────────────────

/// A score update from the score source.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScoreUpdate {
    /// New trust score.
    pub score: f32,
    /// Scenario sophistication in [1, 5].
    pub sophistication: f32,
    /// Actor the score belongs to; `None` keeps the current session.
    pub actor: Option<ActorId>,
    /// Bypass coalescing.
    pub immediate: bool,
}

impl ScoreUpdate {
    /// Throttled update.
    pub fn new(score: f32, sophistication: f32) -> Self {
        Self { score, sophistication, actor: None, immediate: false }
    }

    /// Update applied without coalescing.
    pub fn immediate(score: f32, sophistication: f32) -> Self {
        Self { score, sophistication, actor: None, immediate: true }
    }

    /// Attach the actor id.
    pub fn for_actor(mut self, actor: impl Into<ActorId>) -> Self {
        self.actor = Some(actor.into());
        self
    }
}

/// Result of applying one update.
#[derive(Clone, Debug, PartialEq)]
pub struct AppliedUpdate {
    /// Level before.
    pub previous: IntensityLevel,
    /// Level after.
    pub current: IntensityLevel,
    /// Continuous intensity after.
    pub continuous: f32,
    /// Applied score.
    pub score: f32,
    /// Applied sophistication.
    pub sophistication: f32,
    /// Application time.
    pub at_ms: u64,
    /// Present when the level changed.
    pub transition: Option<TransitionRecord>,
    /// Every boundary spanned, in crossing order.
    pub crossings: Vec<ThresholdCrossing>,
    /// `true` for debug force-sets.
    pub forced: bool,
}

/// What [`IntensityMachine::submit`] did with an update.
#[derive(Clone, Debug, PartialEq)]
pub enum Submission {
    /// Applied immediately.
    Applied(AppliedUpdate),
    /// Held as the pending update; flush at `flush_at`.
    Deferred {
        /// When the pending update becomes applicable.
        flush_at: u64,
    },
    /// Refused; prior state retained.
    Rejected(EngineError),
}

/// Snapshot of machine state attached to diagnostics.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MachineState {
    /// Current level.
    pub level: IntensityLevel,
    /// Current continuous intensity.
    pub continuous: f32,
    /// Last applied score.
    pub score: f32,
    /// Last applied sophistication.
    pub sophistication: f32,
}

/// Update counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MachineStats {
    /// Updates applied (including flushes and force-sets).
    pub applied: u64,
    /// Updates absorbed into a pending update.
    pub coalesced: u64,
    /// Updates refused by validation.
    pub rejected: u64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Pending {
    score: f32,
    sophistication: f32,
}

/// The throttled intensity state machine.
#[derive(Clone, Debug)]
pub struct IntensityMachine {
    thresholds: IntensityThresholds,
    throttle_window_ms: u64,
    level: IntensityLevel,
    continuous: f32,
    score: f32,
    sophistication: f32,
    last_applied_at: Option<u64>,
    pending: Option<Pending>,
    stats: MachineStats,
}

impl IntensityMachine {
    /// Machine at level 0 with the given thresholds and throttle window.
    pub fn new(thresholds: IntensityThresholds, throttle_window_ms: u64) -> Self {
        Self {
            thresholds,
            throttle_window_ms,
            level: IntensityLevel::CALM,
            continuous: 0.0,
            score: SCORE_MAX,
            sophistication: SOPHISTICATION_MIN,
            last_applied_at: None,
            pending: None,
            stats: MachineStats::default(),
        }
    }

    /// Start a session at `score` without emitting transitions.
    pub fn reset(&mut self, score: f32, sophistication: f32) {
        self.score = score.clamp(SCORE_MIN, SCORE_MAX);
        self.sophistication = sophistication.clamp(SOPHISTICATION_MIN, SOPHISTICATION_MAX);
        self.continuous = self.thresholds.continuous(self.score, self.sophistication);
        self.level = level_of(self.continuous);
        self.last_applied_at = None;
        self.pending = None;
    }

    /// Validate an update against the accepted ranges.
    pub fn validate(update: &ScoreUpdate) -> EngineResult<()> {
        if !update.score.is_finite() || !(SCORE_MIN..=SCORE_MAX).contains(&update.score) {
            return Err(EngineError::ScoreOutOfRange { score: update.score });
        }
        if !update.sophistication.is_finite()
            || !(SOPHISTICATION_MIN..=SOPHISTICATION_MAX).contains(&update.sophistication)
        {
            return Err(EngineError::SophisticationOutOfRange { value: update.sophistication });
        }
        Ok(())
    }

    /// Offer an update at time `now`.
    pub fn submit(&mut self, now: u64, update: &ScoreUpdate) -> Submission {
        if let Err(err) = Self::validate(update) {
            self.stats.rejected += 1;
            log::warn!("refused score update {update:?}: {err}; state={:?}", self.state());
            return Submission::Rejected(err);
        }

        let window_open = self
            .last_applied_at
            .map_or(true, |t| now >= t.saturating_add(self.throttle_window_ms));
        if update.immediate || window_open {
            self.pending = None;
            return Submission::Applied(self.apply(now, update.score, update.sophistication, false));
        }

        self.pending = Some(Pending {
            score: update.score,
            sophistication: update.sophistication,
        });
        self.stats.coalesced += 1;
        let flush_at = self.flush_due_at().unwrap_or(now);
        log::debug!("coalesced score update {update:?}, flush at {flush_at}");
        Submission::Deferred { flush_at }
    }

    /// Apply the pending update, if any.
    pub fn flush(&mut self, now: u64) -> Option<AppliedUpdate> {
        let pending = self.pending.take()?;
        Some(self.apply(now, pending.score, pending.sophistication, false))
    }

    /// Debug force-set of the continuous intensity.
    pub fn force(&mut self, now: u64, intensity: f32) -> EngineResult<AppliedUpdate> {
        if !intensity.is_finite() || !(0.0..=LEVEL_MAX as f32).contains(&intensity) {
            self.stats.rejected += 1;
            let err = EngineError::IntensityOutOfRange { value: intensity };
            log::warn!("refused forced intensity {intensity}: {err}; state={:?}", self.state());
            return Err(err);
        }
        self.pending = None;
        let previous = self.level;
        self.continuous = intensity;
        self.level = level_of(intensity);
        self.last_applied_at = Some(now);
        self.stats.applied += 1;
        Ok(self.describe(previous, now, true))
    }

    /// Drop the pending update without applying it.
    pub fn clear_pending(&mut self) {
        self.pending = None;
    }

    /// Change the throttle window. Applies from the next submission.
    pub fn set_throttle_window(&mut self, window_ms: u64) {
        self.throttle_window_ms = window_ms.max(1);
    }

    /// Current throttle window.
    pub fn throttle_window_ms(&self) -> u64 {
        self.throttle_window_ms
    }

    /// When the pending update may be flushed, if one is held.
    pub fn flush_due_at(&self) -> Option<u64> {
        self.pending?;
        Some(
            self.last_applied_at
                .map_or(0, |t| t.saturating_add(self.throttle_window_ms)),
        )
    }

    /// `true` while a coalesced update waits for its window.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Current level.
    pub fn level(&self) -> IntensityLevel {
        self.level
    }

    /// Current continuous intensity.
    pub fn continuous(&self) -> f32 {
        self.continuous
    }

    /// Last applied score.
    pub fn score(&self) -> f32 {
        self.score
    }

    /// Score of the pending update if one is held, else the applied score.
    pub fn latest_score(&self) -> f32 {
        self.pending.map_or(self.score, |p| p.score)
    }

    /// Last applied sophistication.
    pub fn sophistication(&self) -> f32 {
        self.sophistication
    }

    /// Thresholds in use.
    pub fn thresholds(&self) -> &IntensityThresholds {
        &self.thresholds
    }

    /// Update counters.
    pub fn stats(&self) -> MachineStats {
        self.stats
    }

    /// Diagnostic snapshot.
    pub fn state(&self) -> MachineState {
        MachineState {
            level: self.level,
            continuous: self.continuous,
            score: self.score,
            sophistication: self.sophistication,
        }
    }

    fn apply(&mut self, now: u64, score: f32, sophistication: f32, forced: bool) -> AppliedUpdate {
        let previous = self.level;
        self.score = score;
        self.sophistication = sophistication;
        self.continuous = self.thresholds.continuous(score, sophistication);
        self.level = level_of(self.continuous);
        self.last_applied_at = Some(now);
        self.stats.applied += 1;
        self.describe(previous, now, forced)
    }

    fn describe(&self, previous: IntensityLevel, now: u64, forced: bool) -> AppliedUpdate {
        let current = self.level;
        let transition = (current != previous).then(|| TransitionRecord {
            previous,
            current,
            direction: if current > previous {
                Direction::Increase
            } else {
                Direction::Decrease
            },
            score: self.score,
            at_ms: now,
        });
        AppliedUpdate {
            previous,
            current,
            continuous: self.continuous,
            score: self.score,
            sophistication: self.sophistication,
            at_ms: now,
            transition,
            crossings: crossings_between(previous, current, self.score, now),
            forced,
        }
    }
}

impl Default for IntensityMachine {
    fn default() -> Self {
        Self::new(IntensityThresholds::default(), 100)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn lvl(n: u8) -> IntensityLevel {
        IntensityLevel::new_saturating(n)
    }

    fn applied(s: Submission) -> AppliedUpdate {
        match s {
            Submission::Applied(a) => a,
            other => panic!("expected Applied, got {other:?}"),
        }
    }

    // ── Level map ─────────────────────────────────────────────────────────

    #[test]
    fn test_boundary_exactness() {
        assert_eq!(intensity_for(20.0, 1.0), lvl(0));
        assert_eq!(intensity_for(19.0, 1.0), lvl(1));
        assert_eq!(intensity_for(-30.0, 1.0), lvl(2));
        assert_eq!(intensity_for(-61.0, 1.0), lvl(4));
        assert_eq!(intensity_for(-60.0, 1.0), lvl(3));
        assert_eq!(intensity_for(100.0, 1.0), lvl(0));
        assert_eq!(intensity_for(-100.0, 1.0), lvl(4));
    }

    #[test]
    fn test_sophistication_bonus() {
        let t = IntensityThresholds::default();
        assert_eq!(t.continuous(50.0, 5.0), 0.0, "calm stays calm");
        assert!((t.continuous(0.0, 1.0) - 1.0).abs() < 1e-6);
        assert!((t.continuous(0.0, 3.0) - 1.4).abs() < 1e-6);
        assert_eq!(t.level(0.0, 3.0), lvl(1));
        // 1 + 0.6 rounds up a level
        assert_eq!(t.level(0.0, 4.0), lvl(2));
        // capped at 4
        assert_eq!(t.continuous(-90.0, 5.0), 4.0);
    }

    #[test]
    fn test_level_new_bounds() {
        assert_eq!(IntensityLevel::new(4), Some(IntensityLevel::MAX));
        assert_eq!(IntensityLevel::new(5), None);
        assert_eq!(IntensityLevel::new_saturating(9), IntensityLevel::MAX);
        assert!(!IntensityLevel::CALM.is_active());
    }

    // ── Crossings ─────────────────────────────────────────────────────────

    #[test]
    fn test_crossings_ascending_and_descending() {
        let up = crossings_between(lvl(0), lvl(4), -90.0, 7);
        let boundaries: Vec<u8> = up.iter().map(|c| c.boundary.get()).collect();
        assert_eq!(boundaries, vec![1, 2, 3, 4]);
        assert!(up.iter().all(|c| c.direction == Direction::Increase && c.at_ms == 7));

        let down = crossings_between(lvl(3), lvl(1), 0.0, 9);
        let boundaries: Vec<u8> = down.iter().map(|c| c.boundary.get()).collect();
        assert_eq!(boundaries, vec![3, 2]);
        assert!(down.iter().all(|c| c.direction == Direction::Decrease));

        assert!(crossings_between(lvl(2), lvl(2), 0.0, 0).is_empty());
    }

    // ── Machine ───────────────────────────────────────────────────────────

    #[test]
    fn test_first_update_applies_immediately() {
        let mut m = IntensityMachine::default();
        m.reset(60.0, 1.0);
        let a = applied(m.submit(0, &ScoreUpdate::new(10.0, 1.0)));
        assert_eq!(a.previous, lvl(0));
        assert_eq!(a.current, lvl(1));
        let t = a.transition.unwrap();
        assert_eq!(t.direction, Direction::Increase);
        assert_eq!(t.score, 10.0);
        assert_eq!(a.crossings.len(), 1);
    }

    #[test]
    fn test_jump_zero_to_four_emits_four_crossings() {
        let mut m = IntensityMachine::default();
        m.reset(60.0, 1.0);
        let a = applied(m.submit(0, &ScoreUpdate::immediate(-90.0, 1.0)));
        assert_eq!(a.current, lvl(4));
        assert_eq!(a.crossings.len(), 4);
        assert!(a.crossings.iter().all(|c| c.direction == Direction::Increase));
    }

    #[test]
    fn test_throttle_coalesces_to_last_values() {
        let mut m = IntensityMachine::default();
        m.reset(60.0, 1.0);
        applied(m.submit(0, &ScoreUpdate::new(50.0, 1.0)));

        for (i, score) in [10.0_f32, -20.0, -45.0, 5.0].iter().enumerate() {
            let s = m.submit(10 + i as u64 * 10, &ScoreUpdate::new(*score, 2.0));
            assert_eq!(s, Submission::Deferred { flush_at: 100 });
        }
        assert!(m.has_pending());
        assert_eq!(m.level(), lvl(0), "nothing applied inside the window");
        assert_eq!(m.stats().applied, 1);

        let a = m.flush(100).unwrap();
        assert_eq!(a.score, 5.0);
        assert_eq!(a.sophistication, 2.0);
        assert_eq!(m.stats().applied, 2);
        assert_eq!(m.stats().coalesced, 4);
        assert!(m.flush(101).is_none());
    }

    #[test]
    fn test_immediate_bypasses_and_discards_pending() {
        let mut m = IntensityMachine::default();
        m.reset(60.0, 1.0);
        applied(m.submit(0, &ScoreUpdate::new(50.0, 1.0)));
        assert!(matches!(m.submit(10, &ScoreUpdate::new(-20.0, 1.0)), Submission::Deferred { .. }));

        let a = applied(m.submit(20, &ScoreUpdate::immediate(-70.0, 1.0)));
        assert_eq!(a.current, lvl(4));
        assert!(!m.has_pending());
    }

    #[test]
    fn test_update_after_window_applies() {
        let mut m = IntensityMachine::default();
        m.reset(60.0, 1.0);
        applied(m.submit(0, &ScoreUpdate::new(50.0, 1.0)));
        applied(m.submit(100, &ScoreUpdate::new(0.0, 1.0)));
        assert_eq!(m.level(), lvl(1));
    }

    #[test]
    fn test_out_of_range_refused_state_kept() {
        let mut m = IntensityMachine::default();
        m.reset(0.0, 1.0);
        let before = m.state();

        for bad in [
            ScoreUpdate::new(120.0, 1.0),
            ScoreUpdate::new(-100.5, 1.0),
            ScoreUpdate::new(f32::NAN, 1.0),
            ScoreUpdate::new(0.0, 0.5),
            ScoreUpdate::new(0.0, f32::INFINITY),
        ] {
            assert!(matches!(m.submit(500, &bad), Submission::Rejected(_)), "{bad:?}");
        }
        assert_eq!(m.state(), before);
        assert_eq!(m.stats().rejected, 5);
        assert_eq!(m.stats().applied, 0);
    }

    #[test]
    fn test_force_sets_continuous_and_level() {
        let mut m = IntensityMachine::default();
        m.reset(60.0, 1.0);
        let a = m.force(5, 3.0).unwrap();
        assert!(a.forced);
        assert_eq!(a.current, lvl(3));
        assert_eq!(a.crossings.len(), 3);
        assert_eq!(m.continuous(), 3.0);

        assert!(matches!(m.force(6, 4.5), Err(EngineError::IntensityOutOfRange { .. })));
        assert!(m.force(6, -0.1).is_err());
        assert_eq!(m.level(), lvl(3));
    }

    #[test]
    fn test_longer_window_defers_more() {
        let mut m = IntensityMachine::default();
        m.reset(60.0, 1.0);
        m.set_throttle_window(200);
        applied(m.submit(0, &ScoreUpdate::new(50.0, 1.0)));
        assert_eq!(m.submit(150, &ScoreUpdate::new(0.0, 1.0)), Submission::Deferred { flush_at: 200 });
    }

    #[test]
    fn test_decrease_transition_direction() {
        let mut m = IntensityMachine::default();
        m.reset(-80.0, 1.0);
        assert_eq!(m.level(), lvl(4));
        let a = applied(m.submit(0, &ScoreUpdate::new(30.0, 1.0)));
        assert_eq!(a.transition.unwrap().direction, Direction::Decrease);
        let boundaries: Vec<u8> = a.crossings.iter().map(|c| c.boundary.get()).collect();
        assert_eq!(boundaries, vec![4, 3, 2, 1]);
    }
}
