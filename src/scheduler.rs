//! Periodic effect emission.
//!
//! While the level is above 0 the scheduler keeps exactly one emission
//! continuation in the timer queue. Each firing picks one eligible kind at
//! random and turns it into an [`EffectRequest`]; admission is the caller's
//! business. A level change restarts the cadence and level 0 stops it.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::admission::EffectRequest;
use crate::effects::{EffectKind, EffectProfile};
use crate::intensity::IntensityLevel;
use crate::timer::{TimerHandle, TimerKind, TimerQueue};

/// Emission loop state.
#[derive(Debug)]
pub struct EffectScheduler {
    profile: EffectProfile,
    eligible: Vec<EffectKind>,
    level: IntensityLevel,
    min_interval_ms: u64,
    rng: StdRng,
    timer: Option<TimerHandle>,
    emissions: u64,
}

impl EffectScheduler {
    /// Idle scheduler for `profile`. The same seed yields the same kinds.
    pub fn new(profile: EffectProfile, seed: u64) -> Self {
        Self {
            profile,
            eligible: Vec::new(),
            level: IntensityLevel::CALM,
            min_interval_ms: 0,
            rng: StdRng::seed_from_u64(seed),
            timer: None,
            emissions: 0,
        }
    }

    /// Swap in another profile. The running cadence, if any, is restarted.
    pub fn set_profile(&mut self, profile: EffectProfile, now: u64, timers: &mut TimerQueue<TimerKind>) {
        self.profile = profile;
        let level = self.level;
        self.on_level_change(level, now, timers);
    }

    /// Active profile.
    pub fn profile(&self) -> &EffectProfile {
        &self.profile
    }

    /// Restart the cadence for `level`, or stop it at level 0.
    pub fn on_level_change(
        &mut self,
        level: IntensityLevel,
        now: u64,
        timers: &mut TimerQueue<TimerKind>,
    ) {
        self.stop(timers);
        self.level = level;
        self.eligible = self.profile.eligible(level);
        if !level.is_active() {
            return;
        }
        if self.eligible.is_empty() {
            log::debug!("no eligible effects at {level} for profile {}", self.profile.name());
            return;
        }
        self.schedule_next(now, timers);
    }

    /// Handle a fired emission continuation. Returns the request to admit, or
    /// `None` for a superseded handle.
    pub fn on_emission(
        &mut self,
        handle: TimerHandle,
        now: u64,
        timers: &mut TimerQueue<TimerKind>,
    ) -> Option<EffectRequest> {
        if self.timer != Some(handle) {
            return None;
        }
        self.timer = None;
        let kind = self.pick_kind()?;
        self.emissions += 1;
        self.schedule_next(now, timers);
        Some(EffectRequest {
            kind,
            level: self.level,
            duration_ms: self.profile.duration_ms(self.level),
        })
    }

    /// Choose one eligible kind uniformly at random.
    pub fn pick_kind(&mut self) -> Option<EffectKind> {
        if self.eligible.is_empty() {
            return None;
        }
        let index = self.rng.gen_range(0..self.eligible.len());
        self.eligible.get(index).copied()
    }

    /// Cancel the pending emission.
    pub fn stop(&mut self, timers: &mut TimerQueue<TimerKind>) {
        if let Some(handle) = self.timer.take() {
            timers.cancel(handle);
        }
    }

    /// Floor on the emission interval. Takes effect from the next emission.
    pub fn set_min_interval_ms(&mut self, ms: u64) {
        self.min_interval_ms = ms;
    }

    /// Current floor on the emission interval.
    pub fn min_interval_ms(&self) -> u64 {
        self.min_interval_ms
    }

    /// Effective interval at the current level.
    pub fn interval_ms(&self) -> u64 {
        self.profile.frequency_ms(self.level).max(self.min_interval_ms)
    }

    /// Level the cadence runs at.
    pub fn level(&self) -> IntensityLevel {
        self.level
    }

    /// Kinds eligible at the current level.
    pub fn eligible(&self) -> &[EffectKind] {
        &self.eligible
    }

    /// `true` while an emission is pending.
    pub fn is_emitting(&self) -> bool {
        self.timer.is_some()
    }

    /// Handle of the pending emission.
    pub fn pending(&self) -> Option<TimerHandle> {
        self.timer
    }

    /// Requests produced so far.
    pub fn emissions(&self) -> u64 {
        self.emissions
    }

    fn schedule_next(&mut self, now: u64, timers: &mut TimerQueue<TimerKind>) {
        let due = now.saturating_add(self.interval_ms().max(1));
        self.timer = Some(timers.schedule(due, TimerKind::Emission));
    }
}
