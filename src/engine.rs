//! The intensity engine: one instance of every component plus the timer queue.
//!
//! ```text
//!   record_action ─► TrustScorer ─► apply_delta ─┐
//!   update ──────────────────────────────────────┴─► IntensityMachine (throttled)
//!                                                        │ level change
//!                                                        ▼
//!                         EventBus ◄───────────── EffectScheduler ── Emission ─┐
//!                                                                              ▼
//!   record_frame ─► PerformanceGovernor ─► tier ─► AdmissionController ─► EffectRenderer
//! ```
//!
//! The host drives time. Every call takes `now` in milliseconds on the host's
//! clock, and [`IntensityEngine::advance`] runs every continuation due at or
//! before it. Nothing blocks and nothing runs on another thread.

use hashbrown::HashMap;

use crate::accessibility::{AccessibilityPrefs, MemoryPreferenceStore, PreferenceStore};
use crate::admission::{
    Admission, AdmissionController, EffectRequest, ReleaseReason, ReleasedEffect,
};
use crate::config::EngineConfig;
use crate::effects::EffectProfile;
use crate::error::{EngineError, EngineResult};
use crate::events::{EngineEvent, EventBus, EventSink};
use crate::governor::{PerformanceGovernor, QualityTier, TelemetrySample, TierChange};
use crate::history::{DebugDump, PerformanceCounters, StateHistory, StateHistoryEntry};
use crate::intensity::{
    AppliedUpdate, IntensityLevel, IntensityMachine, IntensityThresholds, ScoreUpdate, Submission,
    SOPHISTICATION_MIN,
};
use crate::render::EffectRenderer;
use crate::scheduler::EffectScheduler;
use crate::timer::{Fired, TimerHandle, TimerKind, TimerQueue};
use crate::vulnerability::{apply_delta, ActionKind, ActorId, ContextKind, TrustScorer};

// ─── Session ────────────────────────────────────────────────────────────────

/// The active actor session.
#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    actor: ActorId,
    started_at: u64,
    sophistication: f32,
}

impl Session {
    /// Actor whose scenario is running.
    pub fn actor(&self) -> &ActorId {
        &self.actor
    }

    /// Session start time.
    pub fn started_at(&self) -> u64 {
        self.started_at
    }

    /// Sophistication of the latest accepted update.
    pub fn sophistication(&self) -> f32 {
        self.sophistication
    }
}

// ─── Engine ─────────────────────────────────────────────────────────────────

/// Adaptive intensity control core.
pub struct IntensityEngine {
    config: EngineConfig,
    scorer: TrustScorer,
    profiles: HashMap<ActorId, EffectProfile>,
    default_profile: EffectProfile,
    store: Box<dyn PreferenceStore>,
    prefs: AccessibilityPrefs,
    renderer: Box<dyn EffectRenderer>,
    bus: EventBus,

    machine: IntensityMachine,
    scheduler: EffectScheduler,
    admission: AdmissionController,
    governor: PerformanceGovernor,
    timers: TimerQueue<TimerKind>,
    history: StateHistory,

    session: Option<Session>,
    flush_timer: Option<(TimerHandle, u64)>,
    sweep_timer: Option<TimerHandle>,
    sample_timer: Option<TimerHandle>,
    manual_override: bool,
    attached: bool,
    now: u64,
    overridden_updates: u64,
}

impl IntensityEngine {
    /// Build an engine around `renderer`. Fails only on invalid configuration.
    pub fn new(config: EngineConfig, renderer: Box<dyn EffectRenderer>) -> EngineResult<Self> {
        config.validate()?;
        let default_profile = EffectProfile::standard();
        Ok(Self {
            scorer: TrustScorer::new(),
            profiles: HashMap::new(),
            store: Box::new(MemoryPreferenceStore::new()),
            prefs: AccessibilityPrefs::default(),
            renderer,
            bus: EventBus::new(),
            machine: IntensityMachine::new(IntensityThresholds::default(), config.throttle_window_ms),
            scheduler: EffectScheduler::new(default_profile.clone(), config.rng_seed),
            admission: AdmissionController::new(config.max_concurrent_effects),
            governor: PerformanceGovernor::new(config.fps_smoothing),
            timers: TimerQueue::new(),
            history: StateHistory::new(),
            session: None,
            flush_timer: None,
            sweep_timer: None,
            sample_timer: None,
            manual_override: false,
            attached: true,
            now: 0,
            overridden_updates: 0,
            default_profile,
            config,
        })
    }

    /// Use `scorer` for actor weighting.
    pub fn with_scorer(mut self, scorer: TrustScorer) -> Self {
        self.scorer = scorer;
        self
    }

    /// Register the effect profile of one actor.
    pub fn with_profile(mut self, actor: impl Into<ActorId>, profile: EffectProfile) -> EngineResult<Self> {
        profile.validate()?;
        self.profiles.insert(actor.into(), profile);
        Ok(self)
    }

    /// Profile for actors without one of their own.
    pub fn with_default_profile(mut self, profile: EffectProfile) -> EngineResult<Self> {
        profile.validate()?;
        self.default_profile = profile;
        Ok(self)
    }

    /// Read preferences from `store` at every session start.
    pub fn with_preference_store(mut self, store: Box<dyn PreferenceStore>) -> Self {
        self.store = store;
        self
    }

    /// Add an event observer.
    pub fn subscribe(&mut self, sink: Box<dyn EventSink>) {
        self.bus.subscribe(sink);
    }

    /// Persist new preferences. They take effect at the next session start.
    pub fn save_preferences(&mut self, prefs: AccessibilityPrefs) -> EngineResult<()> {
        self.store.save(&prefs)
    }

    // ─── Sessions ───────────────────────────────────────────────────────────

    /// Start a session for `actor`, tearing down any previous one.
    pub fn start_session(&mut self, actor: impl Into<ActorId>, now: u64) {
        let actor = actor.into();
        if !self.attached {
            log::debug!("ignoring session start for {actor}: engine shut down");
            return;
        }
        self.tick(now);
        self.teardown_session();

        self.prefs = match self.store.load() {
            Ok(prefs) => prefs,
            Err(err) => {
                log::warn!("preference store failed: {err}; keeping {:?}", self.prefs);
                self.prefs
            }
        };

        let profile = self
            .profiles
            .get(&actor)
            .unwrap_or(&self.default_profile)
            .filtered(&self.prefs);
        let initial = self.scorer.initial_score(&actor);
        self.machine.reset(initial, SOPHISTICATION_MIN);
        self.scheduler.set_profile(profile, now, &mut self.timers);
        self.scheduler
            .on_level_change(self.machine.level(), now, &mut self.timers);
        self.ensure_background_timers(now);

        log::info!(
            "session started for {actor} at {now} (score {initial}, {})",
            self.machine.level()
        );
        self.session = Some(Session {
            actor,
            started_at: now,
            sophistication: SOPHISTICATION_MIN,
        });
    }

    /// Restart the current actor's session from its initial score.
    pub fn reset(&mut self, now: u64) {
        if let Some(actor) = self.session.as_ref().map(|s| s.actor.clone()) {
            self.start_session(actor, now);
        }
    }

    // ─── Score source ───────────────────────────────────────────────────────

    /// Score one player action and feed the result to the state machine.
    /// Returns the new score, or `None` when the update is not accepted
    /// (shut down, or manual override on).
    pub fn record_action(&mut self, now: u64, action: ActionKind, context: ContextKind) -> Option<f32> {
        if !self.attached {
            return None;
        }
        if self.manual_override {
            self.overridden_updates += 1;
            log::debug!("manual override on, dropping {action:?} under {context:?}");
            return None;
        }
        if self.session.is_none() {
            self.start_session(ActorId::default(), now);
        }
        let session = self.session.as_ref()?;
        let current = self.machine.latest_score();
        let delta = self.scorer.score(&session.actor, action, context, current)
            * self.prefs.score_multiplier();
        let score = apply_delta(current, delta);
        let update = ScoreUpdate::new(score, session.sophistication);
        self.update(now, update);
        Some(score)
    }

    /// Accept an absolute score update from the score source.
    pub fn update(&mut self, now: u64, update: ScoreUpdate) {
        if !self.attached {
            log::debug!("ignoring update after shutdown: {update:?}");
            return;
        }
        if self.manual_override {
            self.overridden_updates += 1;
            log::debug!("manual override on, dropping {update:?}");
            return;
        }
        self.tick(now);

        // Invalid input never switches sessions; `submit` refuses and counts it.
        let switch_to = match (&self.session, &update.actor) {
            _ if IntensityMachine::validate(&update).is_err() => None,
            (None, actor) => Some(actor.clone().unwrap_or_default()),
            (Some(session), Some(actor)) if session.actor != *actor => Some(actor.clone()),
            _ => None,
        };
        if let Some(actor) = switch_to {
            self.start_session(actor, now);
        }

        match self.machine.submit(now, &update) {
            Submission::Applied(applied) => {
                self.cancel_flush();
                self.note_sophistication(update.sophistication);
                self.on_applied(applied);
            }
            Submission::Deferred { flush_at } => {
                self.note_sophistication(update.sophistication);
                if self.flush_timer.map(|(_, due)| due) != Some(flush_at) {
                    self.cancel_flush();
                    let handle = self.timers.schedule(flush_at, TimerKind::ThrottleFlush);
                    self.flush_timer = Some((handle, flush_at));
                }
            }
            Submission::Rejected(_) => {}
        }
    }

    // ─── Time ───────────────────────────────────────────────────────────────

    /// Run every continuation due at or before `now`. Returns how many ran.
    pub fn advance(&mut self, now: u64) -> usize {
        if !self.attached {
            return 0;
        }
        self.tick(now);
        let mut ran = 0;
        while let Some(fired) = self.timers.pop_due(now) {
            ran += 1;
            self.run(fired);
        }
        ran
    }

    /// Earliest pending continuation, for hosts that sleep between ticks.
    pub fn next_due(&mut self) -> Option<u64> {
        self.timers.next_due()
    }

    fn run(&mut self, fired: Fired<TimerKind>) {
        let Fired { handle, due_at, payload } = fired;
        match payload {
            TimerKind::ThrottleFlush => {
                if self.flush_timer.map(|(h, _)| h) != Some(handle) {
                    return;
                }
                self.flush_timer = None;
                if let Some(applied) = self.machine.flush(due_at) {
                    self.on_applied(applied);
                }
            }
            TimerKind::Emission => {
                if let Some(request) = self.scheduler.on_emission(handle, due_at, &mut self.timers) {
                    self.admit(request, due_at);
                }
            }
            TimerKind::EffectExpiry(id) => {
                self.admission
                    .release(id, ReleaseReason::Expired, self.renderer.as_mut());
            }
            TimerKind::StaleSweep => {
                if self.sweep_timer != Some(handle) {
                    return;
                }
                let released = self.admission.sweep_stale(
                    due_at,
                    self.config.stale_effect_ms,
                    self.renderer.as_mut(),
                );
                self.cancel_expiries(&released);
                self.sweep_timer = Some(self.timers.schedule(
                    due_at.saturating_add(self.config.sweep_interval_ms),
                    TimerKind::StaleSweep,
                ));
            }
            TimerKind::GovernorSample => {
                if self.sample_timer != Some(handle) {
                    return;
                }
                let telemetry = TelemetrySample {
                    active_effects: self.admission.active_count(),
                    history_len: self.history.len(),
                };
                if let Some(change) = self.governor.sample(due_at, telemetry) {
                    self.apply_tier(change);
                }
                self.sample_timer = Some(self.timers.schedule(
                    due_at.saturating_add(self.config.sample_interval_ms),
                    TimerKind::GovernorSample,
                ));
            }
        }
    }

    // ─── Telemetry ──────────────────────────────────────────────────────────

    /// Report one rendered frame.
    pub fn record_frame(&mut self, frame_ms: f32) {
        self.governor.record_frame(frame_ms);
    }

    /// Report host memory use in MB; `None` switches to the estimate.
    pub fn report_memory(&mut self, memory_mb: Option<f32>) {
        self.governor.report_memory(memory_mb);
    }

    // ─── Debug surface ──────────────────────────────────────────────────────

    /// While on, score updates are dropped and only [`force_intensity`]
    /// moves the level.
    ///
    /// [`force_intensity`]: IntensityEngine::force_intensity
    pub fn set_manual_override(&mut self, on: bool) {
        if on && !self.manual_override {
            self.machine.clear_pending();
            self.cancel_flush();
        }
        self.manual_override = on;
        log::info!("manual override {}", if on { "on" } else { "off" });
    }

    /// Force the continuous intensity to `intensity` in [0, 4].
    pub fn force_intensity(&mut self, now: u64, intensity: f32) -> EngineResult<()> {
        if !self.attached {
            return Err(EngineError::ShutDown);
        }
        self.tick(now);
        let applied = self.machine.force(now, intensity)?;
        self.cancel_flush();
        self.on_applied(applied);
        Ok(())
    }

    /// Snapshot of the debug surface.
    pub fn dump(&self) -> DebugDump {
        DebugDump {
            actor: self.session.as_ref().map(|s| s.actor.clone()),
            level: self.machine.level(),
            continuous: self.machine.continuous(),
            score: self.machine.score(),
            tier: self.governor.tier(),
            ceiling: self.admission.ceiling(),
            active_effects: self.admission.active_count(),
            manual_override: self.manual_override,
            history: self.history.entries(),
            counters: self.counters(),
        }
    }

    /// Every counter the engine keeps.
    pub fn counters(&self) -> PerformanceCounters {
        PerformanceCounters {
            updates: self.machine.stats(),
            admission: self.admission.stats(),
            pool: self.admission.pool().stats(),
            governor: self.governor.stats(),
            emissions: self.scheduler.emissions(),
            overridden_updates: self.overridden_updates,
            sink_failures: self.bus.sink_failures(),
            fps: self.governor.fps(),
            memory_mb: self.governor.memory_mb(),
        }
    }

    /// Cancel every timer, clear every effect and detach from the score
    /// source. Later updates are ignored.
    pub fn shutdown(&mut self) {
        if !self.attached {
            return;
        }
        self.teardown_session();
        self.timers.cancel_all();
        self.flush_timer = None;
        self.sweep_timer = None;
        self.sample_timer = None;
        self.attached = false;
        log::info!("engine shut down at {}", self.now);
    }

    // ─── Accessors ──────────────────────────────────────────────────────────

    /// Current level.
    pub fn level(&self) -> IntensityLevel {
        self.machine.level()
    }

    /// Current continuous intensity.
    pub fn continuous(&self) -> f32 {
        self.machine.continuous()
    }

    /// Last applied score.
    pub fn score(&self) -> f32 {
        self.machine.score()
    }

    /// Current quality tier.
    pub fn tier(&self) -> QualityTier {
        self.governor.tier()
    }

    /// Current admission ceiling.
    pub fn ceiling(&self) -> usize {
        self.admission.ceiling()
    }

    /// Current throttle window.
    pub fn throttle_window_ms(&self) -> u64 {
        self.machine.throttle_window_ms()
    }

    /// Effective emission interval at the current level.
    pub fn emission_interval_ms(&self) -> u64 {
        self.scheduler.interval_ms()
    }

    /// Effects on the surface.
    pub fn active_effects(&self) -> usize {
        self.admission.active_count()
    }

    /// The active session.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Preferences read at the last session start.
    pub fn preferences(&self) -> AccessibilityPrefs {
        self.prefs
    }

    /// Profile in use, after accessibility filtering.
    pub fn profile(&self) -> &EffectProfile {
        self.scheduler.profile()
    }

    /// `false` after [`shutdown`](IntensityEngine::shutdown).
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Manual override state.
    pub fn manual_override(&self) -> bool {
        self.manual_override
    }

    /// Pending continuations.
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Entries held by the timer queue, cancelled ones included.
    pub fn queued_timers(&self) -> usize {
        self.timers.queued()
    }

    /// Configuration in use.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ─── Internals ──────────────────────────────────────────────────────────

    fn tick(&mut self, now: u64) {
        if now < self.now {
            log::debug!("clock went backwards: {now} < {}", self.now);
        }
        self.now = self.now.max(now);
    }

    fn on_applied(&mut self, applied: AppliedUpdate) {
        self.history.push(StateHistoryEntry {
            at_ms: applied.at_ms,
            score: applied.score,
            sophistication: applied.sophistication,
            level: applied.current,
            continuous: applied.continuous,
            forced: applied.forced,
        });

        let Some(transition) = applied.transition else {
            return;
        };
        log::info!(
            "intensity {} -> {} at {} (score {}, continuous {:.2})",
            transition.previous,
            transition.current,
            transition.at_ms,
            transition.score,
            applied.continuous
        );
        self.bus.publish(&EngineEvent::IntensityChanged {
            previous: transition.previous,
            current: transition.current,
            continuous: applied.continuous,
            score: transition.score,
            at_ms: transition.at_ms,
        });
        for crossing in &applied.crossings {
            self.bus.publish(&EngineEvent::ThresholdCrossed(*crossing));
        }
        self.scheduler
            .on_level_change(transition.current, applied.at_ms, &mut self.timers);
    }

    fn admit(&mut self, request: EffectRequest, now: u64) {
        match self.admission.request(self.renderer.as_mut(), request, now) {
            Admission::Granted { id, expires_at, preempted } => {
                self.cancel_expiries(preempted.as_slice());
                let handle = self.timers.schedule(expires_at, TimerKind::EffectExpiry(id));
                self.admission.attach_timer(id, handle);
            }
            Admission::Failed { preempted, .. } => {
                self.cancel_expiries(preempted.as_slice());
            }
            Admission::Rejected { .. } => {}
        }
    }

    fn apply_tier(&mut self, change: TierChange) {
        let tier = change.current;
        let ceiling = tier
            .max_concurrent_effects()
            .min(self.config.max_concurrent_effects);
        let evicted = self.admission.enforce_ceiling(ceiling, self.renderer.as_mut());
        self.cancel_expiries(&evicted);
        self.machine
            .set_throttle_window(tier.throttle_window_ms().max(self.config.throttle_window_ms));
        self.scheduler
            .set_min_interval_ms(tier.min_emission_interval_ms());
        self.bus.publish(&EngineEvent::PerformanceChanged {
            previous: change.previous,
            current: change.current,
            fps: change.fps,
            memory_mb: change.memory_mb,
            at_ms: change.at_ms,
        });
    }

    fn ensure_background_timers(&mut self, now: u64) {
        if self.sweep_timer.is_none() {
            self.sweep_timer = Some(self.timers.schedule(
                now.saturating_add(self.config.sweep_interval_ms),
                TimerKind::StaleSweep,
            ));
        }
        if self.sample_timer.is_none() {
            self.sample_timer = Some(self.timers.schedule(
                now.saturating_add(self.config.sample_interval_ms),
                TimerKind::GovernorSample,
            ));
        }
    }

    fn teardown_session(&mut self) {
        self.scheduler.stop(&mut self.timers);
        self.cancel_flush();
        self.machine.clear_pending();
        let released = self
            .admission
            .release_all(ReleaseReason::Teardown, self.renderer.as_mut());
        self.cancel_expiries(&released);
        if let Some(session) = self.session.take() {
            log::info!("session for {} ended ({} effect(s) released)", session.actor, released.len());
        }
    }

    fn cancel_flush(&mut self) {
        if let Some((handle, _)) = self.flush_timer.take() {
            self.timers.cancel(handle);
        }
    }

    fn cancel_expiries(&mut self, released: &[ReleasedEffect]) {
        for handle in released.iter().filter_map(|r| r.timer) {
            self.timers.cancel(handle);
        }
    }

    fn note_sophistication(&mut self, sophistication: f32) {
        if let Some(session) = self.session.as_mut() {
            session.sophistication = sophistication;
        }
    }
}

impl core::fmt::Debug for IntensityEngine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IntensityEngine")
            .field("session", &self.session)
            .field("level", &self.machine.level())
            .field("tier", &self.governor.tier())
            .field("active_effects", &self.admission.active_count())
            .field("pending_timers", &self.timers.len())
            .field("attached", &self.attached)
            .finish()
    }
}
