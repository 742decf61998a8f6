//! Priority-based admission control for concurrent effects.
//!
//! The active set never holds more than the current ceiling (itself never more
//! than [`MAX_ACTIVE_EFFECTS`]). At the ceiling an incoming request competes
//! with the lowest-priority active effect, the oldest one on ties: strictly
//! higher priority preempts it, anything else is rejected without fuss.
//!
//! Every effect leaves the set through [`AdmissionController::release`] or one
//! of the sweeps built on it, so `clear` always reaches the renderer and the
//! shell always goes back to the pool.

use crate::effects::{EffectKind, IntensityClass};
use crate::error::EngineError;
use crate::intensity::IntensityLevel;
use crate::pool::{EffectPool, EffectShell};
use crate::render::{guarded, EffectRenderer};
use crate::timer::TimerHandle;

/// Hard upper bound on simultaneously active effects.
pub const MAX_ACTIVE_EFFECTS: usize = 10;

/// Identity of one admitted effect. Never reused within an engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EffectId(u64);

impl EffectId {
    /// Raw id.
    pub fn get(self) -> u64 {
        self.0
    }
}

/// An effect currently on the surface.
#[derive(Clone, Debug)]
pub struct ActiveEffect {
    /// Identity.
    pub id: EffectId,
    /// Kind drawn.
    pub kind: EffectKind,
    /// Static priority of the kind.
    pub priority: u8,
    /// Level the effect was emitted at.
    pub level: IntensityLevel,
    /// Grant time.
    pub acquired_at: u64,
    /// Scheduled auto-release time.
    pub expires_at: u64,
    /// Expiry continuation, once scheduled.
    pub timer: Option<TimerHandle>,
    shell: EffectShell,
}

impl ActiveEffect {
    /// Draw data handed to the renderer.
    pub fn shell(&self) -> &EffectShell {
        &self.shell
    }

    // Eviction order: lowest priority first, then oldest.
    fn eviction_key(&self) -> (u8, u64, EffectId) {
        (self.priority, self.acquired_at, self.id)
    }
}

/// One emission asking for a slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EffectRequest {
    /// Kind to draw.
    pub kind: EffectKind,
    /// Level at emission.
    pub level: IntensityLevel,
    /// Lifetime once granted.
    pub duration_ms: u64,
}

/// Why an effect left the active set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ReleaseReason {
    /// Its lifetime ran out.
    Expired,
    /// A higher-priority request took its slot.
    Preempted,
    /// The stale sweep found it too old.
    Stale,
    /// The ceiling dropped below the active count.
    Ceiling,
    /// The renderer failed to draw it.
    RenderFailure,
    /// Session teardown or shutdown.
    Teardown,
}

/// Receipt for a released effect. The caller cancels `timer` if set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReleasedEffect {
    /// Identity.
    pub id: EffectId,
    /// Kind.
    pub kind: EffectKind,
    /// Why.
    pub reason: ReleaseReason,
    /// Expiry continuation still pending, if any.
    pub timer: Option<TimerHandle>,
}

/// Outcome of [`AdmissionController::request`].
#[derive(Clone, Debug, PartialEq)]
pub enum Admission {
    /// Drawn and tracked.
    Granted {
        /// New effect.
        id: EffectId,
        /// When it should auto-release.
        expires_at: u64,
        /// Effect evicted to make room.
        preempted: Option<ReleasedEffect>,
    },
    /// At the ceiling without enough priority.
    Rejected {
        /// Requested kind.
        kind: EffectKind,
        /// Its priority.
        priority: u8,
    },
    /// The renderer failed; the effect was released at once.
    Failed {
        /// Requested kind.
        kind: EffectKind,
        /// The contained renderer failure.
        error: EngineError,
        /// Effect evicted before the draw was attempted.
        preempted: Option<ReleasedEffect>,
    },
}

/// Admission counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AdmissionStats {
    /// Requests granted.
    pub granted: u64,
    /// Requests rejected at the ceiling.
    pub rejected: u64,
    /// Effects evicted by higher-priority requests.
    pub preempted: u64,
    /// Draws the renderer failed.
    pub failed: u64,
    /// Effects released for any reason.
    pub released: u64,
    /// `clear` calls the renderer failed.
    pub clear_failures: u64,
}

/// Owner of the active effect set.
#[derive(Debug)]
pub struct AdmissionController {
    active: heapless::Vec<ActiveEffect, MAX_ACTIVE_EFFECTS>,
    ceiling: usize,
    next_id: u64,
    pool: EffectPool,
    stats: AdmissionStats,
}

impl AdmissionController {
    /// Controller with `ceiling` slots, capped at [`MAX_ACTIVE_EFFECTS`].
    pub fn new(ceiling: usize) -> Self {
        Self {
            active: heapless::Vec::new(),
            ceiling: ceiling.clamp(1, MAX_ACTIVE_EFFECTS),
            next_id: 0,
            pool: EffectPool::new(),
            stats: AdmissionStats::default(),
        }
    }

    /// Ask for a slot and draw the effect if one is granted.
    pub fn request(
        &mut self,
        renderer: &mut dyn EffectRenderer,
        request: EffectRequest,
        now: u64,
    ) -> Admission {
        let kind = request.kind;
        let priority = kind.priority();
        let Some(class) = IntensityClass::from_level(request.level) else {
            self.stats.rejected += 1;
            log::trace!("rejected {kind}: emitted at calm level");
            return Admission::Rejected { kind, priority };
        };

        let mut preempted = None;
        if self.active.len() >= self.ceiling {
            let victim = self
                .eviction_candidate()
                .filter(|v| priority > v.priority)
                .map(|v| v.id);
            match victim {
                Some(id) => {
                    preempted = self.release(id, ReleaseReason::Preempted, renderer);
                    self.stats.preempted += 1;
                }
                None => {
                    self.stats.rejected += 1;
                    log::trace!(
                        "rejected {kind} (priority {priority}) at ceiling {}",
                        self.ceiling
                    );
                    return Admission::Rejected { kind, priority };
                }
            }
        }

        let mut shell = self.pool.acquire(kind);
        shell.prepare(class);
        if let Err(error) = guarded(kind, || renderer.apply(kind, shell.targets(), class)) {
            log::warn!("renderer failed to apply {kind} at {class:?}: {error}; releasing");
            self.stats.failed += 1;
            self.clear_on_surface(renderer, &shell);
            self.pool.release(shell);
            return Admission::Failed { kind, error, preempted };
        }

        let id = EffectId(self.next_id);
        self.next_id += 1;
        let expires_at = now.saturating_add(request.duration_ms);
        let effect = ActiveEffect {
            id,
            kind,
            priority,
            level: request.level,
            acquired_at: now,
            expires_at,
            timer: None,
            shell,
        };
        if let Err(effect) = self.active.push(effect) {
            // Ceiling never exceeds capacity, so this only trips on a logic error.
            log::warn!("active set full at {}; dropping {kind}", self.active.len());
            self.clear_on_surface(renderer, &effect.shell);
            self.pool.release(effect.shell);
            self.stats.rejected += 1;
            return Admission::Rejected { kind, priority };
        }
        self.stats.granted += 1;
        Admission::Granted { id, expires_at, preempted }
    }

    /// Record the expiry continuation of an admitted effect.
    pub fn attach_timer(&mut self, id: EffectId, timer: TimerHandle) -> bool {
        match self.active.iter_mut().find(|e| e.id == id) {
            Some(effect) => {
                effect.timer = Some(timer);
                true
            }
            None => false,
        }
    }

    /// Release one effect: clear it on the surface and pool its shell.
    /// Releasing an unknown id is a no-op.
    pub fn release(
        &mut self,
        id: EffectId,
        reason: ReleaseReason,
        renderer: &mut dyn EffectRenderer,
    ) -> Option<ReleasedEffect> {
        let index = self.active.iter().position(|e| e.id == id)?;
        let effect = self.active.swap_remove(index);
        self.clear_on_surface(renderer, &effect.shell);
        self.pool.release(effect.shell);
        self.stats.released += 1;
        log::debug!("released {} #{} ({reason:?})", effect.kind, id.0);
        Some(ReleasedEffect {
            id,
            kind: effect.kind,
            reason,
            timer: effect.timer,
        })
    }

    /// Release every effect older than `max_age_ms`.
    pub fn sweep_stale(
        &mut self,
        now: u64,
        max_age_ms: u64,
        renderer: &mut dyn EffectRenderer,
    ) -> Vec<ReleasedEffect> {
        let stale: Vec<EffectId> = self
            .active
            .iter()
            .filter(|e| now.saturating_sub(e.acquired_at) > max_age_ms)
            .map(|e| e.id)
            .collect();
        if !stale.is_empty() {
            log::info!("stale sweep releasing {} effect(s)", stale.len());
        }
        stale
            .into_iter()
            .filter_map(|id| self.release(id, ReleaseReason::Stale, renderer))
            .collect()
    }

    /// Set a new ceiling and evict down to it, lowest priority first.
    pub fn enforce_ceiling(
        &mut self,
        ceiling: usize,
        renderer: &mut dyn EffectRenderer,
    ) -> Vec<ReleasedEffect> {
        self.set_ceiling(ceiling);
        let mut out = Vec::new();
        while self.active.len() > self.ceiling {
            let Some(id) = self.eviction_candidate().map(|e| e.id) else {
                break;
            };
            if let Some(released) = self.release(id, ReleaseReason::Ceiling, renderer) {
                out.push(released);
            }
        }
        out
    }

    /// Release everything.
    pub fn release_all(
        &mut self,
        reason: ReleaseReason,
        renderer: &mut dyn EffectRenderer,
    ) -> Vec<ReleasedEffect> {
        let ids: Vec<EffectId> = self.active.iter().map(|e| e.id).collect();
        ids.into_iter()
            .filter_map(|id| self.release(id, reason, renderer))
            .collect()
    }

    /// Change the ceiling without evicting. Capped at [`MAX_ACTIVE_EFFECTS`].
    pub fn set_ceiling(&mut self, ceiling: usize) {
        self.ceiling = ceiling.clamp(1, MAX_ACTIVE_EFFECTS);
    }

    /// Current ceiling.
    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Number of active effects.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Active effects, unordered.
    pub fn active(&self) -> &[ActiveEffect] {
        &self.active
    }

    /// Look up an active effect.
    pub fn get(&self, id: EffectId) -> Option<&ActiveEffect> {
        self.active.iter().find(|e| e.id == id)
    }

    /// The shell pool.
    pub fn pool(&self) -> &EffectPool {
        &self.pool
    }

    /// Admission counters.
    pub fn stats(&self) -> AdmissionStats {
        self.stats
    }

    fn eviction_candidate(&self) -> Option<&ActiveEffect> {
        self.active.iter().min_by_key(|e| e.eviction_key())
    }

    fn clear_on_surface(&mut self, renderer: &mut dyn EffectRenderer, shell: &EffectShell) {
        let kind = shell.kind();
        if let Err(error) = guarded(kind, || renderer.clear(kind, shell.targets())) {
            self.stats.clear_failures += 1;
            log::warn!("renderer failed to clear {kind}: {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::SurfaceRecorder;

    fn req(kind: EffectKind) -> EffectRequest {
        EffectRequest {
            kind,
            level: IntensityLevel::new_saturating(2),
            duration_ms: 500,
        }
    }

    fn granted(a: Admission) -> (EffectId, Option<ReleasedEffect>) {
        match a {
            Admission::Granted { id, preempted, .. } => (id, preempted),
            other => panic!("expected Granted, got {other:?}"),
        }
    }

    #[test]
    fn test_ceiling_rejects_lower_and_preempts_higher() {
        let mut surface = SurfaceRecorder::new();
        let mut ctl = AdmissionController::new(3);

        let (first, _) = granted(ctl.request(&mut surface, req(EffectKind::ColorDrain), 0));
        granted(ctl.request(&mut surface, req(EffectKind::Vignette), 10));
        granted(ctl.request(&mut surface, req(EffectKind::ColorDrain), 20));
        assert_eq!(ctl.active_count(), 3);

        let low = ctl.request(&mut surface, req(EffectKind::TextGlitch), 30);
        assert_eq!(low, Admission::Rejected { kind: EffectKind::TextGlitch, priority: 1 });

        let equal = ctl.request(&mut surface, req(EffectKind::Vignette), 35);
        assert!(matches!(equal, Admission::Rejected { .. }), "equal priority never preempts");

        let (_, preempted) = granted(ctl.request(&mut surface, req(EffectKind::FalseMessage), 40));
        let preempted = preempted.unwrap();
        assert_eq!(preempted.id, first, "oldest of the lowest priority goes first");
        assert_eq!(preempted.reason, ReleaseReason::Preempted);
        assert_eq!(ctl.active_count(), 3);
        assert_eq!(ctl.stats().preempted, 1);
        assert_eq!(ctl.stats().rejected, 2);
    }

    #[test]
    fn test_release_clears_and_pools() {
        let mut surface = SurfaceRecorder::new();
        let mut ctl = AdmissionController::new(10);
        let (id, _) = granted(ctl.request(&mut surface, req(EffectKind::Whisper), 0));
        assert!(surface.is_shown(EffectKind::Whisper));

        let released = ctl.release(id, ReleaseReason::Expired, &mut surface).unwrap();
        assert_eq!(released.kind, EffectKind::Whisper);
        assert!(!surface.is_shown(EffectKind::Whisper));
        assert_eq!(ctl.pool().pooled(EffectKind::Whisper), 1);
        assert!(ctl.release(id, ReleaseReason::Expired, &mut surface).is_none());
    }

    #[test]
    fn test_render_failure_force_releases() {
        let mut surface = SurfaceRecorder::new();
        surface.fail_on(EffectKind::Flicker);
        let mut ctl = AdmissionController::new(10);

        let a = ctl.request(&mut surface, req(EffectKind::Flicker), 0);
        assert!(matches!(a, Admission::Failed { kind: EffectKind::Flicker, .. }));
        assert_eq!(ctl.active_count(), 0);
        assert_eq!(ctl.stats().failed, 1);
        assert_eq!(ctl.pool().pooled(EffectKind::Flicker), 1);

        granted(ctl.request(&mut surface, req(EffectKind::Vignette), 5));
    }

    #[test]
    fn test_stale_sweep_uses_age() {
        let mut surface = SurfaceRecorder::new();
        let mut ctl = AdmissionController::new(10);
        granted(ctl.request(&mut surface, req(EffectKind::Vignette), 0));
        granted(ctl.request(&mut surface, req(EffectKind::Whisper), 5_000));

        assert!(ctl.sweep_stale(10_000, 10_000, &mut surface).is_empty());
        let swept = ctl.sweep_stale(10_001, 10_000, &mut surface);
        assert_eq!(swept.len(), 1);
        assert_eq!(swept[0].kind, EffectKind::Vignette);
        assert_eq!(swept[0].reason, ReleaseReason::Stale);
        assert_eq!(ctl.active_count(), 1);
    }

    #[test]
    fn test_enforce_ceiling_evicts_lowest_priority() {
        let mut surface = SurfaceRecorder::new();
        let mut ctl = AdmissionController::new(10);
        for (t, kind) in [
            EffectKind::FalseMessage,
            EffectKind::TextGlitch,
            EffectKind::Flicker,
            EffectKind::ColorDrain,
            EffectKind::Whisper,
        ]
        .into_iter()
        .enumerate()
        {
            granted(ctl.request(&mut surface, req(kind), t as u64));
        }

        let evicted = ctl.enforce_ceiling(3, &mut surface);
        let kinds: Vec<EffectKind> = evicted.iter().map(|r| r.kind).collect();
        assert_eq!(kinds, vec![EffectKind::TextGlitch, EffectKind::ColorDrain]);
        assert_eq!(ctl.active_count(), 3);
        assert_eq!(ctl.ceiling(), 3);
    }

    #[test]
    fn test_ceiling_capped_at_hard_maximum() {
        let ctl = AdmissionController::new(50);
        assert_eq!(ctl.ceiling(), MAX_ACTIVE_EFFECTS);
    }

    #[test]
    fn test_release_all_empties_surface() {
        let mut surface = SurfaceRecorder::new();
        let mut ctl = AdmissionController::new(10);
        granted(ctl.request(&mut surface, req(EffectKind::Vignette), 0));
        granted(ctl.request(&mut surface, req(EffectKind::TextGlitch), 0));
        let released = ctl.release_all(ReleaseReason::Teardown, &mut surface);
        assert_eq!(released.len(), 2);
        assert_eq!(surface.shown_count(), 0);
    }
}
