//! # Vishing Call Session
//!
//! Plays one scripted phone-scam scene against the engine on a virtual clock.
//! Shows nonlinear scoring, threshold crossings, effect emission under the
//! admission ceiling, a frame-rate dip that lowers the quality tier, and
//! recovery once the player starts verifying.

use dread_core::effects::EffectKind;
use dread_core::events::{EngineEvent, EventLog};
use dread_core::render::SurfaceRecorder;
use dread_core::vulnerability::{
    ActionKind, ContextKind, ContextModifiers, TrustScorer, VulnerabilityWeights,
};
use dread_core::{EngineConfig, IntensityEngine};

// ── Script ───────────────────────────────────────────────────────────────────

/// (time ms, action, tactic in play)
const SCRIPT: &[(u64, ActionKind, ContextKind)] = &[
    (1_000, ActionKind::Hesitate, ContextKind::Authority),
    (4_000, ActionKind::ComplyWithUrgency, ContextKind::Urgency),
    (7_000, ActionKind::DiscloseSensitiveInfo, ContextKind::Authority),
    (7_050, ActionKind::ClickUnverifiedLink, ContextKind::Urgency),
    (12_000, ActionKind::ShareCredentials, ContextKind::Urgency),
    (20_000, ActionKind::AskClarifyingQuestion, ContextKind::Neutral),
    (24_000, ActionKind::VerifyIdentity, ContextKind::Authority),
    (28_000, ActionKind::SeekHelp, ContextKind::Neutral),
    (32_000, ActionKind::ReportAttempt, ContextKind::Neutral),
];

const END_MS: u64 = 40_000;
const FRAME_MS: u64 = 16;

fn caller_weights() -> VulnerabilityWeights {
    VulnerabilityWeights::neutral()
        .with_tactic(ContextKind::Urgency, 1.5)
        .with_tactic(ContextKind::Authority, 1.3)
        .with_baseline(ContextKind::Authority, 0.2)
        .with_modifiers(ContextModifiers {
            penalty: 1.1,
            bonus: 0.9,
            sensitivity: 1.0,
        })
        .with_recovery_rate(1.2)
        .with_initial_score(60.0)
}

fn describe(event: &EngineEvent) -> String {
    match event {
        EngineEvent::IntensityChanged { previous, current, score, .. } => {
            format!("intensity {previous} → {current} (score {score:.0})")
        }
        EngineEvent::ThresholdCrossed(c) => {
            format!("  crossed boundary {} ({:?})", c.boundary, c.direction)
        }
        EngineEvent::PerformanceChanged { previous, current, fps, .. } => {
            format!("quality {previous} → {current} at {fps:.1} fps")
        }
    }
}

fn main() {
    println!("╔══════════════════════════════════════════════════════════════════════╗");
    println!("║  Vishing call: \"This is IT, we need your password to fix an issue\"  ║");
    println!("╚══════════════════════════════════════════════════════════════════════╝\n");

    let surface = SurfaceRecorder::new();
    let log = EventLog::new();
    let scorer = TrustScorer::new().with_actor("it_support_caller".into(), caller_weights());
    let mut engine = match IntensityEngine::new(EngineConfig::default(), Box::new(surface.clone())) {
        Ok(engine) => engine.with_scorer(scorer),
        Err(err) => {
            eprintln!("bad configuration: {err}");
            return;
        }
    };
    engine.subscribe(Box::new(log.clone()));
    engine.start_session("it_support_caller", 0);

    let mut script = SCRIPT.iter().peekable();
    let mut printed = 0;
    let mut now = 0;
    while now <= END_MS {
        // A stutter between 14 s and 17 s: 90 ms frames.
        let frame = if (14_000..17_000).contains(&now) { 90 } else { FRAME_MS };
        engine.record_frame(frame as f32);
        now += frame;

        while let Some((at, action, context)) = script.next_if(|(at, _, _)| *at <= now) {
            let score = engine.record_action(*at, *action, *context).unwrap_or_default();
            println!("[{:>6} ms] {action:?} under {context:?} → score {score:.0}", at);
        }
        engine.advance(now);

        let events = log.events();
        for event in &events[printed..] {
            println!("[{:>6} ms] {}", event.at_ms(), describe(event));
        }
        printed = events.len();
    }

    println!("\n▶  Surface at the end");
    for kind in EffectKind::ALL {
        if surface.is_shown(kind) {
            println!("  {kind} still on screen");
        }
    }

    let dump = engine.dump();
    let c = dump.counters;
    println!("\n▶  Counters");
    println!("  level {}  score {:.0}  tier {}", dump.level, dump.score, dump.tier);
    println!(
        "  updates applied {}  coalesced {}  rejected {}",
        c.updates.applied, c.updates.coalesced, c.updates.rejected
    );
    println!(
        "  effects granted {}  rejected {}  preempted {}  failed {}",
        c.admission.granted, c.admission.rejected, c.admission.preempted, c.admission.failed
    );
    println!(
        "  pool created {}  reused {}  discarded {}",
        c.pool.created, c.pool.reused, c.pool.discarded
    );
    println!("  history entries {}", dump.history.len());

    engine.shutdown();
    println!("\nShut down: {} effect(s) left on the surface.", surface.shown_count());
}
