//! # dread-core
//!
//! Adaptive intensity control for security-awareness horror narratives.
//!
//! ---
//!
//! ## A trust score in, a bounded stream of corruption effects out.
//!
//! The player is talking to someone who wants their password. Every choice they
//! make moves a trust score; the lower it falls, the more the scene decays
//! around them. This crate owns that decay.
//!
//! **Nonlinear scoring**: the same mistake costs more the less trust is left.
//! Each manipulating character weights tactics differently.
//!
//! **Discrete intensity**: the score maps onto five levels through fixed
//! thresholds. Bursts of updates coalesce inside a throttle window, and every
//! boundary a jump spans is reported.
//!
//! **Bounded effects**: each level emits effects on a cadence. A priority-based
//! admission controller keeps the surface under a hard ceiling, and a governor
//! fed by frame timing lowers that ceiling when the host struggles.
//!
//! ---
//!
//! ## The pipeline
//!
//! ```text
//! ActionKind → TrustScorer → score → IntensityMachine → level → EffectScheduler
//!                  ↑                      ↑                            ↓
//!        VulnerabilityWeights       throttle window          AdmissionController → EffectRenderer
//!                                         ↑                            ↑
//!                                         └──── PerformanceGovernor ───┘
//! ```
//!
//! ## Module overview
//!
//! | Module | Key types | What it does |
//! |--------|-----------|--------------|
//! | [`vulnerability`] | [`TrustScorer`], [`VulnerabilityWeights`] | Actor-weighted nonlinear trust deltas |
//! | [`intensity`] | [`IntensityMachine`], [`IntensityLevel`] | Thresholds, throttling, transitions and crossings |
//! | [`effects`] | [`EffectKind`], [`EffectProfile`] | Effect vocabulary and per-actor level tables |
//! | [`pool`] | [`EffectPool`] | Bounded per-kind shell free lists |
//! | [`admission`] | [`AdmissionController`] | Priority admission under a concurrency ceiling |
//! | [`scheduler`] | [`EffectScheduler`] | Seeded periodic emission per level |
//! | [`governor`] | [`PerformanceGovernor`], [`QualityTier`] | FPS and memory driven quality tiers |
//! | [`timer`] | [`TimerQueue`] | Virtual-clock cancellable continuations |
//! | [`events`] | [`EngineEvent`], [`EventSink`] | Typed observers |
//! | [`render`] | [`EffectRenderer`], [`SurfaceRecorder`] | Draw-surface contract |
//! | [`accessibility`] | [`AccessibilityPrefs`], [`PreferenceStore`] | Player opt-outs |
//! | [`history`] | [`DebugDump`] | State-history ring and counters |
//! | [`engine`] | [`IntensityEngine`] | Wires it all together |
//!
//! ## Quick start
//!
//! ```rust
//! use dread_core::{EngineConfig, IntensityEngine, NullRenderer, ScoreUpdate};
//!
//! let mut engine = IntensityEngine::new(EngineConfig::default(), Box::new(NullRenderer)).unwrap();
//! engine.start_session("helpdesk_caller", 0);
//! engine.update(0, ScoreUpdate::new(-45.0, 2.0));
//! engine.advance(5_000);
//! assert_eq!(engine.level().get(), 3);
//! ```
//!
//! ## License
//!
//! Business Source License 1.1. Free for evaluation and non-production use.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod accessibility;
pub mod admission;
pub mod config;
pub mod effects;
pub mod engine;
pub mod error;
pub mod events;
pub mod governor;
pub mod history;
pub mod intensity;
pub mod pool;
pub mod render;
pub mod scheduler;
pub mod timer;
pub mod vulnerability;

pub use accessibility::{AccessibilityPrefs, HorrorIntensity, MemoryPreferenceStore, PreferenceStore};
pub use admission::{AdmissionController, EffectId, MAX_ACTIVE_EFFECTS};
pub use config::EngineConfig;
pub use effects::{EffectKind, EffectProfile, EffectTarget, IntensityClass};
pub use engine::{IntensityEngine, Session};
pub use error::{EngineError, EngineResult};
pub use events::{EngineEvent, EventLog, EventSink};
pub use governor::{PerformanceGovernor, QualityTier};
pub use history::{DebugDump, PerformanceCounters, StateHistoryEntry};
pub use intensity::{intensity_for, Direction, IntensityLevel, IntensityMachine, ScoreUpdate};
pub use pool::EffectPool;
pub use render::{EffectRenderer, NullRenderer, RenderError, SurfaceRecorder};
pub use scheduler::EffectScheduler;
pub use timer::TimerQueue;
pub use vulnerability::{ActionKind, ActorId, ContextKind, TrustScorer, VulnerabilityWeights};
