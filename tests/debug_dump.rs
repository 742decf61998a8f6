//! Debug-surface serialisation.
//!
//! Tests are run with `cargo test --features serde`.

#![cfg(feature = "serde")]

use dread_core::accessibility::{AccessibilityPrefs, HorrorIntensity};
use dread_core::engine::IntensityEngine;
use dread_core::events::{EngineEvent, EventLog};
use dread_core::history::DebugDump;
use dread_core::intensity::ScoreUpdate;
use dread_core::render::NullRenderer;
use dread_core::EngineConfig;

#[test]
fn test_dump_round_trips_through_json() {
    let mut engine = IntensityEngine::new(EngineConfig::default(), Box::new(NullRenderer)).unwrap();
    engine.start_session("helpdesk_caller", 0);
    engine.update(0, ScoreUpdate::immediate(-30.0, 2.0));
    engine.update(200, ScoreUpdate::immediate(-65.0, 3.0));
    engine.advance(3_000);

    let dump = engine.dump();
    assert_eq!(dump.history.len(), 2);
    assert_eq!(dump.actor.as_ref().map(|a| a.as_str()), Some("helpdesk_caller"));

    let json = serde_json::to_string(&dump).unwrap();
    let back: DebugDump = serde_json::from_str(&json).unwrap();
    assert_eq!(back, dump);

    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["tier"], "high");
    assert_eq!(value["history"][1]["level"], 4);
}

#[test]
fn test_events_serialise_with_tag() {
    let log = EventLog::new();
    let mut engine = IntensityEngine::new(EngineConfig::default(), Box::new(NullRenderer)).unwrap();
    engine.subscribe(Box::new(log.clone()));
    engine.start_session("caller", 0);
    engine.update(0, ScoreUpdate::immediate(0.0, 1.0));

    let events = log.events();
    let json = serde_json::to_value(&events).unwrap();
    assert_eq!(json[0]["event"], "intensity_changed");
    assert_eq!(json[0]["current"], 1);
    assert_eq!(json[1]["event"], "threshold_crossed");
    assert_eq!(json[1]["direction"], "increase");

    let back: Vec<EngineEvent> = serde_json::from_value(json).unwrap();
    assert_eq!(back, events);
}

#[test]
fn test_prefs_contract_names() {
    let prefs = AccessibilityPrefs {
        horror_intensity: HorrorIntensity::Minimal,
        flashing_effects: false,
        reduced_motion: true,
    };
    let json = prefs.to_json().unwrap();
    assert_eq!(
        json,
        r#"{"horrorIntensity":"minimal","flashingEffects":false,"reducedMotion":true}"#
    );
    assert_eq!(AccessibilityPrefs::from_json(&json).unwrap(), prefs);
}

#[test]
fn test_config_from_json() {
    let config = EngineConfig::from_json(r#"{"max_concurrent_effects": 4, "rng_seed": 9}"#).unwrap();
    assert_eq!(config.max_concurrent_effects, 4);
    assert_eq!(config.rng_seed, 9);
    assert!(EngineConfig::from_json(r#"{"max_concurrent_effects": 11}"#).is_err());
}
