//! Typed engine events and their observers.
//!
//! Every event is named and timestamped. Delivery is best-effort: a sink that
//! panics is logged and skipped, and the remaining sinks still receive the
//! event.

use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use crate::governor::QualityTier;
use crate::intensity::{IntensityLevel, ThresholdCrossing};

/// Something observable happened inside the engine.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "event", rename_all = "snake_case"))]
pub enum EngineEvent {
    /// The discrete intensity level changed.
    IntensityChanged {
        /// Level before.
        previous: IntensityLevel,
        /// Level after.
        current: IntensityLevel,
        /// Continuous intensity after.
        continuous: f32,
        /// Score that caused the change.
        score: f32,
        /// Time of the change.
        at_ms: u64,
    },
    /// One integer boundary was crossed.
    ThresholdCrossed(ThresholdCrossing),
    /// The governor moved to another quality tier.
    PerformanceChanged {
        /// Tier before.
        previous: QualityTier,
        /// Tier after.
        current: QualityTier,
        /// Smoothed FPS at the sample.
        fps: f32,
        /// Memory reading at the sample, in MB.
        memory_mb: f32,
        /// Sample time.
        at_ms: u64,
    },
}

impl EngineEvent {
    /// Stable event name.
    pub fn name(&self) -> &'static str {
        match self {
            EngineEvent::IntensityChanged { .. } => "intensity_changed",
            EngineEvent::ThresholdCrossed(_) => "threshold_crossed",
            EngineEvent::PerformanceChanged { .. } => "performance_changed",
        }
    }

    /// When the event happened.
    pub fn at_ms(&self) -> u64 {
        match self {
            EngineEvent::IntensityChanged { at_ms, .. } => *at_ms,
            EngineEvent::ThresholdCrossed(c) => c.at_ms,
            EngineEvent::PerformanceChanged { at_ms, .. } => *at_ms,
        }
    }
}

/// An observer of engine events.
pub trait EventSink {
    /// Receive one event. Must not call back into the engine.
    fn record(&mut self, event: &EngineEvent);
}

impl<F: FnMut(&EngineEvent)> EventSink for F {
    fn record(&mut self, event: &EngineEvent) {
        self(event)
    }
}

/// Shared in-memory event log. Clones share the same buffer, so a host can
/// keep one clone and subscribe the other.
#[derive(Clone, Debug, Default)]
pub struct EventLog {
    events: Rc<RefCell<Vec<EngineEvent>>>,
}

impl EventLog {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every recorded event, oldest first.
    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.borrow().clone()
    }

    /// Events with the given name.
    pub fn named(&self, name: &str) -> Vec<EngineEvent> {
        self.events
            .borrow()
            .iter()
            .filter(|e| e.name() == name)
            .cloned()
            .collect()
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    /// `true` when nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    /// Drop every recorded event.
    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl EventSink for EventLog {
    fn record(&mut self, event: &EngineEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

/// Per-engine observer list.
#[derive(Default)]
pub struct EventBus {
    sinks: Vec<Box<dyn EventSink>>,
    published: u64,
    sink_failures: u64,
}

impl EventBus {
    /// Bus with no observers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer. Observers receive events in subscription order.
    pub fn subscribe(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }

    /// Deliver `event` to every observer.
    pub fn publish(&mut self, event: &EngineEvent) {
        self.published += 1;
        for (index, sink) in self.sinks.iter_mut().enumerate() {
            let delivered = panic::catch_unwind(AssertUnwindSafe(|| sink.record(event)));
            if delivered.is_err() {
                self.sink_failures += 1;
                log::warn!("event sink #{index} panicked on {}: {event:?}", event.name());
            }
        }
    }

    /// Number of observers.
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// `true` when nobody listens.
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Events published so far.
    pub fn published(&self) -> u64 {
        self.published
    }

    /// Deliveries that panicked.
    pub fn sink_failures(&self) -> u64 {
        self.sink_failures
    }
}

impl core::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventBus")
            .field("sinks", &self.sinks.len())
            .field("published", &self.published)
            .field("sink_failures", &self.sink_failures)
            .finish()
    }
}
