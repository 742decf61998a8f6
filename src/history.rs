//! Debug surface: state-history ring, performance counters and the dump.
//!
//! The ring keeps the last [`HISTORY_CAPACITY`] applied intensity updates,
//! oldest entries are overwritten first. A [`DebugDump`] is a plain value the
//! host can print or, with the `serde` feature, serialise.

use heapless::HistoryBuffer;

use crate::admission::AdmissionStats;
use crate::governor::{GovernorStats, QualityTier};
use crate::intensity::{IntensityLevel, MachineStats};
use crate::pool::PoolStats;
use crate::vulnerability::ActorId;

/// Entries kept by [`StateHistory`].
pub const HISTORY_CAPACITY: usize = 50;

/// One applied intensity update.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StateHistoryEntry {
    /// Application time.
    pub at_ms: u64,
    /// Score after the update.
    pub score: f32,
    /// Sophistication after the update.
    pub sophistication: f32,
    /// Level after the update.
    pub level: IntensityLevel,
    /// Continuous intensity after the update.
    pub continuous: f32,
    /// Debug force-set.
    pub forced: bool,
}

/// Fixed-size ring of recent updates.
pub struct StateHistory {
    ring: HistoryBuffer<StateHistoryEntry, HISTORY_CAPACITY>,
}

impl StateHistory {
    /// Empty ring.
    pub fn new() -> Self {
        Self { ring: HistoryBuffer::new() }
    }

    /// Append, overwriting the oldest entry when full.
    pub fn push(&mut self, entry: StateHistoryEntry) {
        self.ring.write(entry);
    }

    /// Entries held.
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// `true` when empty.
    pub fn is_empty(&self) -> bool {
        self.ring.len() == 0
    }

    /// Most recent entry.
    pub fn latest(&self) -> Option<&StateHistoryEntry> {
        self.ring.recent()
    }

    /// Entries oldest first.
    pub fn entries(&self) -> Vec<StateHistoryEntry> {
        self.ring.oldest_ordered().copied().collect()
    }
}

impl Default for StateHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for StateHistory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_list().entries(self.ring.oldest_ordered()).finish()
    }
}

/// Every counter the engine keeps.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PerformanceCounters {
    /// Score updates.
    pub updates: MachineStats,
    /// Admission outcomes.
    pub admission: AdmissionStats,
    /// Shell pool traffic.
    pub pool: PoolStats,
    /// Governor samples.
    pub governor: GovernorStats,
    /// Effect requests produced by the emission loop.
    pub emissions: u64,
    /// Updates dropped while the manual override was on.
    pub overridden_updates: u64,
    /// Event sink panics contained.
    pub sink_failures: u64,
    /// Current smoothed FPS.
    pub fps: f32,
    /// Last memory reading, MB.
    pub memory_mb: f32,
}

/// Snapshot of the debug surface.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DebugDump {
    /// Actor of the current session, if any.
    pub actor: Option<ActorId>,
    /// Current level.
    pub level: IntensityLevel,
    /// Current continuous intensity.
    pub continuous: f32,
    /// Current score.
    pub score: f32,
    /// Current tier.
    pub tier: QualityTier,
    /// Current admission ceiling.
    pub ceiling: usize,
    /// Active effect count.
    pub active_effects: usize,
    /// Manual override on.
    pub manual_override: bool,
    /// History, oldest first.
    pub history: Vec<StateHistoryEntry>,
    /// Counters.
    pub counters: PerformanceCounters,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(at_ms: u64) -> StateHistoryEntry {
        StateHistoryEntry {
            at_ms,
            score: 0.0,
            sophistication: 1.0,
            level: IntensityLevel::new_saturating(1),
            continuous: 1.0,
            forced: false,
        }
    }

    #[test]
    fn test_ring_keeps_last_fifty_in_order() {
        let mut h = StateHistory::new();
        for t in 0..120 {
            h.push(entry(t));
        }
        assert_eq!(h.len(), HISTORY_CAPACITY);
        let times: Vec<u64> = h.entries().iter().map(|e| e.at_ms).collect();
        assert_eq!(times.first(), Some(&70));
        assert_eq!(times.last(), Some(&119));
        assert!(times.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(h.latest().map(|e| e.at_ms), Some(119));
    }

    #[test]
    fn test_new_history_is_empty() {
        let h = StateHistory::new();
        assert!(h.is_empty());
        assert!(h.entries().is_empty());
        assert!(h.latest().is_none());
    }
}
