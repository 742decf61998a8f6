//! Per-kind object pool of effect shells.
//!
//! Each kind keeps a bounded free list of [`EffectShell`]s. Acquiring reuses a
//! pooled shell when one exists and builds a fresh one otherwise; releasing
//! returns the shell unless the kind's list is already full, in which case the
//! shell is dropped. The pool is an optimisation only: a miss is never an
//! error.

use hashbrown::HashMap;

use crate::effects::{EffectKind, EffectTarget, IntensityClass};

/// Free shells kept per effect kind.
pub const POOL_CAPACITY_PER_KIND: usize = 5;

/// Reusable carrier for one effect's draw data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EffectShell {
    kind: EffectKind,
    targets: Vec<EffectTarget>,
    class: Option<IntensityClass>,
    uses: u32,
}

impl EffectShell {
    fn fresh(kind: EffectKind) -> Self {
        Self {
            kind,
            targets: Vec::with_capacity(kind.default_targets().len()),
            class: None,
            uses: 0,
        }
    }

    /// Load draw data for the next use.
    pub fn prepare(&mut self, class: IntensityClass) {
        self.targets.clear();
        self.targets.extend_from_slice(self.kind.default_targets());
        self.class = Some(class);
        self.uses += 1;
    }

    fn scrub(&mut self) {
        self.targets.clear();
        self.class = None;
    }

    /// Kind this shell draws.
    pub fn kind(&self) -> EffectKind {
        self.kind
    }

    /// Surfaces the effect lands on.
    pub fn targets(&self) -> &[EffectTarget] {
        &self.targets
    }

    /// Class the shell was prepared with; `None` while pooled.
    pub fn class(&self) -> Option<IntensityClass> {
        self.class
    }

    /// How many times this shell has been prepared.
    pub fn uses(&self) -> u32 {
        self.uses
    }
}

/// Pool counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PoolStats {
    /// Shells built because the free list was empty.
    pub created: u64,
    /// Shells served from a free list.
    pub reused: u64,
    /// Shells returned to a free list.
    pub returned: u64,
    /// Shells dropped because the free list was full.
    pub discarded: u64,
}

type FreeList = heapless::Vec<EffectShell, POOL_CAPACITY_PER_KIND>;

/// Bounded per-kind free lists.
#[derive(Debug, Default)]
pub struct EffectPool {
    free: HashMap<EffectKind, FreeList>,
    stats: PoolStats,
}

impl EffectPool {
    /// Empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a shell for `kind`.
    pub fn acquire(&mut self, kind: EffectKind) -> EffectShell {
        match self.free.get_mut(&kind).and_then(|list| list.pop()) {
            Some(shell) => {
                self.stats.reused += 1;
                shell
            }
            None => {
                self.stats.created += 1;
                EffectShell::fresh(kind)
            }
        }
    }

    /// Return a shell. Returns `false` when the kind's list was full and the
    /// shell was discarded.
    pub fn release(&mut self, mut shell: EffectShell) -> bool {
        shell.scrub();
        let list = self.free.entry(shell.kind).or_default();
        match list.push(shell) {
            Ok(()) => {
                self.stats.returned += 1;
                true
            }
            Err(_) => {
                self.stats.discarded += 1;
                false
            }
        }
    }

    /// Free shells held for `kind`.
    pub fn pooled(&self, kind: EffectKind) -> usize {
        self.free.get(&kind).map_or(0, |list| list.len())
    }

    /// Free shells held across every kind.
    pub fn total_pooled(&self) -> usize {
        self.free.values().map(|list| list.len()).sum()
    }

    /// Pool counters.
    pub fn stats(&self) -> PoolStats {
        self.stats
    }
}
