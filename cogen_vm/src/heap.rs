//! Heap accounting for objects created by running code.
//!
//! Values are reference counted, so nothing here frees memory. The heap keeps
//! a weak handle to every dictionary and holder allocated by bytecode or by
//! natives on its behalf, and a collection pass drops the handles whose
//! objects are gone. That gives callers the allocation and reclamation counts
//! a tracing collector would report.

use cogen_core::{Dictionary, ValueHolder};
use parking_lot::Mutex;
use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Weak;

/// Entries examined by one incremental collection step.
pub const STEP_BUDGET: usize = 64;

/// Tracked entries below which `track` never compacts.
pub const COMPACT_FLOOR: usize = 1024;

/// How much of the heap a collection pass examines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectMode {
    /// Examine every tracked object.
    Full,
    /// Examine at most [`STEP_BUDGET`] objects, resuming where the last step
    /// stopped.
    Step,
}

/// Snapshot of heap counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapStats {
    /// Objects tracked and not yet found dead by a collection.
    pub live: usize,
    /// Objects tracked since the heap was created.
    pub allocated: u64,
    /// Objects found dead by collections since the heap was created.
    pub reclaimed: u64,
}

struct Tracked {
    entries: Vec<Weak<dyn Any + Send + Sync>>,
    cursor: usize,
    /// `track` compacts once `entries` reaches this length.
    compact_at: usize,
}

impl Default for Tracked {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            cursor: 0,
            compact_at: COMPACT_FLOOR,
        }
    }
}

impl Tracked {
    /// Drop every dead entry and move the compaction threshold to twice the
    /// surviving length.
    fn compact(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.strong_count() > 0);
        self.cursor = 0;
        self.compact_at = (self.entries.len() * 2).max(COMPACT_FLOOR);
        before - self.entries.len()
    }
}

/// Allocation tracker shared by every context of an engine.
#[derive(Default)]
pub struct Heap {
    tracked: Mutex<Tracked>,
    allocated: AtomicU64,
    reclaimed: AtomicU64,
}

impl Heap {
    /// Create an empty heap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Track an allocation through a weak handle.
    ///
    /// Dead entries are pruned here too once the list doubles, so the list
    /// stays bounded by live objects even if nobody calls [`collect`](Self::collect).
    pub fn track(&self, object: Weak<dyn Any + Send + Sync>) {
        let pruned = {
            let mut tracked = self.tracked.lock();
            tracked.entries.push(object);
            if tracked.entries.len() >= tracked.compact_at {
                tracked.compact()
            } else {
                0
            }
        };
        self.allocated.fetch_add(1, Ordering::Relaxed);
        if pruned > 0 {
            self.reclaimed.fetch_add(pruned as u64, Ordering::Relaxed);
            tracing::trace!(pruned, "heap compacted on allocation");
        }
    }

    /// Track a dictionary created by running code.
    #[inline]
    pub fn track_dict(&self, dict: &Dictionary) {
        self.track(dict.downgrade());
    }

    /// Track a holder created by running code.
    #[inline]
    pub fn track_holder(&self, holder: &ValueHolder) {
        self.track(holder.downgrade());
    }

    /// Current counters.
    pub fn statistics(&self) -> HeapStats {
        HeapStats {
            live: self.tracked.lock().entries.len(),
            allocated: self.allocated.load(Ordering::Relaxed),
            reclaimed: self.reclaimed.load(Ordering::Relaxed),
        }
    }

    /// Drop handles to dead objects. Returns how many were reclaimed.
    pub fn collect(&self, mode: CollectMode) -> usize {
        let mut tracked = self.tracked.lock();
        let reclaimed = match mode {
            CollectMode::Full => tracked.compact(),
            CollectMode::Step => {
                let Tracked {
                    entries, cursor, ..
                } = &mut *tracked;
                if *cursor >= entries.len() {
                    *cursor = 0;
                }
                let mut reclaimed = 0;
                let mut examined = 0;
                while examined < STEP_BUDGET && *cursor < entries.len() {
                    examined += 1;
                    if entries[*cursor].strong_count() == 0 {
                        entries.swap_remove(*cursor);
                        reclaimed += 1;
                    } else {
                        *cursor += 1;
                    }
                }
                reclaimed
            }
        };
        drop(tracked);

        if reclaimed > 0 {
            self.reclaimed.fetch_add(reclaimed as u64, Ordering::Relaxed);
            tracing::trace!(reclaimed, ?mode, "heap collection");
        }
        reclaimed
    }
}

impl std::fmt::Debug for Heap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Heap")
            .field("stats", &self.statistics())
            .finish()
    }
}
