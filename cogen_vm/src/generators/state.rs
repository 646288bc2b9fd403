//! Generator state management.
//!
//! `GeneratorHeader` packs the lifecycle state and the number of completed
//! yields into a single atomic u32, so state checks from any thread are one
//! load.
//!
//! # Encoding
//!
//! ```text
//! Bits 0-1:  State (Created=0, Running=1, Suspended=2, Completed=3)
//! Bits 2-31: Yield count (saturates at 2^30 - 1)
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

// ============================================================================
// Generator State
// ============================================================================

/// Generator lifecycle state.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GeneratorState {
    /// Constructed; the body has not run yet.
    #[default]
    Created = 0,
    /// A step is executing the body.
    Running = 1,
    /// Stopped at a yield.
    Suspended = 2,
    /// The body returned, faulted, or was aborted. Terminal.
    Completed = 3,
}

impl GeneratorState {
    /// Number of bits used to encode state.
    pub const BITS: u32 = 2;

    /// Mask for extracting state from header.
    pub const MASK: u32 = (1 << Self::BITS) - 1;

    /// Creates state from raw 2-bit value.
    #[inline(always)]
    pub const fn from_bits(bits: u32) -> Self {
        match bits & Self::MASK {
            0 => Self::Created,
            1 => Self::Running,
            2 => Self::Suspended,
            _ => Self::Completed,
        }
    }

    /// Returns true if a step may run the body.
    #[inline(always)]
    pub const fn is_resumable(self) -> bool {
        matches!(self, Self::Created | Self::Suspended)
    }

    /// Returns true once the generator can produce no more values.
    #[inline(always)]
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Lowercase state name.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Suspended => "suspended",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for GeneratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Generator Header
// ============================================================================

/// Atomic header combining state and yield count.
///
/// ```text
/// +------------------+-------+
/// | Yield Count (30) | State |
/// |                  | (2)   |
/// +------------------+-------+
/// MSB                      LSB
/// ```
#[repr(transparent)]
pub struct GeneratorHeader {
    bits: AtomicU32,
}

impl GeneratorHeader {
    /// Largest representable yield count.
    pub const MAX_YIELDS: u32 = (1 << 30) - 1;

    const COUNT_SHIFT: u32 = GeneratorState::BITS;

    /// Creates a header in Created state with no yields.
    #[inline]
    pub fn new() -> Self {
        Self {
            bits: AtomicU32::new(GeneratorState::Created as u32),
        }
    }

    #[inline]
    const fn pack(state: GeneratorState, yields: u32) -> u32 {
        (yields << Self::COUNT_SHIFT) | (state as u32)
    }

    /// Current state.
    #[inline(always)]
    pub fn state(&self) -> GeneratorState {
        GeneratorState::from_bits(self.bits.load(Ordering::Acquire))
    }

    /// Yields completed so far.
    #[inline(always)]
    pub fn yields(&self) -> u32 {
        self.bits.load(Ordering::Acquire) >> Self::COUNT_SHIFT
    }

    /// Transition to Running if currently resumable.
    ///
    /// Returns the previous state on success, None if the generator is
    /// already running or completed.
    pub fn try_start(&self) -> Option<GeneratorState> {
        let mut current = self.bits.load(Ordering::Acquire);
        loop {
            let state = GeneratorState::from_bits(current);
            if !state.is_resumable() {
                return None;
            }
            let next = (current & !GeneratorState::MASK) | (GeneratorState::Running as u32);
            match self.bits.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Some(state),
                Err(actual) => current = actual,
            }
        }
    }

    /// Running -> Suspended, counting one more yield.
    #[inline]
    pub fn suspend(&self) {
        debug_assert_eq!(self.state(), GeneratorState::Running);
        let yields = (self.yields() + 1).min(Self::MAX_YIELDS);
        self.bits
            .store(Self::pack(GeneratorState::Suspended, yields), Ordering::Release);
    }

    /// Move to Completed, keeping the yield count.
    #[inline]
    pub fn complete(&self) {
        let yields = self.yields();
        self.bits
            .store(Self::pack(GeneratorState::Completed, yields), Ordering::Release);
    }

    /// Returns true while a step is executing.
    #[inline(always)]
    pub fn is_running(&self) -> bool {
        self.state() == GeneratorState::Running
    }

    /// Returns true once completed.
    #[inline(always)]
    pub fn is_completed(&self) -> bool {
        self.state().is_finished()
    }
}

impl Default for GeneratorHeader {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for GeneratorHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorHeader")
            .field("state", &self.state())
            .field("yields", &self.yields())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ════════════════════════════════════════════════════════════════════════
    // GeneratorState Tests
    // ════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_state_size() {
        assert_eq!(std::mem::size_of::<GeneratorState>(), 1);
    }

    #[test]
    fn test_state_from_bits_masks() {
        assert_eq!(GeneratorState::from_bits(0b100), GeneratorState::Created);
        assert_eq!(GeneratorState::from_bits(0b101), GeneratorState::Running);
        assert_eq!(
            GeneratorState::from_bits(0xFFFF_FF02),
            GeneratorState::Suspended
        );
        assert_eq!(GeneratorState::from_bits(3), GeneratorState::Completed);
    }

    #[test]
    fn test_state_predicates() {
        assert!(GeneratorState::Created.is_resumable());
        assert!(!GeneratorState::Running.is_resumable());
        assert!(GeneratorState::Suspended.is_resumable());
        assert!(!GeneratorState::Completed.is_resumable());
        assert!(GeneratorState::Completed.is_finished());
        assert!(!GeneratorState::Suspended.is_finished());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(GeneratorState::Created.to_string(), "created");
        assert_eq!(GeneratorState::Completed.to_string(), "completed");
        assert_eq!(GeneratorState::default(), GeneratorState::Created);
    }

    // ════════════════════════════════════════════════════════════════════════
    // GeneratorHeader Tests
    // ════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_header_size() {
        assert_eq!(std::mem::size_of::<GeneratorHeader>(), 4);
    }

    #[test]
    fn test_header_new() {
        let header = GeneratorHeader::new();
        assert_eq!(header.state(), GeneratorState::Created);
        assert_eq!(header.yields(), 0);
    }

    #[test]
    fn test_try_start_running_fails() {
        let header = GeneratorHeader::new();
        assert_eq!(header.try_start(), Some(GeneratorState::Created));
        assert!(header.is_running());
        assert_eq!(header.try_start(), None);
    }

    #[test]
    fn test_complete_preserves_yields() {
        let header = GeneratorHeader::new();
        header.try_start();
        header.suspend();
        header.try_start();
        header.complete();
        assert!(header.is_completed());
        assert_eq!(header.yields(), 1);
        assert_eq!(header.try_start(), None);
    }

    #[test]
    fn test_debug() {
        let header = GeneratorHeader::new();
        header.try_start();
        let debug = format!("{:?}", header);
        assert!(debug.contains("Running"));
    }

    // ════════════════════════════════════════════════════════════════════════
    // State Machine Transition Tests
    // ════════════════════════════════════════════════════════════════════════

    #[test]
    fn test_full_lifecycle() {
        let header = GeneratorHeader::new();

        // Created -> Running (first step)
        assert!(header.try_start().is_some());

        // Running -> Suspended (yield)
        header.suspend();
        assert_eq!(header.state(), GeneratorState::Suspended);
        assert_eq!(header.yields(), 1);

        // Suspended -> Running -> Suspended
        assert_eq!(header.try_start(), Some(GeneratorState::Suspended));
        header.suspend();
        assert_eq!(header.yields(), 2);

        // Suspended -> Running -> Completed (return)
        assert!(header.try_start().is_some());
        header.complete();
        assert_eq!(header.state(), GeneratorState::Completed);

        // Completed cannot restart
        assert!(header.try_start().is_none());
    }

    #[test]
    fn test_complete_from_created() {
        let header = GeneratorHeader::new();
        header.complete();
        assert!(header.is_completed());
        assert!(header.try_start().is_none());
    }
}
