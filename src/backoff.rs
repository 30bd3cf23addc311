//! Backoff for the blocking queue operations.

use core::hint;

use crate::platform::yield_now;

/// Past this step the backoff stops spinning and starts yielding.
const SPIN_LIMIT: u32 = 6;

/// Past this step the backoff stops growing.
const YIELD_LIMIT: u32 = 10;

/// Exponential backoff for a thread waiting on a slot's turn.
///
/// Early snoozes issue `1 << step` spin-loop hints. Once the step passes
/// [`SPIN_LIMIT`] the thread yields to the scheduler instead, so a waiter on a
/// full or empty queue does not starve the thread it is waiting for.
pub struct Backoff {
    step: u32,
}

impl Backoff {
    /// Creates a new backoff in its initial, shortest state.
    #[inline(always)]
    pub const fn new() -> Backoff {
        Backoff { step: 0 }
    }

    /// Waits a little longer than last time.
    #[inline]
    pub fn snooze(&mut self) {
        // Model checkers need every iteration of a wait loop to yield.
        if cfg!(any(loom, feature = "shuttle")) || self.step > SPIN_LIMIT {
            yield_now();
        } else {
            for _ in 0..1u32 << self.step {
                hint::spin_loop();
            }
        }

        if self.step <= YIELD_LIMIT {
            self.step += 1;
        }
    }

    /// Returns true once the backoff has moved on from spinning to yielding.
    #[inline]
    pub fn is_yielding(&self) -> bool {
        self.step > SPIN_LIMIT
    }
}

// -----------------------------------------------------------------------------
// Tests
