//! A single cell of the ring, and the turn arithmetic that governs it.
//!
//! A slot's `turn` counts how many times the slot has changed hands. An even
//! turn `2 * lap` means the slot is empty and waiting for the producer holding a
//! ticket on lap `lap`; the odd turn `2 * lap + 1` means it is full and waiting
//! for the consumer holding the matching ticket. Each hand-off is exactly one
//! release store of the next turn.

use core::mem::MaybeUninit;

use crate::platform::*;

// -----------------------------------------------------------------------------
// Turn arithmetic

/// The turn a slot must show before the producer holding `ticket` may write.
#[inline(always)]
pub const fn write_turn(ticket: usize, capacity: usize) -> usize {
    (ticket / capacity) * 2
}

/// The turn a slot must show before the consumer holding `ticket` may read.
#[inline(always)]
pub const fn read_turn(ticket: usize, capacity: usize) -> usize {
    (ticket / capacity) * 2 + 1
}

// -----------------------------------------------------------------------------
// Slot

/// One storage cell. The queue stores these as `CachePadded<Slot<T>>` so that
/// no two slots share a cache line.
pub struct Slot<T> {
    /// Whose turn it is to use this slot.
    turn: AtomicUsize,
    /// The value, initialized exactly when `turn` is odd.
    value: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Slot<T> {
    /// Creates an empty slot, ready for the first lap of writes.
    pub fn new() -> Slot<T> {
        Slot {
            turn: AtomicUsize::new(0),
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    /// Loads the turn with acquire ordering, synchronizing with the thread
    /// that last handed the slot over.
    #[inline(always)]
    pub fn turn(&self) -> usize {
        self.turn.load(Ordering::Acquire)
    }

    /// Writes a value and hands the slot to the consumer on the same lap.
    ///
    /// # Safety
    ///
    /// The caller must hold the producer ticket for `turn`, and must have
    /// observed `self.turn() == turn`. That makes it the only thread that may
    /// access the value until the turn advances.
    #[inline(always)]
    pub unsafe fn write(&self, turn: usize, value: T) {
        debug_assert_eq!(turn % 2, 0);
        // SAFETY: The caller owns the slot for this turn, and an even turn
        // means the previous value (if any) has already been moved out.
        self.value.with_mut(|ptr| unsafe {
            (*ptr).write(value);
        });
        self.turn.store(turn + 1, Ordering::Release);
    }

    /// Moves the value out and hands the slot to the producer on the next lap.
    ///
    /// # Safety
    ///
    /// The caller must hold the consumer ticket for `turn`, and must have
    /// observed `self.turn() == turn`.
    #[inline(always)]
    pub unsafe fn read(&self, turn: usize) -> T {
        debug_assert_eq!(turn % 2, 1);
        // SAFETY: The caller owns the slot for this turn. The odd turn was
        // published by `write` with release ordering after the value was
        // initialized, and the caller's acquire load of it makes that write
        // visible here.
        let value = self.value.with(|ptr| unsafe { (*ptr).assume_init_read() });
        self.turn.store(turn + 1, Ordering::Release);
        value
    }

    /// Drops the value in place if the slot currently holds one, and reports
    /// whether it did.
    ///
    /// Only used by the queue destructor, which has exclusive access.
    pub fn drop_value(&mut self) -> bool {
        if self.turn.load(Ordering::Relaxed) % 2 == 1 {
            // SAFETY: An odd turn means a producer wrote a value that no
            // consumer has read, and `&mut self` rules out any other thread.
            self.value.with_mut(|ptr| unsafe { (*ptr).assume_init_drop() });
            true
        } else {
            false
        }
    }
}

// -----------------------------------------------------------------------------
// Tests
