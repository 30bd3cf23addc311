//! This module contains the bounded ticket queue itself.

use alloc::alloc::alloc;
use alloc::alloc::dealloc;
use alloc::alloc::handle_alloc_error;
use core::alloc::Layout;
use core::fmt;
use core::marker::PhantomData;
use core::mem::align_of;
use core::mem::size_of;
use core::ptr;
use core::ptr::NonNull;

use tracing::debug;
use tracing::trace;

use crate::backoff::Backoff;
use crate::cache::CACHE_LINE_SIZE;
use crate::cache::CachePadded;
use crate::error::AllocError;
use crate::platform::*;
use crate::slot::Slot;
use crate::slot::read_turn;
use crate::slot::write_turn;

// -----------------------------------------------------------------------------
// Queue

/// A fixed-capacity multi-producer multi-consumer FIFO queue.
///
/// Values come out in the order their pushes drew tickets, no matter how many
/// threads push and pop concurrently. No value is ever delivered twice or
/// lost.
///
/// # Layout
///
/// The queue owns one allocation of `capacity + 1` cache-line aligned slots.
/// Only the first `capacity` are ever indexed; the last one keeps the final
/// usable slot off whatever cache line follows the array. The `head` and
/// `tail` cursors each sit on their own cache line.
///
/// # Element types
///
/// Values are moved into and out of a slot with plain stores and loads while
/// the operation owns that slot. Large element types make that window longer;
/// boxing them keeps it to a pointer copy. An element type may not be aligned
/// more strictly than [`CACHE_LINE_SIZE`].
pub struct BoundedTicketQueue<T> {
    /// The next ticket to hand to a producer.
    head: CachePadded<AtomicUsize>,
    /// The next ticket to hand to a consumer.
    tail: CachePadded<AtomicUsize>,
    /// Points to `capacity + 1` initialized slots.
    slots: NonNull<CachePadded<Slot<T>>>,
    /// The number of usable slots.
    capacity: usize,
    _marker: PhantomData<T>,
}

// SAFETY: The queue owns its values, so sending it sends them.
unsafe impl<T: Send> Send for BoundedTicketQueue<T> {}

// SAFETY: Shared access only ever moves values between threads, never shares
// them, and each slot is accessed by one thread at a time under the turn
// protocol. So `T: Send` is enough.
unsafe impl<T: Send> Sync for BoundedTicketQueue<T> {}

impl<T> BoundedTicketQueue<T> {
    /// Creates a queue that holds at most `capacity` values.
    ///
    /// Returns an error if the slot array cannot be allocated.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero, or if `T` is aligned more strictly than
    /// [`CACHE_LINE_SIZE`].
    pub fn new(capacity: usize) -> Result<BoundedTicketQueue<T>, AllocError> {
        assert!(capacity >= 1, "queue capacity must be at least one");
        assert!(
            align_of::<T>() <= CACHE_LINE_SIZE,
            "element alignment {} exceeds the cache line size {}",
            align_of::<T>(),
            CACHE_LINE_SIZE
        );

        let slot_count = capacity
            .checked_add(1)
            .ok_or(AllocError::CapacityOverflow { capacity })?;
        let layout = Layout::array::<CachePadded<Slot<T>>>(slot_count)
            .map_err(|_| AllocError::CapacityOverflow { capacity })?;

        debug!(
            capacity,
            slot_size = size_of::<CachePadded<Slot<T>>>(),
            bytes = layout.size(),
            "allocating ticket queue"
        );

        // SAFETY: The layout has a non-zero size, since a padded slot is at
        // least one cache line and there is at least one slot.
        let raw = unsafe { alloc(layout) }.cast::<CachePadded<Slot<T>>>();
        let Some(slots) = NonNull::new(raw) else {
            return Err(AllocError::Exhausted { layout });
        };

        for index in 0..slot_count {
            // SAFETY: `index` is within the allocation, which is suitably
            // aligned for the slot type and not yet initialized.
            unsafe { slots.add(index).write(CachePadded::new(Slot::new())) };
        }

        Ok(BoundedTicketQueue {
            head: CachePadded::new(AtomicUsize::new(0)),
            tail: CachePadded::new(AtomicUsize::new(0)),
            slots,
            capacity,
            _marker: PhantomData,
        })
    }

    /// Creates a queue that holds at most `capacity` values, treating
    /// allocation failure as fatal like the standard collections do.
    ///
    /// # Panics
    ///
    /// Panics under the same conditions as [`BoundedTicketQueue::new`], and if
    /// the slot array would overflow `isize::MAX` bytes.
    pub fn with_capacity(capacity: usize) -> BoundedTicketQueue<T> {
        match BoundedTicketQueue::new(capacity) {
            Ok(queue) => queue,
            Err(AllocError::Exhausted { layout }) => handle_alloc_error(layout),
            Err(err) => panic!("{err}"),
        }
    }

    /// Returns the maximum number of values the queue can hold.
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns an estimate of the number of values in the queue.
    ///
    /// The two cursors are read independently and without synchronization, so
    /// under concurrent use this is a snapshot that may already be stale. A
    /// consumer that has drawn a ticket for a value not yet pushed can make
    /// `tail` overtake `head`; that reads as zero.
    #[inline]
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Relaxed);
        head.saturating_sub(tail)
    }

    /// Returns true if [`len`](Self::len) is zero.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pushes a value, waiting for room if the queue is full.
    ///
    /// This never returns if the queue stays full.
    pub fn push(&self, value: T) {
        let ticket = self.head.fetch_add(1, Ordering::Relaxed);
        let slot = self.slot(ticket);
        let turn = write_turn(ticket, self.capacity);
        wait_for_turn(slot, turn);
        // SAFETY: We hold the only producer ticket for this slot and lap, and
        // the slot has reached our turn.
        unsafe { slot.write(turn, value) };
    }

    /// Pushes a value if the queue has room for it, or hands it back.
    ///
    /// This does not wait on a full queue. It only retries when it loses a race
    /// with another producer for a slot that was ready.
    pub fn try_push(&self, value: T) -> Result<(), T> {
        let mut ticket = self.head.load(Ordering::Acquire);
        loop {
            let slot = self.slot(ticket);
            let turn = write_turn(ticket, self.capacity);
            if slot.turn() == turn {
                match self.head.compare_exchange(
                    ticket,
                    ticket + 1,
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        // SAFETY: The exchange gave us the only producer ticket
                        // for this slot and lap, and we saw its turn arrive.
                        unsafe { slot.write(turn, value) };
                        return Ok(());
                    }
                    Err(current) => ticket = current,
                }
            } else {
                let previous = ticket;
                ticket = self.head.load(Ordering::Acquire);
                if ticket == previous {
                    return Err(value);
                }
            }
        }
    }

    /// Pops a value, waiting for one if the queue is empty.
    ///
    /// This never returns if the queue stays empty.
    pub fn pop(&self) -> T {
        let ticket = self.tail.fetch_add(1, Ordering::Relaxed);
        let slot = self.slot(ticket);
        let turn = read_turn(ticket, self.capacity);
        wait_for_turn(slot, turn);
        // SAFETY: We hold the only consumer ticket for this slot and lap, and
        // the slot has reached our turn.
        unsafe { slot.read(turn) }
    }

    /// Pops a value if one is ready.
    ///
    /// This does not wait on an empty queue. It only retries when it loses a
    /// race with another consumer for a slot that was ready.
    pub fn try_pop(&self) -> Option<T> {
        let mut ticket = self.tail.load(Ordering::Acquire);
        loop {
            let slot = self.slot(ticket);
            let turn = read_turn(ticket, self.capacity);
            if slot.turn() == turn {
                match self.tail.compare_exchange(
                    ticket,
                    ticket + 1,
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        // SAFETY: The exchange gave us the only consumer ticket
                        // for this slot and lap, and we saw its turn arrive.
                        return Some(unsafe { slot.read(turn) });
                    }
                    Err(current) => ticket = current,
                }
            } else {
                let previous = ticket;
                ticket = self.tail.load(Ordering::Acquire);
                if ticket == previous {
                    return None;
                }
            }
        }
    }

    /// Returns the slot a ticket maps to.
    #[inline(always)]
    fn slot(&self, ticket: usize) -> &Slot<T> {
        let index = ticket % self.capacity;
        // SAFETY: `index < capacity`, and the first `capacity + 1` slots were
        // initialized in `new` and live until `drop`.
        unsafe { self.slots.add(index).as_ref() }
    }
}

/// Waits until a slot's turn reaches `turn`.
#[inline(always)]
fn wait_for_turn<T>(slot: &Slot<T>, turn: usize) {
    if slot.turn() == turn {
        return;
    }
    wait_for_turn_cold(slot, turn);
}

#[cold]
fn wait_for_turn_cold<T>(slot: &Slot<T>, turn: usize) {
    let mut backoff = Backoff::new();
    let mut announced = false;
    while slot.turn() != turn {
        if !announced && backoff.is_yielding() {
            trace!(turn, "slot still not ready, yielding");
            announced = true;
        }
        backoff.snooze();
    }
}

impl<T> Drop for BoundedTicketQueue<T> {
    fn drop(&mut self) {
        let slot_count = self.capacity + 1;
        let mut dropped = 0usize;

        for index in 0..slot_count {
            // SAFETY: `&mut self` means no other thread is mid-operation, and
            // every slot was initialized in `new`.
            let slot = unsafe { self.slots.add(index).as_mut() };
            if slot.drop_value() {
                dropped += 1;
            }
            // SAFETY: The slot is initialized and is never touched again.
            unsafe { ptr::drop_in_place(slot) };
        }

        if dropped != 0 {
            debug!(dropped, "dropping values left in ticket queue");
        }

        // This was checked to succeed in `new`.
        if let Ok(layout) = Layout::array::<CachePadded<Slot<T>>>(slot_count) {
            // SAFETY: The slots were allocated in `new` with this same layout.
            unsafe { dealloc(self.slots.as_ptr().cast::<u8>(), layout) };
        }
    }
}

impl<T> fmt::Debug for BoundedTicketQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedTicketQueue")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(all(test, not(loom), not(feature = "shuttle")))]
mod tests {
    use alloc::format;
    use alloc::rc::Rc;
    use alloc::string::String;
    use alloc::string::ToString;
    use alloc::vec::Vec;

    use super::*;

    #[test]
    fn starts_empty() {
        let queue = BoundedTicketQueue::<u32>::new(8).unwrap();
        assert_eq!(queue.capacity(), 8);
        assert_eq!(queue.len(), 0);
        assert!(queue.is_empty());
        assert_eq!(queue.try_pop(), None);
    }

    #[test]
    fn wraps_around_many_laps() {
        let queue = BoundedTicketQueue::new(3).unwrap();
        for i in 0..100 {
            queue.push(i);
            queue.push(i + 1000);
            assert_eq!(queue.len(), 2);
            assert_eq!(queue.pop(), i);
            assert_eq!(queue.pop(), i + 1000);
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn capacity_one() {
        let queue = BoundedTicketQueue::new(1).unwrap();
        assert_eq!(queue.try_push('a'), Ok(()));
        assert_eq!(queue.try_push('b'), Err('b'));
        assert_eq!(queue.try_pop(), Some('a'));
        assert_eq!(queue.try_pop(), None);
        assert_eq!(queue.try_push('c'), Ok(()));
        assert_eq!(queue.pop(), 'c');
    }

    #[test]
    fn try_push_hands_value_back_when_full() {
        let queue = BoundedTicketQueue::new(2).unwrap();
        queue.push(String::from("one"));
        queue.push(String::from("two"));
        let rejected = queue.try_push(String::from("three")).unwrap_err();
        assert_eq!(rejected, "three");
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn len_is_clamped_when_consumers_run_ahead() {
        let queue = BoundedTicketQueue::<u8>::new(4).unwrap();
        // Simulates a consumer that has drawn a ticket and is waiting.
        queue.tail.fetch_add(1, Ordering::Relaxed);
        assert_eq!(queue.len(), 0);
        assert!(queue.is_empty());
    }

    #[test]
    fn drop_releases_undelivered_values() {
        let tracker = Rc::new(());
        {
            let queue = BoundedTicketQueue::new(4).unwrap();
            for _ in 0..3 {
                queue.push(tracker.clone());
            }
            drop(queue.pop());
            assert_eq!(Rc::strong_count(&tracker), 3);
        }
        assert_eq!(Rc::strong_count(&tracker), 1);
    }

    #[test]
    fn drop_after_full_laps() {
        let tracker = Rc::new(());
        {
            let queue = BoundedTicketQueue::new(2).unwrap();
            for _ in 0..5 {
                queue.push(tracker.clone());
                queue.pop();
            }
            queue.push(tracker.clone());
            queue.push(tracker.clone());
            assert_eq!(Rc::strong_count(&tracker), 3);
        }
        assert_eq!(Rc::strong_count(&tracker), 1);
    }

    #[test]
    fn capacity_overflow_is_an_error() {
        let err = BoundedTicketQueue::<u8>::new(usize::MAX).unwrap_err();
        assert_eq!(
            err,
            AllocError::CapacityOverflow {
                capacity: usize::MAX
            }
        );
        assert!(err.to_string().contains("overflows"));

        let err = BoundedTicketQueue::<u8>::new(usize::MAX / CACHE_LINE_SIZE).unwrap_err();
        assert!(matches!(err, AllocError::CapacityOverflow { .. }));
    }

    #[test]
    #[should_panic(expected = "at least one")]
    fn zero_capacity_panics() {
        let _ = BoundedTicketQueue::<u8>::new(0);
    }

    #[test]
    fn debug_reports_capacity_and_len() {
        let queue = BoundedTicketQueue::with_capacity(4);
        queue.push(1u8);
        let debug = format!("{queue:?}");
        assert!(debug.contains("capacity: 4"));
        assert!(debug.contains("len: 1"));
    }

    #[test]
    fn boxed_values_round_trip() {
        let queue = BoundedTicketQueue::new(4).unwrap();
        let values: Vec<_> = (0..4).map(|i| alloc::boxed::Box::new([i; 64])).collect();
        for value in values.iter().cloned() {
            queue.push(value);
        }
        for value in values {
            assert_eq!(queue.pop(), value);
        }
    }
}
