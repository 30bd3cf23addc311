//! A bounded multi-producer multi-consumer queue built on ticket sequencing.
//!
//! [`BoundedTicketQueue`] is a fixed-capacity FIFO that any number of threads
//! may push to and pop from at the same time, without a lock. Each operation
//! draws a *ticket* from one of two shared counters (`head` for producers,
//! `tail` for consumers). The ticket names both the slot the operation will
//! use and the *turn* on that slot it must wait for. Every slot carries its own
//! turn counter, which alternates between "ready to write" (even) and "ready to
//! read" (odd) as the ring laps around.
//!
//! Handing out tickets needs only a relaxed `fetch_add`; the acquire/release
//! handshake that publishes the data happens on the slot's turn counter. This
//! keeps the two cursors almost contention free and means at most one thread
//! ever touches a given slot's value at a time.
//!
//! ```
//! # #![cfg(not(loom))]
//! use ticket_queue::BoundedTicketQueue;
//!
//! let queue = BoundedTicketQueue::new(4).unwrap();
//!
//! std::thread::scope(|s| {
//!     s.spawn(|| {
//!         for i in 0..16 {
//!             queue.push(i);
//!         }
//!     });
//!     for i in 0..16 {
//!         assert_eq!(queue.pop(), i);
//!     }
//! });
//!
//! assert!(queue.is_empty());
//! assert_eq!(queue.try_pop(), None);
//! ```
//!
//! # Blocking
//!
//! [`push`](BoundedTicketQueue::push) and [`pop`](BoundedTicketQueue::pop)
//! never fail. They spin (with backoff) until their slot is ready, which means
//! a push to a queue that stays full, or a pop from a queue that stays empty,
//! never returns. Use [`try_push`](BoundedTicketQueue::try_push) and
//! [`try_pop`](BoundedTicketQueue::try_pop) when the caller needs to give up.

#![no_std]

// -----------------------------------------------------------------------------
// Boilerplate for building without the standard library

extern crate alloc;
extern crate std;

// -----------------------------------------------------------------------------
// Modules

mod backoff;
mod cache;
mod compile_fail;
mod error;
mod queue;
mod slot;

// -----------------------------------------------------------------------------
// Top-level exports

pub use cache::CACHE_LINE_SIZE;
pub use cache::CachePadded;
pub use error::AllocError;
pub use queue::BoundedTicketQueue;

// -----------------------------------------------------------------------------
// Platform Support

// This crate is tested with both `loom` and `shuttle`, which each require
// mocking the atomic primitives and `UnsafeCell`.
//
// To make things a bit simpler, we re-export all the important types in the
// `platform` module.

#[cfg(not(any(loom, feature = "shuttle")))]
mod platform {

    // Core exports

    pub use core::sync::atomic::AtomicUsize;
    pub use core::sync::atomic::Ordering;
    pub use std::thread::yield_now;

    /// An `UnsafeCell` with the closure-based access api used by `loom`.
    #[derive(Debug)]
    pub struct UnsafeCell<T>(core::cell::UnsafeCell<T>);

    impl<T> UnsafeCell<T> {
        #[inline(always)]
        pub const fn new(data: T) -> UnsafeCell<T> {
            UnsafeCell(core::cell::UnsafeCell::new(data))
        }

        #[inline(always)]
        pub fn with<R>(&self, f: impl FnOnce(*const T) -> R) -> R {
            f(self.0.get())
        }

        #[inline(always)]
        pub fn with_mut<R>(&self, f: impl FnOnce(*mut T) -> R) -> R {
            f(self.0.get())
        }
    }
}

#[cfg(loom)]
mod platform {

    // Loom exports

    pub use loom::cell::UnsafeCell;
    pub use loom::sync::atomic::AtomicUsize;
    pub use loom::sync::atomic::Ordering;
    pub use loom::thread::yield_now;
}

#[cfg(all(feature = "shuttle", not(loom)))]
mod platform {

    // Shuttle exports

    pub use shuttle::sync::atomic::AtomicUsize;
    pub use shuttle::sync::atomic::Ordering;
    pub use shuttle::thread::yield_now;

    /// Shuttle does not model `UnsafeCell`, so this mirrors the plain wrapper.
    #[derive(Debug)]
    pub struct UnsafeCell<T>(core::cell::UnsafeCell<T>);

    impl<T> UnsafeCell<T> {
        #[inline(always)]
        pub const fn new(data: T) -> UnsafeCell<T> {
            UnsafeCell(core::cell::UnsafeCell::new(data))
        }

        #[inline(always)]
        pub fn with<R>(&self, f: impl FnOnce(*const T) -> R) -> R {
            f(self.0.get())
        }

        #[inline(always)]
        pub fn with_mut<R>(&self, f: impl FnOnce(*mut T) -> R) -> R {
            f(self.0.get())
        }
    }
}
