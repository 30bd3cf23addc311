//! The one recoverable failure: not getting memory for the slots.

use core::alloc::Layout;
use core::error::Error;
use core::fmt;

/// Returned by [`BoundedTicketQueue::new`](crate::BoundedTicketQueue::new)
/// when the slot array cannot be allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// The slot array for this capacity would exceed `isize::MAX` bytes.
    CapacityOverflow {
        /// The capacity that was requested.
        capacity: usize,
    },
    /// The global allocator returned null for a valid layout.
    Exhausted {
        /// The layout that was requested.
        layout: Layout,
    },
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocError::CapacityOverflow { capacity } => {
                write!(f, "queue capacity {capacity} overflows the slot array layout")
            }
            AllocError::Exhausted { layout } => write!(
                f,
                "failed to allocate {} bytes (align {}) for the slot array",
                layout.size(),
                layout.align()
            ),
        }
    }
}

impl Error for AllocError {}
