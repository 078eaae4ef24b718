//! Stack source: the boundary to platform stack inspection.
//!
//! The sampling tick asks a [`StackSource`] for the target thread's current
//! stack and coarse execution state. The source reads live state of a thread
//! other than the calling one, so it must tolerate the target exiting or
//! changing state at any instant; it signals that by returning `None`, which
//! the tick treats as a skipped sample.

use crate::domain::{ThreadId, ThreadSnapshot};

pub trait StackSource {
    /// Capture the thread's stack (innermost frame first) and execution
    /// state, or `None` if the thread cannot currently be inspected.
    fn capture(&self, thread: ThreadId) -> Option<ThreadSnapshot>;
}
