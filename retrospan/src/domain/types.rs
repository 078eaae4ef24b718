//! Domain types providing compile-time safety and self-documentation
//!
//! These newtype wrappers prevent common bugs like passing a raw nanosecond
//! count where a thread identifier is expected, and make function signatures
//! more expressive.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Thread identifier
///
/// Identifies the application thread a sampling session is attached to.
/// The value is opaque to the core; the interception layer supplies whatever
/// identifier its platform uses for threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThreadId(pub u64);

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Thread#{}", self.0)
    }
}

/// Timestamp in nanoseconds since the Unix epoch
///
/// Sample timestamps and span start/end times all use this representation so
/// they can be handed to a tracing backend without conversion loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Current wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX));
        Timestamp(nanos)
    }

    /// Elapsed time since an earlier timestamp (zero if `earlier` is later).
    #[must_use]
    pub fn elapsed_since(self, earlier: Timestamp) -> Duration {
        Duration::from_nanos(self.0.saturating_sub(earlier.0))
    }

    /// Convert to a [`SystemTime`] for backends that take wall-clock instants.
    #[must_use]
    pub fn as_system_time(self) -> SystemTime {
        UNIX_EPOCH + Duration::from_nanos(self.0)
    }

    /// Convert to seconds (f64)
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_seconds(self) -> f64 {
        self.0 as f64 / 1_000_000_000.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.as_seconds())
    }
}

/// Identity of one captured stack frame
///
/// A frame is identified by its declaring type and method name; the pair is
/// what the entry-frame scan compares against later captures. The qualified
/// form `DeclaringType.method` names the sampled interval nodes and the spans
/// synthesized from them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StackFrame {
    pub declaring_type: String,
    pub method: String,
}

impl StackFrame {
    pub fn new(declaring_type: impl Into<String>, method: impl Into<String>) -> Self {
        Self { declaring_type: declaring_type.into(), method: method.into() }
    }

    /// Qualified name used for node and span names.
    #[must_use]
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.declaring_type, self.method)
    }
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.declaring_type, self.method)
    }
}

/// Coarse execution state of a thread at sampling time
///
/// Mirrors the fixed enumeration exposed by the stack inspection collaborator.
/// Histogram attributes on synthesized spans use the upper-case names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThreadState {
    New,
    Runnable,
    Blocked,
    Waiting,
    TimedWaiting,
    Terminated,
}

impl ThreadState {
    /// All states, in the order histogram attributes are emitted.
    pub const ALL: [ThreadState; 6] = [
        ThreadState::New,
        ThreadState::Runnable,
        ThreadState::Blocked,
        ThreadState::Waiting,
        ThreadState::TimedWaiting,
        ThreadState::Terminated,
    ];

    /// Attribute-key spelling of the state.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ThreadState::New => "NEW",
            ThreadState::Runnable => "RUNNABLE",
            ThreadState::Blocked => "BLOCKED",
            ThreadState::Waiting => "WAITING",
            ThreadState::TimedWaiting => "TIMED_WAITING",
            ThreadState::Terminated => "TERMINATED",
        }
    }
}

impl fmt::Display for ThreadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One stack capture of a live thread
///
/// `frames[0]` is the innermost frame. Sources that observe stacks
/// outermost-first must reverse before constructing a snapshot.
#[derive(Debug, Clone)]
pub struct ThreadSnapshot {
    pub frames: Vec<StackFrame>,
    pub state: ThreadState,
}

impl ThreadSnapshot {
    #[must_use]
    pub fn new(frames: Vec<StackFrame>, state: ThreadState) -> Self {
        Self { frames, state }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_id_display() {
        assert_eq!(ThreadId(7).to_string(), "Thread#7");
    }

    #[test]
    fn test_qualified_frame_name() {
        let frame = StackFrame::new("billing.Invoice", "total");
        assert_eq!(frame.qualified(), "billing.Invoice.total");
        assert_eq!(frame.to_string(), "billing.Invoice.total");
    }

    #[test]
    fn test_frame_identity_is_type_and_method() {
        let a = StackFrame::new("X", "run");
        let b = StackFrame::new("X", "run");
        let c = StackFrame::new("X", "other");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_timestamp_elapsed_since() {
        let earlier = Timestamp(1_000_000);
        let later = Timestamp(6_000_000);
        assert_eq!(later.elapsed_since(earlier), Duration::from_millis(5));
        // Saturates rather than underflowing when samples race the clock.
        assert_eq!(earlier.elapsed_since(later), Duration::ZERO);
    }

    #[test]
    fn test_timestamp_system_time_round_trip() {
        let ts = Timestamp(1_500_000_000);
        let diff = ts.as_system_time().duration_since(UNIX_EPOCH).unwrap();
        assert_eq!(diff, Duration::from_nanos(1_500_000_000));
    }

    #[test]
    fn test_state_attribute_spelling() {
        assert_eq!(ThreadState::TimedWaiting.as_str(), "TIMED_WAITING");
        assert_eq!(ThreadState::Runnable.to_string(), "RUNNABLE");
        assert_eq!(ThreadState::ALL.len(), 6);
    }
}
