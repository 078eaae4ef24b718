//! Process-wide session registry.
//!
//! Maps each instrumented thread to a LIFO stack of sampling sessions —
//! reentrant instrumented calls on one thread stack their sessions — plus the
//! handle of the thread's currently scheduled tick task. Both maps live
//! behind one mutex; `start` and `stop` race freely from arbitrary
//! application threads without corrupting them.
//!
//! Lock order is registry mutex, then session mutex. The tick path takes
//! only the session mutex, so flushing under the registry lock cannot
//! deadlock against the dispatcher.

use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::config::SamplerConfig;
use crate::domain::{SamplerError, StackFrame, ThreadId};
use crate::scheduler::{TaskHandle, TickScheduler};
use crate::session::SamplingSession;
use crate::sink::SpanSink;
use crate::stack_source::StackSource;

struct RegistryInner<S: SpanSink> {
    sessions: HashMap<ThreadId, Vec<Arc<SamplingSession<S>>>>,
    tasks: HashMap<ThreadId, TaskHandle>,
}

/// Entry point for the interception layer: one instance per process,
/// constructed explicitly and passed by reference to interception sites.
pub struct SessionRegistry<S: SpanSink, T: StackSource> {
    sink: S,
    stacks: Arc<T>,
    config: Arc<SamplerConfig>,
    scheduler: TickScheduler,
    inner: Mutex<RegistryInner<S>>,
}

impl<S, T> SessionRegistry<S, T>
where
    S: SpanSink + Send + Sync + 'static,
    T: StackSource + Send + Sync + 'static,
{
    #[must_use]
    pub fn new(sink: S, stacks: T, config: SamplerConfig) -> Self {
        Self {
            sink,
            stacks: Arc::new(stacks),
            config: Arc::new(config),
            scheduler: TickScheduler::new(),
            inner: Mutex::new(RegistryInner { sessions: HashMap::new(), tasks: HashMap::new() }),
        }
    }

    /// Begin sampling `thread` for an instrumented call entered at `entry`,
    /// parenting everything synthesized later under `parent`.
    ///
    /// If the thread already has an active session, that session is
    /// suspended first: its tick is cancelled and its tree flushed, since
    /// the interval from here on belongs to the nested call's own spans.
    pub fn start(
        &self,
        thread: ThreadId,
        parent: S::Span,
        entry: StackFrame,
    ) -> Result<(), SamplerError> {
        let mut guard = self.inner.lock().map_err(|_| SamplerError::RegistryPoisoned)?;
        let inner = &mut *guard;
        if let Some(task) = inner.tasks.remove(&thread) {
            task.cancel();
        }
        if let Some(active) = inner.sessions.get(&thread).and_then(|stack| stack.last()) {
            debug!("{thread}: suspending session at {} for a nested call", active.entry());
            active.flush(&self.sink);
        }
        let session =
            Arc::new(SamplingSession::new(thread, entry, parent, Arc::clone(&self.config)));
        inner.sessions.entry(thread).or_default().push(Arc::clone(&session));
        let handle = self.schedule_ticks(&session)?;
        inner.tasks.insert(thread, handle);
        Ok(())
    }

    /// Finish the topmost session for `thread`: cancel its tick, flush its
    /// tree into spans, pop it. An outer session left underneath is
    /// restarted with a fresh tree and rescheduled. Stopping a thread with
    /// no active session is a no-op.
    pub fn stop(&self, thread: ThreadId) -> Result<(), SamplerError> {
        let mut guard = self.inner.lock().map_err(|_| SamplerError::RegistryPoisoned)?;
        let inner = &mut *guard;
        if let Some(task) = inner.tasks.remove(&thread) {
            task.cancel();
        }
        let (finished, resumed) = match inner.sessions.get_mut(&thread) {
            None => return Ok(()),
            Some(stack) => (stack.pop(), stack.last().cloned()),
        };
        let Some(finished) = finished else {
            inner.sessions.remove(&thread);
            return Ok(());
        };
        finished.flush(&self.sink);
        match resumed {
            Some(outer) => {
                debug!("{thread}: resuming session at {}", outer.entry());
                outer.restart();
                let handle = self.schedule_ticks(&outer)?;
                inner.tasks.insert(thread, handle);
            }
            None => {
                inner.sessions.remove(&thread);
            }
        }
        Ok(())
    }

    /// Number of stacked sessions currently tracked for `thread`.
    #[must_use]
    pub fn active_depth(&self, thread: ThreadId) -> usize {
        self.inner
            .lock()
            .map(|inner| inner.sessions.get(&thread).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    fn schedule_ticks(
        &self,
        session: &Arc<SamplingSession<S>>,
    ) -> Result<TaskHandle, SamplerError> {
        let session = Arc::clone(session);
        let stacks = Arc::clone(&self.stacks);
        self.scheduler.schedule_repeating(
            self.config.initial_delay,
            self.config.tick_interval,
            move || session.tick(stacks.as_ref()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SinkError, ThreadSnapshot, ThreadState, Timestamp};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct CountingSink {
        flushed_roots: AtomicU64,
    }

    impl SpanSink for CountingSink {
        type Span = u64;

        fn start_span(&self, _name: &str, parent: &u64, _start: Timestamp) -> Result<u64, SinkError> {
            self.flushed_roots.fetch_add(1, Ordering::SeqCst);
            Ok(parent + 1)
        }

        fn set_attribute(&self, _span: &u64, _key: &str, _value: &str) -> Result<(), SinkError> {
            Ok(())
        }

        fn end_span(&self, _span: &u64, _end: Timestamp) -> Result<(), SinkError> {
            Ok(())
        }
    }

    struct EmptyStacks;

    impl StackSource for EmptyStacks {
        fn capture(&self, _thread: ThreadId) -> Option<ThreadSnapshot> {
            Some(ThreadSnapshot::new(Vec::new(), ThreadState::Runnable))
        }
    }

    /// Ticks parked far in the future so tests stay deterministic.
    fn quiescent_config() -> SamplerConfig {
        SamplerConfig {
            min_span_duration: Duration::ZERO,
            tick_interval: Duration::from_secs(3600),
            initial_delay: Duration::from_secs(3600),
            ..SamplerConfig::default()
        }
    }

    fn registry() -> SessionRegistry<CountingSink, EmptyStacks> {
        SessionRegistry::new(CountingSink::default(), EmptyStacks, quiescent_config())
    }

    fn entry() -> StackFrame {
        StackFrame::new("X", "run")
    }

    #[test]
    fn test_stop_without_start_is_noop() {
        let registry = registry();
        registry.stop(ThreadId(9)).expect("stop is a no-op");
        assert_eq!(registry.sink.flushed_roots.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_start_stop_flushes_exactly_once() {
        let registry = registry();
        registry.start(ThreadId(1), 100, entry()).expect("start");
        assert_eq!(registry.active_depth(ThreadId(1)), 1);
        registry.stop(ThreadId(1)).expect("stop");
        assert_eq!(registry.sink.flushed_roots.load(Ordering::SeqCst), 1);
        assert_eq!(registry.active_depth(ThreadId(1)), 0);
    }

    #[test]
    fn test_nested_start_suspends_then_resumes_outer() {
        let registry = registry();
        let thread = ThreadId(1);
        registry.start(thread, 100, entry()).expect("outer start");
        registry.start(thread, 200, StackFrame::new("X", "inner")).expect("inner start");
        // Outer was flushed when the nested call started.
        assert_eq!(registry.sink.flushed_roots.load(Ordering::SeqCst), 1);
        assert_eq!(registry.active_depth(thread), 2);

        registry.stop(thread).expect("inner stop");
        assert_eq!(registry.sink.flushed_roots.load(Ordering::SeqCst), 2);
        assert_eq!(registry.active_depth(thread), 1, "outer resumes after inner stops");

        registry.stop(thread).expect("outer stop");
        assert_eq!(
            registry.sink.flushed_roots.load(Ordering::SeqCst),
            3,
            "resumed outer flushes its fresh tree"
        );
        assert_eq!(registry.active_depth(thread), 0);
    }

    #[test]
    fn test_threads_are_tracked_independently() {
        let registry = registry();
        registry.start(ThreadId(1), 100, entry()).expect("start 1");
        registry.start(ThreadId(2), 200, entry()).expect("start 2");
        registry.stop(ThreadId(1)).expect("stop 1");
        assert_eq!(registry.active_depth(ThreadId(1)), 0);
        assert_eq!(registry.active_depth(ThreadId(2)), 1);
    }
}
