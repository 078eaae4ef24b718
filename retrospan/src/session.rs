//! Per-call sampling session.
//!
//! One session covers one instrumented call on one thread, from registry
//! start to registry stop. Ticks arrive from the shared scheduler, flushes
//! and restarts from whichever application thread drives the registry; the
//! session mutex serializes all three, so a tick that is already merging when
//! a flush begins finishes first and a tick dispatched after a flush finds
//! the session flushed and does nothing.

use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::call_tree::SampledNode;
use crate::config::SamplerConfig;
use crate::domain::{StackFrame, ThreadId, ThreadState, Timestamp};
use crate::sink::SpanSink;
use crate::stack_source::StackSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Running,
    Flushed,
}

struct SessionInner {
    root: SampledNode,
    phase: Phase,
}

/// One sampling lifecycle tied to a thread and an entry frame.
pub struct SamplingSession<S: SpanSink> {
    thread: ThreadId,
    entry: StackFrame,
    parent: S::Span,
    config: Arc<SamplerConfig>,
    inner: Mutex<SessionInner>,
}

impl<S: SpanSink> SamplingSession<S> {
    /// Create a session rooted at `entry`, running from the moment of
    /// construction.
    pub fn new(
        thread: ThreadId,
        entry: StackFrame,
        parent: S::Span,
        config: Arc<SamplerConfig>,
    ) -> Self {
        let root = Self::fresh_root(&entry, &config);
        Self { thread, entry, parent, config, inner: Mutex::new(SessionInner { root, phase: Phase::Running }) }
    }

    fn fresh_root(entry: &StackFrame, config: &SamplerConfig) -> SampledNode {
        let name = entry.qualified();
        let eligible = config.trace_eligible(&name, 0);
        SampledNode::new(name, eligible, Timestamp::now())
    }

    /// Capture one sample of the session's thread and merge it.
    ///
    /// The entry frame is located by scanning the capture from the innermost
    /// frame outward for an exact (declaring-type, method) match. A capture
    /// without the entry frame (the call returned between ticks, or the
    /// thread is gone) is skipped without touching the tree.
    pub fn tick<T: StackSource>(&self, stacks: &T) {
        let started = Instant::now();
        let at = Timestamp::now();
        let Some(snapshot) = stacks.capture(self.thread) else {
            debug!("{}: stack unavailable, skipping sample", self.thread);
            return;
        };
        let Some(index) = snapshot.frames.iter().position(|f| *f == self.entry) else {
            debug!("{}: entry frame {} not in capture, skipping sample", self.thread, self.entry);
            return;
        };
        match self.inner.lock() {
            Ok(mut inner) => {
                if inner.phase != Phase::Running {
                    return;
                }
                inner.root.merge(&snapshot.frames, index, at, snapshot.state, &self.config);
                debug!(
                    "{}: sampled {} at index {index} in {:?}",
                    self.thread,
                    self.entry,
                    started.elapsed()
                );
            }
            Err(_) => warn!("{}: session state poisoned, skipping sample", self.thread),
        }
    }

    /// Convert the tree into spans under the session's parent handle and
    /// transition to flushed. Flushing an already-flushed session is a no-op;
    /// sink failures are contained inside synthesis.
    pub fn flush(&self, sink: &S) {
        let started = Instant::now();
        match self.inner.lock() {
            Ok(mut inner) => {
                if inner.phase == Phase::Flushed {
                    return;
                }
                let now = Timestamp::now();
                inner.root.synthesize(sink, &self.parent, &self.config, now);
                inner.phase = Phase::Flushed;
                info!(
                    "{}: attached sampled spans for {} in {:?}",
                    self.thread,
                    self.entry,
                    started.elapsed()
                );
            }
            Err(_) => warn!("{}: session state poisoned, dropping trace", self.thread),
        }
    }

    /// Discard the current tree and begin a fresh one with the same entry
    /// identity. Used when this session resumes after a nested session ends;
    /// samples gathered before the nesting are gone by design, since that
    /// interval is covered by the nested session's own spans.
    pub fn restart(&self) {
        match self.inner.lock() {
            Ok(mut inner) => {
                inner.root = Self::fresh_root(&self.entry, &self.config);
                inner.phase = Phase::Running;
            }
            Err(_) => warn!("{}: session state poisoned, restart dropped", self.thread),
        }
    }

    /// Snapshot of the root's execution-state histogram.
    #[must_use]
    pub fn state_histogram(&self) -> HashMap<ThreadState, u64> {
        self.inner
            .lock()
            .map(|inner| inner.root.state_histogram().clone())
            .unwrap_or_default()
    }

    /// The thread this session samples.
    #[must_use]
    pub fn thread(&self) -> ThreadId {
        self.thread
    }

    /// The entry frame recorded at interception time.
    #[must_use]
    pub fn entry(&self) -> &StackFrame {
        &self.entry
    }
}
