//! Sampled call-tree aggregation and span synthesis.
//!
//! A [`SampledNode`] represents one named call observed to be active across a
//! run of stack samples. Folding a sample into the tree ([`SampledNode::merge`])
//! compares the frame one level deeper than the current node against the
//! node's open child: the same name accumulates into the existing child, a
//! different name retires the old branch and opens a sibling. Consecutive
//! samples landing on the same call sequence therefore collapse into single
//! nodes, time-weighted by their execution-state histograms, and call/return
//! transitions are approximated by branch changes between ticks.
//!
//! ```text
//! samples:  [X.run]   [Y.step, X.run]   [Y.step, X.run]   [Z.step, X.run]
//!
//!                 X.run ───────────────────────────────────▶
//!                            Y.step ───────────▶ │ Z.step ─▶
//!                                         closed ┘
//! ```
//!
//! Synthesis ([`SampledNode::synthesize`]) walks the finished tree and emits
//! a span per eligible node through a [`SpanSink`], flattening ineligible
//! nodes and dropping entire subtrees that ran shorter than the significance
//! threshold.

use log::warn;
use std::collections::HashMap;

use crate::config::SamplerConfig;
use crate::domain::{StackFrame, ThreadState, Timestamp};
use crate::sink::SpanSink;

/// A named call interval reconstructed from stack samples.
///
/// Owned exclusively by its parent node, or by the sampling session at the
/// root. At any instant a node has at most one open child; a child moves into
/// the finished list exactly once, when a sample shows a different name at
/// its depth or when the parent closes.
#[derive(Debug)]
pub struct SampledNode {
    name: String,
    start: Timestamp,
    end: Timestamp,
    states: HashMap<ThreadState, u64>,
    finished: Vec<SampledNode>,
    open: Option<Box<SampledNode>>,
    eligible: bool,
    closed: bool,
}

impl SampledNode {
    /// Create a node for a call first observed at `at`.
    ///
    /// Eligibility is fixed here for the node's lifetime; see
    /// [`SamplerConfig::trace_eligible`].
    #[must_use]
    pub fn new(name: impl Into<String>, eligible: bool, at: Timestamp) -> Self {
        Self {
            name: name.into(),
            start: at,
            end: at,
            states: HashMap::new(),
            finished: Vec::new(),
            open: None,
            eligible,
            closed: false,
        }
    }

    /// Fold one stack sample into the tree rooted at this node.
    ///
    /// `frames[0]` is the innermost captured frame and `depth` is this node's
    /// index within `frames`; the frame one level deeper is
    /// `frames[depth - 1]`. Every node on the visited path gets its end time
    /// advanced to the sample timestamp and its histogram bumped for `state`.
    pub fn merge(
        &mut self,
        frames: &[StackFrame],
        depth: usize,
        at: Timestamp,
        state: ThreadState,
        config: &SamplerConfig,
    ) {
        if depth > 0 {
            let child_name = frames[depth - 1].qualified();
            // A different name one level down means the previous branch
            // returned between ticks: fold this sample into it and retire it.
            if let Some(open) = self.open.take() {
                if open.name == child_name {
                    self.open = Some(open);
                } else {
                    let mut retired = open;
                    retired.close(at, state);
                    self.finished.push(*retired);
                }
            }
            let open = self.open.get_or_insert_with(|| {
                let eligible = config.trace_eligible(&child_name, depth);
                Box::new(SampledNode::new(child_name, eligible, at))
            });
            open.merge(frames, depth - 1, at, state, config);
        } else if let Some(mut open) = self.open.take() {
            // This node is the innermost active frame for the sample; the
            // deeper call is no longer observed.
            open.close(at, state);
            self.finished.push(*open);
        }
        self.end = at;
        *self.states.entry(state).or_insert(0) += 1;
    }

    /// Close the node at `at`, folding the closing sample's `state` into it
    /// and recursively closing any open child.
    ///
    /// Not idempotent: closing twice double-counts a state sample. Callers
    /// invoke this exactly once per node, at the true end of observation.
    pub fn close(&mut self, at: Timestamp, state: ThreadState) {
        self.end = at;
        self.closed = true;
        *self.states.entry(state).or_insert(0) += 1;
        if let Some(mut open) = self.open.take() {
            open.close(at, state);
            self.finished.push(*open);
        }
    }

    /// Emit the span hierarchy for this subtree through `sink`, parented
    /// under `parent`.
    ///
    /// A node never explicitly closed is closed here with `now` as its end
    /// time (sampling stopped mid-interval). Nodes shorter than
    /// `config.min_span_duration` produce nothing and their whole subtree is
    /// skipped, even children that would individually clear the threshold;
    /// the significance check runs before the eligibility check. Ineligible
    /// nodes recurse with the caller's `parent`, flattening themselves out of
    /// the hierarchy. Sink failures are logged and contained.
    pub fn synthesize<S: SpanSink>(
        &mut self,
        sink: &S,
        parent: &S::Span,
        config: &SamplerConfig,
        now: Timestamp,
    ) {
        if !self.closed {
            self.closed = true;
            self.end = now;
        }
        if self.end.elapsed_since(self.start) < config.min_span_duration {
            return;
        }
        if !self.eligible {
            for child in &mut self.finished {
                child.synthesize(sink, parent, config, now);
            }
            if let Some(open) = self.open.as_mut() {
                open.synthesize(sink, parent, config, now);
            }
            return;
        }
        match sink.start_span(&self.name, parent, self.start) {
            Ok(span) => {
                self.set_state_attributes(sink, &span);
                for child in &mut self.finished {
                    child.synthesize(sink, &span, config, now);
                }
                if let Some(open) = self.open.as_mut() {
                    open.synthesize(sink, &span, config, now);
                }
                if let Err(err) = sink.end_span(&span, self.end) {
                    warn!("failed to end span {}: {err}", self.name);
                }
            }
            Err(err) => {
                // Keep the subtree: children attach to this node's parent.
                warn!("failed to start span {}: {err}", self.name);
                for child in &mut self.finished {
                    child.synthesize(sink, parent, config, now);
                }
                if let Some(open) = self.open.as_mut() {
                    open.synthesize(sink, parent, config, now);
                }
            }
        }
    }

    /// One `state.<STATE> = <percent>%` attribute per histogram entry, in
    /// declaration order of [`ThreadState::ALL`]. Integer division, so the
    /// percentages sum to at most 100.
    fn set_state_attributes<S: SpanSink>(&self, sink: &S, span: &S::Span) {
        let total: u64 = self.states.values().sum();
        for state in ThreadState::ALL {
            if let Some(count) = self.states.get(&state) {
                let key = format!("state.{state}");
                let value = format!("{}%", count * 100 / total);
                if let Err(err) = sink.set_attribute(span, &key, &value) {
                    warn!("failed to set {key} on span {}: {err}", self.name);
                }
            }
        }
    }

    /// Qualified name of the sampled call.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// First-observed timestamp.
    #[must_use]
    pub fn start(&self) -> Timestamp {
        self.start
    }

    /// Last-observed (or closing) timestamp.
    #[must_use]
    pub fn end(&self) -> Timestamp {
        self.end
    }

    /// Whether the node may materialize as a span.
    #[must_use]
    pub fn eligible(&self) -> bool {
        self.eligible
    }

    /// Whether the node has been closed against further samples.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Execution-state sample counts accumulated over the node's lifetime.
    #[must_use]
    pub fn state_histogram(&self) -> &HashMap<ThreadState, u64> {
        &self.states
    }

    /// Closed children, in chronological order of appearance.
    #[must_use]
    pub fn finished_children(&self) -> &[SampledNode] {
        &self.finished
    }

    /// The currently open deeper call, if any.
    #[must_use]
    pub fn open_child(&self) -> Option<&SampledNode> {
        self.open.as_deref()
    }
}
