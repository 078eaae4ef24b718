//! # retrospan - Sampled Call-Tree Reconstruction into Trace Spans
//!
//! retrospan approximates what full per-method tracing would have produced
//! for a call that is too cheap to instrument method-by-method. While the
//! call runs, a shared scheduler periodically samples the executing thread's
//! stack and execution state; the samples are folded into a merged call tree;
//! when the call exits, the tree is synthesized into a filtered, depth-capped
//! hierarchy of spans under the caller's own span.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                  Instrumented Application                  │
//! │        (interception layer: method entry / exit)           │
//! └──────────────┬────────────────────────────┬────────────────┘
//!                │ start(thread, parent,      │ stop(thread)
//!                │       entry frame)         │
//!                ▼                            ▼
//! ┌────────────────────────────────────────────────────────────┐
//! │                      SessionRegistry                       │
//! │   thread → [SamplingSession, ...]   thread → TaskHandle    │
//! └───────┬──────────────────────────────────────────┬─────────┘
//!         │ periodic tick                            │ flush
//!         ▼                                          ▼
//! ┌──────────────────┐   merge    ┌─────────────────────────────┐
//! │   TickScheduler  │──────────▶│  SampledNode call tree       │
//! │ (one dispatcher) │           │  names + state histograms    │
//! └──────────────────┘           └──────────────┬───────────────┘
//!         ▲ capture                             │ synthesize
//! ┌───────┴──────────┐            ┌─────────────▼───────────────┐
//! │   StackSource    │            │   SpanSink (tracer, e.g.    │
//! │ (platform stacks)│            │   OpenTelemetry adapter)    │
//! └──────────────────┘            └─────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`registry`]: process-wide start/stop entry points, reentrant session
//!   stacking, suspend/resume of outer sessions around nested calls
//! - [`session`]: one sampling lifecycle (Running → Flushed) per
//!   instrumented call
//! - [`call_tree`]: the merge algorithm folding stack samples into named
//!   interval nodes, and span synthesis over the finished tree
//! - [`scheduler`]: the shared fixed-rate tick dispatcher
//! - [`config`]: filter patterns, eligibility policy, timing knobs
//! - [`sink`] / [`stack_source`]: collaborator boundaries for the tracing
//!   backend and platform stack inspection
//! - [`domain`]: core newtypes and error types
//!
//! ## Key Properties
//!
//! - The reconstruction is statistical: call/return transitions are inferred
//!   from branch changes between ticks, so resolution is bounded by the tick
//!   interval (50ms by default).
//! - Sub-threshold branches (under 5ms by default) are dropped whole, and
//!   filtered frames are flattened out of the hierarchy without losing their
//!   children's position.
//! - Failures degrade to a missing or truncated trace for one call; they
//!   never propagate into the instrumented application.

pub mod call_tree;
pub mod config;
pub mod domain;
#[cfg(feature = "otel")]
pub mod otel;
pub mod registry;
pub mod scheduler;
pub mod session;
pub mod sink;
pub mod stack_source;

pub use call_tree::SampledNode;
pub use config::SamplerConfig;
pub use domain::{
    SamplerError, SinkError, StackFrame, ThreadId, ThreadSnapshot, ThreadState, Timestamp,
};
pub use registry::SessionRegistry;
pub use session::SamplingSession;
pub use sink::SpanSink;
pub use stack_source::StackSource;
