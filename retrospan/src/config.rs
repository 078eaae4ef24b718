//! Sampler configuration: filtering patterns and timing knobs.
//!
//! Configuration is supplied once, at registry construction, and stays fixed
//! for the registry's lifetime. Deployments typically load it from JSON next
//! to the rest of their service config; every field has a default so a bare
//! `{}` is a valid document.
//!
//! # Eligibility
//!
//! Whether a sampled call may materialize as a span is decided once, when its
//! tree node is created, from the qualified name and the frame's index within
//! the captured stack (0 = innermost). Precedence:
//!
//! 1. Name contains an exclusion pattern → never eligible. Used to hide the
//!    interception machinery's own frames from the emitted trace.
//! 2. Name contains an always-include pattern → eligible at any depth.
//! 3. Short-stack mode is on and the index exceeds `max_short_stack` → not
//!    eligible. Caps span fan-out on noisy deep stacks by keeping only the
//!    frames closest to the innermost call.
//! 4. Otherwise eligible.
//!
//! An ineligible node still aggregates samples; synthesis flattens it out of
//! the span hierarchy while keeping its children in position.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Substrings that mark a qualified name as never traceable.
    pub exclude_patterns: Vec<String>,

    /// Substrings that mark a qualified name as always traceable,
    /// regardless of stack index.
    pub always_include_patterns: Vec<String>,

    /// When set, frames farther than `max_short_stack` from the innermost
    /// frame are not eligible for spans.
    pub short_stack_only: bool,

    /// Maximum stack index (distance from the innermost frame) that stays
    /// eligible in short-stack mode.
    pub max_short_stack: usize,

    /// Nodes shorter than this produce no span and hide their subtree.
    pub min_span_duration: Duration,

    /// Period of the sampling tick.
    pub tick_interval: Duration,

    /// Delay before a session's first tick.
    pub initial_delay: Duration,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            exclude_patterns: Vec::new(),
            always_include_patterns: Vec::new(),
            short_stack_only: true,
            max_short_stack: 3,
            min_span_duration: Duration::from_millis(5),
            tick_interval: Duration::from_millis(50),
            initial_delay: Duration::from_millis(1),
        }
    }
}

impl SamplerConfig {
    /// Decide span eligibility for a call named `name` observed at
    /// `stack_index` frames from the innermost frame.
    ///
    /// Session roots are evaluated with index 0.
    #[must_use]
    pub fn trace_eligible(&self, name: &str, stack_index: usize) -> bool {
        if self.exclude_patterns.iter().any(|p| name.contains(p.as_str())) {
            return false;
        }
        if self.always_include_patterns.iter().any(|p| name.contains(p.as_str())) {
            return true;
        }
        if self.short_stack_only && stack_index > self.max_short_stack {
            return false;
        }
        true
    }
}
