//! Structured error types for retrospan
//!
//! Using thiserror for automatic Display implementation and error chaining.
//! Failures inside the sampling core degrade to a lost or truncated trace;
//! they are never allowed to disturb the instrumented application, so the
//! surface here is deliberately small.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SamplerError {
    /// The shared tick dispatcher has shut down, so no further sampling can
    /// be scheduled. Sessions already pushed stay on the registry and flush
    /// whatever they hold when stopped.
    #[error("tick scheduler is no longer running")]
    SchedulerStopped,

    /// The registry mutex was poisoned by a panic in another caller.
    #[error("session registry state is poisoned")]
    RegistryPoisoned,
}

/// Failure reported by a span sink implementation.
///
/// Synthesis logs these and carries on; they never reach the caller of
/// `SessionRegistry::stop`.
#[derive(Error, Debug)]
#[error("span sink failure: {0}")]
pub struct SinkError(pub String);

impl SinkError {
    pub fn new(message: impl Into<String>) -> Self {
        SinkError(message.into())
    }
}
