//! Domain model for retrospan
//!
//! Core domain types and errors:
//! - Compile-time safety via newtype pattern
//! - Self-documenting function signatures
//! - Structured error handling

pub mod errors;
pub mod types;

// Re-export common types for convenience
pub use types::{StackFrame, ThreadId, ThreadSnapshot, ThreadState, Timestamp};

pub use errors::{SamplerError, SinkError};
