//! Shared test doubles: an in-memory span recorder and a scripted stack
//! source standing in for the tracer and platform collaborators.

use retrospan::{
    SinkError, SpanSink, StackFrame, StackSource, ThreadId, ThreadSnapshot, ThreadState, Timestamp,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpanEvent {
    Started { id: u64, name: String, parent: u64, start: Timestamp },
    Attribute { id: u64, key: String, value: String },
    Ended { id: u64, end: Timestamp },
}

/// Records every sink call. Clones share storage, so a probe clone kept by
/// the test observes what the registry-owned clone records. Span handles are
/// ids minted from one counter; externally supplied parent handles come from
/// [`RecordingSink::handle`] and share the id space.
#[derive(Clone, Default)]
pub struct RecordingSink {
    next: Arc<AtomicU64>,
    events: Arc<Mutex<Vec<SpanEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self { next: Arc::new(AtomicU64::new(1)), events: Arc::default() }
    }

    /// Mint a fresh handle to use as an external parent span.
    pub fn handle(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }

    pub fn events(&self) -> Vec<SpanEvent> {
        self.events.lock().unwrap().clone()
    }

    /// All started spans as `(id, name, parent)`, in emission order.
    pub fn started(&self) -> Vec<(u64, String, u64)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SpanEvent::Started { id, name, parent, .. } => Some((id, name, parent)),
                _ => None,
            })
            .collect()
    }

    pub fn attributes_of(&self, span: u64) -> Vec<(String, String)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SpanEvent::Attribute { id, key, value } if id == span => Some((key, value)),
                _ => None,
            })
            .collect()
    }

    pub fn start_of(&self, span: u64) -> Option<Timestamp> {
        self.events().into_iter().find_map(|e| match e {
            SpanEvent::Started { id, start, .. } if id == span => Some(start),
            _ => None,
        })
    }

    pub fn end_of(&self, span: u64) -> Option<Timestamp> {
        self.events().into_iter().find_map(|e| match e {
            SpanEvent::Ended { id, end } if id == span => Some(end),
            _ => None,
        })
    }
}

impl SpanSink for RecordingSink {
    type Span = u64;

    fn start_span(&self, name: &str, parent: &u64, start: Timestamp) -> Result<u64, SinkError> {
        let id = self.next.fetch_add(1, Ordering::SeqCst);
        self.events.lock().unwrap().push(SpanEvent::Started {
            id,
            name: name.to_string(),
            parent: *parent,
            start,
        });
        Ok(id)
    }

    fn set_attribute(&self, span: &u64, key: &str, value: &str) -> Result<(), SinkError> {
        self.events.lock().unwrap().push(SpanEvent::Attribute {
            id: *span,
            key: key.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }

    fn end_span(&self, span: &u64, end: Timestamp) -> Result<(), SinkError> {
        self.events.lock().unwrap().push(SpanEvent::Ended { id: *span, end });
        Ok(())
    }
}

/// Stack source returning a fixed snapshot per thread. Clones share the
/// script, so tests keep a handle after moving a clone into the registry.
#[derive(Clone, Default)]
pub struct ScriptedStacks {
    stacks: Arc<Mutex<HashMap<ThreadId, ThreadSnapshot>>>,
}

impl ScriptedStacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, thread: ThreadId, frames: Vec<StackFrame>, state: ThreadState) {
        self.stacks.lock().unwrap().insert(thread, ThreadSnapshot::new(frames, state));
    }
}

impl StackSource for ScriptedStacks {
    fn capture(&self, thread: ThreadId) -> Option<ThreadSnapshot> {
        self.stacks.lock().unwrap().get(&thread).cloned()
    }
}
