//! End-to-end demo against a scripted stack source.
//!
//! Simulates one instrumented call that spends time in two different
//! callees, samples it through the real registry and scheduler, and prints
//! every span the synthesis emits. Run with `RUST_LOG=debug` to see the
//! per-tick sampling detail.
//!
//! ```sh
//! cargo run --example synthetic
//! ```

use anyhow::Result;
use log::info;
use retrospan::{
    SamplerConfig, SessionRegistry, SinkError, SpanSink, StackFrame, StackSource, ThreadId,
    ThreadSnapshot, ThreadState, Timestamp,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Prints each span event as the synthesis walks the tree.
#[derive(Default)]
struct PrintingSink {
    next: AtomicU64,
}

impl SpanSink for PrintingSink {
    type Span = u64;

    fn start_span(&self, name: &str, parent: &u64, start: Timestamp) -> Result<u64, SinkError> {
        let id = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        println!("span #{id} {name} (parent #{parent}) started at {start}");
        Ok(id)
    }

    fn set_attribute(&self, span: &u64, key: &str, value: &str) -> Result<(), SinkError> {
        println!("span #{span}   {key} = {value}");
        Ok(())
    }

    fn end_span(&self, span: &u64, end: Timestamp) -> Result<(), SinkError> {
        println!("span #{span}   ended at {end}");
        Ok(())
    }
}

/// One mutable stack per thread, standing in for platform stack inspection.
#[derive(Clone, Default)]
struct ScriptedStacks {
    current: Arc<Mutex<Option<ThreadSnapshot>>>,
}

impl ScriptedStacks {
    fn set(&self, frames: Vec<StackFrame>, state: ThreadState) {
        *self.current.lock().unwrap() = Some(ThreadSnapshot::new(frames, state));
    }
}

impl StackSource for ScriptedStacks {
    fn capture(&self, _thread: ThreadId) -> Option<ThreadSnapshot> {
        self.current.lock().unwrap().clone()
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let config = SamplerConfig {
        tick_interval: Duration::from_millis(10),
        ..SamplerConfig::default()
    };
    let stacks = ScriptedStacks::default();
    let registry = SessionRegistry::new(PrintingSink::default(), stacks.clone(), config);

    let thread = ThreadId(1);
    let entry = StackFrame::new("demo.Checkout", "submit");

    // Phase one: the call validates the order.
    stacks.set(
        vec![StackFrame::new("demo.Validator", "check"), entry.clone()],
        ThreadState::Runnable,
    );
    info!("starting sampled session for {entry}");
    registry.start(thread, 0, entry.clone())?;
    thread::sleep(Duration::from_millis(120));

    // Phase two: it waits on the payment gateway.
    stacks.set(
        vec![StackFrame::new("demo.Gateway", "authorize"), entry.clone()],
        ThreadState::Waiting,
    );
    thread::sleep(Duration::from_millis(120));

    info!("call returned, flushing");
    registry.stop(thread)?;
    Ok(())
}
