//! Shared periodic tick dispatcher.
//!
//! One dispatcher thread drives the sampling ticks of every active session,
//! ordered by deadline. Dispatch is serialized: a slow tick delays other
//! sessions' ticks but never corrupts them, which is an accepted latency
//! bound given that a tick is a stack capture plus a tree merge. Rescheduling
//! is fixed-rate (next deadline = previous deadline + period), so a stalled
//! dispatcher catches up with a burst rather than drifting.
//!
//! Cancellation is a flag checked before each dispatch. A tick already
//! running when its task is cancelled finishes normally; the session's own
//! mutex orders it against the flush that follows the cancel.

use crossbeam_channel::{unbounded, RecvTimeoutError, Sender};
use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::domain::SamplerError;

type Job = Arc<dyn Fn() + Send + Sync + 'static>;

/// Handle to one scheduled periodic task.
pub struct TaskHandle {
    cancelled: Arc<AtomicBool>,
}

impl TaskHandle {
    /// Stop future dispatches of the task. Takes effect before the next
    /// dispatch; an in-flight execution is not interrupted.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

struct Scheduled {
    due: Instant,
    period: Duration,
    cancelled: Arc<AtomicBool>,
    job: Job,
}

// BinaryHeap is a max-heap; order by reversed deadline for earliest-first.
impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other.due.cmp(&self.due)
    }
}

/// Deadline-heap dispatcher shared by all sampling sessions.
pub struct TickScheduler {
    tx: Option<Sender<Scheduled>>,
    worker: Option<JoinHandle<()>>,
}

impl TickScheduler {
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = unbounded::<Scheduled>();
        let worker = std::thread::spawn(move || {
            let mut queue: BinaryHeap<Scheduled> = BinaryHeap::new();
            loop {
                let received = match queue.peek().map(|task| task.due) {
                    Some(due) => {
                        let wait = due.saturating_duration_since(Instant::now());
                        if wait.is_zero() {
                            Err(RecvTimeoutError::Timeout)
                        } else {
                            rx.recv_timeout(wait)
                        }
                    }
                    None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
                };
                match received {
                    Ok(task) => queue.push(task),
                    Err(RecvTimeoutError::Timeout) => {
                        if let Some(mut task) = queue.pop() {
                            if task.cancelled.load(Ordering::SeqCst) {
                                continue;
                            }
                            (task.job)();
                            task.due += task.period;
                            queue.push(task);
                        }
                    }
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        });
        Self { tx: Some(tx), worker: Some(worker) }
    }

    /// Schedule `job` to run after `initial_delay` and every `period`
    /// thereafter until the returned handle is cancelled.
    pub fn schedule_repeating(
        &self,
        initial_delay: Duration,
        period: Duration,
        job: impl Fn() + Send + Sync + 'static,
    ) -> Result<TaskHandle, SamplerError> {
        let cancelled = Arc::new(AtomicBool::new(false));
        let task = Scheduled {
            due: Instant::now() + initial_delay,
            period,
            cancelled: Arc::clone(&cancelled),
            job: Arc::new(job),
        };
        self.tx
            .as_ref()
            .ok_or(SamplerError::SchedulerStopped)?
            .send(task)
            .map_err(|_| SamplerError::SchedulerStopped)?;
        Ok(TaskHandle { cancelled })
    }
}

impl Default for TickScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TickScheduler {
    fn drop(&mut self) {
        // Closing the channel lets the dispatcher drain out of recv and exit.
        drop(self.tx.take());
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
