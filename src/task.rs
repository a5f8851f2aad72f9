//! Task queue and event loop for asynchronous continuation dispatch.
//!
//! Settlement never runs continuations inline: every delivery is queued as
//! a [`Task`] and executed by [`run_event_loop`], so control always returns
//! to the settling caller before any continuation observes the outcome, and
//! a single promise's continuations run in registration order.
//!
//! The queue is thread-local; each thread owns an independent promise
//! runtime.

use crate::error::UnhandledRejection;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

pub(crate) enum Task {
    /// Run fulfillment callbacks registered before the promise settled.
    Resolution {
        promise_id: usize,
        callbacks: Vec<Box<dyn FnOnce()>>,
    },
    /// Run rejection callbacks registered before the promise settled.
    Rejection {
        promise_id: usize,
        callbacks: Vec<Box<dyn FnOnce()>>,
    },
    /// Deliver to a single continuation attached after settlement.
    Continuation {
        promise_id: usize,
        callback: Box<dyn FnOnce()>,
    },
    /// Probe for a rejection that never got a handler. Queued behind the
    /// rejection itself so synchronously attached handlers win.
    UnhandledCheck {
        promise_id: usize,
        probe: Box<dyn FnOnce() -> Option<UnhandledRejection>>,
    },
}

impl Task {
    fn summary(&self) -> String {
        match self {
            Task::Resolution { promise_id, callbacks } => {
                format!("Resolution promise_id={} callbacks={}", promise_id, callbacks.len())
            }
            Task::Rejection { promise_id, callbacks } => {
                format!("Rejection promise_id={} callbacks={}", promise_id, callbacks.len())
            }
            Task::Continuation { promise_id, .. } => format!("Continuation promise_id={}", promise_id),
            Task::UnhandledCheck { promise_id, .. } => format!("UnhandledCheck promise_id={}", promise_id),
        }
    }

    fn run(self) {
        match self {
            Task::Resolution { promise_id, callbacks } => {
                log::trace!("running {} fulfillment callbacks for promise id={}", callbacks.len(), promise_id);
                for callback in callbacks {
                    callback();
                }
            }
            Task::Rejection { promise_id, callbacks } => {
                log::trace!("running {} rejection callbacks for promise id={}", callbacks.len(), promise_id);
                for callback in callbacks {
                    callback();
                }
            }
            Task::Continuation { callback, .. } => callback(),
            Task::UnhandledCheck { promise_id, probe } => match probe() {
                Some(report) => record_unhandled(report),
                None => log::trace!("unhandled check for promise id={} cleared: handler attached", promise_id),
            },
        }
    }
}

thread_local! {
    /// Queue of pending asynchronous tasks for the current thread.
    static GLOBAL_TASK_QUEUE: RefCell<VecDeque<(usize, Task)>> = const { RefCell::new(VecDeque::new()) };

    /// Rejections that went unhandled, in the order they were detected.
    static UNHANDLED_REJECTIONS: RefCell<Vec<UnhandledRejection>> = const { RefCell::new(Vec::new()) };

    /// How many nested invocations of the event loop are active on this
    /// thread. When nested, UnhandledCheck tasks are deferred to the
    /// outermost drain so handlers attached by outer code still count.
    static RUN_LOOP_NESTING: std::cell::Cell<usize> = const { std::cell::Cell::new(0) };
}

/// Monotonic task id counter. Provides a compact stable id to correlate
/// queue/processing logs during debugging.
static TASK_COUNTER: AtomicUsize = AtomicUsize::new(1);

/// Add a task to the queue for later execution.
pub(crate) fn queue_task(task: Task) {
    let task_id = TASK_COUNTER.fetch_add(1, Ordering::SeqCst);
    log::debug!("queue_task: enqueuing task -> id={} {}", task_id, task.summary());
    GLOBAL_TASK_QUEUE.with(|q| {
        let mut queue = q.borrow_mut();
        queue.push_back((task_id, task));
        log::debug!("queue_task: id={} queue_len after push = {}", task_id, queue.len());
    });
}

/// Drain the task queue until no runnable tasks remain.
///
/// Continuations queued by the tasks themselves (chained settlements,
/// adopted deferreds) are processed in the same drain. Safe to call
/// re-entrantly from inside a continuation; nested drains leave
/// unhandled-rejection checks to the outermost caller. Returns the number
/// of tasks executed.
pub fn run_event_loop() -> usize {
    log::trace!("run_event_loop called");
    let nesting_before = RUN_LOOP_NESTING.with(|n| {
        let before = n.get();
        n.set(before + 1);
        before
    });
    let outermost = nesting_before == 0;

    let mut executed = 0usize;
    let mut deferred: Vec<(usize, Task)> = Vec::new();
    loop {
        let entry = GLOBAL_TASK_QUEUE.with(|q| q.borrow_mut().pop_front());
        let Some((task_id, task)) = entry else { break };
        if !outermost && matches!(task, Task::UnhandledCheck { .. }) {
            deferred.push((task_id, task));
            continue;
        }
        log::debug!("run_event_loop: processing id={} {}", task_id, task.summary());
        task.run();
        executed += 1;
    }
    if !deferred.is_empty() {
        GLOBAL_TASK_QUEUE.with(|q| q.borrow_mut().extend(deferred));
    }

    RUN_LOOP_NESTING.with(|n| n.set(n.get() - 1));
    log::trace!("run_event_loop: executed {} tasks", executed);
    executed
}

/// Current number of queued tasks on this thread.
pub fn pending_task_count() -> usize {
    GLOBAL_TASK_QUEUE.with(|q| q.borrow().len())
}

/// Reset the queue and the unhandled-rejection record (test isolation).
pub fn reset_event_loop() {
    GLOBAL_TASK_QUEUE.with(|q| q.borrow_mut().clear());
    UNHANDLED_REJECTIONS.with(|u| u.borrow_mut().clear());
}

fn record_unhandled(report: UnhandledRejection) {
    log::warn!("{report}");
    UNHANDLED_REJECTIONS.with(|u| u.borrow_mut().push(report));
}

/// Remove any recorded report for `promise_id`; a late handler consumes
/// the rejection after all.
pub(crate) fn withdraw_unhandled(promise_id: usize) {
    UNHANDLED_REJECTIONS.with(|u| u.borrow_mut().retain(|r| r.promise_id != promise_id));
}

/// Take (and clear) the rejections that went unhandled on this thread.
pub fn take_unhandled_rejections() -> Vec<UnhandledRejection> {
    UNHANDLED_REJECTIONS.with(|u| u.borrow_mut().drain(..).collect())
}
