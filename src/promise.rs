//! The base deferred-computation primitive.
//!
//! [`Promise`] is a shared handle to a one-shot settlement cell with two
//! continuation registrars (`then`/`catch`). Settlement is exactly-once:
//! the first `resolve`/`reject` wins and later attempts are ignored.
//! Continuations never run inline; they are dispatched through the task
//! queue (see [`crate::task`]) after the settling call unwinds, in
//! registration order for a single promise.
//!
//! `resolve` takes a concrete value only. Adoption of nested
//! deferred/thenable values is the job of [`SmartPromise`]'s settlement
//! entry points, which chase them down to a concrete outcome before
//! driving this primitive.
//!
//! [`SmartPromise`]: crate::SmartPromise

use crate::error::UnhandledRejection;
use crate::reason::Reason;
use crate::task::{self, Task, queue_task};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

static UNIQUE_ID_SEED: AtomicUsize = AtomicUsize::new(1);

pub(crate) fn generate_unique_id() -> usize {
    UNIQUE_ID_SEED.fetch_add(1, Ordering::SeqCst)
}

enum PromiseState<T> {
    Pending,
    Fulfilled(T),
    Rejected(Reason),
}

impl<T> PromiseState<T> {
    fn name(&self) -> &'static str {
        match self {
            PromiseState::Pending => "pending",
            PromiseState::Fulfilled(_) => "fulfilled",
            PromiseState::Rejected(_) => "rejected",
        }
    }
}

struct PromiseInner<T> {
    id: usize,
    state: PromiseState<T>,
    on_fulfilled: Vec<Box<dyn FnOnce(T)>>,
    on_rejected: Vec<Box<dyn FnOnce(Reason)>>,
    /// Whether a rejection handler has been attached. Used to avoid
    /// reporting unhandled rejections after the promise has been handled.
    handled: bool,
}

/// A one-shot, introspection-free deferred value.
///
/// Clones share the same settlement cell. The type is single-threaded by
/// construction (`Rc`-based, thread-local task queue).
pub struct Promise<T: 'static> {
    inner: Rc<RefCell<PromiseInner<T>>>,
}

impl<T: 'static> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Promise { inner: self.inner.clone() }
    }
}

impl<T: Clone + fmt::Debug + 'static> Promise<T> {
    /// Create a promise in the pending state.
    pub fn pending() -> Self {
        Promise {
            inner: Rc::new(RefCell::new(PromiseInner {
                id: generate_unique_id(),
                state: PromiseState::Pending,
                on_fulfilled: Vec::new(),
                on_rejected: Vec::new(),
                handled: false,
            })),
        }
    }

    /// Create a promise already fulfilled with `value`.
    pub fn resolved(value: T) -> Self {
        let promise = Self::pending();
        promise.resolve(value);
        promise
    }

    /// Create a promise already rejected with `reason`.
    pub fn rejected(reason: Reason) -> Self {
        let promise = Self::pending();
        promise.reject(reason);
        promise
    }

    /// Stable id for logging and unhandled-rejection correlation.
    pub fn id(&self) -> usize {
        self.inner.borrow().id
    }

    pub(crate) fn is_pending(&self) -> bool {
        matches!(self.inner.borrow().state, PromiseState::Pending)
    }

    /// Fulfill with a concrete value. Ignored if already settled.
    pub fn resolve(&self, value: T) {
        let (promise_id, callbacks) = {
            let mut guard = self.inner.borrow_mut();
            let inner = &mut *guard;
            if !matches!(inner.state, PromiseState::Pending) {
                log::trace!("resolve: promise id={} already {}, ignoring", inner.id, inner.state.name());
                return;
            }
            log::trace!("resolve: promise id={} value={:?}", inner.id, value);
            inner.state = PromiseState::Fulfilled(value.clone());
            (inner.id, std::mem::take(&mut inner.on_fulfilled))
        };
        if !callbacks.is_empty() {
            log::debug!("resolve: scheduling Resolution task for promise id={} callbacks={}", promise_id, callbacks.len());
            let callbacks = callbacks
                .into_iter()
                .map(|callback| {
                    let value = value.clone();
                    Box::new(move || callback(value)) as Box<dyn FnOnce()>
                })
                .collect();
            queue_task(Task::Resolution { promise_id, callbacks });
        }
    }

    /// Reject with a reason. Ignored if already settled.
    ///
    /// A rejection with no registered handler schedules an unhandled check
    /// behind it on the task queue; see
    /// [`take_unhandled_rejections`](crate::take_unhandled_rejections).
    pub fn reject(&self, reason: Reason) {
        let (promise_id, callbacks, needs_check) = {
            let mut guard = self.inner.borrow_mut();
            let inner = &mut *guard;
            if !matches!(inner.state, PromiseState::Pending) {
                log::trace!("reject: promise id={} already {}, ignoring", inner.id, inner.state.name());
                return;
            }
            log::debug!("reject: promise id={} reason={}", inner.id, reason);
            inner.state = PromiseState::Rejected(reason.clone());
            let callbacks = std::mem::take(&mut inner.on_rejected);
            let needs_check = callbacks.is_empty() && !inner.handled;
            (inner.id, callbacks, needs_check)
        };
        if !callbacks.is_empty() {
            log::debug!("reject: scheduling Rejection task for promise id={} callbacks={}", promise_id, callbacks.len());
            let callbacks = callbacks
                .into_iter()
                .map(|callback| {
                    let reason = reason.clone();
                    Box::new(move || callback(reason)) as Box<dyn FnOnce()>
                })
                .collect();
            queue_task(Task::Rejection { promise_id, callbacks });
        } else if needs_check {
            log::trace!("reject: scheduling UnhandledCheck for promise id={}", promise_id);
            let cell = self.inner.clone();
            queue_task(Task::UnhandledCheck {
                promise_id,
                probe: Box::new(move || {
                    let inner = cell.borrow();
                    if inner.handled {
                        return None;
                    }
                    match &inner.state {
                        PromiseState::Rejected(reason) => Some(UnhandledRejection {
                            promise_id: inner.id,
                            reason: reason.clone(),
                        }),
                        _ => None,
                    }
                }),
            });
        }
    }

    /// Register a success continuation.
    ///
    /// Runs (via the task queue) with the fulfillment value once the
    /// promise fulfills; never runs if it rejects. May be called any number
    /// of times; continuations fire in registration order.
    pub fn then(&self, on_fulfilled: impl FnOnce(T) + 'static) {
        let (promise_id, value) = {
            let mut guard = self.inner.borrow_mut();
            let inner = &mut *guard;
            match &inner.state {
                PromiseState::Pending => {
                    inner.on_fulfilled.push(Box::new(on_fulfilled));
                    return;
                }
                PromiseState::Fulfilled(value) => (inner.id, value.clone()),
                PromiseState::Rejected(_) => return,
            }
        };
        log::trace!("then: promise id={} already fulfilled, queueing continuation", promise_id);
        queue_task(Task::Continuation {
            promise_id,
            callback: Box::new(move || on_fulfilled(value)),
        });
    }

    /// Register a failure continuation.
    ///
    /// Runs (via the task queue) with the rejection reason once the promise
    /// rejects; never runs if it fulfills. Attaching a handler marks the
    /// promise handled and withdraws any recorded unhandled report.
    pub fn catch(&self, on_rejected: impl FnOnce(Reason) + 'static) {
        // A handler consumes any recorded unhandled report, even a late one.
        task::withdraw_unhandled(self.id());
        let (promise_id, reason) = {
            let mut guard = self.inner.borrow_mut();
            let inner = &mut *guard;
            inner.handled = true;
            match &inner.state {
                PromiseState::Pending => {
                    inner.on_rejected.push(Box::new(on_rejected));
                    return;
                }
                PromiseState::Rejected(reason) => (inner.id, reason.clone()),
                PromiseState::Fulfilled(_) => return,
            }
        };
        log::trace!("catch: promise id={} already rejected, queueing continuation", promise_id);
        queue_task(Task::Continuation {
            promise_id,
            callback: Box::new(move || on_rejected(reason)),
        });
    }
}

impl<T: 'static> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        write!(
            f,
            "Promise {{ id: {}, state: {}, on_fulfilled: {}, on_rejected: {} }}",
            inner.id,
            inner.state.name(),
            inner.on_fulfilled.len(),
            inner.on_rejected.len()
        )
    }
}
