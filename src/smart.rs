//! Externally settleable, synchronously introspectable promises.
//!
//! [`SmartPromise`] wraps a base [`Promise`] with three pieces:
//!
//! 1. **Settlement record** ([`Settlement`]): flags and payload slots that
//!    mirror the one-time settlement so callers can ask "did this fulfill,
//!    and with what?" without blocking or registering continuations.
//! 2. **Bootstrap binder** ([`Binder`]): the settlement entry points are
//!    manufactured and handed to the executor *before* the `SmartPromise`
//!    value exists. Until it does, settlements land in transitional
//!    storage; `bind` flushes that storage into the instance in one step
//!    and flips the mode so later calls write through directly.
//! 3. **Chaser**: `resolve`/`reject` accept not just concrete payloads but
//!    nested deferred/thenable values ([`Resolution`]/[`Rejection`]), which
//!    are followed until a concrete terminal value or reason is reached.
//!
//! The base promise's own pending check is the exactly-once arbiter; the
//! settlement record is a mirror written at most once. Entry points never
//! fail and later calls after the first effective settlement are ignored.

use crate::promise::Promise;
use crate::reason::Reason;
use crate::thenable::Thenable;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// The observable settlement record: three flags and two payload slots.
///
/// Invariants: `fulfilled` and `rejected` each imply `settled` and exclude
/// one another; `value` is present iff `fulfilled`, `reason` iff
/// `rejected`; once settled the record never changes again.
struct Settlement<T> {
    settled: bool,
    fulfilled: bool,
    rejected: bool,
    value: Option<T>,
    reason: Option<Reason>,
}

impl<T> Default for Settlement<T> {
    fn default() -> Self {
        Settlement {
            settled: false,
            fulfilled: false,
            rejected: false,
            value: None,
            reason: None,
        }
    }
}

impl<T> Settlement<T> {
    /// Record a fulfillment. Returns whether the record was applied; a
    /// second settlement attempt of either kind is a no-op.
    fn record_fulfilled(&mut self, value: T) -> bool {
        if self.settled {
            return false;
        }
        self.settled = true;
        self.fulfilled = true;
        self.value = Some(value);
        true
    }

    /// Record a rejection. Same exactly-once contract as
    /// [`Settlement::record_fulfilled`].
    fn record_rejected(&mut self, reason: Reason) -> bool {
        if self.settled {
            return false;
        }
        self.settled = true;
        self.rejected = true;
        self.reason = Some(reason);
        true
    }
}

/// Two-state dispatch for settlement writes.
///
/// The entry points are created while the owning [`SmartPromise`] is still
/// being constructed, so they cannot hold its settlement cell yet. Writes
/// in that window go to the `Unbound` transitional record; once the
/// instance exists, [`Binder::bind`] moves the transitional record into the
/// instance cell and all later writes go straight through.
enum Binder<T> {
    Unbound(Settlement<T>),
    Bound(Rc<RefCell<Settlement<T>>>),
}

impl<T> Binder<T> {
    fn record_fulfilled(&mut self, value: T) -> bool {
        match self {
            Binder::Unbound(transitional) => transitional.record_fulfilled(value),
            Binder::Bound(cell) => cell.borrow_mut().record_fulfilled(value),
        }
    }

    fn record_rejected(&mut self, reason: Reason) -> bool {
        match self {
            Binder::Unbound(transitional) => transitional.record_rejected(reason),
            Binder::Bound(cell) => cell.borrow_mut().record_rejected(reason),
        }
    }

    /// Flush transitional storage into `instance` in a single step and
    /// switch all future writes over to it. An executor that never settled
    /// leaves `instance` pending, which is the default record.
    fn bind(&mut self, instance: &Rc<RefCell<Settlement<T>>>) {
        if let Binder::Unbound(transitional) = self {
            *instance.borrow_mut() = std::mem::take(transitional);
        }
        *self = Binder::Bound(instance.clone());
    }
}

/// What a resolution call was given: a concrete value, or something to
/// chase first.
pub enum Resolution<T: 'static> {
    /// A concrete terminal value; finalizes immediately.
    Value(T),
    /// A minimal thenable: only a success registrar. Its eventual value
    /// fulfills the promise; if it never fires, the promise stays pending.
    Thenable(Box<dyn Thenable<T>>),
    /// A full deferred. Its outcome is adopted faithfully: nested success
    /// fulfills, nested failure rejects.
    Deferred(Promise<T>),
}

impl<T: 'static> Resolution<T> {
    /// Whether this is something to chase rather than a concrete value.
    pub fn is_deferred_like(&self) -> bool {
        !matches!(self, Resolution::Value(_))
    }

    /// Whether this is a full deferred (exposes a failure registrar too),
    /// as opposed to a minimal thenable. Only meaningful when
    /// [`Resolution::is_deferred_like`] holds.
    pub fn is_full_deferred(&self) -> bool {
        matches!(self, Resolution::Deferred(_))
    }
}

impl<T: 'static> From<T> for Resolution<T> {
    fn from(value: T) -> Self {
        Resolution::Value(value)
    }
}

/// What a rejection call was given: a concrete reason, or something whose
/// eventual output becomes the reason.
pub enum Rejection<T: 'static> {
    /// A concrete reason; finalizes immediately.
    Reason(Reason),
    /// A minimal thenable; the value it produces becomes the rejection
    /// reason.
    Thenable(Box<dyn Thenable<T>>),
    /// A full deferred. Whichever way it settles, the promise rejects:
    /// a nested fulfillment value and a nested rejection reason are both
    /// used as the rejection payload.
    Deferred(Promise<T>),
}

impl<T: 'static> Rejection<T> {
    /// Whether this is something to chase rather than a concrete reason.
    pub fn is_deferred_like(&self) -> bool {
        !matches!(self, Rejection::Reason(_))
    }

    /// Whether this is a full deferred rather than a minimal thenable.
    pub fn is_full_deferred(&self) -> bool {
        matches!(self, Rejection::Deferred(_))
    }
}

impl<T: 'static> From<Reason> for Rejection<T> {
    fn from(reason: Reason) -> Self {
        Rejection::Reason(reason)
    }
}

/// Shared settle core behind the entry points: the base promise (the
/// exactly-once arbiter) plus the binder (the mirror).
struct SettleCore<T: 'static> {
    promise: Promise<T>,
    binder: Rc<RefCell<Binder<T>>>,
}

impl<T: 'static> Clone for SettleCore<T> {
    fn clone(&self) -> Self {
        SettleCore {
            promise: self.promise.clone(),
            binder: self.binder.clone(),
        }
    }
}

impl<T: Clone + fmt::Debug + 'static> SettleCore<T> {
    /// Finalize through the success path: mirror the outcome, then forward
    /// it to the base promise so continuation registration observes it.
    fn finalize_fulfilled(&self, value: T) {
        if !self.promise.is_pending() {
            log::trace!("finalize_fulfilled: promise id={} already settled, ignoring", self.promise.id());
            return;
        }
        self.binder.borrow_mut().record_fulfilled(value.clone());
        self.promise.resolve(value);
    }

    /// Finalize through the failure path; see
    /// [`SettleCore::finalize_fulfilled`].
    fn finalize_rejected(&self, reason: Reason) {
        if !self.promise.is_pending() {
            log::trace!("finalize_rejected: promise id={} already settled, ignoring", self.promise.id());
            return;
        }
        self.binder.borrow_mut().record_rejected(reason.clone());
        self.promise.reject(reason);
    }

    fn drive_resolution(&self, value: Resolution<T>) {
        log::trace!(
            "resolve: promise id={} deferred_like={} full_deferred={}",
            self.promise.id(),
            value.is_deferred_like(),
            value.is_full_deferred()
        );
        match value {
            Resolution::Value(value) => self.finalize_fulfilled(value),
            Resolution::Thenable(thenable) => {
                let core = self.clone();
                thenable.subscribe(Box::new(move |value| core.finalize_fulfilled(value)));
            }
            Resolution::Deferred(nested) => {
                let core = self.clone();
                nested.then(move |value| core.finalize_fulfilled(value));
                let core = self.clone();
                nested.catch(move |reason| core.finalize_rejected(reason));
            }
        }
    }

    fn drive_rejection(&self, reason: Rejection<T>) {
        log::trace!(
            "reject: promise id={} deferred_like={} full_deferred={}",
            self.promise.id(),
            reason.is_deferred_like(),
            reason.is_full_deferred()
        );
        match reason {
            Rejection::Reason(reason) => self.finalize_rejected(reason),
            Rejection::Thenable(thenable) => {
                let core = self.clone();
                thenable.subscribe(Box::new(move |value| core.finalize_rejected(Reason::new(value))));
            }
            Rejection::Deferred(nested) => {
                // Both continuations route to the failure path: rejecting
                // with a deferred always produces a final rejection, using
                // whatever value or failure the deferred eventually yields
                // as the payload.
                let core = self.clone();
                nested.then(move |value| core.finalize_rejected(Reason::new(value)));
                let core = self.clone();
                nested.catch(move |reason| core.finalize_rejected(reason));
            }
        }
    }
}

/// The success-side settlement entry point bound to one [`SmartPromise`].
///
/// Clonable and callable from anywhere, any number of times; only the
/// first effective settlement of the underlying promise has effect.
pub struct Resolver<T: 'static> {
    core: SettleCore<T>,
}

impl<T: 'static> Clone for Resolver<T> {
    fn clone(&self) -> Self {
        Resolver { core: self.core.clone() }
    }
}

impl<T: Clone + fmt::Debug + 'static> Resolver<T> {
    /// Resolve the promise, chasing nested deferred/thenable values down
    /// to a concrete outcome first.
    pub fn resolve(&self, value: impl Into<Resolution<T>>) {
        self.core.drive_resolution(value.into());
    }
}

/// The failure-side settlement entry point bound to one [`SmartPromise`].
pub struct Rejecter<T: 'static> {
    core: SettleCore<T>,
}

impl<T: 'static> Clone for Rejecter<T> {
    fn clone(&self) -> Self {
        Rejecter { core: self.core.clone() }
    }
}

impl<T: Clone + fmt::Debug + 'static> Rejecter<T> {
    /// Reject the promise.
    ///
    /// Given a nested deferred, the promise always ends up rejected: the
    /// deferred's fulfillment value or rejection reason (whichever
    /// arrives) becomes the rejection payload. Note the asymmetry with
    /// [`Resolver::resolve`], which adopts a nested success as a success.
    pub fn reject(&self, reason: impl Into<Rejection<T>>) {
        self.core.drive_rejection(reason.into());
    }
}

/// A promise that can be settled from outside its executor and inspected
/// synchronously.
///
/// ```
/// use smart_promise::SmartPromise;
///
/// let promise = SmartPromise::pending();
/// assert!(!promise.is_settled());
/// promise.resolve(5);
/// assert!(promise.is_fulfilled());
/// assert_eq!(promise.value(), Some(5));
/// ```
pub struct SmartPromise<T: 'static> {
    promise: Promise<T>,
    state: Rc<RefCell<Settlement<T>>>,
    resolver: Resolver<T>,
    rejecter: Rejecter<T>,
}

impl<T: Clone + fmt::Debug + 'static> SmartPromise<T> {
    /// Create a promise, running `executor` synchronously with the two
    /// settlement entry points before construction returns.
    ///
    /// The executor runs while the `SmartPromise` itself is still being
    /// assembled; the binder records any settlement it performs and the
    /// record is carried over into the finished instance. A panicking
    /// executor propagates as a construction failure.
    pub fn new(executor: impl FnOnce(Resolver<T>, Rejecter<T>)) -> Self {
        let promise = Promise::pending();
        let binder = Rc::new(RefCell::new(Binder::Unbound(Settlement::default())));
        let core = SettleCore {
            promise: promise.clone(),
            binder: binder.clone(),
        };
        let resolver = Resolver { core: core.clone() };
        let rejecter = Rejecter { core };

        // Pre-identity phase: settlements land in transitional storage and
        // are still forwarded to the base promise.
        executor(resolver.clone(), rejecter.clone());

        let state = Rc::new(RefCell::new(Settlement::default()));
        binder.borrow_mut().bind(&state);

        SmartPromise {
            promise,
            state,
            resolver,
            rejecter,
        }
    }

    /// Create a pending promise with no executor; settle it later through
    /// [`SmartPromise::resolve`]/[`SmartPromise::reject`] or the cloned
    /// entry points.
    pub fn pending() -> Self {
        Self::new(|_, _| {})
    }

    /// Resolve from outside the executor; see [`Resolver::resolve`].
    pub fn resolve(&self, value: impl Into<Resolution<T>>) {
        self.resolver.resolve(value);
    }

    /// Reject from outside the executor; see [`Rejecter::reject`].
    pub fn reject(&self, reason: impl Into<Rejection<T>>) {
        self.rejecter.reject(reason);
    }

    /// A clone of the success-side entry point.
    pub fn resolver(&self) -> Resolver<T> {
        self.resolver.clone()
    }

    /// A clone of the failure-side entry point.
    pub fn rejecter(&self) -> Rejecter<T> {
        self.rejecter.clone()
    }

    /// Whether the promise has finalized either way. Never reverts.
    pub fn is_settled(&self) -> bool {
        self.state.borrow().settled
    }

    /// Whether the promise finalized through the success path. When true,
    /// [`SmartPromise::value`] is guaranteed present.
    pub fn is_fulfilled(&self) -> bool {
        self.state.borrow().fulfilled
    }

    /// Whether the promise finalized through the failure path. When true,
    /// [`SmartPromise::reason`] is guaranteed present.
    pub fn is_rejected(&self) -> bool {
        self.state.borrow().rejected
    }

    /// The fulfillment value, if the promise fulfilled.
    pub fn value(&self) -> Option<T> {
        self.state.borrow().value.clone()
    }

    /// The rejection reason, if the promise rejected.
    pub fn reason(&self) -> Option<Reason> {
        self.state.borrow().reason.clone()
    }

    /// The settled outcome as a `Result`, or `None` while pending.
    pub fn settled_result(&self) -> Option<Result<T, Reason>> {
        let state = self.state.borrow();
        if state.fulfilled {
            state.value.clone().map(Ok)
        } else if state.rejected {
            state.reason.clone().map(Err)
        } else {
            None
        }
    }

    /// Register a success continuation on the underlying promise.
    pub fn then(&self, on_fulfilled: impl FnOnce(T) + 'static) {
        self.promise.then(on_fulfilled);
    }

    /// Register a failure continuation on the underlying promise.
    pub fn catch(&self, on_rejected: impl FnOnce(Reason) + 'static) {
        self.promise.catch(on_rejected);
    }

    /// The underlying base promise handle.
    ///
    /// Introspection mirrors settlements driven through this wrapper's
    /// entry points; settling the base handle directly bypasses the
    /// mirror.
    pub fn as_promise(&self) -> &Promise<T> {
        &self.promise
    }
}

impl<T: Clone + fmt::Debug + 'static> From<&SmartPromise<T>> for Promise<T> {
    fn from(smart: &SmartPromise<T>) -> Self {
        smart.promise.clone()
    }
}

impl<T: 'static> fmt::Debug for SmartPromise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        write!(
            f,
            "SmartPromise {{ settled: {}, fulfilled: {}, rejected: {} }}",
            state.settled, state.fulfilled, state.rejected
        )
    }
}
