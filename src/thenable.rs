//! The minimal "has a success-continuation registrar" capability.

use crate::promise::Promise;
use crate::smart::SmartPromise;
use std::fmt;

/// A value that can deliver a `T` to a success continuation, without
/// necessarily supporting failure continuations.
///
/// This is the minimal shape the settlement entry points know how to
/// chase: a full deferred ([`Promise`]) additionally exposes `catch`, and
/// is adopted through [`Resolution::Deferred`](crate::Resolution) /
/// [`Rejection::Deferred`](crate::Rejection) instead. A `Thenable` that
/// never fires leaves its subscriber pending forever.
pub trait Thenable<T> {
    /// Register the one success continuation this subscription cares
    /// about. Implementations decide when (or whether) it fires.
    fn subscribe(self: Box<Self>, on_value: Box<dyn FnOnce(T)>);
}

impl<T: Clone + fmt::Debug + 'static> Thenable<T> for Promise<T> {
    fn subscribe(self: Box<Self>, on_value: Box<dyn FnOnce(T)>) {
        self.then(on_value);
    }
}

impl<T: Clone + fmt::Debug + 'static> Thenable<T> for SmartPromise<T> {
    fn subscribe(self: Box<Self>, on_value: Box<dyn FnOnce(T)>) {
        self.then(on_value);
    }
}
