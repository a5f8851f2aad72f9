//! # smart-promise
//!
//! A deferred value that behaves like a promise but can be settled from
//! *outside* its executor and inspected synchronously:
//!
//! - [`Promise`]: the base primitive. Exactly-once settlement, `then`/
//!   `catch` continuation registrars, continuations dispatched through a
//!   thread-local task queue ([`run_event_loop`]) after the settling call
//!   unwinds, in registration order.
//! - [`SmartPromise`]: the wrapper. Its `resolve`/`reject` entry points
//!   ([`Resolver`]/[`Rejecter`]) are usable from any context, chase nested
//!   deferred/thenable values ([`Resolution`]/[`Rejection`], [`Thenable`])
//!   down to a concrete outcome, and mirror the settlement into flags and
//!   payload slots readable without blocking (`is_settled`,
//!   `is_fulfilled`, `is_rejected`, `value`, `reason`).
//!
//! Rejection payloads are opaque [`Reason`] values. A rejection that never
//! gets a handler is logged and recorded; see
//! [`take_unhandled_rejections`].

pub(crate) mod error;
pub(crate) mod promise;
pub(crate) mod reason;
pub(crate) mod smart;
pub(crate) mod task;
pub(crate) mod thenable;

pub use error::UnhandledRejection;
pub use promise::Promise;
pub use reason::Reason;
pub use smart::{Rejecter, Rejection, Resolution, Resolver, SmartPromise};
pub use task::{pending_task_count, reset_event_loop, run_event_loop, take_unhandled_rejections};
pub use thenable::Thenable;
