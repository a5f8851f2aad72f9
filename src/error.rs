use crate::reason::Reason;

/// A rejected promise that still had no failure continuation when its
/// unhandled check ran.
///
/// Reports are recorded by the event loop (see
/// [`take_unhandled_rejections`](crate::take_unhandled_rejections)) and
/// withdrawn again if a `catch` handler attaches later.
#[derive(thiserror::Error, Clone, Debug)]
#[error("unhandled promise rejection (promise id={promise_id}): {reason}")]
pub struct UnhandledRejection {
    pub promise_id: usize,
    pub reason: Reason,
}
