//! Opaque rejection payloads.
//!
//! A rejection reason is caller-supplied and never interpreted by the
//! promise machinery itself. `Reason` carries an arbitrary value behind a
//! cheap clonable handle together with a rendering captured at
//! construction time, so diagnostics (logging, unhandled-rejection
//! reports) stay readable without constraining how callers type their
//! failures.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// An opaque, caller-supplied rejection payload.
///
/// Cloning is cheap (the payload is shared). Typed access goes through
/// [`Reason::downcast_ref`]; the machinery itself never looks inside.
#[derive(Clone)]
pub struct Reason {
    payload: Rc<dyn Any>,
    repr: Rc<str>,
}

impl Reason {
    /// Wrap an arbitrary value as a rejection reason.
    pub fn new<R: Any + fmt::Debug>(payload: R) -> Self {
        let repr = format!("{payload:?}").into();
        Reason {
            payload: Rc::new(payload),
            repr,
        }
    }

    /// Borrow the payload as `R` if that is what was stored.
    pub fn downcast_ref<R: Any>(&self) -> Option<&R> {
        self.payload.downcast_ref()
    }

    /// Whether the payload is an `R`.
    pub fn is<R: Any>(&self) -> bool {
        self.payload.is::<R>()
    }
}

impl fmt::Debug for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Reason({})", self.repr)
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr)
    }
}
