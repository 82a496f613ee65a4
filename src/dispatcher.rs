//! The single external entry point into a session.

use crate::error::{Result, TrackerError};
use crate::session::{Session, SharedSession};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tracing::debug;

/// Pushes map changes into one live session.
///
/// Holds a non-owning reference: the session is owned by whoever created
/// it, and dispatching after it has been dropped fails with
/// [`TrackerError::SessionClosed`]. Cloning yields another handle to the
/// same session.
#[derive(Clone)]
pub struct Dispatcher {
    session: Weak<Mutex<Session>>,
}

impl Dispatcher {
    pub(crate) fn new(session: &SharedSession) -> Self {
        Self {
            session: Arc::downgrade(session),
        }
    }

    /// Dispatch a new map value to the bound session.
    ///
    /// Any string is accepted, including empty and repeated values.
    pub fn dispatch(&self, value: &str) -> Result<()> {
        let session = self.session.upgrade().ok_or(TrackerError::SessionClosed)?;
        debug!(value, "dispatch");
        session.lock().dispatch(value);
        Ok(())
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("live", &(self.session.strong_count() > 0))
            .finish()
    }
}
