//! Event listeners.
//!
//! Listeners are plain callbacks that see every event the loop dispatches,
//! queued or immediate, after all systems have. Their lifetime is independent
//! of any system.

use std::fmt;

use crate::message::{Envelope, MessageTypeId};

/// Handle of a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Callback invoked with the event's type id and envelope.
pub type ListenerFn = Box<dyn FnMut(MessageTypeId, &Envelope)>;

pub(crate) struct Listener {
    pub(crate) id: ListenerId,
    pub(crate) callback: ListenerFn,
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener").field("id", &self.id).finish_non_exhaustive()
    }
}
