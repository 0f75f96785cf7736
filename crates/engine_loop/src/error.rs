//! Message loop error types.

use crate::message::MessageTypeId;

/// Errors that can occur while wiring or running a [`MessageLoop`](crate::MessageLoop).
///
/// Apart from the codec variants these are configuration errors: they point
/// at a wiring bug and are meant to surface at startup.
#[derive(Debug, thiserror::Error)]
pub enum LoopError {
    /// Systems can only be created before [`MessageLoop::initialize`](crate::MessageLoop::initialize).
    #[error("cannot create system '{name}' after the message loop was initialized")]
    CreateAfterInitialize { name: &'static str },

    /// [`MessageLoop::initialize`](crate::MessageLoop::initialize) was called twice.
    #[error("message loop is already initialized")]
    AlreadyInitialized,

    /// [`MessageLoop::update`](crate::MessageLoop::update) was called before initialization.
    #[error("message loop is not initialized")]
    NotInitialized,

    /// A system of this type or name already exists.
    #[error("duplicate system '{name}'")]
    DuplicateSystem { name: &'static str },

    /// Some systems depend on systems that are missing or form a cycle.
    #[error("message loop contains systems with unresolved dependencies:\n{report}")]
    UnresolvedDependencies { report: String },

    /// No command factory is registered for this type id.
    #[error("no command factory registered for message type {0}")]
    UnknownCommandType(MessageTypeId),

    /// The command type was never registered by its receiving system.
    #[error("command '{name}' is not registered")]
    CommandNotRegistered { name: &'static str },

    /// Failed to encode a command payload to MessagePack.
    #[error("failed to encode command payload: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// Failed to decode a command payload from MessagePack.
    #[error("failed to decode command payload: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}
