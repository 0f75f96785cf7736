//! Commands and command factories.
//!
//! A command type is registered once per loop by its receiving system. The
//! registration stores a [`CommandFactory`] that binds the receiver and can
//! rebuild the command from MessagePack bytes, so callers holding only a
//! numeric type id can still enqueue it.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::codec;
use crate::error::LoopError;
use crate::message::{Envelope, MessageTypeId};
use crate::system::SystemTypeId;

/// A message addressed to exactly one system.
pub trait Command: Any + Serialize + DeserializeOwned {
    /// Process-unique type name.
    fn type_name() -> &'static str;
}

/// Builds command envelopes for one command type and one receiver.
pub trait CommandFactory: Any {
    /// The system every command from this factory is addressed to.
    fn receiver(&self) -> SystemTypeId;

    /// Type id of the produced command.
    fn message_type_id(&self) -> MessageTypeId;

    /// Type name of the produced command.
    fn message_type_name(&self) -> &'static str;

    /// Decode a command from MessagePack bytes.
    ///
    /// # Errors
    ///
    /// Returns [`LoopError::Decode`] if the bytes are not a valid command.
    fn create(&self, data: &[u8]) -> Result<Envelope, LoopError>;
}

/// [`CommandFactory`] for the concrete command type `C`.
pub struct TypedCommandFactory<C> {
    receiver: SystemTypeId,
    type_id: MessageTypeId,
    _command: PhantomData<fn() -> C>,
}

impl<C: Command> TypedCommandFactory<C> {
    #[must_use]
    pub fn new(receiver: SystemTypeId, type_id: MessageTypeId) -> Self {
        Self {
            receiver,
            type_id,
            _command: PhantomData,
        }
    }

    /// Address an already built command.
    #[must_use]
    pub fn wrap(&self, command: C) -> Envelope {
        Envelope::command(self.type_id, self.receiver, command)
    }
}

impl<C: Command> CommandFactory for TypedCommandFactory<C> {
    fn receiver(&self) -> SystemTypeId {
        self.receiver
    }

    fn message_type_id(&self) -> MessageTypeId {
        self.type_id
    }

    fn message_type_name(&self) -> &'static str {
        C::type_name()
    }

    fn create(&self, data: &[u8]) -> Result<Envelope, LoopError> {
        let command: C = codec::decode(data)?;
        Ok(self.wrap(command))
    }
}

impl<C: Command> fmt::Debug for TypedCommandFactory<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedCommandFactory")
            .field("command", &C::type_name())
            .field("receiver", &self.receiver)
            .field("type_id", &self.type_id)
            .finish()
    }
}
