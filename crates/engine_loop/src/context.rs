//! Execution context lent to a system while one of its hooks runs.

use crate::command::Command;
use crate::error::LoopError;
use crate::message::{Event, Message, MessageTypeId};
use crate::message_loop::MessageLoop;
use crate::system::{System, SystemTypeId};

/// Access to the owning [`MessageLoop`] from inside a [`System`] hook.
///
/// Everything a system sends through the context is attributed to it: events
/// carry it as their source and registered commands are addressed to it.
/// The running system itself is checked out of the loop for the duration of
/// the hook, so [`Context::find_system`] never returns it.
pub struct Context<'a> {
    message_loop: &'a mut MessageLoop,
    system: SystemTypeId,
}

impl<'a> Context<'a> {
    pub(crate) fn new(message_loop: &'a mut MessageLoop, system: SystemTypeId) -> Self {
        Self {
            message_loop,
            system,
        }
    }

    /// Id of the running system.
    #[must_use]
    pub fn system_id(&self) -> SystemTypeId {
        self.system
    }

    /// Read access to the loop.
    #[must_use]
    pub fn message_loop(&self) -> &MessageLoop {
        &*self.message_loop
    }

    /// Register command `C` with the running system as its receiver.
    pub fn register_command<C: Command>(&mut self) -> MessageTypeId {
        self.message_loop.register_command::<C>(self.system)
    }

    /// Register the name of event `E`.
    pub fn register_event<E: Event>(&mut self) -> MessageTypeId {
        self.message_loop.register_event::<E>()
    }

    /// Register the name of generic message `M`.
    pub fn register_message<M: Message>(&mut self) -> MessageTypeId {
        self.message_loop.register_message::<M>()
    }

    /// Deliver an event immediately to every other system and all listeners.
    pub fn dispatch_event<E: Event>(&mut self, event: E) {
        self.message_loop.dispatch_event(Some(self.system), event);
    }

    /// Queue an event for the next tick.
    pub fn enqueue_event<E: Event>(&mut self, event: E) {
        self.message_loop.enqueue_event(Some(self.system), event);
    }

    /// Queue a generic message for the next tick.
    pub fn enqueue_message<M: Message>(&mut self, message: M) {
        self.message_loop.enqueue_message(message);
    }

    /// Queue a command for its registered receiver.
    ///
    /// # Errors
    ///
    /// Returns [`LoopError::CommandNotRegistered`] if no system registered `C`.
    pub fn enqueue_command<C: Command>(&mut self, command: C) -> Result<(), LoopError> {
        self.message_loop.enqueue_command(command)
    }

    /// Queue a command given its type id and MessagePack payload.
    ///
    /// # Errors
    ///
    /// Fails if the type id has no factory or the payload does not decode.
    pub fn enqueue_command_raw(
        &mut self,
        type_id: MessageTypeId,
        data: &[u8],
    ) -> Result<(), LoopError> {
        self.message_loop.enqueue_command_raw(type_id, data)
    }

    /// Another system of type `T`.
    #[must_use]
    pub fn find_system<T: System>(&self) -> Option<&T> {
        self.message_loop.find_system::<T>()
    }

    /// Another system of type `T`, mutably.
    #[must_use]
    pub fn find_system_mut<T: System>(&mut self) -> Option<&mut T> {
        self.message_loop.find_system_mut::<T>()
    }

    /// Id of system type `T`, if registered.
    #[must_use]
    pub fn find_system_id<T: System>(&self) -> Option<SystemTypeId> {
        self.message_loop.find_system_id::<T>()
    }

    /// Type id of message type `M`, allocated on first use.
    pub fn message_type_id<M: 'static>(&mut self) -> MessageTypeId {
        self.message_loop.message_type_id::<M>()
    }
}
