//! Message model: type ids, kinds, routing and the queued [`Envelope`].
//!
//! Three kinds of message flow through a [`MessageLoop`](crate::MessageLoop):
//!
//! - **Commands** are addressed to exactly one receiving system, bound when
//!   the command type is registered.
//! - **Events** carry the system that raised them and reach every other
//!   system plus all listeners.
//! - Generic **messages** are broadcast to every system.
//!
//! The payload inside an [`Envelope`] is only reachable through typed
//! accessors that downcast through [`Any`], so a type id can never be
//! reinterpreted as the wrong type.

use std::any::Any;
use std::fmt;

use crate::command::Command;
use crate::system::SystemTypeId;

/// Runtime id of a message type, unique within one loop, starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageTypeId(pub u32);

impl MessageTypeId {
    /// The unassigned id.
    pub const INVALID: MessageTypeId = MessageTypeId(0);

    /// Returns `true` for any assigned id.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }

    /// Dense index (`id - 1`), `None` for [`MessageTypeId::INVALID`].
    #[must_use]
    pub fn index(self) -> Option<usize> {
        self.0.checked_sub(1).map(|index| index as usize)
    }

    pub(crate) fn from_index(index: usize) -> Self {
        Self(u32::try_from(index + 1).unwrap_or(u32::MAX))
    }
}

impl fmt::Display for MessageTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Message category, fixing how a queued message is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Message,
    Event,
    Command,
}

/// Addressing of one queued or dispatched message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Generic message for every system.
    Broadcast,
    /// Event for every system except `source`; `None` when raised outside
    /// any system.
    Event { source: Option<SystemTypeId> },
    /// Command for exactly one system.
    Command { receiver: SystemTypeId },
}

impl Route {
    /// Message kind implied by the route.
    #[must_use]
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Broadcast => MessageKind::Message,
            Self::Event { .. } => MessageKind::Event,
            Self::Command { .. } => MessageKind::Command,
        }
    }
}

/// A generic broadcast message.
pub trait Message: Any {
    /// Process-unique type name.
    fn type_name() -> &'static str;
}

/// An event raised by a system.
pub trait Event: Any {
    /// Process-unique type name.
    fn type_name() -> &'static str;
}

/// A type-erased message together with its type id and route.
pub struct Envelope {
    type_id: MessageTypeId,
    type_name: &'static str,
    route: Route,
    payload: Box<dyn Any>,
}

impl Envelope {
    /// Wrap a generic message.
    #[must_use]
    pub fn message<M: Message>(type_id: MessageTypeId, message: M) -> Self {
        Self::new(type_id, M::type_name(), Route::Broadcast, message)
    }

    /// Wrap an event raised by `source`.
    #[must_use]
    pub fn event<E: Event>(type_id: MessageTypeId, source: Option<SystemTypeId>, event: E) -> Self {
        Self::new(type_id, E::type_name(), Route::Event { source }, event)
    }

    /// Wrap a command addressed to `receiver`.
    #[must_use]
    pub fn command<C: Command>(type_id: MessageTypeId, receiver: SystemTypeId, command: C) -> Self {
        Self::new(type_id, C::type_name(), Route::Command { receiver }, command)
    }

    fn new<T: Any>(type_id: MessageTypeId, type_name: &'static str, route: Route, payload: T) -> Self {
        Self {
            type_id,
            type_name,
            route,
            payload: Box::new(payload),
        }
    }

    /// The message's type id.
    #[must_use]
    pub fn message_type_id(&self) -> MessageTypeId {
        self.type_id
    }

    /// The message's type name.
    #[must_use]
    pub fn message_type_name(&self) -> &'static str {
        self.type_name
    }

    #[must_use]
    pub fn kind(&self) -> MessageKind {
        self.route.kind()
    }

    #[must_use]
    pub fn route(&self) -> Route {
        self.route
    }

    /// Raising system of an event.
    #[must_use]
    pub fn source(&self) -> Option<SystemTypeId> {
        match self.route {
            Route::Event { source } => source,
            _ => None,
        }
    }

    /// Receiving system of a command.
    #[must_use]
    pub fn receiver(&self) -> Option<SystemTypeId> {
        match self.route {
            Route::Command { receiver } => Some(receiver),
            _ => None,
        }
    }

    /// Returns `true` if the payload is a `T`.
    #[must_use]
    pub fn is<T: Any>(&self) -> bool {
        self.payload.is::<T>()
    }

    /// Command payload, `None` if this is not a `C` command.
    #[must_use]
    pub fn as_command<C: Command>(&self) -> Option<&C> {
        match self.route {
            Route::Command { .. } => self.payload.downcast_ref::<C>(),
            _ => None,
        }
    }

    /// Event payload, `None` if this is not an `E` event.
    #[must_use]
    pub fn as_event<E: Event>(&self) -> Option<&E> {
        match self.route {
            Route::Event { .. } => self.payload.downcast_ref::<E>(),
            _ => None,
        }
    }

    /// Generic message payload, `None` if this is not an `M` message.
    #[must_use]
    pub fn as_message<M: Message>(&self) -> Option<&M> {
        match self.route {
            Route::Broadcast => self.payload.downcast_ref::<M>(),
            _ => None,
        }
    }
}

impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Envelope")
            .field("type_id", &self.type_id)
            .field("type_name", &self.type_name)
            .field("route", &self.route)
            .finish_non_exhaustive()
    }
}
