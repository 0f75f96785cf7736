//! Per-loop runtime type ids.
//!
//! Message and system type ids are small integers handed out on first use,
//! starting at 1. Each [`MessageLoop`](crate::MessageLoop) owns its own
//! [`TypeRegistry`], so ids never leak between loops or between tests.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use crate::message::MessageTypeId;
use crate::system::SystemTypeId;

/// Allocates message and system type ids keyed by [`TypeId`].
#[derive(Debug)]
pub struct TypeRegistry {
    messages: HashMap<TypeId, MessageTypeId>,
    systems: HashMap<TypeId, SystemTypeId>,
    next_message: u32,
    next_system: u32,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self {
            messages: HashMap::new(),
            systems: HashMap::new(),
            next_message: 1,
            next_system: 1,
        }
    }
}

impl TypeRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of message type `M`, allocated on first call.
    pub fn message_type_id<M: Any>(&mut self) -> MessageTypeId {
        let next = &mut self.next_message;
        *self.messages.entry(TypeId::of::<M>()).or_insert_with(|| {
            let id = MessageTypeId(*next);
            *next += 1;
            id
        })
    }

    /// Id of system type `S`, allocated on first call.
    pub fn system_type_id<S: Any>(&mut self) -> SystemTypeId {
        let next = &mut self.next_system;
        *self.systems.entry(TypeId::of::<S>()).or_insert_with(|| {
            let id = SystemTypeId(*next);
            *next += 1;
            id
        })
    }

    /// Id of message type `M` if one was already allocated.
    #[must_use]
    pub fn find_message_type_id<M: Any>(&self) -> Option<MessageTypeId> {
        self.messages.get(&TypeId::of::<M>()).copied()
    }

    /// Id of system type `S` if one was already allocated.
    #[must_use]
    pub fn find_system_type_id<S: Any>(&self) -> Option<SystemTypeId> {
        self.systems.get(&TypeId::of::<S>()).copied()
    }

    /// Number of message types seen so far.
    #[must_use]
    pub fn message_type_count(&self) -> usize {
        self.messages.len()
    }
}
