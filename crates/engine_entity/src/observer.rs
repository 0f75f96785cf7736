//! World entity observers.
//!
//! An observer is owned by the [`World`](crate::World) and receives three
//! lifecycle callbacks, always synchronously and in registration order:
//!
//! 1. [`WorldEntityObserver::on_world_entity_created`] after an entity was
//!    inserted.
//! 2. [`WorldEntityObserver::on_entity_components_modified`] after a component
//!    was added to or removed from an entity.
//! 3. [`WorldEntityObserver::on_world_entity_removing`] before an entity is
//!    destroyed, while it and its components are still intact.
//!
//! Observers only ever see `&Entity`; they cannot mutate the world from
//! inside a notification.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;

use crate::component::{ComponentSlot, ComponentTypeId};
use crate::entity::Entity;

/// What changed in an entity's component set.
#[derive(Debug)]
pub enum ComponentChange<'a> {
    /// A component was appended to the entity.
    Added {
        type_id: ComponentTypeId,
        type_name: &'static str,
    },
    /// A component was detached from the entity.
    ///
    /// The entity no longer lists it, but its final state is readable here
    /// for the duration of the notification.
    Removed(&'a ComponentSlot),
    /// The observer is being populated with an already existing entity.
    Replayed,
}

impl ComponentChange<'_> {
    /// Type id of the added or removed component.
    #[must_use]
    pub fn type_id(&self) -> Option<ComponentTypeId> {
        match self {
            Self::Added { type_id, .. } => Some(*type_id),
            Self::Removed(slot) => Some(slot.component_type_id()),
            Self::Replayed => None,
        }
    }
}

/// Receives entity lifecycle notifications from a [`World`](crate::World).
pub trait WorldEntityObserver: Any {
    /// Called after an entity has been created. It has no components yet.
    fn on_world_entity_created(&mut self, _entity: &Entity) {}

    /// Called before an entity is destroyed.
    fn on_world_entity_removing(&mut self, _entity: &Entity) {}

    /// Called after the entity's component set changed, and once per existing
    /// entity when the observer is registered.
    fn on_entity_components_modified(&mut self, _entity: &Entity, _change: &ComponentChange<'_>) {
    }
}

/// Identifier of an observer registered with a world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(pub u64);

/// Typed handle returned by
/// [`World::create_entity_observer`](crate::World::create_entity_observer).
pub struct ObserverHandle<T> {
    id: ObserverId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ObserverHandle<T> {
    pub(crate) fn new(id: ObserverId) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    /// Untyped observer id.
    #[must_use]
    pub fn id(&self) -> ObserverId {
        self.id
    }
}

impl<T> Clone for ObserverHandle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ObserverHandle<T> {}

impl<T> PartialEq for ObserverHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for ObserverHandle<T> {}

impl<T> fmt::Debug for ObserverHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ObserverHandle").field(&self.id.0).finish()
    }
}
