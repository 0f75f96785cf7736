//! Entity identifiers and the per-entity component container.
//!
//! An [`Entity`] is a named, id-tagged bag of components owned by a
//! [`World`](crate::World). Entities are created and destroyed only through
//! the world, and their component *set* only changes through the world so
//! that every registered observer hears about it.

use std::fmt;

use crate::component::{Component, ComponentSlot, ComponentTypeId};

/// A unique entity identifier within a [`World`](crate::World).
///
/// Ids are chosen by the caller (scene data usually carries them) and must be
/// non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u32);

impl EntityId {
    /// The null / invalid entity sentinel.
    pub const INVALID: EntityId = EntityId(0);

    /// Create an entity id from a raw `u32`.
    #[must_use]
    pub const fn from_raw(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw `u32` identifier.
    #[must_use]
    pub const fn id(self) -> u32 {
        self.0
    }

    /// Returns `true` if this is a valid (non-zero) id.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl From<u32> for EntityId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

/// Collection of components with a unique id and name in a world.
///
/// An entity holds at most one component of each concrete type. Components
/// are kept in insertion order.
#[derive(Debug)]
pub struct Entity {
    id: EntityId,
    name: String,
    components: Vec<ComponentSlot>,
}

impl Entity {
    pub(crate) fn new(id: EntityId, name: String) -> Self {
        Self {
            id,
            name,
            components: Vec::new(),
        }
    }

    /// Entity id, unique in its world.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Entity name, unique in its world.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All components in insertion order.
    #[must_use]
    pub fn components(&self) -> &[ComponentSlot] {
        &self.components
    }

    /// Number of components attached.
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Find the component of type `T`.
    #[must_use]
    pub fn find_component<T: Component>(&self) -> Option<&T> {
        self.components.iter().find_map(|slot| slot.downcast_ref::<T>())
    }

    /// Find the component of type `T` for in-place modification.
    ///
    /// Changing a component's data does not change the entity's component
    /// set, so observers are not notified.
    #[must_use]
    pub fn find_component_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.components
            .iter_mut()
            .find_map(|slot| slot.downcast_mut::<T>())
    }

    /// Returns `true` if a component of type `T` is attached.
    #[must_use]
    pub fn has_component<T: Component>(&self) -> bool {
        self.components.iter().any(|slot| slot.is::<T>())
    }

    /// Find a component by type id.
    #[must_use]
    pub fn find_component_by_id(&self, type_id: ComponentTypeId) -> Option<&ComponentSlot> {
        self.components
            .iter()
            .find(|slot| slot.component_type_id() == type_id)
    }

    /// Find a component by type name. Linear search.
    #[must_use]
    pub fn find_component_by_name(&self, type_name: &str) -> Option<&ComponentSlot> {
        self.components
            .iter()
            .find(|slot| slot.type_name() == type_name)
    }

    /// Position of the `T` component in [`Entity::components`].
    #[must_use]
    pub fn component_index<T: Component>(&self) -> Option<usize> {
        self.components.iter().position(|slot| slot.is::<T>())
    }

    /// Typed access to the component stored at `index`.
    #[must_use]
    pub fn component_at<T: Component>(&self, index: usize) -> Option<&T> {
        self.components.get(index)?.downcast_ref::<T>()
    }

    pub(crate) fn push_component(&mut self, slot: ComponentSlot) {
        self.components.push(slot);
    }

    pub(crate) fn take_component(&mut self, type_id: ComponentTypeId) -> Option<ComponentSlot> {
        let index = self
            .components
            .iter()
            .position(|slot| slot.component_type_id() == type_id)?;
        Some(self.components.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Position(f32);

    impl Component for Position {
        fn type_name() -> &'static str {
            "Position"
        }
    }

    struct Tag;

    impl Component for Tag {
        fn type_name() -> &'static str {
            "Tag"
        }
    }

    fn make_entity() -> Entity {
        let mut entity = Entity::new(EntityId(3), "Player".to_string());
        entity.push_component(ComponentSlot::new(entity.id(), Position(1.5)));
        entity.push_component(ComponentSlot::new(entity.id(), Tag));
        entity
    }

    #[test]
    fn test_entity_id() {
        let id = EntityId::from_raw(42);
        assert_eq!(id.id(), 42);
        assert!(id.is_valid());
        assert!(!EntityId::INVALID.is_valid());
        assert_eq!(id.to_string(), "Entity(42)");
    }

    #[test]
    fn test_find_component() {
        let entity = make_entity();
        assert_eq!(entity.find_component::<Position>().unwrap().0, 1.5);
        assert!(entity.has_component::<Tag>());
        assert_eq!(entity.component_count(), 2);
    }

    #[test]
    fn test_find_component_by_id_and_name() {
        let entity = make_entity();
        let slot = entity
            .find_component_by_id(Position::component_type_id())
            .unwrap();
        assert_eq!(slot.type_name(), "Position");
        assert_eq!(slot.entity_id(), EntityId(3));
        assert!(entity.find_component_by_name("Tag").is_some());
        assert!(entity.find_component_by_name("Missing").is_none());
    }

    #[test]
    fn test_component_index_tracks_removal() {
        let mut entity = make_entity();
        assert_eq!(entity.component_index::<Tag>(), Some(1));
        let removed = entity.take_component(Position::component_type_id());
        assert!(removed.is_some());
        assert_eq!(entity.component_index::<Tag>(), Some(0));
        assert!(entity.component_at::<Tag>(0).is_some());
        assert!(entity.component_at::<Position>(0).is_none());
    }

    #[test]
    fn test_find_component_mut() {
        let mut entity = make_entity();
        entity.find_component_mut::<Position>().unwrap().0 = 9.0;
        assert_eq!(entity.find_component::<Position>().unwrap().0, 9.0);
    }
}
