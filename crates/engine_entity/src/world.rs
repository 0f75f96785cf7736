//! The [`World`]: owner of all entities and observers of a scene.
//!
//! Every change to the entity set or to an entity's component set goes
//! through the world, which forwards it synchronously to each registered
//! [`WorldEntityObserver`] in registration order. Observers borrow the world's
//! entities immutably during a notification, so they can never mutate the
//! structure that is notifying them.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, trace, warn};

use crate::component::{Component, ComponentSlot, ComponentTypeId};
use crate::entity::{Entity, EntityId};
use crate::error::WorldError;
use crate::filter::{ComponentSet, ContainsAllComponents, EntityFilter};
use crate::observer::{ComponentChange, ObserverHandle, ObserverId, WorldEntityObserver};

struct ObserverSlot {
    id: ObserverId,
    observer: Box<dyn WorldEntityObserver>,
}

/// Container of entities and their observers.
///
/// Entities are keyed by id and iterated in ascending id order.
#[derive(Default)]
pub struct World {
    entities: BTreeMap<EntityId, Entity>,
    observers: Vec<ObserverSlot>,
    max_entity_id: u32,
    next_observer_id: u64,
}

impl World {
    /// Create an empty world.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an entity with a caller-chosen, non-zero id and a unique name.
    ///
    /// Observers receive `on_world_entity_created` before this returns.
    ///
    /// # Errors
    ///
    /// Fails if `id` is zero, `name` is empty, or either is already taken.
    pub fn create_entity(
        &mut self,
        id: EntityId,
        name: impl Into<String>,
    ) -> Result<EntityId, WorldError> {
        let name = name.into();
        if let Err(err) = self.check_new_entity(id, &name) {
            warn!(entity = %id, name = %name, error = %err, "rejected entity");
            return Err(err);
        }

        self.max_entity_id = self.max_entity_id.max(id.0);
        let entity = self
            .entities
            .entry(id)
            .or_insert_with(|| Entity::new(id, name));
        debug!(entity = %id, name = entity.name(), "entity created");

        for slot in &mut self.observers {
            slot.observer.on_world_entity_created(entity);
        }
        Ok(id)
    }

    fn check_new_entity(&self, id: EntityId, name: &str) -> Result<(), WorldError> {
        if !id.is_valid() {
            return Err(WorldError::ZeroEntityId);
        }
        if name.is_empty() {
            return Err(WorldError::EmptyEntityName(id));
        }
        if let Some(existing) = self.entities.get(&id) {
            return Err(WorldError::DuplicateEntityId {
                id,
                name: existing.name().to_string(),
            });
        }
        if let Some(existing) = self.find_entity_by_name(name) {
            return Err(WorldError::DuplicateEntityName {
                name: name.to_string(),
                requested: id,
                existing: existing.id(),
            });
        }
        Ok(())
    }

    /// Remove an entity and all of its components.
    ///
    /// Observers receive `on_world_entity_removing` while the entity is still
    /// intact. Returns `false` if no such entity exists.
    pub fn remove_entity(&mut self, id: EntityId) -> bool {
        let Some(entity) = self.entities.get(&id) else {
            return false;
        };
        for slot in &mut self.observers {
            slot.observer.on_world_entity_removing(entity);
        }
        if let Some(entity) = self.entities.remove(&id) {
            debug!(
                entity = %id,
                name = entity.name(),
                components = entity.component_count(),
                "entity removed"
            );
        }
        true
    }

    /// Find an entity by id.
    #[must_use]
    pub fn find_entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Find an entity by id for component data modification.
    #[must_use]
    pub fn find_entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Find an entity by name. Linear search.
    #[must_use]
    pub fn find_entity_by_name(&self, name: &str) -> Option<&Entity> {
        self.entities.values().find(|entity| entity.name() == name)
    }

    /// Mutable entity view for changing its component set.
    #[must_use]
    pub fn entity_mut(&mut self, id: EntityId) -> Option<EntityMut<'_>> {
        if !self.entities.contains_key(&id) {
            return None;
        }
        Some(EntityMut { world: self, id })
    }

    /// All entities in ascending id order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Number of entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Highest entity id ever created. Never decreases, even when that entity
    /// is removed.
    #[must_use]
    pub fn max_entity_id(&self) -> EntityId {
        EntityId(self.max_entity_id)
    }

    /// Attach a component to an entity.
    ///
    /// # Errors
    ///
    /// Fails if the entity does not exist or already holds a `T`.
    pub fn create_component<T: Component>(
        &mut self,
        id: EntityId,
        component: T,
    ) -> Result<(), WorldError> {
        let entity = self
            .entities
            .get_mut(&id)
            .ok_or(WorldError::EntityNotFound(id))?;
        if entity.find_component_by_id(T::component_type_id()).is_some() {
            let err = WorldError::DuplicateComponent {
                entity: entity.name().to_string(),
                component: T::type_name(),
            };
            warn!(entity = %id, error = %err, "rejected component");
            return Err(err);
        }

        entity.push_component(ComponentSlot::new(id, component));
        trace!(entity = %id, component = T::type_name(), "component created");

        let change = ComponentChange::Added {
            type_id: T::component_type_id(),
            type_name: T::type_name(),
        };
        notify_modified(&mut self.observers, entity, &change);
        Ok(())
    }

    /// Detach the `T` component from an entity and return it.
    ///
    /// # Errors
    ///
    /// Fails if the entity does not exist or holds no `T`.
    pub fn remove_component<T: Component>(&mut self, id: EntityId) -> Result<T, WorldError> {
        let entity = self
            .entities
            .get(&id)
            .ok_or(WorldError::EntityNotFound(id))?;
        let not_found = WorldError::ComponentNotFound {
            entity: entity.name().to_string(),
            component: T::type_name().to_string(),
        };
        if !entity.has_component::<T>() {
            return Err(not_found);
        }

        self.remove_component_by_id(id, T::component_type_id())?
            .into_inner::<T>()
            .map_err(|_| not_found)
    }

    /// Detach a component by type id and return it type-erased.
    ///
    /// Observers see the detached component through
    /// [`ComponentChange::Removed`]; the entity no longer lists it at that
    /// point.
    ///
    /// # Errors
    ///
    /// Fails if the entity does not exist or holds no such component.
    pub fn remove_component_by_id(
        &mut self,
        id: EntityId,
        type_id: ComponentTypeId,
    ) -> Result<ComponentSlot, WorldError> {
        let entity = self
            .entities
            .get_mut(&id)
            .ok_or(WorldError::EntityNotFound(id))?;
        let Some(slot) = entity.take_component(type_id) else {
            return Err(WorldError::ComponentNotFound {
                entity: entity.name().to_string(),
                component: type_id.to_string(),
            });
        };
        trace!(entity = %id, component = slot.type_name(), "component removed");

        notify_modified(&mut self.observers, entity, &ComponentChange::Removed(&slot));
        Ok(slot)
    }

    /// Register an observer.
    ///
    /// The observer first receives `on_entity_components_modified` with
    /// [`ComponentChange::Replayed`] for every existing entity, then joins the
    /// notification list.
    pub fn create_entity_observer<T: WorldEntityObserver>(
        &mut self,
        mut observer: T,
    ) -> ObserverHandle<T> {
        for entity in self.entities.values() {
            observer.on_entity_components_modified(entity, &ComponentChange::Replayed);
        }

        let id = ObserverId(self.next_observer_id);
        self.next_observer_id += 1;
        self.observers.push(ObserverSlot {
            id,
            observer: Box::new(observer),
        });
        debug!(
            observer = id.0,
            kind = std::any::type_name::<T>(),
            replayed = self.entities.len(),
            "entity observer registered"
        );
        ObserverHandle::new(id)
    }

    /// Detach an observer. Returns `false` if it was not registered.
    pub fn remove_entity_observer(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|slot| slot.id != id);
        before != self.observers.len()
    }

    /// Typed access to a registered observer.
    #[must_use]
    pub fn observer<T: WorldEntityObserver>(&self, handle: ObserverHandle<T>) -> Option<&T> {
        let slot = self.observers.iter().find(|slot| slot.id == handle.id())?;
        let observer: &dyn Any = &*slot.observer;
        observer.downcast_ref::<T>()
    }

    /// Typed mutable access to a registered observer.
    #[must_use]
    pub fn observer_mut<T: WorldEntityObserver>(
        &mut self,
        handle: ObserverHandle<T>,
    ) -> Option<&mut T> {
        let slot = self
            .observers
            .iter_mut()
            .find(|slot| slot.id == handle.id())?;
        let observer: &mut dyn Any = &mut *slot.observer;
        observer.downcast_mut::<T>()
    }

    /// Number of registered observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Ids of every entity matching `F`, by full scan.
    #[must_use]
    pub fn filter_entities<F: EntityFilter>(&self) -> Vec<EntityId> {
        self.entities
            .values()
            .filter(|entity| F::matches(entity))
            .map(Entity::id)
            .collect()
    }

    /// Ids of every entity holding all components of `C`, by full scan.
    #[must_use]
    pub fn filter_entities_with_components<C: ComponentSet>(&self) -> Vec<EntityId> {
        self.filter_entities::<ContainsAllComponents<C>>()
    }
}

fn notify_modified(observers: &mut [ObserverSlot], entity: &Entity, change: &ComponentChange<'_>) {
    for slot in observers {
        slot.observer.on_entity_components_modified(entity, change);
    }
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("entities", &self.entities.len())
            .field("observers", &self.observers.len())
            .field("max_entity_id", &self.max_entity_id)
            .finish()
    }
}

/// Borrowed view of one entity that can change its component set.
pub struct EntityMut<'w> {
    world: &'w mut World,
    id: EntityId,
}

impl EntityMut<'_> {
    /// The entity's id.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Attach a component, chaining.
    ///
    /// # Errors
    ///
    /// Fails if the entity already holds a `T`.
    pub fn insert<T: Component>(&mut self, component: T) -> Result<&mut Self, WorldError> {
        self.world.create_component(self.id, component)?;
        Ok(self)
    }

    /// Detach the `T` component and return it.
    ///
    /// # Errors
    ///
    /// Fails if the entity holds no `T`.
    pub fn remove<T: Component>(&mut self) -> Result<T, WorldError> {
        self.world.remove_component::<T>(self.id)
    }

    /// Typed component access.
    #[must_use]
    pub fn get<T: Component>(&self) -> Option<&T> {
        self.world.find_entity(self.id)?.find_component::<T>()
    }

    /// Typed mutable component access.
    #[must_use]
    pub fn get_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.world.find_entity_mut(self.id)?.find_component_mut::<T>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{AnyEntity, ContainsNoComponents};

    #[derive(Debug, PartialEq)]
    struct Transform(f32);
    #[derive(Debug, PartialEq)]
    struct Camera;

    impl Component for Transform {
        fn type_name() -> &'static str {
            "Transform"
        }
    }

    impl Component for Camera {
        fn type_name() -> &'static str {
            "Camera"
        }
    }

    /// Records every callback as a string.
    #[derive(Default)]
    struct Recorder {
        log: Vec<String>,
    }

    impl WorldEntityObserver for Recorder {
        fn on_world_entity_created(&mut self, entity: &Entity) {
            self.log.push(format!("created {}", entity.name()));
        }

        fn on_world_entity_removing(&mut self, entity: &Entity) {
            self.log.push(format!(
                "removing {} with {}",
                entity.name(),
                entity.component_count()
            ));
        }

        fn on_entity_components_modified(&mut self, entity: &Entity, change: &ComponentChange<'_>) {
            let what = match change {
                ComponentChange::Added { type_name, .. } => format!("+{type_name}"),
                ComponentChange::Removed(slot) => format!("-{}", slot.type_name()),
                ComponentChange::Replayed => "replayed".to_string(),
            };
            self.log.push(format!("{} {what}", entity.name()));
        }
    }

    #[test]
    fn test_create_and_find_entity() {
        let mut world = World::new();
        let id = world.create_entity(EntityId(7), "Player").unwrap();
        let by_id = world.find_entity(id).unwrap();
        let by_name = world.find_entity_by_name("Player").unwrap();
        assert!(std::ptr::eq(by_id, by_name));
        assert_eq!(by_id.id(), EntityId(7));
        assert_eq!(world.entity_count(), 1);
    }

    #[test]
    fn test_create_entity_rejects_invalid_input() {
        let mut world = World::new();
        world.create_entity(EntityId(1), "A").unwrap();

        assert_eq!(
            world.create_entity(EntityId(1), "B"),
            Err(WorldError::DuplicateEntityId {
                id: EntityId(1),
                name: "A".to_string()
            })
        );
        assert!(matches!(
            world.create_entity(EntityId(2), "A"),
            Err(WorldError::DuplicateEntityName { existing, .. }) if existing == EntityId(1)
        ));
        assert_eq!(
            world.create_entity(EntityId(0), "Zero"),
            Err(WorldError::ZeroEntityId)
        );
        assert_eq!(
            world.create_entity(EntityId(3), ""),
            Err(WorldError::EmptyEntityName(EntityId(3)))
        );
        assert_eq!(world.entity_count(), 1);
    }

    #[test]
    fn test_max_entity_id_is_monotonic() {
        let mut world = World::new();
        world.create_entity(EntityId(9), "Far").unwrap();
        world.create_entity(EntityId(2), "Near").unwrap();
        assert_eq!(world.max_entity_id(), EntityId(9));
        assert!(world.remove_entity(EntityId(9)));
        assert_eq!(world.max_entity_id(), EntityId(9));
    }

    #[test]
    fn test_remove_entity() {
        let mut world = World::new();
        world.create_entity(EntityId(1), "A").unwrap();
        assert!(world.remove_entity(EntityId(1)));
        assert!(!world.remove_entity(EntityId(1)));
        assert!(world.find_entity(EntityId(1)).is_none());
        assert!(world.find_entity_by_name("A").is_none());
    }

    #[test]
    fn test_components() {
        let mut world = World::new();
        let id = world.create_entity(EntityId(1), "A").unwrap();
        world.create_component(id, Transform(1.0)).unwrap();

        assert!(matches!(
            world.create_component(id, Transform(2.0)),
            Err(WorldError::DuplicateComponent { component: "Transform", .. })
        ));
        assert!(matches!(
            world.remove_component::<Camera>(id),
            Err(WorldError::ComponentNotFound { .. })
        ));
        assert_eq!(
            world.create_component(EntityId(5), Camera),
            Err(WorldError::EntityNotFound(EntityId(5)))
        );

        world.find_entity_mut(id).unwrap().find_component_mut::<Transform>().unwrap().0 = 4.0;
        assert_eq!(world.remove_component::<Transform>(id), Ok(Transform(4.0)));
        assert_eq!(world.find_entity(id).unwrap().component_count(), 0);
    }

    #[test]
    fn test_observer_notification_order() {
        let mut world = World::new();
        world.create_entity(EntityId(1), "A").unwrap();
        world.create_component(EntityId(1), Camera).unwrap();
        let handle = world.create_entity_observer(Recorder::default());

        world.create_entity(EntityId(2), "B").unwrap();
        world.create_component(EntityId(2), Transform(0.0)).unwrap();
        world.remove_component::<Transform>(EntityId(2)).unwrap();
        world.remove_entity(EntityId(1));

        assert_eq!(
            world.observer(handle).unwrap().log,
            vec![
                "A replayed",
                "created B",
                "B +Transform",
                "B -Transform",
                "removing A with 1",
            ]
        );
    }

    #[test]
    fn test_removed_component_visible_during_notification() {
        #[derive(Default)]
        struct LastTransform(Option<f32>);

        impl WorldEntityObserver for LastTransform {
            fn on_entity_components_modified(&mut self, entity: &Entity, change: &ComponentChange<'_>) {
                if let ComponentChange::Removed(slot) = change {
                    assert!(!entity.has_component::<Transform>());
                    self.0 = slot.downcast_ref::<Transform>().map(|t| t.0);
                }
            }
        }

        let mut world = World::new();
        let id = world.create_entity(EntityId(1), "A").unwrap();
        world.create_component(id, Transform(3.5)).unwrap();
        let handle = world.create_entity_observer(LastTransform::default());

        let slot = world
            .remove_component_by_id(id, Transform::component_type_id())
            .unwrap();
        assert_eq!(slot.entity_id(), id);
        assert_eq!(world.observer(handle).unwrap().0, Some(3.5));
    }

    #[test]
    fn test_remove_entity_observer() {
        let mut world = World::new();
        let handle = world.create_entity_observer(Recorder::default());
        assert_eq!(world.observer_count(), 1);
        assert!(world.remove_entity_observer(handle.id()));
        assert!(!world.remove_entity_observer(handle.id()));
        assert!(world.observer(handle).is_none());
        world.create_entity(EntityId(1), "A").unwrap();
    }

    #[test]
    fn test_observer_mut() {
        let mut world = World::new();
        let handle = world.create_entity_observer(Recorder::default());
        world.create_entity(EntityId(1), "A").unwrap();
        world.observer_mut(handle).unwrap().log.clear();
        assert!(world.observer(handle).unwrap().log.is_empty());
    }

    #[test]
    fn test_filter_entities() {
        let mut world = World::new();
        world.create_entity(EntityId(1), "A").unwrap();
        world.create_entity(EntityId(2), "B").unwrap();
        world.create_component(EntityId(2), Camera).unwrap();

        assert_eq!(world.filter_entities::<AnyEntity>(), vec![EntityId(1), EntityId(2)]);
        assert_eq!(
            world.filter_entities_with_components::<(Camera,)>(),
            vec![EntityId(2)]
        );
        assert_eq!(
            world.filter_entities::<ContainsNoComponents<(Camera,)>>(),
            vec![EntityId(1)]
        );
    }

    #[test]
    fn test_entity_mut() {
        let mut world = World::new();
        let id = world.create_entity(EntityId(1), "A").unwrap();
        let mut entity = world.entity_mut(id).unwrap();
        entity.insert(Transform(1.0)).unwrap().insert(Camera).unwrap();
        entity.get_mut::<Transform>().unwrap().0 = 2.0;
        assert_eq!(entity.get::<Transform>(), Some(&Transform(2.0)));
        assert_eq!(entity.remove::<Camera>(), Ok(Camera));
        assert!(world.entity_mut(EntityId(9)).is_none());
    }
}
