//! Incrementally maintained entity groups.
//!
//! An [`EntityGroup`] is a [`WorldEntityObserver`] that caches the entities
//! matching a static [`EntityFilter`]. Membership is re-evaluated for one
//! entity at a time, only when the world reports a change to that entity; the
//! world is never rescanned.
//!
//! Each cache entry stores the entity id plus the positions of the group's
//! [`ComponentSet`] inside the entity, refreshed on every notification, so
//! [`EntityGroup::iter`] can hand out typed component references without
//! searching.
//!
//! # Examples
//!
//! ```rust
//! use engine_entity::{Component, EntityGroupWithComponents, EntityId, World};
//!
//! struct Mesh;
//! impl Component for Mesh {
//!     fn type_name() -> &'static str { "Mesh" }
//! }
//!
//! let mut world = World::new();
//! let id = world.create_entity(EntityId(1), "Cube").unwrap();
//! world.create_component(id, Mesh).unwrap();
//!
//! let meshes = world.create_entity_observer(EntityGroupWithComponents::<(Mesh,)>::new());
//! assert_eq!(world.observer(meshes).unwrap().len(), 1);
//! ```

use std::fmt;
use std::marker::PhantomData;

use crate::entity::{Entity, EntityId};
use crate::filter::{ComponentSet, ContainsAllComponents, EntityFilter};
use crate::observer::{ComponentChange, WorldEntityObserver};
use crate::world::World;

/// Callbacks fired when an entity starts or stops matching a group's filter.
pub trait GroupHooks: 'static {
    /// Called after `entity` was appended to the group.
    fn on_group_entity_added(&mut self, _entity: &Entity) {}

    /// Called before `entity` is erased from the group because it no longer
    /// matches. Not called when the entity itself is being removed.
    fn on_group_entity_removed(&mut self, _entity: &Entity) {}
}

impl GroupHooks for () {}

/// One cached group member.
pub struct GroupEntry<C: ComponentSet> {
    entity: EntityId,
    slots: Option<C::Slots>,
}

impl<C: ComponentSet> GroupEntry<C> {
    /// Id of the cached entity.
    #[must_use]
    pub fn entity_id(&self) -> EntityId {
        self.entity
    }

    /// Component positions, `None` if the entity lacks part of the set.
    #[must_use]
    pub fn slots(&self) -> Option<C::Slots> {
        self.slots
    }
}

impl<C: ComponentSet> fmt::Debug for GroupEntry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupEntry")
            .field("entity", &self.entity)
            .field("slots", &self.slots)
            .finish()
    }
}

/// Cache of entities matching the filter `F`, exposing components `C`.
///
/// `H` receives the added/removed callbacks. The cache keeps insertion order
/// and holds each entity at most once.
///
/// Membership is also checked when an entity is created, so for filters that
/// match an empty entity (such as [`AnyEntity`](crate::AnyEntity)),
/// [`GroupHooks::on_group_entity_added`] fires before the entity has any
/// components.
pub struct EntityGroup<F, C: ComponentSet = (), H = ()> {
    entries: Vec<GroupEntry<C>>,
    hooks: H,
    _filter: PhantomData<fn() -> F>,
}

/// Group over every entity holding all components of `C`.
pub type EntityGroupWithComponents<C, H = ()> = EntityGroup<ContainsAllComponents<C>, C, H>;

impl<F, C, H> EntityGroup<F, C, H>
where
    F: EntityFilter,
    C: ComponentSet,
    H: GroupHooks,
{
    /// Create an empty group with default hooks.
    #[must_use]
    pub fn new() -> Self
    where
        H: Default,
    {
        Self::with_hooks(H::default())
    }

    /// Create an empty group with the given hooks.
    #[must_use]
    pub fn with_hooks(hooks: H) -> Self {
        Self {
            entries: Vec::new(),
            hooks,
            _filter: PhantomData,
        }
    }

    /// Number of cached entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no entity matches.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if the entity is cached.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.position(id).is_some()
    }

    /// Ids of all members in cache order.
    pub fn entity_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entries.iter().map(|entry| entry.entity)
    }

    /// Raw cache entries.
    #[must_use]
    pub fn entries(&self) -> &[GroupEntry<C>] {
        &self.entries
    }

    /// Members with typed component references, in cache order.
    ///
    /// Members whose components are not all present (possible with filters
    /// other than [`ContainsAllComponents<C>`]) are skipped.
    pub fn iter<'w>(
        &'w self,
        world: &'w World,
    ) -> impl Iterator<Item = (&'w Entity, C::Refs<'w>)> + 'w {
        self.entries.iter().filter_map(move |entry| {
            let entity = world.find_entity(entry.entity)?;
            let refs = C::fetch(entity, entry.slots?)?;
            Some((entity, refs))
        })
    }

    /// Typed component references of one member.
    #[must_use]
    pub fn get<'w>(&self, world: &'w World, id: EntityId) -> Option<C::Refs<'w>> {
        let entry = &self.entries[self.position(id)?];
        C::fetch(world.find_entity(id)?, entry.slots?)
    }

    /// The group's hooks.
    #[must_use]
    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    /// The group's hooks, mutably.
    #[must_use]
    pub fn hooks_mut(&mut self) -> &mut H {
        &mut self.hooks
    }

    fn position(&self, id: EntityId) -> Option<usize> {
        self.entries.iter().position(|entry| entry.entity == id)
    }

    fn update_membership(&mut self, entity: &Entity) {
        let position = self.position(entity.id());
        match (F::matches(entity), position) {
            (true, None) => {
                self.entries.push(GroupEntry {
                    entity: entity.id(),
                    slots: C::locate(entity),
                });
                self.hooks.on_group_entity_added(entity);
            }
            (true, Some(index)) => {
                self.entries[index].slots = C::locate(entity);
            }
            (false, Some(index)) => {
                self.hooks.on_group_entity_removed(entity);
                self.entries.remove(index);
            }
            (false, None) => {}
        }
    }
}

impl<F, C, H> Default for EntityGroup<F, C, H>
where
    F: EntityFilter,
    C: ComponentSet,
    H: GroupHooks + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<F, C, H> WorldEntityObserver for EntityGroup<F, C, H>
where
    F: EntityFilter,
    C: ComponentSet,
    H: GroupHooks,
{
    fn on_world_entity_created(&mut self, entity: &Entity) {
        // Filters such as `AnyEntity` already match a component-less entity.
        self.update_membership(entity);
    }

    fn on_world_entity_removing(&mut self, entity: &Entity) {
        if let Some(index) = self.position(entity.id()) {
            self.entries.remove(index);
        }
    }

    fn on_entity_components_modified(&mut self, entity: &Entity, _change: &ComponentChange<'_>) {
        self.update_membership(entity);
    }
}

impl<F, C: ComponentSet, H> fmt::Debug for EntityGroup<F, C, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityGroup")
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}
