//! # engine_entity
//!
//! Entities, components and the world that owns them.
//!
//! This crate provides:
//!
//! - [`Component`] trait and [`ComponentTypeId`], a name-derived type id.
//! - [`Entity`]: a named bag of at most one component per type.
//! - [`World`]: owns entities and notifies [`WorldEntityObserver`]s about
//!   every entity and component-set change.
//! - [`EntityFilter`] primitives ([`AnyEntity`], [`ContainsAllComponents`],
//!   [`ContainsNoComponents`], [`CombineFilters`]).
//! - [`EntityGroup`]: an observer caching the entities that match a filter,
//!   updated incrementally from world notifications.

pub mod component;
pub mod entity;
pub mod error;
pub mod filter;
pub mod group;
pub mod observer;
pub mod world;

pub use component::{Component, ComponentSlot, ComponentTypeId};
pub use entity::{Entity, EntityId};
pub use error::WorldError;
pub use filter::{
    AnyEntity, CombineFilters, ComponentSet, ContainsAllComponents, ContainsNoComponents,
    EntityFilter,
};
pub use group::{EntityGroup, EntityGroupWithComponents, GroupEntry, GroupHooks};
pub use observer::{ComponentChange, ObserverHandle, ObserverId, WorldEntityObserver};
pub use world::{EntityMut, World};
