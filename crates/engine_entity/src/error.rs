//! World error types.

use crate::entity::EntityId;

/// Errors raised by [`World`](crate::World) mutations.
///
/// All of them indicate a wiring or scene-data bug. Lookups that may
/// legitimately miss return `Option` instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    /// Entity id 0 is reserved as the invalid id.
    #[error("entity id 0 is reserved")]
    ZeroEntityId,

    /// Entities must be named.
    #[error("entity {0} has an empty name")]
    EmptyEntityName(EntityId),

    /// An entity with this id already exists.
    #[error("duplicate entity id {id} (existing entity '{name}')")]
    DuplicateEntityId { id: EntityId, name: String },

    /// An entity with this name already exists.
    #[error("duplicate entity name '{name}' for {requested} (already used by {existing})")]
    DuplicateEntityName {
        name: String,
        requested: EntityId,
        existing: EntityId,
    },

    /// No entity with this id exists.
    #[error("{0} not found")]
    EntityNotFound(EntityId),

    /// The entity already holds a component of this type.
    #[error("entity '{entity}' already has a component of type '{component}'")]
    DuplicateComponent {
        entity: String,
        component: &'static str,
    },

    /// The entity holds no component of this type.
    #[error("entity '{entity}' has no component of type '{component}'")]
    ComponentNotFound { entity: String, component: String },
}
