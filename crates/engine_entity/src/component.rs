//! Core [`Component`] trait and component type identity.
//!
//! A component is a single typed facet of data attached to exactly one
//! entity. Any `'static` type can be a component once it names itself through
//! [`Component::type_name`].
//!
//! ## Type Identity
//!
//! [`ComponentTypeId`] is derived from the component's **string name** using
//! the FNV-1a 64-bit hash algorithm. The id is stable for the lifetime of the
//! process and does not depend on which code touches a component type first.
//! Typed lookups never go through the id: they downcast through
//! [`std::any::Any`], so an id/type mismatch cannot hand out the wrong type.

use std::any::Any;
use std::fmt;

use crate::entity::EntityId;

/// A unique identifier for a component type, derived from its string name
/// using the FNV-1a 64-bit hash algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentTypeId(pub u64);

impl ComponentTypeId {
    /// FNV-1a 64-bit offset basis.
    const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;

    /// FNV-1a 64-bit prime.
    const FNV_PRIME: u64 = 0x0100_0000_01b3;

    /// Compute the [`ComponentTypeId`] from a component's string name.
    ///
    /// ```text
    /// hash = 0xcbf29ce484222325
    /// for each byte in name.as_bytes():
    ///     hash = hash XOR byte
    ///     hash = hash * 0x00000100000001b3
    /// ```
    #[must_use]
    pub const fn from_name(name: &str) -> Self {
        let bytes = name.as_bytes();
        let mut hash = Self::FNV_OFFSET_BASIS;
        let mut i = 0;
        while i < bytes.len() {
            hash ^= bytes[i] as u64;
            hash = hash.wrapping_mul(Self::FNV_PRIME);
            i += 1;
        }
        Self(hash)
    }

    /// Compute the [`ComponentTypeId`] for a component type `T`.
    #[must_use]
    pub fn of<T: Component>() -> Self {
        Self::from_name(T::type_name())
    }
}

impl fmt::Display for ComponentTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

/// The core component trait.
///
/// # Examples
///
/// ```rust
/// use engine_entity::Component;
///
/// struct Health {
///     current: f32,
///     max: f32,
/// }
///
/// impl Component for Health {
///     fn type_name() -> &'static str { "Health" }
/// }
/// ```
pub trait Component: Any {
    /// A process-unique, human-readable name for this component type.
    fn type_name() -> &'static str;

    /// Returns the [`ComponentTypeId`] for this component.
    fn component_type_id() -> ComponentTypeId {
        ComponentTypeId::from_name(Self::type_name())
    }
}

/// A component instance owned by an entity, stored type-erased.
///
/// The slot remembers the id of the entity it was created for. Slots are
/// never shared or moved between entities.
pub struct ComponentSlot {
    type_id: ComponentTypeId,
    type_name: &'static str,
    entity: EntityId,
    value: Box<dyn Any>,
}

impl ComponentSlot {
    pub(crate) fn new<T: Component>(entity: EntityId, value: T) -> Self {
        Self {
            type_id: T::component_type_id(),
            type_name: T::type_name(),
            entity,
            value: Box::new(value),
        }
    }

    /// The component's type id.
    #[must_use]
    pub fn component_type_id(&self) -> ComponentTypeId {
        self.type_id
    }

    /// The component's type name.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Id of the entity this component belongs to.
    #[must_use]
    pub fn entity_id(&self) -> EntityId {
        self.entity
    }

    /// Returns `true` if the stored component is a `T`.
    #[must_use]
    pub fn is<T: Component>(&self) -> bool {
        self.value.is::<T>()
    }

    /// Typed shared access, `None` if the component is not a `T`.
    #[must_use]
    pub fn downcast_ref<T: Component>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Typed mutable access, `None` if the component is not a `T`.
    #[must_use]
    pub fn downcast_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.value.downcast_mut::<T>()
    }

    /// Unwrap the stored value, giving the slot back if it is not a `T`.
    pub fn into_inner<T: Component>(self) -> Result<T, Self> {
        match self.value.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(value) => Err(Self { value, ..self }),
        }
    }
}

impl fmt::Debug for ComponentSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentSlot")
            .field("type_id", &self.type_id)
            .field("type_name", &self.type_name)
            .field("entity", &self.entity)
            .finish_non_exhaustive()
    }
}
