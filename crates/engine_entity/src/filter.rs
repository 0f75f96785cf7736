//! Static entity filters and component sets.
//!
//! Filters are stateless predicates over an entity's current component set.
//! They are types, not values, so a group's membership rule is fixed at
//! compile time:
//!
//! - [`AnyEntity`] matches every entity.
//! - [`ContainsAllComponents<(A, B)>`] matches entities holding both `A` and `B`.
//! - [`ContainsNoComponents<(A, B)>`] matches entities holding neither.
//! - [`CombineFilters<(F1, F2)>`] matches when every inner filter matches.
//!
//! A [`ComponentSet`] is a tuple of component types. Besides the `contains`
//! predicates it knows how to locate its components inside an entity and
//! hand back typed references, which is what entity groups cache.

use std::fmt;
use std::marker::PhantomData;

use crate::component::{Component, ComponentTypeId};
use crate::entity::Entity;

/// A stateless predicate over an entity's component set.
pub trait EntityFilter: 'static {
    /// Returns `true` if `entity` passes the filter.
    fn matches(entity: &Entity) -> bool;
}

/// A tuple of component types, `()` included.
pub trait ComponentSet: 'static {
    /// Indices of each component inside [`Entity::components`].
    type Slots: Copy + fmt::Debug;

    /// Typed references to each component.
    type Refs<'a>;

    /// Returns `true` if every component type is present.
    fn contains_all(entity: &Entity) -> bool;

    /// Returns `true` if none of the component types are present.
    fn contains_none(entity: &Entity) -> bool;

    /// Find every component of the set, `None` if any is missing.
    fn locate(entity: &Entity) -> Option<Self::Slots>;

    /// Resolve previously located slots into typed references.
    fn fetch<'a>(entity: &'a Entity, slots: Self::Slots) -> Option<Self::Refs<'a>>;

    /// Component type ids of the set, in tuple order.
    fn type_ids() -> Vec<ComponentTypeId>;
}

impl ComponentSet for () {
    type Slots = ();
    type Refs<'a> = ();

    fn contains_all(_entity: &Entity) -> bool {
        true
    }

    fn contains_none(_entity: &Entity) -> bool {
        true
    }

    fn locate(_entity: &Entity) -> Option<Self::Slots> {
        Some(())
    }

    fn fetch<'a>(_entity: &'a Entity, _slots: Self::Slots) -> Option<Self::Refs<'a>> {
        Some(())
    }

    fn type_ids() -> Vec<ComponentTypeId> {
        Vec::new()
    }
}

macro_rules! impl_component_set {
    ($len:literal; $($name:ident => $idx:tt),+) => {
        impl<$($name: Component),+> ComponentSet for ($($name,)+) {
            type Slots = [usize; $len];
            type Refs<'a> = ($(&'a $name,)+);

            fn contains_all(entity: &Entity) -> bool {
                $(entity.has_component::<$name>())&&+
            }

            fn contains_none(entity: &Entity) -> bool {
                $(!entity.has_component::<$name>())&&+
            }

            fn locate(entity: &Entity) -> Option<Self::Slots> {
                Some([$(entity.component_index::<$name>()?),+])
            }

            fn fetch<'a>(entity: &'a Entity, slots: Self::Slots) -> Option<Self::Refs<'a>> {
                Some(($(entity.component_at::<$name>(slots[$idx])?,)+))
            }

            fn type_ids() -> Vec<ComponentTypeId> {
                vec![$($name::component_type_id()),+]
            }
        }
    };
}

impl_component_set!(1; A => 0);
impl_component_set!(2; A => 0, B => 1);
impl_component_set!(3; A => 0, B => 1, C => 2);
impl_component_set!(4; A => 0, B => 1, C => 2, D => 3);
impl_component_set!(5; A => 0, B => 1, C => 2, D => 3, E => 4);
impl_component_set!(6; A => 0, B => 1, C => 2, D => 3, E => 4, F => 5);

/// Matches any entity.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyEntity;

impl EntityFilter for AnyEntity {
    fn matches(_entity: &Entity) -> bool {
        true
    }
}

/// Matches an entity if all component types of `C` are present.
pub struct ContainsAllComponents<C>(PhantomData<fn() -> C>);

impl<C: ComponentSet> EntityFilter for ContainsAllComponents<C> {
    fn matches(entity: &Entity) -> bool {
        C::contains_all(entity)
    }
}

/// Matches an entity if none of the component types of `C` are present.
pub struct ContainsNoComponents<C>(PhantomData<fn() -> C>);

impl<C: ComponentSet> EntityFilter for ContainsNoComponents<C> {
    fn matches(entity: &Entity) -> bool {
        C::contains_none(entity)
    }
}

/// Matches an entity if every filter in the tuple `F` matches.
pub struct CombineFilters<F>(PhantomData<fn() -> F>);

impl EntityFilter for CombineFilters<()> {
    fn matches(_entity: &Entity) -> bool {
        true
    }
}

macro_rules! impl_combine_filters {
    ($($name:ident),+) => {
        impl<$($name: EntityFilter),+> EntityFilter for CombineFilters<($($name,)+)> {
            fn matches(entity: &Entity) -> bool {
                $($name::matches(entity))&&+
            }
        }
    };
}

impl_combine_filters!(A);
impl_combine_filters!(A, B);
impl_combine_filters!(A, B, C);
impl_combine_filters!(A, B, C, D);
