//! The [`System`] trait and dependency declarations.

use std::any::{Any, TypeId};
use std::fmt;

use crate::context::Context;
use crate::message::Envelope;

/// Runtime id of a system type, unique within one loop, starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SystemTypeId(pub u32);

impl fmt::Display for SystemTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "System({})", self.0)
    }
}

/// A long-lived unit of per-tick behaviour owned by a
/// [`MessageLoop`](crate::MessageLoop).
///
/// All hooks receive a [`Context`] lending access to the owning loop.
///
/// # Examples
///
/// ```rust
/// use engine_loop::{Context, Dependencies, System};
///
/// struct Physics;
///
/// impl System for Physics {
///     fn type_name() -> &'static str { "Physics" }
/// }
///
/// struct Render;
///
/// impl System for Render {
///     fn type_name() -> &'static str { "Render" }
///
///     fn initialize(&mut self, _ctx: &mut Context<'_>) -> Dependencies {
///         Dependencies::none().on::<Physics>()
///     }
/// }
/// ```
pub trait System: Any {
    /// Process-unique type name.
    fn type_name() -> &'static str
    where
        Self: Sized;

    /// Called once from [`MessageLoop::initialize`](crate::MessageLoop::initialize).
    /// Register command and event types here and return the systems that
    /// must be initialized and updated before this one.
    fn initialize(&mut self, _ctx: &mut Context<'_>) -> Dependencies {
        Dependencies::none()
    }

    /// Called for every command addressed to this system, every event raised
    /// by another system, and every generic message.
    fn on_message(&mut self, _ctx: &mut Context<'_>, _message: &Envelope) {}

    /// Called once per tick after all queued messages were dispatched.
    fn on_update(&mut self, _ctx: &mut Context<'_>) {}
}

/// One declared dependency on a system type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dependency {
    type_id: TypeId,
    name: &'static str,
}

impl Dependency {
    /// Dependency on system type `T`.
    #[must_use]
    pub fn of<T: System>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: T::type_name(),
        }
    }

    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// The dependency list returned by [`System::initialize`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dependencies(Vec<Dependency>);

impl Dependencies {
    /// No dependencies.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Add a dependency on system type `T`.
    #[must_use]
    pub fn on<T: System>(mut self) -> Self {
        let dependency = Dependency::of::<T>();
        if !self.0.contains(&dependency) {
            self.0.push(dependency);
        }
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &Dependency> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Id and name of a registered system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemInfo {
    pub id: SystemTypeId,
    pub name: &'static str,
}
