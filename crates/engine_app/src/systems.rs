//! Demo systems: movement integration and camera selection.
//!
//! Both systems share the scene's [`World`] and keep an entity group over the
//! components they care about. `CameraSystem` depends on `MovementSystem` so
//! it always sees this tick's positions.

use std::cell::RefCell;
use std::mem;
use std::rc::Rc;

use engine_entity::{Entity, EntityGroupWithComponents, EntityId, GroupHooks, ObserverHandle, World};
use engine_loop::{Command, Context, Dependencies, Envelope, Event, Message, System};
use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::components::{Camera, Transform, Velocity};

/// World handle shared by the scene and its systems.
pub type SharedWorld = Rc<RefCell<World>>;

/// Broadcast at the start of every tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickStarted {
    pub tick_id: u64,
    /// Seconds covered by this tick.
    pub dt: f32,
}

impl Message for TickStarted {
    fn type_name() -> &'static str {
        "TickStarted"
    }
}

/// Set an entity's velocity. A zero velocity removes the component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetVelocity {
    pub entity: u32,
    pub linear: Vec3,
}

impl Command for SetVelocity {
    fn type_name() -> &'static str {
        "SetVelocity"
    }
}

/// Make the named camera entity the active one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetActiveCamera {
    pub name: String,
}

impl Command for SetActiveCamera {
    fn type_name() -> &'static str {
        "SetActiveCamera"
    }
}

/// Raised whenever the active camera changes. `None` when no camera is left.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveCameraChanged {
    pub entity: Option<EntityId>,
}

impl Event for ActiveCameraChanged {
    fn type_name() -> &'static str {
        "ActiveCameraChanged"
    }
}

pub type MovingGroup = EntityGroupWithComponents<(Transform, Velocity)>;

/// Integrates [`Velocity`] into [`Transform`] once per tick.
pub struct MovementSystem {
    world: SharedWorld,
    moving: ObserverHandle<MovingGroup>,
    dt: f32,
}

impl MovementSystem {
    #[must_use]
    pub fn new(world: SharedWorld) -> Self {
        let moving = world
            .borrow_mut()
            .create_entity_observer(MovingGroup::new());
        Self {
            world,
            moving,
            dt: 0.0,
        }
    }

    fn set_velocity(&self, command: &SetVelocity) {
        let id = EntityId(command.entity);
        let mut world = self.world.borrow_mut();
        let has_velocity = match world.find_entity(id) {
            Some(entity) => entity.has_component::<Velocity>(),
            None => {
                warn!(entity = %id, "velocity for unknown entity");
                return;
            }
        };

        let result = match (has_velocity, command.linear == Vec3::ZERO) {
            (true, true) => world.remove_component::<Velocity>(id).map(drop),
            (false, true) => Ok(()),
            (true, false) => {
                if let Some(velocity) = world
                    .find_entity_mut(id)
                    .and_then(|entity| entity.find_component_mut::<Velocity>())
                {
                    velocity.linear = command.linear;
                }
                Ok(())
            }
            (false, false) => world.create_component(
                id,
                Velocity {
                    linear: command.linear,
                },
            ),
        };
        if let Err(err) = result {
            warn!(entity = %id, error = %err, "failed to set velocity");
        }
    }
}

impl System for MovementSystem {
    fn type_name() -> &'static str {
        "MovementSystem"
    }

    fn initialize(&mut self, ctx: &mut Context<'_>) -> Dependencies {
        ctx.register_command::<SetVelocity>();
        ctx.register_message::<TickStarted>();
        Dependencies::none()
    }

    fn on_message(&mut self, _ctx: &mut Context<'_>, message: &Envelope) {
        if let Some(tick) = message.as_message::<TickStarted>() {
            self.dt = tick.dt;
        } else if let Some(command) = message.as_command::<SetVelocity>() {
            self.set_velocity(command);
        }
    }

    fn on_update(&mut self, _ctx: &mut Context<'_>) {
        let mut world = self.world.borrow_mut();
        let Some(group) = world.observer(self.moving) else {
            return;
        };
        let steps: Vec<(EntityId, Vec3)> = group
            .iter(&world)
            .map(|(entity, (_, velocity))| (entity.id(), velocity.linear * self.dt))
            .collect();

        for (id, offset) in steps {
            if let Some(transform) = world
                .find_entity_mut(id)
                .and_then(|entity| entity.find_component_mut::<Transform>())
            {
                transform.position += offset;
            }
        }
    }
}

/// Records cameras entering and leaving the camera group.
#[derive(Debug, Default)]
pub struct CameraHooks {
    joined: Vec<EntityId>,
    left: Vec<EntityId>,
}

impl GroupHooks for CameraHooks {
    fn on_group_entity_added(&mut self, entity: &Entity) {
        self.joined.push(entity.id());
    }

    fn on_group_entity_removed(&mut self, entity: &Entity) {
        self.left.push(entity.id());
    }
}

pub type CameraGroup = EntityGroupWithComponents<(Camera, Transform), CameraHooks>;

/// Tracks the active camera and its view-projection matrix.
///
/// The first camera to appear becomes active. When the active camera goes
/// away the next remaining one takes over.
pub struct CameraSystem {
    world: SharedWorld,
    cameras: ObserverHandle<CameraGroup>,
    active: Option<EntityId>,
    view_projection: Option<Mat4>,
}

impl CameraSystem {
    #[must_use]
    pub fn new(world: SharedWorld) -> Self {
        let cameras = world
            .borrow_mut()
            .create_entity_observer(CameraGroup::new());
        Self {
            world,
            cameras,
            active: None,
            view_projection: None,
        }
    }

    #[must_use]
    pub fn active_camera(&self) -> Option<EntityId> {
        self.active
    }

    /// View-projection matrix computed during the last update.
    #[must_use]
    pub fn view_projection(&self) -> Option<Mat4> {
        self.view_projection
    }

    fn activate(&mut self, ctx: &mut Context<'_>, name: &str) {
        let found = {
            let world = self.world.borrow();
            let Some(group) = world.observer(self.cameras) else {
                return;
            };
            world
                .find_entity_by_name(name)
                .map(Entity::id)
                .filter(|id| group.contains(*id))
        };

        match found {
            Some(id) if self.active != Some(id) => {
                info!(camera = name, entity = %id, "active camera changed");
                self.active = Some(id);
                ctx.dispatch_event(ActiveCameraChanged { entity: Some(id) });
            }
            Some(_) => {}
            None => warn!(camera = name, "no camera with this name"),
        }
    }
}

impl System for CameraSystem {
    fn type_name() -> &'static str {
        "CameraSystem"
    }

    fn initialize(&mut self, ctx: &mut Context<'_>) -> Dependencies {
        ctx.register_command::<SetActiveCamera>();
        ctx.register_event::<ActiveCameraChanged>();
        Dependencies::none().on::<MovementSystem>()
    }

    fn on_message(&mut self, ctx: &mut Context<'_>, message: &Envelope) {
        if let Some(command) = message.as_command::<SetActiveCamera>() {
            self.activate(ctx, &command.name);
        }
    }

    fn on_update(&mut self, ctx: &mut Context<'_>) {
        let mut changed = false;
        {
            let mut world = self.world.borrow_mut();
            let Some(group) = world.observer_mut(self.cameras) else {
                return;
            };
            let hooks = group.hooks_mut();
            for id in mem::take(&mut hooks.joined) {
                debug!(entity = %id, "camera joined");
            }
            for id in mem::take(&mut hooks.left) {
                debug!(entity = %id, "camera left");
            }

            if let Some(active) = self.active
                && !group.contains(active)
            {
                self.active = None;
                changed = true;
            }
            if self.active.is_none() {
                self.active = group.entity_ids().next();
                changed |= self.active.is_some();
            }
        }

        let world = self.world.borrow();
        self.view_projection = self.active.and_then(|id| {
            let group = world.observer(self.cameras)?;
            let (camera, transform) = group.get(&world, id)?;
            Some(camera.view_projection(transform))
        });
        drop(world);

        if changed {
            info!(entity = ?self.active, "active camera changed");
            ctx.enqueue_event(ActiveCameraChanged {
                entity: self.active,
            });
        }
    }
}
