//! Demo scene: a populated world plus the systems that drive it.
//!
//! Entities are created before the message loop is initialized, so every
//! entity group is populated by the replay that happens on registration.

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{Context as _, Result};
use engine_entity::{EntityId, World};
use engine_loop::{LoopConfig, MessageLoop};
use glam::Vec3;
use tracing::info;

use crate::components::{Camera, Transform, Velocity};
use crate::systems::{CameraSystem, MovementSystem, SharedWorld};

/// A world and the message loop whose systems operate on it.
pub struct Scene {
    world: SharedWorld,
    message_loop: MessageLoop,
}

impl Scene {
    /// Build the demo scene and initialize its systems.
    ///
    /// # Errors
    ///
    /// Fails on any world or message loop wiring error.
    pub fn demo(config: LoopConfig) -> Result<Self> {
        let world = Rc::new(RefCell::new(World::new()));
        populate(&mut world.borrow_mut()).context("failed to populate demo world")?;

        let mut message_loop = MessageLoop::with_config(config);
        // Registered out of dependency order; initialize sorts them.
        message_loop.create_system(CameraSystem::new(world.clone()))?;
        message_loop.create_system(MovementSystem::new(world.clone()))?;
        message_loop
            .initialize()
            .context("failed to initialize message loop")?;

        message_loop.create_listener(|type_id, envelope| {
            info!(
                event = envelope.message_type_name(),
                type_id = type_id.0,
                source = ?envelope.source(),
                "event"
            );
        });

        info!(
            entities = world.borrow().entity_count(),
            systems = message_loop.systems().len(),
            "scene ready"
        );
        Ok(Self {
            world,
            message_loop,
        })
    }

    #[must_use]
    pub fn world(&self) -> &SharedWorld {
        &self.world
    }

    #[must_use]
    pub fn message_loop(&self) -> &MessageLoop {
        &self.message_loop
    }

    pub fn message_loop_mut(&mut self) -> &mut MessageLoop {
        &mut self.message_loop
    }
}

fn populate(world: &mut World) -> Result<()> {
    let ground = world.create_entity(EntityId(1), "Ground")?;
    world.create_component(ground, Transform::default())?;

    let player = world.create_entity(EntityId(2), "Player")?;
    world
        .entity_mut(player)
        .context("player vanished")?
        .insert(Transform::default())?
        .insert(Velocity {
            linear: Vec3::new(1.0, 0.0, 0.0),
        })?;

    let main_camera = world.create_entity(EntityId(3), "MainCamera")?;
    world
        .entity_mut(main_camera)
        .context("main camera vanished")?
        .insert(Transform::from_position(Vec3::new(0.0, 5.0, 10.0)).looking_at(Vec3::ZERO))?
        .insert(Camera::default())?;

    let dolly = world.create_entity(EntityId(4), "DollyCamera")?;
    world
        .entity_mut(dolly)
        .context("dolly camera vanished")?
        .insert(Transform::from_position(Vec3::new(-10.0, 2.0, 0.0)).looking_at(Vec3::ZERO))?
        .insert(Camera {
            fov_y: std::f32::consts::FRAC_PI_4,
            ..Camera::default()
        })?
        .insert(Velocity {
            linear: Vec3::new(0.5, 0.0, 0.0),
        })?;
    Ok(())
}
