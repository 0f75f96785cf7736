//! # engine_app
//!
//! Runs the demo scene: a small world of moving entities and cameras driven
//! by the message loop at a fixed tick rate.
//!
//! ## Startup Sequence
//!
//! 1. Populate the world and register the systems.
//! 2. Initialize the message loop (systems are sorted by dependency).
//! 3. Optionally queue a `SetActiveCamera` command from its encoded bytes.
//! 4. Enter the fixed-timestep tick loop.

mod components;
mod scene;
mod systems;
mod tick;

use anyhow::{Context as _, Result};
use clap::Parser;
use engine_loop::{LoopConfig, codec};
use tracing::info;
use tracing_subscriber::EnvFilter;

use scene::Scene;
use systems::SetActiveCamera;
use tick::{TickConfig, TickLoop};

#[derive(Parser)]
#[command(name = "engine_app", about = "Message loop demo scene")]
struct Args {
    /// Target ticks per second
    #[arg(short, long, default_value_t = 60.0, value_parser = tick::parse_tick_rate)]
    tick_rate: f64,

    /// Number of ticks to run (0 = unlimited)
    #[arg(short, long, default_value_t = 600)]
    max_ticks: u64,

    /// Name of the camera entity to activate on the first tick
    #[arg(short, long)]
    camera: Option<String>,

    /// Trace every message delivery
    #[arg(long)]
    trace_dispatch: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    info!("engine_app starting");

    let config = LoopConfig::new().with_trace_dispatch(args.trace_dispatch);
    let mut scene = Scene::demo(config)?;

    if let Some(name) = args.camera {
        let message_loop = scene.message_loop_mut();
        let type_id = message_loop
            .find_message_type_id("SetActiveCamera")
            .context("SetActiveCamera is not registered")?;
        let bytes = codec::encode(&SetActiveCamera { name: name.clone() })?;
        message_loop.enqueue_command_raw(type_id, &bytes)?;
        info!(camera = %name, %type_id, "queued camera activation");
    }

    let mut tick_loop = TickLoop::new(
        TickConfig {
            tick_rate: args.tick_rate,
            max_ticks: args.max_ticks,
        },
        scene,
    );
    tick_loop.run()?;

    info!(ticks = tick_loop.tick_id(), "engine_app shut down");
    Ok(())
}
