//! Fixed-timestep tick loop.
//!
//! Each tick broadcasts a [`TickStarted`] message and then runs one
//! [`MessageLoop::update`](engine_loop::MessageLoop::update).

use std::time::{Duration, Instant};

use anyhow::{Context as _, Result};
use engine_loop::LoopError;
use tracing::{debug, info, warn};

use crate::scene::Scene;
use crate::systems::TickStarted;

/// Configuration for the tick loop.
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Target ticks per second.
    pub tick_rate: f64,
    /// Maximum number of ticks to run (0 = unlimited).
    pub max_ticks: u64,
}

/// Duration of one tick at `tick_rate` ticks per second, `None` unless the
/// rate is a finite number above zero.
#[must_use]
pub fn tick_duration(tick_rate: f64) -> Option<Duration> {
    if !(tick_rate.is_finite() && tick_rate > 0.0) {
        return None;
    }
    Duration::try_from_secs_f64(1.0 / tick_rate).ok()
}

/// Parse a tick rate for the command line.
///
/// # Errors
///
/// Rejects values that are not numbers or not usable by [`tick_duration`].
pub fn parse_tick_rate(value: &str) -> Result<f64, String> {
    let rate: f64 = value
        .parse()
        .map_err(|_| format!("`{value}` is not a number"))?;
    match tick_duration(rate) {
        Some(_) => Ok(rate),
        None => Err(format!("tick rate must be greater than zero, got {value}")),
    }
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60.0,
            max_ticks: 0,
        }
    }
}

/// The tick loop state.
pub struct TickLoop {
    /// Current tick counter.
    tick_id: u64,
    config: TickConfig,
    scene: Scene,
}

impl TickLoop {
    /// Create a new tick loop driving `scene`.
    #[must_use]
    pub fn new(config: TickConfig, scene: Scene) -> Self {
        Self {
            tick_id: 0,
            config,
            scene,
        }
    }

    /// Returns the current tick counter.
    #[must_use]
    pub fn tick_id(&self) -> u64 {
        self.tick_id
    }

    #[must_use]
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Run one tick covering `dt` seconds.
    ///
    /// # Errors
    ///
    /// Propagates [`LoopError`] from the message loop update.
    pub fn tick(&mut self, dt: f64) -> Result<(), LoopError> {
        self.tick_id += 1;
        debug!(tick_id = self.tick_id, dt, "tick start");

        let message_loop = self.scene.message_loop_mut();
        message_loop.enqueue_message(TickStarted {
            tick_id: self.tick_id,
            dt: dt as f32,
        });
        message_loop.update()
    }

    /// Run the tick loop for the configured number of ticks, or indefinitely.
    ///
    /// # Errors
    ///
    /// Fails on a tick rate that is not a positive number, and stops at the
    /// first failing tick.
    pub fn run(&mut self) -> Result<()> {
        let rate = self.config.tick_rate;
        let tick_duration = tick_duration(rate)
            .with_context(|| format!("tick rate must be greater than zero, got {rate}"))?;
        let mut tick_count = 0u64;

        info!(
            tick_rate = self.config.tick_rate,
            max_ticks = self.config.max_ticks,
            "starting tick loop"
        );

        loop {
            let start = Instant::now();

            self.tick(tick_duration.as_secs_f64())?;

            tick_count += 1;
            if self.config.max_ticks > 0 && tick_count >= self.config.max_ticks {
                info!(ticks = tick_count, "tick loop complete");
                return Ok(());
            }

            let elapsed = start.elapsed();
            if elapsed < tick_duration {
                std::thread::sleep(tick_duration - elapsed);
            } else {
                warn!(
                    tick_id = self.tick_id,
                    elapsed_ms = elapsed.as_millis() as u64,
                    budget_ms = tick_duration.as_millis() as u64,
                    "tick exceeded time budget"
                );
            }
        }
    }
}
