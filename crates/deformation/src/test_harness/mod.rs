//! # DeformationTestWorld: headless harness for the deformation field
//!
//! Wraps `bevy::app::App` + `DeformationPlugin` with a fixed frame time so
//! integration tests and benches can drive the field frame by frame without a
//! window or renderer.

mod queries;
mod setup;

use std::time::Duration;

use bevy::app::App;
use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;

use crate::capture::CaptureBackend;
use crate::config::{CaptureMode, DeformationConfig};
use crate::kernel::KernelExecution;
use crate::orchestrator::FieldPublished;
use crate::DeformationPlugin;

/// Generations seen in `FieldPublished` events, in order.
#[derive(Resource, Debug, Default)]
pub struct PublishedLog(pub Vec<u64>);

fn record_published(mut events: EventReader<FieldPublished>, mut log: ResMut<PublishedLog>) {
    log.0.extend(events.read().map(|e| e.generation));
}

/// A headless Bevy App running the deformation pipeline.
///
/// Every `tick` advances time by exactly [`Self::FRAME_SECS`].
pub struct DeformationTestWorld {
    app: App,
    anchor: Option<Entity>,
}

impl DeformationTestWorld {
    /// Simulated seconds per frame.
    pub const FRAME_SECS: f32 = 0.1;

    /// Small, instant-response config: 16×16 texels of 4 world units, inline
    /// capture and a serial kernel.
    pub fn test_config() -> DeformationConfig {
        DeformationConfig {
            resolution: 16,
            capture_extent: 64.0,
            temporal_filter_factor: f32::INFINITY,
            accumulation_rate: 10.0,
            accumulation_cap: 10.0,
            capture_mode: CaptureMode::Inline,
            kernel_execution: KernelExecution::Serial,
            ..Default::default()
        }
    }

    pub fn new() -> Self {
        Self::with_config(Self::test_config())
    }

    /// Build the app around `config` and run one warm-up frame so `Startup`
    /// has initialized the field.
    pub fn with_config(config: DeformationConfig) -> Self {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f32(
            Self::FRAME_SECS,
        )));
        app.insert_resource(config);
        app.add_plugins(DeformationPlugin);
        app.init_resource::<PublishedLog>();
        app.add_systems(Last, record_published);

        app.update();

        Self { app, anchor: None }
    }

    /// Replace the snapshot source.
    pub fn with_backend(mut self, backend: CaptureBackend) -> Self {
        self.app.insert_resource(backend);
        self
    }

    /// Run `n` frames. Yields between frames so async captures can progress.
    pub fn tick(&mut self, n: u32) {
        for _ in 0..n {
            self.app.update();
            std::thread::yield_now();
        }
    }

    /// Tick until `done` holds, up to `max_frames`. Returns whether it held.
    pub fn tick_until(&mut self, max_frames: u32, done: impl Fn(&Self) -> bool) -> bool {
        for _ in 0..max_frames {
            if done(self) {
                return true;
            }
            self.tick(1);
            std::thread::sleep(Duration::from_millis(1));
        }
        done(self)
    }

    pub fn world_mut(&mut self) -> &mut World {
        self.app.world_mut()
    }

    pub fn world(&self) -> &World {
        self.app.world()
    }
}

impl Default for DeformationTestWorld {
    fn default() -> Self {
        Self::new()
    }
}
