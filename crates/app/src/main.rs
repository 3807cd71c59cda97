//! ember - Main Entry Point
//!
//! Interactive Vulkan application driving the ember engine: one window,
//! one frame loop, Space to cycle the background effect.

use std::time::Duration;

use anyhow::Result;
use tracing::{error, info};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowId;

use ember_core::{EngineConfig, Timer};
use ember_engine::{Engine, NoOverlay};
use ember_platform::Window;

/// How often frame statistics are logged, in seconds.
const STATS_INTERVAL_SECS: f32 = 5.0;

struct App {
    config: EngineConfig,
    window: Option<Window>,
    engine: Option<Engine>,
    timer: Timer,
    stats_accum: f32,
    stats_frames: u32,
}

impl App {
    fn new(config: EngineConfig) -> Self {
        Self {
            config,
            window: None,
            engine: None,
            timer: Timer::new(),
            stats_accum: 0.0,
            stats_frames: 0,
        }
    }

    /// Accumulates frame timings and logs an average periodically.
    fn record_frame_time(&mut self) {
        self.stats_accum += self.timer.delta_secs();
        self.stats_frames += 1;

        if self.stats_accum >= STATS_INTERVAL_SECS {
            let avg_ms = self.stats_accum * 1000.0 / self.stats_frames as f32;
            tracing::debug!(
                "{} frames in {:.1}s (avg {:.2} ms)",
                self.stats_frames,
                self.stats_accum,
                avg_ms
            );
            self.stats_accum = 0.0;
            self.stats_frames = 0;
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            match Window::new(
                event_loop,
                self.config.width,
                self.config.height,
                &self.config.title,
            ) {
                Ok(window) => {
                    // Create the engine after the window exists
                    match Engine::new(&self.config, &window, Box::new(NoOverlay)) {
                        Ok(engine) => {
                            info!("Initialization complete, entering main loop");
                            self.engine = Some(engine);
                            self.window = Some(window);
                        }
                        Err(e) => {
                            error!("Failed to create engine: {:?}", e);
                            event_loop.exit();
                        }
                    }
                }
                Err(e) => {
                    error!("Failed to create window: {}", e);
                    event_loop.exit();
                }
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested, shutting down");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(ref mut engine) = self.engine {
                    if size.width == 0 || size.height == 0 {
                        // Minimized: stop drawing until restored
                        engine.set_paused(true);
                    } else {
                        engine.set_paused(false);
                        engine.resize(size.width, size.height);
                    }
                }
                if let Some(ref mut window) = self.window {
                    window.resize(size.width, size.height);
                }
            }
            WindowEvent::Occluded(occluded) => {
                if let Some(ref mut engine) = self.engine {
                    engine.set_paused(occluded);
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if !event.state.is_pressed() || event.repeat {
                    return;
                }
                match event.physical_key {
                    PhysicalKey::Code(KeyCode::Escape) => {
                        info!("Escape pressed, shutting down");
                        event_loop.exit();
                    }
                    PhysicalKey::Code(KeyCode::Space) => {
                        if let Some(ref mut engine) = self.engine {
                            engine.background_mut().cycle();
                            info!(
                                "Background effect: {}",
                                engine.background().current_effect().name
                            );
                        }
                    }
                    _ => {}
                }
            }
            WindowEvent::RedrawRequested => {
                let Some(ref mut engine) = self.engine else {
                    return;
                };

                if engine.is_paused() {
                    // Nothing to draw; don't spin the CPU
                    std::thread::sleep(Duration::from_millis(100));
                    return;
                }

                if let Err(e) = engine.draw() {
                    error!("Fatal render error: {:?}", e);
                    event_loop.exit();
                    return;
                }

                self.record_frame_time();
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(ref window) = self.window {
            window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    ember_core::init_logging();
    info!("Starting ember");

    let config = EngineConfig::default();

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    Ok(())
}
