//! Platform integration for the ember engine.
//!
//! This crate wraps the windowing system (winit) and owns Vulkan surface
//! creation, keeping the rest of the workspace independent of the window
//! backend.

mod window;

pub use window::{Surface, Window};
