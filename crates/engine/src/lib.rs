//! The ember rendering engine.
//!
//! This crate owns the frame lifecycle: per-frame synchronization slots,
//! deferred resource cleanup, the immediate submission channel, the
//! background compute effects, mesh upload, and the frame orchestrator
//! that sequences acquisition, recording, submission, and presentation.

pub mod deletion;
pub mod effects;
pub mod engine;
pub mod frame;
pub mod immediate;
pub mod mesh;
pub mod overlay;

pub use engine::Engine;
pub use overlay::{NoOverlay, OverlayRenderer};

/// Number of frame slots rotating through the frame loop.
///
/// Two slots let the CPU record frame N+1 while the GPU renders frame N;
/// the per-slot fence caps the number of frames in flight at this value.
pub const FRAME_OVERLAP: usize = 2;
