//! The UI overlay seam.
//!
//! The last pass of every frame composites an overlay directly onto the
//! swapchain image. The engine owns the pass itself (the layout
//! transitions and the begin/end of the dynamic render pass); what gets
//! drawn inside it belongs to the overlay implementation. Widget toolkits
//! plug in here without the engine knowing anything about them.

use ash::vk;

use ember_rhi::command::CommandBuffer;

/// Records overlay draw commands into an active render pass.
///
/// The engine calls [`record`](OverlayRenderer::record) once per frame,
/// between `begin_rendering` and `end_rendering` on a pass targeting the
/// acquired swapchain image.
pub trait OverlayRenderer {
    /// Records the overlay's draw commands.
    ///
    /// # Arguments
    ///
    /// * `cmd` - The frame's command buffer, inside an active render pass
    /// * `target_extent` - Dimensions of the image being composited onto
    fn record(&mut self, cmd: &CommandBuffer, target_extent: vk::Extent2D);
}

/// Overlay implementation that draws nothing.
#[derive(Default)]
pub struct NoOverlay;

impl OverlayRenderer for NoOverlay {
    fn record(&mut self, _cmd: &CommandBuffer, _target_extent: vk::Extent2D) {}
}
