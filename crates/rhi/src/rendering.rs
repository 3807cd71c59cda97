//! Dynamic rendering helpers (Vulkan 1.3).
//!
//! This module provides utilities for setting up dynamic rendering without
//! VkRenderPass objects.
//!
//! # Overview
//!
//! - [`ColorAttachment`] - Configuration for a color attachment
//! - [`DepthAttachment`] - Configuration for a depth attachment
//! - [`RenderingConfig`] - Complete configuration for one render pass
//!
//! # Example
//!
//! ```no_run
//! use ash::vk;
//! use ember_rhi::rendering::{ColorAttachment, DepthAttachment, RenderingConfig};
//! use ember_rhi::command::CommandBuffer;
//!
//! # fn example(
//! #     draw_image_view: vk::ImageView,
//! #     depth_image_view: vk::ImageView,
//! #     cmd: &CommandBuffer,
//! # ) {
//! let config = RenderingConfig::new(
//!     vk::Extent2D { width: 1700, height: 900 },
//!     ColorAttachment::new(draw_image_view),
//! )
//! .with_depth_attachment(DepthAttachment::new(depth_image_view));
//!
//! // Build the info bundle; it owns the attachment structs the
//! // VkRenderingInfo points into
//! let bundle = config.build();
//! cmd.begin_rendering(&bundle.info());
//! // ... draw commands ...
//! cmd.end_rendering();
//! # }
//! ```

use ash::vk;

/// Configuration for a color attachment in dynamic rendering.
///
/// # Default Values
///
/// - `layout`: `COLOR_ATTACHMENT_OPTIMAL`
/// - `load_op`: `LOAD` (the background pass already filled the target)
/// - `store_op`: `STORE`
#[derive(Clone)]
pub struct ColorAttachment {
    /// The image view to render to.
    pub image_view: vk::ImageView,
    /// The image layout during rendering.
    pub layout: vk::ImageLayout,
    /// How to load the attachment contents at the start of rendering.
    pub load_op: vk::AttachmentLoadOp,
    /// How to store the attachment contents at the end of rendering.
    pub store_op: vk::AttachmentStoreOp,
    /// Clear value when load_op is CLEAR.
    pub clear_value: vk::ClearColorValue,
}

impl ColorAttachment {
    /// Creates a new color attachment that loads existing contents.
    #[inline]
    pub fn new(image_view: vk::ImageView) -> Self {
        Self {
            image_view,
            layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            load_op: vk::AttachmentLoadOp::LOAD,
            store_op: vk::AttachmentStoreOp::STORE,
            clear_value: vk::ClearColorValue {
                float32: [0.0, 0.0, 0.0, 1.0],
            },
        }
    }

    /// Clears the attachment to the given color instead of loading it.
    pub fn with_clear_color(mut self, color: [f32; 4]) -> Self {
        self.load_op = vk::AttachmentLoadOp::CLEAR;
        self.clear_value = vk::ClearColorValue { float32: color };
        self
    }

    /// Builds the Vulkan attachment info.
    fn to_vk(&self) -> vk::RenderingAttachmentInfo<'static> {
        vk::RenderingAttachmentInfo::default()
            .image_view(self.image_view)
            .image_layout(self.layout)
            .load_op(self.load_op)
            .store_op(self.store_op)
            .clear_value(vk::ClearValue {
                color: self.clear_value,
            })
    }
}

/// Configuration for a depth attachment in dynamic rendering.
///
/// The attachment is always cleared at the start of the pass; depth
/// contents never survive across frames.
#[derive(Clone)]
pub struct DepthAttachment {
    /// The depth image view.
    pub image_view: vk::ImageView,
    /// The image layout during rendering.
    pub layout: vk::ImageLayout,
    /// Clear depth value.
    pub clear_depth: f32,
}

impl DepthAttachment {
    /// Creates a new depth attachment cleared to 1.0 (far plane).
    #[inline]
    pub fn new(image_view: vk::ImageView) -> Self {
        Self {
            image_view,
            layout: vk::ImageLayout::DEPTH_ATTACHMENT_OPTIMAL,
            clear_depth: 1.0,
        }
    }

    /// Overrides the clear depth value.
    pub fn with_clear_depth(mut self, depth: f32) -> Self {
        self.clear_depth = depth;
        self
    }

    /// Builds the Vulkan attachment info.
    fn to_vk(&self) -> vk::RenderingAttachmentInfo<'static> {
        vk::RenderingAttachmentInfo::default()
            .image_view(self.image_view)
            .image_layout(self.layout)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::DONT_CARE)
            .clear_value(vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue {
                    depth: self.clear_depth,
                    stencil: 0,
                },
            })
    }
}

/// Complete rendering configuration for one dynamic render pass.
pub struct RenderingConfig {
    extent: vk::Extent2D,
    color: ColorAttachment,
    depth: Option<DepthAttachment>,
}

impl RenderingConfig {
    /// Creates a configuration with one color attachment covering the
    /// given extent.
    pub fn new(extent: vk::Extent2D, color: ColorAttachment) -> Self {
        Self {
            extent,
            color,
            depth: None,
        }
    }

    /// Adds a depth attachment.
    pub fn with_depth_attachment(mut self, depth: DepthAttachment) -> Self {
        self.depth = Some(depth);
        self
    }

    /// Builds the bundle owning the attachment structs the final
    /// `VkRenderingInfo` points into.
    pub fn build(self) -> RenderingBundle {
        RenderingBundle {
            extent: self.extent,
            color_attachments: [self.color.to_vk()],
            depth_attachment: self.depth.map(|d| d.to_vk()),
        }
    }
}

/// Owns the attachment infos referenced by the `VkRenderingInfo`.
///
/// Must stay alive until `begin_rendering` has been recorded.
pub struct RenderingBundle {
    extent: vk::Extent2D,
    color_attachments: [vk::RenderingAttachmentInfo<'static>; 1],
    depth_attachment: Option<vk::RenderingAttachmentInfo<'static>>,
}

impl RenderingBundle {
    /// Builds the `VkRenderingInfo` borrowing this bundle's attachments.
    pub fn info(&self) -> vk::RenderingInfo<'_> {
        let mut info = vk::RenderingInfo::default()
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: self.extent,
            })
            .layer_count(1)
            .color_attachments(&self.color_attachments);

        if let Some(depth) = &self.depth_attachment {
            info = info.depth_attachment(depth);
        }

        info
    }

    /// Returns the render area extent.
    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_attachment_defaults_to_load() {
        let attachment = ColorAttachment::new(vk::ImageView::null());
        assert_eq!(attachment.load_op, vk::AttachmentLoadOp::LOAD);
        assert_eq!(attachment.store_op, vk::AttachmentStoreOp::STORE);
        assert_eq!(attachment.layout, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
    }

    #[test]
    fn test_with_clear_color_switches_load_op() {
        let attachment =
            ColorAttachment::new(vk::ImageView::null()).with_clear_color([0.1, 0.2, 0.3, 1.0]);
        assert_eq!(attachment.load_op, vk::AttachmentLoadOp::CLEAR);
        let floats = unsafe { attachment.clear_value.float32 };
        assert_eq!(floats, [0.1, 0.2, 0.3, 1.0]);
    }

    #[test]
    fn test_depth_attachment_clears_to_far_plane() {
        let attachment = DepthAttachment::new(vk::ImageView::null());
        assert_eq!(attachment.clear_depth, 1.0);
        assert_eq!(attachment.layout, vk::ImageLayout::DEPTH_ATTACHMENT_OPTIMAL);
    }

    #[test]
    fn test_rendering_bundle_extent() {
        let extent = vk::Extent2D {
            width: 640,
            height: 480,
        };
        let bundle =
            RenderingConfig::new(extent, ColorAttachment::new(vk::ImageView::null())).build();
        assert_eq!(bundle.extent().width, 640);
        assert_eq!(bundle.extent().height, 480);
    }
}
