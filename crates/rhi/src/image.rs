//! GPU image management.
//!
//! This module handles creation of device-local render targets: the
//! off-screen draw image the frame renders into and the depth image the
//! geometry pass tests against.
//!
//! # Overview
//!
//! - [`AllocatedImage`] wraps a VkImage, its VkImageView, and its
//!   gpu-allocator backed memory
//! - Every image carries a [`LayoutTracker`], so layout transitions are
//!   validated against the state the image is actually in
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ash::vk;
//! use ember_rhi::device::Device;
//! use ember_rhi::image::AllocatedImage;
//!
//! # fn example(device: Arc<Device>) -> Result<(), ember_rhi::RhiError> {
//! // The off-screen draw target: high-precision color, usable as a
//! // storage image by compute and as a blit source
//! let draw_image = AllocatedImage::new(
//!     device,
//!     vk::Extent2D { width: 1700, height: 900 },
//!     vk::Format::R16G16B16A16_SFLOAT,
//!     vk::ImageUsageFlags::TRANSFER_SRC
//!         | vk::ImageUsageFlags::TRANSFER_DST
//!         | vk::ImageUsageFlags::STORAGE
//!         | vk::ImageUsageFlags::COLOR_ATTACHMENT,
//!     vk::ImageAspectFlags::COLOR,
//! )?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::vk;
use gpu_allocator::MemoryLocation;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use tracing::debug;

use crate::device::Device;
use crate::error::{RhiError, RhiResult};
use crate::transition::{ImageState, LayoutTracker, transition_image};

/// GPU image with managed memory, a view, and tracked layout state.
///
/// # Resource Destruction
///
/// Resources are destroyed in the following order:
/// 1. Image view
/// 2. Memory allocation
/// 3. Image
pub struct AllocatedImage {
    /// Reference to the logical device.
    device: Arc<Device>,
    /// Vulkan image handle.
    image: vk::Image,
    /// Vulkan image view handle.
    image_view: vk::ImageView,
    /// GPU memory allocation.
    allocation: Option<Allocation>,
    /// Image format.
    format: vk::Format,
    /// Image dimensions.
    extent: vk::Extent2D,
    /// CPU-side record of the image's current layout state.
    layout: LayoutTracker,
}

impl AllocatedImage {
    /// Creates a new device-local 2D image with an image view.
    ///
    /// The image starts in [`ImageState::Undefined`]; the first use must
    /// transition it into the state that use requires.
    ///
    /// # Arguments
    ///
    /// * `device` - The logical device
    /// * `extent` - Image dimensions in pixels
    /// * `format` - Pixel format
    /// * `usage` - Usage flags for every operation the image participates in
    /// * `aspect_mask` - Aspect for the image view (color or depth)
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Image creation fails
    /// - Memory allocation fails
    /// - Image view creation fails
    pub fn new(
        device: Arc<Device>,
        extent: vk::Extent2D,
        format: vk::Format,
        usage: vk::ImageUsageFlags,
        aspect_mask: vk::ImageAspectFlags,
    ) -> RhiResult<Self> {
        if extent.width == 0 || extent.height == 0 {
            return Err(RhiError::InvalidHandle(
                "Image dimensions must be greater than 0".to_string(),
            ));
        }

        let image_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(format)
            .extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        let image = unsafe { device.handle().create_image(&image_info, None)? };

        let requirements = unsafe { device.handle().get_image_memory_requirements(image) };

        let allocation = {
            let mut allocator = device.allocator().lock().unwrap();
            allocator.allocate(&AllocationCreateDesc {
                name: "image",
                requirements,
                location: MemoryLocation::GpuOnly,
                linear: false, // Optimal tiling is not linear
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })?
        };

        unsafe {
            device
                .handle()
                .bind_image_memory(image, allocation.memory(), allocation.offset())?;
        }

        let view_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .subresource_range(
                vk::ImageSubresourceRange::default()
                    .aspect_mask(aspect_mask)
                    .base_mip_level(0)
                    .level_count(1)
                    .base_array_layer(0)
                    .layer_count(1),
            );

        let image_view = unsafe { device.handle().create_image_view(&view_info, None)? };

        debug!(
            "Created {}x{} image ({:?})",
            extent.width, extent.height, format
        );

        Ok(Self {
            device,
            image,
            image_view,
            allocation: Some(allocation),
            format,
            extent,
            layout: LayoutTracker::new(ImageState::Undefined),
        })
    }

    /// Returns the Vulkan image handle.
    #[inline]
    pub fn handle(&self) -> vk::Image {
        self.image
    }

    /// Returns the Vulkan image view handle.
    #[inline]
    pub fn view(&self) -> vk::ImageView {
        self.image_view
    }

    /// Returns the image format.
    #[inline]
    pub fn format(&self) -> vk::Format {
        self.format
    }

    /// Returns the image dimensions.
    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    /// Returns the image's tracked layout state.
    #[inline]
    pub fn state(&self) -> ImageState {
        self.layout.state()
    }

    /// Records a layout transition from `old` to `new` on `cmd`.
    ///
    /// The declared `old` state is validated against the tracked state;
    /// a mismatch means a transition was skipped or reordered somewhere.
    pub fn transition(
        &mut self,
        cmd: vk::CommandBuffer,
        old: ImageState,
        new: ImageState,
    ) {
        self.layout.expect(old);
        transition_image(&self.device, cmd, self.image, old, new);
        self.layout.advance(new);
    }

    /// Resets the tracked layout state to [`ImageState::Undefined`].
    ///
    /// Call after work that invalidates the image contents outside the
    /// tracker's view, e.g. when the target is redrawn from scratch next
    /// frame without preserving its contents.
    pub fn forget_contents(&mut self) {
        self.layout.reset(ImageState::Undefined);
    }
}

impl Drop for AllocatedImage {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_image_view(self.image_view, None);
        }

        if let Some(allocation) = self.allocation.take() {
            let mut allocator = self.device.allocator().lock().unwrap();
            if let Err(e) = allocator.free(allocation) {
                tracing::error!("Failed to free image allocation: {:?}", e);
            }
        }

        unsafe {
            self.device.handle().destroy_image(self.image, None);
        }

        debug!(
            "Destroyed {}x{} image ({:?})",
            self.extent.width, self.extent.height, self.format
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocated_image_is_send() {
        // Compile-time check that AllocatedImage is Send
        fn assert_send<T: Send>() {}
        assert_send::<AllocatedImage>();
    }
}
