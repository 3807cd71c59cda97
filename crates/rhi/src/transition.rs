//! The image layout transition protocol.
//!
//! Every image has exactly one layout/access state at any point in the
//! command stream, and the GPU is only told about changes through explicit
//! barriers. This module provides:
//!
//! - [`ImageState`] - the set of layout/access states the engine moves
//!   images through
//! - [`LayoutTracker`] - CPU-side tracking of an image's current state so
//!   a skipped or misordered transition becomes a checkable precondition
//!   instead of undefined behavior at the driver level
//! - [`transition_image`] - records the barrier itself
//!
//! # Synchronization scope
//!
//! The recorded barrier blocks ALL_COMMANDS against ALL_COMMANDS with full
//! memory availability/visibility. This over-synchronizes: a tuned version
//! would narrow the stage and access masks per transition pair. Correctness
//! is never violated under the wide masks, and the frame loop issues only a
//! handful of these per frame.
//!
//! # Example
//!
//! ```no_run
//! use ash::vk;
//! use ember_rhi::transition::{ImageState, LayoutTracker, transition_image};
//! use ember_rhi::device::Device;
//!
//! # fn example(device: &Device, cmd: vk::CommandBuffer, image: vk::Image) {
//! let mut tracker = LayoutTracker::new(ImageState::Undefined);
//!
//! tracker.expect(ImageState::Undefined);
//! transition_image(device, cmd, image, ImageState::Undefined, ImageState::General);
//! tracker.advance(ImageState::General);
//! # }
//! ```

use ash::vk;
use tracing::error;

use crate::device::Device;

/// Layout/access states an image moves through during a frame.
///
/// Each state maps to exactly one Vulkan image layout. The engine never
/// uses a layout outside this set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageState {
    /// Contents undefined; the cheapest source state for a full overwrite.
    Undefined,
    /// General layout, required for storage-image access from compute.
    General,
    /// Color attachment output.
    ColorAttachment,
    /// Depth attachment output.
    DepthAttachment,
    /// Source of a transfer (copy/blit) operation.
    TransferSrc,
    /// Destination of a transfer (copy/blit) operation.
    TransferDst,
    /// Ready for presentation by the swapchain.
    PresentSrc,
}

impl ImageState {
    /// Converts to the Vulkan image layout this state declares.
    pub fn vk_layout(self) -> vk::ImageLayout {
        match self {
            ImageState::Undefined => vk::ImageLayout::UNDEFINED,
            ImageState::General => vk::ImageLayout::GENERAL,
            ImageState::ColorAttachment => vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            ImageState::DepthAttachment => vk::ImageLayout::DEPTH_ATTACHMENT_OPTIMAL,
            ImageState::TransferSrc => vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            ImageState::TransferDst => vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            ImageState::PresentSrc => vk::ImageLayout::PRESENT_SRC_KHR,
        }
    }

    /// Returns the image aspect touched when transitioning *into* this
    /// state. Depth destinations use the depth aspect, everything else the
    /// color aspect.
    pub fn aspect_mask(self) -> vk::ImageAspectFlags {
        match self {
            ImageState::DepthAttachment => vk::ImageAspectFlags::DEPTH,
            _ => vk::ImageAspectFlags::COLOR,
        }
    }

    /// Returns a human-readable name for logging.
    pub fn name(self) -> &'static str {
        match self {
            ImageState::Undefined => "undefined",
            ImageState::General => "general",
            ImageState::ColorAttachment => "color-attachment",
            ImageState::DepthAttachment => "depth-attachment",
            ImageState::TransferSrc => "transfer-src",
            ImageState::TransferDst => "transfer-dst",
            ImageState::PresentSrc => "present-src",
        }
    }
}

/// CPU-side record of an image's current layout state.
///
/// The tracker validates that every transition starts from the state the
/// image is actually in. A mismatch means a transition was skipped or
/// reordered somewhere, which would be undefined behavior on real
/// hardware; it trips a debug assertion and an error log.
#[derive(Debug, Clone)]
pub struct LayoutTracker {
    current: ImageState,
    transitions: usize,
}

impl LayoutTracker {
    /// Creates a tracker for an image currently in `initial`.
    pub fn new(initial: ImageState) -> Self {
        Self {
            current: initial,
            transitions: 0,
        }
    }

    /// Returns the tracked current state.
    #[inline]
    pub fn state(&self) -> ImageState {
        self.current
    }

    /// Returns how many transitions have been recorded through this
    /// tracker. Round trips are counted in full; barriers are never elided.
    #[inline]
    pub fn transitions(&self) -> usize {
        self.transitions
    }

    /// Validates that the image is in `old`. Returns false (and logs) on a
    /// mismatch.
    pub fn expect(&self, old: ImageState) -> bool {
        if self.current != old {
            error!(
                "Image layout mismatch: transition declared old state '{}' but image is in '{}'",
                old.name(),
                self.current.name()
            );
            debug_assert!(
                false,
                "image layout transition from wrong state: declared {:?}, tracked {:?}",
                old, self.current
            );
            return false;
        }
        true
    }

    /// Records that a transition into `new` was issued.
    pub fn advance(&mut self, new: ImageState) {
        self.current = new;
        self.transitions += 1;
    }

    /// Resets the tracked state without counting a transition.
    ///
    /// Swapchain images revert to an unknown state after presentation, so
    /// their trackers restart from [`ImageState::Undefined`] each frame.
    pub fn reset(&mut self, state: ImageState) {
        self.current = state;
    }
}

/// Returns a subresource range covering every mip level and array layer of
/// the given aspect.
pub fn full_subresource_range(aspect_mask: vk::ImageAspectFlags) -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange::default()
        .aspect_mask(aspect_mask)
        .base_mip_level(0)
        .level_count(vk::REMAINING_MIP_LEVELS)
        .base_array_layer(0)
        .layer_count(vk::REMAINING_ARRAY_LAYERS)
}

/// Records a layout transition barrier for `image` from `old` to `new`.
///
/// The barrier:
/// - waits for all prior GPU work touching the image (ALL_COMMANDS source
///   stage)
/// - makes all prior writes available (MEMORY_WRITE source access)
/// - blocks all subsequent stages needing read or write access
///   (ALL_COMMANDS destination stage, MEMORY_READ | MEMORY_WRITE access)
/// - declares the image's new layout, with the aspect mask chosen from the
///   destination state
///
/// A transition must be issued every time the image's required access
/// pattern changes; the caller's [`LayoutTracker`] is the guard against
/// skipping one.
pub fn transition_image(
    device: &Device,
    cmd: vk::CommandBuffer,
    image: vk::Image,
    old: ImageState,
    new: ImageState,
) {
    let barrier = vk::ImageMemoryBarrier2::default()
        .src_stage_mask(vk::PipelineStageFlags2::ALL_COMMANDS)
        .src_access_mask(vk::AccessFlags2::MEMORY_WRITE)
        .dst_stage_mask(vk::PipelineStageFlags2::ALL_COMMANDS)
        .dst_access_mask(vk::AccessFlags2::MEMORY_WRITE | vk::AccessFlags2::MEMORY_READ)
        .old_layout(old.vk_layout())
        .new_layout(new.vk_layout())
        .subresource_range(full_subresource_range(new.aspect_mask()))
        .image(image);

    let barriers = [barrier];
    let dependency_info = vk::DependencyInfo::default().image_memory_barriers(&barriers);

    unsafe {
        device.handle().cmd_pipeline_barrier2(cmd, &dependency_info);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aspect_mask_follows_destination() {
        assert_eq!(
            ImageState::DepthAttachment.aspect_mask(),
            vk::ImageAspectFlags::DEPTH
        );
        assert_eq!(
            ImageState::ColorAttachment.aspect_mask(),
            vk::ImageAspectFlags::COLOR
        );
        assert_eq!(
            ImageState::PresentSrc.aspect_mask(),
            vk::ImageAspectFlags::COLOR
        );
        assert_eq!(ImageState::General.aspect_mask(), vk::ImageAspectFlags::COLOR);
    }

    #[test]
    fn test_vk_layout_mapping() {
        assert_eq!(ImageState::Undefined.vk_layout(), vk::ImageLayout::UNDEFINED);
        assert_eq!(ImageState::General.vk_layout(), vk::ImageLayout::GENERAL);
        assert_eq!(
            ImageState::PresentSrc.vk_layout(),
            vk::ImageLayout::PRESENT_SRC_KHR
        );
        assert_eq!(
            ImageState::TransferSrc.vk_layout(),
            vk::ImageLayout::TRANSFER_SRC_OPTIMAL
        );
    }

    #[test]
    fn test_tracker_round_trip_restores_state_with_two_barriers() {
        let mut tracker = LayoutTracker::new(ImageState::General);

        assert!(tracker.expect(ImageState::General));
        tracker.advance(ImageState::TransferSrc);

        assert!(tracker.expect(ImageState::TransferSrc));
        tracker.advance(ImageState::General);

        // Round trip ends where it started, but both barriers were recorded
        assert_eq!(tracker.state(), ImageState::General);
        assert_eq!(tracker.transitions(), 2);
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn test_tracker_rejects_mismatched_old_state() {
        let tracker = LayoutTracker::new(ImageState::Undefined);
        assert!(!tracker.expect(ImageState::General));
    }

    #[test]
    fn test_tracker_reset_does_not_count() {
        let mut tracker = LayoutTracker::new(ImageState::PresentSrc);
        tracker.reset(ImageState::Undefined);
        assert_eq!(tracker.state(), ImageState::Undefined);
        assert_eq!(tracker.transitions(), 0);
    }

    #[test]
    fn test_full_subresource_range_covers_all_levels() {
        let range = full_subresource_range(vk::ImageAspectFlags::COLOR);
        assert_eq!(range.level_count, vk::REMAINING_MIP_LEVELS);
        assert_eq!(range.layer_count, vk::REMAINING_ARRAY_LAYERS);
        assert_eq!(range.base_mip_level, 0);
        assert_eq!(range.base_array_layer, 0);
    }
}
