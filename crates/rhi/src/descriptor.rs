//! Descriptor set management for shader resource binding.
//!
//! This module provides the small descriptor surface the engine needs:
//! - [`DescriptorLayoutBuilder`] collects bindings into a set layout
//! - [`DescriptorAllocator`] owns a pool sized by type ratios and hands
//!   out sets
//! - [`write_image_descriptor`] points a set binding at an image view
//!
//! The only descriptor in the frame loop is the storage image the
//! background compute effects write to.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ash::vk;
//! use ember_rhi::device::Device;
//! use ember_rhi::descriptor::{DescriptorAllocator, DescriptorLayoutBuilder, PoolSizeRatio};
//!
//! # fn example(device: Arc<Device>, draw_image_view: vk::ImageView) -> Result<(), ember_rhi::RhiError> {
//! let layout = DescriptorLayoutBuilder::new()
//!     .add_binding(0, vk::DescriptorType::STORAGE_IMAGE)
//!     .build(device.clone(), vk::ShaderStageFlags::COMPUTE)?;
//!
//! let allocator = DescriptorAllocator::new(
//!     device.clone(),
//!     10,
//!     &[PoolSizeRatio::new(vk::DescriptorType::STORAGE_IMAGE, 1.0)],
//! )?;
//!
//! let set = allocator.allocate(&layout)?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::RhiResult;

/// Descriptor set layout wrapper.
///
/// # Thread Safety
///
/// The layout is immutable after creation.
pub struct DescriptorSetLayout {
    /// Reference to the logical device.
    device: Arc<Device>,
    /// Vulkan descriptor set layout handle.
    layout: vk::DescriptorSetLayout,
}

impl DescriptorSetLayout {
    /// Returns the Vulkan descriptor set layout handle.
    #[inline]
    pub fn handle(&self) -> vk::DescriptorSetLayout {
        self.layout
    }
}

impl Drop for DescriptorSetLayout {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .destroy_descriptor_set_layout(self.layout, None);
        }
        debug!("Destroyed descriptor set layout");
    }
}

/// Builder collecting bindings for a descriptor set layout.
#[derive(Default)]
pub struct DescriptorLayoutBuilder {
    bindings: Vec<vk::DescriptorSetLayoutBinding<'static>>,
}

impl DescriptorLayoutBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a binding of the given type at the given binding index.
    pub fn add_binding(mut self, binding: u32, descriptor_type: vk::DescriptorType) -> Self {
        self.bindings.push(
            vk::DescriptorSetLayoutBinding::default()
                .binding(binding)
                .descriptor_type(descriptor_type)
                .descriptor_count(1),
        );
        self
    }

    /// Builds the layout, applying `stages` to every binding.
    ///
    /// # Errors
    ///
    /// Returns an error if layout creation fails.
    pub fn build(
        mut self,
        device: Arc<Device>,
        stages: vk::ShaderStageFlags,
    ) -> RhiResult<DescriptorSetLayout> {
        for binding in &mut self.bindings {
            binding.stage_flags = stages;
        }

        let create_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&self.bindings);

        let layout = unsafe {
            device
                .handle()
                .create_descriptor_set_layout(&create_info, None)?
        };

        debug!(
            "Created descriptor set layout with {} binding(s)",
            self.bindings.len()
        );

        Ok(DescriptorSetLayout { device, layout })
    }
}

/// Pool size expressed as a ratio of the pool's maximum set count.
#[derive(Clone, Copy, Debug)]
pub struct PoolSizeRatio {
    /// Descriptor type this ratio applies to.
    pub descriptor_type: vk::DescriptorType,
    /// Descriptors of this type per set.
    pub ratio: f32,
}

impl PoolSizeRatio {
    /// Creates a new pool size ratio.
    pub fn new(descriptor_type: vk::DescriptorType, ratio: f32) -> Self {
        Self {
            descriptor_type,
            ratio,
        }
    }
}

/// Descriptor pool wrapper that allocates sets.
pub struct DescriptorAllocator {
    /// Reference to the logical device.
    device: Arc<Device>,
    /// Vulkan descriptor pool handle.
    pool: vk::DescriptorPool,
}

impl DescriptorAllocator {
    /// Creates a pool for up to `max_sets` sets, with per-type capacities
    /// derived from the given ratios.
    ///
    /// # Errors
    ///
    /// Returns an error if pool creation fails.
    pub fn new(
        device: Arc<Device>,
        max_sets: u32,
        ratios: &[PoolSizeRatio],
    ) -> RhiResult<Self> {
        let pool_sizes: Vec<vk::DescriptorPoolSize> = ratios
            .iter()
            .map(|r| {
                vk::DescriptorPoolSize::default()
                    .ty(r.descriptor_type)
                    .descriptor_count((r.ratio * max_sets as f32) as u32)
            })
            .collect();

        let create_info = vk::DescriptorPoolCreateInfo::default()
            .max_sets(max_sets)
            .pool_sizes(&pool_sizes);

        let pool = unsafe { device.handle().create_descriptor_pool(&create_info, None)? };

        debug!(
            "Created descriptor pool: {} sets, {} size(s)",
            max_sets,
            pool_sizes.len()
        );

        Ok(Self { device, pool })
    }

    /// Allocates a single descriptor set with the given layout.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool is exhausted or allocation fails.
    pub fn allocate(&self, layout: &DescriptorSetLayout) -> RhiResult<vk::DescriptorSet> {
        let layouts = [layout.handle()];
        let alloc_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(self.pool)
            .set_layouts(&layouts);

        let sets = unsafe { self.device.handle().allocate_descriptor_sets(&alloc_info)? };
        Ok(sets[0])
    }
}

impl Drop for DescriptorAllocator {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_descriptor_pool(self.pool, None);
        }
        debug!("Destroyed descriptor pool");
    }
}

/// Points `binding` of `set` at an image view in the given layout.
pub fn write_image_descriptor(
    device: &Device,
    set: vk::DescriptorSet,
    binding: u32,
    descriptor_type: vk::DescriptorType,
    image_view: vk::ImageView,
    image_layout: vk::ImageLayout,
) {
    let image_info = vk::DescriptorImageInfo::default()
        .image_view(image_view)
        .image_layout(image_layout);

    let image_infos = [image_info];
    let write = vk::WriteDescriptorSet::default()
        .dst_set(set)
        .dst_binding(binding)
        .descriptor_type(descriptor_type)
        .image_info(&image_infos);

    unsafe {
        device.handle().update_descriptor_sets(&[write], &[]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_builder_collects_bindings() {
        let builder = DescriptorLayoutBuilder::new()
            .add_binding(0, vk::DescriptorType::STORAGE_IMAGE)
            .add_binding(1, vk::DescriptorType::UNIFORM_BUFFER);

        assert_eq!(builder.bindings.len(), 2);
        assert_eq!(builder.bindings[0].binding, 0);
        assert_eq!(
            builder.bindings[0].descriptor_type,
            vk::DescriptorType::STORAGE_IMAGE
        );
        assert_eq!(builder.bindings[1].binding, 1);
    }

    #[test]
    fn test_pool_size_ratio_scales_with_max_sets() {
        let ratio = PoolSizeRatio::new(vk::DescriptorType::STORAGE_IMAGE, 1.5);
        let max_sets = 10u32;
        let count = (ratio.ratio * max_sets as f32) as u32;
        assert_eq!(count, 15);
    }
}
