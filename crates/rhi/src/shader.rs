//! Shader module management.
//!
//! This module handles SPIR-V loading and VkShaderModule creation. Shaders
//! are consumed as pre-compiled binaries from disk; compiling them is
//! outside this crate's concern.
//!
//! # Overview
//!
//! - [`ShaderStage`] defines the type of shader (vertex, fragment, compute)
//! - [`Shader`] wraps VkShaderModule with stage and entry point information
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::path::Path;
//! use ember_rhi::device::Device;
//! use ember_rhi::shader::{Shader, ShaderStage};
//!
//! # fn example(device: Arc<Device>) -> Result<(), ember_rhi::RhiError> {
//! let compute = Shader::from_spirv_file(
//!     device,
//!     Path::new("shaders/spirv/gradient.comp.spv"),
//!     ShaderStage::Compute,
//! )?;
//!
//! let _stage_info = compute.stage_create_info();
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::{RhiError, RhiResult};

/// Shader entry point name. All shaders in the project use `main`.
const ENTRY_POINT: &std::ffi::CStr = c"main";

/// Shader stage type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Vertex shader stage - processes each vertex
    Vertex,
    /// Fragment shader stage - processes each fragment
    Fragment,
    /// Compute shader stage - general-purpose GPU work
    Compute,
}

impl ShaderStage {
    /// Converts to Vulkan shader stage flags.
    pub fn to_vk_stage(self) -> vk::ShaderStageFlags {
        match self {
            ShaderStage::Vertex => vk::ShaderStageFlags::VERTEX,
            ShaderStage::Fragment => vk::ShaderStageFlags::FRAGMENT,
            ShaderStage::Compute => vk::ShaderStageFlags::COMPUTE,
        }
    }
}

/// Shader module wrapper.
///
/// Owns a VkShaderModule created from a SPIR-V binary, along with the
/// pipeline stage it is meant for.
pub struct Shader {
    /// Reference to the logical device.
    device: Arc<Device>,
    /// Vulkan shader module handle.
    module: vk::ShaderModule,
    /// Pipeline stage this shader runs in.
    stage: ShaderStage,
}

impl Shader {
    /// Loads a shader from a SPIR-V file on disk.
    ///
    /// # Arguments
    ///
    /// * `device` - The logical device
    /// * `path` - Path to the compiled `.spv` binary
    /// * `stage` - Pipeline stage the shader runs in
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::ShaderError`] if the file cannot be read or is
    /// not valid SPIR-V (missing shader binaries are a content error, not
    /// a device error).
    pub fn from_spirv_file(device: Arc<Device>, path: &Path, stage: ShaderStage) -> RhiResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            RhiError::ShaderError(format!("Failed to read '{}': {}", path.display(), e))
        })?;

        Self::from_spirv_bytes(device, &bytes, stage).map_err(|e| match e {
            RhiError::ShaderError(msg) => {
                RhiError::ShaderError(format!("'{}': {}", path.display(), msg))
            }
            other => other,
        })
    }

    /// Creates a shader module from SPIR-V bytes.
    ///
    /// # Arguments
    ///
    /// * `device` - The logical device
    /// * `bytes` - Raw SPIR-V binary contents
    /// * `stage` - Pipeline stage the shader runs in
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not valid SPIR-V or module
    /// creation fails.
    pub fn from_spirv_bytes(
        device: Arc<Device>,
        bytes: &[u8],
        stage: ShaderStage,
    ) -> RhiResult<Self> {
        // SPIR-V is a stream of 32-bit words
        if bytes.is_empty() || bytes.len() % 4 != 0 {
            return Err(RhiError::ShaderError(format!(
                "Invalid SPIR-V size: {} bytes",
                bytes.len()
            )));
        }

        let mut cursor = std::io::Cursor::new(bytes);
        let code = ash::util::read_spv(&mut cursor)
            .map_err(|e| RhiError::ShaderError(format!("Failed to parse SPIR-V: {}", e)))?;

        let create_info = vk::ShaderModuleCreateInfo::default().code(&code);

        let module = unsafe { device.handle().create_shader_module(&create_info, None)? };

        debug!(
            "Created {:?} shader module ({} bytes)",
            stage,
            bytes.len()
        );

        Ok(Self {
            device,
            module,
            stage,
        })
    }

    /// Returns the Vulkan shader module handle.
    #[inline]
    pub fn handle(&self) -> vk::ShaderModule {
        self.module
    }

    /// Returns the shader stage.
    #[inline]
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    /// Builds the pipeline shader stage create info for this shader.
    pub fn stage_create_info(&self) -> vk::PipelineShaderStageCreateInfo<'_> {
        vk::PipelineShaderStageCreateInfo::default()
            .stage(self.stage.to_vk_stage())
            .module(self.module)
            .name(ENTRY_POINT)
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_shader_module(self.module, None);
        }
        debug!("Destroyed {:?} shader module", self.stage);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shader_stage_to_vk_stage() {
        assert_eq!(
            ShaderStage::Vertex.to_vk_stage(),
            vk::ShaderStageFlags::VERTEX
        );
        assert_eq!(
            ShaderStage::Fragment.to_vk_stage(),
            vk::ShaderStageFlags::FRAGMENT
        );
        assert_eq!(
            ShaderStage::Compute.to_vk_stage(),
            vk::ShaderStageFlags::COMPUTE
        );
    }

    #[test]
    fn test_shader_is_send() {
        // Compile-time check that Shader is Send
        fn assert_send<T: Send>() {}
        assert_send::<Shader>();
    }
}
