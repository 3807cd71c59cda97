//! Engine configuration.

use std::path::PathBuf;

/// Startup configuration for the engine.
///
/// Collects the knobs that would otherwise be scattered as constants:
/// window extent, validation, and where compiled shader binaries live.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Initial window width in pixels.
    pub width: u32,
    /// Initial window height in pixels.
    pub height: u32,
    /// Window title.
    pub title: String,
    /// Whether to enable Vulkan validation layers.
    pub enable_validation: bool,
    /// Directory containing compiled SPIR-V shader binaries.
    pub shader_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            width: 1700,
            height: 900,
            title: "ember".to_string(),
            enable_validation: cfg!(debug_assertions),
            shader_dir: PathBuf::from("shaders/spirv"),
        }
    }
}

impl EngineConfig {
    /// Resolve the path of a compiled shader binary by file name.
    pub fn shader_path(&self, name: &str) -> PathBuf {
        self.shader_dir.join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_has_nonzero_extent() {
        let config = EngineConfig::default();
        assert!(config.width > 0);
        assert!(config.height > 0);
    }

    #[test]
    fn test_shader_path_joins_dir() {
        let config = EngineConfig::default();
        let path = config.shader_path("gradient.comp.spv");
        assert!(path.ends_with("gradient.comp.spv"));
        assert!(path.starts_with(&config.shader_dir));
    }
}
