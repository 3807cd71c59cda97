//! The frame orchestrator.
//!
//! [`Engine`] owns the GPU context and sequences every frame: wait on the
//! slot's fence, flush that slot's deletion queue, acquire a presentable
//! image, record the frame's command buffer (compute background →
//! geometry → blit → overlay, with an explicit layout transition at each
//! access change), submit with the slot's semaphore pair, present, and
//! advance the frame counter.
//!
//! # Error policy
//!
//! Device-level failures propagate out of [`draw`](Engine::draw) and are
//! fatal: the caller is expected to tear the process down. Stale-surface
//! conditions during acquisition or presentation are not errors; they set
//! the resize flag, the cycle is abandoned without advancing the frame
//! counter, and the next cycle recreates the swapchain and retries.

use std::path::Path;
use std::sync::Arc;

use ash::vk;
use glam::{Mat4, Vec3, Vec4};
use tracing::{debug, error, info, warn};

use ember_assets::load_gltf_meshes;
use ember_core::EngineConfig;
use ember_platform::{Surface, Window};
use ember_rhi::buffer::{Buffer, BufferUsage};
use ember_rhi::command::{CommandBuffer, command_buffer_submit_info, semaphore_submit_info};
use ember_rhi::descriptor::{
    DescriptorAllocator, DescriptorLayoutBuilder, DescriptorSetLayout, PoolSizeRatio,
    write_image_descriptor,
};
use ember_rhi::device::Device;
use ember_rhi::image::AllocatedImage;
use ember_rhi::instance::Instance;
use ember_rhi::physical_device::select_physical_device;
use ember_rhi::pipeline::{GraphicsPipelineBuilder, Pipeline, PipelineLayout};
use ember_rhi::rendering::{ColorAttachment, DepthAttachment, RenderingConfig};
use ember_rhi::shader::{Shader, ShaderStage};
use ember_rhi::swapchain::Swapchain;
use ember_rhi::transition::{ImageState, transition_image};
use ember_rhi::vertex::Vertex;
use ember_rhi::{RhiError, RhiResult};

use crate::deletion::DeletionQueue;
use crate::effects::{BackgroundEffects, ComputeEffect, ComputePushConstants};
use crate::frame::FrameSlots;
use crate::immediate::ImmediateSubmit;
use crate::mesh::{GpuDrawPushConstants, GpuMeshBuffers, MeshAsset, mesh_buffer_sizes};
use crate::overlay::OverlayRenderer;

/// Timeout for the per-frame fence wait and image acquisition, in
/// nanoseconds. Exceeding it means the GPU hung; that is fatal.
const FRAME_TIMEOUT_NS: u64 = 1_000_000_000;

/// Format of the off-screen draw target.
const DRAW_IMAGE_FORMAT: vk::Format = vk::Format::R16G16B16A16_SFLOAT;

/// Format of the depth target.
const DEPTH_IMAGE_FORMAT: vk::Format = vk::Format::D32_SFLOAT;

/// The rendering engine: GPU context, per-frame state, and the frame
/// orchestrator.
///
/// # Teardown order
///
/// Fields are declared in drop order: frame state and GPU objects first,
/// then the swapchain, the surface, the device, and finally the instance.
/// [`Drop`] waits for the device to go idle and flushes all deletion
/// queues before any field is released.
pub struct Engine {
    /// Overlay recorded into the composition pass each frame.
    overlay: Box<dyn OverlayRenderer>,

    /// Meshes loaded from disk at startup.
    meshes: Vec<Arc<MeshAsset>>,
    /// Built-in test rectangle drawn by the mesh pipeline.
    rectangle: Option<GpuMeshBuffers>,

    /// Process-lifetime deletion queue, flushed once at shutdown.
    main_deletion_queue: DeletionQueue,

    /// Blocking channel for setup-time uploads.
    immediate: ImmediateSubmit,
    /// Rotating per-frame slots.
    frames: FrameSlots,

    /// Mesh raster pipeline (vertex pulling + depth test).
    mesh_pipeline: Pipeline,
    mesh_pipeline_layout: PipelineLayout,
    /// Hardcoded-triangle raster pipeline.
    triangle_pipeline: Pipeline,
    triangle_pipeline_layout: PipelineLayout,
    /// Background compute effects (pipelines share `background_layout`).
    background: BackgroundEffects,
    background_layout: PipelineLayout,

    /// Storage-image descriptor for the draw image.
    draw_image_descriptors: vk::DescriptorSet,
    draw_image_descriptor_layout: DescriptorSetLayout,
    descriptor_allocator: DescriptorAllocator,

    /// Depth target for the geometry pass.
    depth_image: AllocatedImage,
    /// Off-screen draw target; blitted into the swapchain image.
    draw_image: AllocatedImage,
    /// Extent actually rendered this frame.
    draw_extent: vk::Extent2D,

    swapchain: Swapchain,
    surface: Surface,
    device: Arc<Device>,
    instance: Instance,

    /// Swapchain no longer matches the surface; recreate before drawing.
    resize_requested: bool,
    /// Window is minimized; the app skips drawing entirely.
    paused: bool,
    /// Current window extent, updated from resize events.
    window_extent: vk::Extent2D,
}

impl Engine {
    /// Initializes the full GPU context for the given window.
    ///
    /// # Arguments
    ///
    /// * `config` - Startup configuration
    /// * `window` - The window to present into
    /// * `overlay` - Overlay recorded into the composition pass
    ///
    /// # Errors
    ///
    /// Returns an error if any device-level initialization step fails.
    /// Missing mesh assets are logged and skipped, not fatal.
    pub fn new(
        config: &EngineConfig,
        window: &Window,
        overlay: Box<dyn OverlayRenderer>,
    ) -> RhiResult<Self> {
        let window_extent = vk::Extent2D {
            width: window.width(),
            height: window.height(),
        };

        info!(
            "Initializing engine ({}x{})",
            window_extent.width, window_extent.height
        );

        let instance = Instance::new(config.enable_validation)?;

        let surface = window
            .create_surface(instance.entry(), instance.handle())
            .map_err(|e| RhiError::SurfaceError(e.to_string()))?;

        let physical_device =
            select_physical_device(instance.handle(), surface.handle(), surface.loader())?;

        let device = Device::new(&instance, &physical_device)?;

        let swapchain = Swapchain::new(
            &instance,
            device.clone(),
            surface.handle(),
            window_extent.width,
            window_extent.height,
        )?;

        // Off-screen targets match the initial window size; the blit into
        // the swapchain image rescales if the window is later resized
        let draw_image = AllocatedImage::new(
            device.clone(),
            window_extent,
            DRAW_IMAGE_FORMAT,
            vk::ImageUsageFlags::TRANSFER_SRC
                | vk::ImageUsageFlags::TRANSFER_DST
                | vk::ImageUsageFlags::STORAGE
                | vk::ImageUsageFlags::COLOR_ATTACHMENT,
            vk::ImageAspectFlags::COLOR,
        )?;

        let depth_image = AllocatedImage::new(
            device.clone(),
            window_extent,
            DEPTH_IMAGE_FORMAT,
            vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
            vk::ImageAspectFlags::DEPTH,
        )?;

        // The compute effects write the draw image through this set
        let descriptor_allocator = DescriptorAllocator::new(
            device.clone(),
            10,
            &[PoolSizeRatio::new(vk::DescriptorType::STORAGE_IMAGE, 1.0)],
        )?;

        let draw_image_descriptor_layout = DescriptorLayoutBuilder::new()
            .add_binding(0, vk::DescriptorType::STORAGE_IMAGE)
            .build(device.clone(), vk::ShaderStageFlags::COMPUTE)?;

        let draw_image_descriptors = descriptor_allocator.allocate(&draw_image_descriptor_layout)?;

        write_image_descriptor(
            &device,
            draw_image_descriptors,
            0,
            vk::DescriptorType::STORAGE_IMAGE,
            draw_image.view(),
            vk::ImageLayout::GENERAL,
        );

        let (background_layout, background) =
            Self::create_background_effects(&device, config, &draw_image_descriptor_layout)?;

        let (triangle_pipeline_layout, triangle_pipeline) =
            Self::create_triangle_pipeline(&device, config)?;

        let (mesh_pipeline_layout, mesh_pipeline) = Self::create_mesh_pipeline(&device, config)?;

        let frames = FrameSlots::new(device.clone())?;
        let immediate = ImmediateSubmit::new(device.clone())?;

        let mut engine = Self {
            overlay,
            meshes: Vec::new(),
            rectangle: None,
            main_deletion_queue: DeletionQueue::new(),
            immediate,
            frames,
            mesh_pipeline,
            mesh_pipeline_layout,
            triangle_pipeline,
            triangle_pipeline_layout,
            background,
            background_layout,
            draw_image_descriptors,
            draw_image_descriptor_layout,
            descriptor_allocator,
            depth_image,
            draw_image,
            draw_extent: window_extent,
            swapchain,
            surface,
            device,
            instance,
            resize_requested: false,
            paused: false,
            window_extent,
        };

        engine.init_default_data()?;

        info!(
            "Engine initialized: {} swapchain images, {} background effects, {} meshes",
            engine.swapchain.image_count(),
            engine.background.len(),
            engine.meshes.len()
        );

        Ok(engine)
    }

    /// Builds the shared compute layout and the background effect list.
    fn create_background_effects(
        device: &Arc<Device>,
        config: &EngineConfig,
        draw_image_layout: &DescriptorSetLayout,
    ) -> RhiResult<(PipelineLayout, BackgroundEffects)> {
        let push_constant_range = vk::PushConstantRange {
            stage_flags: vk::ShaderStageFlags::COMPUTE,
            offset: 0,
            size: ComputePushConstants::SIZE as u32,
        };

        let layout = PipelineLayout::new(
            device.clone(),
            &[draw_image_layout.handle()],
            &[push_constant_range],
        )?;

        let gradient_shader = Shader::from_spirv_file(
            device.clone(),
            &config.shader_path("gradient.comp.spv"),
            ShaderStage::Compute,
        )?;
        let sky_shader = Shader::from_spirv_file(
            device.clone(),
            &config.shader_path("sky.comp.spv"),
            ShaderStage::Compute,
        )?;

        let gradient = ComputeEffect {
            name: "gradient",
            pipeline: Pipeline::new_compute(device.clone(), &layout, &gradient_shader)?,
            data: ComputePushConstants {
                data1: Vec4::new(1.0, 0.0, 0.0, 1.0),
                data2: Vec4::new(0.0, 0.0, 1.0, 1.0),
                ..Default::default()
            },
        };

        let sky = ComputeEffect {
            name: "sky",
            pipeline: Pipeline::new_compute(device.clone(), &layout, &sky_shader)?,
            data: ComputePushConstants {
                data1: Vec4::new(0.1, 0.2, 0.4, 0.97),
                ..Default::default()
            },
        };

        Ok((layout, BackgroundEffects::new(vec![gradient, sky])))
    }

    /// Builds the hardcoded-triangle pipeline.
    fn create_triangle_pipeline(
        device: &Arc<Device>,
        config: &EngineConfig,
    ) -> RhiResult<(PipelineLayout, Pipeline)> {
        let vertex_shader = Shader::from_spirv_file(
            device.clone(),
            &config.shader_path("colored_triangle.vert.spv"),
            ShaderStage::Vertex,
        )?;
        let fragment_shader = Shader::from_spirv_file(
            device.clone(),
            &config.shader_path("colored_triangle.frag.spv"),
            ShaderStage::Fragment,
        )?;

        let layout = PipelineLayout::new(device.clone(), &[], &[])?;

        let pipeline = GraphicsPipelineBuilder::new()
            .vertex_shader(&vertex_shader)
            .fragment_shader(&fragment_shader)
            .color_attachment_format(DRAW_IMAGE_FORMAT)
            .depth_attachment_format(DEPTH_IMAGE_FORMAT)
            .build(device.clone(), &layout)?;

        Ok((layout, pipeline))
    }

    /// Builds the mesh pipeline (vertex pulling through buffer device
    /// addresses, depth test on).
    fn create_mesh_pipeline(
        device: &Arc<Device>,
        config: &EngineConfig,
    ) -> RhiResult<(PipelineLayout, Pipeline)> {
        let vertex_shader = Shader::from_spirv_file(
            device.clone(),
            &config.shader_path("mesh.vert.spv"),
            ShaderStage::Vertex,
        )?;
        let fragment_shader = Shader::from_spirv_file(
            device.clone(),
            &config.shader_path("colored_triangle.frag.spv"),
            ShaderStage::Fragment,
        )?;

        let push_constant_range = vk::PushConstantRange {
            stage_flags: vk::ShaderStageFlags::VERTEX,
            offset: 0,
            size: GpuDrawPushConstants::SIZE as u32,
        };

        let layout = PipelineLayout::new(device.clone(), &[], &[push_constant_range])?;

        let pipeline = GraphicsPipelineBuilder::new()
            .vertex_shader(&vertex_shader)
            .fragment_shader(&fragment_shader)
            .color_attachment_format(DRAW_IMAGE_FORMAT)
            .depth_attachment_format(DEPTH_IMAGE_FORMAT)
            .depth_test(true, vk::CompareOp::LESS_OR_EQUAL)
            .build(device.clone(), &layout)?;

        Ok((layout, pipeline))
    }

    /// Uploads the built-in rectangle and loads the default mesh file.
    fn init_default_data(&mut self) -> RhiResult<()> {
        let rect_vertices = [
            Vertex::new(Vec3::new(0.5, -0.5, 0.0), Vec3::Z, [0.0, 0.0], Vec4::new(0.0, 0.0, 0.0, 1.0)),
            Vertex::new(Vec3::new(0.5, 0.5, 0.0), Vec3::Z, [0.0, 0.0], Vec4::new(0.5, 0.5, 0.5, 1.0)),
            Vertex::new(Vec3::new(-0.5, -0.5, 0.0), Vec3::Z, [0.0, 0.0], Vec4::new(1.0, 0.0, 0.0, 1.0)),
            Vertex::new(Vec3::new(-0.5, 0.5, 0.0), Vec3::Z, [0.0, 0.0], Vec4::new(0.0, 1.0, 0.0, 1.0)),
        ];
        let rect_indices = [0u32, 1, 2, 2, 1, 3];

        self.rectangle = Some(self.upload_mesh(&rect_indices, &rect_vertices)?);

        // Asset errors degrade, they don't abort startup
        self.load_meshes(Path::new("assets/basicmesh.glb"));

        Ok(())
    }

    /// Loads every mesh in a glTF file and uploads it to the GPU.
    ///
    /// Load failures are logged and leave the engine without meshes.
    pub fn load_meshes(&mut self, path: &Path) {
        let mesh_data = match load_gltf_meshes(path) {
            Ok(meshes) => meshes,
            Err(e) => {
                warn!("Failed to load meshes: {}", e);
                return;
            }
        };

        for data in mesh_data {
            match self.upload_mesh(&data.indices, &data.vertices) {
                Ok(buffers) => {
                    self.meshes.push(Arc::new(MeshAsset {
                        name: data.name,
                        surfaces: data.surfaces,
                        buffers,
                    }));
                }
                Err(e) => {
                    error!("Failed to upload mesh '{}': {}", data.name, e);
                }
            }
        }
    }

    /// Realizes GPU-resident copies of a vertex/index stream.
    ///
    /// Both buffers are device-local; the data goes through one staging
    /// buffer and one blocking immediate submission.
    ///
    /// # Errors
    ///
    /// Returns an error if buffer creation, the staging write, or the
    /// immediate submission fails.
    pub fn upload_mesh(
        &mut self,
        indices: &[u32],
        vertices: &[Vertex],
    ) -> RhiResult<GpuMeshBuffers> {
        let (vertex_buffer_size, index_buffer_size) =
            mesh_buffer_sizes(vertices.len(), indices.len());

        let vertex_buffer = Buffer::new(self.device.clone(), BufferUsage::Vertex, vertex_buffer_size)?;
        let vertex_buffer_address = vertex_buffer.device_address();

        let index_buffer = Buffer::new(self.device.clone(), BufferUsage::Index, index_buffer_size)?;

        // One staging buffer carries both streams: vertices first,
        // indices after
        let staging = Buffer::new(
            self.device.clone(),
            BufferUsage::Staging,
            vertex_buffer_size + index_buffer_size,
        )?;
        staging.write_data(0, bytemuck::cast_slice(vertices))?;
        staging.write_data(vertex_buffer_size, bytemuck::cast_slice(indices))?;

        self.immediate.submit(|cmd| {
            let vertex_copy = vk::BufferCopy {
                src_offset: 0,
                dst_offset: 0,
                size: vertex_buffer_size,
            };
            cmd.copy_buffer(staging.handle(), vertex_buffer.handle(), &[vertex_copy]);

            let index_copy = vk::BufferCopy {
                src_offset: vertex_buffer_size,
                dst_offset: 0,
                size: index_buffer_size,
            };
            cmd.copy_buffer(staging.handle(), index_buffer.handle(), &[index_copy]);
        })?;

        debug!(
            "Uploaded mesh: {} vertices ({} bytes), {} indices ({} bytes)",
            vertices.len(),
            vertex_buffer_size,
            indices.len(),
            index_buffer_size
        );

        // The immediate submission blocked until the copies finished, so
        // the staging buffer can drop here

        Ok(GpuMeshBuffers {
            index_buffer,
            vertex_buffer,
            vertex_buffer_address,
        })
    }

    /// Records and submits one frame.
    ///
    /// # Errors
    ///
    /// Returns an error on device-level failures, which are fatal. Stale
    /// surface conditions abandon the cycle cleanly and return `Ok`.
    pub fn draw(&mut self) -> RhiResult<()> {
        if self.resize_requested {
            self.resize_swapchain()?;
        }

        // 1. Wait until the GPU has finished this slot's previous frame
        self.frames.current().render_fence.wait(FRAME_TIMEOUT_NS)?;

        // 2. Objects retired two cycles ago are now safe to destroy
        self.frames.current_mut().deletion_queue.flush();

        // 3. Acquire a presentable image
        let frame = self.frames.current();
        let image_index = match self
            .swapchain
            .acquire_next_image(frame.swapchain_semaphore.handle(), FRAME_TIMEOUT_NS)
        {
            Ok((index, false)) => index,
            Ok((_, true)) => {
                debug!("Swapchain suboptimal during acquire");
                self.resize_requested = true;
                return Ok(());
            }
            Err(
                vk::Result::ERROR_OUT_OF_DATE_KHR
                | vk::Result::ERROR_SURFACE_LOST_KHR
                | vk::Result::TIMEOUT
                | vk::Result::NOT_READY,
            ) => {
                debug!("Swapchain unusable during acquire");
                self.resize_requested = true;
                return Ok(());
            }
            Err(e) => return Err(RhiError::VulkanError(e)),
        };

        // 4. The slot is ours: reset its fence and recorder
        frame.render_fence.reset()?;
        frame.command_buffer.reset()?;

        self.draw_extent = self.draw_image.extent();

        let swapchain_image = self.swapchain.image(image_index as usize);
        let swapchain_extent = self.swapchain.extent();

        // 5. Record the frame
        frame.command_buffer.begin()?;
        let cmd = frame.command_buffer.handle();

        // Both targets are redrawn from scratch; their previous contents
        // are irrelevant
        self.draw_image.forget_contents();
        self.depth_image.forget_contents();

        self.draw_image
            .transition(cmd, ImageState::Undefined, ImageState::General);

        self.draw_background(&frame.command_buffer);

        self.draw_image
            .transition(cmd, ImageState::General, ImageState::ColorAttachment);
        self.depth_image
            .transition(cmd, ImageState::Undefined, ImageState::DepthAttachment);

        self.draw_geometry(&frame.command_buffer);

        // Copy the draw image into the acquired swapchain image
        self.draw_image
            .transition(cmd, ImageState::ColorAttachment, ImageState::TransferSrc);
        transition_image(
            &self.device,
            cmd,
            swapchain_image,
            ImageState::Undefined,
            ImageState::TransferDst,
        );

        frame.command_buffer.blit_full_image(
            self.draw_image.handle(),
            swapchain_image,
            self.draw_extent,
            swapchain_extent,
        );

        // Composite the overlay directly onto the swapchain image
        transition_image(
            &self.device,
            cmd,
            swapchain_image,
            ImageState::TransferDst,
            ImageState::ColorAttachment,
        );

        let overlay_pass = RenderingConfig::new(
            swapchain_extent,
            ColorAttachment::new(self.swapchain.image_view(image_index as usize)),
        )
        .build();
        frame.command_buffer.begin_rendering(&overlay_pass.info());
        self.overlay.record(&frame.command_buffer, swapchain_extent);
        frame.command_buffer.end_rendering();

        transition_image(
            &self.device,
            cmd,
            swapchain_image,
            ImageState::ColorAttachment,
            ImageState::PresentSrc,
        );

        frame.command_buffer.end()?;

        // 6. Submit: rendering waits for the acquired image, presentation
        // waits for rendering, the fence closes the loop back to the CPU
        let cmd_infos = [command_buffer_submit_info(cmd)];
        let wait_infos = [semaphore_submit_info(
            vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT,
            frame.swapchain_semaphore.handle(),
        )];
        let signal_infos = [semaphore_submit_info(
            vk::PipelineStageFlags2::ALL_GRAPHICS,
            frame.render_semaphore.handle(),
        )];

        let submit = vk::SubmitInfo2::default()
            .command_buffer_infos(&cmd_infos)
            .wait_semaphore_infos(&wait_infos)
            .signal_semaphore_infos(&signal_infos);

        let render_semaphore = frame.render_semaphore.handle();
        let render_fence = frame.render_fence.handle();

        // SAFETY: the command buffer is fully recorded and the fence was
        // reset this cycle
        unsafe {
            self.device.submit_graphics(&[submit], render_fence)?;
        }

        // 7. Present, waiting on the render semaphore
        match self
            .swapchain
            .present(self.device.present_queue(), image_index, render_semaphore)
        {
            Ok(false) => {}
            Ok(true) => {
                debug!("Swapchain suboptimal during present");
                self.resize_requested = true;
                return Ok(());
            }
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR | vk::Result::ERROR_SURFACE_LOST_KHR) => {
                debug!("Swapchain out of date during present");
                self.resize_requested = true;
                return Ok(());
            }
            Err(e) => return Err(RhiError::VulkanError(e)),
        }

        // 8. Only a fully successful cycle advances the counter
        self.frames.advance();

        Ok(())
    }

    /// Records the compute pass that fills the draw image.
    fn draw_background(&self, cmd: &CommandBuffer) {
        let effect = self.background.current_effect();

        cmd.bind_pipeline(vk::PipelineBindPoint::COMPUTE, effect.pipeline.handle());
        cmd.bind_descriptor_sets(
            vk::PipelineBindPoint::COMPUTE,
            self.background_layout.handle(),
            0,
            &[self.draw_image_descriptors],
        );
        cmd.push_constants(
            self.background_layout.handle(),
            vk::ShaderStageFlags::COMPUTE,
            0,
            &effect.data,
        );

        // One 16x16 workgroup per tile of the draw extent
        cmd.dispatch(
            self.draw_extent.width.div_ceil(16),
            self.draw_extent.height.div_ceil(16),
            1,
        );
    }

    /// Records the geometry raster pass into the draw image.
    fn draw_geometry(&self, cmd: &CommandBuffer) {
        let pass = RenderingConfig::new(
            self.draw_extent,
            ColorAttachment::new(self.draw_image.view()),
        )
        .with_depth_attachment(DepthAttachment::new(self.depth_image.view()))
        .build();

        cmd.begin_rendering(&pass.info());

        let viewport = vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: self.draw_extent.width as f32,
            height: self.draw_extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        };
        cmd.set_viewport(&viewport);

        let scissor = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent: self.draw_extent,
        };
        cmd.set_scissor(&scissor);

        // Hardcoded triangle
        cmd.bind_pipeline(vk::PipelineBindPoint::GRAPHICS, self.triangle_pipeline.handle());
        cmd.draw(3, 1, 0, 0);

        // Mesh pipeline draws pull vertices through the buffer address
        cmd.bind_pipeline(vk::PipelineBindPoint::GRAPHICS, self.mesh_pipeline.handle());

        if let Some(rectangle) = &self.rectangle {
            let push = GpuDrawPushConstants::new(Mat4::IDENTITY, rectangle.vertex_buffer_address);
            cmd.push_constants(
                self.mesh_pipeline_layout.handle(),
                vk::ShaderStageFlags::VERTEX,
                0,
                &push,
            );
            cmd.bind_index_buffer(rectangle.index_buffer.handle(), 0, vk::IndexType::UINT32);
            cmd.draw_indexed(6, 1, 0, 0, 0);
        }

        if let Some(mesh) = self.meshes.get(2).or_else(|| self.meshes.last()) {
            let view = Mat4::from_translation(Vec3::new(0.0, 0.0, -5.0));
            let mut projection = Mat4::perspective_rh(
                70.0f32.to_radians(),
                self.draw_extent.width as f32 / self.draw_extent.height as f32,
                0.1,
                10_000.0,
            );
            // Vulkan clip space has Y pointing down
            projection.y_axis.y *= -1.0;

            let push = GpuDrawPushConstants::new(
                projection * view,
                mesh.buffers.vertex_buffer_address,
            );
            cmd.push_constants(
                self.mesh_pipeline_layout.handle(),
                vk::ShaderStageFlags::VERTEX,
                0,
                &push,
            );
            cmd.bind_index_buffer(mesh.buffers.index_buffer.handle(), 0, vk::IndexType::UINT32);

            for surface in &mesh.surfaces {
                cmd.draw_indexed(surface.count, 1, surface.start_index, 0, 0);
            }
        }

        cmd.end_rendering();
    }

    /// Recreates the swapchain at the current window extent.
    fn resize_swapchain(&mut self) -> RhiResult<()> {
        self.swapchain.recreate(
            &self.instance,
            self.surface.handle(),
            self.window_extent.width,
            self.window_extent.height,
        )?;

        // An abandoned acquire may have left a swapchain semaphore
        // signaled; recreate() waited for device idle, so fresh ones are
        // safe now
        self.frames.reset_semaphores(&self.device)?;

        self.resize_requested = false;
        Ok(())
    }

    /// Notifies the engine that the window has been resized.
    ///
    /// The swapchain is recreated at the start of the next cycle.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            debug!("Ignoring resize to zero dimensions");
            return;
        }

        if width != self.window_extent.width || height != self.window_extent.height {
            debug!(
                "Resize requested: {}x{} -> {}x{}",
                self.window_extent.width, self.window_extent.height, width, height
            );
            self.window_extent = vk::Extent2D { width, height };
            self.resize_requested = true;
        }
    }

    /// Pauses or resumes drawing (minimize / restore).
    pub fn set_paused(&mut self, paused: bool) {
        if paused != self.paused {
            info!("Rendering {}", if paused { "paused" } else { "resumed" });
        }
        self.paused = paused;
    }

    /// Returns true while drawing is paused.
    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Returns the number of fully completed frames.
    #[inline]
    pub fn frame_count(&self) -> u64 {
        self.frames.frame_count()
    }

    /// Returns the background effect list.
    #[inline]
    pub fn background(&self) -> &BackgroundEffects {
        &self.background
    }

    /// Returns the background effect list mutably (effect selection and
    /// push data editing).
    #[inline]
    pub fn background_mut(&mut self) -> &mut BackgroundEffects {
        &mut self.background
    }

    /// Registers a cleanup action on the process-lifetime deletion queue.
    ///
    /// Actions run in reverse registration order during shutdown, after
    /// the device idle wait.
    pub fn push_cleanup(&mut self, action: impl FnOnce() + 'static) {
        self.main_deletion_queue.push(action);
    }

    /// Returns the device this engine renders with.
    #[inline]
    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        // Nothing may be destroyed while the GPU still references it
        if let Err(e) = self.device.wait_idle() {
            error!("Failed to wait for device idle during shutdown: {:?}", e);
        }

        self.frames.flush_all_deletion_queues();
        self.main_deletion_queue.flush();

        info!(
            "Engine shut down after {} frames",
            self.frames.frame_count()
        );

        // Remaining resources drop in field declaration order: GPU
        // objects, swapchain, surface, device, instance
    }
}
