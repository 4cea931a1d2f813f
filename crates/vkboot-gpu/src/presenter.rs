//! Bootstrap pipeline and the presenter it produces.

use ash::vk;
use vkboot_core::RenderConfig;

use crate::attachment::{create_depth_buffer, create_render_pass, DepthAttachment, RenderPassDesc};
use crate::backend::{Adapter, DeviceApi};
use crate::capabilities::{query_capabilities, PhysicalDeviceInfo};
use crate::command::CommandPool;
use crate::context::{create_device, LogicalDeviceContext};
use crate::error::{BootstrapStep, GpuError, Result};
use crate::framebuffer::{create_framebuffers, destroy_framebuffers, record_clear_pass, RecordTarget};
use crate::swapchain::{calculate_extent, SurfaceChoice, Swapchain};
use crate::sync::{FrameSynchronizer, SyncStats};

fn at(step: BootstrapStep) -> impl FnOnce(GpuError) -> GpuError {
    move |e| e.at(step)
}

/// Result of one presented frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameOutcome {
    pub slot: usize,
    pub image_index: u32,
    /// The swapchain is suboptimal or out of date and should be resized.
    pub needs_rebuild: bool,
}

/// Runs the bootstrap steps in order against an adapter.
pub struct PresenterBuilder<'a, A: Adapter> {
    adapter: &'a A,
    config: RenderConfig,
}

impl<'a, A: Adapter> PresenterBuilder<'a, A> {
    /// Start a bootstrap with the default configuration.
    pub fn new(adapter: &'a A) -> Self {
        Self {
            adapter,
            config: RenderConfig::default(),
        }
    }

    /// Use the given configuration.
    pub fn config(mut self, config: RenderConfig) -> Self {
        self.config = config;
        self
    }

    /// Run every step. The first failure is returned tagged with its step.
    pub fn build(self) -> Result<Presenter<A::Device>> {
        let Self { adapter, config } = self;

        config
            .validate()
            .map_err(|e| GpuError::from(e).at(BootstrapStep::Config))?;

        let info = query_capabilities(adapter).map_err(at(BootstrapStep::Capabilities))?;
        let queue_family = info
            .graphics_present_family()
            .map_err(at(BootstrapStep::Capabilities))?;

        let context = create_device(adapter, queue_family).map_err(at(BootstrapStep::Device))?;
        let device = context.device();

        let pool = CommandPool::new(
            device,
            queue_family,
            vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
        )
        .map_err(at(BootstrapStep::CommandPool))?;

        let mut staged = Staged::new(device, &pool);
        let surface = adapter.surface();
        let surface_choice = choose_surface(&info, &config)
            .map_err(|e| staged.unwind(e.at(BootstrapStep::Swapchain)))?;
        let extent = calculate_extent(&info.surface_capabilities, config.width, config.height);
        let swapchain = build_swapchain(
            &context,
            &pool,
            &info,
            surface,
            &surface_choice,
            extent,
            None,
            config.transition_swap_images,
        )
        .map_err(|e| staged.unwind(e.at(BootstrapStep::Swapchain)))?;
        staged.swapchain = Some(&swapchain);

        let depth = create_depth_buffer(device, &info, &pool, context.queue(), swapchain.extent)
            .map_err(|e| staged.unwind(e.at(BootstrapStep::DepthBuffer)))?;
        staged.depth = Some(depth);

        let render_pass_desc = RenderPassDesc::color_depth(swapchain.format, depth.format);
        let render_pass = create_render_pass(device, &render_pass_desc)
            .map_err(|e| staged.unwind(e.at(BootstrapStep::RenderPass)))?;
        staged.render_pass = Some(render_pass);

        let framebuffers = create_framebuffers(
            device,
            render_pass,
            &swapchain.images,
            depth.view,
            swapchain.extent,
        )
        .map_err(|e| staged.unwind(e.at(BootstrapStep::Framebuffers)))?;
        staged.framebuffers = &framebuffers;

        let sync = FrameSynchronizer::new(device, swapchain.image_count(), &config)
            .map_err(|e| staged.unwind(e.at(BootstrapStep::Synchronization)))?;

        let mut presenter = Presenter {
            info,
            context,
            pool,
            surface,
            surface_choice,
            swapchain,
            depth,
            render_pass_desc,
            render_pass,
            framebuffers,
            sync,
            config,
        };
        if let Err(e) = presenter.check_counts() {
            if let Err(destroy_error) = presenter.destroy() {
                tracing::error!("Cleanup after failed bootstrap: {destroy_error}");
            }
            return Err(e);
        }

        tracing::info!(
            "Presenter ready: {} swap images, {} frames in flight",
            presenter.swapchain.image_count(),
            presenter.sync.frames_in_flight()
        );
        Ok(presenter)
    }
}

/// Objects created so far by a bootstrap, released in reverse creation order
/// when a later step fails.
struct Staged<'a, D: DeviceApi> {
    device: &'a D,
    pool: &'a CommandPool,
    swapchain: Option<&'a Swapchain>,
    depth: Option<DepthAttachment>,
    render_pass: Option<vk::RenderPass>,
    framebuffers: &'a [vk::Framebuffer],
}

impl<'a, D: DeviceApi> Staged<'a, D> {
    fn new(device: &'a D, pool: &'a CommandPool) -> Self {
        Self {
            device,
            pool,
            swapchain: None,
            depth: None,
            render_pass: None,
            framebuffers: &[],
        }
    }

    /// Destroy everything staged and hand back `error`.
    fn unwind(&self, error: GpuError) -> GpuError {
        tracing::warn!("Bootstrap failed, releasing created objects: {error}");
        destroy_framebuffers(self.device, self.framebuffers);
        if let Some(render_pass) = self.render_pass {
            self.device.destroy_render_pass(render_pass);
        }
        if let Some(depth) = &self.depth {
            depth.destroy(self.device);
        }
        if let Some(swapchain) = self.swapchain {
            swapchain.destroy(self.device, self.pool);
        }
        self.pool.destroy(self.device);
        error
    }
}

fn choose_surface(info: &PhysicalDeviceInfo, config: &RenderConfig) -> Result<SurfaceChoice> {
    let format = info.surface_format()?;
    let present_mode = info.present_mode(config.vsync);
    let min_image_count = info.desired_image_count(config.requested_image_count);
    tracing::debug!(
        "Surface: {:?} {:?}, {:?}, {} images",
        format.format,
        format.color_space,
        present_mode,
        min_image_count
    );
    Ok(SurfaceChoice {
        format,
        present_mode,
        min_image_count,
    })
}

#[allow(clippy::too_many_arguments)]
fn build_swapchain<D: DeviceApi>(
    context: &LogicalDeviceContext<D>,
    pool: &CommandPool,
    info: &PhysicalDeviceInfo,
    surface: vk::SurfaceKHR,
    choice: &SurfaceChoice,
    extent: vk::Extent2D,
    old_swapchain: Option<vk::SwapchainKHR>,
    transition: bool,
) -> Result<Swapchain> {
    let swapchain = Swapchain::new(
        context.device(),
        pool,
        surface,
        &info.surface_capabilities,
        choice,
        extent,
        old_swapchain,
    )?;
    if transition {
        if let Err(e) = swapchain.transition_to_attachment(context.device(), pool, context.queue()) {
            swapchain.destroy(context.device(), pool);
            return Err(e);
        }
    }
    Ok(swapchain)
}

/// Owns every object of the bootstrap and drives the frame loop.
pub struct Presenter<D: DeviceApi> {
    info: PhysicalDeviceInfo,
    context: LogicalDeviceContext<D>,
    pool: CommandPool,
    surface: vk::SurfaceKHR,
    surface_choice: SurfaceChoice,
    swapchain: Swapchain,
    depth: DepthAttachment,
    render_pass_desc: RenderPassDesc,
    render_pass: vk::RenderPass,
    framebuffers: Vec<vk::Framebuffer>,
    sync: FrameSynchronizer,
    config: RenderConfig,
}

impl<D: DeviceApi> Presenter<D> {
    /// Get the device.
    pub fn device(&self) -> &D {
        self.context.device()
    }

    /// Get the graphics+present queue.
    pub fn queue(&self) -> vk::Queue {
        self.context.queue()
    }

    /// Capability snapshot taken at bootstrap.
    pub fn info(&self) -> &PhysicalDeviceInfo {
        &self.info
    }

    /// Get the configuration.
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Negotiated format, present mode and image count.
    pub fn surface_choice(&self) -> &SurfaceChoice {
        &self.surface_choice
    }

    /// Get the swapchain.
    pub fn swapchain(&self) -> &Swapchain {
        &self.swapchain
    }

    /// Get the shared depth attachment.
    pub fn depth(&self) -> &DepthAttachment {
        &self.depth
    }

    /// Get the render pass.
    pub fn render_pass(&self) -> vk::RenderPass {
        self.render_pass
    }

    /// Framebuffers, indexed by swap image.
    pub fn framebuffers(&self) -> &[vk::Framebuffer] {
        &self.framebuffers
    }

    /// Get the current extent.
    pub fn extent(&self) -> vk::Extent2D {
        self.swapchain.extent
    }

    /// Get the frame synchronizer.
    pub fn sync(&self) -> &FrameSynchronizer {
        &self.sync
    }

    /// Frame counters.
    pub fn stats(&self) -> SyncStats {
        self.sync.stats()
    }

    /// Record every per-image command buffer once with `f`.
    ///
    /// The buffers are begun with SIMULTANEOUS_USE and ended around `f`.
    pub fn record_commands<F>(&mut self, mut f: F) -> Result<()>
    where
        F: FnMut(&D, &RecordTarget) -> Result<()>,
    {
        let device = self.context.device();
        for (index, (swap_image, &framebuffer)) in self
            .swapchain
            .images
            .iter()
            .zip(&self.framebuffers)
            .enumerate()
        {
            let target = RecordTarget {
                image_index: index as u32,
                image: swap_image.image,
                command_buffer: swap_image.command_buffer,
                framebuffer,
                render_pass: self.render_pass,
                extent: self.swapchain.extent,
            };
            device.begin_command_buffer(
                target.command_buffer,
                vk::CommandBufferUsageFlags::SIMULTANEOUS_USE,
            )?;
            f(device, &target)?;
            device.end_command_buffer(target.command_buffer)?;
        }
        self.sync.mark_recorded()
    }

    /// Record the default clear of colour and depth into every image.
    pub fn record_clear(&mut self) -> Result<()> {
        let clear_color = self.config.clear_color;
        self.record_commands(|device, target| record_clear_pass(device, target, clear_color))
    }

    /// Acquire, submit and present one frame.
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn draw_frame(&mut self) -> Result<FrameOutcome> {
        let device = self.context.device();
        let queue = self.context.queue();

        let frame = self.sync.acquire(device, &self.swapchain)?;
        let command_buffer = self.swapchain.image(frame.image_index)?.command_buffer;
        self.sync.submit(device, queue, command_buffer)?;
        let needs_rebuild = self.sync.present(device, &self.swapchain, queue)?;

        Ok(FrameOutcome {
            slot: frame.slot,
            image_index: frame.image_index,
            needs_rebuild: needs_rebuild || frame.suboptimal,
        })
    }

    /// Rebuild the swapchain and everything sized by it.
    ///
    /// Command buffers must be recorded again before the next frame. A zero
    /// extent (minimized window) leaves everything untouched.
    pub fn resize<A>(&mut self, adapter: &A, width: u32, height: u32) -> Result<()>
    where
        A: Adapter<Device = D>,
    {
        self.context.wait_idle()?;

        self.info.surface_capabilities = adapter.surface_capabilities()?;
        let extent = calculate_extent(&self.info.surface_capabilities, width, height);
        if extent.width == 0 || extent.height == 0 {
            tracing::debug!("Skipping resize to zero extent");
            return Ok(());
        }

        let device = self.context.device();
        let mut choice = self.surface_choice;
        choice.min_image_count = self
            .info
            .desired_image_count(self.config.requested_image_count);
        let swapchain = build_swapchain(
            &self.context,
            &self.pool,
            &self.info,
            self.surface,
            &choice,
            extent,
            Some(self.swapchain.swapchain),
            self.config.transition_swap_images,
        )?;
        let depth = match create_depth_buffer(
            device,
            &self.info,
            &self.pool,
            self.context.queue(),
            swapchain.extent,
        ) {
            Ok(depth) => depth,
            Err(e) => {
                swapchain.destroy(device, &self.pool);
                return Err(e);
            }
        };

        // Old objects go only once their replacements exist
        destroy_framebuffers(device, &self.framebuffers);
        self.framebuffers.clear();
        std::mem::replace(&mut self.depth, depth).destroy(device);
        std::mem::replace(&mut self.swapchain, swapchain).destroy(device, &self.pool);
        self.surface_choice = choice;

        self.framebuffers = create_framebuffers(
            device,
            self.render_pass,
            &self.swapchain.images,
            self.depth.view,
            self.swapchain.extent,
        )?;
        self.sync.rebuild(device, self.swapchain.image_count())?;
        self.check_counts()?;

        tracing::info!(
            "Resized to {}x{} ({} swap images)",
            extent.width,
            extent.height,
            self.swapchain.image_count()
        );
        Ok(())
    }

    /// Verify every per-image resource count equals the driver's image count.
    pub fn check_counts(&self) -> Result<()> {
        let images = self
            .context
            .device()
            .get_swapchain_images(self.swapchain.swapchain)?
            .len();
        let owned = &self.swapchain.images;
        let views = owned
            .iter()
            .filter(|i| i.view != vk::ImageView::null())
            .count();
        let command_buffers = owned
            .iter()
            .filter(|i| i.command_buffer != vk::CommandBuffer::null())
            .count();
        let framebuffers = self.framebuffers.len();
        let semaphores = self.sync.image_count();

        if [owned.len(), views, command_buffers, framebuffers, semaphores]
            .iter()
            .all(|&count| count == images)
        {
            Ok(())
        } else {
            Err(GpuError::ImageCountMismatch {
                images,
                views,
                command_buffers,
                framebuffers,
                semaphores,
            })
        }
    }

    /// Drain the device and destroy every owned object in reverse creation
    /// order. The logical device itself is released when the presenter drops.
    pub fn destroy(&mut self) -> Result<()> {
        let device = self.context.device();
        self.sync.drain(device)?;
        self.sync.destroy(device)?;

        destroy_framebuffers(device, &self.framebuffers);
        self.framebuffers.clear();
        device.destroy_render_pass(self.render_pass);
        self.depth.destroy(device);
        self.swapchain.destroy(device, &self.pool);
        self.pool.destroy(device);

        let stats = self.sync.stats();
        tracing::info!(
            "Presenter destroyed after {} frames ({} fence timeouts)",
            stats.frames_presented,
            stats.fence_timeouts
        );
        Ok(())
    }

    /// Render pass description used at bootstrap.
    pub fn render_pass_desc(&self) -> &RenderPassDesc {
        &self.render_pass_desc
    }
}
