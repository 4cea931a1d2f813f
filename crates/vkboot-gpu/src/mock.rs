//! In-memory backend for tests.
//!
//! Hands out fake handles, counts live objects per kind and records the calls
//! tests assert on. Fence results and swapchain behaviour can be scripted.

#![allow(dead_code)]

use std::cell::{Ref, RefCell, RefMut};
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use ash::vk::{self, Handle};

use crate::attachment::RenderPassDesc;
use crate::backend::{Adapter, DeviceApi, FenceWait, Submission};
use crate::error::{GpuError, Result};

/// Adapter with two queue families: 0 is graphics without present, 1 is
/// graphics with present.
pub struct MockAdapter {
    pub queue_families: Vec<(vk::QueueFlags, bool)>,
    pub memory_types: Vec<vk::MemoryPropertyFlags>,
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub surface_formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
    pub depth_properties: vk::FormatProperties,
    /// Images the swapchain hands out beyond the requested minimum.
    pub extra_swapchain_images: u32,
    /// Device call that fails with `ERROR_INITIALIZATION_FAILED`.
    pub fail_on: Option<&'static str>,
    /// Successful calls to `fail_on` before it starts failing.
    pub fail_after: usize,
    last_device: RefCell<Option<Rc<RefCell<MockState>>>>,
}

impl MockAdapter {
    pub fn new() -> Self {
        Self {
            queue_families: vec![
                (vk::QueueFlags::GRAPHICS, false),
                (vk::QueueFlags::GRAPHICS | vk::QueueFlags::TRANSFER, true),
            ],
            memory_types: vec![
                vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
                vk::MemoryPropertyFlags::DEVICE_LOCAL,
            ],
            capabilities: vk::SurfaceCapabilitiesKHR {
                min_image_count: 2,
                max_image_count: 8,
                current_extent: vk::Extent2D {
                    width: 1280,
                    height: 720,
                },
                min_image_extent: vk::Extent2D {
                    width: 1,
                    height: 1,
                },
                max_image_extent: vk::Extent2D {
                    width: 4096,
                    height: 4096,
                },
                max_image_array_layers: 1,
                supported_transforms: vk::SurfaceTransformFlagsKHR::IDENTITY,
                current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
                supported_composite_alpha: vk::CompositeAlphaFlagsKHR::OPAQUE,
                supported_usage_flags: vk::ImageUsageFlags::COLOR_ATTACHMENT
                    | vk::ImageUsageFlags::TRANSFER_DST,
            },
            surface_formats: vec![vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_UNORM,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            }],
            present_modes: vec![vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX],
            depth_properties: vk::FormatProperties {
                optimal_tiling_features: vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT,
                ..Default::default()
            },
            extra_swapchain_images: 0,
            fail_on: None,
            fail_after: 0,
            last_device: RefCell::new(None),
        }
    }

    /// State of the most recently created device, alive or dropped.
    pub fn last_device_state(&self) -> Option<Rc<RefCell<MockState>>> {
        self.last_device.borrow().clone()
    }
}

impl Adapter for MockAdapter {
    type Device = MockDevice;

    fn properties(&self) -> vk::PhysicalDeviceProperties {
        let mut properties = vk::PhysicalDeviceProperties {
            api_version: vk::API_VERSION_1_0,
            vendor_id: 0x10DE,
            device_type: vk::PhysicalDeviceType::DISCRETE_GPU,
            ..Default::default()
        };
        for (dst, src) in properties.device_name.iter_mut().zip(b"Mock GPU") {
            *dst = *src as std::ffi::c_char;
        }
        properties
    }

    fn queue_family_properties(&self) -> Vec<vk::QueueFamilyProperties> {
        self.queue_families
            .iter()
            .map(|&(queue_flags, _)| vk::QueueFamilyProperties {
                queue_flags,
                queue_count: 1,
                ..Default::default()
            })
            .collect()
    }

    fn surface_support(&self, queue_family_index: u32) -> Result<bool> {
        Ok(self
            .queue_families
            .get(queue_family_index as usize)
            .is_some_and(|&(_, present)| present))
    }

    fn surface_capabilities(&self) -> Result<vk::SurfaceCapabilitiesKHR> {
        Ok(self.capabilities)
    }

    fn surface_formats(&self) -> Result<Vec<vk::SurfaceFormatKHR>> {
        Ok(self.surface_formats.clone())
    }

    fn surface_present_modes(&self) -> Result<Vec<vk::PresentModeKHR>> {
        Ok(self.present_modes.clone())
    }

    fn memory_properties(&self) -> vk::PhysicalDeviceMemoryProperties {
        let mut properties = vk::PhysicalDeviceMemoryProperties {
            memory_type_count: self.memory_types.len() as u32,
            ..Default::default()
        };
        for (dst, &property_flags) in properties.memory_types.iter_mut().zip(&self.memory_types) {
            *dst = vk::MemoryType {
                property_flags,
                heap_index: 0,
            };
        }
        properties
    }

    fn format_properties(&self, _format: vk::Format) -> vk::FormatProperties {
        self.depth_properties
    }

    fn surface(&self) -> vk::SurfaceKHR {
        vk::SurfaceKHR::from_raw(0x5eed)
    }

    fn create_device(&self, queue_family_index: u32, priorities: &[f32]) -> Result<MockDevice> {
        if self.fail_on == Some("create_device") {
            return Err(GpuError::Vulkan(vk::Result::ERROR_INITIALIZATION_FAILED));
        }
        let device = MockDevice::new();
        {
            let mut state = device.state_mut();
            state.device_queue_family = Some(queue_family_index);
            state.device_queue_priorities = priorities.to_vec();
            state.extra_swapchain_images = self.extra_swapchain_images;
            state.fail_on = self.fail_on;
            state.fail_after = self.fail_after;
        }
        *self.last_device.borrow_mut() = Some(Rc::clone(&device.state));
        Ok(device)
    }
}

/// Creation parameters of one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageRecord {
    pub format: vk::Format,
    pub tiling: vk::ImageTiling,
    pub extent: vk::Extent3D,
    pub usage: vk::ImageUsageFlags,
}

/// Creation parameters of one swapchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainParams {
    pub min_image_count: u32,
    pub format: vk::Format,
    pub extent: vk::Extent2D,
    pub usage: vk::ImageUsageFlags,
    pub sharing_mode: vk::SharingMode,
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
    pub composite_alpha: vk::CompositeAlphaFlagsKHR,
    pub present_mode: vk::PresentModeKHR,
    pub clipped: bool,
    pub old_swapchain: vk::SwapchainKHR,
}

/// One recorded queue submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitRecord {
    pub command_buffers: Vec<vk::CommandBuffer>,
    pub wait_semaphores: Vec<vk::Semaphore>,
    pub wait_stages: Vec<vk::PipelineStageFlags>,
    pub signal_semaphores: Vec<vk::Semaphore>,
    pub fence: vk::Fence,
}

/// One recorded present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentRecord {
    pub swapchain: vk::SwapchainKHR,
    pub image_index: u32,
    pub wait_semaphores: Vec<vk::Semaphore>,
}

/// One recorded render pass begin.
#[derive(Clone)]
pub struct RenderPassBegin {
    pub render_pass: vk::RenderPass,
    pub framebuffer: vk::Framebuffer,
    pub extent: vk::Extent2D,
    pub clear_values: Vec<vk::ClearValue>,
}

#[derive(Default)]
pub struct MockState {
    next_handle: u64,
    live_objects: HashMap<&'static str, i64>,
    /// Calls that create, destroy or wait, in order.
    pub events: Vec<&'static str>,
    /// Command stream per command buffer since its last begin.
    pub commands: HashMap<vk::CommandBuffer, Vec<&'static str>>,
    pub begin_flags: HashMap<vk::CommandBuffer, vk::CommandBufferUsageFlags>,
    pub fail_on: Option<&'static str>,
    pub fail_after: usize,

    pub device_queue_family: Option<u32>,
    pub device_queue_priorities: Vec<f32>,

    pub submissions: Vec<SubmitRecord>,
    pub queue_idle_waits: usize,
    pub device_idle_waits: usize,
    pub transitions: Vec<(vk::Image, vk::ImageLayout, vk::ImageLayout)>,
    /// Source and destination stages of every barrier.
    pub barrier_stages: Vec<(vk::PipelineStageFlags, vk::PipelineStageFlags)>,
    pub render_pass_begins: Vec<RenderPassBegin>,

    /// Results returned by successive fence waits; empty means signaled.
    pub fence_script: VecDeque<FenceWait>,
    pub fence_waits: usize,
    pub fences_created: usize,
    pub fences_destroyed: usize,
    pub fence_resets: usize,
    /// Fences that nothing will signal: reset or created unsignaled and not
    /// yet passed to a submission.
    pub unsignaled_fences: HashSet<vk::Fence>,

    pub images: HashMap<vk::Image, ImageRecord>,
    pub view_targets: HashMap<vk::ImageView, vk::Image>,
    pub allocations: HashMap<vk::DeviceMemory, (vk::DeviceSize, u32)>,
    pub bindings: HashMap<vk::Image, (vk::DeviceMemory, vk::DeviceSize)>,
    pub render_passes: HashMap<vk::RenderPass, RenderPassDesc>,
    pub framebuffers: HashMap<vk::Framebuffer, (vk::RenderPass, Vec<vk::ImageView>, vk::Extent2D)>,
    pub shader_modules: HashMap<vk::ShaderModule, usize>,

    pub swapchain_params: Vec<SwapchainParams>,
    swapchain_images: HashMap<vk::SwapchainKHR, Vec<vk::Image>>,
    pub extra_swapchain_images: u32,
    /// Indices returned by successive acquires; empty means round robin.
    pub acquire_order: Vec<u32>,
    next_acquire: u32,
    pub acquire_result: Option<vk::Result>,
    pub acquires: Vec<(u32, vk::Semaphore)>,
    pub presents: Vec<PresentRecord>,
    pub present_result: Option<vk::Result>,
}

impl MockState {
    /// Live objects of a kind: created minus destroyed.
    pub fn live(&self, kind: &str) -> i64 {
        self.live_objects.get(kind).copied().unwrap_or(0)
    }

    /// Sum of live objects across every kind.
    pub fn live_total(&self) -> i64 {
        self.live_objects.values().sum()
    }

    /// Memory requirements reported for an image: deliberately larger than
    /// the raw texel size.
    pub fn image_requirements(&self, image: vk::Image) -> vk::MemoryRequirements {
        let extent = self
            .images
            .get(&image)
            .map_or(vk::Extent3D::default(), |record| record.extent);
        vk::MemoryRequirements {
            size: u64::from(extent.width) * u64::from(extent.height) * 2 + 512,
            alignment: 256,
            memory_type_bits: 0b11,
        }
    }

    fn create<H: Handle>(&mut self, kind: &'static str) -> H {
        self.next_handle += 1;
        *self.live_objects.entry(kind).or_insert(0) += 1;
        H::from_raw(self.next_handle)
    }

    fn destroy(&mut self, kind: &'static str, event: &'static str) {
        *self.live_objects.entry(kind).or_insert(0) -= 1;
        self.events.push(event);
    }

    fn check(&mut self, call: &'static str) -> Result<()> {
        if self.fail_on == Some(call) {
            if self.fail_after == 0 {
                return Err(GpuError::Vulkan(vk::Result::ERROR_INITIALIZATION_FAILED));
            }
            self.fail_after -= 1;
        }
        Ok(())
    }

    fn record(&mut self, cmd: vk::CommandBuffer, command: &'static str) {
        self.commands.entry(cmd).or_default().push(command);
    }
}

/// Device backed by [`MockState`].
pub struct MockDevice {
    state: Rc<RefCell<MockState>>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(MockState::default())),
        }
    }

    pub fn state(&self) -> Ref<'_, MockState> {
        self.state.borrow()
    }

    pub fn state_mut(&self) -> RefMut<'_, MockState> {
        self.state.borrow_mut()
    }

    /// Queue `count` fence timeouts ahead of the next success.
    pub fn script_fence_timeouts(&self, count: usize) {
        let mut state = self.state_mut();
        state
            .fence_script
            .extend(std::iter::repeat(FenceWait::TimedOut).take(count));
        state.fence_script.push_back(FenceWait::Signaled);
    }
}

impl DeviceApi for MockDevice {
    fn get_queue(&self, queue_family_index: u32, queue_index: u32) -> vk::Queue {
        vk::Queue::from_raw(0x1000 + u64::from(queue_family_index) * 16 + u64::from(queue_index))
    }

    fn create_command_pool(
        &self,
        _queue_family_index: u32,
        _flags: vk::CommandPoolCreateFlags,
    ) -> Result<vk::CommandPool> {
        let mut state = self.state_mut();
        state.check("create_command_pool")?;
        Ok(state.create("command_pool"))
    }

    fn destroy_command_pool(&self, _pool: vk::CommandPool) {
        self.state_mut().destroy("command_pool", "destroy_command_pool");
    }

    fn allocate_command_buffers(
        &self,
        _pool: vk::CommandPool,
        count: u32,
    ) -> Result<Vec<vk::CommandBuffer>> {
        let mut state = self.state_mut();
        state.check("allocate_command_buffers")?;
        Ok((0..count).map(|_| state.create("command_buffer")).collect())
    }

    fn free_command_buffers(&self, _pool: vk::CommandPool, buffers: &[vk::CommandBuffer]) {
        let mut state = self.state_mut();
        for _ in buffers {
            state.destroy("command_buffer", "free_command_buffers");
        }
    }

    fn begin_command_buffer(
        &self,
        cmd: vk::CommandBuffer,
        flags: vk::CommandBufferUsageFlags,
    ) -> Result<()> {
        let mut state = self.state_mut();
        state.commands.insert(cmd, vec!["begin"]);
        state.begin_flags.insert(cmd, flags);
        Ok(())
    }

    fn end_command_buffer(&self, cmd: vk::CommandBuffer) -> Result<()> {
        self.state_mut().record(cmd, "end");
        Ok(())
    }

    fn cmd_pipeline_barrier(
        &self,
        cmd: vk::CommandBuffer,
        src_stage: vk::PipelineStageFlags,
        dst_stage: vk::PipelineStageFlags,
        image_barriers: &[vk::ImageMemoryBarrier<'_>],
    ) {
        let mut state = self.state_mut();
        state.record(cmd, "barrier");
        state.barrier_stages.push((src_stage, dst_stage));
        for barrier in image_barriers {
            state
                .transitions
                .push((barrier.image, barrier.old_layout, barrier.new_layout));
        }
    }

    fn cmd_begin_render_pass(
        &self,
        cmd: vk::CommandBuffer,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        extent: vk::Extent2D,
        clear_values: &[vk::ClearValue],
    ) {
        let mut state = self.state_mut();
        state.record(cmd, "begin_render_pass");
        state.render_pass_begins.push(RenderPassBegin {
            render_pass,
            framebuffer,
            extent,
            clear_values: clear_values.to_vec(),
        });
    }

    fn cmd_end_render_pass(&self, cmd: vk::CommandBuffer) {
        self.state_mut().record(cmd, "end_render_pass");
    }

    fn create_swapchain(&self, info: &vk::SwapchainCreateInfoKHR<'_>) -> Result<vk::SwapchainKHR> {
        let mut state = self.state_mut();
        state.check("create_swapchain")?;
        state.swapchain_params.push(SwapchainParams {
            min_image_count: info.min_image_count,
            format: info.image_format,
            extent: info.image_extent,
            usage: info.image_usage,
            sharing_mode: info.image_sharing_mode,
            pre_transform: info.pre_transform,
            composite_alpha: info.composite_alpha,
            present_mode: info.present_mode,
            clipped: info.clipped == vk::TRUE,
            old_swapchain: info.old_swapchain,
        });
        let swapchain = state.create("swapchain");
        let count = info.min_image_count + state.extra_swapchain_images;
        // Swapchain images belong to the swapchain and are not counted as live
        let images = (0..count)
            .map(|_| {
                state.next_handle += 1;
                vk::Image::from_raw(state.next_handle)
            })
            .collect();
        state.swapchain_images.insert(swapchain, images);
        Ok(swapchain)
    }

    fn get_swapchain_images(&self, swapchain: vk::SwapchainKHR) -> Result<Vec<vk::Image>> {
        Ok(self
            .state()
            .swapchain_images
            .get(&swapchain)
            .cloned()
            .unwrap_or_default())
    }

    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR) {
        let mut state = self.state_mut();
        state.swapchain_images.remove(&swapchain);
        state.destroy("swapchain", "destroy_swapchain");
    }

    fn acquire_next_image(
        &self,
        swapchain: vk::SwapchainKHR,
        _timeout_ns: u64,
        semaphore: vk::Semaphore,
    ) -> Result<(u32, bool)> {
        let mut state = self.state_mut();
        if let Some(result) = state.acquire_result {
            return Err(GpuError::Vulkan(result));
        }
        let index = if state.acquire_order.is_empty() {
            let count = state
                .swapchain_images
                .get(&swapchain)
                .map_or(1, |images| images.len().max(1) as u32);
            let index = state.next_acquire % count;
            state.next_acquire += 1;
            index
        } else {
            state.acquire_order.remove(0)
        };
        state.acquires.push((index, semaphore));
        Ok((index, false))
    }

    fn queue_present(
        &self,
        _queue: vk::Queue,
        swapchain: vk::SwapchainKHR,
        image_index: u32,
        wait_semaphores: &[vk::Semaphore],
    ) -> Result<bool> {
        let mut state = self.state_mut();
        if let Some(result) = state.present_result {
            return Err(GpuError::Vulkan(result));
        }
        state.presents.push(PresentRecord {
            swapchain,
            image_index,
            wait_semaphores: wait_semaphores.to_vec(),
        });
        Ok(false)
    }

    fn create_image(&self, info: &vk::ImageCreateInfo<'_>) -> Result<vk::Image> {
        let mut state = self.state_mut();
        state.check("create_image")?;
        let image = state.create("image");
        state.images.insert(
            image,
            ImageRecord {
                format: info.format,
                tiling: info.tiling,
                extent: info.extent,
                usage: info.usage,
            },
        );
        Ok(image)
    }

    fn destroy_image(&self, image: vk::Image) {
        let mut state = self.state_mut();
        state.images.remove(&image);
        state.destroy("image", "destroy_image");
    }

    fn get_image_memory_requirements(&self, image: vk::Image) -> vk::MemoryRequirements {
        self.state().image_requirements(image)
    }

    fn allocate_memory(
        &self,
        size: vk::DeviceSize,
        memory_type_index: u32,
    ) -> Result<vk::DeviceMemory> {
        let mut state = self.state_mut();
        state.check("allocate_memory")?;
        let memory = state.create("memory");
        state.allocations.insert(memory, (size, memory_type_index));
        Ok(memory)
    }

    fn free_memory(&self, memory: vk::DeviceMemory) {
        let mut state = self.state_mut();
        state.allocations.remove(&memory);
        state.destroy("memory", "free_memory");
    }

    fn bind_image_memory(
        &self,
        image: vk::Image,
        memory: vk::DeviceMemory,
        offset: vk::DeviceSize,
    ) -> Result<()> {
        self.state_mut().bindings.insert(image, (memory, offset));
        Ok(())
    }

    fn create_image_view(&self, info: &vk::ImageViewCreateInfo<'_>) -> Result<vk::ImageView> {
        let mut state = self.state_mut();
        state.check("create_image_view")?;
        let view = state.create("image_view");
        state.view_targets.insert(view, info.image);
        Ok(view)
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        let mut state = self.state_mut();
        state.view_targets.remove(&view);
        state.destroy("image_view", "destroy_image_view");
    }

    fn create_render_pass(&self, desc: &RenderPassDesc) -> Result<vk::RenderPass> {
        let mut state = self.state_mut();
        state.check("create_render_pass")?;
        let render_pass = state.create("render_pass");
        state.render_passes.insert(render_pass, *desc);
        Ok(render_pass)
    }

    fn destroy_render_pass(&self, render_pass: vk::RenderPass) {
        let mut state = self.state_mut();
        state.render_passes.remove(&render_pass);
        state.destroy("render_pass", "destroy_render_pass");
    }

    fn create_framebuffer(
        &self,
        render_pass: vk::RenderPass,
        attachments: &[vk::ImageView],
        extent: vk::Extent2D,
    ) -> Result<vk::Framebuffer> {
        let mut state = self.state_mut();
        state.check("create_framebuffer")?;
        let framebuffer = state.create("framebuffer");
        state
            .framebuffers
            .insert(framebuffer, (render_pass, attachments.to_vec(), extent));
        Ok(framebuffer)
    }

    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer) {
        let mut state = self.state_mut();
        state.framebuffers.remove(&framebuffer);
        state.destroy("framebuffer", "destroy_framebuffer");
    }

    fn create_semaphore(&self) -> Result<vk::Semaphore> {
        let mut state = self.state_mut();
        state.check("create_semaphore")?;
        Ok(state.create("semaphore"))
    }

    fn destroy_semaphore(&self, _semaphore: vk::Semaphore) {
        self.state_mut().destroy("semaphore", "destroy_semaphore");
    }

    fn create_fence(&self, signaled: bool) -> Result<vk::Fence> {
        let mut state = self.state_mut();
        state.check("create_fence")?;
        state.fences_created += 1;
        let fence = state.create("fence");
        if !signaled {
            state.unsignaled_fences.insert(fence);
        }
        Ok(fence)
    }

    fn destroy_fence(&self, fence: vk::Fence) {
        let mut state = self.state_mut();
        state.unsignaled_fences.remove(&fence);
        state.fences_destroyed += 1;
        state.destroy("fence", "destroy_fence");
    }

    /// A wait on a fence nothing will signal would block forever; it is
    /// reported as a lost device instead.
    fn wait_for_fence(&self, fence: vk::Fence, _timeout_ns: u64) -> Result<FenceWait> {
        let mut state = self.state_mut();
        state.fence_waits += 1;
        if let Some(result) = state.fence_script.pop_front() {
            return Ok(result);
        }
        if state.unsignaled_fences.contains(&fence) {
            return Err(GpuError::Vulkan(vk::Result::ERROR_DEVICE_LOST));
        }
        Ok(FenceWait::Signaled)
    }

    fn reset_fence(&self, fence: vk::Fence) -> Result<()> {
        let mut state = self.state_mut();
        state.fence_resets += 1;
        state.unsignaled_fences.insert(fence);
        Ok(())
    }

    fn queue_submit(
        &self,
        _queue: vk::Queue,
        submission: &Submission<'_>,
        fence: vk::Fence,
    ) -> Result<()> {
        let mut state = self.state_mut();
        state.check("queue_submit")?;
        // Submitted work completes immediately
        state.unsignaled_fences.remove(&fence);
        state.submissions.push(SubmitRecord {
            command_buffers: submission.command_buffers.to_vec(),
            wait_semaphores: submission.wait_semaphores.to_vec(),
            wait_stages: submission.wait_stages.to_vec(),
            signal_semaphores: submission.signal_semaphores.to_vec(),
            fence,
        });
        Ok(())
    }

    fn queue_wait_idle(&self, _queue: vk::Queue) -> Result<()> {
        self.state_mut().queue_idle_waits += 1;
        Ok(())
    }

    fn device_wait_idle(&self) -> Result<()> {
        let mut state = self.state_mut();
        state.device_idle_waits += 1;
        state.events.push("device_wait_idle");
        Ok(())
    }

    fn create_shader_module(&self, code: &[u32]) -> Result<vk::ShaderModule> {
        let mut state = self.state_mut();
        state.check("create_shader_module")?;
        let module = state.create("shader_module");
        state.shader_modules.insert(module, code.len());
        Ok(module)
    }

    fn destroy_shader_module(&self, module: vk::ShaderModule) {
        let mut state = self.state_mut();
        state.shader_modules.remove(&module);
        state.destroy("shader_module", "destroy_shader_module");
    }
}
