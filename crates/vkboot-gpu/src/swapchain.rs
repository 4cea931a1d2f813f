//! Swapchain management.

use ash::vk;

use crate::backend::DeviceApi;
use crate::command::{execute_one_shot, single_subresource, transition_image_layout, CommandPool};
use crate::error::{GpuError, Result};

/// One swapchain slot: the driver-owned image plus the view and command
/// buffer owned by us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapImage {
    pub image: vk::Image,
    pub view: vk::ImageView,
    pub command_buffer: vk::CommandBuffer,
}

/// Negotiated surface parameters, fixed for the lifetime of the presenter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceChoice {
    pub format: vk::SurfaceFormatKHR,
    pub present_mode: vk::PresentModeKHR,
    /// Swap image count passed to the driver as the minimum.
    pub min_image_count: u32,
}

/// Swapchain wrapper.
pub struct Swapchain {
    pub swapchain: vk::SwapchainKHR,
    /// Indexed by the image index returned from acquire.
    pub images: Vec<SwapImage>,
    pub format: vk::Format,
    pub extent: vk::Extent2D,
}

impl Swapchain {
    /// Create a new swapchain, one view and one command buffer per image.
    #[allow(clippy::too_many_arguments)]
    pub fn new<D: DeviceApi>(
        device: &D,
        pool: &CommandPool,
        surface: vk::SurfaceKHR,
        surface_capabilities: &vk::SurfaceCapabilitiesKHR,
        choice: &SurfaceChoice,
        extent: vk::Extent2D,
        old_swapchain: Option<vk::SwapchainKHR>,
    ) -> Result<Self> {
        let pre_transform = if surface_capabilities
            .supported_transforms
            .contains(vk::SurfaceTransformFlagsKHR::IDENTITY)
        {
            vk::SurfaceTransformFlagsKHR::IDENTITY
        } else {
            surface_capabilities.current_transform
        };

        let queue_families = [pool.queue_family()];
        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface)
            .min_image_count(choice.min_image_count)
            .image_format(choice.format.format)
            .image_color_space(choice.format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .queue_family_indices(&queue_families)
            .pre_transform(pre_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(choice.present_mode)
            .clipped(true)
            .old_swapchain(old_swapchain.unwrap_or(vk::SwapchainKHR::null()));

        let swapchain = device.create_swapchain(&create_info).map_err(|e| match e {
            GpuError::Vulkan(result) => GpuError::SwapchainCreation(result.to_string()),
            other => other,
        })?;

        // The driver may hand out more images than requested

        let images = match device.get_swapchain_images(swapchain) {
            Ok(images) => images,
            Err(e) => {
                device.destroy_swapchain(swapchain);
                return Err(e);
            }
        };

        let mut views = Vec::with_capacity(images.len());
        let mut created = Ok(());
        for &image in &images {
            let view_info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(choice.format.format)
                .components(vk::ComponentMapping::default())
                .subresource_range(single_subresource(vk::ImageAspectFlags::COLOR));

            match device.create_image_view(&view_info) {
                Ok(view) => views.push(view),
                Err(e) => {
                    created = Err(e);
                    break;
                }
            }
        }

        let command_buffers = match created
            .and_then(|()| pool.allocate_command_buffers(device, images.len() as u32))
        {
            Ok(command_buffers) => command_buffers,
            Err(e) => {
                for &view in &views {
                    device.destroy_image_view(view);
                }
                device.destroy_swapchain(swapchain);
                return Err(e);
            }
        };

        let images: Vec<SwapImage> = images
            .into_iter()
            .zip(views)
            .zip(command_buffers)
            .map(|((image, view), command_buffer)| SwapImage {
                image,
                view,
                command_buffer,
            })
            .collect();

        tracing::info!(
            "Swapchain created: {}x{} {:?} {:?} ({} images, {} requested)",
            extent.width,
            extent.height,
            choice.format.format,
            choice.present_mode,
            images.len(),
            choice.min_image_count
        );

        Ok(Self {
            swapchain,
            images,
            format: choice.format.format,
            extent,
        })
    }

    /// Number of images reported by the driver.
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Get the swap image for an acquired index.
    pub fn image(&self, index: u32) -> Result<&SwapImage> {
        self.images
            .get(index as usize)
            .ok_or(GpuError::ImageIndexOutOfRange {
                index,
                count: self.images.len(),
            })
    }

    /// Transition every image from UNDEFINED to COLOR_ATTACHMENT_OPTIMAL.
    pub fn transition_to_attachment<D: DeviceApi>(
        &self,
        device: &D,
        pool: &CommandPool,
        queue: vk::Queue,
    ) -> Result<()> {
        execute_one_shot(device, pool, queue, |device, cmd| {
            for swap_image in &self.images {
                transition_image_layout(
                    device,
                    cmd,
                    swap_image.image,
                    vk::ImageAspectFlags::COLOR,
                    vk::ImageLayout::UNDEFINED,
                    vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
                    vk::PipelineStageFlags::TOP_OF_PIPE,
                    vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
                );
            }
        })
    }

    /// Acquire the next image.
    ///
    /// Returns the image index and whether the swapchain is suboptimal.
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn acquire_next_image<D: DeviceApi>(
        &self,
        device: &D,
        semaphore: vk::Semaphore,
        timeout_ns: u64,
    ) -> Result<(u32, bool)> {
        // OUT_OF_DATE means no image was acquired; caller must recreate the swapchain.
        let (index, suboptimal) =
            device.acquire_next_image(self.swapchain, timeout_ns, semaphore)?;
        self.image(index)?;
        Ok((index, suboptimal))
    }

    /// Present an image. Returns whether the swapchain needs recreating.
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn present<D: DeviceApi>(
        &self,
        device: &D,
        queue: vk::Queue,
        image_index: u32,
        wait_semaphores: &[vk::Semaphore],
    ) -> Result<bool> {
        match device.queue_present(queue, self.swapchain, image_index, wait_semaphores) {
            Ok(suboptimal) => Ok(suboptimal),
            Err(GpuError::Vulkan(vk::Result::ERROR_OUT_OF_DATE_KHR)) => Ok(true),
            Err(e) => Err(e),
        }
    }

    /// Destroy views, command buffers and the swapchain.
    ///
    /// The swapchain must not be in use.
    pub fn destroy<D: DeviceApi>(&self, device: &D, pool: &CommandPool) {
        let command_buffers: Vec<_> = self.images.iter().map(|i| i.command_buffer).collect();
        pool.free(device, &command_buffers);
        for swap_image in &self.images {
            device.destroy_image_view(swap_image.view);
        }
        device.destroy_swapchain(self.swapchain);
    }
}

/// Calculate swapchain extent.
pub fn calculate_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    desired_width: u32,
    desired_height: u32,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        vk::Extent2D {
            width: desired_width.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ),
            height: desired_height.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ),
        }
    }
}
