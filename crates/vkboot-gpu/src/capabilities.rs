//! Capability probing and the choices derived from it.

use std::ffi::CStr;

use ash::vk;

use crate::backend::Adapter;
use crate::error::{GpuError, Result};

/// Depth attachment format.
pub const DEPTH_FORMAT: vk::Format = vk::Format::D16_UNORM;

/// Colour format substituted when the surface leaves the choice open.
pub const FALLBACK_SURFACE_FORMAT: vk::Format = vk::Format::B8G8R8A8_SRGB;

/// GPU vendor identification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuVendor {
    Nvidia,
    Amd,
    Intel,
    Apple,
    Other(u32),
}

impl GpuVendor {
    /// Identify vendor from PCI vendor ID.
    pub fn from_vendor_id(id: u32) -> Self {
        match id {
            0x10DE => Self::Nvidia,
            0x1002 => Self::Amd,
            0x8086 => Self::Intel,
            0x106B => Self::Apple,
            other => Self::Other(other),
        }
    }
}

/// One queue family as seen from the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilyInfo {
    pub index: u32,
    pub flags: vk::QueueFlags,
    pub queue_count: u32,
    /// Whether this family can present to the target surface.
    pub supports_present: bool,
}

impl QueueFamilyInfo {
    /// Graphics-capable and able to present.
    pub fn is_graphics_present(&self) -> bool {
        self.flags.contains(vk::QueueFlags::GRAPHICS) && self.supports_present
    }
}

/// Immutable snapshot of one adapter and its surface.
#[derive(Debug, Clone)]
pub struct PhysicalDeviceInfo {
    pub vendor: GpuVendor,
    pub device_name: String,
    pub api_version: u32,
    pub queue_families: Vec<QueueFamilyInfo>,
    /// Memory types, indexed by memory type index.
    pub memory_types: Vec<vk::MemoryType>,
    pub surface_capabilities: vk::SurfaceCapabilitiesKHR,
    pub surface_formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
    /// Tiling features of [`DEPTH_FORMAT`].
    pub depth_format_properties: vk::FormatProperties,
}

/// Query everything the bootstrap needs from an adapter.
pub fn query_capabilities<A: Adapter>(adapter: &A) -> Result<PhysicalDeviceInfo> {
    let properties = adapter.properties();
    // SAFETY: device_name is a NUL-terminated fixed-size array filled by the driver
    let device_name = unsafe { CStr::from_ptr(properties.device_name.as_ptr()) }
        .to_string_lossy()
        .into_owned();

    let queue_families = adapter
        .queue_family_properties()
        .iter()
        .enumerate()
        .map(|(i, family)| {
            let index = i as u32;
            Ok(QueueFamilyInfo {
                index,
                flags: family.queue_flags,
                queue_count: family.queue_count,
                supports_present: adapter.surface_support(index)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let memory_properties = adapter.memory_properties();
    let memory_types = memory_properties
        .memory_types
        .iter()
        .take(memory_properties.memory_type_count as usize)
        .copied()
        .collect();

    let info = PhysicalDeviceInfo {
        vendor: GpuVendor::from_vendor_id(properties.vendor_id),
        device_name,
        api_version: properties.api_version,
        queue_families,
        memory_types,
        surface_capabilities: adapter.surface_capabilities()?,
        surface_formats: adapter.surface_formats()?,
        present_modes: adapter.surface_present_modes()?,
        depth_format_properties: adapter.format_properties(DEPTH_FORMAT),
    };

    tracing::info!("Selected GPU: {}", info.summary());
    Ok(info)
}

impl PhysicalDeviceInfo {
    /// Index of the first family that supports graphics and present.
    pub fn graphics_present_family(&self) -> Result<u32> {
        select_queue_family(&self.queue_families)
    }

    /// The surface format the swapchain will use.
    pub fn surface_format(&self) -> Result<vk::SurfaceFormatKHR> {
        select_surface_format(&self.surface_formats)
    }

    /// The present mode the swapchain will use.
    pub fn present_mode(&self, vsync: bool) -> vk::PresentModeKHR {
        select_present_mode(&self.present_modes, vsync)
    }

    /// Swap image count to request for the given desired count.
    pub fn desired_image_count(&self, requested: u32) -> u32 {
        desired_image_count(&self.surface_capabilities, requested)
    }

    /// Memory type index compatible with `type_bits` and `required`.
    pub fn memory_type_index(
        &self,
        type_bits: u32,
        required: vk::MemoryPropertyFlags,
    ) -> Result<u32> {
        find_memory_type_index(&self.memory_types, type_bits, required)
    }

    /// Tiling to use for the depth attachment.
    pub fn depth_tiling(&self) -> Result<vk::ImageTiling> {
        select_depth_tiling(DEPTH_FORMAT, &self.depth_format_properties)
    }

    /// Get a human-readable summary.
    pub fn summary(&self) -> String {
        format!(
            "{} ({:?}) - Vulkan {}.{}.{} - {} queue families, {} memory types",
            self.device_name,
            self.vendor,
            vk::api_version_major(self.api_version),
            vk::api_version_minor(self.api_version),
            vk::api_version_patch(self.api_version),
            self.queue_families.len(),
            self.memory_types.len(),
        )
    }
}

/// Pick the first family with graphics and present support. There is no
/// fallback to separate graphics and present families.
pub fn select_queue_family(families: &[QueueFamilyInfo]) -> Result<u32> {
    families
        .iter()
        .find(|family| family.is_graphics_present())
        .map(|family| family.index)
        .ok_or(GpuError::NoPresentQueueFamily)
}

/// Select the surface format.
///
/// A single UNDEFINED entry means the surface has no preference; the fallback
/// format is substituted. Otherwise the first reported format is used as is.
pub fn select_surface_format(available: &[vk::SurfaceFormatKHR]) -> Result<vk::SurfaceFormatKHR> {
    match available {
        [] => Err(GpuError::NoSurfaceFormat),
        [only] if only.format == vk::Format::UNDEFINED => Ok(vk::SurfaceFormatKHR {
            format: FALLBACK_SURFACE_FORMAT,
            color_space: only.color_space,
        }),
        [first, ..] => Ok(*first),
    }
}

/// Select the present mode: MAILBOX, then IMMEDIATE, then FIFO.
pub fn select_present_mode(available: &[vk::PresentModeKHR], vsync: bool) -> vk::PresentModeKHR {
    if vsync {
        return vk::PresentModeKHR::FIFO;
    }
    if available.contains(&vk::PresentModeKHR::MAILBOX) {
        vk::PresentModeKHR::MAILBOX
    } else if available.contains(&vk::PresentModeKHR::IMMEDIATE) {
        vk::PresentModeKHR::IMMEDIATE
    } else {
        // FIFO is always supported
        vk::PresentModeKHR::FIFO
    }
}

/// Swap image count: one more than the minimum, at least `requested`, and no
/// more than the maximum (0 means unbounded).
pub fn desired_image_count(capabilities: &vk::SurfaceCapabilitiesKHR, requested: u32) -> u32 {
    let count = (capabilities.min_image_count + 1).max(requested);
    if capabilities.max_image_count > 0 {
        count.min(capabilities.max_image_count)
    } else {
        count
    }
}

/// Find the first memory type allowed by `type_bits` whose flags contain `required`.
pub fn find_memory_type_index(
    memory_types: &[vk::MemoryType],
    type_bits: u32,
    required: vk::MemoryPropertyFlags,
) -> Result<u32> {
    memory_types
        .iter()
        .enumerate()
        .take(32)
        .find(|(i, memory_type)| {
            type_bits & (1 << i) != 0 && memory_type.property_flags.contains(required)
        })
        .map(|(i, _)| i as u32)
        .ok_or(GpuError::NoCompatibleMemoryType {
            type_bits,
            required,
        })
}

/// Linear tiling if it supports depth-stencil attachment, else optimal.
pub fn select_depth_tiling(
    format: vk::Format,
    properties: &vk::FormatProperties,
) -> Result<vk::ImageTiling> {
    let feature = vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT;
    if properties.linear_tiling_features.contains(feature) {
        Ok(vk::ImageTiling::LINEAR)
    } else if properties.optimal_tiling_features.contains(feature) {
        Ok(vk::ImageTiling::OPTIMAL)
    } else {
        Err(GpuError::UnsupportedDepthFormat(format))
    }
}
