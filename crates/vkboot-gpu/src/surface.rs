//! Windowed Vulkan adapter.
//!
//! Owns the entry, instance, surface and the selected physical device, and
//! answers every capability query the bootstrap makes. Devices created from
//! it must be dropped before the adapter.

use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::backend::Adapter;
use crate::device::AshDevice;
use crate::error::{GpuError, Result};
use crate::instance::{create_instance, select_physical_device};

/// An adapter backed by a real Vulkan driver and window surface.
pub struct AshAdapter {
    // Entry must be kept alive for the lifetime of the instance
    #[allow(dead_code)]
    entry: ash::Entry,
    instance: ash::Instance,
    surface_loader: ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
    physical_device: vk::PhysicalDevice,
}

impl AshAdapter {
    /// Load Vulkan, create an instance and surface for `window`, and pick a
    /// physical device that can present to it.
    pub fn new<W>(window: &W, app_name: &str, enable_validation: bool) -> Result<Self>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        // SAFETY: loading the system Vulkan library has no other preconditions
        let entry = unsafe { ash::Entry::load() }
            .map_err(|e| GpuError::Other(format!("Failed to load Vulkan: {e}")))?;

        let display = window
            .display_handle()
            .map_err(|e| GpuError::SurfaceCreation(format!("Failed to get display handle: {e}")))?
            .as_raw();
        let window_handle = window
            .window_handle()
            .map_err(|e| GpuError::SurfaceCreation(format!("Failed to get window handle: {e}")))?
            .as_raw();

        // SAFETY: entry was just loaded
        let instance = unsafe { create_instance(&entry, app_name, display, enable_validation)? };

        // SAFETY: instance is valid and the handles come from a live window
        let surface = match unsafe {
            ash_window::create_surface(&entry, &instance, display, window_handle, None)
        } {
            Ok(surface) => surface,
            Err(e) => {
                // SAFETY: nothing else was created from the instance
                unsafe { instance.destroy_instance(None) };
                return Err(GpuError::SurfaceCreation(e.to_string()));
            }
        };
        let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

        // SAFETY: instance and surface are valid
        let physical_device =
            match unsafe { select_physical_device(&instance, &surface_loader, surface) } {
                Ok(device) => device,
                Err(e) => {
                    // SAFETY: the surface and instance have no other users yet
                    unsafe {
                        surface_loader.destroy_surface(surface, None);
                        instance.destroy_instance(None);
                    }
                    return Err(e);
                }
            };

        Ok(Self {
            entry,
            instance,
            surface_loader,
            surface,
            physical_device,
        })
    }

    /// Get the Vulkan instance handle.
    pub fn instance(&self) -> &ash::Instance {
        &self.instance
    }

    /// Get the physical device handle.
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }
}

impl Adapter for AshAdapter {
    type Device = AshDevice;

    fn properties(&self) -> vk::PhysicalDeviceProperties {
        // SAFETY: physical_device belongs to instance
        unsafe {
            self.instance
                .get_physical_device_properties(self.physical_device)
        }
    }

    fn queue_family_properties(&self) -> Vec<vk::QueueFamilyProperties> {
        // SAFETY: physical_device belongs to instance
        unsafe {
            self.instance
                .get_physical_device_queue_family_properties(self.physical_device)
        }
    }

    fn surface_support(&self, queue_family_index: u32) -> Result<bool> {
        // SAFETY: the surface and physical device are valid
        let supported = unsafe {
            self.surface_loader.get_physical_device_surface_support(
                self.physical_device,
                queue_family_index,
                self.surface,
            )?
        };
        Ok(supported)
    }

    fn surface_capabilities(&self) -> Result<vk::SurfaceCapabilitiesKHR> {
        // SAFETY: the surface and physical device are valid
        let capabilities = unsafe {
            self.surface_loader
                .get_physical_device_surface_capabilities(self.physical_device, self.surface)?
        };
        Ok(capabilities)
    }

    fn surface_formats(&self) -> Result<Vec<vk::SurfaceFormatKHR>> {
        // SAFETY: the surface and physical device are valid
        let formats = unsafe {
            self.surface_loader
                .get_physical_device_surface_formats(self.physical_device, self.surface)?
        };
        Ok(formats)
    }

    fn surface_present_modes(&self) -> Result<Vec<vk::PresentModeKHR>> {
        // SAFETY: the surface and physical device are valid
        let modes = unsafe {
            self.surface_loader
                .get_physical_device_surface_present_modes(self.physical_device, self.surface)?
        };
        Ok(modes)
    }

    fn memory_properties(&self) -> vk::PhysicalDeviceMemoryProperties {
        // SAFETY: physical_device belongs to instance
        unsafe {
            self.instance
                .get_physical_device_memory_properties(self.physical_device)
        }
    }

    fn format_properties(&self, format: vk::Format) -> vk::FormatProperties {
        // SAFETY: physical_device belongs to instance
        unsafe {
            self.instance
                .get_physical_device_format_properties(self.physical_device, format)
        }
    }

    fn surface(&self) -> vk::SurfaceKHR {
        self.surface
    }

    fn create_device(&self, queue_family_index: u32, priorities: &[f32]) -> Result<AshDevice> {
        let queue_infos = [vk::DeviceQueueCreateInfo::default()
            .queue_family_index(queue_family_index)
            .queue_priorities(priorities)];
        let extension_names = [ash::khr::swapchain::NAME.as_ptr()];

        let create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_infos)
            .enabled_extension_names(&extension_names);

        // SAFETY: create_info only points at locals that outlive the call
        let device = unsafe {
            self.instance
                .create_device(self.physical_device, &create_info, None)?
        };
        Ok(AshDevice::new(&self.instance, device))
    }
}

impl Drop for AshAdapter {
    fn drop(&mut self) {
        // SAFETY: every device created from this adapter has been dropped
        unsafe {
            self.surface_loader.destroy_surface(self.surface, None);
            self.instance.destroy_instance(None);
        }
    }
}
