//! Window and input handling for vkboot.
//!
//! Provides window creation, raw handles for surface creation, and exit
//! detection via winit.

use raw_window_handle::{HasDisplayHandle, HasWindowHandle, RawDisplayHandle, RawWindowHandle};
use thiserror::Error;
use vkboot_core::constants;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::keyboard::{Key, NamedKey};
use winit::window::Window;

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Window creation failed: {0}")]
    WindowCreation(String),
    #[error("Event loop error: {0}")]
    EventLoop(String),
    #[error("Window handle unavailable: {0}")]
    Handle(String),
}

pub type Result<T> = std::result::Result<T, PlatformError>;

/// Window configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub resizable: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "vkboot".to_string(),
            width: constants::DEFAULT_WIDTH,
            height: constants::DEFAULT_HEIGHT,
            resizable: false,
        }
    }
}

impl WindowConfig {
    /// Set the window title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the inner size in physical pixels.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Allow the user to resize the window.
    pub fn with_resizable(mut self, resizable: bool) -> Self {
        self.resizable = resizable;
        self
    }
}

/// Create a window from inside a running event loop.
pub fn create_window(event_loop: &ActiveEventLoop, config: &WindowConfig) -> Result<Window> {
    let attributes = Window::default_attributes()
        .with_title(config.title.clone())
        .with_inner_size(PhysicalSize::new(config.width, config.height))
        .with_resizable(config.resizable);

    let window = event_loop
        .create_window(attributes)
        .map_err(|e| PlatformError::WindowCreation(e.to_string()))?;

    tracing::info!(
        "Window created: \"{}\" {}x{}",
        config.title,
        config.width,
        config.height
    );
    Ok(window)
}

/// Get raw handles from a window for Vulkan surface creation.
pub fn get_raw_handles(window: &Window) -> Result<(RawDisplayHandle, RawWindowHandle)> {
    let display = window
        .display_handle()
        .map_err(|e| PlatformError::Handle(e.to_string()))?;
    let handle = window
        .window_handle()
        .map_err(|e| PlatformError::Handle(e.to_string()))?;
    Ok((display.as_raw(), handle.as_raw()))
}

/// Current inner size of a window in physical pixels.
pub fn window_size(window: &Window) -> (u32, u32) {
    let size = window.inner_size();
    (size.width, size.height)
}

/// Whether the event asks the application to exit: a close request or a
/// pressed Escape key.
pub fn is_exit_request(event: &WindowEvent) -> bool {
    match event {
        WindowEvent::CloseRequested => true,
        WindowEvent::KeyboardInput { event, .. } => is_exit_key(&event.logical_key, event.state),
        _ => false,
    }
}

/// Whether a key transition asks the application to exit.
pub fn is_exit_key(key: &Key, state: ElementState) -> bool {
    state == ElementState::Pressed && *key == Key::Named(NamedKey::Escape)
}
