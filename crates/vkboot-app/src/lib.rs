//! Application framework for vkboot.
//!
//! This crate provides a trait-based framework for presenting frames:
//! - Window and presenter setup on startup
//! - Per-image command recording, redone after every rebuild
//! - Swapchain rebuild on resize or out-of-date presentation
//! - Orderly teardown with frame statistics

pub mod app;
pub mod context;
pub mod frame;
pub mod runner;

pub use app::PresentApp;
pub use context::AppContext;
pub use frame::{FrameContext, FrameStats};
pub use runner::{run_app, AppConfig};
