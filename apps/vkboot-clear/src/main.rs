//! vkboot clear demo
//!
//! Opens a window and presents a cleared colour attachment every frame
//! until the window is closed or Escape is pressed.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p vkboot-clear -- [OPTIONS]
//! ```
//!
//! ## Options
//!
//! - `--vsync`: Present in FIFO mode instead of MAILBOX/IMMEDIATE
//! - `--fence-per-submission`: Create and destroy a fence for every frame
//! - `--frames-in-flight <N>`: Number of frame slots (default: 2)
//! - `--images <N>`: Requested swap image count (default: 2)
//! - `--resizable`: Allow the window to be resized
//! - `--no-validation`: Disable validation layers in debug builds
//! - `-h, --help`: Print help message
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Set log level (e.g., info, debug, trace)

mod app;

use vkboot_app::run_app;

use crate::app::{ClearApp, ClearOptions};

fn main() -> anyhow::Result<()> {
    // Check for help flag before starting the app
    if std::env::args().any(|arg| arg == "-h" || arg == "--help") {
        print_help();
        return Ok(());
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = ClearOptions::parse(&args)?;
    run_app::<ClearApp>(options.app_config())
}

fn print_help() {
    eprintln!(
        "vkboot clear demo

USAGE:
    cargo run -p vkboot-clear -- [OPTIONS]

OPTIONS:
    --vsync                  Present in FIFO mode
    --fence-per-submission   Create and destroy a fence for every frame
    --frames-in-flight <N>   Number of frame slots (default: 2)
    --images <N>             Requested swap image count (default: 2)
    --resizable              Allow the window to be resized
    --no-validation          Disable validation layers in debug builds
    -h, --help               Print this help message

CONTROLS:
    Escape                   Exit

ENVIRONMENT VARIABLES:
    RUST_LOG                 Set log level (e.g., info, debug, trace)"
    );
}
