//! Vsync signal delivery for display compositors.
//!
//! A dedicated pump thread keeps one display's hardware vsync interrupt
//! enabled exactly when demanded, blocks on the kernel event source, and
//! forwards each parsed timestamp to a registered listener.

pub mod config;
pub mod control;
pub mod pump;
pub mod source;
pub mod switch;

pub use config::Config;
pub use control::{Lifecycle, VsyncControl};
pub use pump::{PumpConfig, PumpHandle, VSYNC_THREAD_NAME, VsyncListener};
pub use source::{EventSource, SourceError, SysfsEventSource};
pub use switch::{FbVsyncSwitch, SwitchError, VsyncSwitch};
