use std::path::PathBuf;

use retrace_protocol::DisplayIndex;

pub const DEFAULT_EVENT_SOURCE: &str = "/sys/class/graphics/fb0/vsync_event";
pub const DEFAULT_FB_DEVICE: &str = "/dev/fb0";

/// How many back-to-back transient read failures are retried before the
/// current event is given up on. Retries are immediate; a vsync interval is
/// short enough that any backoff would cost more than the wasted attempts.
pub const DEFAULT_READ_RETRY_CEILING: u32 = 100;

#[derive(Debug, Clone)]
pub struct Config {
	pub event_source_path: PathBuf,
	pub fb_device_path: PathBuf,
	pub read_retry_ceiling: u32,
	pub display_index: DisplayIndex,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			event_source_path: PathBuf::from(DEFAULT_EVENT_SOURCE),
			fb_device_path: PathBuf::from(DEFAULT_FB_DEVICE),
			read_retry_ceiling: DEFAULT_READ_RETRY_CEILING,
			display_index: 0,
		}
	}
}

impl Config {
	pub fn from_env() -> Self {
		let mut config = Self::default();
		if let Some(path) = non_empty_var("RETRACE_EVENT_SOURCE") {
			config.event_source_path = PathBuf::from(path);
		}
		if let Some(path) = non_empty_var("RETRACE_FB_DEVICE") {
			config.fb_device_path = PathBuf::from(path);
		}
		if let Ok(raw) = std::env::var("RETRACE_READ_RETRY_CEILING") {
			match raw.parse::<u32>() {
				Ok(n) if n > 0 => config.read_retry_ceiling = n,
				Ok(_) => tracing::warn!(
					"RETRACE_READ_RETRY_CEILING must be positive, keeping {}",
					config.read_retry_ceiling
				),
				Err(e) => tracing::warn!(
					value = %raw,
					"invalid RETRACE_READ_RETRY_CEILING: {e}"
				),
			}
		}
		if let Ok(raw) = std::env::var("RETRACE_DISPLAY_INDEX") {
			match raw.parse::<DisplayIndex>() {
				Ok(index) => config.display_index = index,
				Err(e) => tracing::warn!(
					value = %raw,
					"invalid RETRACE_DISPLAY_INDEX: {e}"
				),
			}
		}
		config
	}
}

fn non_empty_var(name: &str) -> Option<String> {
	std::env::var(name)
		.ok()
		.map(|v| v.trim().to_string())
		.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
	use super::{Config, DEFAULT_EVENT_SOURCE, DEFAULT_FB_DEVICE, DEFAULT_READ_RETRY_CEILING};

	#[test]
	fn defaults_point_at_the_primary_display() {
		let config = Config::default();
		assert_eq!(config.event_source_path.to_str(), Some(DEFAULT_EVENT_SOURCE));
		assert_eq!(config.fb_device_path.to_str(), Some(DEFAULT_FB_DEVICE));
		assert_eq!(config.read_retry_ceiling, DEFAULT_READ_RETRY_CEILING);
		assert_eq!(config.display_index, 0);
	}
}
