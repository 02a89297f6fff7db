use std::io::Read;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use retrace::{Config, FbVsyncSwitch, SysfsEventSource, pump};

fn main() -> anyhow::Result<()> {
	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
		)
		.init();

	let config = Config::from_env();
	info!(?config, "starting retrace");

	let switch = FbVsyncSwitch::open(&config.fb_device_path).with_context(|| {
		format!(
			"opening framebuffer device {}",
			config.fb_device_path.display()
		)
	})?;

	let source_path = config.event_source_path.clone();
	let handle = pump::spawn(
		pump::PumpConfig {
			display_index: config.display_index,
			read_retry_ceiling: config.read_retry_ceiling,
		},
		move || SysfsEventSource::open(&source_path),
		switch,
		Box::new(|display_index, timestamp| info!(display = display_index, timestamp, "vsync")),
	);
	handle.set_enabled(true);

	// run until stdin closes, then unwind the pump
	let mut sink = Vec::new();
	let _ = std::io::stdin().read_to_end(&mut sink);
	info!("stdin closed, stopping vsync pump");
	handle.request_stop();
	handle.join();
	Ok(())
}
