use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::{error, info, trace, warn};

use retrace_protocol::{DisplayIndex, MAX_RECORD_LEN, TimestampNs, parse_vsync_record};

use crate::config::DEFAULT_READ_RETRY_CEILING;
use crate::control::{Demand, Lifecycle, VsyncControl};
use crate::source::{EventSource, SourceError};
use crate::switch::VsyncSwitch;

pub const VSYNC_THREAD_NAME: &str = "retrace-vsync";

/// Niceness applied to the pump thread; vsync delivery outranks ordinary
/// display work.
const VSYNC_THREAD_NICENESS: libc::c_int = -9;

/// Consumer callback, invoked synchronously on the pump thread once per
/// delivered event. Must not block.
pub type VsyncListener = Box<dyn Fn(DisplayIndex, TimestampNs) + Send + 'static>;

#[derive(Debug, Clone)]
pub struct PumpConfig {
	pub display_index: DisplayIndex,
	pub read_retry_ceiling: u32,
}

impl Default for PumpConfig {
	fn default() -> Self {
		Self {
			display_index: 0,
			read_retry_ceiling: DEFAULT_READ_RETRY_CEILING,
		}
	}
}

/// Controller-side handle to a spawned pump.
pub struct PumpHandle {
	control: Arc<VsyncControl>,
	thread: Option<JoinHandle<()>>,
}

impl PumpHandle {
	pub fn control(&self) -> Arc<VsyncControl> {
		Arc::clone(&self.control)
	}

	pub fn set_enabled(&self, enabled: bool) {
		self.control.set_enabled(enabled);
	}

	pub fn lifecycle(&self) -> Lifecycle {
		self.control.lifecycle()
	}

	pub fn request_stop(&self) {
		self.control.request_stop();
	}

	/// Blocks until the pump thread exits. A stop issued while the pump is
	/// inside a blocking read resolves when that read returns.
	pub fn join(mut self) {
		if let Some(thread) = self.thread.take()
			&& thread.join().is_err()
		{
			error!("vsync pump thread panicked");
		}
	}
}

/// Spawns the dedicated pump thread for one display source and returns
/// immediately.
///
/// The event source is opened on the pump thread itself; an open failure is
/// fatal to the pump (logged, lifecycle moves straight to Stopped, no switch
/// call is ever made). Thread-creation failure is logged and degrades to a
/// pump that never delivers; the caller is not failed.
pub fn spawn<F, S, W>(
	config: PumpConfig,
	open_source: F,
	switch: W,
	listener: VsyncListener,
) -> PumpHandle
where
	F: FnOnce() -> Result<S, SourceError> + Send + 'static,
	S: EventSource + 'static,
	W: VsyncSwitch + 'static,
{
	let control = Arc::new(VsyncControl::new());
	let thread_control = Arc::clone(&control);
	info!(display = config.display_index, "starting vsync pump thread");
	let spawned = std::thread::Builder::new()
		.name(VSYNC_THREAD_NAME.to_string())
		.spawn(move || {
			raise_thread_priority();
			let source = match open_source() {
				Ok(source) => source,
				Err(e) => {
					error!("cannot open vsync event source: {e}");
					thread_control.mark_stopped();
					return;
				}
			};
			Pump {
				control: thread_control,
				source,
				switch,
				listener,
				config,
			}
			.run();
		});
	match spawned {
		Ok(thread) => PumpHandle {
			control,
			thread: Some(thread),
		},
		Err(e) => {
			error!("failed to create {VSYNC_THREAD_NAME}: {e}");
			control.mark_stopped();
			PumpHandle {
				control,
				thread: None,
			}
		}
	}
}

struct Pump<S, W> {
	control: Arc<VsyncControl>,
	source: S,
	switch: W,
	listener: VsyncListener,
	config: PumpConfig,
}

impl<S: EventSource, W: VsyncSwitch> Pump<S, W> {
	fn run(mut self) {
		self.control.mark_running();
		// the pump's belief about the last switch call it made
		let mut applied = false;
		loop {
			match self.control.demand() {
				Demand::Shutdown => break,
				Demand::Quiesce => {
					// once per entry into the wait, outside the lock
					if applied {
						self.apply_switch(false);
						applied = false;
					}
					if self.control.wait_while_quiesced() == Demand::Shutdown {
						break;
					}
				}
				Demand::Deliver => {
					if !applied {
						// a failed enable still advances the applied state:
						// the compositor needs cadence more than it needs
						// enable fidelity
						self.apply_switch(true);
						applied = true;
					}
					self.deliver_next();
				}
			}
		}
		if applied {
			self.apply_switch(false);
		}
		self.control.mark_stopped();
		info!(display = self.config.display_index, "vsync pump stopped");
	}

	fn apply_switch(&self, enable: bool) {
		if let Err(e) = self.switch.set_interrupts(enable) {
			error!(
				display = self.config.display_index,
				"vsync interrupt control failed: {e}"
			);
		}
	}

	fn deliver_next(&mut self) {
		let mut record = [0u8; MAX_RECORD_LEN];
		let len = match self.read_with_retry(&mut record) {
			Ok(len) => len,
			Err(e) => {
				// keep going: the consumer needs the next callback attempt
				// more than it needs this event
				error!(
					display = self.config.display_index,
					"vsync event read failed: {e}"
				);
				return;
			}
		};
		match parse_vsync_record(&record[..len]) {
			Ok(timestamp) => {
				trace!(
					display = self.config.display_index,
					timestamp, "vsync delivered"
				);
				(self.listener)(self.config.display_index, timestamp);
			}
			Err(e) => {
				error!(
					display = self.config.display_index,
					"dropping vsync record: {e}"
				);
			}
		}
	}

	fn read_with_retry(&mut self, buf: &mut [u8]) -> Result<usize, SourceError> {
		let mut attempt = 0;
		loop {
			match self.source.read_record(buf) {
				Ok(len) => return Ok(len),
				Err(e) if e.is_transient() && attempt + 1 < self.config.read_retry_ceiling => {
					attempt += 1;
					warn!(
						attempt,
						ceiling = self.config.read_retry_ceiling,
						"transient vsync read failure: {e}, retrying"
					);
				}
				Err(e) => return Err(e),
			}
		}
	}
}

fn raise_thread_priority() {
	// PRIO_PROCESS with id 0 targets only the calling thread on Linux
	let rc = unsafe { libc::setpriority(libc::PRIO_PROCESS, 0, VSYNC_THREAD_NICENESS) };
	if rc != 0 {
		let errno = std::io::Error::last_os_error();
		warn!("could not raise vsync thread priority: {errno}");
	}
}
