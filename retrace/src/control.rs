use std::sync::{Condvar, Mutex, MutexGuard};

/// Externally visible pump lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
	Created,
	Running,
	Stopping,
	Stopped,
}

/// What the pump should be doing right now. A stop request outranks the
/// enable flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Demand {
	Deliver,
	Quiesce,
	Shutdown,
}

#[derive(Debug)]
struct ControlState {
	enabled: bool,
	lifecycle: Lifecycle,
}

/// Synchronized enable flag and wake mechanism shared between the pump
/// thread and its controller.
///
/// The raw flag is never reachable without the lock, and every mutation
/// signals the condition variable, so the pump cannot miss a transition while
/// it holds the lock at the wait point. The condition variable is only a wake
/// signal; the flag is always re-read under the lock after a wake.
#[derive(Debug)]
pub struct VsyncControl {
	state: Mutex<ControlState>,
	changed: Condvar,
}

impl VsyncControl {
	pub fn new() -> Self {
		Self {
			state: Mutex::new(ControlState {
				enabled: false,
				lifecycle: Lifecycle::Created,
			}),
			changed: Condvar::new(),
		}
	}

	/// Sets the desired-enabled state. Safe to call from any thread, any
	/// number of times; redundant sets are harmless.
	pub fn set_enabled(&self, enabled: bool) {
		let mut state = self.lock();
		state.enabled = enabled;
		self.changed.notify_all();
	}

	/// Asks the pump to wind down. Idempotent; observed by the pump at its
	/// wait points.
	pub fn request_stop(&self) {
		let mut state = self.lock();
		if matches!(state.lifecycle, Lifecycle::Created | Lifecycle::Running) {
			state.lifecycle = Lifecycle::Stopping;
		}
		self.changed.notify_all();
	}

	pub fn lifecycle(&self) -> Lifecycle {
		self.lock().lifecycle
	}

	pub(crate) fn mark_running(&self) {
		let mut state = self.lock();
		if state.lifecycle == Lifecycle::Created {
			state.lifecycle = Lifecycle::Running;
		}
		self.changed.notify_all();
	}

	pub(crate) fn mark_stopped(&self) {
		let mut state = self.lock();
		state.lifecycle = Lifecycle::Stopped;
		self.changed.notify_all();
	}

	pub(crate) fn demand(&self) -> Demand {
		Self::demand_of(&self.lock())
	}

	/// Parks the caller until delivery is wanted or a stop is requested.
	/// Spurious wakeups stay parked.
	pub(crate) fn wait_while_quiesced(&self) -> Demand {
		let mut state = self.lock();
		while Self::demand_of(&state) == Demand::Quiesce {
			state = self
				.changed
				.wait(state)
				.expect("vsync control lock poisoned");
		}
		Self::demand_of(&state)
	}

	fn demand_of(state: &ControlState) -> Demand {
		if matches!(state.lifecycle, Lifecycle::Stopping | Lifecycle::Stopped) {
			Demand::Shutdown
		} else if state.enabled {
			Demand::Deliver
		} else {
			Demand::Quiesce
		}
	}

	fn lock(&self) -> MutexGuard<'_, ControlState> {
		self.state.lock().expect("vsync control lock poisoned")
	}
}

impl Default for VsyncControl {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;
	use std::sync::mpsc;
	use std::time::Duration;

	use super::{Demand, Lifecycle, VsyncControl};

	#[test]
	fn starts_created_and_quiesced() {
		let control = VsyncControl::new();
		assert_eq!(control.lifecycle(), Lifecycle::Created);
		assert_eq!(control.demand(), Demand::Quiesce);
	}

	#[test]
	fn enable_flag_drives_demand() {
		let control = VsyncControl::new();
		control.set_enabled(true);
		assert_eq!(control.demand(), Demand::Deliver);
		control.set_enabled(false);
		assert_eq!(control.demand(), Demand::Quiesce);
	}

	#[test]
	fn stop_request_outranks_enable() {
		let control = VsyncControl::new();
		control.set_enabled(true);
		control.request_stop();
		assert_eq!(control.lifecycle(), Lifecycle::Stopping);
		assert_eq!(control.demand(), Demand::Shutdown);
		// still shutdown no matter how the flag is toggled afterwards
		control.set_enabled(true);
		assert_eq!(control.demand(), Demand::Shutdown);
	}

	#[test]
	fn stop_request_is_idempotent_and_final() {
		let control = VsyncControl::new();
		control.request_stop();
		control.request_stop();
		assert_eq!(control.lifecycle(), Lifecycle::Stopping);
		control.mark_stopped();
		control.request_stop();
		assert_eq!(control.lifecycle(), Lifecycle::Stopped);
	}

	#[test]
	fn running_is_only_entered_from_created() {
		let control = VsyncControl::new();
		control.request_stop();
		control.mark_running();
		assert_eq!(control.lifecycle(), Lifecycle::Stopping);
	}

	#[test]
	fn wait_wakes_on_enable() {
		let control = Arc::new(VsyncControl::new());
		let waiter = Arc::clone(&control);
		let (tx, rx) = mpsc::channel();
		let thread = std::thread::spawn(move || {
			tx.send(waiter.wait_while_quiesced()).unwrap();
		});
		control.set_enabled(true);
		assert_eq!(
			rx.recv_timeout(Duration::from_secs(5)).unwrap(),
			Demand::Deliver
		);
		thread.join().unwrap();
	}

	#[test]
	fn wait_wakes_on_stop() {
		let control = Arc::new(VsyncControl::new());
		let waiter = Arc::clone(&control);
		let (tx, rx) = mpsc::channel();
		let thread = std::thread::spawn(move || {
			tx.send(waiter.wait_while_quiesced()).unwrap();
		});
		control.request_stop();
		assert_eq!(
			rx.recv_timeout(Duration::from_secs(5)).unwrap(),
			Demand::Shutdown
		);
		thread.join().unwrap();
	}
}
