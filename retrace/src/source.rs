use std::fs::File;
use std::path::{Path, PathBuf};

use nix::errno::Errno;
use nix::sys::uio::pread;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
	#[error("failed to open event source {}: {source}", .path.display())]
	Open {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
	#[error("event source read failed: {0}")]
	Read(Errno),
}

impl SourceError {
	/// Retryable read failures: the kernel interrupted or briefly refused
	/// the read, so the next immediate attempt may succeed.
	pub fn is_transient(&self) -> bool {
		matches!(
			self,
			Self::Read(Errno::EINTR | Errno::EAGAIN | Errno::EBUSY)
		)
	}
}

/// One hardware vsync event source. A read blocks until the next event and
/// fills `buf` with the textual record.
pub trait EventSource: Send {
	fn read_record(&mut self, buf: &mut [u8]) -> Result<usize, SourceError>;
}

/// The sysfs vsync event attribute of one framebuffer, e.g.
/// `/sys/class/graphics/fb0/vsync_event`.
#[derive(Debug)]
pub struct SysfsEventSource {
	file: File,
}

impl SysfsEventSource {
	pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
		let path = path.as_ref();
		let file = File::open(path).map_err(|source| SourceError::Open {
			path: path.to_path_buf(),
			source,
		})?;
		Ok(Self { file })
	}
}

impl EventSource for SysfsEventSource {
	fn read_record(&mut self, buf: &mut [u8]) -> Result<usize, SourceError> {
		// sysfs attributes are re-read from the start on every event
		pread(&self.file, buf, 0).map_err(SourceError::Read)
	}
}
