use std::fs::{File, OpenOptions};
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};

use nix::errno::Errno;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SwitchError {
	#[error("failed to open framebuffer device {}: {source}", .path.display())]
	Open {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
	#[error("vsync interrupt control failed (enable={enable}): {errno}")]
	Ioctl { enable: bool, errno: Errno },
}

/// Binary control over interrupt generation for one display's vsync source.
pub trait VsyncSwitch: Send {
	fn set_interrupts(&self, enable: bool) -> Result<(), SwitchError>;
}

const MSMFB_IOCTL_MAGIC: u8 = b'm';
const MSMFB_OVERLAY_VSYNC_CTRL: u8 = 160;

nix::ioctl_write_ptr!(
	overlay_vsync_ctrl,
	MSMFB_IOCTL_MAGIC,
	MSMFB_OVERLAY_VSYNC_CTRL,
	libc::c_uint
);

/// Vsync interrupt switch backed by the MSM framebuffer overlay ioctl.
#[derive(Debug)]
pub struct FbVsyncSwitch {
	device: File,
}

impl FbVsyncSwitch {
	pub fn open(path: impl AsRef<Path>) -> Result<Self, SwitchError> {
		let path = path.as_ref();
		let device = OpenOptions::new()
			.read(true)
			.write(true)
			.open(path)
			.map_err(|source| SwitchError::Open {
				path: path.to_path_buf(),
				source,
			})?;
		Ok(Self { device })
	}
}

impl VsyncSwitch for FbVsyncSwitch {
	fn set_interrupts(&self, enable: bool) -> Result<(), SwitchError> {
		let value: libc::c_uint = enable.into();
		unsafe { overlay_vsync_ctrl(self.device.as_raw_fd(), &value) }
			.map(drop)
			.map_err(|errno| SwitchError::Ioctl { enable, errno })
	}
}

#[cfg(test)]
mod tests {
	use super::{FbVsyncSwitch, SwitchError};

	#[test]
	fn open_failure_reports_the_path() {
		let err = FbVsyncSwitch::open("/nonexistent/fb0").unwrap_err();
		assert!(matches!(err, SwitchError::Open { .. }));
		assert!(err.to_string().contains("/nonexistent/fb0"));
	}
}
