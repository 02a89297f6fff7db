//! Wire format of the kernel vsync event record.

use thiserror::Error;

/// Every well-formed event record starts with this literal.
pub const RECORD_PREFIX: &str = "VSYNC=";

/// Fixed size of the read buffer handed to the event source. Records are a
/// short ASCII line, e.g. `VSYNC=41800875994\n`; the rest of the buffer is
/// untouched.
pub const MAX_RECORD_LEN: usize = 64;

/// Index of the display source an event belongs to. The primary display is 0.
pub type DisplayIndex = u32;

/// Monotonic hardware timestamp in nanoseconds.
pub type TimestampNs = u64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
	#[error("record does not start with {RECORD_PREFIX:?}")]
	MissingPrefix,
	#[error("record has no timestamp digits after the prefix")]
	EmptyTimestamp,
	#[error("record timestamp does not fit in 64 bits")]
	TimestampOverflow,
}

/// Extracts the timestamp from one event record.
///
/// The decimal tail is terminated by the first non-digit byte, so a trailing
/// newline or NUL padding is tolerated. A matching prefix with no digits
/// behind it is an error; the caller drops the record rather than reusing a
/// stale timestamp.
pub fn parse_vsync_record(raw: &[u8]) -> Result<TimestampNs, RecordError> {
	let Some(tail) = raw.strip_prefix(RECORD_PREFIX.as_bytes()) else {
		return Err(RecordError::MissingPrefix);
	};
	let digits = tail.iter().take_while(|b| b.is_ascii_digit()).count();
	if digits == 0 {
		return Err(RecordError::EmptyTimestamp);
	}
	let mut timestamp: TimestampNs = 0;
	for &b in &tail[..digits] {
		timestamp = timestamp
			.checked_mul(10)
			.and_then(|t| t.checked_add(TimestampNs::from(b - b'0')))
			.ok_or(RecordError::TimestampOverflow)?;
	}
	Ok(timestamp)
}
