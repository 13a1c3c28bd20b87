//! This module defines the `DataWriterTrait`, the sink archives are written to.

use crate::{Blob, ByteRange};
use anyhow::Result;

/// A sequential writer that can also patch the beginning of its output.
pub trait DataWriterTrait: Send {
	/// Appends `blob` and returns the range it occupies.
	fn append(&mut self, blob: &Blob) -> Result<ByteRange>;

	/// Overwrites the start of the output with `blob`, keeping the current position.
	fn write_start(&mut self, blob: &Blob) -> Result<()>;

	fn get_position(&mut self) -> Result<u64>;

	fn set_position(&mut self, position: u64) -> Result<()>;
}
