//! This module provides the [`Blob`] struct, a wrapper around [`Vec<u8>`] used for tile bytes,
//! serialized directories and metadata.
//!
//! # Examples
//!
//! ```rust
//! use pmtiles_core::{Blob, ByteRange};
//!
//! let blob = Blob::from(vec![0, 1, 2, 3, 4, 5, 6, 7]);
//! assert_eq!(blob.len(), 8);
//! assert_eq!(blob.range(2..5), &[2, 3, 4]);
//! assert_eq!(blob.read_range(&ByteRange::new(6, 2)).unwrap().as_slice(), &[6, 7]);
//!
//! let text = Blob::from("Xylofön");
//! assert_eq!(text.as_str(), "Xylofön");
//! ```

use super::ByteRange;
use anyhow::{Result, bail};
use std::fmt::Debug;
use std::ops::Range;

/// An owned sequence of bytes.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Blob(Vec<u8>);

impl Blob {
	/// Creates an empty `Blob`.
	#[must_use]
	pub fn new_empty() -> Blob {
		Blob(Vec::new())
	}

	/// Returns a slice of the blob for the given index range.
	///
	/// # Panics
	///
	/// Panics if the range is out of bounds.
	#[must_use]
	pub fn range(&self, range: Range<usize>) -> &[u8] {
		&self.0[range]
	}

	/// Copies the bytes covered by `range` into a new `Blob`.
	///
	/// # Errors
	///
	/// Returns an error if the range reaches past the end of the blob.
	pub fn read_range(&self, range: &ByteRange) -> Result<Blob> {
		if range.offset + range.length > self.0.len() as u64 {
			bail!("read outside range: {range:?} of blob with {} bytes", self.0.len())
		}
		Ok(Blob::from(&self.0[range.as_range_usize()]))
	}

	#[must_use]
	pub fn as_slice(&self) -> &[u8] {
		self.0.as_ref()
	}

	#[must_use]
	pub fn into_vec(self) -> Vec<u8> {
		self.0
	}

	/// Interprets the blob as UTF-8 text, replacing invalid sequences.
	#[must_use]
	pub fn as_str(&self) -> &str {
		std::str::from_utf8(&self.0).unwrap_or("<binary>")
	}

	/// Formats the blob as space separated lowercase hex bytes, e.g. `"0a ff 03"`.
	#[must_use]
	pub fn as_hex(&self) -> String {
		self
			.0
			.iter()
			.map(|byte| format!("{byte:02x}"))
			.collect::<Vec<_>>()
			.join(" ")
	}

	#[must_use]
	pub fn len(&self) -> u64 {
		self.0.len() as u64
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl From<Vec<u8>> for Blob {
	fn from(item: Vec<u8>) -> Self {
		Blob(item)
	}
}

impl From<&[u8]> for Blob {
	fn from(item: &[u8]) -> Self {
		Blob(item.to_vec())
	}
}

impl<const N: usize> From<&[u8; N]> for Blob {
	fn from(item: &[u8; N]) -> Self {
		Blob(item.to_vec())
	}
}

impl From<&str> for Blob {
	fn from(item: &str) -> Self {
		Blob(item.as_bytes().to_vec())
	}
}

impl From<String> for Blob {
	fn from(item: String) -> Self {
		Blob(item.into_bytes())
	}
}

impl Debug for Blob {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "Blob({}): ", self.0.len())?;
		if self.0.len() <= 16 {
			f.write_str(&self.as_hex())
		} else {
			write!(f, "{} ...", Blob::from(&self.0[0..16]).as_hex())
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn basic_conversions() {
		let blob = Blob::from("hello");
		assert_eq!(blob.len(), 5);
		assert!(!blob.is_empty());
		assert_eq!(blob.as_str(), "hello");
		assert_eq!(blob.clone().into_vec(), b"hello".to_vec());
		assert!(Blob::new_empty().is_empty());
	}

	#[test]
	fn read_range_inside_and_outside() {
		let blob = Blob::from(vec![10, 11, 12, 13]);
		assert_eq!(blob.read_range(&ByteRange::new(1, 2)).unwrap().as_slice(), &[11, 12]);
		assert_eq!(blob.read_range(&ByteRange::new(4, 0)).unwrap().len(), 0);
		assert!(blob.read_range(&ByteRange::new(3, 2)).is_err());
	}

	#[test]
	fn hex_and_debug() {
		let blob = Blob::from(&[0x03, 0x01, 0xff]);
		assert_eq!(blob.as_hex(), "03 01 ff");
		assert_eq!(format!("{blob:?}"), "Blob(3): 03 01 ff");

		let long = Blob::from(vec![0u8; 20]);
		assert_eq!(
			format!("{long:?}"),
			"Blob(20): 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 ..."
		);
	}

	#[test]
	fn binary_as_str() {
		let blob = Blob::from(&[0xff, 0xfe]);
		assert_eq!(blob.as_str(), "<binary>");
	}
}
