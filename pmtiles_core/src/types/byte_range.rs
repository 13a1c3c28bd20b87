//! This module provides the `ByteRange` struct, which represents a range of bytes with an offset and length.
//!
//! # Examples
//!
//! ```rust
//! use pmtiles_core::ByteRange;
//!
//! let range = ByteRange::new(23, 42);
//! assert_eq!(range.end(), 65);
//! assert_eq!(range.as_range_usize(), 23..65);
//! assert_eq!(range.get_shifted_forward(100), ByteRange::new(123, 42));
//! ```

use std::fmt;
use std::ops::Range;

/// A struct representing a range of bytes with an offset and length.
#[derive(Clone, Copy, Default, Eq, Hash, PartialEq)]
pub struct ByteRange {
	/// The starting offset of the byte range.
	pub offset: u64,
	/// The length of the byte range.
	pub length: u64,
}

impl ByteRange {
	/// Creates a new `ByteRange` with the specified offset and length.
	pub fn new(offset: u64, length: u64) -> Self {
		Self { offset, length }
	}

	/// Creates an empty `ByteRange` with zero offset and length.
	pub fn empty() -> Self {
		Self::default()
	}

	/// The first offset behind the range.
	pub fn end(&self) -> u64 {
		self.offset + self.length
	}

	/// Returns a new `ByteRange` that is shifted forward by the specified offset.
	pub fn get_shifted_forward(&self, offset: u64) -> Self {
		Self {
			offset: self.offset + offset,
			length: self.length,
		}
	}

	/// Returns a new `ByteRange` that is shifted backward by the specified offset.
	pub fn get_shifted_backward(&self, offset: u64) -> Self {
		Self {
			offset: self.offset - offset,
			length: self.length,
		}
	}

	/// Whether `other` lies completely inside this range.
	pub fn contains(&self, other: &ByteRange) -> bool {
		other.offset >= self.offset && other.end() <= self.end()
	}

	/// Whether both ranges share at least one byte.
	pub fn overlaps(&self, other: &ByteRange) -> bool {
		self.offset < other.end() && other.offset < self.end()
	}

	/// Converts the `ByteRange` to a `Range<usize>`.
	pub fn as_range_usize(&self) -> Range<usize> {
		Range {
			start: self.offset as usize,
			end: (self.offset + self.length) as usize,
		}
	}
}

impl fmt::Debug for ByteRange {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "ByteRange[{},{}]", self.offset, self.length)
	}
}

impl fmt::Display for ByteRange {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "bytes {}+{}", self.offset, self.length)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn new_and_empty() {
		let range = ByteRange::new(23, 42);
		assert_eq!(range.offset, 23);
		assert_eq!(range.length, 42);
		assert_eq!(ByteRange::empty(), ByteRange::new(0, 0));
	}

	#[test]
	fn shifting() {
		let range = ByteRange::new(100, 10);
		assert_eq!(range.get_shifted_forward(5), ByteRange::new(105, 10));
		assert_eq!(range.get_shifted_backward(100), ByteRange::new(0, 10));
	}

	#[test]
	fn contains_and_overlaps() {
		let outer = ByteRange::new(10, 20);
		assert!(outer.contains(&ByteRange::new(10, 20)));
		assert!(outer.contains(&ByteRange::new(15, 5)));
		assert!(!outer.contains(&ByteRange::new(25, 6)));
		assert!(outer.overlaps(&ByteRange::new(29, 5)));
		assert!(!outer.overlaps(&ByteRange::new(30, 5)));
		assert!(!outer.overlaps(&ByteRange::new(0, 10)));
	}

	#[test]
	fn formatting() {
		let range = ByteRange::new(23, 42);
		assert_eq!(format!("{range:?}"), "ByteRange[23,42]");
		assert_eq!(range.to_string(), "bytes 23+42");
	}
}
