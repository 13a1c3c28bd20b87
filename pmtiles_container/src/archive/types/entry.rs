use pmtiles_core::ByteRange;
use std::fmt::{self, Debug};

/// One row of a directory.
///
/// With `run_length >= 1` the entry addresses the tiles `tile_id .. tile_id + run_length`,
/// which all share the same content stored at `range` inside the tile data region.
///
/// With `run_length == 0` the entry points to a child directory; `range` is relative to the
/// leaf directory region.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Entry {
	pub tile_id: u64,
	pub range: ByteRange,
	pub run_length: u32,
}

impl Entry {
	pub fn new(tile_id: u64, range: ByteRange, run_length: u32) -> Entry {
		Entry {
			tile_id,
			range,
			run_length,
		}
	}

	pub fn new_pointer(tile_id: u64, range: ByteRange) -> Entry {
		Entry::new(tile_id, range, 0)
	}

	pub fn is_pointer(&self) -> bool {
		self.run_length == 0
	}

	/// Whether this tile entry covers `tile_id`. Pointers cover nothing themselves.
	pub fn covers(&self, tile_id: u64) -> bool {
		tile_id >= self.tile_id && tile_id - self.tile_id < u64::from(self.run_length)
	}

	/// Byte range of a tile of the run, relative to the tile data region.
	pub fn tile_range(&self, tile_id: u64) -> Option<ByteRange> {
		self.covers(tile_id).then_some(self.range)
	}

	/// Iterates over `(tile_id, range)` of every tile of the run.
	pub fn tiles(&self) -> impl Iterator<Item = (u64, ByteRange)> + '_ {
		(0..u64::from(self.run_length)).map(move |i| (self.tile_id + i, self.range))
	}
}

impl Debug for Entry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.is_pointer() {
			write!(f, "Pointer({} -> {:?})", self.tile_id, self.range)
		} else {
			write!(f, "Entry({}x{} -> {:?})", self.tile_id, self.run_length, self.range)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn runs_share_one_range() {
		let entry = Entry::new(10, ByteRange::new(100, 20), 3);
		assert_eq!(entry.tile_range(9), None);
		assert_eq!(entry.tile_range(10), Some(ByteRange::new(100, 20)));
		assert_eq!(entry.tile_range(12), Some(ByteRange::new(100, 20)));
		assert_eq!(entry.tile_range(13), None);
		assert_eq!(
			entry.tiles().collect::<Vec<_>>(),
			vec![
				(10, ByteRange::new(100, 20)),
				(11, ByteRange::new(100, 20)),
				(12, ByteRange::new(100, 20))
			]
		);
	}

	#[test]
	fn pointers_cover_nothing() {
		let pointer = Entry::new_pointer(5, ByteRange::new(0, 30));
		assert!(pointer.is_pointer());
		assert!(!pointer.covers(5));
		assert_eq!(pointer.tile_range(5), None);
		assert_eq!(format!("{pointer:?}"), "Pointer(5 -> ByteRange[0,30])");
	}
}
