//! Directory codec and tile index.
//!
//! A serialized directory is a varint entry count followed by four column streams:
//! tile id deltas, run lengths, lengths and offsets. An offset that continues the
//! previous entry (`offset == previous.offset + previous.length`) is written as `0`,
//! every other offset as `offset + 1`.
//!
//! ```rust
//! use pmtiles_container::{Directory, Entry, Lookup};
//! use pmtiles_core::ByteRange;
//!
//! let directory = Directory::from(vec![
//! 	Entry::new(0, ByteRange::new(0, 10), 1),
//! 	Entry::new(1, ByteRange::new(10, 20), 4),
//! ]);
//! let blob = directory.serialize().unwrap();
//! assert_eq!(Directory::from_blob(&blob).unwrap(), directory);
//! assert_eq!(directory.find(3), Lookup::Tile(ByteRange::new(10, 20)));
//! assert_eq!(directory.find(5), Lookup::NotFound);
//! ```

use super::Entry;
use anyhow::{Result, bail, ensure};
use byteorder::LittleEndian;
use pmtiles_core::{
	ArchiveError, Blob, ByteRange, CacheWeight,
	io::{ValueReader, ValueReaderSlice, ValueWriter, ValueWriterBlob},
};
use std::mem::size_of;

/// Fixed bookkeeping cost charged per cached directory on top of its entries.
const DIRECTORY_OVERHEAD: usize = 64;

/// The outcome of looking up a tile id in one directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lookup {
	/// The tile's bytes, relative to the tile data region.
	Tile(ByteRange),
	/// A child directory that may hold the tile, relative to the leaf directory region.
	Descend(ByteRange),
	NotFound,
}

/// An ordered list of entries, strictly ascending by tile id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Directory {
	entries: Vec<Entry>,
}

impl Directory {
	pub fn new() -> Directory {
		Directory::default()
	}

	pub fn push(&mut self, entry: Entry) {
		self.entries.push(entry);
	}

	pub fn entries(&self) -> &[Entry] {
		&self.entries
	}

	pub fn into_entries(self) -> Vec<Entry> {
		self.entries
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Encodes the directory. See [`serialize_entries`].
	pub fn serialize(&self) -> Result<Blob> {
		serialize_entries(&self.entries)
	}

	/// Decodes a serialized directory.
	///
	/// # Errors
	/// [`ArchiveError::CorruptDirectory`] on truncated or overlong varints, trailing bytes,
	/// an impossible entry count, id overflow, non-ascending ids or a leading `0` offset.
	pub fn from_blob(blob: &Blob) -> Result<Directory> {
		let mut reader = ValueReaderSlice::new_le(blob.as_slice());

		let count = read_varint(&mut reader)?;
		// every entry occupies at least one byte in each of the four columns
		if count.saturating_mul(4) > reader.remaining() {
			bail!(corrupt(format!(
				"entry count {count} exceeds what {} bytes can hold",
				blob.len()
			)));
		}
		let count = count as usize;

		let mut entries: Vec<Entry> = Vec::with_capacity(count);
		let mut last_id: u64 = 0;
		for i in 0..count {
			let delta = read_varint(&mut reader)?;
			if i > 0 && delta == 0 {
				bail!(corrupt(format!("tile ids are not strictly ascending at entry {i}")));
			}
			last_id = match last_id.checked_add(delta) {
				Some(id) => id,
				None => bail!(corrupt(format!("tile id delta overflows at entry {i}"))),
			};
			entries.push(Entry::new(last_id, ByteRange::empty(), 0));
		}

		for entry in &mut entries {
			let run_length = read_varint(&mut reader)?;
			entry.run_length = match u32::try_from(run_length) {
				Ok(value) => value,
				Err(_) => bail!(corrupt(format!("run length {run_length} exceeds 32 bits"))),
			};
		}

		for entry in &mut entries {
			entry.range.length = read_varint(&mut reader)?;
		}

		for i in 0..count {
			let value = read_varint(&mut reader)?;
			entries[i].range.offset = if value == 0 {
				if i == 0 {
					bail!(corrupt("first entry continues a non-existent predecessor"));
				}
				let previous = entries[i - 1].range;
				match previous.offset.checked_add(previous.length) {
					Some(offset) => offset,
					None => bail!(corrupt(format!("offset overflows at entry {i}"))),
				}
			} else {
				value - 1
			};
		}

		if reader.has_remaining() {
			bail!(corrupt(format!("{} trailing bytes", reader.remaining())));
		}

		Ok(Directory { entries })
	}

	/// Finds the entry responsible for `tile_id`: the one with the greatest tile id not above it.
	pub fn find(&self, tile_id: u64) -> Lookup {
		let index = match self.entries.binary_search_by_key(&tile_id, |e| e.tile_id) {
			Ok(index) => index,
			Err(0) => return Lookup::NotFound,
			Err(index) => index - 1,
		};

		let entry = &self.entries[index];
		if entry.is_pointer() {
			return Lookup::Descend(entry.range);
		}
		match entry.tile_range(tile_id) {
			Some(range) => Lookup::Tile(range),
			None => Lookup::NotFound,
		}
	}

	/// Number of tile ids addressed by the tile entries of this directory.
	pub fn addressed_tiles(&self) -> u64 {
		self.entries.iter().map(|e| u64::from(e.run_length)).sum()
	}
}

impl From<Vec<Entry>> for Directory {
	fn from(entries: Vec<Entry>) -> Self {
		Directory { entries }
	}
}

impl CacheWeight for Directory {
	fn cache_weight(&self) -> usize {
		self.entries.len() * size_of::<Entry>() + DIRECTORY_OVERHEAD
	}
}

/// Encodes `entries` into the columnar varint layout.
///
/// # Errors
/// [`ArchiveError::Encoding`] if ids are not strictly ascending, a run reaches into the
/// next entry, or a pointer has zero length.
pub fn serialize_entries(entries: &[Entry]) -> Result<Blob> {
	for (i, entry) in entries.iter().enumerate() {
		ensure!(
			!(entry.is_pointer() && entry.range.length == 0),
			encoding(format!("pointer at tile id {} has zero length", entry.tile_id))
		);
		if i == 0 {
			continue;
		}
		let previous = &entries[i - 1];
		ensure!(
			entry.tile_id > previous.tile_id,
			encoding(format!(
				"tile id {} follows {}, ids must be strictly ascending",
				entry.tile_id, previous.tile_id
			))
		);
		ensure!(
			previous.tile_id.saturating_add(u64::from(previous.run_length)) <= entry.tile_id,
			encoding(format!(
				"run of {} tiles at tile id {} overlaps tile id {}",
				previous.run_length, previous.tile_id, entry.tile_id
			))
		);
	}

	let mut writer = ValueWriterBlob::new_le();
	writer.write_varint(entries.len() as u64)?;

	let mut last_id = 0;
	for entry in entries {
		writer.write_varint(entry.tile_id - last_id)?;
		last_id = entry.tile_id;
	}

	for entry in entries {
		writer.write_varint(u64::from(entry.run_length))?;
	}

	for entry in entries {
		writer.write_varint(entry.range.length)?;
	}

	for (i, entry) in entries.iter().enumerate() {
		let continues = i > 0 && entry.range.offset == entries[i - 1].range.end();
		if continues {
			writer.write_varint(0)?;
		} else {
			let Some(value) = entry.range.offset.checked_add(1) else {
				bail!(encoding(format!("offset of tile id {} is too large", entry.tile_id)));
			};
			writer.write_varint(value)?;
		}
	}

	Ok(writer.into_blob())
}

/// Exact number of bytes [`serialize_entries`] produces for one more entry after `previous`.
///
/// The entry count prefix is not included.
pub fn encoded_entry_size(entry: &Entry, previous: Option<&Entry>) -> usize {
	let (delta, offset) = match previous {
		Some(p) if entry.range.offset == p.range.end() => (entry.tile_id - p.tile_id, 0),
		Some(p) => (entry.tile_id - p.tile_id, entry.range.offset + 1),
		None => (entry.tile_id, entry.range.offset + 1),
	};
	varint_size(delta) + varint_size(u64::from(entry.run_length)) + varint_size(entry.range.length) + varint_size(offset)
}

pub fn varint_size(value: u64) -> usize {
	(((64 - value.leading_zeros()).max(1) + 6) / 7) as usize
}

fn read_varint(reader: &mut ValueReaderSlice<'_, LittleEndian>) -> Result<u64> {
	let position = reader.position();
	reader
		.read_varint()
		.map_err(|e| corrupt(format!("invalid varint at byte {position}: {e}")))
}

fn corrupt(message: impl Into<String>) -> anyhow::Error {
	anyhow::Error::new(ArchiveError::CorruptDirectory(message.into()))
}

fn encoding(message: impl Into<String>) -> anyhow::Error {
	anyhow::Error::new(ArchiveError::Encoding(message.into()))
}
