//! Read tiles and metadata from an archive through a byte-range backend.
//!
//! The header is read and validated once when opening. Every tile lookup then walks the
//! directory tree from the root: each directory is fetched, decompressed and decoded through
//! the shared [`DirectoryCache`], so warm lookups cost exactly one range request for the tile.
//!
//! ## Usage
//! ```rust,no_run
//! use pmtiles_container::{ArchiveReader, DirectoryCache};
//! use pmtiles_core::TileCoord;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cache = Arc::new(DirectoryCache::new(64 << 20));
//!     let reader = ArchiveReader::open_location("https://example.org/berlin.pmtiles", cache).await?;
//!     if let Some(tile) = reader.get_tile(&TileCoord::new(10, 550, 335)?).await? {
//!         println!("{} bytes", tile.len());
//!     }
//!     Ok(())
//! }
//! ```

use super::{ArchiveCompression, Directory, DirectoryCache, Entry, HEADER_LEN, HeaderV3, Lookup};
use anyhow::{Context, Result};
use pmtiles_core::{
	ArchiveError, Blob, ByteRange, TileCompression, TileCoord, TileFormat,
	compression::decompress,
	io::{DataReader, DataReaderFile, open_data_reader},
};
use std::{
	fmt::Debug,
	path::Path,
	sync::{
		Arc,
		atomic::{AtomicU64, Ordering},
	},
};

/// Directories nest at most this deep, the root counting as the first level.
pub const MAX_DIRECTORY_DEPTH: usize = 8;

static NEXT_ARCHIVE_ID: AtomicU64 = AtomicU64::new(1);

pub struct ArchiveReader {
	id: u64,
	data_reader: DataReader,
	header: HeaderV3,
	internal_compression: TileCompression,
	tile_compression: TileCompression,
	tile_format: TileFormat,
	cache: Arc<DirectoryCache>,
}

impl ArchiveReader {
	/// Reads and validates the header.
	///
	/// # Errors
	/// Fails if the header cannot be fetched or is corrupt, or if the internal compression
	/// is declared as unknown.
	pub async fn open(data_reader: DataReader, cache: Arc<DirectoryCache>) -> Result<ArchiveReader> {
		log::debug!("opening archive {}", data_reader.get_name());

		let blob = data_reader.read_range(&ByteRange::new(0, HEADER_LEN)).await?;
		let header =
			HeaderV3::deserialize(&blob).with_context(|| format!("reading header of '{}'", data_reader.get_name()))?;
		log::trace!("header: {header:?}");

		let internal_compression = header
			.internal_compression
			.as_value()
			.context("reading the internal compression")?;
		let tile_compression = match header.tile_compression {
			ArchiveCompression::Unknown => TileCompression::Uncompressed,
			other => other.as_value()?,
		};

		Ok(ArchiveReader {
			id: NEXT_ARCHIVE_ID.fetch_add(1, Ordering::Relaxed),
			tile_format: header.tile_type.as_value(),
			data_reader,
			header,
			internal_compression,
			tile_compression,
			cache,
		})
	}

	pub async fn open_path(path: &Path, cache: Arc<DirectoryCache>) -> Result<ArchiveReader> {
		ArchiveReader::open(DataReaderFile::open(path)?, cache).await
	}

	/// Opens a local path, `file://` or `http(s)://` location.
	pub async fn open_location(location: &str, cache: Arc<DirectoryCache>) -> Result<ArchiveReader> {
		ArchiveReader::open(open_data_reader(location)?, cache).await
	}

	/// Process-unique identity of this archive, part of every cache key.
	pub fn id(&self) -> u64 {
		self.id
	}

	pub fn name(&self) -> &str {
		self.data_reader.get_name()
	}

	pub fn header(&self) -> &HeaderV3 {
		&self.header
	}

	pub fn tile_compression(&self) -> TileCompression {
		self.tile_compression
	}

	pub fn tile_format(&self) -> TileFormat {
		self.tile_format
	}

	pub fn internal_compression(&self) -> TileCompression {
		self.internal_compression
	}

	/// The tile as stored, still encoded with [`tile_compression`](Self::tile_compression).
	/// `Ok(None)` if the archive does not contain it.
	pub async fn get_tile_raw(&self, coord: &TileCoord) -> Result<Option<Blob>> {
		let Some(range) = self.locate_tile(coord).await? else {
			return Ok(None);
		};
		Ok(Some(self.read_absolute(&range).await?))
	}

	/// The tile with its tile compression removed.
	pub async fn get_tile(&self, coord: &TileCoord) -> Result<Option<Blob>> {
		match self.get_tile_raw(coord).await? {
			Some(blob) => Ok(Some(
				decompress(blob, self.tile_compression).with_context(|| format!("decompressing tile {coord}"))?,
			)),
			None => Ok(None),
		}
	}

	/// Absolute byte range of a tile inside the archive.
	pub async fn locate_tile(&self, coord: &TileCoord) -> Result<Option<ByteRange>> {
		let tile_id = coord.tile_id();
		log::trace!("locate tile {coord} (id {tile_id}) in '{}'", self.name());

		let mut directory_range = self.header.root_dir;
		for depth in 0..MAX_DIRECTORY_DEPTH {
			let directory = self.cached_directory(directory_range).await?;
			match directory.find(tile_id) {
				Lookup::NotFound => return Ok(None),
				Lookup::Tile(range) => return Ok(Some(self.tile_data_range(&range)?)),
				Lookup::Descend(range) => {
					log::trace!("descending to level {} at {range:?}", depth + 1);
					directory_range = self.leaf_range(&range)?;
				}
			}
		}

		Err(corrupt(format!(
			"directories nest deeper than {MAX_DIRECTORY_DEPTH} levels while looking up tile {coord}"
		)))
	}

	/// Metadata region with the internal compression removed.
	pub async fn get_metadata(&self) -> Result<Blob> {
		if self.header.metadata.length == 0 {
			return Ok(Blob::new_empty());
		}
		let blob = self.data_reader.read_range(&self.header.metadata).await?;
		decompress(blob, self.internal_compression).context("decompressing metadata")
	}

	/// Reads stored tile bytes by a range relative to the tile data region.
	pub async fn read_tile_data(&self, range: &ByteRange) -> Result<Blob> {
		self.read_absolute(&self.tile_data_range(range)?).await
	}

	/// Empty tiles are valid and need no request; some backends reject empty ranges.
	async fn read_absolute(&self, range: &ByteRange) -> Result<Blob> {
		if range.length == 0 {
			return Ok(Blob::new_empty());
		}
		self.data_reader.read_range(range).await
	}

	/// Every tile entry of the archive in tile id order, found by a depth-first walk.
	/// The cache is bypassed: the walk reads each directory exactly once.
	pub async fn walk_entries(&self) -> Result<Vec<Entry>> {
		let mut entries = Vec::new();
		let root = self.read_directory(self.header.root_dir).await?;
		let mut stack = vec![(root.into_entries().into_iter(), 1usize)];

		while let Some((iter, depth)) = stack.last_mut() {
			match iter.next() {
				None => {
					stack.pop();
				}
				Some(entry) if entry.is_pointer() => {
					let depth = *depth + 1;
					if depth > MAX_DIRECTORY_DEPTH {
						return Err(corrupt(format!(
							"directories nest deeper than {MAX_DIRECTORY_DEPTH} levels at tile id {}",
							entry.tile_id
						)));
					}
					let child = self.read_directory(self.leaf_range(&entry.range)?).await?;
					stack.push((child.into_entries().into_iter(), depth));
				}
				Some(entry) => entries.push(entry),
			}
		}

		Ok(entries)
	}

	async fn cached_directory(&self, range: ByteRange) -> Result<Arc<Directory>> {
		self
			.cache
			.get_or_fetch((self.id, range.offset), || self.read_directory(range))
			.await
	}

	async fn read_directory(&self, range: ByteRange) -> Result<Directory> {
		let blob = self.data_reader.read_range(&range).await?;
		let blob = decompress(blob, self.internal_compression)
			.map_err(|e| corrupt(format!("cannot decompress directory at {range:?}: {e}")))?;
		Directory::from_blob(&blob).with_context(|| format!("decoding directory at {range:?}"))
	}

	/// Converts a pointer range into an absolute range inside the leaf directory region.
	fn leaf_range(&self, range: &ByteRange) -> Result<ByteRange> {
		resolve_in_region(range, &self.header.leaf_dirs, "leaf directory")
	}

	/// Converts a tile range into an absolute range inside the tile data region.
	fn tile_data_range(&self, range: &ByteRange) -> Result<ByteRange> {
		resolve_in_region(range, &self.header.tile_data, "tile data")
	}
}

fn resolve_in_region(range: &ByteRange, region: &ByteRange, name: &str) -> Result<ByteRange> {
	let inside = range
		.offset
		.checked_add(range.length)
		.is_some_and(|end| end <= region.length);
	if !inside {
		return Err(corrupt(format!(
			"{range:?} lies outside the {name} region of {} bytes",
			region.length
		)));
	}
	Ok(range.get_shifted_forward(region.offset))
}

fn corrupt(message: String) -> anyhow::Error {
	anyhow::Error::new(ArchiveError::CorruptDirectory(message))
}

impl Debug for ArchiveReader {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ArchiveReader")
			.field("id", &self.id)
			.field("name", &self.name())
			.field("tile_format", &self.tile_format)
			.field("tile_compression", &self.tile_compression)
			.finish()
	}
}
