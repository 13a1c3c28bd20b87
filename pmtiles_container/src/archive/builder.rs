//! Builds an archive from tiles that may arrive in any order.
//!
//! Tile bytes are spooled to an anonymous temporary file as they are added; only
//! `(tile id, coordinate, spool range, content digest)` stays in memory. Building sorts by
//! tile id and stores every distinct content once, in order of first appearance. Consecutive
//! tile ids with identical content collapse into one run-length entry. The entries are packed
//! into a root directory that fits the first 16 KiB of the file, spilling into leaf
//! directories when needed.
//!
//! ## Usage
//! ```rust
//! use pmtiles_container::{ArchiveBuilder, BuilderOptions};
//! use pmtiles_core::{Blob, TileCompression, TileCoord, TileFormat};
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut options = BuilderOptions::new(TileFormat::MVT, TileCompression::Gzip);
//!     options.metadata = Blob::from(r#"{"name":"demo"}"#);
//!
//!     let mut builder = ArchiveBuilder::new(options)?;
//!     builder.add_tile(TileCoord::new(1, 1, 0)?, &Blob::from("b"))?;
//!     builder.add_tile(TileCoord::new(0, 0, 0)?, &Blob::from("a"))?;
//!
//!     let path = std::env::temp_dir().join("builder_doc.pmtiles");
//!     builder.write_to_path(&path)?;
//!     Ok(())
//! }
//! ```

use super::{Entry, HEADER_LEN, HeaderV3, encoded_entry_size, serialize_entries, varint_size};
use anyhow::{Context, Result, ensure};
use itertools::Itertools;
use pmtiles_core::{
	ArchiveError, Blob, ByteRange, GeoBBox, TileCompression, TileCoord, TileFormat,
	compression::compress,
	io::{DataWriterFile, DataWriterTrait},
};
use sha2::{Digest, Sha256};
use std::{
	collections::HashMap,
	fs::File,
	io::{BufWriter, Read, Seek, SeekFrom, Write},
	path::Path,
};

/// Header and root directory together fit into the first 16 KiB.
pub const ROOT_DIRECTORY_BUDGET: u64 = 16384 - HEADER_LEN;

pub const DEFAULT_MAX_LEAF_BYTES: usize = 256 * 1024;

/// Smallest accepted leaf budget. Smaller leaves could not hold enough pointers for the
/// levels above them to shrink.
pub const MIN_LEAF_BYTES: usize = 1024;

#[derive(Clone, Debug)]
pub struct BuilderOptions {
	pub tile_format: TileFormat,
	/// Declared encoding of the tile blobs passed to [`ArchiveBuilder::add_tile`].
	pub tile_compression: TileCompression,
	/// Applied to directories and metadata.
	pub internal_compression: TileCompression,
	/// Stored as is, usually a JSON object.
	pub metadata: Blob,
	/// Upper bound for the encoded size of one leaf directory, before internal compression.
	pub max_leaf_bytes: usize,
}

impl BuilderOptions {
	pub fn new(tile_format: TileFormat, tile_compression: TileCompression) -> BuilderOptions {
		BuilderOptions {
			tile_format,
			tile_compression,
			internal_compression: TileCompression::Gzip,
			metadata: Blob::new_empty(),
			max_leaf_bytes: DEFAULT_MAX_LEAF_BYTES,
		}
	}
}

type ContentDigest = [u8; 32];

fn content_digest(blob: &Blob) -> ContentDigest {
	let mut digest = [0u8; 32];
	digest.copy_from_slice(&Sha256::digest(blob.as_slice()));
	digest
}

#[derive(Clone, Copy, Debug)]
struct SpooledTile {
	tile_id: u64,
	coord: TileCoord,
	spool_range: ByteRange,
	digest: ContentDigest,
}

/// Where every tile lands in the tile data region.
#[derive(Debug)]
struct Layout {
	entries: Vec<Entry>,
	/// Indices of the tiles whose bytes are written, one per distinct content.
	contents: Vec<usize>,
	tile_data_len: u64,
}

pub struct ArchiveBuilder {
	options: BuilderOptions,
	spool: BufWriter<File>,
	spool_len: u64,
	tiles: Vec<SpooledTile>,
}

/// Encoded root directory plus the concatenated leaf directories of every level.
#[derive(Debug)]
pub struct PackedDirectories {
	pub root: Blob,
	pub leaves: Blob,
	/// Number of leaf levels below the root, `0` if every entry fits the root.
	pub leaf_levels: usize,
}

impl ArchiveBuilder {
	/// # Errors
	/// Fails if `max_leaf_bytes` is below [`MIN_LEAF_BYTES`] or the spool file cannot be created.
	pub fn new(options: BuilderOptions) -> Result<ArchiveBuilder> {
		ensure!(
			options.max_leaf_bytes >= MIN_LEAF_BYTES,
			"max leaf size of {} bytes is below the minimum of {MIN_LEAF_BYTES} bytes",
			options.max_leaf_bytes
		);
		let spool = tempfile::tempfile().context("creating the tile spool file")?;
		Ok(ArchiveBuilder {
			options,
			spool: BufWriter::new(spool),
			spool_len: 0,
			tiles: Vec::new(),
		})
	}

	pub fn options(&self) -> &BuilderOptions {
		&self.options
	}

	/// Spools a tile. `blob` must already be encoded with the declared tile compression.
	pub fn add_tile(&mut self, coord: TileCoord, blob: &Blob) -> Result<()> {
		self.spool.write_all(blob.as_slice()).context("spooling tile")?;
		self.tiles.push(SpooledTile {
			tile_id: coord.tile_id(),
			coord,
			spool_range: ByteRange::new(self.spool_len, blob.len()),
			digest: content_digest(blob),
		});
		self.spool_len += blob.len();
		Ok(())
	}

	pub fn len(&self) -> usize {
		self.tiles.len()
	}

	pub fn is_empty(&self) -> bool {
		self.tiles.is_empty()
	}

	/// Writes the archive atomically: bytes go to a temporary file next to `path`,
	/// which replaces `path` only after everything succeeded.
	pub fn write_to_path(self, path: &Path) -> Result<()> {
		let directory = match path.parent() {
			Some(parent) if !parent.as_os_str().is_empty() => parent,
			_ => Path::new("."),
		};
		let temp = tempfile::NamedTempFile::new_in(directory)
			.with_context(|| format!("creating a temporary file in {directory:?}"))?;

		let mut writer = DataWriterFile::from_file(temp.as_file().try_clone()?);
		self.write_to_writer(&mut writer)?;
		writer.finish()?;

		temp.persist(path).with_context(|| format!("moving the archive to {path:?}"))?;
		log::debug!("wrote archive {path:?}");
		Ok(())
	}

	/// Writes `header | root | leaves | metadata | tile data` to a fresh writer.
	pub fn write_to_writer(self, writer: &mut dyn DataWriterTrait) -> Result<()> {
		let ArchiveBuilder {
			options,
			spool,
			mut tiles,
			..
		} = self;
		let mut spool = spool.into_inner().map_err(|e| e.into_error())?;

		tiles.sort_by_key(|tile| tile.tile_id);
		if let Some((_, duplicate)) = tiles.iter().tuple_windows().find(|(a, b)| a.tile_id == b.tile_id) {
			return Err(anyhow::Error::new(ArchiveError::DuplicateTile {
				tile_id: duplicate.tile_id,
				coord: duplicate.coord,
			}));
		}

		let Layout {
			entries,
			contents,
			tile_data_len,
		} = layout_entries(tiles.iter().map(|t| (t.tile_id, t.spool_range.length, &t.digest)))?;
		log::debug!(
			"laying out {} tiles with {} distinct contents in {} entries, {tile_data_len} bytes of tile data",
			tiles.len(),
			contents.len(),
			entries.len()
		);

		let packed = pack_directories(&entries, options.internal_compression, options.max_leaf_bytes)?;
		let metadata = compress(options.metadata.clone(), options.internal_compression)?;

		let mut header = HeaderV3::new(
			options.tile_format,
			options.tile_compression,
			options.internal_compression,
		);
		header.root_dir = ByteRange::new(HEADER_LEN, packed.root.len());
		header.leaf_dirs = ByteRange::new(header.root_dir.end(), packed.leaves.len());
		header.metadata = ByteRange::new(header.leaf_dirs.end(), metadata.len());
		ensure!(
			header.metadata.end().checked_add(tile_data_len).is_some(),
			too_large("tile data ends beyond 64 bits")
		);
		header.tile_data = ByteRange::new(header.metadata.end(), tile_data_len);

		header.addressed_tiles_count = tiles.len() as u64;
		header.tile_entries_count = entries.len() as u64;
		header.tile_contents_count = contents.len() as u64;
		header.clustered = true;
		set_extent(&mut header, &tiles);

		writer.append(&header.serialize()?)?;
		writer.append(&packed.root)?;
		writer.append(&packed.leaves)?;
		writer.append(&metadata)?;

		let mut position = None;
		let mut buffer = Vec::new();
		for &index in &contents {
			let range = tiles[index].spool_range;
			if position != Some(range.offset) {
				spool.seek(SeekFrom::Start(range.offset))?;
			}
			buffer.resize(range.length as usize, 0);
			spool.read_exact(&mut buffer).context("reading spooled tile")?;
			position = Some(range.end());
			writer.append(&Blob::from(buffer.as_slice()))?;
		}

		let end = writer.get_position()?;
		ensure!(
			end == header.tile_data.end(),
			"wrote {end} bytes, but the header announces {}",
			header.tile_data.end()
		);
		Ok(())
	}
}

/// Assigns tile data offsets in the given order, storing each distinct content once, and
/// coalesces consecutive tile ids with identical content into runs.
///
/// `tiles` yields `(tile id, length, digest)`, sorted by tile id without duplicates.
fn layout_entries<'a>(tiles: impl Iterator<Item = (u64, u64, &'a ContentDigest)>) -> Result<Layout> {
	let mut entries: Vec<Entry> = Vec::new();
	let mut contents = Vec::new();
	let mut stored: HashMap<&ContentDigest, ByteRange> = HashMap::new();
	let mut offset: u64 = 0;

	for (index, (tile_id, length, digest)) in tiles.enumerate() {
		let range = if let Some(range) = stored.get(digest) {
			*range
		} else {
			let range = ByteRange::new(offset, length);
			offset = offset
				.checked_add(length)
				.ok_or_else(|| too_large("tile data exceeds 64 bits"))?;
			stored.insert(digest, range);
			contents.push(index);
			range
		};

		if let Some(last) = entries.last_mut() {
			let continues_run =
				last.tile_id + u64::from(last.run_length) == tile_id && last.range == range && last.run_length < u32::MAX;
			if continues_run {
				last.run_length += 1;
				continue;
			}
		}
		entries.push(Entry::new(tile_id, range, 1));
	}

	Ok(Layout {
		entries,
		contents,
		tile_data_len: offset,
	})
}

/// Packs `entries` into a root directory that fits [`ROOT_DIRECTORY_BUDGET`] after
/// compression, adding levels of leaf directories of at most `max_leaf_bytes` until it does.
pub fn pack_directories(
	entries: &[Entry],
	compression: TileCompression,
	max_leaf_bytes: usize,
) -> Result<PackedDirectories> {
	let root = compress(serialize_entries(entries)?, compression)?;
	if root.len() <= ROOT_DIRECTORY_BUDGET {
		return Ok(PackedDirectories {
			root,
			leaves: Blob::new_empty(),
			leaf_levels: 0,
		});
	}

	let mut leaves: Vec<u8> = Vec::new();
	let mut level = entries.to_vec();
	let mut leaf_levels = 0;

	loop {
		let pointers = pack_leaf_level(&level, compression, max_leaf_bytes, &mut leaves)?;
		leaf_levels += 1;
		log::debug!(
			"leaf level {leaf_levels}: {} entries in {} leaves",
			level.len(),
			pointers.len()
		);

		if pointers.len() >= level.len() {
			return Err(too_large(format!(
				"{} entries do not shrink into fewer leaves of {max_leaf_bytes} bytes",
				level.len()
			)));
		}

		let root = compress(serialize_entries(&pointers)?, compression)?;
		if root.len() <= ROOT_DIRECTORY_BUDGET {
			return Ok(PackedDirectories {
				root,
				leaves: Blob::from(leaves),
				leaf_levels,
			});
		}
		level = pointers;
	}
}

/// Greedily splits `entries` into leaves whose encoded size stays within `max_leaf_bytes`,
/// appends the compressed leaves to `leaves` and returns one pointer per leaf.
fn pack_leaf_level(
	entries: &[Entry],
	compression: TileCompression,
	max_leaf_bytes: usize,
	leaves: &mut Vec<u8>,
) -> Result<Vec<Entry>> {
	let mut pointers = Vec::new();
	let mut start = 0;
	let mut body = 0;

	for index in 0..entries.len() {
		let previous = (index > start).then(|| &entries[index - 1]);
		let size = encoded_entry_size(&entries[index], previous);
		let count = index - start + 1;
		if count > 1 && varint_size(count as u64) + body + size > max_leaf_bytes {
			pointers.push(write_leaf(&entries[start..index], compression, leaves)?);
			start = index;
			body = encoded_entry_size(&entries[index], None);
		} else {
			body += size;
		}
	}
	if start < entries.len() {
		pointers.push(write_leaf(&entries[start..], compression, leaves)?);
	}

	Ok(pointers)
}

fn write_leaf(entries: &[Entry], compression: TileCompression, leaves: &mut Vec<u8>) -> Result<Entry> {
	let blob = compress(serialize_entries(entries)?, compression)?;
	let pointer = Entry::new_pointer(entries[0].tile_id, ByteRange::new(leaves.len() as u64, blob.len()));
	leaves.extend_from_slice(blob.as_slice());
	Ok(pointer)
}

fn set_extent(header: &mut HeaderV3, tiles: &[SpooledTile]) {
	let (Some(first), Some(last)) = (tiles.first(), tiles.last()) else {
		return;
	};
	// sorted by tile id, so also by level
	header.min_zoom = first.coord.level;
	header.max_zoom = last.coord.level;

	let mut bbox: GeoBBox = first.coord.to_geo_bbox();
	for tile in &tiles[1..] {
		bbox.extend(&tile.coord.to_geo_bbox());
	}
	bbox.limit_to_mercator();
	header.set_bbox(&bbox);

	let [lon, lat] = bbox.center();
	header.set_center(lon, lat, header.min_zoom);
}

fn too_large(message: impl Into<String>) -> anyhow::Error {
	anyhow::Error::new(ArchiveError::ArchiveTooLarge(message.into()))
}
