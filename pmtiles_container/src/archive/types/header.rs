use super::{ArchiveCompression, ArchiveTileType};
use anyhow::Result;
use pmtiles_core::{
	ArchiveError, Blob, ByteRange, GeoBBox, TileCompression, TileFormat,
	io::{ValueReader, ValueReaderSlice, ValueWriter, ValueWriterBlob},
};

/// Size of the fixed header at the start of every archive.
pub const HEADER_LEN: u64 = 127;

const MAGIC: &[u8; 7] = b"PMTiles";
const VERSION: u8 = 3;

#[derive(Clone, Debug, PartialEq)]
pub struct HeaderV3 {
	pub root_dir: ByteRange,
	pub metadata: ByteRange,
	pub leaf_dirs: ByteRange,
	pub tile_data: ByteRange,
	pub addressed_tiles_count: u64,
	pub tile_entries_count: u64,
	pub tile_contents_count: u64,
	pub clustered: bool,
	pub internal_compression: ArchiveCompression,
	pub tile_compression: ArchiveCompression,
	pub tile_type: ArchiveTileType,
	pub min_zoom: u8,
	pub max_zoom: u8,
	pub min_lon_e7: i32,
	pub min_lat_e7: i32,
	pub max_lon_e7: i32,
	pub max_lat_e7: i32,
	pub center_zoom: u8,
	pub center_lon_e7: i32,
	pub center_lat_e7: i32,
}

impl HeaderV3 {
	/// A header with empty regions and no extent.
	pub fn new(
		tile_format: TileFormat,
		tile_compression: TileCompression,
		internal_compression: TileCompression,
	) -> HeaderV3 {
		HeaderV3 {
			root_dir: ByteRange::empty(),
			metadata: ByteRange::empty(),
			leaf_dirs: ByteRange::empty(),
			tile_data: ByteRange::empty(),
			addressed_tiles_count: 0,
			tile_entries_count: 0,
			tile_contents_count: 0,
			clustered: false,
			internal_compression: ArchiveCompression::from_value(internal_compression),
			tile_compression: ArchiveCompression::from_value(tile_compression),
			tile_type: ArchiveTileType::from_value(tile_format),
			min_zoom: 0,
			max_zoom: 0,
			min_lon_e7: 0,
			min_lat_e7: 0,
			max_lon_e7: 0,
			max_lat_e7: 0,
			center_zoom: 0,
			center_lon_e7: 0,
			center_lat_e7: 0,
		}
	}

	pub fn set_bbox(&mut self, bbox: &GeoBBox) {
		self.min_lon_e7 = to_e7(bbox.x_min);
		self.min_lat_e7 = to_e7(bbox.y_min);
		self.max_lon_e7 = to_e7(bbox.x_max);
		self.max_lat_e7 = to_e7(bbox.y_max);
	}

	/// `[west, south, east, north]` in degrees.
	pub fn bbox(&self) -> [f64; 4] {
		[
			from_e7(self.min_lon_e7),
			from_e7(self.min_lat_e7),
			from_e7(self.max_lon_e7),
			from_e7(self.max_lat_e7),
		]
	}

	pub fn set_center(&mut self, lon: f64, lat: f64, zoom: u8) {
		self.center_lon_e7 = to_e7(lon);
		self.center_lat_e7 = to_e7(lat);
		self.center_zoom = zoom;
	}

	/// `[lon, lat]` in degrees.
	pub fn center(&self) -> [f64; 2] {
		[from_e7(self.center_lon_e7), from_e7(self.center_lat_e7)]
	}

	pub fn serialize(&self) -> Result<Blob> {
		let mut writer = ValueWriterBlob::new_le();
		writer.write_slice(MAGIC)?;
		writer.write_u8(VERSION)?;

		for range in [self.root_dir, self.metadata, self.leaf_dirs, self.tile_data] {
			writer.write_u64(range.offset)?;
			writer.write_u64(range.length)?;
		}
		writer.write_u64(self.addressed_tiles_count)?;
		writer.write_u64(self.tile_entries_count)?;
		writer.write_u64(self.tile_contents_count)?;

		writer.write_u8(u8::from(self.clustered))?;
		writer.write_u8(self.internal_compression as u8)?;
		writer.write_u8(self.tile_compression as u8)?;
		writer.write_u8(self.tile_type as u8)?;
		writer.write_u8(self.min_zoom)?;
		writer.write_u8(self.max_zoom)?;
		writer.write_i32(self.min_lon_e7)?;
		writer.write_i32(self.min_lat_e7)?;
		writer.write_i32(self.max_lon_e7)?;
		writer.write_i32(self.max_lat_e7)?;
		writer.write_u8(self.center_zoom)?;
		writer.write_i32(self.center_lon_e7)?;
		writer.write_i32(self.center_lat_e7)?;

		Ok(writer.into_blob())
	}

	/// Parses and validates a header.
	///
	/// # Errors
	/// [`ArchiveError::CorruptDirectory`] for a wrong length, magic or version, unknown enum
	/// values, and regions that reach into the header, overflow or overlap each other.
	pub fn deserialize(blob: &Blob) -> Result<Self> {
		let buffer = blob.as_slice();

		if buffer.len() as u64 != HEADER_LEN {
			return Err(corrupt(format!("header has {} bytes, expected {HEADER_LEN}", buffer.len())));
		}
		if &buffer[0..7] != MAGIC {
			return Err(corrupt("missing 'PMTiles' magic"));
		}
		if buffer[7] != VERSION {
			return Err(corrupt(format!("unsupported version {}, expected {VERSION}", buffer[7])));
		}

		let mut reader = ValueReaderSlice::new_le(buffer);
		reader.set_position(8)?;

		let header = Self {
			root_dir: ByteRange::new(reader.read_u64()?, reader.read_u64()?),
			metadata: ByteRange::new(reader.read_u64()?, reader.read_u64()?),
			leaf_dirs: ByteRange::new(reader.read_u64()?, reader.read_u64()?),
			tile_data: ByteRange::new(reader.read_u64()?, reader.read_u64()?),
			addressed_tiles_count: reader.read_u64()?,
			tile_entries_count: reader.read_u64()?,
			tile_contents_count: reader.read_u64()?,
			clustered: reader.read_u8()? == 1,
			internal_compression: ArchiveCompression::from_u8(reader.read_u8()?).map_err(|e| corrupt(e.to_string()))?,
			tile_compression: ArchiveCompression::from_u8(reader.read_u8()?).map_err(|e| corrupt(e.to_string()))?,
			tile_type: ArchiveTileType::from_u8(reader.read_u8()?).map_err(|e| corrupt(e.to_string()))?,
			min_zoom: reader.read_u8()?,
			max_zoom: reader.read_u8()?,
			min_lon_e7: reader.read_i32()?,
			min_lat_e7: reader.read_i32()?,
			max_lon_e7: reader.read_i32()?,
			max_lat_e7: reader.read_i32()?,
			center_zoom: reader.read_u8()?,
			center_lon_e7: reader.read_i32()?,
			center_lat_e7: reader.read_i32()?,
		};

		header.check_regions()?;
		Ok(header)
	}

	fn regions(&self) -> [(&'static str, ByteRange); 4] {
		[
			("root directory", self.root_dir),
			("metadata", self.metadata),
			("leaf directories", self.leaf_dirs),
			("tile data", self.tile_data),
		]
	}

	fn check_regions(&self) -> Result<()> {
		if self.root_dir.length == 0 {
			return Err(corrupt("root directory region is empty"));
		}

		let regions = self.regions();
		for (name, range) in &regions {
			if range.offset.checked_add(range.length).is_none() {
				return Err(corrupt(format!("{name} region {range:?} overflows")));
			}
			if range.length > 0 && range.offset < HEADER_LEN {
				return Err(corrupt(format!("{name} region {range:?} starts inside the header")));
			}
		}

		for (i, (name_a, a)) in regions.iter().enumerate() {
			for (name_b, b) in &regions[i + 1..] {
				if a.length > 0 && b.length > 0 && a.overlaps(b) {
					return Err(corrupt(format!("{name_a} region {a:?} overlaps {name_b} region {b:?}")));
				}
			}
		}
		Ok(())
	}
}

fn to_e7(value: f64) -> i32 {
	(value * 1e7).round() as i32
}

fn from_e7(value: i32) -> f64 {
	f64::from(value) / 1e7
}

fn corrupt(message: impl Into<String>) -> anyhow::Error {
	anyhow::Error::new(ArchiveError::CorruptDirectory(message.into()))
}
