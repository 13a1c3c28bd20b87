use anyhow::{Result, bail};
use pmtiles_core::TileFormat;

/// Tile type byte of the archive header.
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArchiveTileType {
	UNKNOWN = 0x0,
	MVT = 0x1,
	PNG = 0x2,
	JPEG = 0x3,
	WEBP = 0x4,
	AVIF = 0x5,
}

impl ArchiveTileType {
	pub fn from_u8(value: u8) -> Result<Self> {
		Ok(match value {
			0 => ArchiveTileType::UNKNOWN,
			1 => ArchiveTileType::MVT,
			2 => ArchiveTileType::PNG,
			3 => ArchiveTileType::JPEG,
			4 => ArchiveTileType::WEBP,
			5 => ArchiveTileType::AVIF,
			_ => bail!("unknown tile type value {value}"),
		})
	}

	pub fn from_value(value: TileFormat) -> Self {
		match value {
			TileFormat::AVIF => ArchiveTileType::AVIF,
			TileFormat::BIN => ArchiveTileType::UNKNOWN,
			TileFormat::JPG => ArchiveTileType::JPEG,
			TileFormat::MVT => ArchiveTileType::MVT,
			TileFormat::PNG => ArchiveTileType::PNG,
			TileFormat::WEBP => ArchiveTileType::WEBP,
		}
	}

	pub fn as_value(&self) -> TileFormat {
		match self {
			ArchiveTileType::UNKNOWN => TileFormat::BIN,
			ArchiveTileType::MVT => TileFormat::MVT,
			ArchiveTileType::PNG => TileFormat::PNG,
			ArchiveTileType::JPEG => TileFormat::JPG,
			ArchiveTileType::WEBP => TileFormat::WEBP,
			ArchiveTileType::AVIF => TileFormat::AVIF,
		}
	}
}
