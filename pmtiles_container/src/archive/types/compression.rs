use anyhow::{Result, bail};
use pmtiles_core::TileCompression::{self, Brotli, Gzip, Uncompressed, Zstd};

/// Compression byte of the archive header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArchiveCompression {
	Unknown = 0x0,
	None = 0x1,
	Gzip = 0x2,
	Brotli = 0x3,
	Zstd = 0x4,
}

impl ArchiveCompression {
	pub fn from_u8(value: u8) -> Result<Self> {
		Ok(match value {
			0 => ArchiveCompression::Unknown,
			1 => ArchiveCompression::None,
			2 => ArchiveCompression::Gzip,
			3 => ArchiveCompression::Brotli,
			4 => ArchiveCompression::Zstd,
			_ => bail!("unknown compression value {value}"),
		})
	}

	pub fn from_value(value: TileCompression) -> Self {
		match value {
			Uncompressed => ArchiveCompression::None,
			Gzip => ArchiveCompression::Gzip,
			Brotli => ArchiveCompression::Brotli,
			Zstd => ArchiveCompression::Zstd,
		}
	}

	/// The codec to apply. `Unknown` cannot be decoded.
	pub fn as_value(&self) -> Result<TileCompression> {
		Ok(match self {
			ArchiveCompression::Unknown => bail!("compression is declared as unknown"),
			ArchiveCompression::None => Uncompressed,
			ArchiveCompression::Gzip => Gzip,
			ArchiveCompression::Brotli => Brotli,
			ArchiveCompression::Zstd => Zstd,
		})
	}
}
