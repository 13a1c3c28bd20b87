//! This module defines the `TileCompression` enum: the content encodings a tile blob,
//! a directory or the metadata can be stored with.
//!
//! # Examples
//!
//! ```
//! use pmtiles_core::TileCompression;
//!
//! assert_eq!(TileCompression::Gzip.extension(), ".gz");
//! assert_eq!(TileCompression::Zstd.content_encoding(), Some("zstd"));
//!
//! let mut filename = String::from("0.pbf.br");
//! assert_eq!(TileCompression::from_filename(&mut filename), TileCompression::Brotli);
//! assert_eq!(filename, "0.pbf");
//! ```

use anyhow::{Result, bail};
#[cfg(feature = "cli")]
use clap::ValueEnum;
use enumset::{EnumSet, EnumSetType};
use std::fmt::Display;

#[cfg_attr(feature = "cli", derive(ValueEnum))]
#[derive(Debug, EnumSetType, PartialOrd, Ord)]
pub enum TileCompression {
	Uncompressed,
	Gzip,
	Brotli,
	Zstd,
}

impl TileCompression {
	pub fn as_str(&self) -> &str {
		match self {
			TileCompression::Uncompressed => "none",
			TileCompression::Gzip => "gzip",
			TileCompression::Brotli => "brotli",
			TileCompression::Zstd => "zstd",
		}
	}

	/// File suffix used by tile directories, e.g. `".gz"`.
	pub fn extension(&self) -> &str {
		match self {
			TileCompression::Uncompressed => "",
			TileCompression::Gzip => ".gz",
			TileCompression::Brotli => ".br",
			TileCompression::Zstd => ".zst",
		}
	}

	/// The HTTP `Content-Encoding` token, `None` for identity.
	pub fn content_encoding(&self) -> Option<&'static str> {
		match self {
			TileCompression::Uncompressed => None,
			TileCompression::Gzip => Some("gzip"),
			TileCompression::Brotli => Some("br"),
			TileCompression::Zstd => Some("zstd"),
		}
	}

	/// Determines the compression from a filename suffix and strips that suffix.
	pub fn from_filename(filename: &mut String) -> TileCompression {
		let compression = if filename.ends_with(".gz") {
			TileCompression::Gzip
		} else if filename.ends_with(".br") {
			TileCompression::Brotli
		} else if filename.ends_with(".zst") {
			TileCompression::Zstd
		} else {
			return TileCompression::Uncompressed;
		};
		filename.truncate(filename.len() - compression.extension().len());
		compression
	}

	pub fn parse_str(value: &str) -> Result<Self> {
		Ok(match value.to_lowercase().trim() {
			"br" | "brotli" => TileCompression::Brotli,
			"gz" | "gzip" => TileCompression::Gzip,
			"zst" | "zstd" => TileCompression::Zstd,
			"none" | "raw" => TileCompression::Uncompressed,
			_ => bail!("Unknown tile compression. Expected brotli, gzip, zstd or none"),
		})
	}

	/// Parses an `Accept-Encoding` header into the set of supported encodings.
	/// Identity is always accepted.
	///
	/// ```
	/// use pmtiles_core::TileCompression;
	///
	/// let set = TileCompression::from_accept_encoding("gzip, deflate, br;q=0.9");
	/// assert!(set.contains(TileCompression::Brotli));
	/// assert!(set.contains(TileCompression::Uncompressed));
	/// assert!(!set.contains(TileCompression::Zstd));
	/// ```
	pub fn from_accept_encoding(header: &str) -> EnumSet<TileCompression> {
		let mut set = EnumSet::only(TileCompression::Uncompressed);
		for token in header.to_lowercase().split(',') {
			let mut parts = token.split(';');
			let name = parts.next().unwrap_or_default().trim();
			let rejected = parts.any(|p| matches!(p.trim(), "q=0" | "q=0.0" | "q=0.00" | "q=0.000"));
			if rejected {
				continue;
			}
			match name {
				"gzip" => set.insert(TileCompression::Gzip),
				"br" => set.insert(TileCompression::Brotli),
				"zstd" => set.insert(TileCompression::Zstd),
				"*" => {
					set.insert_all(EnumSet::all());
					true
				}
				_ => false,
			};
		}
		set
	}
}

impl Display for TileCompression {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}
