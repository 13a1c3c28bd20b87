//! This module defines the `TileFormat` enum, the payload types an archive can hold,
//! together with their file extensions and MIME types.
//!
//! # Examples
//!
//! ```rust
//! use pmtiles_core::TileFormat;
//!
//! assert_eq!(TileFormat::PNG.as_extension(), ".png");
//!
//! let mut filename = String::from("map.pbf");
//! assert_eq!(TileFormat::from_filename(&mut filename), Some(TileFormat::MVT));
//! assert_eq!(filename, "map");
//!
//! assert_eq!(TileFormat::parse_str("JPEG").unwrap(), TileFormat::JPG);
//! ```

use anyhow::{Result, bail};
#[cfg(feature = "cli")]
use clap::ValueEnum;
use std::fmt::{Display, Formatter};

/// `BIN` stands for payloads of unknown type.
#[allow(clippy::upper_case_acronyms)]
#[cfg_attr(feature = "cli", derive(ValueEnum))]
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TileFormat {
	AVIF,
	BIN,
	JPG,
	MVT,
	PNG,
	WEBP,
}

impl TileFormat {
	pub fn as_str(&self) -> &str {
		match self {
			TileFormat::AVIF => "avif",
			TileFormat::BIN => "bin",
			TileFormat::JPG => "jpg",
			TileFormat::MVT => "mvt",
			TileFormat::PNG => "png",
			TileFormat::WEBP => "webp",
		}
	}

	/// MIME type for the HTTP `Content-Type` header.
	pub fn as_mime_str(&self) -> &str {
		match self {
			TileFormat::AVIF => "image/avif",
			TileFormat::BIN => "application/octet-stream",
			TileFormat::JPG => "image/jpeg",
			TileFormat::MVT => "application/x-protobuf",
			TileFormat::PNG => "image/png",
			TileFormat::WEBP => "image/webp",
		}
	}

	/// Canonical file extension, with a leading dot.
	pub fn as_extension(&self) -> &str {
		match self {
			TileFormat::AVIF => ".avif",
			TileFormat::BIN => ".bin",
			TileFormat::JPG => ".jpg",
			TileFormat::MVT => ".pbf",
			TileFormat::PNG => ".png",
			TileFormat::WEBP => ".webp",
		}
	}

	/// Whether a request path extension (without the dot) addresses this format.
	///
	/// ```
	/// use pmtiles_core::TileFormat;
	///
	/// assert!(TileFormat::MVT.accepts_extension("mvt"));
	/// assert!(TileFormat::MVT.accepts_extension("pbf"));
	/// assert!(TileFormat::JPG.accepts_extension("jpeg"));
	/// assert!(!TileFormat::PNG.accepts_extension("webp"));
	/// ```
	pub fn accepts_extension(&self, extension: &str) -> bool {
		TileFormat::parse_str(extension).is_ok_and(|format| format == *self)
	}

	/// Extracts a format from the extension of `filename` and truncates that extension.
	pub fn from_filename(filename: &mut String) -> Option<Self> {
		let index = filename.rfind('.')?;
		let format = TileFormat::parse_str(&filename[index..]).ok()?;
		filename.truncate(index);
		Some(format)
	}

	/// Parses a format name or extension, ignoring case, leading dots and whitespace.
	pub fn parse_str(value: &str) -> Result<Self> {
		Ok(match value.trim().trim_start_matches('.').to_lowercase().as_str() {
			"avif" => TileFormat::AVIF,
			"bin" => TileFormat::BIN,
			"jpeg" | "jpg" => TileFormat::JPG,
			"pbf" | "mvt" => TileFormat::MVT,
			"png" => TileFormat::PNG,
			"webp" => TileFormat::WEBP,
			_ => bail!("Unknown tile format: '{}'", value.trim()),
		})
	}
}

impl Display for TileFormat {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}
