//! This module defines the `DataReaderTrait`, the byte-range capability every archive is read through.
//!
//! # Overview
//!
//! Archives are never loaded as a whole. A reader only has to deliver arbitrary byte ranges of
//! one immutable resource. Local files, HTTP(S) endpoints (including object stores behind their
//! HTTPS interface) and in-memory blobs implement it. [`open_data_reader`] picks the backend for a
//! location once at startup.
//!
//! Every failure of `read_range` is reported as [`ArchiveError::StorageFetch`].
//!
//! # Examples
//!
//! ```rust
//! use pmtiles_core::{io::{DataReader, DataReaderBlob}, Blob, ByteRange};
//! use anyhow::Result;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let reader: DataReader = Box::new(DataReaderBlob::from(Blob::from(vec![1, 2, 3, 4, 5])));
//!     let partial = reader.read_range(&ByteRange::new(1, 3)).await?;
//!     assert_eq!(partial.as_slice(), &[2, 3, 4]);
//!     Ok(())
//! }
//! ```

use super::{DataReaderFile, DataReaderHttp};
use crate::{ArchiveError, Blob, ByteRange};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use std::{fmt::Debug, path::Path};

/// Type alias for a boxed dynamic implementation of the `DataReaderTrait`.
pub type DataReader = Box<dyn DataReaderTrait>;

#[async_trait]
pub trait DataReaderTrait: Debug + Send + Sync {
	/// Reads exactly `range.length` bytes starting at `range.offset`.
	async fn read_range(&self, range: &ByteRange) -> Result<Blob>;

	/// Name of the resource, used in log and error messages.
	fn get_name(&self) -> &str;
}

/// Wraps a backend failure into a typed [`ArchiveError::StorageFetch`].
pub fn storage_fetch_error(resource: &str, range: &ByteRange, err: &anyhow::Error) -> anyhow::Error {
	anyhow::Error::new(ArchiveError::StorageFetch {
		resource: resource.to_string(),
		range: *range,
		reason: format!("{err:#}"),
	})
}

/// Opens the backend matching the scheme of `location`.
///
/// * `http://…`, `https://…` → [`DataReaderHttp`]
/// * `file://…` or a plain path → [`DataReaderFile`]; relative paths resolve against the current directory.
pub fn open_data_reader(location: &str) -> Result<DataReader> {
	if location.starts_with("http://") || location.starts_with("https://") {
		let url = Url::parse(location).with_context(|| format!("parsing url '{location}'"))?;
		let reader: DataReader = DataReaderHttp::from_url(url)?;
		return Ok(reader);
	}

	let path = match location.strip_prefix("file://") {
		Some(rest) => Path::new(rest).to_path_buf(),
		None => Path::new(location).to_path_buf(),
	};
	let path = if path.is_absolute() {
		path
	} else {
		std::env::current_dir()?.join(path)
	};
	let reader: DataReader = DataReaderFile::open(&path)?;
	Ok(reader)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::assert_wildcard;
	use assert_fs::NamedTempFile;

	#[test]
	fn open_by_scheme() -> Result<()> {
		let file = NamedTempFile::new("archive.pmtiles")?;
		std::fs::write(file.path(), b"PMTiles")?;
		let location = file.path().to_str().unwrap();

		let reader = open_data_reader(location)?;
		assert_wildcard!(reader.get_name(), "*archive.pmtiles");

		let reader = open_data_reader(&format!("file://{location}"))?;
		assert_wildcard!(reader.get_name(), "*archive.pmtiles");

		let reader = open_data_reader("https://example.org/tiles/world.pmtiles")?;
		assert_eq!(reader.get_name(), "https://example.org/tiles/world.pmtiles");

		assert!(open_data_reader("/does/not/exist.pmtiles").is_err());
		Ok(())
	}

	#[test]
	fn storage_error_keeps_reason() {
		let inner = anyhow::anyhow!("disk on fire").context("reading block");
		let err = storage_fetch_error("a.pmtiles", &ByteRange::new(0, 127), &inner);
		assert_eq!(
			err.to_string(),
			"failed to fetch bytes 0+127 from 'a.pmtiles': reading block: disk on fire"
		);
		assert!(matches!(
			ArchiveError::find(&err),
			Some(ArchiveError::StorageFetch { .. })
		));
	}
}
