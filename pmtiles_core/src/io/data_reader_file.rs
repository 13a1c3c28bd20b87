//! This module provides functionality for reading byte ranges from local files.
//!
//! The file handle is opened once. Reads from concurrent requests are serialized on the
//! handle so that seek and read stay paired.
//!
//! # Examples
//!
//! ```rust
//! use pmtiles_core::{io::{DataReaderFile, DataReaderTrait}, ByteRange};
//! use anyhow::Result;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let path = std::env::current_dir()?.join("Cargo.toml");
//!     let reader = DataReaderFile::open(&path)?;
//!     let head = reader.read_range(&ByteRange::new(0, 9)).await?;
//!     assert_eq!(head.as_str(), "[package]");
//!     Ok(())
//! }
//! ```

use super::{DataReaderTrait, storage_fetch_error};
use crate::{Blob, ByteRange};
use anyhow::{Context, Result, ensure};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::{
	fs::File,
	io::{Read, Seek, SeekFrom},
	path::Path,
};

#[derive(Debug)]
pub struct DataReaderFile {
	name: String,
	file: Mutex<File>,
	size: u64,
}

impl DataReaderFile {
	/// Opens an existing file given by an absolute path.
	pub fn open(path: &Path) -> Result<Box<DataReaderFile>> {
		ensure!(path.exists(), "file {path:?} does not exist");
		ensure!(path.is_absolute(), "path {path:?} must be absolute");
		ensure!(path.is_file(), "path {path:?} must be a file");

		let path = path.canonicalize()?;
		let file = File::open(&path).with_context(|| format!("opening {path:?}"))?;
		let size = file.metadata()?.len();

		Ok(Box::new(DataReaderFile {
			name: path.to_string_lossy().into_owned(),
			file: Mutex::new(file),
			size,
		}))
	}

	pub fn size(&self) -> u64 {
		self.size
	}

	fn read_exact_at(&self, range: &ByteRange) -> Result<Blob> {
		ensure!(
			range.end() <= self.size,
			"range ends at {} but the file has only {} bytes",
			range.end(),
			self.size
		);
		let mut buffer = vec![0; range.length as usize];
		let mut file = self.file.lock();
		file
			.seek(SeekFrom::Start(range.offset))
			.with_context(|| format!("failed to seek to offset {}", range.offset))?;
		file
			.read_exact(&mut buffer)
			.with_context(|| format!("failed to read {} bytes at offset {}", range.length, range.offset))?;
		Ok(Blob::from(buffer))
	}
}

#[async_trait]
impl DataReaderTrait for DataReaderFile {
	async fn read_range(&self, range: &ByteRange) -> Result<Blob> {
		self
			.read_exact_at(range)
			.map_err(|e| storage_fetch_error(&self.name, range, &e))
	}

	fn get_name(&self) -> &str {
		&self.name
	}
}
