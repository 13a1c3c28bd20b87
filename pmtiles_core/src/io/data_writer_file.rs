//! Writes archive bytes to a file on disk through a buffered writer.

use super::DataWriterTrait;
use crate::{Blob, ByteRange};
use anyhow::{Context, Result, ensure};
use std::{
	fs::File,
	io::{BufWriter, Seek, SeekFrom, Write},
	path::Path,
};

pub struct DataWriterFile {
	writer: BufWriter<File>,
}

impl DataWriterFile {
	/// Creates (or truncates) the file at an absolute `path`.
	pub fn from_path(path: &Path) -> Result<DataWriterFile> {
		ensure!(path.is_absolute(), "path {path:?} must be absolute");
		let file = File::create(path).with_context(|| format!("creating {path:?}"))?;
		Ok(DataWriterFile::from_file(file))
	}

	/// Wraps an already opened file, e.g. a temporary file.
	pub fn from_file(file: File) -> DataWriterFile {
		DataWriterFile {
			writer: BufWriter::new(file),
		}
	}

	/// Flushes buffered bytes and returns the underlying file.
	pub fn finish(self) -> Result<File> {
		let file = self.writer.into_inner().map_err(|e| e.into_error())?;
		file.sync_all()?;
		Ok(file)
	}
}

impl DataWriterTrait for DataWriterFile {
	fn append(&mut self, blob: &Blob) -> Result<ByteRange> {
		let pos = self.writer.stream_position()?;
		self.writer.write_all(blob.as_slice())?;
		Ok(ByteRange::new(pos, blob.len()))
	}

	fn write_start(&mut self, blob: &Blob) -> Result<()> {
		let pos = self.writer.stream_position()?;
		self.writer.rewind()?;
		self.writer.write_all(blob.as_slice())?;
		self.writer.seek(SeekFrom::Start(pos))?;
		Ok(())
	}

	fn get_position(&mut self) -> Result<u64> {
		Ok(self.writer.stream_position()?)
	}

	fn set_position(&mut self, position: u64) -> Result<()> {
		self.writer.seek(SeekFrom::Start(position))?;
		Ok(())
	}
}
