//! Writes archive bytes into memory.
//!
//! # Examples
//!
//! ```rust
//! use pmtiles_core::{io::{DataWriterBlob, DataWriterTrait}, Blob};
//! use anyhow::Result;
//!
//! fn main() -> Result<()> {
//!     let mut writer = DataWriterBlob::new();
//!     writer.append(&Blob::from(vec![1, 2, 3, 4]))?;
//!     writer.write_start(&Blob::from(vec![5, 6]))?;
//!     assert_eq!(writer.as_slice(), &[5, 6, 3, 4]);
//!     Ok(())
//! }
//! ```

use super::{DataReaderBlob, DataWriterTrait};
use crate::{Blob, ByteRange};
use anyhow::Result;
use std::io::{Cursor, Seek, SeekFrom, Write};

#[derive(Clone, Default)]
pub struct DataWriterBlob {
	writer: Cursor<Vec<u8>>,
}

impl DataWriterBlob {
	pub fn new() -> DataWriterBlob {
		DataWriterBlob::default()
	}

	pub fn as_slice(&self) -> &[u8] {
		self.writer.get_ref().as_slice()
	}

	pub fn into_blob(self) -> Blob {
		Blob::from(self.writer.into_inner())
	}

	pub fn into_reader(self) -> DataReaderBlob {
		DataReaderBlob::from(self.into_blob())
	}
}

impl DataWriterTrait for DataWriterBlob {
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

#[cfg(test)]
mod tests {
	use super::*;
	use crate::io::DataReaderTrait;

	#[test]
	fn append_returns_ranges() -> Result<()> {
		let mut writer = DataWriterBlob::new();
		assert_eq!(writer.append(&Blob::from(vec![1, 2, 3]))?, ByteRange::new(0, 3));
		assert_eq!(writer.append(&Blob::from(vec![4, 5]))?, ByteRange::new(3, 2));
		assert_eq!(writer.get_position()?, 5);
		Ok(())
	}

	#[test]
	fn write_start_keeps_position() -> Result<()> {
		let mut writer = DataWriterBlob::new();
		writer.append(&Blob::from(vec![0; 6]))?;
		writer.write_start(&Blob::from(vec![9, 9]))?;
		assert_eq!(writer.get_position()?, 6);
		writer.set_position(1)?;
		writer.append(&Blob::from(vec![7]))?;
		assert_eq!(writer.as_slice(), &[9, 7, 0, 0, 0, 0]);
		Ok(())
	}

	#[tokio::test]
	async fn into_reader() -> Result<()> {
		let mut writer = DataWriterBlob::new();
		writer.append(&Blob::from("PMTiles"))?;
		let reader = writer.into_reader();
		assert_eq!(reader.read_range(&ByteRange::new(2, 5)).await?.as_str(), "Tiles");
		Ok(())
	}
}
