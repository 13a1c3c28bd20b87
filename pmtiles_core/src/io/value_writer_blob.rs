//! This module provides the `ValueWriterBlob` struct for writing values into an in-memory blob.

use super::ValueWriter;
use crate::Blob;
use anyhow::Result;
use byteorder::{ByteOrder, LittleEndian};
use std::io::{Cursor, Write};
use std::marker::PhantomData;

pub struct ValueWriterBlob<E: ByteOrder> {
	_phantom: PhantomData<E>,
	cursor: Cursor<Vec<u8>>,
}

impl<E: ByteOrder> ValueWriterBlob<E> {
	pub fn new() -> ValueWriterBlob<E> {
		ValueWriterBlob {
			_phantom: PhantomData,
			cursor: Cursor::new(Vec::new()),
		}
	}

	pub fn into_blob(self) -> Blob {
		Blob::from(self.cursor.into_inner())
	}
}

impl ValueWriterBlob<LittleEndian> {
	pub fn new_le() -> ValueWriterBlob<LittleEndian> {
		ValueWriterBlob::new()
	}
}

impl<E: ByteOrder> Default for ValueWriterBlob<E> {
	fn default() -> Self {
		Self::new()
	}
}

impl<E: ByteOrder> ValueWriter<E> for ValueWriterBlob<E> {
	fn get_writer(&mut self) -> &mut dyn Write {
		&mut self.cursor
	}

	fn position(&mut self) -> Result<u64> {
		Ok(self.cursor.position())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::io::{ValueReader, ValueReaderSlice};

	#[test]
	fn varint_boundaries_read_back() -> Result<()> {
		let values = [0, 1, 127, 128, 16_383, 16_384, u64::from(u32::MAX), u64::MAX];
		let mut writer = ValueWriterBlob::new_le();
		for value in values {
			writer.write_varint(value)?;
		}
		let blob = writer.into_blob();
		let mut reader = ValueReaderSlice::new_le(blob.as_slice());
		for value in values {
			assert_eq!(reader.read_varint()?, value);
		}
		assert!(!reader.has_remaining());
		Ok(())
	}

	#[test]
	fn little_endian_layout() -> Result<()> {
		let mut writer = ValueWriterBlob::new_le();
		writer.write_u64(0x0102)?;
		writer.write_i32(-1)?;
		writer.write_u8(7)?;
		writer.write_slice(b"ab")?;
		assert_eq!(writer.position()?, 15);
		assert_eq!(
			writer.into_blob().as_hex(),
			"02 01 00 00 00 00 00 00 ff ff ff ff 07 61 62"
		);
		Ok(())
	}
}
