//! This module defines the `ValueWriter` trait for encoding fixed-width integers and varints.
//!
//! # Examples
//!
//! ```rust
//! use pmtiles_core::io::{ValueWriter, ValueWriterBlob};
//! use anyhow::Result;
//!
//! fn main() -> Result<()> {
//!     let mut writer = ValueWriterBlob::new_le();
//!     writer.write_varint(300)?;
//!     assert_eq!(writer.into_blob().into_vec(), vec![0b10101100, 0b00000010]);
//!     Ok(())
//! }
//! ```

use crate::Blob;
use anyhow::Result;
use byteorder::{ByteOrder, WriteBytesExt};
use std::io::Write;

pub trait ValueWriter<E: ByteOrder> {
	fn get_writer(&mut self) -> &mut dyn Write;

	fn position(&mut self) -> Result<u64>;

	fn write_varint(&mut self, mut value: u64) -> Result<()> {
		while value >= 0x80 {
			self.get_writer().write_all(&[((value & 0x7F) as u8) | 0x80])?;
			value >>= 7;
		}
		self.get_writer().write_all(&[value as u8])?;
		Ok(())
	}

	fn write_u8(&mut self, value: u8) -> Result<()> {
		Ok(self.get_writer().write_u8(value)?)
	}

	fn write_i32(&mut self, value: i32) -> Result<()> {
		Ok(self.get_writer().write_i32::<E>(value)?)
	}

	fn write_u64(&mut self, value: u64) -> Result<()> {
		Ok(self.get_writer().write_u64::<E>(value)?)
	}

	fn write_blob(&mut self, blob: &Blob) -> Result<()> {
		self.get_writer().write_all(blob.as_slice())?;
		Ok(())
	}

	fn write_slice(&mut self, buf: &[u8]) -> Result<()> {
		self.get_writer().write_all(buf)?;
		Ok(())
	}
}
