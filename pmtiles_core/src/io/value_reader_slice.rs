//! This module provides the `ValueReaderSlice` struct for reading values from a byte slice.
//!
//! # Examples
//!
//! ```rust
//! use pmtiles_core::io::{ValueReader, ValueReaderSlice};
//! use anyhow::Result;
//!
//! fn main() -> Result<()> {
//!     let data = &[0x01, 0x02, 0xAC, 0x02];
//!     let mut reader = ValueReaderSlice::new_le(data);
//!     assert_eq!(reader.read_u8()?, 0x01);
//!     assert_eq!(reader.read_varint()?, 2);
//!     assert_eq!(reader.read_varint()?, 300);
//!     assert!(!reader.has_remaining());
//!     Ok(())
//! }
//! ```

use super::{SeekRead, ValueReader};
use anyhow::{Result, bail};
use byteorder::{ByteOrder, LittleEndian};
use std::{io::Cursor, marker::PhantomData};

pub struct ValueReaderSlice<'a, E: ByteOrder> {
	_phantom: PhantomData<E>,
	cursor: Cursor<&'a [u8]>,
	len: u64,
}

impl<'a, E: ByteOrder> ValueReaderSlice<'a, E> {
	#[must_use]
	pub fn new(slice: &'a [u8]) -> ValueReaderSlice<'a, E> {
		ValueReaderSlice {
			_phantom: PhantomData,
			len: slice.len() as u64,
			cursor: Cursor::new(slice),
		}
	}
}

impl<'a> ValueReaderSlice<'a, LittleEndian> {
	#[must_use]
	pub fn new_le(slice: &'a [u8]) -> ValueReaderSlice<'a, LittleEndian> {
		ValueReaderSlice::new(slice)
	}
}

impl SeekRead for Cursor<&[u8]> {}

impl<'a, E: ByteOrder + 'a> ValueReader<'a, E> for ValueReaderSlice<'a, E> {
	fn get_reader(&mut self) -> &mut dyn SeekRead {
		&mut self.cursor
	}

	fn len(&self) -> u64 {
		self.len
	}

	fn position(&mut self) -> u64 {
		self.cursor.position()
	}

	fn set_position(&mut self, position: u64) -> Result<()> {
		if position > self.len {
			bail!("set position outside length")
		}
		self.cursor.set_position(position);
		Ok(())
	}
}
