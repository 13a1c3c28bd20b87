//! This module defines the `ValueReader` trait for decoding fixed-width integers and varints.

use anyhow::{Result, bail};
use byteorder::{ByteOrder, ReadBytesExt};
use std::io::{Read, Seek};

pub trait SeekRead: Seek + Read {}

pub trait ValueReader<'a, E: ByteOrder + 'a> {
	fn get_reader(&mut self) -> &mut dyn SeekRead;

	fn len(&self) -> u64;

	fn position(&mut self) -> u64;

	fn set_position(&mut self, position: u64) -> Result<()>;

	fn is_empty(&self) -> bool {
		self.len() == 0
	}

	fn remaining(&mut self) -> u64 {
		self.len() - self.position()
	}

	fn has_remaining(&mut self) -> bool {
		self.remaining() > 0
	}

	/// Reads an unsigned LEB128 varint. Encodings longer than ten bytes or
	/// exceeding 64 bits are rejected.
	fn read_varint(&mut self) -> Result<u64> {
		let mut value = 0;
		let mut shift = 0;
		loop {
			let byte = self.get_reader().read_u8()?;
			if shift == 63 && (byte & 0x7F) > 1 {
				bail!("Varint exceeds 64 bits");
			}
			value |= (u64::from(byte) & 0x7F) << shift;
			if byte & 0x80 == 0 {
				break;
			}
			shift += 7;
			if shift > 63 {
				bail!("Varint too long");
			}
		}
		Ok(value)
	}

	fn read_u8(&mut self) -> Result<u8> {
		Ok(self.get_reader().read_u8()?)
	}

	fn read_i32(&mut self) -> Result<i32> {
		Ok(self.get_reader().read_i32::<E>()?)
	}

	fn read_u64(&mut self) -> Result<u64> {
		Ok(self.get_reader().read_u64::<E>()?)
	}

	fn read_string(&mut self, length: u64) -> Result<String> {
		let mut vec = vec![0u8; length as usize];
		self.get_reader().read_exact(&mut vec)?;
		Ok(String::from_utf8(vec)?)
	}
}
