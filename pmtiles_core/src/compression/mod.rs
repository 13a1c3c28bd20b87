//! Compression and decompression of tiles, directories and metadata.
//!
//! ```rust
//! use pmtiles_core::{Blob, TileCompression, compression::{compress, decompress}};
//!
//! let data = Blob::from("{\"name\":\"berlin\"}");
//! let packed = compress(data.clone(), TileCompression::Gzip)?;
//! assert_eq!(decompress(packed, TileCompression::Gzip)?, data);
//! # Ok::<(), anyhow::Error>(())
//! ```

mod methods;

use crate::{Blob, TileCompression};
use anyhow::Result;
pub use methods::*;

/// Compresses `blob` with the given method.
pub fn compress(blob: Blob, compression: TileCompression) -> Result<Blob> {
	match compression {
		TileCompression::Uncompressed => Ok(blob),
		TileCompression::Gzip => compress_gzip(&blob),
		TileCompression::Brotli => compress_brotli(&blob),
		TileCompression::Zstd => compress_zstd(&blob),
	}
}

/// Reverses [`compress`].
pub fn decompress(blob: Blob, compression: TileCompression) -> Result<Blob> {
	match compression {
		TileCompression::Uncompressed => Ok(blob),
		TileCompression::Gzip => decompress_gzip(&blob),
		TileCompression::Brotli => decompress_brotli(&blob),
		TileCompression::Zstd => decompress_zstd(&blob),
	}
}

/// Re-encodes a blob stored with `from` so that it is stored with `to`.
pub fn recompress(blob: Blob, from: TileCompression, to: TileCompression) -> Result<Blob> {
	if from == to {
		return Ok(blob);
	}
	compress(decompress(blob, from)?, to)
}

#[cfg(test)]
mod tests {
	use super::*;
	use enumset::EnumSet;

	fn generate_test_data(size: usize) -> Blob {
		let mut rng: u32 = 0x1234_5678;
		let data = (0..size)
			.map(|i| {
				rng = rng.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
				if i % 3 == 0 { (rng >> 24) as u8 } else { b'a' + (i % 7) as u8 }
			})
			.collect::<Vec<u8>>();
		Blob::from(data)
	}

	#[test]
	fn every_method_restores_input() -> Result<()> {
		let data = generate_test_data(10_000);
		for compression in EnumSet::<TileCompression>::all() {
			let packed = compress(data.clone(), compression)?;
			if compression != TileCompression::Uncompressed {
				assert!(packed.len() < data.len(), "{compression} did not shrink the data");
			}
			assert_eq!(decompress(packed, compression)?, data, "{compression} failed");
		}
		Ok(())
	}

	#[test]
	fn output_is_deterministic() -> Result<()> {
		let data = generate_test_data(5_000);
		for compression in EnumSet::<TileCompression>::all() {
			assert_eq!(
				compress(data.clone(), compression)?,
				compress(data.clone(), compression)?
			);
		}
		Ok(())
	}

	#[test]
	fn recompress_between_methods() -> Result<()> {
		let data = generate_test_data(1_000);
		let gzip = compress(data.clone(), TileCompression::Gzip)?;
		let brotli = recompress(gzip.clone(), TileCompression::Gzip, TileCompression::Brotli)?;
		assert_eq!(decompress_brotli(&brotli)?, data);
		assert_eq!(recompress(gzip.clone(), TileCompression::Gzip, TileCompression::Gzip)?, gzip);
		Ok(())
	}

	#[test]
	fn garbage_fails_to_decompress() {
		let garbage = Blob::from(vec![0x13, 0x37, 0xde, 0xad]);
		assert!(decompress(garbage.clone(), TileCompression::Gzip).is_err());
		assert!(decompress(garbage, TileCompression::Zstd).is_err());
	}
}
