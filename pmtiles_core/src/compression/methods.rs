use crate::Blob;
use anyhow::{Context, Result};
use brotli::{BrotliCompress, BrotliDecompress, enc::BrotliEncoderParams};
use flate2::bufread::{GzDecoder, GzEncoder};
use std::io::{Cursor, Read};

pub fn compress_gzip(blob: &Blob) -> Result<Blob> {
	let mut encoder = GzEncoder::new(blob.as_slice(), flate2::Compression::best());
	let mut compressed_data = Vec::new();
	encoder
		.read_to_end(&mut compressed_data)
		.with_context(|| format!("compressing {} bytes using gzip", blob.len()))?;
	Ok(Blob::from(compressed_data))
}

pub fn decompress_gzip(blob: &Blob) -> Result<Blob> {
	let mut decoder = GzDecoder::new(blob.as_slice());
	let mut decompressed_data = Vec::new();
	decoder
		.read_to_end(&mut decompressed_data)
		.with_context(|| format!("decompressing {} bytes using gzip", blob.len()))?;
	Ok(Blob::from(decompressed_data))
}

pub fn compress_brotli(blob: &Blob) -> Result<Blob> {
	let params = BrotliEncoderParams {
		quality: 10,
		lgwin: 19,
		size_hint: blob.len() as usize,
		..Default::default()
	};
	let mut input = Cursor::new(blob.as_slice());
	let mut output = Vec::new();
	BrotliCompress(&mut input, &mut output, &params)
		.with_context(|| format!("compressing {} bytes using brotli", blob.len()))?;
	Ok(Blob::from(output))
}

pub fn decompress_brotli(blob: &Blob) -> Result<Blob> {
	let mut cursor = Cursor::new(blob.as_slice());
	let mut decompressed_data = Vec::new();
	BrotliDecompress(&mut cursor, &mut decompressed_data)
		.with_context(|| format!("decompressing {} bytes using brotli", blob.len()))?;
	Ok(Blob::from(decompressed_data))
}

pub fn compress_zstd(blob: &Blob) -> Result<Blob> {
	let compressed = zstd::encode_all(Cursor::new(blob.as_slice()), 19)
		.with_context(|| format!("compressing {} bytes using zstd", blob.len()))?;
	Ok(Blob::from(compressed))
}

pub fn decompress_zstd(blob: &Blob) -> Result<Blob> {
	let decompressed = zstd::decode_all(Cursor::new(blob.as_slice()))
		.with_context(|| format!("decompressing {} bytes using zstd", blob.len()))?;
	Ok(Blob::from(decompressed))
}
