//! Reads tiles from a directory tree laid out as `{z}/{x}/{y}.{ext}[.gz|.br|.zst]`.
//!
//! All tiles must share one format and one compression. A `metadata.json`, `tiles.json`
//! or `meta.json` next to the level directories becomes the metadata; several of them
//! are merged.

use super::{TileSourceTrait, TileVisitor};
use anyhow::{Context, Result, bail, ensure};
use async_trait::async_trait;
use itertools::Itertools;
use pmtiles_core::{Blob, TileCompression, TileCoord, TileFormat, compression::decompress};
use serde_json::{Map, Value};
use std::{
	fmt::Debug,
	fs,
	ops::RangeInclusive,
	path::{Path, PathBuf},
};

pub struct DirectorySource {
	name: String,
	tiles: Vec<(TileCoord, PathBuf)>,
	tile_format: TileFormat,
	tile_compression: TileCompression,
	metadata: Blob,
}

impl DirectorySource {
	pub fn open_path(dir: &Path) -> Result<DirectorySource> {
		log::debug!("open {dir:?}");

		ensure!(dir.is_absolute(), "path {dir:?} must be absolute");
		ensure!(dir.is_dir(), "path {dir:?} is not a directory");

		let mut tiles = Vec::new();
		let mut format: Option<(TileFormat, TileCompression)> = None;
		let mut metadata = Map::new();

		for entry1 in fs::read_dir(dir)?.flatten().sorted_by_key(|e| e.file_name()) {
			let name1 = entry1.file_name().to_string_lossy().to_string();
			let Ok(level) = name1.parse::<u8>() else {
				if let Some(object) = read_metadata_file(&entry1.path(), &name1)? {
					metadata.extend(object);
				}
				continue;
			};

			for entry2 in fs::read_dir(entry1.path())?.flatten() {
				let Ok(x) = entry2.file_name().to_string_lossy().parse::<u32>() else {
					continue;
				};

				for entry3 in fs::read_dir(entry2.path())?.flatten() {
					let mut filename = entry3.file_name().to_string_lossy().to_string();
					let compression = TileCompression::from_filename(&mut filename);
					let Some(tile_format) = TileFormat::from_filename(&mut filename) else {
						continue;
					};
					let Ok(y) = filename.parse::<u32>() else {
						continue;
					};

					match format {
						None => format = Some((tile_format, compression)),
						Some(expected) if expected != (tile_format, compression) => bail!(
							"found mixed tiles: {} {} and {} {}",
							expected.0,
							expected.1,
							tile_format,
							compression
						),
						Some(_) => {}
					}

					tiles.push((TileCoord::new(level, x, y)?, entry3.path()));
				}
			}
		}

		let Some((tile_format, tile_compression)) = format else {
			bail!("no tiles found in {dir:?}");
		};

		Ok(DirectorySource {
			name: dir.to_string_lossy().to_string(),
			tiles,
			tile_format,
			tile_compression,
			metadata: Blob::from(serde_json::to_string(&Value::Object(metadata))?),
		})
	}
}

fn read_metadata_file(path: &Path, name: &str) -> Result<Option<Map<String, Value>>> {
	let compression = match name {
		"meta.json" | "tiles.json" | "metadata.json" => TileCompression::Uncompressed,
		"meta.json.gz" | "tiles.json.gz" | "metadata.json.gz" => TileCompression::Gzip,
		"meta.json.br" | "tiles.json.br" | "metadata.json.br" => TileCompression::Brotli,
		_ => return Ok(None),
	};
	let blob = decompress(Blob::from(fs::read(path)?), compression)?;
	match serde_json::from_slice(blob.as_slice()).with_context(|| format!("parsing {path:?}"))? {
		Value::Object(object) => Ok(Some(object)),
		_ => bail!("{path:?} must contain a JSON object"),
	}
}

#[async_trait]
impl TileSourceTrait for DirectorySource {
	fn name(&self) -> &str {
		&self.name
	}

	fn tile_format(&self) -> TileFormat {
		self.tile_format
	}

	fn tile_compression(&self) -> TileCompression {
		self.tile_compression
	}

	fn metadata(&self) -> &Blob {
		&self.metadata
	}

	async fn visit_tiles(&self, levels: RangeInclusive<u8>, visitor: &mut TileVisitor<'_>) -> Result<u64> {
		let mut count = 0;
		for (coord, path) in &self.tiles {
			if !levels.contains(&coord.level) {
				continue;
			}
			let blob = Blob::from(fs::read(path).with_context(|| format!("reading tile {path:?}"))?);
			visitor(*coord, blob)?;
			count += 1;
		}
		Ok(count)
	}
}

impl Debug for DirectorySource {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DirectorySource")
			.field("name", &self.name)
			.field("tiles", &self.tiles.len())
			.field("tile_format", &self.tile_format)
			.field("tile_compression", &self.tile_compression)
			.finish()
	}
}
