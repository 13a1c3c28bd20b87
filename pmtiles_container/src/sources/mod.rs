//! Build sources: MBTiles files, tile directories and existing archives.
//!
//! ```rust,no_run
//! use pmtiles_container::{ConvertOptions, convert_to_path, open_source};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let source = open_source("berlin.mbtiles").await?;
//!     convert_to_path(source.as_ref(), &ConvertOptions::default(), Path::new("berlin.pmtiles")).await?;
//!     Ok(())
//! }
//! ```

mod archive_source;
mod directory;
mod mbtiles;
mod traits;

pub use archive_source::*;
pub use directory::*;
pub use mbtiles::*;
pub use traits::*;

use crate::{ArchiveBuilder, ArchiveReader, BuilderOptions, DEFAULT_MAX_LEAF_BYTES, DirectoryCache};
use anyhow::{Context, Result, ensure};
use pmtiles_core::{MAX_LEVEL, TileCompression, io::open_data_reader};
use std::{path::Path, sync::Arc};

/// Opens a build source, chosen by the shape of `location`:
/// a directory, an `*.mbtiles` file, or anything else as an archive (local or remote).
pub async fn open_source(location: &str) -> Result<Box<dyn TileSourceTrait>> {
	let is_remote = location.starts_with("http://") || location.starts_with("https://");
	if !is_remote {
		let path = std::env::current_dir()?.join(location.strip_prefix("file://").unwrap_or(location));
		if path.is_dir() {
			return Ok(Box::new(DirectorySource::open_path(&path)?));
		}
		if path.extension().is_some_and(|e| e.eq_ignore_ascii_case("mbtiles")) {
			return Ok(Box::new(MBTilesSource::open_path(&path)?));
		}
	}

	let reader = ArchiveReader::open(open_data_reader(location)?, Arc::new(DirectoryCache::new(0))).await?;
	Ok(Box::new(ArchiveSource::new(reader).await?))
}

#[derive(Clone, Debug)]
pub struct ConvertOptions {
	pub internal_compression: TileCompression,
	pub max_leaf_bytes: usize,
	pub min_zoom: u8,
	pub max_zoom: u8,
}

impl Default for ConvertOptions {
	fn default() -> Self {
		ConvertOptions {
			internal_compression: TileCompression::Gzip,
			max_leaf_bytes: DEFAULT_MAX_LEAF_BYTES,
			min_zoom: 0,
			max_zoom: MAX_LEVEL,
		}
	}
}

/// Feeds every tile of `source` within the zoom range into a new builder.
pub async fn convert(source: &dyn TileSourceTrait, options: &ConvertOptions) -> Result<ArchiveBuilder> {
	ensure!(
		options.min_zoom <= options.max_zoom,
		"min zoom ({}) must not exceed max zoom ({})",
		options.min_zoom,
		options.max_zoom
	);

	let mut builder = ArchiveBuilder::new(BuilderOptions {
		tile_format: source.tile_format(),
		tile_compression: source.tile_compression(),
		internal_compression: options.internal_compression,
		metadata: source.metadata().clone(),
		max_leaf_bytes: options.max_leaf_bytes,
	})?;

	let count = source
		.visit_tiles(options.min_zoom..=options.max_zoom, &mut |coord, blob| {
			builder.add_tile(coord, &blob)
		})
		.await
		.with_context(|| format!("reading tiles from '{}'", source.name()))?;
	log::debug!("collected {count} tiles from '{}'", source.name());

	Ok(builder)
}

pub async fn convert_to_path(source: &dyn TileSourceTrait, options: &ConvertOptions, path: &Path) -> Result<()> {
	let builder = convert(source, options).await?;
	let count = builder.len();
	builder.write_to_path(path)?;
	log::info!("wrote {count} tiles to {path:?}");
	Ok(())
}
