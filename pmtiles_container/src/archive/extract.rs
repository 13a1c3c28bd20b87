//! Extracts a subpyramid (tiles up to a zoom level inside a bounding box) into a new archive.
//!
//! The source tree is walked depth first, matching tiles are copied as stored (no
//! recompression) and the result is rebuilt with the usual directory packing. Contiguous
//! source ranges are fetched together, at most [`MAX_COALESCED_READ`] bytes per request,
//! and content shared by several tiles is fetched once.

use super::{ArchiveBuilder, ArchiveReader, BuilderOptions};
use anyhow::{Context, Result};
use pmtiles_core::{ArchiveError, Blob, ByteRange, GeoBBox, MAX_LEVEL, TileBBox, TileCoord};
use std::path::Path;

pub const MAX_COALESCED_READ: u64 = 4 * 1024 * 1024;

/// The area to extract.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ExtractBBox {
	/// An inclusive tile range at a reference zoom. Tiles on other levels are selected when
	/// their footprint intersects the range.
	TileRange(TileBBox),
	/// A lon/lat box, converted to a tile range at the maximum zoom.
	GeoBBox(GeoBBox),
}

impl ExtractBBox {
	pub fn to_tile_bbox(&self, max_zoom: u8) -> Result<TileBBox> {
		match self {
			ExtractBBox::TileRange(bbox) => Ok(*bbox),
			ExtractBBox::GeoBBox(bbox) => TileBBox::from_geo(max_zoom, bbox),
		}
	}
}

/// A selected tile and its stored bytes, relative to the source's tile data region.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SelectedTile {
	pub coord: TileCoord,
	pub range: ByteRange,
}

/// All tiles of `reader` with `level <= max_zoom` inside `bbox`, in tile id order.
/// Zoom levels above [`MAX_LEVEL`] select everything up to it.
pub async fn select_subpyramid(reader: &ArchiveReader, max_zoom: u8, bbox: &TileBBox) -> Result<Vec<SelectedTile>> {
	let (_, last_id) = TileCoord::level_id_range(max_zoom.min(MAX_LEVEL));
	let mut selected = Vec::new();

	for entry in reader.walk_entries().await? {
		if entry.tile_id > last_id {
			break;
		}
		for (tile_id, range) in entry.tiles() {
			if tile_id > last_id {
				break;
			}
			let coord = TileCoord::from_tile_id(tile_id)?;
			if bbox.contains(&coord) {
				selected.push(SelectedTile { coord, range });
			}
		}
	}

	Ok(selected)
}

/// Copies the selected subpyramid into a builder configured like the source.
///
/// # Errors
/// [`ArchiveError::EmptySelection`] if no tile matches, storage errors while copying.
pub async fn extract_subpyramid(reader: &ArchiveReader, max_zoom: u8, bbox: &ExtractBBox) -> Result<ArchiveBuilder> {
	let max_zoom = max_zoom.min(MAX_LEVEL);
	let bbox = bbox.to_tile_bbox(max_zoom)?;
	let mut selected = select_subpyramid(reader, max_zoom, &bbox).await?;
	if selected.is_empty() {
		return Err(anyhow::Error::new(ArchiveError::EmptySelection { max_zoom, bbox }));
	}
	log::debug!(
		"extracting {} tiles up to zoom {max_zoom} within {bbox:?} from '{}'",
		selected.len(),
		reader.name()
	);

	let mut options = BuilderOptions::new(reader.tile_format(), reader.tile_compression());
	options.internal_compression = reader.internal_compression();
	options.metadata = reader.get_metadata().await?;
	let mut builder = ArchiveBuilder::new(options)?;

	// the builder sorts by tile id again, read in source order
	selected.sort_by_key(|t| (t.range.offset, t.range.length));
	for group in coalesce(&selected) {
		let first = group[0].range.offset;
		let length = group.iter().map(|t| t.range.end()).max().unwrap_or(first) - first;
		let blob = reader
			.read_tile_data(&ByteRange::new(first, length))
			.await
			.with_context(|| format!("copying {} tiles starting at {}", group.len(), group[0].coord))?;

		for tile in group {
			let start = (tile.range.offset - first) as usize;
			let end = start + tile.range.length as usize;
			builder.add_tile(tile.coord, &Blob::from(blob.range(start..end)))?;
		}
	}

	Ok(builder)
}

/// Extracts and writes the result to `path`.
pub async fn extract_subpyramid_to_path(
	reader: &ArchiveReader,
	max_zoom: u8,
	bbox: &ExtractBBox,
	path: &Path,
) -> Result<()> {
	let builder = extract_subpyramid(reader, max_zoom, bbox).await?;
	let count = builder.len();
	builder.write_to_path(path)?;
	log::info!("extracted {count} tiles into {path:?}");
	Ok(())
}

/// Splits tiles sorted by source offset into groups of byte-adjacent tiles of at most
/// [`MAX_COALESCED_READ`] bytes. Tiles sharing a range always stay in one group; a single
/// larger content forms its own group.
fn coalesce(tiles: &[SelectedTile]) -> Vec<&[SelectedTile]> {
	let mut groups = Vec::new();
	let mut start = 0;
	for index in 1..=tiles.len() {
		let split = match tiles.get(index) {
			None => true,
			Some(tile) => {
				let previous = &tiles[index - 1];
				tile.range != previous.range
					&& (tile.range.offset != previous.range.end()
						|| tile.range.end() - tiles[start].range.offset > MAX_COALESCED_READ)
			}
		};
		if split {
			groups.push(&tiles[start..index]);
			start = index;
		}
	}
	groups
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::DirectoryCache;
	use pmtiles_core::{
		TileCompression, TileFormat,
		io::{DataReaderBlob, DataWriterBlob},
	};
	use pretty_assertions::assert_eq;
	use std::sync::Arc;

	async fn archive(tiles: &[(u8, u32, u32, &str)]) -> Result<ArchiveReader> {
		let mut options = BuilderOptions::new(TileFormat::PNG, TileCompression::Uncompressed);
		options.metadata = Blob::from(r#"{"name":"abcd"}"#);
		let mut builder = ArchiveBuilder::new(options)?;
		for &(z, x, y, content) in tiles {
			builder.add_tile(TileCoord::new(z, x, y)?, &Blob::from(content))?;
		}
		reopen(builder).await
	}

	async fn reopen(builder: ArchiveBuilder) -> Result<ArchiveReader> {
		let mut writer = DataWriterBlob::new();
		builder.write_to_writer(&mut writer)?;
		ArchiveReader::open(
			Box::new(DataReaderBlob::from(writer.into_blob())),
			Arc::new(DirectoryCache::new(1 << 20)),
		)
		.await
	}

	async fn abcd() -> Result<ArchiveReader> {
		archive(&[(0, 0, 0, "A"), (1, 0, 0, "B"), (1, 1, 0, "C"), (1, 1, 1, "D")]).await
	}

	async fn contents(reader: &ArchiveReader) -> Result<Vec<String>> {
		let mut result = Vec::new();
		for entry in reader.walk_entries().await? {
			for (tile_id, _) in entry.tiles() {
				let coord = TileCoord::from_tile_id(tile_id)?;
				let tile = reader.get_tile(&coord).await?.unwrap();
				result.push(format!("{coord}:{}", tile.as_str()));
			}
		}
		Ok(result)
	}

	#[tokio::test]
	async fn max_zoom_zero_keeps_the_root() -> Result<()> {
		let source = abcd().await?;
		let bbox = ExtractBBox::TileRange(TileBBox::new_full(0)?);
		let extracted = reopen(extract_subpyramid(&source, 0, &bbox).await?).await?;

		assert_eq!(contents(&extracted).await?, vec!["0/0/0:A"]);
		assert_eq!((extracted.header().min_zoom, extracted.header().max_zoom), (0, 0));
		assert_eq!(extracted.get_metadata().await?.as_str(), r#"{"name":"abcd"}"#);
		Ok(())
	}

	#[tokio::test]
	async fn tile_range_selects_ancestors_and_matches() -> Result<()> {
		let source = abcd().await?;
		let bbox = ExtractBBox::TileRange(TileBBox::new(1, 1, 0, 1, 0)?);
		let extracted = reopen(extract_subpyramid(&source, 1, &bbox).await?).await?;
		assert_eq!(contents(&extracted).await?, vec!["0/0/0:A", "1/1/0:C"]);
		assert_eq!(extracted.tile_format(), TileFormat::PNG);
		Ok(())
	}

	#[tokio::test]
	async fn geo_bbox_converts_at_max_zoom() -> Result<()> {
		let source = abcd().await?;
		// south-east quadrant
		let bbox = ExtractBBox::GeoBBox(GeoBBox::new(10.0, -60.0, 170.0, -10.0)?);
		let selected = select_subpyramid(&source, 1, &bbox.to_tile_bbox(1)?).await?;
		let coords = selected.iter().map(|t| t.coord.to_string()).collect::<Vec<_>>();
		assert_eq!(coords, vec!["0/0/0", "1/1/1"]);
		Ok(())
	}

	#[tokio::test]
	async fn empty_selection_is_an_error() -> Result<()> {
		let source = archive(&[(1, 1, 1, "D")]).await?;
		let bbox = ExtractBBox::TileRange(TileBBox::new(1, 0, 0, 0, 0)?);
		let err = extract_subpyramid(&source, 1, &bbox).await.err().unwrap();
		assert!(matches!(
			ArchiveError::find(&err),
			Some(ArchiveError::EmptySelection { max_zoom: 1, .. })
		));
		Ok(())
	}

	#[tokio::test]
	async fn selection_is_contained_and_complete() -> Result<()> {
		let mut tiles = Vec::new();
		for z in 0..=4u8 {
			for x in 0..(1u32 << z) {
				for y in 0..(1u32 << z) {
					tiles.push((z, x, y));
				}
			}
		}
		let mut builder = ArchiveBuilder::new(BuilderOptions::new(TileFormat::MVT, TileCompression::Uncompressed))?;
		for &(z, x, y) in &tiles {
			builder.add_tile(TileCoord::new(z, x, y)?, &Blob::from(format!("{z}-{x}-{y}")))?;
		}
		let source = reopen(builder).await?;

		let bbox = TileBBox::new(3, 2, 1, 5, 4)?;
		let extracted = reopen(extract_subpyramid(&source, 3, &ExtractBBox::TileRange(bbox)).await?).await?;

		for &(z, x, y) in &tiles {
			let coord = TileCoord::new(z, x, y)?;
			let expected = (z <= 3 && bbox.contains(&coord)).then(|| format!("{z}-{x}-{y}"));
			let actual = extracted.get_tile(&coord).await?.map(|b| b.as_str().to_string());
			assert_eq!(actual, expected, "tile {coord}");
		}
		Ok(())
	}

	#[tokio::test]
	async fn shared_contents_stay_shared() -> Result<()> {
		let mut builder = ArchiveBuilder::new(BuilderOptions::new(TileFormat::PNG, TileCompression::Uncompressed))?;
		builder.add_tile(TileCoord::new(0, 0, 0)?, &Blob::from("A"))?;
		for x in 0..4 {
			for y in 0..4 {
				builder.add_tile(TileCoord::new(2, x, y)?, &Blob::from("sea"))?;
			}
		}
		let source = reopen(builder).await?;
		assert_eq!(source.walk_entries().await?.len(), 2);

		let bbox = TileBBox::new(2, 0, 0, 1, 1)?;
		let extracted = reopen(extract_subpyramid(&source, 2, &ExtractBBox::TileRange(bbox)).await?).await?;
		assert_eq!(extracted.header().addressed_tiles_count, 5);
		assert_eq!(extracted.header().tile_contents_count, 2);
		for x in 0..4 {
			for y in 0..4 {
				let coord = TileCoord::new(2, x, y)?;
				let expected = bbox.contains(&coord).then_some("sea");
				let actual = extracted.get_tile(&coord).await?;
				assert_eq!(actual.as_ref().map(|b| b.as_str()), expected, "tile {coord}");
			}
		}
		Ok(())
	}

	#[tokio::test]
	async fn zoom_beyond_the_deepest_level_keeps_everything() -> Result<()> {
		let source = abcd().await?;
		let bbox = ExtractBBox::TileRange(TileBBox::new_full(0)?);
		let extracted = reopen(extract_subpyramid(&source, u8::MAX, &bbox).await?).await?;
		assert_eq!(
			contents(&extracted).await?,
			vec!["0/0/0:A", "1/0/0:B", "1/1/1:D", "1/1/0:C"]
		);
		assert_eq!(extracted.header().max_zoom, 1);
		Ok(())
	}

	#[test]
	fn coalesce_splits_gaps_and_large_groups() {
		let tile = |offset, length| SelectedTile {
			coord: TileCoord::new(0, 0, 0).unwrap(),
			range: ByteRange::new(offset, length),
		};
		let mb = 1024 * 1024;
		let tiles = vec![
			tile(0, 10),
			tile(10, 10),
			tile(30, 10),
			tile(40, 3 * mb),
			tile(40 + 3 * mb, 2 * mb),
			tile(40 + 5 * mb, 5 * mb),
			tile(40 + 5 * mb, 5 * mb),
		];
		let sizes = coalesce(&tiles).iter().map(|g| g.len()).collect::<Vec<_>>();
		assert_eq!(sizes, vec![2, 2, 1, 2]);
		assert!(coalesce(&[]).is_empty());
	}
}
