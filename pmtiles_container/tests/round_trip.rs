//! Builds archives on disk and reads them back through the public API.

use anyhow::Result;
use assert_fs::{TempDir, prelude::*};
use pmtiles_container::*;
use pmtiles_core::*;
use pretty_assertions::assert_eq;
use std::{fs, path::Path, sync::Arc};

/// Every tile of levels 0..=max_level, with a payload naming the tile.
fn pyramid(max_level: u8) -> Vec<(TileCoord, Blob)> {
	let mut tiles = Vec::new();
	for level in 0..=max_level {
		for x in 0..(1u32 << level) {
			for y in 0..(1u32 << level) {
				let coord = TileCoord::new(level, x, y).unwrap();
				tiles.push((coord, Blob::from(format!("tile {coord}"))));
			}
		}
	}
	tiles
}

fn build(path: &Path, tiles: &[(TileCoord, Blob)], max_leaf_bytes: usize) -> Result<()> {
	let mut options = BuilderOptions::new(TileFormat::MVT, TileCompression::Uncompressed);
	options.metadata = Blob::from(r#"{"name":"pyramid"}"#);
	options.max_leaf_bytes = max_leaf_bytes;
	let mut builder = ArchiveBuilder::new(options)?;
	// reverse order, the builder sorts
	for (coord, blob) in tiles.iter().rev() {
		builder.add_tile(*coord, blob)?;
	}
	builder.write_to_path(path)
}

#[tokio::test]
async fn every_tile_round_trips_through_leaves() -> Result<()> {
	let dir = TempDir::new()?;
	let path = dir.path().join("pyramid.pmtiles");
	let tiles = pyramid(7);
	build(&path, &tiles, MIN_LEAF_BYTES)?;

	let reader = ArchiveReader::open_path(&path, Arc::new(DirectoryCache::new(1 << 20))).await?;
	assert!(reader.header().leaf_dirs.length > 0);
	assert_eq!(reader.header().addressed_tiles_count, tiles.len() as u64);
	assert_eq!(reader.header().max_zoom, 7);

	for (coord, blob) in &tiles {
		assert_eq!(reader.get_tile(coord).await?.as_ref(), Some(blob), "{coord}");
	}
	assert_eq!(reader.get_metadata().await?.as_str(), r#"{"name":"pyramid"}"#);

	let walked: u64 = reader.walk_entries().await?.iter().map(|e| u64::from(e.run_length)).sum();
	assert_eq!(walked, tiles.len() as u64);
	Ok(())
}

#[tokio::test]
async fn building_twice_gives_identical_files() -> Result<()> {
	let dir = TempDir::new()?;
	let tiles = pyramid(5);
	build(&dir.path().join("a.pmtiles"), &tiles, MIN_LEAF_BYTES)?;
	build(&dir.path().join("b.pmtiles"), &tiles, MIN_LEAF_BYTES)?;
	assert_eq!(
		fs::read(dir.path().join("a.pmtiles"))?,
		fs::read(dir.path().join("b.pmtiles"))?
	);
	Ok(())
}

#[tokio::test]
async fn extracted_subpyramid_keeps_exactly_the_selection() -> Result<()> {
	let dir = TempDir::new()?;
	let source_path = dir.path().join("pyramid.pmtiles");
	let tiles = pyramid(6);
	build(&source_path, &tiles, MIN_LEAF_BYTES)?;

	let cache = Arc::new(DirectoryCache::new(1 << 20));
	let source = ArchiveReader::open_path(&source_path, cache.clone()).await?;
	let bbox = TileBBox::new(4, 2, 3, 5, 9)?;
	let target_path = dir.path().join("extract.pmtiles");
	extract_subpyramid_to_path(&source, 5, &ExtractBBox::TileRange(bbox), &target_path).await?;

	let target = ArchiveReader::open_path(&target_path, cache).await?;
	assert_eq!(target.header().max_zoom, 5);
	assert_eq!(target.get_metadata().await?.as_str(), r#"{"name":"pyramid"}"#);
	for (coord, blob) in &tiles {
		let expected = (coord.level <= 5 && bbox.contains(coord)).then_some(blob);
		assert_eq!(target.get_tile(coord).await?.as_ref(), expected, "{coord}");
	}
	Ok(())
}

#[tokio::test]
async fn directory_source_to_archive() -> Result<()> {
	let dir = TempDir::new()?;
	dir.child("tiles/0/0/0.png").write_binary(b"A")?;
	dir.child("tiles/1/0/0.png").write_binary(b"B")?;
	dir.child("tiles/1/1/1.png").write_binary(b"C")?;
	dir.child("tiles/2/3/3.png").write_binary(b"D")?;
	dir.child("tiles/tiles.json").write_str(r#"{"name":"abcd"}"#)?;

	let source = open_source(dir.path().join("tiles").to_str().unwrap()).await?;
	let path = dir.path().join("abcd.pmtiles");
	convert_to_path(source.as_ref(), &ConvertOptions::default(), &path).await?;

	let reader = ArchiveReader::open_path(&path, Arc::new(DirectoryCache::new(1 << 20))).await?;
	assert_eq!(reader.tile_format(), TileFormat::PNG);
	assert_eq!(reader.get_tile(&TileCoord::new(0, 0, 0)?).await?.unwrap().as_str(), "A");
	assert_eq!(reader.get_tile(&TileCoord::new(1, 0, 1)?).await?, None);
	assert_eq!(reader.get_tile(&TileCoord::new(2, 3, 3)?).await?.unwrap().as_str(), "D");
	assert_eq!(reader.get_metadata().await?.as_str(), r#"{"name":"abcd"}"#);
	Ok(())
}

#[tokio::test]
async fn failed_builds_leave_no_file() -> Result<()> {
	let dir = TempDir::new()?;
	let path = dir.path().join("broken.pmtiles");
	let coord = TileCoord::new(3, 1, 1)?;
	let err = build(&path, &[(coord, Blob::from("a")), (coord, Blob::from("b"))], MIN_LEAF_BYTES).unwrap_err();
	assert!(matches!(
		ArchiveError::find(&err),
		Some(ArchiveError::DuplicateTile { .. })
	));
	assert!(!path.exists());
	assert_eq!(fs::read_dir(dir.path())?.count(), 0);
	Ok(())
}
