//! Reads tiles from an MBTiles (SQLite) file.
//!
//! Rows are stored in the TMS scheme and flipped to XYZ while reading. The `format` row
//! decides tile format and compression. All other metadata rows are collected into a
//! JSON object; a `json` row is parsed and merged into it.

use super::{TileSourceTrait, TileVisitor};
use anyhow::{Context, Result, anyhow, bail, ensure};
use async_trait::async_trait;
use pmtiles_core::{Blob, TileCompression, TileCoord, TileFormat};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use serde_json::{Map, Value};
use std::{fmt::Debug, ops::RangeInclusive, path::Path};

pub struct MBTilesSource {
	name: String,
	pool: Pool<SqliteConnectionManager>,
	tile_format: TileFormat,
	tile_compression: TileCompression,
	metadata: Blob,
}

impl MBTilesSource {
	pub fn open_path(path: &Path) -> Result<MBTilesSource> {
		log::debug!("open {path:?}");

		ensure!(path.exists(), "file {path:?} does not exist");
		ensure!(path.is_absolute(), "path {path:?} must be absolute");

		let manager = SqliteConnectionManager::file(path);
		let pool = Pool::builder()
			.max_size(4)
			.build(manager)
			.with_context(|| format!("opening SQLite {path:?}"))?;

		let name = path.to_string_lossy().to_string();
		let rows = read_metadata_rows(&pool).with_context(|| format!("reading metadata of '{name}'"))?;
		let (tile_format, tile_compression, metadata) =
			parse_metadata(rows).with_context(|| format!("parsing metadata of '{name}'"))?;

		Ok(MBTilesSource {
			name,
			pool,
			tile_format,
			tile_compression,
			metadata,
		})
	}
}

fn read_metadata_rows(pool: &Pool<SqliteConnectionManager>) -> Result<Vec<(String, String)>> {
	let conn = pool.get()?;
	let mut stmt = conn.prepare("SELECT name, value FROM metadata")?;
	let rows = stmt
		.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
		.collect::<Result<Vec<_>, _>>()?;
	Ok(rows)
}

fn parse_metadata(rows: Vec<(String, String)>) -> Result<(TileFormat, TileCompression, Blob)> {
	let mut format = None;
	let mut object = Map::new();
	let mut json_row = None;

	for (key, value) in rows {
		match key.as_str() {
			"format" => {
				format = Some(match value.as_str() {
					"pbf" | "mvt" => (TileFormat::MVT, TileCompression::Gzip),
					"png" => (TileFormat::PNG, TileCompression::Uncompressed),
					"jpg" | "jpeg" => (TileFormat::JPG, TileCompression::Uncompressed),
					"webp" => (TileFormat::WEBP, TileCompression::Uncompressed),
					"avif" => (TileFormat::AVIF, TileCompression::Uncompressed),
					other => bail!("unknown tile format '{other}'"),
				});
				object.insert(key, Value::String(value));
			}
			"json" => json_row = Some(value),
			"minzoom" | "maxzoom" => {
				let zoom = value.trim().parse::<u8>().with_context(|| format!("parsing {key} '{value}'"))?;
				object.insert(key, Value::from(zoom));
			}
			"bounds" | "center" => {
				let numbers = value
					.split(',')
					.map(|s| s.trim().parse::<f64>())
					.collect::<Result<Vec<f64>, _>>()
					.with_context(|| format!("parsing {key} '{value}'"))?;
				object.insert(key, Value::from(numbers));
			}
			_ => {
				object.insert(key, Value::String(value));
			}
		}
	}

	if let Some(json) = json_row {
		let parsed: Value = serde_json::from_str(&json).context("parsing the 'json' metadata row")?;
		let Value::Object(entries) = parsed else {
			bail!("the 'json' metadata row must be a JSON object");
		};
		object.extend(entries);
	}

	let (tile_format, tile_compression) = format.ok_or_else(|| anyhow!("metadata does not specify the tile format"))?;
	let metadata = Blob::from(serde_json::to_string(&Value::Object(object))?);
	Ok((tile_format, tile_compression, metadata))
}

#[async_trait]
impl TileSourceTrait for MBTilesSource {
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
		log::debug!("reading tiles of '{}' for levels {levels:?}", self.name);

		let conn = self.pool.get()?;
		let mut stmt = conn.prepare(
			"SELECT zoom_level, tile_column, tile_row, tile_data FROM tiles WHERE zoom_level >= ? AND zoom_level <= ?",
		)?;
		let mut rows = stmt.query([u32::from(*levels.start()), u32::from(*levels.end())])?;

		let mut count = 0;
		while let Some(row) = rows.next()? {
			let level = u8::try_from(row.get::<_, i64>(0)?)?;
			let x = u32::try_from(row.get::<_, i64>(1)?)?;
			let y = u32::try_from(row.get::<_, i64>(2)?)?;
			let mut coord = TileCoord::new(level, x, y).with_context(|| format!("tile row {level}/{x}/{y}"))?;
			coord.flip_y();

			visitor(coord, Blob::from(row.get::<_, Vec<u8>>(3)?))?;
			count += 1;
		}

		log::trace!("read {count} tiles");
		Ok(count)
	}
}

impl Debug for MBTilesSource {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("MBTilesSource")
			.field("name", &self.name)
			.field("tile_format", &self.tile_format)
			.field("tile_compression", &self.tile_compression)
			.finish()
	}
}

#[cfg(test)]
pub mod tests {
	use super::*;
	use assert_fs::TempDir;
	use pretty_assertions::assert_eq;
	use r2d2_sqlite::rusqlite::{Connection, params};
	use std::path::PathBuf;

	/// Writes a small MBTiles file with three tiles in TMS rows.
	pub fn make_mbtiles(dir: &TempDir, format: &str) -> Result<PathBuf> {
		let path = dir.path().join("test.mbtiles");
		let conn = Connection::open(&path)?;
		conn.execute_batch(
			"CREATE TABLE metadata (name TEXT, value TEXT);
			CREATE TABLE tiles (zoom_level INTEGER, tile_column INTEGER, tile_row INTEGER, tile_data BLOB);",
		)?;
		for (name, value) in [
			("name", "test"),
			("format", format),
			("minzoom", "0"),
			("maxzoom", "1"),
			("bounds", "-180,-85,180,85"),
			("json", r#"{"vector_layers":[{"id":"water"}]}"#),
		] {
			conn.execute("INSERT INTO metadata VALUES (?1, ?2)", params![name, value])?;
		}
		for (z, x, row, data) in [(0, 0, 0, "root"), (1, 0, 1, "north-west"), (1, 1, 0, "south-east")] {
			conn.execute(
				"INSERT INTO tiles VALUES (?1, ?2, ?3, ?4)",
				params![z, x, row, data.as_bytes()],
			)?;
		}
		Ok(path)
	}

	#[tokio::test]
	async fn reads_tiles_and_metadata() -> Result<()> {
		let dir = TempDir::new()?;
		let source = MBTilesSource::open_path(&make_mbtiles(&dir, "png")?)?;

		assert_eq!(source.tile_format(), TileFormat::PNG);
		assert_eq!(source.tile_compression(), TileCompression::Uncompressed);

		let metadata: Value = serde_json::from_slice(source.metadata().as_slice())?;
		assert_eq!(metadata["name"], "test");
		assert_eq!(metadata["maxzoom"], 1);
		assert_eq!(metadata["bounds"], serde_json::json!([-180.0, -85.0, 180.0, 85.0]));
		assert_eq!(metadata["vector_layers"][0]["id"], "water");

		let mut tiles = Vec::new();
		let count = source
			.visit_tiles(0..=31, &mut |coord, blob| {
				tiles.push(format!("{coord}:{}", blob.as_str()));
				Ok(())
			})
			.await?;
		tiles.sort();
		assert_eq!(count, 3);
		assert_eq!(tiles, vec!["0/0/0:root", "1/0/0:north-west", "1/1/1:south-east"]);
		Ok(())
	}

	#[tokio::test]
	async fn level_filter() -> Result<()> {
		let dir = TempDir::new()?;
		let source = MBTilesSource::open_path(&make_mbtiles(&dir, "pbf")?)?;
		assert_eq!(source.tile_format(), TileFormat::MVT);
		assert_eq!(source.tile_compression(), TileCompression::Gzip);

		let count = source.visit_tiles(1..=1, &mut |_, _| Ok(())).await?;
		assert_eq!(count, 2);
		Ok(())
	}

	#[test]
	fn unknown_format_is_rejected() -> Result<()> {
		let dir = TempDir::new()?;
		let err = MBTilesSource::open_path(&make_mbtiles(&dir, "tiff")?).unwrap_err();
		assert_eq!(format!("{err:#}").split(": ").last(), Some("unknown tile format 'tiff'"));
		Ok(())
	}
}
