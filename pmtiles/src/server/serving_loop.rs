//! Turns request paths into tile and metadata responses.
//!
//! Two path forms are understood:
//! - `/{name}/{z}/{x}/{y}.{ext}`: a tile of the archive `name`
//! - `/{name}/metadata`: the archive's metadata as JSON
//!
//! Everything else is answered with `400` before any archive is touched. All archives share
//! one [`DirectoryCache`], so hot directories of every archive compete for the same budget.

use anyhow::{Result, ensure};
use axum::http::{
	HeaderName, HeaderValue,
	header::{ACCESS_CONTROL_ALLOW_ORIGIN, CACHE_CONTROL, CONTENT_ENCODING, CONTENT_TYPE, VARY},
};
use enumset::EnumSet;
use pmtiles_container::{ArchiveReader, DirectoryCache};
use pmtiles_core::{ArchiveError, Blob, TileCompression, TileCoord, compression::decompress};
use std::{collections::BTreeMap, sync::Arc};

pub const CACHE_CONTROL_VALUE: &str = "public, max-age=86400";

/// Status, headers and body of one answered request.
#[derive(Debug, PartialEq)]
pub struct TileResponse {
	pub status: u16,
	pub headers: Vec<(HeaderName, String)>,
	pub body: Blob,
}

impl TileResponse {
	pub fn header(&self, name: &HeaderName) -> Option<&str> {
		self.headers.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
	}
}

enum Target {
	Tile(TileCoord),
	Metadata,
}

pub struct ServingLoop {
	archives: BTreeMap<String, ArchiveReader>,
	cache: Arc<DirectoryCache>,
	cors_origin: Option<String>,
}

impl ServingLoop {
	/// An empty loop with a shared directory cache of `cache_bytes`.
	pub fn new(cache_bytes: usize, cors_origin: Option<String>) -> Result<ServingLoop> {
		if let Some(origin) = &cors_origin {
			ensure!(
				HeaderValue::from_str(origin).is_ok(),
				"'{origin}' is not a valid Access-Control-Allow-Origin value"
			);
		}
		Ok(ServingLoop {
			archives: BTreeMap::new(),
			cache: Arc::new(DirectoryCache::new(cache_bytes)),
			cors_origin,
		})
	}

	/// The cache that readers passed to [`ServingLoop::add_archive`] should share.
	pub fn cache(&self) -> Arc<DirectoryCache> {
		self.cache.clone()
	}

	/// Opens the archive at `location` (path or URL) and serves it as `name`.
	pub async fn open_archive(&mut self, name: &str, location: &str) -> Result<()> {
		let reader = ArchiveReader::open_location(location, self.cache()).await?;
		self.add_archive(name, reader)
	}

	pub fn add_archive(&mut self, name: &str, reader: ArchiveReader) -> Result<()> {
		ensure!(
			!name.is_empty() && !name.contains('/'),
			"invalid archive name '{name}'"
		);
		ensure!(
			!self.archives.contains_key(name),
			"multiple archives with the name '{name}' are defined"
		);
		log::info!("add archive: name='{name}', source={reader:?}");
		self.archives.insert(name.to_string(), reader);
		Ok(())
	}

	/// `(url prefix, archive name)` of all archives, sorted by name.
	pub fn url_mapping(&self) -> Vec<(String, String)> {
		self
			.archives
			.iter()
			.map(|(name, reader)| (format!("/{name}/"), reader.name().to_string()))
			.collect()
	}

	/// Answers one request. Never fails: errors become `400` or `500` responses.
	///
	/// `accepted` is the set of encodings the client accepts; a tile stored with one of them
	/// is passed through with `Content-Encoding`, otherwise it is decompressed.
	pub async fn handle_request(&self, path: &str, accepted: EnumSet<TileCompression>) -> TileResponse {
		match self.respond(path, accepted).await {
			Ok(response) => response,
			Err(err) => match ArchiveError::find(&err) {
				Some(ArchiveError::MalformedRequest(_)) => {
					log::trace!("{err}");
					self.response(400, Blob::new_empty())
				}
				_ => {
					log::warn!("request '{path}' failed: {err:?}");
					let mut response = self.response(500, Blob::from(format!("{err:#}")));
					response
						.headers
						.push((CONTENT_TYPE, "text/plain; charset=utf-8".to_string()));
					response
				}
			},
		}
	}

	async fn respond(&self, path: &str, accepted: EnumSet<TileCompression>) -> Result<TileResponse> {
		let (reader, target) = self.parse_path(path)?;

		let coord = match target {
			Target::Metadata => {
				let mut response = self.response(200, reader.get_metadata().await?);
				response.headers.push((CONTENT_TYPE, "application/json".to_string()));
				return Ok(response);
			}
			Target::Tile(coord) => coord,
		};

		let Some(blob) = reader.get_tile_raw(&coord).await? else {
			log::trace!("tile {coord} not found in '{}'", reader.name());
			return Ok(self.response(204, Blob::new_empty()));
		};

		let compression = reader.tile_compression();
		let (blob, encoding) = if accepted.contains(compression) {
			(blob, compression.content_encoding())
		} else {
			(decompress(blob, compression)?, None)
		};

		let mut response = self.response(200, blob);
		response
			.headers
			.push((CONTENT_TYPE, reader.tile_format().as_mime_str().to_string()));
		if let Some(encoding) = encoding {
			response.headers.push((CONTENT_ENCODING, encoding.to_string()));
		}
		response.headers.push((VARY, "accept-encoding".to_string()));
		Ok(response)
	}

	fn parse_path(&self, path: &str) -> Result<(&ArchiveReader, Target)> {
		let malformed = |reason: String| anyhow::Error::new(ArchiveError::MalformedRequest(reason));

		let parts: Vec<&str> = path.trim_start_matches('/').split('/').collect();
		let reader = self
			.archives
			.get(parts[0])
			.ok_or_else(|| malformed(format!("unknown archive in '{path}'")))?;

		match parts.as_slice() {
			[_, "metadata"] => Ok((reader, Target::Metadata)),
			[_, z, x, file] => {
				let (y, extension) = file
					.split_once('.')
					.ok_or_else(|| malformed(format!("missing extension in '{path}'")))?;
				if !reader.tile_format().accepts_extension(extension) {
					return Err(malformed(format!(
						"extension '{extension}' does not match the tile format {} in '{path}'",
						reader.tile_format()
					)));
				}

				let number = |text: &str| {
					text
						.parse::<u32>()
						.map_err(|_| malformed(format!("'{text}' is not a tile coordinate in '{path}'")))
				};
				let level = u8::try_from(number(z)?).map_err(|_| malformed(format!("zoom {z} is out of range")))?;
				let coord = TileCoord::new(level, number(x)?, number(y)?).map_err(|e| malformed(format!("{e}")))?;
				Ok((reader, Target::Tile(coord)))
			}
			_ => Err(malformed(format!("'{path}' is neither a tile nor metadata path"))),
		}
	}

	/// A response carrying the headers every answer of this loop has.
	pub fn response(&self, status: u16, body: Blob) -> TileResponse {
		let mut headers = vec![(CACHE_CONTROL, CACHE_CONTROL_VALUE.to_string())];
		if let Some(origin) = &self.cors_origin {
			headers.push((ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone()));
		}
		TileResponse { status, headers, body }
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use pmtiles_container::{ArchiveBuilder, BuilderOptions};
	use pmtiles_core::{
		ByteRange, TileFormat,
		compression::compress,
		io::{DataReader, DataReaderBlob, DataReaderTrait, DataWriterBlob},
	};
	use pretty_assertions::assert_eq;
	use rstest::rstest;
	use std::sync::atomic::{AtomicBool, Ordering};

	/// An in-memory archive that can be switched to fail every read.
	#[derive(Debug)]
	struct FlakyReader {
		inner: DataReaderBlob,
		broken: Arc<AtomicBool>,
	}

	#[async_trait::async_trait]
	impl DataReaderTrait for FlakyReader {
		async fn read_range(&self, range: &ByteRange) -> Result<Blob> {
			if self.broken.load(Ordering::SeqCst) {
				let err = anyhow::anyhow!("connection reset");
				return Err(pmtiles_core::io::storage_fetch_error(self.get_name(), range, &err));
			}
			self.inner.read_range(range).await
		}
		fn get_name(&self) -> &str {
			"flaky"
		}
	}

	fn abcd(format: TileFormat, compression: TileCompression) -> Result<Blob> {
		let mut options = BuilderOptions::new(format, compression);
		options.metadata = Blob::from(r#"{"name":"abcd"}"#);
		let mut builder = ArchiveBuilder::new(options)?;
		for (z, x, y, text) in [(0, 0, 0, "A"), (1, 0, 0, "B"), (1, 1, 1, "C"), (2, 3, 3, "D")] {
			builder.add_tile(TileCoord::new(z, x, y)?, &compress(Blob::from(text), compression)?)?;
		}
		let mut writer = DataWriterBlob::new();
		builder.write_to_writer(&mut writer)?;
		Ok(writer.into_blob())
	}

	async fn serving(cors: Option<&str>) -> Result<(ServingLoop, Arc<AtomicBool>)> {
		let mut serving = ServingLoop::new(1 << 20, cors.map(str::to_string))?;

		let broken = Arc::new(AtomicBool::new(false));
		let reader: DataReader = Box::new(FlakyReader {
			inner: DataReaderBlob::from(abcd(TileFormat::MVT, TileCompression::Gzip)?),
			broken: broken.clone(),
		});
		serving.add_archive("vector", ArchiveReader::open(reader, serving.cache()).await?)?;

		let reader: DataReader = Box::new(DataReaderBlob::from(abcd(TileFormat::PNG, TileCompression::Uncompressed)?));
		serving.add_archive("raster", ArchiveReader::open(reader, serving.cache()).await?)?;

		Ok((serving, broken))
	}

	#[rstest]
	#[case("/raster/0/0/0.jpg")]
	#[case("/raster/0/0/0")]
	#[case("/raster/0/0/a.png")]
	#[case("/raster/1/2/0.png")]
	#[case("/raster/40/0/0.png")]
	#[case("/raster/300/0/0.png")]
	#[case("/raster/0/0.png")]
	#[case("/raster/0/0/0/0.png")]
	#[case("/satellite/0/0/0.png")]
	#[case("/raster/tiles.json")]
	#[case("/")]
	#[case("")]
	#[tokio::test]
	async fn malformed_paths(#[case] path: &str) -> Result<()> {
		let (serving, _) = serving(None).await?;
		let response = serving.handle_request(path, EnumSet::all()).await;
		assert_eq!(response.status, 400, "{path}");
		assert!(response.body.is_empty());
		assert_eq!(response.header(&CACHE_CONTROL), Some(CACHE_CONTROL_VALUE));
		Ok(())
	}

	#[tokio::test]
	async fn tiles_and_absent_tiles() -> Result<()> {
		let (serving, _) = serving(None).await?;

		let response = serving.handle_request("/raster/0/0/0.png", EnumSet::all()).await;
		assert_eq!(response.status, 200);
		assert_eq!(response.body.as_str(), "A");
		assert_eq!(response.header(&CONTENT_TYPE), Some("image/png"));
		assert_eq!(response.header(&CONTENT_ENCODING), None);
		assert_eq!(response.header(&ACCESS_CONTROL_ALLOW_ORIGIN), None);

		let response = serving.handle_request("/raster/2/3/3.png", EnumSet::all()).await;
		assert_eq!(response.body.as_str(), "D");

		let response = serving.handle_request("/raster/1/0/1.png", EnumSet::all()).await;
		assert_eq!(response.status, 204);
		assert!(response.body.is_empty());
		assert_eq!(response.header(&CACHE_CONTROL), Some(CACHE_CONTROL_VALUE));
		Ok(())
	}

	#[tokio::test]
	async fn stored_compression_is_passed_through_when_accepted() -> Result<()> {
		let (serving, _) = serving(None).await?;

		let accepted = TileCompression::from_accept_encoding("gzip, br");
		let response = serving.handle_request("/vector/1/1/1.pbf", accepted).await;
		assert_eq!(response.status, 200);
		assert_eq!(response.header(&CONTENT_TYPE), Some("application/x-protobuf"));
		assert_eq!(response.header(&CONTENT_ENCODING), Some("gzip"));
		assert_eq!(decompress(response.body, TileCompression::Gzip)?.as_str(), "C");

		let accepted = TileCompression::from_accept_encoding("br");
		let response = serving.handle_request("/vector/1/1/1.mvt", accepted).await;
		assert_eq!(response.status, 200);
		assert_eq!(response.header(&CONTENT_ENCODING), None);
		assert_eq!(response.body.as_str(), "C");
		Ok(())
	}

	#[tokio::test]
	async fn metadata_and_cors() -> Result<()> {
		let (serving, _) = serving(Some("https://example.org")).await?;

		let response = serving.handle_request("/vector/metadata", EnumSet::empty()).await;
		assert_eq!(response.status, 200);
		assert_eq!(response.body.as_str(), r#"{"name":"abcd"}"#);
		assert_eq!(response.header(&CONTENT_TYPE), Some("application/json"));
		assert_eq!(
			response.header(&ACCESS_CONTROL_ALLOW_ORIGIN),
			Some("https://example.org")
		);

		let response = serving.handle_request("/nothing/here", EnumSet::empty()).await;
		assert_eq!(response.status, 400);
		assert_eq!(
			response.header(&ACCESS_CONTROL_ALLOW_ORIGIN),
			Some("https://example.org")
		);
		Ok(())
	}

	#[tokio::test]
	async fn storage_failures_become_500_and_recover() -> Result<()> {
		let (serving, broken) = serving(None).await?;

		broken.store(true, Ordering::SeqCst);
		let response = serving.handle_request("/vector/0/0/0.pbf", EnumSet::all()).await;
		assert_eq!(response.status, 500);
		assert!(response.body.as_str().contains("connection reset"));
		assert_eq!(response.header(&CONTENT_TYPE), Some("text/plain; charset=utf-8"));

		let response = serving.handle_request("/raster/0/0/0.png", EnumSet::all()).await;
		assert_eq!(response.status, 200);

		broken.store(false, Ordering::SeqCst);
		let response = serving.handle_request("/vector/0/0/0.pbf", EnumSet::empty()).await;
		assert_eq!(response.status, 200);
		assert_eq!(response.body.as_str(), "A");
		Ok(())
	}

	#[tokio::test]
	async fn archives_share_one_cache() -> Result<()> {
		let (serving, _) = serving(None).await?;
		serving.handle_request("/vector/0/0/0.pbf", EnumSet::all()).await;
		serving.handle_request("/raster/0/0/0.png", EnumSet::all()).await;
		assert_eq!(serving.cache().stats().entries, 2);
		Ok(())
	}

	#[tokio::test]
	async fn names_must_be_unique() -> Result<()> {
		let (mut serving, _) = serving(None).await?;
		let reader: DataReader = Box::new(DataReaderBlob::from(abcd(TileFormat::PNG, TileCompression::Uncompressed)?));
		let reader = ArchiveReader::open(reader, serving.cache()).await?;
		assert_eq!(
			serving.add_archive("raster", reader).unwrap_err().to_string(),
			"multiple archives with the name 'raster' are defined"
		);
		assert_eq!(
			serving.url_mapping(),
			vec![
				("/raster/".to_string(), "memory".to_string()),
				("/vector/".to_string(), "flaky".to_string())
			]
		);
		Ok(())
	}

	#[test]
	fn invalid_cors_origin() {
		assert!(ServingLoop::new(0, Some("bad\norigin".to_string())).is_err());
	}
}
