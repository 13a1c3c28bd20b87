//! Archive engine: reading, building and extracting single-file tile archives.
//!
//! An archive is laid out as `header | root directory | leaf directories | metadata | tile data`.
//! Any tile is located by walking at most a few directories, each fetched with one
//! byte-range request through a [`DataReader`](pmtiles_core::io::DataReader).
//!
//! # Quick start
//! ```rust
//! use pmtiles_container::*;
//! use pmtiles_core::{io::DataWriterBlob, *};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut builder = ArchiveBuilder::new(BuilderOptions::new(TileFormat::PNG, TileCompression::Uncompressed))?;
//!     builder.add_tile(TileCoord::new(0, 0, 0)?, &Blob::from("A"))?;
//!
//!     let mut writer = DataWriterBlob::new();
//!     builder.write_to_writer(&mut writer)?;
//!
//!     let cache = Arc::new(DirectoryCache::new(1 << 20));
//!     let reader = ArchiveReader::open(Box::new(writer.into_reader()), cache).await?;
//!     let tile = reader.get_tile(&TileCoord::new(0, 0, 0)?).await?;
//!     assert_eq!(tile.unwrap().as_str(), "A");
//!     Ok(())
//! }
//! ```
//!
//! # Features
//! - `cli`: clap value enums for compression and format options.

mod archive;
pub use archive::*;

mod sources;
pub use sources::*;
