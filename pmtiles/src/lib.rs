//! # pmtiles
//!
//! Serving of single-file, cloud-optimized tile archives over HTTP, plus the YAML
//! configuration of the server. Reading, building and extracting archives lives in
//! [`container`]; byte-range I/O, tile coordinates and compression in [`core`].
//!
//! ```rust,no_run
//! use pmtiles::server::{ServingLoop, TileServer};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut serving = ServingLoop::new(64 * 1024 * 1024, Some("*".to_string()))?;
//!     serving.open_archive("berlin", "berlin.pmtiles").await?;
//!
//!     let mut server = TileServer::new("127.0.0.1", 8080, serving);
//!     server.start().await?;
//!     // GET /berlin/14/8800/5374.pbf, GET /berlin/metadata
//!     server.stop().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod server;

pub use pmtiles_container as container;
pub use pmtiles_core as core;
