use anyhow::Result;
use async_trait::async_trait;
use pmtiles_core::{Blob, TileCompression, TileCoord, TileFormat};
use std::{fmt::Debug, ops::RangeInclusive};

/// Receives every tile of a source, still encoded with the source's tile compression.
pub type TileVisitor<'a> = dyn FnMut(TileCoord, Blob) -> Result<()> + Send + 'a;

/// Anything an archive can be built from.
#[async_trait]
pub trait TileSourceTrait: Debug + Send + Sync {
	/// Name of the source, used in log and error messages.
	fn name(&self) -> &str;

	fn tile_format(&self) -> TileFormat;

	fn tile_compression(&self) -> TileCompression;

	/// Metadata as a JSON document.
	fn metadata(&self) -> &Blob;

	/// Hands every tile with a level inside `levels` to `visitor`, in no particular order.
	async fn visit_tiles(&self, levels: RangeInclusive<u8>, visitor: &mut TileVisitor<'_>) -> Result<u64>;
}
