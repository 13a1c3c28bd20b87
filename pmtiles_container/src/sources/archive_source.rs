use super::{TileSourceTrait, TileVisitor};
use crate::ArchiveReader;
use anyhow::Result;
use async_trait::async_trait;
use pmtiles_core::{Blob, TileCompression, TileCoord, TileFormat};
use std::{fmt::Debug, ops::RangeInclusive};

/// An existing archive as a build source, e.g. to change its internal compression or leaf size.
pub struct ArchiveSource {
	reader: ArchiveReader,
	metadata: Blob,
}

impl ArchiveSource {
	pub async fn new(reader: ArchiveReader) -> Result<ArchiveSource> {
		let metadata = reader.get_metadata().await?;
		Ok(ArchiveSource { reader, metadata })
	}
}

#[async_trait]
impl TileSourceTrait for ArchiveSource {
	fn name(&self) -> &str {
		self.reader.name()
	}

	fn tile_format(&self) -> TileFormat {
		self.reader.tile_format()
	}

	fn tile_compression(&self) -> TileCompression {
		self.reader.tile_compression()
	}

	fn metadata(&self) -> &Blob {
		&self.metadata
	}

	async fn visit_tiles(&self, levels: RangeInclusive<u8>, visitor: &mut TileVisitor<'_>) -> Result<u64> {
		let mut count = 0;
		for entry in self.reader.walk_entries().await? {
			for (tile_id, range) in entry.tiles() {
				let coord = TileCoord::from_tile_id(tile_id)?;
				if !levels.contains(&coord.level) {
					continue;
				}
				visitor(coord, self.reader.read_tile_data(&range).await?)?;
				count += 1;
			}
		}
		Ok(count)
	}
}

impl Debug for ArchiveSource {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ArchiveSource").field("reader", &self.reader).finish()
	}
}
