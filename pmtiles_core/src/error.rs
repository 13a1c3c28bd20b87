use crate::{ByteRange, TileBBox, TileCoord};
use thiserror::Error;

/// Typed failures of archive building, reading and serving.
///
/// Functions return `anyhow::Result`; these values travel inside the `anyhow::Error`
/// and are recovered with [`ArchiveError::find`]. A missing tile is not an error.
#[derive(Debug, Error)]
pub enum ArchiveError {
	/// Entries violate a directory invariant while encoding.
	#[error("cannot encode directory: {0}")]
	Encoding(String),

	/// Stored directory or header bytes are malformed.
	#[error("corrupt directory: {0}")]
	CorruptDirectory(String),

	/// The byte-range backend could not deliver a range.
	#[error("failed to fetch {range} from '{resource}': {reason}")]
	StorageFetch {
		resource: String,
		range: ByteRange,
		reason: String,
	},

	/// Two inputs resolve to the same tile id.
	#[error("duplicate tile {coord} (tile id {tile_id})")]
	DuplicateTile { tile_id: u64, coord: TileCoord },

	/// A value does not fit the on-disk field widths.
	#[error("archive too large: {0}")]
	ArchiveTooLarge(String),

	/// No tile of the source lies inside the requested pyramid.
	#[error("no tiles up to zoom {max_zoom} intersect {bbox:?}")]
	EmptySelection { max_zoom: u8, bbox: TileBBox },

	/// A request path that does not address a tile or metadata.
	#[error("malformed request: {0}")]
	MalformedRequest(String),
}

impl ArchiveError {
	/// The first `ArchiveError` in the chain of `err`, if any.
	pub fn find(err: &anyhow::Error) -> Option<&ArchiveError> {
		err.chain().find_map(|e| e.downcast_ref::<ArchiveError>())
	}
}
