mod compression;
mod directory;
mod entry;
mod header;
mod tile_type;

pub use compression::ArchiveCompression;
pub use directory::*;
pub use entry::Entry;
pub use header::*;
pub use tile_type::ArchiveTileType;
