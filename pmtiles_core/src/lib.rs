//! Core building blocks for single-file tile archives: byte ranges and blobs, tile coordinates
//! and tile ids, byte-range I/O against local files and HTTP endpoints, compression, and the
//! error taxonomy shared by the reader, builder and server.

pub mod compression;
mod error;
pub mod io;
pub mod macros;
pub mod types;

pub use error::*;
pub use types::*;
