//! HTTP serving of archives: a transport-independent [`ServingLoop`] and the axum
//! [`TileServer`] in front of it.

mod serving_loop;
mod tile_server;

pub use serving_loop::*;
pub use tile_server::*;
