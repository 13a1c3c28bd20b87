//! Server configuration, loaded from a YAML file (`serve -c server.yml`).
//!
//! - [`Config`]: top-level loader
//! - [`ServerConfig`]: bind address and directory cache budget
//! - [`CorsConfig`]: the `Access-Control-Allow-Origin` value
//! - [`ArchiveConfig`]: one served archive
//!
//! Command line flags override file values.

mod archive;
mod cors;
mod main;
mod server;

pub use archive::ArchiveConfig;
pub use cors::CorsConfig;
pub use main::Config;
pub use server::ServerConfig;
