use super::{ArchiveConfig, CorsConfig, ServerConfig};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
	fs::File,
	io::{BufReader, Read},
	path::Path,
};

/// Contents of a `server.yml`:
///
/// ```yaml
/// server:
///   ip: 0.0.0.0
///   port: 8080
///   cache_size_mb: 64
/// cors:
///   allowed_origin: "*"
/// archives:
///   - name: berlin
///     path: ./berlin.pmtiles
/// ```
#[derive(Default, Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
	#[serde(default)]
	pub server: ServerConfig,

	#[serde(default)]
	pub cors: CorsConfig,

	#[serde(default)]
	pub archives: Vec<ArchiveConfig>,
}

impl Config {
	pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
		Ok(serde_yaml_ng::from_reader(reader)?)
	}

	pub fn from_string(text: &str) -> Result<Self> {
		Ok(serde_yaml_ng::from_str(text)?)
	}

	/// Parses a file and resolves relative archive paths against the file's directory.
	pub fn from_path(path: &Path) -> Result<Self> {
		let file = File::open(path).with_context(|| format!("opening config file {path:?}"))?;
		let mut config = Config::from_reader(BufReader::new(file)).with_context(|| format!("parsing config file {path:?}"))?;

		let base = match path.parent() {
			Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
			_ => std::env::current_dir()?,
		};
		for archive in &mut config.archives {
			archive.resolve_paths(&base);
		}
		Ok(config)
	}
}
