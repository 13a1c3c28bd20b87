use anyhow::{Result, ensure};
use serde::Deserialize;
use std::path::Path;

/// One archive served at `/{name}/...`.
///
/// ```yaml
/// archives:
///   - name: berlin
///     path: ./berlin.pmtiles
///   - path: https://example.org/planet.pmtiles
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ArchiveConfig {
	/// Name used in request paths. Defaults to the file name without extensions,
	/// e.g. "planet" for "planet.pmtiles".
	pub name: Option<String>,

	/// Local path or `http(s)://` URL of the archive.
	pub path: String,
}

impl ArchiveConfig {
	pub fn new(name: Option<&str>, path: &str) -> ArchiveConfig {
		ArchiveConfig {
			name: name.map(str::to_string),
			path: path.to_string(),
		}
	}

	pub fn is_remote(&self) -> bool {
		self.path.starts_with("http://") || self.path.starts_with("https://")
	}

	/// Resolves a relative local path against `base`, usually the config file's directory.
	pub fn resolve_paths(&mut self, base: &Path) {
		if self.is_remote() {
			return;
		}
		let path = Path::new(self.path.strip_prefix("file://").unwrap_or(&self.path));
		if path.is_relative() {
			self.path = base.join(path).to_string_lossy().to_string();
		}
	}

	pub fn name(&self) -> Result<String> {
		let name = match &self.name {
			Some(name) => name.clone(),
			None => {
				let file = self.path.trim_end_matches('/').rsplit('/').next().unwrap_or_default();
				file.split('.').next().unwrap_or_default().to_string()
			}
		};
		ensure!(
			!name.is_empty() && !name.contains('/'),
			"invalid archive name '{name}' for '{}'",
			self.path
		);
		Ok(name)
	}
}
