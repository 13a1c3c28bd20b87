//! Cross-origin access to the served archives.
//!
//! When `allowed_origin` is set, every response carries
//! `Access-Control-Allow-Origin: <allowed_origin>`.
//!
//! ```yaml
//! cors:
//!   allowed_origin: "https://example.org"
//! ```

use serde::Deserialize;

#[derive(Debug, Default, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CorsConfig {
	/// Value of the `Access-Control-Allow-Origin` header, e.g. `*`.
	/// No header is sent when unset.
	pub allowed_origin: Option<String>,
}

impl CorsConfig {
	pub fn override_optional_allowed_origin(&mut self, allowed_origin: &Option<String>) {
		if allowed_origin.is_some() {
			self.allowed_origin = allowed_origin.clone();
		}
	}
}
