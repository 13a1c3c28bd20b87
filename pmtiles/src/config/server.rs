use serde::Deserialize;

pub const DEFAULT_IP: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_CACHE_SIZE_MB: usize = 64;

#[derive(Debug, Default, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
	/// IP to bind to. Default: 0.0.0.0
	pub ip: Option<String>,

	/// TCP port to bind to. Default: 8080
	pub port: Option<u16>,

	/// Byte budget of the directory cache shared by all archives, in megabytes. Default: 64
	pub cache_size_mb: Option<usize>,
}

impl ServerConfig {
	pub fn override_optional_ip(&mut self, ip: &Option<String>) {
		if ip.is_some() {
			self.ip = ip.clone();
		}
	}
	pub fn override_optional_port(&mut self, port: &Option<u16>) {
		if port.is_some() {
			self.port = *port;
		}
	}
	pub fn override_optional_cache_size_mb(&mut self, cache_size_mb: &Option<usize>) {
		if cache_size_mb.is_some() {
			self.cache_size_mb = *cache_size_mb;
		}
	}

	pub fn ip(&self) -> &str {
		self.ip.as_deref().unwrap_or(DEFAULT_IP)
	}

	pub fn port(&self) -> u16 {
		self.port.unwrap_or(DEFAULT_PORT)
	}

	pub fn cache_size_bytes(&self) -> usize {
		self.cache_size_mb.unwrap_or(DEFAULT_CACHE_SIZE_MB).saturating_mul(1024 * 1024)
	}
}
