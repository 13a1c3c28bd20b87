use anyhow::{Result, anyhow};
use pmtiles::{
	config::{ArchiveConfig, Config},
	server::TileServer,
};
use regex::Regex;
use std::path::PathBuf;
use tokio::time::{Duration, sleep};

#[derive(clap::Args, Debug)]
#[command(arg_required_else_help = true, disable_version_flag = true, verbatim_doc_comment)]
pub struct Subcommand {
	/// One or more archives to serve, as local paths or http(s):// URLs.
	/// Tiles are served at "/{name}/{z}/{x}/{y}.{ext}", metadata at "/{name}/metadata".
	/// The name is derived from the file name, e.g. ".../berlin.pmtiles" is served as "berlin".
	/// A different name can be set with "[name]path", "path[name]" or "path#name".
	#[arg(num_args = 0.., verbatim_doc_comment)]
	pub archives: Vec<String>,

	/// Path to a configuration file (YAML) with server, CORS and archive settings.
	/// Command line arguments override configuration file settings.
	#[arg(short = 'c', long, value_name = "FILE", display_order = 0)]
	pub config: Option<PathBuf>,

	/// Serve via socket ip. Default: 0.0.0.0
	#[arg(short = 'i', long, display_order = 0)]
	pub ip: Option<String>,

	/// Serve via port. Default: 8080
	#[arg(short, long, display_order = 0)]
	pub port: Option<u16>,

	/// Value of the Access-Control-Allow-Origin header, e.g. "*"
	#[arg(long, value_name = "ORIGIN", display_order = 1)]
	pub cors: Option<String>,

	/// Size of the directory cache shared by all archives, in megabytes. Default: 64
	#[arg(long, value_name = "MB", display_order = 1)]
	pub cache: Option<usize>,

	/// Shutdown server automatically after x milliseconds.
	#[arg(long, display_order = 4)]
	pub auto_shutdown: Option<u64>,
}

#[tokio::main]
pub async fn run(arguments: &Subcommand) -> Result<()> {
	let mut config = match &arguments.config {
		Some(path) => Config::from_path(path)?,
		None => Config::default(),
	};

	config.server.override_optional_ip(&arguments.ip);
	config.server.override_optional_port(&arguments.port);
	config.server.override_optional_cache_size_mb(&arguments.cache);
	config.cors.override_optional_allowed_origin(&arguments.cors);

	for argument in &arguments.archives {
		config.archives.push(parse_archive_argument(argument)?);
	}
	if config.archives.is_empty() {
		return Err(anyhow!("no archives to serve, neither as arguments nor in a config file"));
	}

	let mut server = TileServer::from_config(&config).await?;

	for (url, source) in server.serving_loop().url_mapping() {
		eprintln!("   {:30}  <-  {}", url + "*", source);
	}

	server.start().await?;

	if let Some(milliseconds) = arguments.auto_shutdown {
		sleep(Duration::from_millis(milliseconds)).await;
	} else {
		loop {
			sleep(Duration::from_secs(60)).await;
		}
	}

	server.stop().await;
	Ok(())
}

/// Splits `[name]path`, `path[name]` and `path#name` into name and path.
fn parse_archive_argument(argument: &str) -> Result<ArchiveConfig> {
	let patterns = [
		r"^\[(?P<name>[^\]]+?)\](?P<path>.*)$",
		r"^(?P<path>.*)\[(?P<name>[^\]]+?)\]$",
		r"^(?P<path>.*)#(?P<name>[^\]]+?)$",
		r"^(?P<path>.*)$",
	]
	.iter()
	.map(|pattern| Regex::new(pattern))
	.collect::<Result<Vec<Regex>, _>>()?;

	let capture = patterns
		.iter()
		.find_map(|pattern| pattern.captures(argument))
		.ok_or_else(|| anyhow!("failed to parse archive argument: {argument}"))?;

	let path = capture.name("path").map_or("", |m| m.as_str());
	let name = capture.name("name").map(|m| m.as_str());
	Ok(ArchiveConfig::new(name, path))
}
