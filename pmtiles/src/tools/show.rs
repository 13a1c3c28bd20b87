use anyhow::Result;
use colored::Colorize;
use pmtiles::container::{ArchiveReader, DirectoryCache, Entry};
use pmtiles_core::TileCoord;
use std::sync::Arc;

#[derive(clap::Args, Debug)]
#[command(arg_required_else_help = true, disable_version_flag = true)]
pub struct Subcommand {
	/// archive to show, as local path or http(s):// URL
	#[arg(required = true)]
	location: String,

	/// also list every tile entry (tile id, z/x/y, offset, length, run length)
	#[arg(long, short)]
	entries: bool,
}

#[tokio::main]
pub async fn run(arguments: &Subcommand) -> Result<()> {
	let reader = ArchiveReader::open_location(&arguments.location, Arc::new(DirectoryCache::new(0))).await?;

	for (label, value) in describe(&reader) {
		println!("{} {value}", format!("{label:<22}").bold());
	}

	let metadata = reader.get_metadata().await?;
	let metadata = match serde_json::from_slice::<serde_json::Value>(metadata.as_slice()) {
		Ok(json) => serde_json::to_string_pretty(&json)?,
		Err(_) => String::from_utf8_lossy(metadata.as_slice()).to_string(),
	};
	println!("{}\n{metadata}", "metadata:".bold());

	if arguments.entries {
		println!("{}", "entries:".bold());
		for entry in reader.walk_entries().await? {
			println!("{}", format_entry(&entry)?);
		}
	}

	Ok(())
}

fn describe(reader: &ArchiveReader) -> Vec<(&'static str, String)> {
	let header = reader.header();
	let [west, south, east, north] = header.bbox();
	let [lon, lat] = header.center();
	vec![
		("archive:", reader.name().to_string()),
		("tile format:", reader.tile_format().to_string()),
		("tile compression:", reader.tile_compression().to_string()),
		("internal compression:", reader.internal_compression().to_string()),
		("zoom levels:", format!("{}..={}", header.min_zoom, header.max_zoom)),
		("bounds:", format!("[{west}, {south}, {east}, {north}]")),
		("center:", format!("[{lon}, {lat}] at zoom {}", header.center_zoom)),
		("addressed tiles:", header.addressed_tiles_count.to_string()),
		("tile entries:", header.tile_entries_count.to_string()),
		("tile contents:", header.tile_contents_count.to_string()),
		("clustered:", header.clustered.to_string()),
		("root directory:", header.root_dir.to_string()),
		("leaf directories:", header.leaf_dirs.to_string()),
		("metadata region:", header.metadata.to_string()),
		("tile data:", header.tile_data.to_string()),
	]
}

fn format_entry(entry: &Entry) -> Result<String> {
	let coord = TileCoord::from_tile_id(entry.tile_id)?;
	Ok(format!(
		"{:>12} {:<16} offset {:>12} length {:>9} run {}",
		entry.tile_id,
		coord.to_string(),
		entry.range.offset,
		entry.range.length,
		entry.run_length
	))
}
