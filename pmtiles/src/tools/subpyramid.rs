use anyhow::{Result, bail};
use pmtiles::container::{ArchiveReader, DirectoryCache, ExtractBBox, extract_subpyramid_to_path};
use pmtiles_core::{GeoBBox, TileBBox};
use std::sync::Arc;

#[derive(clap::Args, Debug)]
#[command(arg_required_else_help = true, disable_version_flag = true, verbatim_doc_comment)]
pub struct Subcommand {
	/// source archive, as local path or http(s):// URL
	#[arg()]
	input_file: String,

	/// the archive to write
	#[arg()]
	output_file: String,

	/// highest zoom level to keep
	#[arg()]
	max_zoom: u8,

	/// inclusive tile range at MAX_ZOOM: MIN_X MIN_Y MAX_X MAX_Y
	#[arg(num_args = 4, value_names = ["MIN_X", "MIN_Y", "MAX_X", "MAX_Y"], required_unless_present = "bbox")]
	tile_range: Vec<u32>,

	/// use a geographic bounding box instead of a tile range
	#[arg(
		long,
		short,
		value_name = "lon_min,lat_min,lon_max,lat_max",
		allow_hyphen_values = true,
		conflicts_with = "tile_range"
	)]
	bbox: Option<String>,
}

#[tokio::main]
pub async fn run(arguments: &Subcommand) -> Result<()> {
	eprintln!("extract from {:?} to {:?}", arguments.input_file, arguments.output_file);

	let bbox = extract_bbox(arguments)?;
	let reader = ArchiveReader::open_location(&arguments.input_file, Arc::new(DirectoryCache::new(0))).await?;
	let output = std::env::current_dir()?.join(&arguments.output_file);
	extract_subpyramid_to_path(&reader, arguments.max_zoom, &bbox, &output).await?;

	eprintln!("finished extracting tiles");
	Ok(())
}

fn extract_bbox(arguments: &Subcommand) -> Result<ExtractBBox> {
	if let Some(bbox) = &arguments.bbox {
		return Ok(ExtractBBox::GeoBBox(bbox.parse::<GeoBBox>()?));
	}
	match arguments.tile_range.as_slice() {
		&[x_min, y_min, x_max, y_max] => Ok(ExtractBBox::TileRange(TileBBox::new(
			arguments.max_zoom,
			x_min,
			y_min,
			x_max,
			y_max,
		)?)),
		_ => bail!("expected a tile range (MIN_X MIN_Y MAX_X MAX_Y) or --bbox"),
	}
}
