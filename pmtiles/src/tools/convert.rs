use anyhow::Result;
use pmtiles::container::{ConvertOptions, DEFAULT_MAX_LEAF_BYTES, convert_to_path, open_source};
use pmtiles_core::{MAX_LEVEL, TileCompression};

#[derive(clap::Args, Debug)]
#[command(arg_required_else_help = true, disable_version_flag = true)]
pub struct Subcommand {
	/// source: *.mbtiles, a directory with {z}/{x}/{y}.{ext} tiles, or an existing archive
	#[arg()]
	input_file: String,

	/// the archive to write
	#[arg()]
	output_file: String,

	/// minimum zoom level
	#[arg(long, value_name = "int", display_order = 1)]
	min_zoom: Option<u8>,

	/// maximum zoom level
	#[arg(long, value_name = "int", display_order = 1)]
	max_zoom: Option<u8>,

	/// compression of the directories and the metadata
	#[arg(long, short = 'c', value_enum, default_value = "gzip", display_order = 2)]
	internal_compression: TileCompression,

	/// maximum size of one leaf directory in bytes, before compression
	#[arg(long, value_name = "bytes", default_value_t = DEFAULT_MAX_LEAF_BYTES, display_order = 2)]
	max_leaf_bytes: usize,
}

#[tokio::main]
pub async fn run(arguments: &Subcommand) -> Result<()> {
	eprintln!("convert from {:?} to {:?}", arguments.input_file, arguments.output_file);

	let source = open_source(&arguments.input_file).await?;
	let options = ConvertOptions {
		internal_compression: arguments.internal_compression,
		max_leaf_bytes: arguments.max_leaf_bytes,
		min_zoom: arguments.min_zoom.unwrap_or(0),
		max_zoom: arguments.max_zoom.unwrap_or(MAX_LEVEL),
	};

	let output = std::env::current_dir()?.join(&arguments.output_file);
	convert_to_path(source.as_ref(), &options, &output).await?;

	eprintln!("finished converting tiles");
	Ok(())
}
