mod tools;

use anyhow::Result;
use clap::{Parser, Subcommand};
use clap_verbosity_flag::{ErrorLevel, Verbosity};

#[derive(Parser, Debug)]
#[command(
	author,
	version,
	about,
	long_about = None,
	propagate_version = true,
	disable_help_subcommand = true,
)]
struct Cli {
	#[command(subcommand)]
	command: Commands,

	#[command(flatten)]
	verbose: Verbosity<ErrorLevel>,
}

#[derive(Subcommand, Debug)]
enum Commands {
	/// Build an archive from an MBTiles file, a tile directory or another archive
	Convert(tools::convert::Subcommand),

	#[clap(alias = "server")]
	/// Serve tiles and metadata of archives via http
	Serve(tools::serve::Subcommand),

	#[clap(alias = "info")]
	/// Show the header, metadata and entries of an archive
	Show(tools::show::Subcommand),

	#[clap(alias = "extract")]
	/// Extract the tiles up to a zoom level inside a bounding box into a new archive
	Subpyramid(tools::subpyramid::Subcommand),
}

fn main() -> Result<()> {
	let cli = Cli::parse();

	env_logger::Builder::new()
		.filter_level(cli.verbose.log_level_filter())
		.format_timestamp(None)
		.init();

	run(cli)
}

fn run(cli: Cli) -> Result<()> {
	match &cli.command {
		Commands::Convert(arguments) => tools::convert::run(arguments),
		Commands::Serve(arguments) => tools::serve::run(arguments),
		Commands::Show(arguments) => tools::show::run(arguments),
		Commands::Subpyramid(arguments) => tools::subpyramid::run(arguments),
	}
}
