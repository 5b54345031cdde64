use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "cdxml2gnr developers",
    version,
    about = "cdxml2gnr - Reconstruct 3D structures and periodic nanoribbon cells from ChemDraw CDXML sketches.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the molecular fragments of a sketch as 'index: formula'.
    List(ListArgs),
    /// Convert one fragment into a scaled 3D structure (extended XYZ).
    Convert(ConvertArgs),
    /// Cut a periodic cell from one fragment between two equivalent atoms.
    Cell(CellArgs),
}

/// Arguments for the `list` subcommand.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Path to the input CDXML sketch.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,
}

/// Pipeline configuration shared by the structure-producing subcommands.
#[derive(Args, Debug, Default)]
pub struct PipelineArgs {
    /// Path to a pipeline configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S cell-padding=20
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `convert` subcommand.
#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Path to the input CDXML sketch.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path for the output structure file (extended XYZ).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Index of the fragment to convert, as shown by 'list'.
    #[arg(short = 'n', long, default_value_t = 0, value_name = "INT")]
    pub index: usize,

    /// Keep hydrogens implicit instead of adding them as atoms.
    #[arg(long)]
    pub no_hydrogens: bool,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

/// Arguments for the `cell` subcommand.
#[derive(Args, Debug)]
pub struct CellArgs {
    /// Path to the input CDXML sketch.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path for the output structure file (extended XYZ).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Index of the fragment to use, as shown by 'list'.
    #[arg(short = 'n', long, default_value_t = 0, value_name = "INT")]
    pub index: usize,

    /// Indices of two equivalent atoms one repeat unit apart, counted in document order.
    #[arg(long, num_args = 2, required = true, value_names = ["ID1", "ID2"])]
    pub atoms: Vec<usize>,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}
