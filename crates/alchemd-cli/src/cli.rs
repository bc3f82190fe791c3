use alchemd::engine::restraint::{CorrectionMethod, Engine};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "The alchemd developers",
    version,
    about = "alchemd - Topology squashing and Boresch restraint tooling for alchemical free-energy calculations.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert perturbable molecules into a single-state layout an MD engine can read.
    Squash(SquashArgs),
    /// Map coordinates and velocities from a squashed engine run back onto the merged system.
    Unsquash(UnsquashArgs),
    /// Serialize a Boresch restraint for an MD engine and compute its standard-state correction.
    Restraint(RestraintArgs),
}

/// A JSON topology with an optional GRO coordinate overlay.
#[derive(Args, Debug, Clone)]
pub struct SystemInput {
    /// Path to the JSON topology of the merged system.
    #[arg(short = 't', long, required = true, value_name = "PATH")]
    pub topology: PathBuf,

    /// GRO file whose coordinates replace those of the topology.
    #[arg(short = 'c', long, value_name = "PATH")]
    pub coordinates: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SplicerKind {
    /// Splice residues in memory.
    #[default]
    Native,
    /// Delegate residue splicing to an external program.
    External,
}

/// Arguments for the `squash` subcommand.
#[derive(Args, Debug)]
pub struct SquashArgs {
    #[command(flatten)]
    pub input: SystemInput,

    /// Directory receiving the squashed topology, coordinates and mapping.
    #[arg(short, long, required = true, value_name = "DIR")]
    pub output_dir: PathBuf,

    /// File stem of the squashed topology and coordinate files.
    #[arg(long, default_value = "squashed", value_name = "STEM")]
    pub stem: String,

    /// Path of the index mapping. Defaults to `<output-dir>/<stem>.mapping.json`.
    #[arg(short, long, value_name = "PATH")]
    pub mapping: Option<PathBuf>,

    /// How residues of partially perturbed molecules are spliced.
    #[arg(long, value_enum, default_value_t = SplicerKind::Native)]
    pub splicer: SplicerKind,

    /// Program run by the external splicer.
    #[arg(long, value_name = "PATH", required_if_eq("splicer", "external"))]
    pub splicer_program: Option<PathBuf>,

    /// Extra argument passed to the external splicer. Can be used multiple times.
    #[arg(long = "splicer-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub splicer_args: Vec<String>,
}

/// Arguments for the `unsquash` subcommand.
#[derive(Args, Debug)]
pub struct UnsquashArgs {
    #[command(flatten)]
    pub merged: SystemInput,

    /// JSON topology of the squashed system, as written by `squash`.
    #[arg(long, required = true, value_name = "PATH")]
    pub squashed_topology: PathBuf,

    /// Engine output coordinates (GRO) over the squashed layout.
    #[arg(long, value_name = "PATH")]
    pub squashed_coordinates: Option<PathBuf>,

    /// Index mapping written by `squash`.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub mapping: PathBuf,

    /// Directory receiving the updated merged system.
    #[arg(short, long, required = true, value_name = "DIR")]
    pub output_dir: PathBuf,

    /// File stem of the updated topology and coordinate files.
    #[arg(long, default_value = "unsquashed", value_name = "STEM")]
    pub stem: String,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineArg {
    Gromacs,
    Somd,
}

impl From<EngineArg> for Engine {
    fn from(value: EngineArg) -> Self {
        match value {
            EngineArg::Gromacs => Engine::Gromacs,
            EngineArg::Somd => Engine::Somd,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodArg {
    /// Numerical integration of the angular terms.
    #[value(alias = "numerical")]
    SemiAnalytical,
    /// Closed form, valid for stiff restraints.
    Analytical,
}

impl From<MethodArg> for CorrectionMethod {
    fn from(value: MethodArg) -> Self {
        match value {
            MethodArg::SemiAnalytical => CorrectionMethod::SemiAnalytical,
            MethodArg::Analytical => CorrectionMethod::Analytical,
        }
    }
}

/// Arguments for the `restraint` subcommand.
#[derive(Args, Debug)]
pub struct RestraintArgs {
    #[command(flatten)]
    pub input: SystemInput,

    /// Restraint description in TOML format.
    #[arg(short = 'r', long, required = true, value_name = "PATH")]
    pub restraint: PathBuf,

    /// Target MD engine of the serialized restraint.
    #[arg(short, long, value_enum, default_value_t = EngineArg::Gromacs)]
    pub engine: EngineArg,

    /// Method used for the standard-state correction.
    #[arg(long, value_enum, default_value_t = MethodArg::SemiAnalytical)]
    pub method: MethodArg,

    /// GRO frame the built restraint is rebound to before scoring.
    #[arg(long, value_name = "PATH")]
    pub reference_frame: Option<PathBuf>,

    /// Write the engine restraint text to this file instead of stdout.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}
