use clap::{Args, Parser, Subcommand, ValueEnum};
use molswap::core::models::snapshot::ReferencePoint;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Tony Kan, Ted Yu, William A. Goddard III, Victor Wai Tak Kam",
    version,
    about = "MolSwap CLI - Replace molecules inside a spatial window of a GROMACS snapshot.",
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
    /// Replace molecules of an index group that lie inside a spatial window.
    Replace(ReplaceArgs),
    /// Summarize the templates, composition and index groups of a system.
    Info(InfoArgs),
}

/// Which point of a molecule is tested against the window.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceArg {
    CenterOfMass,
    FirstAtom,
}

impl From<ReferenceArg> for ReferencePoint {
    fn from(arg: ReferenceArg) -> Self {
        match arg {
            ReferenceArg::CenterOfMass => ReferencePoint::CenterOfMass,
            ReferenceArg::FirstAtom => ReferencePoint::FirstAtom,
        }
    }
}

/// Arguments for the `replace` subcommand.
///
/// Every option is optional here; unset options fall back to the config file
/// and then to built-in defaults.
#[derive(Args, Debug, Default)]
pub struct ReplaceArgs {
    // --- Files ---
    /// Input coordinate file (.gro) [default: out.gro]
    #[arg(short, long, value_name = "PATH")]
    pub input: Option<PathBuf>,

    /// Output coordinate file (.gro) [default: conf.gro]
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Topology file (.top) [default: topol.top]
    #[arg(short, long, value_name = "PATH")]
    pub topology: Option<PathBuf>,

    /// Index file (.ndx) [default: index.ndx]
    #[arg(short = 'n', long, value_name = "PATH")]
    pub index: Option<PathBuf>,

    // --- Selection ---
    /// Index group whose molecules may be replaced [default: SOL]
    #[arg(short, long, value_name = "NAME")]
    pub group: Option<String>,

    /// Molecule type the selected molecules become [default: He]
    #[arg(short, long, value_name = "NAME")]
    pub molecule: Option<String>,

    /// Title of the output file; empty keeps the input title
    #[arg(short, long, value_name = "TEXT")]
    pub description: Option<String>,

    // --- Sampling ---
    /// Number of molecules to replace [default: 0]
    #[arg(short, long, value_name = "INT")]
    pub count: Option<usize>,

    /// Maximum number of random draws [default: 100000]
    #[arg(long, value_name = "INT")]
    pub max_attempts: Option<u64>,

    /// Spatial window as AXIS:LOWER:UPPER, bounds excluded [default: z:1.00:1.70]
    #[arg(short, long, value_name = "AXIS:LOWER:UPPER")]
    pub window: Option<String>,

    /// Point of each molecule tested against the window [default: center-of-mass]
    #[arg(long, value_enum)]
    pub reference: Option<ReferenceArg>,

    /// Seed for the random number generator; a random seed is used and logged if omitted
    #[arg(long, value_name = "INT")]
    pub seed: Option<u64>,

    /// Fail if fewer molecules than requested could be replaced
    #[arg(long)]
    pub strict: bool,

    /// Accept a shortfall even if the config file sets `strict = true`
    #[arg(long, conflicts_with = "strict")]
    pub no_strict: bool,

    // --- Extra outputs ---
    /// Write a CSV report of the replaced molecules
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Write the updated `[ molecules ]` section for the topology
    #[arg(long, value_name = "PATH")]
    pub molecules_out: Option<PathBuf>,

    // --- Configuration ---
    /// Configuration file in TOML format
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S sampling.count=20
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `info` subcommand.
#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Input coordinate file (.gro)
    #[arg(short, long, value_name = "PATH", default_value = "out.gro")]
    pub input: PathBuf,

    /// Topology file (.top)
    #[arg(short, long, value_name = "PATH", default_value = "topol.top")]
    pub topology: PathBuf,

    /// Index file (.ndx)
    #[arg(short = 'n', long, value_name = "PATH", default_value = "index.ndx")]
    pub index: PathBuf,

    /// Spatial window as AXIS:LOWER:UPPER used to count molecules per group
    #[arg(short, long, value_name = "AXIS:LOWER:UPPER", default_value = "z:1.00:1.70")]
    pub window: String,

    /// Point of each molecule tested against the window
    #[arg(long, value_enum, default_value_t = ReferenceArg::CenterOfMass)]
    pub reference: ReferenceArg,
}
