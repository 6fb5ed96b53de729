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
    author = "The g2xtb developers",
    version,
    about = "g2xtb - Run GFN2-xTB calculations from Gaussian through its External keyword.",
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
    /// Answer one request from Gaussian (use as the program of an `External` keyword).
    Run(RunArgs),
    /// List the solvent names accepted by `--solvent`.
    Solvents,
    /// Load the xtb library and resolve the calculation entry point.
    Check(CheckArgs),
}

/// Options shared by every command that binds the xtb library.
#[derive(Args, Debug, Clone, Default)]
pub struct LibraryArgs {
    /// Path to the configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Path or file name of the xtb shared library.
    #[arg(short = 'L', long, value_name = "PATH")]
    pub library: Option<PathBuf>,

    /// Name of the calculation entry point exported by the library.
    #[arg(long, value_name = "NAME")]
    pub symbol: Option<String>,
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub library: LibraryArgs,

    /// Directory for the scratch file the library writes its report into.
    #[arg(long, value_name = "DIR")]
    pub scratch_dir: Option<PathBuf>,

    // --- Calculation Overrides ---
    /// Numerical accuracy of the calculation.
    #[arg(short, long, value_name = "FLOAT")]
    pub accuracy: Option<f64>,

    /// Electronic temperature in Kelvin.
    #[arg(short, long, value_name = "FLOAT")]
    pub temperature: Option<f64>,

    /// Print level of xtb; 0 also omits the geometry and gradient tables.
    #[arg(short, long, value_name = "INT")]
    pub print_level: Option<i32>,

    /// Implicit (GBSA) solvent, or 'none'.
    #[arg(short, long, value_name = "NAME")]
    pub solvent: Option<String>,

    /// Maximum number of SCC iterations.
    #[arg(short = 'M', long, value_name = "INT")]
    pub max_iterations: Option<i32>,

    /// Number of threads the library may use (0 lets it decide).
    #[arg(long, value_name = "INT")]
    pub parallel: Option<i32>,

    /// Override `calculation.restart` from the config file.
    #[command(flatten)]
    pub restart: RestartFlags,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S calculation.accuracy=0.1
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE")]
    pub set_values: Vec<String>,

    // --- Gaussian External Arguments ---
    /// ONIOM layer (R, M or S).
    pub layer: String,

    /// Request file written by Gaussian.
    pub input: PathBuf,

    /// Response file read back by Gaussian.
    pub output: PathBuf,

    /// Message file whose content Gaussian copies into its log.
    pub message: PathBuf,

    /// Formatted checkpoint file (unused).
    pub fchk: PathBuf,

    /// Matrix element file (unused).
    pub matrix_elements: PathBuf,
}

/// Mutually exclusive flags that switch wavefunction restarts on or off.
#[derive(Args, Debug, Clone, Copy, Default)]
#[group(required = false, multiple = false)]
pub struct RestartFlags {
    /// Restart from a previous wavefunction, if the library finds one.
    #[arg(long)]
    pub restart: bool,
    /// Always start from a fresh guess, even if the config file enables restarts.
    #[arg(long)]
    pub no_restart: bool,
}

impl RestartFlags {
    /// The explicit choice made on the command line, if any.
    pub fn choice(self) -> Option<bool> {
        if self.restart {
            Some(true)
        } else if self.no_restart {
            Some(false)
        } else {
            None
        }
    }
}

/// Arguments for the `check` subcommand.
#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub library: LibraryArgs,
}
