//! Command-line interface definitions for quark.

use std::path::PathBuf;

use clap::Parser;

/// Devicetree definition generator.
///
/// Reads a flattened devicetree source file and a set of YAML binding
/// directories, and writes the generated definitions as a C header and/or
/// a key/value fragment for build-system consumption.
#[derive(Parser)]
#[command(name = "quark", version, about)]
pub struct Cli {
    /// Devicetree source file (flattened, all includes expanded).
    #[arg(long, short = 'd')]
    pub dts: PathBuf,

    /// Binding search directory; may be given multiple times.
    #[arg(long, short = 'y', required = true, num_args = 1..)]
    pub bindings: Vec<PathBuf>,

    /// Write the definition header to this path.
    #[arg(long, short = 'i')]
    pub header: Option<PathBuf>,

    /// Write the key/value fragment to this path.
    #[arg(long, short = 'k')]
    pub keyvalue: Option<PathBuf>,

    /// Also emit alias labels without the DT_ALIAS_ namespace, for
    /// consumers that predate it.
    #[arg(long)]
    pub old_alias_names: bool,

    /// Suppress warnings and the final summary.
    #[arg(long, short = 'q', conflicts_with = "verbose")]
    pub quiet: bool,

    /// Enable verbose output with per-stage detail.
    #[arg(long, short = 'v')]
    pub verbose: bool,
}
