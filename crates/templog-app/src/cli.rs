//! Command-line definition

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "templog")]
#[command(version, about = "Capture readings from a serial temperature datalogger and export them")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Settings file (defaults to the per-user config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List serial ports
    Ports {
        /// Only list ports that can be opened right now
        #[arg(long)]
        probe: bool,
    },

    /// Watch for serial ports and removable drives coming and going
    Watch {
        /// Seconds between scans (overrides settings)
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// Connect to the datalogger and capture readings until Ctrl-C
    Log {
        /// Serial port (defaults to the last used, then the first found)
        #[arg(short, long, conflicts_with = "demo")]
        port: Option<String>,

        /// Use the simulated datalogger
        #[arg(long)]
        demo: bool,

        /// Milliseconds between simulated readings
        #[arg(long, default_value_t = 1000)]
        demo_interval_ms: u64,

        /// Baud rate (overrides settings)
        #[arg(short, long)]
        baud: Option<u32>,

        /// Ask the logger for its stored readings after connecting
        #[arg(short, long)]
        download: bool,

        /// Stop after this many records
        #[arg(short = 'n', long)]
        count: Option<usize>,

        /// Export files written when capture ends (.csv, .xlsx or .pdf)
        #[arg(short, long)]
        output: Vec<PathBuf>,
    },

    /// Convert a saved datalog CSV to other formats
    Convert {
        /// Datalog CSV to read
        #[arg(short, long)]
        input: PathBuf,

        /// Preamble lines to skip before the data. The logger's own files
        /// carry 8, which are also rejected line by line when left at 0.
        #[arg(long, default_value_t = 0)]
        skip: usize,

        /// Files to write (.csv, .xlsx or .pdf)
        #[arg(short, long, required = true)]
        output: Vec<PathBuf>,
    },

    /// Print temperature statistics for a saved datalog CSV
    Stats {
        #[arg(short, long)]
        input: PathBuf,

        /// Preamble lines to skip before the data. The logger's own files
        /// carry 8, which are also rejected line by line when left at 0.
        #[arg(long, default_value_t = 0)]
        skip: usize,
    },
}
