//! Command Line Options and Arguments

use clap::Parser;
use std::path::PathBuf;

/// Switches the lab interface between DHCP and a manual address, then probes the lab proxy
#[derive(Parser)]
#[clap(name = "labnet", version)]
pub struct Opts {
    /// A level of verbosity, and can be used multiple times
    #[clap(short, long, parse(from_occurrences))]
    pub verbosity: u8,

    /// Optional TOML file overriding the built-in interface, DNS server and probe settings
    #[clap(short, long)]
    pub config: Option<PathBuf>,
}
