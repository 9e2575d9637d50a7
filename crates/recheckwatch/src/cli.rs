//! CLI surface (§6): `recheckwatch [-f|--foreground] [-n|--nocomment]
//! [--noirc] <configfile>`.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "recheckwatch", about = "CI-failure classification bot")]
pub struct Cli {
    /// Run in the foreground instead of daemonizing.
    #[arg(short = 'f', long)]
    pub foreground: bool,

    /// Don't comment in the review system. Useful in testing.
    #[arg(short = 'n', long)]
    pub nocomment: bool,

    /// Don't connect to chat. Useful in testing.
    #[arg(long)]
    pub noirc: bool,

    /// Enable debug-level logging for the `recheckwatch` target.
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Path to the process configuration file.
    pub conffile: String,
}
