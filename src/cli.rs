//! CLI argument definitions using clap with subcommand architecture

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Fast, incrementally refreshed Go package index
#[derive(Parser, Debug)]
#[command(name = "pkgdex")]
#[command(about = "Lists importable Go packages under GOROOT and GOPATH")]
#[command(version)]
#[command(author)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (applies to all commands)
    #[arg(short, long, default_value = "text", value_enum, global = true)]
    pub format: OutputFormat,

    /// Show verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Compiler the archive trees belong to (gc or gccgo)
    #[arg(long, default_value = "gc", global = true)]
    pub compiler: String,

    /// Install suffix appended to the archive directory name
    #[arg(long, value_name = "SUFFIX", global = true)]
    pub install_suffix: Option<String>,
}

/// Available subcommands for pkgdex
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List importable package paths
    #[command(visible_alias = "ls")]
    List(ListArgs),

    /// Print the directory behind every indexed package
    Dirs,
}

/// Arguments for the list command
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Import-path scope; vendored and internal packages are only shown
    /// to queries scoped inside them
    #[arg(value_name = "SCOPE", default_value = "")]
    pub scope: String,
}

/// Output format for listings
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// One entry per line
    Text,
    /// Pretty-printed JSON array
    Json,
}
