//! pkgdex CLI entry point

use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use pkgdex::{BuildContext, Cli, Commands, Error, OutputFormat, PackageIndex};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let (output, partial_err) = match run(&cli) {
        Ok(pair) => pair,
        Err(e) => {
            eprintln!("Error: {e}");
            return e.exit_code();
        }
    };
    print!("{output}");
    match partial_err {
        Some(e) => {
            eprintln!("Error: index may be incomplete: {e}");
            e.exit_code()
        }
        None => ExitCode::SUCCESS,
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "pkgdex=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Run the selected command. Listing errors are partial by design: the
/// output that could be produced is returned alongside the error.
fn run(cli: &Cli) -> pkgdex::Result<(String, Option<Error>)> {
    let mut ctx = BuildContext::from_env();
    ctx.compiler = cli.compiler.clone();
    if let Some(suffix) = &cli.install_suffix {
        ctx.install_suffix = suffix.clone();
    }
    let index = PackageIndex::new(ctx)?;

    match &cli.command {
        Commands::List(args) => {
            let start = Instant::now();
            let (paths, err) = index.list(&args.scope);
            tracing::debug!(
                packages = paths.len(),
                elapsed = ?start.elapsed(),
                "listing complete"
            );
            Ok((render_lines(&paths, cli.format)?, err))
        }
        Commands::Dirs => {
            let (pkgs, err) = index.packages();
            let output = match cli.format {
                OutputFormat::Text => {
                    let lines: Vec<String> =
                        pkgs.iter().map(|p| p.dir.display().to_string()).collect();
                    join_lines(&lines)
                }
                OutputFormat::Json => {
                    let mut s = serde_json::to_string_pretty(&pkgs)?;
                    s.push('\n');
                    s
                }
            };
            Ok((output, err))
        }
    }
}

fn render_lines(lines: &[String], format: OutputFormat) -> pkgdex::Result<String> {
    match format {
        OutputFormat::Text => Ok(join_lines(lines)),
        OutputFormat::Json => {
            let mut s = serde_json::to_string_pretty(lines)?;
            s.push('\n');
            Ok(s)
        }
    }
}

fn join_lines(lines: &[String]) -> String {
    let mut out = lines.join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}
