//! docpack - bundle a markdown document and everything it links to

use clap::Parser;
use miette::Diagnostic;
use tracing_subscriber::EnvFilter;

use docpack::cli::{Cli, Commands};
use docpack::commands;

/// Log filter: `RUST_LOG` when set, otherwise debug output for docpack
/// with `--verbose` and warnings only without it
fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("docpack=debug")
        } else {
            EnvFilter::new("warn")
        }
    })
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(cli.verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Pack(args) => commands::pack::run(cli.project_root, args),
        Commands::Graph(args) => commands::graph::run(cli.project_root, args),
        Commands::Version => commands::version::run(),
        Commands::Completions(args) => commands::completions::run(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        if let Some(help) = e.help() {
            eprintln!("  help: {}", help);
        }
        std::process::exit(1);
    }
}
