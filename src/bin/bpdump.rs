//! Decode a Factorio blueprint library into its export JSON.
//!
//! Run with: cargo run --bin bpdump -- [-s] [-v] [-d] [-x] [blueprint-storage.dat]

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use blueprint_storage::{decode_library, DecodeOptions};

#[derive(Parser)]
#[command(name = "bpdump")]
#[command(about = "Decode a Factorio blueprint library into its export JSON")]
struct Cli {
    /// Skip blueprints that fail to parse instead of aborting
    #[arg(short = 's', long = "skip-bad")]
    skip_bad: bool,

    /// Verbose progress on stderr
    #[arg(short = 'v')]
    verbose: bool,

    /// Byte-level trace output on stderr
    #[arg(short = 'd')]
    debug: bool,

    /// Include migrations and the prototype table in the output
    #[arg(short = 'x', long = "extended")]
    extended: bool,

    /// Library file to decode
    #[arg(default_value = "blueprint-storage.dat")]
    filename: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.debug {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let data = std::fs::read(&cli.filename)
        .with_context(|| format!("reading {}", cli.filename.display()))?;
    let filename = cli
        .filename
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| cli.filename.display().to_string());

    let options = DecodeOptions { skip_bad: cli.skip_bad, extended: cli.extended };
    let library = match decode_library(&data, &filename, &options) {
        Ok(library) => library,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    println!("{}", serde_json::to_string_pretty(&library.document)?);

    if library.skipped > 0 {
        eprintln!("skipped {} blueprint(s)", library.skipped);
        std::process::exit(2);
    }
    Ok(())
}
