//! Convert between the game's import/export strings and JSON.
//!
//! Run with: cargo run --bin bpexchange -- [-e] [input] [output]

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use blueprint_storage::exchange;

#[derive(Parser)]
#[command(name = "bpexchange")]
#[command(about = "Convert between blueprint exchange strings and JSON")]
struct Cli {
    /// Encode JSON into an exchange string instead of decoding
    #[arg(short = 'e', long = "encode")]
    encode: bool,

    /// Input file
    #[arg(default_value = "bp.txt")]
    input: PathBuf,

    /// Output file; stdout when omitted
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let input = std::fs::read_to_string(&cli.input)
        .with_context(|| format!("reading {}", cli.input.display()))?;

    let output = if cli.encode {
        let document: serde_json::Value =
            serde_json::from_str(input.trim()).context("parsing input JSON")?;
        exchange::pack(&document)?
    } else {
        let document = exchange::unpack(&input)?;
        serde_json::to_string_pretty(&document)?
    };

    match cli.output {
        Some(path) => std::fs::write(&path, output)
            .with_context(|| format!("writing {}", path.display()))?,
        None => println!("{output}"),
    }
    Ok(())
}
