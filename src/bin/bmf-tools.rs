//! CLI front-end: reads a decompressed BMF buffer from a file or stdin and writes one of the
//! two back-ends' text renderings to a file or stdout.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use bmf_rs::backend::{dump, mof};

/// Decode a Binary MOF (BMF) blob and print it as text.
#[derive(Clone, Debug, Parser)]
struct Args {
    /// Input BMF file, or "-" to read from stdin.
    #[arg(short, long, default_value = "-")]
    input: PathBuf,
    /// Output file; defaults to stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
    #[command(subcommand)]
    operation: Operation,
}

/// Which back-end renders the decoded class model.
#[derive(Clone, Copy, Debug, Subcommand)]
enum Operation {
    /// Structured diagnostic dump, one block per class/variable/method.
    Dump,
    /// Human-readable, `#pragma`-annotated MOF source.
    Mof,
}

fn read_input(path: &PathBuf) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    if path.as_os_str() == "-" {
        io::stdin().read_to_end(&mut buf).context("reading BMF from stdin")?;
    } else {
        File::open(path)
            .with_context(|| format!("opening {}", path.display()))?
            .read_to_end(&mut buf)
            .with_context(|| format!("reading {}", path.display()))?;
    }
    Ok(buf)
}

fn open_output(path: &Option<PathBuf>) -> Result<Box<dyn Write>> {
    match path {
        Some(path) => Ok(Box::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        )),
        None => Ok(Box::new(io::stdout())),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let bytes = read_input(&args.input)?;
    let model = bmf_rs::parse(&bytes).context("decoding BMF input")?;

    let mut out = open_output(&args.output)?;
    match args.operation {
        Operation::Dump => dump::write_dump(&model, &mut out).context("writing structured dump")?,
        Operation::Mof => mof::write_mof(&model, &mut out).context("writing MOF source")?,
    }
    out.flush().context("flushing output")?;

    bmf_rs::release(model);
    Ok(())
}
