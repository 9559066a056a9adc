//! yadump - print a yyast file
//!
//! Usage:
//!   yadump [--format text|json] [-v...] <file>

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use yyast::{codec, driver, dump};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Indented tree, one node per line
    Text,
    /// The decoded tree as JSON
    Json,
}

/// Decode and print a yyast file
#[derive(Parser, Debug)]
#[command(name = "yadump")]
struct Args {
    /// File to dump
    file: PathBuf,

    /// Output format
    #[arg(short = 'f', long = "format", value_enum, default_value_t = Format::Text)]
    format: Format,

    #[command(flatten)]
    verbose: Verbosity<WarnLevel>,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:#}");
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    driver::init_logger(args.verbose.log_level_filter());

    let bytes = fs::read(&args.file).with_context(|| format!("Failed to read {}", args.file.display()))?;
    let (root, used) = codec::decode_node(&bytes)
        .with_context(|| format!("Failed to decode {}", args.file.display()))?;
    if used != bytes.len() {
        log::warn!(
            "{} has {} bytes after the root node",
            args.file.display(),
            bytes.len() - used
        );
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match args.format {
        Format::Text => dump::dump_text(&mut out, &root)?,
        Format::Json => dump::dump_json(&mut out, &root)?,
    }
    out.flush()?;
    Ok(())
}
