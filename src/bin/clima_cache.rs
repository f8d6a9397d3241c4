//! `clima-cache` — host-side maintenance for a copied history cache.
//!
//! ```text
//! clima-cache dump CACHE out.csv [--utc-offset -10800]
//! clima-cache trim CACHE CACHE.NEW [--utc-offset -10800]
//! ```
//!
//! Both commands go through the same decoder, store and exporter the
//! firmware uses, so a dump is byte-identical to what a monthly export of
//! the same cache would have written.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use clima::history::clock::fixed_offset;
use clima::history::{HISTORY_CAPACITY, RolloverExporter, SampleStore, decode_records, encode_records};

#[derive(Parser, Debug)]
#[command(name = "clima-cache", version, about = "Inspect and repair CLIMA history caches")]
struct Cli {
    /// Device-local UTC offset in seconds (east positive)
    #[arg(long, global = true, default_value_t = -3 * 3600, allow_negative_numbers = true)]
    utc_offset: i32,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render every cached sample in the CSV export format
    Dump { cache: PathBuf, out: PathBuf },
    /// Write a new cache holding only the newest month's samples
    Trim { cache: PathBuf, out: PathBuf },
}

fn load(path: &Path) -> Result<SampleStore<HISTORY_CAPACITY>> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let (samples, partial) = decode_records(&bytes);
    if partial > 0 {
        eprintln!("warning: ignored {partial} trailing bytes of a partial record");
    }
    let (store, skipped) = SampleStore::from_samples(samples);
    if skipped > 0 {
        eprintln!("warning: {skipped} records beyond capacity or out of order were dropped");
    }
    println!("Read entries: {}", store.len());
    Ok(store)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if !(-14 * 3600..=14 * 3600).contains(&cli.utc_offset) {
        bail!("--utc-offset must be within ±14h");
    }

    match cli.command {
        Command::Dump { cache, out } => {
            let store = load(&cache)?;
            let exporter = RolloverExporter::new(cli.utc_offset, HISTORY_CAPACITY);
            fs::write(&out, exporter.render_csv(store.all()))
                .with_context(|| format!("writing {}", out.display()))?;
            println!("Wrote {}", out.display());
        }
        Command::Trim { cache, out } => {
            let mut store = load(&cache)?;
            if store.is_empty() {
                bail!("{} holds no samples", cache.display());
            }
            let removed = store.retain_latest_month(fixed_offset(cli.utc_offset));
            fs::write(&out, encode_records(store.all()))
                .with_context(|| format!("writing {}", out.display()))?;
            println!("Kept {} entries, removed {}", store.len(), removed);
        }
    }
    Ok(())
}
