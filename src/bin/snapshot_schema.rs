use anyhow::{Context, Result};
use clap::Parser;
use pqsplit::schema::{derive_types, sample_csv, write_snapshot};
use pqsplit::table::resolve_sources;
use std::path::PathBuf;
use tracing::info;

/// Derive the schema snapshot the cleaner needs from a sample of the raw files.
#[derive(Parser)]
#[command(author, version)]
struct Args {
    /// Glob of raw files; the first match is sampled
    #[arg(long)]
    sources: String,
    /// Directory to write meta_data.json into
    #[arg(long, default_value = ".")]
    out: PathBuf,
    #[arg(long, default_value_t = 10_000)]
    sample_rows: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();

    let paths = resolve_sources(&args.sources)?;
    let first = &paths[0];
    info!("sampling {} of {} files", first.display(), paths.len());

    let (headers, rows) = sample_csv(first, args.sample_rows)?;
    let cols = derive_types(&headers, &rows)
        .with_context(|| format!("deriving types from {}", first.display()))?;

    let path = write_snapshot(&args.out, &cols)?;
    info!(columns = cols.len(), "wrote {}", path.display());
    Ok(())
}
