use anyhow::{Context, Result};
use clap::Parser;
use pqsplit::{OutputFormat, Pipeline, PipelineConfig};
use std::{path::PathBuf, time::Duration};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Split power-quality measurement files into hi / hu / parameter / other datasets"
)]
struct Args {
    /// Working directory holding the schema snapshot and the data/ output tree
    #[arg(long, default_value = ".")]
    working_dir: PathBuf,
    /// Glob of raw files to read [default: <working_dir>/PQI_raw/*]
    #[arg(long)]
    sources: Option<String>,
    /// Schema snapshot, relative to the working directory
    #[arg(long, default_value = pqsplit::schema::SNAPSHOT_FILE)]
    snapshot: PathBuf,
    #[arg(long, default_value_t = pqsplit::config::ROWS_PER_PARTITION)]
    rows_per_partition: usize,
    #[arg(long, default_value_t = pqsplit::config::PARTITION_DIVISOR)]
    partition_divisor: usize,
    /// Worker threads (0 = one per core)
    #[arg(long, default_value_t = 0)]
    threads: usize,
    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,
    /// Seconds between memory reports (0 disables)
    #[arg(long, default_value_t = 30)]
    monitor_secs: u64,
}

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();

    // ─── 2) configure ────────────────────────────────────────────────
    let args = Args::parse();
    let sources = args.sources.unwrap_or_else(|| {
        args.working_dir
            .join("PQI_raw")
            .join("*")
            .to_string_lossy()
            .into_owned()
    });

    let mut config = PipelineConfig::new(&args.working_dir, sources);
    config.snapshot = args.snapshot;
    config.rows_per_partition = args.rows_per_partition;
    config.partition_divisor = args.partition_divisor;
    config.threads = args.threads;
    config.format = args.format;
    config.monitor_interval = (args.monitor_secs > 0).then(|| Duration::from_secs(args.monitor_secs));

    // ─── 3) run ──────────────────────────────────────────────────────
    let report = Pipeline::new(config)
        .run()
        .context("cleaning run failed")?;

    for e in &report.unassigned {
        warn!("{}", e);
    }
    for s in &report.written {
        info!(table = %s.table, partitions = s.partitions, rows = s.rows, dir = %s.dir.display(), "written");
    }
    info!("Done!");
    Ok(())
}
