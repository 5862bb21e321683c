use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use carousel::store::JsonStore;
use carousel::{parse_retention, resize, ResizeRequest, Schema};
use clap::Parser;

#[derive(Parser)]
#[command(name = "carousel-resize")]
#[command(about = "Rewrite a store's retention schema, re-binning existing data")]
struct Cli {
    /// Store file to resize
    path: PathBuf,

    /// New retention as precision:points (e.g. 60:1440, 15m:8, 1h:7d)
    #[arg(required = true)]
    retentions: Vec<String>,

    /// Override the x-files-factor for the new store
    #[arg(long)]
    x_files_factor: Option<f64>,

    /// Override the aggregation method (average, sum, min, max, last, avg_zero)
    #[arg(long)]
    aggregation_method: Option<String>,

    /// Permit a destructive change (dropped or truncated archives)
    #[arg(long)]
    force: bool,

    /// Write the migrated store here and leave the original in place
    #[arg(long)]
    newfile: Option<PathBuf>,

    /// Delete the .bak file after a successful swap
    #[arg(long)]
    nobackup: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let specs = cli
        .retentions
        .iter()
        .map(|def| parse_retention(def))
        .collect::<carousel::Result<Vec<_>>>()?;
    let schema = Schema::from_specs(specs)?;

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("clock before epoch")?
        .as_secs();

    let request = ResizeRequest {
        path: cli.path,
        schema,
        x_files_factor: cli.x_files_factor,
        aggregation_method: cli.aggregation_method,
        force: cli.force,
        newfile: cli.newfile,
        keep_backup: !cli.nobackup,
        now,
    };
    let stats = resize(&JsonStore::new(now), &request)?;
    println!(
        "migrated {} archives, wrote {} points",
        stats.archives_migrated, stats.points_written
    );
    Ok(())
}
