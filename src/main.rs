use std::path::PathBuf;

use anyhow::{Context, Result};
use cell_volume::{
    enums::SortBy,
    matcher::MatchCriteria,
    pipeline::{ReconstructionConfig, RunPaths, reconstruct_and_measure},
};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Reconstruct pseudo-3D cells from segmented slices and measure their intensity
#[derive(Parser)]
#[command(name = "cell-volume")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Directory containing segmented (label) images
    seg_dir: PathBuf,

    /// Directory containing intensity images, one per segmented image
    measure_dir: PathBuf,

    /// File the results table is written to
    results_file: PathBuf,

    /// First plane
    #[arg(long)]
    z_start: Option<usize>,

    /// Last plane
    #[arg(long)]
    z_end: Option<usize>,

    /// Only report cells spanning at least this many planes
    #[arg(long, default_value_t = 3)]
    min_z_extent: usize,

    /// Lower bound (exclusive) of the lower/upper area ratio
    #[arg(long, default_value_t = 0.5)]
    min_area_ratio: f64,

    /// Upper bound (exclusive) of the lower/upper area ratio
    #[arg(long, default_value_t = 1.5)]
    max_area_ratio: f64,

    /// Maximum (exclusive) centroid distance in pixels
    #[arg(long, default_value_t = 20.0)]
    max_distance: f64,

    /// How image files are ordered into planes
    #[arg(long, value_enum, default_value_t = Order::Natural)]
    order: Order,

    /// Write every cell's plane:id links to this file
    #[arg(long)]
    links: Option<PathBuf>,

    /// Write label images of the reported cells into this directory
    #[arg(long)]
    render_dir: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Order {
    Natural,
    Lexical,
}

impl From<Order> for SortBy {
    fn from(order: Order) -> Self {
        match order {
            Order::Natural => SortBy::Natural,
            Order::Lexical => SortBy::Lexical,
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let paths = RunPaths {
        segmentation_dir: cli.seg_dir,
        intensity_dir: cli.measure_dir,
        results_file: cli.results_file,
        links_file: cli.links,
        render_dir: cli.render_dir,
    };
    let config = ReconstructionConfig {
        start: cli.z_start,
        end: cli.z_end,
        min_z_extent: cli.min_z_extent,
        criteria: MatchCriteria {
            min_area_ratio: cli.min_area_ratio,
            max_area_ratio: cli.max_area_ratio,
            max_centroid_distance: cli.max_distance,
        },
        sort_by: cli.order.into(),
    };

    let reports = reconstruct_and_measure(&paths, &config).with_context(|| {
        format!(
            "failed to reconstruct {}",
            paths.segmentation_dir.display()
        )
    })?;
    info!(
        cells = reports.len(),
        results = %paths.results_file.display(),
        "done"
    );
    Ok(())
}
