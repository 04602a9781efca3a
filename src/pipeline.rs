use crate::{
    cell::MeasureError,
    enums::SortBy,
    intensity::IntensityStack,
    matcher::MatchCriteria,
    reconstruction::{Reconstruction, ReconstructionError},
    report::{CellReport, write_results},
    slice_index::SliceIndex,
    stack_loader::{LoaderError, StackLoader},
};

use std::{
    fs::{self, File},
    io::BufWriter,
    path::PathBuf,
};
use thiserror::Error;
use tracing::info;
use web_time::Instant;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Loading failed: {0}")]
    Loader(#[from] LoaderError),

    #[error("Reconstruction failed: {0}")]
    Reconstruction(#[from] ReconstructionError),

    #[error("Measurement failed: {0}")]
    Measure(#[from] MeasureError),

    #[error("{labels} label planes but {intensity} intensity planes")]
    PlaneCountMismatch { labels: usize, intensity: usize },

    #[error("Invalid plane range {start}..{end} for {planes} planes")]
    InvalidRange {
        start: usize,
        end: usize,
        planes: usize,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Tunables of one reconstruction run
#[derive(Debug, Clone, PartialEq)]
pub struct ReconstructionConfig {
    /// First plane, 0 when unset
    pub start: Option<usize>,
    /// Last plane, the top of the stack when unset
    pub end: Option<usize>,
    /// Cells spanning fewer planes are not reported
    pub min_z_extent: usize,
    pub criteria: MatchCriteria,
    pub sort_by: SortBy,
}

impl Default for ReconstructionConfig {
    fn default() -> Self {
        Self {
            start: None,
            end: None,
            min_z_extent: 3,
            criteria: MatchCriteria::default(),
            sort_by: SortBy::Natural,
        }
    }
}

/// Inputs and outputs of a run on disk
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunPaths {
    pub segmentation_dir: PathBuf,
    pub intensity_dir: PathBuf,
    pub results_file: PathBuf,
    /// Optional dump of every cell's `plane:id` links
    pub links_file: Option<PathBuf>,
    /// Optional directory for rendered label planes of the reported cells
    pub render_dir: Option<PathBuf>,
}

/// Link planes `start..=end` of `planes` into cells
pub fn reconstruct<'a>(
    planes: &'a [SliceIndex],
    config: &ReconstructionConfig,
) -> Result<Reconstruction<'a>, PipelineError> {
    let start = config.start.unwrap_or(0);
    let end = config.end.unwrap_or_else(|| planes.len().saturating_sub(1));
    if start > end || end >= planes.len() {
        return Err(PipelineError::InvalidRange {
            start,
            end,
            planes: planes.len(),
        });
    }
    info!(start, end, "reconstructing");

    let mut reconstruction = Reconstruction::with_criteria(planes, start, config.criteria)?;
    reconstruction.extend_to(end)?;
    Ok(reconstruction)
}

/// Measure every cell spanning at least `min_z_extent` planes
pub fn measure_cells(
    reconstruction: &Reconstruction<'_>,
    intensity: &IntensityStack,
    min_z_extent: usize,
) -> Result<Vec<CellReport>, MeasureError> {
    reconstruction
        .cells_larger_then(min_z_extent)
        .into_iter()
        .map(|cell| cell.measure(intensity))
        .collect()
}

/// Load both stacks, reconstruct, measure and write the results table
pub fn reconstruct_and_measure(
    paths: &RunPaths,
    config: &ReconstructionConfig,
) -> Result<Vec<CellReport>, PipelineError> {
    info!(
        segmentation = %paths.segmentation_dir.display(),
        intensity = %paths.intensity_dir.display(),
        results = %paths.results_file.display(),
        "starting run"
    );

    let loading = Instant::now();
    let planes = StackLoader::load_label_directory(&paths.segmentation_dir, config.sort_by)?;
    let intensity = StackLoader::load_intensity_directory(&paths.intensity_dir, config.sort_by)?;
    if planes.len() != intensity.len() {
        return Err(PipelineError::PlaneCountMismatch {
            labels: planes.len(),
            intensity: intensity.len(),
        });
    }
    info!(planes = planes.len(), elapsed = ?loading.elapsed(), "loaded stacks");

    let linking = Instant::now();
    let reconstruction = reconstruct(&planes, config)?;
    info!(
        cells = reconstruction.cells().len(),
        contested = reconstruction.contested().len(),
        elapsed = ?linking.elapsed(),
        "reconstruction done"
    );

    let reports = measure_cells(&reconstruction, &intensity, config.min_z_extent)?;
    info!(
        reported = reports.len(),
        min_z_extent = config.min_z_extent,
        "measured cells"
    );

    write_results(&reports, BufWriter::new(File::create(&paths.results_file)?))?;

    if let Some(links_file) = &paths.links_file {
        reconstruction.write_links(BufWriter::new(File::create(links_file)?))?;
    }

    if let Some(render_dir) = &paths.render_dir {
        fs::create_dir_all(render_dir)?;
        for (plane, labels) in reconstruction
            .render_labels(config.min_z_extent)
            .iter()
            .enumerate()
        {
            StackLoader::save_label_plane(labels, render_dir.join(format!("cells{plane}.png")))?;
        }
    }

    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array2;

    fn stack() -> Vec<SliceIndex> {
        // one 3x3 block drifting one column per plane, plus a block that
        // only exists in the first plane
        (0..4)
            .map(|z| {
                let mut labels = Array2::zeros((16, 16));
                for r in 4..7 {
                    for c in 4 + z..7 + z {
                        labels[[r, c]] = 10 + z as u32;
                    }
                }
                if z == 0 {
                    labels[[14, 14]] = 3;
                }
                SliceIndex::new(labels)
            })
            .collect()
    }

    #[test]
    fn full_range_by_default() {
        let planes = stack();
        let reconstruction = reconstruct(&planes, &ReconstructionConfig::default()).unwrap();
        assert_eq!(reconstruction.next_plane(), 3);
        let retained = reconstruction.cells_larger_then(3);
        assert_eq!(retained.len(), 1);
        assert_eq!(retained[0].to_string(), "0:10,1:11,2:12,3:13");
    }

    #[test]
    fn partial_range_truncates_cells() {
        let planes = stack();
        let config = ReconstructionConfig {
            start: Some(1),
            end: Some(2),
            ..ReconstructionConfig::default()
        };
        let reconstruction = reconstruct(&planes, &config).unwrap();
        let names: Vec<_> = reconstruction.cells().iter().map(ToString::to_string).collect();
        assert_eq!(names, vec!["1:11,2:12"]);
    }

    #[test]
    fn invalid_range_is_rejected() {
        let planes = stack();
        let config = ReconstructionConfig {
            start: Some(3),
            end: Some(1),
            ..ReconstructionConfig::default()
        };
        assert!(matches!(
            reconstruct(&planes, &config),
            Err(PipelineError::InvalidRange { start: 3, end: 1, planes: 4 })
        ));

        let config = ReconstructionConfig {
            end: Some(4),
            ..ReconstructionConfig::default()
        };
        assert!(matches!(
            reconstruct(&planes, &config),
            Err(PipelineError::InvalidRange { .. })
        ));
    }

    #[test]
    fn measures_retained_cells_only() {
        let planes = stack();
        let reconstruction = reconstruct(&planes, &ReconstructionConfig::default()).unwrap();
        let intensity = IntensityStack::new(
            (0..4)
                .map(|z| Array2::from_elem((16, 16), (z as u16 + 1) * 10))
                .collect(),
        );

        let reports = measure_cells(&reconstruction, &intensity, 3).unwrap();
        assert_eq!(reports.len(), 1);
        let report = reports[0];
        assert_relative_eq!(report.mean_intensity, 25.0);
        assert_relative_eq!(report.quartile_intensity, 35.0);
        assert_relative_eq!(report.best_intensity, 40.0);
        assert_eq!(report.best_z, 3);
        assert_relative_eq!(report.x, 5.0);
        assert_relative_eq!(report.y, 6.5);
        assert_relative_eq!(report.z, 1.5);
        assert_eq!(report.volume, 36);
        assert_eq!(report.z_extent, 4);
    }
}
