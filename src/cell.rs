use crate::intensity::IntensityStack;
use crate::region::{Point2, Region};
use crate::report::CellReport;

use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum MeasureError {
    #[error("Cell has no planes")]
    EmptyCell,

    #[error("Cell covers no pixels")]
    ZeroPixelArea,

    #[error("Plane {plane} is outside the intensity stack ({planes} planes)")]
    PlaneOutOfRange { plane: usize, planes: usize },

    #[error("Pixel ({row}, {col}) is outside intensity plane {plane}")]
    PixelOutOfBounds { plane: usize, row: usize, col: usize },
}

/// Centroid of a reconstructed cell; `z` is in plane units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// The plane with the highest mean intensity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BestSlice {
    pub intensity: f64,
    /// Zero-based position among the cell's planes in ascending order
    pub position: usize,
    /// Absolute plane index
    pub plane: usize,
}

/// One pseudo-3D cell: at most one region per plane, keyed by plane index.
///
/// Regions are borrowed from the [`SliceIndex`](crate::slice_index::SliceIndex)
/// that decoded them.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconstructedCell<'a> {
    slices: BTreeMap<usize, &'a Region>,
}

impl<'a> ReconstructedCell<'a> {
    pub fn new(plane: usize, region: &'a Region) -> Self {
        Self {
            slices: BTreeMap::from([(plane, region)]),
        }
    }

    pub fn add_slice(&mut self, plane: usize, region: &'a Region) {
        self.slices.insert(plane, region);
    }

    /// Regions by plane, ascending
    pub fn slices(&self) -> &BTreeMap<usize, &'a Region> {
        &self.slices
    }

    pub fn region_at(&self, plane: usize) -> Option<&'a Region> {
        self.slices.get(&plane).copied()
    }

    pub fn pixel_area(&self) -> usize {
        self.slices.values().map(|region| region.pixel_count()).sum()
    }

    pub fn z_extent(&self) -> usize {
        self.slices.len()
    }

    /// Unweighted mean of the per-plane centroids and of the plane indices.
    /// Every plane counts once regardless of its area.
    pub fn centroid(&self) -> Result<Point3, MeasureError> {
        if self.slices.is_empty() {
            return Err(MeasureError::EmptyCell);
        }
        let count = self.slices.len() as f64;
        let (sum, z_sum) = self.slices.iter().fold(
            (Point2::default(), 0.0),
            |(sum, z_sum), (&plane, region)| {
                let c = region.centroid();
                (Point2::new(sum.x + c.x, sum.y + c.y), z_sum + plane as f64)
            },
        );
        Ok(Point3 {
            x: sum.x / count,
            y: sum.y / count,
            z: z_sum / count,
        })
    }

    /// Intensity values under each plane's region, in plane order
    fn sample(
        &self,
        intensity: &IntensityStack,
    ) -> Result<Vec<(usize, Vec<u16>)>, MeasureError> {
        if self.slices.is_empty() {
            return Err(MeasureError::EmptyCell);
        }
        self.slices
            .iter()
            .map(|(&plane, region)| -> Result<_, MeasureError> {
                let image = intensity
                    .plane(plane)
                    .ok_or(MeasureError::PlaneOutOfRange {
                        plane,
                        planes: intensity.len(),
                    })?;
                let values = region
                    .pixels()
                    .map(|(row, col)| {
                        image
                            .get((row, col))
                            .copied()
                            .ok_or(MeasureError::PixelOutOfBounds { plane, row, col })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((plane, values))
            })
            .collect()
    }

    pub fn total_intensity(&self, intensity: &IntensityStack) -> Result<u64, MeasureError> {
        Ok(self
            .sample(intensity)?
            .iter()
            .flat_map(|(_, values)| values.iter())
            .map(|&v| u64::from(v))
            .sum())
    }

    pub fn mean_intensity(&self, intensity: &IntensityStack) -> Result<f64, MeasureError> {
        let total = self.total_intensity(intensity)?;
        let area = self.pixel_area();
        if area == 0 {
            return Err(MeasureError::ZeroPixelArea);
        }
        Ok(total as f64 / area as f64)
    }

    /// Mean of the upper half of all sampled values, split at `len / 2`.
    ///
    /// Values are concatenated in plane order and are not sorted, so this is
    /// the mean of the later half of the samples, not a percentile.
    pub fn quartile_intensity(&self, intensity: &IntensityStack) -> Result<f64, MeasureError> {
        let values: Vec<u16> = self
            .sample(intensity)?
            .into_iter()
            .flat_map(|(_, values)| values)
            .collect();
        let upper = &values[values.len() / 2..];
        if upper.is_empty() {
            return Err(MeasureError::ZeroPixelArea);
        }
        let sum: u64 = upper.iter().map(|&v| u64::from(v)).sum();
        Ok(sum as f64 / upper.len() as f64)
    }

    /// Plane with the highest mean intensity; ties go to the lowest plane.
    pub fn best_slice(&self, intensity: &IntensityStack) -> Result<BestSlice, MeasureError> {
        let mut best: Option<BestSlice> = None;
        for (position, (plane, values)) in self.sample(intensity)?.into_iter().enumerate() {
            if values.is_empty() {
                return Err(MeasureError::ZeroPixelArea);
            }
            let sum: u64 = values.iter().map(|&v| u64::from(v)).sum();
            let mean = sum as f64 / values.len() as f64;
            if best.is_none_or(|b| mean > b.intensity) {
                best = Some(BestSlice {
                    intensity: mean,
                    position,
                    plane,
                });
            }
        }
        best.ok_or(MeasureError::EmptyCell)
    }

    /// All summary fields of one result row
    pub fn measure(&self, intensity: &IntensityStack) -> Result<CellReport, MeasureError> {
        let centroid = self.centroid()?;
        let best = self.best_slice(intensity)?;
        Ok(CellReport {
            mean_intensity: self.mean_intensity(intensity)?,
            quartile_intensity: self.quartile_intensity(intensity)?,
            best_intensity: best.intensity,
            best_z: best.position,
            x: centroid.x,
            y: centroid.y,
            z: centroid.z,
            volume: self.pixel_area(),
            z_extent: self.z_extent(),
        })
    }
}

/// `plane:id` pairs in plane order, e.g. `3:12,4:9,5:9`
impl fmt::Display for ReconstructedCell<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (plane, region)) in self.slices.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}:{}", plane, region.id())?;
        }
        Ok(())
    }
}
