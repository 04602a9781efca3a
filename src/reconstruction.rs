use crate::cell::ReconstructedCell;
use crate::matcher::{MatchCriteria, contested_targets, find_slice_links};
use crate::slice_index::SliceIndex;

use ndarray::Array2;
use std::collections::HashMap;
use std::io::{self, Write};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReconstructionError {
    #[error("Plane {plane} is outside the stack ({planes} planes)")]
    PlaneOutOfRange { plane: usize, planes: usize },

    #[error("Planes must be extended in order: expected {expected}, got {got}")]
    OutOfSequence { expected: usize, got: usize },
}

/// Incremental linking of regions across planes into 3D cells.
///
/// Seeded with one cell per region of the start plane; every [`extend`]
/// links the next plane boundary. Planes must be extended one at a time in
/// increasing order, since each step reads the lookup written by the one
/// before. Stopping early leaves a valid, truncated reconstruction.
///
/// [`extend`]: Reconstruction::extend
pub struct Reconstruction<'a> {
    planes: &'a [SliceIndex],
    criteria: MatchCriteria,
    next: usize,
    cells: Vec<ReconstructedCell<'a>>,
    /// (plane, region id) -> index into `cells`
    lookup: HashMap<(usize, u32), usize>,
    contested: Vec<(usize, u32)>,
}

impl<'a> Reconstruction<'a> {
    pub fn new(planes: &'a [SliceIndex], start: usize) -> Result<Self, ReconstructionError> {
        Self::with_criteria(planes, start, MatchCriteria::default())
    }

    pub fn with_criteria(
        planes: &'a [SliceIndex],
        start: usize,
        criteria: MatchCriteria,
    ) -> Result<Self, ReconstructionError> {
        let seed = planes
            .get(start)
            .ok_or(ReconstructionError::PlaneOutOfRange {
                plane: start,
                planes: planes.len(),
            })?;

        let mut reconstruction = Self {
            planes,
            criteria,
            next: start,
            cells: Vec::with_capacity(seed.regions().len()),
            lookup: HashMap::new(),
            contested: Vec::new(),
        };
        for (&id, region) in seed.regions() {
            reconstruction.push_cell(start, id, ReconstructedCell::new(start, region));
        }
        debug!(start, cells = reconstruction.cells.len(), "seeded reconstruction");

        Ok(reconstruction)
    }

    fn push_cell(&mut self, plane: usize, id: u32, cell: ReconstructedCell<'a>) {
        self.lookup.insert((plane, id), self.cells.len());
        self.cells.push(cell);
    }

    /// Link plane `plane` to `plane + 1`.
    ///
    /// A linked upper region joins the cell owning its lower region, or starts
    /// a new cell when the lower region has none. The lookup entry for the
    /// upper region is overwritten if two lower regions claimed it.
    pub fn extend(&mut self, plane: usize) -> Result<(), ReconstructionError> {
        if plane != self.next {
            return Err(ReconstructionError::OutOfSequence {
                expected: self.next,
                got: plane,
            });
        }
        let planes = self.planes;
        let (Some(lower), Some(upper)) = (planes.get(plane), planes.get(plane + 1)) else {
            return Err(ReconstructionError::PlaneOutOfRange {
                plane: plane + 1,
                planes: planes.len(),
            });
        };

        let links = find_slice_links(lower, upper, &self.criteria);
        for to in contested_targets(&links) {
            warn!(plane = plane + 1, id = to, "region claimed by several cells");
            self.contested.push((plane + 1, to));
        }

        let mut started = 0;
        for (&from, &to) in &links {
            let Some(region) = upper.region(to) else {
                continue;
            };
            let index = match self.lookup.get(&(plane, from)) {
                Some(&index) => {
                    self.cells[index].add_slice(plane + 1, region);
                    index
                }
                None => {
                    started += 1;
                    let index = self.cells.len();
                    self.cells.push(ReconstructedCell::new(plane + 1, region));
                    index
                }
            };
            self.lookup.insert((plane + 1, to), index);
        }
        debug!(
            plane,
            links = links.len(),
            started,
            "linked plane {} to {}",
            plane,
            plane + 1
        );

        self.next = plane + 1;
        Ok(())
    }

    /// Extend every boundary from the current plane up to `end`
    pub fn extend_to(&mut self, end: usize) -> Result<(), ReconstructionError> {
        for plane in self.next..end {
            self.extend(plane)?;
        }
        Ok(())
    }

    /// The plane the next [`extend`](Reconstruction::extend) call must start from
    pub fn next_plane(&self) -> usize {
        self.next
    }

    /// All cells in creation order
    pub fn cells(&self) -> &[ReconstructedCell<'a>] {
        &self.cells
    }

    /// Cells spanning at least `min_z_extent` planes, in creation order
    pub fn cells_larger_then(&self, min_z_extent: usize) -> Vec<&ReconstructedCell<'a>> {
        self.cells
            .iter()
            .filter(|cell| cell.z_extent() >= min_z_extent)
            .collect()
    }

    /// The cell the region `id` of `plane` was assigned to
    pub fn find_cell(&self, plane: usize, id: u32) -> Option<&ReconstructedCell<'a>> {
        self.lookup.get(&(plane, id)).map(|&index| &self.cells[index])
    }

    /// `(plane, id)` of upper regions that more than one lower region linked to
    pub fn contested(&self) -> &[(usize, u32)] {
        &self.contested
    }

    /// One line per cell listing its `plane:id` pairs
    pub fn write_links<W: Write>(&self, mut writer: W) -> io::Result<()> {
        for cell in &self.cells {
            writeln!(writer, "{}", cell)?;
        }
        writer.flush()
    }

    /// Label planes in which the pixels of each cell spanning at least
    /// `min_z_extent` planes carry that cell's 1-based rank.
    pub fn render_labels(&self, min_z_extent: usize) -> Vec<Array2<u32>> {
        let mut rendered: Vec<Array2<u32>> = self
            .planes
            .iter()
            .map(|plane| Array2::zeros(plane.dim()))
            .collect();

        for (rank, cell) in self.cells_larger_then(min_z_extent).into_iter().enumerate() {
            let label = rank as u32 + 1;
            for (&plane, region) in cell.slices() {
                let target = &mut rendered[plane];
                for pixel in region.pixels() {
                    if let Some(value) = target.get_mut(pixel) {
                        *value = label;
                    }
                }
            }
        }

        rendered
    }
}
