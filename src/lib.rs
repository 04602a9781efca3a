//! # Cell-volume library
//!
//! This crate reconstructs pseudo-3D cells from a stack of independently
//! segmented 2D slices and measures their fluorescence intensity.

//!
//! Every plane of the stack is a label image produced by an external
//! segmentation tool: 0 is background and each other value marks one region
//! (a cell slice). The crate decides which region in plane `z` continues as
//! which region in plane `z + 1`, chains these links into 3D cells and
//! summarises each cell against a separately loaded stack of intensity
//! images.
//!
//! Two regions in adjacent planes are linked when the lower region's centroid
//! falls inside the upper region and
//!  - their area ratio (lower over upper) lies strictly between 0.5 and 1.5
//!  - their centroids are less than 20 pixels apart
//!
//! Label and intensity images are decoded in parallel using rayon; the linking
//! itself walks the planes in order. Label images may be single channel (8 or
//! 16 bit) or unique-colour RGB. Files in a directory are ordered naturally,
//! so `slice2.png` comes before `slice10.png`.
//!
//! # Examples
//!
//! ## Reconstructing and measuring a stack
//!
//! Load the segmentation and intensity directories, link all planes and
//! measure every cell spanning at least three planes.
//!
//! ```no_run
//! # use cell_volume::{StackLoader, Reconstruction, SortBy};
//! let planes = StackLoader::load_label_directory("segmentation", SortBy::Natural)
//!     .expect("should have loaded label images");
//! let intensity = StackLoader::load_intensity_directory("venus", SortBy::Natural)
//!     .expect("should have loaded intensity images");
//!
//! let mut reconstruction =
//!     Reconstruction::new(&planes, 0).expect("stack should not be empty");
//! reconstruction
//!     .extend_to(planes.len() - 1)
//!     .expect("planes should link in order");
//!
//! for cell in reconstruction.cells_larger_then(3) {
//!     let report = cell.measure(&intensity).expect("cell should be measurable");
//!     println!("{cell}: mean intensity {}", report.mean_intensity);
//! }
//! ```

pub mod cell;
pub mod enums;
pub mod intensity;
pub mod matcher;
pub mod pipeline;
pub mod reconstruction;
pub mod region;
pub mod report;
pub mod slice_index;
pub mod stack_loader;

pub use cell::{BestSlice, MeasureError, Point3, ReconstructedCell};
pub use enums::{LabelImage, SortBy};
pub use intensity::IntensityStack;
pub use matcher::{MatchCriteria, contested_targets, find_slice_links, same_cell};
pub use pipeline::{PipelineError, ReconstructionConfig, RunPaths, reconstruct_and_measure};
pub use reconstruction::{Reconstruction, ReconstructionError};
pub use region::{Point2, Region};
pub use report::{CellReport, write_results};
pub use slice_index::SliceIndex;
pub use stack_loader::{LoaderError, StackLoader};
