use crate::{
    enums::{LabelImage, SortBy, unpack_rgb},
    intensity::IntensityStack,
    slice_index::SliceIndex,
};

use image::{ColorType, DynamicImage, ImageFormat, Rgb, RgbImage};
use ndarray::{Array2, Array3};
use rayon::prelude::*;
use std::{
    cmp::Ordering,
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("No images found in {0:?}")]
    NoValidImages(PathBuf),

    #[error("Inconsistent image dimensions: expected {expected:?}, found {found:?} in {path:?}")]
    InconsistentDimensions {
        expected: (usize, usize),
        found: (usize, usize),
        path: PathBuf,
    },

    #[error("Unsupported label image color type {0:?}")]
    UnsupportedColorType(ColorType),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

pub struct StackLoader;

impl StackLoader {
    /// List the image files of a directory in plane order
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be read or holds no image files
    pub fn list_images(
        path: impl AsRef<Path>,
        sort_by: SortBy,
    ) -> Result<Vec<PathBuf>, LoaderError> {
        let mut paths: Vec<_> = fs::read_dir(path.as_ref())?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && ImageFormat::from_path(path).is_ok())
            .collect();

        if paths.is_empty() {
            return Err(LoaderError::NoValidImages(path.as_ref().to_path_buf()));
        }

        Self::sort_paths(&mut paths, sort_by);
        Ok(paths)
    }

    /// Load label planes from file paths, decoding regions in parallel
    pub fn load_label_planes(
        paths: &[impl AsRef<Path> + Sync],
    ) -> Result<Vec<SliceIndex>, LoaderError> {
        let planes: Vec<_> = paths
            .par_iter()
            .map(|path| -> Result<_, LoaderError> {
                let labels = Self::decode_label_image(path.as_ref())?.into_labels();
                Ok((path.as_ref().to_path_buf(), SliceIndex::new(labels)))
            })
            .collect::<Result<_, _>>()?;

        Self::validate_dimensions(
            planes
                .iter()
                .map(|(path, plane)| (path.as_path(), plane.dim())),
        )?;
        debug!(planes = planes.len(), "decoded label planes");

        Ok(planes.into_iter().map(|(_, plane)| plane).collect())
    }

    /// Load label planes from a directory of segmentation images
    pub fn load_label_directory(
        path: impl AsRef<Path>,
        sort_by: SortBy,
    ) -> Result<Vec<SliceIndex>, LoaderError> {
        Self::load_label_planes(&Self::list_images(path, sort_by)?)
    }

    /// Load grayscale measurement planes from file paths
    pub fn load_intensity_planes(
        paths: &[impl AsRef<Path> + Sync],
    ) -> Result<IntensityStack, LoaderError> {
        let planes: Vec<_> = paths
            .par_iter()
            .map(|path| -> Result<_, LoaderError> {
                let image = Self::decode_intensity_image(path.as_ref())?;
                Ok((path.as_ref().to_path_buf(), image))
            })
            .collect::<Result<_, _>>()?;

        Self::validate_dimensions(
            planes
                .iter()
                .map(|(path, image)| (path.as_path(), image.dim())),
        )?;
        debug!(planes = planes.len(), "decoded intensity planes");

        Ok(planes.into_iter().map(|(_, image)| image).collect::<Vec<_>>().into())
    }

    /// Load grayscale measurement planes from a directory
    pub fn load_intensity_directory(
        path: impl AsRef<Path>,
        sort_by: SortBy,
    ) -> Result<IntensityStack, LoaderError> {
        Self::load_intensity_planes(&Self::list_images(path, sort_by)?)
    }

    /// Decode a segmentation image. Single channel images keep their values,
    /// 8-bit colour images are treated as unique-colour labels.
    pub fn decode_label_image(path: &Path) -> Result<LabelImage, LoaderError> {
        let image = image::open(path)?;
        let (width, height) = (image.width() as usize, image.height() as usize);

        let labels = match image {
            DynamicImage::ImageLuma8(buffer) => LabelImage::Grayscale(Array2::from_shape_vec(
                (height, width),
                buffer.into_raw().into_iter().map(u32::from).collect(),
            )?),
            DynamicImage::ImageLuma16(buffer) => LabelImage::Grayscale(Array2::from_shape_vec(
                (height, width),
                buffer.into_raw().into_iter().map(u32::from).collect(),
            )?),
            DynamicImage::ImageRgb8(buffer) => {
                LabelImage::Rgb(Array3::from_shape_vec((height, width, 3), buffer.into_raw())?)
            }
            rgba @ DynamicImage::ImageRgba8(_) => LabelImage::Rgb(Array3::from_shape_vec(
                (height, width, 3),
                rgba.into_rgb8().into_raw(),
            )?),
            other => return Err(LoaderError::UnsupportedColorType(other.color())),
        };
        Ok(labels)
    }

    /// Decode a measurement image. 8- and 16-bit grayscale keep their raw
    /// values, anything else is converted to 16-bit luma.
    pub fn decode_intensity_image(path: &Path) -> Result<Array2<u16>, LoaderError> {
        let image = image::open(path)?;
        let (width, height) = (image.width() as usize, image.height() as usize);

        let values: Vec<u16> = match image {
            DynamicImage::ImageLuma8(buffer) => {
                buffer.into_raw().into_iter().map(u16::from).collect()
            }
            DynamicImage::ImageLuma16(buffer) => buffer.into_raw(),
            other => other.into_luma16().into_raw(),
        };
        Ok(Array2::from_shape_vec((height, width), values)?)
    }

    /// Save a label plane as an RGB image packing each label into its colour
    pub fn save_label_plane(
        labels: &Array2<u32>,
        path: impl AsRef<Path>,
    ) -> Result<(), LoaderError> {
        let (height, width) = labels.dim();
        let image = RgbImage::from_fn(width as u32, height as u32, |x, y| {
            Rgb(unpack_rgb(labels[[y as usize, x as usize]]))
        });
        image.save(path.as_ref())?;
        Ok(())
    }

    fn sort_paths(paths: &mut [PathBuf], sort_by: SortBy) {
        let name = |path: &PathBuf| {
            path.file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default()
        };
        match sort_by {
            SortBy::Natural => paths.sort_by(|a, b| natural_cmp(&name(a), &name(b))),
            SortBy::Lexical => paths.sort_by_key(name),
            SortBy::None => {}
        }
    }

    fn validate_dimensions<'p>(
        mut dims: impl Iterator<Item = (&'p Path, (usize, usize))>,
    ) -> Result<(), LoaderError> {
        let Some((_, expected)) = dims.next() else {
            return Ok(());
        };
        match dims.find(|&(_, dim)| dim != expected) {
            Some((path, found)) => Err(LoaderError::InconsistentDimensions {
                expected,
                found,
                path: path.to_path_buf(),
            }),
            None => Ok(()),
        }
    }
}

/// Compare file names the way people expect: runs of digits compare by value
/// (`z2` before `z10`), everything else byte by byte.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let split = |s: &str| -> Vec<Vec<u8>> {
        s.as_bytes()
            .chunk_by(|x, y| x.is_ascii_digit() == y.is_ascii_digit())
            .map(<[u8]>::to_vec)
            .collect()
    };
    let (left, right) = (split(a), split(b));

    for (l, r) in left.iter().zip(right.iter()) {
        let ordering = if l[0].is_ascii_digit() && r[0].is_ascii_digit() {
            let l = trim_zeros(l);
            let r = trim_zeros(r);
            l.len().cmp(&r.len()).then_with(|| l.cmp(r))
        } else {
            l.cmp(r)
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    left.len().cmp(&right.len()).then_with(|| a.cmp(b))
}

fn trim_zeros(digits: &[u8]) -> &[u8] {
    let start = digits.iter().position(|&d| d != b'0').unwrap_or(digits.len());
    &digits[start..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, ImageBuffer, Luma};
    use ndarray::array;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir =
            std::env::temp_dir().join(format!("cell-volume-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn natural_order_compares_numbers_by_value() {
        let mut names = vec!["z10.png", "z2.png", "z1.png", "z02b.png", "a.png"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(names, vec!["a.png", "z1.png", "z2.png", "z02b.png", "z10.png"]);
    }

    #[test]
    fn natural_order_is_total_on_equal_values() {
        assert_eq!(natural_cmp("s01", "s1"), Ordering::Less);
        assert_eq!(natural_cmp("same", "same"), Ordering::Equal);
    }

    #[test]
    fn directory_listing_skips_non_images_and_sorts() {
        let dir = scratch_dir("listing");
        for name in ["slice10.png", "slice2.png", "slice1.png"] {
            GrayImage::new(2, 2).save(dir.join(name)).unwrap();
        }
        fs::write(dir.join("notes.txt"), "not an image").unwrap();

        let paths = StackLoader::list_images(&dir, SortBy::Natural).unwrap();
        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["slice1.png", "slice2.png", "slice10.png"]);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn empty_directory_has_no_images() {
        let dir = scratch_dir("empty");
        assert!(matches!(
            StackLoader::list_images(&dir, SortBy::Natural),
            Err(LoaderError::NoValidImages(_))
        ));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn grayscale_labels_decode_to_regions() {
        let dir = scratch_dir("gray-labels");
        let mut image = GrayImage::new(4, 3);
        image.put_pixel(1, 0, Luma([9]));
        image.put_pixel(2, 0, Luma([9]));
        image.put_pixel(3, 2, Luma([4]));
        image.save(dir.join("0.png")).unwrap();

        let planes = StackLoader::load_label_directory(&dir, SortBy::Natural).unwrap();
        assert_eq!(planes.len(), 1);
        assert_eq!(planes[0].dim(), (3, 4));
        assert_eq!(planes[0].region_ids().collect::<Vec<_>>(), vec![4, 9]);
        assert_eq!(planes[0].region(9).unwrap().cols(), &[1, 2]);
        assert_eq!(planes[0].region(4).unwrap().rows(), &[2]);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn saved_label_planes_decode_as_rgb_labels() {
        let dir = scratch_dir("rgb-labels");
        let labels = array![[0u32, 70_000], [258, 0]];
        let path = dir.join("rendered.png");
        StackLoader::save_label_plane(&labels, &path).unwrap();

        let decoded = StackLoader::decode_label_image(&path).unwrap();
        assert!(matches!(decoded, LabelImage::Rgb(_)));
        assert_eq!(decoded.into_labels(), labels);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn intensity_keeps_raw_values() {
        let dir = scratch_dir("intensity");
        let eight = GrayImage::from_raw(2, 1, vec![3, 250]).unwrap();
        eight.save(dir.join("0.png")).unwrap();
        let sixteen: ImageBuffer<Luma<u16>, Vec<u16>> =
            ImageBuffer::from_raw(2, 1, vec![1000, 60_000]).unwrap();
        sixteen.save(dir.join("1.png")).unwrap();

        let stack = StackLoader::load_intensity_directory(&dir, SortBy::Natural).unwrap();
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.plane(0).unwrap(), &array![[3u16, 250]]);
        assert_eq!(stack.plane(1).unwrap(), &array![[1000u16, 60_000]]);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn mismatched_plane_sizes_are_rejected() {
        let dir = scratch_dir("mismatch");
        GrayImage::new(4, 4).save(dir.join("0.png")).unwrap();
        GrayImage::new(5, 4).save(dir.join("1.png")).unwrap();

        assert!(matches!(
            StackLoader::load_label_directory(&dir, SortBy::Natural),
            Err(LoaderError::InconsistentDimensions {
                expected: (4, 4),
                found: (4, 5),
                ..
            })
        ));

        let _ = fs::remove_dir_all(&dir);
    }
}
