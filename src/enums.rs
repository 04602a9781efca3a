use ndarray::{Array2, Array3};

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortBy {
    /// Digit runs compare by value, so `slice2` sorts before `slice10`
    #[default]
    Natural,
    Lexical,
    None,
}

/// A decoded label plane, tagged by the pixel layout it came in.
///
/// Segmentation tools save labels either as a single integer channel or as
/// unique RGB colours. The variant is chosen once when the file is decoded;
/// everything downstream works on the flattened label array.
#[derive(Debug, Clone)]
pub enum LabelImage {
    Grayscale(Array2<u32>),
    /// (height, width, channel) with channels in R, G, B order
    Rgb(Array3<u8>),
}

impl LabelImage {
    /// Get the dimensions of the plane (height, width)
    pub fn dim(&self) -> (usize, usize) {
        match self {
            LabelImage::Grayscale(labels) => labels.dim(),
            LabelImage::Rgb(pixels) => {
                let (height, width, _) = pixels.dim();
                (height, width)
            }
        }
    }

    /// Flatten into one integer label per pixel. RGB colours are packed as
    /// `r << 16 | g << 8 | b`, so black stays background.
    pub fn into_labels(self) -> Array2<u32> {
        match self {
            LabelImage::Grayscale(labels) => labels,
            LabelImage::Rgb(pixels) => {
                let (height, width, _) = pixels.dim();
                Array2::from_shape_fn((height, width), |(row, col)| {
                    pack_rgb(
                        pixels[[row, col, 0]],
                        pixels[[row, col, 1]],
                        pixels[[row, col, 2]],
                    )
                })
            }
        }
    }
}

#[inline]
pub(crate) fn pack_rgb(r: u8, g: u8, b: u8) -> u32 {
    (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b)
}

#[inline]
pub(crate) fn unpack_rgb(label: u32) -> [u8; 3] {
    [(label >> 16) as u8, (label >> 8) as u8, label as u8]
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn grayscale_labels_pass_through() {
        let labels = array![[0u32, 3], [3, 7]];
        let image = LabelImage::Grayscale(labels.clone());
        assert_eq!(image.dim(), (2, 2));
        assert_eq!(image.into_labels(), labels);
    }

    #[test]
    fn rgb_labels_are_packed() {
        let mut pixels = Array3::<u8>::zeros((1, 2, 3));
        pixels[[0, 1, 0]] = 1;
        pixels[[0, 1, 2]] = 5;
        let image = LabelImage::Rgb(pixels);
        assert_eq!(image.dim(), (1, 2));
        assert_eq!(image.into_labels(), array![[0u32, (1 << 16) | 5]]);
    }

    #[test]
    fn unpack_inverts_pack() {
        let label = pack_rgb(12, 200, 7);
        assert_eq!(unpack_rgb(label), [12, 200, 7]);
    }
}
