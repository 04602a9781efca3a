use crate::region::{Point2, Region};

use ndarray::Array2;
use std::collections::BTreeMap;

/// All labelled regions of one plane.
///
/// Regions are decoded eagerly when the index is built; the raw label array is
/// kept for point queries.
#[derive(Debug, Clone)]
pub struct SliceIndex {
    labels: Array2<u32>,
    regions: BTreeMap<u32, Region>,
}

impl SliceIndex {
    /// Group the pixel coordinates of every nonzero label into a [`Region`].
    /// Label 0 is background and never becomes a region.
    pub fn new(labels: Array2<u32>) -> Self {
        let mut pixels: BTreeMap<u32, (Vec<usize>, Vec<usize>)> = BTreeMap::new();
        for ((row, col), &label) in labels.indexed_iter() {
            if label == 0 {
                continue;
            }
            let (rows, cols) = pixels.entry(label).or_default();
            rows.push(row);
            cols.push(col);
        }

        let regions = pixels
            .into_iter()
            .filter_map(|(id, (rows, cols))| Region::new(id, rows, cols).map(|r| (id, r)))
            .collect();

        Self { labels, regions }
    }

    /// Get the dimensions of the plane (height, width)
    pub fn dim(&self) -> (usize, usize) {
        self.labels.dim()
    }

    /// Get a reference to the underlying label array
    pub fn labels(&self) -> &Array2<u32> {
        &self.labels
    }

    /// Regions keyed by label id, in ascending id order
    pub fn regions(&self) -> &BTreeMap<u32, Region> {
        &self.regions
    }

    pub fn region(&self, id: u32) -> Option<&Region> {
        self.regions.get(&id)
    }

    pub fn region_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.regions.keys().copied()
    }

    /// Label at `(row, col)`, `None` for background or out-of-bounds points
    pub fn region_id_at(&self, position: (usize, usize)) -> Option<u32> {
        match self.labels.get(position) {
            Some(&0) | None => None,
            Some(&label) => Some(label),
        }
    }

    /// The region whose label covers the pixel `point` falls in
    pub fn region_containing(&self, point: Point2) -> Option<&Region> {
        let id = self.region_id_at(point.to_pixel()?)?;
        self.regions.get(&id)
    }

    /// Number of pixels carrying any nonzero label
    pub fn segmented_area(&self) -> usize {
        self.regions.values().map(Region::pixel_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn index() -> SliceIndex {
        SliceIndex::new(array![
            [0, 0, 2, 2],
            [5, 0, 2, 2],
            [5, 5, 0, 0],
        ])
    }

    #[test]
    fn regions_group_pixels_by_label() {
        let index = index();
        assert_eq!(index.region_ids().collect::<Vec<_>>(), vec![2, 5]);

        let two = index.region(2).unwrap();
        assert_eq!(two.rows(), &[0, 0, 1, 1]);
        assert_eq!(two.cols(), &[2, 3, 2, 3]);

        let five = index.region(5).unwrap();
        assert_eq!(five.pixel_count(), 3);
    }

    #[test]
    fn background_is_never_a_region() {
        let index = index();
        assert!(index.region(0).is_none());
        assert_eq!(index.regions().len(), 2);
    }

    #[test]
    fn every_label_has_a_region() {
        let index = index();
        for &label in index.labels().iter().filter(|&&l| l != 0) {
            assert!(index.region(label).is_some());
        }
    }

    #[test]
    fn region_containing_is_soft_on_background() {
        let index = index();
        assert_eq!(
            index.region_containing(Point2::new(0.5, 2.7)).map(Region::id),
            Some(2)
        );
        assert!(index.region_containing(Point2::new(0.0, 0.0)).is_none());
        assert!(index.region_containing(Point2::new(10.0, 10.0)).is_none());
    }

    #[test]
    fn segmented_area_counts_foreground() {
        assert_eq!(index().segmented_area(), 7);
    }

    #[test]
    fn empty_plane_has_no_regions() {
        let index = SliceIndex::new(Array2::zeros((4, 4)));
        assert!(index.regions().is_empty());
        assert_eq!(index.segmented_area(), 0);
    }
}
