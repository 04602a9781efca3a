use crate::region::Region;
use crate::slice_index::SliceIndex;

use std::collections::BTreeMap;

/// Thresholds deciding whether two regions in adjacent planes are the same cell.
///
/// All bounds are exclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchCriteria {
    pub min_area_ratio: f64,
    pub max_area_ratio: f64,
    pub max_centroid_distance: f64,
}

impl Default for MatchCriteria {
    fn default() -> Self {
        Self {
            min_area_ratio: 0.5,
            max_area_ratio: 1.5,
            max_centroid_distance: 20.0,
        }
    }
}

impl MatchCriteria {
    /// `lower` and `upper` are the same cell when the area ratio
    /// `area(lower) / area(upper)` and the centroid distance both fall inside
    /// the bounds. The ratio is directional.
    pub fn same_cell(&self, lower: Option<&Region>, upper: Option<&Region>) -> bool {
        let (Some(lower), Some(upper)) = (lower, upper) else {
            return false;
        };

        let area_ratio = lower.pixel_count() as f64 / upper.pixel_count() as f64;
        let distance = lower.centroid().distance(&upper.centroid());

        self.min_area_ratio < area_ratio
            && area_ratio < self.max_area_ratio
            && distance < self.max_centroid_distance
    }
}

/// [`MatchCriteria::same_cell`] with the default thresholds
pub fn same_cell(lower: Option<&Region>, upper: Option<&Region>) -> bool {
    MatchCriteria::default().same_cell(lower, upper)
}

/// Link regions of `lower` to regions of the adjacent `upper` plane.
///
/// Each lower region's centroid is looked up in `upper`; the region found
/// there is accepted when it passes `criteria`. Lower regions without a
/// confident match are absent from the result. Matching runs in one direction
/// only and two lower regions may claim the same upper region; see
/// [`contested_targets`].
pub fn find_slice_links(
    lower: &SliceIndex,
    upper: &SliceIndex,
    criteria: &MatchCriteria,
) -> BTreeMap<u32, u32> {
    lower
        .regions()
        .values()
        .filter_map(|region| {
            let candidate = upper.region_containing(region.centroid())?;
            criteria
                .same_cell(Some(region), Some(candidate))
                .then(|| (region.id(), candidate.id()))
        })
        .collect()
}

/// Upper-plane ids claimed by more than one lower region, ascending
pub fn contested_targets(links: &BTreeMap<u32, u32>) -> Vec<u32> {
    let mut claims: BTreeMap<u32, usize> = BTreeMap::new();
    for &to in links.values() {
        *claims.entry(to).or_default() += 1;
    }

    claims
        .into_iter()
        .filter(|&(_, count)| count > 1)
        .map(|(to, _)| to)
        .collect()
}
