/// A floating point position inside a plane, `x` along rows and `y` along
/// columns (the same order the pixel coordinates are stored in).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point2) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Truncate to the pixel the point falls in, `None` for negative positions
    pub fn to_pixel(self) -> Option<(usize, usize)> {
        if self.x < 0.0 || self.y < 0.0 || !self.x.is_finite() || !self.y.is_finite() {
            return None;
        }
        Some((self.x as usize, self.y as usize))
    }
}

/// One labelled connected area of a single plane (a cell slice).
///
/// Built once when the plane is decoded and never mutated afterwards. Pixel
/// coordinates are kept in row-major scan order.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    id: u32,
    rows: Vec<usize>,
    cols: Vec<usize>,
    centroid: Point2,
}

impl Region {
    /// Create a region from parallel row/column index lists.
    ///
    /// Returns `None` for the background label 0, for an empty pixel set or
    /// when the two lists differ in length.
    pub fn new(id: u32, rows: Vec<usize>, cols: Vec<usize>) -> Option<Self> {
        if id == 0 || rows.is_empty() || rows.len() != cols.len() {
            return None;
        }
        let count = rows.len() as f64;
        let centroid = Point2::new(
            rows.iter().sum::<usize>() as f64 / count,
            cols.iter().sum::<usize>() as f64 / count,
        );
        Some(Self {
            id,
            rows,
            cols,
            centroid,
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    pub fn cols(&self) -> &[usize] {
        &self.cols
    }

    /// Iterate over `(row, col)` pixel positions
    pub fn pixels(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.rows.iter().copied().zip(self.cols.iter().copied())
    }

    pub fn pixel_count(&self) -> usize {
        self.rows.len()
    }

    pub fn centroid(&self) -> Point2 {
        self.centroid
    }
}
