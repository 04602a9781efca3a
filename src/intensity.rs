use ndarray::Array2;

/// Grayscale measurement planes, aligned by index with the label planes.
#[derive(Debug, Clone, Default)]
pub struct IntensityStack {
    planes: Vec<Array2<u16>>,
}

impl IntensityStack {
    pub fn new(planes: Vec<Array2<u16>>) -> Self {
        Self { planes }
    }

    pub fn len(&self) -> usize {
        self.planes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.planes.is_empty()
    }

    pub fn plane(&self, index: usize) -> Option<&Array2<u16>> {
        self.planes.get(index)
    }

    pub fn planes(&self) -> &[Array2<u16>] {
        &self.planes
    }
}

impl From<Vec<Array2<u16>>> for IntensityStack {
    fn from(planes: Vec<Array2<u16>>) -> Self {
        Self::new(planes)
    }
}
