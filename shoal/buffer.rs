use ndarray::{Array2, Array3, ArrayView3, ArrayViewMut3, Axis};

use crate::types::SAMPLE_MAX;

/// Interleaved image samples laid out as `(height, width, channels)`.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer<T> {
    data: Array3<T>,
}

pub type Raster = PixelBuffer<u8>;

// working samples for the colour transform and the engine
pub type Samples = PixelBuffer<f32>;

impl<T: Clone + Default> PixelBuffer<T> {
    pub fn zeros(width: usize, height: usize, channels: usize) -> Self {
        Self {
            data: Array3::from_elem((height, width, channels), T::default()),
        }
    }

    pub fn from_raw(width: usize, height: usize, channels: usize, raw: Vec<T>) -> Option<Self> {
        Array3::from_shape_vec((height, width, channels), raw)
            .ok()
            .map(Self::new)
    }

    pub fn plane(&self, c: usize) -> Array2<T> {
        self.data.index_axis(Axis(2), c).to_owned()
    }

    pub fn set_plane(&mut self, c: usize, plane: &Array2<T>) {
        self.data.index_axis_mut(Axis(2), c).assign(plane);
    }
}

impl<T> PixelBuffer<T> {
    pub fn new(data: Array3<T>) -> Self {
        Self { data }
    }

    pub fn width(&self) -> usize {
        self.data.dim().1
    }

    pub fn height(&self) -> usize {
        self.data.dim().0
    }

    pub fn channels(&self) -> usize {
        self.data.dim().2
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn shape_eq<U>(&self, other: &PixelBuffer<U>) -> bool {
        self.data.dim() == other.data.dim()
    }

    pub fn view(&self) -> ArrayView3<'_, T> {
        self.data.view()
    }

    pub fn view_mut(&mut self) -> ArrayViewMut3<'_, T> {
        self.data.view_mut()
    }

    pub fn into_raw_vec(self) -> Vec<T> {
        self.data.into_raw_vec()
    }
}

impl Raster {
    pub fn to_samples(&self) -> Samples {
        Samples::new(self.data.mapv(f32::from))
    }
}

impl Samples {
    // rounds to the nearest level, anything outside [0, 255] saturates
    pub fn to_raster(&self) -> Raster {
        Raster::new(self.data.mapv(|v| v.round().clamp(0.0, SAMPLE_MAX) as u8))
    }
}
