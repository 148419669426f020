// THEORY:
// The `GridProjector` turns one sensor frame into the `PointGrid` the segmenter
// works on. It plays the same role for depth frames that a chunk manager plays
// for colour images: it owns the grid, slices the raw buffer into it at a fixed
// stride, and classifies every cell before anyone downstream looks at it.
//
// Per sampled pixel:
// 1.  **Validity**: zero depth, a zero mask byte, or depth outside the sensor
//     range makes the cell `Background`.
// 2.  **Unprojection**: the `SampleSource` yields a camera-space point.
// 3.  **World Transform**: standardize axes (optional), scale, rotate x -> y -> z,
//     translate.
// 4.  **Cropping**: `OffThreshold` if the world point leaves the crop box,
//     otherwise `Idle`.
//
// The transform and stride are owned here and changed only through setters by
// the single thread that drives frames.

use crate::core_modules::point_grid::{CellState, GridCell, PointGrid};
use crate::core_modules::sensor::{DepthRange, SampleSource, SensorProfile};
use crate::core_modules::transform::{CropBox, WorldTransform};
use crate::error::{BlobFinderError, Result};
use log::{debug, warn};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Downsampling applied to the sensor frame before segmentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Resolution {
    /// Every pixel.
    High,
    /// Every second pixel in each direction.
    Medium,
    /// Every fourth pixel in each direction.
    #[default]
    Low,
    /// Arbitrary stride.
    Custom(u32),
}

impl Resolution {
    pub fn stride(self) -> u32 {
        match self {
            Resolution::High => 1,
            Resolution::Medium => 2,
            Resolution::Low => 4,
            Resolution::Custom(stride) => stride,
        }
    }

    pub fn from_stride(stride: u32) -> Self {
        match stride {
            1 => Resolution::High,
            2 => Resolution::Medium,
            4 => Resolution::Low,
            other => Resolution::Custom(other),
        }
    }
}

/// Owns the per-frame `PointGrid` and fills it from a `SampleSource`.
#[derive(Debug, Clone)]
pub struct GridProjector {
    /// Source resolution the grid is currently sized for.
    source_width: usize,
    source_height: usize,
    stride: u32,
    transform: WorldTransform,
    range: DepthRange,
    grid: PointGrid,
    /// Set once a projection has completed since the last reallocation.
    projected: bool,
}

impl GridProjector {
    pub fn new(sensor: &SensorProfile, resolution: Resolution) -> Result<Self> {
        let mut projector = Self {
            source_width: sensor.width,
            source_height: sensor.height,
            stride: 1,
            transform: WorldTransform::default(),
            range: sensor.range,
            grid: PointGrid::default(),
            projected: false,
        };
        projector.set_resolution(resolution)?;
        Ok(projector)
    }

    pub fn set_resolution(&mut self, resolution: Resolution) -> Result<()> {
        self.set_stride(resolution.stride())
    }

    /// Changes the stride. The grid is reallocated only if its dimensions change.
    pub fn set_stride(&mut self, stride: u32) -> Result<()> {
        if stride == 0 {
            return Err(BlobFinderError::InvalidStride(stride));
        }
        self.stride = stride;
        self.reallocate();
        Ok(())
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::from_stride(self.stride)
    }

    pub fn stride(&self) -> u32 {
        self.stride
    }

    pub fn transform(&self) -> &WorldTransform {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: WorldTransform) {
        self.transform = transform;
    }

    pub fn scale(&self) -> Vector3<f32> {
        self.transform.scale
    }

    pub fn set_scale(&mut self, scale: Vector3<f32>) {
        self.transform.scale = scale;
    }

    /// Rotation in degrees about x, y and z.
    pub fn rotation(&self) -> Vector3<f32> {
        self.transform.rotation
    }

    pub fn set_rotation(&mut self, rotation: Vector3<f32>) {
        self.transform.rotation = rotation;
    }

    pub fn translation(&self) -> Vector3<f32> {
        self.transform.translation
    }

    pub fn set_translation(&mut self, translation: Vector3<f32>) {
        self.transform.translation = translation;
    }

    pub fn axis_standardization(&self) -> bool {
        self.transform.standardize_axes
    }

    pub fn set_axis_standardization(&mut self, enabled: bool) {
        self.transform.standardize_axes = enabled;
    }

    pub fn range(&self) -> DepthRange {
        self.range
    }

    pub fn set_range(&mut self, range: DepthRange) {
        self.range = range;
    }

    pub fn grid(&self) -> &PointGrid {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut PointGrid {
        &mut self.grid
    }

    /// Whether the grid holds a completed, non-empty projection that has not
    /// been segmented yet.
    pub fn is_initialized(&self) -> bool {
        self.projected && !self.grid.is_empty()
    }

    /// Source resolution of the last projected frame, or of the sensor
    /// profile before the first one.
    pub fn source_resolution(&self) -> (usize, usize) {
        (self.source_width, self.source_height)
    }

    /// Segmentation rewrites every cell state, so the grid must be projected
    /// again before the next segmentation.
    pub(crate) fn mark_consumed(&mut self) {
        self.projected = false;
    }

    fn grid_dimensions(&self) -> (usize, usize) {
        let stride = self.stride as usize;
        (self.source_width / stride, self.source_height / stride)
    }

    fn reallocate(&mut self) {
        let (width, height) = self.grid_dimensions();
        if self.grid.resize(width, height) {
            self.projected = false;
            debug!(
                "GridProjector: grid reallocated to {}x{} (stride {}, source {}x{})",
                width, height, self.stride, self.source_width, self.source_height
            );
        }
    }

    /// Fills the grid from `source`. `mask`, when given, must have one byte per
    /// source pixel; zero excludes the pixel.
    ///
    /// Fails with `InputMismatch` without touching the grid if either buffer
    /// is inconsistent with the source's declared resolution. A source whose
    /// resolution differs from the current one is accepted and the grid is
    /// resized to follow it.
    pub fn project<S: SampleSource>(
        &mut self,
        source: &S,
        mask: Option<&[u8]>,
        crop_box: &CropBox,
    ) -> Result<&PointGrid> {
        let expected = source.width() * source.height();
        if source.sample_count() != expected {
            return Err(BlobFinderError::InputMismatch {
                what: "sample buffer",
                expected,
                actual: source.sample_count(),
            });
        }
        if let Some(mask) = mask {
            if mask.len() != expected {
                return Err(BlobFinderError::InputMismatch {
                    what: "mask",
                    expected,
                    actual: mask.len(),
                });
            }
        }

        // The frame's own dimensions win over the configured sensor profile.
        if source.width() != self.source_width || source.height() != self.source_height {
            warn!(
                "GridProjector: source resolution changed {}x{} -> {}x{}; intrinsics are not rescaled",
                self.source_width,
                self.source_height,
                source.width(),
                source.height()
            );
            self.source_width = source.width();
            self.source_height = source.height();
        }
        self.reallocate();

        let stride = self.stride as usize;
        let source_width = self.source_width;
        let grid_width = self.grid.width();
        let transform = self.transform.prepare();
        let range = self.range;

        for (index, cell) in self.grid.cells_mut().iter_mut().enumerate() {
            let i = (index % grid_width) * stride;
            let j = (index / grid_width) * stride;

            let masked_out = mask.is_some_and(|m| m[i + j * source_width] == 0);
            let sample = if masked_out {
                None
            } else {
                source.sample(i, j, &range)
            };

            *cell = match sample {
                None => GridCell::default(),
                Some(camera_point) => {
                    let position = transform.apply(camera_point);
                    let state = if crop_box.contains(&position) {
                        CellState::Idle
                    } else {
                        CellState::OffThreshold
                    };
                    GridCell { state, position }
                }
            };
        }

        self.projected = true;
        Ok(&self.grid)
    }
}
