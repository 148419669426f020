// THEORY:
// The `pipeline` module is the top-level API of the blob finder. `BlobFinder`
// owns the three stateful parts and runs them in order once per frame:
//
// 1.  **Projection**: the `GridProjector` fills the `PointGrid` from the frame.
// 2.  **Segmentation**: the `RegionGrowingSegmenter` extracts accepted blobs.
// 3.  **History**: `BlobHistory` shifts the last result into `previous` and
//     stores the new one as `current`.
//
// A frame either completes all three stages or leaves the history untouched.
// Segmentation consumes the projection: each projected frame is segmented at
// most once.
// The caller drives the cadence and owns the thread; nothing here blocks,
// spawns or locks.

use crate::core_modules::blob_history::BlobHistory;
use crate::core_modules::grid_projector::GridProjector;
use crate::core_modules::segmenter::RegionGrowingSegmenter;
use crate::error::{BlobFinderError, Result};
use image::GrayImage;
use log::{debug, warn};

// Re-export key data structures for the public API.
pub use crate::config::FinderConfig;
pub use crate::core_modules::blob::{BlobDescriptor, ExtremePoints};
pub use crate::core_modules::grid_projector::Resolution;
pub use crate::core_modules::point_grid::{CellState, GridCell, PointGrid};
pub use crate::core_modules::segmenter::{SegmentParams, WindowMode};
pub use crate::core_modules::sensor::{
    DepthFrame, DepthIntrinsics, DepthRange, PointCloudFrame, SampleSource, SensorProfile,
};
pub use crate::core_modules::transform::{CropBox, WorldTransform};

/// The main, top-level struct of the blob finder.
#[derive(Debug, Clone)]
pub struct BlobFinder {
    projector: GridProjector,
    segmenter: RegionGrowingSegmenter,
    history: BlobHistory,
    crop_box: CropBox,
    params: SegmentParams,
    frame_count: u64,
}

impl BlobFinder {
    pub fn new(config: FinderConfig) -> Result<Self> {
        let mut projector = GridProjector::new(&config.sensor, config.resolution)?;
        projector.set_transform(config.transform);
        let segmenter = RegionGrowingSegmenter::with_capacity(projector.grid().len());
        debug!(
            "BlobFinder: created for {}x{} sensor, stride {}",
            config.sensor.width,
            config.sensor.height,
            projector.stride()
        );
        Ok(Self {
            projector,
            segmenter,
            history: BlobHistory::new(),
            crop_box: config.crop_box,
            params: config.segmentation,
            frame_count: 0,
        })
    }

    /// Projects `source` into the grid without segmenting it.
    pub fn project<S: SampleSource>(&mut self, source: &S, mask: Option<&[u8]>) -> Result<&PointGrid> {
        self.projector.project(source, mask, &self.crop_box)
    }

    /// Segments the most recently projected grid and rotates the history.
    ///
    /// Fails with `NotInitialized` unless a projection completed since the
    /// last successful call.
    pub fn segment(&mut self) -> Result<&[BlobDescriptor]> {
        if !self.projector.is_initialized() {
            warn!("BlobFinder: segment called before a completed projection");
            return Err(BlobFinderError::NotInitialized);
        }
        let blobs = self
            .segmenter
            .segment(self.projector.grid_mut(), &self.params)?;
        self.projector.mark_consumed();
        self.history.rotate(blobs);
        self.frame_count += 1;
        Ok(self.history.current())
    }

    /// Runs projection and segmentation for one frame.
    ///
    /// On error the history is left as it was; the caller is expected to skip
    /// the frame and try again with the next one.
    pub fn process_frame<S: SampleSource>(
        &mut self,
        source: &S,
        mask: Option<&[u8]>,
    ) -> Result<&[BlobDescriptor]> {
        if let Err(e) = self.projector.project(source, mask, &self.crop_box) {
            warn!("BlobFinder: frame skipped, {e}");
            return Err(e);
        }
        self.segment()
    }

    /// Same as [`process_frame`](Self::process_frame) with an 8-bit
    /// background-subtraction mask image.
    pub fn process_frame_masked<S: SampleSource>(
        &mut self,
        source: &S,
        mask: &GrayImage,
    ) -> Result<&[BlobDescriptor]> {
        let (width, height) = (mask.width() as usize, mask.height() as usize);
        if (width, height) != (source.width(), source.height()) {
            let err = BlobFinderError::InputMismatch {
                what: "mask image",
                expected: source.width() * source.height(),
                actual: width * height,
            };
            warn!("BlobFinder: frame skipped, {err}");
            return Err(err);
        }
        self.process_frame(source, Some(mask.as_raw()))
    }

    /// Blobs of the last segmented frame.
    pub fn blobs(&self) -> &[BlobDescriptor] {
        self.history.current()
    }

    /// Blobs of the frame before the last one.
    pub fn last_blobs(&self) -> &[BlobDescriptor] {
        self.history.previous()
    }

    pub fn blob_count(&self) -> usize {
        self.history.count()
    }

    pub fn history(&self) -> &BlobHistory {
        &self.history
    }

    pub fn grid(&self) -> &PointGrid {
        self.projector.grid()
    }

    /// Number of frames segmented so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn is_initialized(&self) -> bool {
        self.projector.is_initialized()
    }

    pub fn projector(&self) -> &GridProjector {
        &self.projector
    }

    /// Mutable access for transform and range setters between frames.
    pub fn projector_mut(&mut self) -> &mut GridProjector {
        &mut self.projector
    }

    pub fn set_resolution(&mut self, resolution: Resolution) -> Result<()> {
        self.projector.set_resolution(resolution)
    }

    pub fn crop_box(&self) -> &CropBox {
        &self.crop_box
    }

    pub fn set_crop_box(&mut self, crop_box: CropBox) {
        self.crop_box = crop_box;
    }

    pub fn params(&self) -> &SegmentParams {
        &self.params
    }

    pub fn set_params(&mut self, params: SegmentParams) {
        self.params = params;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    fn finder(width: usize, height: usize) -> BlobFinder {
        let config = FinderConfig {
            sensor: SensorProfile {
                width,
                height,
                range: DepthRange { min: 0.1, max: 10.0 },
                ..SensorProfile::default()
            },
            resolution: Resolution::High,
            segmentation: SegmentParams {
                min_points: 0,
                min_volume: 0.0,
                ..SegmentParams::default()
            },
            ..FinderConfig::default()
        };
        BlobFinder::new(config).unwrap()
    }

    #[test]
    fn segment_before_project_is_not_initialized() {
        let mut finder = finder(2, 2);
        assert!(matches!(finder.segment(), Err(BlobFinderError::NotInitialized)));
        assert_eq!(finder.frame_count(), 0);
    }

    #[test]
    fn segmenting_twice_requires_a_new_projection() {
        let mut finder = finder(2, 2);
        let points = vec![Vector3::new(0.0, 0.0, 1.0); 4];
        finder.project(&PointCloudFrame::new(2, 2, &points), None).unwrap();
        assert_eq!(finder.segment().unwrap().len(), 1);

        assert!(matches!(finder.segment(), Err(BlobFinderError::NotInitialized)));
        assert_eq!(finder.blobs().len(), 1);
        assert!(finder.last_blobs().is_empty());
        assert_eq!(finder.frame_count(), 1);

        finder.project(&PointCloudFrame::new(2, 2, &points), None).unwrap();
        assert_eq!(finder.segment().unwrap().len(), 1);
        assert_eq!(finder.last_blobs().len(), 1);
        assert_eq!(finder.frame_count(), 2);
    }

    #[test]
    fn mask_image_excludes_pixels() {
        let mut finder = finder(2, 2);
        let points = vec![Vector3::new(0.0, 0.0, 1.0); 4];
        let mask = GrayImage::from_fn(2, 2, |x, _| image::Luma([if x == 0 { 255 } else { 0 }]));
        let blobs = finder
            .process_frame_masked(&PointCloudFrame::new(2, 2, &points), &mask)
            .unwrap();
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].cell_indices(), &[0, 2]);

        // same pixel count, different shape
        let wrong = GrayImage::new(4, 1);
        assert!(matches!(
            finder.process_frame_masked(&PointCloudFrame::new(2, 2, &points), &wrong),
            Err(BlobFinderError::InputMismatch { what: "mask image", .. })
        ));
        assert_eq!(finder.frame_count(), 1);
    }

    #[test]
    fn failed_projection_keeps_history() {
        let mut finder = finder(2, 1);
        let points = vec![Vector3::new(0.0, 0.0, 1.0); 2];
        finder
            .process_frame(&PointCloudFrame::new(2, 1, &points), None)
            .unwrap();
        let before = finder.history().clone();

        let short = vec![Vector3::new(0.0, 0.0, 1.0); 1];
        assert!(finder
            .process_frame(&PointCloudFrame::new(2, 1, &short), None)
            .is_err());
        assert_eq!(finder.history(), &before);
        assert_eq!(finder.frame_count(), 1);
    }

    #[test]
    fn resolution_change_requires_new_projection() {
        let mut finder = finder(4, 4);
        let points = vec![Vector3::new(0.0, 0.0, 1.0); 16];
        finder
            .process_frame(&PointCloudFrame::new(4, 4, &points), None)
            .unwrap();
        finder.set_resolution(Resolution::Medium).unwrap();
        assert!(matches!(finder.segment(), Err(BlobFinderError::NotInitialized)));

        let blobs = finder
            .process_frame(&PointCloudFrame::new(4, 4, &points), None)
            .unwrap();
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].len(), 4);
    }
}
