// THEORY:
// The `sensor` module is the boundary between whatever produced a frame and the
// blob finder. The projector does not care whether a sample came from a raw
// depth image that still has to be unprojected or from a point cloud some other
// library already built; it only needs "the camera-space point at pixel (i, j),
// if there is one". `SampleSource` is that contract, and the two adapters below
// are the only implementations the crate ships.
//
// All camera-space points leave this module in metres. Range filtering is done
// here too, on the camera-space depth, before any world transform is applied.

use image::{ImageBuffer, Luma};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Pinhole intrinsics of the depth camera, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthIntrinsics {
    pub fx: f32,
    pub fy: f32,
    pub cx: f32,
    pub cy: f32,
}

impl DepthIntrinsics {
    /// Kinect v1 depth camera at 640x480.
    pub const KINECT_V1: Self = Self {
        fx: 594.214_34,
        fy: 591.040_54,
        cx: 339.307_8,
        cy: 242.739_14,
    };

    /// Nominal Kinect v2 depth camera at 512x424.
    pub const KINECT_V2: Self = Self {
        fx: 365.456,
        fy: 365.456,
        cx: 254.878,
        cy: 205.395,
    };

    /// Back-projects pixel `(i, j)` at depth `z` (metres) into camera space.
    #[inline]
    pub fn unproject(&self, i: usize, j: usize, z: f32) -> Vector3<f32> {
        Vector3::new(
            (i as f32 - self.cx) * z / self.fx,
            (j as f32 - self.cy) * z / self.fy,
            z,
        )
    }
}

impl Default for DepthIntrinsics {
    fn default() -> Self {
        Self::KINECT_V2
    }
}

/// Accepted camera-space depth interval in metres, inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthRange {
    pub min: f32,
    pub max: f32,
}

impl DepthRange {
    #[inline]
    pub fn contains(&self, z: f32) -> bool {
        z >= self.min && z <= self.max
    }
}

impl Default for DepthRange {
    fn default() -> Self {
        Self { min: 0.5, max: 8.0 }
    }
}

/// Native resolution, intrinsics and working range of a depth sensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorProfile {
    pub width: usize,
    pub height: usize,
    pub intrinsics: DepthIntrinsics,
    pub range: DepthRange,
}

impl SensorProfile {
    pub fn kinect_v1() -> Self {
        Self {
            width: 640,
            height: 480,
            intrinsics: DepthIntrinsics::KINECT_V1,
            range: DepthRange { min: 0.5, max: 5.0 },
        }
    }

    pub fn kinect_v2() -> Self {
        Self {
            width: 512,
            height: 424,
            intrinsics: DepthIntrinsics::KINECT_V2,
            range: DepthRange { min: 0.5, max: 8.0 },
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }
}

impl Default for SensorProfile {
    fn default() -> Self {
        Self::kinect_v2()
    }
}

/// A dense `width x height` frame that can yield camera-space points.
pub trait SampleSource {
    fn width(&self) -> usize;
    fn height(&self) -> usize;

    /// Number of samples actually held by the backing buffer.
    fn sample_count(&self) -> usize;

    /// Camera-space point (metres) for pixel `(i, j)`, or `None` if the sample
    /// is invalid or outside `range`. Only called with in-bounds coordinates.
    fn sample(&self, i: usize, j: usize, range: &DepthRange) -> Option<Vector3<f32>>;
}

/// Raw depth image in millimetres plus the intrinsics needed to unproject it.
#[derive(Debug, Clone, Copy)]
pub struct DepthFrame<'a> {
    width: usize,
    height: usize,
    depth_mm: &'a [u16],
    intrinsics: DepthIntrinsics,
}

impl<'a> DepthFrame<'a> {
    pub fn new(
        width: usize,
        height: usize,
        depth_mm: &'a [u16],
        intrinsics: DepthIntrinsics,
    ) -> Self {
        Self {
            width,
            height,
            depth_mm,
            intrinsics,
        }
    }

    /// Wraps a 16-bit grayscale image whose values are millimetres.
    pub fn from_image(image: &'a ImageBuffer<Luma<u16>, Vec<u16>>, intrinsics: DepthIntrinsics) -> Self {
        Self::new(
            image.width() as usize,
            image.height() as usize,
            image.as_raw(),
            intrinsics,
        )
    }
}

impl SampleSource for DepthFrame<'_> {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn sample_count(&self) -> usize {
        self.depth_mm.len()
    }

    #[inline]
    fn sample(&self, i: usize, j: usize, range: &DepthRange) -> Option<Vector3<f32>> {
        let raw = self.depth_mm[i + j * self.width];
        if raw == 0 {
            return None;
        }
        let z = raw as f32 / 1000.0;
        if !range.contains(z) {
            return None;
        }
        Some(self.intrinsics.unproject(i, j, z))
    }
}

/// Points that were already unprojected elsewhere, one per pixel, in metres.
/// A point with zero or non-finite depth marks an empty pixel.
#[derive(Debug, Clone, Copy)]
pub struct PointCloudFrame<'a> {
    width: usize,
    height: usize,
    points: &'a [Vector3<f32>],
}

impl<'a> PointCloudFrame<'a> {
    pub fn new(width: usize, height: usize, points: &'a [Vector3<f32>]) -> Self {
        Self {
            width,
            height,
            points,
        }
    }
}

impl SampleSource for PointCloudFrame<'_> {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn sample_count(&self) -> usize {
        self.points.len()
    }

    #[inline]
    fn sample(&self, i: usize, j: usize, range: &DepthRange) -> Option<Vector3<f32>> {
        let p = self.points[i + j * self.width];
        if p.z == 0.0 || !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()) {
            return None;
        }
        if !range.contains(p.z) {
            return None;
        }
        Some(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_frame_unprojects_principal_point_onto_axis() {
        let intr = DepthIntrinsics {
            fx: 100.0,
            fy: 100.0,
            cx: 1.0,
            cy: 1.0,
        };
        let depth = [0u16, 0, 0, 0, 1500, 0, 0, 0, 2000];
        let frame = DepthFrame::new(3, 3, &depth, intr);
        let range = DepthRange { min: 0.5, max: 8.0 };

        let p = frame.sample(1, 1, &range).unwrap();
        assert_eq!(p, Vector3::new(0.0, 0.0, 1.5));

        let q = frame.sample(2, 2, &range).unwrap();
        assert!((q.x - 0.02).abs() < 1e-6 && (q.y - 0.02).abs() < 1e-6);
        assert!(frame.sample(0, 0, &range).is_none());
    }

    #[test]
    fn depth_outside_range_is_rejected() {
        let depth = [400u16, 9000];
        let frame = DepthFrame::new(2, 1, &depth, DepthIntrinsics::default());
        let range = DepthRange::default();
        assert!(frame.sample(0, 0, &range).is_none());
        assert!(frame.sample(1, 0, &range).is_none());
    }

    #[test]
    fn point_cloud_rejects_empty_and_non_finite_points() {
        let points = [
            Vector3::new(0.1, 0.2, 0.0),
            Vector3::new(f32::NAN, 0.0, 1.0),
            Vector3::new(0.1, 0.2, 1.0),
        ];
        let frame = PointCloudFrame::new(3, 1, &points);
        let range = DepthRange::default();
        assert!(frame.sample(0, 0, &range).is_none());
        assert!(frame.sample(1, 0, &range).is_none());
        assert_eq!(frame.sample(2, 0, &range), Some(points[2]));
    }

    #[test]
    fn depth_frame_wraps_luma16_image() {
        let img = ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(2, 2, vec![0, 1000, 2000, 3000]).unwrap();
        let frame = DepthFrame::from_image(&img, DepthIntrinsics::default());
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.sample_count(), 4);
        assert_eq!(frame.sample(1, 1, &DepthRange::default()).map(|p| p.z), Some(3.0));
    }
}
