// THEORY:
// The `transform` module maps camera-space samples into the caller's world
// frame. The chain is fixed: optional axis standardization, per-axis scale,
// rotation about x, then y, then z, and finally translation. Rotations are
// applied one axis at a time in that order; reordering them or folding them
// into a different Euler convention changes the output.

use nalgebra::{Rotation3, Vector3};
use serde::{Deserialize, Serialize};

/// Scale, rotation and translation applied to every valid sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldTransform {
    /// Per-axis scale factor.
    pub scale: Vector3<f32>,
    /// Per-axis rotation in degrees, applied x, then y, then z.
    pub rotation: Vector3<f32>,
    /// Per-axis offset added last.
    pub translation: Vector3<f32>,
    /// Permute camera `(x, y, z)` into `(x, z, -y)` before anything else, so
    /// the sensor's depth axis becomes world "forward" and its image-down axis
    /// becomes world "up".
    pub standardize_axes: bool,
}

impl Default for WorldTransform {
    fn default() -> Self {
        Self {
            scale: Vector3::new(1.0, 1.0, 1.0),
            rotation: Vector3::zeros(),
            translation: Vector3::zeros(),
            standardize_axes: false,
        }
    }
}

impl WorldTransform {
    /// Builds the per-frame form with the rotation matrices resolved once.
    pub fn prepare(&self) -> PreparedTransform {
        PreparedTransform {
            scale: self.scale,
            rot_x: Rotation3::from_axis_angle(&Vector3::x_axis(), self.rotation.x.to_radians()),
            rot_y: Rotation3::from_axis_angle(&Vector3::y_axis(), self.rotation.y.to_radians()),
            rot_z: Rotation3::from_axis_angle(&Vector3::z_axis(), self.rotation.z.to_radians()),
            translation: self.translation,
            standardize_axes: self.standardize_axes,
        }
    }

    pub fn apply(&self, camera_point: Vector3<f32>) -> Vector3<f32> {
        self.prepare().apply(camera_point)
    }
}

/// A [`WorldTransform`] with its three axis rotations precomputed.
#[derive(Debug, Clone, Copy)]
pub struct PreparedTransform {
    scale: Vector3<f32>,
    rot_x: Rotation3<f32>,
    rot_y: Rotation3<f32>,
    rot_z: Rotation3<f32>,
    translation: Vector3<f32>,
    standardize_axes: bool,
}

impl PreparedTransform {
    #[inline]
    pub fn apply(&self, camera_point: Vector3<f32>) -> Vector3<f32> {
        let p = if self.standardize_axes {
            standardize(camera_point)
        } else {
            camera_point
        };
        let p = p.component_mul(&self.scale);
        let p = self.rot_x * p;
        let p = self.rot_y * p;
        let p = self.rot_z * p;
        p + self.translation
    }
}

/// Sensor-native `(x, y, z)` to world `(x, z, -y)`.
#[inline]
pub fn standardize(p: Vector3<f32>) -> Vector3<f32> {
    Vector3::new(p.x, p.z, -p.y)
}

/// Axis-aligned world-space region. Samples outside it are excluded from
/// clustering. `min <= max` per axis is the caller's responsibility.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropBox {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
}

impl Default for CropBox {
    fn default() -> Self {
        Self {
            min: Vector3::repeat(-f32::MAX),
            max: Vector3::repeat(f32::MAX),
        }
    }
}

impl CropBox {
    pub fn new(min: Vector3<f32>, max: Vector3<f32>) -> Self {
        Self { min, max }
    }

    /// Inclusive on both corners.
    #[inline]
    pub fn contains(&self, p: &Vector3<f32>) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }
}
