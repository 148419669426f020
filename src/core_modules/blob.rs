// THEORY:
// A `BlobDescriptor` is the summary of one accepted cluster for one frame. It is
// a read-only data container: the segmenter builds it once from the running
// statistics it gathered during region growing, and every consumer after that
// (renderers, trackers, the frame history) only reads it.
//
// Two "centres" are reported on purpose. `centroid` is the middle of the
// bounding box; `mass_center` is the mean of all member positions. For a
// lopsided cluster they differ.

use nalgebra::Vector3;
use serde::Serialize;

/// The member points that attained each per-axis extreme.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExtremePoints {
    pub min_x: Vector3<f32>,
    pub max_x: Vector3<f32>,
    pub min_y: Vector3<f32>,
    pub max_y: Vector3<f32>,
    pub min_z: Vector3<f32>,
    pub max_z: Vector3<f32>,
}

impl ExtremePoints {
    fn at(p: Vector3<f32>) -> Self {
        Self {
            min_x: p,
            max_x: p,
            min_y: p,
            max_y: p,
            min_z: p,
            max_z: p,
        }
    }
}

/// Geometric summary of one accepted cluster.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlobDescriptor {
    id: usize,
    bounding_box_min: Vector3<f32>,
    bounding_box_max: Vector3<f32>,
    dimensions: Vector3<f32>,
    volume: f32,
    centroid: Vector3<f32>,
    mass_center: Vector3<f32>,
    extreme_points: ExtremePoints,
    points: Vec<Vector3<f32>>,
    cell_indices: Vec<usize>,
}

impl BlobDescriptor {
    pub(crate) fn new(
        id: usize,
        stats: &BlobAccumulator,
        points: Vec<Vector3<f32>>,
        cell_indices: Vec<usize>,
    ) -> Self {
        Self {
            id,
            bounding_box_min: stats.min,
            bounding_box_max: stats.max,
            dimensions: stats.dimensions(),
            volume: stats.volume(),
            centroid: (stats.min + stats.max) * 0.5,
            mass_center: stats.mass_center(),
            extreme_points: stats.extremes,
            points,
            cell_indices,
        }
    }

    /// Per-frame id, equal to the `Assigned` id written on its cells.
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn bounding_box_min(&self) -> Vector3<f32> {
        self.bounding_box_min
    }

    pub fn bounding_box_max(&self) -> Vector3<f32> {
        self.bounding_box_max
    }

    /// Per-axis extent of the bounding box.
    pub fn dimensions(&self) -> Vector3<f32> {
        self.dimensions
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Midpoint of the bounding box.
    pub fn centroid(&self) -> Vector3<f32> {
        self.centroid
    }

    /// Mean of the member positions.
    pub fn mass_center(&self) -> Vector3<f32> {
        self.mass_center
    }

    pub fn extreme_points(&self) -> &ExtremePoints {
        &self.extreme_points
    }

    /// Member positions in the order region growing reached them.
    pub fn points(&self) -> &[Vector3<f32>] {
        &self.points
    }

    /// Grid indices of the member cells, parallel to `points`.
    pub fn cell_indices(&self) -> &[usize] {
        &self.cell_indices
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Running bounding box, extremes and position sum of a growing cluster.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BlobAccumulator {
    min: Vector3<f32>,
    max: Vector3<f32>,
    extremes: ExtremePoints,
    sum: Vector3<f64>,
    count: usize,
}

impl BlobAccumulator {
    pub(crate) fn new(seed: Vector3<f32>) -> Self {
        Self {
            min: seed,
            max: seed,
            extremes: ExtremePoints::at(seed),
            sum: seed.cast::<f64>(),
            count: 1,
        }
    }

    #[inline]
    pub(crate) fn push(&mut self, p: Vector3<f32>) {
        if p.x < self.min.x {
            self.min.x = p.x;
            self.extremes.min_x = p;
        }
        if p.x > self.max.x {
            self.max.x = p.x;
            self.extremes.max_x = p;
        }
        if p.y < self.min.y {
            self.min.y = p.y;
            self.extremes.min_y = p;
        }
        if p.y > self.max.y {
            self.max.y = p.y;
            self.extremes.max_y = p;
        }
        if p.z < self.min.z {
            self.min.z = p.z;
            self.extremes.min_z = p;
        }
        if p.z > self.max.z {
            self.max.z = p.z;
            self.extremes.max_z = p;
        }
        self.sum += p.cast::<f64>();
        self.count += 1;
    }

    pub(crate) fn count(&self) -> usize {
        self.count
    }

    pub(crate) fn dimensions(&self) -> Vector3<f32> {
        (self.max - self.min).abs()
    }

    pub(crate) fn volume(&self) -> f32 {
        let d = self.dimensions();
        d.x * d.y * d.z
    }

    fn mass_center(&self) -> Vector3<f32> {
        (self.sum / self.count() as f64).cast::<f32>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulator_tracks_box_extremes_and_mean() {
        let mut acc = BlobAccumulator::new(Vector3::new(0.0, 0.0, 0.0));
        acc.push(Vector3::new(2.0, 1.0, -1.0));
        acc.push(Vector3::new(1.0, 3.0, 0.5));
        acc.push(Vector3::new(-1.0, 0.0, 0.5));

        assert_eq!(acc.count(), 4);
        assert_eq!(acc.dimensions(), Vector3::new(3.0, 3.0, 1.5));
        assert_eq!(acc.volume(), 13.5);

        let blob = BlobDescriptor::new(7, &acc, Vec::new(), Vec::new());
        assert_eq!(blob.id(), 7);
        assert_eq!(blob.bounding_box_min(), Vector3::new(-1.0, 0.0, -1.0));
        assert_eq!(blob.bounding_box_max(), Vector3::new(2.0, 3.0, 0.5));
        assert_eq!(blob.centroid(), Vector3::new(0.5, 1.5, -0.25));
        assert_eq!(blob.mass_center(), Vector3::new(0.5, 1.0, 0.0));
        assert_eq!(blob.extreme_points().max_y, Vector3::new(1.0, 3.0, 0.5));
        assert_eq!(blob.extreme_points().min_x, Vector3::new(-1.0, 0.0, 0.5));
        // first point to reach the extreme keeps it on ties
        assert_eq!(blob.extreme_points().min_y, Vector3::new(0.0, 0.0, 0.0));
    }

    #[test]
    fn single_point_has_zero_volume() {
        let acc = BlobAccumulator::new(Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(acc.dimensions(), Vector3::zeros());
        assert_eq!(acc.volume(), 0.0);
    }
}
