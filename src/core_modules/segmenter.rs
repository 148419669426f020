// THEORY:
// The `RegionGrowingSegmenter` is the engine of the blob finder. It performs a
// Euclidean-cluster-style extraction, but instead of querying a spatial index
// for neighbours it exploits the fact that the samples come from a regular
// sensor grid: a point's candidate neighbours are the cells in a small index
// window around it.
//
// Algorithm steps:
// 1.  **Seeding**: Scan the grid in row-major order for the next `Idle` cell.
// 2.  **Region Growing**: Breadth-first expansion from the seed. For every cell
//     popped, look at each cell in the `(2w+1) x (2w+1)` index window around it
//     and enqueue those that are still `Idle` and lie within the position
//     threshold on every axis independently (Chebyshev test, inclusive).
// 3.  **Data Aggregation**: While popping, keep a running bounding box, the
//     points that attained each extreme and a position sum for the mass centre.
// 4.  **Acceptance**: Keep the cluster if it has strictly more than
//     `min_points` members and its bounding-box volume lies in
//     `[min_volume, max_volume]`. Accepted cells are stamped with the blob id;
//     rejected cells stay `Processed` and are dead for the rest of the frame.
// 5.  **Termination**: Stop when the scan is exhausted, every cell has been
//     processed, or `max_blobs` blobs were accepted. Cells never reached are
//     retired to `Processed`.
//
// Every cell is expanded at most once per frame, so a frame costs O(cells). The
// BFS queue is a flat index array sized to the grid and reused across frames.
//
// The neighbour window works on flat indices `u + v * width` and by default only
// checks that the flat index lies inside the grid. Near the left and right
// edges a window column can therefore wrap into the adjacent row.
// `WindowMode::RowBounded` clips the window to the grid's rows and columns
// instead.

use crate::core_modules::blob::{BlobAccumulator, BlobDescriptor};
use crate::core_modules::point_grid::{CellState, PointGrid};
use crate::error::{BlobFinderError, Result};
use log::{debug, trace};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// How the neighbour window treats the left and right grid edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum WindowMode {
    /// Bounds-check only the flat index; windows may wrap across rows.
    #[default]
    FlatIndex,
    /// Clip the window to valid columns and rows.
    RowBounded,
}

/// Acceptance and connectivity parameters for one segmentation pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentParams {
    /// Half-width of the neighbour window in grid cells.
    pub neighbor_window: u32,
    /// Maximum absolute difference per axis for two cells to connect.
    pub position_threshold: Vector3<f32>,
    /// A cluster needs strictly more members than this.
    pub min_points: usize,
    /// Inclusive lower bound on bounding-box volume.
    pub min_volume: f32,
    /// Inclusive upper bound on bounding-box volume.
    pub max_volume: f32,
    /// Stop after this many accepted blobs.
    pub max_blobs: usize,
    pub window_mode: WindowMode,
}

impl Default for SegmentParams {
    fn default() -> Self {
        Self {
            neighbor_window: 1,
            position_threshold: Vector3::repeat(0.05),
            min_points: 50,
            min_volume: 0.01,
            max_volume: 2.0,
            max_blobs: 10,
            window_mode: WindowMode::FlatIndex,
        }
    }
}

impl SegmentParams {
    #[inline]
    fn connected(&self, a: &Vector3<f32>, b: &Vector3<f32>) -> bool {
        (a.x - b.x).abs() <= self.position_threshold.x
            && (a.y - b.y).abs() <= self.position_threshold.y
            && (a.z - b.z).abs() <= self.position_threshold.z
    }

    fn accepts_volume(&self, volume: f32) -> bool {
        volume >= self.min_volume && volume <= self.max_volume
    }
}

/// Grid-indexed connected-component extractor.
#[derive(Debug, Clone, Default)]
pub struct RegionGrowingSegmenter {
    /// BFS index queue, one slot per grid cell.
    queue: Vec<usize>,
}

impl RegionGrowingSegmenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(cells: usize) -> Self {
        Self {
            queue: vec![0; cells],
        }
    }

    /// Current queue capacity in cells.
    pub fn capacity(&self) -> usize {
        self.queue.len()
    }

    fn ensure_capacity(&mut self, cells: usize) {
        if self.queue.len() != cells {
            debug!("RegionGrowingSegmenter: queue resized {} -> {}", self.queue.len(), cells);
            self.queue = vec![0; cells];
        }
    }

    /// Extracts the accepted blobs of `grid`, stamping each member cell with
    /// its blob id. The grid must come from a completed projection.
    pub fn segment(
        &mut self,
        grid: &mut PointGrid,
        params: &SegmentParams,
    ) -> Result<Vec<BlobDescriptor>> {
        let n = grid.len();
        if n == 0 {
            return Err(BlobFinderError::NotInitialized);
        }
        self.ensure_capacity(n);

        let width = grid.width() as isize;
        let height = grid.height() as isize;
        let window = params.neighbor_window as isize;
        let cells = grid.cells_mut();
        let queue = self.queue.as_mut_slice();

        let mut blobs: Vec<BlobDescriptor> = Vec::new();
        let mut rejected = 0usize;
        let mut budget = n;
        let mut scan = 0usize;

        while scan < n && budget > 0 && blobs.len() < params.max_blobs {
            // --- 1. Seeding ---
            while scan < n && cells[scan].state != CellState::Idle {
                scan += 1;
            }
            if scan == n {
                break;
            }

            let seed = scan;
            cells[seed].state = CellState::Queued;
            queue[0] = seed;
            let mut head = 0usize;
            let mut tail = 1usize;
            let mut stats = BlobAccumulator::new(cells[seed].position);

            // --- 2. Region Growing ---
            while head < tail && budget > 0 {
                let current = queue[head];
                head += 1;
                budget -= 1;

                cells[current].state = CellState::Processed;
                let point = cells[current].position;
                if current != seed {
                    stats.push(point);
                }

                let i = current as isize % width;
                let j = current as isize / width;

                for u in (i - window)..=(i + window) {
                    for v in (j - window)..=(j + window) {
                        if params.window_mode == WindowMode::RowBounded
                            && (u < 0 || u >= width || v < 0 || v >= height)
                        {
                            continue;
                        }
                        let neighbor = u + v * width;
                        if neighbor < 0 || neighbor as usize >= n {
                            continue;
                        }
                        let neighbor = neighbor as usize;
                        let cell = &mut cells[neighbor];
                        if cell.state != CellState::Idle || !params.connected(&point, &cell.position) {
                            continue;
                        }
                        if tail >= queue.len() {
                            return Err(BlobFinderError::ShapeMismatch {
                                cells: n,
                                capacity: queue.len(),
                            });
                        }
                        cell.state = CellState::Queued;
                        queue[tail] = neighbor;
                        tail += 1;
                    }
                }
            }

            // --- 3. Acceptance ---
            let members = &queue[..head];
            if members.len() <= params.min_points {
                trace!(
                    "segment: cluster at {} rejected, {} points <= {}",
                    seed,
                    members.len(),
                    params.min_points
                );
                rejected += 1;
                continue;
            }
            let volume = stats.volume();
            if !params.accepts_volume(volume) {
                trace!(
                    "segment: cluster at {} rejected, volume {} outside [{}, {}]",
                    seed, volume, params.min_volume, params.max_volume
                );
                rejected += 1;
                continue;
            }

            let id = blobs.len();
            let mut points = Vec::with_capacity(members.len());
            for &index in members {
                cells[index].state = CellState::Assigned(id);
                points.push(cells[index].position);
            }
            blobs.push(BlobDescriptor::new(id, &stats, points, members.to_vec()));
        }

        // --- 4. Retire cells no pass reached ---
        let mut retired = 0usize;
        for cell in cells[scan..].iter_mut() {
            if cell.state == CellState::Idle {
                cell.state = CellState::Processed;
                retired += 1;
            }
        }

        debug!(
            "segment: {} blobs accepted, {} clusters rejected, {} cells retired",
            blobs.len(),
            rejected,
            retired
        );
        Ok(blobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::point_grid::GridCell;

    fn grid_from(width: usize, height: usize, points: &[Option<Vector3<f32>>]) -> PointGrid {
        assert_eq!(points.len(), width * height);
        let mut grid = PointGrid::new(width, height);
        for (cell, p) in grid.cells_mut().iter_mut().zip(points) {
            *cell = match p {
                Some(position) => GridCell {
                    state: CellState::Idle,
                    position: *position,
                },
                None => GridCell::default(),
            };
        }
        grid
    }

    fn permissive() -> SegmentParams {
        SegmentParams {
            neighbor_window: 1,
            position_threshold: Vector3::repeat(0.1),
            min_points: 0,
            min_volume: 0.0,
            max_volume: f32::MAX,
            max_blobs: 100,
            window_mode: WindowMode::FlatIndex,
        }
    }

    #[test]
    fn empty_grid_is_not_initialized() {
        let mut grid = PointGrid::default();
        let err = RegionGrowingSegmenter::new()
            .segment(&mut grid, &permissive())
            .unwrap_err();
        assert!(matches!(err, BlobFinderError::NotInitialized));
    }

    #[test]
    fn threshold_is_axis_wise_and_inclusive() {
        // euclidean distance ~0.122 exceeds 0.1, each axis is within 0.1
        let a = Vector3::new(0.0, 0.0, 0.0);
        let b = Vector3::new(0.05, 0.05, 0.1);
        let mut grid = grid_from(2, 1, &[Some(a), Some(b)]);
        assert!((a - b).norm() > 0.1);

        let blobs = RegionGrowingSegmenter::new()
            .segment(&mut grid, &permissive())
            .unwrap();
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].len(), 2);
    }

    #[test]
    fn difference_above_threshold_on_one_axis_disconnects() {
        let a = Vector3::new(0.0, 0.0, 0.0);
        let b = Vector3::new(0.0, 0.0, 0.11);
        let mut grid = grid_from(2, 1, &[Some(a), Some(b)]);
        let blobs = RegionGrowingSegmenter::new()
            .segment(&mut grid, &permissive())
            .unwrap();
        assert_eq!(blobs.len(), 2);
        assert_eq!(grid.cells()[0].state, CellState::Assigned(0));
        assert_eq!(grid.cells()[1].state, CellState::Assigned(1));
    }

    #[test]
    fn flat_index_window_wraps_across_rows() {
        // (2, 0) and (0, 1) are flat neighbours 2 and 3 in a 3-wide grid
        let p = Vector3::new(0.0, 0.0, 1.0);
        let cells = [None, None, Some(p), Some(p), None, None];

        let mut grid = grid_from(3, 2, &cells);
        let blobs = RegionGrowingSegmenter::new()
            .segment(&mut grid, &permissive())
            .unwrap();
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].cell_indices(), &[2, 3]);

        let mut grid = grid_from(3, 2, &cells);
        let params = SegmentParams {
            window_mode: WindowMode::RowBounded,
            ..permissive()
        };
        let blobs = RegionGrowingSegmenter::new().segment(&mut grid, &params).unwrap();
        assert_eq!(blobs.len(), 2);
    }

    #[test]
    fn zero_window_isolates_every_cell() {
        let p = Vector3::new(0.0, 0.0, 1.0);
        let mut grid = grid_from(2, 2, &[Some(p); 4]);
        let params = SegmentParams {
            neighbor_window: 0,
            ..permissive()
        };
        let blobs = RegionGrowingSegmenter::new().segment(&mut grid, &params).unwrap();
        assert_eq!(blobs.len(), 4);
        assert!(blobs.iter().all(|b| b.len() == 1));
    }

    #[test]
    fn small_clusters_stay_processed() {
        let p = Vector3::new(0.0, 0.0, 1.0);
        let far = Vector3::new(5.0, 0.0, 1.0);
        let mut grid = grid_from(4, 1, &[Some(p), Some(p), Some(p), Some(far)]);
        let params = SegmentParams {
            min_points: 2,
            ..permissive()
        };
        let blobs = RegionGrowingSegmenter::new().segment(&mut grid, &params).unwrap();
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].len(), 3);
        assert_eq!(grid.cells()[3].state, CellState::Processed);
    }

    #[test]
    fn volume_bounds_are_inclusive() {
        let a = Vector3::new(0.0, 0.0, 0.0);
        let b = Vector3::new(0.1, 0.1, 0.1);
        let volume = 0.1f32 * 0.1 * 0.1;
        let params = SegmentParams {
            min_volume: volume,
            max_volume: volume,
            ..permissive()
        };
        let mut grid = grid_from(2, 1, &[Some(a), Some(b)]);
        let blobs = RegionGrowingSegmenter::new().segment(&mut grid, &params).unwrap();
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].volume(), volume);

        let params = SegmentParams {
            min_volume: volume * 1.01,
            ..params
        };
        let mut grid = grid_from(2, 1, &[Some(a), Some(b)]);
        let blobs = RegionGrowingSegmenter::new().segment(&mut grid, &params).unwrap();
        assert!(blobs.is_empty());
        assert_eq!(grid.count_state(CellState::Processed), 2);
    }

    #[test]
    fn max_blobs_stops_early_and_retires_the_rest() {
        let cells: Vec<Option<Vector3<f32>>> = (0..5)
            .map(|k| Some(Vector3::new(k as f32, 0.0, 1.0)))
            .collect();
        let mut grid = grid_from(5, 1, &cells);
        let params = SegmentParams {
            max_blobs: 2,
            ..permissive()
        };
        let blobs = RegionGrowingSegmenter::new().segment(&mut grid, &params).unwrap();
        assert_eq!(blobs.len(), 2);
        assert_eq!(grid.count_state(CellState::Idle), 0);
        assert_eq!(grid.count_state(CellState::Processed), 3);
    }

    #[test]
    fn assigned_ids_match_member_indices() {
        let near = Vector3::new(0.0, 0.0, 1.0);
        let far = Vector3::new(3.0, 0.0, 1.0);
        let mut grid = grid_from(
            3,
            2,
            &[Some(near), Some(near), None, Some(far), None, Some(far)],
        );
        let blobs = RegionGrowingSegmenter::new()
            .segment(&mut grid, &permissive())
            .unwrap();
        for blob in &blobs {
            for &index in blob.cell_indices() {
                assert_eq!(grid.cells()[index].state, CellState::Assigned(blob.id()));
            }
        }
        assert_eq!(blobs.iter().map(|b| b.len()).sum::<usize>(), 4);
    }

    #[test]
    fn queue_tracks_grid_size() {
        let p = Vector3::new(0.0, 0.0, 1.0);
        let mut segmenter = RegionGrowingSegmenter::with_capacity(2);
        let mut grid = grid_from(3, 1, &[Some(p); 3]);
        segmenter.segment(&mut grid, &permissive()).unwrap();
        assert_eq!(segmenter.capacity(), 3);
    }
}
