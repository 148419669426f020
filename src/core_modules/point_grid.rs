// THEORY:
// The `PointGrid` is the per-frame working surface of the blob finder. It is a
// dense, row-major copy of the strided sensor frame in which every cell holds a
// world-space position and a lifecycle state. The projector writes it, the
// segmenter walks it, and nothing survives from one frame to the next except
// the allocation itself.
//
// Key architectural principles:
// 1.  **Explicit State Machine**: A cell moves forward only:
//     `Idle -> Queued -> Processed -> Assigned(id)` (or stays `Processed` when its
//     cluster is rejected). `Background` and `OffThreshold` are terminal from the
//     moment the projector writes them.
// 2.  **Flat Storage**: Cells live in one `Vec` indexed by `u + v * width`. The
//     buffer is reallocated only when the grid dimensions change, so the hot
//     path of a frame never touches the allocator.

use nalgebra::Vector3;

/// The lifecycle state of a single grid cell within one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CellState {
    /// No usable sample: zero depth, masked out, or outside the sensor range.
    #[default]
    Background,
    /// A valid sample whose transformed position falls outside the crop box.
    OffThreshold,
    /// A candidate sample not yet reached by any region-growing pass.
    Idle,
    /// Enqueued by a neighbour scan, waiting to be expanded.
    Queued,
    /// Expanded. Final for cells whose cluster was rejected.
    Processed,
    /// Member of the accepted blob with this per-frame id.
    Assigned(usize),
}

impl CellState {
    /// Whether the segmenter is finished with this cell for the current frame.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            CellState::Background
                | CellState::OffThreshold
                | CellState::Processed
                | CellState::Assigned(_)
        )
    }

    pub fn blob_id(self) -> Option<usize> {
        match self {
            CellState::Assigned(id) => Some(id),
            _ => None,
        }
    }
}

/// One sampled position of the strided sensor frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridCell {
    pub state: CellState,
    /// World-space position. Zero for `Background` cells.
    pub position: Vector3<f32>,
}

impl Default for GridCell {
    fn default() -> Self {
        Self {
            state: CellState::Background,
            position: Vector3::zeros(),
        }
    }
}

/// The dense, row-major grid of classified 3D samples for one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointGrid {
    width: usize,
    height: usize,
    cells: Vec<GridCell>,
}

impl PointGrid {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![GridCell::default(); width * height],
        }
    }

    /// Resizes the backing storage when the dimensions differ from the current
    /// ones. Returns `true` if a reallocation happened.
    pub fn resize(&mut self, width: usize, height: usize) -> bool {
        if self.width == width && self.height == height && self.cells.len() == width * height {
            return false;
        }
        self.width = width;
        self.height = height;
        self.cells = vec![GridCell::default(); width * height];
        true
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Total number of cells (`width * height`).
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[GridCell] {
        &self.cells
    }

    pub fn cell(&self, index: usize) -> Option<&GridCell> {
        self.cells.get(index)
    }

    /// Cell at grid column `u`, row `v`.
    pub fn cell_at(&self, u: usize, v: usize) -> Option<&GridCell> {
        if u >= self.width || v >= self.height {
            return None;
        }
        self.cells.get(u + v * self.width)
    }

    /// Number of cells currently in `state`.
    pub fn count_state(&self, state: CellState) -> usize {
        self.cells.iter().filter(|c| c.state == state).count()
    }

    pub(crate) fn cells_mut(&mut self) -> &mut [GridCell] {
        &mut self.cells
    }
}
