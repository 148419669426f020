// THEORY:
// The `error` module defines the only failures the blob finder can report.
// Everything that can go wrong with an individual sample (zero depth, a masked
// pixel, a point outside the crop box) is folded into a cell state instead and
// never surfaces here. What remains are structural problems with a whole frame
// or with the order in which the caller drives the pipeline.

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, BlobFinderError>;

#[derive(Debug, thiserror::Error)]
pub enum BlobFinderError {
    /// A source or mask buffer does not match the declared sensor resolution.
    /// The projection is abandoned and the grid keeps its previous contents.
    #[error("input mismatch: {what} has {actual} samples, expected {expected}")]
    InputMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Segmentation was requested before any projection filled the grid.
    #[error("blob finder not initialized: project a frame before segmenting")]
    NotInitialized,

    /// The BFS queue is smaller than the grid it has to walk.
    #[error("shape mismatch: grid has {cells} cells but the queue holds {capacity}")]
    ShapeMismatch { cells: usize, capacity: usize },

    #[error("invalid stride {0}: must be at least 1")]
    InvalidStride(u32),

    #[error("config error: {0}")]
    Config(String),
}
