pub mod blob;
pub mod blob_history;
pub mod grid_projector;
pub mod point_grid;
pub mod segmenter;
pub mod sensor;
pub mod transform;
