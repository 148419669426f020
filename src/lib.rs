// THEORY:
// This file is the main entry point for the `depth_blob_finder` library crate.
// It finds 3D "blobs" in depth sensor frames: spatially coherent groups of
// samples, filtered by point count and bounding-box volume, each summarised by
// its bounding box, centroid, mass centre and extreme points.
//
// The public surface is the `BlobFinder` in `pipeline` together with the plain
// data types it consumes and produces. The stages it is made of (projection,
// segmentation, history) live in `core_modules` and can also be driven one by
// one. `frame_loop` adapts the synchronous finder to a channel-fed async
// sensor driver.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod frame_loop;
pub mod pipeline;

pub use error::{BlobFinderError, Result};
pub use pipeline::*;
