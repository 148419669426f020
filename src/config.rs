// THEORY:
// `FinderConfig` gathers every tunable value of the blob finder into one plain,
// serializable struct. It can be built in code, or loaded from a JSON file by
// applications that persist their settings. Missing fields fall back to the
// defaults of the Kinect v2 demo setup.

use crate::core_modules::grid_projector::Resolution;
use crate::core_modules::segmenter::SegmentParams;
use crate::core_modules::sensor::SensorProfile;
use crate::core_modules::transform::{CropBox, WorldTransform};
use crate::error::{BlobFinderError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Configuration for the `BlobFinder`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FinderConfig {
    /// Native sensor resolution, intrinsics and depth range.
    pub sensor: SensorProfile,
    /// Grid stride applied to the sensor frame.
    pub resolution: Resolution,
    /// Camera-to-world transform.
    pub transform: WorldTransform,
    /// World-space region outside which samples are ignored.
    pub crop_box: CropBox,
    pub segmentation: SegmentParams,
}

impl FinderConfig {
    pub fn from_json(contents: &str) -> Result<Self> {
        serde_json::from_str(contents)
            .map_err(|e| BlobFinderError::Config(format!("failed to parse config: {e}")))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            BlobFinderError::Config(format!("failed to read config {}: {e}", path.display()))
        })?;
        Self::from_json(&contents)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| BlobFinderError::Config(format!("failed to serialize config: {e}")))
    }
}
