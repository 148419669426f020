// THEORY:
// `BlobHistory` is the only memory the blob finder keeps between frames: the
// blobs of the frame just segmented and those of the one before. There is no
// association between the two sets. A caller that wants smoothing or tracking
// compares them itself.

use crate::core_modules::blob::BlobDescriptor;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlobHistory {
    current: Vec<BlobDescriptor>,
    previous: Vec<BlobDescriptor>,
}

impl BlobHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves `current` into `previous` and installs `blobs` as `current`.
    pub fn rotate(&mut self, blobs: Vec<BlobDescriptor>) {
        self.previous = std::mem::replace(&mut self.current, blobs);
    }

    pub fn current(&self) -> &[BlobDescriptor] {
        &self.current
    }

    pub fn previous(&self) -> &[BlobDescriptor] {
        &self.previous
    }

    /// Number of blobs in the current frame.
    pub fn count(&self) -> usize {
        self.current.len()
    }

    pub fn clear(&mut self) {
        self.current.clear();
        self.previous.clear();
    }
}
