// THEORY:
// The `frame_loop` is the glue between an asynchronous sensor driver and the
// synchronous `BlobFinder`. The driver pushes frames into a channel whenever its
// frame-ready signal fires; the loop pulls them one at a time, runs the finder
// to completion on the current task and publishes a snapshot of the history.
//
// Frames are never processed concurrently. A frame that fails is logged and
// dropped; the next one is processed normally.

use crate::core_modules::blob::BlobDescriptor;
use crate::core_modules::sensor::{DepthFrame, DepthIntrinsics, PointCloudFrame};
use crate::pipeline::BlobFinder;
use log::{debug, warn};
use nalgebra::Vector3;
use tokio::sync::{mpsc, watch};

/// Owned frame payload as delivered by a sensor driver.
#[derive(Debug, Clone)]
pub enum FramePayload {
    /// Raw depth in millimetres plus the intrinsics to unproject it.
    Depth {
        depth_mm: Vec<u16>,
        intrinsics: DepthIntrinsics,
    },
    /// Already unprojected camera-space points in metres.
    Points(Vec<Vector3<f32>>),
}

/// One sensor frame, optionally with a background-subtraction mask.
#[derive(Debug, Clone)]
pub struct OwnedFrame {
    pub frame_id: u64,
    pub width: usize,
    pub height: usize,
    pub payload: FramePayload,
    pub mask: Option<Vec<u8>>,
}

/// The published result of the latest successfully processed frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlobSnapshot {
    pub frame_id: u64,
    pub current: Vec<BlobDescriptor>,
    pub previous: Vec<BlobDescriptor>,
}

/// Processes frames from `frames` until the channel closes, publishing a
/// snapshot after each successful frame. Returns the finder and the number of
/// frames that were segmented.
pub async fn run(
    mut finder: BlobFinder,
    mut frames: mpsc::Receiver<OwnedFrame>,
    publish: watch::Sender<BlobSnapshot>,
) -> (BlobFinder, u64) {
    let mut processed = 0u64;

    while let Some(frame) = frames.recv().await {
        let mask = frame.mask.as_deref();
        let result = match &frame.payload {
            FramePayload::Depth {
                depth_mm,
                intrinsics,
            } => {
                let source = DepthFrame::new(frame.width, frame.height, depth_mm, *intrinsics);
                finder.process_frame(&source, mask).map(|blobs| blobs.len())
            }
            FramePayload::Points(points) => {
                let source = PointCloudFrame::new(frame.width, frame.height, points);
                finder.process_frame(&source, mask).map(|blobs| blobs.len())
            }
        };

        match result {
            Ok(count) => {
                processed += 1;
                debug!("frame_loop: frame {} -> {} blobs", frame.frame_id, count);
                publish.send_replace(BlobSnapshot {
                    frame_id: frame.frame_id,
                    current: finder.blobs().to_vec(),
                    previous: finder.last_blobs().to_vec(),
                });
            }
            Err(e) => warn!("frame_loop: frame {} dropped: {e}", frame.frame_id),
        }
    }

    debug!("frame_loop: channel closed after {processed} frames");
    (finder, processed)
}
