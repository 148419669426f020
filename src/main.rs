// Example runner for the `depth_blob_finder` library.
//
// Usage: depth_blob_finder <config.json> <depth.png> [mask.png]
//
// The depth image must be 16-bit grayscale in millimetres; the optional mask is
// 8-bit grayscale where zero excludes a pixel. The accepted blobs are printed
// to stdout as JSON.

use anyhow::{Context, bail};
use depth_blob_finder::{BlobFinder, DepthFrame, FinderConfig};
use std::env;
use std::path::Path;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    // --- 1. Argument Parsing & Setup ---
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        println!("Usage: depth_blob_finder <config.json> <depth.png> [mask.png]");
        return Ok(());
    }
    let config = FinderConfig::load(Path::new(&args[1]))?;

    // --- 2. Frame Loading ---
    let depth = image::open(&args[2])
        .with_context(|| format!("failed to open depth image {}", args[2]))?
        .into_luma16();
    let mask = match args.get(3) {
        Some(path) => Some(
            image::open(path)
                .with_context(|| format!("failed to open mask image {path}"))?
                .into_luma8(),
        ),
        None => None,
    };
    let (width, height) = depth.dimensions();
    if (width as usize, height as usize) != (config.sensor.width, config.sensor.height) {
        bail!(
            "depth image is {width}x{height} but the configured sensor is {}x{}",
            config.sensor.width,
            config.sensor.height
        );
    }

    // --- 3. Blob Finding ---
    let mut finder = BlobFinder::new(config)?;
    let frame = DepthFrame::from_image(&depth, config.sensor.intrinsics);
    let blobs = match &mask {
        Some(mask) => finder.process_frame_masked(&frame, mask)?,
        None => finder.process_frame(&frame, None)?,
    };

    // --- 4. Report ---
    println!("{}", serde_json::to_string_pretty(blobs)?);
    Ok(())
}
