//! Replay - decode a recorded capture stream.
//!
//! This example demonstrates:
//! - Pumping an async byte source into a `StreamFramer`
//! - Interpreting popped frames with `CapturePayload`
//! - Resetting the session after corruption
//!
//! # Running
//!
//! ```sh
//! RUST_LOG=mrcwire=debug cargo run --example replay -- capture.bin
//! ```

use mrcwire::io::pump_async;
use mrcwire::payload::CapturePayload;
use mrcwire::StreamFramer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mrcwire=info")),
        )
        .init();

    let path = std::env::args()
        .nth(1)
        .ok_or("usage: replay <capture-file>")?;
    let file = tokio::fs::File::open(&path).await?;

    let framer = StreamFramer::new();
    let read = pump_async(file, &framer).await?;
    info!("Read {} bytes from {}", read, path);

    let (mut video_bytes, mut audio_samples) = (0usize, 0usize);
    while let Some(frame) = framer.pop_frame() {
        match CapturePayload::try_from(&frame) {
            Ok(CapturePayload::VideoDimension(dim)) => {
                info!("Video dimension {}x{}", dim.width, dim.height)
            }
            Ok(CapturePayload::VideoData(data)) => video_bytes += data.len(),
            Ok(CapturePayload::AudioSampleRate(rate)) => info!("Audio sample rate {}", rate),
            Ok(CapturePayload::AudioData(packet)) => audio_samples += packet.sample_count(),
            Err(e) => warn!("Skipping frame: {}", e),
        }
    }

    info!(
        "{} frames, {} video bytes, {} audio samples",
        framer.frames_parsed(),
        video_bytes,
        audio_samples
    );

    if let Some(e) = framer.parse_error() {
        error!("Stream corrupted: {}", e);
        framer.reset();
    }

    Ok(())
}
