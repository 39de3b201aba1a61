//! Synthetic - producer and consumer threads over a bounded channel.
//!
//! This example demonstrates:
//! - A transport thread feeding arbitrarily chunked bytes into a `FrameSender`
//! - A decoder thread draining the `FrameReceiver` at its own pace
//! - Backpressure when the decoder falls behind
//!
//! # Running
//!
//! ```sh
//! RUST_LOG=mrcwire=trace cargo run --example synthetic
//! ```

use std::time::Duration;

use mrcwire::channel;
use mrcwire::payload::{AudioPacket, CapturePayload, VideoDimension};
use mrcwire::{ChannelConfig, MrcError};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mrcwire=info")),
        )
        .init();

    let config = ChannelConfig::default()
        .with_capacity(8)
        .with_send_timeout(Duration::from_millis(20));
    let (mut tx, rx) = channel::bounded(config);

    // Encoded session: dimensions, sample rate, then alternating A/V
    let mut stream = Vec::new();
    stream.extend(
        CapturePayload::VideoDimension(VideoDimension {
            width: 1280,
            height: 720,
        })
        .to_frame()
        .to_bytes(),
    );
    stream.extend(CapturePayload::AudioSampleRate(48_000).to_frame().to_bytes());
    for i in 0..120u64 {
        stream.extend(
            CapturePayload::VideoData(vec![(i % 256) as u8; 4096].into())
                .to_frame()
                .to_bytes(),
        );
        stream.extend(
            CapturePayload::AudioData(AudioPacket::new(i * 20_000, 2, &[0.0; 1920]))
                .to_frame()
                .to_bytes(),
        );
    }

    let decoder = std::thread::spawn(move || {
        let mut frames = 0usize;
        while let Ok(Some(frame)) = rx.recv_timeout(Duration::from_secs(1)) {
            frames += 1;
            // Simulate a slow decoder
            std::thread::sleep(Duration::from_micros(500));
            if let Ok(CapturePayload::VideoDimension(dim)) = CapturePayload::try_from(&frame) {
                info!("Configuring decoder for {}x{}", dim.width, dim.height);
            }
        }
        frames
    });

    // Transport reads never line up with frame boundaries
    for chunk in stream.chunks(1500) {
        let mut result = tx.add_data(chunk);
        while let Err(MrcError::Backpressure) = result {
            warn!("Decoder behind, retrying");
            result = tx.flush();
        }
        result?;
    }
    drop(tx);

    let frames = decoder.join().map_err(|_| "decoder thread panicked")?;
    info!("Decoded {} frames", frames);
    Ok(())
}
