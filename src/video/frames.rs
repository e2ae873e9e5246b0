// Throttled video frame sampling and transmission.
//
// While the session is connected and a track is active, the scheduler samples
// the latest frame at a fixed cadence, downscales it, JPEG-encodes it and
// forwards the base64 payload as a realtime-input item. The loop re-checks the
// connection flag every cycle, so a disconnect halts frames without racing an
// explicit cancel.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::platform::{RawFrame, VideoTrack};
use crate::session::{RealtimeInput, SessionClient};

#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Time between frame captures.
    pub interval: Duration,
    /// Linear scale applied to the native frame before encoding.
    pub scale: f32,
    pub jpeg_quality: u8,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(500), // 2 frames per second
            scale: 0.2,
            jpeg_quality: 70,
        }
    }
}

pub struct FrameScheduler {
    client: Arc<dyn SessionClient>,
    config: FrameConfig,
    frames_sent: Arc<AtomicUsize>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl FrameScheduler {
    pub fn new(client: Arc<dyn SessionClient>, config: FrameConfig) -> Self {
        Self {
            client,
            config,
            frames_sent: Arc::new(AtomicUsize::new(0)),
            task: Mutex::new(None),
        }
    }

    /// Begin sampling `track`. Any previous sampling loop is cancelled first,
    /// so swapping the active stream never leaves a stale timer running.
    pub fn start(&self, track: VideoTrack) {
        self.stop();

        let client = Arc::clone(&self.client);
        let config = self.config.clone();
        let frames_sent = Arc::clone(&self.frames_sent);

        let task = tokio::spawn(async move {
            loop {
                if !client.connected() || track.is_stopped() {
                    break;
                }
                if let Some(frame) = track.latest_frame() {
                    match encode_jpeg_frame(&frame, config.scale, config.jpeg_quality) {
                        Ok(Some(data)) => {
                            client.send_realtime_input(vec![RealtimeInput::jpeg(data)]);
                            frames_sent.fetch_add(1, Ordering::Relaxed);
                        }
                        // Not yet sized; skip without erroring.
                        Ok(None) => {}
                        Err(e) => warn!("failed to encode video frame: {}", e),
                    }
                }
                tokio::time::sleep(config.interval).await;
            }
        });
        *self.task.lock().unwrap() = Some(task);
    }

    /// Cancel the sampling loop, if any.
    pub fn stop(&self) {
        if let Some(task) = self.task.lock().unwrap().take() {
            task.abort();
        }
    }

    pub fn frames_sent(&self) -> usize {
        self.frames_sent.load(Ordering::Relaxed)
    }
}

impl Drop for FrameScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Downscale and encode one frame. Returns `None` when the source or scaled
/// dimensions collapse to zero — such frames are skipped, never sent.
pub fn encode_jpeg_frame(frame: &RawFrame, scale: f32, quality: u8) -> Result<Option<String>> {
    let width = (frame.width as f32 * scale) as u32;
    let height = (frame.height as f32 * scale) as u32;
    if width == 0 || height == 0 {
        return Ok(None);
    }

    let rgb = image::RgbImage::from_raw(frame.width, frame.height, frame.rgb.clone())
        .context("frame buffer does not match its dimensions")?;
    let resized =
        image::DynamicImage::ImageRgb8(rgb).resize_exact(width, height, FilterType::Triangle);

    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality)
        .encode_image(&resized)
        .context("jpeg encoding failed")?;

    Ok(Some(base64::engine::general_purpose::STANDARD.encode(bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_frame(width: u32, height: u32) -> RawFrame {
        RawFrame {
            width,
            height,
            rgb: vec![0x80; (width * height * 3) as usize],
        }
    }

    #[test]
    fn zero_sized_frames_are_skipped() {
        let encoded = encode_jpeg_frame(&solid_frame(0, 0), 0.2, 70).unwrap();
        assert!(encoded.is_none());
    }

    #[test]
    fn tiny_frames_that_scale_to_zero_are_skipped() {
        // 3 * 0.2 rounds down to 0.
        let encoded = encode_jpeg_frame(&solid_frame(3, 3), 0.2, 70).unwrap();
        assert!(encoded.is_none());
    }

    #[test]
    fn encoded_frame_is_bare_base64_jpeg() {
        let encoded = encode_jpeg_frame(&solid_frame(640, 480), 0.2, 70)
            .unwrap()
            .expect("frame should encode");
        assert!(!encoded.contains(','), "no data-URL prefix allowed");

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .unwrap();
        // JPEG SOI marker.
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }
}
