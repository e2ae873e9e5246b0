pub mod fake;
pub mod system;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tokio::sync::{mpsc, watch, Notify};
use tracing::warn;

use crate::error::MediaError;

pub use system::SystemMediaDevices;

/// What a capture track carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Audio,
    Camera,
    Screen,
}

/// Which way a camera points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    /// Rear camera, pointed away from the user.
    Environment,
    /// Front camera, pointed at the user.
    User,
}

/// A single camera acquisition attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraConstraint {
    /// The facing direction must match or the attempt fails.
    FacingExact(Facing),
    /// The facing direction is preferred but not binding.
    FacingIdeal(Facing),
    /// A specific device by identifier.
    DeviceId(String),
    /// Any available camera.
    Any,
}

/// The shape of a [`CameraConstraint`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraConstraintKind {
    FacingExact,
    FacingIdeal,
    DeviceId,
    Any,
}

impl CameraConstraint {
    pub fn kind(&self) -> CameraConstraintKind {
        match self {
            CameraConstraint::FacingExact(_) => CameraConstraintKind::FacingExact,
            CameraConstraint::FacingIdeal(_) => CameraConstraintKind::FacingIdeal,
            CameraConstraint::DeviceId(_) => CameraConstraintKind::DeviceId,
            CameraConstraint::Any => CameraConstraintKind::Any,
        }
    }
}

/// Microphone acquisition settings.
#[derive(Debug, Clone)]
pub struct AudioConstraints {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
    pub channel_count: u16,
}

impl AudioConstraints {
    /// The voice-capture profile: all DSP enabled, forced mono.
    pub fn voice() -> Self {
        Self {
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: true,
            channel_count: 1,
        }
    }
}

/// A video input device as reported by enumeration.
#[derive(Debug, Clone)]
pub struct VideoDeviceInfo {
    pub device_id: String,
    pub label: String,
}

/// An uncompressed video frame (tightly packed RGB8).
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

/// State shared between a track handle and its producing backend.
#[derive(Debug)]
struct TrackShared {
    kind: TrackKind,
    label: String,
    stopped: AtomicBool,
    stop_notify: Notify,
    ended_tx: watch::Sender<bool>,
}

impl TrackShared {
    fn new(kind: TrackKind, label: String) -> Self {
        let (ended_tx, _) = watch::channel(false);
        Self {
            kind,
            label,
            stopped: AtomicBool::new(false),
            stop_notify: Notify::new(),
            ended_tx,
        }
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.stop_notify.notify_waiters();
    }

    async fn closed(&self) {
        loop {
            let notified = self.stop_notify.notified();
            if self.stopped.load(Ordering::SeqCst) {
                return;
            }
            notified.await;
        }
    }
}

/// One open microphone stream.
///
/// Samples arrive as f32 blocks at the negotiated sample rate; the consumer
/// takes the receiving end exactly once. `stop()` releases the underlying
/// hardware; the ended signal fires only when the backend revokes the stream
/// on its own.
#[derive(Debug)]
pub struct AudioTrack {
    shared: Arc<TrackShared>,
    sample_rate: u32,
    samples: Option<mpsc::Receiver<Vec<f32>>>,
}

impl AudioTrack {
    /// Create a track plus its backend-side producer handle.
    pub fn channel(sample_rate: u32, label: impl Into<String>) -> (Self, AudioTrackSource) {
        let shared = Arc::new(TrackShared::new(TrackKind::Audio, label.into()));
        let (tx, rx) = mpsc::channel(64);
        let track = Self {
            shared: Arc::clone(&shared),
            sample_rate,
            samples: Some(rx),
        };
        (track, AudioTrackSource { shared, tx })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn label(&self) -> &str {
        &self.shared.label
    }

    /// Take the sample stream. Returns `None` after the first call.
    pub fn take_samples(&mut self) -> Option<mpsc::Receiver<Vec<f32>>> {
        self.samples.take()
    }

    /// Release the underlying hardware. Safe to call repeatedly.
    pub fn stop(&self) {
        self.shared.stop();
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.stopped.load(Ordering::SeqCst)
    }

    /// Observe asynchronous end-of-stream (hardware/OS revocation).
    pub fn ended(&self) -> watch::Receiver<bool> {
        self.shared.ended_tx.subscribe()
    }
}

/// Backend-side producer for an [`AudioTrack`].
pub struct AudioTrackSource {
    shared: Arc<TrackShared>,
    tx: mpsc::Sender<Vec<f32>>,
}

impl AudioTrackSource {
    /// Forward a block of samples. Blocks are dropped once the track is
    /// stopped, and dropped with a warning when the consumer falls behind —
    /// the capture callback must never block.
    pub fn send_samples(&self, block: Vec<f32>) {
        if self.shared.stopped.load(Ordering::SeqCst) {
            return;
        }
        if let Err(e) = self.tx.try_send(block) {
            warn!("dropping audio block: {}", e);
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.stopped.load(Ordering::SeqCst)
    }

    /// Resolve when the consumer side calls `stop()`.
    pub async fn closed(&self) {
        self.shared.closed().await
    }

    /// Signal asynchronous end-of-stream to the consumer side.
    pub fn end(&self) {
        let _ = self.shared.ended_tx.send_replace(true);
        self.shared.stop();
    }
}

/// One open camera or screen stream.
///
/// The backend keeps the latest decoded frame in a shared cell; consumers
/// sample it at their own cadence rather than draining a queue, which is all
/// the frame scheduler needs. Handles are cheap to clone.
#[derive(Debug, Clone)]
pub struct VideoTrack {
    shared: Arc<TrackShared>,
    frame: Arc<RwLock<Option<RawFrame>>>,
}

impl VideoTrack {
    /// Create a track plus its backend-side producer handle.
    pub fn channel(kind: TrackKind, label: impl Into<String>) -> (Self, VideoTrackSource) {
        let shared = Arc::new(TrackShared::new(kind, label.into()));
        let frame = Arc::new(RwLock::new(None));
        let track = Self {
            shared: Arc::clone(&shared),
            frame: Arc::clone(&frame),
        };
        (track, VideoTrackSource { shared, frame })
    }

    pub fn kind(&self) -> TrackKind {
        self.shared.kind
    }

    pub fn label(&self) -> &str {
        &self.shared.label
    }

    /// The most recent frame, if any has been produced yet.
    pub fn latest_frame(&self) -> Option<RawFrame> {
        self.frame.read().unwrap().clone()
    }

    /// Release the underlying hardware. Safe to call repeatedly.
    pub fn stop(&self) {
        self.shared.stop();
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.stopped.load(Ordering::SeqCst)
    }

    /// Observe asynchronous end-of-stream (hardware/OS revocation).
    pub fn ended(&self) -> watch::Receiver<bool> {
        self.shared.ended_tx.subscribe()
    }
}

/// Backend-side producer for a [`VideoTrack`].
pub struct VideoTrackSource {
    shared: Arc<TrackShared>,
    frame: Arc<RwLock<Option<RawFrame>>>,
}

impl VideoTrackSource {
    /// Publish the latest frame. Ignored once the track is stopped.
    pub fn push_frame(&self, frame: RawFrame) {
        if self.shared.stopped.load(Ordering::SeqCst) {
            return;
        }
        *self.frame.write().unwrap() = Some(frame);
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.stopped.load(Ordering::SeqCst)
    }

    /// Resolve when the consumer side calls `stop()`.
    pub async fn closed(&self) {
        self.shared.closed().await
    }

    /// Signal asynchronous end-of-stream to the consumer side.
    pub fn end(&self) {
        let _ = self.shared.ended_tx.send_replace(true);
        self.shared.stop();
    }
}

/// The capture-hardware boundary.
///
/// Implementations own device discovery and stream acquisition; everything
/// above this trait is platform-independent control logic.
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Acquire an audio-only stream at `sample_rate`.
    async fn open_microphone(
        &self,
        constraints: &AudioConstraints,
        sample_rate: u32,
    ) -> Result<AudioTrack, MediaError>;

    /// Acquire a camera stream satisfying `constraint`.
    async fn open_camera(&self, constraint: &CameraConstraint) -> Result<VideoTrack, MediaError>;

    /// Acquire a screen-capture stream.
    async fn open_screen(&self) -> Result<VideoTrack, MediaError>;

    /// List available video input devices.
    async fn enumerate_video_inputs(&self) -> Result<Vec<VideoDeviceInfo>, MediaError>;

    /// Whether the dedicated low-latency audio pipeline can run here.
    fn supports_worklet(&self) -> bool;

    /// Install a named audio pipeline module. Rejection sends the recorder
    /// down the block-processing fallback path.
    async fn install_pipeline(&self, name: &str) -> Result<(), MediaError>;
}
