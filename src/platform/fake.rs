// Scriptable device layer for tests.
//
// Every acquisition behavior the control plane depends on can be staged here:
// denied microphones, slow acquisition, camera constraints that only some
// attempts satisfy, failing enumeration, failing pipeline installation, and
// hardware-revoked streams.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::{
    AudioConstraints, AudioTrack, AudioTrackSource, CameraConstraint, CameraConstraintKind,
    MediaDevices, RawFrame, TrackKind, VideoDeviceInfo, VideoTrack, VideoTrackSource,
};
use crate::error::MediaError;

struct Inner {
    deny_microphone: bool,
    mic_delay: Duration,
    worklet_supported: bool,
    fail_pipeline_install: bool,
    enumeration_fails: bool,
    video_inputs: Vec<VideoDeviceInfo>,
    camera_accepts: HashSet<CameraConstraintKind>,
    screen_available: bool,
    audio_sources: Vec<Arc<AudioTrackSource>>,
    video_sources: Vec<Arc<VideoTrackSource>>,
    camera_attempts: Vec<CameraConstraint>,
}

pub struct FakeMediaDevices {
    inner: Mutex<Inner>,
}

impl FakeMediaDevices {
    /// A permissive default: microphone available, worklet supported, one
    /// camera that satisfies any constraint, screen available.
    pub fn new() -> Self {
        let mut camera_accepts = HashSet::new();
        camera_accepts.insert(CameraConstraintKind::FacingExact);
        camera_accepts.insert(CameraConstraintKind::FacingIdeal);
        camera_accepts.insert(CameraConstraintKind::DeviceId);
        camera_accepts.insert(CameraConstraintKind::Any);

        Self {
            inner: Mutex::new(Inner {
                deny_microphone: false,
                mic_delay: Duration::ZERO,
                worklet_supported: true,
                fail_pipeline_install: false,
                enumeration_fails: false,
                video_inputs: vec![VideoDeviceInfo {
                    device_id: "cam-0".into(),
                    label: "Fake Camera".into(),
                }],
                camera_accepts,
                screen_available: true,
                audio_sources: Vec::new(),
                video_sources: Vec::new(),
                camera_attempts: Vec::new(),
            }),
        }
    }

    pub fn deny_microphone(self) -> Self {
        self.inner.lock().unwrap().deny_microphone = true;
        self
    }

    pub fn with_mic_delay(self, delay: Duration) -> Self {
        self.inner.lock().unwrap().mic_delay = delay;
        self
    }

    pub fn without_worklet(self) -> Self {
        self.inner.lock().unwrap().worklet_supported = false;
        self
    }

    pub fn with_failing_pipeline_install(self) -> Self {
        self.inner.lock().unwrap().fail_pipeline_install = true;
        self
    }

    pub fn with_enumeration_failure(self) -> Self {
        self.inner.lock().unwrap().enumeration_fails = true;
        self
    }

    pub fn with_video_inputs(self, inputs: Vec<VideoDeviceInfo>) -> Self {
        self.inner.lock().unwrap().video_inputs = inputs;
        self
    }

    /// Restrict which constraint shapes the fake camera satisfies.
    pub fn accept_camera(self, kinds: &[CameraConstraintKind]) -> Self {
        self.inner.lock().unwrap().camera_accepts = kinds.iter().copied().collect();
        self
    }

    pub fn without_screen(self) -> Self {
        self.inner.lock().unwrap().screen_available = false;
        self
    }

    /// Producer handle for the most recently opened microphone.
    pub fn audio_source(&self) -> Option<Arc<AudioTrackSource>> {
        self.inner.lock().unwrap().audio_sources.last().cloned()
    }

    /// Producer handle for the most recently opened camera/screen.
    pub fn video_source(&self) -> Option<Arc<VideoTrackSource>> {
        self.inner.lock().unwrap().video_sources.last().cloned()
    }

    /// Feed a block of samples into the most recent microphone track.
    pub fn push_audio(&self, block: Vec<f32>) {
        if let Some(source) = self.audio_source() {
            source.send_samples(block);
        }
    }

    /// Publish a solid-color frame of the given size on the most recent video
    /// track.
    pub fn push_frame(&self, width: u32, height: u32) {
        if let Some(source) = self.video_source() {
            source.push_frame(RawFrame {
                width,
                height,
                rgb: vec![0x40; (width * height * 3) as usize],
            });
        }
    }

    /// Revoke the most recent video track, as the OS would.
    pub fn end_video(&self) {
        if let Some(source) = self.video_source() {
            source.end();
        }
    }

    /// Every camera constraint attempted so far, in order.
    pub fn camera_attempts(&self) -> Vec<CameraConstraint> {
        self.inner.lock().unwrap().camera_attempts.clone()
    }
}

impl Default for FakeMediaDevices {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaDevices for FakeMediaDevices {
    async fn open_microphone(
        &self,
        _constraints: &AudioConstraints,
        sample_rate: u32,
    ) -> Result<AudioTrack, MediaError> {
        let (deny, delay) = {
            let inner = self.inner.lock().unwrap();
            (inner.deny_microphone, inner.mic_delay)
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if deny {
            return Err(MediaError::AccessDenied("microphone permission refused".into()));
        }
        let (track, source) = AudioTrack::channel(sample_rate, "Fake Microphone");
        self.inner.lock().unwrap().audio_sources.push(Arc::new(source));
        Ok(track)
    }

    async fn open_camera(&self, constraint: &CameraConstraint) -> Result<VideoTrack, MediaError> {
        let mut inner = self.inner.lock().unwrap();
        inner.camera_attempts.push(constraint.clone());
        if !inner.camera_accepts.contains(&constraint.kind()) {
            return Err(MediaError::NotFound(format!(
                "no camera satisfies {:?}",
                constraint
            )));
        }
        let (track, source) = VideoTrack::channel(TrackKind::Camera, "Fake Camera");
        inner.video_sources.push(Arc::new(source));
        Ok(track)
    }

    async fn open_screen(&self) -> Result<VideoTrack, MediaError> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.screen_available {
            return Err(MediaError::AccessDenied("screen capture refused".into()));
        }
        let (track, source) = VideoTrack::channel(TrackKind::Screen, "Fake Screen");
        inner.video_sources.push(Arc::new(source));
        Ok(track)
    }

    async fn enumerate_video_inputs(&self) -> Result<Vec<VideoDeviceInfo>, MediaError> {
        let inner = self.inner.lock().unwrap();
        if inner.enumeration_fails {
            return Err(MediaError::EnumerationFailed("device list unavailable".into()));
        }
        Ok(inner.video_inputs.clone())
    }

    fn supports_worklet(&self) -> bool {
        self.inner.lock().unwrap().worklet_supported
    }

    async fn install_pipeline(&self, name: &str) -> Result<(), MediaError> {
        if self.inner.lock().unwrap().fail_pipeline_install {
            return Err(MediaError::PipelineUnavailable(format!(
                "module '{}' rejected",
                name
            )));
        }
        Ok(())
    }
}
