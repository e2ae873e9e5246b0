// Webcam controller with the rear-camera preference ladder.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::source::{adopt_track, release_track, SourceState, VideoSource};
use crate::error::MediaError;
use crate::platform::{CameraConstraint, Facing, MediaDevices, TrackKind, VideoTrack};

pub struct WebcamController {
    devices: Arc<dyn MediaDevices>,
    state: Arc<Mutex<SourceState>>,
}

impl WebcamController {
    pub fn new(devices: Arc<dyn MediaDevices>) -> Self {
        Self {
            devices,
            state: SourceState::new(),
        }
    }

    /// Whether the active stream came from a rear-facing acquisition attempt.
    pub fn is_back_camera(&self) -> bool {
        self.state.lock().unwrap().is_back_camera
    }

    /// Camera acquisition attempts in preference order. Enumeration feeds the
    /// by-device-id attempt; if it fails we go straight to the unconstrained
    /// request.
    async fn acquisition_ladder(&self) -> Vec<(CameraConstraint, bool)> {
        let mut attempts = Vec::new();
        match self.devices.enumerate_video_inputs().await {
            Ok(inputs) => {
                if inputs.len() > 1 {
                    debug!(
                        "{} video inputs: {:?}",
                        inputs.len(),
                        inputs.iter().map(|d| d.label.as_str()).collect::<Vec<_>>()
                    );
                }
                attempts.push((CameraConstraint::FacingExact(Facing::Environment), true));
                attempts.push((CameraConstraint::FacingIdeal(Facing::Environment), true));
                if inputs.len() > 1 {
                    // The rear camera is commonly listed first.
                    attempts.push((CameraConstraint::DeviceId(inputs[0].device_id.clone()), true));
                }
            }
            Err(e) => {
                warn!("video input enumeration failed ({}), requesting default camera", e);
            }
        }
        attempts.push((CameraConstraint::Any, false));
        attempts
    }
}

#[async_trait]
impl VideoSource for WebcamController {
    fn kind(&self) -> TrackKind {
        TrackKind::Camera
    }

    async fn start(&self) -> Result<VideoTrack, MediaError> {
        let mut last_error = None;
        for (constraint, back_camera) in self.acquisition_ladder().await {
            match self.devices.open_camera(&constraint).await {
                Ok(track) => {
                    info!("camera acquired via {:?}", constraint);
                    adopt_track(&self.state, &track, back_camera, "camera");
                    return Ok(track);
                }
                Err(e) => {
                    warn!("camera attempt {:?} failed: {}", constraint, e);
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| MediaError::NotFound("no camera available".into())))
    }

    fn stop(&self) {
        release_track(&self.state);
    }

    fn is_streaming(&self) -> bool {
        self.state.lock().unwrap().track.is_some()
    }
}
