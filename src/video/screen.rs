// Screen-capture controller.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::info;

use super::source::{adopt_track, release_track, SourceState, VideoSource};
use crate::error::MediaError;
use crate::platform::{MediaDevices, TrackKind, VideoTrack};

pub struct ScreenController {
    devices: Arc<dyn MediaDevices>,
    state: Arc<Mutex<SourceState>>,
}

impl ScreenController {
    pub fn new(devices: Arc<dyn MediaDevices>) -> Self {
        Self {
            devices,
            state: SourceState::new(),
        }
    }
}

#[async_trait]
impl VideoSource for ScreenController {
    fn kind(&self) -> TrackKind {
        TrackKind::Screen
    }

    async fn start(&self) -> Result<VideoTrack, MediaError> {
        let track = self.devices.open_screen().await?;
        info!("screen capture acquired");
        adopt_track(&self.state, &track, false, "screen");
        Ok(track)
    }

    fn stop(&self) {
        release_track(&self.state);
    }

    fn is_streaming(&self) -> bool {
        self.state.lock().unwrap().track.is_some()
    }
}
