use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::info;

use crate::error::MediaError;
use crate::platform::{TrackKind, VideoTrack};

/// A controllable video input (webcam or screen capture).
#[async_trait]
pub trait VideoSource: Send + Sync {
    fn kind(&self) -> TrackKind;

    /// Acquire the underlying stream. Restarting an already-streaming source
    /// releases the previous stream first.
    async fn start(&self) -> Result<VideoTrack, MediaError>;

    /// Release the stream, if any. Never fails, safe to call repeatedly.
    fn stop(&self);

    fn is_streaming(&self) -> bool;
}

/// Mutable state shared by the concrete controllers.
pub(crate) struct SourceState {
    pub track: Option<VideoTrack>,
    pub is_back_camera: bool,
    pub watcher: Option<JoinHandle<()>>,
}

impl SourceState {
    pub fn new() -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(Self {
            track: None,
            is_back_camera: false,
            watcher: None,
        }))
    }
}

/// Install `track` as the controller's active stream and watch for the
/// hardware revoking it: an external end clears the streaming state without
/// any `stop()` call.
pub(crate) fn adopt_track(
    state: &Arc<Mutex<SourceState>>,
    track: &VideoTrack,
    back_camera: bool,
    label: &'static str,
) {
    let watcher = {
        let state = Arc::clone(state);
        let mut ended = track.ended();
        tokio::spawn(async move {
            while ended.changed().await.is_ok() {
                if *ended.borrow() {
                    let mut st = state.lock().unwrap();
                    st.track = None;
                    st.is_back_camera = false;
                    st.watcher = None;
                    info!("{} stream ended by device", label);
                    break;
                }
            }
        })
    };

    let mut st = state.lock().unwrap();
    if let Some(previous) = st.track.take() {
        previous.stop();
    }
    if let Some(previous) = st.watcher.take() {
        previous.abort();
    }
    st.track = Some(track.clone());
    st.is_back_camera = back_camera;
    st.watcher = Some(watcher);
}

/// Release the active stream and its ended watcher.
pub(crate) fn release_track(state: &Arc<Mutex<SourceState>>) {
    let mut st = state.lock().unwrap();
    if let Some(track) = st.track.take() {
        track.stop();
    }
    if let Some(watcher) = st.watcher.take() {
        watcher.abort();
    }
    st.is_back_camera = false;
}
