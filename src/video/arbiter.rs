// Single-active-video-source enforcement.

use std::sync::{Arc, Mutex};

use tracing::info;

use super::source::VideoSource;
use crate::error::MediaError;
use crate::platform::{TrackKind, VideoTrack};

/// Arbitrates between the registered video sources so that at most one is
/// streaming at any time. Selecting a source stops every other source before
/// the new acquisition begins; selecting `None` stops them all.
///
/// `select` is not reentrant-safe: overlapping calls must be serialized by the
/// caller (the UI disables its source buttons while a switch is in flight).
pub struct StreamArbiter {
    sources: Vec<Arc<dyn VideoSource>>,
    active: Mutex<Option<VideoTrack>>,
}

impl StreamArbiter {
    pub fn new(sources: Vec<Arc<dyn VideoSource>>) -> Self {
        Self {
            sources,
            active: Mutex::new(None),
        }
    }

    /// Switch the active stream to the source of the given kind, or to none.
    pub async fn select(&self, next: Option<TrackKind>) -> Result<Option<VideoTrack>, MediaError> {
        for source in &self.sources {
            if Some(source.kind()) != next {
                source.stop();
            }
        }
        *self.active.lock().unwrap() = None;

        let Some(kind) = next else {
            info!("video sources cleared");
            return Ok(None);
        };

        let source = self
            .sources
            .iter()
            .find(|s| s.kind() == kind)
            .ok_or_else(|| MediaError::NotFound(format!("no registered source for {:?}", kind)))?;

        let track = source.start().await?;
        *self.active.lock().unwrap() = Some(track.clone());
        info!("active video source: {:?}", kind);
        Ok(Some(track))
    }

    /// The currently active track, if any.
    pub fn active(&self) -> Option<VideoTrack> {
        self.active.lock().unwrap().clone()
    }

    /// Stop every registered source and clear the active track.
    pub fn stop_all(&self) {
        for source in &self.sources {
            source.stop();
        }
        *self.active.lock().unwrap() = None;
    }
}
