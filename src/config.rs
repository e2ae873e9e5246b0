use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;

use crate::audio::RecorderConfig;
use crate::session::LifecycleConfig;
use crate::video::FrameConfig;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub session: SessionSettings,
    pub audio: AudioSettings,
    pub video: VideoSettings,
}

#[derive(Debug, Deserialize)]
pub struct SessionSettings {
    pub auto_connect_delay_ms: u64,
    pub tool_response_delay_ms: u64,
    pub graph_function: String,
    pub supports_video: bool,
}

#[derive(Debug, Deserialize)]
pub struct AudioSettings {
    pub sample_rate: u32,
    pub fallback_window_samples: usize,
}

#[derive(Debug, Deserialize)]
pub struct VideoSettings {
    pub frame_interval_ms: u64,
    pub frame_scale: f32,
    pub jpeg_quality: u8,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

impl From<&SessionSettings> for LifecycleConfig {
    fn from(s: &SessionSettings) -> Self {
        Self {
            auto_connect_delay: Duration::from_millis(s.auto_connect_delay_ms),
            tool_response_delay: Duration::from_millis(s.tool_response_delay_ms),
            graph_function: s.graph_function.clone(),
            supports_video: s.supports_video,
            ..Self::default()
        }
    }
}

impl From<&AudioSettings> for RecorderConfig {
    fn from(a: &AudioSettings) -> Self {
        Self {
            sample_rate: a.sample_rate,
            fallback_window_samples: a.fallback_window_samples,
            ..Self::default()
        }
    }
}

impl From<&VideoSettings> for FrameConfig {
    fn from(v: &VideoSettings) -> Self {
        Self {
            interval: Duration::from_millis(v.frame_interval_ms),
            scale: v.frame_scale,
            jpeg_quality: v.jpeg_quality,
        }
    }
}
