pub mod audio;
pub mod config;
pub mod error;
pub mod events;
pub mod platform;
pub mod session;
pub mod video;

pub use audio::{encode_pcm_chunk, AudioRecorder, RecorderConfig, VolumeMeter};
pub use config::Config;
pub use error::{MediaError, SessionError};
pub use platform::{MediaDevices, SystemMediaDevices, TrackKind};
pub use session::{
    LifecycleConfig, RealtimeInput, SessionClient, SessionLifecycleController, SessionStats,
    ToolCall, ToolResponseBatch,
};
pub use video::{FrameConfig, FrameScheduler, ScreenController, StreamArbiter, WebcamController};
