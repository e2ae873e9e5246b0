pub mod client;
pub mod lifecycle;
pub mod messages;

pub use client::{GraphRenderer, LogRenderer, SessionClient};
pub use lifecycle::{LifecycleConfig, SessionLifecycleController, SessionStats};
pub use messages::{
    FunctionCall, FunctionResponse, RealtimeInput, ToolCall, ToolResponseBatch, AUDIO_PCM_MIME,
    VIDEO_JPEG_MIME,
};
