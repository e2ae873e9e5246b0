use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Mime type of outbound audio chunks.
pub const AUDIO_PCM_MIME: &str = "audio/pcm;rate=16000";

/// Mime type of outbound video frames.
pub const VIDEO_JPEG_MIME: &str = "image/jpeg";

/// One media payload forwarded to the remote endpoint: a mime type plus a
/// bare base64 body (no data-URL prefix).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealtimeInput {
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    pub data: String,
}

impl RealtimeInput {
    pub fn audio_pcm(data: String) -> Self {
        Self {
            mime_type: AUDIO_PCM_MIME.into(),
            data,
        }
    }

    pub fn jpeg(data: String) -> Self {
        Self {
            mime_type: VIDEO_JPEG_MIME.into(),
            data,
        }
    }
}

/// One remote-requested function invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub id: String,
    #[serde(default)]
    pub args: Value,
}

/// An inbound batch of function invocations. Every invocation must be
/// answered exactly once, keyed by its identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(rename = "functionCalls")]
    pub function_calls: Vec<FunctionCall>,
}

/// The answer to one invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionResponse {
    pub id: String,
    pub response: Value,
}

/// The outbound acknowledgement batch for one [`ToolCall`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResponseBatch {
    #[serde(rename = "functionResponses")]
    pub function_responses: Vec<FunctionResponse>,
}
