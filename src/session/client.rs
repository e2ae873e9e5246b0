use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::info;

use super::messages::{RealtimeInput, ToolCall, ToolResponseBatch};
use crate::error::SessionError;

/// Transport-facing surface of a live session. Implementations own the
/// connection to the remote endpoint; everything above them deals only in
/// wire messages and the connected flag.
///
/// Sends are fire-and-forget: a send while disconnected is dropped by the
/// implementation, never queued.
#[async_trait]
pub trait SessionClient: Send + Sync {
    async fn connect(&self) -> Result<(), SessionError>;

    fn disconnect(&self);

    fn connected(&self) -> bool;

    /// Smoothed playback volume of the remote audio, in `[0, 1]`.
    fn volume(&self) -> f32;

    fn send_realtime_input(&self, items: Vec<RealtimeInput>);

    fn send_tool_response(&self, batch: ToolResponseBatch);

    /// Subscribe to inbound function-call batches. Each subscriber gets its
    /// own stream; batches published before subscription are not replayed.
    fn subscribe_tool_calls(&self) -> UnboundedReceiver<ToolCall>;
}

/// Sink for graph specifications extracted from function calls.
pub trait GraphRenderer: Send + Sync {
    fn render_graph(&self, spec: &str);
}

/// Default renderer: logs the spec instead of drawing it.
pub struct LogRenderer;

impl GraphRenderer for LogRenderer {
    fn render_graph(&self, spec: &str) {
        info!(bytes = spec.len(), "graph specification received");
    }
}
