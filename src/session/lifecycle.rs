// Session lifecycle orchestration.
//
// The controller owns the glue between the media side (recorder, video
// arbiter, frame scheduler) and the session client: it pumps encoded audio
// into the session while connected, mirrors the microphone volume, answers
// inbound function calls, and drives the connect/disconnect transitions.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::client::{GraphRenderer, SessionClient};
use super::messages::{FunctionResponse, RealtimeInput, ToolCall, ToolResponseBatch};
use crate::audio::AudioRecorder;
use crate::platform::TrackKind;
use crate::video::{FrameScheduler, StreamArbiter};

#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    pub session_id: String,
    /// How long after startup to attempt the initial connect.
    pub auto_connect_delay: Duration,
    /// Pause between receiving a function-call batch and acknowledging it.
    pub tool_response_delay: Duration,
    /// Name of the function whose argument carries a graph specification.
    pub graph_function: String,
    /// Whether the camera should be brought up automatically on connect.
    pub supports_video: bool,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            auto_connect_delay: Duration::from_millis(1000),
            tool_response_delay: Duration::from_millis(200),
            graph_function: "render_graph".into(),
            supports_video: true,
        }
    }
}

/// Point-in-time counters for one session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub audio_chunks_sent: usize,
    pub frames_sent: usize,
    pub tool_calls_handled: usize,
}

pub struct SessionLifecycleController {
    config: LifecycleConfig,
    client: Arc<dyn SessionClient>,
    recorder: Arc<AudioRecorder>,
    arbiter: Arc<StreamArbiter>,
    scheduler: Arc<FrameScheduler>,
    renderer: Arc<dyn GraphRenderer>,
    muted: AtomicBool,
    camera_autostarted: AtomicBool,
    audio_chunks_sent: AtomicUsize,
    tool_calls_handled: AtomicUsize,
    // f32 bit pattern of the latest microphone volume reading.
    input_volume_bits: AtomicU32,
    started_at: DateTime<Utc>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl SessionLifecycleController {
    pub fn new(
        config: LifecycleConfig,
        client: Arc<dyn SessionClient>,
        recorder: Arc<AudioRecorder>,
        arbiter: Arc<StreamArbiter>,
        scheduler: Arc<FrameScheduler>,
        renderer: Arc<dyn GraphRenderer>,
    ) -> Self {
        Self {
            config,
            client,
            recorder,
            arbiter,
            scheduler,
            renderer,
            muted: AtomicBool::new(false),
            camera_autostarted: AtomicBool::new(false),
            audio_chunks_sent: AtomicUsize::new(0),
            tool_calls_handled: AtomicUsize::new(0),
            input_volume_bits: AtomicU32::new(0),
            started_at: Utc::now(),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Spawn the background pumps. Called once after construction; the tasks
    /// live until [`shutdown`](Self::shutdown).
    pub fn start(self: &Arc<Self>) {
        let mut tasks = self.tasks.lock().unwrap();

        // Audio pump: encoded chunks flow to the session in arrival order,
        // but only while connected. Chunks produced while disconnected are
        // discarded, never buffered.
        {
            let this = Arc::clone(self);
            let mut data = self.recorder.data_events();
            tasks.push(tokio::spawn(async move {
                while let Some(chunk) = data.recv().await {
                    if !this.client.connected() {
                        continue;
                    }
                    this.client
                        .send_realtime_input(vec![RealtimeInput::audio_pcm(chunk)]);
                    this.audio_chunks_sent.fetch_add(1, Ordering::Relaxed);
                }
            }));
        }

        // Volume mirror for UI readouts.
        {
            let this = Arc::clone(self);
            let mut volume = self.recorder.volume_events();
            tasks.push(tokio::spawn(async move {
                while let Some(level) = volume.recv().await {
                    this.input_volume_bits
                        .store(level.to_bits(), Ordering::Relaxed);
                }
            }));
        }

        // Tool-call responder.
        {
            let this = Arc::clone(self);
            let mut calls = self.client.subscribe_tool_calls();
            tasks.push(tokio::spawn(async move {
                while let Some(call) = calls.recv().await {
                    this.handle_tool_call(call).await;
                }
            }));
        }

        // Delayed initial connect. One attempt; a failure is logged and the
        // caller is expected to connect explicitly.
        {
            let this = Arc::clone(self);
            let delay = self.config.auto_connect_delay;
            tasks.push(tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                if this.client.connected() {
                    return;
                }
                if let Err(e) = this.connect().await {
                    warn!("automatic connect failed: {}", e);
                }
            }));
        }
    }

    async fn handle_tool_call(&self, call: ToolCall) {
        debug!(calls = call.function_calls.len(), "tool call received");

        if let Some(fc) = call
            .function_calls
            .iter()
            .find(|fc| fc.name == self.config.graph_function)
        {
            if let Some(spec) = fc.args.get("json_graph").and_then(|v| v.as_str()) {
                self.renderer.render_graph(spec);
            }
        }

        // A batch with no invocations needs no acknowledgement.
        if call.function_calls.is_empty() {
            return;
        }

        tokio::time::sleep(self.config.tool_response_delay).await;

        let batch = ToolResponseBatch {
            function_responses: call
                .function_calls
                .iter()
                .map(|fc| FunctionResponse {
                    id: fc.id.clone(),
                    response: serde_json::json!({ "output": { "success": true } }),
                })
                .collect(),
        };
        self.client.send_tool_response(batch);
        self.tool_calls_handled.fetch_add(1, Ordering::Relaxed);
    }

    /// Connect the session and bring up the default media sources.
    pub async fn connect(&self) -> Result<()> {
        self.client.connect().await?;
        info!(session_id = %self.config.session_id, "session connected");

        if !self.muted.load(Ordering::Relaxed) {
            self.recorder.start().await?;
        }

        // A source that survived a disconnect resumes sending frames. The
        // camera autostart fires once per connection, and only when no video
        // source is already active.
        if self.config.supports_video {
            if let Some(track) = self.arbiter.active() {
                self.scheduler.start(track);
            } else if !self.camera_autostarted.swap(true, Ordering::SeqCst) {
                match self.arbiter.select(Some(TrackKind::Camera)).await {
                    Ok(Some(track)) => self.scheduler.start(track),
                    Ok(None) => {}
                    Err(e) => warn!("camera autostart failed: {}", e),
                }
            }
        }
        Ok(())
    }

    /// Tear down the connection. Capture pipelines halt; the video sources
    /// keep their tracks so a reconnect resumes where it left off.
    pub fn disconnect(&self) {
        self.client.disconnect();
        self.recorder.stop();
        self.scheduler.stop();
        self.camera_autostarted.store(false, Ordering::SeqCst);
        info!(session_id = %self.config.session_id, "session disconnected");
    }

    /// Mute or unmute the microphone. Takes effect immediately while
    /// connected and is remembered across reconnects.
    pub async fn set_muted(&self, muted: bool) -> Result<()> {
        self.muted.store(muted, Ordering::Relaxed);
        if self.client.connected() {
            if muted {
                self.recorder.stop();
            } else {
                self.recorder.start().await?;
            }
        }
        Ok(())
    }

    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::Relaxed)
    }

    /// Manually switch the active video source. `None` turns video off.
    pub async fn select_source(&self, kind: Option<TrackKind>) -> Result<()> {
        match self.arbiter.select(kind).await? {
            Some(track) => self.scheduler.start(track),
            None => self.scheduler.stop(),
        }
        Ok(())
    }

    /// Smoothed microphone level in `[0, 1]`.
    pub fn input_volume(&self) -> f32 {
        f32::from_bits(self.input_volume_bits.load(Ordering::Relaxed))
    }

    /// Remote playback level, straight from the client.
    pub fn output_volume(&self) -> f32 {
        self.client.volume()
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            session_id: self.config.session_id.clone(),
            started_at: self.started_at,
            audio_chunks_sent: self.audio_chunks_sent.load(Ordering::Relaxed),
            frames_sent: self.scheduler.frames_sent(),
            tool_calls_handled: self.tool_calls_handled.load(Ordering::Relaxed),
        }
    }

    /// Full teardown: background pumps, capture pipelines and the connection.
    pub fn shutdown(&self) {
        for task in self.tasks.lock().unwrap().drain(..) {
            task.abort();
        }
        self.scheduler.stop();
        self.recorder.close();
        self.arbiter.stop_all();
        self.client.disconnect();
        info!(session_id = %self.config.session_id, "session shut down");
    }
}
