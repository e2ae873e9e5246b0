// Shared test doubles for the integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use live_relay::error::SessionError;
use live_relay::session::{
    GraphRenderer, RealtimeInput, SessionClient, ToolCall, ToolResponseBatch,
};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// In-memory session client that records everything sent through it and lets
/// tests inject inbound tool calls and flip the connection flag.
pub struct FakeSessionClient {
    connected: AtomicBool,
    fail_connect: AtomicBool,
    realtime: Mutex<Vec<RealtimeInput>>,
    tool_responses: Mutex<Vec<ToolResponseBatch>>,
    tool_call_txs: Mutex<Vec<UnboundedSender<ToolCall>>>,
}

impl FakeSessionClient {
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(false),
            fail_connect: AtomicBool::new(false),
            realtime: Mutex::new(Vec::new()),
            tool_responses: Mutex::new(Vec::new()),
            tool_call_txs: Mutex::new(Vec::new()),
        }
    }

    pub fn refuse_connections(&self) {
        self.fail_connect.store(true, Ordering::SeqCst);
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Deliver an inbound tool call to every subscriber.
    pub fn push_tool_call(&self, call: ToolCall) {
        for tx in self.tool_call_txs.lock().unwrap().iter() {
            let _ = tx.send(call.clone());
        }
    }

    pub fn realtime_inputs(&self) -> Vec<RealtimeInput> {
        self.realtime.lock().unwrap().clone()
    }

    pub fn tool_responses(&self) -> Vec<ToolResponseBatch> {
        self.tool_responses.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionClient for FakeSessionClient {
    async fn connect(&self) -> Result<(), SessionError> {
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(SessionError::ConnectionFailed("refused by test".into()));
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    fn connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn volume(&self) -> f32 {
        0.0
    }

    fn send_realtime_input(&self, items: Vec<RealtimeInput>) {
        self.realtime.lock().unwrap().extend(items);
    }

    fn send_tool_response(&self, batch: ToolResponseBatch) {
        self.tool_responses.lock().unwrap().push(batch);
    }

    fn subscribe_tool_calls(&self) -> UnboundedReceiver<ToolCall> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.tool_call_txs.lock().unwrap().push(tx);
        rx
    }
}

/// Renderer that records every graph specification handed to it.
pub struct FakeRenderer {
    specs: Mutex<Vec<String>>,
}

impl FakeRenderer {
    pub fn new() -> Self {
        Self {
            specs: Mutex::new(Vec::new()),
        }
    }

    pub fn specs(&self) -> Vec<String> {
        self.specs.lock().unwrap().clone()
    }
}

impl GraphRenderer for FakeRenderer {
    fn render_graph(&self, spec: &str) {
        self.specs.lock().unwrap().push(spec.to_string());
    }
}
