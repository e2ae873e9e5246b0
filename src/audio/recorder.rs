// Microphone capture engine.
//
// Acquires an audio-only stream, runs it through either the dedicated worklet
// pipelines (PCM recorder + vu meter on their own tasks) or the synchronous
// block-processing fallback, and emits base64 PCM chunks and volume readings.
// Downstream consumers cannot tell which path is active.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use base64::Engine as _;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::meter::VolumeMeter;
use super::worklet::{
    self, PcmRecorderProcessor, VuMeterProcessor, WorkletEvent, WorkletProcessor, RECORDER_MODULE,
    VU_METER_MODULE,
};
use crate::error::MediaError;
use crate::events::Emitter;
use crate::platform::{AudioConstraints, AudioTrack, MediaDevices};

/// Sample rate of every emitted chunk.
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// Window size of the block-processing fallback path.
pub const FALLBACK_WINDOW_SAMPLES: usize = 4096;

#[derive(Debug, Clone)]
pub struct RecorderConfig {
    pub sample_rate: u32,
    pub fallback_window_samples: usize,
    /// Classify the environment as a constrained device and skip the worklet
    /// path entirely.
    pub constrained_device: bool,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            sample_rate: TARGET_SAMPLE_RATE,
            fallback_window_samples: FALLBACK_WINDOW_SAMPLES,
            constrained_device: false,
        }
    }
}

enum EngineState {
    Idle,
    Starting { stop_requested: bool },
    Running(Running),
}

struct Running {
    track: AudioTrack,
    tasks: Vec<JoinHandle<()>>,
    // Cleared by stop() before the tasks are aborted, so a task mid-poll on
    // another worker cannot emit past the stop.
    live: Arc<AtomicBool>,
}

pub struct AudioRecorder {
    devices: Arc<dyn MediaDevices>,
    config: RecorderConfig,
    data: Arc<Emitter<String>>,
    volume: Arc<Emitter<f32>>,
    state: Mutex<EngineState>,
}

impl AudioRecorder {
    pub fn new(devices: Arc<dyn MediaDevices>, config: RecorderConfig) -> Self {
        Self {
            devices,
            config,
            data: Arc::new(Emitter::new()),
            volume: Arc::new(Emitter::new()),
            state: Mutex::new(EngineState::Idle),
        }
    }

    /// Base64 PCM chunks, in capture order.
    pub fn data_events(&self) -> mpsc::UnboundedReceiver<String> {
        self.data.subscribe()
    }

    /// Loudness readings in [0, 1].
    pub fn volume_events(&self) -> mpsc::UnboundedReceiver<f32> {
        self.volume.subscribe()
    }

    pub fn is_recording(&self) -> bool {
        matches!(*self.state.lock().unwrap(), EngineState::Running(_))
    }

    /// Acquire the microphone and start emitting. Idempotent while already
    /// starting or running. Permission refusal rejects with
    /// [`MediaError::AccessDenied`] and nothing is emitted.
    pub async fn start(&self) -> Result<(), MediaError> {
        {
            let mut state = self.state.lock().unwrap();
            match *state {
                EngineState::Idle => *state = EngineState::Starting { stop_requested: false },
                _ => return Ok(()),
            }
        }

        let mut track = match self
            .devices
            .open_microphone(&AudioConstraints::voice(), self.config.sample_rate)
            .await
        {
            Ok(track) => track,
            Err(e) => {
                *self.state.lock().unwrap() = EngineState::Idle;
                return Err(e);
            }
        };

        let samples = match track.take_samples() {
            Some(samples) => samples,
            None => {
                track.stop();
                *self.state.lock().unwrap() = EngineState::Idle;
                return Err(MediaError::PipelineUnavailable(
                    "sample stream already consumed".into(),
                ));
            }
        };

        let live = Arc::new(AtomicBool::new(true));
        let tasks = match self.try_worklet_pipelines(samples, Arc::clone(&live)).await {
            Ok(tasks) => tasks,
            Err((samples, e)) => {
                warn!("worklet pipeline unavailable ({}), using fallback audio processing", e);
                vec![self.spawn_fallback(samples, Arc::clone(&live))]
            }
        };

        // stop() may have been called while acquisition was pending; honor it
        // now that there is something to tear down.
        let mut state = self.state.lock().unwrap();
        match std::mem::replace(&mut *state, EngineState::Idle) {
            EngineState::Starting { stop_requested: false } => {
                *state = EngineState::Running(Running { track, tasks, live });
                info!("audio recorder started");
            }
            _ => {
                drop(state);
                live.store(false, Ordering::SeqCst);
                for task in &tasks {
                    task.abort();
                }
                track.stop();
                info!("audio recorder stopped before start completed");
            }
        }
        Ok(())
    }

    /// Release the microphone and halt emission. Safe to call at any time: a
    /// stop during a pending `start()` is deferred until the start settles,
    /// then executed immediately. No chunk is emitted after this completes.
    pub fn stop(&self) {
        let mut state = self.state.lock().unwrap();
        match std::mem::replace(&mut *state, EngineState::Idle) {
            EngineState::Idle => {}
            EngineState::Starting { .. } => {
                *state = EngineState::Starting { stop_requested: true };
                info!("stop requested while audio start is pending");
            }
            EngineState::Running(running) => {
                drop(state);
                running.live.store(false, Ordering::SeqCst);
                for task in &running.tasks {
                    task.abort();
                }
                running.track.stop();
                info!("audio recorder stopped");
            }
        }
    }

    /// Stop and detach every subscriber.
    pub fn close(&self) {
        self.stop();
        self.data.clear();
        self.volume.clear();
    }

    /// Install and wire the dedicated pipelines, or hand the sample stream
    /// back for the fallback path.
    async fn try_worklet_pipelines(
        &self,
        samples: mpsc::Receiver<Vec<f32>>,
        live: Arc<AtomicBool>,
    ) -> Result<Vec<JoinHandle<()>>, (mpsc::Receiver<Vec<f32>>, MediaError)> {
        if self.config.constrained_device {
            return Err((
                samples,
                MediaError::PipelineUnavailable("environment classified as constrained device".into()),
            ));
        }
        if !self.devices.supports_worklet() {
            return Err((
                samples,
                MediaError::PipelineUnavailable("backend does not host worklets".into()),
            ));
        }
        if let Err(e) = self.devices.install_pipeline(RECORDER_MODULE).await {
            return Err((samples, e));
        }
        if let Err(e) = self.devices.install_pipeline(VU_METER_MODULE).await {
            return Err((samples, e));
        }

        let recorder_module = worklet::ensure_module(RECORDER_MODULE, recorder_factory);
        let vu_module = worklet::ensure_module(VU_METER_MODULE, vu_factory);

        let (recorder_tx, recorder_rx) = mpsc::channel::<Vec<f32>>(64);
        let (vu_tx, vu_rx) = mpsc::channel::<Vec<f32>>(64);
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();

        // Fan the capture stream out to both pipelines.
        let mut samples = samples;
        let pump = tokio::spawn(async move {
            while let Some(block) = samples.recv().await {
                if let Err(mpsc::error::TrySendError::Full(_)) = vu_tx.try_send(block.clone()) {
                    warn!("metering pipeline behind, dropping block");
                }
                if let Err(mpsc::error::TrySendError::Closed(_)) = recorder_tx.try_send(block) {
                    break;
                }
            }
        });

        let recorder_node = worklet::spawn_node(&recorder_module, recorder_rx, event_tx.clone());
        let vu_node = worklet::spawn_node(&vu_module, vu_rx, event_tx);

        let data = Arc::clone(&self.data);
        let volume = Arc::clone(&self.volume);
        let emit = tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                if !live.load(Ordering::SeqCst) {
                    break;
                }
                match event {
                    WorkletEvent::Chunk(frame) => data.emit(encode_pcm_chunk(&frame)),
                    WorkletEvent::Volume(reading) => volume.emit(reading),
                }
            }
        });

        info!("audio worklet pipelines installed");
        Ok(vec![pump, recorder_node, vu_node, emit])
    }

    /// Block-processing path: one task buffers samples into a fixed window,
    /// emits the window's RMS volume and its PCM chunk as the window fills.
    fn spawn_fallback(
        &self,
        mut samples: mpsc::Receiver<Vec<f32>>,
        live: Arc<AtomicBool>,
    ) -> JoinHandle<()> {
        let window_len = self.config.fallback_window_samples;
        let data = Arc::clone(&self.data);
        let volume = Arc::clone(&self.volume);

        tokio::spawn(async move {
            let mut window: Vec<f32> = Vec::with_capacity(window_len);
            while let Some(block) = samples.recv().await {
                for &sample in &block {
                    window.push(sample);
                    if window.len() == window_len {
                        // stop() may land while a window is mid-flight.
                        if !live.load(Ordering::SeqCst) {
                            return;
                        }
                        volume.emit(VolumeMeter::rms(&window));
                        let pcm: Vec<i16> = window.iter().map(|&s| worklet::pcm16(s)).collect();
                        data.emit(encode_pcm_chunk(&pcm));
                        window.clear();
                    }
                }
            }
        })
    }
}

fn recorder_factory() -> Box<dyn WorkletProcessor> {
    Box::new(PcmRecorderProcessor::new())
}

fn vu_factory() -> Box<dyn WorkletProcessor> {
    Box::new(VuMeterProcessor::new())
}

/// Encode a PCM frame as little-endian bytes, base64, no enclosing prefix.
pub fn encode_pcm_chunk(samples: &[i16]) -> String {
    let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_encoding_is_little_endian_pcm() {
        let encoded = encode_pcm_chunk(&[1i16, -2]);
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .unwrap();
        assert_eq!(decoded, vec![0x01, 0x00, 0xFE, 0xFF]);
    }
}
