// Integration tests for the microphone capture engine.
//
// These drive the recorder through the scriptable device layer: worklet and
// fallback paths, permission refusal, and stop-during-pending-start.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use live_relay::audio::{worklet, AudioRecorder, RecorderConfig, FALLBACK_WINDOW_SAMPLES};
use live_relay::error::MediaError;
use live_relay::platform::fake::FakeMediaDevices;
use tokio::time::timeout;

const RECV_TIMEOUT: Duration = Duration::from_secs(1);

async fn recv_one<T>(rx: &mut tokio::sync::mpsc::UnboundedReceiver<T>) -> T {
    timeout(RECV_TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

fn decode(chunk: &str) -> Vec<u8> {
    base64::engine::general_purpose::STANDARD
        .decode(chunk)
        .expect("chunk is not valid base64")
}

#[tokio::test]
async fn test_fallback_path_emits_chunks_and_volume() {
    let devices = Arc::new(FakeMediaDevices::new().without_worklet());
    let recorder = AudioRecorder::new(devices.clone(), RecorderConfig::default());

    let mut data = recorder.data_events();
    let mut volume = recorder.volume_events();
    recorder.start().await.unwrap();
    assert!(recorder.is_recording());

    devices.push_audio(vec![0.5; FALLBACK_WINDOW_SAMPLES]);

    let chunk = recv_one(&mut data).await;
    let bytes = decode(&chunk);
    assert_eq!(bytes.len(), FALLBACK_WINDOW_SAMPLES * 2);
    assert_eq!(bytes.len() % 2, 0, "chunks must hold whole 16-bit samples");

    let level = recv_one(&mut volume).await;
    assert!((0.0..=1.0).contains(&level));
    assert!(level > 0.0, "a loud window should read above silence");

    recorder.close();
}

#[tokio::test]
async fn test_worklet_path_emits_fixed_size_frames() {
    let devices = Arc::new(FakeMediaDevices::new());
    let recorder = AudioRecorder::new(devices.clone(), RecorderConfig::default());

    let mut data = recorder.data_events();
    recorder.start().await.unwrap();

    devices.push_audio(vec![0.25; 2048]);

    let chunk = recv_one(&mut data).await;
    assert_eq!(decode(&chunk).len(), 2048 * 2);

    recorder.close();
}

#[tokio::test]
async fn test_pipeline_install_failure_falls_back() {
    let devices = Arc::new(FakeMediaDevices::new().with_failing_pipeline_install());
    let recorder = AudioRecorder::new(devices.clone(), RecorderConfig::default());

    let mut data = recorder.data_events();
    recorder.start().await.unwrap();

    devices.push_audio(vec![0.1; FALLBACK_WINDOW_SAMPLES]);

    // Fallback windows are larger than worklet frames, so the chunk size
    // tells us which path is live.
    let chunk = recv_one(&mut data).await;
    assert_eq!(decode(&chunk).len(), FALLBACK_WINDOW_SAMPLES * 2);

    recorder.close();
    assert!(
        devices.audio_source().unwrap().is_stopped(),
        "closing must release the microphone track"
    );
}

#[tokio::test]
async fn test_denied_microphone_reports_access_denied() {
    let devices = Arc::new(FakeMediaDevices::new().deny_microphone());
    let recorder = AudioRecorder::new(devices, RecorderConfig::default());

    let err = recorder.start().await.unwrap_err();
    assert!(matches!(err, MediaError::AccessDenied(_)));
    assert!(!recorder.is_recording());
}

#[tokio::test]
async fn test_no_data_after_stop() {
    let devices = Arc::new(FakeMediaDevices::new().without_worklet());
    let recorder = AudioRecorder::new(devices.clone(), RecorderConfig::default());

    let mut data = recorder.data_events();
    recorder.start().await.unwrap();
    recorder.stop();
    assert!(!recorder.is_recording());

    devices.push_audio(vec![0.5; FALLBACK_WINDOW_SAMPLES]);

    let result = timeout(Duration::from_millis(100), data.recv()).await;
    assert!(result.is_err(), "no chunk may arrive after stop");
}

#[tokio::test]
async fn test_stop_during_pending_start_is_deferred() {
    let devices = Arc::new(
        FakeMediaDevices::new()
            .without_worklet()
            .with_mic_delay(Duration::from_millis(100)),
    );
    let recorder = Arc::new(AudioRecorder::new(devices.clone(), RecorderConfig::default()));

    let mut data = recorder.data_events();

    let pending = {
        let recorder = Arc::clone(&recorder);
        tokio::spawn(async move { recorder.start().await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    // Acquisition is still in flight; the stop must win once it settles.
    recorder.stop();
    pending.await.unwrap().unwrap();

    assert!(!recorder.is_recording());
    assert!(
        devices.audio_source().unwrap().is_stopped(),
        "deferred stop must release the microphone track"
    );
    devices.push_audio(vec![0.5; FALLBACK_WINDOW_SAMPLES]);
    let result = timeout(Duration::from_millis(100), data.recv()).await;
    assert!(result.is_err(), "deferred stop must suppress emission");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stop_suppresses_windows_in_flight() {
    let devices = Arc::new(FakeMediaDevices::new().without_worklet());
    let recorder = AudioRecorder::new(devices.clone(), RecorderConfig::default());

    let mut data = recorder.data_events();
    recorder.start().await.unwrap();

    // Several windows may be processing on another worker when stop lands.
    for _ in 0..4 {
        devices.push_audio(vec![0.4; FALLBACK_WINDOW_SAMPLES]);
    }
    recorder.stop();

    // Let any task that was mid-poll finish, then drain what it produced
    // before the stop took effect.
    tokio::time::sleep(Duration::from_millis(50)).await;
    while data.try_recv().is_ok() {}

    devices.push_audio(vec![0.4; FALLBACK_WINDOW_SAMPLES]);
    let result = timeout(Duration::from_millis(100), data.recv()).await;
    assert!(result.is_err(), "nothing may be emitted once stop has settled");
}

#[tokio::test]
async fn test_worklet_chunks_keep_capture_order() {
    let devices = Arc::new(FakeMediaDevices::new());
    let recorder = AudioRecorder::new(devices.clone(), RecorderConfig::default());

    let mut data = recorder.data_events();
    recorder.start().await.unwrap();

    let levels = [0.1f32, 0.2, 0.3];
    for &level in &levels {
        devices.push_audio(vec![level; 2048]);
    }

    // Metering shares the pump with the recorder pipeline; flooding one must
    // not reorder or drop recorder chunks.
    for &level in &levels {
        let expected = live_relay::encode_pcm_chunk(&vec![worklet::pcm16(level); 2048]);
        let chunk = recv_one(&mut data).await;
        assert_eq!(chunk, expected);
    }

    recorder.close();
}

#[tokio::test]
async fn test_start_is_idempotent_while_running() {
    let devices = Arc::new(FakeMediaDevices::new().without_worklet());
    let recorder = AudioRecorder::new(devices, RecorderConfig::default());

    recorder.start().await.unwrap();
    recorder.start().await.unwrap();
    assert!(recorder.is_recording());

    recorder.close();
}
