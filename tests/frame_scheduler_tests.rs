// Integration tests for throttled frame capture and transmission.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::FakeSessionClient;
use live_relay::platform::{RawFrame, TrackKind, VideoTrack};
use live_relay::session::VIDEO_JPEG_MIME;
use live_relay::video::{FrameConfig, FrameScheduler};

fn fast_config() -> FrameConfig {
    FrameConfig {
        interval: Duration::from_millis(20),
        ..FrameConfig::default()
    }
}

#[tokio::test]
async fn test_frames_flow_while_connected() {
    let client = Arc::new(FakeSessionClient::new());
    client.set_connected(true);

    let (track, source) = VideoTrack::channel(TrackKind::Camera, "test");
    source.push_frame(RawFrame {
        width: 640,
        height: 480,
        rgb: vec![0x20; 640 * 480 * 3],
    });

    let scheduler = FrameScheduler::new(client.clone(), fast_config());
    scheduler.start(track);
    tokio::time::sleep(Duration::from_millis(120)).await;
    scheduler.stop();

    let sent = client.realtime_inputs();
    assert!(!sent.is_empty());
    assert!(sent.iter().all(|item| item.mime_type == VIDEO_JPEG_MIME));
    assert!(scheduler.frames_sent() >= sent.len());
}

#[tokio::test]
async fn test_unsized_frames_are_never_sent() {
    let client = Arc::new(FakeSessionClient::new());
    client.set_connected(true);

    let (track, source) = VideoTrack::channel(TrackKind::Camera, "test");
    // The source has not settled on a size yet.
    source.push_frame(RawFrame {
        width: 0,
        height: 0,
        rgb: Vec::new(),
    });

    let scheduler = FrameScheduler::new(client.clone(), fast_config());
    scheduler.start(track);
    tokio::time::sleep(Duration::from_millis(100)).await;
    scheduler.stop();

    assert!(client.realtime_inputs().is_empty());
    assert_eq!(scheduler.frames_sent(), 0);
}

#[tokio::test]
async fn test_disconnect_halts_frames() {
    let client = Arc::new(FakeSessionClient::new());
    client.set_connected(true);

    let (track, source) = VideoTrack::channel(TrackKind::Camera, "test");
    source.push_frame(RawFrame {
        width: 320,
        height: 240,
        rgb: vec![0x20; 320 * 240 * 3],
    });

    let scheduler = FrameScheduler::new(client.clone(), fast_config());
    scheduler.start(track);
    tokio::time::sleep(Duration::from_millis(80)).await;

    client.set_connected(false);
    // Let any in-flight cycle drain before snapshotting.
    tokio::time::sleep(Duration::from_millis(60)).await;
    let after_disconnect = client.realtime_inputs().len();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(client.realtime_inputs().len(), after_disconnect);
}

#[tokio::test]
async fn test_stopped_track_halts_frames() {
    let client = Arc::new(FakeSessionClient::new());
    client.set_connected(true);

    let (track, source) = VideoTrack::channel(TrackKind::Screen, "test");
    source.push_frame(RawFrame {
        width: 320,
        height: 240,
        rgb: vec![0x20; 320 * 240 * 3],
    });

    let scheduler = FrameScheduler::new(client.clone(), fast_config());
    scheduler.start(track.clone());
    tokio::time::sleep(Duration::from_millis(60)).await;

    track.stop();
    tokio::time::sleep(Duration::from_millis(60)).await;
    let after_stop = client.realtime_inputs().len();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(client.realtime_inputs().len(), after_stop);
}
