// cpal-backed microphone capture.
//
// The cpal stream is !Send, so a dedicated capture thread owns it for the
// lifetime of the track and the realtime callback forwards sample blocks over
// the track channel. Video acquisition is not available through this backend;
// hosts with camera/screen hardware provide their own `MediaDevices`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;
use tracing::{error, info, warn};

use super::{
    AudioConstraints, AudioTrack, CameraConstraint, MediaDevices,
    VideoDeviceInfo, VideoTrack,
};
use crate::error::MediaError;

pub struct SystemMediaDevices;

impl SystemMediaDevices {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemMediaDevices {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaDevices for SystemMediaDevices {
    async fn open_microphone(
        &self,
        constraints: &AudioConstraints,
        sample_rate: u32,
    ) -> Result<AudioTrack, MediaError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| MediaError::NotFound("no default input device".into()))?;
        let label = device.name().unwrap_or_else(|_| "microphone".into());

        let default_config = device
            .default_input_config()
            .map_err(|e| MediaError::AccessDenied(e.to_string()))?;
        let device_rate = default_config.sample_rate().0;
        let device_channels = default_config.channels().max(1);
        let sample_format = default_config.sample_format();
        let stream_config: cpal::StreamConfig = default_config.into();

        info!(
            "opening microphone '{}' ({} Hz, {} ch, {:?}) -> {} Hz mono",
            label, device_rate, device_channels, sample_format, sample_rate
        );
        if constraints.channel_count != 1 {
            warn!(
                "requested {} channels, capture is folded to mono",
                constraints.channel_count
            );
        }

        let (track, source) = AudioTrack::channel(sample_rate, label);
        let source = Arc::new(source);
        // Decimation by integer ratio; close enough for voice capture.
        let ratio = (device_rate / sample_rate).max(1) as usize;

        let thread_source = Arc::clone(&source);
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<(), MediaError>>();

        std::thread::Builder::new()
            .name("mic-capture".into())
            .spawn(move || {
                let data_source = Arc::clone(&thread_source);
                let err_source = Arc::clone(&thread_source);
                let channels = device_channels as usize;

                let on_block = move |data: &[f32]| {
                    let mono: Vec<f32> = data
                        .chunks(channels)
                        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
                        .step_by(ratio)
                        .collect();
                    data_source.send_samples(mono);
                };
                let err_fn = move |err: cpal::StreamError| {
                    error!("microphone stream error: {}", err);
                    err_source.end();
                };

                let built = match sample_format {
                    SampleFormat::F32 => device.build_input_stream(
                        &stream_config,
                        move |data: &[f32], _: &_| on_block(data),
                        err_fn,
                        None,
                    ),
                    SampleFormat::I16 => device.build_input_stream(
                        &stream_config,
                        move |data: &[i16], _: &_| {
                            let floats: Vec<f32> =
                                data.iter().map(|&s| s as f32 / 32768.0).collect();
                            on_block(&floats);
                        },
                        err_fn,
                        None,
                    ),
                    other => {
                        let _ = ready_tx.send(Err(MediaError::PipelineUnavailable(format!(
                            "unsupported input sample format {:?}",
                            other
                        ))));
                        return;
                    }
                };

                let stream = match built {
                    Ok(s) => s,
                    Err(e) => {
                        let _ = ready_tx.send(Err(MediaError::AccessDenied(e.to_string())));
                        return;
                    }
                };
                if let Err(e) = stream.play() {
                    let _ = ready_tx.send(Err(MediaError::AccessDenied(e.to_string())));
                    return;
                }
                let _ = ready_tx.send(Ok(()));

                // Hold the stream until the track is stopped.
                while !thread_source.is_stopped() {
                    std::thread::park_timeout(Duration::from_millis(50));
                }
                drop(stream);
            })
            .map_err(|e| MediaError::PipelineUnavailable(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(track),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(MediaError::PipelineUnavailable(
                "capture thread exited before start".into(),
            )),
        }
    }

    async fn open_camera(&self, _constraint: &CameraConstraint) -> Result<VideoTrack, MediaError> {
        Err(MediaError::Unsupported("camera capture"))
    }

    async fn open_screen(&self) -> Result<VideoTrack, MediaError> {
        Err(MediaError::Unsupported("screen capture"))
    }

    async fn enumerate_video_inputs(&self) -> Result<Vec<VideoDeviceInfo>, MediaError> {
        Err(MediaError::Unsupported("video input enumeration"))
    }

    fn supports_worklet(&self) -> bool {
        true
    }

    async fn install_pipeline(&self, _name: &str) -> Result<(), MediaError> {
        Ok(())
    }
}
