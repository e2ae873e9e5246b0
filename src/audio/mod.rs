pub mod meter;
pub mod recorder;
pub mod worklet;

pub use meter::VolumeMeter;
pub use recorder::{
    encode_pcm_chunk, AudioRecorder, RecorderConfig, FALLBACK_WINDOW_SAMPLES, TARGET_SAMPLE_RATE,
};
pub use worklet::{WorkletEvent, WorkletModule, WorkletProcessor, WORKLET_FRAME_SAMPLES};
