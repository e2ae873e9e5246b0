// Dedicated sample-processing pipelines and the process-wide module registry.
//
// A "worklet" here is a small processor driven by its own task, fed sample
// blocks over a channel and emitting typed events back to the recorder. The
// registry caches the processor factory for each logical module name so
// repeated recorder starts reuse the installed module, with an explicit
// teardown that releases every handle.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::meter::VolumeMeter;

pub const RECORDER_MODULE: &str = "pcm-recorder";
pub const VU_METER_MODULE: &str = "vu-meter";

/// Samples per PCM frame emitted by the recorder worklet.
pub const WORKLET_FRAME_SAMPLES: usize = 2048;

/// Output of a worklet node.
#[derive(Debug, Clone)]
pub enum WorkletEvent {
    /// A filled PCM frame, ready for encoding.
    Chunk(Vec<i16>),
    /// A loudness reading in [0, 1].
    Volume(f32),
}

/// A sample processor hosted by a worklet node.
pub trait WorkletProcessor: Send {
    fn process(&mut self, block: &[f32], out: &mut Vec<WorkletEvent>);
}

type ProcessorFactory = fn() -> Box<dyn WorkletProcessor>;

/// An installed pipeline module: a named, reusable processor factory.
#[derive(Clone)]
pub struct WorkletModule {
    name: &'static str,
    factory: ProcessorFactory,
}

impl WorkletModule {
    pub fn name(&self) -> &'static str {
        self.name
    }

    fn instantiate(&self) -> Box<dyn WorkletProcessor> {
        (self.factory)()
    }
}

fn registry() -> &'static Mutex<HashMap<&'static str, WorkletModule>> {
    static REGISTRY: OnceLock<Mutex<HashMap<&'static str, WorkletModule>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Install `name` if absent and return the cached module.
pub fn ensure_module(name: &'static str, factory: ProcessorFactory) -> WorkletModule {
    let mut modules = registry().lock().unwrap();
    modules
        .entry(name)
        .or_insert_with(|| WorkletModule { name, factory })
        .clone()
}

/// Names of every installed module, sorted.
pub fn installed_modules() -> Vec<&'static str> {
    let modules = registry().lock().unwrap();
    let mut names: Vec<_> = modules.keys().copied().collect();
    names.sort_unstable();
    names
}

/// Release every installed module handle.
pub fn release_modules() {
    registry().lock().unwrap().clear();
}

/// Drive `module` on its own task: read blocks from `input`, forward processor
/// events to `events`. The task ends when the input closes or every event
/// receiver is gone.
pub fn spawn_node(
    module: &WorkletModule,
    mut input: mpsc::Receiver<Vec<f32>>,
    events: mpsc::UnboundedSender<WorkletEvent>,
) -> JoinHandle<()> {
    let mut processor = module.instantiate();
    tokio::spawn(async move {
        let mut out = Vec::new();
        while let Some(block) = input.recv().await {
            processor.process(&block, &mut out);
            for event in out.drain(..) {
                if events.send(event).is_err() {
                    return;
                }
            }
        }
    })
}

/// Converts float samples to 16-bit PCM and emits fixed-size frames as they
/// fill.
pub struct PcmRecorderProcessor {
    frame: Vec<i16>,
}

impl PcmRecorderProcessor {
    pub fn new() -> Self {
        Self {
            frame: Vec::with_capacity(WORKLET_FRAME_SAMPLES),
        }
    }
}

impl Default for PcmRecorderProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkletProcessor for PcmRecorderProcessor {
    fn process(&mut self, block: &[f32], out: &mut Vec<WorkletEvent>) {
        for &sample in block {
            self.frame.push(pcm16(sample));
            if self.frame.len() == WORKLET_FRAME_SAMPLES {
                out.push(WorkletEvent::Chunk(std::mem::take(&mut self.frame)));
                self.frame.reserve(WORKLET_FRAME_SAMPLES);
            }
        }
    }
}

/// Emits a smoothed loudness reading per incoming block.
pub struct VuMeterProcessor {
    meter: VolumeMeter,
}

impl VuMeterProcessor {
    pub fn new() -> Self {
        Self {
            meter: VolumeMeter::new(),
        }
    }
}

impl Default for VuMeterProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkletProcessor for VuMeterProcessor {
    fn process(&mut self, block: &[f32], out: &mut Vec<WorkletEvent>) {
        out.push(WorkletEvent::Volume(self.meter.update(block)));
    }
}

/// Float sample to 16-bit signed PCM.
pub fn pcm16(sample: f32) -> i16 {
    (sample * 32768.0).clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder_factory() -> Box<dyn WorkletProcessor> {
        Box::new(PcmRecorderProcessor::new())
    }

    fn vu_factory() -> Box<dyn WorkletProcessor> {
        Box::new(VuMeterProcessor::new())
    }

    #[test]
    fn module_is_cached_across_installs() {
        release_modules();
        let a = ensure_module(RECORDER_MODULE, recorder_factory);
        let b = ensure_module(RECORDER_MODULE, vu_factory);
        // Second install must not replace the first.
        assert_eq!(a.name(), b.name());
        assert_eq!(installed_modules(), vec![RECORDER_MODULE]);
        release_modules();
        assert!(installed_modules().is_empty());
    }

    #[test]
    fn recorder_processor_emits_full_frames_only() {
        let mut processor = PcmRecorderProcessor::new();
        let mut out = Vec::new();

        processor.process(&vec![0.5; WORKLET_FRAME_SAMPLES - 1], &mut out);
        assert!(out.is_empty());

        processor.process(&[0.5, 0.5, 0.5], &mut out);
        assert_eq!(out.len(), 1);
        match &out[0] {
            WorkletEvent::Chunk(samples) => {
                assert_eq!(samples.len(), WORKLET_FRAME_SAMPLES);
                assert_eq!(samples[0], 16384);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn pcm16_clamps_at_full_scale() {
        assert_eq!(pcm16(1.0), i16::MAX);
        assert_eq!(pcm16(-1.0), i16::MIN);
        assert_eq!(pcm16(0.0), 0);
    }
}
