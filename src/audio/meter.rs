/// Scalar loudness from raw float samples.
///
/// `rms` is the stateless reading used by the block-processing fallback path;
/// `update` adds the fast-attack/slow-decay smoothing the dedicated metering
/// pipeline applies between readings.
#[derive(Debug, Clone, Default)]
pub struct VolumeMeter {
    smoothed: f32,
}

impl VolumeMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Root-mean-square of `samples`, clamped to [0, 1]. Empty input reads 0.
    pub fn rms(samples: &[f32]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
        ((sum_sq / samples.len() as f64).sqrt() as f32).clamp(0.0, 1.0)
    }

    /// Feed one block and return the smoothed reading: rises immediately with
    /// the signal, decays gradually when it drops.
    pub fn update(&mut self, samples: &[f32]) -> f32 {
        let rms = Self::rms(samples);
        self.smoothed = if rms > self.smoothed {
            rms
        } else {
            self.smoothed * 0.7 + rms * 0.3
        };
        self.smoothed.clamp(0.0, 1.0)
    }
}
