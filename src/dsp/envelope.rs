//! ADSR envelope applied to whole buffers.

/// Attack/decay/release times in seconds, sustain as a level in [0, 1].
///
/// `curve` shapes every ramp as `t^curve` (1.0 = linear, 2.0 = snappier).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Adsr {
    pub attack: f64,
    pub decay: f64,
    pub sustain: f64,
    pub release: f64,
    pub curve: f64,
}

/// Sample counts of the three ramped stages for one buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StageLengths {
    attack: usize,
    decay: usize,
    release: usize,
}

impl Adsr {
    pub const fn new(attack: f64, decay: f64, sustain: f64, release: f64) -> Self {
        Adsr {
            attack,
            decay,
            sustain,
            release,
            curve: 1.0,
        }
    }

    pub const fn with_curve(mut self, curve: f64) -> Self {
        self.curve = curve;
        self
    }

    fn sustain_level(&self) -> f64 {
        if self.sustain.is_finite() {
            self.sustain.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    fn shape(&self, t: f64) -> f64 {
        if self.curve == 1.0 || !self.curve.is_finite() || self.curve <= 0.0 {
            t
        } else {
            t.powf(self.curve)
        }
    }

    /// Stage lengths for a buffer of `len` samples.
    ///
    /// Negative times count as zero. If the three stages don't fit they are
    /// scaled down proportionally so their sum equals `len`.
    fn stage_lengths(&self, len: usize, sample_rate: f64) -> StageLengths {
        let to_samples = |seconds: f64| -> usize {
            if seconds.is_finite() && seconds > 0.0 {
                (seconds * sample_rate).round() as usize
            } else {
                0
            }
        };
        let mut attack = to_samples(self.attack);
        let mut decay = to_samples(self.decay);
        let mut release = to_samples(self.release);

        let total = attack + decay + release;
        if total > len {
            let scale = len as f64 / total as f64;
            attack = (attack as f64 * scale).floor() as usize;
            decay = (decay as f64 * scale).floor() as usize;
            release = (release as f64 * scale).floor() as usize;
        }

        StageLengths {
            attack,
            decay,
            release,
        }
    }

    /// The gain curve for a buffer of `len` samples.
    pub fn curve(&self, len: usize, sample_rate: f64) -> Vec<f64> {
        let sustain = self.sustain_level();
        let stages = self.stage_lengths(len, sample_rate);
        let mut out = Vec::with_capacity(len);

        for i in 0..stages.attack {
            out.push(self.shape(i as f64 / stages.attack as f64));
        }
        for i in 0..stages.decay {
            let t = i as f64 / stages.decay as f64;
            out.push(1.0 - (1.0 - sustain) * self.shape(t));
        }
        let hold = len - stages.attack - stages.decay - stages.release;
        out.extend(std::iter::repeat_n(sustain, hold));
        for i in 0..stages.release {
            let t = (i + 1) as f64 / stages.release as f64;
            out.push(sustain * (1.0 - self.shape(t)));
        }

        debug_assert_eq!(out.len(), len);
        out
    }
}

impl Default for Adsr {
    fn default() -> Self {
        Adsr::new(0.01, 0.1, 0.5, 0.1)
    }
}

/// Multiply `wave` in place by the envelope. Length is unchanged.
pub fn apply_envelope(wave: &mut [f64], sample_rate: f64, adsr: &Adsr) {
    if wave.is_empty() {
        return;
    }
    let curve = adsr.curve(wave.len(), sample_rate);
    for (sample, gain) in wave.iter_mut().zip(curve) {
        *sample *= gain;
    }
}
