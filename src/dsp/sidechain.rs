//! Sidechain ducking keyed to percussion hits.
//!
//! Each reference hit pulls the gain down to `1 - depth` over a short
//! attack ramp, then lets it recover along a normalized exponential that
//! lands exactly on unity at the end of the style's recovery window. The
//! resulting gain curve is multiplied into the target buffer.

use serde::{Deserialize, Serialize};

/// Steepness of the recovery exponential.
const RECOVERY_RATE: f64 = 5.0;

/// Response curve of the ducking envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SidechainStyle {
    /// Fast dip with a quick recovery inside the first quarter beat.
    #[default]
    Pump,
    /// Gentler dip that recovers across the whole beat.
    Duck,
    /// Half-depth dip with a short recovery.
    Subtle,
    /// Unrecognized style names; behaves like `Subtle`.
    #[serde(other)]
    Unknown,
}

impl SidechainStyle {
    /// Attack ramp length in seconds.
    fn attack_seconds(self) -> f64 {
        match self {
            SidechainStyle::Pump => 0.005,
            SidechainStyle::Duck => 0.01,
            SidechainStyle::Subtle | SidechainStyle::Unknown => 0.02,
        }
    }

    /// Recovery window as a fraction of one beat.
    fn recovery_beats(self) -> f64 {
        match self {
            SidechainStyle::Pump => 0.25,
            SidechainStyle::Duck => 1.0,
            SidechainStyle::Subtle | SidechainStyle::Unknown => 0.15,
        }
    }

    /// Gain reduction depth for a given strength.
    pub fn depth(self, strength: f64) -> f64 {
        match self {
            SidechainStyle::Pump | SidechainStyle::Duck => strength,
            SidechainStyle::Subtle | SidechainStyle::Unknown => strength * 0.5,
        }
    }
}

/// Normalized recovery: 1 at `t = 0`, exactly 0 at `t = 1`.
fn recovery(t: f64) -> f64 {
    let tail = (-RECOVERY_RATE).exp();
    ((-RECOVERY_RATE * t).exp() - tail) / (1.0 - tail)
}

/// A sidechain envelope generator.
#[derive(Debug, Clone)]
pub struct Sidechain {
    sample_rate: f64,
    /// Seconds per beat.
    beat_duration: f64,
    pub style: SidechainStyle,
    /// Strength in [0, 1]; 0 disables ducking.
    pub strength: f64,
}

impl Sidechain {
    /// Strength is clamped into [0, 1].
    pub fn new(style: SidechainStyle, strength: f64, beat_duration: f64, sample_rate: f64) -> Self {
        let strength = if strength.is_finite() { strength.clamp(0.0, 1.0) } else { 0.0 };
        Sidechain {
            sample_rate,
            beat_duration,
            style,
            strength,
        }
    }

    fn depth(&self) -> f64 {
        self.style.depth(self.strength)
    }

    fn seconds_to_samples(&self, seconds: f64) -> usize {
        (seconds * self.sample_rate).round().max(0.0) as usize
    }

    /// Gain curve of exactly `len` samples for hits at the given sample offsets.
    ///
    /// Hits at or beyond `len` are ignored; regions no hit reaches stay at 1.0.
    pub fn gain_curve(&self, hits: &[usize], len: usize) -> Vec<f64> {
        let mut gain = vec![1.0; len];
        let depth = self.depth();
        if depth <= 0.0 {
            return gain;
        }

        let floor = 1.0 - depth;
        let attack = self.seconds_to_samples(self.style.attack_seconds());
        let release = self.seconds_to_samples(self.style.recovery_beats() * self.beat_duration);

        let mut sorted: Vec<usize> = hits.iter().copied().filter(|&h| h < len).collect();
        sorted.sort_unstable();
        sorted.dedup();

        for hit in sorted {
            // Start from wherever a previous hit's recovery left us.
            let start = gain[hit];
            let attack_end = (hit + attack).min(len);
            for i in hit..attack_end {
                let t = (i - hit + 1) as f64 / attack as f64;
                gain[i] = start + (floor - start) * t;
            }

            let release_end = (attack_end + release).min(len);
            for i in attack_end..release_end {
                let t = (i - attack_end) as f64 / release as f64;
                gain[i] = 1.0 - depth * recovery(t);
            }
        }

        gain
    }

    /// Duck `target` in place.
    pub fn process_block(&self, target: &mut [f64], hits: &[usize]) {
        if self.depth() <= 0.0 || hits.is_empty() {
            return;
        }
        let gain = self.gain_curve(hits, target.len());
        for (sample, g) in target.iter_mut().zip(gain) {
            *sample *= g;
        }
    }
}

/// Sample offsets of the non-zero steps of a one-step-per-beat pattern,
/// repeated cyclically across `len` samples.
pub fn hits_from_pattern(pattern: &[f64], beat_duration: f64, sample_rate: f64, len: usize) -> Vec<usize> {
    if pattern.is_empty() {
        return Vec::new();
    }
    let samples_per_beat = beat_duration * sample_rate;
    if !(samples_per_beat.is_finite() && samples_per_beat > 0.0) {
        return Vec::new();
    }

    let mut hits = Vec::new();
    for step in 0.. {
        let offset = (step as f64 * samples_per_beat).round() as usize;
        if offset >= len {
            break;
        }
        if pattern[step % pattern.len()] > 0.0 {
            hits.push(offset);
        }
    }
    hits
}

/// Duck `target` against a reference rhythm given as a velocity pattern.
pub fn apply_sidechain(
    target: &mut [f64],
    reference_pattern: &[f64],
    style: SidechainStyle,
    strength: f64,
    beat_duration: f64,
    sample_rate: f64,
) {
    let hits = hits_from_pattern(reference_pattern, beat_duration, sample_rate, target.len());
    Sidechain::new(style, strength, beat_duration, sample_rate).process_block(target, &hits);
}
