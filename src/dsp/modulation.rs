//! Low-frequency oscillators and detuned oscillator stacks.

use std::f64::consts::PI;

use crate::error::{EdmError, Result};

use super::oscillator::{Noise, Oscillator, Waveform};

/// `depth * sin(2π · rate · t)` sampled for `len` samples.
pub fn lfo(rate_hz: f64, depth: f64, sample_rate: f64, len: usize) -> Vec<f64> {
    (0..len)
        .map(|i| depth * (2.0 * PI * rate_hz * i as f64 / sample_rate).sin())
        .collect()
}

/// Frequency ratios for `voices` oscillators spread symmetrically around 1.0.
///
/// Voice `i` sits at `1 + k · detune / voices` with `k = i - (voices - 1) / 2`.
pub fn detune_ratios(voices: usize, detune: f64) -> Vec<f64> {
    let centre = (voices as f64 - 1.0) / 2.0;
    (0..voices)
        .map(|i| 1.0 + (i as f64 - centre) * detune / voices as f64)
        .collect()
}

/// Sum of `voices` detuned oscillators, scaled by `1 / sqrt(voices)`.
///
/// Each voice starts at a random phase drawn from `noise` so the stack
/// doesn't begin with every edge lined up.
pub fn detune_stack(
    base_freq: f64,
    voices: usize,
    detune: f64,
    waveform: Waveform,
    sample_rate: f64,
    len: usize,
    noise: &mut Noise,
) -> Result<Vec<f64>> {
    if voices == 0 {
        return Err(EdmError::invalid_parameter("voices", 0.0, "at least one voice is required"));
    }
    if !detune.is_finite() {
        return Err(EdmError::invalid_parameter("detune", detune, "must be finite"));
    }

    let mut out = vec![0.0; len];
    for ratio in detune_ratios(voices, detune) {
        let mut osc = Oscillator::new(waveform, base_freq * ratio, sample_rate).with_phase(noise.phase());
        for sample in out.iter_mut() {
            *sample += osc.next_sample();
        }
    }

    let scale = 1.0 / (voices as f64).sqrt();
    out.iter_mut().for_each(|s| *s *= scale);
    Ok(out)
}
