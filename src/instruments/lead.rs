//! Lead voices: plain saw melody, supersaw, Karplus-Strong pluck and arpeggio.

use std::f64::consts::PI;

use crate::dsp::envelope::{Adsr, apply_envelope};
use crate::dsp::filter::apply_lowpass_sweep;
use crate::dsp::modulation::{detune_stack, lfo};
use crate::dsp::oscillator::{Noise, Oscillator, Waveform};
use crate::error::{EdmError, Result};

use super::{sample_count, time};

const MELODY_ENV: Adsr = Adsr::new(0.05, 0.2, 0.4, 0.2);
const SUPERSAW_ENV: Adsr = Adsr::new(0.02, 0.1, 0.7, 0.2);
const PLUCK_ENV: Adsr = Adsr::new(0.001, 0.1, 0.3, 0.2);
const ARP_ENV: Adsr = Adsr::new(0.01, 0.05, 0.4, 0.1);

/// Loss per pass around the Karplus-Strong loop.
const PLUCK_FEEDBACK: f64 = 0.996;
/// Fade applied at both ends of each arpeggio step.
const ARP_DECLICK: f64 = 0.002;

pub(super) fn melody(freq: f64, len: usize, sr: f64) -> Vec<f64> {
    let mut wave = Oscillator::new(Waveform::Sawtooth, freq, sr).render(len);
    apply_envelope(&mut wave, sr, &MELODY_ENV);
    wave.iter_mut().for_each(|s| *s *= 0.5);
    wave
}

/// Detuned saw stack with a slow breathing filter.
pub(super) fn supersaw(
    freq: f64,
    len: usize,
    sr: f64,
    voices: usize,
    detune: f64,
    noise: &mut Noise,
) -> Result<Vec<f64>> {
    let mut wave = detune_stack(freq, voices, detune, Waveform::Sawtooth, sr, len, noise)?;
    for (sample, wobble) in wave.iter_mut().zip(lfo(3.0, 0.02, sr, len)) {
        *sample *= 1.0 + wobble;
    }

    apply_lowpass_sweep(&mut wave, |i| 4000.0 + 2000.0 * (2.0 * PI * 0.5 * time(i, sr)).sin(), sr, 1.5)?;
    apply_envelope(&mut wave, sr, &SUPERSAW_ENV);
    wave.iter_mut().for_each(|s| *s *= 0.4);
    Ok(wave)
}

/// Karplus-Strong plucked string.
///
/// A delay line of `round(sr / freq)` samples is filled with noise and
/// recirculated through a two-tap average. The line holds between two and
/// `len + 1` samples; a longer one would never be read past that point.
pub(super) fn pluck(freq: f64, len: usize, sr: f64, noise: &mut Noise) -> Vec<f64> {
    let delay = ((sr / freq).round() as usize).clamp(2, len.max(1) + 1);
    let mut line = noise.render(delay);

    let mut wave: Vec<f64> = (0..len)
        .map(|i| {
            let here = i % delay;
            let next = (i + 1) % delay;
            let out = line[here];
            line[here] = PLUCK_FEEDBACK * 0.5 * (line[here] + line[next]);
            out
        })
        .collect();

    apply_envelope(&mut wave, sr, &PLUCK_ENV);
    wave.iter_mut().for_each(|s| *s *= 0.6);
    wave
}

/// Arpeggio over the root: one step per pattern entry, spread evenly across
/// the note, each step re-triggered from phase zero.
pub(super) fn arp(freq: f64, len: usize, sr: f64, pattern: &[f64]) -> Result<Vec<f64>> {
    if pattern.is_empty() {
        return Err(EdmError::invalid_parameter("arp_pattern", 0.0, "needs at least one step"));
    }
    if let Some(&bad) = pattern.iter().find(|m| !(m.is_finite() && **m > 0.0)) {
        return Err(EdmError::invalid_parameter("arp_pattern", bad, "multipliers must be positive"));
    }

    let steps = pattern.len();
    let fade = sample_count(ARP_DECLICK, sr);
    let mut wave = vec![0.0; len];

    for (k, multiplier) in pattern.iter().enumerate() {
        let start = k * len / steps;
        let end = (k + 1) * len / steps;
        let step = &mut wave[start..end];
        let step_len = step.len();

        let mut saw = Oscillator::new(Waveform::Sawtooth, freq * multiplier, sr);
        let mut square = Oscillator::new(Waveform::Square, freq * multiplier, sr);
        let ramp = fade.min(step_len / 2);
        for (i, sample) in step.iter_mut().enumerate() {
            let mut gain = 1.0;
            if i < ramp {
                gain = i as f64 / ramp as f64;
            } else if step_len - i <= ramp {
                gain = (step_len - i - 1) as f64 / ramp as f64;
            }
            *sample = (0.6 * saw.next_sample() + 0.4 * square.next_sample()) * gain;
        }
    }

    apply_envelope(&mut wave, sr, &ARP_ENV);
    wave.iter_mut().for_each(|s| *s *= 0.4);
    Ok(wave)
}
