//! Transition effects: sweep, noise riser and impact.

use std::f64::consts::PI;

use crate::config::SweepCurve;
use crate::dsp::envelope::{Adsr, apply_envelope};
use crate::dsp::filter::{apply_highpass, apply_lowpass_sweep};
use crate::dsp::oscillator::{Noise, Oscillator, Waveform};
use crate::error::{EdmError, Result};

use super::{InstrumentParams, time};

const IMPACT_ENV: Adsr = Adsr::new(0.001, 0.5, 0.3, 0.5);

/// The sweep's filter sits this many times above its pitch.
const SWEEP_TRACKING: f64 = 3.0;

fn position(i: usize, len: usize) -> f64 {
    if len > 1 { i as f64 / (len - 1) as f64 } else { 0.0 }
}

/// Frequency of a sweep at `position` in [0, 1].
pub fn sweep_frequency(start: f64, end: f64, curve: SweepCurve, position: f64) -> f64 {
    match curve {
        SweepCurve::Linear => start + (end - start) * position,
        SweepCurve::Exponential => start * (end / start).powf(position),
    }
}

/// A saw gliding between `start_freq` and `end_freq` behind a tracking
/// low-pass, fading in (or out, when reversed) across its length.
pub(super) fn sweep(len: usize, sr: f64, params: &InstrumentParams) -> Result<Vec<f64>> {
    for (name, value) in [("start_freq", params.start_freq), ("end_freq", params.end_freq)] {
        if !(value.is_finite() && value > 0.0) {
            return Err(EdmError::invalid_parameter(name, value, "must be positive"));
        }
    }
    let (from, to) = if params.reverse {
        (params.end_freq, params.start_freq)
    } else {
        (params.start_freq, params.end_freq)
    };
    let freq_at = |i: usize| sweep_frequency(from, to, params.sweep_curve, position(i, len));

    let mut osc = Oscillator::new(Waveform::Sawtooth, from, sr);
    let mut wave: Vec<f64> = (0..len)
        .map(|i| {
            osc.frequency = freq_at(i);
            osc.next_sample()
        })
        .collect();

    apply_lowpass_sweep(&mut wave, |i| freq_at(i) * SWEEP_TRACKING, sr, 1.0)?;
    for (i, sample) in wave.iter_mut().enumerate() {
        let p = position(i, len);
        let gain = if params.reverse { 1.0 - p } else { p };
        *sample *= gain * 0.3;
    }
    Ok(wave)
}

/// Noise opening up and getting louder towards the drop.
pub(super) fn white_noise_riser(len: usize, sr: f64, noise: &mut Noise) -> Result<Vec<f64>> {
    let mut wave = noise.render(len);
    apply_lowpass_sweep(&mut wave, |i| 200.0 + 8000.0 * position(i, len).powi(2), sr, 1.0)?;
    for (i, sample) in wave.iter_mut().enumerate() {
        *sample *= position(i, len).powi(2) * 0.3;
    }
    Ok(wave)
}

/// Low boom plus a high-passed noise crash.
pub(super) fn impact(len: usize, sr: f64, noise: &mut Noise) -> Result<Vec<f64>> {
    let mut crash = noise.render(len);
    apply_highpass(&mut crash, 2000.0, sr, 1.0)?;

    let mut wave: Vec<f64> = crash
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let t = time(i, sr);
            let boom = (2.0 * PI * 40.0 * t).sin() * (-t / 0.3).exp();
            boom * 0.6 + c * 0.4
        })
        .collect();

    apply_envelope(&mut wave, sr, &IMPACT_ENV);
    wave.iter_mut().for_each(|s| *s *= 0.7);
    Ok(wave)
}
