//! Bass voices, from a plain sine up to the wobble and pitch-bend basses.

use std::f64::consts::PI;

use crate::config::BassStyle;
use crate::dsp::envelope::{Adsr, apply_envelope};
use crate::dsp::filter::{apply_lowpass, apply_lowpass_sweep};
use crate::dsp::modulation::lfo;
use crate::dsp::oscillator::{Oscillator, Waveform};
use crate::error::{EdmError, Result};

use super::time;

const BASS_ENV: Adsr = Adsr::new(0.01, 0.1, 0.6, 0.1);
const SUB_ENV: Adsr = Adsr::new(0.01, 0.05, 0.8, 0.1);
const REESE_ENV: Adsr = Adsr::new(0.01, 0.1, 0.8, 0.1);
const PLUCK_ENV: Adsr = Adsr::new(0.001, 0.15, 0.2, 0.1);
const FUTURE_ENV: Adsr = Adsr::new(0.01, 0.05, 0.6, 0.1);
const DUBSTEP_ENV: Adsr = Adsr::new(0.01, 0.05, 0.9, 0.05);
const SINE_BEND_ENV: Adsr = Adsr::new(0.01, 0.1, 0.7, 0.1);

/// Detune of the second reese oscillator.
const REESE_SPREAD: f64 = 1.007;
/// Cutoff LFO rate of the future bass.
const FUTURE_WOBBLE_HZ: f64 = 4.0;

fn scale(wave: &mut [f64], gain: f64) {
    wave.iter_mut().for_each(|s| *s *= gain);
}

pub(super) fn bass(freq: f64, len: usize, sr: f64) -> Vec<f64> {
    let mut wave = Oscillator::new(Waveform::Sine, freq, sr).render(len);
    apply_envelope(&mut wave, sr, &BASS_ENV);
    scale(&mut wave, 0.7);
    wave
}

pub(super) fn sub_bass(freq: f64, len: usize, sr: f64) -> Vec<f64> {
    let mut fundamental = Oscillator::new(Waveform::Sine, freq, sr);
    let mut octave = Oscillator::new(Waveform::Sine, freq * 2.0, sr);
    let mut wave: Vec<f64> = (0..len)
        .map(|_| fundamental.next_sample() * 0.8 + octave.next_sample() * 0.2)
        .collect();
    apply_envelope(&mut wave, sr, &SUB_ENV);
    scale(&mut wave, 0.8);
    wave
}

/// Two saws a few cents apart beating against each other, over a sub.
pub(super) fn reese_bass(freq: f64, len: usize, sr: f64) -> Result<Vec<f64>> {
    let mut a = Oscillator::new(Waveform::Sawtooth, freq, sr);
    let mut b = Oscillator::new(Waveform::Sawtooth, freq * REESE_SPREAD, sr);
    let mut sub = Oscillator::new(Waveform::Sine, freq * 0.5, sr);
    let mut wave: Vec<f64> = (0..len)
        .map(|_| (a.next_sample() + b.next_sample()) * 0.5 * 0.7 + sub.next_sample() * 0.3)
        .collect();

    apply_lowpass(&mut wave, 400.0, sr, 1.2)?;
    apply_envelope(&mut wave, sr, &REESE_ENV);
    scale(&mut wave, 0.7);
    Ok(wave)
}

/// Saw/square mix with a closing filter.
pub(super) fn pluck_bass(freq: f64, len: usize, sr: f64) -> Result<Vec<f64>> {
    let mut saw = Oscillator::new(Waveform::Sawtooth, freq, sr);
    let mut square = Oscillator::new(Waveform::Square, freq, sr);
    let mut sub = Oscillator::new(Waveform::Sine, freq * 0.5, sr);
    let mut wave: Vec<f64> = (0..len)
        .map(|_| (saw.next_sample() * 0.6 + square.next_sample() * 0.4) * 0.7 + sub.next_sample() * 0.3)
        .collect();

    apply_envelope(&mut wave, sr, &PLUCK_ENV);
    apply_lowpass_sweep(&mut wave, |i| 3000.0 * (-time(i, sr) / 0.1).exp() + 200.0, sr, 1.5)?;
    scale(&mut wave, 0.8);
    Ok(wave)
}

pub(super) fn future_bass(freq: f64, len: usize, sr: f64) -> Result<Vec<f64>> {
    let mut a = Oscillator::new(Waveform::Sawtooth, freq, sr);
    let mut b = Oscillator::new(Waveform::Sawtooth, freq * 1.01, sr);
    let mut sub = Oscillator::new(Waveform::Sine, freq * 0.5, sr);
    let mut wave: Vec<f64> = (0..len)
        .map(|_| (a.next_sample() + b.next_sample() * 0.8) * 0.4 + sub.next_sample() * 0.3)
        .collect();

    let wobble = lfo(FUTURE_WOBBLE_HZ, 1.0, sr, len);
    apply_lowpass_sweep(&mut wave, |i| 1000.0 + 3000.0 * (1.0 + wobble[i]), sr, 2.0)?;
    apply_envelope(&mut wave, sr, &FUTURE_ENV);
    scale(&mut wave, 0.5);
    Ok(wave)
}

/// Harmonic-rich sine whose cutoff and level both follow a `wobble_rate` LFO.
pub(super) fn dubstep_bass(freq: f64, len: usize, sr: f64, wobble_rate: f64) -> Result<Vec<f64>> {
    if !(wobble_rate.is_finite() && wobble_rate >= 0.0) {
        return Err(EdmError::invalid_parameter("wobble_rate", wobble_rate, "must be non-negative"));
    }
    // Mapped into [0, 1].
    let wobble: Vec<f64> = lfo(wobble_rate, 0.5, sr, len).into_iter().map(|v| v + 0.5).collect();

    let mut wave: Vec<f64> = (0..len)
        .map(|i| {
            let phase = 2.0 * PI * freq * time(i, sr);
            phase.sin() + (2.0 * phase).sin() * 0.3 + (3.0 * phase).sin() * 0.15
        })
        .collect();

    apply_lowpass_sweep(&mut wave, |i| 100.0 + 500.0 * wobble[i], sr, 2.0)?;
    for (sample, level) in wave.iter_mut().zip(&wobble) {
        *sample *= 0.3 + 0.7 * level;
    }
    apply_envelope(&mut wave, sr, &DUBSTEP_ENV);
    scale(&mut wave, 0.8);
    Ok(wave)
}

/// Instantaneous frequency of a bend from `from` to `to` at sample `i` of `len`.
///
/// The glide is linear in Hz and lands on `to` at the last sample. If one
/// end is a rest the other pitch is held.
pub fn bend_frequency(from: f64, to: f64, i: usize, len: usize) -> f64 {
    match (from > 0.0, to > 0.0) {
        (true, true) => {
            let position = if len > 1 { i as f64 / (len - 1) as f64 } else { 0.0 };
            from + (to - from) * position
        }
        (true, false) => from,
        (false, true) => to,
        (false, false) => 0.0,
    }
}

pub(super) fn pitch_bend_bass(from: f64, to: f64, len: usize, sr: f64, style: BassStyle) -> Result<Vec<f64>> {
    let mut wave = match style {
        BassStyle::Pluck => {
            let mut sine = Oscillator::new(Waveform::Sine, from, sr);
            let mut square = Oscillator::new(Waveform::Square, from, sr);
            let mut wave: Vec<f64> = (0..len)
                .map(|i| {
                    let f = bend_frequency(from, to, i, len);
                    sine.frequency = f;
                    square.frequency = f;
                    sine.next_sample() * 0.5 + square.next_sample() * 0.5
                })
                .collect();
            apply_envelope(&mut wave, sr, &PLUCK_ENV);
            wave
        }
        BassStyle::Reese => {
            let mut a = Oscillator::new(Waveform::Sawtooth, from, sr);
            let mut b = Oscillator::new(Waveform::Sawtooth, from * REESE_SPREAD, sr);
            let mut wave: Vec<f64> = (0..len)
                .map(|i| {
                    let f = bend_frequency(from, to, i, len);
                    a.frequency = f;
                    b.frequency = f * REESE_SPREAD;
                    (a.next_sample() + b.next_sample()) * 0.5
                })
                .collect();
            apply_lowpass(&mut wave, 400.0, sr, 1.0)?;
            apply_envelope(&mut wave, sr, &REESE_ENV);
            wave
        }
        BassStyle::Sine => {
            let mut osc = Oscillator::new(Waveform::Sine, from, sr);
            let mut wave: Vec<f64> = (0..len)
                .map(|i| {
                    osc.frequency = bend_frequency(from, to, i, len);
                    osc.next_sample()
                })
                .collect();
            apply_envelope(&mut wave, sr, &SINE_BEND_ENV);
            wave
        }
    };
    scale(&mut wave, 0.7);
    Ok(wave)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::note::parse_frequency;

    const SR: f64 = 44100.0;

    /// Average period in samples between upward zero crossings in `window`.
    fn mean_period(window: &[f64]) -> f64 {
        let crossings: Vec<usize> = window
            .windows(2)
            .enumerate()
            .filter(|(_, w)| w[0] < 0.0 && w[1] >= 0.0)
            .map(|(i, _)| i)
            .collect();
        assert!(crossings.len() >= 3, "too few crossings");
        (crossings[crossings.len() - 1] - crossings[0]) as f64 / (crossings.len() - 1) as f64
    }

    #[test]
    fn bend_is_linear_and_lands_on_target() {
        assert_eq!(bend_frequency(55.0, 49.0, 0, 101), 55.0);
        assert_eq!(bend_frequency(55.0, 49.0, 50, 101), 52.0);
        assert_eq!(bend_frequency(55.0, 49.0, 100, 101), 49.0);
        assert_eq!(bend_frequency(55.0, 0.0, 70, 101), 55.0);
        assert_eq!(bend_frequency(0.0, 49.0, 70, 101), 49.0);
        assert_eq!(bend_frequency(55.0, 49.0, 0, 1), 55.0);
    }

    #[test]
    fn bend_from_a1_to_g1_lowers_the_pitch() {
        let a1 = parse_frequency("A1").unwrap();
        let g1 = parse_frequency("G1").unwrap();
        // One beat at 120 BPM.
        let wave = pitch_bend_bass(a1, g1, 22050, SR, BassStyle::Sine).unwrap();
        assert_eq!(wave.len(), 22050);

        let early = mean_period(&wave[500..9000]);
        let late = mean_period(&wave[13000..21500]);
        assert!(late > early, "early period {early}, late period {late}");
        // Periods bracket the start and end pitches.
        assert!(early > SR / a1 - 5.0 && early < SR / g1, "early {early}");
        assert!(late < SR / g1 + 5.0 && late > SR / a1, "late {late}");
    }

    #[test]
    fn every_bend_style_renders() {
        for style in [BassStyle::Pluck, BassStyle::Reese, BassStyle::Sine] {
            let wave = pitch_bend_bass(110.0, 82.4, 11025, SR, style).unwrap();
            assert_eq!(wave.len(), 11025);
            assert!(wave.iter().any(|s| s.abs() > 0.05), "{style:?} silent");
        }
    }

    #[test]
    fn dubstep_wobble_modulates_level() {
        let wave = dubstep_bass(55.0, 44100, SR, 2.0).unwrap();
        let rms = |w: &[f64]| (w.iter().map(|s| s * s).sum::<f64>() / w.len() as f64).sqrt();
        // LFO peaks at 0.125 s and bottoms out at 0.375 s.
        let loud = rms(&wave[4000..7000]);
        let quiet = rms(&wave[15000..18000]);
        assert!(loud > quiet * 1.5, "loud {loud}, quiet {quiet}");
    }

    #[test]
    fn negative_wobble_rate_is_rejected() {
        assert!(dubstep_bass(55.0, 100, SR, -1.0).is_err());
    }

    #[test]
    fn reese_is_darker_than_its_raw_saws() {
        let filtered = reese_bass(110.0, 8820, SR).unwrap();
        let peak = filtered.iter().fold(0.0_f64, |m, s| m.max(s.abs()));
        assert!(peak > 0.1 && peak < 1.0, "peak {peak}");
    }
}
