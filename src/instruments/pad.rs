//! Harmonic pad: a few partials under a slow envelope.

use crate::dsp::envelope::{Adsr, apply_envelope};
use crate::dsp::oscillator::{Oscillator, Waveform};

const PAD_ENV: Adsr = Adsr::new(0.3, 0.2, 0.6, 0.3);

/// Partials as (frequency ratio, level).
const PARTIALS: [(f64, f64); 4] = [(1.0, 1.0), (1.01, 0.7), (2.0, 0.3), (0.5, 0.4)];

/// Soft sine pad: a slightly detuned unison, the octave above and the octave below.
pub(super) fn pad(freq: f64, len: usize, sr: f64) -> Vec<f64> {
    let total: f64 = PARTIALS.iter().map(|(_, level)| level).sum();
    let mut wave = vec![0.0; len];
    for (ratio, level) in PARTIALS {
        let mut osc = Oscillator::new(Waveform::Sine, freq * ratio, sr);
        for sample in wave.iter_mut() {
            *sample += osc.next_sample() * level / total;
        }
    }

    apply_envelope(&mut wave, sr, &PAD_ENV);
    wave.iter_mut().for_each(|s| *s *= 0.3);
    wave
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pad_swells_in_slowly() {
        let wave = pad(220.0, 44100, 44100.0);
        let peak = |w: &[f64]| w.iter().fold(0.0_f64, |m, s| m.max(s.abs()));
        assert!(peak(&wave[..441]) < peak(&wave[13230..17640]));
        assert!(peak(&wave) <= 0.3);
    }
}
