//! Percussion: kick, snare, hi-hat, clap and a metallic hit.

use std::f64::consts::PI;

use crate::dsp::envelope::{Adsr, apply_envelope};
use crate::dsp::filter::apply_highpass;
use crate::dsp::oscillator::{Noise, Oscillator, Waveform};
use crate::error::Result;

use super::{sample_count, time};

const KICK_ENV: Adsr = Adsr::new(0.002, 0.2, 0.1, 0.1).with_curve(2.0);
const SNARE_ENV: Adsr = Adsr::new(0.002, 0.03, 0.0, 0.05);
const HIHAT_ENV: Adsr = Adsr::new(0.002, 0.03, 0.0, 0.02);
const CLAP_ENV: Adsr = Adsr::new(0.001, 0.02, 0.0, 0.04);
const PERC_ENV: Adsr = Adsr::new(0.001, 0.02, 0.0, 0.01);

/// Seconds between clap bursts, and the length of each burst.
const CLAP_SPACING: f64 = 0.008;
const CLAP_BURSTS: usize = 4;

pub(super) fn kick(len: usize, sr: f64, punch: f64) -> Vec<f64> {
    let mut body = Oscillator::new(Waveform::Sine, 0.0, sr);
    let mut wave: Vec<f64> = (0..len)
        .map(|i| {
            let t = time(i, sr);
            body.frequency = 60.0 + 200.0 * punch * (-t / 0.05).exp();
            let click = (2.0 * PI * 150.0 * t).sin() * (-t / 0.002).exp() * 0.3 * punch;
            let sub = (2.0 * PI * 50.0 * t).sin() * (-t / 0.15).exp();
            (body.next_sample() + click) * 0.7 + sub * 0.3
        })
        .collect();

    apply_envelope(&mut wave, sr, &KICK_ENV);
    wave.iter_mut().for_each(|s| *s = (*s * 1.2).tanh() * 0.9);
    wave
}

pub(super) fn snare(len: usize, sr: f64, tone: f64, noise: &mut Noise) -> Result<Vec<f64>> {
    let mut rattle = noise.render(len);
    apply_highpass(&mut rattle, 200.0, sr, 1.0)?;

    let mut wave: Vec<f64> = rattle
        .iter()
        .enumerate()
        .map(|(i, n)| {
            let t = time(i, sr);
            let body = ((2.0 * PI * 200.0 * t).sin() + (2.0 * PI * 300.0 * t).sin() * 0.7) * tone;
            body * 0.4 + n * 0.6
        })
        .collect();

    apply_envelope(&mut wave, sr, &SNARE_ENV);
    wave.iter_mut().for_each(|s| *s = s.tanh() * 0.6);
    Ok(wave)
}

pub(super) fn hihat(len: usize, sr: f64, tone: f64, noise: &mut Noise) -> Result<Vec<f64>> {
    let mut wave: Vec<f64> = (0..len)
        .map(|i| {
            let metallic = (2.0 * PI * 8000.0 * time(i, sr)).sin() * tone;
            noise.next_sample() * (1.0 - tone) + metallic
        })
        .collect();

    apply_highpass(&mut wave, 4000.0, sr, 1.0)?;
    apply_envelope(&mut wave, sr, &HIHAT_ENV);
    wave.iter_mut().for_each(|s| *s *= 0.3);
    Ok(wave)
}

/// Four short noise bursts, each a little louder than the last.
pub(super) fn clap(len: usize, sr: f64, noise: &mut Noise) -> Result<Vec<f64>> {
    let mut wave = vec![0.0; len];
    let burst = sample_count(CLAP_SPACING, sr);

    for i in 0..CLAP_BURSTS {
        let start = sample_count(i as f64 * CLAP_SPACING, sr);
        if start >= len {
            break;
        }
        let end = (start + burst).min(len);
        let gain = 0.7 + i as f64 * 0.1;
        for sample in &mut wave[start..end] {
            *sample = noise.next_sample() * gain;
        }
    }

    apply_highpass(&mut wave, 1000.0, sr, 1.0)?;
    apply_envelope(&mut wave, sr, &CLAP_ENV);
    wave.iter_mut().for_each(|s| *s *= 0.5);
    Ok(wave)
}

pub(super) fn percussion(len: usize, sr: f64, noise: &mut Noise) -> Vec<f64> {
    let mut wave: Vec<f64> = (0..len)
        .map(|i| {
            let t = time(i, sr);
            (2.0 * PI * 800.0 * t).sin() * 0.5
                + (2.0 * PI * 1200.0 * t).sin() * 0.3
                + (2.0 * PI * 2000.0 * t).sin() * 0.2
        })
        .collect();

    let transient = sample_count(0.002, sr).min(len);
    for sample in &mut wave[..transient] {
        *sample += noise.next_sample() * 0.5;
    }

    apply_envelope(&mut wave, sr, &PERC_ENV);
    wave.iter_mut().for_each(|s| *s *= 0.4);
    wave
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f64 = 44100.0;

    fn peak(wave: &[f64]) -> f64 {
        wave.iter().fold(0.0, |m: f64, s| m.max(s.abs()))
    }

    #[test]
    fn kick_is_front_loaded_and_saturated() {
        let wave = kick(22050, SR, 1.0);
        assert!(peak(&wave) <= 0.9);
        let head = peak(&wave[..2205]);
        let tail = peak(&wave[20000..]);
        assert!(head > 0.3, "head {head}");
        assert!(tail < head * 0.5, "tail {tail} vs head {head}");
    }

    #[test]
    fn kick_pitch_drops() {
        // Zero-crossing spacing grows as the sweep settles towards 60 Hz.
        let wave = kick(22050, SR, 1.0);
        let crossings: Vec<usize> = wave[..16000]
            .windows(2)
            .enumerate()
            .filter(|(_, w)| w[0] < 0.0 && w[1] >= 0.0)
            .map(|(i, _)| i)
            .collect();
        assert!(crossings.len() >= 3);
        let first = crossings[1] - crossings[0];
        let last = crossings[crossings.len() - 1] - crossings[crossings.len() - 2];
        assert!(last > first, "first period {first}, last period {last}");
    }

    #[test]
    fn clap_bursts_start_on_schedule() {
        let mut noise = Noise::new(4);
        let wave = clap(22050, SR, &mut noise).unwrap();
        // After the four bursts there's only filter ringing left.
        let bursts_end = sample_count(CLAP_SPACING * CLAP_BURSTS as f64, SR);
        assert!(peak(&wave[..bursts_end]) > 0.05);
        assert!(peak(&wave[bursts_end + 500..]) < 0.05);
    }

    #[test]
    fn clap_shorter_than_its_bursts() {
        let mut noise = Noise::new(4);
        let wave = clap(100, SR, &mut noise).unwrap();
        assert_eq!(wave.len(), 100);
    }

    #[test]
    fn hihat_has_little_low_end() {
        let mut noise = Noise::new(2);
        let wave = hihat(4410, SR, 0.5, &mut noise).unwrap();
        let mean = wave.iter().sum::<f64>() / wave.len() as f64;
        assert!(mean.abs() < 0.01, "DC {mean}");
    }

    #[test]
    fn percussion_transient_fits_short_buffers() {
        let mut noise = Noise::new(2);
        assert_eq!(percussion(10, SR, &mut noise).len(), 10);
    }
}
