//! Biquad filter: RBJ cookbook low-pass / high-pass with resonance.

use std::f64::consts::{FRAC_1_SQRT_2, PI};

use crate::error::{EdmError, Result};

/// Q of a maximally flat (Butterworth) second-order section.
pub const BUTTERWORTH_Q: f64 = FRAC_1_SQRT_2;

/// Cutoffs are clamped to this fraction of Nyquist.
const MAX_NYQUIST_FRACTION: f64 = 0.99;

/// Swept filters recompute coefficients once per this many samples.
const CONTROL_BLOCK: usize = 16;

/// Filter type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterType {
    Lowpass,
    Highpass,
}

/// A biquad IIR filter (2nd order).
///
/// Implements the standard Direct Form II Transposed structure.
/// Coefficient formulas from the Audio EQ Cookbook (Robert Bristow-Johnson).
#[derive(Debug, Clone)]
pub struct BiquadFilter {
    pub filter_type: FilterType,
    pub frequency: f64,
    pub q: f64,

    // Coefficients
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,

    // State (Direct Form II Transposed)
    z1: f64,
    z2: f64,

    sample_rate: f64,
    dirty: bool,
}

impl BiquadFilter {
    pub fn new(filter_type: FilterType, sample_rate: f64) -> Self {
        let mut f = BiquadFilter {
            filter_type,
            frequency: 1000.0_f64.min(sample_rate * 0.25),
            q: BUTTERWORTH_Q,
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            z1: 0.0,
            z2: 0.0,
            sample_rate,
            dirty: true,
        };
        f.update_coefficients();
        f
    }

    /// Recompute filter coefficients from current parameters.
    pub fn update_coefficients(&mut self) {
        let w0 = 2.0 * PI * self.frequency / self.sample_rate;
        let cos_w0 = w0.cos();
        let sin_w0 = w0.sin();
        let alpha = sin_w0 / (2.0 * self.q);

        let (b0, b1, b2) = match self.filter_type {
            FilterType::Lowpass => {
                let b1 = 1.0 - cos_w0;
                (b1 / 2.0, b1, b1 / 2.0)
            }
            FilterType::Highpass => {
                let b0 = (1.0 + cos_w0) / 2.0;
                (b0, -(1.0 + cos_w0), b0)
            }
        };
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_w0;
        let a2 = 1.0 - alpha;

        // Normalize by a0
        self.b0 = b0 / a0;
        self.b1 = b1 / a0;
        self.b2 = b2 / a0;
        self.a1 = a1 / a0;
        self.a2 = a2 / a0;
        self.dirty = false;
    }

    /// Process a single sample through the filter.
    pub fn process(&mut self, input: f64) -> f64 {
        if self.dirty {
            self.update_coefficients();
        }

        let output = self.b0 * input + self.z1;
        self.z1 = self.b1 * input - self.a1 * output + self.z2;
        self.z2 = self.b2 * input - self.a2 * output;
        output
    }

    /// Filter a whole buffer in place.
    pub fn process_block(&mut self, wave: &mut [f64]) {
        for sample in wave.iter_mut() {
            *sample = self.process(*sample);
        }
    }

    /// Steady-state magnitude response at `freq` Hz.
    pub fn magnitude_at(&mut self, freq: f64) -> f64 {
        if self.dirty {
            self.update_coefficients();
        }
        let w = 2.0 * PI * freq / self.sample_rate;
        let (c1, s1, c2, s2) = (w.cos(), w.sin(), (2.0 * w).cos(), (2.0 * w).sin());
        let num_re = self.b0 + self.b1 * c1 + self.b2 * c2;
        let num_im = -(self.b1 * s1 + self.b2 * s2);
        let den_re = 1.0 + self.a1 * c1 + self.a2 * c2;
        let den_im = -(self.a1 * s1 + self.a2 * s2);
        ((num_re * num_re + num_im * num_im) / (den_re * den_re + den_im * den_im)).sqrt()
    }

    /// Reset filter state.
    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }

    /// Set frequency and mark coefficients dirty.
    pub fn set_frequency(&mut self, freq: f64) {
        self.frequency = freq;
        self.dirty = true;
    }

    /// Set Q and mark coefficients dirty.
    pub fn set_q(&mut self, q: f64) {
        self.q = q;
        self.dirty = true;
    }
}

/// Map the user-facing resonance onto Q.
///
/// At or below 1.0 the response stays flat (Butterworth). Above 1.0 the Q
/// grows with resonance, lifting the gain at cutoff above unity.
pub fn resonance_to_q(resonance: f64) -> f64 {
    if resonance > 1.0 {
        BUTTERWORTH_Q * resonance
    } else {
        BUTTERWORTH_Q
    }
}

fn check_rate_and_resonance(sample_rate: f64, resonance: f64) -> Result<()> {
    if !(sample_rate.is_finite() && sample_rate > 0.0) {
        return Err(EdmError::invalid_parameter("sample_rate", sample_rate, "must be positive"));
    }
    if !(resonance.is_finite() && resonance > 0.0) {
        return Err(EdmError::invalid_parameter("resonance", resonance, "must be positive"));
    }
    Ok(())
}

/// Validate a cutoff and clamp it below Nyquist.
pub fn clamp_cutoff(cutoff: f64, sample_rate: f64) -> Result<f64> {
    if !(cutoff.is_finite() && cutoff > 0.0) {
        return Err(EdmError::invalid_parameter("cutoff", cutoff, "must be positive"));
    }
    let ceiling = sample_rate / 2.0 * MAX_NYQUIST_FRACTION;
    if cutoff > ceiling {
        tracing::trace!(cutoff, ceiling, "cutoff clamped below Nyquist");
        Ok(ceiling)
    } else {
        Ok(cutoff)
    }
}

fn apply_static(
    filter_type: FilterType,
    wave: &mut [f64],
    cutoff: f64,
    sample_rate: f64,
    resonance: f64,
) -> Result<()> {
    check_rate_and_resonance(sample_rate, resonance)?;
    let mut filter = BiquadFilter::new(filter_type, sample_rate);
    filter.set_frequency(clamp_cutoff(cutoff, sample_rate)?);
    filter.set_q(resonance_to_q(resonance));
    filter.process_block(wave);
    Ok(())
}

/// Resonant low-pass, in place.
pub fn apply_lowpass(wave: &mut [f64], cutoff: f64, sample_rate: f64, resonance: f64) -> Result<()> {
    apply_static(FilterType::Lowpass, wave, cutoff, sample_rate, resonance)
}

/// Resonant high-pass, in place.
pub fn apply_highpass(wave: &mut [f64], cutoff: f64, sample_rate: f64, resonance: f64) -> Result<()> {
    apply_static(FilterType::Highpass, wave, cutoff, sample_rate, resonance)
}

/// Low-pass whose cutoff follows `cutoff_at(sample_index)`.
pub fn apply_lowpass_sweep(
    wave: &mut [f64],
    cutoff_at: impl Fn(usize) -> f64,
    sample_rate: f64,
    resonance: f64,
) -> Result<()> {
    check_rate_and_resonance(sample_rate, resonance)?;
    let mut filter = BiquadFilter::new(FilterType::Lowpass, sample_rate);
    filter.set_q(resonance_to_q(resonance));

    for (block_index, block) in wave.chunks_mut(CONTROL_BLOCK).enumerate() {
        filter.set_frequency(clamp_cutoff(cutoff_at(block_index * CONTROL_BLOCK), sample_rate)?);
        filter.process_block(block);
    }
    Ok(())
}
