//! Mixer: two summing buses, sidechain ducking and output normalization.
//!
//! The reference bus carries the kick; everything else lands on the ducked
//! bus so a sidechain pass can pump it against the recorded kick hits.

use super::sidechain::Sidechain;

/// Peak level the normalizer keeps every sample under.
pub const NORMALIZE_CEILING: f64 = 0.95;
/// Samples below this level pass through the normalizer unchanged.
pub const NORMALIZE_KNEE: f64 = 0.75;
/// Steepness of the shoulder above the knee.
const SHOULDER: f64 = 2.0;

/// Destination bus for a placed buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bus {
    /// Sidechain key material; never ducked.
    Reference,
    /// Everything the sidechain acts on.
    Ducked,
}

/// A pre-sized accumulation buffer for a whole composition.
#[derive(Debug, Clone)]
pub struct Mixer {
    reference: Vec<f64>,
    ducked: Vec<f64>,
    /// Sample offsets of sidechain key hits.
    hits: Vec<usize>,
}

impl Mixer {
    /// Both buses hold `num_samples` zeros.
    pub fn new(num_samples: usize) -> Self {
        Mixer {
            reference: vec![0.0; num_samples],
            ducked: vec![0.0; num_samples],
            hits: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.reference.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reference.is_empty()
    }

    /// Add `wave × gain` into `bus` starting at `offset`.
    ///
    /// Anything past the end of the buffer is dropped. Returns the number of
    /// samples actually written.
    pub fn place(&mut self, bus: Bus, offset: usize, wave: &[f64], gain: f64) -> usize {
        let target = match bus {
            Bus::Reference => &mut self.reference,
            Bus::Ducked => &mut self.ducked,
        };
        if offset >= target.len() {
            return 0;
        }
        let end = (offset + wave.len()).min(target.len());
        for (out, &sample) in target[offset..end].iter_mut().zip(wave) {
            *out += sample * gain;
        }
        end - offset
    }

    /// Record a sidechain key hit at `offset`.
    pub fn mark_hit(&mut self, offset: usize) {
        if offset < self.len() {
            self.hits.push(offset);
        }
    }

    pub fn hits(&self) -> &[usize] {
        &self.hits
    }

    /// Duck the ducked bus against the recorded hits.
    pub fn apply_sidechain(&mut self, sidechain: &Sidechain) {
        sidechain.process_block(&mut self.ducked, &self.hits);
    }

    /// Sum both buses into one buffer.
    pub fn mixdown(self) -> Vec<f64> {
        let Mixer { mut reference, ducked, .. } = self;
        for (out, d) in reference.iter_mut().zip(ducked) {
            *out += d;
        }
        reference
    }
}

/// Keep the buffer's peak below [`NORMALIZE_CEILING`].
///
/// Buffers already at or under the ceiling are left untouched. Otherwise
/// samples up to the knee pass unchanged and the range between the knee and
/// the buffer's peak is folded onto a tanh shoulder that tops out strictly
/// below the ceiling.
pub fn normalize(buffer: &mut [f64]) {
    let peak = buffer.iter().fold(0.0_f64, |m, s| m.max(s.abs()));
    if peak <= NORMALIZE_CEILING || !peak.is_finite() {
        return;
    }

    let headroom = NORMALIZE_CEILING - NORMALIZE_KNEE;
    let span = peak - NORMALIZE_KNEE;
    tracing::debug!(peak, "soft-limiting mix above the knee");
    for sample in buffer.iter_mut() {
        let magnitude = sample.abs();
        if magnitude > NORMALIZE_KNEE {
            let u = (magnitude - NORMALIZE_KNEE) / span;
            *sample = sample.signum() * (NORMALIZE_KNEE + headroom * (SHOULDER * u).tanh());
        }
    }
}
