//! Gain automation curves applied over a whole rendered track.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Rate of the `pulse` curve.
const PULSE_HZ: f64 = 4.0;

/// Named automation shapes. Unrecognized names deserialize to `Unknown`,
/// which leaves the audio untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutomationCurve {
    /// Linear 0 → 1 across the buffer.
    FadeIn,
    /// Linear 1 → 0 across the buffer.
    FadeOut,
    /// One sine half-cycle 0 → 1 → 0.
    Swell,
    /// 4 Hz tremolo mapped into [0, 1].
    Pulse,
    #[serde(other)]
    Unknown,
}

impl AutomationCurve {
    /// Gain at sample `i` of a `len`-sample buffer.
    pub fn gain_at(self, i: usize, len: usize, sample_rate: f64) -> f64 {
        // Position in [0, 1], with the last sample landing exactly on 1.
        let position = if len > 1 { i as f64 / (len - 1) as f64 } else { 0.0 };
        match self {
            AutomationCurve::FadeIn => position,
            AutomationCurve::FadeOut => 1.0 - position,
            AutomationCurve::Swell => (PI * position).sin(),
            AutomationCurve::Pulse => 0.5 + 0.5 * (2.0 * PI * PULSE_HZ * i as f64 / sample_rate).sin(),
            AutomationCurve::Unknown => 1.0,
        }
    }
}

/// Multiply `wave` by the automation curve in place.
pub fn apply_automation(wave: &mut [f64], curve: AutomationCurve, sample_rate: f64) {
    apply_automation_amount(wave, curve, sample_rate, 1.0);
}

/// Blend between no automation (`amount = 0`) and the full curve (`amount = 1`):
/// `gain = 1 - amount + amount * curve`.
pub fn apply_automation_amount(wave: &mut [f64], curve: AutomationCurve, sample_rate: f64, amount: f64) {
    if curve == AutomationCurve::Unknown || amount == 0.0 {
        return;
    }
    let len = wave.len();
    for (i, sample) in wave.iter_mut().enumerate() {
        let gain = curve.gain_at(i, len, sample_rate);
        *sample *= 1.0 - amount + amount * gain;
    }
}
