//! Instrument generators.
//!
//! Every instrument is a pure function from a [`NoteEvent`] and its
//! [`InstrumentParams`] to a mono buffer of exactly
//! `round(duration × sample_rate)` samples. Noise comes from the caller's
//! seeded [`Noise`] so renders are reproducible.

mod bass;
mod drums;
mod fx;
mod lead;
mod pad;

use serde::{Deserialize, Serialize};

use crate::config::{BassStyle, SweepCurve, Track};
use crate::dsp::oscillator::Noise;
use crate::error::{EdmError, Result};

/// Every instrument the engine knows how to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentKind {
    Kick,
    Snare,
    Hihat,
    Clap,
    Percussion,
    Bass,
    SubBass,
    ReeseBass,
    PluckBass,
    FutureBass,
    DubstepBass,
    PitchBendBass,
    Melody,
    Supersaw,
    Pluck,
    Arp,
    Pad,
    Sweep,
    WhiteNoiseRiser,
    Impact,
}

/// How the arranger schedules an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    /// Pattern-driven hits of half a beat.
    Percussive,
    /// Note lists with durations in beats.
    Melodic,
    /// One event spanning the track.
    Fx,
}

impl InstrumentKind {
    pub fn family(self) -> Family {
        use InstrumentKind::*;
        match self {
            Kick | Snare | Hihat | Clap | Percussion => Family::Percussive,
            Sweep | WhiteNoiseRiser | Impact => Family::Fx,
            _ => Family::Melodic,
        }
    }

    pub fn is_percussive(self) -> bool {
        self.family() == Family::Percussive
    }

    pub fn is_melodic(self) -> bool {
        self.family() == Family::Melodic
    }

    /// Kicks key the sidechain and stay out of the ducked bus.
    pub fn is_sidechain_key(self) -> bool {
        self == InstrumentKind::Kick
    }

    /// Snake-case name as written in song files.
    pub fn name(self) -> &'static str {
        use InstrumentKind::*;
        match self {
            Kick => "kick",
            Snare => "snare",
            Hihat => "hihat",
            Clap => "clap",
            Percussion => "percussion",
            Bass => "bass",
            SubBass => "sub_bass",
            ReeseBass => "reese_bass",
            PluckBass => "pluck_bass",
            FutureBass => "future_bass",
            DubstepBass => "dubstep_bass",
            PitchBendBass => "pitch_bend_bass",
            Melody => "melody",
            Supersaw => "supersaw",
            Pluck => "pluck",
            Arp => "arp",
            Pad => "pad",
            Sweep => "sweep",
            WhiteNoiseRiser => "white_noise_riser",
            Impact => "impact",
        }
    }
}

impl std::fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What is being played. Frequencies are in Hz; 0.0 is a rest.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pitch {
    /// Drums and effects.
    Unpitched,
    Note(f64),
    /// A glide from the first frequency to the second across the note.
    Bend(f64, f64),
}

impl Pitch {
    pub fn is_rest(self) -> bool {
        match self {
            Pitch::Unpitched => false,
            Pitch::Note(f) => f == 0.0,
            Pitch::Bend(from, to) => from == 0.0 && to == 0.0,
        }
    }

    /// The starting frequency, or 0.0 for unpitched events.
    pub fn frequency(self) -> f64 {
        match self {
            Pitch::Unpitched => 0.0,
            Pitch::Note(f) => f,
            Pitch::Bend(from, to) => {
                if from > 0.0 {
                    from
                } else {
                    to
                }
            }
        }
    }
}

/// A single thing to play.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteEvent {
    pub pitch: Pitch,
    /// Length in seconds.
    pub duration: f64,
}

impl NoteEvent {
    pub fn note(frequency: f64, duration: f64) -> Self {
        NoteEvent {
            pitch: Pitch::Note(frequency),
            duration,
        }
    }

    pub fn bend(from: f64, to: f64, duration: f64) -> Self {
        NoteEvent {
            pitch: Pitch::Bend(from, to),
            duration,
        }
    }

    pub fn hit(duration: f64) -> Self {
        NoteEvent {
            pitch: Pitch::Unpitched,
            duration,
        }
    }
}

/// Per-track voicing controls.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentParams {
    pub punch: f64,
    pub tone: f64,
    pub detune: f64,
    pub voices: usize,
    pub wobble_rate: f64,
    pub bass_style: BassStyle,
    pub reverse: bool,
    pub start_freq: f64,
    pub end_freq: f64,
    pub sweep_curve: SweepCurve,
    pub arp_pattern: Vec<f64>,
}

impl Default for InstrumentParams {
    fn default() -> Self {
        InstrumentParams::from(&Track::new(InstrumentKind::Melody))
    }
}

impl From<&Track> for InstrumentParams {
    fn from(track: &Track) -> Self {
        InstrumentParams {
            punch: track.punch,
            tone: track.tone,
            detune: track.detune,
            voices: track.voices,
            wobble_rate: track.wobble_rate,
            bass_style: track.bass_style,
            reverse: track.reverse,
            start_freq: track.start_freq,
            end_freq: track.end_freq,
            sweep_curve: track.sweep_curve,
            arp_pattern: track.arp_pattern.clone(),
        }
    }
}

/// Number of samples in `duration` seconds.
pub fn sample_count(duration: f64, sample_rate: f64) -> usize {
    (duration * sample_rate).round().max(0.0) as usize
}

/// Time in seconds of sample `i`.
#[inline]
pub(crate) fn time(i: usize, sample_rate: f64) -> f64 {
    i as f64 / sample_rate
}

/// Render one event on `kind`.
pub fn generate(
    kind: InstrumentKind,
    event: &NoteEvent,
    params: &InstrumentParams,
    sample_rate: f64,
    noise: &mut Noise,
) -> Result<Vec<f64>> {
    if !(sample_rate.is_finite() && sample_rate > 0.0) {
        return Err(EdmError::invalid_parameter("sample_rate", sample_rate, "must be positive"));
    }
    if !(event.duration.is_finite() && event.duration >= 0.0) {
        return Err(EdmError::invalid_parameter("duration", event.duration, "must be non-negative"));
    }

    let len = sample_count(event.duration, sample_rate);
    if event.pitch.is_rest() || len == 0 {
        return Ok(vec![0.0; len]);
    }

    let freq = event.pitch.frequency();
    if kind.is_melodic() {
        if !(freq.is_finite() && freq >= 0.0) {
            return Err(EdmError::invalid_parameter("frequency", freq, "must be non-negative"));
        }
        if freq == 0.0 {
            return Ok(vec![0.0; len]);
        }
    }
    let sr = sample_rate;
    use InstrumentKind::*;
    match kind {
        Kick => Ok(drums::kick(len, sr, params.punch)),
        Snare => drums::snare(len, sr, params.tone, noise),
        Hihat => drums::hihat(len, sr, params.tone, noise),
        Clap => drums::clap(len, sr, noise),
        Percussion => Ok(drums::percussion(len, sr, noise)),

        Bass => Ok(bass::bass(freq, len, sr)),
        SubBass => Ok(bass::sub_bass(freq, len, sr)),
        ReeseBass => bass::reese_bass(freq, len, sr),
        PluckBass => bass::pluck_bass(freq, len, sr),
        FutureBass => bass::future_bass(freq, len, sr),
        DubstepBass => bass::dubstep_bass(freq, len, sr, params.wobble_rate),
        PitchBendBass => {
            let (from, to) = match event.pitch {
                Pitch::Bend(from, to) => (from, to),
                other => (other.frequency(), other.frequency()),
            };
            bass::pitch_bend_bass(from, to, len, sr, params.bass_style)
        }

        Melody => Ok(lead::melody(freq, len, sr)),
        Supersaw => lead::supersaw(freq, len, sr, params.voices, params.detune, noise),
        Pluck => Ok(lead::pluck(freq, len, sr, noise)),
        Arp => lead::arp(freq, len, sr, &params.arp_pattern),

        Pad => Ok(pad::pad(freq, len, sr)),

        Sweep => fx::sweep(len, sr, params),
        WhiteNoiseRiser => fx::white_noise_riser(len, sr, noise),
        Impact => fx::impact(len, sr, noise),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f64 = 44100.0;

    const ALL: [InstrumentKind; 20] = [
        InstrumentKind::Kick,
        InstrumentKind::Snare,
        InstrumentKind::Hihat,
        InstrumentKind::Clap,
        InstrumentKind::Percussion,
        InstrumentKind::Bass,
        InstrumentKind::SubBass,
        InstrumentKind::ReeseBass,
        InstrumentKind::PluckBass,
        InstrumentKind::FutureBass,
        InstrumentKind::DubstepBass,
        InstrumentKind::PitchBendBass,
        InstrumentKind::Melody,
        InstrumentKind::Supersaw,
        InstrumentKind::Pluck,
        InstrumentKind::Arp,
        InstrumentKind::Pad,
        InstrumentKind::Sweep,
        InstrumentKind::WhiteNoiseRiser,
        InstrumentKind::Impact,
    ];

    fn event_for(kind: InstrumentKind, freq: f64, duration: f64) -> NoteEvent {
        match kind.family() {
            Family::Melodic if kind == InstrumentKind::PitchBendBass => NoteEvent::bend(freq, freq * 0.9, duration),
            Family::Melodic => NoteEvent::note(freq, duration),
            _ => NoteEvent::hit(duration),
        }
    }

    #[test]
    fn every_instrument_renders_the_exact_length() {
        let params = InstrumentParams::default();
        for kind in ALL {
            for duration in [0.0, 0.01, 0.25, 0.3333, 1.0] {
                let mut noise = Noise::new(1);
                let wave = generate(kind, &event_for(kind, 110.0, duration), &params, SR, &mut noise).unwrap();
                assert_eq!(wave.len(), sample_count(duration, SR), "{kind} at {duration}s");
                assert!(wave.iter().all(|s| s.is_finite()), "{kind} produced non-finite samples");
            }
        }
    }

    #[test]
    fn rests_are_silent_with_the_expected_length() {
        let params = InstrumentParams::default();
        for kind in ALL.into_iter().filter(|k| k.is_melodic()) {
            let mut noise = Noise::new(1);
            let event = if kind == InstrumentKind::PitchBendBass {
                NoteEvent::bend(0.0, 0.0, 0.5)
            } else {
                NoteEvent::note(0.0, 0.5)
            };
            let wave = generate(kind, &event, &params, SR, &mut noise).unwrap();
            assert_eq!(wave.len(), 22050);
            assert!(wave.iter().all(|&s| s == 0.0), "{kind} rest not silent");
        }
    }

    #[test]
    fn pitched_notes_make_sound() {
        let params = InstrumentParams::default();
        for kind in ALL {
            let mut noise = Noise::new(5);
            let wave = generate(kind, &event_for(kind, 220.0, 0.5), &params, SR, &mut noise).unwrap();
            let peak = wave.iter().fold(0.0_f64, |m, s| m.max(s.abs()));
            assert!(peak > 0.01, "{kind} is silent (peak {peak})");
            assert!(peak < 2.0, "{kind} is far too hot (peak {peak})");
        }
    }

    #[test]
    fn same_seed_same_output() {
        let params = InstrumentParams::default();
        for kind in [InstrumentKind::Snare, InstrumentKind::Pluck, InstrumentKind::Supersaw] {
            let a = generate(kind, &event_for(kind, 220.0, 0.2), &params, SR, &mut Noise::new(9)).unwrap();
            let b = generate(kind, &event_for(kind, 220.0, 0.2), &params, SR, &mut Noise::new(9)).unwrap();
            assert_eq!(a, b, "{kind} not reproducible");
        }
    }

    #[test]
    fn bad_duration_or_rate_is_rejected() {
        let params = InstrumentParams::default();
        let mut noise = Noise::new(0);
        let err = generate(InstrumentKind::Bass, &NoteEvent::note(55.0, -1.0), &params, SR, &mut noise).unwrap_err();
        assert!(matches!(err, EdmError::InvalidParameter { name: "duration", .. }));
        let err = generate(InstrumentKind::Bass, &NoteEvent::note(55.0, 1.0), &params, 0.0, &mut noise).unwrap_err();
        assert!(matches!(err, EdmError::InvalidParameter { name: "sample_rate", .. }));
    }

    #[test]
    fn kind_names_round_trip_through_serde() {
        for kind in ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.name()));
            let back: InstrumentKind = serde_json::from_str(&json).unwrap();
            assert_eq!(back, kind);
        }
    }

    #[test]
    fn families() {
        assert!(InstrumentKind::Clap.is_percussive());
        assert!(InstrumentKind::PitchBendBass.is_melodic());
        assert_eq!(InstrumentKind::Impact.family(), Family::Fx);
        assert!(InstrumentKind::Kick.is_sidechain_key());
        assert!(!InstrumentKind::Snare.is_sidechain_key());
    }
}
