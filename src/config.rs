//! Song description consumed by the engine.
//!
//! The field layout mirrors the document a user writes: global settings at
//! the top level, then `sections`, each with its `tracks`. Optional fields
//! carry the defaults the instruments were voiced with.

use serde::{Deserialize, Serialize};

use crate::dsp::automation::AutomationCurve;
use crate::dsp::sidechain::SidechainStyle;
use crate::error::Result;
use crate::instruments::InstrumentKind;

pub const DEFAULT_SAMPLE_RATE: u32 = 44100;
pub const DEFAULT_BEATS_PER_BAR: u32 = 4;
pub const DEFAULT_SIDECHAIN_STRENGTH: f64 = 0.7;
pub const DEFAULT_SEED: u64 = 0x5EED_0F_ED;

fn default_sample_rate() -> u32 {
    DEFAULT_SAMPLE_RATE
}
fn default_beats_per_bar() -> u32 {
    DEFAULT_BEATS_PER_BAR
}
fn default_sidechain_strength() -> f64 {
    DEFAULT_SIDECHAIN_STRENGTH
}
fn default_seed() -> u64 {
    DEFAULT_SEED
}
fn default_volume() -> f64 {
    1.0
}
fn default_punch() -> f64 {
    1.0
}
fn default_tone() -> f64 {
    0.5
}
fn default_detune() -> f64 {
    0.03
}
fn default_voices() -> usize {
    7
}
fn default_wobble_rate() -> f64 {
    2.0
}
fn default_start_freq() -> f64 {
    100.0
}
fn default_end_freq() -> f64 {
    8000.0
}
fn default_arp_pattern() -> Vec<f64> {
    vec![1.0, 1.5, 2.0, 1.5]
}

/// The whole composition plus render-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongConfig {
    /// Beats per minute.
    pub tempo: f64,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_beats_per_bar")]
    pub beats_per_bar: u32,
    /// Duck non-kick tracks against the kick.
    #[serde(default)]
    pub sidechain: bool,
    #[serde(default)]
    pub sidechain_style: SidechainStyle,
    #[serde(default = "default_sidechain_strength")]
    pub sidechain_strength: f64,
    /// Seed for every noise source in the render.
    #[serde(default = "default_seed")]
    pub seed: u64,
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    #[serde(default)]
    pub name: String,
    pub bars: u32,
    #[serde(default)]
    pub tracks: Vec<Track>,
}

/// One step of a drum pattern: a velocity or an on/off flag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Step {
    Velocity(f64),
    Toggle(bool),
}

impl Step {
    pub fn velocity(self) -> f64 {
        match self {
            Step::Velocity(v) => v,
            Step::Toggle(true) => 1.0,
            Step::Toggle(false) => 0.0,
        }
    }
}

/// Oscillator layout for `pitch_bend_bass`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BassStyle {
    #[default]
    Pluck,
    Reese,
    /// Plain sine; also what unrecognized names fall back to.
    #[serde(other)]
    Sine,
}

/// Frequency trajectory of a `sweep`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepCurve {
    #[default]
    Linear,
    Exponential,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    #[serde(rename = "type")]
    pub kind: InstrumentKind,
    /// Per-beat velocities for percussion.
    #[serde(default)]
    pub pattern: Option<Vec<Step>>,
    /// Note names for melodic instruments.
    #[serde(default)]
    pub notes: Option<Vec<String>>,
    /// Note lengths in beats, cycled alongside `notes`.
    #[serde(default)]
    pub durations: Option<Vec<f64>>,
    /// Bend targets for `pitch_bend_bass`, cycled alongside `notes`.
    #[serde(default)]
    pub bend_notes: Option<Vec<String>>,
    #[serde(default = "default_volume")]
    pub volume: f64,
    #[serde(default)]
    pub automation: Option<AutomationCurve>,
    /// Bar inside the section where this track begins.
    #[serde(default)]
    pub start_bar: u32,

    #[serde(default = "default_punch")]
    pub punch: f64,
    #[serde(default = "default_tone")]
    pub tone: f64,
    #[serde(default = "default_detune")]
    pub detune: f64,
    #[serde(default = "default_voices")]
    pub voices: usize,
    #[serde(default = "default_wobble_rate")]
    pub wobble_rate: f64,
    #[serde(default)]
    pub bass_style: BassStyle,
    #[serde(default)]
    pub reverse: bool,
    #[serde(default = "default_start_freq")]
    pub start_freq: f64,
    #[serde(default = "default_end_freq")]
    pub end_freq: f64,
    #[serde(default)]
    pub sweep_curve: SweepCurve,
    /// Frequency multipliers of the root note for `arp`.
    #[serde(default = "default_arp_pattern")]
    pub arp_pattern: Vec<f64>,
}

impl Track {
    /// A track of `kind` with every optional field at its default.
    pub fn new(kind: InstrumentKind) -> Self {
        Track {
            kind,
            pattern: None,
            notes: None,
            durations: None,
            bend_notes: None,
            volume: default_volume(),
            automation: None,
            start_bar: 0,
            punch: default_punch(),
            tone: default_tone(),
            detune: default_detune(),
            voices: default_voices(),
            wobble_rate: default_wobble_rate(),
            bass_style: BassStyle::default(),
            reverse: false,
            start_freq: default_start_freq(),
            end_freq: default_end_freq(),
            sweep_curve: SweepCurve::default(),
            arp_pattern: default_arp_pattern(),
        }
    }

    pub fn with_pattern(mut self, velocities: &[f64]) -> Self {
        self.pattern = Some(velocities.iter().map(|&v| Step::Velocity(v)).collect());
        self
    }

    pub fn with_notes(mut self, notes: &[&str], durations: &[f64]) -> Self {
        self.notes = Some(notes.iter().map(|n| n.to_string()).collect());
        self.durations = Some(durations.to_vec());
        self
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = volume;
        self
    }

    /// Pattern velocities, if this track has a pattern.
    pub fn velocities(&self) -> Option<Vec<f64>> {
        self.pattern
            .as_ref()
            .map(|steps| steps.iter().map(|s| s.velocity()).collect())
    }
}

/// Parse a song document from JSON text.
pub fn parse_config(json: &str) -> Result<SongConfig> {
    Ok(serde_json::from_str(json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EdmError;

    #[test]
    fn minimal_document_gets_defaults() {
        let song = parse_config(
            r#"{
                "tempo": 128,
                "sections": [
                    { "name": "intro", "bars": 4, "tracks": [
                        { "type": "kick", "pattern": [1, 0, 0.5, false] }
                    ] }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(song.sample_rate, 44100);
        assert_eq!(song.beats_per_bar, 4);
        assert!(!song.sidechain);
        assert_eq!(song.sidechain_style, SidechainStyle::Pump);
        assert_eq!(song.sidechain_strength, 0.7);

        let track = &song.sections[0].tracks[0];
        assert_eq!(track.kind, InstrumentKind::Kick);
        assert_eq!(track.volume, 1.0);
        assert_eq!(track.velocities().unwrap(), vec![1.0, 0.0, 0.5, 0.0]);
    }

    #[test]
    fn melodic_track_fields() {
        let song = parse_config(
            r#"{
                "tempo": 120, "sample_rate": 22050, "sidechain": true,
                "sidechain_style": "duck", "sidechain_strength": 0.5,
                "sections": [ { "bars": 2, "tracks": [
                    { "type": "pitch_bend_bass", "notes": ["A1"], "bend_notes": ["G1"],
                      "durations": [1], "bass_style": "reese", "automation": "swell",
                      "volume": 0.6, "start_bar": 1 }
                ] } ]
            }"#,
        )
        .unwrap();

        let track = &song.sections[0].tracks[0];
        assert_eq!(track.kind, InstrumentKind::PitchBendBass);
        assert_eq!(track.bass_style, BassStyle::Reese);
        assert_eq!(track.automation, Some(AutomationCurve::Swell));
        assert_eq!(track.start_bar, 1);
        assert_eq!(song.sections[0].name, "");
    }

    #[test]
    fn unknown_bass_style_falls_back_to_sine() {
        let style: BassStyle = serde_json::from_str("\"growl\"").unwrap();
        assert_eq!(style, BassStyle::Sine);
    }

    #[test]
    fn missing_required_fields_are_malformed() {
        for doc in [
            r#"{ "sections": [] }"#,
            r#"{ "tempo": 128 }"#,
            r#"{ "tempo": 128, "sections": [ { "name": "intro", "tracks": [] } ] }"#,
            r#"{ "tempo": "fast", "sections": [] }"#,
            r#"{ "tempo": 128, "sections": [ { "bars": 1, "tracks": [ { "type": "theremin" } ] } ] }"#,
        ] {
            let err = parse_config(doc).unwrap_err();
            assert!(matches!(err, EdmError::MalformedConfig(_)), "{doc}: got {err:?}");
        }
    }

    #[test]
    fn builder_helpers() {
        let track = Track::new(InstrumentKind::Melody)
            .with_notes(&["C4", "rest"], &[1.0, 1.0])
            .with_volume(0.5);
        assert_eq!(track.notes.as_ref().unwrap().len(), 2);
        assert_eq!(track.volume, 0.5);
        assert!(track.velocities().is_none());
    }
}
