//! Pre-render checks on a parsed song.
//!
//! Errors are problems that would make the render fail or sound broken.
//! Warnings flag things that render fine but are probably not intended.

use serde::Serialize;

use crate::config::{SongConfig, Track};
use crate::dsp::automation::AutomationCurve;
use crate::dsp::sidechain::SidechainStyle;
use crate::instruments::{Family, InstrumentKind};
use crate::note::Note;

/// Tempos outside this range get a warning.
const USUAL_TEMPO: std::ops::RangeInclusive<f64> = 60.0..=200.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, message: String) {
        self.errors.push(message);
    }

    fn warn(&mut self, message: String) {
        self.warnings.push(message);
    }
}

/// Check a song for errors and likely mistakes.
pub fn validate(song: &SongConfig) -> ValidationReport {
    let mut report = ValidationReport::default();

    if !(song.tempo.is_finite() && song.tempo > 0.0) {
        report.error(format!("Invalid tempo {}: must be positive", song.tempo));
    } else if !USUAL_TEMPO.contains(&song.tempo) {
        report.warn(format!("Unusual tempo {} BPM (expected 60-200)", song.tempo));
    }
    if song.sample_rate == 0 {
        report.error("Invalid sample_rate 0".to_string());
    }
    if song.beats_per_bar == 0 {
        report.error("Invalid beats_per_bar 0".to_string());
    }
    if song.sidechain_style == SidechainStyle::Unknown {
        report.warn("Unknown sidechain_style; falling back to 'subtle'".to_string());
    }
    if !(0.0..=1.0).contains(&song.sidechain_strength) {
        report.error(format!(
            "Invalid sidechain_strength {}: must be between 0 and 1",
            song.sidechain_strength
        ));
    }

    if song.sections.is_empty() {
        report.error("No sections defined".to_string());
    }

    let samples_per_beat = 60.0 / song.tempo * song.sample_rate as f64;

    for section in &song.sections {
        let name = &section.name;
        if section.bars == 0 {
            report.error(format!("Section '{name}': 'bars' must be at least 1"));
        }
        if section.tracks.is_empty() {
            report.warn(format!("Section '{name}': no tracks defined"));
        }
        let section_beats = section.bars as f64 * song.beats_per_bar as f64;

        for (index, track) in section.tracks.iter().enumerate() {
            let label = format!("Section '{name}', track {} ({})", index + 1, track.kind);
            validate_track(&mut report, &label, track, section.bars, section_beats, samples_per_beat);
        }
    }

    report
}

fn validate_track(
    report: &mut ValidationReport,
    label: &str,
    track: &Track,
    bars: u32,
    section_beats: f64,
    samples_per_beat: f64,
) {
    if !(0.0..=1.0).contains(&track.volume) {
        report.error(format!("{label}: invalid volume {} (must be between 0 and 1)", track.volume));
    }
    if bars > 0 && track.start_bar >= bars {
        report.error(format!(
            "{label}: start_bar {} is beyond the section's {bars} bars",
            track.start_bar
        ));
    }
    if track.automation == Some(AutomationCurve::Unknown) {
        report.warn(format!("{label}: unknown automation curve; it will be ignored"));
    }

    match track.kind.family() {
        Family::Percussive => validate_pattern(report, label, track, section_beats),
        Family::Melodic => validate_notes(report, label, track, section_beats, samples_per_beat),
        Family::Fx => {}
    }
}

fn validate_pattern(report: &mut ValidationReport, label: &str, track: &Track, section_beats: f64) {
    let Some(velocities) = track.velocities().filter(|v| !v.is_empty()) else {
        report.error(format!("{label}: percussion needs a non-empty 'pattern'"));
        return;
    };
    for velocity in velocities.iter().filter(|v| !(0.0..=1.0).contains(*v)) {
        report.error(format!(
            "{label}: velocity value {velocity} out of range (must be between 0 and 1)"
        ));
    }
    if section_beats > 0.0 && section_beats % velocities.len() as f64 != 0.0 {
        report.warn(format!(
            "{label}: pattern of {} steps doesn't divide evenly into {section_beats} beats",
            velocities.len()
        ));
    }
}

fn validate_notes(
    report: &mut ValidationReport,
    label: &str,
    track: &Track,
    section_beats: f64,
    samples_per_beat: f64,
) {
    let notes = track.notes.as_deref().unwrap_or_default();
    let durations = track.durations.as_deref().unwrap_or_default();
    if notes.is_empty() {
        report.error(format!("{label}: melodic track needs 'notes'"));
    }
    if durations.is_empty() {
        report.error(format!("{label}: melodic track needs 'durations'"));
    }
    if !notes.is_empty() && !durations.is_empty() && notes.len() != durations.len() {
        report.error(format!(
            "{label}: notes ({}) and durations ({}) arrays don't match",
            notes.len(),
            durations.len()
        ));
    }

    for note in notes.iter().chain(track.bend_notes.iter().flatten()) {
        if note.parse::<Note>().is_err() {
            report.error(format!("{label}: invalid note '{note}'"));
        }
    }

    if let Some(bends) = &track.bend_notes {
        if track.kind == InstrumentKind::PitchBendBass && bends.len() != notes.len() {
            report.error(format!(
                "{label}: bend_notes ({}) must match notes ({})",
                bends.len(),
                notes.len()
            ));
        }
    }

    if durations.iter().any(|d| !(d.is_finite() && *d > 0.0)) {
        report.error(format!("{label}: durations must be positive"));
        return;
    }
    let usable_rate = samples_per_beat.is_finite() && samples_per_beat > 0.0;
    if usable_rate && durations.iter().any(|d| d * samples_per_beat < 1.0) {
        report.error(format!("{label}: durations must be at least one sample long"));
    }
    let total: f64 = durations.iter().sum();
    if total > section_beats && section_beats > 0.0 {
        report.error(format!(
            "{label}: total duration {total} beats exceeds section length of {section_beats} beats"
        ));
    } else if total > 0.0 && total < section_beats / 2.0 {
        report.warn(format!(
            "{label}: total duration {total} beats is much shorter than section ({section_beats} beats); notes will loop"
        ));
    }
}
