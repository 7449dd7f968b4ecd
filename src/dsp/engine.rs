//! Audio Engine: renders a [`SongConfig`] to a mono sample buffer.
//!
//! Sections are laid end to end. Inside a section every track is rendered
//! into its own buffer (percussion from its step pattern, melodic parts from
//! their cycling note lists, effects as one event), automated, scaled by its
//! volume and added to the mixer. Kicks go to the reference bus and key the
//! sidechain; everything else is ducked. The summed mix is normalized last.

use tracing::{debug, info, warn};

use crate::config::{Section, SongConfig, Track};
use crate::error::{EdmError, Result};
use crate::instruments::{self, Family, InstrumentKind, InstrumentParams, NoteEvent, Pitch};
use crate::note::{Note, note_to_freq};

use super::automation::apply_automation;
use super::mixer::{Bus, Mixer, normalize};
use super::oscillator::Noise;
use super::renderer::RenderedAudio;
use super::sidechain::Sidechain;

/// Drum hits last half a beat.
const HIT_BEATS: f64 = 0.5;
/// Impacts last two beats.
const IMPACT_BEATS: f64 = 2.0;

/// Timing and seeding shared by every stage of one render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderContext {
    pub tempo: f64,
    pub sample_rate: f64,
    pub beats_per_bar: u32,
    pub seed: u64,
}

impl RenderContext {
    pub fn from_config(song: &SongConfig) -> Result<Self> {
        if !(song.tempo.is_finite() && song.tempo > 0.0) {
            return Err(EdmError::invalid_parameter("tempo", song.tempo, "must be positive"));
        }
        if song.sample_rate == 0 {
            return Err(EdmError::invalid_parameter("sample_rate", 0.0, "must be positive"));
        }
        if song.beats_per_bar == 0 {
            return Err(EdmError::invalid_parameter("beats_per_bar", 0.0, "must be positive"));
        }
        Ok(RenderContext {
            tempo: song.tempo,
            sample_rate: song.sample_rate as f64,
            beats_per_bar: song.beats_per_bar,
            seed: song.seed,
        })
    }

    /// Seconds per beat.
    pub fn beat_duration(&self) -> f64 {
        60.0 / self.tempo
    }

    pub fn samples_per_beat(&self) -> f64 {
        self.beat_duration() * self.sample_rate
    }

    /// Sample offset of a position in beats.
    pub fn beats_to_samples(&self, beats: f64) -> usize {
        (beats * self.samples_per_beat()).round().max(0.0) as usize
    }

    pub fn bars_to_samples(&self, bars: u32) -> usize {
        self.beats_to_samples(bars as f64 * self.beats_per_bar as f64)
    }

    /// Noise seed for one track, stable across renders.
    pub fn track_seed(&self, section: usize, track: usize) -> u64 {
        let slot = ((section as u64) << 32) | track as u64;
        self.seed ^ slot.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
    }

    /// Seconds for `len` samples; generators turn this back into exactly `len`.
    fn seconds(&self, len: usize) -> f64 {
        len as f64 / self.sample_rate
    }
}

/// One rendered track, relative to its own start.
struct TrackRender {
    samples: Vec<f64>,
    /// Offsets of sidechain key hits.
    hits: Vec<usize>,
}

/// The audio rendering engine.
pub struct AudioEngine<'a> {
    song: &'a SongConfig,
    ctx: RenderContext,
}

impl<'a> AudioEngine<'a> {
    pub fn new(song: &'a SongConfig) -> Result<Self> {
        Ok(AudioEngine {
            song,
            ctx: RenderContext::from_config(song)?,
        })
    }

    pub fn context(&self) -> &RenderContext {
        &self.ctx
    }

    /// Total composition length in samples.
    pub fn total_samples(&self) -> usize {
        self.song.sections.iter().map(|s| self.ctx.bars_to_samples(s.bars)).sum()
    }

    /// Render the whole song.
    pub fn render(&self) -> Result<RenderedAudio> {
        let mut mixer = Mixer::new(self.total_samples());

        let mut section_start = 0;
        for (section_index, section) in self.song.sections.iter().enumerate() {
            let section_len = self.ctx.bars_to_samples(section.bars);
            debug!(
                section = %section.name,
                bars = section.bars,
                tracks = section.tracks.len(),
                offset = section_start,
                "rendering section"
            );
            self.render_section(&mut mixer, section_index, section, section_start, section_len)?;
            section_start += section_len;
        }

        if self.song.sidechain && !mixer.hits().is_empty() {
            let sidechain = Sidechain::new(
                self.song.sidechain_style,
                self.song.sidechain_strength,
                self.ctx.beat_duration(),
                self.ctx.sample_rate,
            );
            debug!(hits = mixer.hits().len(), style = ?self.song.sidechain_style, "applying sidechain");
            mixer.apply_sidechain(&sidechain);
        }

        let mut samples = mixer.mixdown();
        if let Some(&bad) = samples.iter().find(|s| !s.is_finite()) {
            return Err(EdmError::invalid_parameter("mix level", bad, "track levels overflowed the mix"));
        }
        normalize(&mut samples);

        let audio = RenderedAudio::new(samples, self.song.sample_rate);
        info!(
            samples = audio.len(),
            seconds = audio.duration(),
            sections = self.song.sections.len(),
            "render complete"
        );
        Ok(audio)
    }

    fn render_section(
        &self,
        mixer: &mut Mixer,
        section_index: usize,
        section: &Section,
        section_start: usize,
        section_len: usize,
    ) -> Result<()> {
        for (track_index, track) in section.tracks.iter().enumerate() {
            let track_offset = self.ctx.bars_to_samples(track.start_bar);
            if track_offset >= section_len {
                warn!(
                    section = %section.name,
                    track = %track.kind,
                    start_bar = track.start_bar,
                    "track starts after the end of its section; skipped"
                );
                continue;
            }
            if !track.volume.is_finite() {
                return Err(EdmError::invalid_parameter("volume", track.volume, "must be finite"));
            }
            let track_len = section_len - track_offset;
            let mut noise = Noise::new(self.ctx.track_seed(section_index, track_index));

            debug!(track = %track.kind, samples = track_len, "rendering track");
            let TrackRender { mut samples, hits } = self.render_track(track, track_len, &mut noise)?;

            if let Some(curve) = track.automation {
                apply_automation(&mut samples, curve, self.ctx.sample_rate);
            }

            let start = section_start + track_offset;
            let bus = if track.kind.is_sidechain_key() { Bus::Reference } else { Bus::Ducked };
            mixer.place(bus, start, &samples, track.volume);
            for hit in hits {
                mixer.mark_hit(start + hit);
            }
        }
        Ok(())
    }

    fn render_track(&self, track: &Track, len: usize, noise: &mut Noise) -> Result<TrackRender> {
        let params = InstrumentParams::from(track);
        match track.kind.family() {
            Family::Percussive => self.render_pattern(track, &params, len, noise),
            Family::Melodic => self.render_notes(track, &params, len, noise).map(|samples| TrackRender {
                samples,
                hits: Vec::new(),
            }),
            Family::Fx => {
                let event_len = match track.kind {
                    InstrumentKind::Impact => self.ctx.beats_to_samples(IMPACT_BEATS).min(len),
                    _ => len,
                };
                let wave = self.generate(track.kind, NoteEvent::hit(self.ctx.seconds(event_len)), &params, noise)?;
                let mut samples = vec![0.0; len];
                samples[..wave.len()].copy_from_slice(&wave);
                Ok(TrackRender {
                    samples,
                    hits: Vec::new(),
                })
            }
        }
    }

    fn generate(
        &self,
        kind: InstrumentKind,
        event: NoteEvent,
        params: &InstrumentParams,
        noise: &mut Noise,
    ) -> Result<Vec<f64>> {
        instruments::generate(kind, &event, params, self.ctx.sample_rate, noise)
    }

    /// One step per beat; the pattern index wraps.
    fn render_pattern(
        &self,
        track: &Track,
        params: &InstrumentParams,
        len: usize,
        noise: &mut Noise,
    ) -> Result<TrackRender> {
        let velocities = match track.velocities() {
            Some(v) if !v.is_empty() => v,
            _ => {
                return Err(EdmError::MalformedConfig(format!(
                    "{} track needs a non-empty pattern",
                    track.kind
                )));
            }
        };

        if let Some(&bad) = velocities.iter().find(|v| !v.is_finite()) {
            return Err(EdmError::invalid_parameter("velocity", bad, "must be finite"));
        }

        let hit_len = self.ctx.beats_to_samples(HIT_BEATS);
        let mut samples = vec![0.0; len];
        let mut hits = Vec::new();

        for step in 0.. {
            let offset = self.ctx.beats_to_samples(step as f64);
            if offset >= len {
                break;
            }
            let velocity = velocities[step % velocities.len()];
            if velocity <= 0.0 {
                continue;
            }
            let wave = self.generate(track.kind, NoteEvent::hit(self.ctx.seconds(hit_len)), params, noise)?;
            let end = (offset + wave.len()).min(len);
            for (out, s) in samples[offset..end].iter_mut().zip(&wave) {
                *out += s * velocity;
            }
            if track.kind.is_sidechain_key() {
                hits.push(offset);
            }
        }

        Ok(TrackRender { samples, hits })
    }

    /// Notes and durations cycle until the track is full; the last note is cut
    /// at the end.
    fn render_notes(&self, track: &Track, params: &InstrumentParams, len: usize, noise: &mut Noise) -> Result<Vec<f64>> {
        let (notes, durations) = match (&track.notes, &track.durations) {
            (Some(n), Some(d)) if !n.is_empty() && !d.is_empty() => (n, d),
            _ => {
                return Err(EdmError::MalformedConfig(format!(
                    "{} track needs non-empty notes and durations",
                    track.kind
                )));
            }
        };
        if let Some(&bad) = durations.iter().find(|d| !(d.is_finite() && **d > 0.0)) {
            return Err(EdmError::MalformedConfig(format!(
                "{} track has a non-positive duration ({bad})",
                track.kind
            )));
        }
        // Every note must move the cursor by at least one sample.
        if let Some(&short) = durations.iter().find(|d| **d * self.ctx.samples_per_beat() < 1.0) {
            return Err(EdmError::MalformedConfig(format!(
                "{} track has a duration shorter than one sample ({short} beats)",
                track.kind
            )));
        }

        let pitches = parse_notes(notes)?;
        let targets = match (&track.bend_notes, track.kind) {
            (Some(bends), InstrumentKind::PitchBendBass) if !bends.is_empty() => Some(parse_notes(bends)?),
            _ => None,
        };

        let mut samples = vec![0.0; len];
        let mut beat = 0.0;
        for i in 0.. {
            let start = self.ctx.beats_to_samples(beat);
            if start >= len {
                break;
            }
            beat += durations[i % durations.len()];
            let note_len = self.ctx.beats_to_samples(beat) - start;

            let from = pitches[i % pitches.len()];
            let pitch = match &targets {
                Some(targets) => Pitch::Bend(from, targets[i % targets.len()]),
                None if track.kind == InstrumentKind::PitchBendBass => Pitch::Bend(from, from),
                None => Pitch::Note(from),
            };
            if pitch.is_rest() || note_len == 0 {
                continue;
            }

            let event = NoteEvent {
                pitch,
                duration: self.ctx.seconds(note_len),
            };
            let wave = self.generate(track.kind, event, params, noise)?;
            let end = (start + wave.len()).min(len);
            for (out, s) in samples[start..end].iter_mut().zip(&wave) {
                *out += s;
            }
        }
        Ok(samples)
    }
}

/// Parse note names to frequencies, stopping at the first bad one.
fn parse_notes(names: &[String]) -> Result<Vec<f64>> {
    names
        .iter()
        .map(|name| name.parse::<Note>().map(|note| note_to_freq(&note)))
        .collect()
}

/// Render a song to a normalized mono buffer.
pub fn render(song: &SongConfig) -> Result<RenderedAudio> {
    AudioEngine::new(song)?.render()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BassStyle;
    use crate::dsp::automation::AutomationCurve;
    use crate::dsp::sidechain::SidechainStyle;

    fn song(tempo: f64, sections: Vec<Section>) -> SongConfig {
        SongConfig {
            tempo,
            sample_rate: 44100,
            beats_per_bar: 4,
            sidechain: false,
            sidechain_style: SidechainStyle::Pump,
            sidechain_strength: 0.7,
            seed: 42,
            sections,
        }
    }

    fn section(bars: u32, tracks: Vec<Track>) -> Section {
        Section {
            name: "test".to_string(),
            bars,
            tracks,
        }
    }

    fn peak(wave: &[f64]) -> f64 {
        wave.iter().fold(0.0_f64, |m, s| m.max(s.abs()))
    }

    #[test]
    fn context_arithmetic() {
        let ctx = RenderContext::from_config(&song(120.0, vec![])).unwrap();
        assert_eq!(ctx.beat_duration(), 0.5);
        assert_eq!(ctx.samples_per_beat(), 22050.0);
        assert_eq!(ctx.bars_to_samples(4), 352_800);
        assert_ne!(ctx.track_seed(0, 1), ctx.track_seed(1, 0));
        assert_eq!(ctx.track_seed(2, 3), ctx.track_seed(2, 3));
    }

    #[test]
    fn bad_globals_are_rejected() {
        for bad in [0.0, -10.0, f64::NAN] {
            let err = RenderContext::from_config(&song(bad, vec![])).unwrap_err();
            assert!(matches!(err, EdmError::InvalidParameter { name: "tempo", .. }));
        }
        let mut s = song(120.0, vec![]);
        s.sample_rate = 0;
        assert!(render(&s).is_err());
    }

    #[test]
    fn kick_on_the_downbeat_only() {
        // 4 bars at 120 BPM with a kick on beat one of every bar.
        let kick = Track::new(InstrumentKind::Kick).with_pattern(&[1.0, 0.0, 0.0, 0.0]);
        let audio = render(&song(120.0, vec![section(4, vec![kick])])).unwrap();
        assert_eq!(audio.len(), 352_800);
        assert_eq!(audio.sample_rate, 44100);

        let bar = 88_200;
        let beat = 22_050;
        for b in 0..4 {
            let start = b * bar;
            assert!(peak(&audio.samples[start..start + beat]) > 0.1, "bar {b} has no kick");
            assert!(
                audio.samples[start + beat..start + bar].iter().all(|&s| s == 0.0),
                "bar {b} has sound after the first beat"
            );
        }
    }

    #[test]
    fn pattern_wraps_across_bars() {
        // Three-step pattern over one 4-beat bar: hits on beats 0 and 3.
        let hat = Track::new(InstrumentKind::Hihat).with_pattern(&[1.0, 0.0, 0.0]);
        let audio = render(&song(120.0, vec![section(1, vec![hat])])).unwrap();
        let beat = 22_050;
        assert!(peak(&audio.samples[..beat]) > 0.0);
        assert!(audio.samples[beat..3 * beat].iter().all(|&s| s == 0.0));
        assert!(peak(&audio.samples[3 * beat..]) > 0.0);
    }

    #[test]
    fn pitch_bend_glides_down() {
        let mut bass = Track::new(InstrumentKind::PitchBendBass).with_notes(&["A1"], &[1.0]);
        bass.bend_notes = Some(vec!["G1".to_string()]);
        bass.bass_style = BassStyle::Sine;
        let audio = render(&song(120.0, vec![section(1, vec![bass])])).unwrap();

        let crossings: Vec<usize> = audio.samples[..22_050]
            .windows(2)
            .enumerate()
            .filter(|(_, w)| w[0] < 0.0 && w[1] >= 0.0)
            .map(|(i, _)| i)
            .collect();
        let periods: Vec<usize> = crossings.windows(2).map(|w| w[1] - w[0]).collect();
        assert!(periods.len() > 20);
        let early: usize = periods[1..6].iter().sum();
        let late: usize = periods[periods.len() - 6..periods.len() - 1].iter().sum();
        assert!(late > early, "early {early}, late {late}");
    }

    #[test]
    fn all_rest_track_is_silent() {
        let pad = Track::new(InstrumentKind::Pad).with_notes(&["rest", "rest"], &[1.0, 3.0]);
        let audio = render(&song(128.0, vec![section(2, vec![pad])])).unwrap();
        assert_eq!(audio.len(), (8.0 * 60.0 / 128.0 * 44100.0_f64).round() as usize);
        assert!(audio.samples.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn sections_are_concatenated() {
        let kick = Track::new(InstrumentKind::Kick).with_pattern(&[1.0]);
        let lead = Track::new(InstrumentKind::Melody).with_notes(&["C4"], &[4.0]);
        let audio = render(&song(120.0, vec![section(1, vec![]), section(1, vec![kick, lead])])).unwrap();
        assert_eq!(audio.len(), 2 * 88_200);
        assert!(audio.samples[..88_200].iter().all(|&s| s == 0.0));
        assert!(peak(&audio.samples[88_200..]) > 0.1);
    }

    #[test]
    fn start_bar_delays_a_track() {
        let mut lead = Track::new(InstrumentKind::Melody).with_notes(&["E4"], &[1.0]);
        lead.start_bar = 1;
        let audio = render(&song(120.0, vec![section(2, vec![lead])])).unwrap();
        assert!(audio.samples[..88_200].iter().all(|&s| s == 0.0));
        assert!(peak(&audio.samples[88_200..]) > 0.05);
    }

    #[test]
    fn sidechain_ducks_everything_but_the_kick() {
        let build = |sidechain: bool| {
            let kick = Track::new(InstrumentKind::Kick).with_pattern(&[1.0]).with_volume(0.3);
            let pad = Track::new(InstrumentKind::Pad).with_notes(&["A3"], &[4.0]);
            let mut s = song(120.0, vec![section(2, vec![kick, pad])]);
            s.sidechain = sidechain;
            s.sidechain_strength = 1.0;
            render(&s).unwrap()
        };
        let dry = build(false);
        let ducked = build(true);
        assert_eq!(dry.len(), ducked.len());

        // Mid-bar, just after the second beat's hit, the pad is pulled down.
        let window = 22_050 * 5 + 100..22_050 * 5 + 200;
        let kick_only = {
            let kick = Track::new(InstrumentKind::Kick).with_pattern(&[1.0]).with_volume(0.3);
            render(&song(120.0, vec![section(2, vec![kick])])).unwrap()
        };
        let pad_energy = |audio: &RenderedAudio| -> f64 {
            audio.samples[window.clone()]
                .iter()
                .zip(&kick_only.samples[window.clone()])
                .map(|(a, k)| (a - k).abs())
                .sum()
        };
        assert!(pad_energy(&ducked) < pad_energy(&dry) * 0.5);
    }

    #[test]
    fn automation_and_volume_shape_a_track() {
        let mut lead = Track::new(InstrumentKind::Pad).with_notes(&["C4"], &[8.0]).with_volume(0.5);
        lead.automation = Some(AutomationCurve::FadeIn);
        let audio = render(&song(120.0, vec![section(2, vec![lead])])).unwrap();
        let first = peak(&audio.samples[22_050..44_100]);
        let last = peak(&audio.samples[132_300..154_350]);
        assert!(last > first * 2.0, "first {first}, last {last}");
        assert!(peak(&audio.samples) <= 0.5 * 0.3 + 1e-9);
    }

    #[test]
    fn notes_cycle_and_truncate() {
        // Three beats of notes cycling through a 4-beat bar; the second
        // cycle's first note (3 beats) is cut at the bar line.
        let lead = Track::new(InstrumentKind::Melody).with_notes(&["C4", "rest"], &[3.0, 0.5]);
        let audio = render(&song(120.0, vec![section(1, vec![lead])])).unwrap();
        assert_eq!(audio.len(), 88_200);
        let rest = 66_150..77_175;
        assert!(audio.samples[rest].iter().all(|&s| s == 0.0));
        assert!(peak(&audio.samples[78_000..88_200]) > 0.05);
    }

    #[test]
    fn invalid_note_aborts_the_render() {
        let lead = Track::new(InstrumentKind::Melody).with_notes(&["C4", "H2"], &[1.0]);
        let err = render(&song(120.0, vec![section(1, vec![lead])])).unwrap_err();
        assert!(matches!(err, EdmError::InvalidNote(ref n) if n == "H2"), "got {err:?}");
    }

    #[test]
    fn shape_errors_are_malformed_config() {
        let cases = [
            Track::new(InstrumentKind::Snare),
            Track::new(InstrumentKind::Snare).with_pattern(&[]),
            Track::new(InstrumentKind::Bass),
            Track::new(InstrumentKind::Bass).with_notes(&["C2"], &[0.0]),
            Track::new(InstrumentKind::Bass).with_notes(&["C2"], &[]),
        ];
        for track in cases {
            let err = render(&song(120.0, vec![section(1, vec![track.clone()])])).unwrap_err();
            assert!(matches!(err, EdmError::MalformedConfig(_)), "{track:?}: {err:?}");
        }
    }

    #[test]
    fn out_of_range_octave_aborts_the_render() {
        for name in ["C999999999", "C-999999999"] {
            let lead = Track::new(InstrumentKind::Melody).with_notes(&[name], &[1.0]);
            let err = render(&song(120.0, vec![section(1, vec![lead])])).unwrap_err();
            assert!(matches!(err, EdmError::InvalidNote(ref n) if n == name), "got {err:?}");
        }
    }

    #[test]
    fn sub_sample_durations_are_rejected() {
        let lead = Track::new(InstrumentKind::Melody).with_notes(&["C4"], &[1e-12]);
        let err = render(&song(120.0, vec![section(1, vec![lead])])).unwrap_err();
        assert!(matches!(err, EdmError::MalformedConfig(ref m) if m.contains("one sample")), "got {err:?}");

        // A couple of samples per note is enough to make progress.
        let lead = Track::new(InstrumentKind::Melody).with_notes(&["C4"], &[2.0 / 22_050.0]);
        let audio = render(&song(120.0, vec![section(1, vec![lead])])).unwrap();
        assert_eq!(audio.len(), 88_200);
    }

    #[test]
    fn non_finite_levels_are_rejected() {
        let kick = Track::new(InstrumentKind::Kick).with_pattern(&[1.0]).with_volume(f64::INFINITY);
        let err = render(&song(120.0, vec![section(1, vec![kick])])).unwrap_err();
        assert!(matches!(err, EdmError::InvalidParameter { name: "volume", .. }), "got {err:?}");

        let hat = Track::new(InstrumentKind::Hihat).with_pattern(&[1.0, f64::NAN]);
        let err = render(&song(120.0, vec![section(1, vec![hat])])).unwrap_err();
        assert!(matches!(err, EdmError::InvalidParameter { name: "velocity", .. }), "got {err:?}");

        // Finite but huge levels overflow when summed.
        let tracks = (0..8)
            .map(|_| Track::new(InstrumentKind::SubBass).with_notes(&["C2"], &[4.0]).with_volume(f64::MAX))
            .collect();
        let err = render(&song(120.0, vec![section(1, tracks)])).unwrap_err();
        assert!(matches!(err, EdmError::InvalidParameter { name: "mix level", .. }), "got {err:?}");
    }

    #[test]
    fn fx_tracks_render() {
        let riser = Track::new(InstrumentKind::WhiteNoiseRiser);
        let impact = Track::new(InstrumentKind::Impact);
        let sweep = Track::new(InstrumentKind::Sweep);
        let audio = render(&song(120.0, vec![section(2, vec![riser, impact, sweep])])).unwrap();
        assert_eq!(audio.len(), 176_400);
        assert!(peak(&audio.samples) > 0.05);
        assert!(peak(&audio.samples) < 0.95);
    }

    #[test]
    fn loud_mixes_are_limited_and_renders_are_reproducible() {
        let tracks = vec![
            Track::new(InstrumentKind::Kick).with_pattern(&[1.0]),
            Track::new(InstrumentKind::Snare).with_pattern(&[0.0, 1.0]),
            Track::new(InstrumentKind::Supersaw).with_notes(&["C4", "E4", "G4"], &[1.0]),
            Track::new(InstrumentKind::ReeseBass).with_notes(&["C2"], &[2.0]),
            Track::new(InstrumentKind::SubBass).with_notes(&["C1"], &[4.0]),
        ];
        let s = song(128.0, vec![section(2, tracks)]);
        let a = render(&s).unwrap();
        let b = render(&s).unwrap();
        assert_eq!(a, b);
        assert!(peak(&a.samples) < 0.95);
    }
}
