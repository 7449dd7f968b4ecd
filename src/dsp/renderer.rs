//! WAV renderer: quantizes a rendered mix and writes it as 16-bit mono PCM.

use std::io::Cursor;
use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::error::Result;

/// A finished mono render.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedAudio {
    /// Samples in [-1, 1] after normalization.
    pub samples: Vec<f64>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl RenderedAudio {
    pub fn new(samples: Vec<f64>, sample_rate: u32) -> Self {
        RenderedAudio {
            samples,
            sample_rate,
            channels: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Length in seconds.
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// `round(x × 32767)`, clamped to the i16 range.
    pub fn to_pcm_i16(&self) -> Vec<i16> {
        self.samples
            .iter()
            .map(|&s| (s * 32767.0).round().clamp(-32768.0, 32767.0) as i16)
            .collect()
    }

    /// Samples narrowed to `f32` for audio APIs.
    pub fn to_f32(&self) -> Vec<f32> {
        self.samples.iter().map(|&s| s as f32).collect()
    }

    fn spec(&self) -> WavSpec {
        WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        }
    }

    /// Encode as an in-memory WAV file.
    pub fn to_wav_bytes(&self) -> Result<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::with_capacity(44 + self.samples.len() * 2));
        {
            let mut writer = WavWriter::new(&mut cursor, self.spec())?;
            for sample in self.to_pcm_i16() {
                writer.write_sample(sample)?;
            }
            writer.finalize()?;
        }
        Ok(cursor.into_inner())
    }

    /// Write a WAV file to `path`.
    pub fn write_wav(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = WavWriter::create(path.as_ref(), self.spec())?;
        for sample in self.to_pcm_i16() {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
        tracing::debug!(path = %path.as_ref().display(), samples = self.samples.len(), "wrote WAV");
        Ok(())
    }
}
