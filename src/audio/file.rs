use anyhow::{Context, Result};
use hound::{SampleFormat, WavReader};
use std::path::Path;
use tracing::info;

/// A PCM16 WAV recording loaded into memory
pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    /// Interleaved samples
    pub samples: Vec<i16>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path)
            .context("Failed to open WAV file")?;

        let spec = reader.spec();
        if spec.sample_format != SampleFormat::Int || spec.bits_per_sample != 16 {
            anyhow::bail!(
                "Only PCM16 WAV files are supported, got {} bits ({:?})",
                spec.bits_per_sample,
                spec.sample_format
            );
        }

        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read audio samples")?;

        let duration_seconds = samples.len() as f64 /
            (spec.sample_rate as f64 * spec.channels as f64);

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }

    /// Mono PCM16LE bytes at `sample_rate`, ready to stream.
    ///
    /// Multi-channel files keep only the first channel. Files recorded at any
    /// other rate are rejected; the relay never resamples.
    pub fn pcm_bytes(&self, sample_rate: u32) -> Result<Vec<u8>> {
        if self.sample_rate != sample_rate {
            anyhow::bail!(
                "Expected {}Hz audio, got {}Hz in {}",
                sample_rate,
                self.sample_rate,
                self.path
            );
        }

        let channels = usize::from(self.channels.max(1));
        Ok(self
            .samples
            .iter()
            .step_by(channels)
            .flat_map(|s| s.to_le_bytes())
            .collect())
    }
}
