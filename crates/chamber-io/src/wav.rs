//! Mono WAV files.
//!
//! The reverb runs on a single channel. Reading folds every channel of the
//! source into one by averaging each frame; writing always produces a
//! one-channel file.

use crate::{Error, Result};
use hound::{SampleFormat, WavReader, WavWriter};
use std::path::Path;

/// Sample encoding for written files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BitDepth {
    /// 16-bit integer PCM.
    Int16,
    /// 24-bit integer PCM.
    Int24,
    /// 32-bit IEEE float.
    #[default]
    Float32,
}

impl BitDepth {
    /// Bits per sample.
    pub fn bits(self) -> u16 {
        match self {
            BitDepth::Int16 => 16,
            BitDepth::Int24 => 24,
            BitDepth::Float32 => 32,
        }
    }

    fn hound_spec(self, sample_rate: u32) -> hound::WavSpec {
        hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: self.bits(),
            sample_format: match self {
                BitDepth::Float32 => SampleFormat::Float,
                BitDepth::Int16 | BitDepth::Int24 => SampleFormat::Int,
            },
        }
    }
}

impl TryFrom<u16> for BitDepth {
    type Error = Error;

    fn try_from(bits: u16) -> Result<Self> {
        match bits {
            16 => Ok(BitDepth::Int16),
            24 => Ok(BitDepth::Int24),
            32 => Ok(BitDepth::Float32),
            other => Err(Error::UnsupportedBitDepth(other)),
        }
    }
}

/// A file folded down to one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct MonoClip {
    /// One sample per source frame, in `[-1, 1]` for integer sources.
    pub samples: Vec<f32>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count of the file before folding.
    pub source_channels: u16,
    /// Bit depth of the file.
    pub source_bits: u16,
}

impl MonoClip {
    /// Length in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / f64::from(self.sample_rate)
    }
}

/// Read a WAV file as a mono clip.
///
/// A trailing partial frame is dropped.
pub fn read_mono<P: AsRef<Path>>(path: P) -> Result<MonoClip> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let channels = usize::from(spec.channels.max(1));

    let samples = match spec.sample_format {
        SampleFormat::Float => fold_frames(reader.into_samples::<f32>(), channels)?,
        SampleFormat::Int => {
            let scale = 1.0 / (1u64 << (spec.bits_per_sample - 1)) as f32;
            fold_frames(
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 * scale)),
                channels,
            )?
        }
    };

    tracing::debug!(
        frames = samples.len(),
        channels,
        sample_rate = spec.sample_rate,
        "wav folded to mono"
    );
    Ok(MonoClip {
        samples,
        sample_rate: spec.sample_rate,
        source_channels: spec.channels,
        source_bits: spec.bits_per_sample,
    })
}

fn fold_frames<I>(samples: I, channels: usize) -> Result<Vec<f32>>
where
    I: Iterator<Item = hound::Result<f32>>,
{
    let norm = 1.0 / channels as f32;
    let mut mono = Vec::with_capacity(samples.size_hint().0 / channels);
    let mut frame = 0.0;
    let mut filled = 0;
    for sample in samples {
        frame += sample?;
        filled += 1;
        if filled == channels {
            mono.push(frame * norm);
            frame = 0.0;
            filled = 0;
        }
    }
    Ok(mono)
}

/// Write a mono WAV file. Integer depths clip at full scale.
pub fn write_mono<P: AsRef<Path>>(
    path: P,
    samples: &[f32],
    sample_rate: u32,
    depth: BitDepth,
) -> Result<()> {
    let mut writer = WavWriter::create(path, depth.hound_spec(sample_rate))?;

    match depth {
        BitDepth::Float32 => {
            for &sample in samples {
                writer.write_sample(sample)?;
            }
        }
        BitDepth::Int16 | BitDepth::Int24 => {
            let full_scale = (1i32 << (depth.bits() - 1)) as f32;
            for &sample in samples {
                let code = (sample * full_scale).clamp(-full_scale, full_scale - 1.0);
                writer.write_sample(code as i32)?;
            }
        }
    }

    writer.finalize()?;
    Ok(())
}
