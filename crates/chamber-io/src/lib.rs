//! File I/O and offline rendering for chamber.
//!
//! - **WAV file I/O**: [`read_mono`] folds any file to one channel,
//!   [`write_mono`] saves one
//! - **Offline rendering**: [`render`] runs a buffer (plus a silent tail)
//!   through any [`Effect`](chamber_core::Effect) in blocks
//! - **Level statistics**: [`SignalStats`] for RMS and peak reporting
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use chamber_effects::{Room, RoomSettings};
//! use chamber_io::{BitDepth, read_mono, render, write_mono};
//!
//! let dry = read_mono("dry.wav")?;
//! let settings = RoomSettings { sample_rate: dry.sample_rate as f32, ..Default::default() };
//! let (mut room, _controller) = Room::new(settings)?;
//!
//! let wet = render(&mut room, &dry.samples, dry.sample_rate as usize * 2, 512, |_| {});
//! write_mono("wet.wav", &wet, dry.sample_rate, BitDepth::Int24)?;
//! ```

mod render;
mod wav;

pub use render::{SignalStats, render};
pub use wav::{BitDepth, MonoClip, read_mono, write_mono};

/// Error types for audio file operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WAV file read/write error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// The requested bit depth is not supported for writing.
    #[error("Unsupported bit depth: {0} (expected 16, 24 or 32)")]
    UnsupportedBitDepth(u16),
}

/// Convenience result type for audio file operations.
pub type Result<T> = std::result::Result<T, Error>;
