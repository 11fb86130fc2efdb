//! Chamber Effects - Room reverb stages built on chamber-core
//!
//! - [`EarlyReflections`] - Six geometric wall echoes with crossfaded resizing
//! - [`VelvetTail`] - Swept multi-rotation velvet-noise diffusion
//! - [`ReverbUnit`] - Velvet tail in a filtered, rate-limited feedback loop
//! - [`Room`] - Both stages on one material, steered over a channel (`std`)
//!
//! Every stage that filters borrows the shared
//! [`FilterDesigner`](chamber_core::FilterDesigner) per call and owns one voice
//! of it. Hand the voice back with `release` when tearing a stage down.
//!
//! ## Example
//!
//! ```rust
//! use chamber_core::{FilterDesigner, ResponseType};
//! use chamber_effects::{EarlyReflections, ReverbUnit};
//!
//! let mut plaster = FilterDesigner::design(ResponseType::HighShelf, 48000.0, 5000.0, 2.5, 1.0)?;
//! let mut early = EarlyReflections::new(48000.0, 40.0, 25.0, 14.0, 0.3, &mut plaster);
//! let mut late = ReverbUnit::new(48000.0, early.reverb_window(), 2000.0, 0.9, &mut plaster);
//! late.set_resonance(&early.delays());
//!
//! for n in 0..1024 {
//!     let x = if n == 0 { 1.0 } else { 0.0 };
//!     let e = early.process(x, &mut plaster)?;
//!     late.set_window(early.reverb_window());
//!     let _y = e + 0.5 * late.process(e, &mut plaster)?;
//! }
//!
//! early.release(&mut plaster);
//! late.release(&mut plaster);
//! assert_eq!(plaster.voice_count(), 0);
//! # Ok::<(), chamber_core::FilterError>(())
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod early;
pub mod late;
#[cfg(feature = "std")]
pub mod room;
pub mod velvet;

/// Speed of sound in air, feet per second.
pub const SPEED_OF_SOUND: f32 = 1125.33;

pub use early::{EarlyReflections, MAX_ROOM_FEET, TapSet};
pub use late::{FEEDBACK_CEILING, REVERBERANCE_SLEW_PER_SECOND, ROTATIONS, ReverbUnit};
#[cfg(feature = "std")]
pub use room::{Material, Room, RoomCommand, RoomController, RoomSettings};
pub use velvet::{RESONANCE_FACTOR, VelvetTail, VelvetTap};
