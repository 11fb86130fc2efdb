//! Chamber Core - DSP primitives for the chamber reverb engine
//!
//! The pieces here are shared by every stage in `chamber-effects`:
//!
//! ## Filters
//!
//! - [`FilterDesigner`] - One cookbook biquad design serving many independent
//!   voices, each addressed by a [`VoiceHandle`]
//! - [`Coefficients`] / [`VoiceState`] - The pure `(coefficients, state, x)`
//!   transfer function underneath it
//!
//! ## Buffers and randomness
//!
//! - [`SampleRing`] - Fixed-capacity circular buffer with integer tap reads
//! - [`Lcg`] - Seedable generator for tap placement and jitter
//!
//! ## Hosting
//!
//! - [`Effect`] - Object-safe mono processing trait
//!
//! # no_std Support
//!
//! Disable the default `std` feature to build for embedded targets; the
//! crate still needs `alloc` for voice arenas and delay buffers.
//!
//! ```toml
//! [dependencies]
//! chamber-core = { version = "0.1", default-features = false }
//! ```
//!
//! # Design Principles
//!
//! - **Real-time safe**: Allocation happens in constructors and `register`,
//!   never in `process`
//! - **Checked voices**: processing an unregistered voice is an error, not a
//!   silent zero
//! - **Eager design**: coefficients are recomputed by setters, never per sample

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod designer;
pub mod effect;
pub mod error;
pub mod math;
pub mod ring;
pub mod rng;

pub use designer::{
    Coefficients, FilterDesigner, FilterSpec, MAX_VOICE_SLOTS, ResponseType, UNITY_GAIN,
    VoiceHandle, VoiceState, gain_from_db,
};
pub use effect::Effect;
pub use error::FilterError;
pub use math::{equal_power, flush_denormal, slew_toward};
pub use ring::SampleRing;
pub use rng::{DEFAULT_SEED, Lcg};
