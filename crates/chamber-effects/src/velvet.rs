//! Velvet-noise diffuse tail.
//!
//! A velvet sequence places one ±1 impulse at a random position inside each
//! fixed-width bin. Convolving with it is cheap (one tap per bin, no
//! multiplies beyond the per-tap gain) and sounds like dense, colourless
//! diffusion.
//!
//! A single static sequence rings metallically, so the tail precomputes
//! several *rotations* (independent sequences) and sweeps a phase `theta`
//! across them, equal-power crossfading between neighbours. Only taps inside
//! the current delay window contribute, which lets the early-reflection stage
//! steer the tail with room size.
//!
//! On top of the random taps sits a short list of *guaranteed* taps: fixed
//! delays derived from room geometry that give the space its resonant modes.
//!
//! # Example
//!
//! ```rust
//! use chamber_effects::VelvetTail;
//!
//! let mut tail = VelvetTail::new(48000, 4, [400.0, 4000.0], 48, 48000.0);
//! tail.set_resonances(&[427, 854]);
//!
//! let mut energy = 0.0;
//! for n in 0..8000 {
//!     let x = if n == 0 { 1.0 } else { 0.0 };
//!     energy += tail.process(x).abs();
//! }
//! assert!(energy > 0.0);
//! ```

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::vec::Vec;

use chamber_core::{DEFAULT_SEED, Lcg, SampleRing, equal_power};
use libm::powf;

use crate::SPEED_OF_SOUND;

/// Distance, in feet, at which a tap is attenuated by half.
const REFERENCE_DISTANCE_FT: f32 = 300.0;

/// Scale applied to the sum of guaranteed taps.
pub const RESONANCE_FACTOR: f32 = 0.1;

/// One impulse of a rotation. `gain` carries the polarity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VelvetTap {
    /// Delay in samples.
    pub offset: usize,
    /// Signed amplitude.
    pub gain: f32,
}

/// Swept multi-rotation velvet-noise convolver.
#[derive(Debug, Clone)]
pub struct VelvetTail {
    ring: SampleRing,
    /// Each rotation is sorted ascending by offset.
    rotations: Vec<Vec<VelvetTap>>,
    /// Guaranteed taps as `(offset, weight)`, `RESONANCE_FACTOR` folded in.
    resonances: Vec<(usize, f32)>,
    theta: f32,
    window: [f32; 2],
    ref_offset: f32,
    sample_rate: f32,
}

impl VelvetTail {
    /// Build a tail with the default seed.
    ///
    /// # Arguments
    ///
    /// * `capacity` - History length in samples; taps beyond it are dropped
    /// * `rotation_count` - Number of independent tap patterns
    /// * `window` - `[min_delay, max_delay]` in samples
    /// * `bin_length` - Samples per velvet bin (one tap per bin)
    /// * `sample_rate` - Sample rate in Hz; one second of bins is generated
    ///
    /// # Panics
    ///
    /// Panics if `capacity`, `rotation_count` or `bin_length` is 0.
    pub fn new(
        capacity: usize,
        rotation_count: usize,
        window: [f32; 2],
        bin_length: usize,
        sample_rate: f32,
    ) -> Self {
        Self::with_seed(
            capacity,
            rotation_count,
            window,
            bin_length,
            sample_rate,
            DEFAULT_SEED,
        )
    }

    /// Build a tail whose rotations are drawn from `seed`.
    pub fn with_seed(
        capacity: usize,
        rotation_count: usize,
        window: [f32; 2],
        bin_length: usize,
        sample_rate: f32,
        seed: u32,
    ) -> Self {
        assert!(rotation_count > 0, "VelvetTail needs at least one rotation");
        assert!(bin_length > 0, "VelvetTail bin length must be > 0");

        let ring = SampleRing::new(capacity);
        let ref_offset = REFERENCE_DISTANCE_FT / SPEED_OF_SOUND * sample_rate;
        let rotations = build_rotations(
            &mut Lcg::new(seed),
            rotation_count,
            bin_length,
            sample_rate,
            ref_offset,
            ring.max_offset(),
        );

        #[cfg(feature = "tracing")]
        tracing::debug!(
            rotation_count,
            bin_length,
            taps_per_rotation = rotations.first().map_or(0, Vec::len),
            "velvet tail built"
        );

        let mut tail = Self {
            ring,
            rotations,
            resonances: Vec::new(),
            theta: 0.0,
            window: [0.0; 2],
            ref_offset,
            sample_rate,
        };
        tail.set_window(window);
        tail
    }

    /// Convolve one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        self.ring.push(input);

        let count = self.rotations.len();
        let rot = self.theta as usize;
        let rot2 = (rot + 1) % count;
        let frac = self.theta - rot as f32;
        let (fade_out, fade_in) = equal_power(frac);

        let mut sum = 0.0;
        if frac != 1.0 {
            sum += self.rotation_sum(rot) * fade_out;
        }
        if frac != 0.0 {
            sum += self.rotation_sum(rot2) * fade_in;
        }

        for &(offset, weight) in &self.resonances {
            sum += self.ring.tap(offset) * weight;
        }

        self.theta += 0.5 / self.window[0];
        if self.theta >= count as f32 {
            self.theta = 0.0;
        }

        sum
    }

    /// Sum one rotation over the window.
    fn rotation_sum(&self, index: usize) -> f32 {
        let [min_delay, max_delay] = self.window;
        let mut sum = 0.0;
        for tap in &self.rotations[index] {
            let offset = tap.offset as f32;
            if offset > min_delay {
                sum += self.ring.tap(tap.offset) * tap.gain;
            }
            if offset >= max_delay {
                break;
            }
        }
        sum
    }

    /// Replace the guaranteed taps. Offsets beyond the history are ignored.
    pub fn set_resonances(&mut self, offsets: &[usize]) {
        let max_offset = self.ring.max_offset();
        let ref_offset = self.ref_offset;
        self.resonances.clear();
        self.resonances.extend(
            offsets
                .iter()
                .filter(|&&offset| offset <= max_offset)
                .map(|&offset| {
                    (
                        offset,
                        RESONANCE_FACTOR / (1.0 + offset as f32 / ref_offset),
                    )
                }),
        );
    }

    /// Guaranteed tap offsets currently in effect.
    pub fn resonances(&self) -> impl Iterator<Item = usize> + '_ {
        self.resonances.iter().map(|&(offset, _)| offset)
    }

    /// Set the `[min_delay, max_delay]` window in samples.
    ///
    /// `min_delay` is held at 1 or above since it also sets the sweep rate.
    pub fn set_window(&mut self, window: [f32; 2]) {
        self.window = [window[0].max(1.0), window[1]];
    }

    /// Current window in samples.
    pub fn window(&self) -> [f32; 2] {
        self.window
    }

    /// Tap table of rotation `index`.
    pub fn rotation(&self, index: usize) -> Option<&[VelvetTap]> {
        self.rotations.get(index).map(Vec::as_slice)
    }

    /// Number of rotations.
    pub fn rotation_count(&self) -> usize {
        self.rotations.len()
    }

    /// Sweep phase in `[0, rotation_count)`.
    pub fn theta(&self) -> f32 {
        self.theta
    }

    /// Reference offset in samples (300 ft of travel).
    pub fn ref_offset(&self) -> f32 {
        self.ref_offset
    }

    /// Sample rate the rotations were built for.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Silence the history and rewind the sweep.
    pub fn reset(&mut self) {
        self.ring.clear();
        self.theta = 0.0;
    }
}

fn build_rotations(
    rng: &mut Lcg,
    rotation_count: usize,
    bin_length: usize,
    sample_rate: f32,
    ref_offset: f32,
    max_offset: usize,
) -> Vec<Vec<VelvetTap>> {
    let bins = (sample_rate / bin_length as f32) as usize;
    let density_scale = powf(bin_length as f32 / sample_rate, 0.45);

    let mut rotations = Vec::with_capacity(rotation_count);
    for _ in 0..rotation_count {
        let mut taps = Vec::with_capacity(bins);
        for bin in 0..bins {
            let offset = bin * bin_length + rng.below(bin_length as u32) as usize;
            let polarity = rng.polarity();
            if offset > max_offset {
                continue;
            }
            let attenuation = 1.0 + offset as f32 / ref_offset;
            taps.push(VelvetTap {
                offset,
                gain: polarity / attenuation * density_scale,
            });
        }
        rotations.push(taps);
    }
    rotations
}
