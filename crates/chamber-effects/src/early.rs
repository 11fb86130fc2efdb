//! Geometric early reflections with click-free resizing.
//!
//! Each room axis (height, length, width) contributes two first-order
//! reflections: the listener sits somewhere along the axis, so the round trip
//! to each wall is split unevenly. Height uses a fixed ear height of up to
//! 6 ft; the other two axes split at a per-instance random ratio so that two
//! instances (left/right channels, say) decorrelate.
//!
//! Resizing never jumps. The six taps live in two slots, A and B. A resize
//! writes the new geometry into the slot being faded *to* and sweeps an
//! equal-power crossfade over about 1/40 s. Independently, the reported room
//! dimensions ease toward their goals at 0.005 ft per sample, and the reverb
//! window derived from them follows. The taps snap; the window glides.
//!
//! The mixed taps pass through one voice of a shared material filter, a
//! two-point average, and the echo gain, and are then summed with the dry
//! input.

use chamber_core::{
    DEFAULT_SEED, FilterDesigner, FilterError, Lcg, SampleRing, VoiceHandle, equal_power,
    flush_denormal, slew_toward,
};
use libm::{powf, roundf};

use crate::SPEED_OF_SOUND;

/// Largest room edge, in feet, whose reflections fit in the history buffer.
pub const MAX_ROOM_FEET: f32 = 400.0;

/// Distance at which inverse-square attenuation reaches 1/4.
const REFERENCE_DISTANCE_FT: f32 = 100.0;

/// Crossfade steps per second (a full sweep takes 1/40 s).
const TRANSITION_RATE: f32 = 40.0;

/// Per-sample easing of the reported dimensions, in feet.
const DIMENSION_EASING_FT: f32 = 0.005;

/// Highest point of a reflection path off the floor, in feet.
const EAR_HEIGHT_FT: f32 = 6.0;

/// Six reflection taps and their precomputed attenuation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TapSet {
    offsets: [usize; 6],
    weights: [f32; 6],
}

impl TapSet {
    const EMPTY: TapSet = TapSet {
        offsets: [0; 6],
        weights: [0.0; 6],
    };

    fn new(offsets: [usize; 6], ref_delay: f32) -> Self {
        let weights = offsets.map(|offset| {
            let ratio = (ref_delay + offset as f32) / ref_delay;
            1.0 / (ratio * ratio)
        });
        Self { offsets, weights }
    }

    /// Tap delays in samples: floor, ceiling, front, back, left, right.
    pub fn offsets(&self) -> [usize; 6] {
        self.offsets
    }

    /// Inverse-square weight of each tap.
    pub fn weights(&self) -> [f32; 6] {
        self.weights
    }

    #[inline]
    fn sum(&self, ring: &SampleRing) -> f32 {
        self.offsets
            .iter()
            .zip(&self.weights)
            .map(|(&offset, &weight)| ring.tap(offset) * weight)
            .sum()
    }
}

/// Early-reflection stage for one rectangular room.
///
/// # Example
///
/// ```rust
/// use chamber_core::{FilterDesigner, ResponseType};
/// use chamber_effects::EarlyReflections;
///
/// let mut wood = FilterDesigner::design(ResponseType::HighShelf, 48000.0, 4000.0, 2.0, 1.0)?;
/// let mut er = EarlyReflections::new(48000.0, 30.0, 20.0, 12.0, 0.2, &mut wood);
///
/// let dry = er.process(1.0, &mut wood)?;
/// assert_eq!(dry, 1.0); // no echo has arrived yet
///
/// er.set_size(60.0, 40.0, 20.0);
/// let [height, length, width] = er.delays();
/// assert!(length > width && width > height);
///
/// er.release(&mut wood);
/// # Ok::<(), chamber_core::FilterError>(())
/// ```
#[derive(Debug)]
pub struct EarlyReflections {
    ring: SampleRing,
    slot_a: TapSet,
    slot_b: TapSet,
    /// 0 = all slot A, 1 = all slot B.
    transition: f32,
    a_to_b: bool,
    /// Current `(l, w, h)`, easing toward `goal`.
    dims: [f32; 3],
    goal: [f32; 3],
    /// Axis resonance periods: height, length, width.
    resonances: [usize; 3],
    fb_jitter: f32,
    lr_jitter: f32,
    echo_factor: f32,
    prev_out: f32,
    voice: VoiceHandle,
    feet_per_sample: f32,
    ref_delay: f32,
    transition_step: f32,
}

impl EarlyReflections {
    /// Build a stage for an `l × w × h` ft room, drawing jitter from the
    /// default seed.
    ///
    /// Registers one voice with `filter`; hand it back with
    /// [`release`](Self::release).
    pub fn new(
        sample_rate: f32,
        length: f32,
        width: f32,
        height: f32,
        stereo_width: f32,
        filter: &mut FilterDesigner,
    ) -> Self {
        Self::with_seed(
            sample_rate,
            length,
            width,
            height,
            stereo_width,
            filter,
            DEFAULT_SEED,
        )
    }

    /// Like [`new`](Self::new), with an explicit jitter seed.
    ///
    /// `stereo_width` is clamped to `[0, 0.5]`: 0 puts the listener in the
    /// middle of the room, 0.5 allows anywhere between the walls.
    pub fn with_seed(
        sample_rate: f32,
        length: f32,
        width: f32,
        height: f32,
        stereo_width: f32,
        filter: &mut FilterDesigner,
        seed: u32,
    ) -> Self {
        let feet_per_sample = SPEED_OF_SOUND / sample_rate;
        let capacity = (2.0 * MAX_ROOM_FEET / feet_per_sample) as usize + 2;

        let stereo_width = stereo_width.clamp(0.0, 0.5);
        let mut rng = Lcg::new(seed);
        let fb_jitter = (rng.next_f32() - 0.5) * stereo_width * 2.0 + 0.5;
        let lr_jitter = (rng.next_f32() - 0.5) * stereo_width * 2.0 + 0.5;

        let dims = clamp_dims([length, width, height]);
        let mut er = Self {
            ring: SampleRing::new(capacity),
            slot_a: TapSet::EMPTY,
            slot_b: TapSet::EMPTY,
            transition: 0.0,
            a_to_b: true,
            dims,
            goal: dims,
            resonances: [0; 3],
            fb_jitter,
            lr_jitter,
            echo_factor: 1.0,
            prev_out: 0.0,
            voice: filter.register(),
            feet_per_sample,
            ref_delay: REFERENCE_DISTANCE_FT / feet_per_sample,
            transition_step: TRANSITION_RATE / sample_rate,
        };

        er.init_taps();
        er.a_to_b = false;
        er.init_taps();
        er
    }

    /// Process one sample: dry input plus filtered early echoes.
    #[inline]
    pub fn process(&mut self, input: f32, filter: &mut FilterDesigner) -> Result<f32, FilterError> {
        self.ring.push(input);

        let a = if self.transition < 1.0 {
            self.slot_a.sum(&self.ring)
        } else {
            0.0
        };
        let b = if self.transition > 0.0 {
            self.slot_b.sum(&self.ring)
        } else {
            0.0
        };

        if self.transition > 0.0 && self.transition < 1.0 {
            self.step_transition();
        }

        let (gain_a, gain_b) = equal_power(self.transition);
        let filtered = filter.process(a * gain_a + b * gain_b, self.voice)?;

        for (dim, goal) in self.dims.iter_mut().zip(self.goal) {
            *dim = slew_toward(*dim, goal, DIMENSION_EASING_FT);
        }

        let out = flush_denormal((filtered + self.prev_out) * 0.5);
        self.prev_out = out;
        Ok(out * self.echo_factor + input)
    }

    /// Retarget the room. Each dimension is clamped to at least 1 ft.
    ///
    /// The new taps are written into the slot being faded toward; calling this
    /// again mid-fade reverses direction and keeps the set that was incoming.
    pub fn set_size(&mut self, length: f32, width: f32, height: f32) {
        self.goal = clamp_dims([length, width, height]);
        self.a_to_b = !self.a_to_b;
        self.step_transition();
        self.init_taps();

        #[cfg(feature = "tracing")]
        tracing::debug!(
            length = self.goal[0],
            width = self.goal[1],
            height = self.goal[2],
            toward_b = self.a_to_b,
            transition = self.transition,
            "early reflections resized"
        );
    }

    /// Set the echo gain applied before the dry sum.
    pub fn set_factor(&mut self, factor: f32) {
        self.echo_factor = factor;
    }

    /// Echo gain.
    pub fn factor(&self) -> f32 {
        self.echo_factor
    }

    /// Axis resonance periods in samples: `[height, length, width]`.
    pub fn delays(&self) -> [usize; 3] {
        self.resonances
    }

    /// Shortest axis travel time in seconds, from the goal dimensions.
    pub fn min_delay(&self) -> f32 {
        self.goal.iter().copied().fold(f32::INFINITY, f32::min) / SPEED_OF_SOUND
    }

    /// Longest axis travel time in seconds, from the goal dimensions.
    pub fn max_delay(&self) -> f32 {
        self.goal.iter().copied().fold(0.0, f32::max) / SPEED_OF_SOUND
    }

    /// Delay window for a late tail, in samples, from the eased dimensions.
    ///
    /// `[mean(l, w, h), (l·w·h)^0.3 · 10]`, each converted from feet.
    pub fn reverb_window(&self) -> [f32; 2] {
        let [l, w, h] = self.dims;
        [
            (l + w + h) / 3.0 / self.feet_per_sample,
            powf(l * w * h, 0.3) * 10.0 / self.feet_per_sample,
        ]
    }

    /// Current (eased) dimensions `(l, w, h)` in feet.
    pub fn dimensions(&self) -> [f32; 3] {
        self.dims
    }

    /// Target dimensions `(l, w, h)` in feet.
    pub fn goal_dimensions(&self) -> [f32; 3] {
        self.goal
    }

    /// Tap set A.
    pub fn slot_a(&self) -> &TapSet {
        &self.slot_a
    }

    /// Tap set B.
    pub fn slot_b(&self) -> &TapSet {
        &self.slot_b
    }

    /// Crossfade position: 0 is all slot A, 1 all slot B.
    pub fn transition(&self) -> f32 {
        self.transition
    }

    /// Whether the crossfade is heading toward slot B.
    pub fn heading_to_b(&self) -> bool {
        self.a_to_b
    }

    /// The filter voice this stage owns.
    pub fn voice(&self) -> VoiceHandle {
        self.voice
    }

    /// Silence the history and smoothing state. Geometry is kept.
    pub fn reset(&mut self) {
        self.ring.clear();
        self.prev_out = 0.0;
    }

    /// Tear down, returning the voice to `filter`.
    pub fn release(self, filter: &mut FilterDesigner) {
        filter.unregister(self.voice);
    }

    fn step_transition(&mut self) {
        self.transition = if self.a_to_b {
            (self.transition + self.transition_step).min(1.0)
        } else {
            (self.transition - self.transition_step).max(0.0)
        };
    }

    /// Turn the goal geometry into taps for the slot being faded toward.
    fn init_taps(&mut self) {
        let [l, w, h] = self.goal;

        let height_pos = (h - 1.0).min(EAR_HEIGHT_FT);
        let length_pos = l * self.fb_jitter;
        let width_pos = w * self.lr_jitter;

        let offsets = [
            self.round_trip(height_pos),
            self.round_trip(h - height_pos),
            self.round_trip(length_pos),
            self.round_trip(l - length_pos),
            self.round_trip(width_pos),
            self.round_trip(w - width_pos),
        ];
        self.resonances = [
            self.feet_to_samples(h),
            self.feet_to_samples(l),
            self.feet_to_samples(w),
        ];

        let taps = TapSet::new(offsets, self.ref_delay);
        if self.a_to_b {
            self.slot_b = taps;
        } else {
            self.slot_a = taps;
        }
    }

    fn feet_to_samples(&self, feet: f32) -> usize {
        roundf(feet / self.feet_per_sample).max(0.0) as usize
    }

    /// Out-and-back delay to a wall `feet` away, clamped to the history.
    fn round_trip(&self, feet: f32) -> usize {
        (self.feet_to_samples(feet) * 2).min(self.ring.max_offset())
    }
}

fn clamp_dims(dims: [f32; 3]) -> [f32; 3] {
    dims.map(|d| if d >= 1.0 { d } else { 1.0 })
}
