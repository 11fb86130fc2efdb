//! Late reverberation: velvet tail in a filtered feedback loop.
//!
//! ```text
//! input ──(+)──► VelvetTail ──► material voice ──► × reverberance ──► guard ──┬──► output
//!          ▲                                                                  │
//!          └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `reverberance` is the decay control. It eases toward its goal rather than
//! jumping, so openness changes do not click.
//!
//! The output is fed back as is. Only when the loop output would pass
//! [`FEEDBACK_CEILING`] does the guard pull it down to the ceiling; it then
//! recovers toward unity over about a second. A loop that never reaches the
//! ceiling is untouched.

use chamber_core::{FilterDesigner, FilterError, VoiceHandle, flush_denormal, slew_toward};
use libm::roundf;

use crate::VelvetTail;

/// Rotations in a tail built by [`ReverbUnit::new`].
pub const ROTATIONS: usize = 23;

/// Fastest change of `reverberance`, in units per second.
pub const REVERBERANCE_SLEW_PER_SECOND: f32 = 20.0;

/// Largest magnitude the loop may feed back.
pub const FEEDBACK_CEILING: f32 = 4.0;

/// Rate at which the guard returns to unity after clamping, per second.
const GUARD_RECOVERY_PER_SECOND: f32 = 1.0;

/// Diffuse late tail with feedback and a decay control.
///
/// # Example
///
/// ```rust
/// use chamber_core::{FilterDesigner, ResponseType};
/// use chamber_effects::ReverbUnit;
///
/// let mut air = FilterDesigner::design(ResponseType::Lowpass, 48000.0, 6000.0, 1.0, 0.707)?;
/// let mut late = ReverbUnit::new(48000.0, [400.0, 4000.0], 1000.0, 0.8, &mut air);
/// late.set_openness(0.5);
///
/// let mut tail = 0.0;
/// for n in 0..4800 {
///     tail += late.process(if n == 0 { 1.0 } else { 0.0 }, &mut air)?.abs();
/// }
/// assert!(tail > 0.0);
///
/// late.release(&mut air);
/// # Ok::<(), chamber_core::FilterError>(())
/// ```
#[derive(Debug)]
pub struct ReverbUnit {
    tail: VelvetTail,
    voice: VoiceHandle,
    reverberance: f32,
    goal_reverberance: f32,
    /// Largest per-sample change of `reverberance`.
    slew: f32,
    /// Gain applied to the loop output, 1 unless the ceiling was hit.
    guard: f32,
    guard_recovery: f32,
    /// Last output.
    feedback: f32,
}

impl ReverbUnit {
    /// Build a unit with a one-second, 23-rotation tail.
    ///
    /// # Arguments
    ///
    /// * `sample_rate` - Sample rate in Hz
    /// * `window` - Initial tail window `[min, max]` in samples
    /// * `density` - Velvet impulses per second
    /// * `reverberance` - Initial decay, clamped to `[0, 1]`
    /// * `filter` - Material filter; one voice is registered
    pub fn new(
        sample_rate: f32,
        window: [f32; 2],
        density: f32,
        reverberance: f32,
        filter: &mut FilterDesigner,
    ) -> Self {
        let bin_length = roundf(sample_rate / density).max(1.0) as usize;
        let tail = VelvetTail::new(
            sample_rate as usize,
            ROTATIONS,
            window,
            bin_length,
            sample_rate,
        );
        let mut unit = Self::with_tail(tail, filter);
        unit.set_reverberance_immediate(reverberance);
        unit
    }

    /// Wrap an existing tail. Reverberance starts at 0.
    pub fn with_tail(tail: VelvetTail, filter: &mut FilterDesigner) -> Self {
        let sample_rate = tail.sample_rate();
        Self {
            tail,
            voice: filter.register(),
            reverberance: 0.0,
            goal_reverberance: 0.0,
            slew: REVERBERANCE_SLEW_PER_SECOND / sample_rate,
            guard: 1.0,
            guard_recovery: GUARD_RECOVERY_PER_SECOND / sample_rate,
            feedback: 0.0,
        }
    }

    /// Process one sample.
    #[inline]
    pub fn process(&mut self, input: f32, filter: &mut FilterDesigner) -> Result<f32, FilterError> {
        let diffused = self.tail.process(input + self.feedback);
        let wet = filter.process(diffused, self.voice)? * self.reverberance;

        self.reverberance = slew_toward(self.reverberance, self.goal_reverberance, self.slew);

        self.guard = (self.guard + self.guard_recovery).min(1.0);
        let magnitude = wet.abs();
        if magnitude * self.guard > FEEDBACK_CEILING {
            #[cfg(feature = "tracing")]
            if self.guard == 1.0 {
                tracing::warn!(magnitude, "late loop hit the feedback ceiling");
            }
            self.guard = FEEDBACK_CEILING / magnitude;
        }

        let out = flush_denormal(wet * self.guard);
        self.feedback = out;
        Ok(out)
    }

    /// Gain the loop guard currently applies; 1 while the loop is below
    /// [`FEEDBACK_CEILING`].
    pub fn guard(&self) -> f32 {
        self.guard
    }

    /// Set how open the space is: 0 keeps everything, 1 kills the tail.
    ///
    /// Reverberance glides to `1 - openness`.
    pub fn set_openness(&mut self, openness: f32) {
        self.goal_reverberance = 1.0 - openness.clamp(0.0, 1.0);
    }

    /// Jump straight to a reverberance, skipping the glide.
    pub fn set_reverberance_immediate(&mut self, reverberance: f32) {
        let r = reverberance.clamp(0.0, 1.0);
        self.reverberance = r;
        self.goal_reverberance = r;
    }

    /// Current reverberance.
    pub fn reverberance(&self) -> f32 {
        self.reverberance
    }

    /// Reverberance being glided toward.
    pub fn goal_reverberance(&self) -> f32 {
        self.goal_reverberance
    }

    /// Replace the tail's guaranteed taps.
    pub fn set_resonance(&mut self, offsets: &[usize]) {
        self.tail.set_resonances(offsets);
    }

    /// Set the tail's delay window in samples.
    pub fn set_window(&mut self, window: [f32; 2]) {
        self.tail.set_window(window);
    }

    /// The owned tail.
    pub fn tail(&self) -> &VelvetTail {
        &self.tail
    }

    /// The filter voice this unit owns.
    pub fn voice(&self) -> VoiceHandle {
        self.voice
    }

    /// Silence the tail and the feedback path.
    pub fn reset(&mut self) {
        self.tail.reset();
        self.guard = 1.0;
        self.feedback = 0.0;
    }

    /// Tear down, returning the voice to `filter`.
    pub fn release(self, filter: &mut FilterDesigner) {
        filter.unregister(self.voice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chamber_core::{ResponseType, UNITY_GAIN};

    const SR: f32 = 48000.0;

    fn flat() -> FilterDesigner {
        FilterDesigner::design(ResponseType::Peak, 48000.0, 1000.0, UNITY_GAIN, 1.0).unwrap()
    }

    fn impulse_response(
        unit: &mut ReverbUnit,
        filter: &mut FilterDesigner,
        len: usize,
    ) -> Vec<f32> {
        (0..len)
            .map(|n| {
                unit.process(if n == 0 { 1.0 } else { 0.0 }, filter)
                    .unwrap()
            })
            .collect()
    }

    #[test]
    fn zero_reverberance_is_silent() {
        let mut filter = flat();
        let mut unit = ReverbUnit::new(SR, [400.0, 4000.0], 1000.0, 0.0, &mut filter);
        let response = impulse_response(&mut unit, &mut filter, 20000);
        assert!(response.iter().all(|&y| y == 0.0));
    }

    #[test]
    fn with_tail_starts_silent() {
        let mut filter = flat();
        let tail = VelvetTail::new(48000, 4, [100.0, 2000.0], 48, SR);
        let mut unit = ReverbUnit::with_tail(tail, &mut filter);
        assert_eq!(unit.reverberance(), 0.0);
        let response = impulse_response(&mut unit, &mut filter, 3000);
        assert!(response.iter().all(|&y| y == 0.0));
    }

    #[test]
    fn high_reverberance_stays_bounded_and_decays() {
        let mut filter = flat();
        let mut unit = ReverbUnit::new(SR, [400.0, 4000.0], 2000.0, 0.98, &mut filter);
        unit.set_resonance(&[427, 854, 1281]);

        let response = impulse_response(&mut unit, &mut filter, 5 * 48000);
        assert!(response.iter().all(|y| y.is_finite() && y.abs() < 10.0));

        let energy = |s: &[f32]| s.iter().map(|y| y * y).sum::<f32>();
        let early = energy(&response[..48000]);
        let late = energy(&response[4 * 48000..]);
        assert!(early > 0.0);
        assert!(late < early, "late energy {late} should be below {early}");
    }

    #[test]
    fn stable_loop_feeds_output_straight_back() {
        let window = [400.0, 4000.0];
        let mut filter = flat();
        let mut unit = ReverbUnit::new(SR, window, 1000.0, 0.85, &mut filter);
        unit.set_resonance(&[427, 854, 1281]);

        // Same seed, same shape: y[n] = r * H(tail(x[n] + y[n-1])).
        let mut twin = VelvetTail::new(48000, ROTATIONS, window, 48, SR);
        twin.set_resonances(&[427, 854, 1281]);
        let twin_voice = filter.register();

        let mut previous = 0.0;
        for n in 0..9600 {
            let x = if n == 0 { 1.0 } else { 0.0 };
            let expected = filter
                .process(twin.process(x + previous), twin_voice)
                .unwrap()
                * 0.85;
            let y = unit.process(x, &mut filter).unwrap();
            assert!(
                (y - expected).abs() < 1e-6,
                "sample {n}: {y} vs {expected}"
            );
            previous = expected;
        }
        assert_eq!(unit.guard(), 1.0);
    }

    #[test]
    fn runaway_loop_is_held_at_the_ceiling() {
        let mut filter = flat();
        // Twenty coincident resonances give a loop gain near 1.8.
        let tail = VelvetTail::new(100, 1, [200.0, 300.0], 48, SR);
        let mut unit = ReverbUnit::with_tail(tail, &mut filter);
        unit.set_resonance(&[10; 20]);
        unit.set_reverberance_immediate(0.9);

        let response = impulse_response(&mut unit, &mut filter, 48000);
        assert!(response.iter().all(|y| y.is_finite()));
        let peak = response.iter().fold(0.0f32, |m, y| m.max(y.abs()));
        assert!(peak > 1.0, "loop should grow, peak {peak}");
        assert!(peak <= FEEDBACK_CEILING * (1.0 + 1e-5), "peak {peak}");
        assert!(unit.guard() < 1.0);

        unit.reset();
        assert_eq!(unit.guard(), 1.0);
    }

    #[test]
    fn openness_glides() {
        let mut filter = flat();
        let mut unit = ReverbUnit::new(SR, [400.0, 4000.0], 1000.0, 1.0, &mut filter);
        unit.set_openness(1.0);
        assert_eq!(unit.goal_reverberance(), 0.0);

        unit.process(0.0, &mut filter).unwrap();
        let step = 1.0 - unit.reverberance();
        assert!((step - REVERBERANCE_SLEW_PER_SECOND / SR).abs() < 1e-6);

        // A full swing takes 1/20 s.
        for _ in 0..2400 {
            unit.process(0.0, &mut filter).unwrap();
        }
        assert_eq!(unit.reverberance(), 0.0);
    }

    #[test]
    fn openness_is_clamped() {
        let mut filter = flat();
        let mut unit = ReverbUnit::new(SR, [400.0, 4000.0], 1000.0, 0.5, &mut filter);
        unit.set_openness(-3.0);
        assert_eq!(unit.goal_reverberance(), 1.0);
        unit.set_openness(7.0);
        assert_eq!(unit.goal_reverberance(), 0.0);
    }

    #[test]
    fn density_sets_bin_length() {
        let mut filter = flat();
        let unit = ReverbUnit::new(SR, [400.0, 4000.0], 500.0, 0.5, &mut filter);
        assert_eq!(unit.tail().rotation_count(), ROTATIONS);
        assert_eq!(unit.tail().rotation(0).unwrap().len(), 500);
    }

    #[test]
    fn resonance_and_window_reach_the_tail() {
        let mut filter = flat();
        let mut unit = ReverbUnit::new(SR, [400.0, 4000.0], 1000.0, 0.5, &mut filter);
        unit.set_resonance(&[10, 20]);
        unit.set_window([50.0, 60.0]);
        assert_eq!(unit.tail().resonances().collect::<Vec<_>>(), [10, 20]);
        assert_eq!(unit.tail().window(), [50.0, 60.0]);
    }

    #[test]
    fn release_returns_the_voice() {
        let mut filter = flat();
        let unit = ReverbUnit::new(SR, [400.0, 4000.0], 1000.0, 0.5, &mut filter);
        assert_eq!(filter.voice_count(), 1);
        unit.release(&mut filter);
        assert_eq!(filter.voice_count(), 0);
    }
}
