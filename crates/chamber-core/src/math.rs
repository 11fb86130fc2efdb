//! Small numeric helpers shared by the reverb stages.

use libm::sqrtf;

/// Flush values too small to matter to zero.
///
/// Subnormal floats slow most CPUs down dramatically. Feedback paths that
/// decay toward silence should pass their state through this.
#[allow(clippy::inline_always)]
#[inline(always)]
pub fn flush_denormal(x: f32) -> f32 {
    if x.abs() < 1e-20 { 0.0 } else { x }
}

/// Move `current` toward `goal` by at most `max_step`.
///
/// ```rust
/// use chamber_core::slew_toward;
///
/// assert_eq!(slew_toward(0.0, 1.0, 0.25), 0.25);
/// assert_eq!(slew_toward(0.9, 1.0, 0.25), 1.0);
/// assert_eq!(slew_toward(1.0, 0.0, 0.25), 0.75);
/// ```
#[inline]
pub fn slew_toward(current: f32, goal: f32, max_step: f32) -> f32 {
    current + (goal - current).clamp(-max_step, max_step)
}

/// Equal-power crossfade gains `(sqrt(1 - t), sqrt(t))` for `t` in `[0, 1]`.
#[inline]
pub fn equal_power(t: f32) -> (f32, f32) {
    (sqrtf(1.0 - t), sqrtf(t))
}
