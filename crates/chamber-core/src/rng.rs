//! Seedable pseudo-random source for tap placement and stereo jitter.
//!
//! Reverb geometry needs a handful of random draws at construction time, and
//! they must be reproducible for tests and offline renders. A 32-bit LCG with
//! the Numerical Recipes constants (`a = 1664525`, `c = 1013904223`) is
//! plenty. Only the high bits are used, since the low bits of an LCG have
//! short periods.

/// Default seed used when a caller does not supply one.
pub const DEFAULT_SEED: u32 = 0x5EED_C0DE;

/// Linear congruential generator.
#[derive(Debug, Clone)]
pub struct Lcg {
    state: u32,
}

impl Lcg {
    /// Create a generator from a seed.
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Next raw 32-bit value.
    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        self.state = self
            .state
            .wrapping_mul(1_664_525)
            .wrapping_add(1_013_904_223);
        self.state
    }

    /// Uniform value in `[0.0, 1.0)`.
    #[inline]
    pub fn next_f32(&mut self) -> f32 {
        // Upper 24 bits fit the f32 mantissa exactly.
        (self.next_u32() >> 8) as f32 / 16_777_216.0
    }

    /// Uniform integer in `[0, bound)`. Returns 0 when `bound` is 0.
    #[inline]
    pub fn below(&mut self, bound: u32) -> u32 {
        ((u64::from(self.next_u32()) * u64::from(bound)) >> 32) as u32
    }

    /// `+1.0` or `-1.0` with equal probability.
    #[inline]
    pub fn polarity(&mut self) -> f32 {
        if self.next_u32() >> 31 == 0 { -1.0 } else { 1.0 }
    }
}

impl Default for Lcg {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}
