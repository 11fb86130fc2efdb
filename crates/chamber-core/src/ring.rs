//! Fixed-capacity circular sample buffer for multi-tap delays.
//!
//! Reverb stages read dozens to hundreds of integer taps per sample from the
//! same history, so there is no interpolation here: a tap read is one compare
//! and one index.
//!
//! Offsets count backwards from the most recent write: offset 0 is the sample
//! just pushed, offset 1 the one before it.
//!
//! # Example
//!
//! ```rust
//! use chamber_core::SampleRing;
//!
//! let mut ring = SampleRing::new(8);
//! for x in [1.0, 2.0, 3.0] {
//!     ring.push(x);
//! }
//! assert_eq!(ring.tap(0), 3.0);
//! assert_eq!(ring.tap(2), 1.0);
//! ```

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::vec;
use alloc::vec::Vec;

/// Heap-allocated circular buffer with integer tap reads.
///
/// The buffer is allocated once at construction and never reallocates.
#[derive(Debug, Clone)]
pub struct SampleRing {
    buffer: Vec<f32>,
    /// Index of the most recent write.
    head: usize,
}

impl SampleRing {
    /// Create a ring holding `capacity` samples.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Ring capacity must be > 0");
        Self {
            buffer: vec![0.0; capacity],
            head: capacity - 1,
        }
    }

    /// Write the next sample.
    #[inline]
    pub fn push(&mut self, sample: f32) {
        self.head += 1;
        if self.head == self.buffer.len() {
            self.head = 0;
        }
        self.buffer[self.head] = sample;
    }

    /// Read the sample written `offset` pushes ago.
    ///
    /// Offsets at or beyond [`capacity`](Self::capacity) wrap around.
    #[inline]
    pub fn tap(&self, offset: usize) -> f32 {
        let len = self.buffer.len();
        let offset = if offset < len { offset } else { offset % len };
        let index = if offset <= self.head {
            self.head - offset
        } else {
            self.head + len - offset
        };
        self.buffer[index]
    }

    /// Largest offset that does not wrap.
    pub fn max_offset(&self) -> usize {
        self.buffer.len() - 1
    }

    /// Number of samples held.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Zero the history.
    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.head = self.buffer.len() - 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_ring_is_silent() {
        let ring = SampleRing::new(4);
        for offset in 0..4 {
            assert_eq!(ring.tap(offset), 0.0);
        }
    }

    #[test]
    fn taps_count_back_from_latest() {
        let mut ring = SampleRing::new(4);
        for i in 1..=6 {
            ring.push(i as f32);
        }
        assert_eq!(ring.tap(0), 6.0);
        assert_eq!(ring.tap(1), 5.0);
        assert_eq!(ring.tap(3), 3.0);
    }

    #[test]
    fn offsets_wrap_at_capacity() {
        let mut ring = SampleRing::new(4);
        for i in 1..=4 {
            ring.push(i as f32);
        }
        assert_eq!(ring.tap(4), ring.tap(0));
        assert_eq!(ring.tap(5), ring.tap(1));
    }

    #[test]
    fn clear_resets_history() {
        let mut ring = SampleRing::new(3);
        ring.push(1.0);
        ring.push(2.0);
        ring.clear();
        assert_eq!(ring.tap(0), 0.0);
        ring.push(7.0);
        assert_eq!(ring.tap(0), 7.0);
        assert_eq!(ring.tap(1), 0.0);
    }

    #[test]
    #[should_panic]
    fn zero_capacity_panics() {
        let _ring = SampleRing::new(0);
    }
}
