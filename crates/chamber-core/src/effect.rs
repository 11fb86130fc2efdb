//! The [`Effect`] trait implemented by hosted reverb stages.
//!
//! Mono, sample-by-sample, object-safe. A host graph owns the buffers and
//! calls [`Effect::process`] once per tick, or [`Effect::process_block`]
//! once per block.

/// A mono audio processor driven by a host graph.
///
/// # Example
///
/// ```rust
/// use chamber_core::Effect;
///
/// struct Trim(f32);
///
/// impl Effect for Trim {
///     fn process(&mut self, input: f32) -> f32 {
///         input * self.0
///     }
///     fn set_sample_rate(&mut self, _sample_rate: f32) {}
///     fn reset(&mut self) {}
/// }
///
/// let mut trim = Trim(0.5);
/// let mut block = [1.0, 2.0];
/// trim.process_block_inplace(&mut block);
/// assert_eq!(block, [0.5, 1.0]);
/// ```
pub trait Effect {
    /// Process one sample, advancing internal state by one tick.
    fn process(&mut self, input: f32) -> f32;

    /// Process a block. `input` and `output` must be the same length.
    fn process_block(&mut self, input: &[f32], output: &mut [f32]) {
        debug_assert_eq!(
            input.len(),
            output.len(),
            "Input and output buffers must have same length"
        );
        for (inp, out) in input.iter().zip(output.iter_mut()) {
            *out = self.process(*inp);
        }
    }

    /// Process a block in place.
    fn process_block_inplace(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.process(*sample);
        }
    }

    /// Recalculate everything that depends on the sample rate.
    fn set_sample_rate(&mut self, sample_rate: f32);

    /// Clear delay lines and filter history without touching parameters.
    fn reset(&mut self);

    /// Delay introduced between input and output, in samples.
    fn latency_samples(&self) -> usize {
        0
    }
}
