//! Offline rendering of a buffer through an effect.

use chamber_core::Effect;

/// Render `input` followed by `tail_samples` of silence through `effect`.
///
/// Processing runs in blocks of `block_size` (at least 1). `on_block` is
/// called after each block with the number of samples rendered so far.
pub fn render<E, F>(
    effect: &mut E,
    input: &[f32],
    tail_samples: usize,
    block_size: usize,
    mut on_block: F,
) -> Vec<f32>
where
    E: Effect + ?Sized,
    F: FnMut(usize),
{
    let block_size = block_size.max(1);
    let mut output = Vec::with_capacity(input.len() + tail_samples);
    output.extend_from_slice(input);
    output.resize(input.len() + tail_samples, 0.0);

    let mut done = 0;
    for block in output.chunks_mut(block_size) {
        effect.process_block_inplace(block);
        done += block.len();
        on_block(done);
    }

    tracing::debug!(
        samples = output.len(),
        tail = tail_samples,
        block_size,
        "render finished"
    );
    output
}

/// RMS and peak level of a signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalStats {
    /// Root-mean-square amplitude.
    pub rms: f32,
    /// Largest absolute sample.
    pub peak: f32,
}

impl SignalStats {
    /// Measure a buffer. An empty buffer measures as silence.
    pub fn measure(samples: &[f32]) -> Self {
        if samples.is_empty() {
            return Self {
                rms: 0.0,
                peak: 0.0,
            };
        }
        let sum_sq: f64 = samples.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
        let peak = samples.iter().fold(0.0f32, |acc, &s| acc.max(s.abs()));
        Self {
            rms: (sum_sq / samples.len() as f64).sqrt() as f32,
            peak,
        }
    }

    /// RMS in dBFS, floored at -120.
    pub fn rms_db(&self) -> f32 {
        linear_to_db(self.rms)
    }

    /// Peak in dBFS, floored at -120.
    pub fn peak_db(&self) -> f32 {
        linear_to_db(self.peak)
    }
}

fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        -120.0
    } else {
        20.0 * linear.log10()
    }
}
