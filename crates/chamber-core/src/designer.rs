//! Shared second-order filter designer.
//!
//! One [`FilterDesigner`] holds a single coefficient set (a material's
//! absorption curve, say) and serves any number of independent *voices*.
//! Each voice owns its own Direct Form I history, stored in an arena inside
//! the designer and addressed by an opaque [`VoiceHandle`].
//!
//! Coefficient calculation follows the RBJ Audio EQ Cookbook, with three
//! ways of reading the shape parameter:
//!
//! | Response | `shape` means | Uses `gain` |
//! |----------|---------------|-------------|
//! | Lowpass, Highpass, Notch | Q | no |
//! | Bandpass, Peak | bandwidth in octaves | Peak only |
//! | LowShelf, HighShelf | shelf slope S | yes |
//!
//! Gain is linear with `A = gain / 4` for peak and shelf responses, so the
//! flat setting is [`UNITY_GAIN`]. Use [`gain_from_db`] to work in decibels.
//!
//! Coefficients are recomputed eagerly by every setter and never inside
//! [`FilterDesigner::process`].
//!
//! # Example
//!
//! ```rust
//! use chamber_core::{FilterDesigner, ResponseType};
//!
//! let mut carpet = FilterDesigner::design(ResponseType::Lowpass, 48000.0, 2500.0, 1.0, 0.707)?;
//! let early = carpet.register();
//! let late = carpet.register();
//!
//! let a = carpet.process(1.0, early)?;
//! let b = carpet.process(1.0, late)?;
//! assert_eq!(a, b); // same coefficients, separate histories
//!
//! carpet.unregister(late);
//! assert!(carpet.process(0.0, late).is_err());
//! # Ok::<(), chamber_core::FilterError>(())
//! ```

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::string::ToString;
use alloc::vec::Vec;
use core::f64::consts::{LN_2, PI};
use core::fmt;
use core::str::FromStr;

use libm::{cos, pow, sin, sinh, sqrt};

use crate::FilterError;

/// Linear gain at which peak and shelf responses are flat (`A = 1`).
pub const UNITY_GAIN: f64 = 4.0;

/// Samples of impulse response inspected by [`Coefficients::impulse_l1_norm`].
const L1_NORM_HORIZON: usize = 1 << 16;

/// Convert a boost/cut in decibels to this module's linear gain convention.
///
/// ```rust
/// use chamber_core::{UNITY_GAIN, gain_from_db};
///
/// assert_eq!(gain_from_db(0.0), UNITY_GAIN);
/// ```
pub fn gain_from_db(db: f64) -> f64 {
    UNITY_GAIN * pow(10.0, db / 40.0)
}

/// The seven supported second-order response shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ResponseType {
    /// 12 dB/oct lowpass.
    Lowpass = 0,
    /// 12 dB/oct highpass.
    Highpass = 1,
    /// Constant 0 dB peak bandpass.
    Bandpass = 2,
    /// Peaking EQ bell.
    Peak = 3,
    /// Band-reject.
    Notch = 4,
    /// Low shelf.
    LowShelf = 5,
    /// High shelf.
    HighShelf = 6,
}

impl ResponseType {
    /// All response shapes in code order.
    pub const ALL: [ResponseType; 7] = [
        ResponseType::Lowpass,
        ResponseType::Highpass,
        ResponseType::Bandpass,
        ResponseType::Peak,
        ResponseType::Notch,
        ResponseType::LowShelf,
        ResponseType::HighShelf,
    ];

    /// Lower-case identifier, as accepted by [`FromStr`].
    pub fn name(self) -> &'static str {
        match self {
            ResponseType::Lowpass => "lowpass",
            ResponseType::Highpass => "highpass",
            ResponseType::Bandpass => "bandpass",
            ResponseType::Peak => "peak",
            ResponseType::Notch => "notch",
            ResponseType::LowShelf => "lowshelf",
            ResponseType::HighShelf => "highshelf",
        }
    }

    /// Whether `gain` shapes this response.
    pub fn uses_gain(self) -> bool {
        matches!(
            self,
            ResponseType::Peak | ResponseType::LowShelf | ResponseType::HighShelf
        )
    }

    /// Amplitude term `A` for the given linear gain.
    pub fn amplitude(self, gain: f64) -> f64 {
        if self.uses_gain() {
            gain / 4.0
        } else {
            sqrt(gain / 2.0)
        }
    }
}

impl TryFrom<u8> for ResponseType {
    type Error = FilterError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(code as usize)
            .copied()
            .ok_or(FilterError::UnknownResponse(code))
    }
}

impl FromStr for ResponseType {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|r| r.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| FilterError::UnknownResponseName(trimmed.to_string()))
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Design parameters for one coefficient set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterSpec {
    /// Response shape.
    pub response: ResponseType,
    /// Sample rate in Hz.
    pub sample_rate: f64,
    /// Cutoff, center or shelf frequency in Hz.
    pub frequency: f64,
    /// Linear gain (peak and shelf responses only).
    pub gain: f64,
    /// Q, bandwidth in octaves, or shelf slope, depending on `response`.
    pub shape: f64,
}

impl FilterSpec {
    /// Check every parameter against its valid range.
    pub fn validate(&self) -> Result<(), FilterError> {
        let invalid = |name, value| Err(FilterError::InvalidParameter { name, value });

        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return invalid("sample_rate", self.sample_rate);
        }
        if !self.frequency.is_finite()
            || self.frequency <= 0.0
            || self.frequency >= self.sample_rate / 2.0
        {
            return invalid("frequency", self.frequency);
        }
        if !self.shape.is_finite() || self.shape <= 0.0 {
            return invalid("shape", self.shape);
        }
        if !self.gain.is_finite() || (self.response.uses_gain() && self.gain <= 0.0) {
            return invalid("gain", self.gain);
        }
        Ok(())
    }

    /// Validate and compute the coefficient set.
    pub fn coefficients(&self) -> Result<Coefficients, FilterError> {
        self.validate()?;
        let coeffs = Coefficients::compute(self);
        if coeffs.is_finite() && coeffs.a0 != 0.0 {
            Ok(coeffs)
        } else {
            Err(FilterError::Unstable {
                response: self.response,
                frequency: self.frequency,
            })
        }
    }
}

/// Un-normalized biquad coefficients.
///
/// Kept exactly as designed; the `1/a0` normalization happens in [`tick`](Self::tick).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coefficients {
    /// Feedforward `x[n]` term.
    pub b0: f64,
    /// Feedforward `x[n-1]` term.
    pub b1: f64,
    /// Feedforward `x[n-2]` term.
    pub b2: f64,
    /// Output normalization.
    pub a0: f64,
    /// Feedback `y[n-1]` term.
    pub a1: f64,
    /// Feedback `y[n-2]` term.
    pub a2: f64,
}

impl Coefficients {
    /// Passthrough coefficients: `y[n] = x[n]`.
    pub const IDENTITY: Coefficients = Coefficients {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a0: 1.0,
        a1: 0.0,
        a2: 0.0,
    };

    /// Cookbook coefficients for `spec`, without validation.
    pub fn compute(spec: &FilterSpec) -> Self {
        let a = spec.response.amplitude(spec.gain);
        let w0 = 2.0 * PI * spec.frequency / spec.sample_rate;
        let sin_w0 = sin(w0);
        let cos_w0 = cos(w0);

        let alpha = match spec.response {
            // Slope
            ResponseType::LowShelf | ResponseType::HighShelf => {
                (sin_w0 / 2.0) * sqrt((a + 1.0 / a) * (1.0 / spec.shape - 1.0) + 2.0)
            }
            // Bandwidth
            ResponseType::Bandpass | ResponseType::Peak => {
                sin_w0 * sinh((LN_2 / 2.0) * spec.shape * (w0 / sin_w0))
            }
            // Q
            _ => sin_w0 / (2.0 * spec.shape),
        };

        match spec.response {
            ResponseType::Lowpass => Self {
                b0: (1.0 - cos_w0) / 2.0,
                b1: 1.0 - cos_w0,
                b2: (1.0 - cos_w0) / 2.0,
                a0: 1.0 + alpha,
                a1: -2.0 * cos_w0,
                a2: 1.0 - alpha,
            },
            ResponseType::Highpass => Self {
                b0: (1.0 + cos_w0) / 2.0,
                b1: -(1.0 + cos_w0),
                b2: (1.0 + cos_w0) / 2.0,
                a0: 1.0 + alpha,
                a1: -2.0 * cos_w0,
                a2: 1.0 - alpha,
            },
            ResponseType::Bandpass => Self {
                b0: alpha,
                b1: 0.0,
                b2: -alpha,
                a0: 1.0 + alpha,
                a1: -2.0 * cos_w0,
                a2: 1.0 - alpha,
            },
            ResponseType::Peak => Self {
                b0: 1.0 + alpha * a,
                b1: -2.0 * cos_w0,
                b2: 1.0 - alpha * a,
                a0: 1.0 + alpha / a,
                a1: -2.0 * cos_w0,
                a2: 1.0 - alpha / a,
            },
            ResponseType::Notch => Self {
                b0: 1.0,
                b1: -2.0 * cos_w0,
                b2: 1.0,
                a0: 1.0 + alpha,
                a1: -2.0 * cos_w0,
                a2: 1.0 - alpha,
            },
            ResponseType::LowShelf => {
                let two_root_a_alpha = 2.0 * sqrt(a) * alpha;
                Self {
                    b0: a * ((a + 1.0) - (a - 1.0) * cos_w0 + two_root_a_alpha),
                    b1: 2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w0),
                    b2: a * ((a + 1.0) - (a - 1.0) * cos_w0 - two_root_a_alpha),
                    a0: (a + 1.0) + (a - 1.0) * cos_w0 + two_root_a_alpha,
                    a1: -2.0 * ((a - 1.0) + (a + 1.0) * cos_w0),
                    a2: (a + 1.0) + (a - 1.0) * cos_w0 - two_root_a_alpha,
                }
            }
            ResponseType::HighShelf => {
                let two_root_a_alpha = 2.0 * sqrt(a) * alpha;
                Self {
                    b0: a * ((a + 1.0) + (a - 1.0) * cos_w0 + two_root_a_alpha),
                    b1: -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w0),
                    b2: a * ((a + 1.0) + (a - 1.0) * cos_w0 - two_root_a_alpha),
                    a0: (a + 1.0) - (a - 1.0) * cos_w0 + two_root_a_alpha,
                    a1: 2.0 * ((a - 1.0) - (a + 1.0) * cos_w0),
                    a2: (a + 1.0) - (a - 1.0) * cos_w0 - two_root_a_alpha,
                }
            }
        }
    }

    /// Whether all six coefficients are finite.
    pub fn is_finite(&self) -> bool {
        [self.b0, self.b1, self.b2, self.a0, self.a1, self.a2]
            .iter()
            .all(|c| c.is_finite())
    }

    /// Advance one voice by one sample.
    ///
    /// ```text
    /// y = (b0·x + b1·x1 + b2·x2 − a1·y1 − a2·y2) / a0
    /// ```
    #[inline]
    pub fn tick(&self, state: &mut VoiceState, x: f64) -> f64 {
        let y = (1.0 / self.a0)
            * (self.b0 * x + self.b1 * state.x1 + self.b2 * state.x2
                - self.a1 * state.y1
                - self.a2 * state.y2);

        state.x2 = state.x1;
        state.x1 = x;
        state.y2 = state.y1;
        state.y1 = y;

        y
    }

    /// Sum of `|h[n]|` over the impulse response.
    ///
    /// This is the worst-case gain of the filter for any bounded input. Runs
    /// at most 65536 samples; returns `f64::INFINITY` when the response
    /// diverges (poles outside the unit circle).
    pub fn impulse_l1_norm(&self) -> f64 {
        let mut state = VoiceState::ZERO;
        let mut sum = self.tick(&mut state, 1.0).abs();

        for n in 1..L1_NORM_HORIZON {
            let y = self.tick(&mut state, 0.0);
            if !y.is_finite() || sum > 1e9 {
                return f64::INFINITY;
            }
            sum += y.abs();
            if n > 2 && state.y1.abs() < 1e-15 && state.y2.abs() < 1e-15 {
                return sum;
            }
        }

        sum
    }
}

/// History of one voice: `(x[n-1], x[n-2], y[n-1], y[n-2])`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VoiceState {
    /// `x[n-1]`
    pub x1: f64,
    /// `x[n-2]`
    pub x2: f64,
    /// `y[n-1]`
    pub y1: f64,
    /// `y[n-2]`
    pub y2: f64,
}

impl VoiceState {
    /// Silent history.
    pub const ZERO: VoiceState = VoiceState {
        x1: 0.0,
        x2: 0.0,
        y1: 0.0,
        y2: 0.0,
    };

    /// The history as an ordered 4-tuple.
    pub fn as_tuple(&self) -> (f64, f64, f64, f64) {
        (self.x1, self.x2, self.y1, self.y2)
    }
}

/// Opaque identifier for one voice of a [`FilterDesigner`].
///
/// A handle names a slot and the generation of that slot it was issued for.
/// Releasing a voice bumps the slot's generation, so a handle kept past
/// [`FilterDesigner::unregister`] never reaches the slot's next occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceHandle {
    index: u32,
    generation: u32,
}

impl VoiceHandle {
    /// Build a handle from a slot index and generation.
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Handle for the first generation of slot `index`.
    pub const fn from_raw(index: u32) -> Self {
        Self::new(index, 0)
    }

    /// Slot index.
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Slot generation this handle was issued for.
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for VoiceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.generation == 0 {
            write!(f, "voice#{}", self.index)
        } else {
            write!(f, "voice#{}.{}", self.index, self.generation)
        }
    }
}

/// Highest slot count [`FilterDesigner::register_handle`] will grow to.
pub const MAX_VOICE_SLOTS: usize = 1 << 16;

#[derive(Debug, Clone)]
struct VoiceSlot {
    generation: u32,
    state: Option<VoiceState>,
}

impl VoiceSlot {
    fn holds(&self, handle: VoiceHandle) -> bool {
        self.generation == handle.generation && self.state.is_some()
    }
}

/// One coefficient set shared by many independently-stateful voices.
#[derive(Debug, Clone)]
pub struct FilterDesigner {
    spec: FilterSpec,
    coeffs: Coefficients,
    /// Worst-case gain, refreshed with the coefficients.
    l1_norm: f64,
    voices: Vec<VoiceSlot>,
    free: Vec<u32>,
}

impl FilterDesigner {
    /// Design a filter from its five parameters.
    ///
    /// # Arguments
    ///
    /// * `response` - One of the seven shapes
    /// * `sample_rate` - Sample rate in Hz (> 0)
    /// * `frequency` - Design frequency in Hz, strictly between 0 and Nyquist
    /// * `gain` - Linear gain, `> 0` for peak and shelves ([`UNITY_GAIN`] is flat)
    /// * `shape` - Q, bandwidth in octaves, or slope (> 0)
    pub fn design(
        response: ResponseType,
        sample_rate: f64,
        frequency: f64,
        gain: f64,
        shape: f64,
    ) -> Result<Self, FilterError> {
        Self::from_spec(FilterSpec {
            response,
            sample_rate,
            frequency,
            gain,
            shape,
        })
    }

    /// Design a filter from a raw response code (`0..=6`).
    pub fn design_code(
        code: u8,
        sample_rate: f64,
        frequency: f64,
        gain: f64,
        shape: f64,
    ) -> Result<Self, FilterError> {
        Self::design(ResponseType::try_from(code)?, sample_rate, frequency, gain, shape)
    }

    /// Design a filter from a complete [`FilterSpec`].
    pub fn from_spec(spec: FilterSpec) -> Result<Self, FilterError> {
        let coeffs = spec.coefficients()?;
        Ok(Self {
            spec,
            coeffs,
            l1_norm: coeffs.impulse_l1_norm(),
            voices: Vec::new(),
            free: Vec::new(),
        })
    }

    /// Current design parameters.
    pub fn spec(&self) -> &FilterSpec {
        &self.spec
    }

    /// Current coefficient set.
    pub fn coefficients(&self) -> &Coefficients {
        &self.coeffs
    }

    /// Worst-case absolute gain of the current design.
    pub fn gain_bound(&self) -> f64 {
        self.l1_norm
    }

    /// Set the design frequency in Hz.
    pub fn set_frequency(&mut self, frequency: f64) -> Result<(), FilterError> {
        self.redesign(FilterSpec {
            frequency,
            ..self.spec
        })
    }

    /// Set the linear gain (peak and shelf responses only).
    pub fn set_gain(&mut self, gain: f64) -> Result<(), FilterError> {
        self.redesign(FilterSpec { gain, ..self.spec })
    }

    /// Set Q, bandwidth or slope, depending on the response.
    pub fn set_shape(&mut self, shape: f64) -> Result<(), FilterError> {
        self.redesign(FilterSpec {
            shape,
            ..self.spec
        })
    }

    /// Move the design to a new sample rate. Voice histories are kept.
    pub fn set_sample_rate(&mut self, sample_rate: f64) -> Result<(), FilterError> {
        self.redesign(FilterSpec {
            sample_rate,
            ..self.spec
        })
    }

    /// Replace every design parameter at once.
    ///
    /// On error the previous coefficients stay in effect.
    pub fn redesign(&mut self, spec: FilterSpec) -> Result<(), FilterError> {
        let coeffs = spec.coefficients()?;
        self.spec = spec;
        self.coeffs = coeffs;
        self.l1_norm = coeffs.impulse_l1_norm();

        #[cfg(feature = "tracing")]
        tracing::debug!(
            response = %spec.response,
            frequency = spec.frequency,
            gain = spec.gain,
            shape = spec.shape,
            "filter redesigned"
        );
        Ok(())
    }

    /// Allocate a fresh voice with zeroed history.
    ///
    /// Slots released by [`unregister`](Self::unregister) are reused under a
    /// new generation.
    pub fn register(&mut self) -> VoiceHandle {
        let handle = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.voices[index as usize];
                slot.state = Some(VoiceState::ZERO);
                VoiceHandle::new(index, slot.generation)
            }
            None => {
                self.voices.push(VoiceSlot {
                    generation: 0,
                    state: Some(VoiceState::ZERO),
                });
                VoiceHandle::new((self.voices.len() - 1) as u32, 0)
            }
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(voice = %handle, "filter voice registered");
        handle
    }

    /// Allocate (or re-zero) state for a specific handle.
    ///
    /// A free slot takes on the handle's generation. Fails if the slot index
    /// is at or past [`MAX_VOICE_SLOTS`], or if the slot holds a live voice
    /// of another generation.
    pub fn register_handle(&mut self, handle: VoiceHandle) -> Result<(), FilterError> {
        let index = handle.index as usize;
        if index >= MAX_VOICE_SLOTS {
            return Err(FilterError::HandleOutOfRange(handle));
        }
        if let Some(slot) = self.voices.get(index) {
            if slot.state.is_some() && slot.generation != handle.generation {
                return Err(FilterError::HandleInUse(handle));
            }
        } else {
            for pad in self.voices.len()..=index {
                self.voices.push(VoiceSlot {
                    generation: 0,
                    state: None,
                });
                if pad < index {
                    self.free.push(pad as u32);
                }
            }
        }

        self.free.retain(|&free| free != handle.index);
        self.voices[index] = VoiceSlot {
            generation: handle.generation,
            state: Some(VoiceState::ZERO),
        };
        Ok(())
    }

    /// Release a voice's state. A no-op for handles that hold none.
    pub fn unregister(&mut self, handle: VoiceHandle) {
        let Some(slot) = self.voices.get_mut(handle.index as usize) else {
            return;
        };
        if !slot.holds(handle) {
            return;
        }
        slot.state = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);

        #[cfg(feature = "tracing")]
        tracing::debug!(voice = %handle, "filter voice released");
    }

    /// Whether `handle` currently holds state.
    pub fn is_registered(&self, handle: VoiceHandle) -> bool {
        self.voice_state(handle).is_some()
    }

    /// Number of live voices.
    pub fn voice_count(&self) -> usize {
        self.voices.iter().filter(|v| v.state.is_some()).count()
    }

    /// Read a voice's history.
    pub fn voice_state(&self, handle: VoiceHandle) -> Option<&VoiceState> {
        self.voices
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.state.as_ref())
    }

    /// Zero a voice's history without releasing it.
    pub fn reset_voice(&mut self, handle: VoiceHandle) -> Result<(), FilterError> {
        *self.state_mut(handle)? = VoiceState::ZERO;
        Ok(())
    }

    /// Zero every live voice.
    pub fn reset_all(&mut self) {
        for state in self.voices.iter_mut().filter_map(|slot| slot.state.as_mut()) {
            *state = VoiceState::ZERO;
        }
    }

    /// Filter one sample for one voice.
    #[inline]
    pub fn process(&mut self, x: f32, handle: VoiceHandle) -> Result<f32, FilterError> {
        let coeffs = self.coeffs;
        let state = self.state_mut(handle)?;
        Ok(coeffs.tick(state, f64::from(x)) as f32)
    }

    #[inline]
    fn state_mut(&mut self, handle: VoiceHandle) -> Result<&mut VoiceState, FilterError> {
        self.voices
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.state.as_mut())
            .ok_or(FilterError::NotRegistered(handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lowpass() -> FilterDesigner {
        FilterDesigner::design(ResponseType::Lowpass, 48000.0, 1000.0, 1.0, 0.707).unwrap()
    }

    #[test]
    fn response_codes_round_trip() {
        for (code, response) in ResponseType::ALL.iter().enumerate() {
            assert_eq!(ResponseType::try_from(code as u8).unwrap(), *response);
            assert_eq!(*response as u8, code as u8);
        }
        assert_eq!(
            ResponseType::try_from(7),
            Err(FilterError::UnknownResponse(7))
        );
    }

    #[test]
    fn response_names_parse_case_insensitively() {
        assert_eq!("HighShelf".parse::<ResponseType>().unwrap(), ResponseType::HighShelf);
        assert_eq!(" notch ".parse::<ResponseType>().unwrap(), ResponseType::Notch);
        assert!(matches!(
            "allpass".parse::<ResponseType>(),
            Err(FilterError::UnknownResponseName(_))
        ));
    }

    #[test]
    fn design_code_rejects_out_of_range() {
        let err = FilterDesigner::design_code(12, 48000.0, 1000.0, 1.0, 1.0).unwrap_err();
        assert_eq!(err, FilterError::UnknownResponse(12));
    }

    #[test]
    fn register_reuses_released_slots() {
        let mut filter = lowpass();
        let a = filter.register();
        let b = filter.register();
        assert_ne!(a, b);
        filter.unregister(a);
        assert_eq!(filter.voice_count(), 1);
        let c = filter.register();
        assert_eq!(c.index(), a.index());
        assert_eq!(c.generation(), a.generation() + 1);
        assert_ne!(c, a);
        assert_eq!(filter.voice_count(), 2);
    }

    #[test]
    fn unregister_is_idempotent() {
        let mut filter = lowpass();
        let voice = filter.register();
        filter.unregister(voice);
        filter.unregister(voice);
        filter.unregister(VoiceHandle::from_raw(99));
        assert_eq!(filter.voice_count(), 0);

        let next = filter.register();
        filter.unregister(voice);
        assert!(filter.is_registered(next));
    }

    #[test]
    fn stale_handle_cannot_reach_the_next_occupant() {
        let mut filter = lowpass();
        let stale = filter.register();
        filter.unregister(stale);
        let fresh = filter.register();
        assert_eq!(fresh.index(), stale.index());

        assert_eq!(
            filter.process(1.0, stale),
            Err(FilterError::NotRegistered(stale))
        );
        assert_eq!(
            filter.reset_voice(stale),
            Err(FilterError::NotRegistered(stale))
        );
        assert!(!filter.is_registered(stale));
        assert!(filter.voice_state(stale).is_none());
        assert_eq!(*filter.voice_state(fresh).unwrap(), VoiceState::ZERO);

        filter.unregister(stale);
        assert!(filter.is_registered(fresh));
        assert_eq!(filter.voice_count(), 1);
    }

    #[test]
    fn register_handle_pads_and_zeroes() {
        let mut filter = lowpass();
        let far = VoiceHandle::from_raw(4);
        filter.register_handle(far).unwrap();
        assert!(filter.is_registered(far));
        assert_eq!(filter.voice_count(), 1);

        filter.process(1.0, far).unwrap();
        assert_ne!(filter.voice_state(far).unwrap().x1, 0.0);
        filter.register_handle(far).unwrap();
        assert_eq!(*filter.voice_state(far).unwrap(), VoiceState::ZERO);

        // Padding slots are handed out before new ones are pushed.
        let next = filter.register();
        assert!(next.index() < 4);
    }

    #[test]
    fn register_handle_rejects_far_slots() {
        let mut filter = lowpass();
        let far = VoiceHandle::from_raw(u32::MAX);
        assert_eq!(
            filter.register_handle(far),
            Err(FilterError::HandleOutOfRange(far))
        );
        let edge = VoiceHandle::from_raw(MAX_VOICE_SLOTS as u32);
        assert!(filter.register_handle(edge).is_err());
        assert_eq!(filter.voice_count(), 0);
        assert_eq!(filter.register().index(), 0);
    }

    #[test]
    fn register_handle_keeps_live_voices_of_other_generations() {
        let mut filter = lowpass();
        let first = filter.register();
        filter.unregister(first);
        let live = filter.register();

        assert_eq!(
            filter.register_handle(first),
            Err(FilterError::HandleInUse(first))
        );
        assert!(filter.is_registered(live));

        // Re-zeroing the live handle itself is fine.
        filter.process(1.0, live).unwrap();
        filter.register_handle(live).unwrap();
        assert_eq!(*filter.voice_state(live).unwrap(), VoiceState::ZERO);
    }

    #[test]
    fn unregistered_voice_is_an_error() {
        let mut filter = lowpass();
        let stranger = VoiceHandle::from_raw(0);
        assert_eq!(
            filter.process(0.5, stranger),
            Err(FilterError::NotRegistered(stranger))
        );
    }

    #[test]
    fn state_shifts_in_order() {
        let mut filter = lowpass();
        let voice = filter.register();
        let y0 = filter.process(1.0, voice).unwrap();
        let y1 = filter.process(0.5, voice).unwrap();
        let state = filter.voice_state(voice).unwrap();
        assert_eq!(state.x1, 0.5);
        assert_eq!(state.x2, 1.0);
        assert_eq!(state.y1 as f32, y1);
        assert_eq!(state.y2 as f32, y0);
    }

    #[test]
    fn rejects_degenerate_parameters() {
        let cases = [
            (0.0, 1000.0, 1.0, "sample_rate"),
            (48000.0, 0.0, 1.0, "frequency"),
            (48000.0, 24000.0, 1.0, "frequency"),
            (48000.0, 1000.0, 0.0, "shape"),
            (48000.0, 1000.0, -2.0, "shape"),
            (48000.0, f64::NAN, 1.0, "frequency"),
        ];
        for (sr, freq, shape, expected) in cases {
            match FilterDesigner::design(ResponseType::Lowpass, sr, freq, 1.0, shape) {
                Err(FilterError::InvalidParameter { name, .. }) => assert_eq!(name, expected),
                other => panic!("expected invalid {expected}, got {other:?}"),
            }
        }
    }

    #[test]
    fn shelf_rejects_non_positive_gain() {
        let err = FilterDesigner::design(ResponseType::LowShelf, 48000.0, 300.0, 0.0, 1.0)
            .unwrap_err();
        assert!(matches!(err, FilterError::InvalidParameter { name: "gain", .. }));
    }

    #[test]
    fn steep_shelf_slope_is_unstable() {
        // (A + 1/A)(1/S - 1) + 2 < 0 puts a negative under the square root.
        let err = FilterDesigner::design(ResponseType::HighShelf, 48000.0, 3000.0, 40.0, 5.0)
            .unwrap_err();
        assert!(matches!(err, FilterError::Unstable { .. }));
    }

    #[test]
    fn failed_setter_keeps_previous_design() {
        let mut filter = lowpass();
        let before = *filter.coefficients();
        assert!(filter.set_frequency(-5.0).is_err());
        assert_eq!(*filter.coefficients(), before);
        assert_eq!(filter.spec().frequency, 1000.0);

        filter.set_frequency(2000.0).unwrap();
        assert_ne!(*filter.coefficients(), before);
    }

    #[test]
    fn gain_from_db_matches_cookbook_amplitude() {
        let a = ResponseType::Peak.amplitude(gain_from_db(6.0));
        assert!((a - pow(10.0, 6.0 / 40.0)).abs() < 1e-12);
    }

    #[test]
    fn identity_has_unit_l1_norm() {
        assert!((Coefficients::IDENTITY.impulse_l1_norm() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn lowpass_l1_norm_is_finite() {
        let filter = lowpass();
        let norm = filter.gain_bound();
        assert!(norm.is_finite());
        assert!(norm >= 1.0 - 1e-9, "DC gain is 1, so L1 >= 1, got {norm}");
    }

    #[test]
    fn unstable_coefficients_have_infinite_norm() {
        let runaway = Coefficients {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a0: 1.0,
            a1: -2.1,
            a2: 1.0,
        };
        assert_eq!(runaway.impulse_l1_norm(), f64::INFINITY);
    }
}
