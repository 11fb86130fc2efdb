//! Error types for filter design and voice bookkeeping.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::string::String;

use crate::designer::{ResponseType, VoiceHandle};

/// Errors raised by [`FilterDesigner`](crate::FilterDesigner) and its helpers.
///
/// All of these are surfaced synchronously to the caller of the violating
/// function. Nothing in the per-sample path is retried.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FilterError {
    /// A raw response code outside `0..=6`.
    #[error("unknown filter response code {0} (expected 0..=6)")]
    UnknownResponse(u8),

    /// A response name that does not match any of the seven shapes.
    #[error("unknown filter response '{0}'")]
    UnknownResponseName(String),

    /// A design parameter outside its valid range.
    #[error("invalid filter parameter '{name}': {value}")]
    InvalidParameter {
        /// Parameter name (`sample_rate`, `frequency`, `gain`, `shape`).
        name: &'static str,
        /// Rejected value.
        value: f64,
    },

    /// The parameters are individually valid but yield non-finite coefficients.
    #[error("{response} design at {frequency} Hz produces non-finite coefficients")]
    Unstable {
        /// Response shape that was being designed.
        response: ResponseType,
        /// Design frequency in Hz.
        frequency: f64,
    },

    /// Processing was requested for a voice that holds no state.
    #[error("{0} is not registered with this filter")]
    NotRegistered(VoiceHandle),

    /// A handle names a slot past the voice table limit.
    #[error("{0} is beyond the voice table limit")]
    HandleOutOfRange(VoiceHandle),

    /// A handle's slot already holds a live voice of another generation.
    #[error("slot of {0} holds another live voice")]
    HandleInUse(VoiceHandle),
}
