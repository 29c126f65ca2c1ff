// ---------------------------------------------------------------------------
// DeformationError: typed errors for field setup and per-frame updates
// ---------------------------------------------------------------------------

use std::fmt;

use crate::orchestrator::FieldPhase;

/// Errors that can occur while setting up or updating the deformation field.
///
/// `Configuration` and `ResourceExhaustion` are fatal and only occur at
/// initialization. `CaptureUnavailable` is recoverable: the frame's update is
/// skipped and the previously published field stays in place.
/// `TemporalAnomaly` never leaves the kernel; it exists so the anomaly can be
/// described in logs.
#[derive(Debug, Clone, PartialEq)]
pub enum DeformationError {
    /// Invalid resolution, extent, accumulation settings, or mismatched buffer sizes.
    Configuration(String),
    /// No snapshot could be produced this frame (no anchor, backend not ready,
    /// capture failed or timed out).
    CaptureUnavailable(String),
    /// Negative, zero, or non-finite delta time handed to the kernel.
    TemporalAnomaly { delta_time: f32 },
    /// Allocating a field buffer failed.
    ResourceExhaustion { texels: usize },
    /// A field operation was invoked in a phase that does not allow it.
    InvalidPhase {
        operation: &'static str,
        phase: FieldPhase,
    },
}

impl DeformationError {
    /// Fatal errors abort startup; everything else degrades to "field unchanged".
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DeformationError::Configuration(_) | DeformationError::ResourceExhaustion { .. }
        )
    }
}

impl fmt::Display for DeformationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeformationError::Configuration(msg) => write!(f, "Configuration error: {msg}"),
            DeformationError::CaptureUnavailable(msg) => write!(f, "Capture unavailable: {msg}"),
            DeformationError::TemporalAnomaly { delta_time } => {
                write!(f, "Temporal anomaly: delta time {delta_time} treated as a pause")
            }
            DeformationError::ResourceExhaustion { texels } => {
                write!(f, "Resource exhaustion: could not allocate {texels} texels")
            }
            DeformationError::InvalidPhase { operation, phase } => {
                write!(f, "Cannot {operation} while the field is {phase:?}")
            }
        }
    }
}

impl std::error::Error for DeformationError {}
