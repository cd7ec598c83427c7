use thiserror::Error;

/// Errors a recording session can surface to its caller.
///
/// Late fragments after stop and repeated stop calls are deliberate no-ops,
/// not errors; device trouble during an active recording is reported by the
/// capture stream's error callback and ends the fragment flow.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// No capture device, or the platform refused access to it.
    #[error("capture device unavailable: {0}")]
    DeviceUnavailable(String),

    /// A session is already recording or paused in this process.
    #[error("a recording session is already active")]
    SessionActive,
}
