use thiserror::Error;

/// Failures surfaced by the capture layer.
///
/// Acquisition failures (`AccessDenied`, `NotFound`, `Unsupported`) reject the
/// corresponding `start()` call and must be handled by the caller.
/// `EnumerationFailed` and `PipelineUnavailable` are recoverable: the camera
/// ladder falls back to an unconstrained request and the audio engine falls
/// back to block processing. Hardware revocation of a running stream is not an
/// error at all; controllers observe it through the track's ended signal and
/// reset their own state.
#[derive(Error, Debug)]
pub enum MediaError {
    #[error("media access denied: {0}")]
    AccessDenied(String),

    #[error("device enumeration failed: {0}")]
    EnumerationFailed(String),

    #[error("no matching capture device: {0}")]
    NotFound(String),

    #[error("audio processing pipeline unavailable: {0}")]
    PipelineUnavailable(String),

    #[error("capture source not supported by this backend: {0}")]
    Unsupported(&'static str),
}

/// Failures surfaced by the session transport.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
}
