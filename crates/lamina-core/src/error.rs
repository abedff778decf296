//! Error types for lamina picking operations.

use thiserror::Error;

/// The main error type for picking operations.
#[derive(Error, Debug)]
pub enum PickingError {
    /// The picking render pass failed on the device.
    #[error("picking render pass failed: {0}")]
    Render(String),

    /// Reading pixels back from an offscreen target failed.
    #[error("pixel readback failed: {0}")]
    Readback(String),

    /// A required offscreen target does not exist.
    #[error("pick target unavailable: {0}")]
    TargetUnavailable(&'static str),

    /// More pickable layers than the color codec can discriminate in one pass.
    #[error("too many pickable layers for one pass: {0} (max 255)")]
    SlotOverflow(usize),

    /// The readback buffer did not match the requested rectangle.
    #[error("readback size mismatch: expected {expected} values, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
}

/// A specialized Result type for picking operations.
pub type Result<T> = std::result::Result<T, PickingError>;
