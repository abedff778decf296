//! Rendering error types for the wgpu picking backend.

use lamina_core::PickingError;
use thiserror::Error;

/// Errors that can occur in the wgpu picking backend.
#[derive(Error, Debug)]
pub enum RenderError {
    /// A pass encoder of an unexpected backend type was supplied.
    #[error("foreign pass encoder: expected a wgpu pick pass")]
    ForeignEncoder,

    /// A pick target of an unexpected backend type was supplied.
    #[error("foreign pick target: expected a wgpu pick target")]
    ForeignTarget,

    /// Mapping the readback staging buffer failed.
    #[error("staging buffer mapping failed: {0}")]
    BufferMapFailed(String),

    /// The readback channel closed before the map callback fired.
    #[error("readback interrupted before completion")]
    ReadbackInterrupted,
}

/// A specialized Result type for backend operations.
pub type RenderResult<T> = std::result::Result<T, RenderError>;

impl From<RenderError> for PickingError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::ForeignEncoder | RenderError::ForeignTarget => {
                PickingError::Render(err.to_string())
            }
            RenderError::BufferMapFailed(_) | RenderError::ReadbackInterrupted => {
                PickingError::Readback(err.to_string())
            }
        }
    }
}
