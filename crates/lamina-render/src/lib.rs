//! wgpu backend for lamina.
//!
//! Implements the picking device contract from `lamina-core` over wgpu:
//! offscreen Rgba8Unorm index targets and Rgba32Float depth-value targets,
//! clear-to-background pass setup, and aligned staging-buffer readback.
//!
//! Layers draw by downcasting the pass encoder to [`WgpuPassEncoder`] and
//! recording into its render pass with their own picking pipelines.

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]

pub mod device;
pub mod error;
pub mod targets;

pub use device::{WgpuPassEncoder, WgpuPickDevice};
pub use error::{RenderError, RenderResult};
pub use targets::{WgpuPickTarget, DEPTH_FORMAT, DEPTH_VALUE_FORMAT, INDEX_FORMAT};
