//! Core abstractions for lamina.
//!
//! This crate provides the GPU-picking core for layered scene renderers:
//! - [`color`]: the picking color codec (object identity as color)
//! - [`Layer`], [`Viewport`], [`PickDevice`] traits for the host renderer
//! - [`query`]: closest/unique object extraction from sampled pixels
//! - [`info`]: structured pick info resolution and hover transitions
//! - [`Picker`]: the stateful orchestrator (point, rectangle, and
//!   last-pick queries)
//!
//! The core never talks to a GPU directly; the `lamina-render` crate
//! implements the device contract over wgpu.

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Builder patterns return Self which doesn't need must_use
#![allow(clippy::must_use_candidate)]

pub mod color;
pub mod device;
pub mod effect;
pub mod error;
pub mod info;
pub mod layer;
pub mod pass;
pub mod picker;
pub mod query;
pub mod rect;
pub mod targets;
pub mod viewport;

pub use color::{
    decode_object_index, encode_picking_color, DecodedPixel, DecoderEntry, PickingDecoder,
    MAX_LAYER_SLOTS, MAX_OBJECT_INDEX, NO_PICK_COLOR,
};
pub use device::{DevicePixelRange, PassEncoder, PassKind, PickDevice, PickTarget, PixelBuffer};
pub use effect::{Effect, EffectPassParams, PreRenderStats};
pub use error::{PickingError, Result};
pub use info::{
    empty_picking_info, get_layer_picking_info, process_pick_info, LastPickedInfo, PickingInfo,
    ProcessPickParams,
};
pub use layer::{
    HighlightChange, Layer, LayerDrawContext, LayerPickingInfo, ObjectValue, OwnershipTable,
    PickMode,
};
pub use pass::{render_pick_pass, PickExclusions, PickPassParams};
pub use picker::{
    LayerFilter, PickByPointOptions, PickByRectOptions, PickContext, Picker, PickerOptions,
    PointPick,
};
pub use query::{closest_object, unique_objects, PickedPixel};
pub use rect::{LogicalRect, Rect};
pub use targets::PickTargets;
pub use viewport::{viewport_for_point, Viewport};

// Re-export glam types for convenience
pub use glam::{Vec2, Vec3};
