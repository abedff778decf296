//! GPU object picking for layered scene renderers.
//!
//! Given a screen coordinate (or rectangle) and a set of renderable
//! layers, lamina determines which rendered objects lie at that location,
//! across one or more overlapping viewports, without CPU-side geometric
//! hit-testing. Layers draw object identities as colors into an offscreen
//! target; lamina reads the pixels back and resolves structured hit
//! information, tracking hover state and auto-highlight transitions,
//! enumerating occluded objects at a point, and deduplicating
//! multi-primitive objects in rectangle queries.
//!
//! The [`Picker`] is the entry point:
//!
//! - [`Picker::pick_object`]: closest object at a point, optionally
//!   iterating through `depth` stacked objects
//! - [`Picker::pick_objects`]: all unique objects within a rectangle
//! - [`Picker::get_last_picked_object`]: re-derive the previous pick's
//!   info at a new pointer position, without a render pass
//!
//! The picking core is device-agnostic; the wgpu backend lives in
//! `lamina-render` and is re-exported here.

pub use lamina_core::*;

pub use lamina_render::{
    RenderError, RenderResult, WgpuPassEncoder, WgpuPickDevice, WgpuPickTarget, DEPTH_FORMAT,
    DEPTH_VALUE_FORMAT, INDEX_FORMAT,
};
