//! Device and target contracts consumed by the picking core.
//!
//! The core never talks to a GPU directly; it drives these traits. The wgpu
//! implementation lives in the `lamina-render` crate, and the test suite
//! substitutes a CPU device behind the same seam.

use std::any::Any;

use crate::error::Result;
use crate::rect::Rect;

/// Which of the two picking passes a target or sample belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    /// Object-identity pass: 8-bit-per-channel index colors.
    Index,
    /// Depth/elevation-value pass: full-precision float channels.
    Depth,
}

/// Raw pixels read back from a pick target.
///
/// Always exactly `rect.width * rect.height * 4` channel values, rows
/// bottom-up in device order.
#[derive(Debug, Clone, PartialEq)]
pub enum PixelBuffer {
    /// 8-bit RGBA values from the index pass.
    Index(Vec<u8>),
    /// f32 RGBA values from the depth pass.
    Depth(Vec<f32>),
}

impl PixelBuffer {
    /// Number of channel values in the buffer.
    pub fn len(&self) -> usize {
        match self {
            Self::Index(v) => v.len(),
            Self::Depth(v) => v.len(),
        }
    }

    /// Whether the buffer holds no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The index-pass bytes, if this is an index buffer.
    pub fn as_index(&self) -> Option<&[u8]> {
        match self {
            Self::Index(v) => Some(v),
            Self::Depth(_) => None,
        }
    }

    /// The depth-pass floats, if this is a depth buffer.
    pub fn as_depth(&self) -> Option<&[f32]> {
        match self {
            Self::Depth(v) => Some(v),
            Self::Index(_) => None,
        }
    }
}

/// The device-pixel footprint of one logical coordinate.
///
/// `y` is in the render target's bottom-left convention; the logical top
/// edge maps to the larger device-space vertical coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DevicePixelRange {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

impl DevicePixelRange {
    /// Center device pixel of the footprint.
    pub fn center(&self) -> (i64, i64) {
        (
            self.x + i64::from(self.width / 2),
            self.y + i64::from(self.height / 2),
        )
    }
}

/// An offscreen render target owned by the picking orchestrator.
pub trait PickTarget: Send + Sync {
    /// Current size in device pixels.
    fn size(&self) -> (u32, u32);

    /// Returns self as `Any` for backend downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Returns self as mutable `Any` for backend downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// An in-progress picking render pass.
///
/// Backend-specific; layers downcast it to the concrete encoder type.
pub trait PassEncoder {
    /// Returns self as `Any` for backend downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Returns self as mutable `Any` for backend downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Device capabilities consumed by the picking core.
pub trait PickDevice: Send + Sync {
    /// Current drawable surface size in device pixels.
    fn surface_size(&self) -> (u32, u32);

    /// Ratio of device pixels to logical pixels.
    fn pixel_ratio(&self) -> f32;

    /// Whether the device can render to a full-precision float target.
    ///
    /// Queried once per session; a `false` silently disables 3D-depth
    /// unprojection.
    fn supports_float_picking(&self) -> bool;

    /// Creates an offscreen target for the given pass kind, sized to the
    /// current surface.
    fn create_target(&self, kind: PassKind) -> Result<Box<dyn PickTarget>>;

    /// Resizes a target. Must be cheap and idempotent when the size is
    /// unchanged.
    fn resize_target(&self, target: &mut dyn PickTarget, width: u32, height: u32) -> Result<()>;

    /// Begins a picking pass over `target_rect`; the target must read back
    /// as background (all-zero) wherever nothing draws.
    fn begin_pick_pass(
        &self,
        target: &mut dyn PickTarget,
        kind: PassKind,
        target_rect: Rect,
    ) -> Result<Box<dyn PassEncoder>>;

    /// Finishes a pass begun with [`begin_pick_pass`](Self::begin_pick_pass)
    /// and submits it. Blocks until the device has produced pixels.
    fn end_pick_pass(
        &self,
        target: &mut dyn PickTarget,
        encoder: Box<dyn PassEncoder>,
    ) -> Result<()>;

    /// Converts a logical coordinate to its device-pixel footprint,
    /// flipping to the render target's bottom-left convention.
    fn to_device_pixels(&self, x: f32, y: f32) -> DevicePixelRange;

    /// Reads back exactly `rect.width * rect.height * 4` channel values
    /// from a target, rows bottom-up.
    fn read_pixels(&self, target: &dyn PickTarget, rect: Rect, kind: PassKind)
        -> Result<PixelBuffer>;
}
