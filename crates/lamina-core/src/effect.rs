//! Rendering effects that participate in picking passes.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use crate::device::PassKind;
use crate::rect::Rect;
use crate::viewport::Viewport;

/// Per-effect state produced during pre-render, keyed by effect id and
/// consumed by the draw step of the same pass.
pub type PreRenderStats = HashMap<String, Box<dyn Any + Send + Sync>>;

/// Parameters handed to an effect before a picking draw.
pub struct EffectPassParams<'a> {
    /// Pass label, e.g. `picking:hover`.
    pub pass_name: &'a str,
    /// Which picking pass is about to run.
    pub kind: PassKind,
    /// Target sub-rectangle in device pixels.
    pub target_rect: Rect,
    /// Active viewports for the pass.
    pub viewports: &'a [Arc<dyn Viewport>],
}

/// A rendering effect registered with the host renderer.
///
/// Effects that opt in via [`use_in_picking`](Self::use_in_picking) get a
/// pre-render callback before every picking draw and may hand state to the
/// layers through the pass's [`PreRenderStats`].
pub trait Effect: Send + Sync {
    /// Unique identifier of this effect.
    fn id(&self) -> &str;

    /// Whether this effect participates in picking passes.
    fn use_in_picking(&self) -> bool {
        false
    }

    /// Runs before the picking draw; the returned state is stored under
    /// this effect's id.
    fn pre_render(&self, _params: &EffectPassParams<'_>) -> Option<Box<dyn Any + Send + Sync>> {
        None
    }
}
