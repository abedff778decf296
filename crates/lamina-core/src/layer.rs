//! Layer trait and related types.
//!
//! A [`Layer`] is an opaque renderable unit supplied by the host renderer.
//! The picking core never inspects layer geometry; it only asks a layer to
//! draw its picking colors into the active pass and to translate a raw
//! picking index back into a data-level result.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::device::PassEncoder;
use crate::effect::PreRenderStats;
use crate::error::Result;
use crate::rect::{LogicalRect, Rect};
use crate::viewport::Viewport;

/// Opaque data record attached to a picked object.
pub type ObjectValue = serde_json::Value;

/// The interaction that triggered a pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PickMode {
    /// Pointer moved; drives hover tracking and auto-highlight.
    Hover,
    /// Pointer pressed.
    Click,
    /// Programmatic query.
    Query,
}

impl PickMode {
    /// Short name used to label picking passes.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hover => "hover",
            Self::Click => "click",
            Self::Query => "query",
        }
    }
}

impl Default for PickMode {
    fn default() -> Self {
        Self::Query
    }
}

/// Result of a layer translating a raw picking index into data-level info.
///
/// `index` echoes the raw index by default but layers with indirect data
/// sources may reformat it (e.g. map a primitive index to a feature index).
/// A `None` object means the layer's data source is not indexable.
#[derive(Debug, Clone, Default)]
pub struct LayerPickingInfo {
    /// The underlying data record for the picked object, if resolvable.
    pub object: Option<ObjectValue>,
    /// The layer-formatted object index.
    pub index: i64,
    /// Optional color override for the resolved result.
    pub color: Option<[u8; 4]>,
}

/// Auto-highlight state change delivered to a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightChange {
    /// The layer's highlighted object is no longer hovered.
    Cleared,
    /// The given object is now hovered.
    Active {
        /// Object index within the layer.
        object_index: i64,
        /// The raw picking color of the hovered object.
        color: [u8; 4],
    },
}

/// Per-layer parameters for one picking draw.
pub struct LayerDrawContext<'a> {
    /// Color slot assigned to this layer for the current pass (1-based in
    /// the encoded alpha channel; see [`crate::color::encode_picking_color`]).
    pub slot: u8,
    /// The viewport currently being drawn.
    pub viewport: &'a dyn Viewport,
    /// Target sub-rectangle of the pass, in device pixels.
    pub target_rect: Rect,
    /// Logical-space rectangle for early object-level culling.
    pub cull_rect: Option<LogicalRect>,
    /// Object indices of this layer to skip for this pass.
    ///
    /// Owned by the orchestrator for the duration of one pick call; layers
    /// must not retain it.
    pub excluded: Option<&'a BTreeSet<i64>>,
    /// The interaction mode of the pick.
    pub mode: PickMode,
    /// Pass label, e.g. `picking:hover` or `picking:query:z`.
    pub pass_name: &'a str,
    /// Per-effect state produced by effects that opted into this pass.
    pub pre_render_stats: &'a PreRenderStats,
}

/// An opaque renderable unit that can participate in picking.
pub trait Layer: Send + Sync {
    /// Unique identifier of this layer.
    fn id(&self) -> &str;

    /// Whether this layer participates in picking at all.
    fn is_pickable(&self) -> bool {
        true
    }

    /// Whether this layer only composes sub-layers.
    ///
    /// Composite layers are excluded from direct picking; only their
    /// sub-layers draw picking colors.
    fn is_composite(&self) -> bool {
        false
    }

    /// Whether this layer opted into automatic hover highlighting.
    fn auto_highlight(&self) -> bool {
        false
    }

    /// Translates a raw picking index into a data-level result.
    ///
    /// Called with `object_index = -1` when resolving a "nothing hit" or
    /// "no longer hovered" entry; implementations should return an empty
    /// result in that case.
    fn picking_info(&self, object_index: i64, mode: PickMode) -> LayerPickingInfo;

    /// Notification of an auto-highlight state change.
    ///
    /// Only delivered to layers that return `true` from
    /// [`auto_highlight`](Self::auto_highlight).
    fn update_highlight(&self, _change: &HighlightChange) {}

    /// Draws this layer's picking colors into the active pass.
    ///
    /// The encoder is backend-specific; implementations downcast it through
    /// [`PassEncoder::as_any_mut`]. Colors must be produced with
    /// [`crate::color::encode_picking_color`] using `ctx.slot`, and indices
    /// in `ctx.excluded` must not be drawn.
    fn draw_picking(&self, encoder: &mut dyn PassEncoder, ctx: &LayerDrawContext<'_>)
        -> Result<()>;
}

/// Ownership table resolving sub-layers to their top-level owning layer.
///
/// Built once per scene update by the layer-management collaborator and
/// queried by the picking core; replaces dynamic parent lookups. Layers not
/// present in the table are their own owner.
#[derive(Default, Clone)]
pub struct OwnershipTable {
    owners: HashMap<String, Arc<dyn Layer>>,
}

impl OwnershipTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `sub_layer_id` is drawn on behalf of `owner`.
    pub fn insert(&mut self, sub_layer_id: impl Into<String>, owner: Arc<dyn Layer>) {
        self.owners.insert(sub_layer_id.into(), owner);
    }

    /// Resolves the top-level layer owning `layer`.
    pub fn resolve_owner(&self, layer: &Arc<dyn Layer>) -> Arc<dyn Layer> {
        self.owners
            .get(layer.id())
            .cloned()
            .unwrap_or_else(|| Arc::clone(layer))
    }

    /// Number of sub-layer entries.
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}
