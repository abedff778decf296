//! Resolution of raw picked pixels into structured per-layer pick info.

use std::collections::BTreeMap;
use std::sync::Arc;

use glam::{Vec2, Vec3};

use crate::layer::{HighlightChange, Layer, ObjectValue, OwnershipTable, PickMode};
use crate::query::PickedPixel;
use crate::viewport::{viewport_for_point, Viewport};

/// Structured result of one pick event, per layer.
///
/// For composite layers `layer` and `object` are resolved to the top-level
/// owning layer and its underlying data record.
#[derive(Clone)]
pub struct PickingInfo {
    /// Logical x of the pick.
    pub x: f32,
    /// Logical y of the pick.
    pub y: f32,
    /// Elevation value from the depth sample, when taken and valid.
    pub z: Option<f32>,
    /// Device-to-logical pixel ratio at pick time.
    pub pixel_ratio: f32,
    /// World coordinate of the pick point, via the resolved viewport.
    pub coordinate: Option<Vec3>,
    /// Id of the viewport the pick resolved against.
    pub viewport_id: Option<String>,
    /// The (top-level) layer this entry belongs to; `None` for the
    /// background entry.
    pub layer: Option<Arc<dyn Layer>>,
    /// Resolved object index; `-1` when nothing was picked.
    pub index: i64,
    /// The underlying data record, when the layer's data is indexable.
    pub object: Option<ObjectValue>,
    /// Whether this entry represents an actual hit.
    pub picked: bool,
    /// Raw picking color of the hit.
    pub color: Option<[u8; 4]>,
}

impl PickingInfo {
    /// Id of the layer this entry belongs to, if any.
    pub fn layer_id(&self) -> Option<&str> {
        self.layer.as_deref().map(Layer::id)
    }
}

impl std::fmt::Debug for PickingInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PickingInfo")
            .field("x", &self.x)
            .field("y", &self.y)
            .field("z", &self.z)
            .field("pixel_ratio", &self.pixel_ratio)
            .field("coordinate", &self.coordinate)
            .field("viewport_id", &self.viewport_id)
            .field("layer", &self.layer_id())
            .field("index", &self.index)
            .field("object", &self.object)
            .field("picked", &self.picked)
            .field("color", &self.color)
            .finish()
    }
}

/// Identity of the previously picked object.
///
/// Lives as long as the orchestrator; overwritten (never accumulated) on
/// every pick, and used to detect hover transitions.
#[derive(Debug, Clone)]
pub struct LastPickedInfo {
    /// Raw object index of the previous hit; `-1` when it was a miss.
    pub index: i64,
    /// Id of the layer that drew the previous hit (the sub-layer for
    /// composites), `None` for a miss.
    pub layer_id: Option<String>,
    /// The resolved info of the previous hit.
    pub info: Option<PickingInfo>,
}

impl Default for LastPickedInfo {
    fn default() -> Self {
        Self {
            index: -1,
            layer_id: None,
            info: None,
        }
    }
}

/// Inputs to [`process_pick_info`].
pub struct ProcessPickParams<'a> {
    /// Raw decode result of the sample.
    pub picked_pixel: &'a PickedPixel,
    /// The interaction mode of the pick.
    pub mode: PickMode,
    /// The pickable leaf layers of the current pass.
    pub layers: &'a [Arc<dyn Layer>],
    /// Active viewports.
    pub viewports: &'a [Arc<dyn Viewport>],
    /// Sub-layer to top-level ownership, built per scene update.
    pub ownership: &'a OwnershipTable,
    /// Logical x of the pick.
    pub x: f32,
    /// Logical y of the pick.
    pub y: f32,
    /// Elevation from the depth sample, when taken and valid.
    pub z: Option<f32>,
    /// Device-to-logical pixel ratio.
    pub pixel_ratio: f32,
}

/// The background ("nothing hit") info for a pick at (x, y).
///
/// Callers use it to report pointer position even when no object is under
/// the pointer.
pub fn empty_picking_info(
    viewports: &[Arc<dyn Viewport>],
    restrict: &[String],
    x: f32,
    y: f32,
    pixel_ratio: f32,
) -> PickingInfo {
    let viewport = viewport_for_point(viewports, restrict, x, y);
    let coordinate = viewport.as_ref().and_then(|v| {
        let bounds = v.bounds();
        v.unproject(Vec2::new(x - bounds.x, y - bounds.y))
    });
    PickingInfo {
        x,
        y,
        z: None,
        pixel_ratio,
        coordinate,
        viewport_id: viewport.map(|v| v.id().to_string()),
        layer: None,
        index: -1,
        object: None,
        picked: false,
        color: None,
    }
}

/// Merges a layer's own translation of the raw index into a base info.
///
/// Resolves composite ownership first, so the returned entry carries the
/// top-level layer and its data record.
pub fn get_layer_picking_info(
    layer: &Arc<dyn Layer>,
    mut info: PickingInfo,
    ownership: &OwnershipTable,
    mode: PickMode,
) -> PickingInfo {
    let owner = ownership.resolve_owner(layer);
    let resolved = owner.picking_info(info.index, mode);
    info.index = resolved.index;
    info.object = resolved.object;
    if let Some(color) = resolved.color {
        info.color = Some(color);
    }
    info.layer = Some(owner);
    info
}

/// Resolves one pick sample into per-layer info entries and applies the
/// highlight-transition policy.
///
/// The returned mapping always contains a `None`-keyed background entry,
/// plus one entry per affected layer keyed by its top-level id: the hit
/// layer, and the previously hit layer when the hit changed. A mapping
/// (not a sequence) guarantees a single entry per layer id.
///
/// `last_picked` is always overwritten with the new `(index, layer_id,
/// info)`, even on a miss.
pub fn process_pick_info(
    params: &ProcessPickParams<'_>,
    last_picked: &mut LastPickedInfo,
) -> BTreeMap<Option<String>, PickingInfo> {
    let picked_pixel = params.picked_pixel;
    let picked_layer = picked_pixel.picked_layer.clone();
    let picked_index = picked_pixel.picked_object_index;
    let picked_layer_id = picked_layer.as_ref().map(|l| l.id().to_string());

    // Layers contributing an entry this round: the hit layer, plus the
    // previously hit layer when the hit moved elsewhere.
    let mut affected: Vec<(Arc<dyn Layer>, bool)> = Vec::new();
    if let Some(layer) = &picked_layer {
        affected.push((Arc::clone(layer), true));
    }

    // Hover transitions: only pointer-hover picks move the highlight; a
    // programmatic query at another point must not clear it.
    let transition = params.mode == PickMode::Hover
        && (picked_layer_id != last_picked.layer_id || picked_index != last_picked.index);
    let mut previous_layer: Option<Arc<dyn Layer>> = None;
    if transition {
        if let Some(prev_id) = &last_picked.layer_id {
            if Some(prev_id) != picked_layer_id.as_ref() {
                if let Some(prev) = params.layers.iter().find(|l| l.id() == prev_id) {
                    affected.push((Arc::clone(prev), false));
                    previous_layer = Some(Arc::clone(prev));
                }
            }
        }
    }

    last_picked.index = picked_index;
    last_picked.layer_id = picked_layer_id;
    last_picked.info = None;

    let base = empty_picking_info(
        params.viewports,
        &picked_pixel.picked_viewports,
        params.x,
        params.y,
        params.pixel_ratio,
    );

    let mut infos: BTreeMap<Option<String>, PickingInfo> = BTreeMap::new();
    infos.insert(None, base.clone());

    for (layer, is_hit) in &affected {
        let mut info = base.clone();
        if *is_hit {
            info.color = picked_pixel.picked_color;
            info.index = picked_index;
            info.picked = true;
            info.z = params.z;
        }
        let info = get_layer_picking_info(layer, info, params.ownership, params.mode);
        if *is_hit {
            last_picked.info = Some(info.clone());
        }
        if let Some(id) = info.layer_id() {
            infos.insert(Some(id.to_string()), info);
        }
    }

    if transition {
        if let Some(prev) = &previous_layer {
            if prev.auto_highlight() {
                prev.update_highlight(&HighlightChange::Cleared);
            }
        }
        match (&picked_layer, picked_pixel.picked_color) {
            (Some(layer), Some(color)) if layer.auto_highlight() => {
                layer.update_highlight(&HighlightChange::Active {
                    object_index: picked_index,
                    color,
                });
            }
            (Some(layer), _) if layer.auto_highlight() => {
                layer.update_highlight(&HighlightChange::Cleared);
            }
            _ => {}
        }
    }

    infos
}
