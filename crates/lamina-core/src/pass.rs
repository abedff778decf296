//! The picking render pass: draw layers with identity colors, read back.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::color::{DecoderEntry, PickingDecoder, MAX_LAYER_SLOTS};
use crate::device::{PassKind, PickDevice, PickTarget, PixelBuffer};
use crate::effect::{Effect, EffectPassParams, PreRenderStats};
use crate::error::{PickingError, Result};
use crate::layer::{Layer, LayerDrawContext, PickMode};
use crate::rect::{LogicalRect, Rect};
use crate::viewport::Viewport;

/// Object indices excluded from a picking pass, per layer.
///
/// Owned by the orchestrator for the duration of one pick call and passed
/// into each draw by reference; layers are never mutated, so exclusion
/// state cannot leak past the call, not even on an error return.
#[derive(Debug, Default, Clone)]
pub struct PickExclusions {
    by_layer: BTreeMap<String, BTreeSet<i64>>,
}

impl PickExclusions {
    /// Creates an empty exclusion set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Excludes one object of one layer from subsequent passes.
    pub fn exclude(&mut self, layer_id: &str, object_index: i64) {
        self.by_layer
            .entry(layer_id.to_string())
            .or_default()
            .insert(object_index);
    }

    /// The excluded indices for a layer, if any.
    pub fn for_layer(&self, layer_id: &str) -> Option<&BTreeSet<i64>> {
        self.by_layer.get(layer_id)
    }

    /// Whether an object is currently excluded.
    pub fn is_excluded(&self, layer_id: &str, object_index: i64) -> bool {
        self.by_layer
            .get(layer_id)
            .is_some_and(|set| set.contains(&object_index))
    }

    /// Whether nothing is excluded.
    pub fn is_empty(&self) -> bool {
        self.by_layer.is_empty()
    }
}

/// Parameters for one picking render-and-sample round trip.
pub struct PickPassParams<'a> {
    /// Index or depth pass; selects the target and the pixel numeric type.
    pub kind: PassKind,
    /// Layers to draw, already filtered to the pickable leaf set.
    pub layers: &'a [Arc<dyn Layer>],
    /// Active viewports; every layer is drawn once per viewport.
    pub viewports: &'a [Arc<dyn Viewport>],
    /// Invoked before drawing into each viewport.
    pub on_viewport_active: Option<&'a dyn Fn(&dyn Viewport)>,
    /// Sub-rectangle of the target to draw and read, in device pixels.
    pub target_rect: Rect,
    /// Logical-space rectangle for early object-level culling.
    pub cull_rect: Option<LogicalRect>,
    /// Registered rendering effects; only those opting into picking run.
    pub effects: &'a [Arc<dyn Effect>],
    /// Pass label, e.g. `picking:hover` or `picking:query:z`.
    pub pass_name: &'a str,
    /// The interaction mode of the pick.
    pub mode: PickMode,
    /// Objects to leave out of this pass.
    pub exclusions: &'a PickExclusions,
}

/// Draws the given layers into the pick target restricted to
/// `params.target_rect` and reads the covered pixels back.
///
/// Each layer is assigned a 1-based color slot; the returned decoder maps
/// sampled colors back to layers for the index pass (`None` for the depth
/// pass, whose samples carry values, not identities). Mutates offscreen
/// state only.
pub fn render_pick_pass(
    device: &dyn PickDevice,
    target: &mut dyn PickTarget,
    params: &PickPassParams<'_>,
) -> Result<(PixelBuffer, Option<PickingDecoder>)> {
    if params.layers.len() > MAX_LAYER_SLOTS {
        return Err(PickingError::SlotOverflow(params.layers.len()));
    }

    let mut pre_render_stats = PreRenderStats::new();
    for effect in params.effects {
        if !effect.use_in_picking() {
            continue;
        }
        let effect_params = EffectPassParams {
            pass_name: params.pass_name,
            kind: params.kind,
            target_rect: params.target_rect,
            viewports: params.viewports,
        };
        if let Some(state) = effect.pre_render(&effect_params) {
            pre_render_stats.insert(effect.id().to_string(), state);
        }
    }

    let viewport_ids: Vec<String> = params
        .viewports
        .iter()
        .map(|v| v.id().to_string())
        .collect();

    let mut encoder = device.begin_pick_pass(target, params.kind, params.target_rect)?;
    for viewport in params.viewports {
        if let Some(on_active) = params.on_viewport_active {
            on_active(viewport.as_ref());
        }
        for (i, layer) in params.layers.iter().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            let ctx = LayerDrawContext {
                slot: i as u8,
                viewport: viewport.as_ref(),
                target_rect: params.target_rect,
                cull_rect: params.cull_rect,
                excluded: params.exclusions.for_layer(layer.id()),
                mode: params.mode,
                pass_name: params.pass_name,
                pre_render_stats: &pre_render_stats,
            };
            layer.draw_picking(encoder.as_mut(), &ctx)?;
        }
    }
    device.end_pick_pass(target, encoder)?;

    let buffer = device.read_pixels(target, params.target_rect, params.kind)?;
    let expected = params.target_rect.area() * 4;
    if buffer.len() != expected {
        return Err(PickingError::SizeMismatch {
            expected,
            actual: buffer.len(),
        });
    }

    let decoder = match params.kind {
        PassKind::Index => Some(PickingDecoder::new(
            params
                .layers
                .iter()
                .map(|layer| DecoderEntry {
                    layer: Arc::clone(layer),
                    viewport_ids: viewport_ids.clone(),
                })
                .collect(),
        )),
        PassKind::Depth => None,
    };

    Ok((buffer, decoder))
}
