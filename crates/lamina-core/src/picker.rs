//! The picking orchestrator.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::device::{PassKind, PickDevice};
use crate::effect::Effect;
use crate::error::{PickingError, Result};
use crate::info::{
    empty_picking_info, get_layer_picking_info, process_pick_info, LastPickedInfo, PickingInfo,
    ProcessPickParams,
};
use crate::layer::{Layer, ObjectValue, OwnershipTable, PickMode};
use crate::pass::{render_pick_pass, PickExclusions, PickPassParams};
use crate::query::{closest_object, unique_objects, PickedPixel};
use crate::rect::{LogicalRect, Rect};
use crate::targets::PickTargets;
use crate::viewport::Viewport;

/// Options for a pick at a point.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PickByPointOptions {
    /// Logical x of the pick.
    pub x: f32,
    /// Logical y of the pick.
    pub y: f32,
    /// Search radius around the point, in logical pixels.
    pub radius: f32,
    /// How many stacked objects to enumerate at the point.
    pub depth: u32,
    /// The interaction that triggered the pick.
    pub mode: PickMode,
    /// Whether to recover an elevation value via the depth target.
    pub unproject_3d: bool,
}

impl PickByPointOptions {
    /// A single-depth query pick at (x, y).
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            radius: 0.0,
            depth: 1,
            mode: PickMode::default(),
            unproject_3d: false,
        }
    }
}

/// Options for a pick within a rectangle.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PickByRectOptions {
    /// Logical x of the rectangle's top-left corner.
    pub x: f32,
    /// Logical y of the rectangle's top-left corner.
    pub y: f32,
    /// Width in logical pixels.
    pub width: f32,
    /// Height in logical pixels.
    pub height: f32,
    /// The interaction that triggered the pick.
    pub mode: PickMode,
    /// Cap on the number of unique objects returned; `None` collects all.
    pub max_objects: Option<usize>,
}

impl PickByRectOptions {
    /// An uncapped query pick over the given rectangle.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            mode: PickMode::default(),
            max_objects: None,
        }
    }
}

/// Scene state handed to each pick call by the host renderer.
pub struct PickContext<'a> {
    /// All current layers; the picker filters to the pickable leaf set.
    pub layers: &'a [Arc<dyn Layer>],
    /// Active viewports, bottom to top.
    pub viewports: &'a [Arc<dyn Viewport>],
    /// Sub-layer to top-level ownership, built per scene update.
    pub ownership: &'a OwnershipTable,
    /// Invoked before drawing into each viewport.
    pub on_viewport_active: Option<&'a dyn Fn(&dyn Viewport)>,
    /// Registered rendering effects.
    pub effects: &'a [Arc<dyn Effect>],
}

/// Result of a pick at a point.
#[derive(Debug, Clone)]
pub struct PointPick {
    /// Hit entries, front to back across depth iterations.
    pub result: Vec<PickingInfo>,
    /// The background entry of the final iteration; always present so
    /// callers can report pointer position on a miss.
    pub empty_info: PickingInfo,
}

/// Filter applied to layers before each picking pass.
pub type LayerFilter = Box<dyn Fn(&dyn Layer) -> bool + Send + Sync>;

/// Option patch for [`Picker::set_options`]; `None` fields keep the
/// current value.
#[derive(Default)]
pub struct PickerOptions {
    /// Replace the layer filter (`Some(None)` clears it).
    pub layer_filter: Option<Option<LayerFilter>>,
    /// Enable or disable picking globally.
    pub picking_enabled: Option<bool>,
}

/// Stateful picking entry point.
///
/// Owns the offscreen targets and the last-picked state. Pick calls take
/// `&mut self`: picking is synchronous per call and must not be
/// interleaved on one picker.
pub struct Picker {
    device: Arc<dyn PickDevice>,
    targets: PickTargets,
    last_picked: LastPickedInfo,
    layer_filter: Option<LayerFilter>,
    pickable: bool,
}

impl Picker {
    /// Creates a picker over the given device.
    pub fn new(device: Arc<dyn PickDevice>) -> Self {
        Self {
            device,
            targets: PickTargets::new(),
            last_picked: LastPickedInfo::default(),
            layer_filter: None,
            pickable: true,
        }
    }

    /// Applies an option patch.
    pub fn set_options(&mut self, options: PickerOptions) {
        if let Some(filter) = options.layer_filter {
            self.layer_filter = filter;
        }
        if let Some(enabled) = options.picking_enabled {
            self.pickable = enabled;
        }
    }

    /// Identity of the previously picked object.
    pub fn last_picked_info(&self) -> &LastPickedInfo {
        &self.last_picked
    }

    /// Releases the offscreen targets.
    pub fn teardown(&mut self) {
        self.targets.teardown();
    }

    /// The pickable leaf layers for a pass; empty when picking is disabled.
    fn pickable_layers(&self, layers: &[Arc<dyn Layer>]) -> Vec<Arc<dyn Layer>> {
        if !self.pickable {
            return Vec::new();
        }
        layers
            .iter()
            .filter(|layer| layer.is_pickable() && !layer.is_composite())
            .filter(|layer| match &self.layer_filter {
                Some(filter) => filter(layer.as_ref()),
                None => true,
            })
            .cloned()
            .collect()
    }

    /// Picks the closest object at a point, enumerating up to
    /// `opts.depth` stacked objects.
    ///
    /// Returns the accumulated hit entries (front to back) and the final
    /// iteration's background entry. Configuration misses (no pickable
    /// layers, no viewports, focal point outside the surface) yield an
    /// empty result, never an error.
    pub fn pick_object(
        &mut self,
        opts: &PickByPointOptions,
        ctx: &PickContext<'_>,
    ) -> Result<PointPick> {
        let pixel_ratio = self.device.pixel_ratio();
        let pickable = self.pickable_layers(ctx.layers);

        if pickable.is_empty() || ctx.viewports.is_empty() {
            return Ok(PointPick {
                result: Vec::new(),
                empty_info: empty_picking_info(
                    ctx.viewports,
                    &[],
                    opts.x,
                    opts.y,
                    pixel_ratio,
                ),
            });
        }

        let (surface_w, surface_h) = self.device.surface_size();
        self.targets
            .ensure(self.device.as_ref(), surface_w, surface_h)?;

        let footprint = self.device.to_device_pixels(opts.x, opts.y);
        let (device_x, device_y) = footprint.center();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let device_radius = (opts.radius * pixel_ratio).round().max(0.0) as u32;
        let (target_w, target_h) = self
            .targets
            .size()
            .ok_or(PickingError::TargetUnavailable("index target"))?;
        let device_rect =
            Rect::centered_on(device_x, device_y, device_radius, target_w, target_h);
        let cull_rect = LogicalRect::new(
            opts.x - opts.radius,
            opts.y - opts.radius,
            2.0 * opts.radius + 1.0,
            2.0 * opts.radius + 1.0,
        );

        let pass_name = format!("picking:{}", opts.mode.as_str());
        let depth_pass_name = format!("picking:{}:z", opts.mode.as_str());

        let mut exclusions = PickExclusions::new();
        let mut result = Vec::new();
        let mut empty_info = None;

        for iteration in 0..opts.depth.max(1) {
            let picked_pixel = if let Some(rect) = device_rect {
                let target = self
                    .targets
                    .index_target_mut()
                    .ok_or(PickingError::TargetUnavailable("index target"))?;
                let (buffer, decoder) = render_pick_pass(
                    self.device.as_ref(),
                    target.as_mut(),
                    &PickPassParams {
                        kind: PassKind::Index,
                        layers: &pickable,
                        viewports: ctx.viewports,
                        on_viewport_active: ctx.on_viewport_active,
                        target_rect: rect,
                        cull_rect: Some(cull_rect),
                        effects: ctx.effects,
                        pass_name: &pass_name,
                        mode: opts.mode,
                        exclusions: &exclusions,
                    },
                )?;
                let pixels = buffer
                    .as_index()
                    .ok_or(PickingError::TargetUnavailable("index buffer"))?;
                let decoder =
                    decoder.ok_or(PickingError::TargetUnavailable("picking decoder"))?;
                closest_object(pixels, &decoder, device_x, device_y, device_radius, rect)
            } else {
                PickedPixel::background()
            };

            let z = if opts.unproject_3d && picked_pixel.is_hit() && self.targets.has_depth() {
                self.sample_depth(&picked_pixel, ctx, &cull_rect, &depth_pass_name, opts.mode)?
            } else {
                None
            };

            // Exclude the hit only when another iteration will run; the
            // exclusion set dies with this call either way.
            if let Some(layer) = &picked_pixel.picked_layer {
                if iteration + 1 < opts.depth {
                    exclusions.exclude(layer.id(), picked_pixel.picked_object_index);
                }
            }

            // Runs even when nothing was hit: the background entry and the
            // hover transition both depend on it.
            let mut infos = process_pick_info(
                &ProcessPickParams {
                    picked_pixel: &picked_pixel,
                    mode: opts.mode,
                    layers: &pickable,
                    viewports: ctx.viewports,
                    ownership: ctx.ownership,
                    x: opts.x,
                    y: opts.y,
                    z,
                    pixel_ratio,
                },
                &mut self.last_picked,
            );

            empty_info = infos.remove(&None);
            for info in infos.into_values() {
                result.push(info);
            }

            if picked_pixel.picked_color.is_none() {
                break;
            }
        }

        let empty_info = empty_info.unwrap_or_else(|| {
            empty_picking_info(ctx.viewports, &[], opts.x, opts.y, pixel_ratio)
        });
        Ok(PointPick { result, empty_info })
    }

    /// Picks all unique objects within a logical rectangle.
    ///
    /// Returns the deduplicated entries in first-seen order; a rectangle
    /// pick with zero hits returns an empty list (no background entry).
    pub fn pick_objects(
        &mut self,
        opts: &PickByRectOptions,
        ctx: &PickContext<'_>,
    ) -> Result<Vec<PickingInfo>> {
        let pickable = self.pickable_layers(ctx.layers);
        if pickable.is_empty() || ctx.viewports.is_empty() {
            return Ok(Vec::new());
        }

        let (surface_w, surface_h) = self.device.surface_size();
        self.targets
            .ensure(self.device.as_ref(), surface_w, surface_h)?;

        let pixel_ratio = self.device.pixel_ratio();

        // The logical top-left corner maps to the larger device y; span the
        // device rect between the two converted corners.
        let left_top = self.device.to_device_pixels(opts.x, opts.y);
        let device_left = left_top.x;
        let device_top = left_top.y + i64::from(left_top.height);
        let right_bottom = self
            .device
            .to_device_pixels(opts.x + opts.width, opts.y + opts.height);
        let device_right = right_bottom.x + i64::from(right_bottom.width);
        let device_bottom = right_bottom.y;

        let (target_w, target_h) = self
            .targets
            .size()
            .ok_or(PickingError::TargetUnavailable("index target"))?;
        let Some(device_rect) = Rect::clamped(
            device_left,
            device_bottom,
            device_right - device_left,
            device_top - device_bottom,
            target_w,
            target_h,
        ) else {
            return Ok(Vec::new());
        };

        let pass_name = format!("picking:{}", opts.mode.as_str());
        let target = self
            .targets
            .index_target_mut()
            .ok_or(PickingError::TargetUnavailable("index target"))?;
        let (buffer, decoder) = render_pick_pass(
            self.device.as_ref(),
            target.as_mut(),
            &PickPassParams {
                kind: PassKind::Index,
                layers: &pickable,
                viewports: ctx.viewports,
                on_viewport_active: ctx.on_viewport_active,
                target_rect: device_rect,
                cull_rect: Some(LogicalRect::new(opts.x, opts.y, opts.width, opts.height)),
                effects: ctx.effects,
                pass_name: &pass_name,
                mode: opts.mode,
                exclusions: &PickExclusions::new(),
            },
        )?;
        let pixels = buffer
            .as_index()
            .ok_or(PickingError::TargetUnavailable("index buffer"))?;
        let decoder = decoder.ok_or(PickingError::TargetUnavailable("picking decoder"))?;

        let picked = unique_objects(pixels, &decoder);

        // The extraction deduplicates by raw color, but several colors may
        // belong to one data object (a shape's stroke and fill). Dedup a
        // second time on the resolved object, scoped per layer id so two
        // layers' index spaces cannot collide.
        let mut seen: BTreeMap<String, Vec<DedupKey>> = BTreeMap::new();
        let mut unique_infos = Vec::new();

        for pixel in picked {
            if let Some(max) = opts.max_objects {
                if unique_infos.len() >= max {
                    break;
                }
            }
            let Some(layer) = &pixel.picked_layer else {
                continue;
            };
            let base = PickingInfo {
                x: opts.x,
                y: opts.y,
                z: None,
                pixel_ratio,
                coordinate: None,
                viewport_id: None,
                layer: None,
                index: pixel.picked_object_index,
                object: None,
                picked: true,
                color: pixel.picked_color,
            };
            let info = get_layer_picking_info(layer, base, ctx.ownership, opts.mode);
            let Some(layer_id) = info.layer_id().map(str::to_string) else {
                continue;
            };
            let key = match &info.object {
                Some(object) => DedupKey::Object(object.clone()),
                None => DedupKey::Index(info.index),
            };
            let keys = seen.entry(layer_id).or_default();
            if !keys.contains(&key) {
                keys.push(key);
                unique_infos.push(info);
            }
        }

        Ok(unique_infos)
    }

    /// Synthesizes a pick info by assuming the last picked object is still
    /// picked, recomputing `coordinate` and `viewport` for the new point.
    ///
    /// Supports "sticky tooltip follows pointer" interactions without a new
    /// render pass. Returns `None` when nothing has been picked yet.
    pub fn get_last_picked_object(
        &self,
        x: f32,
        y: f32,
        layers: &[Arc<dyn Layer>],
        viewports: &[Arc<dyn Viewport>],
    ) -> Option<PickingInfo> {
        let last = self.last_picked.info.as_ref()?;

        let layer = last
            .layer_id()
            .and_then(|id| layers.iter().find(|l| l.id() == id))
            .cloned()
            .or_else(|| last.layer.clone());

        let viewport = last
            .viewport_id
            .as_ref()
            .and_then(|id| viewports.iter().find(|v| v.id() == id))
            .or_else(|| viewports.first())
            .cloned();

        let coordinate = viewport.as_ref().and_then(|v| {
            let bounds = v.bounds();
            v.unproject(glam::Vec2::new(x - bounds.x, y - bounds.y))
        });

        let mut info = last.clone();
        info.x = x;
        info.y = y;
        info.coordinate = coordinate;
        info.viewport_id = viewport.map(|v| v.id().to_string());
        info.layer = layer;
        Some(info)
    }

    /// Renders the hit layer alone into the depth-value target at the hit
    /// pixel and reads the elevation back.
    fn sample_depth(
        &mut self,
        picked_pixel: &PickedPixel,
        ctx: &PickContext<'_>,
        cull_rect: &LogicalRect,
        pass_name: &str,
        mode: PickMode,
    ) -> Result<Option<f32>> {
        let (Some(layer), Some(x), Some(y)) = (
            picked_pixel.picked_layer.clone(),
            picked_pixel.picked_x,
            picked_pixel.picked_y,
        ) else {
            return Ok(None);
        };

        let target = self
            .targets
            .depth_target_mut()
            .ok_or(PickingError::TargetUnavailable("depth target"))?;
        let hit_layer = [layer];
        let (buffer, _) = render_pick_pass(
            self.device.as_ref(),
            target.as_mut(),
            &PickPassParams {
                kind: PassKind::Depth,
                layers: &hit_layer,
                viewports: ctx.viewports,
                on_viewport_active: ctx.on_viewport_active,
                target_rect: Rect::new(x, y, 1, 1),
                cull_rect: Some(*cull_rect),
                effects: ctx.effects,
                pass_name,
                mode,
                exclusions: &PickExclusions::new(),
            },
        )?;

        let values = buffer
            .as_depth()
            .ok_or(PickingError::TargetUnavailable("depth buffer"))?;
        // A zero fourth channel means the layer did not cover the pixel in
        // the depth pass; the sample is invalid.
        if values.len() == 4 && values[3] != 0.0 {
            Ok(Some(values[0]))
        } else {
            Ok(None)
        }
    }
}

/// Identity key for object-level deduplication within one layer.
#[derive(Debug, Clone, PartialEq)]
enum DedupKey {
    Object(ObjectValue),
    Index(i64),
}
