//! CPU mock of the picking device contract.
//!
//! Renders mock layer footprints into a CPU framebuffer through the same
//! trait seam the wgpu backend uses, so the whole picking pipeline can be
//! exercised without a GPU. Occlusion is modeled with a per-pixel depth
//! value; smaller z wins, like the real depth test.

#![allow(dead_code)]

use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use glam::{Vec2, Vec3};
use lamina::{
    encode_picking_color, DevicePixelRange, Effect, EffectPassParams, HighlightChange, Layer,
    LayerDrawContext, LayerPickingInfo, LogicalRect, ObjectValue, OwnershipTable, PassEncoder,
    PassKind, PickContext, PickDevice, PickMode, PickTarget, PickingError, PixelBuffer, Rect,
    Result, Viewport,
};

/// CPU pick target: full-surface pixel storage, rows bottom-up.
pub struct MockTarget {
    kind: PassKind,
    width: u32,
    height: u32,
    colors: Vec<[u8; 4]>,
    values: Vec<[f32; 4]>,
}

impl MockTarget {
    fn new(kind: PassKind, width: u32, height: u32) -> Self {
        let area = width as usize * height as usize;
        Self {
            kind,
            width,
            height,
            colors: vec![[0; 4]; area],
            values: vec![[0.0; 4]; area],
        }
    }

    fn pixel_index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

impl PickTarget for MockTarget {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// CPU pass encoder: a cleared, depth-tested scratch region covering the
/// pass rectangle, blitted into the target when the pass ends.
pub struct MockEncoder {
    pub kind: PassKind,
    rect: Rect,
    colors: Vec<[u8; 4]>,
    values: Vec<[f32; 4]>,
    depth: Vec<f32>,
}

impl MockEncoder {
    fn new(kind: PassKind, rect: Rect) -> Self {
        Self {
            kind,
            rect,
            colors: vec![[0; 4]; rect.area()],
            values: vec![[0.0; 4]; rect.area()],
            depth: vec![f32::INFINITY; rect.area()],
        }
    }

    fn local_index(&self, x: u32, y: u32) -> Option<usize> {
        self.rect.contains(x, y).then(|| {
            (y - self.rect.y) as usize * self.rect.width as usize + (x - self.rect.x) as usize
        })
    }

    /// Writes an identity color at a device pixel, depth-tested.
    pub fn draw_index_pixel(&mut self, x: u32, y: u32, z: f32, color: [u8; 4]) {
        if self.kind != PassKind::Index {
            return;
        }
        if let Some(i) = self.local_index(x, y) {
            if z < self.depth[i] {
                self.depth[i] = z;
                self.colors[i] = color;
            }
        }
    }

    /// Writes a float value at a device pixel, depth-tested.
    pub fn draw_value_pixel(&mut self, x: u32, y: u32, z: f32, value: [f32; 4]) {
        if self.kind != PassKind::Depth {
            return;
        }
        if let Some(i) = self.local_index(x, y) {
            if z < self.depth[i] {
                self.depth[i] = z;
                self.values[i] = value;
            }
        }
    }
}

impl PassEncoder for MockEncoder {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// CPU picking device.
pub struct MockDevice {
    width: u32,
    height: u32,
    pixel_ratio: f32,
    float_support: bool,
    /// Flip to make the next readback fail.
    pub fail_readback: AtomicBool,
    /// Number of completed picking passes.
    pub passes: AtomicUsize,
}

impl MockDevice {
    pub fn new(width: u32, height: u32) -> Arc<Self> {
        Arc::new(Self {
            width,
            height,
            pixel_ratio: 1.0,
            float_support: true,
            fail_readback: AtomicBool::new(false),
            passes: AtomicUsize::new(0),
        })
    }

    pub fn without_float_support(width: u32, height: u32) -> Arc<Self> {
        Arc::new(Self {
            width,
            height,
            pixel_ratio: 1.0,
            float_support: false,
            fail_readback: AtomicBool::new(false),
            passes: AtomicUsize::new(0),
        })
    }
}

impl PickDevice for MockDevice {
    fn surface_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    fn supports_float_picking(&self) -> bool {
        self.float_support
    }

    fn create_target(&self, kind: PassKind) -> Result<Box<dyn PickTarget>> {
        Ok(Box::new(MockTarget::new(kind, self.width, self.height)))
    }

    fn resize_target(&self, target: &mut dyn PickTarget, width: u32, height: u32) -> Result<()> {
        let target = target
            .as_any_mut()
            .downcast_mut::<MockTarget>()
            .ok_or_else(|| PickingError::Render("foreign target".to_string()))?;
        *target = MockTarget::new(target.kind, width, height);
        Ok(())
    }

    fn begin_pick_pass(
        &self,
        _target: &mut dyn PickTarget,
        kind: PassKind,
        target_rect: Rect,
    ) -> Result<Box<dyn PassEncoder>> {
        Ok(Box::new(MockEncoder::new(kind, target_rect)))
    }

    fn end_pick_pass(
        &self,
        target: &mut dyn PickTarget,
        mut encoder: Box<dyn PassEncoder>,
    ) -> Result<()> {
        let encoder = encoder
            .as_any_mut()
            .downcast_mut::<MockEncoder>()
            .ok_or_else(|| PickingError::Render("foreign encoder".to_string()))?;
        let target = target
            .as_any_mut()
            .downcast_mut::<MockTarget>()
            .ok_or_else(|| PickingError::Render("foreign target".to_string()))?;

        let rect = encoder.rect;
        for row in 0..rect.height {
            for col in 0..rect.width {
                let local = row as usize * rect.width as usize + col as usize;
                let global = target.pixel_index(rect.x + col, rect.y + row);
                target.colors[global] = encoder.colors[local];
                target.values[global] = encoder.values[local];
            }
        }
        self.passes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn to_device_pixels(&self, x: f32, y: f32) -> DevicePixelRange {
        let ratio = self.pixel_ratio;
        let x0 = (x * ratio).floor() as i64;
        let x1 = ((x + 1.0) * ratio).ceil() as i64;
        let y0_top = (y * ratio).floor() as i64;
        let y1_top = ((y + 1.0) * ratio).ceil() as i64;
        DevicePixelRange {
            x: x0,
            y: i64::from(self.height) - y1_top,
            width: (x1 - x0).max(1) as u32,
            height: (y1_top - y0_top).max(1) as u32,
        }
    }

    fn read_pixels(
        &self,
        target: &dyn PickTarget,
        rect: Rect,
        kind: PassKind,
    ) -> Result<PixelBuffer> {
        if self.fail_readback.load(Ordering::Relaxed) {
            return Err(PickingError::Readback("simulated readback failure".to_string()));
        }
        let target = target
            .as_any()
            .downcast_ref::<MockTarget>()
            .ok_or_else(|| PickingError::Render("foreign target".to_string()))?;

        match kind {
            PassKind::Index => {
                let mut bytes = Vec::with_capacity(rect.area() * 4);
                for row in 0..rect.height {
                    for col in 0..rect.width {
                        let i = target.pixel_index(rect.x + col, rect.y + row);
                        bytes.extend_from_slice(&target.colors[i]);
                    }
                }
                Ok(PixelBuffer::Index(bytes))
            }
            PassKind::Depth => {
                let mut floats = Vec::with_capacity(rect.area() * 4);
                for row in 0..rect.height {
                    for col in 0..rect.width {
                        let i = target.pixel_index(rect.x + col, rect.y + row);
                        floats.extend_from_slice(&target.values[i]);
                    }
                }
                Ok(PixelBuffer::Depth(floats))
            }
        }
    }
}

/// A synthetic layer with a fixed device-pixel footprint.
pub struct MockLayer {
    id: String,
    pickable: bool,
    composite: bool,
    auto_highlight: bool,
    z: f32,
    elevation: f32,
    /// (device x, device y, object index) triples.
    pixels: Vec<(u32, u32, u32)>,
    objects: Option<Vec<ObjectValue>>,
    pub highlights: Mutex<Vec<HighlightChange>>,
    pub draws: AtomicUsize,
}

impl MockLayer {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            pickable: true,
            composite: false,
            auto_highlight: false,
            z: 0.0,
            elevation: 0.0,
            pixels: Vec::new(),
            objects: None,
            highlights: Mutex::new(Vec::new()),
            draws: AtomicUsize::new(0),
        }
    }

    pub fn with_pixel(mut self, x: u32, y: u32, object_index: u32) -> Self {
        self.pixels.push((x, y, object_index));
        self
    }

    pub fn with_z(mut self, z: f32) -> Self {
        self.z = z;
        self
    }

    pub fn with_elevation(mut self, elevation: f32) -> Self {
        self.elevation = elevation;
        self
    }

    pub fn with_auto_highlight(mut self) -> Self {
        self.auto_highlight = true;
        self
    }

    pub fn with_objects(mut self, objects: Vec<ObjectValue>) -> Self {
        self.objects = Some(objects);
        self
    }

    pub fn not_pickable(mut self) -> Self {
        self.pickable = false;
        self
    }

    pub fn composite(mut self) -> Self {
        self.composite = true;
        self
    }

    pub fn build(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl Layer for MockLayer {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_pickable(&self) -> bool {
        self.pickable
    }

    fn is_composite(&self) -> bool {
        self.composite
    }

    fn auto_highlight(&self) -> bool {
        self.auto_highlight
    }

    fn picking_info(&self, object_index: i64, _mode: PickMode) -> LayerPickingInfo {
        if object_index < 0 {
            return LayerPickingInfo {
                index: object_index,
                ..Default::default()
            };
        }
        let object = self
            .objects
            .as_ref()
            .and_then(|objects| objects.get(object_index as usize))
            .cloned();
        LayerPickingInfo {
            object,
            index: object_index,
            color: None,
        }
    }

    fn update_highlight(&self, change: &HighlightChange) {
        self.highlights.lock().unwrap().push(*change);
    }

    fn draw_picking(
        &self,
        encoder: &mut dyn PassEncoder,
        ctx: &LayerDrawContext<'_>,
    ) -> Result<()> {
        self.draws.fetch_add(1, Ordering::Relaxed);
        let encoder = encoder
            .as_any_mut()
            .downcast_mut::<MockEncoder>()
            .ok_or_else(|| PickingError::Render("foreign encoder".to_string()))?;
        for &(x, y, object_index) in &self.pixels {
            if ctx
                .excluded
                .is_some_and(|set| set.contains(&i64::from(object_index)))
            {
                continue;
            }
            match encoder.kind {
                PassKind::Index => encoder.draw_index_pixel(
                    x,
                    y,
                    self.z,
                    encode_picking_color(ctx.slot, object_index),
                ),
                PassKind::Depth => {
                    encoder.draw_value_pixel(x, y, self.z, [self.elevation, 0.0, 0.0, 1.0]);
                }
            }
        }
        Ok(())
    }
}

/// A rectangular viewport whose unprojection offsets into its own world
/// base, so tests can tell which viewport resolved a coordinate.
pub struct MockViewport {
    id: String,
    bounds: LogicalRect,
    world_base: Vec2,
}

impl MockViewport {
    pub fn new(id: &str, bounds: LogicalRect, world_base: Vec2) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            bounds,
            world_base,
        })
    }
}

impl Viewport for MockViewport {
    fn id(&self) -> &str {
        &self.id
    }

    fn bounds(&self) -> LogicalRect {
        self.bounds
    }

    fn unproject(&self, xy: Vec2) -> Option<Vec3> {
        Some(Vec3::new(
            self.world_base.x + xy.x,
            self.world_base.y + xy.y,
            0.0,
        ))
    }
}

/// An effect that counts its pre-render invocations.
pub struct CountingEffect {
    id: String,
    opt_in: bool,
    pub calls: AtomicUsize,
}

impl CountingEffect {
    pub fn new(id: &str, opt_in: bool) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            opt_in,
            calls: AtomicUsize::new(0),
        })
    }
}

impl Effect for CountingEffect {
    fn id(&self) -> &str {
        &self.id
    }

    fn use_in_picking(&self) -> bool {
        self.opt_in
    }

    fn pre_render(&self, _params: &EffectPassParams<'_>) -> Option<Box<dyn Any + Send + Sync>> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Some(Box::new(()))
    }
}

/// Device row for a logical y on a ratio-1 surface of the given height.
pub fn device_y(surface_height: u32, logical_y: u32) -> u32 {
    surface_height - 1 - logical_y
}

/// A viewport covering the whole logical surface.
pub fn whole_surface(width: f32, height: f32) -> Arc<MockViewport> {
    MockViewport::new(
        "main",
        LogicalRect::new(0.0, 0.0, width, height),
        Vec2::ZERO,
    )
}

/// A pick context with no callback and no effects.
pub fn context<'a>(
    layers: &'a [Arc<dyn Layer>],
    viewports: &'a [Arc<dyn Viewport>],
    ownership: &'a OwnershipTable,
) -> PickContext<'a> {
    PickContext {
        layers,
        viewports,
        ownership,
        on_viewport_active: None,
        effects: &[],
    }
}
