//! The wgpu implementation of the picking device contract.

use std::any::Any;
use std::sync::Mutex;

use lamina_core::{
    DevicePixelRange, PassEncoder, PassKind, PickDevice, PickTarget, PickingError, PixelBuffer,
    Rect, Result,
};

use crate::error::RenderError;
use crate::targets::WgpuPickTarget;

/// Current drawable surface metrics, supplied by the embedder.
#[derive(Debug, Clone, Copy)]
struct SurfaceMetrics {
    width: u32,
    height: u32,
    pixel_ratio: f32,
}

/// A picking pass in flight: the pass encoder plus the command encoder it
/// records into. Layers downcast [`PassEncoder`] to this type and draw
/// through [`render_pass`](Self::render_pass).
pub struct WgpuPassEncoder {
    pass: Option<wgpu::RenderPass<'static>>,
    encoder: Option<wgpu::CommandEncoder>,
}

impl WgpuPassEncoder {
    /// The active render pass.
    ///
    /// # Panics
    /// Panics if called after the pass was finished.
    pub fn render_pass(&mut self) -> &mut wgpu::RenderPass<'static> {
        self.pass.as_mut().expect("pick pass already finished")
    }
}

impl PassEncoder for WgpuPassEncoder {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// wgpu-backed picking device.
///
/// Owns clones of the device and queue (both internally reference counted)
/// and the surface metrics the embedder refreshes on resize. Float-target
/// support is probed once from the adapter at construction.
pub struct WgpuPickDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    float_support: bool,
    metrics: Mutex<SurfaceMetrics>,
}

impl WgpuPickDevice {
    /// Creates a picking device over an existing wgpu device and queue.
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        adapter: &wgpu::Adapter,
        surface_width: u32,
        surface_height: u32,
        pixel_ratio: f32,
    ) -> Self {
        let float_support = adapter
            .get_texture_format_features(crate::targets::DEPTH_VALUE_FORMAT)
            .allowed_usages
            .contains(wgpu::TextureUsages::RENDER_ATTACHMENT);
        if !float_support {
            log::warn!("adapter cannot render to rgba32float; 3D depth picking disabled");
        }
        Self {
            device,
            queue,
            float_support,
            metrics: Mutex::new(SurfaceMetrics {
                width: surface_width,
                height: surface_height,
                pixel_ratio,
            }),
        }
    }

    /// Updates the drawable surface metrics; call on every surface resize
    /// or display scale change.
    pub fn set_surface_metrics(&self, width: u32, height: u32, pixel_ratio: f32) {
        let mut metrics = self.metrics.lock().expect("surface metrics poisoned");
        *metrics = SurfaceMetrics {
            width,
            height,
            pixel_ratio,
        };
    }

    /// The underlying wgpu device.
    pub fn wgpu_device(&self) -> &wgpu::Device {
        &self.device
    }

    /// The underlying wgpu queue.
    pub fn wgpu_queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    fn metrics(&self) -> SurfaceMetrics {
        *self.metrics.lock().expect("surface metrics poisoned")
    }

    fn downcast_target<'a>(target: &'a dyn PickTarget) -> Result<&'a WgpuPickTarget> {
        target
            .as_any()
            .downcast_ref::<WgpuPickTarget>()
            .ok_or_else(|| RenderError::ForeignTarget.into())
    }

    fn downcast_target_mut<'a>(target: &'a mut dyn PickTarget) -> Result<&'a mut WgpuPickTarget> {
        target
            .as_any_mut()
            .downcast_mut::<WgpuPickTarget>()
            .ok_or_else(|| RenderError::ForeignTarget.into())
    }
}

impl PickDevice for WgpuPickDevice {
    fn surface_size(&self) -> (u32, u32) {
        let metrics = self.metrics();
        (metrics.width, metrics.height)
    }

    fn pixel_ratio(&self) -> f32 {
        self.metrics().pixel_ratio
    }

    fn supports_float_picking(&self) -> bool {
        self.float_support
    }

    fn create_target(&self, kind: PassKind) -> Result<Box<dyn PickTarget>> {
        let (width, height) = self.surface_size();
        Ok(Box::new(WgpuPickTarget::create(
            &self.device,
            kind,
            width,
            height,
        )))
    }

    fn resize_target(&self, target: &mut dyn PickTarget, width: u32, height: u32) -> Result<()> {
        let target = Self::downcast_target_mut(target)?;
        if target.size() == (width, height) {
            return Ok(());
        }
        target.recreate(&self.device, width, height);
        Ok(())
    }

    fn begin_pick_pass(
        &self,
        target: &mut dyn PickTarget,
        _kind: PassKind,
        target_rect: Rect,
    ) -> Result<Box<dyn PassEncoder>> {
        let target = Self::downcast_target(target)?;
        let (_, target_height) = target.size();

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Pick Pass Encoder"),
            });

        let pass = encoder
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Pick Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target.color_view(),
                    resolve_target: None,
                    ops: wgpu::Operations {
                        // Background must read back as the reserved all-zero
                        // color.
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: target.depth_view(),
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            })
            .forget_lifetime();

        let mut boxed = Box::new(WgpuPassEncoder {
            pass: Some(pass),
            encoder: Some(encoder),
        });

        // The core's device rect is bottom-left; wgpu scissors from the
        // top-left.
        let scissor_y = target_height - (target_rect.y + target_rect.height);
        boxed
            .render_pass()
            .set_scissor_rect(target_rect.x, scissor_y, target_rect.width, target_rect.height);

        Ok(boxed)
    }

    fn end_pick_pass(
        &self,
        _target: &mut dyn PickTarget,
        mut encoder: Box<dyn PassEncoder>,
    ) -> Result<()> {
        let wgpu_encoder = encoder
            .as_any_mut()
            .downcast_mut::<WgpuPassEncoder>()
            .ok_or_else(|| PickingError::from(RenderError::ForeignEncoder))?;

        // Finish the pass before finishing the command encoder.
        drop(wgpu_encoder.pass.take());
        let command_encoder = wgpu_encoder
            .encoder
            .take()
            .ok_or_else(|| PickingError::from(RenderError::ForeignEncoder))?;
        self.queue.submit(std::iter::once(command_encoder.finish()));
        Ok(())
    }

    fn to_device_pixels(&self, x: f32, y: f32) -> DevicePixelRange {
        let metrics = self.metrics();
        let ratio = metrics.pixel_ratio;

        #[allow(clippy::cast_possible_truncation)]
        let x0 = (x * ratio).floor() as i64;
        #[allow(clippy::cast_possible_truncation)]
        let x1 = ((x + 1.0) * ratio).ceil() as i64;
        #[allow(clippy::cast_possible_truncation)]
        let y0_top = (y * ratio).floor() as i64;
        #[allow(clippy::cast_possible_truncation)]
        let y1_top = ((y + 1.0) * ratio).ceil() as i64;

        // Flip from logical top-left to the target's bottom-left rows.
        let y_bottom = i64::from(metrics.height) - y1_top;
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        DevicePixelRange {
            x: x0,
            y: y_bottom,
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
        let target = Self::downcast_target(target)?;
        let (_, target_height) = target.size();
        let bytes_per_pixel = target.bytes_per_pixel();

        let unpadded_bytes_per_row = rect.width * bytes_per_pixel;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_bytes_per_row = unpadded_bytes_per_row.div_ceil(align) * align;

        let staging_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Pick Staging Buffer"),
            size: u64::from(padded_bytes_per_row) * u64::from(rect.height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Pick Readback Encoder"),
            });

        // Texture rows run top-down; the core's rect is bottom-left.
        let texture_y = target_height - (rect.y + rect.height);
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: target.texture(),
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: rect.x,
                    y: texture_y,
                    z: 0,
                },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging_buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(rect.height),
                },
            },
            wgpu::Extent3d {
                width: rect.width,
                height: rect.height,
                depth_or_array_layers: 1,
            },
        );

        self.queue.submit(std::iter::once(encoder.finish()));

        let buffer_slice = staging_buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });

        let _ = self.device.poll(wgpu::PollType::Wait);

        match rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                return Err(RenderError::BufferMapFailed(err.to_string()).into());
            }
            Err(_) => return Err(RenderError::ReadbackInterrupted.into()),
        }

        let data = buffer_slice.get_mapped_range();

        // Strip the row padding and flip rows so row 0 of the output is the
        // bottom device row, as the core expects.
        let mut bytes =
            Vec::with_capacity(rect.width as usize * rect.height as usize * bytes_per_pixel as usize);
        for out_row in 0..rect.height {
            let texture_row = rect.height - 1 - out_row;
            let start = texture_row as usize * padded_bytes_per_row as usize;
            bytes.extend_from_slice(&data[start..start + unpadded_bytes_per_row as usize]);
        }

        drop(data);
        staging_buffer.unmap();

        Ok(match kind {
            PassKind::Index => PixelBuffer::Index(bytes),
            PassKind::Depth => PixelBuffer::Depth(bytemuck::pod_collect_to_vec(&bytes)),
        })
    }
}
