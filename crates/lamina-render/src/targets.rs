//! Offscreen wgpu textures backing the picking passes.

use std::any::Any;

use lamina_core::{PassKind, PickTarget};

/// Color format of the index pass target. Rgba8Unorm keeps the encoded
/// identity colors exact through render and readback.
pub const INDEX_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Color format of the depth-value pass target.
pub const DEPTH_VALUE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;

/// Depth-stencil format shared by both pick targets.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

/// An offscreen pick render target: one color texture holding either
/// identity colors or packed values, plus a depth buffer for occlusion.
pub struct WgpuPickTarget {
    kind: PassKind,
    width: u32,
    height: u32,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    depth_texture: wgpu::Texture,
    depth_view: wgpu::TextureView,
}

impl WgpuPickTarget {
    /// Creates a target sized to the given surface.
    pub(crate) fn create(device: &wgpu::Device, kind: PassKind, width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let format = Self::color_format(kind);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(match kind {
                PassKind::Index => "Pick Index Texture",
                PassKind::Depth => "Pick Depth Value Texture",
            }),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let depth_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Pick Depth Texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let depth_view = depth_texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            kind,
            width,
            height,
            texture,
            view,
            depth_texture,
            depth_view,
        }
    }

    /// Recreates the textures at a new size.
    pub(crate) fn recreate(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        *self = Self::create(device, self.kind, width, height);
    }

    /// The color format used for the given pass kind.
    pub fn color_format(kind: PassKind) -> wgpu::TextureFormat {
        match kind {
            PassKind::Index => INDEX_FORMAT,
            PassKind::Depth => DEPTH_VALUE_FORMAT,
        }
    }

    /// Which pass this target serves.
    pub fn kind(&self) -> PassKind {
        self.kind
    }

    /// The color texture.
    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    /// The color attachment view.
    pub fn color_view(&self) -> &wgpu::TextureView {
        &self.view
    }

    /// The depth attachment view.
    pub fn depth_view(&self) -> &wgpu::TextureView {
        &self.depth_view
    }

    /// The depth texture.
    pub fn depth_texture(&self) -> &wgpu::Texture {
        &self.depth_texture
    }

    /// Bytes per pixel of the color texture.
    pub fn bytes_per_pixel(&self) -> u32 {
        match self.kind {
            PassKind::Index => 4,
            PassKind::Depth => 16,
        }
    }
}

impl PickTarget for WgpuPickTarget {
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
