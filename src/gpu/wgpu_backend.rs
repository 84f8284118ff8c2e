//! [`SurfaceBackend`] on a `wgpu` device.
//!
//! wgpu has no framebuffer object; a [`Framebuffer`] here is the set of
//! attachment views a render pass binds. Completeness is checked against the
//! device limits and the attachment sizes, and any validation error raised
//! while creating the objects is reported through an error scope.

use tracing::debug;

use super::surface::{FramebufferStatus, SurfaceBackend};
use crate::error::{Error, Result};

pub const OFFSCREEN_COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
pub const OFFSCREEN_DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth16Unorm;

pub struct ColorTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

pub struct DepthTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

pub struct Framebuffer {
    pub color: wgpu::TextureView,
    pub depth: wgpu::TextureView,
    color_size: wgpu::Extent3d,
    depth_size: wgpu::Extent3d,
}

pub struct WgpuBackend {
    device: wgpu::Device,
    viewport: Option<(u32, u32)>,
}

impl WgpuBackend {
    #[must_use]
    pub fn new(device: wgpu::Device) -> Self {
        Self {
            device,
            viewport: None,
        }
    }

    /// Viewport recorded by the last [`SurfaceBackend::set_viewport`] call.
    #[must_use]
    pub fn viewport(&self) -> Option<(u32, u32)> {
        self.viewport
    }

    fn scoped<T>(&self, what: &str, create: impl FnOnce(&wgpu::Device) -> T) -> Result<T> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = create(&self.device);
        match pollster::block_on(self.device.pop_error_scope()) {
            None => Ok(value),
            Some(err) => Err(Error::GraphicsSetup(format!("{what}: {err}"))),
        }
    }

    fn extent(width: u32, height: u32) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        }
    }
}

impl SurfaceBackend for WgpuBackend {
    type Texture = ColorTarget;
    type Renderbuffer = DepthTarget;
    type Framebuffer = Framebuffer;

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = Some((width, height));
    }

    fn create_color_texture(&mut self, width: u32, height: u32) -> Result<ColorTarget> {
        self.scoped("offscreen colour texture", |device| {
            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some("offscreen-color"),
                size: Self::extent(width, height),
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: OFFSCREEN_COLOR_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            });
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some("offscreen-sampler"),
                address_mode_u: wgpu::AddressMode::ClampToEdge,
                address_mode_v: wgpu::AddressMode::ClampToEdge,
                address_mode_w: wgpu::AddressMode::ClampToEdge,
                mag_filter: wgpu::FilterMode::Linear,
                min_filter: wgpu::FilterMode::Linear,
                mipmap_filter: wgpu::FilterMode::Nearest,
                ..Default::default()
            });
            ColorTarget {
                texture,
                view,
                sampler,
            }
        })
    }

    fn create_depth_renderbuffer(&mut self, width: u32, height: u32) -> Result<DepthTarget> {
        self.scoped("offscreen depth buffer", |device| {
            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some("offscreen-depth"),
                size: Self::extent(width, height),
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: OFFSCREEN_DEPTH_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            });
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            DepthTarget { texture, view }
        })
    }

    fn create_framebuffer(&mut self, color: &ColorTarget, depth: &DepthTarget) -> Result<Framebuffer> {
        Ok(Framebuffer {
            color: color.view.clone(),
            depth: depth.view.clone(),
            color_size: color.texture.size(),
            depth_size: depth.texture.size(),
        })
    }

    fn check_framebuffer_status(&mut self, framebuffer: &Framebuffer) -> FramebufferStatus {
        let max = self.device.limits().max_texture_dimension_2d;
        let size = framebuffer.color_size;
        if framebuffer.color_size != framebuffer.depth_size {
            return FramebufferStatus::Incomplete(format!(
                "colour {}x{} and depth {}x{} attachments differ",
                size.width, size.height, framebuffer.depth_size.width, framebuffer.depth_size.height
            ));
        }
        if size.width == 0 || size.height == 0 || size.width > max || size.height > max {
            return FramebufferStatus::Incomplete(format!(
                "attachment size {}x{} outside 1..={max}",
                size.width, size.height
            ));
        }
        FramebufferStatus::Complete
    }

    fn delete_texture(&mut self, texture: ColorTarget) {
        debug!("destroying offscreen colour texture");
        texture.texture.destroy();
    }

    fn delete_framebuffer(&mut self, framebuffer: Framebuffer) {
        drop(framebuffer);
    }

    fn delete_renderbuffer(&mut self, renderbuffer: DepthTarget) {
        renderbuffer.texture.destroy();
    }
}
