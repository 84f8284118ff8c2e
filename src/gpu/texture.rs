use tracing::debug;

use crate::processing::scale::ScaledBitmap;

/// GPU copy of the current photo.
pub struct PhotoTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
    width: u32,
    height: u32,
}

impl PhotoTexture {
    /// Upload `bitmap`, writing into `existing` when its size matches and
    /// creating a new texture otherwise.
    #[must_use]
    pub fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        existing: Option<Self>,
        bitmap: &ScaledBitmap,
    ) -> Self {
        let tex = match existing {
            Some(tex) if tex.width == bitmap.width && tex.height == bitmap.height => {
                debug!(width = bitmap.width, height = bitmap.height, "overwriting photo texture");
                tex
            }
            previous => {
                if let Some(old) = previous {
                    old.texture.destroy();
                }
                Self::create(device, bitmap.width, bitmap.height)
            }
        };
        queue.write_texture(
            tex.texture.as_image_copy(),
            &bitmap.pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * bitmap.width),
                rows_per_image: Some(bitmap.height),
            },
            wgpu::Extent3d {
                width: bitmap.width,
                height: bitmap.height,
                depth_or_array_layers: 1,
            },
        );
        tex
    }

    fn create(device: &wgpu::Device, width: u32, height: u32) -> Self {
        debug!(width, height, "creating photo texture");
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("photo"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("photo-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        Self {
            texture,
            view,
            sampler,
            width,
            height,
        }
    }

    #[must_use]
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    #[must_use]
    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }

    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn destroy(self) {
        self.texture.destroy();
    }
}
