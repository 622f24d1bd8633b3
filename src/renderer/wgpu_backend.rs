use std::collections::HashMap;

use wgpu::util::DeviceExt;

use super::backend::{TextureBackend, TextureId};
use crate::config::TEXTURE_SIZE_CAP;
use crate::error::GfxError;

/// A sheet or glyph atlas on the GPU.
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

/// [`TextureBackend`] on a `wgpu` device. Textures are sampled with
/// nearest filtering; sprites are pixel art.
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    textures: HashMap<TextureId, GpuTexture>,
    sampler: wgpu::Sampler,
    next_id: u32,
}

impl WgpuBackend {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("sheet_sampler"),
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        Self { device, queue, textures: HashMap::new(), sampler, next_id: 1 }
    }

    /// Open the default adapter without a surface, for offline packing.
    pub fn headless() -> Result<Self, GfxError> {
        pollster::block_on(async {
            let instance = wgpu::Instance::default();
            let adapter = instance
                .request_adapter(&wgpu::RequestAdapterOptions::default())
                .await?;
            log::info!("using adapter {}", adapter.get_info().name);
            let (device, queue) = adapter
                .request_device(&wgpu::DeviceDescriptor::default())
                .await?;
            Ok::<_, GfxError>(Self::new(device, queue))
        })
    }

    pub fn texture(&self, id: TextureId) -> Option<&GpuTexture> {
        self.textures.get(&id)
    }

    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }
}

impl TextureBackend for WgpuBackend {
    fn create_texture(&mut self, label: &str, width: u32, height: u32, pixels: &[u8]) -> TextureId {
        let texture = self.device.create_texture_with_data(
            &self.queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            pixels,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let id = TextureId(self.next_id);
        self.next_id += 1;
        self.textures.insert(id, GpuTexture { texture, view });
        id
    }

    fn update_region(&mut self, id: TextureId, x: u32, y: u32, width: u32, height: u32, pixels: &[u8]) {
        let Some(gpu) = self.textures.get(&id) else {
            log::warn!("update_region on unknown texture {id:?}");
            return;
        };
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &gpu.texture,
                mip_level: 0,
                origin: wgpu::Origin3d { x, y, z: 0 },
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
        );
    }

    fn destroy_texture(&mut self, id: TextureId) {
        if let Some(gpu) = self.textures.remove(&id) {
            gpu.texture.destroy();
        }
    }

    fn max_texture_size(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d.min(TEXTURE_SIZE_CAP)
    }
}
