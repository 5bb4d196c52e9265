//! Thin owner of one `wgpu::Texture` + its default view.

pub struct Texture {
    id: u64,
    raw: wgpu::Texture,
    view: wgpu::TextureView,
    size: wgpu::Extent3d,
    format: wgpu::TextureFormat,
}

impl Texture {
    pub fn new(device: &wgpu::Device, descriptor: &wgpu::TextureDescriptor, label: &str) -> Self {
        let raw = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            ..descriptor.clone()
        });
        let view = raw.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            id: super::generate_resource_id(),
            raw,
            view,
            size: descriptor.size,
            format: descriptor.format,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn raw(&self) -> &wgpu::Texture {
        &self.raw
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn size(&self) -> wgpu::Extent3d {
        self.size
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    pub fn upload(&self, queue: &wgpu::Queue, data: &[u8], bytes_per_row: u32, layer: u32) {
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.raw,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: 0,
                    y: 0,
                    z: layer,
                },
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(self.size.height),
            },
            wgpu::Extent3d {
                width: self.size.width,
                height: self.size.height,
                depth_or_array_layers: 1,
            },
        );
    }
}
