//! Render-target wrapper: a color attachment plus optional depth
//! attachment bound together as one draw target (the `wgpu` analogue of a
//! GL framebuffer object).

pub struct Framebuffer {
    id: u64,
    color: wgpu::TextureView,
    depth: Option<wgpu::TextureView>,
    width: u32,
    height: u32,
}

impl Framebuffer {
    pub fn new(color: wgpu::TextureView, depth: Option<wgpu::TextureView>, width: u32, height: u32) -> Self {
        Self {
            id: super::generate_resource_id(),
            color,
            depth,
            width,
            height,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn color(&self) -> &wgpu::TextureView {
        &self.color
    }

    pub fn depth(&self) -> Option<&wgpu::TextureView> {
        self.depth.as_ref()
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
