//! Static/dynamic uniform-buffer management shared by every shader
//! override (binding 15 static, binding 14 dynamic — §6).

use crate::gpu::Buffer;

pub const STATIC_UNIFORM_BINDING: u32 = 15;
pub const DYNAMIC_UNIFORM_BINDING: u32 = 14;

fn align_up(value: u64, alignment: u64) -> u64 {
    (value + alignment - 1) / alignment * alignment
}

/// One past-draw's claim on the dynamic buffer: a byte range, addressed
/// by the index returned from [`DynamicUniformBuffer::push`].
#[derive(Debug, Clone, Copy)]
pub struct DynamicRange {
    pub offset: u64,
    pub size: u64,
}

/// Infrequently-updated per-material uniform block.
pub struct StaticUniformBuffer {
    buffer: Option<Buffer>,
}

impl StaticUniformBuffer {
    pub fn new() -> Self {
        Self { buffer: None }
    }

    pub fn allocate(&mut self, device: &wgpu::Device, size: u64) {
        if size == 0 {
            return;
        }
        self.buffer = Some(Buffer::new(
            device,
            size,
            wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            "material_shader.static_buffer",
        ));
    }

    pub fn is_allocated(&self) -> bool {
        self.buffer.is_some()
    }

    pub fn buffer(&self) -> Option<&Buffer> {
        self.buffer.as_ref()
    }

    /// Uploads at `offset`; logs and drops the write if it would run past
    /// the end of the allocated buffer or no buffer was ever declared.
    pub fn update(&mut self, queue: &wgpu::Queue, offset: u64, data: &[u8]) {
        let Some(buffer) = &self.buffer else {
            log::error!("no static uniform buffer declared for this shader, upload dropped");
            return;
        };
        if offset + data.len() as u64 > buffer.size() {
            log::error!(
                "static uniform buffer upload out of bounds (offset={} + size={} > buffer={})",
                offset,
                data.len(),
                buffer.size()
            );
            return;
        }
        buffer.upload(queue, offset, data);
    }
}

impl Default for StaticUniformBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-draw uniform block, appended to once per draw this frame and
/// cleared at the start of the next (`clear`).
pub struct DynamicUniformBuffer {
    buffer: Option<Buffer>,
    ranges: Vec<DynamicRange>,
    current_offset: u64,
    offset_alignment: u64,
    max_size: u64,
}

impl DynamicUniformBuffer {
    pub fn new(offset_alignment: u64, max_size: u64) -> Self {
        Self {
            buffer: None,
            ranges: Vec::new(),
            current_offset: 0,
            offset_alignment,
            max_size,
        }
    }

    /// Allocates the buffer at `8 * element_size`, aligned up to the
    /// device's UBO offset alignment — matches the original's "room for 8
    /// draws before the first grow" sizing heuristic.
    pub fn allocate(&mut self, device: &wgpu::Device, element_size: u64) {
        if element_size == 0 {
            return;
        }
        let size = align_up(8 * element_size, self.offset_alignment);
        self.buffer = Some(Buffer::new(
            device,
            size,
            wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            "material_shader.dynamic_buffer",
        ));
        self.ranges.reserve(8);
    }

    pub fn is_allocated(&self) -> bool {
        self.buffer.is_some()
    }

    pub fn buffer(&self) -> Option<&Buffer> {
        self.buffer.as_ref()
    }

    pub fn range(&self, index: usize) -> Option<DynamicRange> {
        self.ranges.get(index).copied()
    }

    /// Appends `data` as a new range, growing the backing buffer (doubling
    /// until it fits, capped at `offset_alignment`-aligned boundaries) if
    /// needed. Returns the new range's index, or `None` if no buffer was
    /// ever declared, `data` isn't a multiple of 16 bytes (std140), or the
    /// required size would exceed the device's UBO size limit.
    pub fn push(
        &mut self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        queue: &wgpu::Queue,
        data: &[u8],
    ) -> Option<usize> {
        let size = data.len() as u64;

        if self.buffer.is_none() {
            log::warn!("no dynamic uniform buffer declared for this shader, upload dropped");
            return None;
        }
        if size % 16 != 0 {
            log::warn!("dynamic uniform buffer upload size ({size}) must be a multiple of 16");
            return None;
        }

        let aligned_offset = align_up(self.current_offset, self.offset_alignment);
        let required_size = aligned_offset + size;
        let current_size = self.buffer.as_ref().unwrap().size();

        if required_size > current_size {
            let mut new_size = align_up(2 * current_size.max(16), self.offset_alignment);
            while new_size < required_size {
                new_size = align_up(new_size * 2, self.offset_alignment);
            }
            if new_size > self.max_size {
                log::error!(
                    "dynamic uniform buffer resize failed (required={new_size} > device limit={})",
                    self.max_size
                );
                return None;
            }
            self.buffer.as_mut().unwrap().reserve(device, encoder, new_size, true);
        }

        let index = self.ranges.len();
        self.ranges.push(DynamicRange { offset: aligned_offset, size });
        self.buffer.as_ref().unwrap().upload(queue, aligned_offset, data);
        self.current_offset = aligned_offset + size;
        Some(index)
    }

    /// Resets range bookkeeping for the next frame; the allocated buffer
    /// itself is kept (and its old contents overwritten range-by-range as
    /// `push` is called again).
    pub fn clear(&mut self) {
        self.ranges.clear();
        self.current_offset = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_up_rounds_to_next_multiple() {
        assert_eq!(align_up(0, 256), 0);
        assert_eq!(align_up(1, 256), 256);
        assert_eq!(align_up(256, 256), 256);
        assert_eq!(align_up(257, 256), 512);
    }

    fn test_device() -> (wgpu::Device, wgpu::Queue) {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::None,
            force_fallback_adapter: true,
            compatible_surface: None,
        }))
        .expect("fallback adapter");
        pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor::default())).expect("device")
    }

    #[test]
    fn dynamic_buffer_grows_to_fit_successive_pushes() {
        let (device, queue) = test_device();
        let mut dynamic = DynamicUniformBuffer::new(256, 1 << 20);
        dynamic.allocate(&device, 16);
        let initial_size = dynamic.buffer().unwrap().size();

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor::default());
        for _ in 0..32 {
            let data = [0u8; 16];
            dynamic.push(&device, &mut encoder, &queue, &data).expect("push succeeds");
        }
        assert!(dynamic.buffer().unwrap().size() >= initial_size);
        assert_eq!(dynamic.ranges.len(), 32);
    }

    #[test]
    fn dynamic_buffer_rejects_non_16_byte_multiple() {
        let (device, queue) = test_device();
        let mut dynamic = DynamicUniformBuffer::new(256, 1 << 20);
        dynamic.allocate(&device, 16);
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor::default());
        let data = [0u8; 15];
        assert!(dynamic.push(&device, &mut encoder, &queue, &data).is_none());
    }

    #[test]
    fn dynamic_buffer_refuses_growth_past_device_limit() {
        let (device, queue) = test_device();
        let mut dynamic = DynamicUniformBuffer::new(256, 256);
        dynamic.allocate(&device, 16);
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor::default());
        let data = [0u8; 4096];
        assert!(dynamic.push(&device, &mut encoder, &queue, &data).is_none());
    }

    #[test]
    fn static_buffer_upload_out_of_bounds_is_dropped_not_panicking() {
        let (device, queue) = test_device();
        let mut static_buf = StaticUniformBuffer::new();
        static_buf.allocate(&device, 64);
        let data = [0u8; 128];
        static_buf.update(&queue, 0, &data);
    }
}
