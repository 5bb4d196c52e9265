//! Typed owner of one `wgpu::Buffer` (§4.2).

use crate::errors::{RenderError, Result};
use std::ops::Range;

/// Mirrors the GL map-access bits the source validates `map`/`mapRange`
/// calls against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapAccess {
    Read,
    Write,
    ReadWrite,
}

/// A typed owner of one GPU buffer. Non-`Clone`, releases the `wgpu::Buffer`
/// on drop.
pub struct Buffer {
    id: u64,
    raw: wgpu::Buffer,
    size: u64,
    usage: wgpu::BufferUsages,
    label: String,
    mapped_range: Option<Range<u64>>,
}

impl Buffer {
    pub fn new(device: &wgpu::Device, size: u64, usage: wgpu::BufferUsages, label: &str) -> Self {
        let raw = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: size.max(16),
            usage,
            mapped_at_creation: false,
        });
        Self {
            id: super::generate_resource_id(),
            raw,
            size: size.max(16),
            usage,
            label: label.to_string(),
            mapped_range: None,
        }
    }

    /// Allocates a buffer pre-filled with `data` (the `wgpu` analogue of a
    /// GL `glBufferData` that ships its initial contents in the same
    /// call), still returning the owning wrapper rather than a raw handle
    /// so the caller can keep it alive as a struct field.
    pub fn new_init(device: &wgpu::Device, data: &[u8], usage: wgpu::BufferUsages, label: &str) -> Self {
        use wgpu::util::DeviceExt;
        let raw = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: data,
            usage,
        });
        Self {
            id: super::generate_resource_id(),
            size: raw.size(),
            raw,
            usage,
            label: label.to_string(),
            mapped_range: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn raw(&self) -> &wgpu::Buffer {
        &self.raw
    }

    /// Grows the buffer to at least `min_size`. When `keep_data` is set and
    /// the buffer already holds content, the preserved prefix is copied
    /// through the GPU copy-buffer path into the freshly allocated target.
    /// A no-op (data unmodified) when `min_size <= size()`.
    pub fn reserve(
        &mut self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        min_size: u64,
        keep_data: bool,
    ) {
        if min_size <= self.size {
            return;
        }
        let new_size = min_size.next_power_of_two();
        let new_raw = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&self.label),
            size: new_size,
            usage: self.usage,
            mapped_at_creation: false,
        });
        if keep_data {
            encoder.copy_buffer_to_buffer(&self.raw, 0, &new_raw, 0, self.size);
        }
        self.raw = new_raw;
        self.size = new_size;
    }

    /// Uploads `data` at `offset` via the queue's write path (the `wgpu`
    /// analogue of `glBufferSubData`, used for per-frame `INVALIDATE_RANGE`
    /// style writes from `DrawCallManager::upload`).
    pub fn upload(&self, queue: &wgpu::Queue, offset: u64, data: &[u8]) {
        queue.write_buffer(&self.raw, offset, data);
    }

    /// Begins a map. Only one map may be outstanding at a time; calling
    /// this while already mapped is a programmer error.
    pub fn begin_map(&mut self, range: Range<u64>) -> Result<()> {
        if self.mapped_range.is_some() {
            return Err(RenderError::MapStateViolation(
                "map called while a previous map is still outstanding".into(),
            ));
        }
        self.mapped_range = Some(range);
        Ok(())
    }

    /// Ends the current map. Calling `unmap` without a matching `map` is a
    /// programmer error.
    pub fn unmap(&mut self) -> Result<()> {
        if self.mapped_range.take().is_none() {
            return Err(RenderError::MapStateViolation(
                "unmap called without an outstanding map".into(),
            ));
        }
        self.raw.unmap();
        Ok(())
    }

    pub fn is_mapped(&self) -> bool {
        self.mapped_range.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_device() -> (wgpu::Device, wgpu::Queue) {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::None,
            force_fallback_adapter: true,
            compatible_surface: None,
        }))
        .expect("fallback adapter");
        pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor::default()))
            .expect("device")
    }

    #[test]
    fn reserve_no_op_when_already_large_enough() {
        let (device, _queue) = test_device();
        let mut buffer = Buffer::new(&device, 256, wgpu::BufferUsages::COPY_DST, "test");
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor::default());
        let size_before = buffer.size();
        buffer.reserve(&device, &mut encoder, 128, true);
        assert_eq!(buffer.size(), size_before);
    }

    #[test]
    fn map_unmap_invariants() {
        let (device, _queue) = test_device();
        let mut buffer = Buffer::new(&device, 64, wgpu::BufferUsages::COPY_DST, "test");
        assert!(buffer.unmap().is_err());
        buffer.begin_map(0..64).unwrap();
        assert!(buffer.begin_map(0..64).is_err());
    }
}
