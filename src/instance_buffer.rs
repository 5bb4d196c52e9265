//! InstanceBuffer (§3): up to three independently-toggled per-instance GPU
//! arrays (transform, color, custom vec4).

use crate::gpu::Buffer;
use glam::{Mat4, Vec4};

/// One of the three per-instance data channels a draw call may read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceSlot {
    Transform,
    Color,
    Custom,
}

/// A single per-instance data channel: the GPU buffer backing it, plus
/// whether the host has enabled it for this buffer. Owns the `Buffer`
/// directly, per §9's move-only RAII ownership note.
#[derive(Default)]
struct Channel {
    buffer: Option<Buffer>,
    len: usize,
    enabled: bool,
}

impl Channel {
    fn set(&mut self, device: &wgpu::Device, data: &[u8], len: usize) {
        self.buffer = Some(Buffer::new_init(
            device,
            data,
            wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            "instance_buffer.channel",
        ));
        self.len = len;
        self.enabled = true;
    }
}

/// Up to three parallel per-instance GPU arrays. Each slot is
/// independently enabled/disabled; a draw with `instance_count` greater
/// than an enabled slot's length violates the slot-length invariant (the
/// caller is expected to have validated this before submission — see
/// `DrawCallManager::push`).
#[derive(Default)]
pub struct InstanceBuffer {
    transform: Channel,
    color: Channel,
    custom: Channel,
}

impl InstanceBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_transforms(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, data: &[Mat4]) {
        let _ = queue;
        self.transform
            .set(device, bytemuck::cast_slice(data), data.len());
    }

    pub fn set_colors(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, data: &[Vec4]) {
        let _ = queue;
        self.color.set(device, bytemuck::cast_slice(data), data.len());
    }

    pub fn set_custom(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, data: &[Vec4]) {
        let _ = queue;
        self.custom.set(device, bytemuck::cast_slice(data), data.len());
    }

    pub fn disable(&mut self, slot: InstanceSlot) {
        self.channel_mut(slot).enabled = false;
    }

    pub fn is_enabled(&self, slot: InstanceSlot) -> bool {
        let c = self.channel(slot);
        c.enabled && c.buffer.is_some()
    }

    /// The channel's GPU buffer id, for the draw-time `resolve_buffer`
    /// lookup against the vertex array's instance-attribute slot.
    pub fn buffer_id(&self, slot: InstanceSlot) -> Option<u64> {
        self.channel(slot).buffer.as_ref().map(Buffer::id)
    }

    pub fn len(&self, slot: InstanceSlot) -> usize {
        self.channel(slot).len
    }

    /// `true` if every enabled slot has at least `instance_count` entries —
    /// the invariant a draw must satisfy before issuing an instanced draw.
    pub fn supports_instance_count(&self, instance_count: usize) -> bool {
        [InstanceSlot::Transform, InstanceSlot::Color, InstanceSlot::Custom]
            .into_iter()
            .filter(|&s| self.is_enabled(s))
            .all(|s| self.len(s) >= instance_count)
    }

    fn channel(&self, slot: InstanceSlot) -> &Channel {
        match slot {
            InstanceSlot::Transform => &self.transform,
            InstanceSlot::Color => &self.color,
            InstanceSlot::Custom => &self.custom,
        }
    }

    fn channel_mut(&mut self, slot: InstanceSlot) -> &mut Channel {
        match slot {
            InstanceSlot::Transform => &mut self.transform,
            InstanceSlot::Color => &mut self.color,
            InstanceSlot::Custom => &mut self.custom,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_slot_is_not_enabled_even_with_data() {
        let mut ib = InstanceBuffer::new();
        assert!(!ib.is_enabled(InstanceSlot::Color));
        ib.disable(InstanceSlot::Color);
        assert!(!ib.is_enabled(InstanceSlot::Color));
    }

    #[test]
    fn supports_instance_count_true_when_nothing_enabled() {
        let ib = InstanceBuffer::new();
        assert!(ib.supports_instance_count(1000));
    }
}
