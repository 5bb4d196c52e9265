//! Vertex-array descriptors with per-attribute default-value fallback
//! (§4.3).

use smallvec::SmallVec;

/// One vertex attribute within a [`VertexBufferDescriptor`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttributeDescriptor {
    pub location: u32,
    pub components: u8,
    pub format: wgpu::VertexFormat,
    pub normalized: bool,
    pub stride: u64,
    pub offset: u64,
    /// 0 = per-vertex, >0 = per-instance with this step rate.
    pub divisor: u32,
    /// Value the pipeline applies via the per-location constant-attribute
    /// path when this descriptor's buffer slot is `None` at draw time —
    /// e.g. identity matrix columns for an absent instance-transform
    /// attribute.
    pub default_value: [f32; 4],
}

/// One binding slot: an optional buffer plus the attributes read from it.
#[derive(Default)]
pub struct VertexBufferDescriptor {
    pub buffer_id: Option<u64>,
    pub attributes: SmallVec<[AttributeDescriptor; 4]>,
}

/// An ordered list of vertex-buffer descriptors, describing the full
/// vertex input state for one draw.
#[derive(Default)]
pub struct VertexArray {
    id: u64,
    slots: Vec<VertexBufferDescriptor>,
}

impl VertexArray {
    pub fn new() -> Self {
        Self {
            id: super::generate_resource_id(),
            slots: Vec::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Appends a new binding slot with no attributes and returns its index.
    pub fn add_slot(&mut self) -> usize {
        self.slots.push(VertexBufferDescriptor::default());
        self.slots.len() - 1
    }

    pub fn add_attribute(&mut self, slot: usize, attribute: AttributeDescriptor) {
        self.slots[slot].attributes.push(attribute);
    }

    /// Binds `buffer_id` to an existing slot.
    pub fn bind_vertex_buffer(&mut self, slot: usize, buffer_id: u64) {
        self.slots[slot].buffer_id = Some(buffer_id);
    }

    /// Unbinds a slot's buffer; draws then fall back to each attribute's
    /// `default_value`.
    pub fn unbind_vertex_buffer(&mut self, slot: usize) {
        self.slots[slot].buffer_id = None;
    }

    pub fn slots(&self) -> &[VertexBufferDescriptor] {
        &self.slots
    }

    /// Attributes across all slots whose buffer is currently unbound —
    /// these must be filled via the pipeline's constant-attribute path
    /// before the next draw.
    pub fn unbound_attributes(&self) -> impl Iterator<Item = &AttributeDescriptor> {
        self.slots
            .iter()
            .filter(|s| s.buffer_id.is_none())
            .flat_map(|s| s.attributes.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attr(location: u32) -> AttributeDescriptor {
        AttributeDescriptor {
            location,
            components: 4,
            format: wgpu::VertexFormat::Float32x4,
            normalized: false,
            stride: 16,
            offset: 0,
            divisor: 1,
            default_value: [0.0, 0.0, 0.0, 1.0],
        }
    }

    #[test]
    fn unbound_slot_attributes_surface_for_default_fallback() {
        let mut va = VertexArray::new();
        let slot = va.add_slot();
        va.add_attribute(slot, attr(5));
        assert_eq!(va.unbound_attributes().count(), 1);
        va.bind_vertex_buffer(slot, 1);
        assert_eq!(va.unbound_attributes().count(), 0);
        va.unbind_vertex_buffer(slot);
        assert_eq!(va.unbound_attributes().count(), 1);
    }
}
