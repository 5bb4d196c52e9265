//! GPU resource primitives and the stateful pipeline facade that draws
//! through them.
//!
//! Every wrapper here owns exactly one `wgpu` handle and releases it on
//! `Drop`; none of these types are `Clone`.

mod buffer;
mod framebuffer;
mod pipeline;
mod pixel;
mod program;
mod texture;
mod vertex_array;

pub use buffer::{Buffer, MapAccess};
pub use framebuffer::Framebuffer;
pub use pipeline::{CullMode, GpuPipeline};
pub use pixel::{convert_to_f16, PixelElementType};
pub use program::Program;
pub use texture::Texture;
pub use vertex_array::{AttributeDescriptor, VertexArray, VertexBufferDescriptor};

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide monotonic id used to fingerprint bound resources in the
/// pipeline's dirty-tracking cache (see `mesh.rs`'s `BindGroupCache`).
pub fn generate_resource_id() -> u64 {
    NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed)
}
