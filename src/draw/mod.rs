//! The per-frame draw queue (§4.4): submission records, GPU packing,
//! frustum culling, and bucket sorting, orchestrated by [`DrawCallManager`].

mod culling;
mod manager;
mod records;
mod sort;

pub use manager::{DrawCallManager, MeshSubmission};
pub use records::{DrawCategory, MeshVariant, SharedData, SharedDrawGpu, UniqueData, UniqueDrawGpu, DRAW_CATEGORY_COUNT};
