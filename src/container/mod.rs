//! Small reusable containers: bucketed draw-index storage, a ring of
//! per-frame CPU staging slots, and a tiny deterministic PRNG.

mod bucket_array;
mod object_ring;
mod rand;

pub use bucket_array::BucketArray;
pub use object_ring::ObjectRing;
pub use rand::Pcg32;
