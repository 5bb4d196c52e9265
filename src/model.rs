//! Model (§3): a composite of meshes, materials, and an optional bone
//! hierarchy, consumed by `DrawCallManager::push` as a single submission
//! that expands into N unique draw records (one per mesh).

use crate::bounds::Aabb;
use crate::handle::Handle;
use crate::material::Material;
use crate::mesh::Mesh;
use glam::Mat4;
use smallvec::SmallVec;

/// How a model's current animation frame is advanced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationMode {
    /// The model advances its own current frame each frame, internally.
    Internal,
    /// The host supplies bone matrices directly via `override_pose`.
    Custom,
}

/// A reference to a currently-playing animation (opaque to this crate —
/// animation *playback* is an external collaborator's concern per
/// `spec.md` §1; this crate only consumes the resulting pose).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationRef {
    pub clip_id: u64,
    pub frame: f32,
}

/// Bone hierarchy shared by every mesh in a skinned model.
#[derive(Debug, Clone, Default)]
pub struct Skeleton {
    pub names: Vec<String>,
    pub parents: Vec<i32>,
    /// Local bind-pose matrices, one per bone.
    pub bind_pose: Vec<Mat4>,
    /// Inverse-bind (offset) matrices, one per bone.
    pub offsets: Vec<Mat4>,
}

impl Skeleton {
    pub fn bone_count(&self) -> usize {
        self.names.len()
    }

    /// Invariant: bone arrays either all present or all absent.
    pub fn is_consistent(&self) -> bool {
        let n = self.names.len();
        self.parents.len() == n && self.bind_pose.len() == n && self.offsets.len() == n
    }
}

/// A composite of meshes and materials, optionally skinned.
pub struct Model {
    pub meshes: SmallVec<[Handle<Mesh>; 8]>,
    pub materials: SmallVec<[Material; 8]>,
    /// `mesh_materials[i]` indexes into `materials` for `meshes[i]`.
    pub mesh_materials: SmallVec<[u32; 8]>,
    pub skeleton: Option<Skeleton>,
    /// User-supplied pose override; when present, takes precedence over
    /// `animation` regardless of `animation_mode`.
    pub override_pose: Option<Vec<Mat4>>,
    pub animation: Option<AnimationRef>,
    pub animation_mode: AnimationMode,
    pub bounds: Aabb,
}

impl Model {
    /// Invariant: `meshes.len() == mesh_materials.len()`; every
    /// `mesh_materials[i]` is a valid index into `materials`; bone arrays
    /// either all present or all absent.
    pub fn new(
        meshes: SmallVec<[Handle<Mesh>; 8]>,
        materials: SmallVec<[Material; 8]>,
        mesh_materials: SmallVec<[u32; 8]>,
        bounds: Aabb,
    ) -> Self {
        debug_assert_eq!(meshes.len(), mesh_materials.len());
        debug_assert!(mesh_materials.iter().all(|&i| (i as usize) < materials.len()));
        Self {
            meshes,
            materials,
            mesh_materials,
            skeleton: None,
            override_pose: None,
            animation: None,
            animation_mode: AnimationMode::Internal,
            bounds,
        }
    }

    pub fn is_skinned(&self) -> bool {
        self.skeleton.is_some()
    }

    pub fn material_for_mesh(&self, mesh_index: usize) -> &Material {
        &self.materials[self.mesh_materials[mesh_index] as usize]
    }

    /// `true` when this model has a pose source (animation or override)
    /// that `DrawCallManager::push` must stage into the bone buffer.
    pub fn has_pose(&self) -> bool {
        self.is_skinned() && (self.override_pose.is_some() || self.animation.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::Arena;

    #[test]
    fn mesh_material_indices_are_valid() {
        let mut materials: SmallVec<[Material; 8]> = SmallVec::new();
        materials.push(Material::default());
        materials.push(Material::default());
        let mut arena: Arena<Mesh> = Arena::new();
        let meshes: SmallVec<[Handle<Mesh>; 8]> = SmallVec::new();
        let _ = &arena;
        let model = Model::new(meshes, materials, SmallVec::new(), Aabb::default());
        assert!(!model.is_skinned());
        assert!(!model.has_pose());
    }

    #[test]
    fn skeleton_consistency_detects_mismatched_arrays() {
        let mut skeleton = Skeleton::default();
        skeleton.names.push("root".into());
        skeleton.parents.push(-1);
        skeleton.bind_pose.push(Mat4::IDENTITY);
        assert!(!skeleton.is_consistent());
        skeleton.offsets.push(Mat4::IDENTITY);
        assert!(skeleton.is_consistent());
    }
}
