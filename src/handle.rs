//! Opaque resource handles.
//!
//! Long-lived resources (meshes, materials, lights, cubemaps, material
//! shaders, textures, render textures, instance buffers) are stored in
//! `slotmap`-backed arenas and referenced by a generational [`Handle<T>`].
//! `destroy` is idempotent on an already-removed (or never-valid) handle,
//! matching the resource API's null-safety contract.

use slotmap::{new_key_type, Key, KeyData, SlotMap};
use std::marker::PhantomData;

new_key_type! {
    struct RawKey;
}

/// An opaque, generational handle to a `T` owned by an [`Arena<T>`].
///
/// Handles compare by identity (including generation), so a destroyed and
/// later-reused slot never aliases an old handle.
pub struct Handle<T> {
    key: RawKey,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}
impl<T> Eq for Handle<T> {}

impl<T> std::hash::Hash for Handle<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl<T> std::fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Handle({:?})", self.key)
    }
}

impl<T> Handle<T> {
    /// Encodes this handle as a plain `u64`, for storage in contexts that
    /// can't carry a generic type parameter (e.g. `MeshVariant::Dynamic`).
    pub fn to_bits(self) -> u64 {
        self.key.data().as_ffi()
    }

    /// Decodes a handle previously produced by [`Handle::to_bits`]. Passing
    /// bits that didn't come from `to_bits` on this same handle kind
    /// produces a handle that simply won't resolve in the matching arena.
    pub fn from_bits(bits: u64) -> Self {
        Self {
            key: RawKey::from(KeyData::from_ffi(bits)),
            _marker: PhantomData,
        }
    }
}

/// A generational arena owning every live `T` of one resource kind.
pub struct Arena<T> {
    slots: SlotMap<RawKey, T>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self {
            slots: SlotMap::with_key(),
        }
    }
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `value` and returns a handle to it.
    pub fn insert(&mut self, value: T) -> Handle<T> {
        let key = self.slots.insert(value);
        Handle {
            key,
            _marker: PhantomData,
        }
    }

    /// Removes the resource behind `handle`. Returns `true` if a resource
    /// was actually removed; a stale or already-destroyed handle returns
    /// `false` without error, matching "destroy is idempotent on null".
    pub fn destroy(&mut self, handle: Handle<T>) -> bool {
        self.slots.remove(handle.key).is_some()
    }

    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        self.slots.get(handle.key)
    }

    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        self.slots.get_mut(handle.key)
    }

    pub fn contains(&self, handle: Handle<T>) -> bool {
        self.slots.contains_key(handle.key)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> {
        self.slots.iter().map(|(key, value)| {
            (
                Handle {
                    key,
                    _marker: PhantomData,
                },
                value,
            )
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Handle<T>, &mut T)> {
        self.slots.iter_mut().map(|(key, value)| {
            (
                Handle {
                    key,
                    _marker: PhantomData,
                },
                value,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destroy_is_idempotent() {
        let mut arena: Arena<u32> = Arena::new();
        let h = arena.insert(7);
        assert!(arena.destroy(h));
        assert!(!arena.destroy(h));
        assert!(arena.get(h).is_none());
    }

    #[test]
    fn bits_round_trip_to_an_equal_handle() {
        let mut arena: Arena<u32> = Arena::new();
        let h = arena.insert(9);
        let bits = h.to_bits();
        let restored: Handle<u32> = Handle::from_bits(bits);
        assert_eq!(h, restored);
        assert_eq!(arena.get(restored), Some(&9));
    }

    #[test]
    fn stale_handle_does_not_alias_reused_slot() {
        let mut arena: Arena<u32> = Arena::new();
        let h1 = arena.insert(1);
        arena.destroy(h1);
        let h2 = arena.insert(2);
        assert_ne!(h1, h2);
        assert!(arena.get(h1).is_none());
        assert_eq!(arena.get(h2), Some(&2));
    }
}
