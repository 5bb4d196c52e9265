//! Shadow update policy and atlas slot allocation (§4.5).

/// How a light's shadow map is kept up to date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShadowUpdateMode {
    #[default]
    Continuous,
    Interval,
    Manual,
}

/// Which triangles rasterize into a light's shadow map, relative to the
/// casting material's own cull mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShadowFaceMode {
    #[default]
    Auto,
    Front,
    Back,
    Both,
}

/// Per-light CPU-side shadow bookkeeping: update policy, soft-shadow
/// parameters, and the dirty flags the manager consults each frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowState {
    pub enabled: bool,
    pub update_mode: ShadowUpdateMode,
    pub interval_sec: f32,
    pub timer_sec: f32,
    pub needs_update: bool,
    pub vp_dirty: bool,
    pub bleeding_bias: f32,
    pub softness: f32,
    pub lambda: f32,
    /// Range derived by the last directional VP update (`-min_z`); for
    /// spot/omni this mirrors the light's own configured range.
    pub derived_range: f32,
}

impl ShadowState {
    pub fn new(lambda: f32) -> Self {
        Self {
            enabled: false,
            update_mode: ShadowUpdateMode::Continuous,
            interval_sec: 1.0 / 60.0,
            timer_sec: 0.0,
            needs_update: true,
            vp_dirty: true,
            bleeding_bias: 0.2,
            softness: 1.0 / 2048.0,
            lambda,
            derived_range: 0.0,
        }
    }

    /// Sets the update mode. Per §8's idempotence property, calling this
    /// twice with the same mode leaves `timer_sec` unchanged on the second
    /// call (only an actual mode *change* resets the timer).
    pub fn set_update_mode(&mut self, mode: ShadowUpdateMode) {
        if self.update_mode == mode {
            return;
        }
        self.update_mode = mode;
        self.timer_sec = 0.0;
        self.needs_update = matches!(mode, ShadowUpdateMode::Continuous);
    }

    /// Manual-mode trigger: flips `needs_update` true for exactly one
    /// subsequent shadow pass.
    pub fn request_manual_update(&mut self) {
        self.needs_update = true;
    }

    /// Advances the interval timer by `dt` seconds and flips
    /// `needs_update` when the interval elapses. Called once per frame by
    /// the manager for every shadow-enabled light.
    pub fn advance(&mut self, dt: f32) {
        match self.update_mode {
            ShadowUpdateMode::Continuous => self.needs_update = true,
            ShadowUpdateMode::Interval => {
                if !self.needs_update {
                    self.timer_sec += dt;
                    if self.timer_sec >= self.interval_sec {
                        self.timer_sec -= self.interval_sec;
                        self.needs_update = true;
                    }
                }
            }
            ShadowUpdateMode::Manual => {}
        }
    }

    /// Called once the shadow pass for this light has actually rendered,
    /// clearing the one-shot `needs_update` flag for interval/manual
    /// modes (continuous re-arms itself every frame in `advance`).
    pub fn consume_update(&mut self) {
        if !matches!(self.update_mode, ShadowUpdateMode::Continuous) {
            self.needs_update = false;
        }
    }
}

/// Fixed-capacity shadow-atlas slot table with first-fit recycling:
/// destroying a light's shadow frees its slot immediately for the next
/// light that requests one, avoiding fragmentation without a
/// defragmentation pass (Open Question resolution, see `DESIGN.md`).
pub struct ShadowAtlas {
    slots: Vec<bool>,
}

impl ShadowAtlas {
    pub fn new(capacity: u32) -> Self {
        Self {
            slots: vec![false; capacity as usize],
        }
    }

    pub fn capacity(&self) -> u32 {
        self.slots.len() as u32
    }

    /// Allocates the lowest-index free slot, or `None` if the atlas is
    /// exhausted.
    pub fn allocate(&mut self) -> Option<u32> {
        let index = self.slots.iter().position(|used| !used)?;
        self.slots[index] = true;
        Some(index as u32)
    }

    /// Frees a slot for reuse. Safe to call with an already-free slot
    /// (idempotent, matching the crate-wide destroy contract).
    pub fn free(&mut self, slot: u32) {
        if let Some(used) = self.slots.get_mut(slot as usize) {
            *used = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setting_same_mode_twice_preserves_timer() {
        let mut state = ShadowState::new(60.0);
        state.set_update_mode(ShadowUpdateMode::Interval);
        state.timer_sec = 0.4;
        state.set_update_mode(ShadowUpdateMode::Interval);
        assert_eq!(state.timer_sec, 0.4);
    }

    #[test]
    fn manual_mode_updates_exactly_once_after_request() {
        let mut state = ShadowState::new(40.0);
        state.set_update_mode(ShadowUpdateMode::Manual);
        assert!(!state.needs_update);
        for _ in 0..60 {
            state.advance(1.0 / 60.0);
        }
        assert!(!state.needs_update);
        state.request_manual_update();
        assert!(state.needs_update);
        state.consume_update();
        assert!(!state.needs_update);
    }

    #[test]
    fn interval_mode_fires_after_elapsed_time() {
        let mut state = ShadowState::new(40.0);
        state.set_update_mode(ShadowUpdateMode::Interval);
        state.interval_sec = 1.0;
        state.consume_update();
        state.advance(0.6);
        assert!(!state.needs_update);
        state.advance(0.6);
        assert!(state.needs_update);
    }

    #[test]
    fn atlas_recycles_freed_slots_first_fit() {
        let mut atlas = ShadowAtlas::new(2);
        let a = atlas.allocate().unwrap();
        let b = atlas.allocate().unwrap();
        assert!(atlas.allocate().is_none());
        atlas.free(a);
        let c = atlas.allocate().unwrap();
        assert_eq!(c, a);
        let _ = b;
    }

    #[test]
    fn freeing_an_already_free_slot_is_idempotent() {
        let mut atlas = ShadowAtlas::new(1);
        atlas.free(0);
        atlas.free(0);
        assert_eq!(atlas.allocate(), Some(0));
    }
}
