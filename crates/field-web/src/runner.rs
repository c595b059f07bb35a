use std::collections::HashMap;
use std::fmt::Display;

use field_engine::core::quality::QualityTier;
use field_engine::{FieldBoard, FieldConfig, FieldId, HostViewport, PokeConfig, PushConfig, StylePatch};

/// Floats per entry of `field_stats`.
pub const STATS_FLOATS: usize = 5;

/// Board plus the host-side size handles of every field.
///
/// The page keeps one `BoardRunner` in a `thread_local!` and exports free
/// functions via `#[wasm_bindgen]`; fields are addressed by their numeric id.
pub struct BoardRunner {
    board: FieldBoard,
    hosts: HashMap<FieldId, HostViewport>,
}

impl BoardRunner {
    pub fn new() -> Self {
        Self {
            board: FieldBoard::new(),
            hosts: HashMap::new(),
        }
    }

    pub fn tick(&mut self, dt: f32) {
        self.board.tick(dt);
    }

    pub fn update_fps(&mut self, fps: f32) {
        self.board.update_fps(fps);
    }

    /// Lock the tier by index (0 = Low .. 3 = Ultra); anything else unlocks.
    pub fn set_quality_lock(&mut self, index: i32) {
        self.board.set_quality_lock(QualityTier::from_index(index));
    }

    pub fn set_budget_multiplier(&mut self, multiplier: f32) {
        self.board.set_budget_multiplier(multiplier);
    }

    pub fn quality_tier(&self) -> u32 {
        self.board.tier() as u32
    }

    pub fn set_gesturing(&mut self, gesturing: bool) {
        self.board.set_gesturing(gesturing);
    }

    pub fn commit_zoom(&mut self, zoom: f32) {
        self.board.commit_zoom(zoom);
    }

    pub fn begin_overview_transition(&mut self, overview: bool) {
        self.board.begin_overview_transition(overview);
    }

    pub fn end_overview_transition(&mut self) {
        self.board.end_overview_transition();
    }

    /// Create a field for a toy. Bad config JSON falls back to defaults.
    pub fn create_field(&mut self, seed: &str, config_json: &str, width: f32, height: f32) -> u32 {
        let config = parse_or_default("field config", config_json, FieldConfig::from_json);
        let host = HostViewport::new(width, height).with_camera(self.board.camera().clone());
        let id = self.board.spawn(seed, host.clone(), config);
        self.hosts.insert(id, host);
        id.0
    }

    /// Push the measured canvas size. The field snaps to it on its next tick.
    pub fn set_size(&mut self, id: u32, width: f32, height: f32) {
        if let Some(host) = self.hosts.get(&FieldId(id)) {
            host.set_size(width, height);
            self.board.notify_resize();
        }
    }

    pub fn poke(&mut self, id: u32, x: f32, y: f32, config_json: &str) {
        let config: PokeConfig = parse_or_default("poke config", config_json, PokeConfig::from_json);
        if let Some(field) = self.board.get_mut(FieldId(id)) {
            field.poke(x, y, &config);
        }
    }

    pub fn push(&mut self, id: u32, x: f32, y: f32, dir_x: f32, dir_y: f32, config_json: &str) {
        let config: PushConfig = parse_or_default("push config", config_json, PushConfig::from_json);
        if let Some(field) = self.board.get_mut(FieldId(id)) {
            field.push_directional(x, y, dir_x, dir_y, &config);
        }
    }

    pub fn pulse(&mut self, id: u32, intensity: f32) {
        if let Some(field) = self.board.get_mut(FieldId(id)) {
            field.pulse(intensity);
        }
    }

    /// Merge a style patch. Unparseable JSON changes nothing.
    pub fn set_style(&mut self, id: u32, patch_json: &str) {
        let patch = match StylePatch::from_json(patch_json) {
            Ok(patch) => patch,
            Err(e) => {
                log::warn!("field {}: ignoring style patch: {}", id, e);
                return;
            }
        };
        if let Some(field) = self.board.get_mut(FieldId(id)) {
            field.set_style(&patch);
        }
    }

    pub fn set_paused(&mut self, id: u32, paused: bool) {
        if let Some(field) = self.board.get_mut(FieldId(id)) {
            field.set_paused(paused);
        }
    }

    /// `mode` < 0 follows the overview transition, 0 forces reactive, > 0 non-reactive.
    pub fn set_non_reactive(&mut self, id: u32, mode: i32) {
        let value = match mode {
            m if m < 0 => None,
            0 => Some(false),
            _ => Some(true),
        };
        if let Some(field) = self.board.get_mut(FieldId(id)) {
            field.set_non_reactive(value);
        }
    }

    pub fn destroy_field(&mut self, id: u32) -> bool {
        self.hosts.remove(&FieldId(id));
        self.board.remove(FieldId(id))
    }

    pub fn field_count(&self) -> u32 {
        self.board.len() as u32
    }

    // ---- Pointer accessors for instance buffer reads ----

    pub fn dots_ptr(&self, id: u32) -> *const f32 {
        self.board
            .buffer(FieldId(id))
            .map_or(std::ptr::null(), |b| b.dots_ptr())
    }

    pub fn dot_count(&self, id: u32) -> u32 {
        self.board.buffer(FieldId(id)).map_or(0, |b| b.dot_count())
    }

    pub fn links_ptr(&self, id: u32) -> *const f32 {
        self.board
            .buffer(FieldId(id))
            .map_or(std::ptr::null(), |b| b.links_ptr())
    }

    pub fn link_count(&self, id: u32) -> u32 {
        self.board.buffer(FieldId(id)).map_or(0, |b| b.link_count())
    }

    /// `[particle_count, live_count, target, spacing, pulse_energy]`, zeros for unknown ids.
    pub fn field_stats(&self, id: u32) -> [f32; STATS_FLOATS] {
        match self.board.get(FieldId(id)) {
            Some(f) => [
                f.particle_count() as f32,
                f.live_count() as f32,
                f.target_desired() as f32,
                f.spacing(),
                f.pulse_energy(),
            ],
            None => [0.0; STATS_FLOATS],
        }
    }
}

impl Default for BoardRunner {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse host-supplied JSON. Empty input means defaults; bad input is logged and ignored.
fn parse_or_default<T: Default, E: Display>(what: &str, json: &str, parse: impl FnOnce(&str) -> Result<T, E>) -> T {
    if json.trim().is_empty() {
        return T::default();
    }
    match parse(json) {
        Ok(value) => value,
        Err(e) => {
            log::warn!("{}: invalid JSON, using defaults: {}", what, e);
            T::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_tick_fills_buffers() {
        let mut runner = BoardRunner::new();
        let id = runner.create_field("toy", "", 300.0, 200.0);
        runner.tick(1.0 / 60.0);
        assert!(runner.dot_count(id) > 0);
        assert!(!runner.dots_ptr(id).is_null());
        // High tier by default: 132 * 0.75
        assert_eq!(runner.field_stats(id)[2], 99.0);
    }

    #[test]
    fn bad_config_falls_back_to_defaults() {
        let mut runner = BoardRunner::new();
        let id = runner.create_field("toy", "{ not json", 200.0, 200.0);
        assert_eq!(runner.field_count(), 1);
        runner.poke(id, 100.0, 100.0, "also not json");
        runner.set_style(id, "[]");
        runner.tick(1.0 / 60.0);
        assert!(runner.dot_count(id) > 0);
    }

    #[test]
    fn size_updates_reach_the_field() {
        let mut runner = BoardRunner::new();
        runner.set_quality_lock(3);
        let id = runner.create_field("toy", "{}", 100.0, 100.0);
        runner.set_size(id, 400.0, 400.0);
        runner.tick(1.0 / 60.0);
        assert_eq!(runner.field_stats(id)[2], 352.0);
    }

    #[test]
    fn unknown_ids_are_harmless() {
        let mut runner = BoardRunner::new();
        runner.pulse(42, 1.0);
        runner.set_size(42, 10.0, 10.0);
        assert_eq!(runner.dot_count(42), 0);
        assert!(runner.dots_ptr(42).is_null());
        assert_eq!(runner.field_stats(42), [0.0; STATS_FLOATS]);
        assert!(!runner.destroy_field(42));
    }

    #[test]
    fn quality_lock_by_index() {
        let mut runner = BoardRunner::new();
        runner.set_quality_lock(0);
        assert_eq!(runner.quality_tier(), QualityTier::Low as u32);
        runner.set_quality_lock(-1);
        runner.update_fps(60.0);
        runner.update_fps(60.0);
        assert_eq!(runner.quality_tier(), QualityTier::Ultra as u32);
    }

    #[test]
    fn destroy_forgets_the_field() {
        let mut runner = BoardRunner::new();
        let id = runner.create_field("toy", "", 100.0, 100.0);
        assert!(runner.destroy_field(id));
        assert_eq!(runner.field_count(), 0);
    }
}
