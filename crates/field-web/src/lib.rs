//! `#[wasm_bindgen]` exports for the page-wide field board.
//!
//! The page calls `board_init` once, then per frame `board_update_fps` and
//! `board_tick`, and reads each field's instance buffers straight out of wasm
//! memory through the pointer accessors.

pub mod runner;

pub use runner::BoardRunner;

use std::cell::RefCell;

use field_engine::{DotInstance, LinkInstance};
use wasm_bindgen::prelude::*;

thread_local! {
    static RUNNER: RefCell<Option<BoardRunner>> = RefCell::new(None);
}

/// Run `f` against the board, or return `fallback` before `board_init`.
fn with_runner<R>(fallback: R, f: impl FnOnce(&mut BoardRunner) -> R) -> R {
    RUNNER.with(|cell| match cell.borrow_mut().as_mut() {
        Some(runner) => f(runner),
        None => fallback,
    })
}

#[wasm_bindgen]
pub fn board_init() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        web_sys::console::warn_1(&JsValue::from_str("field-web: logger already installed"));
    }

    RUNNER.with(|cell| {
        *cell.borrow_mut() = Some(BoardRunner::new());
    });
    log::info!("field-web: initialized");
}

#[wasm_bindgen]
pub fn board_tick(dt: f32) {
    with_runner((), |r| r.tick(dt));
}

#[wasm_bindgen]
pub fn board_update_fps(fps: f32) {
    with_runner((), |r| r.update_fps(fps));
}

/// 0 = Low .. 3 = Ultra; negative unlocks.
#[wasm_bindgen]
pub fn board_set_quality_lock(tier: i32) {
    with_runner((), |r| r.set_quality_lock(tier));
}

#[wasm_bindgen]
pub fn board_set_budget_multiplier(multiplier: f32) {
    with_runner((), |r| r.set_budget_multiplier(multiplier));
}

#[wasm_bindgen]
pub fn board_quality_tier() -> u32 {
    with_runner(0, |r| r.quality_tier())
}

// ---- Camera signals ----

#[wasm_bindgen]
pub fn board_set_gesturing(gesturing: bool) {
    with_runner((), |r| r.set_gesturing(gesturing));
}

#[wasm_bindgen]
pub fn board_commit_zoom(zoom: f32) {
    with_runner((), |r| r.commit_zoom(zoom));
}

#[wasm_bindgen]
pub fn board_begin_overview(overview: bool) {
    with_runner((), |r| r.begin_overview_transition(overview));
}

#[wasm_bindgen]
pub fn board_end_overview() {
    with_runner((), |r| r.end_overview_transition());
}

// ---- Fields ----

/// Returns the new field's id, or 0 before `board_init`.
#[wasm_bindgen]
pub fn field_create(seed: &str, config_json: &str, width: f32, height: f32) -> u32 {
    with_runner(0, |r| r.create_field(seed, config_json, width, height))
}

#[wasm_bindgen]
pub fn field_set_size(id: u32, width: f32, height: f32) {
    with_runner((), |r| r.set_size(id, width, height));
}

#[wasm_bindgen]
pub fn field_poke(id: u32, x: f32, y: f32, config_json: &str) {
    with_runner((), |r| r.poke(id, x, y, config_json));
}

#[wasm_bindgen]
pub fn field_push(id: u32, x: f32, y: f32, dir_x: f32, dir_y: f32, config_json: &str) {
    with_runner((), |r| r.push(id, x, y, dir_x, dir_y, config_json));
}

#[wasm_bindgen]
pub fn field_pulse(id: u32, intensity: f32) {
    with_runner((), |r| r.pulse(id, intensity));
}

#[wasm_bindgen]
pub fn field_set_style(id: u32, patch_json: &str) {
    with_runner((), |r| r.set_style(id, patch_json));
}

#[wasm_bindgen]
pub fn field_set_paused(id: u32, paused: bool) {
    with_runner((), |r| r.set_paused(id, paused));
}

#[wasm_bindgen]
pub fn field_set_non_reactive(id: u32, mode: i32) {
    with_runner((), |r| r.set_non_reactive(id, mode));
}

#[wasm_bindgen]
pub fn field_destroy(id: u32) -> bool {
    with_runner(false, |r| r.destroy_field(id))
}

// ---- Data accessors ----

#[wasm_bindgen]
pub fn field_dots_ptr(id: u32) -> *const f32 {
    with_runner(std::ptr::null(), |r| r.dots_ptr(id))
}

#[wasm_bindgen]
pub fn field_dot_count(id: u32) -> u32 {
    with_runner(0, |r| r.dot_count(id))
}

#[wasm_bindgen]
pub fn field_links_ptr(id: u32) -> *const f32 {
    with_runner(std::ptr::null(), |r| r.links_ptr(id))
}

#[wasm_bindgen]
pub fn field_link_count(id: u32) -> u32 {
    with_runner(0, |r| r.link_count(id))
}

/// `[particle_count, live_count, target, spacing, pulse_energy]` as a fresh array.
#[wasm_bindgen]
pub fn field_stats(id: u32) -> js_sys::Float32Array {
    let stats = with_runner([0.0; runner::STATS_FLOATS], |r| r.field_stats(id));
    js_sys::Float32Array::from(&stats[..])
}

#[wasm_bindgen]
pub fn get_dot_floats() -> u32 {
    DotInstance::FLOATS as u32
}

#[wasm_bindgen]
pub fn get_link_floats() -> u32 {
    LinkInstance::FLOATS as u32
}
