//! Density/layout planner: how many particles a surface gets and how far apart they sit.

use serde::{Deserialize, Serialize};

use super::rng::Rng;

/// Planner parameters. Every field can be overridden per field config.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanParams {
    /// Reference area in px².
    pub base_area: f32,
    /// Particles placed on `base_area`.
    pub base_count: f32,
    pub min_count: usize,
    pub max_count: usize,
    /// Spacing relaxation factor (< 1 packs particles slightly tighter than the grid).
    pub relax: f32,
}

impl Default for PlanParams {
    fn default() -> Self {
        Self {
            base_area: 10_000.0,
            base_count: 22.0,
            min_count: 60,
            max_count: 1200,
            relax: 0.85,
        }
    }
}

/// Result of `plan`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plan {
    pub count: usize,
    pub spacing: f32,
}

/// Target particle count and spacing for a `width` x `height` surface.
/// Dimensions are clamped to at least 1 px; non-finite values count as 1.
pub fn plan(width: f32, height: f32, params: &PlanParams) -> Plan {
    let w = clamp_dim(width);
    let h = clamp_dim(height);
    let area = w * h;

    let base_area = if params.base_area > 0.0 { params.base_area } else { 10_000.0 };
    let ideal = (area / base_area) * params.base_count.max(0.0);
    let min = params.min_count.max(1);
    let max = params.max_count.max(min);
    let count = (ideal.round() as usize).clamp(min, max);

    Plan {
        count,
        spacing: spacing_for(area, count, params.relax),
    }
}

/// Spacing for `count` particles over `area` px².
pub fn spacing_for(area: f32, count: usize, relax: f32) -> f32 {
    (area.max(1.0) / count.max(1) as f32).sqrt() * relax
}

fn clamp_dim(v: f32) -> f32 {
    if v.is_finite() {
        v.max(1.0)
    } else {
        1.0
    }
}

pub const BASE_RADIUS: f32 = 1.0;
pub const RADIUS_JITTER: f32 = 0.35;
pub const MIN_RADIUS: f32 = 0.5;

/// Base screen radius for a new particle: 1 px ± 0.35, never below 0.5.
pub fn particle_radius(rng: &mut Rng) -> f32 {
    (BASE_RADIUS + rng.signed() * RADIUS_JITTER).max(MIN_RADIUS)
}

/// Deterministic generator for initial placement, derived from a string seed.
pub fn seeded_generator(seed: &str) -> Rng {
    Rng::from_seed_str(seed)
}
