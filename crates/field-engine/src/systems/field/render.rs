//! Draw a field's particles onto a `Surface`.
//!
//! Dot radius does not follow camera zoom: dots stay the same pixel size at
//! every zoom level.

use std::f32::consts::TAU;

use crate::renderer::surface::{Rgba, Surface};

use super::config::{DrawMode, FieldStyle};
use super::highlight::HighlightQueue;
use super::particle::{FadeState, Particle};

/// Above this population links are not drawn.
pub const LINK_MAX_POPULATION: usize = 420;
/// Fade below which a particle is not drawn at all.
const MIN_VISIBLE_FADE: f32 = 0.004;

/// Per-frame inputs to `draw`.
#[derive(Debug, Clone, Copy)]
pub struct DrawParams {
    /// Field clock time, for highlights.
    pub now: f32,
    /// Combined size multiplier (style size × budget size scale).
    pub size_scale: f32,
    pub spacing: f32,
    /// Links are allowed this frame (not gesturing, not a skipped non-critical frame).
    pub links_allowed: bool,
}

/// Shimmer alpha from phase: min..max following a sine of the phase.
pub fn shimmer_alpha(style: &FieldStyle, phase: f32) -> f32 {
    let wave = 0.5 + 0.5 * (phase * TAU).sin();
    style.min_alpha + (style.max_alpha - style.min_alpha) * wave
}

/// Clear `surface` and draw one frame. Returns the number of dots drawn.
pub fn draw(
    particles: &[Particle],
    style: &FieldStyle,
    highlights: &HighlightQueue,
    params: &DrawParams,
    surface: &mut dyn Surface,
) -> usize {
    surface.clear();

    if style.mode == DrawMode::DotsLinks
        && params.links_allowed
        && particles.len() <= LINK_MAX_POPULATION
    {
        draw_links(particles, style, params, surface);
    }

    let mut drawn = 0;
    for p in particles {
        if p.state == FadeState::PendingRemoval || p.fade.current < MIN_VISIBLE_FADE {
            continue;
        }
        let alpha = shimmer_alpha(style, p.phase) * p.fade.current;
        let mut color = style.color;
        let mut radius = p.radius * params.size_scale;
        if !highlights.is_empty() {
            if let Some(h) = highlights.sample(p.pos, params.now, &style.highlight) {
                color = color.lerp(h.color, h.weight);
                radius *= h.size;
            }
        }
        surface.fill_circle(p.pos.x, p.pos.y, radius, color.with_alpha(alpha));
        drawn += 1;
    }
    drawn
}

fn draw_links(particles: &[Particle], style: &FieldStyle, params: &DrawParams, surface: &mut dyn Surface) {
    let max_dist = params.spacing * style.link_distance;
    if max_dist.is_nan() || max_dist <= 0.0 {
        return;
    }
    let max_sq = max_dist * max_dist;
    let color: Rgba = style.color;
    for (i, a) in particles.iter().enumerate() {
        if a.state == FadeState::PendingRemoval {
            continue;
        }
        for b in &particles[i + 1..] {
            if b.state == FadeState::PendingRemoval {
                continue;
            }
            let d_sq = a.pos.distance_squared(b.pos);
            if d_sq >= max_sq {
                continue;
            }
            let strength = 1.0 - d_sq.sqrt() / max_dist;
            let alpha = style.link_alpha * strength * a.fade.current.min(b.fade.current);
            if alpha <= 0.0 {
                continue;
            }
            surface.stroke_line(a.pos.x, a.pos.y, b.pos.x, b.pos.y, 1.0, color.with_alpha(alpha));
        }
    }
}
