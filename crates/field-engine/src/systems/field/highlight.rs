//! Time-boxed highlight events. Rendering-only; physics never reads these.

use std::collections::VecDeque;

use glam::Vec2;

use crate::renderer::surface::Rgba;

/// Queue bound; the oldest event is dropped when full.
pub const MAX_HIGHLIGHTS: usize = 32;
/// Largest size boost a highlight may add (fraction of base radius).
pub const MAX_SIZE_BOOST: f32 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Highlight {
    pub center: Vec2,
    pub radius: f32,
    /// Field clock time the highlight started.
    pub start: f32,
    pub duration: f32,
    pub amplitude: f32,
}

impl Highlight {
    /// Elapsed fraction in [0, 1), or `None` outside the window.
    pub fn progress(&self, now: f32) -> Option<f32> {
        let t = (now - self.start) / self.duration;
        (0.0..1.0).contains(&t).then_some(t)
    }
}

/// Combined effect of all highlights on one particle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HighlightSample {
    /// Blend weight toward `color`, in [0, 1].
    pub weight: f32,
    pub color: Rgba,
    /// Radius multiplier, in [1, 1 + MAX_SIZE_BOOST].
    pub size: f32,
}

#[derive(Debug, Default)]
pub struct HighlightQueue {
    events: VecDeque<Highlight>,
}

impl HighlightQueue {
    pub fn new() -> Self {
        Self {
            events: VecDeque::with_capacity(MAX_HIGHLIGHTS),
        }
    }

    /// Queue an event. Invalid geometry or timing is dropped.
    pub fn push(&mut self, highlight: Highlight) {
        let valid = highlight.center.is_finite()
            && highlight.radius.is_finite()
            && highlight.radius > 0.0
            && highlight.duration.is_finite()
            && highlight.duration > 0.0
            && highlight.amplitude.is_finite();
        if !valid {
            return;
        }
        if self.events.len() == MAX_HIGHLIGHTS {
            self.events.pop_front();
        }
        self.events.push_back(highlight);
    }

    /// Drop events whose window has closed.
    pub fn expire(&mut self, now: f32) {
        self.events.retain(|h| now - h.start < h.duration);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Strongest highlight affecting `pos` at time `now`, if any.
    pub fn sample(&self, pos: Vec2, now: f32, gradient: &[Rgba; 3]) -> Option<HighlightSample> {
        let mut best: Option<HighlightSample> = None;
        for h in &self.events {
            let Some(t) = h.progress(now) else {
                continue;
            };
            let d = h.center.distance(pos);
            if d >= h.radius {
                continue;
            }
            let spatial = 1.0 - d / h.radius;
            let amp = h.amplitude.clamp(0.0, 1.0);
            let weight = (amp * spatial * (1.0 - t)).clamp(0.0, 1.0);
            if best.is_some_and(|b| b.weight >= weight) {
                continue;
            }
            best = Some(HighlightSample {
                weight,
                color: sample_gradient(gradient, t),
                size: 1.0 + MAX_SIZE_BOOST * weight,
            });
        }
        best
    }
}

/// Sample a 3-stop gradient at `t` in [0, 1].
pub fn sample_gradient(stops: &[Rgba; 3], t: f32) -> Rgba {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        stops[0].lerp(stops[1], t * 2.0)
    } else {
        stops[1].lerp(stops[2], (t - 0.5) * 2.0)
    }
}
