//! Field, style and interaction configuration.

use serde::{Deserialize, Serialize};

use crate::core::planner::PlanParams;
use crate::renderer::surface::Rgba;

/// How a field is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawMode {
    #[default]
    Dots,
    /// Dots plus faint lines between close neighbours.
    DotsLinks,
}

/// Whether particles drift on their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Motion {
    /// Ambient noise and pulse kicks enabled.
    #[default]
    Drift,
    /// No ambient noise, no pulse kick; particles only move when poked.
    Static,
}

/// Cosmetic state, mutable at runtime via `set_style`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldStyle {
    pub mode: DrawMode,
    pub motion: Motion,
    pub color: Rgba,
    /// Highlight colors sampled by elapsed fraction: start, middle, end.
    pub highlight: [Rgba; 3],
    pub min_alpha: f32,
    pub max_alpha: f32,
    /// Multiplier on every particle's base radius.
    pub size: f32,
    /// Link distance as a multiple of the current spacing.
    pub link_distance: f32,
    pub link_alpha: f32,
}

impl Default for FieldStyle {
    fn default() -> Self {
        Self {
            mode: DrawMode::Dots,
            motion: Motion::Drift,
            color: Rgba::new(0.78, 0.84, 1.0, 1.0),
            highlight: [
                Rgba::new(1.0, 1.0, 1.0, 1.0),
                Rgba::new(1.0, 0.78, 0.35, 1.0),
                Rgba::new(0.78, 0.84, 1.0, 1.0),
            ],
            min_alpha: 0.25,
            max_alpha: 0.85,
            size: 1.6,
            link_distance: 1.6,
            link_alpha: 0.14,
        }
    }
}

/// Partial style update. Unset fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StylePatch {
    pub mode: Option<DrawMode>,
    pub motion: Option<Motion>,
    pub color: Option<Rgba>,
    pub highlight: Option<[Rgba; 3]>,
    pub min_alpha: Option<f32>,
    pub max_alpha: Option<f32>,
    pub size: Option<f32>,
    pub link_distance: Option<f32>,
    pub link_alpha: Option<f32>,
}

impl StylePatch {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Merge into `style`, ignoring non-finite numbers.
    pub fn apply_to(&self, style: &mut FieldStyle) {
        if let Some(mode) = self.mode {
            style.mode = mode;
        }
        if let Some(motion) = self.motion {
            style.motion = motion;
        }
        if let Some(color) = self.color {
            style.color = color;
        }
        if let Some(highlight) = self.highlight {
            style.highlight = highlight;
        }
        set_unit(&mut style.min_alpha, self.min_alpha);
        set_unit(&mut style.max_alpha, self.max_alpha);
        if style.min_alpha > style.max_alpha {
            std::mem::swap(&mut style.min_alpha, &mut style.max_alpha);
        }
        set_positive(&mut style.size, self.size);
        set_positive(&mut style.link_distance, self.link_distance);
        set_unit(&mut style.link_alpha, self.link_alpha);
    }
}

fn set_unit(slot: &mut f32, value: Option<f32>) {
    if let Some(v) = value.filter(|v| v.is_finite()) {
        *slot = v.clamp(0.0, 1.0);
    }
}

fn set_positive(slot: &mut f32, value: Option<f32>) {
    if let Some(v) = value.filter(|v| v.is_finite() && *v > 0.0) {
        *slot = v;
    }
}

/// Ceiling on `cap` and on the planner's `max_count`, whatever the host asks for.
pub const MAX_CAP: usize = 4096;

/// Per-field configuration, fixed at construction except for `style`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    /// Hard ceiling on live particles.
    pub cap: usize,
    pub planner: PlanParams,
    /// Seconds for a displaced particle to settle back home.
    pub settle_time: f32,
    /// Ambient drift acceleration (px/s²).
    pub noise: f32,
    /// Radial kick per unit of pulse energy (px/s²).
    pub kick: f32,
    /// Pulse energy lost per second.
    pub kick_decay: f32,
    pub twinkle: bool,
    /// Persisted user preference; a disabled field holds and draws nothing.
    pub enabled: bool,
    pub style: FieldStyle,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            cap: 1200,
            planner: PlanParams::default(),
            settle_time: 2.2,
            noise: 3.0,
            kick: 45.0,
            kick_decay: 1.6,
            twinkle: true,
            enabled: true,
            style: FieldStyle::default(),
        }
    }
}

impl FieldConfig {
    /// Parse from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Clamp host-supplied counts to `MAX_CAP`.
    pub fn sanitized(mut self) -> Self {
        self.cap = self.cap.min(MAX_CAP);
        self.planner.max_count = self.planner.max_count.min(MAX_CAP);
        self.planner.min_count = self.planner.min_count.min(self.planner.max_count);
        self
    }

    pub fn with_cap(mut self, cap: usize) -> Self {
        self.cap = cap;
        self
    }

    pub fn with_style(mut self, style: FieldStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_settle_time(mut self, seconds: f32) -> Self {
        self.settle_time = seconds;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Settle time with a sane fallback for non-positive values.
    pub fn settle_time(&self) -> f32 {
        if self.settle_time.is_finite() && self.settle_time > 0.05 {
            self.settle_time
        } else {
            2.2
        }
    }
}

/// How a poke moves particles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PokeMode {
    /// Radial impulse with cubic falloff.
    #[default]
    Legacy,
    /// Snap particles to the poke rim, plus a small outward kick.
    Plow,
}

/// Parameters for `ParticleField::poke`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PokeConfig {
    /// Affected radius in px.
    pub radius: f32,
    pub strength: f32,
    pub mode: PokeMode,
    /// Queue highlight events at the affected particles.
    pub highlight: bool,
    pub highlight_amp: f32,
    /// Highlight duration in seconds.
    pub highlight_dur: f32,
    pub force_mul: f32,
}

impl Default for PokeConfig {
    fn default() -> Self {
        Self {
            radius: 64.0,
            strength: 28.0,
            mode: PokeMode::Legacy,
            highlight: false,
            highlight_amp: 1.0,
            highlight_dur: 0.9,
            force_mul: 1.0,
        }
    }
}

impl PokeConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn plow(radius: f32) -> Self {
        Self {
            radius,
            mode: PokeMode::Plow,
            ..Self::default()
        }
    }

    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_strength(mut self, strength: f32) -> Self {
        self.strength = strength;
        self
    }

    pub fn with_highlight(mut self, amp: f32, duration: f32) -> Self {
        self.highlight = true;
        self.highlight_amp = amp;
        self.highlight_dur = duration;
        self
    }

    pub fn with_force_mul(mut self, force_mul: f32) -> Self {
        self.force_mul = force_mul;
        self
    }
}

/// Spatial weighting for directional pushes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Falloff {
    /// `1 - d/r`
    #[default]
    Linear,
    /// `exp(-4.5 (d/r)²)`
    Gaussian,
}

impl Falloff {
    /// Weight for normalized distance `t = d/r` in [0, 1].
    pub fn weight(self, t: f32) -> f32 {
        match self {
            Self::Linear => (1.0 - t).max(0.0),
            Self::Gaussian => (-4.5 * t * t).exp(),
        }
    }
}

/// Parameters for `ParticleField::push_directional`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PushConfig {
    pub radius: f32,
    pub strength: f32,
    pub falloff: Falloff,
    pub force_mul: f32,
    /// Particle mass; impulses are divided by it.
    pub mass: f32,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            radius: 64.0,
            strength: 28.0,
            falloff: Falloff::Linear,
            force_mul: 1.0,
            mass: 1.0,
        }
    }
}

impl PushConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_strength(mut self, strength: f32) -> Self {
        self.strength = strength;
        self
    }

    pub fn with_falloff(mut self, falloff: Falloff) -> Self {
        self.falloff = falloff;
        self
    }
}
