//! Particle field: the animated dot background behind every toy.
//!
//! `ParticleField` is the facade. One instance per toy; the board ticks all
//! of them from a single frame callback. Within a tick the order is fixed:
//! reconcile population, integrate physics, update fades and twinkle, drop
//! bottomed-out particles, draw.

mod config;
mod highlight;
mod particle;
mod physics;
mod reconcile;
mod render;

pub use config::{
    DrawMode, Falloff, FieldConfig, FieldStyle, Motion, PokeConfig, PokeMode, PushConfig, StylePatch, MAX_CAP,
};
pub use highlight::{sample_gradient, Highlight, HighlightQueue, HighlightSample, MAX_HIGHLIGHTS};
pub use particle::{Fade, FadeState, Particle, REMOVE_FADE};
pub use physics::{integrate, StepParams};
pub use reconcile::{Adjustment, Reconciler, MIN_PARTICLES};
pub use render::{shimmer_alpha, DrawParams, LINK_MAX_POPULATION};

use std::f32::consts::TAU;

use glam::Vec2;

use crate::core::events::Subscription;
use crate::core::planner::{particle_radius, plan, seeded_generator, spacing_for};
use crate::core::quality::{FrameBudget, QualityEvent, SharedQuality};
use crate::core::rng::Rng;
use crate::core::time::{sanitize_dt, FrameClock};
use crate::core::viewport::Viewport;
use crate::renderer::surface::Surface;

/// Fraction of the way a budget change moves on `apply_budget`.
pub const BUDGET_EASE: f32 = 0.35;
/// Continuous easing rate toward the requested budget (1/s).
pub const BUDGET_EASE_RATE: f32 = 3.0;
/// Pulse energy ceiling.
pub const MAX_PULSE_ENERGY: f32 = 2.0;
/// Chance per second that a settled particle starts a twinkle dip.
pub const TWINKLE_PER_SEC: f32 = 0.05;
/// Plowed particles land this far outside the poke radius.
pub const PLOW_EPSILON: f32 = 0.5;
/// Outward kick of a plow relative to its strength.
pub const PLOW_KICK: f32 = 0.35;
/// Highlight radius as a multiple of spacing.
const HIGHLIGHT_SPACING: f32 = 1.2;

/// Budget scales actually in effect, easing toward the requested budget.
#[derive(Debug, Clone, Copy)]
struct EasedBudget {
    requested: FrameBudget,
    count_scale: f32,
    cap_scale: f32,
    size_scale: f32,
}

impl EasedBudget {
    fn snapped(requested: FrameBudget) -> Self {
        Self {
            requested,
            count_scale: requested.max_count_scale,
            cap_scale: requested.cap_scale,
            size_scale: requested.size_scale,
        }
    }

    /// Move a fraction `f` of the way to the request. Returns true if anything moved.
    fn ease(&mut self, f: f32) -> bool {
        let r = self.requested;
        let before = (self.count_scale, self.cap_scale, self.size_scale);
        self.count_scale = approach(self.count_scale, r.max_count_scale, f);
        self.cap_scale = approach(self.cap_scale, r.cap_scale, f);
        self.size_scale = approach(self.size_scale, r.size_scale, f);
        before != (self.count_scale, self.cap_scale, self.size_scale)
    }
}

fn approach(current: f32, target: f32, f: f32) -> f32 {
    let next = current + (target - current) * f;
    if (target - next).abs() < 0.005 {
        target
    } else {
        next
    }
}

pub struct ParticleField {
    seed: String,
    config: FieldConfig,
    viewport: Viewport,
    quality: SharedQuality,
    quality_events: Option<Subscription<QualityEvent>>,
    particles: Vec<Particle>,
    highlights: HighlightQueue,
    rng: Rng,
    clock: FrameClock,
    reconciler: Reconciler,
    target: usize,
    spacing: f32,
    /// Size the current homes were laid out for.
    layout: Option<Vec2>,
    budget: EasedBudget,
    pulse_energy: f32,
    gesturing: bool,
    destroyed: bool,
}

impl ParticleField {
    /// Build a field and, if the surface is already measured, seed its full population.
    pub fn new(seed: &str, viewport: Viewport, quality: SharedQuality, config: FieldConfig) -> Self {
        let requested_cap = config.cap;
        let config = config.sanitized();
        if config.cap != requested_cap {
            log::warn!("field {}: cap {} clamped to {}", seed, requested_cap, config.cap);
        }
        let (quality_events, budget) = {
            let q = quality.borrow();
            (q.subscribe(), q.adaptive_frame_budget())
        };
        let mut field = Self {
            seed: seed.to_owned(),
            config,
            viewport,
            quality,
            quality_events: Some(quality_events),
            particles: Vec::new(),
            highlights: HighlightQueue::new(),
            rng: seeded_generator(seed),
            clock: FrameClock::new(),
            reconciler: Reconciler::new(),
            target: 0,
            spacing: 0.0,
            layout: None,
            budget: EasedBudget::snapped(budget),
            pulse_energy: 0.0,
            gesturing: false,
            destroyed: false,
        };
        log::debug!("field {}: created (enabled: {})", field.seed, field.config.enabled);
        field.resize();
        field
    }

    /// Advance one frame and draw it onto `surface`.
    /// A destroyed field, or one whose surface has no area yet, does nothing.
    pub fn tick(&mut self, dt: f32, surface: &mut dyn Surface) {
        if self.destroyed {
            return;
        }

        // Subscriptions are drained every tick, even when nothing is drawn.
        let changes = self.viewport.poll();
        if let Some(active) = changes.gesture {
            self.gesturing = active;
        }
        self.sync_quality();
        if !self.config.enabled {
            surface.clear();
            return;
        }
        if !self.viewport.has_area() {
            return;
        }

        let dt = sanitize_dt(dt);
        let eased = self.budget.ease(1.0 - (-BUDGET_EASE_RATE * dt).exp());
        if eased
            || changes.resized
            || changes.zoom_committed
            || changes.transition_ended
            || self.layout.is_none()
        {
            self.resize();
        }

        let step = self
            .clock
            .advance(dt, self.budget.requested.tick_modulo, self.gesturing);

        self.reconcile(dt);

        if let Some(step) = step {
            let center = Vec2::new(self.viewport.width(), self.viewport.height()) * 0.5;
            let drifting = self.config.style.motion == Motion::Drift;
            let params = StepParams::new(self.config.settle_time(), self.spacing)
                .with_noise(if drifting { self.config.noise.max(0.0) } else { 0.0 })
                .with_kick(
                    if drifting { self.pulse_energy * self.config.kick.max(0.0) } else { 0.0 },
                    center,
                );
            integrate(&mut self.particles, &params, step);
            self.pulse_energy = (self.pulse_energy - self.config.kick_decay.max(0.0) * step).max(0.0);
        }

        self.update_fades(dt);
        self.particles.retain(|p| p.state != FadeState::PendingRemoval);
        let now = self.clock.elapsed();
        self.highlights.expire(now);

        let every = self.budget.requested.skip_non_critical_every.max(1) as u64;
        let params = DrawParams {
            now,
            size_scale: self.config.style.size * self.budget.size_scale,
            spacing: self.spacing,
            links_allowed: !self.gesturing && self.clock.frame() % every == 0,
        };
        render::draw(&self.particles, &self.config.style, &self.highlights, &params, surface);
    }

    /// Recompute target population and spacing, and remap homes to the current size.
    ///
    /// Homes keep their normalized position, so a resize never resets the layout.
    /// An empty pool is seeded to the full target immediately.
    pub fn resize(&mut self) {
        if self.destroyed || !self.config.enabled {
            return;
        }
        self.viewport.refresh_size();
        if !self.viewport.has_area() {
            return;
        }
        let size = Vec2::new(self.viewport.width(), self.viewport.height());
        self.retarget(size);

        if let Some(old) = self.layout {
            if old == size {
                // Nothing to remap.
            } else if self.viewport.is_non_reactive() {
                // Mid-transition: keep homes until the viewport is reactive again.
                return;
            } else {
                let ratio = size / old;
                for p in &mut self.particles {
                    p.home *= ratio;
                    p.pos *= ratio;
                }
                log::debug!("field {}: remapped {:?} -> {:?}", self.seed, old, size);
            }
        }
        self.layout = Some(size);

        if self.particles.is_empty() {
            self.seed_full(size);
        }
    }

    fn retarget(&mut self, size: Vec2) {
        let area = size.x * size.y;
        let base = plan(size.x, size.y, &self.config.planner);
        let cap = ((self.config.cap as f32 * self.budget.cap_scale).round() as usize).clamp(MIN_PARTICLES, MAX_CAP);
        let scaled = base.count as f32 * self.budget.count_scale * self.viewport.lod_scale();
        let target = (scaled.round() as usize).clamp(MIN_PARTICLES, cap);
        if target != self.target {
            log::debug!("field {}: target {} -> {}", self.seed, self.target, target);
        }
        self.target = target;
        self.spacing = spacing_for(area, target, self.config.planner.relax);
    }

    fn seed_full(&mut self, size: Vec2) {
        self.particles.reserve(self.target);
        for _ in 0..self.target {
            let p = self.new_particle(size, Fade::visible());
            self.particles.push(p);
        }
    }

    fn new_particle(&mut self, size: Vec2, fade: Fade) -> Particle {
        let home = Vec2::new(self.rng.next_f32() * size.x, self.rng.next_f32() * size.y);
        let phase = self.rng.next_f32();
        let phase_speed = self.rng.range(0.12, 0.3);
        let radius = particle_radius(&mut self.rng);
        Particle::new(home, phase, phase_speed, radius, fade)
    }

    fn reconcile(&mut self, dt: f32) {
        let live = self.live_count();
        let adjustment = self.reconciler.plan(
            live,
            self.target,
            dt,
            self.budget.requested.spawn_scale,
            self.gesturing,
        );
        match adjustment {
            Adjustment::Hold => {}
            Adjustment::Spawn(n) => {
                let size = self.layout.unwrap_or(Vec2::ONE);
                for _ in 0..n {
                    let p = self.new_particle(size, Fade::fade_in());
                    self.particles.push(p);
                }
            }
            Adjustment::FadeOut(n) => {
                reconcile::fade_out_random(&mut self.particles, n, &mut self.rng);
            }
        }
        if adjustment != Adjustment::Hold {
            log::trace!("field {}: live {} target {} -> {:?}", self.seed, live, self.target, adjustment);
        }
    }

    fn update_fades(&mut self, dt: f32) {
        let twinkle_chance = if self.config.twinkle { TWINKLE_PER_SEC * dt } else { 0.0 };
        for p in &mut self.particles {
            if twinkle_chance > 0.0 && self.rng.chance(twinkle_chance) {
                let level = self.rng.range(0.25, 0.75);
                p.twinkle(level);
            }
            p.update_fade(dt);
        }
    }

    fn sync_quality(&mut self) {
        let changed = self
            .quality_events
            .as_ref()
            .map(|sub| !sub.drain().is_empty())
            .unwrap_or(false);
        if changed {
            let budget = self.quality.borrow().adaptive_frame_budget();
            self.apply_budget(budget);
        }
    }

    /// Localized poke at (x, y) in surface pixels.
    pub fn poke(&mut self, x: f32, y: f32, config: &PokeConfig) {
        if self.destroyed || !x.is_finite() || !y.is_finite() {
            return;
        }
        let radius = positive_or(config.radius, PokeConfig::default().radius);
        let strength = finite_or(config.strength, PokeConfig::default().strength);
        let force_mul = finite_or(config.force_mul, 1.0);
        let center = Vec2::new(x, y);
        let now = self.clock.elapsed();
        let highlight_radius = (self.spacing * HIGHLIGHT_SPACING).max(4.0);

        for p in &mut self.particles {
            if p.state == FadeState::PendingRemoval {
                continue;
            }
            let offset = p.pos - center;
            let d = offset.length();
            if d >= radius {
                continue;
            }
            let dir = if d > 1e-4 {
                offset / d
            } else {
                Vec2::from_angle(p.phase * TAU)
            };
            let falloff = 1.0 - d / radius;
            let cubic = falloff * falloff * falloff;
            match config.mode {
                PokeMode::Legacy => {
                    let kick_scale = (1.0 - 0.75 * d / radius).max(0.25);
                    p.vel += dir * (strength * cubic * kick_scale * force_mul);
                }
                PokeMode::Plow => {
                    p.pos = center + dir * (radius + PLOW_EPSILON);
                    p.vel += dir * (strength * PLOW_KICK * cubic * force_mul);
                }
            }
            if config.highlight {
                self.highlights.push(Highlight {
                    center: p.pos,
                    radius: highlight_radius,
                    start: now,
                    duration: config.highlight_dur,
                    amplitude: config.highlight_amp,
                });
            }
        }
    }

    /// Impulse along a fixed direction for particles within `config.radius` of (x, y).
    pub fn push_directional(&mut self, x: f32, y: f32, dir_x: f32, dir_y: f32, config: &PushConfig) {
        if self.destroyed || !x.is_finite() || !y.is_finite() {
            return;
        }
        let dir = Vec2::new(dir_x, dir_y);
        if !dir.is_finite() || dir.length_squared() < 1e-12 {
            return;
        }
        let dir = dir.normalize();
        let radius = positive_or(config.radius, PushConfig::default().radius);
        let strength = finite_or(config.strength, PushConfig::default().strength);
        let force_mul = finite_or(config.force_mul, 1.0);
        let mass = positive_or(config.mass, 1.0);
        let center = Vec2::new(x, y);

        for p in &mut self.particles {
            if p.state == FadeState::PendingRemoval {
                continue;
            }
            let d = p.pos.distance(center);
            if d >= radius {
                continue;
            }
            let weight = config.falloff.weight(d / radius);
            p.vel += dir * (strength * force_mul * weight / mass);
        }
    }

    /// Add to the decaying pulse energy that drives the outward kick.
    pub fn pulse(&mut self, intensity: f32) {
        if self.destroyed || !intensity.is_finite() || intensity <= 0.0 {
            return;
        }
        self.pulse_energy = (self.pulse_energy + intensity).min(MAX_PULSE_ENERGY);
    }

    /// Ease toward a new budget and re-target the population.
    pub fn apply_budget(&mut self, budget: FrameBudget) {
        if self.destroyed {
            return;
        }
        let current = self.budget.requested;
        let requested = FrameBudget {
            spawn_scale: positive_or(budget.spawn_scale, current.spawn_scale),
            max_count_scale: positive_or(budget.max_count_scale, current.max_count_scale),
            cap_scale: positive_or(budget.cap_scale, current.cap_scale),
            tick_modulo: budget.tick_modulo.max(1),
            size_scale: positive_or(budget.size_scale, current.size_scale),
            skip_non_critical_every: budget.skip_non_critical_every.max(1),
        };
        self.budget.requested = requested;
        self.budget.ease(BUDGET_EASE);
        log::debug!("field {}: budget {:?}", self.seed, requested);
        self.resize();
    }

    /// Merge a style patch.
    pub fn set_style(&mut self, patch: &StylePatch) {
        patch.apply_to(&mut self.config.style);
    }

    pub fn set_gesturing(&mut self, gesturing: bool) {
        self.gesturing = gesturing;
    }

    /// Pausing the owning toy attenuates the population.
    pub fn set_paused(&mut self, paused: bool) {
        if self.viewport.is_paused() == paused {
            return;
        }
        self.viewport.set_paused(paused);
        self.resize();
    }

    /// Override reactive mode. Becoming reactive applies any deferred remap.
    pub fn set_non_reactive(&mut self, value: Option<bool>) {
        self.viewport.set_non_reactive(value);
        if !self.viewport.is_non_reactive() {
            self.resize();
        }
    }

    /// Tear down: clear the pool and release every subscription. Idempotent.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.particles.clear();
        self.highlights.clear();
        self.viewport.detach();
        if let Some(mut sub) = self.quality_events.take() {
            sub.release();
        }
        log::debug!("field {}: destroyed", self.seed);
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Particles in the pool, including ones fading out.
    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    /// Particles counting toward the population (not fading out).
    pub fn live_count(&self) -> usize {
        self.particles.iter().filter(|p| p.is_active()).count()
    }

    pub fn target_desired(&self) -> usize {
        self.target
    }

    pub fn spacing(&self) -> f32 {
        self.spacing
    }

    pub fn pulse_energy(&self) -> f32 {
        self.pulse_energy
    }

    pub fn highlight_count(&self) -> usize {
        self.highlights.len()
    }

    pub fn is_gesturing(&self) -> bool {
        self.gesturing
    }

    pub fn style(&self) -> &FieldStyle {
        &self.config.style
    }

    pub fn config(&self) -> &FieldConfig {
        &self.config
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    /// Budget currently requested (not yet fully eased in).
    pub fn requested_budget(&self) -> FrameBudget {
        self.budget.requested
    }
}

impl Drop for ParticleField {
    fn drop(&mut self) {
        self.destroy();
    }
}

fn finite_or(v: f32, fallback: f32) -> f32 {
    if v.is_finite() {
        v
    } else {
        fallback
    }
}

fn positive_or(v: f32, fallback: f32) -> f32 {
    if v.is_finite() && v > 0.0 {
        v
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::quality::{QualityController, QualityTier};
    use crate::core::viewport::{BoardSignals, FixedSize, HostViewport};
    use crate::renderer::instance::DotBuffer;

    const DT: f32 = 1.0 / 60.0;

    fn ultra() -> SharedQuality {
        let q = QualityController::shared();
        q.borrow_mut().set_lock(Some(QualityTier::Ultra));
        q
    }

    fn field(w: f32, h: f32) -> ParticleField {
        ParticleField::new("test", Viewport::new(FixedSize::new(w, h)), ultra(), FieldConfig::default())
    }

    #[test]
    fn seeds_full_population_visible() {
        let f = field(400.0, 400.0);
        assert_eq!(f.target_desired(), 352);
        assert_eq!(f.particle_count(), 352);
        assert!(f.particles().iter().all(|p| p.fade.current == 1.0));
    }

    #[test]
    fn zero_area_tick_is_noop() {
        let q = ultra();
        let mut f = ParticleField::new("z", Viewport::new(FixedSize::new(0.0, 300.0)), q, FieldConfig::default());
        let mut buf = DotBuffer::new();
        buf.fill_circle(1.0, 1.0, 1.0, crate::renderer::surface::Rgba::WHITE);
        f.tick(DT, &mut buf);
        assert_eq!(f.particle_count(), 0);
        assert_eq!(buf.dot_count(), 1, "surface should be untouched");
    }

    #[test]
    fn disabled_field_holds_nothing() {
        let cfg = FieldConfig::default().with_enabled(false);
        let mut f = ParticleField::new("off", Viewport::new(FixedSize::new(200.0, 200.0)), ultra(), cfg);
        let mut buf = DotBuffer::new();
        f.tick(DT, &mut buf);
        assert_eq!(f.particle_count(), 0);
        assert_eq!(buf.dot_count(), 0);
    }

    #[test]
    fn tick_draws_every_visible_particle() {
        let mut f = field(300.0, 200.0);
        let mut buf = DotBuffer::new();
        f.tick(DT, &mut buf);
        assert_eq!(buf.dot_count() as usize, f.particle_count());
    }

    #[test]
    fn legacy_poke_pushes_outward_without_teleport() {
        let mut f = field(400.0, 400.0);
        let center = Vec2::new(200.0, 200.0);
        let before: Vec<(usize, Vec2)> = f
            .particles()
            .iter()
            .enumerate()
            .filter(|(_, p)| p.pos.distance(center) < 64.0 && p.pos.distance(center) > 1e-3)
            .map(|(i, p)| (i, p.pos))
            .collect();
        assert!(!before.is_empty());
        f.poke(200.0, 200.0, &PokeConfig::default());
        for (i, pos) in before {
            let p = &f.particles()[i];
            assert_eq!(p.pos, pos, "legacy poke must not move particles directly");
            let outward = (pos - center).normalize();
            assert!(p.vel.dot(outward) > 0.0, "particle {} not pushed outward", i);
        }
    }

    #[test]
    fn plow_snaps_to_rim() {
        let mut f = field(400.0, 400.0);
        let center = Vec2::new(200.0, 200.0);
        let inside: Vec<usize> = f
            .particles()
            .iter()
            .enumerate()
            .filter(|(_, p)| p.pos.distance(center) < 50.0)
            .map(|(i, _)| i)
            .collect();
        f.poke(200.0, 200.0, &PokeConfig::plow(50.0));
        for i in inside {
            let d = f.particles()[i].pos.distance(center);
            assert!((d - 50.0 - PLOW_EPSILON).abs() < 1e-3, "particle {} at {}", i, d);
        }
    }

    #[test]
    fn poke_highlight_is_bounded() {
        let mut f = field(400.0, 400.0);
        f.poke(200.0, 200.0, &PokeConfig::default().with_radius(150.0).with_highlight(1.0, 0.5));
        assert!(f.highlight_count() > 0);
        assert!(f.highlight_count() <= MAX_HIGHLIGHTS);
        let mut buf = DotBuffer::new();
        for _ in 0..60 {
            f.tick(DT, &mut buf);
        }
        assert_eq!(f.highlight_count(), 0, "highlights should expire");
    }

    #[test]
    fn invalid_poke_is_ignored() {
        let mut f = field(200.0, 200.0);
        let snapshot: Vec<Vec2> = f.particles().iter().map(|p| p.vel).collect();
        f.poke(f32::NAN, 10.0, &PokeConfig::default());
        f.push_directional(10.0, 10.0, 0.0, 0.0, &PushConfig::default());
        let after: Vec<Vec2> = f.particles().iter().map(|p| p.vel).collect();
        assert_eq!(snapshot, after);
    }

    #[test]
    fn directional_push_follows_direction() {
        let mut f = field(400.0, 400.0);
        f.push_directional(200.0, 200.0, 0.0, 3.0, &PushConfig::default().with_falloff(Falloff::Gaussian));
        let pushed: Vec<&Particle> = f
            .particles()
            .iter()
            .filter(|p| p.pos.distance(Vec2::new(200.0, 200.0)) < 64.0)
            .collect();
        assert!(!pushed.is_empty());
        for p in pushed {
            assert!(p.vel.y > 0.0);
            assert_eq!(p.vel.x, 0.0);
        }
    }

    #[test]
    fn pulse_is_capped_and_decays() {
        let mut f = field(200.0, 200.0);
        f.pulse(5.0);
        assert_eq!(f.pulse_energy(), MAX_PULSE_ENERGY);
        let mut buf = DotBuffer::new();
        f.tick(0.1, &mut buf);
        assert!(f.pulse_energy() < MAX_PULSE_ENERGY);
        f.pulse(f32::NAN);
        f.pulse(-1.0);
    }

    #[test]
    fn budget_eases_instead_of_jumping() {
        let mut f = field(400.0, 400.0);
        let full = f.target_desired();
        f.apply_budget(FrameBudget {
            max_count_scale: 0.25,
            ..FrameBudget::default()
        });
        let first = f.target_desired();
        assert!(first < full && first > full / 4, "first step {} of {}", first, full);
        let mut buf = DotBuffer::new();
        for _ in 0..180 {
            f.tick(DT, &mut buf);
        }
        assert_eq!(f.target_desired(), 88);
    }

    #[test]
    fn tier_change_reaches_field() {
        let q = ultra();
        let mut f = ParticleField::new("q", Viewport::new(FixedSize::new(400.0, 400.0)), q.clone(), FieldConfig::default());
        q.borrow_mut().set_lock(Some(QualityTier::Low));
        let mut buf = DotBuffer::new();
        f.tick(DT, &mut buf);
        assert_eq!(f.requested_budget(), q.borrow().adaptive_frame_budget());
    }

    #[test]
    fn remap_preserves_normalized_positions() {
        let host = HostViewport::new(200.0, 100.0);
        let mut f = ParticleField::new("r", Viewport::new(host.clone()), ultra(), FieldConfig::default());
        let before: Vec<Vec2> = f.particles().iter().map(|p| p.home / Vec2::new(200.0, 100.0)).collect();
        host.set_size(400.0, 300.0);
        f.resize();
        for (p, n) in f.particles().iter().zip(before) {
            let now = p.home / Vec2::new(400.0, 300.0);
            assert!((now - n).length() < 1e-5);
        }
    }

    #[test]
    fn non_reactive_defers_remap() {
        let host = HostViewport::new(200.0, 200.0);
        let mut f = ParticleField::new("t", Viewport::new(host.clone()), ultra(), FieldConfig::default());
        let homes: Vec<Vec2> = f.particles().iter().map(|p| p.home).collect();
        f.set_non_reactive(Some(true));
        host.set_size(300.0, 300.0);
        f.resize();
        assert!(f.particles().iter().zip(&homes).all(|(p, h)| p.home == *h));
        f.set_non_reactive(Some(false));
        assert!(f.particles().iter().zip(&homes).all(|(p, h)| p.home == *h * 1.5));
    }

    #[test]
    fn gesture_signal_sets_flag() {
        let signals = BoardSignals::new();
        let mut vp = Viewport::new(FixedSize::new(200.0, 200.0));
        vp.attach(&signals);
        let mut f = ParticleField::new("g", vp, ultra(), FieldConfig::default());
        signals.gesture.emit(true);
        let mut buf = DotBuffer::new();
        f.tick(DT, &mut buf);
        assert!(f.is_gesturing());
    }

    #[test]
    fn disabled_field_keeps_draining_subscriptions() {
        let signals = BoardSignals::new();
        let q = ultra();
        let mut vp = Viewport::new(FixedSize::new(200.0, 200.0));
        vp.attach(&signals);
        let cfg = FieldConfig::default().with_enabled(false);
        let mut f = ParticleField::new("off", vp, q.clone(), cfg);
        let mut buf = DotBuffer::new();
        for i in 0..1000 {
            let tier = if i % 2 == 0 { QualityTier::Low } else { QualityTier::Ultra };
            q.borrow_mut().set_lock(Some(tier));
            signals.gesture.emit(i % 2 == 1);
            f.tick(DT, &mut buf);
        }
        let pending = f.quality_events.as_ref().map(|sub| sub.drain().len());
        assert_eq!(pending, Some(0));
        assert!(f.is_gesturing());
        assert_eq!(buf.dot_count(), 0);
    }

    #[test]
    fn gesture_suppresses_links() {
        let mut f = field(200.0, 200.0);
        f.set_style(&StylePatch {
            mode: Some(DrawMode::DotsLinks),
            ..StylePatch::default()
        });
        f.set_gesturing(true);
        let mut buf = DotBuffer::new();
        for _ in 0..4 {
            f.tick(DT, &mut buf);
            assert!(buf.dot_count() > 0);
            assert_eq!(buf.link_count(), 0);
        }
        f.set_gesturing(false);
        f.tick(DT, &mut buf);
        assert!(buf.link_count() > 0);
    }

    #[test]
    fn gesture_holds_population() {
        let mut f = field(400.0, 400.0);
        f.set_gesturing(true);
        f.apply_budget(FrameBudget {
            max_count_scale: 0.1,
            ..FrameBudget::default()
        });
        assert!(f.target_desired() < f.live_count());
        let mut buf = DotBuffer::new();
        for _ in 0..120 {
            f.tick(DT, &mut buf);
            assert_eq!(f.live_count(), 352);
        }
        f.set_gesturing(false);
        for _ in 0..10 {
            f.tick(DT, &mut buf);
        }
        assert!(f.live_count() < 352);
    }

    #[test]
    fn gesture_integrates_every_other_tick() {
        let mut f = field(400.0, 400.0);
        f.set_gesturing(true);
        f.poke(200.0, 200.0, &PokeConfig::default());
        let Some(i) = f.particles().iter().position(|p| p.vel.length() > 1.0) else {
            panic!("poke moved nothing");
        };
        let mut buf = DotBuffer::new();
        let mut last = f.particles()[i].pos;
        for frame in 1..=6 {
            f.tick(DT, &mut buf);
            let pos = f.particles()[i].pos;
            if frame % 2 == 0 {
                assert_ne!(pos, last, "frame {} should integrate", frame);
            } else {
                assert_eq!(pos, last, "frame {} should skip physics", frame);
            }
            last = pos;
        }
    }

    #[test]
    fn destroy_is_idempotent_and_releases() {
        let signals = BoardSignals::new();
        let q = ultra();
        let mut vp = Viewport::new(FixedSize::new(200.0, 200.0));
        vp.attach(&signals);
        let mut f = ParticleField::new("d", vp, q.clone(), FieldConfig::default());
        assert_eq!(q.borrow().listener_count(), 1);
        f.destroy();
        f.destroy();
        assert_eq!(f.particle_count(), 0);
        assert_eq!(signals.listener_count(), 0);
        assert_eq!(q.borrow().listener_count(), 0);
        let mut buf = DotBuffer::new();
        f.tick(DT, &mut buf);
        assert_eq!(buf.dot_count(), 0);
    }

    #[test]
    fn set_style_switches_mode() {
        let mut f = field(200.0, 200.0);
        f.set_style(&StylePatch {
            mode: Some(DrawMode::DotsLinks),
            ..StylePatch::default()
        });
        assert_eq!(f.style().mode, DrawMode::DotsLinks);
        let mut buf = DotBuffer::new();
        f.tick(DT, &mut buf);
        assert!(buf.link_count() > 0);
    }
}
