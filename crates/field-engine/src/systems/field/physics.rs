//! Spring-damper integration toward each particle's home.

use std::f32::consts::TAU;

use glam::Vec2;

use super::particle::Particle;

/// Spacing at which the spring constant is unscaled.
pub const REFERENCE_SPACING: f32 = 18.0;
/// Minimum speed cap (px/s).
pub const MIN_VMAX: f32 = 60.0;
/// Below both thresholds a particle snaps home and stops.
pub const SNAP_DISTANCE: f32 = 1.0;
pub const SNAP_SPEED: f32 = 0.3;

/// Constants for one integration step, derived once per tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepParams {
    /// Spring constant.
    pub k: f32,
    /// Damping coefficient.
    pub c: f32,
    /// Ambient drift amplitude (0 when static).
    pub noise: f32,
    /// Radial kick amplitude this tick (pulse energy × kick, 0 when static).
    pub kick: f32,
    pub vmax: f32,
    pub center: Vec2,
}

impl StepParams {
    /// Critically damped spring settling in roughly `settle_time` seconds.
    pub fn new(settle_time: f32, spacing: f32) -> Self {
        let omega = 3.0 / settle_time;
        let spacing_scale = spacing / REFERENCE_SPACING;
        Self {
            k: omega * omega * spacing_scale,
            c: 2.0 * omega,
            noise: 0.0,
            kick: 0.0,
            vmax: MIN_VMAX.max(spacing * 18.0),
            center: Vec2::ZERO,
        }
    }

    pub fn with_noise(mut self, noise: f32) -> Self {
        self.noise = noise;
        self
    }

    pub fn with_kick(mut self, kick: f32, center: Vec2) -> Self {
        self.kick = kick;
        self.center = center;
        self
    }
}

/// Advance every particle by `dt` seconds.
pub fn integrate(particles: &mut [Particle], params: &StepParams, dt: f32) {
    for p in particles.iter_mut() {
        p.phase = (p.phase + p.phase_speed * dt).fract();

        let accel = (p.home - p.pos) * params.k;
        let ambient = if params.noise > 0.0 {
            Vec2::from_angle(p.phase * TAU) * params.noise
        } else {
            Vec2::ZERO
        };
        // Kick points inward here and is subtracted, so it pushes outward.
        let kick = if params.kick > 0.0 {
            (params.center - p.pos).normalize_or_zero() * params.kick
        } else {
            Vec2::ZERO
        };

        p.vel += (accel - p.vel * params.c + ambient - kick) * dt;
        p.vel = p.vel.clamp_length_max(params.vmax);
        p.pos += p.vel * dt;

        if p.home.distance(p.pos) < SNAP_DISTANCE && p.vel.length() < SNAP_SPEED {
            p.pos = p.home;
            p.vel = Vec2::ZERO;
        }
    }
}
