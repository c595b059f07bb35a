//! A single field particle and its fade lifecycle.

use glam::Vec2;

/// Fade level below which a despawning particle may be removed.
pub const REMOVE_FADE: f32 = 0.01;
/// Fade-in speed for newly spawned particles (per second).
pub const FADE_IN_RATE: f32 = 2.4;
/// Fade-out speed for despawning particles (per second). Slower than fade-in.
pub const FADE_OUT_RATE: f32 = 0.9;
/// Fade speed for twinkle dips (per second).
pub const TWINKLE_RATE: f32 = 1.2;

/// Lifecycle of a particle in the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeState {
    /// Counts toward the live population.
    Active,
    /// Despawning; fade target is 0.
    FadingOut,
    /// Fade bottomed out; removed by the next cleanup pass.
    PendingRemoval,
}

/// Opacity-like scalar chasing a target at a fixed rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fade {
    pub current: f32,
    pub target: f32,
    pub rate: f32,
    /// Twinkle dip: snap the target back to 1 once reached.
    pub returning: bool,
}

impl Fade {
    /// Fully visible, at rest.
    pub fn visible() -> Self {
        Self {
            current: 1.0,
            target: 1.0,
            rate: FADE_IN_RATE,
            returning: false,
        }
    }

    /// Invisible, fading in.
    pub fn fade_in() -> Self {
        Self {
            current: 0.0,
            target: 1.0,
            rate: FADE_IN_RATE,
            returning: false,
        }
    }

    /// Move `current` toward `target` by `rate * dt`.
    pub fn step(&mut self, dt: f32) {
        let delta = self.target - self.current;
        let max_step = self.rate * dt;
        if delta.abs() <= max_step {
            self.current = self.target;
            if self.returning {
                self.returning = false;
                self.target = 1.0;
            }
        } else {
            self.current += max_step * delta.signum();
        }
        self.current = self.current.clamp(0.0, 1.0);
    }
}

#[derive(Debug, Clone)]
pub struct Particle {
    pub pos: Vec2,
    /// Rest point the particle springs toward.
    pub home: Vec2,
    pub vel: Vec2,
    /// Turns in [0, 1); drives ambient drift and shimmer.
    pub phase: f32,
    /// Turns per second.
    pub phase_speed: f32,
    /// Base screen radius in px (zoom-invariant).
    pub radius: f32,
    pub fade: Fade,
    pub state: FadeState,
}

impl Particle {
    pub fn new(home: Vec2, phase: f32, phase_speed: f32, radius: f32, fade: Fade) -> Self {
        Self {
            pos: home,
            home,
            vel: Vec2::ZERO,
            phase,
            phase_speed,
            radius,
            fade,
            state: FadeState::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == FadeState::Active
    }

    /// Start despawning. The particle stays in the pool until its fade bottoms out.
    pub fn begin_fade_out(&mut self) {
        if self.state != FadeState::Active {
            return;
        }
        self.state = FadeState::FadingOut;
        self.fade.target = 0.0;
        self.fade.rate = FADE_OUT_RATE;
        self.fade.returning = false;
    }

    /// Dip toward `level` and come back. Ignored unless fully settled and active.
    pub fn twinkle(&mut self, level: f32) {
        if self.state != FadeState::Active
            || self.fade.returning
            || self.fade.target < 1.0
            || self.fade.current < 1.0
        {
            return;
        }
        self.fade.target = level.clamp(0.0, 1.0);
        self.fade.rate = TWINKLE_RATE;
        self.fade.returning = true;
    }

    /// Advance the fade and promote bottomed-out despawns to `PendingRemoval`.
    pub fn update_fade(&mut self, dt: f32) {
        self.fade.step(dt);
        if self.state == FadeState::FadingOut && self.fade.current <= REMOVE_FADE {
            self.state = FadeState::PendingRemoval;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn particle() -> Particle {
        Particle::new(Vec2::new(10.0, 10.0), 0.0, 1.0, 1.0, Fade::visible())
    }

    #[test]
    fn fade_in_reaches_one() {
        let mut fade = Fade::fade_in();
        for _ in 0..60 {
            fade.step(1.0 / 60.0);
        }
        assert_eq!(fade.current, 1.0);
    }

    #[test]
    fn fade_out_waits_for_bottom() {
        let mut p = particle();
        p.begin_fade_out();
        let mut steps = 0;
        while p.state != FadeState::PendingRemoval {
            assert!(p.fade.current > REMOVE_FADE, "pending before bottoming out");
            p.update_fade(1.0 / 60.0);
            steps += 1;
            assert!(steps < 1000, "fade-out never finished");
        }
        assert!(p.fade.current <= REMOVE_FADE);
        // 1.0 / 0.9 per second at 60 fps is just over a second.
        assert!(steps >= 60, "faded out too fast: {} steps", steps);
    }

    #[test]
    fn twinkle_dips_and_returns() {
        let mut p = particle();
        p.twinkle(0.5);
        assert!(p.fade.returning);
        for _ in 0..40 {
            p.update_fade(1.0 / 60.0);
        }
        assert_eq!(p.fade.target, 1.0);
        assert!(!p.fade.returning);
        for _ in 0..60 {
            p.update_fade(1.0 / 60.0);
        }
        assert_eq!(p.fade.current, 1.0);
        assert!(p.is_active());
    }

    #[test]
    fn twinkle_waits_for_fade_in() {
        let mut p = Particle::new(Vec2::ZERO, 0.0, 1.0, 1.0, Fade::fade_in());
        p.update_fade(1.0 / 60.0);
        p.twinkle(0.5);
        assert_eq!(p.fade.target, 1.0);
        assert_eq!(p.fade.rate, FADE_IN_RATE);
        assert!(!p.fade.returning);
    }

    #[test]
    fn twinkle_ignored_while_fading_out() {
        let mut p = particle();
        p.begin_fade_out();
        p.twinkle(0.5);
        assert_eq!(p.fade.target, 0.0);
    }

    #[test]
    fn fade_out_cancels_twinkle_return() {
        let mut p = particle();
        p.twinkle(0.3);
        p.begin_fade_out();
        for _ in 0..200 {
            p.update_fade(1.0 / 60.0);
        }
        assert_eq!(p.state, FadeState::PendingRemoval);
    }
}
