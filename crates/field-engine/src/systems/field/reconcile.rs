//! Population reconciliation: grow by fading in, shrink by fading out.
//! Both directions are rate-limited so the population never visibly jumps.

use crate::core::rng::Rng;

use super::particle::Particle;

/// Population floor. Shrinking never goes below it.
pub const MIN_PARTICLES: usize = 60;
/// Spawn/despawn rate at full budget (particles per second).
pub const ADJUST_PER_SEC: f32 = 240.0;
/// Most particles that may start fading out in one tick.
pub const MAX_FADE_OUT_STEP: usize = 24;
/// Most of the active population that may start fading out in one tick.
pub const MAX_FADE_OUT_FRACTION: f32 = 0.04;

/// What reconciliation decided for this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjustment {
    Hold,
    Spawn(usize),
    FadeOut(usize),
}

/// Carries fractional spawn credit between ticks.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    spawn_credit: f32,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide how to move `live` toward `target` this tick.
    ///
    /// `spawn_scale` slows growth on lower quality tiers. While `gesturing`,
    /// shrinking is suspended so the population does not drain mid-gesture.
    pub fn plan(
        &mut self,
        live: usize,
        target: usize,
        dt: f32,
        spawn_scale: f32,
        gesturing: bool,
    ) -> Adjustment {
        if live < target {
            let rate = ADJUST_PER_SEC * spawn_scale.clamp(0.1, 1.0);
            self.spawn_credit += rate * dt;
            let n = (self.spawn_credit.floor() as usize).min(target - live);
            self.spawn_credit -= n as f32;
            return if n > 0 { Adjustment::Spawn(n) } else { Adjustment::Hold };
        }
        self.spawn_credit = 0.0;

        if live == target || gesturing {
            return Adjustment::Hold;
        }

        let excess = live - target;
        let adjust_step = (ADJUST_PER_SEC * dt).round().max(1.0) as usize;
        let fraction_step = ((live as f32 * MAX_FADE_OUT_FRACTION).floor() as usize).max(1);
        let floor_room = live.saturating_sub(MIN_PARTICLES);
        let n = excess
            .min(adjust_step)
            .min(MAX_FADE_OUT_STEP)
            .min(fraction_step)
            .min(floor_room);
        if n > 0 {
            Adjustment::FadeOut(n)
        } else {
            Adjustment::Hold
        }
    }
}

/// Start fading out `count` randomly chosen active particles.
pub fn fade_out_random(particles: &mut [Particle], count: usize, rng: &mut Rng) -> usize {
    let mut active: Vec<usize> = particles
        .iter()
        .enumerate()
        .filter(|(_, p)| p.is_active())
        .map(|(i, _)| i)
        .collect();
    let count = count.min(active.len());
    // Partial Fisher-Yates: the first `count` slots become the victims.
    for i in 0..count {
        let j = i + rng.next_int((active.len() - i) as u32) as usize;
        active.swap(i, j);
        particles[active[i]].begin_fade_out();
    }
    count
}
