/// Fallback frame delta when the host hands us garbage.
pub const DEFAULT_DT: f32 = 1.0 / 60.0;

/// Largest step a single frame may integrate. Bounds the effect of hitches.
pub const MAX_DT: f32 = 0.12;

/// Replace non-finite or non-positive deltas with 1/60 and clamp to `MAX_DT`.
pub fn sanitize_dt(dt: f32) -> f32 {
    if !dt.is_finite() || dt <= 0.0 {
        DEFAULT_DT
    } else {
        dt.min(MAX_DT)
    }
}

/// Per-field frame clock.
/// Tracks elapsed time and decides on which frames physics integrates.
/// Skipped frames bank their delta so the next integrated step catches up.
#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    /// Seconds since the clock started (sum of sanitized deltas).
    elapsed: f32,
    /// Frames seen.
    frame: u64,
    /// Delta accumulated across frames that skipped physics.
    banked: f32,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance one frame. Returns the physics step to integrate this frame,
    /// or `None` when physics should be skipped.
    ///
    /// `modulo` is the base cadence (1 = every frame); `gesturing` doubles it.
    pub fn advance(&mut self, dt: f32, modulo: u32, gesturing: bool) -> Option<f32> {
        let dt = sanitize_dt(dt);
        self.elapsed += dt;
        self.frame += 1;
        self.banked += dt;

        let mut every = modulo.max(1) as u64;
        if gesturing {
            every *= 2;
        }
        if self.frame % every != 0 {
            return None;
        }
        let step = self.banked.min(MAX_DT);
        self.banked = 0.0;
        Some(step)
    }

    /// Elapsed seconds.
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Frame counter.
    pub fn frame(&self) -> u64 {
        self.frame
    }
}
