//! Global quality/LOD controller.
//!
//! One controller per process. The host's FPS sampler feeds it about once a
//! second through `update_from_fps`; every particle field reads the derived
//! budget and listens for change events on `events()`.
//!
//! Tier selection uses staggered enter/stay thresholds so the tier does not
//! flap around a boundary, and a change in either direction needs
//! `CONFIRM_SAMPLES` consecutive smoothed samples past the threshold.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::events::{EventBus, Subscription};

/// EMA weight of each new FPS sample.
pub const FPS_SMOOTHING: f32 = 0.18;

/// Consecutive samples a tier change must persist before it is applied.
pub const CONFIRM_SAMPLES: u32 = 2;

pub const MIN_BUDGET_MULTIPLIER: f32 = 0.1;
pub const MAX_BUDGET_MULTIPLIER: f32 = 1.5;

/// Discrete quality levels, ordered from cheapest to richest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum QualityTier {
    Low,
    Medium,
    High,
    Ultra,
}

impl QualityTier {
    pub const ALL: [QualityTier; 4] = [Self::Low, Self::Medium, Self::High, Self::Ultra];

    /// Smoothed FPS needed to move up into this tier.
    pub fn enter_fps(self) -> f32 {
        match self {
            Self::Ultra => 57.0,
            Self::High => 45.0,
            Self::Medium => 32.0,
            Self::Low => 0.0,
        }
    }

    /// Smoothed FPS needed to remain in this tier.
    pub fn stay_fps(self) -> f32 {
        match self {
            Self::Ultra => 54.0,
            Self::High => 41.0,
            Self::Medium => 29.0,
            Self::Low => 0.0,
        }
    }

    /// Population budget for this tier.
    pub fn budget(self) -> QualityBudget {
        let (spawn_scale, max_count_scale) = match self {
            Self::Ultra => (1.0, 1.0),
            Self::High => (0.7, 0.75),
            Self::Medium => (0.45, 0.5),
            Self::Low => (0.2, 0.25),
        };
        QualityBudget {
            spawn_scale,
            max_count_scale,
        }
    }

    /// Extra cap attenuation layered on top of `budget()`.
    pub fn particle_cap_scale(self) -> f32 {
        match self {
            Self::Ultra => 1.0,
            Self::High => 0.8,
            Self::Medium => 0.55,
            Self::Low => 0.35,
        }
    }

    pub fn size_scale(self) -> f32 {
        match self {
            Self::Ultra | Self::High => 1.0,
            Self::Medium => 0.93,
            Self::Low => 0.85,
        }
    }

    /// Draw non-critical passes (links) only every Nth frame.
    pub fn skip_non_critical_every(self) -> u32 {
        match self {
            Self::Low => 2,
            _ => 1,
        }
    }

    /// Decode a host-side tier index (0 = Low .. 3 = Ultra).
    pub fn from_index(index: i32) -> Option<Self> {
        match index {
            0 => Some(Self::Low),
            1 => Some(Self::Medium),
            2 => Some(Self::High),
            3 => Some(Self::Ultra),
            _ => None,
        }
    }

    /// Richest tier whose enter threshold `fps` meets.
    fn entered_by(fps: f32) -> Self {
        Self::ALL
            .iter()
            .rev()
            .copied()
            .find(|t| fps >= t.enter_fps())
            .unwrap_or(Self::Low)
    }

    /// Richest tier below `self` whose stay threshold `fps` meets.
    fn fallback_for(self, fps: f32) -> Self {
        Self::ALL
            .iter()
            .rev()
            .copied()
            .filter(|t| *t < self)
            .find(|t| fps >= t.stay_fps())
            .unwrap_or(Self::Low)
    }
}

/// Tier-derived population budget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityBudget {
    pub spawn_scale: f32,
    pub max_count_scale: f32,
}

/// Everything a field needs to size itself for the current frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameBudget {
    pub spawn_scale: f32,
    pub max_count_scale: f32,
    /// Multiplier on the field's hard particle cap.
    pub cap_scale: f32,
    /// Physics cadence in frames. Always 1: throttling happens via population.
    pub tick_modulo: u32,
    pub size_scale: f32,
    pub skip_non_critical_every: u32,
}

impl Default for FrameBudget {
    fn default() -> Self {
        Self {
            spawn_scale: 1.0,
            max_count_scale: 1.0,
            cap_scale: 1.0,
            tick_modulo: 1,
            size_scale: 1.0,
            skip_non_critical_every: 1,
        }
    }
}

/// Change notifications for subscribed fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QualityEvent {
    TierChanged { from: QualityTier, to: QualityTier },
    /// The global multiplier changed; the tier did not.
    BudgetChanged,
}

/// Handle shared by the board and every field.
pub type SharedQuality = Rc<RefCell<QualityController>>;

pub struct QualityController {
    tier: QualityTier,
    smoothed: Option<f32>,
    lock: Option<QualityTier>,
    multiplier: f32,
    /// Tier the smoothed signal currently points at, and for how many samples.
    pending: Option<(QualityTier, u32)>,
    events: EventBus<QualityEvent>,
}

impl QualityController {
    pub fn new() -> Self {
        Self {
            tier: QualityTier::High,
            smoothed: None,
            lock: None,
            multiplier: 1.0,
            pending: None,
            events: EventBus::new(),
        }
    }

    /// Wrap a fresh controller in the shared handle fields expect.
    pub fn shared() -> SharedQuality {
        Rc::new(RefCell::new(Self::new()))
    }

    /// Feed one FPS sample. Non-finite or non-positive samples are ignored.
    pub fn update_from_fps(&mut self, fps: f32) {
        if !fps.is_finite() || fps <= 0.0 {
            return;
        }
        let smoothed = match self.smoothed {
            Some(prev) => prev + (fps - prev) * FPS_SMOOTHING,
            None => fps,
        };
        self.smoothed = Some(smoothed);

        if self.lock.is_some() {
            return;
        }

        let wanted = self.evaluate(smoothed);
        if wanted == self.tier {
            self.pending = None;
            return;
        }
        let count = match self.pending {
            Some((tier, n)) if tier == wanted => n + 1,
            _ => 1,
        };
        if count >= CONFIRM_SAMPLES {
            self.pending = None;
            self.set_tier(wanted);
        } else {
            self.pending = Some((wanted, count));
        }
    }

    /// Tier the smoothed value argues for, with hysteresis around the current tier.
    fn evaluate(&self, smoothed: f32) -> QualityTier {
        let upgrade = QualityTier::entered_by(smoothed);
        if upgrade > self.tier {
            return upgrade;
        }
        if smoothed >= self.tier.stay_fps() {
            return self.tier;
        }
        self.tier.fallback_for(smoothed)
    }

    fn set_tier(&mut self, tier: QualityTier) {
        if tier == self.tier {
            return;
        }
        let from = self.tier;
        self.tier = tier;
        log::info!(
            "quality: {:?} -> {:?} (smoothed fps {:.1})",
            from,
            tier,
            self.smoothed.unwrap_or(0.0)
        );
        self.events.emit(QualityEvent::TierChanged { from, to: tier });
    }

    /// Freeze the tier (benchmarking) or release the freeze with `None`.
    pub fn set_lock(&mut self, lock: Option<QualityTier>) {
        self.lock = lock;
        self.pending = None;
        log::info!("quality: lock set to {:?}", lock);
        if let Some(tier) = lock {
            self.set_tier(tier);
        }
    }

    pub fn lock(&self) -> Option<QualityTier> {
        self.lock
    }

    /// Global A/B multiplier applied to both population scales.
    pub fn set_budget_multiplier(&mut self, multiplier: f32) {
        let m = if multiplier.is_finite() {
            multiplier.clamp(MIN_BUDGET_MULTIPLIER, MAX_BUDGET_MULTIPLIER)
        } else {
            1.0
        };
        if (m - self.multiplier).abs() < f32::EPSILON {
            return;
        }
        self.multiplier = m;
        self.events.emit(QualityEvent::BudgetChanged);
    }

    pub fn budget_multiplier(&self) -> f32 {
        self.multiplier
    }

    pub fn tier(&self) -> QualityTier {
        self.tier
    }

    pub fn smoothed_fps(&self) -> Option<f32> {
        self.smoothed
    }

    /// Tier budget with the global multiplier applied.
    pub fn budget(&self) -> QualityBudget {
        let base = self.tier.budget();
        QualityBudget {
            spawn_scale: base.spawn_scale * self.multiplier,
            max_count_scale: base.max_count_scale * self.multiplier,
        }
    }

    /// `budget()` plus cap, cadence, size and render hints for this frame.
    pub fn adaptive_frame_budget(&self) -> FrameBudget {
        let budget = self.budget();
        FrameBudget {
            spawn_scale: budget.spawn_scale,
            max_count_scale: budget.max_count_scale,
            cap_scale: self.tier.particle_cap_scale(),
            tick_modulo: 1,
            size_scale: self.tier.size_scale(),
            skip_non_critical_every: self.tier.skip_non_critical_every(),
        }
    }

    /// Listen for tier/budget changes.
    pub fn subscribe(&self) -> Subscription<QualityEvent> {
        self.events.subscribe()
    }

    pub fn listener_count(&self) -> usize {
        self.events.listener_count()
    }
}

impl Default for QualityController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(q: &mut QualityController, samples: &[f32]) -> Vec<QualityTier> {
        samples
            .iter()
            .map(|&fps| {
                q.update_from_fps(fps);
                q.tier()
            })
            .collect()
    }

    #[test]
    fn starts_high() {
        assert_eq!(QualityController::new().tier(), QualityTier::High);
    }

    #[test]
    fn sustained_60_reaches_ultra() {
        let mut q = QualityController::new();
        feed(&mut q, &[60.0, 60.0]);
        assert_eq!(q.tier(), QualityTier::Ultra);
    }

    #[test]
    fn hysteresis_holds_high_on_sag() {
        let mut q = QualityController::new();
        let tiers = feed(&mut q, &[60.0, 60.0, 58.0, 44.0, 44.0, 44.0, 44.0, 44.0]);
        assert!(
            tiers.iter().all(|t| *t >= QualityTier::High),
            "dropped below High: {:?}",
            tiers
        );
        assert_eq!(tiers[2], QualityTier::Ultra);
    }

    #[test]
    fn single_dip_is_ignored() {
        let mut q = QualityController::new();
        feed(&mut q, &[60.0, 60.0, 60.0]);
        assert_eq!(q.tier(), QualityTier::Ultra);
        feed(&mut q, &[20.0, 60.0, 60.0]);
        assert_eq!(q.tier(), QualityTier::Ultra);
    }

    #[test]
    fn sustained_collapse_reaches_low() {
        let mut q = QualityController::new();
        feed(&mut q, &[15.0; 6]);
        assert_eq!(q.tier(), QualityTier::Low);
    }

    #[test]
    fn stay_band_keeps_medium() {
        let mut q = QualityController::new();
        q.set_lock(Some(QualityTier::Medium));
        q.set_lock(None);
        // 30 fps is below Medium's enter (32) but above its stay (29).
        feed(&mut q, &[30.0; 5]);
        assert_eq!(q.tier(), QualityTier::Medium);
    }

    #[test]
    fn invalid_samples_are_ignored() {
        let mut q = QualityController::new();
        q.update_from_fps(50.0);
        q.update_from_fps(f32::NAN);
        q.update_from_fps(-3.0);
        q.update_from_fps(0.0);
        assert_eq!(q.smoothed_fps(), Some(50.0));
        assert_eq!(q.tier(), QualityTier::High);
    }

    #[test]
    fn lock_bypasses_fps() {
        let mut q = QualityController::new();
        q.set_lock(Some(QualityTier::Low));
        feed(&mut q, &[60.0; 10]);
        assert_eq!(q.tier(), QualityTier::Low);
        q.set_lock(None);
        feed(&mut q, &[60.0; 2]);
        assert_eq!(q.tier(), QualityTier::Ultra);
    }

    #[test]
    fn budgets_per_tier() {
        assert_eq!(QualityTier::Ultra.budget().max_count_scale, 1.0);
        assert_eq!(QualityTier::High.budget().spawn_scale, 0.7);
        assert_eq!(QualityTier::Medium.budget().max_count_scale, 0.5);
        assert_eq!(QualityTier::Low.budget().spawn_scale, 0.2);
    }

    #[test]
    fn multiplier_scales_budget() {
        let mut q = QualityController::new();
        q.set_lock(Some(QualityTier::Ultra));
        q.set_budget_multiplier(0.5);
        let b = q.budget();
        assert!((b.spawn_scale - 0.5).abs() < 1e-6);
        assert!((b.max_count_scale - 0.5).abs() < 1e-6);
        q.set_budget_multiplier(100.0);
        assert_eq!(q.budget_multiplier(), MAX_BUDGET_MULTIPLIER);
    }

    #[test]
    fn adaptive_budget_low_tier() {
        let mut q = QualityController::new();
        q.set_lock(Some(QualityTier::Low));
        let fb = q.adaptive_frame_budget();
        assert_eq!(fb.tick_modulo, 1);
        assert_eq!(fb.skip_non_critical_every, 2);
        assert!((fb.cap_scale - 0.35).abs() < 1e-6);
        assert!((fb.size_scale - 0.85).abs() < 1e-6);
    }

    #[test]
    fn tier_change_is_broadcast() {
        let mut q = QualityController::new();
        let sub = q.subscribe();
        q.set_lock(Some(QualityTier::Low));
        assert_eq!(
            sub.drain(),
            vec![QualityEvent::TierChanged {
                from: QualityTier::High,
                to: QualityTier::Low
            }]
        );
        q.set_budget_multiplier(0.8);
        assert_eq!(sub.drain(), vec![QualityEvent::BudgetChanged]);
    }
}
