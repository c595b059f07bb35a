use crate::api::types::FieldId;
use crate::core::quality::{QualityController, QualityTier, SharedQuality};
use crate::core::viewport::{BoardSignals, CameraState, Viewport, ViewportSource};
use crate::renderer::instance::DotBuffer;
use crate::systems::field::{FieldConfig, ParticleField};

/// A field plus the instance buffer it draws into.
pub struct FieldSlot {
    pub field: ParticleField,
    pub buffer: DotBuffer,
}

/// Owns the shared quality controller, the board-wide signals and every field.
///
/// The host calls `tick` from its frame callback and feeds `update_fps` with a
/// measured frame rate about once per second. Camera and gesture notifications
/// go through the board so every field sees them.
pub struct FieldBoard {
    quality: SharedQuality,
    signals: BoardSignals,
    camera: CameraState,
    slots: Vec<(FieldId, FieldSlot)>,
    next_id: u32,
    gesturing: bool,
}

impl FieldBoard {
    pub fn new() -> Self {
        Self {
            quality: QualityController::shared(),
            signals: BoardSignals::new(),
            camera: CameraState::new(),
            slots: Vec::new(),
            next_id: 1,
            gesturing: false,
        }
    }

    /// Create a field attached to this board's signals and quality controller.
    pub fn spawn(&mut self, seed: &str, source: impl ViewportSource + 'static, config: FieldConfig) -> FieldId {
        let mut viewport = Viewport::new(source);
        viewport.attach(&self.signals);
        let mut field = ParticleField::new(seed, viewport, self.quality.clone(), config);
        field.set_gesturing(self.gesturing);

        let id = FieldId(self.next_id);
        self.next_id += 1;
        let buffer = DotBuffer::with_capacity(field.config().cap);
        self.slots.push((id, FieldSlot { field, buffer }));
        log::debug!("board: spawned field {:?} ({} total)", id, self.slots.len());
        id
    }

    /// Destroy and drop a field. Returns false for unknown ids.
    pub fn remove(&mut self, id: FieldId) -> bool {
        let Some(index) = self.slots.iter().position(|(i, _)| *i == id) else {
            return false;
        };
        let (_, mut slot) = self.slots.remove(index);
        slot.field.destroy();
        log::debug!("board: removed field {:?} ({} left)", id, self.slots.len());
        true
    }

    /// Advance and draw every field.
    pub fn tick(&mut self, dt: f32) {
        for (_, slot) in &mut self.slots {
            slot.field.tick(dt, &mut slot.buffer);
        }
    }

    /// Feed the frame rate observed by the host.
    pub fn update_fps(&mut self, fps: f32) {
        self.quality.borrow_mut().update_from_fps(fps);
    }

    pub fn set_quality_lock(&mut self, lock: Option<QualityTier>) {
        self.quality.borrow_mut().set_lock(lock);
    }

    pub fn set_budget_multiplier(&mut self, multiplier: f32) {
        self.quality.borrow_mut().set_budget_multiplier(multiplier);
    }

    pub fn tier(&self) -> QualityTier {
        self.quality.borrow().tier()
    }

    /// Camera gesture started or stopped.
    pub fn set_gesturing(&mut self, gesturing: bool) {
        if self.gesturing == gesturing {
            return;
        }
        self.gesturing = gesturing;
        self.signals.gesture.emit(gesturing);
    }

    /// The camera settled on `zoom`.
    pub fn commit_zoom(&mut self, zoom: f32) {
        if !zoom.is_finite() || zoom <= 0.0 {
            return;
        }
        self.camera.set_zoom(zoom);
        self.signals.zoom_commit.emit(zoom);
    }

    /// Start animating into or out of the overview.
    pub fn begin_overview_transition(&mut self, overview: bool) {
        self.camera.set_overview(overview);
        self.signals.overview_transition.emit(true);
    }

    pub fn end_overview_transition(&mut self) {
        self.signals.overview_transition.emit(false);
    }

    /// Some surface changed size; every field re-reads its own.
    pub fn notify_resize(&mut self) {
        self.signals.resize.emit(());
    }

    pub fn get(&self, id: FieldId) -> Option<&ParticleField> {
        self.slot(id).map(|s| &s.field)
    }

    pub fn get_mut(&mut self, id: FieldId) -> Option<&mut ParticleField> {
        self.slot_mut(id).map(|s| &mut s.field)
    }

    /// The instance buffer `id` drew into on the last tick.
    pub fn buffer(&self, id: FieldId) -> Option<&DotBuffer> {
        self.slot(id).map(|s| &s.buffer)
    }

    pub fn slot(&self, id: FieldId) -> Option<&FieldSlot> {
        self.slots.iter().find(|(i, _)| *i == id).map(|(_, s)| s)
    }

    pub fn slot_mut(&mut self, id: FieldId) -> Option<&mut FieldSlot> {
        self.slots.iter_mut().find(|(i, _)| *i == id).map(|(_, s)| s)
    }

    pub fn ids(&self) -> impl Iterator<Item = FieldId> + '_ {
        self.slots.iter().map(|(id, _)| *id)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn quality(&self) -> &SharedQuality {
        &self.quality
    }

    pub fn signals(&self) -> &BoardSignals {
        &self.signals
    }

    /// Camera handle to share with `HostViewport::with_camera`.
    pub fn camera(&self) -> &CameraState {
        &self.camera
    }
}

impl Default for FieldBoard {
    fn default() -> Self {
        Self::new()
    }
}
