//! Viewport mapping adapter.
//!
//! Wraps the host's size query and camera state for one field. Size changes
//! always snap: the adapter never interpolates toward a new size, so physics
//! never integrates across a camera-driven jump.

use std::cell::Cell;
use std::rc::Rc;

use super::events::{EventBus, Subscription};

/// LOD attenuation while the board shows the overview.
pub const OVERVIEW_LOD: f32 = 0.55;
/// LOD attenuation while the owning toy is paused.
pub const PAUSED_LOD: f32 = 0.75;
/// Lower bound of the zoom-out attenuation.
pub const MIN_ZOOM_LOD: f32 = 0.5;

/// Host-side size and camera queries. Zoom and overview are optional.
pub trait ViewportSource {
    /// Pixel size of the drawing target, or `None` before it has been measured.
    fn surface_size(&self) -> Option<(f32, f32)>;

    fn zoom(&self) -> Option<f32> {
        None
    }

    fn overview(&self) -> Option<bool> {
        None
    }
}

/// A surface of constant size without camera information.
#[derive(Debug, Clone, Copy)]
pub struct FixedSize {
    pub width: f32,
    pub height: f32,
}

impl FixedSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

impl ViewportSource for FixedSize {
    fn surface_size(&self) -> Option<(f32, f32)> {
        Some((self.width, self.height))
    }
}

/// Board-wide camera state, written by the host's camera subsystem.
#[derive(Debug, Clone)]
pub struct CameraState {
    zoom: Rc<Cell<f32>>,
    overview: Rc<Cell<bool>>,
}

impl CameraState {
    pub fn new() -> Self {
        Self {
            zoom: Rc::new(Cell::new(1.0)),
            overview: Rc::new(Cell::new(false)),
        }
    }

    pub fn set_zoom(&self, zoom: f32) {
        self.zoom.set(zoom);
    }

    pub fn set_overview(&self, overview: bool) {
        self.overview.set(overview);
    }

    pub fn zoom(&self) -> f32 {
        self.zoom.get()
    }

    pub fn overview(&self) -> bool {
        self.overview.get()
    }
}

impl Default for CameraState {
    fn default() -> Self {
        Self::new()
    }
}

/// A surface whose size the host pushes in (e.g. measured from a canvas each frame).
#[derive(Debug, Clone)]
pub struct HostViewport {
    size: Rc<Cell<(f32, f32)>>,
    camera: Option<CameraState>,
}

impl HostViewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            size: Rc::new(Cell::new((width, height))),
            camera: None,
        }
    }

    pub fn with_camera(mut self, camera: CameraState) -> Self {
        self.camera = Some(camera);
        self
    }

    /// Update the measured size. Shared with every clone of this handle.
    pub fn set_size(&self, width: f32, height: f32) {
        self.size.set((width, height));
    }
}

impl ViewportSource for HostViewport {
    fn surface_size(&self) -> Option<(f32, f32)> {
        Some(self.size.get())
    }

    fn zoom(&self) -> Option<f32> {
        self.camera.as_ref().map(CameraState::zoom)
    }

    fn overview(&self) -> Option<bool> {
        self.camera.as_ref().map(CameraState::overview)
    }
}

/// Notification buses shared by every field on a board.
#[derive(Clone, Default)]
pub struct BoardSignals {
    /// A surface was resized.
    pub resize: EventBus<()>,
    /// Overview transition started (`true`) or finished (`false`).
    pub overview_transition: EventBus<bool>,
    /// The camera settled on a new zoom level.
    pub zoom_commit: EventBus<f32>,
    /// Camera pan/pinch gesture started or stopped.
    pub gesture: EventBus<bool>,
}

impl BoardSignals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total live listeners across all buses.
    pub fn listener_count(&self) -> usize {
        self.resize.listener_count()
            + self.overview_transition.listener_count()
            + self.zoom_commit.listener_count()
            + self.gesture.listener_count()
    }
}

struct SignalHandles {
    resize: Subscription<()>,
    overview_transition: Subscription<bool>,
    zoom_commit: Subscription<f32>,
    gesture: Subscription<bool>,
}

impl SignalHandles {
    fn release(&mut self) {
        self.resize.release();
        self.overview_transition.release();
        self.zoom_commit.release();
        self.gesture.release();
    }
}

/// What `Viewport::poll` observed since the last poll.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ViewportChanges {
    /// The snapped size differs from the previous one.
    pub resized: bool,
    pub zoom_committed: bool,
    pub transition_ended: bool,
    /// Latest gesture state, if it was signalled.
    pub gesture: Option<bool>,
}

/// Normalized-to-pixel mapping for the current size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportMap {
    pub width: f32,
    pub height: f32,
}

impl ViewportMap {
    pub fn norm_to_x(&self, n: f32) -> f32 {
        n * self.width
    }

    pub fn norm_to_y(&self, n: f32) -> f32 {
        n * self.height
    }

    /// Shorter side, for caller-side sizing heuristics.
    pub fn scale(&self) -> f32 {
        self.width.min(self.height)
    }

    /// Inverse mapping. Returns (0, 0) for a degenerate size.
    pub fn px_to_norm(&self, x: f32, y: f32) -> (f32, f32) {
        if self.width <= 0.0 || self.height <= 0.0 {
            return (0.0, 0.0);
        }
        (x / self.width, y / self.height)
    }
}

pub struct Viewport {
    source: Box<dyn ViewportSource>,
    width: f32,
    height: f32,
    non_reactive: Option<bool>,
    in_transition: bool,
    paused: bool,
    handles: Option<SignalHandles>,
}

impl Viewport {
    pub fn new(source: impl ViewportSource + 'static) -> Self {
        let mut viewport = Self {
            source: Box::new(source),
            width: 0.0,
            height: 0.0,
            non_reactive: None,
            in_transition: false,
            paused: false,
            handles: None,
        };
        viewport.refresh_size();
        viewport
    }

    /// Subscribe to board notifications. Re-attaching replaces older handles.
    pub fn attach(&mut self, signals: &BoardSignals) {
        self.detach();
        self.handles = Some(SignalHandles {
            resize: signals.resize.subscribe(),
            overview_transition: signals.overview_transition.subscribe(),
            zoom_commit: signals.zoom_commit.subscribe(),
            gesture: signals.gesture.subscribe(),
        });
    }

    /// Release every subscription. Idempotent.
    pub fn detach(&mut self) {
        if let Some(mut handles) = self.handles.take() {
            handles.release();
        }
    }

    pub fn is_attached(&self) -> bool {
        self.handles.is_some()
    }

    /// Re-read the size from the host, snapping to it. Returns true if it changed.
    /// Non-finite or negative sizes read as zero area.
    pub fn refresh_size(&mut self) -> bool {
        let (w, h) = self
            .source
            .surface_size()
            .map(|(w, h)| (finite_or_zero(w), finite_or_zero(h)))
            .unwrap_or((0.0, 0.0));
        let changed = (w - self.width).abs() > f32::EPSILON || (h - self.height).abs() > f32::EPSILON;
        self.width = w;
        self.height = h;
        changed
    }

    /// Drain pending notifications and refresh the size.
    pub fn poll(&mut self) -> ViewportChanges {
        let mut changes = ViewportChanges::default();
        if let Some(handles) = &self.handles {
            // Size is re-read below regardless; the event only matters as a wake-up.
            let _ = handles.resize.drain();
            for active in handles.overview_transition.drain() {
                if self.in_transition && !active {
                    changes.transition_ended = true;
                }
                self.in_transition = active;
            }
            changes.zoom_committed = !handles.zoom_commit.drain().is_empty();
            changes.gesture = handles.gesture.drain().last().copied();
        }
        changes.resized = self.refresh_size();
        changes
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    /// True once the surface has been measured with non-zero area.
    pub fn has_area(&self) -> bool {
        self.width >= 1.0 && self.height >= 1.0
    }

    pub fn map(&self) -> ViewportMap {
        ViewportMap {
            width: self.width,
            height: self.height,
        }
    }

    /// Manual override of reactive mode; `None` follows the overview transition signal.
    pub fn set_non_reactive(&mut self, value: Option<bool>) {
        self.non_reactive = value;
    }

    /// While non-reactive the field must not re-home particles.
    pub fn is_non_reactive(&self) -> bool {
        self.non_reactive.unwrap_or(self.in_transition)
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Camera zoom, 1.0 when unknown.
    pub fn zoom(&self) -> f32 {
        match self.source.zoom() {
            Some(z) if z.is_finite() && z > 0.0 => z,
            _ => 1.0,
        }
    }

    /// Overview mode, false when unknown.
    pub fn overview(&self) -> bool {
        self.source.overview().unwrap_or(false)
    }

    /// Per-field attenuation from overview, zoom-out and pause state.
    pub fn lod_scale(&self) -> f32 {
        let mut scale = 1.0;
        if self.overview() {
            scale *= OVERVIEW_LOD;
        }
        let zoom = self.zoom();
        if zoom < 1.0 {
            scale *= zoom.sqrt().clamp(MIN_ZOOM_LOD, 1.0);
        }
        if self.paused {
            scale *= PAUSED_LOD;
        }
        scale
    }
}

impl Drop for Viewport {
    fn drop(&mut self) {
        self.detach();
    }
}

fn finite_or_zero(v: f32) -> f32 {
    if v.is_finite() {
        v.max(0.0)
    } else {
        0.0
    }
}
