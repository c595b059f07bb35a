pub mod api;
pub mod core;
pub mod renderer;
pub mod systems;

// Re-export key types at crate root for convenience
pub use api::board::{FieldBoard, FieldSlot};
pub use api::types::FieldId;
pub use crate::core::events::{EventBus, Subscription};
pub use crate::core::planner::{plan, spacing_for, Plan, PlanParams};
pub use crate::core::quality::{FrameBudget, QualityBudget, QualityController, QualityEvent, QualityTier, SharedQuality};
pub use crate::core::rng::Rng;
pub use crate::core::time::{sanitize_dt, FrameClock};
pub use crate::core::viewport::{BoardSignals, CameraState, FixedSize, HostViewport, Viewport, ViewportMap, ViewportSource};
pub use renderer::instance::{DotBuffer, DotInstance, LinkInstance};
pub use renderer::raster::PixelCanvas;
pub use renderer::surface::{Rgba, Surface};
pub use systems::field::{
    DrawMode, Falloff, FieldConfig, FieldStyle, Motion, Particle, ParticleField, PokeConfig, PokeMode,
    PushConfig, StylePatch,
};
