pub mod instance;
pub mod raster;
pub mod surface;

// Re-export key types for convenient access
pub use instance::{DotBuffer, DotInstance, LinkInstance};
pub use raster::PixelCanvas;
pub use surface::{Rgba, Surface};
