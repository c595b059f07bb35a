//! Drawing target contract.
//!
//! Fields draw through this trait only, so the same simulation can feed a
//! GPU instance buffer (`DotBuffer`) or a CPU raster (`PixelCanvas`).

use serde::{Deserialize, Serialize};

/// Straight (non-premultiplied) RGBA color, components in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const WHITE: Rgba = Rgba::new(1.0, 1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    /// Component-wise linear interpolation.
    pub fn lerp(self, other: Rgba, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        Self {
            r: self.r + (other.r - self.r) * t,
            g: self.g + (other.g - self.g) * t,
            b: self.b + (other.b - self.b) * t,
            a: self.a + (other.a - self.a) * t,
        }
    }
}

/// Something a field can draw a frame onto.
pub trait Surface {
    /// Begin a new frame.
    fn clear(&mut self);

    fn fill_circle(&mut self, x: f32, y: f32, radius: f32, color: Rgba);

    fn stroke_line(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, width: f32, color: Rgba);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lerp_endpoints() {
        let a = Rgba::new(0.0, 0.0, 0.0, 1.0);
        let b = Rgba::new(1.0, 0.5, 0.0, 0.0);
        assert_eq!(a.lerp(b, 0.0), a);
        assert_eq!(a.lerp(b, 1.0), b);
        assert_eq!(a.lerp(b, 2.0), b);
    }

    #[test]
    fn with_alpha_keeps_rgb() {
        let c = Rgba::WHITE.with_alpha(0.25);
        assert_eq!(c, Rgba::new(1.0, 1.0, 1.0, 0.25));
    }
}
