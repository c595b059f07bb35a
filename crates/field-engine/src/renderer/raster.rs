//! Software RGBA8 rasterizer. Used by hosts without a GPU path and by tests.

use super::surface::{Rgba, Surface};

/// CPU pixel buffer with straight-alpha "over" blending.
pub struct PixelCanvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    /// Clear color written by `clear()`.
    pub background: Rgba,
}

impl PixelCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; (width as usize) * (height as usize) * 4],
            background: Rgba::new(0.0, 0.0, 0.0, 0.0),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// RGBA8 rows, top to bottom.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// RGBA at (x, y), or `None` outside the canvas.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y * self.width + x) * 4) as usize;
        Some([self.pixels[i], self.pixels[i + 1], self.pixels[i + 2], self.pixels[i + 3]])
    }

    /// Pixels with any coverage.
    pub fn painted_count(&self) -> usize {
        self.pixels.chunks_exact(4).filter(|p| p[3] > 0).count()
    }

    fn blend(&mut self, x: i32, y: i32, color: Rgba, coverage: f32) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let a = (color.a * coverage).clamp(0.0, 1.0);
        if a <= 0.0 {
            return;
        }
        let i = ((y as u32 * self.width + x as u32) * 4) as usize;
        let dst = &mut self.pixels[i..i + 4];
        let dst_a = dst[3] as f32 / 255.0;
        let out_a = a + dst_a * (1.0 - a);
        let mix = |src: f32, d: u8| -> u8 {
            let d = d as f32 / 255.0;
            let v = if out_a > 0.0 {
                (src * a + d * dst_a * (1.0 - a)) / out_a
            } else {
                0.0
            };
            (v.clamp(0.0, 1.0) * 255.0).round() as u8
        };
        dst[0] = mix(color.r, dst[0]);
        dst[1] = mix(color.g, dst[1]);
        dst[2] = mix(color.b, dst[2]);
        dst[3] = (out_a * 255.0).round() as u8;
    }
}

impl Surface for PixelCanvas {
    fn clear(&mut self) {
        let bg = [
            (self.background.r.clamp(0.0, 1.0) * 255.0) as u8,
            (self.background.g.clamp(0.0, 1.0) * 255.0) as u8,
            (self.background.b.clamp(0.0, 1.0) * 255.0) as u8,
            (self.background.a.clamp(0.0, 1.0) * 255.0) as u8,
        ];
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&bg);
        }
    }

    fn fill_circle(&mut self, x: f32, y: f32, radius: f32, color: Rgba) {
        if !(x.is_finite() && y.is_finite() && radius.is_finite()) || radius <= 0.0 {
            return;
        }
        // One pixel of antialiasing ramp around the rim.
        let reach = radius + 1.0;
        let x0 = (x - reach).floor() as i32;
        let x1 = (x + reach).ceil() as i32;
        let y0 = (y - reach).floor() as i32;
        let y1 = (y + reach).ceil() as i32;
        for py in y0..=y1 {
            for px in x0..=x1 {
                let dx = px as f32 + 0.5 - x;
                let dy = py as f32 + 0.5 - y;
                let d = (dx * dx + dy * dy).sqrt();
                let coverage = (radius + 0.5 - d).clamp(0.0, 1.0);
                if coverage > 0.0 {
                    self.blend(px, py, color, coverage);
                }
            }
        }
    }

    fn stroke_line(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, width: f32, color: Rgba) {
        if ![x0, y0, x1, y1].iter().all(|v| v.is_finite()) {
            return;
        }
        let dx = x1 - x0;
        let dy = y1 - y0;
        let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as i32;
        let coverage = width.clamp(0.0, 1.0);
        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            let px = (x0 + dx * t).floor() as i32;
            let py = (y0 + dy * t).floor() as i32;
            self.blend(px, py, color, coverage);
        }
    }
}
