use bytemuck::{Pod, Zeroable};

use super::surface::{Rgba, Surface};

/// One dot, read by the host renderer straight from linear memory.
/// 8 floats = 32 bytes stride.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct DotInstance {
    pub x: f32,
    pub y: f32,
    /// Screen radius in px.
    pub radius: f32,
    pub r: f32,
    pub g: f32,
    pub b: f32,
    /// Opacity after fade and shimmer.
    pub alpha: f32,
    pub _pad: f32,
}

impl DotInstance {
    pub const FLOATS: usize = 8;
    pub const STRIDE_BYTES: usize = Self::FLOATS * 4;
}

/// One link segment. Width is implied (hairline); alpha carries the strength.
/// 8 floats = 32 bytes stride.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct LinkInstance {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub alpha: f32,
}

impl LinkInstance {
    pub const FLOATS: usize = 8;
}

/// Surface that records a frame as packed instances for a GPU or Canvas2D host.
pub struct DotBuffer {
    pub dots: Vec<DotInstance>,
    pub links: Vec<LinkInstance>,
}

impl DotBuffer {
    pub fn new() -> Self {
        Self::with_capacity(512)
    }

    pub fn with_capacity(max_dots: usize) -> Self {
        Self {
            dots: Vec::with_capacity(max_dots),
            links: Vec::new(),
        }
    }

    pub fn dot_count(&self) -> u32 {
        self.dots.len() as u32
    }

    pub fn link_count(&self) -> u32 {
        self.links.len() as u32
    }

    /// Raw pointer to dot data for host reads.
    pub fn dots_ptr(&self) -> *const f32 {
        self.dots.as_ptr() as *const f32
    }

    /// Raw pointer to link data for host reads.
    pub fn links_ptr(&self) -> *const f32 {
        self.links.as_ptr() as *const f32
    }

    /// Dot data as a flat float slice.
    pub fn dot_floats(&self) -> &[f32] {
        bytemuck::cast_slice(&self.dots)
    }

    /// Link data as a flat float slice.
    pub fn link_floats(&self) -> &[f32] {
        bytemuck::cast_slice(&self.links)
    }
}

impl Default for DotBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Surface for DotBuffer {
    fn clear(&mut self) {
        self.dots.clear();
        self.links.clear();
    }

    fn fill_circle(&mut self, x: f32, y: f32, radius: f32, color: Rgba) {
        self.dots.push(DotInstance {
            x,
            y,
            radius,
            r: color.r,
            g: color.g,
            b: color.b,
            alpha: color.a,
            _pad: 0.0,
        });
    }

    fn stroke_line(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, _width: f32, color: Rgba) {
        self.links.push(LinkInstance {
            x0,
            y0,
            x1,
            y1,
            r: color.r,
            g: color.g,
            b: color.b,
            alpha: color.a,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dot_instance_is_8_floats() {
        assert_eq!(std::mem::size_of::<DotInstance>(), 32);
        assert_eq!(std::mem::size_of::<LinkInstance>(), 32);
        assert_eq!(DotInstance::STRIDE_BYTES, 32);
    }

    #[test]
    fn records_and_clears() {
        let mut buf = DotBuffer::new();
        buf.fill_circle(1.0, 2.0, 1.5, Rgba::WHITE);
        buf.stroke_line(0.0, 0.0, 3.0, 4.0, 1.0, Rgba::WHITE.with_alpha(0.1));
        assert_eq!(buf.dot_count(), 1);
        assert_eq!(buf.link_count(), 1);
        assert_eq!(buf.dot_floats()[..3], [1.0, 2.0, 1.5]);
        assert_eq!(buf.link_floats().len(), LinkInstance::FLOATS);
        buf.clear();
        assert_eq!(buf.dot_count(), 0);
        assert_eq!(buf.link_count(), 0);
    }
}
