use egui::Vec2;

/// The drawing surface shared by both passes.
///
/// Geometry is logical; the physical buffer follows `pixels_per_point`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Surface {
    size: Vec2,
    pixels_per_point: f32,
    attached: bool,
}

impl Default for Surface {
    fn default() -> Self {
        Self {
            size: Vec2::ZERO,
            pixels_per_point: 1.0,
            attached: true,
        }
    }
}

impl Surface {
    pub fn new(size: Vec2, pixels_per_point: f32) -> Self {
        let mut surface = Self::default();
        surface.resize(size, pixels_per_point);
        surface
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    pub fn width(&self) -> f32 {
        self.size.x
    }

    pub fn height(&self) -> f32 {
        self.size.y
    }

    pub fn pixels_per_point(&self) -> f32 {
        self.pixels_per_point
    }

    /// Backing buffer size in device pixels.
    pub fn physical_size(&self) -> [u32; 2] {
        let w = (self.size.x * self.pixels_per_point).round().max(0.0) as u32;
        let h = (self.size.y * self.pixels_per_point).round().max(0.0) as u32;
        [w, h]
    }

    pub fn is_empty(&self) -> bool {
        self.size.x <= 0.0 || self.size.y <= 0.0
    }

    /// Returns whether anything changed.
    pub fn resize(&mut self, size: Vec2, pixels_per_point: f32) -> bool {
        let size = size.max(Vec2::ZERO);
        let pixels_per_point = if pixels_per_point.is_finite() && pixels_per_point > 0.0 {
            pixels_per_point
        } else {
            1.0
        };
        let changed = size != self.size || pixels_per_point != self.pixels_per_point;
        self.size = size;
        self.pixels_per_point = pixels_per_point;
        changed
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn attach(&mut self) {
        self.attached = true;
    }

    pub fn detach(&mut self) {
        self.attached = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::vec2;

    #[test]
    fn physical_size_scales_and_rounds() {
        let surface = Surface::new(vec2(801.0, 400.0), 1.5);
        assert_eq!(surface.physical_size(), [1202, 600]);
    }

    #[test]
    fn resize_reports_changes() {
        let mut surface = Surface::new(vec2(100.0, 100.0), 2.0);
        assert!(!surface.resize(vec2(100.0, 100.0), 2.0));
        assert!(surface.resize(vec2(100.0, 100.0), 1.0));
        assert!(surface.resize(vec2(-5.0, 100.0), 1.0));
        assert!(surface.is_empty());
        assert!(!surface.resize(vec2(0.0, 100.0), f32::NAN));
    }
}
