/// Zoom limits of the canvas view.
pub const MIN_ZOOM: f64 = 0.2;
pub const MAX_ZOOM: f64 = 4.0;

/// Maps canvas (world) coordinates to screen coordinates under zoom and pan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    zoom: f64,
    pub pan_x: f64,
    pub pan_y: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
        }
    }
}

impl Viewport {
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Sets the zoom (clamped). Returns false when the change is negligible.
    pub fn set_zoom(&mut self, zoom: f64) -> bool {
        if !zoom.is_finite() {
            return false;
        }
        let zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        if (zoom - self.zoom).abs() < 0.001 {
            return false;
        }
        self.zoom = zoom;
        true
    }

    /// Mouse-wheel zoom: positive deltas zoom in by 10%, negative out by 10%.
    pub fn zoom_wheel(&mut self, delta: f64) -> bool {
        if delta == 0.0 {
            return false;
        }
        let factor = if delta > 0.0 { 1.1 } else { 0.9 };
        self.set_zoom(self.zoom * factor)
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.pan_x += dx;
        self.pan_y += dy;
    }

    pub fn to_screen(&self, x: f64, y: f64) -> (f64, f64) {
        (x * self.zoom + self.pan_x, y * self.zoom + self.pan_y)
    }

    pub fn to_world(&self, sx: f64, sy: f64) -> (f64, f64) {
        ((sx - self.pan_x) / self.zoom, (sy - self.pan_y) / self.zoom)
    }

    /// Scaled size of an image for display, at least one pixel per side.
    pub fn scaled_size(&self, width: u32, height: u32) -> (u32, u32) {
        let w = (width as f64 * self.zoom).round().max(1.0) as u32;
        let h = (height as f64 * self.zoom).round().max(1.0) as u32;
        (w, h)
    }
}
