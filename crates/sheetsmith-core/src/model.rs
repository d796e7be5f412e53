use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Axis-aligned rectangle (pixels). `x,y` is top-left; `w,h` are sizes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }
    /// Inclusive right edge coordinate (`x + w - 1`).
    pub fn right(&self) -> u32 {
        self.x + self.w.saturating_sub(1)
    }
    /// Inclusive bottom edge coordinate (`y + h - 1`).
    pub fn bottom(&self) -> u32 {
        self.y + self.h.saturating_sub(1)
    }
    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }
    /// Returns true if `r` is fully inside `self` (inclusive edges).
    pub fn contains(&self, r: &Rect) -> bool {
        r.x >= self.x && r.y >= self.y && r.right() <= self.right() && r.bottom() <= self.bottom()
    }
    /// Clip `self` to a `width` x `height` surface anchored at the origin.
    pub fn clip_to(&self, width: u32, height: u32) -> Rect {
        let x = self.x.min(width);
        let y = self.y.min(height);
        let x2 = self.x.saturating_add(self.w).min(width);
        let y2 = self.y.saturating_add(self.h).min(height);
        Rect::new(x, y, x2 - x, y2 - y)
    }
}

/// Stable identifier of a frame on a canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameId(pub u64);

/// Stable identifier of a layer; survives save/load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(pub u32);

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reference point inside a frame, in the frame's local pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Anchor {
    pub x: i32,
    pub y: i32,
}

impl Anchor {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A sprite image placed on the assembly canvas.
#[derive(Debug, Clone)]
pub struct Frame {
    pub id: FrameId,
    /// Source identifier (file name relative to the source folder).
    pub key: String,
    /// Decoded pixels; width/height below always match this buffer.
    pub image: Arc<RgbaImage>,
    pub width: u32,
    pub height: u32,
    pub x: f64,
    pub y: f64,
    pub visible: bool,
    pub layer: LayerId,
    /// Frame-level anchor (used when not inheriting, or in per-frame manual mode).
    pub anchor: Option<Anchor>,
    /// When true the owning layer's anchor configuration decides.
    pub anchor_inherit: bool,
    /// Insertion order, stable z tiebreak within a layer.
    pub order: u64,
}

impl Frame {
    /// Exclusive right / bottom extents in canvas space.
    pub fn extent(&self) -> (f64, f64) {
        (self.x + self.width as f64, self.y + self.height as f64)
    }

    /// True if the canvas point lies within the frame's bounds.
    pub fn hit(&self, x: f64, y: f64) -> bool {
        let (r, b) = self.extent();
        x >= self.x && x < r && y >= self.y && y < b
    }

    /// Integer-rounded placement used for compositing and export.
    pub fn pixel_position(&self) -> (i64, i64) {
        (self.x.round() as i64, self.y.round() as i64)
    }
}

/// Where a frame landed in an assembled sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub key: String,
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}
