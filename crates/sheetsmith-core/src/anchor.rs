use crate::config::{AnchorMode, AnchorSource, AnchorType};
use crate::layers::Layer;
use crate::model::{Anchor, Frame, Rect};
use image::RgbaImage;

/// Alpha values at or below this count as background noise during anchor detection.
pub const ALPHA_NOISE_THRESHOLD: u8 = 5;

/// Bounding box of pixels whose alpha exceeds `threshold`, or `None` if there are none.
pub fn opaque_bounds(rgba: &RgbaImage, threshold: u8) -> Option<Rect> {
    let (w, h) = rgba.dimensions();
    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0u32;
    let mut max_y = 0u32;
    let mut found = false;
    for (x, y, px) in rgba.enumerate_pixels() {
        if px[3] > threshold {
            found = true;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }
    if !found || w == 0 || h == 0 {
        return None;
    }
    Some(Rect::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
}

/// Detects an anchor from the alpha channel of a frame.
///
/// `x` is the horizontal centre of the opaque bounding box; `y` depends on
/// `anchor_type` and is moved inwards by `padding` for top/bottom anchors.
/// The result is clamped into the image.
pub fn auto_detect(rgba: &RgbaImage, anchor_type: AnchorType, padding: i32) -> Option<Anchor> {
    let bounds = opaque_bounds(rgba, ALPHA_NOISE_THRESHOLD)?;
    let (w, h) = rgba.dimensions();
    let left = bounds.x as i32;
    let right = bounds.right() as i32;
    let top = bounds.y as i32;
    let bottom = bounds.bottom() as i32;
    let x = (left + right) / 2;
    let y = match anchor_type {
        AnchorType::Top => top + padding,
        AnchorType::Center => (top + bottom) / 2,
        AnchorType::Bottom => bottom - padding,
    };
    Some(Anchor::new(
        x.clamp(0, w as i32 - 1),
        y.clamp(0, h as i32 - 1),
    ))
}

/// Resolves the anchor of `frame` given its owning `layer`.
///
/// `layer_head` is the frame used for a layer-wide automatic anchor (the first
/// frame of the layer); it is only consulted the first time, the result is
/// cached on the layer.
pub fn resolve(frame: &Frame, layer: &Layer, layer_head: Option<&Frame>) -> Option<Anchor> {
    if !frame.anchor_inherit {
        return frame.anchor;
    }
    match (layer.anchor_mode, layer.anchor_source) {
        (AnchorMode::Off, _) => None,
        (AnchorMode::Global, AnchorSource::Manual) => layer.anchor,
        (AnchorMode::Global, AnchorSource::Auto) => *layer.global_auto_anchor.get_or_init(|| {
            layer_head.and_then(|head| {
                auto_detect(&head.image, layer.anchor_type, layer.anchor_padding)
            })
        }),
        (AnchorMode::PerFrame, AnchorSource::Manual) => frame.anchor,
        (AnchorMode::PerFrame, AnchorSource::Auto) => {
            auto_detect(&frame.image, layer.anchor_type, layer.anchor_padding)
        }
    }
}

/// Anchor position in canvas coordinates.
pub fn world_anchor(frame: &Frame, anchor: Anchor) -> (f64, f64) {
    (frame.x + anchor.x as f64, frame.y + anchor.y as f64)
}
