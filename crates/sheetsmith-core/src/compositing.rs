use crate::model::Rect;
use image::{Rgba, RgbaImage};

/// How source pixels combine with what is already on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    /// Source-over alpha compositing (later layers draw over earlier ones).
    #[default]
    Over,
    /// Copy source pixels verbatim, including transparent ones.
    Replace,
}

/// Blit `src` into `canvas` with its top-left at (dx, dy), clipping at every
/// canvas edge (negative offsets are allowed), then optionally draw a red 1px
/// outline around the blitted area for debugging.
pub fn blit_rgba(
    src: &RgbaImage,
    canvas: &mut RgbaImage,
    dx: i64,
    dy: i64,
    mode: BlendMode,
    outlines: bool,
) {
    let (cw, ch) = (canvas.width() as i64, canvas.height() as i64);
    let (sw, sh) = (src.width() as i64, src.height() as i64);

    // visible source window
    let x0 = (-dx).max(0);
    let y0 = (-dy).max(0);
    let x1 = sw.min(cw - dx);
    let y1 = sh.min(ch - dy);
    if x0 >= x1 || y0 >= y1 {
        return;
    }

    for sy in y0..y1 {
        for sx in x0..x1 {
            let px = *src.get_pixel(sx as u32, sy as u32);
            let (tx, ty) = ((dx + sx) as u32, (dy + sy) as u32);
            match mode {
                BlendMode::Replace => canvas.put_pixel(tx, ty, px),
                BlendMode::Over => {
                    if px[3] == 0 {
                        continue;
                    }
                    let dst = canvas.get_pixel_mut(tx, ty);
                    *dst = over(px, *dst);
                }
            }
        }
    }

    if outlines {
        let red = Rgba([255, 0, 0, 255]);
        let (left, top) = (dx + x0, dy + y0);
        let (right, bottom) = (dx + x1 - 1, dy + y1 - 1);
        for x in left..=right {
            canvas.put_pixel(x as u32, top as u32, red);
            canvas.put_pixel(x as u32, bottom as u32, red);
        }
        for y in top..=bottom {
            canvas.put_pixel(left as u32, y as u32, red);
            canvas.put_pixel(right as u32, y as u32, red);
        }
    }
}

/// Source-over for straight (non-premultiplied) alpha.
fn over(src: Rgba<u8>, dst: Rgba<u8>) -> Rgba<u8> {
    if src[3] == 255 || dst[3] == 0 {
        return src;
    }
    let sa = src[3] as f32 / 255.0;
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    let mut out = [0u8; 4];
    for c in 0..3 {
        let s = src[c] as f32 * sa;
        let d = dst[c] as f32 * da * (1.0 - sa);
        out[c] = ((s + d) / out_a).round().clamp(0.0, 255.0) as u8;
    }
    out[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgba(out)
}

/// Copies `rect` (clipped to the image) out of `src`.
pub fn crop_rgba(src: &RgbaImage, rect: Rect) -> RgbaImage {
    let r = rect.clip_to(src.width(), src.height());
    let mut out = RgbaImage::new(r.w, r.h);
    for y in 0..r.h {
        for x in 0..r.w {
            out.put_pixel(x, y, *src.get_pixel(r.x + x, r.y + y));
        }
    }
    out
}

/// True when no pixel has a non-zero alpha.
pub fn is_blank(rgba: &RgbaImage) -> bool {
    rgba.pixels().all(|p| p[3] == 0)
}
