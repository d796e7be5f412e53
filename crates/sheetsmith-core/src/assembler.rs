//! Turns a canvas into a single raster plus placement metadata.

use crate::canvas::CanvasModel;
use crate::compositing::{BlendMode, blit_rgba};
use crate::config::GridLayoutConfig;
use crate::error::{Result, SheetError};
use crate::geometry::{self, CellMetrics};
use crate::model::{Frame, Placement};
use crate::source::FrameSource;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Largest width or height of a composited sheet.
pub const MAX_CANVAS_SIDE: u32 = 32_768;

/// Rejects sheets with a side of zero or above [`MAX_CANVAS_SIDE`].
pub fn check_canvas_size(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 || width > MAX_CANVAS_SIDE || height > MAX_CANVAS_SIDE {
        return Err(SheetError::InvalidConfig(format!(
            "sheet size {width}x{height} outside 1..={MAX_CANVAS_SIDE}"
        )));
    }
    Ok(())
}

/// Rasterization switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssembleOptions {
    pub blend: BlendMode,
    /// Draw red outlines around every frame (debug).
    pub outlines: bool,
}

/// Composited sheet and where each frame landed.
#[derive(Debug, Clone)]
pub struct AssembledSheet {
    pub rgba: RgbaImage,
    /// Placements in draw order.
    pub placements: Vec<Placement>,
    /// Frames whose pixels could not be (re)loaded.
    pub skipped: usize,
}

/// One row of tilemap metadata (`tilemap,tile,x,y,width,height`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileRecord {
    pub tilemap: String,
    pub tile: String,
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

/// Output size for `frames`: the grid footprint (Grid mode) grown to the
/// bounding box of the actual frame extents, at least 1x1. Saturates at
/// `u32::MAX` for frames placed absurdly far out.
pub fn compute_canvas_size(
    frames: &[&Frame],
    cfg: &GridLayoutConfig,
    metrics: CellMetrics,
) -> (u32, u32) {
    let (mut w, mut h) = (0u32, 0u32);
    for f in frames {
        let (x, y) = f.pixel_position();
        let right = to_extent(x.saturating_add(f.width as i64));
        let bottom = to_extent(y.saturating_add(f.height as i64));
        w = w.max(right);
        h = h.max(bottom);
    }
    if cfg.is_grid() {
        let cols = cfg.columns.max(1);
        let rows = geometry::effective_rows(cfg, frames.iter().map(|f| f.y), metrics);
        let (gw, gh) = geometry::grid_footprint(cols, rows, metrics);
        w = w.max(gw);
        h = h.max(gh);
    }
    (w.max(1), h.max(1))
}

fn to_extent(v: i64) -> u32 {
    u32::try_from(v.max(0)).unwrap_or(u32::MAX)
}

/// Size of the sheet the canvas would export.
pub fn canvas_size(canvas: &CanvasModel) -> (u32, u32) {
    compute_canvas_size(&canvas.visible_frames(), canvas.config(), canvas.metrics())
}

#[instrument(skip_all)]
/// Composites the visible frames of `canvas` from their in-memory pixels,
/// in ascending z-order (layer order, then insertion order).
pub fn rasterize(canvas: &CanvasModel, opts: AssembleOptions) -> Result<AssembledSheet> {
    compose(canvas, opts, |frame| Some(frame.image.clone()))
}

#[instrument(skip_all)]
/// Like [`rasterize`], but re-reads every frame through `source` so on-disk
/// edits are picked up. Frames that fail to load are skipped and counted.
pub fn rasterize_reloading(
    canvas: &CanvasModel,
    source: &dyn FrameSource,
    opts: AssembleOptions,
) -> Result<AssembledSheet> {
    compose(canvas, opts, |frame| match source.load(&frame.key) {
        Ok(img) => Some(Arc::new(img)),
        Err(e) => {
            warn!(key = %frame.key, error = %e, "skip frame");
            None
        }
    })
}

fn compose<F>(canvas: &CanvasModel, opts: AssembleOptions, mut pixels: F) -> Result<AssembledSheet>
where
    F: FnMut(&Frame) -> Option<Arc<RgbaImage>>,
{
    let frames = canvas.visible_frames();
    if frames.is_empty() {
        return Err(SheetError::Empty);
    }
    let (w, h) = compute_canvas_size(&frames, canvas.config(), canvas.metrics());
    check_canvas_size(w, h)?;
    let mut rgba = RgbaImage::new(w, h);
    let mut placements = Vec::with_capacity(frames.len());
    let mut skipped = 0usize;
    for frame in frames {
        let Some(img) = pixels(frame) else {
            skipped += 1;
            continue;
        };
        let (x, y) = frame.pixel_position();
        blit_rgba(&img, &mut rgba, x, y, opts.blend, opts.outlines);
        placements.push(Placement {
            key: frame.key.clone(),
            x,
            y,
            width: img.width(),
            height: img.height(),
        });
    }
    info!(width = w, height = h, placed = placements.len(), skipped, "sheet composited");
    Ok(AssembledSheet {
        rgba,
        placements,
        skipped,
    })
}

/// Tilemap metadata rows for an exported sheet named `output_name`.
pub fn export_metadata(placements: &[Placement], output_name: &str) -> Vec<TileRecord> {
    placements
        .iter()
        .map(|p| TileRecord {
            tilemap: output_name.to_string(),
            tile: p.key.clone(),
            x: p.x,
            y: p.y,
            width: p.width,
            height: p.height,
        })
        .collect()
}
