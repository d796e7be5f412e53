//! Grid geometry: cell sizing, grid positions, snapping and footprints.
//!
//! All functions are pure. A non-positive step (degenerate cell + padding) turns
//! snapping and cell lookup into no-ops instead of dividing by zero.

use crate::config::{GridLayoutConfig, LayoutMode, PaddingMode, SheetKind, TileSizeMode};

/// Diagonal offset between successive frames in free-form layouts.
pub const FREE_FORM_STEP: f64 = 10.0;

/// Fallback sprite sheet cell size when the canvas has no frames yet.
pub const DEFAULT_CELL: u32 = 32;

/// Cell size and inter-cell padding of a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellMetrics {
    pub cell_w: u32,
    pub cell_h: u32,
    pub pad: u32,
}

impl CellMetrics {
    pub fn new(cell_w: u32, cell_h: u32, pad: u32) -> Self {
        Self { cell_w, cell_h, pad }
    }
    /// Horizontal distance between the origins of neighbouring cells.
    pub fn step_x(&self) -> f64 {
        self.cell_w as f64 + self.pad as f64
    }
    /// Vertical distance between the origins of neighbouring cells.
    pub fn step_y(&self) -> f64 {
        self.cell_h as f64 + self.pad as f64
    }
    pub fn is_degenerate(&self) -> bool {
        self.step_x() <= 0.0 || self.step_y() <= 0.0
    }
}

/// Computes cell size and padding from the frame sizes on the canvas plus any
/// frames about to be added (`extra`).
pub fn compute_cell_and_padding<I, J>(sizes: I, extra: J, cfg: &GridLayoutConfig) -> CellMetrics
where
    I: IntoIterator<Item = (u32, u32)>,
    J: IntoIterator<Item = (u32, u32)>,
{
    let mut max_w: Option<u32> = None;
    let mut max_h: Option<u32> = None;
    for (w, h) in sizes.into_iter().chain(extra) {
        max_w = Some(max_w.map_or(w, |m| m.max(w)));
        max_h = Some(max_h.map_or(h, |m| m.max(h)));
    }
    match cfg.kind {
        SheetKind::Tilemap => match cfg.tile_size_mode {
            TileSizeMode::Force => CellMetrics::new(cfg.tile_size, cfg.tile_size, 0),
            TileSizeMode::PerTile => CellMetrics::new(
                max_w.unwrap_or(cfg.tile_size),
                max_h.unwrap_or(cfg.tile_size),
                0,
            ),
        },
        SheetKind::Spritesheet => {
            let cell_w = max_w.unwrap_or(DEFAULT_CELL);
            let cell_h = max_h.unwrap_or(DEFAULT_CELL);
            let pad = match cfg.padding_mode {
                PaddingMode::Fixed => cfg.padding,
                PaddingMode::FrameWidth => cell_w,
                PaddingMode::FrameHeight => cell_h,
            };
            CellMetrics::new(cell_w, cell_h, pad)
        }
    }
}

/// Position of the `index`-th frame in insertion order.
pub fn next_position(index: usize, metrics: CellMetrics, cfg: &GridLayoutConfig) -> (f64, f64) {
    match cfg.layout_mode {
        LayoutMode::Grid => {
            let cols = cfg.columns.max(1) as usize;
            let col = index % cols;
            let row = index / cols;
            (col as f64 * metrics.step_x(), row as f64 * metrics.step_y())
        }
        LayoutMode::FreeForm => {
            let offset = index as f64 * FREE_FORM_STEP;
            (offset, offset)
        }
    }
}

/// Rounds a position to the nearest cell origin.
pub fn snap(x: f64, y: f64, metrics: CellMetrics) -> (f64, f64) {
    if metrics.is_degenerate() {
        return (x, y);
    }
    let (sx, sy) = (metrics.step_x(), metrics.step_y());
    ((x / sx).round() * sx, (y / sy).round() * sy)
}

/// Grid cell `(row, col)` nearest to a position.
pub fn cell_of(x: f64, y: f64, metrics: CellMetrics) -> Option<(i64, i64)> {
    if metrics.is_degenerate() {
        return None;
    }
    let col = (x / metrics.step_x()).round() as i64;
    let row = (y / metrics.step_y()).round() as i64;
    Some((row, col))
}

/// Origin of cell `(row, col)`.
pub fn cell_origin(row: i64, col: i64, metrics: CellMetrics) -> (f64, f64) {
    (col as f64 * metrics.step_x(), row as f64 * metrics.step_y())
}

/// Rows of the grid: explicit when configured, else one past the deepest frame row.
pub fn effective_rows<I>(cfg: &GridLayoutConfig, frame_ys: I, metrics: CellMetrics) -> u32
where
    I: IntoIterator<Item = f64>,
{
    if cfg.rows > 0 {
        return cfg.rows;
    }
    if metrics.is_degenerate() {
        return 1;
    }
    let step_y = metrics.step_y();
    frame_ys
        .into_iter()
        .map(|y| ((y / step_y).floor().max(0.0) as u32).saturating_add(1))
        .max()
        .unwrap_or(1)
        .max(1)
}

/// Pixel size of a `cols` x `rows` grid; padding only between cells.
/// Saturates at `u32::MAX`.
pub fn grid_footprint(cols: u32, rows: u32, metrics: CellMetrics) -> (u32, u32) {
    let span = |n: u32, cell: u32| {
        n.saturating_mul(cell)
            .saturating_add(metrics.pad.saturating_mul(n.saturating_sub(1)))
    };
    (span(cols, metrics.cell_w), span(rows, metrics.cell_h))
}
