//! Cutting an existing sheet back into per-cell images.

use crate::compositing::{crop_rgba, is_blank};
use crate::config::SplitConfig;
use crate::detect;
use crate::error::{Result, SheetError};
use crate::export;
use crate::model::Rect;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Maximum number of cell-size snapshots kept for resize undo.
pub const RESIZE_UNDO_DEPTH: usize = 10;

/// A cell address, zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

impl CellRef {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// File name of this cell's image, e.g. `hero_r1_c3.png`.
    pub fn file_name(&self, base: &str) -> String {
        format!("{base}_r{}_c{}.png", self.row + 1, self.col + 1)
    }
}

/// A split configuration with its cell counts resolved against a sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitGrid {
    pub cell_w: u32,
    pub cell_h: u32,
    pub columns: u32,
    pub rows: u32,
    pub pad_x: u32,
    pub pad_y: u32,
    pub offset_x: u32,
    pub offset_y: u32,
}

impl SplitGrid {
    /// Sheet-space bounds of a cell (not clipped to the sheet). Coordinates
    /// saturate at `u32::MAX`, so far-out cells crop to nothing.
    pub fn cell_bounds(&self, row: u32, col: u32) -> Rect {
        let origin = |offset: u32, index: u32, cell: u32, pad: u32| {
            offset.saturating_add(index.saturating_mul(cell.saturating_add(pad)))
        };
        Rect::new(
            origin(self.offset_x, col, self.cell_w, self.pad_x),
            origin(self.offset_y, row, self.cell_h, self.pad_y),
            self.cell_w,
            self.cell_h,
        )
    }

    pub fn contains(&self, cell: CellRef) -> bool {
        cell.row < self.rows && cell.col < self.columns
    }

    pub fn cell_count(&self) -> usize {
        self.columns as usize * self.rows as usize
    }

    /// Every cell in row-major order.
    pub fn all_cells(&self) -> Vec<CellRef> {
        (0..self.rows)
            .flat_map(|row| (0..self.columns).map(move |col| CellRef::new(row, col)))
            .collect()
    }
}

/// Resolves `cfg` against a `sheet_w` x `sheet_h` sheet. Zero column/row
/// counts become `floor((span + pad) / (cell + pad))` where span is the sheet
/// extent past the offset. `None` when a cell side is zero.
pub fn get_grid(cfg: &SplitConfig, sheet_w: u32, sheet_h: u32) -> Option<SplitGrid> {
    if cfg.cell_w == 0 || cfg.cell_h == 0 {
        return None;
    }
    let fit = |count: u32, sheet: u32, offset: u32, cell: u32, pad: u32| -> u32 {
        if count > 0 {
            return count;
        }
        let span = sheet.saturating_sub(offset) as u64;
        ((span + pad as u64) / (cell as u64 + pad as u64)) as u32
    };
    Some(SplitGrid {
        cell_w: cfg.cell_w,
        cell_h: cfg.cell_h,
        columns: fit(cfg.columns, sheet_w, cfg.offset_x, cfg.cell_w, cfg.pad_x),
        rows: fit(cfg.rows, sheet_h, cfg.offset_y, cfg.cell_h, cfg.pad_y),
        pad_x: cfg.pad_x,
        pad_y: cfg.pad_y,
        offset_x: cfg.offset_x,
        offset_y: cfg.offset_y,
    })
}

/// A cropped cell.
#[derive(Debug, Clone)]
pub struct ExtractedCell {
    pub cell: CellRef,
    pub image: RgbaImage,
}

/// Why a requested cell produced no image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Every pixel is fully transparent.
    Blank,
    /// The cell lies entirely past the sheet edge.
    OutsideSheet,
    /// The cell address is beyond the resolved grid.
    OutsideGrid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedCell {
    pub cell: CellRef,
    pub reason: SkipReason,
}

/// Result of [`SheetSplitter::extract`].
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub cells: Vec<ExtractedCell>,
    pub skipped: Vec<SkippedCell>,
}

/// One written cell image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedCell {
    pub cell: CellRef,
    pub file: String,
}

/// Result of [`SheetSplitter::export`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitReport {
    pub exported: Vec<ExportedCell>,
    pub skipped: Vec<SkippedCell>,
    pub manifest: PathBuf,
}

/// A grid line being dragged to resize cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridLine {
    /// Right edge of column `n`.
    Vertical(u32),
    /// Bottom edge of row `n`.
    Horizontal(u32),
}

#[derive(Debug, Clone, Copy)]
struct LineDrag {
    line: GridLine,
    snapshot_pushed: bool,
}

/// An opened sheet with a split configuration, cell selection and resize state.
#[derive(Debug, Clone)]
pub struct SheetSplitter {
    sheet: RgbaImage,
    sheet_path: Option<PathBuf>,
    config: SplitConfig,
    selection: BTreeSet<CellRef>,
    line_drag: Option<LineDrag>,
    resize_undo: VecDeque<(u32, u32)>,
}

impl SheetSplitter {
    pub fn new(sheet: RgbaImage, config: SplitConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            sheet,
            sheet_path: None,
            config,
            selection: BTreeSet::new(),
            line_drag: None,
            resize_undo: VecDeque::new(),
        })
    }

    /// Opens `sheet` with a configuration inferred by [`detect::detect`].
    pub fn from_detection(sheet: RgbaImage) -> Result<Self> {
        let grid = detect::detect(&sheet)?;
        Self::new(sheet, grid.to_split_config())
    }

    /// Records where the sheet came from (written to manifests).
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.sheet_path = Some(path.into());
        self
    }

    pub fn sheet(&self) -> &RgbaImage {
        &self.sheet
    }

    pub fn sheet_path(&self) -> Option<&Path> {
        self.sheet_path.as_deref()
    }

    pub fn config(&self) -> &SplitConfig {
        &self.config
    }

    /// Replaces the configuration; selected cells outside the new grid are dropped.
    pub fn set_config(&mut self, config: SplitConfig) -> Result<()> {
        config.validate()?;
        self.config = config;
        if let Some(grid) = self.grid() {
            self.selection.retain(|c| grid.contains(*c));
        }
        Ok(())
    }

    pub fn grid(&self) -> Option<SplitGrid> {
        get_grid(&self.config, self.sheet.width(), self.sheet.height())
    }

    fn grid_or_err(&self) -> Result<SplitGrid> {
        self.grid().ok_or(SheetError::InvalidCellSize {
            width: self.config.cell_w as i64,
            height: self.config.cell_h as i64,
        })
    }

    /// Cell under a sheet-space point; points in the padding hit nothing.
    pub fn cell_at(&self, x: f64, y: f64) -> Option<CellRef> {
        let grid = self.grid()?;
        let lx = x - grid.offset_x as f64;
        let ly = y - grid.offset_y as f64;
        if lx < 0.0 || ly < 0.0 {
            return None;
        }
        let step_x = (grid.cell_w + grid.pad_x) as f64;
        let step_y = (grid.cell_h + grid.pad_y) as f64;
        let col = (lx / step_x).floor();
        let row = (ly / step_y).floor();
        if lx - col * step_x >= grid.cell_w as f64 || ly - row * step_y >= grid.cell_h as f64 {
            return None;
        }
        let cell = CellRef::new(row as u32, col as u32);
        grid.contains(cell).then_some(cell)
    }

    // ---------- selection ----------

    /// Flips a cell's selection. Returns the new state; cells outside the grid stay unselected.
    pub fn toggle_cell(&mut self, cell: CellRef) -> bool {
        if !self.grid().is_some_and(|g| g.contains(cell)) {
            return false;
        }
        if self.selection.remove(&cell) {
            false
        } else {
            self.selection.insert(cell);
            true
        }
    }

    pub fn select_all(&mut self) {
        if let Some(grid) = self.grid() {
            self.selection.extend(grid.all_cells());
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Selected cells in row-major order.
    pub fn selected_cells(&self) -> Vec<CellRef> {
        self.selection.iter().copied().collect()
    }

    // ---------- extraction ----------

    /// Crops `cells` out of the sheet. Crops are clipped at the sheet edge.
    pub fn extract(&self, cells: &[CellRef], skip_blank: bool) -> Result<Extraction> {
        let grid = self.grid_or_err()?;
        let mut out = Extraction::default();
        for &cell in cells {
            if !grid.contains(cell) {
                out.skipped.push(SkippedCell {
                    cell,
                    reason: SkipReason::OutsideGrid,
                });
                continue;
            }
            let rect = grid
                .cell_bounds(cell.row, cell.col)
                .clip_to(self.sheet.width(), self.sheet.height());
            if rect.is_empty() {
                out.skipped.push(SkippedCell {
                    cell,
                    reason: SkipReason::OutsideSheet,
                });
                continue;
            }
            let image = crop_rgba(&self.sheet, rect);
            if skip_blank && is_blank(&image) {
                out.skipped.push(SkippedCell {
                    cell,
                    reason: SkipReason::Blank,
                });
                continue;
            }
            out.cells.push(ExtractedCell { cell, image });
        }
        Ok(out)
    }

    #[instrument(skip_all, fields(base = base))]
    /// Writes every extracted cell as `{base}_r{row+1}_c{col+1}.png` into
    /// `out_dir`, plus a `{base}_split.json` manifest. The configuration is
    /// checked before anything is written.
    pub fn export(&self, out_dir: &Path, base: &str, cells: &[CellRef], skip_blank: bool) -> Result<SplitReport> {
        let grid = self.grid_or_err()?;
        if base.is_empty() {
            return Err(SheetError::InvalidConfig("base name must not be empty".into()));
        }
        let extraction = self.extract(cells, skip_blank)?;
        std::fs::create_dir_all(out_dir)?;
        let mut exported = Vec::with_capacity(extraction.cells.len());
        for ExtractedCell { cell, image } in &extraction.cells {
            let file = cell.file_name(base);
            image.save(out_dir.join(&file))?;
            debug!(file = %file, "cell written");
            exported.push(ExportedCell { cell: *cell, file });
        }
        let manifest = out_dir.join(format!("{base}_split.json"));
        let value = export::split_manifest(self.sheet_path(), base, &grid, &exported, &extraction.skipped);
        std::fs::write(&manifest, serde_json::to_string_pretty(&value)?)?;
        info!(
            exported = exported.len(),
            skipped = extraction.skipped.len(),
            "sheet split"
        );
        Ok(SplitReport {
            exported,
            skipped: extraction.skipped,
            manifest,
        })
    }

    /// Manifest listing the selected cells instead of exported files.
    pub fn selection_manifest(&self, base: &str) -> Result<serde_json::Value> {
        let grid = self.grid_or_err()?;
        Ok(export::selection_manifest(
            self.sheet_path(),
            base,
            &grid,
            &self.selected_cells(),
        ))
    }

    // ---------- grid line resize ----------

    /// Starts dragging a grid line.
    pub fn begin_line_drag(&mut self, line: GridLine) {
        self.line_drag = Some(LineDrag {
            line,
            snapshot_pushed: false,
        });
    }

    /// Resizes cells so the dragged line sits at `pos` (sheet space) while the
    /// grid origin stays fixed. The first actual change records an undo snapshot.
    pub fn update_line_drag(&mut self, pos: f64) -> bool {
        let Some(drag) = self.line_drag else {
            return false;
        };
        if !pos.is_finite() {
            return false;
        }
        let cfg = self.config;
        let resized = |index: u32, offset: u32, pad: u32| -> u32 {
            let span = pos - offset as f64 - index as f64 * pad as f64;
            (span / (index as f64 + 1.0)).floor().max(1.0) as u32
        };
        let (w, h) = match drag.line {
            GridLine::Vertical(col) => (resized(col, cfg.offset_x, cfg.pad_x), cfg.cell_h),
            GridLine::Horizontal(row) => (cfg.cell_w, resized(row, cfg.offset_y, cfg.pad_y)),
        };
        if (w, h) == (cfg.cell_w, cfg.cell_h) {
            return false;
        }
        if !drag.snapshot_pushed {
            self.resize_undo.push_back((cfg.cell_w, cfg.cell_h));
            if self.resize_undo.len() > RESIZE_UNDO_DEPTH {
                self.resize_undo.pop_front();
            }
            self.line_drag = Some(LineDrag {
                snapshot_pushed: true,
                ..drag
            });
        }
        self.config.cell_w = w;
        self.config.cell_h = h;
        true
    }

    pub fn end_line_drag(&mut self) {
        self.line_drag = None;
    }

    pub fn resize_undo_depth(&self) -> usize {
        self.resize_undo.len()
    }

    /// Restores the previous cell size. Returns false when there is nothing to undo.
    pub fn undo_resize(&mut self) -> bool {
        let Some((w, h)) = self.resize_undo.pop_back() else {
            return false;
        };
        self.config.cell_w = w;
        self.config.cell_h = h;
        true
    }
}
